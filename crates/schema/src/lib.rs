//! Column matching and schema inference.
//!
//! Maps loosely named spreadsheet headers onto the roles the ranking needs:
//! - `pick_column`: exact alias match first, fuzzy fallback second
//! - `infer_schema`: name, sequence, final-score and subject columns

use tracing::debug;
use tryout_features::{canonicalize_header, coerce_number, ScorerKind, Similarity};
use tryout_model::{ColumnRef, Dataset, Schema, SchemaError};

/// Aliases for the identity column, in priority order.
pub const NAME_CANDIDATES: &[&str] = &["Nama", "Nama Lengkap", "Nama_Lengkap", "Siswa", "Full Name"];

/// Aliases for the sequence-number column, in priority order.
pub const SEQUENCE_CANDIDATES: &[&str] = &["No", "No Urut", "Nomor", "Nomor Urut", "Urut"];

/// Aliases for the pre-computed final score column, in priority order.
pub const FINAL_SCORE_CANDIDATES: &[&str] = &[
    "Skor Akhir",
    "Nilai Akhir",
    "Nilai Total",
    "Total",
    "Score",
    "Skor",
];

/// Configuration for schema inference.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Minimum similarity (0-100) for a fuzzy header match
    pub fuzzy_threshold: f64,
    /// Minimum share of coercible cells for a subject column
    pub numeric_ratio: f64,
    /// Similarity scorer used by the fuzzy fallback
    pub scorer: ScorerKind,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 80.0,
            numeric_ratio: 0.6,
            scorer: ScorerKind::Indel,
        }
    }
}

/// Resolve one column from a priority-ordered alias list.
///
/// Returns the original header of the first exact canonical match. When no
/// alias matches exactly, the globally best fuzzy match is accepted if it
/// scores at least `threshold`.
pub fn pick_column<S: Similarity + ?Sized>(
    headers: &[String],
    candidates: &[&str],
    scorer: &S,
    threshold: f64,
) -> Option<ColumnRef> {
    // Canonical key -> column index. A later header with the same key
    // replaces the earlier one but keeps its slot in the key order.
    let mut keys: Vec<(String, usize)> = Vec::with_capacity(headers.len());
    for (index, header) in headers.iter().enumerate() {
        let key = canonicalize_header(header);
        match keys.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = index,
            None => keys.push((key, index)),
        }
    }

    let column = |index: usize| ColumnRef::new(index, headers[index].clone());

    for candidate in candidates {
        let wanted = canonicalize_header(candidate);
        if let Some((_, index)) = keys.iter().find(|(k, _)| *k == wanted) {
            return Some(column(*index));
        }
    }

    let mut best: Option<(usize, f64)> = None;
    for candidate in candidates {
        let wanted = canonicalize_header(candidate);
        for (key, index) in &keys {
            let score = scorer.score(&wanted, key);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((*index, score));
            }
        }
    }

    match best {
        Some((index, score)) if score >= threshold => {
            debug!(header = %headers[index], score, "fuzzy header match");
            Some(column(index))
        }
        _ => None,
    }
}

/// Coerce every cell of a column. First pass of the numeric scan.
pub fn coerce_column(dataset: &Dataset, index: usize) -> Vec<Option<f64>> {
    dataset.column_cells(index).map(coerce_number).collect()
}

/// Share of successfully coerced cells. Second pass of the numeric scan.
///
/// An empty column has a ratio of zero.
pub fn success_ratio(values: &[Option<f64>]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| v.is_some()).count() as f64 / values.len() as f64
}

/// Infer column roles for a dataset.
pub fn infer_schema(dataset: &Dataset, config: &InferenceConfig) -> Result<Schema, SchemaError> {
    let headers = dataset.columns();
    let resolve = |candidates: &[&str]| {
        pick_column(headers, candidates, &config.scorer, config.fuzzy_threshold)
    };

    let name = resolve(NAME_CANDIDATES).ok_or_else(|| SchemaError::MissingIdentityColumn {
        candidates: NAME_CANDIDATES.iter().map(|c| c.to_string()).collect(),
    })?;
    let sequence = resolve(SEQUENCE_CANDIDATES);
    let final_score = resolve(FINAL_SCORE_CANDIDATES);

    let claimed: Vec<usize> = [Some(&name), sequence.as_ref(), final_score.as_ref()]
        .into_iter()
        .flatten()
        .map(|c| c.index)
        .collect();

    let subjects: Vec<ColumnRef> = headers
        .iter()
        .enumerate()
        .filter(|(index, _)| !claimed.contains(index))
        .filter(|(index, header)| {
            let ratio = success_ratio(&coerce_column(dataset, *index));
            debug!(column = %header, ratio, "numeric scan");
            ratio >= config.numeric_ratio
        })
        .map(|(index, header)| ColumnRef::new(index, header.clone()))
        .collect();

    if final_score.is_none() && subjects.is_empty() {
        return Err(SchemaError::NoScoreSource);
    }

    debug!(
        name = %name.header,
        sequence = ?sequence.as_ref().map(|c| &c.header),
        final_score = ?final_score.as_ref().map(|c| &c.header),
        subjects = subjects.len(),
        "schema inferred"
    );

    Ok(Schema {
        name,
        sequence,
        final_score,
        subjects,
    })
}
