//! Scoring, ranking and lookup over a loaded dataset.
//!
//! Derives a final score per record, rounds it, assigns dense ranks, and
//! answers name lookups and leaderboard queries from an immutable
//! `ScoreBoard` built once per load.

use serde::Serialize;
use tracing::{info, warn};
use tryout_features::{coerce_number, normalize_name};
use tryout_model::{Dataset, LeaderboardBand, Schema, SchemaError, ScoredRecord};
use tryout_schema::{infer_schema, InferenceConfig};

/// Configuration for board queries.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Number of distinct scores shown on the leaderboard
    pub leaderboard_size: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self { leaderboard_size: 3 }
    }
}

/// Round a raw score to an integer, ties to even (84.5 -> 84, 85.5 -> 86).
pub fn round_score(raw: f64) -> i64 {
    raw.round_ties_even() as i64
}

/// Dense ranks for rounded scores, highest first.
///
/// Ties share a rank and the next distinct score ranks exactly one lower.
pub fn dense_ranks(scores: &[i64]) -> Vec<u32> {
    let mut distinct = scores.to_vec();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.dedup();

    scores
        .iter()
        .map(|score| {
            let position = distinct.partition_point(|d| d > score);
            position as u32 + 1
        })
        .collect()
}

/// Compute scored records for every named row of the dataset.
///
/// The raw score is the final-score column when the schema has one
/// (unparseable cells count as 0), otherwise the mean of the row's coercible
/// subject cells (0 when none coerce). Rows whose name normalizes to nothing
/// are skipped.
pub fn compute_scores(dataset: &Dataset, schema: &Schema) -> Vec<ScoredRecord> {
    let mut scored: Vec<ScoredRecord> = Vec::with_capacity(dataset.len());

    for (row, record) in dataset.records().iter().enumerate() {
        let name = record.cell(schema.name.index).to_string().trim().to_string();
        let name_key = normalize_name(&name);
        if name_key.is_empty() {
            warn!(row, "skipping row without a name");
            continue;
        }

        let sequence = schema
            .sequence
            .as_ref()
            .map(|c| record.cell(c.index))
            .filter(|cell| !cell.is_empty())
            .map(|cell| cell.to_string());

        let subjects: Vec<Option<f64>> = schema
            .subjects
            .iter()
            .map(|c| coerce_number(record.cell(c.index)))
            .collect();

        let raw_score = match &schema.final_score {
            Some(column) => coerce_number(record.cell(column.index)).unwrap_or(0.0),
            None => mean(subjects.iter().flatten().copied()).unwrap_or(0.0),
        };

        scored.push(ScoredRecord {
            row,
            name,
            name_key,
            sequence,
            raw_score,
            score: round_score(raw_score),
            rank: 0,
            subjects,
        });
    }

    let scores: Vec<i64> = scored.iter().map(|r| r.score).collect();
    for (record, rank) in scored.iter_mut().zip(dense_ranks(&scores)) {
        record.rank = rank;
    }

    scored
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Group the top `limit` distinct rounded scores into leaderboard bands.
///
/// Records are ordered by score descending, then display name ascending;
/// each band carries its dense rank and every record tied at that score.
pub fn leaderboard_bands(records: &[ScoredRecord], limit: usize) -> Vec<LeaderboardBand> {
    let mut ordered: Vec<&ScoredRecord> = records.iter().collect();
    ordered.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

    let mut bands: Vec<LeaderboardBand> = Vec::new();
    for record in ordered {
        match bands.last_mut() {
            Some(band) if band.score == record.score => band.members.push(record.clone()),
            _ => {
                if bands.len() == limit {
                    break;
                }
                bands.push(LeaderboardBand {
                    rank: bands.len() as u32 + 1,
                    score: record.score,
                    members: vec![record.clone()],
                });
            }
        }
    }

    bands
}

/// A selectable entry when several records share a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub label: String,
    pub sequence: String,
}

/// Label shown for a duplicate-name candidate.
pub fn candidate_label(name: &str, sequence: &str) -> String {
    format!("{} (No Urut {})", name, sequence)
}

/// Recover the sequence value from a label built by `candidate_label`.
pub fn parse_candidate_label(label: &str) -> Option<&str> {
    const MARKER: &str = "No Urut";

    let body = label.strip_suffix(')')?;
    let rest = &body[body.find(MARKER)? + MARKER.len()..];
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() && !chars.as_str().is_empty() => Some(chars.as_str()),
        _ => None,
    }
}

/// Outcome of a name lookup. None of these are errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    /// The query was blank
    NoQuery,
    /// No record has this name
    NotFound,
    /// Several records share the name; pick one by sequence number
    Ambiguous(Vec<Candidate>),
    /// Exactly one record resolved
    Found(&'a ScoredRecord),
}

/// The loaded dataset with its schema and scored records.
///
/// Built once and read-only afterwards; share it by reference.
#[derive(Debug, Clone)]
pub struct ScoreBoard {
    dataset: Dataset,
    schema: Schema,
    records: Vec<ScoredRecord>,
}

impl ScoreBoard {
    /// Infer the schema and score every record.
    pub fn build(dataset: Dataset, config: &InferenceConfig) -> Result<Self, SchemaError> {
        let schema = infer_schema(&dataset, config)?;
        Ok(Self::with_schema(dataset, schema))
    }

    /// Score a dataset against a known schema.
    pub fn with_schema(dataset: Dataset, schema: Schema) -> Self {
        let records = compute_scores(&dataset, &schema);
        info!(
            rows = dataset.len(),
            participants = records.len(),
            subjects = schema.subjects.len(),
            "score board built"
        );

        Self {
            dataset,
            schema,
            records,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[ScoredRecord] {
        &self.records
    }

    pub fn total_participants(&self) -> usize {
        self.records.len()
    }

    /// All records whose normalized name equals the normalized query, in table order.
    pub fn find_exact(&self, query: &str) -> Vec<&ScoredRecord> {
        let key = normalize_name(query);
        self.records.iter().filter(|r| r.name_key == key).collect()
    }

    /// Resolve a query to a single record.
    ///
    /// When several records share the name and the table has a sequence
    /// column, `selection` (a sequence value or a candidate label) picks
    /// one; without a selection the candidates are returned. Without a
    /// sequence column the first match wins.
    pub fn lookup(&self, query: &str, selection: Option<&str>) -> Lookup<'_> {
        if query.trim().is_empty() {
            return Lookup::NoQuery;
        }

        let hits = self.find_exact(query);
        let Some(first) = hits.first().copied() else {
            return Lookup::NotFound;
        };

        if hits.len() == 1 || self.schema.sequence.is_none() {
            return Lookup::Found(first);
        }

        match selection {
            Some(selected) => {
                let wanted = parse_candidate_label(selected).unwrap_or(selected).trim();
                hits.into_iter()
                    .find(|r| r.sequence.as_deref() == Some(wanted))
                    .map_or(Lookup::NotFound, Lookup::Found)
            }
            None => Lookup::Ambiguous(
                hits.iter()
                    .map(|r| {
                        let sequence = r.sequence.clone().unwrap_or_default();
                        Candidate {
                            label: candidate_label(&r.name, &sequence),
                            sequence,
                        }
                    })
                    .collect(),
            ),
        }
    }

    /// Leaderboard bands for the top `limit` distinct scores.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardBand> {
        leaderboard_bands(&self.records, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn board(columns: &[&str], rows: &[&[&str]]) -> ScoreBoard {
        ScoreBoard::build(Dataset::from_text_rows(columns, rows), &InferenceConfig::default())
            .unwrap()
    }

    #[test]
    fn test_round_half_to_even() {
        assert_eq!(round_score(84.5), 84);
        assert_eq!(round_score(85.5), 86);
        assert_eq!(round_score(84.49), 84);
        assert_eq!(round_score(84.51), 85);
        assert_eq!(round_score(0.0), 0);
        // same answer on every call
        assert!((0..10).all(|_| round_score(84.5) == 84));
    }

    #[test]
    fn test_dense_ranks() {
        assert_eq!(dense_ranks(&[95, 95, 90, 80]), vec![1, 1, 2, 3]);
        assert_eq!(dense_ranks(&[80, 95, 90, 95]), vec![3, 1, 2, 1]);
        assert_eq!(dense_ranks(&[70, 70, 70]), vec![1, 1, 1]);
        assert_eq!(dense_ranks(&[]), Vec::<u32>::new());
    }

    #[test]
    fn test_mean_of_numeric_subjects_only() {
        let board = board(
            &["Nama", "MTK", "IPA", "Catatan"],
            &[&["Ana", "80", "90", "rajin"]],
        );
        assert_eq!(board.schema().subjects.len(), 2);
        assert_eq!(board.records()[0].raw_score, 85.0);
        assert_eq!(board.records()[0].score, 85);
    }

    #[test]
    fn test_mean_ignores_missing_cells() {
        let board = board(
            &["Nama", "MTK", "IPA"],
            &[
                &["Ana", "80", "90"],
                &["Budi", "70", ""],
                &["Cici", "", "60"],
                &["Dedi", "60", "70"],
                &["Eka", "", ""],
            ],
        );
        assert_eq!(board.schema().subjects.len(), 2);
        let scores: Vec<f64> = board.records().iter().map(|r| r.raw_score).collect();
        assert_eq!(scores, vec![85.0, 70.0, 60.0, 65.0, 0.0]);
    }

    #[test]
    fn test_final_column_with_bad_cells() {
        let board = board(
            &["Nama", "Skor Akhir", "MTK"],
            &[&["Ana", "84.5", "10"], &["Budi", "absen", "99"]],
        );
        let scores: Vec<i64> = board.records().iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![84, 0]);
    }

    #[test]
    fn test_all_tied_share_rank_one() {
        let board = board(&["Nama", "Total"], &[&["A", "70.2"], &["B", "69.8"], &["C", "70"]]);
        assert!(board.records().iter().all(|r| r.rank == 1));
    }

    #[test]
    fn test_rows_without_name_are_skipped() {
        let board = board(&["Nama", "Total"], &[&["Ana", "80"], &["  ", "90"], &["Budi", "70"]]);
        assert_eq!(board.total_participants(), 2);
        assert_eq!(board.dataset().len(), 3);
        assert_eq!(board.records()[1].row, 2);
        assert_eq!(board.records()[0].rank, 1);
    }

    #[test]
    fn test_leaderboard_three_bands() {
        let board = board(
            &["Nama", "Skor Akhir"],
            &[
                &["Budi", "100"],
                &["Ana", "100"],
                &["Cici", "95"],
                &["Eka", "90"],
                &["Dedi", "90"],
                &["Fajar", "80"],
            ],
        );
        let bands = board.leaderboard(3);

        assert_eq!(bands.len(), 3);
        let summary: Vec<(u32, i64, Vec<&str>)> = bands
            .iter()
            .map(|b| (b.rank, b.score, b.members.iter().map(|m| m.name.as_str()).collect()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, 100, vec!["Ana", "Budi"]),
                (2, 95, vec!["Cici"]),
                (3, 90, vec!["Dedi", "Eka"]),
            ]
        );
        assert!(bands.iter().all(|b| b.members.iter().all(|m| m.rank == b.rank)));
    }

    #[test]
    fn test_leaderboard_limits() {
        let board = board(&["Nama", "Total"], &[&["Ana", "80"], &["Budi", "70"]]);
        assert_eq!(board.leaderboard(5).len(), 2);
        assert!(board.leaderboard(0).is_empty());
    }

    #[test]
    fn test_lookup_is_case_and_accent_insensitive() {
        let board = board(&["Nama", "Total"], &[&["José Ramos", "88"]]);
        match board.lookup("  jose   RAMOS ", None) {
            Lookup::Found(record) => assert_eq!(record.name, "José Ramos"),
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_lookup_negative_outcomes() {
        let board = board(&["Nama", "Total"], &[&["Ana", "88"]]);
        assert_eq!(board.lookup("   ", None), Lookup::NoQuery);
        assert_eq!(board.lookup("Anastasia", None), Lookup::NotFound);
    }

    #[test]
    fn test_duplicate_names_with_sequence() {
        let board = board(
            &["No Urut", "Nama", "Total"],
            &[&["3", "Ana", "80"], &["5", "Budi", "85"], &["7", "Ana", "90"]],
        );
        assert_eq!(board.find_exact("ana").len(), 2);

        assert_eq!(
            board.lookup("ana", None),
            Lookup::Ambiguous(vec![
                Candidate {
                    label: "Ana (No Urut 3)".to_string(),
                    sequence: "3".to_string()
                },
                Candidate {
                    label: "Ana (No Urut 7)".to_string(),
                    sequence: "7".to_string()
                },
            ])
        );

        for selection in ["7", "Ana (No Urut 7)"] {
            match board.lookup("ANA", Some(selection)) {
                Lookup::Found(record) => {
                    assert_eq!(record.sequence.as_deref(), Some("7"));
                    assert_eq!(record.score, 90);
                }
                other => panic!("expected sequence 7, got {other:?}"),
            }
        }
        assert_eq!(board.lookup("Ana", Some("9")), Lookup::NotFound);
    }

    #[test]
    fn test_duplicate_names_without_sequence_take_first() {
        let board = board(&["Nama", "Total"], &[&["Ana", "80"], &["Ana", "90"]]);
        match board.lookup("ana", Some("7")) {
            Lookup::Found(record) => assert_eq!(record.row, 0),
            other => panic!("expected first match, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_candidate_label() {
        assert_eq!(parse_candidate_label("Ana (No Urut 7)"), Some("7"));
        assert_eq!(parse_candidate_label("Ana (No Urut 12A)"), Some("12A"));
        assert_eq!(parse_candidate_label("Ana (No Urut )"), None);
        assert_eq!(parse_candidate_label("7"), None);
        assert_eq!(
            parse_candidate_label(&candidate_label("Siti", "21")),
            Some("21")
        );
    }
}
