//! Feature extraction for loosely structured score tables.
//!
//! Provides pure functions used by schema inference and lookup:
//! - Header canonicalization and name normalization
//! - Pluggable string similarity (Indel ratio, normalized Levenshtein)
//! - Best-effort numeric coercion of cells

use rapidfuzz::distance::indel;
use tryout_model::CellValue;
use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::UnicodeNormalization;

/// Canonical form of a column header or alias, for comparison only.
///
/// Underscores become spaces, the text is lowercased, trimmed, and internal
/// whitespace runs collapse to a single space.
pub fn canonicalize_header(s: &str) -> String {
    collapse_whitespace(&s.replace('_', " ").to_lowercase())
}

/// Normalize a person's name for equality checks.
///
/// Accents are stripped, whitespace collapsed, and the result case-folded,
/// so "  JOSÉ  Ramos" and "jose ramos" compare equal.
pub fn normalize_name(s: &str) -> String {
    case_fold(&collapse_whitespace(&strip_accents(s)))
}

/// Decompose (NFKD) and drop combining marks.
///
/// Only characters with a non-zero canonical combining class are removed;
/// spacing marks such as Indic vowel signs (class 0) stay.
pub fn strip_accents(s: &str) -> String {
    if s.is_ascii() {
        return s.to_string();
    }
    s.nfkd().filter(|c| canonical_combining_class(*c) == 0).collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full lowercase plus the folds plain lowercasing leaves distinct.
fn case_fold(s: &str) -> String {
    let mut folded = String::with_capacity(s.len());
    for c in s.chars().flat_map(char::to_lowercase) {
        match c {
            'ß' => folded.push_str("ss"),
            'ς' => folded.push('σ'),
            _ => folded.push(c),
        }
    }
    folded
}

/// A string similarity scorer.
///
/// Contract: scores lie in `[0, 100]`, identical non-empty strings score
/// 100, and an empty side scores 0. Callers rely only on this contract and
/// a threshold, never on a particular algorithm.
pub trait Similarity {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Normalized Indel similarity: `100 * (1 - indel(a, b) / (|a| + |b|))`.
///
/// Indel distance counts insertions and deletions only, so one substitution
/// costs two. This is the classic "ratio" used by fuzzy header matchers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndelRatio;

impl Similarity for IndelRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        100.0 * indel::normalized_similarity(a.chars(), b.chars())
    }
}

/// Normalized Levenshtein similarity scaled to `[0, 100]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinRatio;

impl Similarity for LevenshteinRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        100.0 * strsim::normalized_levenshtein(a, b)
    }
}

/// Selectable scorer, for configuration surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScorerKind {
    #[default]
    Indel,
    Levenshtein,
}

impl Similarity for ScorerKind {
    fn score(&self, a: &str, b: &str) -> f64 {
        match self {
            Self::Indel => IndelRatio.score(a, b),
            Self::Levenshtein => LevenshteinRatio.score(a, b),
        }
    }
}

/// Coerce a cell to a finite number; anything else is missing.
pub fn coerce_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) | CellValue::Empty => None,
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_header() {
        assert_eq!(canonicalize_header("  Nama_Lengkap "), "nama lengkap");
        assert_eq!(canonicalize_header("NAMA   LENGKAP"), "nama lengkap");
        assert_eq!(canonicalize_header("Skor\tAkhir"), "skor akhir");
        assert_eq!(canonicalize_header(""), "");
    }

    #[test]
    fn test_normalize_name_accents_and_case() {
        assert_eq!(normalize_name("José"), normalize_name("jose"));
        assert_eq!(normalize_name("  Siti   NURHALIZA "), "siti nurhaliza");
        assert_eq!(normalize_name("Çağrı"), "cagrı");
    }

    #[test]
    fn test_spacing_marks_are_kept() {
        // U+0940 DEVANAGARI VOWEL SIGN II is a spacing mark with combining class 0
        assert_eq!(normalize_name("की"), "की");
        assert_eq!(strip_accents("की").chars().count(), 2);
        // U+0301 COMBINING ACUTE ACCENT has class 230
        assert_eq!(strip_accents("e\u{301}"), "e");
    }

    #[test]
    fn test_case_fold_is_stronger_than_lowercase() {
        assert_eq!(normalize_name("STRASSE"), normalize_name("Straße"));
        assert_eq!(normalize_name("ΣΟΦΟΣ"), normalize_name("σοφος"));
    }

    #[test]
    fn test_indel_ratio() {
        assert_eq!(IndelRatio.score("nama", "nama"), 100.0);
        assert_eq!(IndelRatio.score("", "nama"), 0.0);
        // one deletion out of 23 characters
        let score = IndelRatio.score("nama lengkp", "nama lengkap");
        assert!((score - 95.652).abs() < 0.01, "got {score}");
        // "ama" is the only common run: 1 - 4/10
        assert!((IndelRatio.score("alamat", "nama") - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_levenshtein_ratio() {
        assert_eq!(LevenshteinRatio.score("skor", "skor"), 100.0);
        assert_eq!(LevenshteinRatio.score("skor", ""), 0.0);
        assert!((LevenshteinRatio.score("skor", "skop") - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_scorer_kind_dispatch() {
        assert_eq!(
            ScorerKind::Indel.score("total", "totl"),
            IndelRatio.score("total", "totl")
        );
        assert_eq!(
            ScorerKind::Levenshtein.score("total", "totl"),
            LevenshteinRatio.score("total", "totl")
        );
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&CellValue::text(" 85 ")), Some(85.0));
        assert_eq!(coerce_number(&CellValue::text("84.5")), Some(84.5));
        assert_eq!(coerce_number(&CellValue::Number(90.0)), Some(90.0));
        assert_eq!(coerce_number(&CellValue::text("absent")), None);
        assert_eq!(coerce_number(&CellValue::text("nan")), None);
        assert_eq!(coerce_number(&CellValue::text("85,5")), None);
        assert_eq!(coerce_number(&CellValue::Empty), None);
    }
}
