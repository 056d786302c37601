//! Core domain model for try-out result lookups.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `CellValue` / `Record` / `Dataset`: the loaded table, as delivered by a source
//! - `Schema`: which columns play the name, sequence, final-score and subject roles
//! - `ScoredRecord`: a row with its derived final score, rounded score and rank
//! - `LeaderboardBand`: records sharing one rounded score at the top of the board
//! - `Predicate`: categorical label for a rounded score

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while deriving a schema from a freshly loaded dataset.
///
/// Both are fatal at load time; per-request conditions never use this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("name column not found; expected one of: {}", candidates.join(", "))]
    MissingIdentityColumn { candidates: Vec<String> },

    #[error("no final score column and no numeric subject columns to compute one from")]
    NoScoreSource,
}

/// A single cell of the source table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// Build a text cell, mapping blank strings to `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole numbers print without a trailing ".0" so that sequence
            // numbers read "7", not "7.0".
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One row of the source table, aligned with the dataset's columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    cells: Vec<CellValue>,
}

impl Record {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Cell at `index`; missing trailing cells read as `Empty`.
    pub fn cell(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&EMPTY_CELL)
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }
}

/// An ordered sequence of records sharing a fixed column list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Create a dataset. Every record is padded or truncated to the column count.
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        let width = columns.len();
        let records = records
            .into_iter()
            .map(|mut record| {
                record.cells.resize(width, CellValue::Empty);
                record
            })
            .collect();

        Self { columns, records }
    }

    /// Build a dataset from string cells; blank cells become `Empty`.
    pub fn from_text_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        let records = rows
            .iter()
            .map(|row| Record::new(row.iter().map(|s| CellValue::text(*s)).collect()))
            .collect();

        Self::new(columns.iter().map(|c| c.to_string()).collect(), records)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All cells of one column, in row order.
    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.records.iter().map(move |r| r.cell(index))
    }
}

/// A dataset column identified by position and original header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub index: usize,
    pub header: String,
}

impl ColumnRef {
    pub fn new(index: usize, header: impl Into<String>) -> Self {
        Self {
            index,
            header: header.into(),
        }
    }
}

/// Column roles derived once from a dataset's headers and contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Identity column (mandatory)
    pub name: ColumnRef,

    /// Sequence number, only used to tell duplicate names apart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<ColumnRef>,

    /// Pre-computed final score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<ColumnRef>,

    /// Numeric subject-score columns, in dataset order
    #[serde(default)]
    pub subjects: Vec<ColumnRef>,
}

/// A record with its derived scores and rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// Row position in the source dataset
    pub row: usize,

    /// Display name, as written in the table
    pub name: String,

    /// Normalized name used for equality checks
    pub name_key: String,

    /// Sequence number as displayed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,

    /// Unrounded final score
    pub raw_score: f64,

    /// Rounded final score, used for display and ranking
    pub score: i64,

    /// Dense rank, 1 = highest
    pub rank: u32,

    /// Coerced subject values, aligned with `Schema::subjects`
    #[serde(default)]
    pub subjects: Vec<Option<f64>>,
}

/// Records sharing one rounded score near the top of the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardBand {
    pub rank: u32,
    pub score: i64,
    pub members: Vec<ScoredRecord>,
}

/// Categorical label for a rounded score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Excellent,
    VeryGood,
    Good,
    Fair,
    NeedsSupport,
}

impl Predicate {
    /// Pick the tier for a score. Lower bounds are inclusive; highest tier wins.
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 90 => Self::Excellent,
            s if s >= 85 => Self::VeryGood,
            s if s >= 75 => Self::Good,
            s if s >= 65 => Self::Fair,
            _ => Self::NeedsSupport,
        }
    }

    /// Get a human-readable label for this tier.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::VeryGood => "Very Good",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::NeedsSupport => "Needs Support",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_boundaries() {
        assert_eq!(Predicate::from_score(100), Predicate::Excellent);
        assert_eq!(Predicate::from_score(90), Predicate::Excellent);
        assert_eq!(Predicate::from_score(89), Predicate::VeryGood);
        assert_eq!(Predicate::from_score(85), Predicate::VeryGood);
        assert_eq!(Predicate::from_score(84), Predicate::Good);
        assert_eq!(Predicate::from_score(75), Predicate::Good);
        assert_eq!(Predicate::from_score(74), Predicate::Fair);
        assert_eq!(Predicate::from_score(65), Predicate::Fair);
        assert_eq!(Predicate::from_score(64), Predicate::NeedsSupport);
        assert_eq!(Predicate::from_score(0), Predicate::NeedsSupport);
    }

    #[test]
    fn test_predicate_labels() {
        assert_eq!(Predicate::Excellent.label(), "Excellent");
        assert_eq!(Predicate::VeryGood.to_string(), "Very Good");
        assert_eq!(Predicate::NeedsSupport.label(), "Needs Support");
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(CellValue::Number(7.0).to_string(), "7");
        assert_eq!(CellValue::Number(84.5).to_string(), "84.5");
        assert_eq!(CellValue::text("Ana").to_string(), "Ana");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_blank_text_is_empty() {
        assert!(CellValue::text("   ").is_empty());
        assert!(!CellValue::text("0").is_empty());
    }

    #[test]
    fn test_dataset_pads_short_rows() {
        let dataset = Dataset::from_text_rows(&["Nama", "MTK", "IPA"], &[&["Ana", "80"]]);
        assert_eq!(dataset.records()[0].cells().len(), 3);
        assert!(dataset.records()[0].cell(2).is_empty());
        assert!(dataset.records()[0].cell(10).is_empty());
    }

    #[test]
    fn test_cell_json_roundtrip_shapes() {
        let cells: Vec<CellValue> = serde_json::from_str(r#"[85, "Ana", null]"#).unwrap();
        assert_eq!(
            cells,
            vec![
                CellValue::Number(85.0),
                CellValue::Text("Ana".to_string()),
                CellValue::Empty
            ]
        );
    }
}
