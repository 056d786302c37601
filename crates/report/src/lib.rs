//! Result assembly and plain-text rendering.
//!
//! Turns a resolved lookup into the output surface consumed by a
//! presentation layer (`StudentResult`), and renders it, the leaderboard and
//! the duplicate-name prompt as text cards.

use serde::Serialize;
use std::fmt::Write;
use tryout_features::canonicalize_header;
use tryout_model::{LeaderboardBand, Predicate, Schema, ScoredRecord};
use tryout_rank::{round_score, Candidate, ScoreBoard};

/// Shown when the visitor submitted an empty name.
pub const NO_QUERY_MESSAGE: &str = "Please enter a name.";

/// Shown when no record carries the submitted name.
pub const NOT_FOUND_MESSAGE: &str =
    "Name not found in the data. Check the spelling (upper/lower case does not matter).";

/// Display labels for common subject column codes, keyed by canonical header.
/// Only affects display; the schema keeps the original header.
const SUBJECT_DISPLAY_ALIASES: &[(&str, &str)] = &[
    ("bhs", "Bahasa Indonesia"),
    ("ind", "Bahasa Indonesia"),
    ("b indonesia", "Bahasa Indonesia"),
    ("b. indonesia", "Bahasa Indonesia"),
    ("mat", "Matematika"),
    ("mtk", "Matematika"),
    ("matematika", "Matematika"),
];

/// Display label for a subject column; unmapped headers are returned as-is.
pub fn pretty_subject(header: &str) -> String {
    let key = canonicalize_header(header);
    SUBJECT_DISPLAY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| header.to_string())
}

/// One subject score on a result card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectScore {
    /// Display label
    pub label: String,
    /// Original column header
    pub column: String,
    /// Rounded score
    pub score: i64,
}

/// Everything a presentation layer needs for one resolved student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentResult {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<String>,

    pub rank: u32,
    pub total_participants: usize,
    pub final_score: i64,
    pub predicate: Predicate,
    pub predicate_label: &'static str,
    pub subjects: Vec<SubjectScore>,
    pub leaderboard: Vec<LeaderboardBand>,
}

/// Assemble the result card for a record resolved from `board`.
pub fn build_result(board: &ScoreBoard, record: &ScoredRecord, leaderboard_size: usize) -> StudentResult {
    let mut subjects: Vec<SubjectScore> = board
        .schema()
        .subjects
        .iter()
        .zip(&record.subjects)
        .filter_map(|(column, value)| {
            value.map(|v| SubjectScore {
                label: pretty_subject(&column.header),
                column: column.header.clone(),
                score: round_score(v),
            })
        })
        .collect();
    subjects.sort_by(|a, b| a.column.cmp(&b.column));

    let predicate = Predicate::from_score(record.score);

    StudentResult {
        name: record.name.clone(),
        sequence: record.sequence.clone(),
        rank: record.rank,
        total_participants: board.total_participants(),
        final_score: record.score,
        predicate,
        predicate_label: predicate.label(),
        subjects,
        leaderboard: board.leaderboard(leaderboard_size),
    }
}

fn medal(rank: u32) -> &'static str {
    match rank {
        1 => "🥇",
        2 => "🥈",
        3 => "🥉",
        _ => "🏅",
    }
}

/// Render a result card, including the leaderboard.
pub fn render_result(result: &StudentResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Try-out result");
    let _ = writeln!(out, "  Name:         {}", result.name);
    if let Some(sequence) = &result.sequence {
        let _ = writeln!(out, "  Sequence no.: {}", sequence);
    }
    let _ = writeln!(out, "  Rank:         {} of {}", result.rank, result.total_participants);
    let _ = writeln!(
        out,
        "  Final score:  {} [{}]",
        result.final_score, result.predicate_label
    );

    let _ = writeln!(out, "\nSubject scores");
    if result.subjects.is_empty() {
        let _ = writeln!(out, "  No per-subject scores available");
    }
    let width = result.subjects.iter().map(|s| s.label.chars().count()).max().unwrap_or(0);
    for subject in &result.subjects {
        let _ = writeln!(out, "  {:<width$}  {}", subject.label, subject.score, width = width);
    }

    out.push('\n');
    out.push_str(&render_leaderboard(&result.leaderboard));
    out
}

/// Render leaderboard bands, one header line per band followed by its names.
pub fn render_leaderboard(bands: &[LeaderboardBand]) -> String {
    let mut out = String::from("Top scores\n");
    for band in bands {
        let _ = writeln!(out, "  {} Rank {} · Score {}", medal(band.rank), band.rank, band.score);
        for member in &band.members {
            let _ = writeln!(out, "     {}", member.name);
        }
    }
    out
}

/// Render the duplicate-name prompt.
pub fn render_candidates(candidates: &[Candidate]) -> String {
    let mut out = String::from("Duplicate name found. Choose the correct sequence number:\n");
    for candidate in candidates {
        let _ = writeln!(out, "  {}", candidate.label);
    }
    out
}

/// Describe the inferred column roles, for operators.
pub fn describe_schema(schema: &Schema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name:        {}", schema.name.header);
    let _ = writeln!(
        out,
        "sequence:    {}",
        schema.sequence.as_ref().map_or("-", |c| c.header.as_str())
    );
    let _ = writeln!(
        out,
        "final score: {}",
        schema.final_score.as_ref().map_or("(mean of subjects)", |c| c.header.as_str())
    );
    let subjects: Vec<String> = schema
        .subjects
        .iter()
        .map(|c| format!("{} ({})", c.header, pretty_subject(&c.header)))
        .collect();
    let _ = writeln!(
        out,
        "subjects:    {}",
        if subjects.is_empty() { "-".to_string() } else { subjects.join(", ") }
    );
    out
}
