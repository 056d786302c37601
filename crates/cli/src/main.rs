//! Command-line front end for try-out result lookups.
//!
//! Usage:
//!     tryout --data hasil.csv lookup "Siti Nurhaliza"
//!     tryout --data hasil.csv lookup "Ana" --seq 7 --format json
//!     tryout --data hasil.csv leaderboard --top 5
//!     tryout --data hasil.csv schema

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};
use tryout_features::ScorerKind;
use tryout_rank::{BoardConfig, Lookup, ScoreBoard};
use tryout_report::{
    build_result, describe_schema, render_candidates, render_leaderboard, render_result,
    NOT_FOUND_MESSAGE, NO_QUERY_MESSAGE,
};
use tryout_schema::InferenceConfig;
use tryout_source::open_source;

#[derive(Parser)]
#[command(name = "tryout")]
#[command(about = "Look up try-out results, ranks and the leaderboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Result table (.csv, .tsv, .xlsx, .xls or .json)
    #[arg(long, env = "TRYOUT_DATA", default_value = "data/hasil-tryout.csv")]
    data: PathBuf,

    /// Minimum similarity (0-100) for fuzzy header matching
    #[arg(long, default_value_t = 80.0)]
    threshold: f64,

    /// Minimum share of numeric cells for a subject column
    #[arg(long, default_value_t = 0.6)]
    numeric_ratio: f64,

    /// Similarity scorer for fuzzy header matching
    #[arg(long, value_enum, default_value_t = ScorerArg::Indel)]
    scorer: ScorerArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one participant's result card
    Lookup {
        /// Full name, case and accents ignored
        name: String,

        /// Sequence number (or candidate label) when the name is shared
        #[arg(short, long)]
        seq: Option<String>,

        /// Number of distinct scores on the leaderboard
        #[arg(short, long, default_value_t = BoardConfig::default().leaderboard_size)]
        top: usize,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the top scorers
    Leaderboard {
        #[arg(short, long, default_value_t = BoardConfig::default().leaderboard_size)]
        top: usize,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show which columns were picked for each role
    Schema {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScorerArg {
    Indel,
    Levenshtein,
}

impl From<ScorerArg> for ScorerKind {
    fn from(arg: ScorerArg) -> Self {
        match arg {
            ScorerArg::Indel => ScorerKind::Indel,
            ScorerArg::Levenshtein => ScorerKind::Levenshtein,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tryout=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = InferenceConfig {
        fuzzy_threshold: cli.threshold,
        numeric_ratio: cli.numeric_ratio,
        scorer: cli.scorer.into(),
    };
    let board = load_board(&cli.data, &config)?;

    match cli.command {
        Commands::Lookup {
            name,
            seq,
            top,
            format,
        } => run_lookup(&board, &name, seq.as_deref(), top, format)?,
        Commands::Leaderboard { top, format } => run_leaderboard(&board, top, format)?,
        Commands::Schema { format } => run_schema(&board, format)?,
    }

    Ok(())
}

fn load_board(path: &Path, config: &InferenceConfig) -> Result<ScoreBoard> {
    let source = open_source(path)?;
    let dataset = source
        .load()
        .with_context(|| format!("Failed to load data from {}", path.display()))?;

    ScoreBoard::build(dataset, config)
        .with_context(|| format!("Failed to read the result table in {}", path.display()))
}

fn run_lookup(
    board: &ScoreBoard,
    name: &str,
    selection: Option<&str>,
    top: usize,
    format: OutputFormat,
) -> Result<()> {
    let outcome = board.lookup(name, selection);

    if format == OutputFormat::Json {
        let body = match &outcome {
            Lookup::NoQuery => json!({ "status": "no_query", "message": NO_QUERY_MESSAGE }),
            Lookup::NotFound => json!({ "status": "not_found", "message": NOT_FOUND_MESSAGE }),
            Lookup::Ambiguous(candidates) => {
                json!({ "status": "ambiguous", "candidates": candidates })
            }
            Lookup::Found(record) => {
                json!({ "status": "found", "result": build_result(board, record, top) })
            }
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match outcome {
        Lookup::NoQuery => println!("{}", NO_QUERY_MESSAGE),
        Lookup::NotFound => println!("{}", NOT_FOUND_MESSAGE),
        Lookup::Ambiguous(candidates) => {
            print!("{}", render_candidates(&candidates));
            println!("Re-run with --seq <NUMBER> to pick one.");
        }
        Lookup::Found(record) => print!("{}", render_result(&build_result(board, record, top))),
    }

    Ok(())
}

fn run_leaderboard(board: &ScoreBoard, top: usize, format: OutputFormat) -> Result<()> {
    let bands = board.leaderboard(top);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bands)?),
        OutputFormat::Text => {
            print!("{}", render_leaderboard(&bands));
            println!("\nTotal: {} participants", board.total_participants());
        }
    }

    Ok(())
}

fn run_schema(board: &ScoreBoard, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = json!({
                "rows": board.dataset().len(),
                "participants": board.total_participants(),
                "schema": board.schema(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!(
                "{} rows, {} participants",
                board.dataset().len(),
                board.total_participants()
            );
            print!("{}", describe_schema(board.schema()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_lookup() {
        let cli = Cli::try_parse_from([
            "tryout", "--data", "hasil.json", "--scorer", "levenshtein", "lookup", "Ana", "--seq", "7",
        ])
        .unwrap();

        assert_eq!(cli.data, PathBuf::from("hasil.json"));
        assert_eq!(ScorerKind::from(cli.scorer), ScorerKind::Levenshtein);
        match cli.command {
            Commands::Lookup { name, seq, top, format } => {
                assert_eq!(name, "Ana");
                assert_eq!(seq.as_deref(), Some("7"));
                assert_eq!(top, 3);
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("expected lookup"),
        }
    }
}
