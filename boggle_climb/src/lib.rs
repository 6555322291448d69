//! Boggle hill-climb search and score-curve reporting library implemented in
//! Rust.
//!
//! The search rolls random boards, scores them against a dictionary trie, and
//! climbs by re-rolling one cell at a time; every new best score is appended
//! to a CSV score log. The curve side reads that log back and derives the
//! score-over-time series the report chart is drawn from.

pub mod board;
pub mod curve;
pub mod search;
pub mod solver;
pub mod trie;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoggleError {
    #[error("failed to read dictionary: {0}")]
    Dictionary(String),
    #[error("failed to parse board: {0}")]
    BoardParse(String),
    #[error("failed to read score log: {0}")]
    LogRead(String),
    #[error("failed to parse score log: {0}")]
    LogParse(String),
    #[error("failed to write score log: {0}")]
    LogWrite(String),
    #[error("score log has no observations")]
    EmptyLog,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub use board::{Board, DiceSet};
pub use curve::{
    read_score_log, read_score_log_file, Observation, ScoreCurve, REFERENCE_SCORE, TREND_HORIZON_S,
};
pub use search::{
    mutate_board, run_search, BigramFrequencies, Improvement, SearchParams, SearchSummary,
};
pub use solver::{load_words, FoundWord, Solution, Solver, MIN_WORD_LEN};
pub use trie::Trie;
