use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Genre;

/// Reasons a set of reader preferences cannot be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreferencesError {
    #[error("between 1 and 3 genres are required, got {0}")]
    GenreCount(usize),

    #[error("genre '{0}' was listed more than once")]
    DuplicateGenre(Genre),

    #[error("unknown genre: {0}")]
    UnknownGenre(String),

    #[error("between 2 and 3 favorite books are required, got {0}")]
    BookCount(usize),

    #[error("invalid book title: {0}")]
    InvalidTitle(String),

    #[error("book entry looks like an instruction rather than a title: {0}")]
    PromptInjection(String),

    #[error("familiarity level is not a number: {0}")]
    FamiliarityNotANumber(String),

    #[error("familiarity level must be between 1 and 4, got {0}")]
    FamiliarityOutOfRange(i64),
}

/// The completion service produced nothing usable within its own retry budget.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("model produced no usable output after {attempts} calls")]
pub struct TransportFailure {
    pub attempts: u32,
}

/// No extraction stage produced a JSON object.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("no JSON object could be extracted from the model output")]
pub struct ParseFailure;

/// A parsed payload that does not yield an acceptable recommendation batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationFailure {
    #[error("'recommendations' is missing or not a list")]
    MissingRecommendations,

    #[error("only {valid} acceptable recommendations (need {required})")]
    TooFewValid { valid: usize, required: usize },
}

/// Why one attempt of the pipeline was abandoned. Never leaves the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageFailure {
    #[error(transparent)]
    Transport(#[from] TransportFailure),

    #[error(transparent)]
    Parse(#[from] ParseFailure),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("only {remaining} recommendations left after removing already-delivered titles")]
    Excluded { remaining: usize },
}

impl StageFailure {
    pub fn stage(&self) -> &'static str {
        match self {
            StageFailure::Transport(_) => "invoking",
            StageFailure::Parse(_) => "parsing",
            StageFailure::Validation(_) => "validating",
            StageFailure::Excluded { .. } => "filtering",
        }
    }
}

/// The only failure a caller of the pipeline ever sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("could not generate recommendations after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
