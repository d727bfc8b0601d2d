//! BookBot: reading preferences in, three to five validated book
//! recommendations out.
//!
//! The generation pipeline builds a prompt once, then runs up to
//! [`llm::MAX_RETRIES`] attempts of invoke, parse, validate and exclude as a
//! [`bookbot_flow`] graph. Any stage failure aborts the attempt; running out
//! of attempts is the only failure a caller sees.

pub mod config;
pub mod error;
pub mod exclusion;
pub mod history;
pub mod i18n;
pub mod llm;
pub mod models;
pub mod parser;
pub mod prompt;
pub mod service;
pub mod tasks;
pub mod validator;
pub mod workflow;

pub use error::{GenerationError, PreferencesError};
pub use llm::{ModelClient, ModelInvoker, OpenRouterModel};
pub use models::{FamiliarityLevel, Genre, Language, Preferences, Recommendation, ResultSet};
pub use workflow::Orchestrator;
