use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::error::PreferencesError;

pub const MIN_GENRES: usize = 1;
pub const MAX_GENRES: usize = 3;
pub const MIN_FAVORITE_BOOKS: usize = 2;
pub const MAX_FAVORITE_BOOKS: usize = 3;
pub const MAX_TITLE_CHARS: usize = 200;

static PROMPT_INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)ignore previous instructions",
        r"(?i)pretend you are",
        r"(?i)disregard.*prompt",
        r"(?i)forget your instructions",
        r"(?i)you are now",
        r"(?i)act as if",
        r"(?i)new persona",
        r"(?i)override.*system",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid prompt-injection pattern"))
    .collect()
});

/// Language used for model instructions and caller-facing messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim().to_lowercase();
        Language::ALL
            .into_iter()
            .find(|language| language.code() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    #[serde(rename = "science fiction")]
    ScienceFiction,
    Fantasy,
    Mystery,
    Thriller,
    Romance,
    Nonfiction,
    Historical,
    Feminism,
    Psychology,
}

impl Genre {
    pub const ALL: [Genre; 9] = [
        Genre::ScienceFiction,
        Genre::Fantasy,
        Genre::Mystery,
        Genre::Thriller,
        Genre::Romance,
        Genre::Nonfiction,
        Genre::Historical,
        Genre::Feminism,
        Genre::Psychology,
    ];

    /// Internal identifier, also used verbatim in prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Genre::ScienceFiction => "science fiction",
            Genre::Fantasy => "fantasy",
            Genre::Mystery => "mystery",
            Genre::Thriller => "thriller",
            Genre::Romance => "romance",
            Genre::Nonfiction => "nonfiction",
            Genre::Historical => "historical",
            Genre::Feminism => "feminism",
            Genre::Psychology => "psychology",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How adventurous the reader wants the picks to be, from 1 (safe) to 4 (surprise me).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct FamiliarityLevel(u8);

impl FamiliarityLevel {
    pub fn new(level: i64) -> Result<Self, PreferencesError> {
        match level {
            1..=4 => Ok(Self(level as u8)),
            other => Err(PreferencesError::FamiliarityOutOfRange(other)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Natural-language description used only in the user prompt.
    pub fn description(self) -> &'static str {
        match self.0 {
            1 => "very familiar, well-known classics and bestsellers",
            2 => "mostly familiar titles with a few lesser-known picks",
            3 => "a mix of familiar favorites and hidden gems",
            _ => "surprise me with unexpected, lesser-known books",
        }
    }
}

impl TryFrom<i64> for FamiliarityLevel {
    type Error = PreferencesError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FamiliarityLevel> for i64 {
    fn from(level: FamiliarityLevel) -> Self {
        i64::from(level.0)
    }
}

/// Validated reader preferences. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPreferences")]
pub struct Preferences {
    genres: Vec<Genre>,
    favorite_books: Vec<String>,
    familiarity_level: FamiliarityLevel,
}

#[derive(Deserialize)]
struct RawPreferences {
    genres: Vec<Genre>,
    favorite_books: Vec<String>,
    familiarity_level: FamiliarityLevel,
}

impl TryFrom<RawPreferences> for Preferences {
    type Error = PreferencesError;

    fn try_from(raw: RawPreferences) -> Result<Self, Self::Error> {
        Preferences::new(raw.genres, raw.favorite_books, raw.familiarity_level)
    }
}

impl Preferences {
    pub fn new(
        genres: Vec<Genre>,
        favorite_books: Vec<String>,
        familiarity_level: FamiliarityLevel,
    ) -> Result<Self, PreferencesError> {
        if !(MIN_GENRES..=MAX_GENRES).contains(&genres.len()) {
            return Err(PreferencesError::GenreCount(genres.len()));
        }
        let mut seen = HashSet::new();
        for genre in &genres {
            if !seen.insert(*genre) {
                return Err(PreferencesError::DuplicateGenre(*genre));
            }
        }

        let favorite_books: Vec<String> = favorite_books
            .into_iter()
            .map(|title| title.trim().to_string())
            .collect();
        if !(MIN_FAVORITE_BOOKS..=MAX_FAVORITE_BOOKS).contains(&favorite_books.len()) {
            return Err(PreferencesError::BookCount(favorite_books.len()));
        }
        for title in &favorite_books {
            if contains_prompt_injection(title) {
                return Err(PreferencesError::PromptInjection(title.clone()));
            }
            if !is_plausible_title(title) {
                return Err(PreferencesError::InvalidTitle(title.clone()));
            }
        }

        Ok(Self {
            genres,
            favorite_books,
            familiarity_level,
        })
    }

    pub fn genres(&self) -> &[Genre] {
        &self.genres
    }

    pub fn favorite_books(&self) -> &[String] {
        &self.favorite_books
    }

    pub fn familiarity_level(&self) -> FamiliarityLevel {
        self.familiarity_level
    }
}

/// A title must have some real text in it: Latin letters, digits or CJK ideographs.
fn is_plausible_title(title: &str) -> bool {
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return false;
    }
    title
        .chars()
        .any(|c| c.is_ascii_alphanumeric() || ('\u{4e00}'..='\u{9fff}').contains(&c))
}

pub fn contains_prompt_injection(text: &str) -> bool {
    PROMPT_INJECTION_PATTERNS.iter().any(|re| re.is_match(text))
}

/// One validated book recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub explanation: String,
}

impl Recommendation {
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Ordered, validated, deduplicated recommendations (3 to 5 on success).
pub type ResultSet = Vec<Recommendation>;

/// Titles compare equal when they match after trimming and lower-casing.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Request body for `/api/recommend`. Language and familiarity are kept loose
/// so that bad values get a 400 with a readable message from the handler.
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub session_id: Option<String>,
    /// Language code; `en` when absent.
    pub language: Option<String>,
    /// Genre display names in `language` (English names are always accepted).
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub favorite_books: Vec<String>,
    pub familiarity_level: Option<serde_json::Value>,
    /// Extra titles the caller has already seen.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub session_id: String,
    pub recommendations: ResultSet,
}
