//! Display names and caller-facing messages for the supported languages.
//!
//! Everything here takes the [`Language`] explicitly; there is no notion of a
//! process-wide "current" language.

use crate::error::PreferencesError;
use crate::models::{Genre, Language};

pub fn genre_display_name(genre: Genre, language: Language) -> &'static str {
    match language {
        Language::En => genre.as_str(),
        Language::Zh => match genre {
            Genre::ScienceFiction => "科幻",
            Genre::Fantasy => "奇幻",
            Genre::Mystery => "悬疑",
            Genre::Thriller => "惊悚",
            Genre::Romance => "爱情",
            Genre::Nonfiction => "非虚构",
            Genre::Historical => "历史",
            Genre::Feminism => "女性主义",
            Genre::Psychology => "心理学",
        },
    }
}

pub fn genre_display_names(language: Language) -> Vec<&'static str> {
    Genre::ALL
        .iter()
        .map(|genre| genre_display_name(*genre, language))
        .collect()
}

/// Map a user-typed genre name to a [`Genre`]. The requested language is
/// tried first, then English.
pub fn lookup_genre(input: &str, language: Language) -> Option<Genre> {
    let normalized = input.trim().to_lowercase();
    let find = |lang: Language| {
        Genre::ALL
            .iter()
            .copied()
            .find(|genre| genre_display_name(*genre, lang) == normalized)
    };
    find(language).or_else(|| find(Language::En))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    GenerationFailed,
    TryAgainLater,
    GenreCount,
    GenreDuplicate,
    UnknownGenre,
    BookCount,
    BookInvalid,
    BookInjection,
    FamiliarityNotANumber,
    FamiliarityRange,
    UnsupportedLanguage,
    InvalidRequestBody,
}

impl Message {
    pub fn text(self, language: Language) -> &'static str {
        match (self, language) {
            (Message::GenerationFailed, Language::En) => {
                "Sorry, BookBot couldn't generate valid recommendations right now."
            }
            (Message::GenerationFailed, Language::Zh) => "抱歉，我暂时无法生成有效的推荐。",
            (Message::TryAgainLater, Language::En) => "Please try again later.",
            (Message::TryAgainLater, Language::Zh) => "请稍后再试。",
            (Message::GenreCount, Language::En) => "Please pick between 1 and 3 genres.",
            (Message::GenreCount, Language::Zh) => "请选择 1 到 3 个类型。",
            (Message::GenreDuplicate, Language::En) => "Each genre can only be listed once.",
            (Message::GenreDuplicate, Language::Zh) => "每个类型只能选一次。",
            (Message::UnknownGenre, Language::En) => "Unknown genre",
            (Message::UnknownGenre, Language::Zh) => "无法识别的类型",
            (Message::BookCount, Language::En) => "Please name exactly 2 or 3 books.",
            (Message::BookCount, Language::Zh) => "请提供 2 到 3 本书。",
            (Message::BookInvalid, Language::En) => {
                "Book titles need actual words and must be under 200 characters"
            }
            (Message::BookInvalid, Language::Zh) => "书名应包含实际文字且不超过 200 个字符",
            (Message::BookInjection, Language::En) => {
                "That doesn't look like a book title to me!"
            }
            (Message::BookInjection, Language::Zh) => "这看起来不太像书名哦！",
            (Message::FamiliarityNotANumber, Language::En) => {
                "That's not a number! I need a digit between 1 and 4."
            }
            (Message::FamiliarityNotANumber, Language::Zh) => "这不是数字哦！请给出 1 到 4 之间的数字。",
            (Message::FamiliarityRange, Language::En) => {
                "Familiarity must be 1, 2, 3, or 4."
            }
            (Message::FamiliarityRange, Language::Zh) => "熟悉程度只能选 1、2、3 或 4。",
            (Message::UnsupportedLanguage, Language::En) => "Unsupported language",
            (Message::UnsupportedLanguage, Language::Zh) => "不支持的语言",
            (Message::InvalidRequestBody, Language::En) => "Invalid request body",
            (Message::InvalidRequestBody, Language::Zh) => "请求内容无效",
        }
    }
}

/// Caller-facing text for a rejected set of preferences.
pub fn preferences_error_message(error: &PreferencesError, language: Language) -> String {
    match error {
        PreferencesError::GenreCount(_) => Message::GenreCount.text(language).to_string(),
        PreferencesError::DuplicateGenre(_) => Message::GenreDuplicate.text(language).to_string(),
        PreferencesError::UnknownGenre(genre) => {
            format!("{}: {}", Message::UnknownGenre.text(language), genre)
        }
        PreferencesError::BookCount(_) => Message::BookCount.text(language).to_string(),
        PreferencesError::InvalidTitle(title) => {
            format!("{}: {}", Message::BookInvalid.text(language), title)
        }
        PreferencesError::PromptInjection(_) => Message::BookInjection.text(language).to_string(),
        PreferencesError::FamiliarityNotANumber(_) => {
            Message::FamiliarityNotANumber.text(language).to_string()
        }
        PreferencesError::FamiliarityOutOfRange(_) => {
            Message::FamiliarityRange.text(language).to_string()
        }
    }
}

/// The single message shown when the pipeline gives up.
pub fn generation_failed_message(language: Language) -> String {
    format!(
        "{} {}",
        Message::GenerationFailed.text(language),
        Message::TryAgainLater.text(language)
    )
}
