//! Prompt construction. Pure: preferences, exclusions and language in, two strings out.

use serde::{Deserialize, Serialize};

use crate::models::{Language, Preferences};

const SYSTEM_PROMPT_EN: &str = r#"You are a veteran librarian and reader-advisory specialist with more than twenty years of experience matching readers with books.

Task: read the user's genres, favorite books and familiarity preference, then recommend the 3 to 5 books that best fit that profile.

Rules:
- Recommend only real, published books by their real authors. Never invent a title or an author.
- The explanation must be warm and conversational, written directly to the reader, 1 to 3 sentences long.
- publication_year must be a bare integer, never a string.
- The array must contain at least 3 and at most 5 books.

Output: reply with exactly one JSON object and nothing else. No introduction, no closing remarks, no markdown code fences. The object must have this shape:
{
  "recommendations": [
    {
      "title": "string",
      "author": "string",
      "publication_year": 1999,
      "explanation": "string"
    }
  ]
}"#;

const SYSTEM_PROMPT_ZH: &str = r#"你是一位有二十多年经验的资深图书馆员和阅读顾问，擅长为读者挑选真正适合他们的书。

任务：根据用户给出的喜爱类型、喜欢的书和熟悉程度偏好，用中文推荐 3 到 5 本最契合的书。

规则：
- 只推荐真实出版过的书和真实的作者，绝不虚构书名或作者。
- explanation 字段用亲切自然、像聊天一样的语气直接对读者说，1 到 3 句话。
- publication_year 必须是整数，不能加引号。
- 数组中至少 3 本、至多 5 本书。

输出：只回复一个 JSON 对象，不要有任何其他文字，不要前言或结语，不要使用 Markdown 代码块。对象结构如下：
{
  "recommendations": [
    {
      "title": "书名",
      "author": "作者",
      "publication_year": 1999,
      "explanation": "推荐理由"
    }
  ]
}"#;

const CLOSING_INSTRUCTION: &str = "Please recommend 3 to 5 books as a single JSON object with the key \
\"recommendations\" holding an array of objects with the keys: title, author, publication_year, explanation.";

/// The two instruction strings sent to the model for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system_text: String,
    pub user_text: String,
}

pub fn system_prompt(language: Language) -> &'static str {
    match language {
        Language::En => SYSTEM_PROMPT_EN,
        Language::Zh => SYSTEM_PROMPT_ZH,
    }
}

/// Build the user instruction. Every excluded title is listed verbatim, one
/// per line, ahead of the closing instruction.
pub fn user_prompt(preferences: &Preferences, exclusion: &[String]) -> String {
    let genres = preferences
        .genres()
        .iter()
        .map(|genre| genre.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let books = preferences.favorite_books().join(", ");
    let familiarity = preferences.familiarity_level().description();

    let mut prompt = format!(
        "I enjoy these genres: {genres}.\n\
         Some books I love: {books}.\n\
         For familiarity, I'd like: {familiarity}.\n\n"
    );

    if !exclusion.is_empty() {
        prompt.push_str(
            "IMPORTANT: Do NOT recommend any of these books, which have already been suggested:\n",
        );
        for title in exclusion {
            prompt.push_str("  - ");
            prompt.push_str(title);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str(CLOSING_INSTRUCTION);
    prompt
}

pub fn build_prompt(preferences: &Preferences, exclusion: &[String], language: Language) -> Prompt {
    Prompt {
        system_text: system_prompt(language).to_string(),
        user_text: user_prompt(preferences, exclusion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FamiliarityLevel, Genre};

    fn preferences() -> Preferences {
        Preferences::new(
            vec![Genre::ScienceFiction, Genre::Mystery],
            vec!["Dune".to_string(), "Gone Girl".to_string()],
            FamiliarityLevel::new(4).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_user_prompt_lists_preferences() {
        let text = user_prompt(&preferences(), &[]);

        assert!(text.starts_with("I enjoy these genres: science fiction, mystery.\n"));
        assert!(text.contains("Some books I love: Dune, Gone Girl.\n"));
        assert!(text.contains("surprise me with unexpected, lesser-known books"));
        assert!(!text.contains("Do NOT recommend"));
        assert!(text.ends_with(CLOSING_INSTRUCTION));
    }

    #[test]
    fn test_exclusions_listed_before_closing_instruction() {
        let exclusion = vec!["The Martian".to_string(), "Project Hail Mary".to_string()];
        let text = user_prompt(&preferences(), &exclusion);

        let block = text.find("Do NOT recommend").unwrap();
        let first = text.find("  - The Martian\n").unwrap();
        let second = text.find("  - Project Hail Mary\n").unwrap();
        let closing = text.find(CLOSING_INSTRUCTION).unwrap();

        assert!(block < first && first < second && second < closing);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let exclusion = vec!["Emma".to_string()];
        assert_eq!(
            build_prompt(&preferences(), &exclusion, Language::En),
            build_prompt(&preferences(), &exclusion, Language::En)
        );
    }

    #[test]
    fn test_system_prompt_follows_language() {
        let en = build_prompt(&preferences(), &[], Language::En);
        let zh = build_prompt(&preferences(), &[], Language::Zh);

        assert!(en.system_text.contains("\"recommendations\""));
        assert!(zh.system_text.contains("\"recommendations\""));
        assert_ne!(en.system_text, zh.system_text);
        assert_eq!(en.user_text, zh.user_text);
    }
}
