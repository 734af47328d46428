//! Analyzed Tokens
//!
//! One morphological unit per token, plus the table that folds the
//! analyzer's part-of-speech spellings into style categories.

use serde::{Deserialize, Serialize};

/// Fallback category for unknown or missing tags
pub const DEFAULT_CATEGORY: &str = "default";

/// Every key [`normalize_pos`] can produce
pub const CATEGORIES: &[&str] = &[
    "名詞",
    "代名詞",
    "動詞",
    "形容詞",
    "副詞",
    "助詞",
    "接続詞",
    "感動詞",
    "助動詞",
    "連体詞",
    "接頭詞",
    "接尾辞",
    "補助記号",
    "形状詞",
    DEFAULT_CATEGORY,
];

/// Alternative spellings emitted by different dictionaries
const ALIASES: &[(&str, &str)] = &[
    ("接頭辞", "接頭詞"),
    ("接尾詞", "接尾辞"),
    ("記号", "補助記号"),
    ("形容動詞", "形状詞"),
];

/// A single analyzed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Exact text to match in the page
    pub surface: String,
    /// Raw tag from the analyzer
    #[serde(rename = "pos", default)]
    pub part_of_speech: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<String>,
    #[serde(
        rename = "dictionaryForm",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dictionary_form: Option<String>,
}

impl Token {
    pub fn new(surface: &str, part_of_speech: &str) -> Self {
        Self {
            surface: surface.to_string(),
            part_of_speech: part_of_speech.to_string(),
            reading: None,
            dictionary_form: None,
        }
    }

    /// Style category for this token
    pub fn category(&self) -> &'static str {
        normalize_pos(&self.part_of_speech)
    }
}

/// Map a part-of-speech tag to a style category key.
///
/// Hierarchical tags (`名詞-普通名詞-一般`, `名詞,一般`) are reduced to
/// their leading segment first. Anything unrecognized becomes
/// [`DEFAULT_CATEGORY`].
pub fn normalize_pos(tag: &str) -> &'static str {
    let head = tag
        .split(['-', ','])
        .next()
        .unwrap_or_default()
        .trim();

    if head.is_empty() {
        return DEFAULT_CATEGORY;
    }

    let head = ALIASES
        .iter()
        .find(|(alias, _)| *alias == head)
        .map(|(_, key)| *key)
        .unwrap_or(head);

    CATEGORIES
        .iter()
        .copied()
        .find(|key| *key == head)
        .unwrap_or(DEFAULT_CATEGORY)
}

/// Short log-friendly preview of user text
pub fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 20;
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{head}...")
}
