//! Idiom records and chain data model.
//!
//! - `Idiom`: a four-character set phrase with romanization and notes
//! - `Speaker` / `ChainStep`: one entry of a chain game
//! - `JielongResponse`: outcome of submitting a word to a referee
//!
//! `JielongResponse` and `Idiom` serialize with camelCase field names so the
//! same shapes can travel over the remote referee protocol.

use serde::{Deserialize, Serialize};

/// Placeholder used when a row carries no meaning text.
pub const NO_EXPLANATION: &str = "暂无解释";
/// Placeholder used when a row carries no origin story.
pub const NO_DERIVATION: &str = "暂无典故";

/// A four-character idiom.
///
/// Idioms are value objects rebuilt on every query; two idioms are the same
/// idiom when their `word` is equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idiom {
    pub word: String,
    /// Per-character romanization joined by single spaces.
    pub pinyin: String,
    pub explanation: String,
    pub derivation: String,
    #[serde(default)]
    pub example: String,
}

impl Idiom {
    /// Build an idiom from the raw columns of one `idiom` row.
    ///
    /// Missing character or romanization columns contribute nothing. Empty
    /// meaning and origin fall back to the placeholder texts.
    pub fn from_columns(
        chars: [Option<String>; 4],
        pinyin: [Option<String>; 4],
        mean: Option<String>,
        source: Option<String>,
        example: Option<String>,
    ) -> Self {
        let word: String = chars.iter().flatten().map(String::as_str).collect();
        let pinyin = pinyin
            .iter()
            .map(|p| p.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();

        Self {
            word,
            pinyin,
            explanation: non_empty_or(mean, NO_EXPLANATION),
            derivation: non_empty_or(source, NO_DERIVATION),
            example: example.unwrap_or_default(),
        }
    }

    pub fn first_char(&self) -> Option<char> {
        self.word.chars().next()
    }

    pub fn last_char(&self) -> Option<char> {
        self.word.chars().last()
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => fallback.to_string(),
    }
}

/// Who contributed a chain step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Opponent,
}

/// One entry of a chain.
///
/// `timestamp` is milliseconds since the Unix epoch and only orders steps for
/// display; it increases strictly within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub idiom: Idiom,
    pub speaker: Speaker,
    pub timestamp: u64,
}

/// Result of submitting a word to a referee.
///
/// A rejected word has `is_valid == false` and a human readable `message`.
/// An accepted word always carries `user_idiom`; `ai_idiom` is absent when
/// the opponent cannot continue, in which case `message` says so.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JielongResponse {
    pub is_valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_idiom: Option<Idiom>,
    #[serde(default)]
    pub ai_idiom: Option<Idiom>,
}

impl JielongResponse {
    pub fn rejected<M: Into<String>>(message: M) -> Self {
        Self {
            is_valid: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn accepted(user_idiom: Idiom, ai_idiom: Option<Idiom>) -> Self {
        Self {
            is_valid: true,
            message: None,
            user_idiom: Some(user_idiom),
            ai_idiom,
        }
    }
}
