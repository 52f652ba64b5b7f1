//! Chain game session.
//!
//! `GameSession` owns the append-only chain of steps for one game. It asks a
//! `Referee` to judge each submission and, when the word is accepted,
//! appends the user's idiom and then the opponent's, each with a fresh
//! timestamp. Rejections and referee errors leave the chain untouched.
//! Any pacing between the two appends is the caller's business.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::chain::Referee;
use crate::idiom::{ChainStep, Idiom, JielongResponse, Speaker};
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct GameSession {
    steps: Vec<ChainStep>,
    last_timestamp: u64,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The most recent word in the chain.
    pub fn last_word(&self) -> Option<&str> {
        self.steps.last().map(|s| s.idiom.word.as_str())
    }

    /// The character the next word has to start with.
    pub fn required_lead(&self) -> Option<char> {
        self.steps.last().and_then(|s| s.idiom.last_char())
    }

    /// Submit `word` to `referee` against the current chain and record the
    /// outcome.
    pub fn play(&mut self, referee: &dyn Referee, word: &str) -> Result<JielongResponse> {
        let previous = self.last_word().map(str::to_owned);
        let response = referee.submit(word, previous.as_deref())?;
        self.record(&response);
        Ok(response)
    }

    /// Append the idioms of an accepted response: user first, then opponent.
    pub fn record(&mut self, response: &JielongResponse) {
        if !response.is_valid {
            return;
        }
        if let Some(user) = &response.user_idiom {
            self.push(user.clone(), Speaker::User);
        }
        if let Some(ai) = &response.ai_idiom {
            self.push(ai.clone(), Speaker::Opponent);
        }
    }

    /// Start over with an empty chain.
    pub fn restart(&mut self) {
        self.steps.clear();
    }

    fn push(&mut self, idiom: Idiom, speaker: Speaker) {
        let timestamp = self.next_timestamp();
        self.steps.push(ChainStep {
            idiom,
            speaker,
            timestamp,
        });
    }

    /// Wall clock milliseconds, bumped when needed so timestamps strictly
    /// increase even across a restart.
    fn next_timestamp(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let ts = now.max(self.last_timestamp + 1);
        self.last_timestamp = ts;
        ts
    }
}
