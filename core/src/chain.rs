//! Chain validation.
//!
//! A `Referee` judges one submitted word against the previous chain word and
//! proposes the opponent's continuation. `ChainValidator` is the local
//! referee backed by the idiom store; `remote::RemoteReferee` delegates to an
//! external service with the same contract.
//!
//! Rule violations come back as data (`is_valid == false`). Only store
//! failures are errors.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::idiom::JielongResponse;
use crate::idiom_store::IdiomStore;
use crate::suggestion::IDIOM_LEN;
use crate::Result;

/// Message attached to an accepted word the opponent cannot continue.
pub const CONCEDE_MESSAGE: &str = "夫子才疏学浅，接不上啦！你赢了！";

pub trait Referee {
    /// Judge `word` given the previous chain word, if any.
    fn submit(&self, word: &str, previous: Option<&str>) -> Result<JielongResponse>;
}

/// Why a submitted word was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not exactly four characters.
    WrongLength,
    /// Does not begin with the last character of the previous word.
    WrongLead(char),
    /// Structurally fine but not in the idiom table.
    NotFound,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::WrongLength => write!(f, "请输入四字成语哦"),
            Rejection::WrongLead(ch) => write!(f, "应该以“{}”开头哦", ch),
            Rejection::NotFound => write!(f, "未在辞海中查到此成语"),
        }
    }
}

impl Rejection {
    /// Recover the structured reason from a rejected response's message.
    pub fn from_message(message: &str) -> Option<Self> {
        if message == Rejection::WrongLength.to_string() {
            return Some(Rejection::WrongLength);
        }
        if message == Rejection::NotFound.to_string() {
            return Some(Rejection::NotFound);
        }
        let inner = message.strip_prefix("应该以“")?.strip_suffix("”开头哦")?;
        let mut chars = inner.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(Rejection::WrongLead(ch)),
            _ => None,
        }
    }
}

/// Structural checks that need no dataset: length and linking character.
pub fn check_structure(word: &str, previous: Option<&str>) -> std::result::Result<(), Rejection> {
    if word.chars().count() != IDIOM_LEN {
        return Err(Rejection::WrongLength);
    }
    if let Some(required) = previous.and_then(|p| p.chars().last()) {
        if word.chars().next() != Some(required) {
            return Err(Rejection::WrongLead(required));
        }
    }
    Ok(())
}

/// Local referee over the idiom store.
#[derive(Debug, Clone)]
pub struct ChainValidator {
    store: Rc<IdiomStore>,
}

impl ChainValidator {
    pub fn new(store: Rc<IdiomStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Rc<IdiomStore> {
        &self.store
    }
}

impl Referee for ChainValidator {
    fn submit(&self, word: &str, previous: Option<&str>) -> Result<JielongResponse> {
        if let Err(rejection) = check_structure(word, previous) {
            debug!(word, ?previous, %rejection, "structural rejection");
            return Ok(JielongResponse::rejected(rejection.to_string()));
        }

        let Some(user_idiom) = self.store.lookup_exact(word)? else {
            return Ok(JielongResponse::rejected(Rejection::NotFound.to_string()));
        };

        let ai_idiom = match user_idiom.last_char() {
            Some(last) => self.store.random_starting_with(last)?,
            None => None,
        };

        Ok(match ai_idiom {
            Some(ai) => JielongResponse::accepted(user_idiom, Some(ai)),
            None => JielongResponse {
                message: Some(CONCEDE_MESSAGE.to_string()),
                ..JielongResponse::accepted(user_idiom, None)
            },
        })
    }
}
