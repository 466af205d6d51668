//! Metadata filter shared by dense queries and sparse scans.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Payload;

/// Conjunction of optional payload conditions.
///
/// `author_id` and `chat_id` are equality matches; `since`/`until` bound the
/// timestamp inclusively. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub author_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub since: Option<f64>,
    pub until: Option<f64>,
}

impl SearchFilter {
    pub fn author(author_id: i64) -> Self {
        Self { author_id: Some(author_id), ..Self::default() }
    }

    pub fn chat(chat_id: i64) -> Self {
        Self { chat_id: Some(chat_id), ..Self::default() }
    }

    pub fn between(since: Option<f64>, until: Option<f64>) -> Self {
        Self { since, until, ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.author_id.is_none()
            && self.chat_id.is_none()
            && self.since.is_none()
            && self.until.is_none()
    }

    /// Rejects bounds a backend cannot express. Called by the stores, not by
    /// the query path.
    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [("since", self.since), ("until", self.until)] {
            if let Some(v) = bound {
                if !v.is_finite() {
                    return Err(Error::InvalidFilter(format!("{name} must be finite, got {v}")));
                }
            }
        }
        Ok(())
    }

    pub fn matches(&self, payload: &Payload) -> bool {
        if self.author_id.is_some_and(|a| a != payload.author_id) {
            return false;
        }
        if self.chat_id.is_some_and(|c| c != payload.chat_id) {
            return false;
        }
        if self.since.is_some_and(|s| payload.timestamp < s) {
            return false;
        }
        if self.until.is_some_and(|u| payload.timestamp > u) {
            return false;
        }
        true
    }
}
