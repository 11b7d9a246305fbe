//! crates/diary_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analysis::AnalysisResult;

/// Free-form entry metadata (mood, weather, ...). Passed through verbatim.
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// The language a diary entry was originally written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Ko,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Ko => "ko",
        }
    }

    /// The language an analysis translates this entry into.
    pub fn counterpart(&self) -> Lang {
        match self {
            Lang::En => Lang::Ko,
            Lang::Ko => Lang::En,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Lang::En),
            "ko" => Ok(Lang::Ko),
            other => Err(format!("\"{}\" is not a valid choice (en, ko)", other)),
        }
    }
}

/// An application user, identified towards the identity provider by `toss_user_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub toss_user_key: i64,
    pub created_at: DateTime<Utc>,
}

/// A single diary entry. At most one exists per (user, date).
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub title: String,
    pub original_lang: Lang,
    pub original_text: String,
    pub meta: Meta,
    pub analysis: Option<AnalysisResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user-editable fields of an entry, as written by create/upsert.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntryDraft {
    pub title: String,
    pub original_lang: Lang,
    pub original_text: String,
    pub meta: Meta,
}

/// Whether an upsert-by-date inserted a new row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    pub action: UpsertAction,
}

/// A short learning sentence with its Korean nuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub en: String,
    pub ko: String,
}
