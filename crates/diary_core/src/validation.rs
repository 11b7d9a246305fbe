//! crates/diary_core/src/validation.rs
//!
//! Field rules applied when a new entry is created.

use chrono::NaiveDate;

use crate::domain::{EntryDraft, Lang, Meta};
use crate::ports::{PortError, PortResult};

pub const MIN_TEXT_CHARS: usize = 30;
pub const MIN_TEXT_WORDS: usize = 3;
pub const MAX_TITLE_CHARS: usize = 200;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Checks a draft against the entry-creation rules.
///
/// `original_text` must hold at least `MIN_TEXT_CHARS` characters once trimmed
/// and at least `MIN_TEXT_WORDS` whitespace-separated words.
pub fn validate_new_entry(draft: &EntryDraft) -> PortResult<()> {
    if draft.title.chars().count() > MAX_TITLE_CHARS {
        return Err(PortError::validation(
            "title",
            format!("must be at most {} characters", MAX_TITLE_CHARS),
        ));
    }

    let text = draft.original_text.trim();
    if text.chars().count() < MIN_TEXT_CHARS || text.split_whitespace().count() < MIN_TEXT_WORDS {
        return Err(PortError::validation(
            "original_text",
            format!(
                "the entry is too short (at least {} characters and {} words)",
                MIN_TEXT_CHARS, MIN_TEXT_WORDS
            ),
        ));
    }

    Ok(())
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &str, value: &str) -> PortResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| PortError::validation(field, "must be a date in YYYY-MM-DD format"))
}

pub fn parse_lang(value: &str) -> PortResult<Lang> {
    value
        .parse::<Lang>()
        .map_err(|message| PortError::validation("original_lang", message))
}

/// Accepts a JSON object or null (treated as empty) for `meta`.
pub fn parse_meta(value: Option<serde_json::Value>) -> PortResult<Meta> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(Meta::new()),
        Some(serde_json::Value::Object(map)) => Ok(map),
        Some(_) => Err(PortError::validation("meta", "must be a JSON object")),
    }
}
