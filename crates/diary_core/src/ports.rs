//! crates/diary_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::analysis::AnalysisResult;
use crate::domain::{Entry, EntryDraft, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid value for {field}: {message}")]
    Validation { field: String, message: String },
    #[error("{0}")]
    MissingParameter(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The upstream AI provider signalled rate limiting or an exhausted quota.
    #[error("Upstream quota exceeded: {0}")]
    RateLimited(String),
    /// The upstream AI provider or the network to it failed.
    #[error("Upstream service error: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

impl PortError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PortError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn get_or_create_user(&self, toss_user_key: i64) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User>;

    async fn get_user_by_toss_key(&self, toss_user_key: i64) -> PortResult<User>;

    // --- Entry Reads (always scoped to the owning user) ---
    async fn get_entry(&self, user_id: i64, entry_id: i64) -> PortResult<Entry>;

    async fn find_entry_by_date(&self, user_id: i64, date: NaiveDate) -> PortResult<Option<Entry>>;

    /// All entries of a user, newest date first, then highest id first.
    async fn list_entries(&self, user_id: i64) -> PortResult<Vec<Entry>>;

    /// Entries whose date falls in `[start, end]`, inclusive on both ends.
    async fn list_entries_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PortResult<Vec<Entry>>;

    // --- Entry Writes ---

    /// Inserts a new entry. Fails with `PortError::Conflict` if the user already
    /// has an entry on `date`.
    async fn create_entry(&self, user_id: i64, date: NaiveDate, draft: &EntryDraft) -> PortResult<Entry>;

    /// Inserts the entry for (user, date), or overwrites the editable fields of
    /// the existing one in the same statement. Returns the entry and whether it
    /// was newly inserted. `analysis` of an existing entry is left untouched.
    async fn upsert_entry(
        &self,
        user_id: i64,
        date: NaiveDate,
        draft: &EntryDraft,
    ) -> PortResult<(Entry, bool)>;

    /// Overwrites title, language, text and meta of an existing entry.
    async fn update_entry(&self, entry_id: i64, draft: &EntryDraft) -> PortResult<Entry>;

    /// Replaces the stored analysis and bumps `updated_at`. No other column changes.
    async fn save_analysis(&self, entry_id: i64, analysis: &AnalysisResult) -> PortResult<()>;

    async fn delete_entry(&self, user_id: i64, entry_id: i64) -> PortResult<()>;
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Sends one completion request and returns the model's raw text output.
    async fn call_model(&self, system_instruction: &str, prompt: &str) -> PortResult<String>;
}
