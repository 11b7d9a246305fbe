//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diary_core::analysis::AnalysisResult;
use diary_core::domain::{Entry, EntryDraft, Meta, User};
use diary_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

const ENTRY_COLUMNS: &str = "id, user_id, entry_date, title, original_lang, original_text, \
                             meta, analysis, created_at, updated_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    toss_user_key: i64,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            toss_user_key: self.toss_user_key,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct EntryRecord {
    id: i64,
    user_id: i64,
    entry_date: NaiveDate,
    title: String,
    original_lang: String,
    original_text: String,
    meta: Json<Meta>,
    analysis: Option<Json<AnalysisResult>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl EntryRecord {
    fn to_domain(self) -> PortResult<Entry> {
        let original_lang = self
            .original_lang
            .parse()
            .map_err(|e: String| PortError::Unexpected(format!("Entry {}: {}", self.id, e)))?;
        Ok(Entry {
            id: self.id,
            user_id: self.user_id,
            date: self.entry_date,
            title: self.title,
            original_lang,
            original_text: self.original_text,
            meta: self.meta.0,
            analysis: self.analysis.map(|a| a.0),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct UpsertedEntryRecord {
    #[sqlx(flatten)]
    entry: EntryRecord,
    inserted: bool,
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn entry_not_found(entry_id: i64) -> PortError {
    PortError::NotFound(format!("Entry {} not found", entry_id))
}

fn to_domain_list(records: Vec<EntryRecord>) -> PortResult<Vec<Entry>> {
    records.into_iter().map(EntryRecord::to_domain).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_or_create_user(&self, toss_user_key: i64) -> PortResult<User> {
        sqlx::query("INSERT INTO users (toss_user_key) VALUES ($1) ON CONFLICT (toss_user_key) DO NOTHING")
            .bind(toss_user_key)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        self.get_user_by_toss_key(toss_user_key).await
    }

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, toss_user_key, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_toss_key(&self, toss_user_key: i64) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, toss_user_key, created_at FROM users WHERE toss_user_key = $1",
        )
        .bind(toss_user_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("User with key {} not found", toss_user_key)))?;
        Ok(record.to_domain())
    }

    async fn get_entry(&self, user_id: i64, entry_id: i64) -> PortResult<Entry> {
        let sql = format!("SELECT {} FROM entries WHERE id = $1 AND user_id = $2", ENTRY_COLUMNS);
        sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| entry_not_found(entry_id))?
            .to_domain()
    }

    async fn find_entry_by_date(&self, user_id: i64, date: NaiveDate) -> PortResult<Option<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries WHERE user_id = $1 AND entry_date = $2",
            ENTRY_COLUMNS
        );
        sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .map(EntryRecord::to_domain)
            .transpose()
    }

    async fn list_entries(&self, user_id: i64) -> PortResult<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries WHERE user_id = $1 ORDER BY entry_date DESC, id DESC",
            ENTRY_COLUMNS
        );
        let records = sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        to_domain_list(records)
    }

    async fn list_entries_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PortResult<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries WHERE user_id = $1 AND entry_date BETWEEN $2 AND $3 \
             ORDER BY entry_date DESC, id DESC",
            ENTRY_COLUMNS
        );
        let records = sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        to_domain_list(records)
    }

    async fn create_entry(&self, user_id: i64, date: NaiveDate, draft: &EntryDraft) -> PortResult<Entry> {
        let sql = format!(
            "INSERT INTO entries (user_id, entry_date, title, original_lang, original_text, meta) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            ENTRY_COLUMNS
        );
        sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .bind(&draft.title)
            .bind(draft.original_lang.as_str())
            .bind(&draft.original_text)
            .bind(Json(&draft.meta))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("an entry already exists for {}", date))
                }
                other => unexpected(other),
            })?
            .to_domain()
    }

    async fn upsert_entry(
        &self,
        user_id: i64,
        date: NaiveDate,
        draft: &EntryDraft,
    ) -> PortResult<(Entry, bool)> {
        // `xmax = 0` holds only for a freshly inserted row version.
        let sql = format!(
            "INSERT INTO entries (user_id, entry_date, title, original_lang, original_text, meta) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id, entry_date) DO UPDATE SET \
                 title = EXCLUDED.title, \
                 original_lang = EXCLUDED.original_lang, \
                 original_text = EXCLUDED.original_text, \
                 meta = EXCLUDED.meta, \
                 updated_at = NOW() \
             RETURNING {}, (xmax = 0) AS inserted",
            ENTRY_COLUMNS
        );
        let record = sqlx::query_as::<_, UpsertedEntryRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .bind(&draft.title)
            .bind(draft.original_lang.as_str())
            .bind(&draft.original_text)
            .bind(Json(&draft.meta))
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok((record.entry.to_domain()?, record.inserted))
    }

    async fn update_entry(&self, entry_id: i64, draft: &EntryDraft) -> PortResult<Entry> {
        let sql = format!(
            "UPDATE entries SET title = $1, original_lang = $2, original_text = $3, meta = $4, \
             updated_at = NOW() WHERE id = $5 RETURNING {}",
            ENTRY_COLUMNS
        );
        sqlx::query_as::<_, EntryRecord>(&sql)
            .bind(&draft.title)
            .bind(draft.original_lang.as_str())
            .bind(&draft.original_text)
            .bind(Json(&draft.meta))
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| entry_not_found(entry_id))?
            .to_domain()
    }

    async fn save_analysis(&self, entry_id: i64, analysis: &AnalysisResult) -> PortResult<()> {
        let result = sqlx::query("UPDATE entries SET analysis = $1, updated_at = NOW() WHERE id = $2")
            .bind(Json(analysis))
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(entry_not_found(entry_id));
        }
        Ok(())
    }

    async fn delete_entry(&self, user_id: i64, entry_id: i64) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(entry_not_found(entry_id));
        }
        Ok(())
    }
}
