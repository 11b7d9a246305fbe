//! crates/diary_core/src/memory.rs
//!
//! In-memory implementations of the ports, for tests and local experiments.
//! Compiled for this crate's own tests and behind the `test-support` feature.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::analysis::AnalysisResult;
use crate::domain::{Entry, EntryDraft, User};
use crate::ports::{AnalysisService, DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    entries: Vec<Entry>,
    next_user_id: i64,
    next_entry_id: i64,
}

/// A `DatabaseService` backed by vectors behind a mutex.
#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    lookups: AtomicUsize,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_entry_by_date` calls served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store poisoned".to_string()))
    }
}

fn entry_not_found(entry_id: i64) -> PortError {
    PortError::NotFound(format!("Entry {} not found", entry_id))
}

fn apply_draft(entry: &mut Entry, draft: &EntryDraft) {
    entry.title = draft.title.clone();
    entry.original_lang = draft.original_lang;
    entry.original_text = draft.original_text.clone();
    entry.meta = draft.meta.clone();
    entry.updated_at = Utc::now();
}

fn insert(tables: &mut Tables, user_id: i64, date: NaiveDate, draft: &EntryDraft) -> Entry {
    tables.next_entry_id += 1;
    let now = Utc::now();
    let entry = Entry {
        id: tables.next_entry_id,
        user_id,
        date,
        title: draft.title.clone(),
        original_lang: draft.original_lang,
        original_text: draft.original_text.clone(),
        meta: draft.meta.clone(),
        analysis: None,
        created_at: now,
        updated_at: now,
    };
    tables.entries.push(entry.clone());
    entry
}

fn sorted_newest_first(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    entries
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn get_or_create_user(&self, toss_user_key: i64) -> PortResult<User> {
        let mut tables = self.lock()?;
        if let Some(user) = tables.users.iter().find(|u| u.toss_user_key == toss_user_key) {
            return Ok(user.clone());
        }
        tables.next_user_id += 1;
        let user = User {
            id: tables.next_user_id,
            toss_user_key,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: i64) -> PortResult<User> {
        self.lock()?
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_toss_key(&self, toss_user_key: i64) -> PortResult<User> {
        self.lock()?
            .users
            .iter()
            .find(|u| u.toss_user_key == toss_user_key)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User with key {} not found", toss_user_key)))
    }

    async fn get_entry(&self, user_id: i64, entry_id: i64) -> PortResult<Entry> {
        self.lock()?
            .entries
            .iter()
            .find(|e| e.id == entry_id && e.user_id == user_id)
            .cloned()
            .ok_or_else(|| entry_not_found(entry_id))
    }

    async fn find_entry_by_date(&self, user_id: i64, date: NaiveDate) -> PortResult<Option<Entry>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lock()?
            .entries
            .iter()
            .find(|e| e.user_id == user_id && e.date == date)
            .cloned())
    }

    async fn list_entries(&self, user_id: i64) -> PortResult<Vec<Entry>> {
        let entries = self
            .lock()?
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        Ok(sorted_newest_first(entries))
    }

    async fn list_entries_between(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PortResult<Vec<Entry>> {
        let entries = self
            .lock()?
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.date >= start && e.date <= end)
            .cloned()
            .collect();
        Ok(sorted_newest_first(entries))
    }

    async fn create_entry(&self, user_id: i64, date: NaiveDate, draft: &EntryDraft) -> PortResult<Entry> {
        let mut tables = self.lock()?;
        if tables.entries.iter().any(|e| e.user_id == user_id && e.date == date) {
            return Err(PortError::Conflict(format!("an entry already exists for {}", date)));
        }
        Ok(insert(&mut tables, user_id, date, draft))
    }

    async fn upsert_entry(
        &self,
        user_id: i64,
        date: NaiveDate,
        draft: &EntryDraft,
    ) -> PortResult<(Entry, bool)> {
        let mut tables = self.lock()?;
        if let Some(entry) = tables
            .entries
            .iter_mut()
            .find(|e| e.user_id == user_id && e.date == date)
        {
            apply_draft(entry, draft);
            return Ok((entry.clone(), false));
        }
        Ok((insert(&mut tables, user_id, date, draft), true))
    }

    async fn update_entry(&self, entry_id: i64, draft: &EntryDraft) -> PortResult<Entry> {
        let mut tables = self.lock()?;
        let entry = tables
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| entry_not_found(entry_id))?;
        apply_draft(entry, draft);
        Ok(entry.clone())
    }

    async fn save_analysis(&self, entry_id: i64, analysis: &AnalysisResult) -> PortResult<()> {
        let mut tables = self.lock()?;
        let entry = tables
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| entry_not_found(entry_id))?;
        entry.analysis = Some(analysis.clone());
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_entry(&self, user_id: i64, entry_id: i64) -> PortResult<()> {
        let mut tables = self.lock()?;
        let before = tables.entries.len();
        tables
            .entries
            .retain(|e| !(e.id == entry_id && e.user_id == user_id));
        if tables.entries.len() == before {
            return Err(entry_not_found(entry_id));
        }
        Ok(())
    }
}

/// An `AnalysisService` that replays queued responses in order and records
/// every prompt it was given.
pub struct ScriptedAnalysis {
    responses: Mutex<VecDeque<PortResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedAnalysis {
    pub fn new(responses: Vec<PortResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AnalysisService for ScriptedAnalysis {
    async fn call_model(&self, _system_instruction: &str, prompt: &str) -> PortResult<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.responses
            .lock()
            .map_err(|_| PortError::Unexpected("scripted responses poisoned".to_string()))?
            .pop_front()
            .unwrap_or_else(|| Err(PortError::Unexpected("no scripted response left".to_string())))
    }
}
