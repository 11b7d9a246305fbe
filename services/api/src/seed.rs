//! services/api/src/seed.rs
//!
//! Demo entries for local development.

use chrono::NaiveDate;
use diary_core::domain::{EntryDraft, Lang, Meta};
use diary_core::ports::{DatabaseService, PortResult};
use serde_json::Value;
use tracing::info;

/// Days of October 2025 that receive a demo entry.
pub const DEMO_DAYS: [u32; 4] = [1, 3, 7, 11];

fn demo_draft(n: usize) -> EntryDraft {
    let mut meta = Meta::new();
    meta.insert("weather".to_string(), Value::from("sunny"));
    meta.insert("mood".to_string(), Value::from("good"));
    EntryDraft {
        title: format!("Dummy #{}", n),
        original_lang: Lang::En,
        original_text: "This is a demo text.".to_string(),
        meta,
    }
}

/// Gives the user with `user_key` one demo entry per day in `DEMO_DAYS`.
///
/// Dates that already hold an entry are left untouched. Returns the number of
/// entries written.
pub async fn seed_demo_entries(db: &dyn DatabaseService, user_key: i64) -> PortResult<usize> {
    let user = db.get_or_create_user(user_key).await?;
    let mut written = 0;

    for (i, day) in DEMO_DAYS.iter().enumerate() {
        let Some(date) = NaiveDate::from_ymd_opt(2025, 10, *day) else {
            continue;
        };
        if db.find_entry_by_date(user.id, date).await?.is_some() {
            info!(%date, "Entry already present; skipping");
            continue;
        }
        db.upsert_entry(user.id, date, &demo_draft(i + 1)).await?;
        written += 1;
    }

    info!(user_id = user.id, written, "Seeded demo entries");
    Ok(written)
}
