//! crates/diary_core/src/journal.rs
//!
//! Write paths for diary entries: create, upsert-by-date and analysis.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::analysis::{normalize, AnalysisResult};
use crate::domain::{Entry, EntryDraft, Lang, UpsertAction, UpsertOutcome};
use crate::ports::{AnalysisService, DatabaseService, PortError, PortResult};
use crate::prompt::{build_prompt, SYSTEM_INSTRUCTION};
use crate::validation::{parse_date, parse_lang, parse_meta, validate_new_entry};

pub const MISSING_DATE: &str = "date is required (YYYY-MM-DD)";

/// Loosely-typed input of an upsert-by-date request. Every field but `date`
/// falls back to a default.
#[derive(Debug, Clone, Default)]
pub struct UpsertRequest {
    pub date: Option<String>,
    pub title: Option<String>,
    pub original_lang: Option<String>,
    pub original_text: Option<String>,
    pub meta: Option<Value>,
}

impl UpsertRequest {
    fn into_draft(self) -> PortResult<EntryDraft> {
        let original_lang = match self.original_lang.as_deref() {
            Some(lang) => parse_lang(lang)?,
            None => Lang::default(),
        };
        Ok(EntryDraft {
            title: self.title.unwrap_or_default().trim().to_string(),
            original_lang,
            original_text: self.original_text.unwrap_or_default(),
            meta: parse_meta(self.meta)?,
        })
    }
}

/// Creates the user's entry for the given date, or overwrites the one that
/// already exists.
///
/// An existing entry keeps its analysis and is not re-validated. A new entry
/// must pass the creation rules; nothing is written when it does not.
pub async fn upsert_entry_by_date(
    db: &dyn DatabaseService,
    user_id: i64,
    request: UpsertRequest,
) -> PortResult<UpsertOutcome> {
    let raw_date = request
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| PortError::MissingParameter(MISSING_DATE.to_string()))?;
    let date = parse_date("date", raw_date)?;
    let draft = request.into_draft()?;

    if let Some(existing) = db.find_entry_by_date(user_id, date).await? {
        let entry = db.update_entry(existing.id, &draft).await?;
        info!(entry_id = entry.id, %date, "Updated entry by date");
        return Ok(UpsertOutcome {
            id: entry.id,
            action: UpsertAction::Updated,
        });
    }

    validate_new_entry(&draft)?;
    let (entry, created) = db.upsert_entry(user_id, date, &draft).await?;
    let action = if created {
        UpsertAction::Created
    } else {
        // A concurrent request inserted the same date between lookup and write.
        warn!(entry_id = entry.id, %date, "Entry appeared concurrently; overwrote it");
        UpsertAction::Updated
    };
    info!(entry_id = entry.id, %date, ?action, "Upserted entry by date");

    Ok(UpsertOutcome { id: entry.id, action })
}

/// Creates a new entry. The date defaults to `today` when absent.
pub async fn create_entry(
    db: &dyn DatabaseService,
    user_id: i64,
    request: UpsertRequest,
    today: NaiveDate,
) -> PortResult<Entry> {
    let date = match request.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => parse_date("date", raw)?,
        None => today,
    };
    let draft = request.into_draft()?;
    validate_new_entry(&draft)?;

    let entry = db.create_entry(user_id, date, &draft).await?;
    info!(entry_id = entry.id, %date, "Created entry");
    Ok(entry)
}

/// Runs the language analysis for one of the user's entries and stores the
/// result on it, replacing any previous analysis.
pub async fn analyze_entry(
    db: &dyn DatabaseService,
    analyzer: &dyn AnalysisService,
    user_id: i64,
    entry_id: i64,
) -> PortResult<AnalysisResult> {
    let entry = db.get_entry(user_id, entry_id).await?;

    let prompt = build_prompt(
        entry.original_lang,
        &entry.original_text,
        Some(&entry.title),
        Some(&entry.meta),
    );

    let raw = analyzer.call_model(SYSTEM_INSTRUCTION, &prompt).await?;
    let analysis = normalize(&raw);
    if analysis.is_unparsed() {
        warn!(entry_id, "Analysis output did not parse; storing raw text");
    }

    db.save_analysis(entry.id, &analysis).await?;
    info!(entry_id, lang = %entry.original_lang, "Stored entry analysis");

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryDatabase, ScriptedAnalysis};
    use serde_json::json;

    const TEXT: &str = "I walked along the river and watched the sunset today.";

    fn request(date: &str, title: &str, text: &str) -> UpsertRequest {
        UpsertRequest {
            date: Some(date.to_string()),
            title: Some(title.to_string()),
            original_lang: Some("en".to_string()),
            original_text: Some(text.to_string()),
            meta: Some(json!({"mood": "calm"})),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_upsert_twice_creates_then_updates() {
        let db = InMemoryDatabase::new();
        let user = db.get_or_create_user(1).await.unwrap();

        let first = upsert_entry_by_date(&db, user.id, request("2025-10-07", "Walk", TEXT))
            .await
            .unwrap();
        assert_eq!(first.action, UpsertAction::Created);

        let second = upsert_entry_by_date(
            &db,
            user.id,
            request("2025-10-07", "  Evening walk ", "Changed my mind about the whole evening."),
        )
        .await
        .unwrap();
        assert_eq!(second.action, UpsertAction::Updated);
        assert_eq!(second.id, first.id);

        let entries = db.list_entries(user.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Evening walk");
        assert_eq!(entries[0].original_text, "Changed my mind about the whole evening.");
    }

    #[tokio::test]
    async fn test_missing_date_fails_before_lookup() {
        let db = InMemoryDatabase::new();
        let mut req = request("", "t", TEXT);
        let err = upsert_entry_by_date(&db, 1, req.clone()).await.unwrap_err();
        assert!(matches!(err, PortError::MissingParameter(ref m) if m == MISSING_DATE));

        req.date = None;
        let err = upsert_entry_by_date(&db, 1, req).await.unwrap_err();
        assert!(matches!(err, PortError::MissingParameter(_)));
        assert_eq!(db.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_short_text_creates_nothing() {
        let db = InMemoryDatabase::new();
        let err = upsert_entry_by_date(&db, 1, request("2025-10-07", "t", "too short"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation { ref field, .. } if field == "original_text"));
        assert!(db.list_entries(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_branch_skips_creation_rules_and_keeps_analysis() {
        let db = InMemoryDatabase::new();
        let created = upsert_entry_by_date(&db, 1, request("2025-10-07", "t", TEXT))
            .await
            .unwrap();
        let analysis = AnalysisResult::unparsed("kept");
        db.save_analysis(created.id, &analysis).await.unwrap();

        let updated = upsert_entry_by_date(&db, 1, request("2025-10-07", "t", "short"))
            .await
            .unwrap();
        assert_eq!(updated.action, UpsertAction::Updated);

        let entry = db.get_entry(1, created.id).await.unwrap();
        assert_eq!(entry.original_text, "short");
        assert_eq!(entry.analysis, Some(analysis));
    }

    #[tokio::test]
    async fn test_defaults_and_other_users_untouched() {
        let db = InMemoryDatabase::new();
        upsert_entry_by_date(&db, 2, request("2025-10-07", "theirs", TEXT))
            .await
            .unwrap();

        let req = UpsertRequest {
            date: Some("2025-10-07".to_string()),
            original_text: Some(TEXT.to_string()),
            ..UpsertRequest::default()
        };
        let outcome = upsert_entry_by_date(&db, 1, req).await.unwrap();
        assert_eq!(outcome.action, UpsertAction::Created);

        let mine = db.get_entry(1, outcome.id).await.unwrap();
        assert_eq!(mine.title, "");
        assert_eq!(mine.original_lang, Lang::En);
        assert!(mine.meta.is_empty());
        assert_eq!(mine.date, day("2025-10-07"));

        let theirs = db.find_entry_by_date(2, day("2025-10-07")).await.unwrap().unwrap();
        assert_eq!(theirs.title, "theirs");
    }

    #[tokio::test]
    async fn test_invalid_language_is_rejected() {
        let db = InMemoryDatabase::new();
        let mut req = request("2025-10-07", "t", TEXT);
        req.original_lang = Some("fr".to_string());
        let err = upsert_entry_by_date(&db, 1, req).await.unwrap_err();
        assert!(matches!(err, PortError::Validation { ref field, .. } if field == "original_lang"));
    }

    #[tokio::test]
    async fn test_analyze_korean_entry_end_to_end() {
        let db = InMemoryDatabase::new();
        let text = "오늘은 비가 와서 집에서 책을 읽으며 조용하고 편안한 하루를 보냈다. 굿";
        assert_eq!(text.chars().count(), 40);
        let outcome = upsert_entry_by_date(
            &db,
            1,
            UpsertRequest {
                date: Some("2025-10-03".to_string()),
                title: Some("비 오는 날".to_string()),
                original_lang: Some("ko".to_string()),
                original_text: Some(text.to_string()),
                meta: Some(json!({"weather": "rainy"})),
            },
        )
        .await
        .unwrap();

        let analyzer = ScriptedAnalysis::new(vec![Ok(json!({
            "translation": {"to": "en", "text": "It rained today, so I stayed home reading."},
            "corrections": {"corrected": text, "explanations": []},
            "vocab_suggestions": [{"word": "cozy", "meaning_ko": "아늑한", "example_en": "It was a cozy day."}],
            "score": {"value": 84, "comment_ko": "좋아요", "focus_next_time": "시제"}
        })
        .to_string())]);

        let analysis = analyze_entry(&db, &analyzer, 1, outcome.id).await.unwrap();
        assert_eq!(analysis.translation_target(), Some(Lang::En));
        let score = analysis.score_value().unwrap();
        assert!((0..=100).contains(&score));

        let prompt = analyzer.prompts().pop().unwrap();
        assert!(prompt.contains("written in KOREAN"));
        assert!(prompt.contains("- weather: rainy"));
        assert!(prompt.contains(text));

        let stored = db.get_entry(1, outcome.id).await.unwrap();
        assert_eq!(stored.analysis, Some(analysis));
    }

    #[tokio::test]
    async fn test_second_analysis_replaces_first() {
        let db = InMemoryDatabase::new();
        let outcome = upsert_entry_by_date(&db, 1, request("2025-10-07", "t", TEXT))
            .await
            .unwrap();
        let analyzer = ScriptedAnalysis::new(vec![
            Ok(r#"{"score": {"value": 50}, "vocab_suggestions": [{"word": "dusk"}], "note": "first"}"#.to_string()),
            Ok(r#"{"translation": {"to": "ko", "text": "강을 따라 걸었다"}}"#.to_string()),
        ]);

        analyze_entry(&db, &analyzer, 1, outcome.id).await.unwrap();
        analyze_entry(&db, &analyzer, 1, outcome.id).await.unwrap();

        let stored = db.get_entry(1, outcome.id).await.unwrap().analysis.unwrap();
        assert_eq!(stored.score, json!({}));
        assert_eq!(stored.vocab_suggestions, json!([]));
        assert!(stored.extra.is_empty());
        assert_eq!(stored.translation_target(), Some(Lang::Ko));
    }

    #[tokio::test]
    async fn test_malformed_output_is_stored_as_raw() {
        let db = InMemoryDatabase::new();
        let outcome = upsert_entry_by_date(&db, 1, request("2025-10-07", "t", TEXT))
            .await
            .unwrap();
        let analyzer = ScriptedAnalysis::new(vec![Ok("not json at all".to_string())]);

        let analysis = analyze_entry(&db, &analyzer, 1, outcome.id).await.unwrap();
        assert_eq!(analysis.raw.as_deref(), Some("not json at all"));
        assert!(db.get_entry(1, outcome.id).await.unwrap().analysis.unwrap().is_unparsed());
    }

    #[tokio::test]
    async fn test_upstream_error_leaves_previous_analysis() {
        let db = InMemoryDatabase::new();
        let outcome = upsert_entry_by_date(&db, 1, request("2025-10-07", "t", TEXT))
            .await
            .unwrap();
        let analyzer = ScriptedAnalysis::new(vec![
            Ok(r#"{"score": {"value": 61}}"#.to_string()),
            Err(PortError::RateLimited("quota".to_string())),
        ]);

        analyze_entry(&db, &analyzer, 1, outcome.id).await.unwrap();
        let err = analyze_entry(&db, &analyzer, 1, outcome.id).await.unwrap_err();
        assert!(matches!(err, PortError::RateLimited(_)));

        let stored = db.get_entry(1, outcome.id).await.unwrap().analysis.unwrap();
        assert_eq!(stored.score_value(), Some(61));
    }

    #[tokio::test]
    async fn test_analyze_other_users_entry_is_not_found() {
        let db = InMemoryDatabase::new();
        let outcome = upsert_entry_by_date(&db, 1, request("2025-10-07", "t", TEXT))
            .await
            .unwrap();
        let analyzer = ScriptedAnalysis::new(vec![]);

        let err = analyze_entry(&db, &analyzer, 2, outcome.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
        assert!(analyzer.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_create_entry_defaults_date_and_rejects_duplicates() {
        let db = InMemoryDatabase::new();
        let today = day("2025-10-19");
        let req = UpsertRequest {
            title: Some("Today".to_string()),
            original_text: Some(TEXT.to_string()),
            ..UpsertRequest::default()
        };

        let entry = create_entry(&db, 1, req.clone(), today).await.unwrap();
        assert_eq!(entry.date, today);
        assert!(entry.analysis.is_none());

        let err = create_entry(&db, 1, req, today).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_entry_validates_text() {
        let db = InMemoryDatabase::new();
        let req = request("2025-10-07", "t", "one two");
        let err = create_entry(&db, 1, req, day("2025-10-19")).await.unwrap_err();
        assert!(matches!(err, PortError::Validation { .. }));
    }
}
