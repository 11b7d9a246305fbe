//! services/api/src/web/entries.rs
//!
//! Axum handlers for diary entries. Every route here runs behind `require_auth`
//! and only ever sees the authenticated user's entries.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use diary_core::analysis::AnalysisResult;
use diary_core::domain::{Entry, Lang, UpsertAction, User};
use diary_core::journal::{self, UpsertRequest};
use diary_core::ports::PortError;
use diary_core::validation::parse_date;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The JSON body accepted by create and upsert-by-date.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EntryPayload {
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
    pub title: Option<String>,
    /// `en` (default) or `ko`.
    pub original_lang: Option<String>,
    pub original_text: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub meta: Option<Value>,
}

impl From<EntryPayload> for UpsertRequest {
    fn from(payload: EntryPayload) -> Self {
        UpsertRequest {
            date: payload.date,
            title: payload.title,
            original_lang: payload.original_lang,
            original_text: payload.original_text,
            meta: payload.meta,
        }
    }
}

/// The full representation of an entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntryDetail {
    pub id: i64,
    pub date: NaiveDate,
    pub title: String,
    #[schema(value_type = String)]
    pub original_lang: Lang,
    pub original_text: String,
    #[schema(value_type = Object)]
    pub meta: Value,
    #[schema(value_type = Option<Object>)]
    pub analysis: Option<AnalysisResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Entry> for EntryDetail {
    fn from(entry: Entry) -> Self {
        Self {
            id: entry.id,
            date: entry.date,
            title: entry.title,
            original_lang: entry.original_lang,
            original_text: entry.original_text,
            meta: Value::Object(entry.meta),
            analysis: entry.analysis,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

/// The list representation of an entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntrySummary {
    pub id: i64,
    pub date: NaiveDate,
    pub title: String,
    #[schema(value_type = Object)]
    pub meta: Value,
}

impl From<Entry> for EntrySummary {
    fn from(entry: Entry) -> Self {
        Self {
            id: entry.id,
            date: entry.date,
            title: entry.title,
            meta: Value::Object(entry.meta),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpsertResponse {
    pub id: i64,
    /// `created` or `updated`.
    #[schema(value_type = String)]
    pub action: UpsertAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ByDateResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AnalyzeResponse {
    pub status: String,
    #[schema(value_type = Object)]
    pub analysis: AnalysisResult,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Any non-empty value switches to the calendar map.
    pub calendar: Option<String>,
    /// `YYYY-MM`, required with `calendar`.
    pub month: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ByDateQuery {
    /// `YYYY-MM-DD`.
    pub date: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the user's entries, or map a month's dates to entry ids.
#[utoipa::path(
    get,
    path = "/api/entries",
    params(ListQuery),
    responses(
        (status = 200, description = "Entries, newest first; or a date-to-id map in calendar mode", body = [EntrySummary]),
        (status = 400, description = "Malformed month")
    )
)]
pub async fn list_entries_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let calendar_mode = query.calendar.as_deref().is_some_and(|c| !c.is_empty());

    if let (true, Some(month)) = (calendar_mode, query.month.as_deref()) {
        let (start, end) = month_bounds(month)
            .ok_or_else(|| ApiError::BadRequest("month must be YYYY-MM".to_string()))?;
        let entries = app_state
            .db
            .list_entries_between(user.id, start, end)
            .await?;
        let mapping: BTreeMap<String, i64> = entries
            .into_iter()
            .map(|e| (e.date.format("%Y-%m-%d").to_string(), e.id))
            .collect();
        return Ok(Json(mapping).into_response());
    }

    let entries = app_state.db.list_entries(user.id).await?;
    let summaries: Vec<EntrySummary> = entries.into_iter().map(EntrySummary::from).collect();
    Ok(Json(summaries).into_response())
}

/// Create a new entry.
#[utoipa::path(
    post,
    path = "/api/entries",
    request_body = EntryPayload,
    responses(
        (status = 201, description = "Entry created", body = EntryDetail),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "An entry already exists for that date")
    )
)]
pub async fn create_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<EntryPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let today = Local::now().date_naive();
    let entry = journal::create_entry(app_state.db.as_ref(), user.id, payload.into(), today).await?;
    Ok((StatusCode::CREATED, Json(EntryDetail::from(entry))))
}

/// Fetch one entry.
#[utoipa::path(
    get,
    path = "/api/entries/{id}",
    params(("id" = i64, Path, description = "Entry id")),
    responses(
        (status = 200, description = "The entry", body = EntryDetail),
        (status = 404, description = "No such entry for this user")
    )
)]
pub async fn get_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<i64>,
) -> Result<Json<EntryDetail>, ApiError> {
    let entry = app_state.db.get_entry(user.id, entry_id).await?;
    Ok(Json(entry.into()))
}

/// Delete one entry.
#[utoipa::path(
    delete,
    path = "/api/entries/{id}",
    params(("id" = i64, Path, description = "Entry id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such entry for this user")
    )
)]
pub async fn delete_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    app_state.db.delete_entry(user.id, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Look up the entry for one date.
#[utoipa::path(
    get,
    path = "/api/entries/by-date",
    params(ByDateQuery),
    responses(
        (status = 200, description = "Whether an entry exists, and the entry if so", body = ByDateResponse),
        (status = 400, description = "Missing or malformed date")
    )
)]
pub async fn by_date_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<ByDateQuery>,
) -> Result<Json<ByDateResponse>, ApiError> {
    let raw = query
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| {
            PortError::MissingParameter("date query param required (YYYY-MM-DD)".to_string())
        })?;
    let date = parse_date("date", raw)?;

    let response = match app_state.db.find_entry_by_date(user.id, date).await? {
        Some(entry) => ByDateResponse {
            exists: true,
            entry: Some(entry.into()),
        },
        None => ByDateResponse {
            exists: false,
            entry: None,
        },
    };
    Ok(Json(response))
}

/// Create the entry for a date, or overwrite the existing one.
#[utoipa::path(
    post,
    path = "/api/entries/upsert-by-date",
    request_body = EntryPayload,
    responses(
        (status = 201, description = "Entry created", body = UpsertResponse),
        (status = 200, description = "Entry updated", body = UpsertResponse),
        (status = 400, description = "Missing date or validation failed")
    )
)]
pub async fn upsert_by_date_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    payload: Result<Json<EntryPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let outcome =
        journal::upsert_entry_by_date(app_state.db.as_ref(), user.id, payload.into()).await?;
    let status = match outcome.action {
        UpsertAction::Created => StatusCode::CREATED,
        UpsertAction::Updated => StatusCode::OK,
    };
    Ok((
        status,
        Json(UpsertResponse {
            id: outcome.id,
            action: outcome.action,
        }),
    ))
}

/// Run the language analysis for an entry and store it.
#[utoipa::path(
    post,
    path = "/api/entries/{id}/analyze",
    params(("id" = i64, Path, description = "Entry id")),
    responses(
        (status = 200, description = "Analysis stored", body = AnalyzeResponse),
        (status = 404, description = "No such entry for this user"),
        (status = 429, description = "Analysis provider quota exceeded"),
        (status = 502, description = "Analysis provider failed")
    )
)]
pub async fn analyze_entry_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<i64>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let analysis = journal::analyze_entry(
        app_state.db.as_ref(),
        app_state.analysis_adapter.as_ref(),
        user.id,
        entry_id,
    )
    .await?;

    Ok(Json(AnalyzeResponse {
        status: "ok".to_string(),
        analysis,
    }))
}

/// First and last day of a `YYYY-MM` month.
fn month_bounds(month: &str) -> Option<(NaiveDate, NaiveDate)> {
    let (year, month) = month.trim().split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;

    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if start.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next_month.pred_opt()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds("2025-10"), Some((d(2025, 10, 1), d(2025, 10, 31))));
        assert_eq!(month_bounds("2024-02"), Some((d(2024, 2, 1), d(2024, 2, 29))));
        assert_eq!(month_bounds("2025-12"), Some((d(2025, 12, 1), d(2025, 12, 31))));
    }

    #[test]
    fn test_month_bounds_rejects_garbage() {
        assert_eq!(month_bounds("2025-13"), None);
        assert_eq!(month_bounds("2025"), None);
        assert_eq!(month_bounds("october"), None);
    }
}
