//! services/api/src/web/quotes.rs

use axum::{extract::State, Json};
use diary_core::domain::Quote;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteResponse {
    pub en: String,
    /// Korean rendering with the nuance of the English sentence.
    pub ko: String,
}

impl From<Quote> for QuoteResponse {
    fn from(quote: Quote) -> Self {
        Self {
            en: quote.en,
            ko: quote.ko,
        }
    }
}

/// A few random learning sentences. No authentication required.
#[utoipa::path(
    get,
    path = "/api/quotes",
    responses(
        (status = 200, description = "Up to three distinct quotes", body = [QuoteResponse])
    )
)]
pub async fn quotes_handler(State(app_state): State<Arc<AppState>>) -> Json<Vec<QuoteResponse>> {
    Json(app_state.quotes.pick().into_iter().map(QuoteResponse::from).collect())
}
