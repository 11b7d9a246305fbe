//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use utoipa::OpenApi;

use crate::web::auth::{self, MeResponse};
use crate::web::entries::{
    self, AnalyzeResponse, ByDateResponse, EntryDetail, EntryPayload, EntrySummary,
    UpsertResponse,
};
use crate::web::quotes::{self, QuoteResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        entries::list_entries_handler,
        entries::create_entry_handler,
        entries::get_entry_handler,
        entries::delete_entry_handler,
        entries::by_date_handler,
        entries::upsert_by_date_handler,
        entries::analyze_entry_handler,
        quotes::quotes_handler,
        auth::me_handler,
    ),
    components(
        schemas(
            EntryPayload,
            EntryDetail,
            EntrySummary,
            UpsertResponse,
            ByDateResponse,
            AnalyzeResponse,
            QuoteResponse,
            MeResponse
        )
    ),
    tags(
        (name = "Diary API", description = "Daily diary entries with language-learning feedback.")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/entries",
            "/api/entries/{id}",
            "/api/entries/by-date",
            "/api/entries/upsert-by-date",
            "/api/entries/{id}/analyze",
            "/api/quotes",
            "/api/auth/me",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected}"
            );
        }
    }
}
