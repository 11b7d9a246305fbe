pub mod auth;
pub mod entries;
pub mod middleware;
pub mod quotes;
pub mod rest;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the `/api` router. Everything except `/api/quotes` requires a user.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new().route("/quotes", get(quotes::quotes_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/entries",
            get(entries::list_entries_handler).post(entries::create_entry_handler),
        )
        .route("/entries/by-date", get(entries::by_date_handler))
        .route(
            "/entries/upsert-by-date",
            post(entries::upsert_by_date_handler),
        )
        .route(
            "/entries/{id}",
            get(entries::get_entry_handler).delete(entries::delete_entry_handler),
        )
        .route("/entries/{id}/analyze", post(entries::analyze_entry_handler))
        .route("/auth/me", get(auth::me_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(app_state)
}
