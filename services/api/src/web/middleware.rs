//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::web::auth::{resolve_user, verify_app_jwt};
use crate::web::state::AppState;

/// Middleware that validates the `Authorization: Bearer` token and resolves the user.
///
/// If valid, inserts the `User` into request extensions for handlers to use.
/// In dev-auth mode every request acts as the dev user instead.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = if state.config.dev_auth {
        state.db.get_or_create_user(state.config.dev_user_key).await?
    } else {
        // 1. Extract the bearer token
        let auth_header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let token = bearer_token(auth_header).ok_or_else(|| {
            ApiError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?;
        if token.is_empty() {
            return Err(ApiError::Unauthorized("Empty token".to_string()));
        }

        // 2. Verify it and look up the user it names
        let claims = verify_app_jwt(&state.config.jwt, token)?;
        resolve_user(state.db.as_ref(), &claims).await?
    };

    // 3. Insert the user into request extensions
    req.extensions_mut().insert(user);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

/// The token part of a `Bearer <token>` header, matched case-insensitively.
fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}
