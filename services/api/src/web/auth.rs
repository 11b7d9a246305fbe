//! services/api/src/web/auth.rs
//!
//! App-issued bearer tokens (HS256 JWTs) and the `me` endpoint.

use axum::{Extension, Json};
use chrono::Utc;
use diary_core::domain::User;
use diary_core::ports::{DatabaseService, PortError};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::config::JwtSettings;
use crate::error::ApiError;

pub const ISSUER: &str = "hi-my-day";

//=========================================================================================
// Token Claims
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppClaims {
    pub iss: String,
    /// The user's id, as a string.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toss_user_key: Option<i64>,
}

/// Issues a token identifying `user`, valid for the configured number of minutes.
pub fn issue_app_jwt(settings: &JwtSettings, user: &User) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = AppClaims {
        iss: ISSUER.to_string(),
        sub: user.id.to_string(),
        iat: now,
        exp: now + settings.expire_minutes * 60,
        toss_user_key: Some(user.toss_user_key),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(settings.signing_key.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
}

/// Checks signature, issuer and expiry.
pub fn verify_app_jwt(settings: &JwtSettings, token: &str) -> Result<AppClaims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);

    decode::<AppClaims>(
        token,
        &DecodingKey::from_secret(settings.signing_key.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        ApiError::Unauthorized("Invalid token".to_string())
    })
}

/// Finds the user a token refers to: by id first, then by provider key.
pub async fn resolve_user(db: &dyn DatabaseService, claims: &AppClaims) -> Result<User, ApiError> {
    if let Ok(user_id) = claims.sub.parse::<i64>() {
        match db.get_user_by_id(user_id).await {
            Ok(user) => return Ok(user),
            Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(key) = claims.toss_user_key {
        match db.get_user_by_toss_key(key).await {
            Ok(user) => return Ok(user),
            Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Unauthorized("User not found".to_string()))
}

//=========================================================================================
// Handlers
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub id: i64,
    #[serde(rename = "tossUserKey")]
    pub toss_user_key: i64,
}

/// GET /api/auth/me - The authenticated user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The authenticated user", body = MeResponse),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn me_handler(Extension(user): Extension<User>) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        toss_user_key: user.toss_user_key,
    })
}
