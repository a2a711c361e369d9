//! # Authentication Extractors
//!
//! Axum extractors for JWT bearer authentication. `AuthenticatedUser`
//! verifies the token and loads (or creates) the caller's profile;
//! `AdminUser` additionally requires the admin role.

use crate::state::AppState;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use maxrag::{
    providers::db::storage::SettingsStore,
    types::{Profile, ProfileRole},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// Represents the claims we expect to find in the JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The subject of the token, used as the user id.
    pub sub: String,
    /// The expiration timestamp.
    pub exp: usize,
    /// Display name used when the profile is first created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The caller, with the profile as stored at the time of the request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub profile: Profile,
}

/// An `AuthenticatedUser` whose profile has the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

/// A custom rejection type for authentication failures.
pub struct AuthError(StatusCode, String);

impl AuthError {
    fn unauthorized() -> Self {
        AuthError(StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

fn now_secs() -> Result<usize, AuthError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .map_err(|_| {
            AuthError(
                StatusCode::INTERNAL_SERVER_ERROR,
                "System time is before UNIX EPOCH.".to_string(),
            )
        })
}

/// Verifies an HS256 token and returns its claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        warn!("JWT validation failed: {}", e);
        AuthError::unauthorized()
    })?;

    // `decode` allows some leeway on `exp`; expired tokens are rejected outright.
    let now = now_secs()?;
    if token_data.claims.exp < now {
        warn!(
            "Token has expired. exp: {}, current: {}",
            token_data.claims.exp, now
        );
        return Err(AuthError::unauthorized());
    }
    if token_data.claims.sub.trim().is_empty() {
        warn!("Token has an empty subject.");
        return Err(AuthError::unauthorized());
    }

    Ok(token_data.claims)
}

/// Loads the caller's profile, creating it on first sight and applying the
/// configured admin list.
async fn load_profile(state: &AppState, claims: &Claims) -> Result<Profile, AuthError> {
    let should_be_admin = state.config.auth.admin_users.contains(&claims.sub);

    let stored = state.store.get_profile(&claims.sub).await.map_err(|e| {
        error!("Failed to load profile: {}", e);
        AuthError(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Could not retrieve user profile".to_string(),
        )
    })?;

    let (mut profile, dirty) = match stored {
        Some(profile) => (profile, false),
        None => {
            info!("Creating profile for new user '{}'.", claims.sub);
            let profile = Profile {
                user_id: claims.sub.clone(),
                name: claims.name.clone(),
                ..Default::default()
            };
            (profile, true)
        }
    };

    let promote = should_be_admin && !profile.is_admin();
    if promote {
        info!("Granting admin role to '{}'.", claims.sub);
        profile.role = ProfileRole::Admin;
    }

    if dirty || promote {
        state.store.save_profile(&profile).await.map_err(|e| {
            error!("Failed to save profile: {}", e);
            AuthError(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not save user profile".to_string(),
            )
        })?;
    }

    Ok(profile)
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    debug!("Missing or malformed Authorization header: {}", e);
                    AuthError::unauthorized()
                })?;

        let secret = state.config.auth.jwt_secret.as_deref().ok_or_else(|| {
            error!("JWT secret is not configured; rejecting authenticated request.");
            AuthError(
                StatusCode::INTERNAL_SERVER_ERROR,
                "JWT secret não configurado".to_string(),
            )
        })?;

        let claims = verify_token(bearer.token(), secret)?;
        let profile = load_profile(state, &claims).await?;

        Ok(AuthenticatedUser {
            id: claims.sub,
            profile,
        })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.profile.is_admin() {
            warn!("User '{}' attempted an admin operation.", user.id);
            return Err(AuthError(
                StatusCode::FORBIDDEN,
                "Acesso restrito a administradores".to_string(),
            ));
        }
        Ok(AdminUser(user))
    }
}
