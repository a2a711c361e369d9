//! # Settings and Profile Route Handlers
//!
//! The AI settings singleton is readable by everyone and writable by admins.
//! Every user may read their own profile and pick a preferred model.

use crate::{
    auth::{AdminUser, AuthenticatedUser},
    errors::AppError,
    state::AppState,
    types::{ProfileResponse, UpdateAiSettingsRequest, UpdateModelRequest},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use maxrag::{models::is_supported_model, providers::db::storage::SettingsStore, types::AiSettings};
use tracing::info;

pub(crate) fn check_model(model: &str) -> Result<(), AppError> {
    if is_supported_model(model) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Modelo inválido: {model}")))
    }
}

/// Handler for `GET /settings/ai`.
pub async fn get_ai_settings_handler(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<AiSettings>, AppError> {
    Ok(Json(app_state.store.get_ai_settings().await?))
}

/// Handler for `PUT /settings/ai`. Omitted fields keep their current value.
pub async fn update_ai_settings_handler(
    State(app_state): State<AppState>,
    AdminUser(user): AdminUser,
    payload: Result<Json<UpdateAiSettingsRequest>, JsonRejection>,
) -> Result<Json<AiSettings>, AppError> {
    let Json(update) = payload?;
    if let Some(model) = &update.current_model {
        check_model(model)?;
    }

    let mut settings = app_state.store.get_ai_settings().await?;
    if update.current_model.is_some() {
        settings.current_model = update.current_model;
    }
    if let Some(avatar_url) = update.avatar_url {
        settings.avatar_url = Some(avatar_url).filter(|url| !url.trim().is_empty());
    }
    settings.updated_by = Some(user.id.clone());

    app_state.store.save_ai_settings(&settings).await?;
    info!(
        "User '{}' updated the AI settings (model: {:?}).",
        user.id, settings.current_model
    );
    Ok(Json(settings))
}

/// Handler for `GET /profile`.
pub async fn get_profile_handler(user: AuthenticatedUser) -> Json<ProfileResponse> {
    Json(ProfileResponse::from(user.profile))
}

/// Handler for `PUT /profile/model`. `null` clears the preference.
pub async fn update_profile_model_handler(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<UpdateModelRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(update) = payload?;
    let preferred_model = update.preferred_model.filter(|m| !m.trim().is_empty());
    if let Some(model) = &preferred_model {
        check_model(model)?;
    }

    let mut profile = user.profile;
    profile.preferred_model = preferred_model;
    app_state.store.save_profile(&profile).await?;
    info!(
        "User '{}' set preferred model to {:?}.",
        user.id, profile.preferred_model
    );
    Ok(Json(ProfileResponse::from(profile)))
}
