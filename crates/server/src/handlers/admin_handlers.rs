//! # Admin Route Handlers
//!
//! This module contains handlers for endpoints that require the admin role:
//! the dashboard, chunk coverage and the management of other users' profiles.

use super::settings_handlers::check_model;
use crate::{
    auth::AdminUser,
    errors::AppError,
    state::AppState,
    types::{AdminProfileUpdate, ProfileResponse},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::{Duration, Utc};
use maxrag::{
    providers::db::storage::{ChunkStore, SettingsStore},
    types::{DashboardStats, RagStats},
};
use tracing::info;

/// Window for active users, the response-time average and the error count.
const STATS_WINDOW_DAYS: i64 = 30;

/// Handler for `GET /admin/stats`.
pub async fn admin_stats_handler(
    State(app_state): State<AppState>,
    AdminUser(user): AdminUser,
) -> Result<Json<DashboardStats>, AppError> {
    info!("User '{}' is reading the dashboard stats.", user.id);
    let since = Utc::now() - Duration::days(STATS_WINDOW_DAYS);
    let stats = app_state.store.dashboard_stats(since).await?;
    Ok(Json(stats))
}

/// Handler for `GET /admin/rag-stats`.
pub async fn admin_rag_stats_handler(
    State(app_state): State<AppState>,
    AdminUser(_user): AdminUser,
) -> Result<Json<RagStats>, AppError> {
    Ok(Json(app_state.store.rag_stats().await?))
}

/// Handler for `GET /admin/profiles`.
pub async fn list_profiles_handler(
    State(app_state): State<AppState>,
    AdminUser(_user): AdminUser,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let profiles = app_state.store.list_profiles().await?;
    Ok(Json(profiles.into_iter().map(ProfileResponse::from).collect()))
}

/// Handler for `PUT /admin/profiles/{user_id}`: sets another user's area
/// and preferred model.
pub async fn update_profile_handler(
    State(app_state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(user_id): Path<String>,
    payload: Result<Json<AdminProfileUpdate>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(update) = payload?;
    let preferred_model = update
        .preferred_model
        .map(|m| Some(m).filter(|m| !m.trim().is_empty()));
    if let Some(Some(model)) = &preferred_model {
        check_model(model)?;
    }

    let mut profile = app_state
        .store
        .get_profile(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))?;
    if let Some(area) = update.area {
        profile.area = Some(area).filter(|a| !a.trim().is_empty());
    }
    if let Some(model) = preferred_model {
        profile.preferred_model = model;
    }

    app_state.store.save_profile(&profile).await?;
    info!(
        "User '{}' updated profile '{}' (area: {:?}, model: {:?}).",
        user.id, profile.user_id, profile.area, profile.preferred_model
    );
    Ok(Json(ProfileResponse::from(profile)))
}
