use super::{handlers, state::AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Multipart framing on top of the raw file bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    let upload_limit =
        usize::try_from(app_state.config.upload.max_total_bytes).unwrap_or(usize::MAX);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/models", get(handlers::models_handler))
        .route("/chat", post(handlers::chat_stream_handler))
        .route("/chat/complete", post(handlers::chat_complete_handler))
        .route("/ingest", post(handlers::ingest_handler))
        .route(
            "/documents",
            get(handlers::list_documents_handler)
                .post(handlers::upload_documents_handler)
                .layer(DefaultBodyLimit::max(
                    upload_limit.saturating_add(MULTIPART_OVERHEAD_BYTES),
                )),
        )
        .route("/documents/{id}", delete(handlers::delete_document_handler))
        .route(
            "/conversations",
            get(handlers::list_conversations_handler).post(handlers::create_conversation_handler),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::list_messages_handler),
        )
        .route(
            "/settings/ai",
            get(handlers::get_ai_settings_handler).put(handlers::update_ai_settings_handler),
        )
        .route("/profile", get(handlers::get_profile_handler))
        .route("/profile/model", put(handlers::update_profile_model_handler))
        .route("/admin/stats", get(handlers::admin_stats_handler))
        .route("/admin/rag-stats", get(handlers::admin_rag_stats_handler))
        .route("/admin/profiles", get(handlers::list_profiles_handler))
        .route(
            "/admin/profiles/{user_id}",
            put(handlers::update_profile_handler),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
