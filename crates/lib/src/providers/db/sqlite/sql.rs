//! # SQLite Specific SQL Queries
//!
//! This module centralizes SQL strings for the SQLite provider so the provider
//! logic stays free of database-specific syntax.

pub const CREATE_DOCUMENTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        content TEXT NOT NULL,
        file_type TEXT NOT NULL,
        mime_type TEXT,
        size_bytes INTEGER NOT NULL DEFAULT 0,
        pages INTEGER,
        sheets TEXT,
        truncated INTEGER NOT NULL DEFAULT 0,
        content_hash TEXT NOT NULL,
        uploaded_by TEXT,
        path TEXT,
        created_at TEXT NOT NULL
    );
";

pub const CREATE_DOCUMENT_CHUNKS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS document_chunks (
        id TEXT PRIMARY KEY,
        document_id TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        model_name TEXT NOT NULL,
        dimensions INTEGER NOT NULL,
        page INTEGER,
        filename TEXT NOT NULL,
        path TEXT,
        created_at TEXT NOT NULL
    );
";

pub const CREATE_CONVERSATIONS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

pub const CREATE_MESSAGES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        tokens INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
";

pub const CREATE_USAGE_STATS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS usage_stats (
        user_id TEXT NOT NULL,
        session_id TEXT NOT NULL,
        messages_count INTEGER NOT NULL DEFAULT 0,
        tokens_count INTEGER NOT NULL DEFAULT 0,
        error_count INTEGER NOT NULL DEFAULT 0,
        success_rate REAL NOT NULL DEFAULT 100.0,
        response_time_ms INTEGER NOT NULL DEFAULT 0,
        session_start TEXT NOT NULL,
        session_end TEXT,
        PRIMARY KEY (user_id, session_id)
    );
";

pub const CREATE_PROFILES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS profiles (
        user_id TEXT PRIMARY KEY,
        name TEXT,
        role TEXT NOT NULL DEFAULT 'user',
        area TEXT,
        preferred_model TEXT
    );
";

pub const CREATE_AI_SETTINGS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS ai_settings (
        id INTEGER PRIMARY KEY,
        current_model TEXT,
        avatar_url TEXT,
        updated_by TEXT,
        updated_at TEXT NOT NULL
    );
";

pub const CREATE_CHUNKS_DOCUMENT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_document_chunks_document_id ON document_chunks (document_id);";

pub const CREATE_MESSAGES_CONVERSATION_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation_id ON messages (conversation_id);";

/// Every statement needed for a fresh database, in creation order.
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    CREATE_DOCUMENTS_TABLE,
    CREATE_DOCUMENT_CHUNKS_TABLE,
    CREATE_CONVERSATIONS_TABLE,
    CREATE_MESSAGES_TABLE,
    CREATE_USAGE_STATS_TABLE,
    CREATE_PROFILES_TABLE,
    CREATE_AI_SETTINGS_TABLE,
    CREATE_CHUNKS_DOCUMENT_INDEX,
    CREATE_MESSAGES_CONVERSATION_INDEX,
];

pub const DOCUMENT_COLUMNS: &str = "id, filename, content, file_type, mime_type, size_bytes, pages, sheets, truncated, content_hash, uploaded_by, path, created_at";

pub const CHUNK_COLUMNS: &str =
    "id, document_id, chunk_index, content, embedding, model_name, page, filename, path";

pub const CONVERSATION_COLUMNS: &str = "id, user_id, title, created_at, updated_at";

pub const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, tokens, created_at";

pub const PROFILE_COLUMNS: &str = "user_id, name, role, area, preferred_model";

pub const USAGE_COLUMNS: &str = "user_id, session_id, messages_count, tokens_count, error_count, success_rate, response_time_ms, session_start, session_end";

/// Adds one usage increment to its session row, creating the row on first use.
///
/// Binds the nine `USAGE_COLUMNS` values for a fresh row, then the optional
/// response time that replaces the stored one on conflict.
pub const UPSERT_USAGE: &str = "
    INSERT INTO usage_stats (user_id, session_id, messages_count, tokens_count, error_count, success_rate, response_time_ms, session_start, session_end)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(user_id, session_id) DO UPDATE SET
        messages_count = messages_count + excluded.messages_count,
        tokens_count = tokens_count + excluded.tokens_count,
        error_count = error_count + excluded.error_count,
        success_rate = CASE
            WHEN messages_count + excluded.messages_count + error_count + excluded.error_count = 0 THEN 100.0
            ELSE (messages_count + excluded.messages_count) * 100.0
                / (messages_count + excluded.messages_count + error_count + excluded.error_count)
        END,
        response_time_ms = COALESCE(?, response_time_ms),
        session_end = excluded.session_end
";

/// Builds the similarity query for a given query vector.
///
/// `vector_distance_cos` returns `1 - cos(a, b)`, so the similarity column is the
/// plain cosine similarity. Expects `?1` = model name and `?2` = dimensions.
pub fn similarity_search(query_vector: &[f32], limit: u32) -> String {
    let vector = query_vector
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT document_id, filename, content, page,
                (1.0 - vector_distance_cos(embedding, vector32('[{vector}]'))) AS similarity
         FROM document_chunks
         WHERE model_name = ?1 AND dimensions = ?2
         ORDER BY similarity DESC
         LIMIT {limit};"
    )
}

pub const INSERT_CHUNK: &str = "
    INSERT INTO document_chunks (id, document_id, chunk_index, content, embedding, model_name, dimensions, page, filename, path, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?);
";
