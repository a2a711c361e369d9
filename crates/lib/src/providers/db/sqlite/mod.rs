use crate::{
    errors::PromptError,
    providers::db::storage::{
        ChatStore, ChunkStore, DocumentStore, SettingsStore, UsageStore, VectorSearch,
    },
    types::{
        AiSettings, ChunkMatch, Conversation, DashboardStats, Document, DocumentChunk,
        DocumentSummary, Message, NewChunk, NewDocument, Profile, ProfileRole, RagStats, Role,
        UsageDelta, UsageStat,
    },
    usage::success_rate,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::{
    collections::HashSet,
    fmt::{self, Debug},
    sync::Arc,
};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};
use turso::{params, Connection, Database, Row, Value as TursoValue};
use uuid::Uuid;

pub mod sql;

/// A provider for a local SQLite-compatible database using Turso.
///
/// This provider holds a `Database` instance. When cloned, it shares the same
/// underlying database, so an in-memory database can be shared across the
/// server state and tests by cloning one provider.
#[derive(Clone)]
pub struct SqliteProvider {
    pub db: Database,
    /// Serializes usage upserts from this process so concurrent chat
    /// requests never race for the write lock.
    usage_writes: Arc<AsyncMutex<()>>,
}

impl SqliteProvider {
    /// Opens (or creates) the database at `db_path`. Use `":memory:"` for an
    /// isolated in-memory database.
    pub async fn new(db_path: &str) -> Result<Self, PromptError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;
        // PRAGMA returns a row, so it must go through `query`.
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| PromptError::StorageConnection(e.to_string()))?;

        Ok(Self {
            db,
            usage_writes: Arc::default(),
        })
    }

    /// Ensures that all application tables and indexes exist.
    /// Idempotent and safe to call on every startup.
    pub async fn initialize_schema(&self) -> Result<(), PromptError> {
        let conn = self.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ())
                .await
                .map_err(|e| PromptError::StorageOperationFailed(e.to_string()))?;
        }
        info!("Database schema initialized.");
        Ok(())
    }

    fn connect(&self) -> Result<Connection, PromptError> {
        self.db
            .connect()
            .map_err(|e| PromptError::StorageConnection(e.to_string()))
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

impl AsRef<Database> for SqliteProvider {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}

// --- Row decoding helpers ---

fn text(row: &Row, idx: usize) -> Result<String, PromptError> {
    Ok(match row.get_value(idx)? {
        TursoValue::Text(s) => s,
        _ => String::new(),
    })
}

fn opt_text(row: &Row, idx: usize) -> Result<Option<String>, PromptError> {
    Ok(match row.get_value(idx)? {
        TursoValue::Text(s) => Some(s),
        _ => None,
    })
}

fn int(row: &Row, idx: usize) -> Result<i64, PromptError> {
    Ok(opt_int(row, idx)?.unwrap_or(0))
}

fn opt_int(row: &Row, idx: usize) -> Result<Option<i64>, PromptError> {
    Ok(match row.get_value(idx)? {
        TursoValue::Integer(i) => Some(i),
        TursoValue::Real(f) => Some(f as i64),
        _ => None,
    })
}

fn real(row: &Row, idx: usize) -> Result<f64, PromptError> {
    Ok(match row.get_value(idx)? {
        TursoValue::Real(f) => f,
        TursoValue::Integer(i) => i as f64,
        _ => 0.0,
    })
}

fn blob(row: &Row, idx: usize) -> Result<Vec<u8>, PromptError> {
    Ok(match row.get_value(idx)? {
        TursoValue::Blob(bytes) => bytes,
        _ => Vec::new(),
    })
}

fn timestamp(row: &Row, idx: usize) -> Result<DateTime<Utc>, PromptError> {
    parse_time(&text(row, idx)?)
}

fn opt_timestamp(row: &Row, idx: usize) -> Result<Option<DateTime<Utc>>, PromptError> {
    opt_text(row, idx)?.as_deref().map(parse_time).transpose()
}

fn parse_time(value: &str) -> Result<DateTime<Utc>, PromptError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            PromptError::StorageOperationFailed(format!("Invalid timestamp '{value}': {e}"))
        })
}

/// Fixed-width RFC 3339 so that text ordering matches chronological ordering.
fn format_time(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn opt_value(value: Option<&str>) -> TursoValue {
    value
        .map(|s| TursoValue::Text(s.to_string()))
        .unwrap_or(TursoValue::Null)
}

/// Little-endian `f32` bytes, the layout `vector_distance_cos` reads.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub fn embedding_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn document_from_row(row: &Row) -> Result<Document, PromptError> {
    let sheets = opt_text(row, 7)?
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()?
        .unwrap_or_default();
    Ok(Document {
        id: text(row, 0)?,
        filename: text(row, 1)?,
        content: text(row, 2)?,
        file_type: text(row, 3)?,
        mime_type: opt_text(row, 4)?,
        size_bytes: int(row, 5)?,
        pages: opt_int(row, 6)?,
        sheets,
        truncated: int(row, 8)? != 0,
        content_hash: text(row, 9)?,
        uploaded_by: opt_text(row, 10)?,
        path: opt_text(row, 11)?,
        created_at: timestamp(row, 12)?,
    })
}

fn conversation_from_row(row: &Row) -> Result<Conversation, PromptError> {
    Ok(Conversation {
        id: text(row, 0)?,
        user_id: text(row, 1)?,
        title: text(row, 2)?,
        created_at: timestamp(row, 3)?,
        updated_at: timestamp(row, 4)?,
    })
}

fn message_from_row(row: &Row) -> Result<Message, PromptError> {
    let raw_role = text(row, 2)?;
    let role = Role::parse(&raw_role).ok_or_else(|| {
        PromptError::StorageOperationFailed(format!("Unknown message role '{raw_role}'"))
    })?;
    Ok(Message {
        id: text(row, 0)?,
        conversation_id: text(row, 1)?,
        role,
        content: text(row, 3)?,
        tokens: int(row, 4)?,
        created_at: timestamp(row, 5)?,
    })
}

fn usage_from_row(row: &Row) -> Result<UsageStat, PromptError> {
    Ok(UsageStat {
        user_id: text(row, 0)?,
        session_id: text(row, 1)?,
        messages_count: int(row, 2)?,
        tokens_count: int(row, 3)?,
        error_count: int(row, 4)?,
        success_rate: real(row, 5)?,
        response_time_ms: int(row, 6)?,
        session_start: timestamp(row, 7)?,
        session_end: opt_timestamp(row, 8)?,
    })
}

fn profile_from_row(row: &Row) -> Result<Profile, PromptError> {
    Ok(Profile {
        user_id: text(row, 0)?,
        name: opt_text(row, 1)?,
        role: ProfileRole::parse(&text(row, 2)?),
        area: opt_text(row, 3)?,
        preferred_model: opt_text(row, 4)?,
    })
}

async fn scalar_i64(conn: &Connection, query: &str) -> Result<i64, PromptError> {
    let mut rows = conn.query(query, ()).await?;
    match rows.next().await? {
        Some(row) => int(&row, 0),
        None => Ok(0),
    }
}

#[async_trait]
impl DocumentStore for SqliteProvider {
    async fn insert_document(&self, document: NewDocument) -> Result<Document, PromptError> {
        let conn = self.connect()?;
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let sheets = if document.sheets.is_empty() {
            TursoValue::Null
        } else {
            TursoValue::Text(serde_json::to_string(&document.sheets)?)
        };

        conn.execute(
            &format!(
                "INSERT INTO documents ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                sql::DOCUMENT_COLUMNS
            ),
            vec![
                TursoValue::Text(id.clone()),
                TursoValue::Text(document.filename.clone()),
                TursoValue::Text(document.content.clone()),
                TursoValue::Text(document.file_type.clone()),
                opt_value(document.mime_type.as_deref()),
                TursoValue::Integer(document.size_bytes),
                document
                    .pages
                    .map(TursoValue::Integer)
                    .unwrap_or(TursoValue::Null),
                sheets,
                TursoValue::Integer(document.truncated as i64),
                TursoValue::Text(document.content_hash.clone()),
                opt_value(document.uploaded_by.as_deref()),
                opt_value(document.path.as_deref()),
                TursoValue::Text(format_time(created_at)),
            ],
        )
        .await?;
        debug!("Inserted document '{}' as {}", document.filename, id);

        Ok(Document {
            id,
            filename: document.filename,
            content: document.content,
            file_type: document.file_type,
            mime_type: document.mime_type,
            size_bytes: document.size_bytes,
            pages: document.pages,
            sheets: document.sheets,
            truncated: document.truncated,
            content_hash: document.content_hash,
            uploaded_by: document.uploaded_by,
            path: document.path,
            created_at,
        })
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM documents WHERE id = ?", sql::DOCUMENT_COLUMNS),
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(document_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, filename, file_type, created_at FROM documents ORDER BY created_at DESC",
                (),
            )
            .await?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(DocumentSummary {
                id: text(&row, 0)?,
                filename: text(&row, 1)?,
                file_type: text(&row, 2)?,
                created_at: timestamp(&row, 3)?,
            });
        }
        Ok(documents)
    }

    async fn all_documents(&self) -> Result<Vec<Document>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM documents ORDER BY filename ASC",
                    sql::DOCUMENT_COLUMNS
                ),
                (),
            )
            .await?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(document_from_row(&row)?);
        }
        Ok(documents)
    }

    async fn delete_document(&self, id: &str) -> Result<bool, PromptError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction().await?;
        tx.execute("DELETE FROM document_chunks WHERE document_id = ?", params![id])
            .await?;
        let deleted = tx
            .execute("DELETE FROM documents WHERE id = ?", params![id])
            .await?;
        tx.commit().await?;
        info!("Deleted document {id} (found: {})", deleted > 0);
        Ok(deleted > 0)
    }

    async fn existing_hashes(&self, hashes: &[String]) -> Result<HashSet<String>, PromptError> {
        if hashes.is_empty() {
            return Ok(HashSet::new());
        }
        let conn = self.connect()?;
        let placeholders = hashes.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query_params: Vec<TursoValue> = hashes
            .iter()
            .map(|h| TursoValue::Text(h.clone()))
            .collect();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT content_hash FROM documents WHERE content_hash IN ({placeholders})"
                ),
                query_params,
            )
            .await?;
        let mut found = HashSet::new();
        while let Some(row) = rows.next().await? {
            found.insert(text(&row, 0)?);
        }
        Ok(found)
    }
}

#[async_trait]
impl ChunkStore for SqliteProvider {
    async fn delete_chunks(&self, document_id: &str) -> Result<u64, PromptError> {
        let conn = self.connect()?;
        let deleted = conn
            .execute(
                "DELETE FROM document_chunks WHERE document_id = ?",
                params![document_id],
            )
            .await?;
        Ok(deleted)
    }

    async fn insert_chunks(&self, chunks: &[NewChunk]) -> Result<usize, PromptError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connect()?;
        let tx = conn.transaction().await?;
        let created_at = format_time(Utc::now());

        for chunk in chunks {
            tx.execute(
                sql::INSERT_CHUNK,
                vec![
                    TursoValue::Text(Uuid::new_v4().to_string()),
                    TursoValue::Text(chunk.document_id.clone()),
                    TursoValue::Integer(chunk.chunk_index),
                    TursoValue::Text(chunk.content.clone()),
                    TursoValue::Blob(embedding_to_bytes(&chunk.embedding)),
                    TursoValue::Text(chunk.model_name.clone()),
                    TursoValue::Integer(chunk.embedding.len() as i64),
                    chunk.page.map(TursoValue::Integer).unwrap_or(TursoValue::Null),
                    TursoValue::Text(chunk.filename.clone()),
                    opt_value(chunk.path.as_deref()),
                    TursoValue::Text(created_at.clone()),
                ],
            )
            .await?;
        }

        tx.commit().await?;
        Ok(chunks.len())
    }

    async fn list_chunks(&self, document_id: &str) -> Result<Vec<DocumentChunk>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM document_chunks WHERE document_id = ? ORDER BY chunk_index ASC",
                    sql::CHUNK_COLUMNS
                ),
                params![document_id],
            )
            .await?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await? {
            chunks.push(DocumentChunk {
                id: text(&row, 0)?,
                document_id: text(&row, 1)?,
                chunk_index: int(&row, 2)?,
                content: text(&row, 3)?,
                embedding: embedding_from_bytes(&blob(&row, 4)?),
                model_name: text(&row, 5)?,
                page: opt_int(&row, 6)?,
                filename: text(&row, 7)?,
                path: opt_text(&row, 8)?,
            });
        }
        Ok(chunks)
    }

    async fn rag_stats(&self) -> Result<RagStats, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT COUNT(*), COUNT(DISTINCT document_id) FROM document_chunks",
                (),
            )
            .await?;
        let (total_chunks, documents_with_chunks) = match rows.next().await? {
            Some(row) => (int(&row, 0)?, int(&row, 1)?),
            None => (0, 0),
        };
        let avg_chunks_per_document = if documents_with_chunks > 0 {
            total_chunks as f64 / documents_with_chunks as f64
        } else {
            0.0
        };
        Ok(RagStats {
            total_chunks,
            documents_with_chunks,
            avg_chunks_per_document,
        })
    }
}

#[async_trait]
impl VectorSearch for SqliteProvider {
    async fn similarity_search(
        &self,
        query: &[f32],
        model_name: &str,
        top_k: u32,
    ) -> Result<Vec<ChunkMatch>, PromptError> {
        let conn = self.connect()?;
        let statement = sql::similarity_search(query, top_k);
        debug!(
            model = %model_name,
            dimensions = query.len(),
            top_k,
            "Executing similarity search"
        );

        let mut rows = conn
            .query(
                &statement,
                vec![
                    TursoValue::Text(model_name.to_string()),
                    TursoValue::Integer(query.len() as i64),
                ],
            )
            .await?;

        let mut matches = Vec::new();
        while let Some(row) = rows.next().await? {
            matches.push(ChunkMatch {
                document_id: text(&row, 0)?,
                filename: text(&row, 1)?,
                content: text(&row, 2)?,
                page: opt_int(&row, 3)?,
                similarity: real(&row, 4)?,
            });
        }
        Ok(matches)
    }
}

#[async_trait]
impl ChatStore for SqliteProvider {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: &str,
    ) -> Result<Conversation, PromptError> {
        let conn = self.connect()?;
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            &format!(
                "INSERT INTO conversations ({}) VALUES (?, ?, ?, ?, ?)",
                sql::CONVERSATION_COLUMNS
            ),
            params![
                conversation.id.clone(),
                user_id,
                title,
                format_time(now),
                format_time(now)
            ],
        )
        .await?;
        Ok(conversation)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM conversations WHERE id = ?",
                    sql::CONVERSATION_COLUMNS
                ),
                params![id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(conversation_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM conversations WHERE user_id = ? ORDER BY updated_at DESC",
                    sql::CONVERSATION_COLUMNS
                ),
                params![user_id],
            )
            .await?;
        let mut conversations = Vec::new();
        while let Some(row) = rows.next().await? {
            conversations.push(conversation_from_row(&row)?);
        }
        Ok(conversations)
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        tokens: i64,
    ) -> Result<Message, PromptError> {
        let mut conn = self.connect()?;
        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            tokens,
            created_at: now,
        };

        let tx = conn.transaction().await?;
        let touched = tx
            .execute(
                "UPDATE conversations SET updated_at = ? WHERE id = ?",
                params![format_time(now), conversation_id],
            )
            .await?;
        if touched == 0 {
            tx.rollback().await?;
            return Err(PromptError::StorageOperationFailed(format!(
                "Conversation {conversation_id} not found"
            )));
        }
        tx.execute(
            &format!(
                "INSERT INTO messages ({}) VALUES (?, ?, ?, ?, ?, ?)",
                sql::MESSAGE_COLUMNS
            ),
            params![
                message.id.clone(),
                conversation_id,
                role.as_str(),
                content,
                tokens,
                format_time(now)
            ],
        )
        .await?;
        tx.commit().await?;

        Ok(message)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM messages WHERE conversation_id = ? ORDER BY created_at ASC",
                    sql::MESSAGE_COLUMNS
                ),
                params![conversation_id],
            )
            .await?;
        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            messages.push(message_from_row(&row)?);
        }
        Ok(messages)
    }
}

#[async_trait]
impl UsageStore for SqliteProvider {
    async fn get_usage(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<UsageStat>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM usage_stats WHERE user_id = ? AND session_id = ?",
                    sql::USAGE_COLUMNS
                ),
                params![user_id, session_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(usage_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn apply_usage(
        &self,
        user_id: &str,
        session_id: &str,
        delta: &UsageDelta,
    ) -> Result<UsageStat, PromptError> {
        let _guard = self.usage_writes.lock().await;
        let conn = self.connect()?;
        let at = format_time(delta.at);
        conn.execute(
            sql::UPSERT_USAGE,
            vec![
                TursoValue::Text(user_id.to_string()),
                TursoValue::Text(session_id.to_string()),
                TursoValue::Integer(delta.messages),
                TursoValue::Integer(delta.tokens),
                TursoValue::Integer(delta.errors),
                TursoValue::Real(success_rate(delta.messages, delta.errors)),
                TursoValue::Integer(delta.response_time_ms.unwrap_or(0)),
                TursoValue::Text(at.clone()),
                TursoValue::Text(at),
                delta
                    .response_time_ms
                    .map(TursoValue::Integer)
                    .unwrap_or(TursoValue::Null),
            ],
        )
        .await?;

        self.get_usage(user_id, session_id).await?.ok_or_else(|| {
            PromptError::StorageOperationFailed(format!(
                "Usage row {user_id}/{session_id} missing after upsert"
            ))
        })
    }
}

#[async_trait]
impl SettingsStore for SqliteProvider {
    async fn get_ai_settings(&self) -> Result<AiSettings, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT current_model, avatar_url, updated_by FROM ai_settings WHERE id = 1",
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(AiSettings {
                current_model: opt_text(&row, 0)?,
                avatar_url: opt_text(&row, 1)?,
                updated_by: opt_text(&row, 2)?,
            }),
            None => Ok(AiSettings::default()),
        }
    }

    async fn save_ai_settings(&self, settings: &AiSettings) -> Result<(), PromptError> {
        let conn = self.connect()?;
        let now = format_time(Utc::now());
        let updated = conn
            .execute(
                "UPDATE ai_settings SET current_model = ?, avatar_url = ?, updated_by = ?, updated_at = ? WHERE id = 1",
                vec![
                    opt_value(settings.current_model.as_deref()),
                    opt_value(settings.avatar_url.as_deref()),
                    opt_value(settings.updated_by.as_deref()),
                    TursoValue::Text(now.clone()),
                ],
            )
            .await?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO ai_settings (id, current_model, avatar_url, updated_by, updated_at) VALUES (1, ?, ?, ?, ?)",
                vec![
                    opt_value(settings.current_model.as_deref()),
                    opt_value(settings.avatar_url.as_deref()),
                    opt_value(settings.updated_by.as_deref()),
                    TursoValue::Text(now),
                ],
            )
            .await?;
        }
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM profiles WHERE user_id = ?", sql::PROFILE_COLUMNS),
                params![user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(profile_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, PromptError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM profiles ORDER BY user_id", sql::PROFILE_COLUMNS),
                (),
            )
            .await?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next().await? {
            profiles.push(profile_from_row(&row)?);
        }
        Ok(profiles)
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), PromptError> {
        let conn = self.connect()?;
        let updated = conn
            .execute(
                "UPDATE profiles SET name = ?, role = ?, area = ?, preferred_model = ? WHERE user_id = ?",
                vec![
                    opt_value(profile.name.as_deref()),
                    TursoValue::Text(profile.role.as_str().to_string()),
                    opt_value(profile.area.as_deref()),
                    opt_value(profile.preferred_model.as_deref()),
                    TursoValue::Text(profile.user_id.clone()),
                ],
            )
            .await?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO profiles (user_id, name, role, area, preferred_model) VALUES (?, ?, ?, ?, ?)",
                vec![
                    TursoValue::Text(profile.user_id.clone()),
                    opt_value(profile.name.as_deref()),
                    TursoValue::Text(profile.role.as_str().to_string()),
                    opt_value(profile.area.as_deref()),
                    opt_value(profile.preferred_model.as_deref()),
                ],
            )
            .await?;
        }
        Ok(())
    }

    async fn dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, PromptError> {
        let conn = self.connect()?;

        let mut rows = conn
            .query("SELECT COUNT(*), COALESCE(SUM(tokens), 0) FROM messages", ())
            .await?;
        let (total_messages, total_tokens) = match rows.next().await? {
            Some(row) => (int(&row, 0)?, int(&row, 1)?),
            None => (0, 0),
        };

        let since = format_time(since);
        let mut owners = conn
            .query(
                "SELECT DISTINCT user_id FROM conversations WHERE updated_at >= ?",
                params![since.clone()],
            )
            .await?;
        let mut active_users = 0;
        while owners.next().await?.is_some() {
            active_users += 1;
        }

        let total_documents = scalar_i64(&conn, "SELECT COUNT(*) FROM documents").await?;
        let total_conversations = scalar_i64(&conn, "SELECT COUNT(*) FROM conversations").await?;

        // Sessions that never got an answer have no response time to average.
        let mut rows = conn
            .query(
                "SELECT COALESCE(AVG(response_time_ms), 0) FROM usage_stats
                 WHERE session_start >= ? AND response_time_ms > 0",
                params![since.clone()],
            )
            .await?;
        let avg_response_time_ms = match rows.next().await? {
            Some(row) => real(&row, 0)?.round() as i64,
            None => 0,
        };

        let mut rows = conn
            .query(
                "SELECT COALESCE(SUM(error_count), 0) FROM usage_stats WHERE session_start >= ?",
                params![since],
            )
            .await?;
        let errors_last_30_days = match rows.next().await? {
            Some(row) => int(&row, 0)?,
            None => 0,
        };

        Ok(DashboardStats {
            total_messages,
            total_tokens,
            active_users,
            total_documents,
            total_conversations,
            avg_response_time_ms,
            errors_last_30_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_bytes_are_little_endian_f32() {
        let bytes = embedding_to_bytes(&[1.0, -0.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &1.0f32.to_le_bytes());
        assert_eq!(embedding_from_bytes(&bytes), vec![1.0, -0.5]);
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let earlier = parse_time("2025-01-01T10:00:00Z").unwrap();
        let later = parse_time("2025-01-01T10:00:00.5Z").unwrap();
        assert!(format_time(earlier) < format_time(later));
    }
}
