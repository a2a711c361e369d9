//! Defaults shared by the library and the server configuration.

/// Chunk window size in characters.
pub const CHUNK_SIZE: usize = 800;
/// Characters shared by consecutive chunks.
pub const CHUNK_OVERLAP: usize = 150;
/// Chunks at or below this length are discarded as noise.
pub const MIN_CHUNK_CHARS: usize = 10;

/// Chunks embedded concurrently before a batch is persisted.
pub const INGEST_BATCH_SIZE: usize = 10;
/// Pause between ingestion batches, in milliseconds.
pub const INGEST_BATCH_DELAY_MS: u64 = 100;

/// Largest file accepted by the extractors (20 MiB).
pub const MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;
/// Ceiling on extracted characters per file.
pub const MAX_EXTRACTED_CHARS: usize = 200_000;
/// PDF pages read before extraction stops.
pub const MAX_PDF_PAGES: usize = 50;
/// Files accepted in a single upload.
pub const MAX_UPLOAD_FILES: usize = 10;
/// Combined size accepted in a single upload (200 MiB).
pub const MAX_UPLOAD_TOTAL_BYTES: u64 = 200 * 1024 * 1024;
/// Characters of extracted text folded into the de-duplication hash.
pub const CONTENT_HASH_PREFIX_CHARS: usize = 1000;

/// Nearest chunks requested from the similarity search.
pub const VECTOR_TOP_K: u32 = 8;
/// Documents kept by the keyword ranker.
pub const KEYWORD_TOP_N: usize = 5;
/// Characters of a document included in a keyword context block.
pub const KEYWORD_CONTENT_CHARS: usize = 3000;

/// Conversation turns forwarded to the completion endpoint.
pub const HISTORY_LIMIT: usize = 10;
/// Output token ceiling for a completion.
pub const MAX_OUTPUT_TOKENS: u32 = 1000;
/// Conversation titles are cut to this many characters.
pub const TITLE_MAX_CHARS: usize = 50;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-2025-04-14";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
