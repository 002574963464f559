//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the rest of the crate
//! consumes. Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;

// ── Server ──────────────────────────────────────────────────────────────────

/// HTTP listener and process-level settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the axum listener to.
    pub bind: String,
    pub log_level: String,
    /// Append log lines here instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Allowed CORS origins. A single `"*"` allows any origin.
    pub cors_origins: Vec<String>,
}

// ── Store ───────────────────────────────────────────────────────────────────

/// Session ledger storage.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file. `None` disables the ledger.
    pub path: Option<PathBuf>,
    /// Maximum messages returned by a history read.
    pub history_limit: usize,
    /// Maximum sessions returned by a session listing.
    pub sessions_limit: usize,
}

// ── LLM ─────────────────────────────────────────────────────────────────────

/// OpenAI-compatible provider configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider name: `"openai"`, `"openai-compatible"` or `"dummy"`.
    pub provider: String,
    pub openai: OpenAiConfig,
}

// ── Knowledge ───────────────────────────────────────────────────────────────

/// Tuning for entity extraction and graph-guided retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct KgConfig {
    /// An entity must appear in at least this many chunks to be kept.
    pub min_entity_mentions: usize,
    pub bfs_max_depth: usize,
    /// Relations below this normalised weight are not traversed.
    pub edge_weight_threshold: f32,
    /// Passage budget per query.
    pub max_chunks: usize,
    /// Share of the passage budget reserved for plain ranked passages in graph mode.
    pub fts_share: f32,
    pub max_seeds: usize,
}

impl Default for KgConfig {
    fn default() -> Self {
        Self {
            min_entity_mentions: 2,
            bfs_max_depth: 2,
            edge_weight_threshold: 0.15,
            max_chunks: 8,
            fts_share: 0.5,
            max_seeds: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnowledgeConfig {
    /// Directory holding the profile corpus (`.md`, `.txt`, `projects.yaml`, `timeline.json`).
    pub data_dir: PathBuf,
    /// Directory the built index is persisted to.
    pub storage_dir: PathBuf,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    pub graph: KgConfig,
}

// ── Profile / contact ───────────────────────────────────────────────────────

/// Persona metadata served by `/info` and `/conversation/suggest`.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub limitations: Vec<String>,
    pub example_questions: Vec<String>,
    pub starters: Vec<String>,
    pub system_prompt_path: Option<PathBuf>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            name: "FolioBot".into(),
            description: "Personal portfolio chatbot".into(),
            capabilities: vec![
                "Answer questions about my experience and skills".into(),
                "Provide information about projects and achievements".into(),
                "Discuss technical expertise and career timeline".into(),
            ],
            limitations: vec![
                "Only provides information about the portfolio owner".into(),
                "Cannot answer general questions unrelated to the portfolio".into(),
                "Information is based on provided portfolio data".into(),
            ],
            example_questions: vec![
                "What are your main technical skills?".into(),
                "Tell me about your recent projects".into(),
                "What's your experience with backend development?".into(),
            ],
            starters: vec![
                "Hi! Tell me about yourself.".into(),
                "What are your core technical skills?".into(),
                "Show me your most recent projects.".into(),
                "Tell me about your career journey.".into(),
            ],
            system_prompt_path: None,
        }
    }
}

/// Static contact record served by `GET /contact`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactConfig {
    pub name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub linkedin: String,
    pub github: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            name: "Portfolio Owner".into(),
            title: "Software Engineer".into(),
            email: "hello@example.com".into(),
            phone: String::new(),
            linkedin: String::new(),
            github: String::new(),
        }
    }
}

// ── Top-level ────────────────────────────────────────────────────────────────

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    /// Provider credential, read from `LLM_API_KEY` only.
    pub llm_api_key: Option<String>,
    pub knowledge: KnowledgeConfig,
    pub profile: ProfileConfig,
    pub contact: ContactConfig,
}

/// Values that take precedence over the file, normally read from `FOLIO_*`
/// environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub store_path: Option<String>,
    pub log_level: Option<String>,
    pub data_dir: Option<String>,
    pub llm_api_key: Option<String>,
}
