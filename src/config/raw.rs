//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape, the serde target before resolution.
#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub store: RawStore,
    #[serde(default)]
    pub llm: RawLlm,
    #[serde(default)]
    pub knowledge: RawKnowledge,
    #[serde(default)]
    pub profile: RawProfile,
    #[serde(default)]
    pub contact: RawContact,
}

// ── Server ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawServer {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            log_file: None,
            cors_origins: default_cors_origins(),
        }
    }
}

// ── Store ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawStore {
    /// SQLite file backing the session ledger. Absent means no ledger.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_sessions_limit")]
    pub sessions_limit: usize,
}

impl Default for RawStore {
    fn default() -> Self {
        Self {
            path: None,
            history_limit: default_history_limit(),
            sessions_limit: default_sessions_limit(),
        }
    }
}

// ── LLM ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: RawOpenAiConfig::default(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,
    #[serde(default = "default_openai_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_openai_max_tokens")]
    pub max_tokens: u32,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_openai_timeout_seconds(),
            max_tokens: default_openai_max_tokens(),
        }
    }
}

// ── Knowledge ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawKnowledge {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub graph: RawKgTuning,
}

impl Default for RawKnowledge {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_dir: default_storage_dir(),
            chunk_size: default_chunk_size(),
            graph: RawKgTuning::default(),
        }
    }
}

/// Every field is optional; unset fields fall back to `KgConfig::default()`.
#[derive(Deserialize, Default)]
pub(super) struct RawKgTuning {
    pub min_entity_mentions: Option<usize>,
    pub bfs_max_depth: Option<usize>,
    pub edge_weight_threshold: Option<f32>,
    pub max_chunks: Option<usize>,
    pub fts_share: Option<f32>,
    pub max_seeds: Option<usize>,
}

// ── Profile ─────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub capabilities: Option<Vec<String>>,
    pub limitations: Option<Vec<String>>,
    pub example_questions: Option<Vec<String>>,
    pub starters: Option<Vec<String>>,
    /// Optional file replacing the built-in system prompt.
    pub system_prompt: Option<String>,
}

#[derive(Deserialize, Default)]
pub(super) struct RawContact {
    pub name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
}

// ── Defaults ────────────────────────────────────────────────────────────────

pub(super) fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

pub(super) fn default_history_limit() -> usize {
    1000
}

pub(super) fn default_sessions_limit() -> usize {
    100
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_openai_api_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_openai_temperature() -> f32 {
    0.3
}

fn default_openai_timeout_seconds() -> u64 {
    60
}

fn default_openai_max_tokens() -> u32 {
    1000
}

pub(super) fn default_data_dir() -> String {
    "data".to_string()
}

pub(super) fn default_storage_dir() -> String {
    "data/index".to_string()
}

pub(super) fn default_chunk_size() -> usize {
    1024
}
