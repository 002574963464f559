//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies the `FOLIO_*` env overrides.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

use super::raw::RawConfig;
use super::types::*;

/// Deep-merge two TOML values.
/// Tables are merged recursively; the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Collect overrides from the process environment.
pub fn env_overrides() -> Overrides {
    Overrides {
        store_path: env::var("FOLIO_STORE_PATH").ok().filter(|s| !s.is_empty()),
        log_level: env::var("FOLIO_LOG_LEVEL").ok().filter(|s| !s.is_empty()),
        data_dir: env::var("FOLIO_DATA_DIR").ok().filter(|s| !s.is_empty()),
        llm_api_key: env::var("LLM_API_KEY").ok().filter(|s| !s.is_empty()),
    }
}

/// Load config from the given path, or `config/default.toml`, then apply env-var overrides.
/// If no path is given and `config/default.toml` does not exist, the built-in
/// defaults are used.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = env_overrides();

    if let Some(path) = config_path {
        return load_from(Path::new(path), &overrides);
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, &overrides)
    } else {
        Ok(resolve(RawConfig::default(), &overrides))
    }
}

/// Internal loader. Accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    validate(&parsed)?;
    Ok(resolve(parsed, overrides))
}

fn validate(parsed: &RawConfig) -> Result<(), AppError> {
    if parsed.knowledge.chunk_size == 0 {
        return Err(AppError::Config("knowledge.chunk_size must be > 0".into()));
    }
    if let Some(share) = parsed.knowledge.graph.fts_share {
        if !(0.0..=1.0).contains(&share) {
            return Err(AppError::Config(format!(
                "knowledge.graph.fts_share must be within 0..=1, got {share}"
            )));
        }
    }
    Ok(())
}

fn resolve(parsed: RawConfig, overrides: &Overrides) -> Config {
    let s = parsed.server;
    let log_level = overrides.log_level.clone().unwrap_or(s.log_level);

    let store_path = overrides
        .store_path
        .as_deref()
        .or(parsed.store.path.as_deref())
        .map(expand_home);

    let data_dir = overrides
        .data_dir
        .as_deref()
        .unwrap_or(&parsed.knowledge.data_dir)
        .to_string();

    let kg_defaults = KgConfig::default();
    let g = parsed.knowledge.graph;
    let graph = KgConfig {
        min_entity_mentions: g
            .min_entity_mentions
            .unwrap_or(kg_defaults.min_entity_mentions),
        bfs_max_depth: g.bfs_max_depth.unwrap_or(kg_defaults.bfs_max_depth),
        edge_weight_threshold: g
            .edge_weight_threshold
            .unwrap_or(kg_defaults.edge_weight_threshold),
        max_chunks: g.max_chunks.unwrap_or(kg_defaults.max_chunks),
        fts_share: g.fts_share.unwrap_or(kg_defaults.fts_share),
        max_seeds: g.max_seeds.unwrap_or(kg_defaults.max_seeds),
    };

    let profile_defaults = ProfileConfig::default();
    let p = parsed.profile;
    let profile = ProfileConfig {
        name: p.name.unwrap_or(profile_defaults.name),
        description: p.description.unwrap_or(profile_defaults.description),
        capabilities: p.capabilities.unwrap_or(profile_defaults.capabilities),
        limitations: p.limitations.unwrap_or(profile_defaults.limitations),
        example_questions: p
            .example_questions
            .unwrap_or(profile_defaults.example_questions),
        starters: p.starters.unwrap_or(profile_defaults.starters),
        system_prompt_path: p.system_prompt.as_deref().map(expand_home),
    };

    let contact_defaults = ContactConfig::default();
    let c = parsed.contact;
    let contact = ContactConfig {
        name: c.name.unwrap_or(contact_defaults.name),
        title: c.title.unwrap_or(contact_defaults.title),
        email: c.email.unwrap_or(contact_defaults.email),
        phone: c.phone.unwrap_or(contact_defaults.phone),
        linkedin: c.linkedin.unwrap_or(contact_defaults.linkedin),
        github: c.github.unwrap_or(contact_defaults.github),
    };

    Config {
        server: ServerConfig {
            bind: s.bind,
            log_level,
            log_file: s.log_file.as_deref().map(expand_home),
            cors_origins: s.cors_origins,
        },
        store: StoreConfig {
            path: store_path,
            history_limit: parsed.store.history_limit.max(1),
            sessions_limit: parsed.store.sessions_limit.max(1),
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
                max_tokens: parsed.llm.openai.max_tokens,
            },
        },
        llm_api_key: overrides.llm_api_key.clone(),
        knowledge: KnowledgeConfig {
            data_dir: expand_home(&data_dir),
            storage_dir: expand_home(&parsed.knowledge.storage_dir),
            chunk_size: parsed.knowledge.chunk_size,
            graph,
        },
        profile,
        contact,
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
