//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `FOLIO_STORE_PATH`, `FOLIO_LOG_LEVEL`, `FOLIO_DATA_DIR`
//! and `LLM_API_KEY` from the environment.
//!
//! # Module layout
//!
//! - **types**: Public configuration structs (`Config`, `StoreConfig`, …).
//! - **raw**: Raw TOML deserialization types (`RawConfig`, `RawLlm`, …).
//!   These mirror the file shape and use serde defaults; kept private.
//! - **load**: Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`, `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{env_overrides, expand_home, load, load_from};
pub use types::*;

impl Config {
    /// Safe `Config` for tests: dummy LLM, no API key, no store.
    pub fn test_default(work_dir: &std::path::Path) -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:0".into(),
                log_level: "info".into(),
                log_file: None,
                cors_origins: vec!["*".into()],
            },
            store: StoreConfig {
                path: None,
                history_limit: raw::default_history_limit(),
                sessions_limit: raw::default_sessions_limit(),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                    max_tokens: 64,
                },
            },
            llm_api_key: None,
            knowledge: KnowledgeConfig {
                data_dir: work_dir.join("data"),
                storage_dir: work_dir.join("index"),
                chunk_size: raw::default_chunk_size(),
                graph: KgConfig::default(),
            },
            profile: ProfileConfig::default(),
            contact: ContactConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const MINIMAL_TOML: &str = r#"
[server]
bind = "0.0.0.0:9000"
log_level = "info"

[store]
path = "/tmp/folio-test.db"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.server.log_level, "info");
        assert_eq!(
            cfg.store.path.as_deref(),
            Some(std::path::Path::new("/tmp/folio-test.db"))
        );
    }

    #[test]
    fn empty_file_uses_defaults() {
        let f = write_toml("");
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.llm.provider, "openai");
        assert!(cfg.store.path.is_none());
        assert_eq!(cfg.contact, ContactConfig::default());
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.folio");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".folio"));
    }

    #[test]
    fn absolute_path_unchanged() {
        let p = expand_home("/absolute/path");
        assert_eq!(p, std::path::PathBuf::from("/absolute/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(
            std::path::Path::new("/nonexistent/config.toml"),
            &Overrides::default(),
        );
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
    }

    #[test]
    fn env_store_path_override() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = Overrides {
            store_path: Some("/tmp/override.db".into()),
            ..Default::default()
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(
            cfg.store.path,
            Some(std::path::PathBuf::from("/tmp/override.db"))
        );
    }

    #[test]
    fn env_log_level_override() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = Overrides {
            log_level: Some("debug".into()),
            ..Default::default()
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(cfg.server.log_level, "debug");
    }

    #[test]
    fn env_data_dir_and_key_override() {
        let f = write_toml(MINIMAL_TOML);
        let overrides = Overrides {
            data_dir: Some("/srv/profile".into()),
            llm_api_key: Some("sk-test".into()),
            ..Default::default()
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(
            cfg.knowledge.data_dir,
            std::path::PathBuf::from("/srv/profile")
        );
        assert_eq!(cfg.llm_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn parse_profile_and_contact() {
        let toml = r#"
[profile]
name = "DevBot"
starters = ["Hello there"]

[contact]
name = "Sam Rivera"
email = "sam@example.org"
github = "https://github.com/samr"
"#;
        let f = write_toml(toml);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.profile.name, "DevBot");
        assert_eq!(cfg.profile.starters, vec!["Hello there".to_string()]);
        assert_eq!(
            cfg.profile.capabilities,
            ProfileConfig::default().capabilities
        );
        assert_eq!(cfg.contact.name, "Sam Rivera");
        assert_eq!(cfg.contact.title, "Software Engineer");
        assert_eq!(cfg.contact.github, "https://github.com/samr");
    }

    #[test]
    fn parse_graph_tuning_partial() {
        let toml = r#"
[knowledge]
chunk_size = 512

[knowledge.graph]
max_chunks = 12
fts_share = 0.25
"#;
        let f = write_toml(toml);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.knowledge.chunk_size, 512);
        assert_eq!(cfg.knowledge.graph.max_chunks, 12);
        assert_eq!(cfg.knowledge.graph.fts_share, 0.25);
        assert_eq!(cfg.knowledge.graph.bfs_max_depth, 2);
    }

    #[test]
    fn invalid_fts_share_rejected() {
        let f = write_toml("[knowledge.graph]\nfts_share = 1.5\n");
        let err = load_from(f.path(), &Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("fts_share"));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let f = write_toml("[knowledge]\nchunk_size = 0\n");
        assert!(load_from(f.path(), &Overrides::default()).is_err());
    }

    const BASE_TOML: &str = r#"
[server]
bind = "127.0.0.1:8000"
log_level = "info"

[llm]
default = "dummy"

[llm.openai]
model = "gpt-base"
temperature = 0.1
timeout_seconds = 30
api_base_url = "https://api.openai.com/v1/chat/completions"
"#;

    fn write_named(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let p = dir.path().join(name);
        std::fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn overlay_keeps_base_fields() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "base.toml", BASE_TOML);
        let overlay = r#"
[meta]
base = "base.toml"

[server]
log_level = "debug"
"#;
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let cfg = load_from(&overlay_path, &Overrides::default()).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
        assert_eq!(cfg.server.log_level, "debug");
    }

    #[test]
    fn overlay_wins_scalar() {
        let dir = TempDir::new().unwrap();
        write_named(&dir, "base.toml", BASE_TOML);
        let overlay = r#"
[meta]
base = "base.toml"

[llm.openai]
model = "gpt-overlay"
"#;
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let cfg = load_from(&overlay_path, &Overrides::default()).unwrap();
        assert_eq!(cfg.llm.openai.model, "gpt-overlay");
        assert_eq!(cfg.llm.openai.temperature, 0.1);
    }

    #[test]
    fn missing_base_errors() {
        let dir = TempDir::new().unwrap();
        let overlay = r#"
[meta]
base = "nonexistent.toml"
"#;
        let overlay_path = write_named(&dir, "overlay.toml", overlay);
        let result = load_from(&overlay_path, &Overrides::default());
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("cannot read"));
    }

    #[test]
    fn cycle_detection() {
        let dir = TempDir::new().unwrap();
        let self_path = dir.path().join("self.toml");
        let content = format!("[meta]\nbase = \"{}\"\n\n{BASE_TOML}", self_path.display());
        std::fs::write(&self_path, content).unwrap();
        let result = load_from(&self_path, &Overrides::default());
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("circular"));
    }
}
