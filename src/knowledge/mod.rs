//! Profile knowledge: corpus loading, index build/reload, query dispatch.

pub mod corpus;
pub mod index;

use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::AppError;

pub use corpus::Document;
pub use index::{IndexStats, KnowledgeIndex};

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("knowledge engine is not ready")]
    NotReady,
    #[error("index error: {0}")]
    Index(String),
    #[error("corpus error: {0}")]
    Corpus(String),
}

impl From<KnowledgeError> for AppError {
    fn from(e: KnowledgeError) -> Self {
        AppError::Knowledge(e.to_string())
    }
}

/// Retrieval strategy. `Hybrid` is accepted but currently answers exactly
/// like `Graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Graph,
    Vector,
    Hybrid,
}

impl QueryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryMode::Graph => "graph",
            QueryMode::Vector => "vector",
            QueryMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase hex SHA-256 of `content`.
pub(crate) fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
