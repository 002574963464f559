//! Retrieval-augmented chat engine.
//!
//! `RagEngine` is constructed once at startup and shared through `Arc`.
//! Its index is loaded (or built) by [`RagEngine::initialize`], normally on a
//! background task, and requests are refused with
//! [`KnowledgeError::NotReady`] until that finishes.
//!
//! Lifecycle: `Uninitialized -> Initializing -> Ready | Failed(reason)`.
//! A failed engine can be initialized again.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::prompt::{self, ErrorKind, HistoryEntry};
use crate::config::{Config, KnowledgeConfig};
use crate::knowledge::{IndexStats, KnowledgeError, KnowledgeIndex, QueryMode, corpus};
use crate::llm::{LlmProvider, providers};

/// Reply used when context retrieval fails.
pub const RETRIEVAL_APOLOGY: &str =
    "I apologize, but I'm having trouble accessing my knowledge base right now.";
/// Reply used when the LLM call fails.
pub const GENERATION_APOLOGY: &str =
    "I apologize, but I'm having trouble generating a response right now. Please try again.";

pub const SOURCE_GRAPH: &str = "knowledge_graph";
pub const SOURCE_VECTOR: &str = "vector_search";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initializing => "initializing",
            EngineState::Ready => "ready",
            EngineState::Failed(_) => "failed",
        }
    }
}

/// Answer to one `/chat` request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub sources: Vec<String>,
    pub conversation_id: String,
}

/// Payload of `/debug/graph-status`.
#[derive(Debug, Clone, Serialize)]
pub struct EngineDebugInfo {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub index_loaded: bool,
    pub provider: String,
    pub data_dir: String,
    pub storage_dir: String,
    pub documents: usize,
    pub chunks: usize,
    pub entities: usize,
    pub relations: usize,
}

struct Slot {
    state: EngineState,
    index: Option<Arc<KnowledgeIndex>>,
}

pub struct RagEngine {
    slot: RwLock<Slot>,
    provider: LlmProvider,
    knowledge: KnowledgeConfig,
    system_prompt: String,
}

impl RagEngine {
    pub fn new(provider: LlmProvider, knowledge: KnowledgeConfig, system_prompt: String) -> Self {
        Self {
            slot: RwLock::new(Slot {
                state: EngineState::Uninitialized,
                index: None,
            }),
            provider,
            knowledge,
            system_prompt,
        }
    }

    pub async fn state(&self) -> EngineState {
        self.slot.read().await.state.clone()
    }

    pub async fn is_ready(&self) -> bool {
        self.slot.read().await.state == EngineState::Ready
    }

    /// Load the persisted index from `storage_dir`, or build one from
    /// `data_dir` when none exists or `force_rebuild` is set.
    pub async fn initialize(&self, force_rebuild: bool) -> Result<IndexStats, KnowledgeError> {
        {
            let mut slot = self.slot.write().await;
            slot.state = EngineState::Initializing;
            slot.index = None;
        }
        info!(
            data_dir = %self.knowledge.data_dir.display(),
            storage_dir = %self.knowledge.storage_dir.display(),
            force_rebuild,
            "initializing knowledge engine"
        );

        let knowledge = self.knowledge.clone();
        let result = tokio::task::spawn_blocking(move || load_or_build(&knowledge, force_rebuild))
            .await
            .map_err(|e| KnowledgeError::Index(format!("initialize join: {e}")))
            .and_then(|r| r);

        let mut slot = self.slot.write().await;
        match result {
            Ok(index) => {
                let stats = index.stats();
                slot.index = Some(Arc::new(index));
                slot.state = EngineState::Ready;
                info!(
                    documents = stats.documents,
                    chunks = stats.chunks,
                    entities = stats.entities,
                    relations = stats.relations,
                    "knowledge engine ready"
                );
                Ok(stats)
            }
            Err(e) => {
                error!(error = %e, "knowledge engine failed to initialize");
                slot.state = EngineState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Run one question through retrieval and generation.
    ///
    /// Only a not-ready engine is an error. Retrieval and generation
    /// failures are answered with an apology instead.
    pub async fn process_message(
        &self,
        message: &str,
        history: &[HistoryEntry],
    ) -> Result<ChatOutcome, KnowledgeError> {
        let index = {
            let slot = self.slot.read().await;
            match (&slot.state, &slot.index) {
                (EngineState::Ready, Some(index)) => index.clone(),
                _ => return Err(KnowledgeError::NotReady),
            }
        };

        let query = message.trim().to_string();
        let conversation_id = Utc::now().format("conv_%Y%m%d_%H%M%S").to_string();
        let intent = prompt::extract_intent(&query);
        info!(%conversation_id, intent = intent.as_str(), history = history.len(), "chat request");

        let (context, sources) = if prompt::should_use_context(&query) {
            match retrieve_context(index, query.clone()).await {
                Ok((_, 0)) => {
                    info!(%conversation_id, "no passages matched; not calling the llm");
                    return Ok(ChatOutcome {
                        response: prompt::error_response(ErrorKind::NoContext).to_string(),
                        sources: Vec::new(),
                        conversation_id,
                    });
                }
                Ok((context, _)) => (
                    context,
                    vec![SOURCE_GRAPH.to_string(), SOURCE_VECTOR.to_string()],
                ),
                Err(e) => {
                    warn!(%conversation_id, error = %e, "context retrieval failed");
                    return Ok(ChatOutcome {
                        response: RETRIEVAL_APOLOGY.to_string(),
                        sources: Vec::new(),
                        conversation_id,
                    });
                }
            }
        } else {
            debug!(%conversation_id, "greeting; retrieval skipped");
            (String::new(), Vec::new())
        };

        let user_prompt = prompt::format_context_prompt(&context, history, &query);
        let response = match self
            .provider
            .complete(&user_prompt, Some(&self.system_prompt))
            .await
        {
            Ok(reply) => {
                if let Some(usage) = reply.usage {
                    debug!(
                        input_tokens = usage.input_tokens,
                        output_tokens = usage.output_tokens,
                        "llm usage"
                    );
                }
                reply.text
            }
            Err(e) => {
                warn!(%conversation_id, provider = self.provider.name(), error = %e, "generation failed");
                GENERATION_APOLOGY.to_string()
            }
        };

        Ok(ChatOutcome {
            response,
            sources,
            conversation_id,
        })
    }

    pub async fn debug_info(&self) -> EngineDebugInfo {
        let slot = self.slot.read().await;
        let stats = slot.index.as_ref().map(|i| i.stats()).unwrap_or_default();
        EngineDebugInfo {
            status: slot.state.as_str(),
            error: match &slot.state {
                EngineState::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
            index_loaded: slot.index.is_some(),
            provider: self.provider.name().to_string(),
            data_dir: self.knowledge.data_dir.display().to_string(),
            storage_dir: self.knowledge.storage_dir.display().to_string(),
            documents: stats.documents,
            chunks: stats.chunks,
            entities: stats.entities,
            relations: stats.relations,
        }
    }
}

/// Build the engine described by `config`, or `None` when its LLM provider
/// cannot be built (for example `openai` with no API key). The server then
/// keeps running with `/chat` disabled.
pub fn build_engine(config: &Config) -> Option<Arc<RagEngine>> {
    match providers::build(&config.llm, config.llm_api_key.clone()) {
        Ok(provider) => {
            info!(provider = provider.name(), "llm provider ready");
            let system_prompt = prompt::system_prompt(
                config.profile.system_prompt_path.as_deref(),
                &config.profile.name,
            );
            Some(Arc::new(RagEngine::new(
                provider,
                config.knowledge.clone(),
                system_prompt,
            )))
        }
        Err(e) => {
            warn!(error = %e, "llm provider unavailable; retrieval chat disabled");
            None
        }
    }
}

fn load_or_build(
    knowledge: &KnowledgeConfig,
    force_rebuild: bool,
) -> Result<KnowledgeIndex, KnowledgeError> {
    if !force_rebuild {
        if let Some(index) = KnowledgeIndex::load_existing(&knowledge.storage_dir, &knowledge.graph)? {
            info!("loaded persisted knowledge index");
            return Ok(index);
        }
    }
    let documents = corpus::load(&knowledge.data_dir)?;
    info!(documents = documents.len(), "building knowledge index");
    KnowledgeIndex::build(
        &knowledge.storage_dir,
        &documents,
        knowledge.chunk_size,
        &knowledge.graph,
    )
}

/// Graph and vector context for `query`, combined into one block, and the
/// total number of passages quoted in it.
async fn retrieve_context(
    index: Arc<KnowledgeIndex>,
    query: String,
) -> Result<(String, usize), KnowledgeError> {
    tokio::task::spawn_blocking(move || {
        let graph = index.query(&query, QueryMode::Graph)?;
        let vector = index.query(&query, QueryMode::Vector)?;
        Ok((
            format!(
                "Graph Context:\n{}\n\nVector Context:\n{}",
                graph.text, vector.text
            ),
            graph.passages + vector.passages,
        ))
    })
    .await
    .map_err(|e| KnowledgeError::Index(format!("retrieval join: {e}")))?
}
