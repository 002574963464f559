//! Persisted knowledge index: ranked passages plus an entity graph.
//!
//! Layout under the storage directory:
//!
//! - `passages.db`: SQLite with a `documents` table and an FTS5 `chunks`
//!   table ranked by `bm25`.
//! - `graph.json`: entities extracted from the chunks and weighted
//!   co-occurrence relations between them. Written last, so its presence
//!   marks a complete build.
//!
//! Vector mode returns the best-ranked passages. Graph mode seeds entities
//! from the query, expands them breadth-first over strong relations, and
//! merges the chunks they touch with the ranked passages.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use text_splitter::MarkdownSplitter;
use tracing::{debug, info, warn};

use super::corpus::Document;
use super::{KnowledgeError, QueryMode, sha256_hex};
use crate::config::KgConfig;

const DB_FILENAME: &str = "passages.db";
const GRAPH_FILENAME: &str = "graph.json";
const SCHEMA_VERSION: i64 = 1;

/// Words never used as passage search terms.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "did", "do", "does", "for",
    "from", "have", "how", "i", "in", "is", "it", "me", "my", "of", "on", "or", "tell", "that",
    "the", "this", "to", "was", "what", "when", "where", "which", "who", "why", "with", "you",
    "your",
];

// ── Graph types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Title Case phrase of two or more words.
    Concept,
    /// CamelCase identifier.
    System,
    /// Backtick or double-quote delimited term.
    Term,
    /// 2 to 5 letter ALL-CAPS word.
    Acronym,
}

impl EntityKind {
    fn as_str(self) -> &'static str {
        match self {
            EntityKind::Concept => "concept",
            EntityKind::System => "system",
            EntityKind::Term => "term",
            EntityKind::Acronym => "acronym",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Lowercase canonical name.
    pub name: String,
    pub kind: EntityKind,
    pub mentions: usize,
    pub chunk_ids: Vec<String>,
}

/// Undirected co-occurrence edge. `weight` is normalised into `(0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub a: String,
    pub b: String,
    pub weight: f32,
    pub chunk_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    /// Keyed by entity id (16 hex chars of `sha256(name)`).
    pub entities: HashMap<String, Entity>,
    pub relations: Vec<Relation>,
    pub built_at: String,
}

/// Context text for one query, with the number of passages it quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    pub text: String,
    pub passages: usize,
}

/// Counts reported by `/debug/graph-status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
    pub entities: usize,
    pub relations: usize,
}

struct Chunk {
    id: String,
    doc_id: String,
    text: String,
}

struct Passage {
    chunk_id: String,
    title: String,
    text: String,
}

// ── Index ─────────────────────────────────────────────────────────────────────

/// Read-only handle over a built index. All methods block; call them from
/// `spawn_blocking` on the async side.
#[derive(Debug)]
pub struct KnowledgeIndex {
    db_path: PathBuf,
    graph: KnowledgeGraph,
    cfg: KgConfig,
    stats: IndexStats,
}

impl KnowledgeIndex {
    /// Chunk, index and graph `documents` into `storage_dir`, replacing any
    /// previous build there.
    pub fn build(
        storage_dir: &Path,
        documents: &[Document],
        chunk_size: usize,
        cfg: &KgConfig,
    ) -> Result<Self, KnowledgeError> {
        if chunk_size == 0 {
            return Err(KnowledgeError::Index("chunk_size must be > 0".into()));
        }
        fs::create_dir_all(storage_dir).map_err(|e| {
            KnowledgeError::Index(format!("create {}: {e}", storage_dir.display()))
        })?;

        // Graph first goes away so a crash mid-build never looks complete.
        let graph_path = storage_dir.join(GRAPH_FILENAME);
        remove_if_exists(&graph_path)?;
        let db_path = storage_dir.join(DB_FILENAME);
        for suffix in ["", "-wal", "-shm"] {
            remove_if_exists(&PathBuf::from(format!("{}{suffix}", db_path.display())))?;
        }

        let splitter = MarkdownSplitter::new(chunk_size);
        let mut chunks = Vec::new();
        for doc in documents {
            chunks.extend(
                splitter
                    .chunks(&doc.text)
                    .filter(|t| !t.trim().is_empty())
                    .map(|text| Chunk {
                        id: uuid::Uuid::now_v7().to_string(),
                        doc_id: doc.id.clone(),
                        text: text.to_string(),
                    }),
            );
        }

        let mut conn = open_conn(&db_path)?;
        init_schema(&conn)?;
        let tx = conn
            .transaction()
            .map_err(|e| KnowledgeError::Index(format!("begin build tx: {e}")))?;
        for doc in documents {
            tx.execute(
                "INSERT OR REPLACE INTO documents (doc_id, title, source) VALUES (?1, ?2, ?3)",
                params![doc.id, doc.title, doc.source],
            )
            .map_err(|e| KnowledgeError::Index(format!("insert document: {e}")))?;
        }
        for (position, chunk) in chunks.iter().enumerate() {
            tx.execute(
                "INSERT INTO chunks (id, doc_id, text, position) VALUES (?1, ?2, ?3, ?4)",
                params![chunk.id, chunk.doc_id, chunk.text, position as i64],
            )
            .map_err(|e| KnowledgeError::Index(format!("insert chunk: {e}")))?;
        }
        tx.commit()
            .map_err(|e| KnowledgeError::Index(format!("commit build: {e}")))?;

        let graph = extract_graph(&chunks, cfg);
        let json = serde_json::to_string_pretty(&graph)
            .map_err(|e| KnowledgeError::Index(format!("serialize graph: {e}")))?;
        fs::write(&graph_path, json)
            .map_err(|e| KnowledgeError::Index(format!("write {}: {e}", graph_path.display())))?;

        let stats = IndexStats {
            documents: documents.len(),
            chunks: chunks.len(),
            entities: graph.entities.len(),
            relations: graph.relations.len(),
        };
        info!(
            documents = stats.documents,
            chunks = stats.chunks,
            entities = stats.entities,
            relations = stats.relations,
            "knowledge index built"
        );
        Ok(Self {
            db_path,
            graph,
            cfg: cfg.clone(),
            stats,
        })
    }

    /// Open a previous build. `Ok(None)` when `storage_dir` holds no
    /// complete index.
    pub fn load_existing(storage_dir: &Path, cfg: &KgConfig) -> Result<Option<Self>, KnowledgeError> {
        let db_path = storage_dir.join(DB_FILENAME);
        let graph_path = storage_dir.join(GRAPH_FILENAME);
        if !db_path.is_file() || !graph_path.is_file() {
            debug!(dir = %storage_dir.display(), "no persisted knowledge index");
            return Ok(None);
        }

        let data = fs::read_to_string(&graph_path)
            .map_err(|e| KnowledgeError::Index(format!("read {}: {e}", graph_path.display())))?;
        let graph: KnowledgeGraph = serde_json::from_str(&data)
            .map_err(|e| KnowledgeError::Index(format!("parse {}: {e}", graph_path.display())))?;

        let conn = open_conn(&db_path)?;
        let version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .map_err(|e| KnowledgeError::Index(format!("read schema version: {e}")))?;
        if version != SCHEMA_VERSION {
            return Err(KnowledgeError::Index(format!(
                "unsupported index schema version {version}, expected {SCHEMA_VERSION}"
            )));
        }
        let count = |sql: &str| -> Result<usize, KnowledgeError> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(|e| KnowledgeError::Index(format!("count rows: {e}")))
        };
        let stats = IndexStats {
            documents: count("SELECT COUNT(*) FROM documents")?,
            chunks: count("SELECT COUNT(*) FROM chunks")?,
            entities: graph.entities.len(),
            relations: graph.relations.len(),
        };
        info!(
            chunks = stats.chunks,
            entities = stats.entities,
            built_at = %graph.built_at,
            "knowledge index loaded"
        );
        Ok(Some(Self {
            db_path,
            graph,
            cfg: cfg.clone(),
            stats,
        }))
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Answer `query` with retrieved context text. Hybrid behaves as graph.
    pub fn query(&self, query: &str, mode: QueryMode) -> Result<Retrieval, KnowledgeError> {
        let retrieval = match mode {
            QueryMode::Vector => self.passages_context(query)?,
            QueryMode::Graph | QueryMode::Hybrid => self.graph_context(query)?,
        };
        debug!(%mode, passages = retrieval.passages, "query answered");
        Ok(retrieval)
    }

    fn passages_context(&self, query: &str) -> Result<Retrieval, KnowledgeError> {
        let passages = self.search(query, self.cfg.max_chunks)?;
        Ok(Retrieval {
            text: render_passages(&passages),
            passages: passages.len(),
        })
    }

    fn graph_context(&self, query: &str) -> Result<Retrieval, KnowledgeError> {
        let query_words: HashSet<String> = terms(query).into_iter().collect();

        // Whole-word matches only, so `ml` does not seed on "html".
        let mut seeds: Vec<(&String, &Entity)> = self
            .graph
            .entities
            .iter()
            .filter(|(_, e)| terms(&e.name).iter().any(|w| query_words.contains(w)))
            .collect();
        if seeds.is_empty() {
            debug!("no seed entities; falling back to ranked passages");
            return self.passages_context(query);
        }
        seeds.sort_by(|a, b| b.1.mentions.cmp(&a.1.mentions).then(a.1.name.cmp(&b.1.name)));
        seeds.truncate(self.cfg.max_seeds.max(1));

        let adj = self.adjacency();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        for (id, _) in &seeds {
            visited.insert(id.as_str());
            queue.push_back((id.as_str(), 0));
        }
        while let Some((id, depth)) = queue.pop_front() {
            if depth >= self.cfg.bfs_max_depth {
                continue;
            }
            for &(next, _) in adj.get(id).map(Vec::as_slice).unwrap_or_default() {
                if visited.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }

        // Score chunks: each visited entity mention adds 0.5, a ranked hit adds 1.
        let mut scores: HashMap<String, f32> = HashMap::new();
        for id in &visited {
            if let Some(entity) = self.graph.entities.get(*id) {
                for cid in &entity.chunk_ids {
                    *scores.entry(cid.clone()).or_insert(0.0) += 0.5;
                }
            }
        }
        let ranked_k = ((self.cfg.max_chunks as f32 * self.cfg.fts_share).ceil() as usize).max(1);
        for p in self.search(query, ranked_k)? {
            *scores.entry(p.chunk_id).or_insert(0.0) += 1.0;
        }
        let mut scored: Vec<(String, f32)> = scores.into_iter().collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(self.cfg.max_chunks);
        let ids: Vec<String> = scored.into_iter().map(|(id, _)| id).collect();
        let passages = self.passages_by_ids(&ids)?;

        let mut context = String::from("## Knowledge Graph Context\n");
        for (id, seed) in &seeds {
            let related: Vec<&str> = adj
                .get(id.as_str())
                .map(|n| {
                    let mut n = n.clone();
                    n.sort_by(|a, b| b.1.total_cmp(&a.1));
                    n.into_iter()
                        .take(5)
                        .filter_map(|(nid, _)| self.graph.entities.get(nid))
                        .map(|e| e.name.as_str())
                        .collect()
                })
                .unwrap_or_default();
            if related.is_empty() {
                context.push_str(&format!("{} [{}]\n", seed.name, seed.kind.as_str()));
            } else {
                context.push_str(&format!(
                    "{} [{}] related to: {}\n",
                    seed.name,
                    seed.kind.as_str(),
                    related.join(", ")
                ));
            }
        }
        context.push('\n');
        context.push_str(&render_passages(&passages));
        Ok(Retrieval {
            text: context,
            passages: passages.len(),
        })
    }

    /// Neighbours per entity id, over relations at or above the weight threshold.
    fn adjacency(&self) -> HashMap<&str, Vec<(&str, f32)>> {
        let mut adj: HashMap<&str, Vec<(&str, f32)>> = HashMap::new();
        for rel in &self.graph.relations {
            if rel.weight >= self.cfg.edge_weight_threshold {
                adj.entry(rel.a.as_str()).or_default().push((rel.b.as_str(), rel.weight));
                adj.entry(rel.b.as_str()).or_default().push((rel.a.as_str(), rel.weight));
            }
        }
        adj
    }

    /// BM25-ranked passages for the query's content words.
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, KnowledgeError> {
        let Some(fts_query) = fts5_or_query(query) else {
            return Ok(Vec::new());
        };
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let conn = open_conn(&self.db_path)?;
        let mut stmt = conn
            .prepare(
                "SELECT chunks.id, documents.title, chunks.text
                 FROM chunks
                 JOIN documents ON documents.doc_id = chunks.doc_id
                 WHERE chunks MATCH ?1
                 ORDER BY bm25(chunks)
                 LIMIT ?2",
            )
            .map_err(|e| KnowledgeError::Index(format!("prepare search: {e}")))?;
        let rows = stmt
            .query_map(params![fts_query, top_k as i64], |row| {
                Ok(Passage {
                    chunk_id: row.get(0)?,
                    title: row.get(1)?,
                    text: row.get(2)?,
                })
            })
            .map_err(|e| KnowledgeError::Index(format!("search: {e}")))?;
        rows.map(|r| r.map_err(|e| KnowledgeError::Index(format!("search row: {e}"))))
            .collect()
    }

    /// Fetch passages by chunk id, preserving the order of `ids`.
    fn passages_by_ids(&self, ids: &[String]) -> Result<Vec<Passage>, KnowledgeError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = open_conn(&self.db_path)?;
        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT chunks.id, documents.title, chunks.text
             FROM chunks
             JOIN documents ON documents.doc_id = chunks.doc_id
             WHERE chunks.id IN ({})",
            placeholders.join(", ")
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| KnowledgeError::Index(format!("prepare fetch: {e}")))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                Ok(Passage {
                    chunk_id: row.get(0)?,
                    title: row.get(1)?,
                    text: row.get(2)?,
                })
            })
            .map_err(|e| KnowledgeError::Index(format!("fetch: {e}")))?;
        let mut by_id: HashMap<String, Passage> = HashMap::new();
        for row in rows {
            let p = row.map_err(|e| KnowledgeError::Index(format!("fetch row: {e}")))?;
            by_id.insert(p.chunk_id.clone(), p);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

fn render_passages(passages: &[Passage]) -> String {
    let mut out = String::from("## Relevant Passages\n");
    for p in passages {
        out.push_str(&format!("\n[{}]\n{}\n", p.title, p.text.trim()));
    }
    out
}

// ── Storage helpers ───────────────────────────────────────────────────────────

fn open_conn(db_path: &Path) -> Result<Connection, KnowledgeError> {
    let conn = Connection::open(db_path)
        .map_err(|e| KnowledgeError::Index(format!("open {}: {e}", db_path.display())))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| KnowledgeError::Index(format!("set journal_mode WAL: {e}")))?;
    conn.pragma_update(None, "busy_timeout", 5000)
        .map_err(|e| KnowledgeError::Index(format!("set busy_timeout: {e}")))?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> Result<(), KnowledgeError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            doc_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            source TEXT NOT NULL
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS chunks USING fts5(
            id UNINDEXED,
            doc_id UNINDEXED,
            text,
            position UNINDEXED
        );

        PRAGMA user_version = 1;
        ",
    )
    .map_err(|e| KnowledgeError::Index(format!("initialize schema: {e}")))
}

fn remove_if_exists(path: &Path) -> Result<(), KnowledgeError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(KnowledgeError::Index(format!("remove {}: {e}", path.display()))),
    }
}

/// Lowercase content words of `text`: alphanumeric runs minus stopwords and
/// single characters.
fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Build an FTS5 `MATCH` expression that ORs the quoted content words of
/// `query`. `None` when nothing searchable remains.
fn fts5_or_query(query: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let quoted: Vec<String> = terms(query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .map(|t| format!("\"{t}\""))
        .collect();
    (!quoted.is_empty()).then(|| quoted.join(" OR "))
}

// ── Entity extraction ─────────────────────────────────────────────────────────

fn extract_graph(chunks: &[Chunk], cfg: &KgConfig) -> KnowledgeGraph {
    // name -> (kind, mentions, chunk ids)
    let mut candidates: HashMap<String, (EntityKind, usize, HashSet<String>)> = HashMap::new();
    for chunk in chunks {
        let lower = chunk.text.to_lowercase();
        for (name, kind) in entity_candidates(&chunk.text) {
            let n = count_occurrences(&lower, &name).max(1);
            let entry = candidates.entry(name).or_insert((kind, 0, HashSet::new()));
            entry.1 += n;
            entry.2.insert(chunk.id.clone());
        }
    }

    let entities: HashMap<String, Entity> = candidates
        .into_iter()
        .filter(|(name, (_, mentions, _))| {
            name.chars().count() > 1
                && !name.chars().all(|c| c.is_ascii_digit())
                && *mentions >= cfg.min_entity_mentions
        })
        .map(|(name, (kind, mentions, ids))| {
            let mut chunk_ids: Vec<String> = ids.into_iter().collect();
            chunk_ids.sort();
            (
                sha256_hex(&name)[..16].to_string(),
                Entity {
                    name,
                    kind,
                    mentions,
                    chunk_ids,
                },
            )
        })
        .collect();

    // Undirected pair key with ids in sorted order.
    let mut pairs: HashMap<(String, String), (usize, HashSet<String>)> = HashMap::new();
    for chunk in chunks {
        let lower = chunk.text.to_lowercase();
        let mut present: Vec<&String> = entities
            .iter()
            .filter(|(_, e)| lower.contains(e.name.as_str()))
            .map(|(id, _)| id)
            .collect();
        present.sort();
        for i in 0..present.len() {
            for j in (i + 1)..present.len() {
                let entry = pairs
                    .entry((present[i].clone(), present[j].clone()))
                    .or_insert((0, HashSet::new()));
                entry.0 += 1;
                entry.1.insert(chunk.id.clone());
            }
        }
    }
    let max = pairs.values().map(|(n, _)| *n).max().unwrap_or(1) as f32;
    let mut relations: Vec<Relation> = pairs
        .into_iter()
        .map(|((a, b), (n, ids))| {
            let mut chunk_ids: Vec<String> = ids.into_iter().collect();
            chunk_ids.sort();
            Relation {
                a,
                b,
                weight: n as f32 / max,
                chunk_ids,
            }
        })
        .collect();
    relations.sort_by(|x, y| (x.a.as_str(), x.b.as_str()).cmp(&(y.a.as_str(), y.b.as_str())));

    if entities.is_empty() {
        warn!("entity extraction found nothing; graph mode will use ranked passages only");
    }
    KnowledgeGraph {
        entities,
        relations,
        built_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

/// Candidate entity names in one chunk, lowercased and de-duplicated.
fn entity_candidates(text: &str) -> Vec<(String, EntityKind)> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut add = |name: &str, kind: EntityKind| {
        let name = name.trim().to_lowercase();
        if name.chars().count() > 1 && seen.insert(name.clone()) {
            out.push((name, kind));
        }
    };

    for term in delimited(text, '`') {
        add(term, EntityKind::Term);
    }
    for term in delimited(text, '"') {
        if term.split_whitespace().count() <= 4 {
            add(term, EntityKind::Term);
        }
    }
    for tok in text.split_whitespace() {
        let tok = tok.trim_matches(|c: char| !c.is_alphanumeric());
        if is_camel_case(tok) {
            add(tok, EntityKind::System);
        }
    }
    for phrase in title_case_phrases(text) {
        add(&phrase, EntityKind::Concept);
    }
    for tok in text.split_whitespace() {
        let tok = tok.trim_matches(|c: char| !c.is_alphabetic());
        let len = tok.chars().count();
        if (2..=5).contains(&len) && tok.chars().all(char::is_uppercase) {
            add(tok, EntityKind::Acronym);
        }
    }
    out
}

/// Slices between paired `delim` characters.
fn delimited(text: &str, delim: char) -> impl Iterator<Item = &str> {
    text.split(delim).skip(1).step_by(2)
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        0
    } else {
        haystack.matches(needle).count()
    }
}

/// `true` for identifiers such as `PostGIS` or `useState`: alphabetic first
/// character, word characters only, and an uppercase letter after the first.
fn is_camel_case(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    s.chars().count() >= 3
        && first.is_alphabetic()
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
        && chars.any(char::is_uppercase)
        && !s.chars().all(char::is_uppercase)
}

/// Runs of two or more capitalised words that do not open a sentence.
fn title_case_phrases(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let capitalised = |w: &str| {
        w.trim_matches(|c: char| !c.is_alphanumeric())
            .chars()
            .next()
            .is_some_and(char::is_uppercase)
    };
    let sentence_start = |i: usize| {
        i == 0
            || words[i - 1].ends_with(['.', '!', '?', ':'])
            || words[i - 1].starts_with('#')
    };

    let mut out = Vec::new();
    let mut i = 0;
    while i < words.len() {
        if !capitalised(words[i]) || sentence_start(i) {
            i += 1;
            continue;
        }
        let mut j = i;
        while j < words.len() && capitalised(words[j]) {
            j += 1;
            if words[j - 1].ends_with([',', '.', ';', ':', '!', '?']) {
                break;
            }
        }
        if j - i >= 2 {
            let phrase: Vec<&str> = words[i..j]
                .iter()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                .collect();
            out.push(phrase.join(" "));
        }
        i = j.max(i + 1);
    }
    out
}
