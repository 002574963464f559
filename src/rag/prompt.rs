//! Prompt assembly for the retrieval path.
//!
//! Everything here is deterministic string work: the persona system prompt,
//! the windowed conversation history, the per-question instruction block,
//! plus the small keyword heuristics used to route a question.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Prior turns passed to the formatter (three exchanges).
pub const HISTORY_WINDOW: usize = 6;

const SEPARATOR: &str = "\n\n";

/// Built-in persona. `{{name}}` is the bot's display name.
pub const SYSTEM_PROMPT: &str = "\
You are {{name}}, an assistant that speaks on behalf of the portfolio owner.

IDENTITY:
- Speak as the portfolio owner, in the first person (\"I\", \"my\", \"me\")
- Keep a friendly, professional and enthusiastic tone

SCOPE:
- Only discuss the owner's professional experience, skills, projects and background
- Decline general questions that are unrelated to the portfolio
- Never speak about other people

RULES:
1. Stay in character at all times
2. Use only information from the provided context
3. When the context lacks an answer, say \"I don't have that information in my portfolio\" instead of guessing
4. Give specifics when available: technologies, timeframes, results
5. Keep answers concise and conversational
6. Politely steer out-of-scope questions back to topics you can discuss";

const CONTEXT_TEMPLATE: &str = "\
RELEVANT CONTEXT FROM MY PORTFOLIO:
{{context}}

{{history}}
CURRENT USER QUESTION:
{{question}}

Please respond in the first person as the portfolio owner, using the context provided above. \
Stay in character and only discuss information that is available in the context. \
Be enthusiastic and conversational while staying accurate and helpful.";

const GREETINGS: &[&str] = &["hi", "hello", "hey", "greetings"];

// ── History ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    /// Any other role. Kept in the window count but not rendered.
    #[serde(other)]
    Other,
}

/// One prior message as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HistoryEntry {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }
}

/// Render at most the last [`HISTORY_WINDOW`] entries of `history`.
pub fn format_conversation_history(history: &[HistoryEntry]) -> String {
    if history.is_empty() {
        return "CONVERSATION HISTORY:\n(This is the start of our conversation)\n".to_string();
    }
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let mut out = String::from("CONVERSATION HISTORY:\n");
    for entry in &history[start..] {
        match entry.role {
            ChatRole::User => out.push_str(&format!("User: {}\n", entry.content)),
            ChatRole::Assistant => out.push_str(&format!("You: {}\n", entry.content)),
            ChatRole::Other => {}
        }
    }
    out.push('\n');
    out
}

/// The single instruction block sent as the user turn.
pub fn format_context_prompt(context: &str, history: &[HistoryEntry], question: &str) -> String {
    PromptBuilder::default()
        .append_raw(CONTEXT_TEMPLATE)
        .var("context", context)
        .var("history", format_conversation_history(history))
        .var("question", question)
        .build()
}

// ── Heuristics ────────────────────────────────────────────────────────────────

/// `false` for short greetings ("hi", "hey there!") that need no retrieval.
pub fn should_use_context(query: &str) -> bool {
    let lower = query.trim().to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let has_greeting = words
        .iter()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|w| GREETINGS.contains(&w));
    !(has_greeting && words.len() <= 3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Skills,
    Projects,
    Experience,
    Ai,
    Frontend,
    Backend,
    Greeting,
    General,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Skills => "skills",
            Intent::Projects => "projects",
            Intent::Experience => "experience",
            Intent::Ai => "ai",
            Intent::Frontend => "frontend",
            Intent::Backend => "backend",
            Intent::Greeting => "greeting",
            Intent::General => "general",
        }
    }
}

/// Ordered substring rules; first match wins.
const INTENT_RULES: &[(&[&str], Intent)] = &[
    (&["skill", "technology", "tech", "programming", "language"], Intent::Skills),
    (&["project", "work", "built", "developed", "created"], Intent::Projects),
    (&["experience", "career", "job", "timeline"], Intent::Experience),
    (&["ai", "machine learning", "ml", "artificial intelligence"], Intent::Ai),
    (&["frontend", "react", "javascript", "ui", "interface"], Intent::Frontend),
    (&["backend", "api", "server", "database"], Intent::Backend),
    (&["hello", "hi", "hey", "intro", "about"], Intent::Greeting),
];

/// Rough topic of a question, used for logging.
pub fn extract_intent(query: &str) -> Intent {
    let lower = query.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(_, intent)| *intent)
        .unwrap_or(Intent::General)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be processed.
    General,
    /// Retrieval ran but found nothing relevant.
    NoContext,
    /// The engine has not finished loading its index.
    Initialization,
}

/// In-character reply for a failure the user should not see raw.
pub fn error_response(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::General => {
            "I apologize, but I'm having some technical difficulties right now. \
             Could you please try asking your question again?"
        }
        ErrorKind::NoContext => {
            "I don't have that specific information readily available in my portfolio. \
             Is there something else about my experience or projects you'd like to know about?"
        }
        ErrorKind::Initialization => {
            "I'm still getting set up. Please give me a moment and try again shortly."
        }
    }
}

// ── System prompt ─────────────────────────────────────────────────────────────

/// The persona prompt: `override_path` if it exists, else [`SYSTEM_PROMPT`],
/// with `{{name}}` filled in.
pub fn system_prompt(override_path: Option<&Path>, name: &str) -> String {
    let builder = match override_path {
        Some(path) => PromptBuilder::default().layer_file(path),
        None => PromptBuilder::default(),
    };
    let builder = if builder.is_empty() {
        builder.append(SYSTEM_PROMPT)
    } else {
        builder
    };
    builder.var("name", name).build()
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Joins text fragments with blank lines and renders `{{key}}` placeholders.
///
/// Rendering is a single left-to-right pass over the joined template, so a
/// substituted value is never scanned again. Unknown placeholders are left
/// as they are.
#[derive(Debug, Default)]
pub struct PromptBuilder {
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Append the trimmed contents of `path`; skipped when missing or empty.
    pub fn layer_file(mut self, path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => self.parts.push(text.trim().to_string()),
            Ok(_) => {}
            Err(_) => tracing::debug!("prompt: layer '{}' not found, skipped", path.display()),
        }
        self
    }

    /// Append a trimmed fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.parts.push(text.trim().to_string());
        }
        self
    }

    /// Append a fragment untouched, keeping its surrounding whitespace.
    fn append_raw(mut self, text: &str) -> Self {
        self.parts.push(text.to_string());
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn build(self) -> String {
        render(&self.parts.join(SEPARATOR), &self.vars)
    }
}

fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match vars.get(key.trim()) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
