//! Profile corpus loading.
//!
//! Every `.md` / `.txt` file under the data directory becomes one document.
//! Two structured files get rendered into prose first:
//!
//! - `projects.yaml`: `projects: [{name, description, technologies, year, ...}]`
//! - `timeline.json`: `{"timeline": [{year, month, title, description, ...}]}`

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{KnowledgeError, sha256_hex};

/// One unit of source text fed to the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// 16 hex chars of `sha256(source + text)`.
    pub id: String,
    pub title: String,
    /// Origin tag: a relative file path, `projects` or `timeline`.
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(title: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        let source = source.into();
        let text = text.into();
        let id = sha256_hex(&format!("{source}\n{text}"))[..16].to_string();
        Self {
            id,
            title: title.into(),
            source,
            text,
        }
    }
}

/// YAML/JSON scalar that may be written as a number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectsFile {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct Project {
    name: String,
    description: String,
    #[serde(default)]
    technologies: Vec<String>,
    year: Option<Scalar>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    highlights: Vec<String>,
    #[serde(default)]
    metrics: BTreeMap<String, Scalar>,
}

#[derive(Debug, Deserialize)]
struct TimelineFile {
    #[serde(default)]
    timeline: Vec<TimelineEvent>,
}

#[derive(Debug, Deserialize)]
struct TimelineEvent {
    year: Scalar,
    month: Option<Scalar>,
    title: String,
    description: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    technologies: Vec<String>,
}

fn project_text(p: &Project) -> String {
    let mut text = format!("Project: {}\n", p.name);
    text.push_str(&format!("Description: {}\n", p.description));
    if !p.technologies.is_empty() {
        text.push_str(&format!("Technologies: {}\n", p.technologies.join(", ")));
    }
    if let Some(year) = &p.year {
        text.push_str(&format!("Year: {year}\n"));
    }
    if let Some(status) = &p.status {
        text.push_str(&format!("Status: {status}\n"));
    }
    if let Some(category) = &p.category {
        text.push_str(&format!("Category: {category}\n"));
    }
    if !p.highlights.is_empty() {
        text.push_str(&format!("Key highlights: {}\n", p.highlights.join(". ")));
    }
    if !p.metrics.is_empty() {
        let metrics: Vec<String> = p.metrics.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        text.push_str(&format!("Metrics: {}\n", metrics.join(", ")));
    }
    text
}

fn timeline_text(e: &TimelineEvent) -> String {
    let month = e
        .month
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "Unknown".to_string());
    let mut text = format!("Timeline Event ({}-{month}): {}\n", e.year, e.title);
    text.push_str(&format!("Description: {}\n", e.description));
    if let Some(kind) = &e.kind {
        text.push_str(&format!("Type: {kind}\n"));
    }
    if let Some(category) = &e.category {
        text.push_str(&format!("Category: {category}\n"));
    }
    if !e.technologies.is_empty() {
        text.push_str(&format!(
            "Technologies involved: {}\n",
            e.technologies.join(", ")
        ));
    }
    text
}

/// Load every document under `data_dir`, sorted by source for a stable build.
pub fn load(data_dir: &Path) -> Result<Vec<Document>, KnowledgeError> {
    if !data_dir.is_dir() {
        return Err(KnowledgeError::Corpus(format!(
            "data directory not found: {}",
            data_dir.display()
        )));
    }

    let mut docs = Vec::new();
    collect_text_files(data_dir, data_dir, &mut docs)?;
    docs.sort_by(|a, b| a.source.cmp(&b.source));

    let projects_path = data_dir.join("projects.yaml");
    if projects_path.is_file() {
        let raw = read(&projects_path)?;
        let parsed: ProjectsFile = serde_yaml::from_str(&raw)
            .map_err(|e| KnowledgeError::Corpus(format!("projects.yaml: {e}")))?;
        for p in &parsed.projects {
            docs.push(Document::new(
                format!("Project: {}", p.name),
                "projects",
                project_text(p),
            ));
        }
        debug!(count = parsed.projects.len(), "loaded structured projects");
    }

    let timeline_path = data_dir.join("timeline.json");
    if timeline_path.is_file() {
        let raw = read(&timeline_path)?;
        let parsed: TimelineFile = serde_json::from_str(&raw)
            .map_err(|e| KnowledgeError::Corpus(format!("timeline.json: {e}")))?;
        for e in &parsed.timeline {
            docs.push(Document::new(
                format!("Timeline: {}", e.title),
                "timeline",
                timeline_text(e),
            ));
        }
        debug!(count = parsed.timeline.len(), "loaded timeline events");
    }

    if docs.is_empty() {
        return Err(KnowledgeError::Corpus(format!(
            "no documents found in {}",
            data_dir.display()
        )));
    }
    Ok(docs)
}

fn read(path: &Path) -> Result<String, KnowledgeError> {
    fs::read_to_string(path)
        .map_err(|e| KnowledgeError::Corpus(format!("read {}: {e}", path.display())))
}

fn collect_text_files(
    root: &Path,
    dir: &Path,
    out: &mut Vec<Document>,
) -> Result<(), KnowledgeError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| KnowledgeError::Corpus(format!("list {}: {e}", dir.display())))?;
    for entry in entries {
        let path = entry
            .map_err(|e| KnowledgeError::Corpus(format!("list {}: {e}", dir.display())))?
            .path();
        if path.is_dir() {
            collect_text_files(root, &path, out)?;
            continue;
        }
        let is_text = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("md") | Some("txt")
        );
        if !is_text {
            continue;
        }
        let text = read(&path)?;
        if text.trim().is_empty() {
            warn!(path = %path.display(), "skipping empty document");
            continue;
        }
        let source = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.clone());
        out.push(Document::new(title, source, text));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROJECTS: &str = r#"
projects:
  - name: Trailhead
    description: Route planner for multi-day hikes
    technologies: [Rust, PostGIS]
    year: 2024
    status: active
    category: web
    highlights: ["Offline maps", "A* routing"]
    metrics:
      users: 1200
"#;

    const TIMELINE: &str = r#"{"timeline": [
        {"year": 2022, "month": 9, "title": "Started CS degree",
         "description": "Began a BSc in Computer Science", "type": "education",
         "category": "academic"},
        {"year": "2023", "title": "First internship",
         "description": "Backend intern", "type": "work", "category": "career",
         "technologies": ["Python", "Redis"]}
    ]}"#;

    #[test]
    fn loads_text_and_structured_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("about.md"), "# About\nI build things.").unwrap();
        std::fs::create_dir(dir.path().join("notes")).unwrap();
        std::fs::write(dir.path().join("notes/extra.txt"), "More notes.").unwrap();
        std::fs::write(dir.path().join("ignored.csv"), "a,b").unwrap();
        std::fs::write(dir.path().join("projects.yaml"), PROJECTS).unwrap();
        std::fs::write(dir.path().join("timeline.json"), TIMELINE).unwrap();

        let docs = load(dir.path()).unwrap();
        assert_eq!(docs.len(), 5);
        assert_eq!(docs[0].source, "about.md");
        assert_eq!(docs[0].title, "about");

        let project = docs.iter().find(|d| d.source == "projects").unwrap();
        assert!(project.text.starts_with("Project: Trailhead\n"));
        assert!(project.text.contains("Technologies: Rust, PostGIS"));
        assert!(project.text.contains("Year: 2024"));
        assert!(project.text.contains("Key highlights: Offline maps. A* routing"));
        assert!(project.text.contains("Metrics: users: 1200"));

        let events: Vec<_> = docs.iter().filter(|d| d.source == "timeline").collect();
        assert!(events[0].text.starts_with("Timeline Event (2022-9): Started CS degree"));
        assert!(events[1].text.starts_with("Timeline Event (2023-Unknown): First internship"));
        assert!(events[1].text.contains("Technologies involved: Python, Redis"));
    }

    #[test]
    fn missing_dir_is_corpus_error() {
        let err = load(Path::new("/nonexistent/profile")).unwrap_err();
        assert!(matches!(err, KnowledgeError::Corpus(_)));
    }

    #[test]
    fn empty_dir_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(load(dir.path()).is_err());
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("projects.yaml"), "projects: [name: {").unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("projects.yaml"));
    }

    #[test]
    fn document_ids_are_stable() {
        let a = Document::new("t", "s", "body");
        let b = Document::new("other title", "s", "body");
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 16);
        assert_ne!(a.id, Document::new("t", "s2", "body").id);
    }
}
