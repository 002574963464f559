//! Keyword topic classifier.
//!
//! Rules are evaluated in declaration order and the first rule with a
//! matching keyword wins, so the order of [`TOPIC_RULES`] is part of the
//! observable behaviour.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canned-answer bucket. `Custom` is the fallback for unmatched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Education,
    Projects,
    Skills,
    About,
    Courses,
    Custom,
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::Education,
        Topic::Projects,
        Topic::Skills,
        Topic::About,
        Topic::Courses,
        Topic::Custom,
    ];

    /// Wire tag, as returned in `question_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Education => "education",
            Topic::Projects => "projects",
            Topic::Skills => "skills",
            Topic::About => "about",
            Topic::Courses => "courses",
            Topic::Custom => "custom",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Topic> {
        Topic::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    /// Session title for a session whose first message landed in this bucket.
    pub fn title(self) -> &'static str {
        match self {
            Topic::Education => "Educational Background",
            Topic::Projects => "Projects",
            Topic::Skills => "Technical Skills",
            Topic::About => "About Me",
            Topic::Courses => "Learning Journey",
            Topic::Custom => "General Questions",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered (keywords → topic) rules. First match wins.
pub const TOPIC_RULES: &[(&[&str], Topic)] = &[
    (&["educational background", "education"], Topic::Education),
    (&["projects", "show me"], Topic::Projects),
    (&["skills", "what skills"], Topic::Skills),
    (
        &[
            "tell me about yourself",
            "about yourself",
            "who are you",
            "about the author",
        ],
        Topic::About,
    ),
    (&["courses", "what courses"], Topic::Courses),
];

/// Classify `text` into exactly one topic.
pub fn classify(text: &str) -> Topic {
    let folded = text.to_lowercase();
    TOPIC_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| folded.contains(k)))
        .map(|(_, topic)| *topic)
        .unwrap_or(Topic::Custom)
}
