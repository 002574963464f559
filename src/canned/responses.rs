//! Canned markdown answers, compiled into the binary.

use super::topics::Topic;

/// Answer for tags that have no document.
pub const FALLBACK_RESPONSE: &str =
    "Don't be greedy! Please select from the available questions to learn more about me.";

const EDUCATION: &str = include_str!("../../content/education.md");
const PROJECTS: &str = include_str!("../../content/projects.md");
const SKILLS: &str = include_str!("../../content/skills.md");
const ABOUT: &str = include_str!("../../content/about.md");
const COURSES: &str = include_str!("../../content/courses.md");

/// Document for a bucket, `None` for the fallback bucket.
pub fn document(topic: Topic) -> Option<&'static str> {
    match topic {
        Topic::Education => Some(EDUCATION),
        Topic::Projects => Some(PROJECTS),
        Topic::Skills => Some(SKILLS),
        Topic::About => Some(ABOUT),
        Topic::Courses => Some(COURSES),
        Topic::Custom => None,
    }
}

/// Resolve a topic tag to its answer text. Unknown tags and `custom` get
/// [`FALLBACK_RESPONSE`].
pub fn resolve(tag: &str) -> &'static str {
    Topic::from_tag(tag)
        .and_then(document)
        .unwrap_or(FALLBACK_RESPONSE)
}
