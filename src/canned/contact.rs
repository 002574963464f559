use serde::Serialize;

use crate::config::ContactConfig;

/// Contact record served by `GET /contact`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactInfo {
    pub name: String,
    pub title: String,
    pub email: String,
    pub phone: String,
    pub linkedin: String,
    pub github: String,
}

impl From<&ContactConfig> for ContactInfo {
    fn from(c: &ContactConfig) -> Self {
        Self {
            name: c.name.clone(),
            title: c.title.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            linkedin: c.linkedin.clone(),
            github: c.github.clone(),
        }
    }
}
