use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProjectRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameProjectRequest {
    pub name: String,
}

/// Trims a project name, rejecting blank input before any store call.
pub fn validate_project_name(name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("Project name must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Keeps a project list in the order the store returns it (by name).
pub fn sort_projects(projects: &mut [Project]) {
    projects.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}
