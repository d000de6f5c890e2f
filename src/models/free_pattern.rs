use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Difficulty;

/// An entry in the curated directory of free patterns hosted elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreePattern {
    pub id: Uuid,
    pub title: String,
    pub designer: String,
    /// Link to the designer's page for the pattern.
    pub url: String,
    pub difficulty: Difficulty,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a directory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFreePatternInput {
    pub title: String,
    pub designer: String,
    pub url: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Query parameters for browsing the directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FreePatternQuery {
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive match against title, designer and tags.
    pub q: Option<String>,
}
