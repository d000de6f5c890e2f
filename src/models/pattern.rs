use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Section;

/// A crochet pattern.
///
/// Patterns are built up section by section in the designer and saved
/// explicitly. Sections, materials and notes are stored as part of the
/// pattern row; there is no separate lifecycle for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    /// Hook size as written by the designer, e.g. "3.5 mm".
    pub hook_size: String,
    pub yarn_weight: String,
    pub gauge: Option<String>,
    pub materials: Vec<String>,
    pub sections: Vec<Section>,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

/// Input for saving a new pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatternInput {
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub hook_size: String,
    #[serde(default)]
    pub yarn_weight: String,
    pub gauge: Option<String>,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// Input for updating a pattern. All fields are optional for partial updates;
/// list fields replace the stored list wholesale when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatternInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub hook_size: Option<String>,
    pub yarn_weight: Option<String>,
    /// Absent leaves the gauge alone; `null` clears it.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub gauge: Option<Option<String>>,
    pub materials: Option<Vec<String>>,
    pub sections: Option<Vec<Section>>,
    pub notes: Option<Vec<String>>,
}

/// Marks a field as present even when its value is `null`, so that
/// `Option<Option<T>>` can tell "clear" apart from "leave unchanged".
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Lightweight pattern listing without section content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub difficulty: Difficulty,
    pub section_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<Pattern> for PatternSummary {
    fn from(p: Pattern) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            name: p.name,
            difficulty: p.difficulty,
            section_count: p.sections.len(),
            updated_at: p.updated_at,
        }
    }
}

/// Query parameters for listing patterns.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPatternsQuery {
    pub owner_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
