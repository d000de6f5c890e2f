use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of a stitch.
///
/// Built-in kinds have fixed abbreviations and counting rules. Anything else a
/// user types is kept verbatim as [`StitchKind::Custom`] and counts like a
/// plain stitch.
///
/// Serialized as the bare abbreviation (`"sc"`, `"inc"`, `"puff"`), so stored
/// patterns stay readable and unknown labels round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StitchKind {
    Chain,
    SlipStitch,
    SingleCrochet,
    HalfDoubleCrochet,
    DoubleCrochet,
    TrebleCrochet,
    Increase,
    Decrease,
    Skip,
    Custom(String),
}

impl StitchKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Chain => "ch",
            Self::SlipStitch => "sl st",
            Self::SingleCrochet => "sc",
            Self::HalfDoubleCrochet => "hdc",
            Self::DoubleCrochet => "dc",
            Self::TrebleCrochet => "tr",
            Self::Increase => "inc",
            Self::Decrease => "dec",
            Self::Skip => "skip",
            Self::Custom(label) => label,
        }
    }

    /// Parse an abbreviation. Built-ins match case-insensitively; anything
    /// else becomes a trimmed custom label.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "ch" => Self::Chain,
            "sl st" | "slst" => Self::SlipStitch,
            "sc" => Self::SingleCrochet,
            "hdc" => Self::HalfDoubleCrochet,
            "dc" => Self::DoubleCrochet,
            "tr" => Self::TrebleCrochet,
            "inc" => Self::Increase,
            "dec" => Self::Decrease,
            "skip" | "sk" => Self::Skip,
            _ => Self::Custom(trimmed.to_string()),
        }
    }
}

impl From<String> for StitchKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<StitchKind> for String {
    fn from(kind: StitchKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StitchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single instruction unit within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stitch {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: StitchKind,
    pub count: u32,
    /// Text placed immediately before the stitch, e.g. "in back loop".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_after: Option<String>,
}

impl Stitch {
    pub fn new(kind: StitchKind, count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            count,
            note_before: None,
            note_after: None,
        }
    }

    pub fn with_notes(mut self, before: Option<&str>, after: Option<&str>) -> Self {
        self.note_before = before.map(str::to_string);
        self.note_after = after.map(str::to_string);
        self
    }
}

/// A custom stitch label saved by a user so it can be picked again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomStitch {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub label: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for saving a custom stitch label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomStitchInput {
    pub label: String,
}
