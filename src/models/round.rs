use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Stitch;

/// A subset of a round's stitches worked together a number of times.
///
/// Distinct from repeating the whole round: in `6 sc, (2 sc, 1 inc) * 6`
/// only the parenthesised stitches repeat. A group is meaningful only while
/// it references at least two stitches of its round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepetitionGroup {
    pub id: Uuid,
    pub stitch_ids: Vec<Uuid>,
    pub count: u32,
}

/// One row of crochet instructions.
///
/// A round is either a stitch round or, when `is_text` is set, a free-text
/// line such as "Stuff the head firmly." whose text lives in `header_note`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: Uuid,
    #[serde(default)]
    pub stitches: Vec<Stitch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_note: Option<String>,
    /// Repeat the whole round this many times. `None` or `1` means once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<u32>,
    #[serde(default)]
    pub groups: Vec<RepetitionGroup>,
    #[serde(default)]
    pub is_text: bool,
}

impl Round {
    pub fn new(stitches: Vec<Stitch>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stitches,
            ..Default::default()
        }
    }

    pub fn text(line: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            header_note: Some(line.into()),
            is_text: true,
            ..Default::default()
        }
    }

    pub fn find_stitch(&self, id: Uuid) -> Option<&Stitch> {
        self.stitches.iter().find(|s| s.id == id)
    }
}

/// A named part of a pattern, e.g. "Head" or "Arms (make 2)".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub rounds: Vec<Round>,
}

impl Section {
    pub fn new(name: impl Into<String>, rounds: Vec<Round>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            rounds,
        }
    }
}

/// A formatted round as shown in previews and exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub section_id: Uuid,
    pub round_id: Uuid,
    /// Round number within its section. `None` for text rounds.
    pub number: Option<u32>,
    pub text: String,
    pub total: i64,
}

/// Input for creating a repetition group inside a stored round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupInput {
    pub stitch_ids: Vec<Uuid>,
    pub count: u32,
}
