//! Pattern arithmetic and text rendering.
//!
//! Everything here is a pure function over the [`crate::models`] types:
//! stitch totals ([`count`]), crochet notation for a round ([`format`]),
//! repetition-group upkeep ([`groups`]) and whole-pattern export
//! ([`export`]).

pub mod count;
pub mod export;
pub mod format;
pub mod groups;

use thiserror::Error;
use uuid::Uuid;

pub use count::{count_round, count_stitches, DecreaseRule};
pub use export::{export_pattern, round_summaries, section_summaries, ExportFormat};
pub use format::{format_round, format_stitch, format_stitches};
pub use groups::{create_group, move_stitch, prune_groups, remove_stitch};

/// Errors raised when an edit would break a round's structure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("a repetition group needs at least 2 stitches, got {0}")]
    TooFewStitches(usize),

    #[error("stitch {0} not found in round")]
    UnknownStitch(Uuid),

    #[error("stitch {0} already belongs to a repetition group")]
    AlreadyGrouped(Uuid),

    #[error("repeat count must be at least 1")]
    ZeroRepeat,

    #[error("stitch index {index} out of range for round of {len} stitches")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("round {0} not found in pattern")]
    RoundNotFound(Uuid),

    #[error("stitch {0} not found in pattern")]
    StitchNotFound(Uuid),

    #[error("text rounds cannot hold stitches")]
    TextRound,
}
