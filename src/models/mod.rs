//! Domain models for Stitchcraft.
//!
//! # Core Concepts
//!
//! - [`Pattern`]: A saved design owned by a user, made of ordered [`Section`]s.
//! - [`Round`]: One row of instructions inside a section. Holds ordered
//!   [`Stitch`]es and optional [`RepetitionGroup`]s, or a single line of text.
//! - [`StitchKind`]: Built-in stitch abbreviations plus user-defined labels.
//!
//! ## Accounts
//!
//! - [`Profile`]: A user with a [`SubscriptionStatus`] kept in sync by the
//!   billing webhook.
//! - [`CustomStitch`]: Stitch labels a user saved for reuse.
//!
//! ## Directory
//!
//! - [`FreePattern`]: Curated links to free patterns published elsewhere.

mod free_pattern;
mod pattern;
mod profile;
mod round;
mod stitch;

pub use free_pattern::*;
pub use pattern::*;
pub use profile::*;
pub use round::*;
pub use stitch::*;
