//! Crochet notation for rounds.
//!
//! ```text
//! 6 sc, (2 sc, 1 inc) * 6, dec 2 (4 sts) * 2x (56 sts)
//! ```

use super::count::{count_stitches, owning_group, DecreaseRule};
use crate::models::{RepetitionGroup, Round, Stitch, StitchKind};

/// Render one stitch with its notes attached.
pub fn format_stitch(stitch: &Stitch) -> String {
    let body = match stitch.kind {
        StitchKind::Decrease => {
            format!("dec {} ({} sts)", stitch.count, u64::from(stitch.count) * 2)
        }
        _ => format!("{} {}", stitch.count, stitch.kind),
    };

    let before = non_empty(stitch.note_before.as_deref());
    let after = non_empty(stitch.note_after.as_deref());

    match (before, after) {
        (None, None) => body,
        (Some(b), None) => format!("{} {}", b, body),
        (None, Some(a)) => format!("{} {}", body, a),
        (Some(b), Some(a)) => format!("{} {} {}", b, body, a),
    }
}

/// Render stitches in round order, collapsing each repetition group into
/// `(a, b) * n` at the position of its first member, followed by the outer
/// repeat and the stitch total.
pub fn format_stitches(
    stitches: &[Stitch],
    groups: &[RepetitionGroup],
    repeat: Option<u32>,
    rule: DecreaseRule,
) -> String {
    let mut parts = Vec::new();
    let mut emitted = vec![false; groups.len()];

    for stitch in stitches {
        match owning_group(groups, stitch.id) {
            None => parts.push(format_stitch(stitch)),
            Some(idx) if emitted[idx] => {}
            Some(idx) => {
                emitted[idx] = true;
                let members: Vec<String> = stitches
                    .iter()
                    .filter(|s| owning_group(groups, s.id) == Some(idx))
                    .map(format_stitch)
                    .collect();
                parts.push(format!("({}) * {}", members.join(", "), groups[idx].count));
            }
        }
    }

    let mut pieces = Vec::new();
    if !parts.is_empty() {
        pieces.push(parts.join(", "));
    }
    if let Some(n) = repeat.filter(|&n| n > 1) {
        pieces.push(format!("* {}x", n));
    }
    let total = count_stitches(stitches, groups, repeat, rule);
    pieces.push(format!("({} sts)", total));

    pieces.join(" ")
}

/// Render a stored round. Text rounds render as their text.
pub fn format_round(round: &Round, rule: DecreaseRule) -> String {
    if round.is_text {
        return round.header_note.clone().unwrap_or_default();
    }
    format_stitches(&round.stitches, &round.groups, round.repeat, rule)
}

fn non_empty(note: Option<&str>) -> Option<&str> {
    note.map(str::trim).filter(|n| !n.is_empty())
}
