//! Repetition-group upkeep for edited rounds.

use uuid::Uuid;

use super::PatternError;
use crate::models::{RepetitionGroup, Round, Section};

/// Minimum number of stitches a group must cover.
pub const MIN_GROUP_SIZE: usize = 2;

/// Create a repetition group over `stitch_ids` and append it to the round.
///
/// Duplicate ids are collapsed. Every id must name a stitch of this round
/// that is not already part of another group.
pub fn create_group(
    round: &mut Round,
    stitch_ids: &[Uuid],
    count: u32,
) -> Result<RepetitionGroup, PatternError> {
    if round.is_text {
        return Err(PatternError::TextRound);
    }
    if count == 0 {
        return Err(PatternError::ZeroRepeat);
    }

    let mut ids: Vec<Uuid> = Vec::with_capacity(stitch_ids.len());
    for id in stitch_ids {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
    if ids.len() < MIN_GROUP_SIZE {
        return Err(PatternError::TooFewStitches(ids.len()));
    }

    for id in &ids {
        if round.find_stitch(*id).is_none() {
            return Err(PatternError::UnknownStitch(*id));
        }
        if round.groups.iter().any(|g| g.stitch_ids.contains(id)) {
            return Err(PatternError::AlreadyGrouped(*id));
        }
    }

    // Keep member order aligned with the round, not with the request.
    ids.sort_by_key(|id| round.stitches.iter().position(|s| s.id == *id));

    let group = RepetitionGroup {
        id: Uuid::new_v4(),
        stitch_ids: ids,
        count,
    };
    round.groups.push(group.clone());
    Ok(group)
}

/// Drop references to stitches no longer in the round, then drop groups
/// left with fewer than two members. Returns how many groups were removed.
pub fn prune_groups(round: &mut Round) -> usize {
    let present: Vec<Uuid> = round.stitches.iter().map(|s| s.id).collect();

    for group in round.groups.iter_mut() {
        group.stitch_ids.retain(|id| present.contains(id));
    }

    let before = round.groups.len();
    round
        .groups
        .retain(|g| g.stitch_ids.len() >= MIN_GROUP_SIZE);
    let removed = before - round.groups.len();
    if removed > 0 {
        tracing::debug!(round_id = %round.id, removed, "Pruned repetition groups");
    }
    removed
}

/// Remove a stitch and prune any group it leaves undersized.
/// Returns false if the stitch was not in the round.
pub fn remove_stitch(round: &mut Round, stitch_id: Uuid) -> bool {
    let before = round.stitches.len();
    round.stitches.retain(|s| s.id != stitch_id);
    if round.stitches.len() == before {
        return false;
    }
    prune_groups(round);
    true
}

/// Remove a stitch from whichever round of the pattern holds it.
pub fn remove_stitch_from_sections(sections: &mut [Section], stitch_id: Uuid) -> bool {
    sections
        .iter_mut()
        .flat_map(|section| section.rounds.iter_mut())
        .any(|round| remove_stitch(round, stitch_id))
}

/// Move the stitch at `from` to position `to`. Group membership follows the
/// stitch.
pub fn move_stitch(round: &mut Round, from: usize, to: usize) -> Result<(), PatternError> {
    let len = round.stitches.len();
    for index in [from, to] {
        if index >= len {
            return Err(PatternError::IndexOutOfRange { index, len });
        }
    }
    let stitch = round.stitches.remove(from);
    round.stitches.insert(to, stitch);
    Ok(())
}

/// Find a round anywhere in the pattern.
pub fn find_round_mut(sections: &mut [Section], round_id: Uuid) -> Result<&mut Round, PatternError> {
    sections
        .iter_mut()
        .flat_map(|section| section.rounds.iter_mut())
        .find(|round| round.id == round_id)
        .ok_or(PatternError::RoundNotFound(round_id))
}
