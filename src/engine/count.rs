//! Stitch totals for a round.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{RepetitionGroup, Round, Stitch, StitchKind};

/// How a decrease contributes to a round's stitch total.
///
/// Both readings exist in published patterns: `Subtract` treats `dec n` as
/// removing `n` stitches from the running total, `CeilHalf` counts the
/// stitches a decrease leaves on the hook (`ceil(n / 2)`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecreaseRule {
    #[default]
    Subtract,
    CeilHalf,
}

impl DecreaseRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subtract => "subtract",
            Self::CeilHalf => "ceil_half",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "subtract" => Some(Self::Subtract),
            "ceil_half" => Some(Self::CeilHalf),
            _ => None,
        }
    }
}

/// Contribution of a single stitch to the total.
pub fn stitch_value(stitch: &Stitch, rule: DecreaseRule) -> i64 {
    let count = i64::from(stitch.count);
    match stitch.kind {
        StitchKind::Increase => count * 2,
        StitchKind::Decrease => match rule {
            DecreaseRule::Subtract => -count,
            DecreaseRule::CeilHalf => (count + 1) / 2,
        },
        StitchKind::Skip => 0,
        StitchKind::Chain
        | StitchKind::SlipStitch
        | StitchKind::SingleCrochet
        | StitchKind::HalfDoubleCrochet
        | StitchKind::DoubleCrochet
        | StitchKind::TrebleCrochet
        | StitchKind::Custom(_) => count,
    }
}

/// Index of the group a stitch is attributed to: the first one listing it.
pub(crate) fn owning_group(groups: &[RepetitionGroup], stitch_id: Uuid) -> Option<usize> {
    groups
        .iter()
        .position(|g| g.stitch_ids.contains(&stitch_id))
}

/// Total stitches produced by `stitches`, expanding repetition groups and
/// the outer round repeat.
///
/// Group references to stitches that are not in `stitches` are ignored.
/// Totals saturate at the `i64` bounds instead of overflowing.
pub fn count_stitches(
    stitches: &[Stitch],
    groups: &[RepetitionGroup],
    repeat: Option<u32>,
    rule: DecreaseRule,
) -> i64 {
    let mut ungrouped = 0i64;
    let mut group_totals = vec![0i64; groups.len()];

    for stitch in stitches {
        let value = stitch_value(stitch, rule);
        match owning_group(groups, stitch.id) {
            Some(idx) => group_totals[idx] = group_totals[idx].saturating_add(value),
            None => ungrouped = ungrouped.saturating_add(value),
        }
    }

    let grouped = groups
        .iter()
        .zip(group_totals)
        .map(|(group, inner)| inner.saturating_mul(i64::from(group.count)))
        .fold(0i64, i64::saturating_add);

    let times = match repeat {
        Some(n) if n > 1 => i64::from(n),
        _ => 1,
    };

    ungrouped.saturating_add(grouped).saturating_mul(times)
}

/// Total for a stored round. Text rounds hold no stitches and total zero.
pub fn count_round(round: &Round, rule: DecreaseRule) -> i64 {
    if round.is_text {
        return 0;
    }
    count_stitches(&round.stitches, &round.groups, round.repeat, rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(kind: StitchKind, count: u32) -> Stitch {
        Stitch::new(kind, count)
    }

    fn group(stitches: &[&Stitch], count: u32) -> RepetitionGroup {
        RepetitionGroup {
            id: Uuid::new_v4(),
            stitch_ids: stitches.iter().map(|s| s.id).collect(),
            count,
        }
    }

    #[test]
    fn plain_single_crochet() {
        let stitches = vec![st(StitchKind::SingleCrochet, 6)];
        assert_eq!(count_stitches(&stitches, &[], None, DecreaseRule::Subtract), 6);
    }

    #[test]
    fn group_is_multiplied_by_its_count() {
        let sc = st(StitchKind::SingleCrochet, 2);
        let inc = st(StitchKind::Increase, 1);
        let groups = vec![group(&[&sc, &inc], 6)];
        let stitches = vec![sc, inc];

        assert_eq!(
            count_stitches(&stitches, &groups, None, DecreaseRule::Subtract),
            24
        );
    }

    #[test]
    fn decrease_rules_disagree() {
        let stitches = vec![st(StitchKind::Decrease, 2)];
        assert_eq!(count_stitches(&stitches, &[], None, DecreaseRule::Subtract), -2);
        assert_eq!(count_stitches(&stitches, &[], None, DecreaseRule::CeilHalf), 1);
    }

    #[test]
    fn ceil_half_rounds_up_odd_counts() {
        let stitches = vec![st(StitchKind::Decrease, 3)];
        assert_eq!(count_stitches(&stitches, &[], None, DecreaseRule::CeilHalf), 2);
    }

    #[test]
    fn skip_contributes_nothing() {
        let stitches = vec![st(StitchKind::Skip, 4), st(StitchKind::DoubleCrochet, 3)];
        assert_eq!(count_stitches(&stitches, &[], None, DecreaseRule::Subtract), 3);
    }

    #[test]
    fn custom_stitches_count_like_plain_stitches() {
        let stitches = vec![st(StitchKind::Custom("puff".into()), 5)];
        assert_eq!(count_stitches(&stitches, &[], None, DecreaseRule::Subtract), 5);
    }

    #[test]
    fn outer_repeat_multiplies_grand_total() {
        let sc = st(StitchKind::SingleCrochet, 1);
        let inc = st(StitchKind::Increase, 1);
        let groups = vec![group(&[&sc, &inc], 2)];
        let stitches = vec![st(StitchKind::SingleCrochet, 2), sc, inc];

        // (2 + (1 + 2) * 2) * 3
        assert_eq!(
            count_stitches(&stitches, &groups, Some(3), DecreaseRule::Subtract),
            24
        );
    }

    #[test]
    fn zero_repeat_means_once() {
        let stitches = vec![st(StitchKind::SingleCrochet, 6)];
        assert_eq!(count_stitches(&stitches, &[], Some(0), DecreaseRule::Subtract), 6);
    }

    #[test]
    fn stale_group_references_are_ignored() {
        let sc = st(StitchKind::SingleCrochet, 2);
        let ghost = st(StitchKind::Increase, 10);
        let groups = vec![group(&[&sc, &ghost], 3)];
        let stitches = vec![sc];

        assert_eq!(count_stitches(&stitches, &groups, None, DecreaseRule::Subtract), 6);
    }

    #[test]
    fn stitch_in_two_groups_counts_for_the_first() {
        let a = st(StitchKind::SingleCrochet, 1);
        let b = st(StitchKind::SingleCrochet, 1);
        let c = st(StitchKind::SingleCrochet, 1);
        let groups = vec![group(&[&a, &b], 2), group(&[&b, &c], 5)];
        let stitches = vec![a, b, c];

        // first group: (1 + 1) * 2, second group: only c -> 1 * 5
        assert_eq!(count_stitches(&stitches, &groups, None, DecreaseRule::Subtract), 9);
    }

    #[test]
    fn text_rounds_total_zero() {
        assert_eq!(count_round(&Round::text("Stuff firmly"), DecreaseRule::Subtract), 0);
    }
    #[test]
    fn huge_counts_saturate() {
        let a = st(StitchKind::Increase, u32::MAX);
        let b = st(StitchKind::Increase, u32::MAX);
        let groups = vec![group(&[&a, &b], u32::MAX)];
        let stitches = vec![a, b];

        assert_eq!(
            count_stitches(&stitches, &groups, Some(u32::MAX), DecreaseRule::Subtract),
            i64::MAX
        );

        let decs = vec![st(StitchKind::Decrease, u32::MAX), st(StitchKind::Decrease, u32::MAX)];
        let groups = vec![group(&[&decs[0], &decs[1]], u32::MAX)];
        assert_eq!(
            count_stitches(&decs, &groups, Some(u32::MAX), DecreaseRule::Subtract),
            i64::MIN
        );
    }
}
