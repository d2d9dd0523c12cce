//! Classified checks: a roll measured against an effective DC.

use std::fmt;

use runeforge_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

use super::dice::{AdvantageType, CRITICAL_NET_SUCCESSES, DicePool, DiceResolver, DieType, RollResult};

/// Four-tier classification of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckOutcome {
    /// Met the DC with at least five net successes.
    CriticalSuccess,
    /// Met the DC.
    Success,
    /// Missed the DC without fumbling.
    Failure,
    /// Botched with no positive net; overrides the DC comparison.
    Fumble,
}

impl CheckOutcome {
    /// `CriticalSuccess` or `Success`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::CriticalSuccess | Self::Success)
    }

    /// `CriticalSuccess` only.
    #[must_use]
    pub const fn is_critical(self) -> bool {
        matches!(self, Self::CriticalSuccess)
    }

    /// `Fumble` only.
    #[must_use]
    pub const fn is_fumble(self) -> bool {
        matches!(self, Self::Fumble)
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CriticalSuccess => "critical success",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Fumble => "fumble",
        };
        f.write_str(label)
    }
}

/// A roll classified against the DC it was made at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// The classification.
    pub outcome: CheckOutcome,
    /// `net_successes - effective_dc`.
    pub margin: i32,
    /// The DC the roll was measured against.
    pub effective_dc: i32,
    /// Net successes of the kept roll.
    pub net_successes: i32,
    /// The kept roll.
    pub roll: RollResult,
}

impl CheckResult {
    /// Classifies `roll` against `effective_dc`.
    #[must_use]
    pub fn classify(roll: RollResult, effective_dc: i32) -> Self {
        let net = roll.net_successes;
        let outcome = if roll.is_fumble {
            CheckOutcome::Fumble
        } else if net >= effective_dc && net >= CRITICAL_NET_SUCCESSES {
            CheckOutcome::CriticalSuccess
        } else if net >= effective_dc {
            CheckOutcome::Success
        } else {
            CheckOutcome::Failure
        };

        Self {
            outcome,
            margin: net - effective_dc,
            effective_dc,
            net_successes: net,
            roll,
        }
    }

    /// Whether the check met its DC.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

impl DiceResolver {
    /// Rolls `pool` and classifies it against `effective_dc`.
    pub fn check(
        &self,
        pool: DicePool,
        advantage: AdvantageType,
        effective_dc: i32,
        rng: &mut dyn DeterministicRng,
    ) -> CheckResult {
        CheckResult::classify(self.roll(pool, advantage, rng), effective_dc)
    }
}

/// Rolls `dice` dice of type `die` with the default resolver and classifies
/// the roll against `effective_dc`.
pub fn check(
    dice: u32,
    die: DieType,
    advantage: AdvantageType,
    effective_dc: i32,
    rng: &mut dyn DeterministicRng,
) -> CheckResult {
    DiceResolver::default().check(DicePool::new(dice, die), advantage, effective_dc, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use runeforge_core::rng::SeededRng;
    use runeforge_test_support::SequenceRng;

    fn classify(faces: Vec<u32>, dc: i32) -> CheckResult {
        let pool = DicePool::d10(u32::try_from(faces.len()).unwrap());
        CheckResult::classify(RollResult::from_faces(pool, faces), dc)
    }

    #[test]
    fn test_net_below_dc_is_failure() {
        // 6d10 with net 3 against DC 12.
        let result = classify(vec![8, 9, 10, 4, 5, 6], 12);

        assert_eq!(result.outcome, CheckOutcome::Failure);
        assert_eq!(result.margin, -9);
        assert_eq!(result.net_successes, 3);
        assert_eq!(result.effective_dc, 12);
    }

    #[test]
    fn test_net_meeting_dc_is_success() {
        let result = classify(vec![8, 9, 2], 2);

        assert_eq!(result.outcome, CheckOutcome::Success);
        assert_eq!(result.margin, 0);
    }

    #[test]
    fn test_critical_requires_five_net_and_meeting_dc() {
        let critical = classify(vec![8, 8, 9, 9, 10], 5);
        let missed = classify(vec![8, 8, 9, 9, 10], 6);

        assert_eq!(critical.outcome, CheckOutcome::CriticalSuccess);
        assert_eq!(missed.outcome, CheckOutcome::Failure);
    }

    #[test]
    fn test_fumble_overrides_dc_comparison() {
        // Net 0 meets DC 0, but a botch with no positive net is a fumble.
        let result = classify(vec![1, 8], 0);

        assert_eq!(result.outcome, CheckOutcome::Fumble);
    }

    #[test]
    fn test_zero_dice_succeed_against_non_positive_dc() {
        let mut rng = SequenceRng::new(vec![]);

        let at_zero = check(0, DieType::D10, AdvantageType::None, 0, &mut rng);
        let below_zero = check(0, DieType::D10, AdvantageType::None, -2, &mut rng);
        let above_zero = check(0, DieType::D10, AdvantageType::None, 1, &mut rng);

        assert_eq!(at_zero.outcome, CheckOutcome::Success);
        assert_eq!(below_zero.outcome, CheckOutcome::Success);
        assert_eq!(above_zero.outcome, CheckOutcome::Failure);
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(CheckOutcome::CriticalSuccess.is_success());
        assert!(CheckOutcome::CriticalSuccess.is_critical());
        assert!(CheckOutcome::Success.is_success());
        assert!(!CheckOutcome::Failure.is_success());
        assert!(CheckOutcome::Fumble.is_fumble());
        assert!(!CheckOutcome::Fumble.is_success());
    }

    #[test]
    fn test_classification_is_consistent_for_seeded_rolls() {
        let mut rng = SeededRng::from_seed(99);
        for dc in -1..8 {
            for dice in 0..10 {
                let result = check(dice, DieType::D10, AdvantageType::None, dc, &mut rng);
                let roll = &result.roll;
                if roll.botches > 0 && roll.net_successes <= 0 {
                    assert_eq!(result.outcome, CheckOutcome::Fumble);
                } else if roll.net_successes >= dc {
                    assert!(result.outcome.is_success());
                    assert_eq!(result.outcome.is_critical(), roll.net_successes >= 5);
                } else {
                    assert_eq!(result.outcome, CheckOutcome::Failure);
                }
            }
        }
    }
}
