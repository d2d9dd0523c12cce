//! Escalation policy: accumulated penalties to an effective DC.
//!
//! ```text
//! effective = max(floor, base + Σ conditions + penalty × failed
//!                        + threshold_delta - bonus_reduction)
//! ```
//!
//! The penalty is unsigned so the result never decreases as failures pile up.

use serde::{Deserialize, Serialize};

/// A named DC adjustment (tool quality, terrain, weather, familiarity...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionModifier {
    /// What the modifier comes from, e.g. `"rain"`.
    pub source: String,
    /// Signed DC change.
    pub dc_delta: i32,
}

impl ConditionModifier {
    /// Creates a modifier.
    #[must_use]
    pub fn new(source: impl Into<String>, dc_delta: i32) -> Self {
        Self {
            source: source.into(),
            dc_delta,
        }
    }
}

/// Per-instance escalation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationState {
    failed_attempts: u32,
    conditions: Vec<ConditionModifier>,
    threshold_delta: i32,
    bonus_reduction: i32,
}

impl EscalationState {
    /// Failed attempts in the current phase.
    #[must_use]
    pub const fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Standing condition modifiers.
    #[must_use]
    pub fn conditions(&self) -> &[ConditionModifier] {
        &self.conditions
    }

    /// Permanent DC increase from prior threshold events.
    #[must_use]
    pub const fn threshold_delta(&self) -> i32 {
        self.threshold_delta
    }

    /// Accumulated DC reduction from bonuses.
    #[must_use]
    pub const fn bonus_reduction(&self) -> i32 {
        self.bonus_reduction
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
    }

    pub(crate) fn reset_failures(&mut self) {
        self.failed_attempts = 0;
    }

    pub(crate) fn replace_conditions(&mut self, conditions: Vec<ConditionModifier>) {
        self.conditions = conditions;
    }

    pub(crate) fn raise_threshold(&mut self, delta: i32) {
        self.threshold_delta = self.threshold_delta.saturating_add(delta);
    }

    pub(crate) fn grant_reduction(&mut self, amount: i32) {
        self.bonus_reduction = self.bonus_reduction.saturating_add(amount);
    }
}

/// Per-procedure escalation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    per_attempt_penalty: u32,
    floor: i32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PER_ATTEMPT_PENALTY, 0)
    }
}

impl EscalationPolicy {
    /// DC added per failed attempt unless a procedure says otherwise.
    pub const DEFAULT_PER_ATTEMPT_PENALTY: u32 = 1;

    /// Creates a policy.
    #[must_use]
    pub const fn new(per_attempt_penalty: u32, floor: i32) -> Self {
        Self {
            per_attempt_penalty,
            floor,
        }
    }

    /// DC added per failed attempt.
    #[must_use]
    pub const fn per_attempt_penalty(&self) -> u32 {
        self.per_attempt_penalty
    }

    /// Lowest DC this procedure ever asks for.
    #[must_use]
    pub const fn floor(&self) -> i32 {
        self.floor
    }

    /// Effective DC for an attempt against `base_dc`. `extra` holds
    /// attempt-specific modifiers layered on the standing conditions.
    #[must_use]
    pub fn effective_dc(
        &self,
        base_dc: i32,
        state: &EscalationState,
        extra: &[ConditionModifier],
    ) -> i32 {
        let conditions: Vec<i32> = state
            .conditions
            .iter()
            .chain(extra)
            .map(|modifier| modifier.dc_delta)
            .collect();
        let adjusted = i64::from(base_dc) + i64::from(state.threshold_delta)
            - i64::from(state.bonus_reduction);
        effective_dc(
            clamp_i32(adjusted),
            &conditions,
            state.failed_attempts,
            self.per_attempt_penalty,
            self.floor,
        )
    }
}

/// `max(floor, base_dc + Σ condition_modifiers + failed_attempts × per_attempt_penalty)`.
#[must_use]
pub fn effective_dc(
    base_dc: i32,
    condition_modifiers: &[i32],
    failed_attempts: u32,
    per_attempt_penalty: u32,
    floor: i32,
) -> i32 {
    let conditions: i64 = condition_modifiers.iter().copied().map(i64::from).sum();
    let escalation = i64::from(failed_attempts) * i64::from(per_attempt_penalty);
    let raw = i64::from(base_dc) + conditions + escalation;
    clamp_i32(raw.max(i64::from(floor)))
}

fn clamp_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_dc_adds_one_per_failure_by_default() {
        let policy = EscalationPolicy::default();
        let mut state = EscalationState::default();

        assert_eq!(policy.effective_dc(12, &state, &[]), 12);
        state.record_failure();
        assert_eq!(policy.effective_dc(12, &state, &[]), 13);
    }

    #[test]
    fn test_effective_dc_never_below_floor() {
        let dc = effective_dc(6, &[-4, -2], 0, 1, 4);

        assert_eq!(dc, 4);
    }

    #[test]
    fn test_effective_dc_sums_conditions() {
        let dc = effective_dc(16, &[-4, 4, 2], 2, 2, 0);

        assert_eq!(dc, 22);
    }

    #[test]
    fn test_effective_dc_non_decreasing_in_failures() {
        for penalty in 0..4 {
            let mut previous = i32::MIN;
            for failed in 0..10 {
                let dc = effective_dc(8, &[-3], failed, penalty, 4);
                assert!(dc >= previous);
                assert!(dc >= 4);
                previous = dc;
            }
        }
    }

    #[test]
    fn test_standing_and_extra_conditions_both_apply() {
        let policy = EscalationPolicy::new(1, 0);
        let mut state = EscalationState::default();
        state.replace_conditions(vec![ConditionModifier::new("rain", 4)]);

        let dc = policy.effective_dc(12, &state, &[ConditionModifier::new("within-100ft", -6)]);

        assert_eq!(dc, 10);
    }

    #[test]
    fn test_threshold_delta_and_bonus_reduction() {
        let policy = EscalationPolicy::new(0, 4);
        let mut state = EscalationState::default();
        state.raise_threshold(2);
        state.grant_reduction(3);

        assert_eq!(policy.effective_dc(10, &state, &[]), 9);

        state.grant_reduction(10);
        assert_eq!(policy.effective_dc(10, &state, &[]), 4);
    }

    #[test]
    fn test_reset_failures_clears_counter() {
        let mut state = EscalationState::default();
        state.record_failure();
        state.record_failure();
        state.reset_failures();

        assert_eq!(state.failed_attempts(), 0);
    }
}
