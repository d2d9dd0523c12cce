//! Aggregate root for the brute-force procedure.

use std::fmt;

use runeforge_config::ProcedureTuning;
use runeforge_core::aggregate::AggregateRoot;
use runeforge_core::clock::Clock;
use runeforge_core::error::DomainError;
use runeforge_core::event::{DomainEvent, EventMetadata};
use runeforge_core::rng::DeterministicRng;
use runeforge_rules::domain::check::{CheckOutcome, CheckResult};
use runeforge_rules::domain::dice::AdvantageType;
use runeforge_rules::domain::escalation::{ConditionModifier, EscalationPolicy};
use runeforge_rules::domain::procedure::{
    EscalationAdjustment, PhaseRule, ProcedureInstance, ProcedurePhase, ProcedureState,
    StepResolution, Transition,
};
use runeforge_rules::domain::skills::{SkillCheck, SkillSheet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::barrier::{
    BarrierKind, FORCE_SKILL, FUMBLE_THRESHOLD_DELTA, ForceEffort, ForceFallout, NoiseLevel,
    Tool, ToolModifier,
};
use super::events::{
    BruteForceAbandoned, BruteForceEvent, BruteForceEventKind, BruteForceInitiated,
    ForceAttempted,
};

/// Brute-force phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BruteForcePhase {
    Forcing,
    /// The barrier gave way.
    Breached,
    /// Out of attempts.
    Exhausted,
    Abandoned,
}

impl fmt::Display for BruteForcePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ProcedurePhase for BruteForcePhase {
    const ABANDONED: Self = Self::Abandoned;

    fn is_terminal(self) -> bool {
        !matches!(self, Self::Forcing)
    }
}

/// The aggregate root for one actor forcing one barrier.
#[derive(Debug)]
pub struct BruteForce {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) actor_id: Uuid,
    pub(crate) barrier: BarrierKind,
    pub(crate) procedure: ProcedureState<BruteForcePhase>,
    pub(crate) attempts: u32,
    pub(crate) fumbled: bool,
    pub(crate) broken_tools: Vec<Tool>,
    pub(crate) last_tool: Option<Tool>,
    pub(crate) last_fallout: Option<ForceFallout>,
    pub(crate) loudest_noise: NoiseLevel,
    pub(crate) damage_taken: u32,
    pub(crate) content_damage: u32,
    pub(crate) exhaustion_gained: u32,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<BruteForceEvent>,
}

impl BruteForce {
    /// Creates an instance with no barrier yet.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            actor_id: Uuid::nil(),
            barrier: BarrierKind::SimpleDoor,
            procedure: ProcedureState::new(BruteForcePhase::Forcing),
            attempts: 0,
            fumbled: false,
            broken_tools: Vec::new(),
            last_tool: None,
            last_fallout: None,
            loudest_noise: NoiseLevel::Silent,
            damage_taken: 0,
            content_damage: 0,
            exhaustion_gained: 0,
            uncommitted_events: Vec::new(),
        }
    }

    fn record(&mut self, kind: BruteForceEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let mut event = BruteForceEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: String::new(),
                aggregate_id: self.id,
                sequence_number: self.version + 1,
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        event.metadata.event_type = event.event_type().to_owned();
        self.apply(&event);
        self.uncommitted_events.push(event);
    }

    /// The barrier's escalation: its own per-attempt penalty, with the
    /// floor from `tuning`.
    #[must_use]
    pub const fn policy(&self, tuning: &ProcedureTuning) -> EscalationPolicy {
        EscalationPolicy::new(self.barrier.penalty_per_attempt(), tuning.floor)
    }

    fn dc_with(&self, tuning: &ProcedureTuning, tool: Option<ToolModifier>) -> i32 {
        let modifiers: Vec<ConditionModifier> = tool
            .map(|t| ConditionModifier::new("tool", t.dc_modifier))
            .into_iter()
            .collect();
        self.policy(tuning).effective_dc(
            self.barrier.base_dc(),
            self.procedure.escalation(),
            &modifiers,
        )
    }

    /// DC of the next attempt with `tool` (ignored if it is no use on this
    /// barrier), or `None` once terminal.
    #[must_use]
    pub fn effective_dc(&self, tuning: &ProcedureTuning, tool: Option<Tool>) -> Option<i32> {
        if self.procedure.is_terminal() {
            return None;
        }
        let modifier = tool.and_then(|t| self.barrier.tool_modifier(t));
        Some(self.dc_with(tuning, modifier))
    }

    /// Attempts left before the actor is spent.
    #[must_use]
    pub fn attempts_remaining(&self) -> u32 {
        if self.procedure.is_terminal() {
            return 0;
        }
        self.barrier.max_attempts().saturating_sub(self.attempts)
    }

    fn usable_tool(&self, tool: Option<Tool>) -> Result<Option<ToolModifier>, DomainError> {
        let Some(tool) = tool else {
            return Ok(None);
        };
        if self.broken_tools.contains(&tool) {
            return Err(DomainError::InvalidArgument(format!(
                "the {tool} broke in an earlier attempt"
            )));
        }
        self.barrier.tool_modifier(tool).map(Some).ok_or_else(|| {
            DomainError::InvalidArgument(format!(
                "a {tool} is no use against a {}",
                self.barrier
            ))
        })
    }

    /// Squares up to a barrier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already initiated.
    pub fn initiate(
        &mut self,
        actor_id: Uuid,
        barrier: BarrierKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.version != 0 {
            return Err(DomainError::invalid_operation(
                "initiate brute force",
                self.procedure.phase(),
                &["an uninitiated instance"],
            ));
        }
        let barrier = match barrier {
            BarrierKind::Container { strength } => BarrierKind::container(strength),
            other => other,
        };
        self.record(
            BruteForceEventKind::BruteForceInitiated(BruteForceInitiated {
                brute_force_id: self.id,
                actor_id,
                barrier,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Rolls might against the barrier.
    ///
    /// A success breaches it. A failure retries until the barrier's attempt
    /// limit, then the actor is exhausted. A fumble counts as a failure that
    /// also hurts the actor and breaks the tool; the first fumble raises the
    /// DC for good.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Forcing`,
    /// `DomainError::InvalidArgument` for a broken or unsuitable tool, or
    /// `DomainError::Configuration` if might is unconfigured.
    #[allow(clippy::too_many_arguments)]
    pub fn force(
        &mut self,
        skills: &SkillSheet,
        effort: ForceEffort,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        tuning: &ProcedureTuning,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        self.procedure
            .require_phase("force", &[BruteForcePhase::Forcing])?;
        let tool = self.usable_tool(effort.tool)?;

        let dc = self.dc_with(tuning, tool);
        let check = checker.resolve(
            skills,
            FORCE_SKILL,
            effort.pool_bonus(tool),
            dc,
            advantage,
            rng,
        )?;
        let rule = PhaseRule {
            on_success: BruteForcePhase::Breached,
            on_setback: BruteForcePhase::Exhausted,
            on_fumble: BruteForcePhase::Exhausted,
            retry_ceiling: self.barrier.max_attempts(),
        };
        let failed = self.procedure.failed_attempts();
        let resolver = checker.resolver();

        let (transition, fallout, threshold_raise) = match check.outcome {
            CheckOutcome::CriticalSuccess | CheckOutcome::Success => (
                rule.transition(check.outcome, failed),
                ForceFallout::breach(self.barrier, check.outcome.is_critical(), &resolver, rng),
                0,
            ),
            CheckOutcome::Failure => (
                rule.transition(CheckOutcome::Failure, failed),
                ForceFallout::failure(),
                0,
            ),
            CheckOutcome::Fumble => (
                rule.transition(CheckOutcome::Failure, failed),
                ForceFallout::fumble(effort.tool, &resolver, rng),
                if self.fumbled {
                    0
                } else {
                    FUMBLE_THRESHOLD_DELTA
                },
            ),
        };

        self.record(
            BruteForceEventKind::ForceAttempted(ForceAttempted {
                tool: effort.tool,
                assistants: effort.assistants,
                resolution: StepResolution::attempted(&check),
                transition,
                fallout,
                threshold_raise,
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    /// Walks away from the barrier.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already terminal.
    pub fn abandon(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.procedure.abandon_transition()?;
        self.record(
            BruteForceEventKind::BruteForceAbandoned(BruteForceAbandoned {
                brute_force_id: self.id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }
}

impl ProcedureInstance for BruteForce {
    type Phase = BruteForcePhase;

    const KIND: &'static str = "brute-force";

    fn instance_id(&self) -> Uuid {
        self.id
    }

    fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    fn procedure(&self) -> &ProcedureState<BruteForcePhase> {
        &self.procedure
    }
}

impl AggregateRoot for BruteForce {
    type Event = BruteForceEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            BruteForceEventKind::BruteForceInitiated(payload) => {
                self.actor_id = payload.actor_id;
                self.barrier = payload.barrier;
            }
            BruteForceEventKind::ForceAttempted(payload) => {
                if payload.threshold_raise != 0 {
                    self.procedure
                        .adjust(&EscalationAdjustment::RaiseThreshold(payload.threshold_raise));
                }
                if matches!(
                    payload.resolution,
                    StepResolution::Attempted {
                        outcome: CheckOutcome::Fumble,
                        ..
                    }
                ) {
                    self.fumbled = true;
                }
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.attempts += 1;
                self.last_tool = payload.tool;
                if let Some(tool) = payload.tool
                    && payload.fallout.tool_broken
                {
                    self.broken_tools.push(tool);
                }
                self.loudest_noise = self.loudest_noise.max(payload.fallout.noise);
                self.damage_taken += payload.fallout.self_damage;
                self.content_damage += payload.fallout.content_damage;
                self.exhaustion_gained += payload.fallout.exhaustion_gained;
                self.last_fallout = Some(payload.fallout.clone());
            }
            BruteForceEventKind::BruteForceAbandoned(_) => {
                self.procedure.apply(&Transition::Abandon);
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runeforge_config::RulesConfig;
    use runeforge_test_support::{FixedClock, SequenceRng};

    use crate::domain::barrier::Consequence;

    fn initiated(barrier: BarrierKind) -> BruteForce {
        let mut attempt = BruteForce::new(Uuid::new_v4());
        attempt
            .initiate(
                Uuid::new_v4(),
                barrier,
                Uuid::new_v4(),
                &FixedClock::default(),
            )
            .unwrap();
        attempt.clear_uncommitted_events();
        attempt
    }

    fn force_with(
        attempt: &mut BruteForce,
        might: u32,
        effort: ForceEffort,
        rng: &mut SequenceRng,
    ) -> Result<CheckResult, DomainError> {
        let config = RulesConfig::default();
        attempt.force(
            &SkillSheet::new().with("might", might),
            effort,
            AdvantageType::None,
            &config.skill_check(),
            &config.procedure(BruteForce::KIND),
            Uuid::new_v4(),
            &FixedClock::default(),
            rng,
        )
    }

    fn with_tool(tool: Tool) -> ForceEffort {
        ForceEffort {
            tool: Some(tool),
            ..ForceEffort::default()
        }
    }

    fn tuning() -> ProcedureTuning {
        RulesConfig::default().procedure(BruteForce::KIND)
    }

    #[test]
    fn test_initiate_sets_barrier_and_dc() {
        let attempt = initiated(BarrierKind::ReinforcedDoor);

        assert_eq!(attempt.procedure.phase(), BruteForcePhase::Forcing);
        assert_eq!(attempt.effective_dc(&tuning(), None), Some(16));
        assert_eq!(
            attempt.effective_dc(&tuning(), Some(Tool::BreachingCharge)),
            Some(10)
        );
        assert_eq!(attempt.attempts_remaining(), 3);
    }

    #[test]
    fn test_initiate_twice_is_invalid_operation() {
        let mut attempt = initiated(BarrierKind::Vault);

        let result = attempt.initiate(
            Uuid::new_v4(),
            BarrierKind::Vault,
            Uuid::new_v4(),
            &FixedClock::default(),
        );

        assert!(matches!(result, Err(DomainError::InvalidOperation { .. })));
    }

    #[test]
    fn test_critical_breach_is_quieter_and_clean() {
        // Arrange
        let mut attempt = initiated(BarrierKind::SimpleDoor);
        let effort = ForceEffort {
            tool: Some(Tool::Sledgehammer),
            assistants: 3,
            exhaustion: 0,
        };
        let mut rng = SequenceRng::new(vec![10; 9]);

        // Act
        let check = force_with(&mut attempt, 5, effort, &mut rng).unwrap();

        // Assert
        assert_eq!(check.effective_dc, 8);
        assert_eq!(check.roll.pool.count(), 9);
        assert_eq!(check.outcome, CheckOutcome::CriticalSuccess);
        assert_eq!(attempt.procedure.phase(), BruteForcePhase::Breached);
        let fallout = attempt.last_fallout.as_ref().unwrap();
        assert_eq!(fallout.noise, NoiseLevel::Moderate);
        assert!(fallout.consequences.is_empty());
        assert_eq!(attempt.effective_dc(&tuning(), None), None);
        assert_eq!(rng.consumed(), 9);
    }

    #[test]
    fn test_failure_retries_at_higher_dc() {
        let mut attempt = initiated(BarrierKind::SimpleDoor);
        let mut rng = SequenceRng::new(vec![5, 5]);

        let check = force_with(&mut attempt, 2, ForceEffort::default(), &mut rng).unwrap();

        assert_eq!(check.outcome, CheckOutcome::Failure);
        assert_eq!(attempt.procedure.phase(), BruteForcePhase::Forcing);
        assert_eq!(attempt.effective_dc(&tuning(), None), Some(13));
        assert_eq!(attempt.exhaustion_gained, 1);
        assert_eq!(attempt.loudest_noise, NoiseLevel::Moderate);
        assert_eq!(attempt.attempts_remaining(), 4);
    }

    #[test]
    fn test_vault_is_exhausted_after_two_failures() {
        let mut attempt = initiated(BarrierKind::Vault);
        let mut rng = SequenceRng::new(vec![5, 5, 5, 5]);

        force_with(&mut attempt, 2, ForceEffort::default(), &mut rng).unwrap();
        force_with(&mut attempt, 2, ForceEffort::default(), &mut rng).unwrap();

        assert_eq!(attempt.procedure.phase(), BruteForcePhase::Exhausted);
        assert_eq!(attempt.attempts, 2);
        assert_eq!(attempt.attempts_remaining(), 0);
        assert_eq!(attempt.effective_dc(&tuning(), None), None);
    }

    #[test]
    fn test_fumble_hurts_breaks_tool_and_raises_dc_once() {
        // Arrange
        let mut attempt = initiated(BarrierKind::ReinforcedDoor);
        let mut rng = SequenceRng::new(vec![1, 1, 4, 1, 3]);

        // Act
        let first = force_with(&mut attempt, 1, with_tool(Tool::Crowbar), &mut rng).unwrap();
        let dc_after_first = attempt.effective_dc(&tuning(), None);
        let second = force_with(&mut attempt, 1, ForceEffort::default(), &mut rng).unwrap();

        // Assert
        assert_eq!(first.outcome, CheckOutcome::Fumble);
        assert_eq!(second.outcome, CheckOutcome::Fumble);
        // 16 base, +2 threshold, +2 for the first failure
        assert_eq!(dc_after_first, Some(20));
        // one more failure at +2, no second threshold raise
        assert_eq!(attempt.effective_dc(&tuning(), None), Some(22));
        assert_eq!(attempt.procedure.phase(), BruteForcePhase::Forcing);
        assert_eq!(attempt.damage_taken, 7);
        assert_eq!(attempt.exhaustion_gained, 4);
        assert_eq!(attempt.broken_tools, vec![Tool::Crowbar]);
        assert_eq!(attempt.loudest_noise, NoiseLevel::Extreme);
        assert_eq!(
            attempt.last_fallout.as_ref().unwrap().consequences,
            vec![Consequence::SelfDamage, Consequence::MaxNoise]
        );
    }

    #[test]
    fn test_broken_tool_cannot_be_used_again() {
        let mut attempt = initiated(BarrierKind::ReinforcedDoor);
        let mut rng = SequenceRng::new(vec![1, 1, 4]);
        force_with(&mut attempt, 1, with_tool(Tool::Crowbar), &mut rng).unwrap();

        let result = force_with(&mut attempt, 1, with_tool(Tool::Crowbar), &mut rng);

        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
        assert_eq!(attempt.attempts, 1);
    }

    #[test]
    fn test_unsuitable_tool_is_invalid_argument() {
        let mut attempt = initiated(BarrierKind::Vault);
        let mut rng = SequenceRng::new(vec![]);

        let result = force_with(&mut attempt, 4, with_tool(Tool::Knife), &mut rng);

        match result.unwrap_err() {
            DomainError::InvalidArgument(message) => {
                assert_eq!(message, "a knife is no use against a vault");
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
        assert!(attempt.uncommitted_events().is_empty());
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn test_heavy_exhaustion_still_rolls_one_die() {
        let mut attempt = initiated(BarrierKind::container(1));
        let effort = ForceEffort {
            tool: None,
            assistants: 0,
            exhaustion: 6,
        };
        let mut rng = SequenceRng::new(vec![9]);

        let check = force_with(&mut attempt, 1, effort, &mut rng).unwrap();

        assert_eq!(check.roll.pool.count(), 1);
        assert_eq!(check.effective_dc, 10);
        assert_eq!(rng.consumed(), 1);
    }

    #[test]
    fn test_abandon_then_abandon_again_fails() {
        let clock = FixedClock::default();
        let mut attempt = initiated(BarrierKind::SimpleDoor);

        attempt.abandon(Uuid::new_v4(), &clock).unwrap();
        let result = attempt.abandon(Uuid::new_v4(), &clock);

        assert_eq!(attempt.procedure.phase(), BruteForcePhase::Abandoned);
        assert!(matches!(result, Err(DomainError::InvalidOperation { .. })));
    }

    #[test]
    fn test_force_after_breach_is_invalid_operation() {
        let mut attempt = initiated(BarrierKind::container(1));
        let mut rng = SequenceRng::new(vec![10; 11]);
        force_with(&mut attempt, 10, ForceEffort::default(), &mut rng).unwrap();

        let result = force_with(&mut attempt, 1, ForceEffort::default(), &mut rng);

        match result.unwrap_err() {
            DomainError::InvalidOperation { operation, .. } => assert_eq!(operation, "force"),
            other => panic!("expected InvalidOperation, got {other:?}"),
        }
    }
}
