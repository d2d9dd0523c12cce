//! Aggregate root for the tracking procedure.

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

use super::events::{
    AcquisitionAttempted, ClosingInAttempted, ClosingInStarted, PursuitAttempted,
    RecoveryAttempted, TargetCountEstimated, TrackingAbandoned, TrackingEvent, TrackingEventKind,
    TrackingStarted, TrailAgeEstimated,
};
use super::trail::{
    AUTO_FIND_FT, CLOSE_IN_MAX_FT, COLD_TRAIL_MIN_RATING, ESTIMATE_TARGET_COUNT_DC,
    ESTIMATE_TRAIL_AGE_DC, RecoveryStrategy, TRACKING_SKILL, Terrain, TrackingGear,
    TrailAge, TrailConditions, closing_modifier,
};

/// Tracking phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackingPhase {
    Acquisition,
    Pursuit,
    ClosingIn,
    Lost,
    TargetFound,
    Cold,
    Abandoned,
}

impl fmt::Display for TrackingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ProcedurePhase for TrackingPhase {
    const ABANDONED: Self = Self::Abandoned;

    fn is_terminal(self) -> bool {
        matches!(self, Self::TargetFound | Self::Cold | Self::Abandoned)
    }
}

const PURSUIT_RULE: PhaseRule<TrackingPhase> = PhaseRule {
    on_success: TrackingPhase::Pursuit,
    on_setback: TrackingPhase::Lost,
    on_fumble: TrackingPhase::Lost,
    retry_ceiling: 0,
};

const CLOSING_IN_RULE: PhaseRule<TrackingPhase> = PhaseRule {
    on_success: TrackingPhase::TargetFound,
    on_setback: TrackingPhase::Lost,
    on_fumble: TrackingPhase::Lost,
    retry_ceiling: 0,
};

fn acquisition_rule(tuning: &ProcedureTuning) -> PhaseRule<TrackingPhase> {
    PhaseRule {
        on_success: TrackingPhase::Pursuit,
        on_setback: TrackingPhase::Cold,
        on_fumble: TrackingPhase::Cold,
        retry_ceiling: tuning.ceiling(),
    }
}

fn recovery_rule(tuning: &ProcedureTuning) -> PhaseRule<TrackingPhase> {
    PhaseRule {
        on_success: TrackingPhase::Pursuit,
        on_setback: TrackingPhase::Cold,
        on_fumble: TrackingPhase::Cold,
        retry_ceiling: tuning.ceiling(),
    }
}

/// The aggregate root for one actor following one trail.
#[derive(Debug)]
pub struct Tracking {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) actor_id: Uuid,
    pub(crate) quarry: String,
    pub(crate) trail_age: TrailAge,
    pub(crate) terrain: Terrain,
    pub(crate) bonus_dice: i32,
    pub(crate) procedure: ProcedureState<TrackingPhase>,
    pub(crate) distance_covered_miles: f64,
    pub(crate) distance_to_target_ft: Option<u32>,
    pub(crate) target_alerted: bool,
    pub(crate) minutes_recovering: u32,
    pub(crate) estimated_target_count: Option<u32>,
    pub(crate) estimated_trail_age: Option<TrailAge>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<TrackingEvent>,
}

impl Tracking {
    /// Creates an unstarted tracking instance.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            actor_id: Uuid::nil(),
            quarry: String::new(),
            trail_age: TrailAge::Standard,
            terrain: Terrain::OpenWasteland,
            bonus_dice: 0,
            procedure: ProcedureState::new(TrackingPhase::Acquisition),
            distance_covered_miles: 0.0,
            distance_to_target_ft: None,
            target_alerted: false,
            minutes_recovering: 0,
            estimated_target_count: None,
            estimated_trail_age: None,
            uncommitted_events: Vec::new(),
        }
    }

    fn record(&mut self, kind: TrackingEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let mut event = TrackingEvent {
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

    /// Effective DC for the next check in the current phase, `None` once
    /// terminal. In `Lost` this is the DC of a plain backtrack.
    #[must_use]
    pub fn effective_dc(&self, policy: &EscalationPolicy) -> Option<i32> {
        match self.procedure.phase() {
            TrackingPhase::Acquisition | TrackingPhase::Pursuit | TrackingPhase::Lost => {
                Some(self.dc_with(policy, &[]))
            }
            TrackingPhase::ClosingIn => {
                let extra: Vec<ConditionModifier> =
                    self.distance_to_target_ft.map(closing_modifier).into_iter().collect();
                Some(self.dc_with(policy, &extra))
            }
            TrackingPhase::TargetFound | TrackingPhase::Cold | TrackingPhase::Abandoned => None,
        }
    }

    fn dc_with(&self, policy: &EscalationPolicy, extra: &[ConditionModifier]) -> i32 {
        policy.effective_dc(self.trail_age.base_dc(), self.procedure.escalation(), extra)
    }

    fn roll(
        &self,
        checker: &SkillCheck<'_>,
        skills: &SkillSheet,
        dc: i32,
        advantage: AdvantageType,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        checker.resolve(skills, TRACKING_SKILL, self.bonus_dice, dc, advantage, rng)
    }

    /// Starts tracking, producing a `TrackingStarted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already started, or
    /// `DomainError::InvalidArgument` for a blank quarry or a cold trail
    /// attempted without a master survival rating.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        actor_id: Uuid,
        quarry: &str,
        trail_age: TrailAge,
        terrain: Terrain,
        conditions: &TrailConditions,
        gear: &TrackingGear,
        skills: &SkillSheet,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.version != 0 {
            return Err(DomainError::invalid_operation(
                "start tracking",
                self.procedure.phase(),
                &["an unstarted instance"],
            ));
        }
        if quarry.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "quarry must not be blank".to_owned(),
            ));
        }
        let rating = skills.rating(TRACKING_SKILL);
        if trail_age == TrailAge::Cold && rating < COLD_TRAIL_MIN_RATING {
            return Err(DomainError::InvalidArgument(format!(
                "cold trails require {TRACKING_SKILL} rating {COLD_TRAIL_MIN_RATING}, got {rating}"
            )));
        }

        self.record(
            TrackingEventKind::TrackingStarted(TrackingStarted {
                tracking_id: self.id,
                actor_id,
                quarry: quarry.trim().to_owned(),
                trail_age,
                terrain,
                conditions: conditions.modifiers(),
                bonus_dice: gear.bonus_dice(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Rolls to pick up the trail.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Acquisition`, or
    /// `DomainError::Configuration` if the tracking skill is unconfigured.
    #[allow(clippy::too_many_arguments)]
    pub fn attempt_acquisition(
        &mut self,
        skills: &SkillSheet,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        tuning: &ProcedureTuning,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        self.procedure
            .require_phase("attempt acquisition", &[TrackingPhase::Acquisition])?;

        let dc = self.dc_with(&tuning.escalation_policy(), &[]);
        let check = self.roll(checker, skills, dc, advantage, rng)?;
        let transition =
            acquisition_rule(tuning).transition(check.outcome, self.procedure.failed_attempts());

        self.record(
            TrackingEventKind::AcquisitionAttempted(AcquisitionAttempted {
                resolution: StepResolution::attempted(&check),
                transition,
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    /// Rolls one pursuit leg. A success covers `distance_miles`, or the
    /// terrain's check interval when none is given.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Pursuit`,
    /// `DomainError::InvalidArgument` for a non-positive distance, or
    /// `DomainError::Configuration` if the tracking skill is unconfigured.
    #[allow(clippy::too_many_arguments)]
    pub fn continue_pursuit(
        &mut self,
        distance_miles: Option<f64>,
        skills: &SkillSheet,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        tuning: &ProcedureTuning,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        self.procedure
            .require_phase("continue pursuit", &[TrackingPhase::Pursuit])?;
        let leg = distance_miles.unwrap_or_else(|| self.terrain.check_interval_miles());
        if !leg.is_finite() || leg <= 0.0 {
            return Err(DomainError::InvalidArgument(format!(
                "pursuit distance must be positive, got {leg}"
            )));
        }

        let dc = self.dc_with(&tuning.escalation_policy(), &[]);
        let check = self.roll(checker, skills, dc, advantage, rng)?;
        let transition = PURSUIT_RULE.transition(check.outcome, self.procedure.failed_attempts());

        self.record(
            TrackingEventKind::PursuitAttempted(PursuitAttempted {
                resolution: StepResolution::attempted(&check),
                transition,
                distance_miles: if check.is_success() { leg } else { 0.0 },
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    /// Closes in on the target from `distance_ft`. From `Pursuit` this first
    /// moves to `ClosingIn`. Within 50 ft the target is found without a
    /// roll, and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Pursuit` and
    /// `ClosingIn`, `DomainError::InvalidArgument` beyond 500 ft, or
    /// `DomainError::Configuration` if the tracking skill is unconfigured.
    #[allow(clippy::too_many_arguments)]
    pub fn close_in(
        &mut self,
        distance_ft: u32,
        skills: &SkillSheet,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        tuning: &ProcedureTuning,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Option<CheckResult>, DomainError> {
        self.procedure.require_phase(
            "close in",
            &[TrackingPhase::Pursuit, TrackingPhase::ClosingIn],
        )?;
        if distance_ft > CLOSE_IN_MAX_FT {
            return Err(DomainError::InvalidArgument(format!(
                "cannot close in from {distance_ft} ft; must be within {CLOSE_IN_MAX_FT} ft"
            )));
        }
        checker.pool_for(skills, TRACKING_SKILL, self.bonus_dice)?;

        if self.procedure.phase() == TrackingPhase::Pursuit {
            self.record(
                TrackingEventKind::ClosingInStarted(ClosingInStarted { distance_ft }),
                correlation_id,
                clock,
            );
        }

        if distance_ft <= AUTO_FIND_FT {
            self.record(
                TrackingEventKind::ClosingInAttempted(ClosingInAttempted {
                    distance_ft,
                    resolution: StepResolution::Automatic,
                    transition: Transition::Advance {
                        to: TrackingPhase::TargetFound,
                    },
                    target_alerted: false,
                }),
                correlation_id,
                clock,
            );
            return Ok(None);
        }

        let dc = self.dc_with(&tuning.escalation_policy(), &[closing_modifier(distance_ft)]);
        let check = self.roll(checker, skills, dc, advantage, rng)?;
        let transition =
            CLOSING_IN_RULE.transition(check.outcome, self.procedure.failed_attempts());

        self.record(
            TrackingEventKind::ClosingInAttempted(ClosingInAttempted {
                distance_ft,
                resolution: StepResolution::attempted(&check),
                transition,
                target_alerted: check.outcome.is_fumble(),
            }),
            correlation_id,
            clock,
        );
        Ok(Some(check))
    }

    /// Rolls to relocate a lost trail with `strategy`. A fumble counts as an
    /// ordinary failure; the ceiling-th failure turns the trail cold.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Lost`, or
    /// `DomainError::Configuration` if the tracking skill is unconfigured.
    #[allow(clippy::too_many_arguments)]
    pub fn attempt_recovery(
        &mut self,
        strategy: RecoveryStrategy,
        skills: &SkillSheet,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        tuning: &ProcedureTuning,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        self.procedure
            .require_phase("attempt recovery", &[TrackingPhase::Lost])?;

        let dc = self.dc_with(&tuning.escalation_policy(), &[strategy.condition()]);
        let check = self.roll(checker, skills, dc, advantage, rng)?;
        let outcome = if check.outcome.is_fumble() {
            CheckOutcome::Failure
        } else {
            check.outcome
        };
        let transition =
            recovery_rule(tuning).transition(outcome, self.procedure.failed_attempts());

        self.record(
            TrackingEventKind::RecoveryAttempted(RecoveryAttempted {
                strategy,
                resolution: StepResolution::attempted(&check),
                transition,
                minutes_spent: strategy.time_cost_minutes(),
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    /// Estimates how many targets made the trail. Does not change phase.
    /// Returns the estimate on success.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` once terminal, or
    /// `DomainError::Configuration` if the tracking skill is unconfigured.
    pub fn estimate_target_count(
        &mut self,
        skills: &SkillSheet,
        checker: &SkillCheck<'_>,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Option<u32>, DomainError> {
        self.procedure.require_active("estimate target count")?;

        let check = self.roll(
            checker,
            skills,
            ESTIMATE_TARGET_COUNT_DC,
            AdvantageType::None,
            rng,
        )?;
        let estimate = check.is_success().then(|| {
            let base = 2 + rng.next_u32_range(1, 3);
            let spread = u32::try_from((3 - check.margin).max(0)).unwrap_or(0);
            let offset = rng.next_u32_range(0, spread * 2);
            (base + offset).saturating_sub(spread).max(1)
        });

        self.record(
            TrackingEventKind::TargetCountEstimated(TargetCountEstimated {
                resolution: StepResolution::attempted(&check),
                estimate,
            }),
            correlation_id,
            clock,
        );
        Ok(estimate)
    }

    /// Estimates the trail's age. Does not change phase. Returns the true
    /// age on success.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` once terminal, or
    /// `DomainError::Configuration` if the tracking skill is unconfigured.
    pub fn estimate_trail_age(
        &mut self,
        skills: &SkillSheet,
        checker: &SkillCheck<'_>,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Option<TrailAge>, DomainError> {
        self.procedure.require_active("estimate trail age")?;

        let check = self.roll(
            checker,
            skills,
            ESTIMATE_TRAIL_AGE_DC,
            AdvantageType::None,
            rng,
        )?;
        let estimate = check.is_success().then_some(self.trail_age);

        self.record(
            TrackingEventKind::TrailAgeEstimated(TrailAgeEstimated {
                resolution: StepResolution::attempted(&check),
                estimate,
            }),
            correlation_id,
            clock,
        );
        Ok(estimate)
    }

    /// Abandons the trail.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already terminal.
    pub fn abandon(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.procedure.abandon_transition()?;
        self.record(
            TrackingEventKind::TrackingAbandoned(TrackingAbandoned {
                tracking_id: self.id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }
}

impl ProcedureInstance for Tracking {
    type Phase = TrackingPhase;

    const KIND: &'static str = "tracking";

    fn instance_id(&self) -> Uuid {
        self.id
    }

    fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    fn procedure(&self) -> &ProcedureState<TrackingPhase> {
        &self.procedure
    }
}

impl AggregateRoot for Tracking {
    type Event = TrackingEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            TrackingEventKind::TrackingStarted(payload) => {
                self.actor_id = payload.actor_id;
                self.quarry.clone_from(&payload.quarry);
                self.trail_age = payload.trail_age;
                self.terrain = payload.terrain;
                self.bonus_dice = payload.bonus_dice;
                self.procedure
                    .adjust(&EscalationAdjustment::SetConditions(payload.conditions.clone()));
            }
            TrackingEventKind::AcquisitionAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
            }
            TrackingEventKind::PursuitAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.distance_covered_miles += payload.distance_miles;
            }
            TrackingEventKind::ClosingInStarted(payload) => {
                self.procedure.apply(&Transition::Move {
                    to: TrackingPhase::ClosingIn,
                });
                self.distance_to_target_ft = Some(payload.distance_ft);
            }
            TrackingEventKind::ClosingInAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.distance_to_target_ft = Some(payload.distance_ft);
                self.target_alerted |= payload.target_alerted;
            }
            TrackingEventKind::RecoveryAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.minutes_recovering = self.minutes_recovering.saturating_add(payload.minutes_spent);
            }
            TrackingEventKind::TargetCountEstimated(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &Transition::Hold);
                if payload.estimate.is_some() {
                    self.estimated_target_count = payload.estimate;
                }
            }
            TrackingEventKind::TrailAgeEstimated(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &Transition::Hold);
                if payload.estimate.is_some() {
                    self.estimated_trail_age = payload.estimate;
                }
            }
            TrackingEventKind::TrackingAbandoned(_) => {
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
