//! Aggregate root for the trap disarmament procedure.

use std::fmt;

use runeforge_config::ProcedureTuning;
use runeforge_core::aggregate::AggregateRoot;
use runeforge_core::clock::Clock;
use runeforge_core::error::DomainError;
use runeforge_core::event::{DomainEvent, EventMetadata};
use runeforge_core::rng::DeterministicRng;
use runeforge_rules::domain::check::{CheckOutcome, CheckResult};
use runeforge_rules::domain::dice::AdvantageType;
use runeforge_rules::domain::escalation::EscalationPolicy;
use runeforge_rules::domain::procedure::{
    PhaseRule, ProcedureInstance, ProcedurePhase, ProcedureState, StepResolution, Transition,
};
use runeforge_rules::domain::skills::{SkillCheck, SkillSheet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    AnalysisAttempted, AnalysisSkipped, DetectionAttempted, DisarmamentAttempted, TrapAbandoned,
    TrapEncountered, TrapEvent, TrapEventKind,
};
use super::trap::{
    ANALYSIS_SKILL, AnalysisFindings, DETECTION_SKILL, DISARM_SKILLS, TOOLS_REQUIRED_DC,
    ToolQuality, TrapKind, TriggeredEffects,
};

/// Trap disarmament phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapPhase {
    Detection,
    Analysis,
    Disarmament,
    Disarmed,
    Triggered,
    Destroyed,
    Abandoned,
}

impl TrapPhase {
    const fn sets_trap_off(self) -> bool {
        matches!(self, Self::Triggered | Self::Destroyed)
    }
}

impl fmt::Display for TrapPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ProcedurePhase for TrapPhase {
    const ABANDONED: Self = Self::Abandoned;

    fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Disarmed | Self::Triggered | Self::Destroyed | Self::Abandoned
        )
    }
}

const DETECTION_RULE: PhaseRule<TrapPhase> = PhaseRule {
    on_success: TrapPhase::Analysis,
    on_setback: TrapPhase::Triggered,
    on_fumble: TrapPhase::Triggered,
    retry_ceiling: 0,
};

fn disarm_rule(tuning: &ProcedureTuning) -> PhaseRule<TrapPhase> {
    PhaseRule {
        on_success: TrapPhase::Disarmed,
        on_setback: TrapPhase::Triggered,
        on_fumble: TrapPhase::Destroyed,
        retry_ceiling: tuning.ceiling(),
    }
}

// Analysis never blocks progress; only a fumble sets the trap off.
fn analysis_transition(outcome: CheckOutcome) -> Transition<TrapPhase> {
    if outcome.is_fumble() {
        Transition::Fumble {
            to: TrapPhase::Triggered,
        }
    } else {
        Transition::Advance {
            to: TrapPhase::Disarmament,
        }
    }
}

/// The aggregate root for one actor dealing with one trap.
#[derive(Debug)]
pub struct TrapDisarmament {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) actor_id: Uuid,
    pub(crate) trap: TrapKind,
    pub(crate) procedure: ProcedureState<TrapPhase>,
    pub(crate) findings: Option<AnalysisFindings>,
    pub(crate) last_tool: Option<ToolQuality>,
    pub(crate) effects: Option<TriggeredEffects>,
    pub(crate) salvage: Vec<String>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<TrapEvent>,
}

impl TrapDisarmament {
    /// Creates an instance with no trap yet.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            actor_id: Uuid::nil(),
            trap: TrapKind::Unrecognized(String::new()),
            procedure: ProcedureState::new(TrapPhase::Detection),
            findings: None,
            last_tool: None,
            effects: None,
            salvage: Vec::new(),
            uncommitted_events: Vec::new(),
        }
    }

    fn record(&mut self, kind: TrapEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let mut event = TrapEvent {
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

    /// Effective DC for the next check, `None` once terminal. Analysis
    /// always rolls against the unescalated disarm DC.
    #[must_use]
    pub fn effective_dc(&self, policy: &EscalationPolicy) -> Option<i32> {
        let escalation = self.procedure.escalation();
        match self.procedure.phase() {
            TrapPhase::Detection => {
                Some(policy.effective_dc(self.trap.detection_dc(), escalation, &[]))
            }
            TrapPhase::Analysis => Some(self.trap.disarm_dc()),
            TrapPhase::Disarmament => {
                Some(policy.effective_dc(self.trap.disarm_dc(), escalation, &[]))
            }
            TrapPhase::Disarmed
            | TrapPhase::Triggered
            | TrapPhase::Destroyed
            | TrapPhase::Abandoned => None,
        }
    }

    fn effects_of(
        &self,
        transition: &Transition<TrapPhase>,
        checker: &SkillCheck<'_>,
        rng: &mut dyn DeterministicRng,
    ) -> Option<TriggeredEffects> {
        transition
            .target(self.procedure.phase())
            .sets_trap_off()
            .then(|| self.trap.effect().trigger(&checker.resolver(), rng))
    }

    /// Records the trap the actor has come upon. Unknown keys are accepted
    /// and fall back to moderate DCs.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already started, or
    /// `DomainError::InvalidArgument` for a blank trap key.
    pub fn encounter(
        &mut self,
        actor_id: Uuid,
        trap_key: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.version != 0 {
            return Err(DomainError::invalid_operation(
                "encounter trap",
                self.procedure.phase(),
                &["an unstarted instance"],
            ));
        }
        if trap_key.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "trap key must not be blank".to_owned(),
            ));
        }

        self.record(
            TrapEventKind::TrapEncountered(TrapEncountered {
                disarmament_id: self.id,
                actor_id,
                trap: TrapKind::from_key(trap_key),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Rolls perception to spot the trap. A miss sets it off.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Detection`, or
    /// `DomainError::Configuration` if perception is unconfigured.
    #[allow(clippy::too_many_arguments)]
    pub fn attempt_detection(
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
            .require_phase("attempt detection", &[TrapPhase::Detection])?;

        let dc = tuning.escalation_policy().effective_dc(
            self.trap.detection_dc(),
            self.procedure.escalation(),
            &[],
        );
        let check = checker.resolve(skills, DETECTION_SKILL, 0, dc, advantage, rng)?;
        let transition =
            DETECTION_RULE.transition(check.outcome, self.procedure.failed_attempts());
        let effects = self.effects_of(&transition, checker, rng);

        self.record(
            TrapEventKind::DetectionAttempted(DetectionAttempted {
                resolution: StepResolution::attempted(&check),
                transition,
                effects,
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    /// Rolls wits against the base disarm DC to study the trap. Any result
    /// short of a fumble moves on to disarmament; the net successes decide
    /// what is revealed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Analysis`, or
    /// `DomainError::Configuration` if wits is unconfigured.
    pub fn attempt_analysis(
        &mut self,
        skills: &SkillSheet,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<AnalysisFindings, DomainError> {
        self.procedure
            .require_phase("attempt analysis", &[TrapPhase::Analysis])?;

        let check = checker.resolve(
            skills,
            ANALYSIS_SKILL,
            0,
            self.trap.disarm_dc(),
            advantage,
            rng,
        )?;
        let findings = if check.outcome.is_fumble() {
            AnalysisFindings::default()
        } else {
            AnalysisFindings::from_net(check.net_successes, &self.trap)
        };
        let transition = analysis_transition(check.outcome);
        let effects = self.effects_of(&transition, checker, rng);

        self.record(
            TrapEventKind::AnalysisAttempted(AnalysisAttempted {
                resolution: StepResolution::attempted(&check),
                transition,
                findings,
                effects,
            }),
            correlation_id,
            clock,
        );
        Ok(findings)
    }

    /// Skips analysis without rolling.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Analysis`.
    pub fn skip_analysis(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.procedure
            .require_phase("skip analysis", &[TrapPhase::Analysis])?;
        self.record(
            TrapEventKind::AnalysisSkipped(AnalysisSkipped {
                disarmament_id: self.id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Rolls the better of wits and finesse to disarm the trap. An
    /// unresolved analysis must be attempted or skipped first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Disarmament`,
    /// `DomainError::InvalidArgument` for bare hands on a trap
    /// that needs tools, or `DomainError::Configuration` if the disarm skill
    /// is unconfigured.
    #[allow(clippy::too_many_arguments)]
    pub fn attempt_disarmament(
        &mut self,
        tool: ToolQuality,
        skills: &SkillSheet,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        tuning: &ProcedureTuning,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        self.procedure
            .require_phase("attempt disarmament", &[TrapPhase::Disarmament])?;
        let base_dc = self.trap.disarm_dc();
        if tool == ToolQuality::BareHands && base_dc >= TOOLS_REQUIRED_DC {
            return Err(DomainError::InvalidArgument(format!(
                "disarm DC {base_dc} requires tools; bare hands only work below DC {TOOLS_REQUIRED_DC}"
            )));
        }
        let skill = skills.best_of(&DISARM_SKILLS).unwrap_or(ANALYSIS_SKILL);
        let bonus_dice = tool.dice() + self.findings.map_or(0, |f| f.bonus_dice());
        checker.pool_for(skills, skill, bonus_dice)?;

        let dc = tuning
            .escalation_policy()
            .effective_dc(base_dc, self.procedure.escalation(), &[]);
        let check = checker.resolve(skills, skill, bonus_dice, dc, advantage, rng)?;
        let transition =
            disarm_rule(tuning).transition(check.outcome, self.procedure.failed_attempts());
        let effects = self.effects_of(&transition, checker, rng);
        let salvage = if check.outcome.is_critical() {
            self.trap.salvage()
        } else {
            Vec::new()
        };

        self.record(
            TrapEventKind::DisarmamentAttempted(DisarmamentAttempted {
                tool,
                resolution: StepResolution::attempted(&check),
                transition,
                effects,
                salvage,
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    /// Walks away from the trap.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already terminal.
    pub fn abandon(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.procedure.abandon_transition()?;
        self.record(
            TrapEventKind::TrapAbandoned(TrapAbandoned {
                disarmament_id: self.id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }
}

impl ProcedureInstance for TrapDisarmament {
    type Phase = TrapPhase;

    const KIND: &'static str = "trap-disarmament";

    fn instance_id(&self) -> Uuid {
        self.id
    }

    fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    fn procedure(&self) -> &ProcedureState<TrapPhase> {
        &self.procedure
    }
}

impl AggregateRoot for TrapDisarmament {
    type Event = TrapEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            TrapEventKind::TrapEncountered(payload) => {
                self.actor_id = payload.actor_id;
                self.trap = payload.trap.clone();
            }
            TrapEventKind::DetectionAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.effects = payload.effects.or(self.effects);
            }
            TrapEventKind::AnalysisAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.findings = Some(payload.findings);
                self.effects = payload.effects.or(self.effects);
            }
            TrapEventKind::AnalysisSkipped(_) => {
                self.procedure.resolve(
                    StepResolution::Skipped,
                    &Transition::Move {
                        to: TrapPhase::Disarmament,
                    },
                );
            }
            TrapEventKind::DisarmamentAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.last_tool = Some(payload.tool);
                self.effects = payload.effects.or(self.effects);
                self.salvage.extend(payload.salvage.iter().cloned());
            }
            TrapEventKind::TrapAbandoned(_) => {
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
