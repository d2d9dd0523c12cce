//! Aggregate root for the jury-rig procedure.

use std::fmt;

use runeforge_config::ProcedureTuning;
use runeforge_core::aggregate::AggregateRoot;
use runeforge_core::clock::Clock;
use runeforge_core::error::DomainError;
use runeforge_core::event::{DomainEvent, EventMetadata};
use runeforge_core::rng::DeterministicRng;
use runeforge_rules::domain::check::{CheckOutcome, CheckResult};
use runeforge_rules::domain::dice::{AdvantageType, DieType};
use runeforge_rules::domain::escalation::{ConditionModifier, EscalationPolicy};
use runeforge_rules::domain::procedure::{
    EscalationAdjustment, PhaseRule, ProcedureInstance, ProcedurePhase, ProcedureState,
    StepResolution, Transition,
};
use runeforge_rules::domain::skills::{SkillCheck, SkillSheet};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{
    ExperimentAttempted, IterationApplied, JuryRigAbandoned, JuryRigEvent, JuryRigEventKind,
    JuryRigStarted, MechanismProbed, MethodSelected, ObservationAttempted, ObservationSkipped,
    PatternRecognitionAttempted, PatternRecognitionSkipped,
};
use super::mechanism::{
    BYPASS_SKILL, BypassMethod, COMPLICATION_DIE, Complication, FAMILIARITY_BONUS_DICE,
    OBSERVATION_DC, OBSERVATION_SKILL, PATTERN_BONUS_DICE, PATTERN_DC, SPARKS_DAMAGE_DICE,
    hints_for, normalize_type, salvage_for,
};

/// Jury-rig phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JuryRigPhase {
    Observation,
    Probing,
    PatternRecognition,
    MethodSelection,
    Experimentation,
    Iterate,
    /// Opened.
    Bypassed,
    /// Taken apart for parts by brute disassembly.
    Destroyed,
    /// Wrecked by a fumbled experiment.
    MechanismDestroyed,
    PermanentlyLocked,
    Abandoned,
}

impl JuryRigPhase {
    const fn is_opened(self) -> bool {
        matches!(self, Self::Bypassed | Self::Destroyed)
    }
}

impl fmt::Display for JuryRigPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ProcedurePhase for JuryRigPhase {
    const ABANDONED: Self = Self::Abandoned;

    fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Bypassed
                | Self::Destroyed
                | Self::MechanismDestroyed
                | Self::PermanentlyLocked
                | Self::Abandoned
        )
    }
}

fn experiment_rule(tuning: &ProcedureTuning, method: BypassMethod) -> PhaseRule<JuryRigPhase> {
    PhaseRule {
        on_success: if method.destroys_mechanism() {
            JuryRigPhase::Destroyed
        } else {
            JuryRigPhase::Bypassed
        },
        on_setback: JuryRigPhase::PermanentlyLocked,
        on_fumble: JuryRigPhase::MechanismDestroyed,
        retry_ceiling: tuning.ceiling(),
    }
}

#[derive(Debug, Default)]
struct Fallout {
    damage: u32,
    alarm: bool,
    iteration_bonus: u32,
}

/// The aggregate root for one actor working one mechanism.
#[derive(Debug)]
pub struct JuryRig {
    /// Aggregate identifier.
    pub id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) actor_id: Uuid,
    pub(crate) mechanism_type: String,
    pub(crate) base_dc: i32,
    pub(crate) glitched: bool,
    pub(crate) familiar: bool,
    pub(crate) procedure: ProcedureState<JuryRigPhase>,
    pub(crate) hints: Vec<String>,
    pub(crate) probed_component: Option<String>,
    pub(crate) method: Option<BypassMethod>,
    pub(crate) iterations: u32,
    pub(crate) failed_experiments: u32,
    pub(crate) last_complication: Option<Complication>,
    pub(crate) damage_taken: u32,
    pub(crate) alarm_raised: bool,
    pub(crate) salvage: Vec<String>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<JuryRigEvent>,
}

impl JuryRig {
    /// Creates an instance with no mechanism yet.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            actor_id: Uuid::nil(),
            mechanism_type: String::new(),
            base_dc: 0,
            glitched: false,
            familiar: false,
            procedure: ProcedureState::new(JuryRigPhase::Observation),
            hints: Vec::new(),
            probed_component: None,
            method: None,
            iterations: 0,
            failed_experiments: 0,
            last_complication: None,
            damage_taken: 0,
            alarm_raised: false,
            salvage: Vec::new(),
            uncommitted_events: Vec::new(),
        }
    }

    fn record(&mut self, kind: JuryRigEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let mut event = JuryRigEvent {
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

    /// Experiment dice on top of the bypass rating: one per observation
    /// hint, one for a recognized pattern, two on a familiar type.
    #[must_use]
    pub fn bonus_dice(&self) -> i32 {
        let hints = i32::try_from(self.hints.len()).unwrap_or(i32::MAX);
        let pattern = if self
            .procedure
            .last_resolution_in(JuryRigPhase::PatternRecognition)
            .is_some_and(StepResolution::succeeded)
        {
            PATTERN_BONUS_DICE
        } else {
            0
        };
        let familiarity = if self.familiar {
            FAMILIARITY_BONUS_DICE
        } else {
            0
        };
        hints.saturating_add(pattern).saturating_add(familiarity)
    }

    fn bypass_dc(&self, policy: &EscalationPolicy, method: Option<BypassMethod>) -> i32 {
        let modifiers: Vec<ConditionModifier> = method
            .map(|m| ConditionModifier::new("bypass-method", m.dc_modifier()))
            .into_iter()
            .collect();
        policy.effective_dc(self.base_dc, self.procedure.escalation(), &modifiers)
    }

    /// Effective DC for the next roll, `None` while probing and once terminal.
    /// Before a method is chosen this is the bypass DC without a method.
    #[must_use]
    pub fn effective_dc(&self, policy: &EscalationPolicy) -> Option<i32> {
        match self.procedure.phase() {
            JuryRigPhase::Observation => Some(OBSERVATION_DC),
            JuryRigPhase::PatternRecognition => Some(PATTERN_DC),
            JuryRigPhase::MethodSelection | JuryRigPhase::Iterate => {
                Some(self.bypass_dc(policy, None))
            }
            JuryRigPhase::Experimentation => Some(self.bypass_dc(policy, self.method)),
            JuryRigPhase::Probing
            | JuryRigPhase::Bypassed
            | JuryRigPhase::Destroyed
            | JuryRigPhase::MechanismDestroyed
            | JuryRigPhase::PermanentlyLocked
            | JuryRigPhase::Abandoned => None,
        }
    }

    /// Starts work on a mechanism. The actor is familiar with it if its type
    /// appears in `familiar_types` (compared case-insensitively).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already started, or
    /// `DomainError::InvalidArgument` for a blank type or negative base DC.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        actor_id: Uuid,
        mechanism_type: &str,
        base_dc: i32,
        glitched: bool,
        familiar_types: &[String],
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.version != 0 {
            return Err(DomainError::invalid_operation(
                "start jury-rig",
                self.procedure.phase(),
                &["an unstarted instance"],
            ));
        }
        let mechanism_type = normalize_type(mechanism_type);
        if mechanism_type.is_empty() {
            return Err(DomainError::InvalidArgument(
                "mechanism type must not be blank".to_owned(),
            ));
        }
        if base_dc < 0 {
            return Err(DomainError::InvalidArgument(format!(
                "base DC must not be negative, got {base_dc}"
            )));
        }
        let familiar = familiar_types
            .iter()
            .any(|known| normalize_type(known) == mechanism_type);

        self.record(
            JuryRigEventKind::JuryRigStarted(JuryRigStarted {
                jury_rig_id: self.id,
                actor_id,
                mechanism_type,
                base_dc,
                glitched,
                familiar,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Rolls wits to study the mechanism. A success reveals up to one hint
    /// per net success; any result moves on to probing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Observation`, or
    /// `DomainError::Configuration` if wits is unconfigured.
    pub fn attempt_observation(
        &mut self,
        skills: &SkillSheet,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        self.procedure
            .require_phase("attempt observation", &[JuryRigPhase::Observation])?;

        let check = checker.resolve(
            skills,
            OBSERVATION_SKILL,
            0,
            OBSERVATION_DC,
            advantage,
            rng,
        )?;
        let hints = if check.is_success() {
            hints_for(&self.mechanism_type, check.net_successes)
        } else {
            Vec::new()
        };

        self.record(
            JuryRigEventKind::ObservationAttempted(ObservationAttempted {
                resolution: StepResolution::attempted(&check),
                transition: Transition::Advance {
                    to: JuryRigPhase::Probing,
                },
                hints,
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    /// Skips observation without rolling.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Observation`.
    pub fn skip_observation(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.procedure
            .require_phase("skip observation", &[JuryRigPhase::Observation])?;
        self.record(
            JuryRigEventKind::ObservationSkipped(ObservationSkipped {
                jury_rig_id: self.id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Pokes at a component to see how the mechanism reacts. From
    /// `Observation` the observation is skipped first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Observation` and
    /// `Probing`, or `DomainError::InvalidArgument` for a blank component.
    pub fn probe(
        &mut self,
        component: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.procedure.require_phase(
            "probe",
            &[JuryRigPhase::Observation, JuryRigPhase::Probing],
        )?;
        let component = component.trim();
        if component.is_empty() {
            return Err(DomainError::InvalidArgument(
                "probed component must not be blank".to_owned(),
            ));
        }

        if self.procedure.phase() == JuryRigPhase::Observation {
            self.skip_observation(correlation_id, clock)?;
        }
        self.record(
            JuryRigEventKind::MechanismProbed(MechanismProbed {
                component: component.to_owned(),
                glitch_observed: self.glitched,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Rolls wits to recognize the mechanism's pattern. Any result moves on
    /// to method selection.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `PatternRecognition`,
    /// or `DomainError::Configuration` if wits is unconfigured.
    pub fn attempt_pattern_recognition(
        &mut self,
        skills: &SkillSheet,
        advantage: AdvantageType,
        checker: &SkillCheck<'_>,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        self.procedure.require_phase(
            "attempt pattern recognition",
            &[JuryRigPhase::PatternRecognition],
        )?;

        let check = checker.resolve(skills, OBSERVATION_SKILL, 0, PATTERN_DC, advantage, rng)?;
        self.record(
            JuryRigEventKind::PatternRecognitionAttempted(PatternRecognitionAttempted {
                resolution: StepResolution::attempted(&check),
                transition: Transition::Advance {
                    to: JuryRigPhase::MethodSelection,
                },
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    /// Skips pattern recognition without rolling.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `PatternRecognition`.
    pub fn skip_pattern_recognition(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.procedure.require_phase(
            "skip pattern recognition",
            &[JuryRigPhase::PatternRecognition],
        )?;
        self.record(
            JuryRigEventKind::PatternRecognitionSkipped(PatternRecognitionSkipped {
                jury_rig_id: self.id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Chooses how to attempt the bypass. From `PatternRecognition` the
    /// recognition is skipped first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `PatternRecognition`
    /// and `MethodSelection`, or `DomainError::InvalidArgument` if the
    /// method's prerequisites are unmet.
    pub fn select_method(
        &mut self,
        method: BypassMethod,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.procedure.require_phase(
            "select method",
            &[
                JuryRigPhase::PatternRecognition,
                JuryRigPhase::MethodSelection,
            ],
        )?;
        method.ensure_available(self.familiar, self.glitched)?;

        if self.procedure.phase() == JuryRigPhase::PatternRecognition {
            self.skip_pattern_recognition(correlation_id, clock)?;
        }
        self.record(
            JuryRigEventKind::MethodSelected(MethodSelected { method }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Rolls system-bypass with the chosen method. A failure rolls on the
    /// complication table before the instance moves to `Iterate`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Experimentation`, or
    /// `DomainError::Configuration` if system-bypass is unconfigured.
    #[allow(clippy::too_many_arguments)]
    pub fn experiment(
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
            .require_phase("experiment", &[JuryRigPhase::Experimentation])?;
        let Some(method) = self.method else {
            return Err(DomainError::invalid_operation(
                "experiment",
                self.procedure.phase(),
                &[JuryRigPhase::MethodSelection],
            ));
        };

        let dc = self.bypass_dc(&tuning.escalation_policy(), Some(method));
        let check = checker.resolve(skills, BYPASS_SKILL, self.bonus_dice(), dc, advantage, rng)?;
        let rule = experiment_rule(tuning, method);

        let mut fallout = Fallout::default();
        let mut complication = None;
        let transition = if check.outcome == CheckOutcome::Failure {
            let roll = rng.next_u32_range(1, COMPLICATION_DIE);
            let effect = Complication::from_roll(roll);
            complication = Some((roll, effect));
            match effect {
                Complication::PermanentLock => Transition::Setback {
                    to: JuryRigPhase::PermanentlyLocked,
                },
                Complication::GlitchInFavor => Transition::Advance {
                    to: rule.on_success,
                },
                Complication::AlarmTriggered => {
                    fallout.alarm = true;
                    self.iterate_or_lock(&rule)
                }
                Complication::SparksFly => {
                    fallout.damage =
                        checker
                            .resolver()
                            .roll_damage(SPARKS_DAMAGE_DICE, DieType::D6, rng);
                    self.iterate_or_lock(&rule)
                }
                Complication::PartialSuccess => {
                    fallout.iteration_bonus = 1;
                    self.iterate_or_lock(&rule)
                }
                Complication::Nothing => self.iterate_or_lock(&rule),
            }
        } else {
            rule.transition(check.outcome, self.failed_experiments)
        };

        let salvage = match transition.target(self.procedure.phase()) {
            JuryRigPhase::Destroyed => salvage_for(&self.mechanism_type),
            JuryRigPhase::Bypassed if check.outcome.is_critical() => {
                salvage_for(&self.mechanism_type)
            }
            _ => Vec::new(),
        };

        self.record(
            JuryRigEventKind::ExperimentAttempted(ExperimentAttempted {
                method,
                resolution: StepResolution::attempted(&check),
                transition,
                complication,
                damage: fallout.damage,
                alarm: fallout.alarm,
                iteration_bonus: fallout.iteration_bonus,
                salvage,
            }),
            correlation_id,
            clock,
        );
        Ok(check)
    }

    fn iterate_or_lock(&self, rule: &PhaseRule<JuryRigPhase>) -> Transition<JuryRigPhase> {
        match rule.transition(CheckOutcome::Failure, self.failed_experiments) {
            Transition::Retry => Transition::Move {
                to: JuryRigPhase::Iterate,
            },
            setback => setback,
        }
    }

    /// Learns from the failed experiment: the DC drops by one and a new
    /// method may be chosen.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` outside `Iterate`.
    pub fn iterate(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.procedure
            .require_phase("iterate", &[JuryRigPhase::Iterate])?;
        self.record(
            JuryRigEventKind::IterationApplied(IterationApplied {
                iterations: self.iterations + 1,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Gives up on the mechanism.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already terminal.
    pub fn abandon(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> Result<(), DomainError> {
        self.procedure.abandon_transition()?;
        self.record(
            JuryRigEventKind::JuryRigAbandoned(JuryRigAbandoned {
                jury_rig_id: self.id,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }
}

impl ProcedureInstance for JuryRig {
    type Phase = JuryRigPhase;

    const KIND: &'static str = "jury-rig";

    fn instance_id(&self) -> Uuid {
        self.id
    }

    fn actor_id(&self) -> Uuid {
        self.actor_id
    }

    fn procedure(&self) -> &ProcedureState<JuryRigPhase> {
        &self.procedure
    }
}

impl AggregateRoot for JuryRig {
    type Event = JuryRigEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            JuryRigEventKind::JuryRigStarted(payload) => {
                self.actor_id = payload.actor_id;
                self.mechanism_type.clone_from(&payload.mechanism_type);
                self.base_dc = payload.base_dc;
                self.glitched = payload.glitched;
                self.familiar = payload.familiar;
            }
            JuryRigEventKind::ObservationAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.hints.clone_from(&payload.hints);
            }
            JuryRigEventKind::ObservationSkipped(_) => {
                self.procedure.resolve(
                    StepResolution::Skipped,
                    &Transition::Move {
                        to: JuryRigPhase::Probing,
                    },
                );
            }
            JuryRigEventKind::MechanismProbed(payload) => {
                self.procedure.resolve(
                    StepResolution::Automatic,
                    &Transition::Move {
                        to: JuryRigPhase::PatternRecognition,
                    },
                );
                self.probed_component = Some(payload.component.clone());
            }
            JuryRigEventKind::PatternRecognitionAttempted(payload) => {
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
            }
            JuryRigEventKind::PatternRecognitionSkipped(_) => {
                self.procedure.resolve(
                    StepResolution::Skipped,
                    &Transition::Move {
                        to: JuryRigPhase::MethodSelection,
                    },
                );
            }
            JuryRigEventKind::MethodSelected(payload) => {
                self.method = Some(payload.method);
                self.procedure.apply(&Transition::Move {
                    to: JuryRigPhase::Experimentation,
                });
            }
            JuryRigEventKind::ExperimentAttempted(payload) => {
                let target = payload.transition.target(self.procedure.phase());
                if matches!(
                    payload.resolution,
                    StepResolution::Attempted {
                        outcome: CheckOutcome::Failure,
                        ..
                    }
                ) {
                    self.failed_experiments += 1;
                }
                if payload.iteration_bonus > 0 {
                    self.iterations += payload.iteration_bonus;
                    self.procedure.adjust(&EscalationAdjustment::GrantReduction(
                        i32::try_from(payload.iteration_bonus).unwrap_or(i32::MAX),
                    ));
                }
                self.procedure
                    .resolve(payload.resolution.clone(), &payload.transition);
                self.last_complication = payload.complication.map(|(_, effect)| effect);
                self.damage_taken += payload.damage;
                self.alarm_raised |= payload.alarm;
                self.salvage.extend(payload.salvage.iter().cloned());
                if target.is_opened() {
                    self.familiar = true;
                }
            }
            JuryRigEventKind::IterationApplied(payload) => {
                let gained = payload.iterations.saturating_sub(self.iterations);
                self.iterations = payload.iterations;
                self.procedure.adjust(&EscalationAdjustment::GrantReduction(
                    i32::try_from(gained).unwrap_or(i32::MAX),
                ));
                self.method = None;
                self.procedure.apply(&Transition::Move {
                    to: JuryRigPhase::MethodSelection,
                });
            }
            JuryRigEventKind::JuryRigAbandoned(_) => {
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
