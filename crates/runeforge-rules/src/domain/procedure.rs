//! Generic procedure state machine.
//!
//! Every multi-step activity instantiates [`ProcedureState`] with its own
//! phase enum. Phases change only by applying a [`Transition`]; aggregates
//! compute transitions (usually through a [`PhaseRule`]), store them in
//! events, and replay them on reconstitution.

use std::fmt;

use runeforge_core::error::DomainError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::check::{CheckOutcome, CheckResult};
use super::escalation::{ConditionModifier, EscalationState};

/// A procedure-specific phase enum.
pub trait ProcedurePhase:
    Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The terminal phase reached by explicit abandonment.
    const ABANDONED: Self;

    /// Whether no further actions are legal in this phase.
    fn is_terminal(self) -> bool;
}

/// A procedure instance owned by one actor.
pub trait ProcedureInstance {
    /// The phase enum.
    type Phase: ProcedurePhase;

    /// Key used by the active-instance index, e.g. `"tracking"`.
    const KIND: &'static str;

    /// The instance identifier.
    fn instance_id(&self) -> Uuid;

    /// The actor running the procedure.
    fn actor_id(&self) -> Uuid;

    /// The phase machine.
    fn procedure(&self) -> &ProcedureState<Self::Phase>;
}

/// How a step was resolved. Skipping is distinct from failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepResolution {
    /// A check was rolled.
    Attempted {
        /// Check classification.
        outcome: CheckOutcome,
        /// Net successes rolled.
        net_successes: i32,
        /// DC the check was made at.
        effective_dc: i32,
    },
    /// An optional step was skipped without rolling.
    Skipped,
    /// The step succeeded without a roll.
    Automatic,
}

impl StepResolution {
    /// Summarizes a check for the attempt history.
    #[must_use]
    pub fn attempted(check: &CheckResult) -> Self {
        Self::Attempted {
            outcome: check.outcome,
            net_successes: check.net_successes,
            effective_dc: check.effective_dc,
        }
    }

    /// Whether the step counts as passed. Skipped steps do not.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        match self {
            Self::Attempted { outcome, .. } => outcome.is_success(),
            Self::Skipped => false,
            Self::Automatic => true,
        }
    }

    /// Net successes of an attempted step; zero for skipped or automatic.
    #[must_use]
    pub const fn net_successes(&self) -> i32 {
        match self {
            Self::Attempted { net_successes, .. } => *net_successes,
            Self::Skipped | Self::Automatic => 0,
        }
    }
}

/// One entry in an instance's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord<P> {
    /// The phase the step was taken in.
    pub phase: P,
    /// How it resolved.
    pub resolution: StepResolution,
}

/// A phase change (or deliberate non-change).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition<P> {
    /// Success moved the instance forward; the failure counter resets.
    Advance {
        /// Next phase.
        to: P,
    },
    /// Failure within the retry ceiling; the failure counter grows.
    Retry,
    /// Failure that exhausted the retry ceiling.
    Setback {
        /// Setback phase.
        to: P,
    },
    /// Fumble; always leaves the phase.
    Fumble {
        /// Punitive phase.
        to: P,
    },
    /// Step without a check (skip, probe, method choice).
    Move {
        /// Next phase.
        to: P,
    },
    /// No phase change and no failure recorded.
    Hold,
    /// Explicit abandonment.
    Abandon,
}

impl<P: ProcedurePhase> Transition<P> {
    /// The phase an instance in `current` ends up in.
    #[must_use]
    pub fn target(&self, current: P) -> P {
        match *self {
            Self::Advance { to }
            | Self::Setback { to }
            | Self::Fumble { to }
            | Self::Move { to } => to,
            Self::Retry | Self::Hold => current,
            Self::Abandon => P::ABANDONED,
        }
    }
}

/// Outcome-to-transition table for one working phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRule<P> {
    /// Target on success or critical success.
    pub on_success: P,
    /// Target once failures reach the retry ceiling.
    pub on_setback: P,
    /// Target on a fumble.
    pub on_fumble: P,
    /// Failures allowed in the phase, counting the one that triggers the
    /// setback. Zero and one both mean the first failure is a setback.
    pub retry_ceiling: u32,
}

impl<P: ProcedurePhase> PhaseRule<P> {
    /// Transition for `outcome` given failures already recorded in the phase.
    #[must_use]
    pub fn transition(&self, outcome: CheckOutcome, failed_attempts: u32) -> Transition<P> {
        match outcome {
            CheckOutcome::CriticalSuccess | CheckOutcome::Success => Transition::Advance {
                to: self.on_success,
            },
            CheckOutcome::Fumble => Transition::Fumble { to: self.on_fumble },
            CheckOutcome::Failure => {
                if failed_attempts.saturating_add(1) >= self.retry_ceiling {
                    Transition::Setback {
                        to: self.on_setback,
                    }
                } else {
                    Transition::Retry
                }
            }
        }
    }
}

/// Adjustments to escalation counters that are not phase changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationAdjustment {
    /// Replace the standing condition modifiers.
    SetConditions(Vec<ConditionModifier>),
    /// Permanently raise the DC.
    RaiseThreshold(i32),
    /// Lower the DC by a bonus.
    GrantReduction(i32),
}

/// Phase, escalation counters and attempt history of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureState<P> {
    phase: P,
    escalation: EscalationState,
    history: Vec<AttemptRecord<P>>,
}

impl<P: ProcedurePhase> ProcedureState<P> {
    /// A fresh instance in `initial`.
    #[must_use]
    pub fn new(initial: P) -> Self {
        Self {
            phase: initial,
            escalation: EscalationState::default(),
            history: Vec::new(),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> P {
        self.phase
    }

    /// Whether the current phase is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Escalation counters.
    #[must_use]
    pub const fn escalation(&self) -> &EscalationState {
        &self.escalation
    }

    /// Failures recorded in the current phase.
    #[must_use]
    pub const fn failed_attempts(&self) -> u32 {
        self.escalation.failed_attempts()
    }

    /// Every step taken so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[AttemptRecord<P>] {
        &self.history
    }

    /// The most recent resolution recorded in `phase`.
    #[must_use]
    pub fn last_resolution_in(&self, phase: P) -> Option<&StepResolution> {
        self.history
            .iter()
            .rev()
            .find(|record| record.phase == phase)
            .map(|record| &record.resolution)
    }

    /// Rejects `operation` once the instance is terminal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if the phase is terminal.
    pub fn require_active(&self, operation: &str) -> Result<(), DomainError> {
        if self.phase.is_terminal() {
            return Err(DomainError::invalid_operation::<_, &str>(
                operation,
                self.phase,
                &[],
            ));
        }
        Ok(())
    }

    /// Rejects `operation` unless the current phase is one of `allowed`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` naming the current and
    /// allowed phases.
    pub fn require_phase(&self, operation: &str, allowed: &[P]) -> Result<(), DomainError> {
        if allowed.contains(&self.phase) && !self.phase.is_terminal() {
            return Ok(());
        }
        Err(DomainError::invalid_operation(operation, self.phase, allowed))
    }

    /// The abandonment transition, if the instance may still be abandoned.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidOperation` if already terminal.
    pub fn abandon_transition(&self) -> Result<Transition<P>, DomainError> {
        self.require_active("abandon")?;
        Ok(Transition::Abandon)
    }

    /// Applies a transition without recording history.
    pub fn apply(&mut self, transition: &Transition<P>) {
        let next = transition.target(self.phase);
        match transition {
            Transition::Retry => self.escalation.record_failure(),
            Transition::Hold => {}
            Transition::Advance { .. }
            | Transition::Setback { .. }
            | Transition::Fumble { .. }
            | Transition::Abandon => self.escalation.reset_failures(),
            Transition::Move { .. } => {
                if next != self.phase {
                    self.escalation.reset_failures();
                }
            }
        }
        self.phase = next;
    }

    /// Records how the current phase's step resolved, then applies the
    /// transition.
    pub fn resolve(&mut self, resolution: StepResolution, transition: &Transition<P>) {
        self.history.push(AttemptRecord {
            phase: self.phase,
            resolution,
        });
        self.apply(transition);
    }

    /// Applies an escalation adjustment.
    pub fn adjust(&mut self, adjustment: &EscalationAdjustment) {
        match adjustment {
            EscalationAdjustment::SetConditions(conditions) => {
                self.escalation.replace_conditions(conditions.clone());
            }
            EscalationAdjustment::RaiseThreshold(delta) => self.escalation.raise_threshold(*delta),
            EscalationAdjustment::GrantReduction(amount) => {
                self.escalation.grant_reduction(*amount);
            }
        }
    }
}
