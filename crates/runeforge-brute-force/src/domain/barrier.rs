//! Barrier tables: DCs, attempt limits, allowed tools, and what a breach,
//! a failure or a fumble costs.

use std::fmt;

use runeforge_core::rng::DeterministicRng;
use runeforge_rules::domain::dice::{DiceResolver, DieType};
use serde::{Deserialize, Serialize};

/// Skill rolled to force a barrier.
pub const FORCE_SKILL: &str = "might";

/// Helpers beyond this many add no dice.
pub const MAX_ASSISTANT_DICE: u32 = 2;

/// Permanent DC increase after the first fumble.
pub const FUMBLE_THRESHOLD_DELTA: i32 = 2;

/// d6s of self-damage on a fumble.
pub const FUMBLE_DAMAGE_DICE: u32 = 1;

/// d10s of damage to whatever is behind the barrier.
pub const CONTENT_DAMAGE_DICE: u32 = 1;

/// How loud an attempt was.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum NoiseLevel {
    #[default]
    Silent,
    Quiet,
    Moderate,
    Loud,
    VeryLoud,
    Extreme,
}

impl NoiseLevel {
    /// One level quieter; `Silent` stays silent.
    #[must_use]
    pub const fn reduced(self) -> Self {
        match self {
            Self::Extreme => Self::VeryLoud,
            Self::VeryLoud => Self::Loud,
            Self::Loud => Self::Moderate,
            Self::Moderate => Self::Quiet,
            Self::Quiet | Self::Silent => Self::Silent,
        }
    }

    /// How far away the noise is heard, in feet. `None` means the whole area.
    #[must_use]
    pub const fn alert_radius_feet(self) -> Option<u32> {
        match self {
            Self::Silent => Some(0),
            Self::Quiet => Some(5),
            Self::Moderate => Some(30),
            Self::Loud => Some(60),
            Self::VeryLoud => Some(120),
            Self::Extreme => None,
        }
    }
}

impl fmt::Display for NoiseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Side effects of forcing a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Consequence {
    LoudNoise,
    VeryLoudNoise,
    ContentDamageRisk,
    Exhausting,
    SelfDamage,
    MaxNoise,
    ToolBroken,
}

impl Consequence {
    /// Noise this consequence makes, if it is a noise.
    #[must_use]
    pub const fn noise(self) -> Option<NoiseLevel> {
        match self {
            Self::LoudNoise => Some(NoiseLevel::Loud),
            Self::VeryLoudNoise => Some(NoiseLevel::VeryLoud),
            Self::MaxNoise => Some(NoiseLevel::Extreme),
            Self::ContentDamageRisk | Self::Exhausting | Self::SelfDamage | Self::ToolBroken => {
                None
            }
        }
    }

    /// Whether a critical breach escapes it.
    #[must_use]
    pub const fn avoidable_on_critical(self) -> bool {
        matches!(
            self,
            Self::LoudNoise | Self::VeryLoudNoise | Self::ContentDamageRisk | Self::Exhausting
        )
    }

    /// Chance the consequence lands on a breach.
    #[must_use]
    pub const fn probability(self) -> f64 {
        match self {
            Self::ContentDamageRisk => 0.5,
            _ => 1.0,
        }
    }

    fn lands(self, rng: &mut dyn DeterministicRng) -> bool {
        let chance = self.probability();
        chance >= 1.0 || rng.next_f64() < chance
    }
}

/// Tools that help force a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    Crowbar,
    Sledgehammer,
    BreachingCharge,
    IndustrialCutter,
    Knife,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Crowbar => "crowbar",
            Self::Sledgehammer => "sledgehammer",
            Self::BreachingCharge => "breaching charge",
            Self::IndustrialCutter => "industrial cutter",
            Self::Knife => "knife",
        })
    }
}

/// What a tool does against a particular barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolModifier {
    /// Added to the DC; tools only ever lower it.
    pub dc_modifier: i32,
    /// Extra dice in the pool.
    pub bonus_dice: i32,
}

const fn modifier(dc_modifier: i32, bonus_dice: i32) -> Option<ToolModifier> {
    Some(ToolModifier {
        dc_modifier,
        bonus_dice,
    })
}

/// Barriers that can be forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarrierKind {
    SimpleDoor,
    ReinforcedDoor,
    Vault,
    /// A locked container; strength runs from 1 to 5.
    Container { strength: u8 },
}

impl BarrierKind {
    /// A container of the given strength, clamped to 1..=5.
    #[must_use]
    pub fn container(strength: u8) -> Self {
        Self::Container {
            strength: strength.clamp(1, 5),
        }
    }

    /// Base DC before tools and escalation.
    #[must_use]
    pub fn base_dc(self) -> i32 {
        match self {
            Self::SimpleDoor => 12,
            Self::ReinforcedDoor => 16,
            Self::Vault => 22,
            Self::Container { strength } => 8 + 2 * i32::from(strength.clamp(1, 5)),
        }
    }

    /// Attempts allowed before the actor is spent.
    #[must_use]
    pub const fn max_attempts(self) -> u32 {
        match self {
            Self::SimpleDoor => 5,
            Self::ReinforcedDoor | Self::Container { .. } => 3,
            Self::Vault => 2,
        }
    }

    /// DC added per failed attempt.
    #[must_use]
    pub const fn penalty_per_attempt(self) -> u32 {
        match self {
            Self::SimpleDoor | Self::Container { .. } => 1,
            Self::ReinforcedDoor => 2,
            Self::Vault => 3,
        }
    }

    /// Structural hit points.
    #[must_use]
    pub fn hit_points(self) -> u32 {
        match self {
            Self::SimpleDoor => 20,
            Self::ReinforcedDoor => 40,
            Self::Vault => 80,
            Self::Container { strength } => 10 + 5 * u32::from(strength.clamp(1, 5)),
        }
    }

    /// What a breach costs.
    #[must_use]
    pub const fn consequences(self) -> &'static [Consequence] {
        match self {
            Self::SimpleDoor => &[Consequence::LoudNoise],
            Self::ReinforcedDoor => &[Consequence::VeryLoudNoise, Consequence::ContentDamageRisk],
            Self::Vault => &[
                Consequence::VeryLoudNoise,
                Consequence::Exhausting,
                Consequence::ContentDamageRisk,
            ],
            Self::Container { .. } => &[Consequence::LoudNoise, Consequence::ContentDamageRisk],
        }
    }

    /// The tool's effect on this barrier, `None` if it is no use here.
    #[must_use]
    pub const fn tool_modifier(self, tool: Tool) -> Option<ToolModifier> {
        match (self, tool) {
            (Self::SimpleDoor | Self::ReinforcedDoor | Self::Container { .. }, Tool::Crowbar) => {
                modifier(-2, 1)
            }
            (Self::SimpleDoor, Tool::Sledgehammer) => modifier(-4, 2),
            (Self::ReinforcedDoor, Tool::Sledgehammer) => modifier(-3, 2),
            (Self::ReinforcedDoor, Tool::BreachingCharge) => modifier(-6, 2),
            (Self::Vault, Tool::Sledgehammer) => modifier(-2, 2),
            (Self::Vault, Tool::BreachingCharge) => modifier(-4, 2),
            (Self::Vault, Tool::IndustrialCutter) => modifier(-6, 2),
            (Self::Container { .. }, Tool::Knife) => modifier(-1, 0),
            _ => None,
        }
    }
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SimpleDoor => f.write_str("simple door"),
            Self::ReinforcedDoor => f.write_str("reinforced door"),
            Self::Vault => f.write_str("vault"),
            Self::Container { strength } => write!(f, "container (strength {strength})"),
        }
    }
}

/// What the actor brings to an attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceEffort {
    /// Tool in hand, if any.
    pub tool: Option<Tool>,
    /// Others pushing alongside.
    pub assistants: u32,
    /// The actor's current exhaustion level.
    pub exhaustion: u32,
}

impl ForceEffort {
    /// Dice on top of might: tool dice plus helpers, minus one per two
    /// levels of exhaustion.
    #[must_use]
    pub fn pool_bonus(&self, tool: Option<ToolModifier>) -> i32 {
        let tool_dice = tool.map_or(0, |t| t.bonus_dice);
        let helpers = i32::try_from(self.assistants.min(MAX_ASSISTANT_DICE)).unwrap_or(0);
        let fatigue = i32::try_from(self.exhaustion / 2).unwrap_or(i32::MAX);
        tool_dice.saturating_add(helpers).saturating_sub(fatigue)
    }
}

/// Everything an attempt cost beyond the roll itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceFallout {
    pub noise: NoiseLevel,
    /// Consequences that landed.
    pub consequences: Vec<Consequence>,
    pub content_damage: u32,
    pub self_damage: u32,
    pub exhaustion_gained: u32,
    pub tool_broken: bool,
}

impl ForceFallout {
    /// Fallout of breaking through. A critical escapes every avoidable
    /// consequence and is one level quieter.
    pub fn breach(
        barrier: BarrierKind,
        critical: bool,
        resolver: &DiceResolver,
        rng: &mut dyn DeterministicRng,
    ) -> Self {
        let table = barrier.consequences();
        let loudest = table
            .iter()
            .filter_map(|c| c.noise())
            .max()
            .unwrap_or(NoiseLevel::Loud);

        let mut fallout = Self {
            noise: if critical { loudest.reduced() } else { loudest },
            ..Self::default()
        };
        for &consequence in table {
            if critical && consequence.avoidable_on_critical() {
                continue;
            }
            if !consequence.lands(rng) {
                continue;
            }
            match consequence {
                Consequence::ContentDamageRisk => {
                    fallout.content_damage =
                        resolver.roll_damage(CONTENT_DAMAGE_DICE, DieType::D10, rng);
                }
                Consequence::Exhausting => fallout.exhaustion_gained += 1,
                _ => {}
            }
            fallout.consequences.push(consequence);
        }
        fallout
    }

    /// Fallout of an attempt that simply failed.
    #[must_use]
    pub fn failure() -> Self {
        Self {
            noise: NoiseLevel::Moderate,
            exhaustion_gained: 1,
            ..Self::default()
        }
    }

    /// Fallout of a fumble: the actor gets hurt and any tool breaks.
    pub fn fumble(
        tool: Option<Tool>,
        resolver: &DiceResolver,
        rng: &mut dyn DeterministicRng,
    ) -> Self {
        let mut consequences = vec![Consequence::SelfDamage, Consequence::MaxNoise];
        if tool.is_some() {
            consequences.push(Consequence::ToolBroken);
        }
        Self {
            noise: NoiseLevel::Extreme,
            consequences,
            content_damage: 0,
            self_damage: resolver.roll_damage(FUMBLE_DAMAGE_DICE, DieType::D6, rng),
            exhaustion_gained: 2,
            tool_broken: tool.is_some(),
        }
    }
}

/// Plain-language difficulty of a DC.
#[must_use]
pub const fn difficulty_description(dc: i32) -> &'static str {
    match dc {
        ..=0 => "Automatic",
        1..=8 => "Very Easy",
        9..=12 => "Easy",
        13..=16 => "Moderate",
        17..=20 => "Hard",
        21..=24 => "Very Hard",
        _ => "Nearly Impossible",
    }
}
