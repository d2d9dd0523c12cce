//! Trap catalog: detection and disarm DCs, trigger effects, salvage, tools.

use std::fmt;

use runeforge_core::rng::DeterministicRng;
use runeforge_rules::domain::dice::{DiceResolver, DieType};
use serde::{Deserialize, Serialize};

/// Skill rolled to spot a trap.
pub const DETECTION_SKILL: &str = "perception";

/// Skill rolled to study a spotted trap.
pub const ANALYSIS_SKILL: &str = "wits";

/// Disarmament uses whichever of these the actor rates higher.
pub const DISARM_SKILLS: [&str; 2] = ["wits", "finesse"];

/// Disarm DC at or above which bare hands are not enough.
pub const TOOLS_REQUIRED_DC: i32 = 4;

/// Detection and disarm DC of a trap the catalog does not know.
pub const FALLBACK_DC: i32 = 12;

/// Extra disarm die granted by a revealed hint.
pub const HINT_BONUS_DICE: i32 = 1;

/// Trap designs in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapType {
    Tripwire,
    PressurePlate,
    Electrified,
    LaserGrid,
    JotunDefense,
}

impl TrapType {
    const ALL: [Self; 5] = [
        Self::Tripwire,
        Self::PressurePlate,
        Self::Electrified,
        Self::LaserGrid,
        Self::JotunDefense,
    ];

    /// Catalog key, e.g. `"pressure-plate"`.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Tripwire => "tripwire",
            Self::PressurePlate => "pressure-plate",
            Self::Electrified => "electrified",
            Self::LaserGrid => "laser-grid",
            Self::JotunDefense => "jotun-defense",
        }
    }

    /// Looks up a catalog key. Case, hyphens, underscores and spaces are
    /// ignored, so `"PressurePlate"` and `"pressure_plate"` both match.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let wanted = normalize(key);
        Self::ALL
            .into_iter()
            .find(|trap| normalize(trap.key()) == wanted)
    }

    /// DC to spot the trap.
    #[must_use]
    pub const fn detection_dc(self) -> i32 {
        match self {
            Self::Tripwire => 8,
            Self::PressurePlate => 10,
            Self::Electrified => 14,
            Self::LaserGrid => 18,
            Self::JotunDefense => 22,
        }
    }

    /// Base DC to disarm the trap.
    #[must_use]
    pub const fn disarm_dc(self) -> i32 {
        match self {
            Self::Tripwire => 8,
            Self::PressurePlate => 12,
            Self::Electrified => 16,
            Self::LaserGrid => 20,
            Self::JotunDefense => 24,
        }
    }

    /// What happens when the trap goes off.
    #[must_use]
    pub const fn effect(self) -> TrapEffect {
        match self {
            Self::Tripwire => TrapEffect {
                damage_dice: 0,
                damage_type: None,
                alert: true,
                lockdown: false,
            },
            Self::PressurePlate => TrapEffect {
                damage_dice: 2,
                damage_type: Some(DamageType::Physical),
                alert: false,
                lockdown: false,
            },
            Self::Electrified => TrapEffect {
                damage_dice: 3,
                damage_type: Some(DamageType::Lightning),
                alert: false,
                lockdown: false,
            },
            Self::LaserGrid => TrapEffect {
                damage_dice: 0,
                damage_type: None,
                alert: true,
                lockdown: true,
            },
            Self::JotunDefense => TrapEffect {
                damage_dice: 5,
                damage_type: Some(DamageType::Physical),
                alert: true,
                lockdown: false,
            },
        }
    }

    /// Components recovered by a critical disarm.
    #[must_use]
    pub const fn salvage(self) -> &'static [&'static str] {
        match self {
            Self::Tripwire => &["trigger-mechanism", "wire-bundle"],
            Self::PressurePlate => &["high-tension-spring", "pressure-sensor"],
            Self::Electrified => &["capacitor", "blighted-power-cell"],
            Self::LaserGrid => &["sensor-module", "focusing-crystal"],
            Self::JotunDefense => &["jotun-mechanism-fragment", "ancient-power-core"],
        }
    }
}

impl fmt::Display for TrapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A trap as encountered: either a catalog design or an unknown key, which
/// falls back to moderate DCs with no effect and no salvage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrapKind {
    Known(TrapType),
    Unrecognized(String),
}

impl TrapKind {
    /// Resolves a trap key against the catalog.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        TrapType::from_key(key).map_or_else(
            || Self::Unrecognized(key.trim().to_owned()),
            Self::Known,
        )
    }

    /// DC to spot the trap.
    #[must_use]
    pub const fn detection_dc(&self) -> i32 {
        match self {
            Self::Known(trap) => trap.detection_dc(),
            Self::Unrecognized(_) => FALLBACK_DC,
        }
    }

    /// Base DC to disarm the trap.
    #[must_use]
    pub const fn disarm_dc(&self) -> i32 {
        match self {
            Self::Known(trap) => trap.disarm_dc(),
            Self::Unrecognized(_) => FALLBACK_DC,
        }
    }

    /// What happens when the trap goes off.
    #[must_use]
    pub const fn effect(&self) -> TrapEffect {
        match self {
            Self::Known(trap) => trap.effect(),
            Self::Unrecognized(_) => TrapEffect::NONE,
        }
    }

    /// Components recovered by a critical disarm.
    #[must_use]
    pub fn salvage(&self) -> Vec<String> {
        match self {
            Self::Known(trap) => trap.salvage().iter().map(|&c| c.to_owned()).collect(),
            Self::Unrecognized(_) => Vec::new(),
        }
    }
}

impl fmt::Display for TrapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(trap) => trap.fmt(f),
            Self::Unrecognized(key) => write!(f, "unrecognized trap '{key}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Physical,
    Lightning,
}

/// A trap's trigger effect before damage is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapEffect {
    /// d10s of damage.
    pub damage_dice: u32,
    pub damage_type: Option<DamageType>,
    /// Nearby threats are alerted.
    pub alert: bool,
    /// Doors in the area seal.
    pub lockdown: bool,
}

impl TrapEffect {
    /// No damage, no alert, no lockdown.
    pub const NONE: Self = Self {
        damage_dice: 0,
        damage_type: None,
        alert: false,
        lockdown: false,
    };

    /// Sets the trap off, rolling its damage.
    pub fn trigger(&self, resolver: &DiceResolver, rng: &mut dyn DeterministicRng) -> TriggeredEffects {
        TriggeredEffects {
            damage: resolver.roll_damage(self.damage_dice, DieType::D10, rng),
            damage_type: self.damage_type,
            alert: self.alert,
            lockdown: self.lockdown,
        }
    }
}

/// Consequences of a trap that went off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredEffects {
    /// Damage dealt to the actor.
    pub damage: u32,
    pub damage_type: Option<DamageType>,
    pub alert: bool,
    pub lockdown: bool,
}

/// Tools brought to a disarm attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolQuality {
    BareHands,
    Improvised,
    Proper,
    Masterwork,
}

impl ToolQuality {
    /// Dice added to (or taken from) the disarm pool.
    #[must_use]
    pub const fn dice(self) -> i32 {
        match self {
            Self::BareHands => -2,
            Self::Improvised => 0,
            Self::Proper => 1,
            Self::Masterwork => 2,
        }
    }
}

/// What studying the trap revealed. Each tier needs one more net success:
/// one reveals the disarm DC, two the consequences, three a hint worth an
/// extra disarm die.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFindings {
    pub disarm_dc: Option<i32>,
    pub consequences: Option<TrapEffect>,
    pub hint: bool,
}

impl AnalysisFindings {
    /// Findings for an analysis roll with `net_successes` against `trap`.
    #[must_use]
    pub const fn from_net(net_successes: i32, trap: &TrapKind) -> Self {
        Self {
            disarm_dc: if net_successes >= 1 {
                Some(trap.disarm_dc())
            } else {
                None
            },
            consequences: if net_successes >= 2 {
                Some(trap.effect())
            } else {
                None
            },
            hint: net_successes >= 3,
        }
    }

    /// Disarm dice the findings grant.
    #[must_use]
    pub const fn bonus_dice(&self) -> i32 {
        if self.hint { HINT_BONUS_DICE } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runeforge_test_support::SequenceRng;

    #[test]
    fn test_catalog_dcs() {
        let dcs: Vec<(i32, i32)> = TrapType::ALL
            .iter()
            .map(|trap| (trap.detection_dc(), trap.disarm_dc()))
            .collect();

        assert_eq!(dcs, vec![(8, 8), (10, 12), (14, 16), (18, 20), (22, 24)]);
    }

    #[test]
    fn test_from_key_ignores_case_and_separators() {
        assert_eq!(TrapType::from_key("PressurePlate"), Some(TrapType::PressurePlate));
        assert_eq!(TrapType::from_key("laser_grid"), Some(TrapType::LaserGrid));
        assert_eq!(TrapType::from_key("Jotun Defense"), Some(TrapType::JotunDefense));
        assert_eq!(TrapType::from_key("bear trap"), None);
    }

    #[test]
    fn test_unrecognized_trap_falls_back_to_moderate_dcs() {
        let trap = TrapKind::from_key("spike pit");

        assert_eq!(trap, TrapKind::Unrecognized("spike pit".to_owned()));
        assert_eq!(trap.detection_dc(), 12);
        assert_eq!(trap.disarm_dc(), 12);
        assert_eq!(trap.effect(), TrapEffect::NONE);
        assert!(trap.salvage().is_empty());
    }

    #[test]
    fn test_trigger_rolls_damage_dice() {
        let mut rng = SequenceRng::new(vec![4, 9, 2]);

        let effects = TrapType::Electrified
            .effect()
            .trigger(&DiceResolver::default(), &mut rng);

        assert_eq!(effects.damage, 15);
        assert_eq!(effects.damage_type, Some(DamageType::Lightning));
        assert!(!effects.alert);
    }

    #[test]
    fn test_alarm_only_trap_rolls_nothing() {
        let mut rng = SequenceRng::new(vec![]);

        let effects = TrapType::LaserGrid
            .effect()
            .trigger(&DiceResolver::default(), &mut rng);

        assert_eq!(effects.damage, 0);
        assert!(effects.alert && effects.lockdown);
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn test_analysis_findings_are_tiered() {
        let trap = TrapKind::Known(TrapType::Electrified);

        let none = AnalysisFindings::from_net(0, &trap);
        let two = AnalysisFindings::from_net(2, &trap);
        let three = AnalysisFindings::from_net(3, &trap);

        assert_eq!(none, AnalysisFindings::default());
        assert_eq!(two.disarm_dc, Some(16));
        assert!(two.consequences.is_some());
        assert!(!two.hint);
        assert_eq!(three.bonus_dice(), 1);
    }
}
