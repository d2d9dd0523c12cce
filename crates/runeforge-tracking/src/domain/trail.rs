//! Trail vocabulary: ages, terrain, conditions and recovery strategies.

use std::fmt;

use runeforge_rules::domain::escalation::ConditionModifier;
use serde::{Deserialize, Serialize};

/// Skill rolled for every tracking check.
pub const TRACKING_SKILL: &str = "wasteland-survival";

/// Survival rating needed to attempt a cold trail.
pub const COLD_TRAIL_MIN_RATING: u32 = 5;

/// DC of the target-count estimate.
pub const ESTIMATE_TARGET_COUNT_DC: i32 = 10;

/// DC of the trail-age estimate.
pub const ESTIMATE_TRAIL_AGE_DC: i32 = 12;

/// Farthest distance from which the tracker may close in.
pub const CLOSE_IN_MAX_FT: u32 = 500;

/// Distance at or under which the target is found without a roll.
pub const AUTO_FIND_FT: u32 = 50;

/// Distance at or under which the tighter close-in modifier applies.
pub const NEAR_FT: u32 = 100;

/// Dice granted for tracking in familiar territory.
pub const FAMILIAR_TERRITORY_DICE: i32 = 2;

/// How old the trail is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrailAge {
    Obvious,
    Fresh,
    Standard,
    Old,
    Obscured,
    Cold,
}

impl TrailAge {
    /// Base DC for following a trail of this age.
    #[must_use]
    pub const fn base_dc(self) -> i32 {
        match self {
            Self::Obvious => 8,
            Self::Fresh => 12,
            Self::Standard => 16,
            Self::Old => 20,
            Self::Obscured => 24,
            Self::Cold => 28,
        }
    }
}

impl fmt::Display for TrailAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Terrain the trail crosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    OpenWasteland,
    ModerateRuins,
    DenseRuins,
    Labyrinthine,
    GlitchedLabyrinth,
}

impl Terrain {
    /// Miles covered between pursuit checks.
    #[must_use]
    pub const fn check_interval_miles(self) -> f64 {
        match self {
            Self::OpenWasteland => 2.0,
            Self::ModerateRuins => 1.0,
            Self::DenseRuins => 0.5,
            Self::Labyrinthine | Self::GlitchedLabyrinth => 0.1,
        }
    }
}

/// Circumstances around the trail at the time tracking starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailConditions {
    pub blood_trail: bool,
    pub target_injured: bool,
    pub multiple_targets: bool,
    pub raining: bool,
    pub target_hiding: bool,
    pub hours_elapsed: u32,
}

impl TrailConditions {
    /// The standing DC modifiers these conditions produce.
    #[must_use]
    pub fn modifiers(&self) -> Vec<ConditionModifier> {
        let flags = [
            (self.blood_trail, "blood trail", -4),
            (self.target_injured, "target injured", -2),
            (self.multiple_targets, "multiple targets", -2),
            (self.raining, "rain", 4),
            (self.target_hiding, "target hiding", 2),
        ];
        let mut modifiers: Vec<ConditionModifier> = flags
            .into_iter()
            .filter(|(active, _, _)| *active)
            .map(|(_, source, delta)| ConditionModifier::new(source, delta))
            .collect();
        if self.hours_elapsed > 0 {
            modifiers.push(ConditionModifier::new(
                "hours elapsed",
                i32::try_from(self.hours_elapsed).unwrap_or(i32::MAX),
            ));
        }
        modifiers
    }
}

/// The tracker's kit and familiarity with the area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingGear {
    pub equipment_bonus_dice: i32,
    pub familiar_territory: bool,
}

impl TrackingGear {
    /// Extra dice added to every tracking roll.
    #[must_use]
    pub const fn bonus_dice(&self) -> i32 {
        if self.familiar_territory {
            self.equipment_bonus_dice + FAMILIAR_TERRITORY_DICE
        } else {
            self.equipment_bonus_dice
        }
    }
}

/// Ways to relocate a lost trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecoveryStrategy {
    Backtrack,
    SpiralSearch,
    ReturnToLastKnown,
}

impl RecoveryStrategy {
    /// DC added to the recovery check.
    #[must_use]
    pub const fn dc_modifier(self) -> i32 {
        match self {
            Self::Backtrack => 0,
            Self::SpiralSearch => 4,
            Self::ReturnToLastKnown => 8,
        }
    }

    /// Minutes the attempt takes.
    #[must_use]
    pub const fn time_cost_minutes(self) -> u32 {
        match self {
            Self::Backtrack => 10,
            Self::SpiralSearch => 30,
            Self::ReturnToLastKnown => 60,
        }
    }

    /// The attempt-specific modifier for the escalation policy.
    #[must_use]
    pub fn condition(self) -> ConditionModifier {
        ConditionModifier::new(format!("recovery: {self:?}"), self.dc_modifier())
    }
}

/// DC adjustment for closing in from `distance_ft`.
#[must_use]
pub fn closing_modifier(distance_ft: u32) -> ConditionModifier {
    if distance_ft <= NEAR_FT {
        ConditionModifier::new("within 100 ft", -6)
    } else {
        ConditionModifier::new("within 500 ft", -4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_age_base_dcs_climb_by_four() {
        let ages = [
            TrailAge::Obvious,
            TrailAge::Fresh,
            TrailAge::Standard,
            TrailAge::Old,
            TrailAge::Obscured,
            TrailAge::Cold,
        ];
        let dcs: Vec<i32> = ages.iter().map(|age| age.base_dc()).collect();

        assert_eq!(dcs, vec![8, 12, 16, 20, 24, 28]);
    }

    #[test]
    fn test_conditions_produce_signed_modifiers() {
        let conditions = TrailConditions {
            blood_trail: true,
            raining: true,
            hours_elapsed: 3,
            ..TrailConditions::default()
        };

        let total: i32 = conditions.modifiers().iter().map(|m| m.dc_delta).sum();

        assert_eq!(total, -4 + 4 + 3);
    }

    #[test]
    fn test_no_conditions_means_no_modifiers() {
        assert!(TrailConditions::default().modifiers().is_empty());
    }

    #[test]
    fn test_familiar_territory_adds_two_dice() {
        let gear = TrackingGear {
            equipment_bonus_dice: 1,
            familiar_territory: true,
        };

        assert_eq!(gear.bonus_dice(), 3);
    }

    #[test]
    fn test_closing_modifier_tightens_within_100_ft() {
        assert_eq!(closing_modifier(400).dc_delta, -4);
        assert_eq!(closing_modifier(100).dc_delta, -6);
    }

    #[test]
    fn test_terrain_intervals() {
        assert!((Terrain::OpenWasteland.check_interval_miles() - 2.0).abs() < f64::EPSILON);
        assert!((Terrain::GlitchedLabyrinth.check_interval_miles() - 0.1).abs() < f64::EPSILON);
    }
}
