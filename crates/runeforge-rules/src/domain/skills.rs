//! Skill sheets and skill checks.
//!
//! Character storage is external. Commands carry a [`SkillSheet`] snapshot of
//! the actor's ratings, and the set of legal skill ids comes from a
//! [`SkillCatalog`] (the rules configuration).

use std::collections::BTreeMap;

use runeforge_core::error::DomainError;
use runeforge_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

use super::check::CheckResult;
use super::dice::{AdvantageType, DicePool, DiceResolver};

/// Source of configured skill definitions.
pub trait SkillCatalog: Send + Sync {
    /// Whether `skill_id` is a configured skill.
    fn has_skill(&self, skill_id: &str) -> bool;
}

/// An actor's skill ratings (dice per skill). Unrated skills count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSheet {
    ratings: BTreeMap<String, u32>,
}

impl SkillSheet {
    /// An empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sheet with `skill_id` rated at `dice`.
    #[must_use]
    pub fn with(mut self, skill_id: impl Into<String>, dice: u32) -> Self {
        self.ratings.insert(skill_id.into(), dice);
        self
    }

    /// Dice rated in `skill_id`.
    #[must_use]
    pub fn rating(&self, skill_id: &str) -> u32 {
        self.ratings.get(skill_id).copied().unwrap_or(0)
    }

    /// The highest-rated of `skill_ids`, ties going to the earlier id.
    #[must_use]
    pub fn best_of<'a>(&self, skill_ids: &[&'a str]) -> Option<&'a str> {
        skill_ids
            .iter()
            .copied()
            .reduce(|best, candidate| {
                if self.rating(candidate) > self.rating(best) {
                    candidate
                } else {
                    best
                }
            })
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for SkillSheet {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            ratings: iter.into_iter().map(|(id, dice)| (id.into(), dice)).collect(),
        }
    }
}

/// Resolves checks for named skills.
#[derive(Clone, Copy)]
pub struct SkillCheck<'a> {
    catalog: &'a dyn SkillCatalog,
    resolver: DiceResolver,
}

impl std::fmt::Debug for SkillCheck<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillCheck")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl<'a> SkillCheck<'a> {
    /// Creates a skill check resolver over `catalog`.
    #[must_use]
    pub fn new(catalog: &'a dyn SkillCatalog, resolver: DiceResolver) -> Self {
        Self { catalog, resolver }
    }

    /// The dice resolver used for rolls.
    #[must_use]
    pub const fn resolver(&self) -> DiceResolver {
        self.resolver
    }

    /// The d10 pool `sheet` rolls for `skill_id` with `bonus_dice`: the rating
    /// plus bonus, at least one die.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the skill is not configured.
    pub fn pool_for(
        &self,
        sheet: &SkillSheet,
        skill_id: &str,
        bonus_dice: i32,
    ) -> Result<DicePool, DomainError> {
        if !self.catalog.has_skill(skill_id) {
            return Err(DomainError::Configuration(format!("unknown skill: {skill_id}")));
        }
        Ok(DicePool::d10(sheet.rating(skill_id)).with_bonus(bonus_dice, 1))
    }

    /// Rolls `skill_id` against `dc` as given. Floors belong to the caller's
    /// escalation policy.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Configuration` if the skill is not configured;
    /// nothing is rolled in that case.
    pub fn resolve(
        &self,
        sheet: &SkillSheet,
        skill_id: &str,
        bonus_dice: i32,
        dc: i32,
        advantage: AdvantageType,
        rng: &mut dyn DeterministicRng,
    ) -> Result<CheckResult, DomainError> {
        let pool = self.pool_for(sheet, skill_id, bonus_dice)?;
        Ok(self.resolver.check(pool, advantage, dc, rng))
    }
}
