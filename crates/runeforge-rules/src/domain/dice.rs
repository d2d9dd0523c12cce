//! Dice pools and the dice resolver.
//!
//! Success-counting applies to d10 pools: faces of 8 or more are successes
//! and a face of 1 is a botch. d6 pools are summed and never count successes.

use std::fmt;

use runeforge_core::error::DomainError;
use runeforge_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lowest d10 face that counts as a success.
pub const SUCCESS_FACE: u32 = 8;

/// The d10 face that counts as a botch.
pub const BOTCH_FACE: u32 = 1;

/// Net successes at or above which a roll is critical.
pub const CRITICAL_NET_SUCCESSES: i32 = 5;

/// Explosion dice allowed per roll before the chain is cut off.
pub const DEFAULT_MAX_EXPLOSIONS: u32 = 100;

/// Die face types understood by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    /// Six-sided die, used for flat damage.
    D6,
    /// Ten-sided die, used for success-counting pools.
    D10,
}

impl DieType {
    /// Number of faces on this die.
    #[must_use]
    pub const fn faces(self) -> u32 {
        match self {
            Self::D6 => 6,
            Self::D10 => 10,
        }
    }

    /// Whether faces of this die are tallied as successes and botches.
    #[must_use]
    pub const fn counts_successes(self) -> bool {
        matches!(self, Self::D10)
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.faces())
    }
}

/// N dice of one face type rolled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicePool {
    die: DieType,
    count: u32,
    exploding: bool,
}

impl DicePool {
    /// A pool of `count` dice of type `die`.
    #[must_use]
    pub const fn new(count: u32, die: DieType) -> Self {
        Self {
            die,
            count,
            exploding: false,
        }
    }

    /// A pool of `count` d10s.
    #[must_use]
    pub const fn d10(count: u32) -> Self {
        Self::new(count, DieType::D10)
    }

    /// A pool of `count` d6s.
    #[must_use]
    pub const fn d6(count: u32) -> Self {
        Self::new(count, DieType::D6)
    }

    /// Builds a pool from a signed count.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if `count` is negative.
    pub fn from_signed(count: i32, die: DieType) -> Result<Self, DomainError> {
        u32::try_from(count)
            .map(|count| Self::new(count, die))
            .map_err(|_| DomainError::InvalidArgument(format!("die count must be >= 0, got {count}")))
    }

    /// Returns the same pool with exploding dice.
    #[must_use]
    pub const fn exploding(self) -> Self {
        Self {
            exploding: true,
            ..self
        }
    }

    /// Returns the pool adjusted by `bonus` dice, never below `minimum`.
    #[must_use]
    pub fn with_bonus(self, bonus: i32, minimum: u32) -> Self {
        let adjusted = i64::from(self.count) + i64::from(bonus);
        let count = u32::try_from(adjusted.max(i64::from(minimum))).unwrap_or(u32::MAX);
        Self { count, ..self }
    }

    /// The die type.
    #[must_use]
    pub const fn die(&self) -> DieType {
        self.die
    }

    /// Number of dice in the pool.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Whether maximum faces trigger extra dice.
    #[must_use]
    pub const fn is_exploding(&self) -> bool {
        self.exploding
    }
}

impl fmt::Display for DicePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.die)?;
        if self.exploding {
            write!(f, "!")?;
        }
        Ok(())
    }
}

/// How many independent rolls to make before reducing to one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdvantageType {
    /// A single roll.
    #[default]
    None,
    /// Roll twice, keep the higher net successes.
    Advantage,
    /// Roll twice, keep the lower net successes.
    Disadvantage,
}

/// The outcome of rolling one pool once (after advantage reduction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    /// The pool that was rolled.
    pub pool: DicePool,
    /// Every face rolled, explosion dice included.
    pub faces: Vec<u32>,
    /// Faces at or above [`SUCCESS_FACE`] (d10 only).
    pub successes: u32,
    /// Faces equal to [`BOTCH_FACE`] (d10 only).
    pub botches: u32,
    /// `successes - botches`; may be negative.
    pub net_successes: i32,
    /// Sum of all faces.
    pub total: u32,
    /// Net successes reached [`CRITICAL_NET_SUCCESSES`].
    pub is_critical: bool,
    /// At least one botch with no positive net.
    pub is_fumble: bool,
}

impl RollResult {
    /// Tallies a set of faces rolled for `pool`.
    #[must_use]
    pub fn from_faces(pool: DicePool, faces: Vec<u32>) -> Self {
        let total = faces.iter().fold(0u32, |acc, face| acc.saturating_add(*face));
        let (successes, botches) = if pool.die().counts_successes() {
            (
                count_matching(&faces, |face| face >= SUCCESS_FACE),
                count_matching(&faces, |face| face == BOTCH_FACE),
            )
        } else {
            (0, 0)
        };
        let net_successes = saturating_i32(successes) - saturating_i32(botches);

        Self {
            pool,
            faces,
            successes,
            botches,
            net_successes,
            total,
            is_critical: net_successes >= CRITICAL_NET_SUCCESSES,
            is_fumble: botches > 0 && net_successes <= 0,
        }
    }
}

fn count_matching(faces: &[u32], predicate: impl Fn(u32) -> bool) -> u32 {
    let count = faces.iter().filter(|face| predicate(**face)).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Converts a count to `i32`, saturating at `i32::MAX`.
pub(crate) fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Stateless dice roller. The only configuration is the explosion safety cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceResolver {
    max_explosions: u32,
}

impl Default for DiceResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPLOSIONS)
    }
}

impl DiceResolver {
    /// A resolver that stops an explosion chain after `max_explosions` dice.
    #[must_use]
    pub const fn new(max_explosions: u32) -> Self {
        Self { max_explosions }
    }

    /// The explosion safety cap.
    #[must_use]
    pub const fn max_explosions(&self) -> u32 {
        self.max_explosions
    }

    /// Rolls `pool`, applying `advantage`. With advantage or disadvantage the
    /// pool is rolled twice and a tie keeps the first roll.
    pub fn roll(
        &self,
        pool: DicePool,
        advantage: AdvantageType,
        rng: &mut dyn DeterministicRng,
    ) -> RollResult {
        match advantage {
            AdvantageType::None => self.roll_once(pool, rng),
            AdvantageType::Advantage => {
                let first = self.roll_once(pool, rng);
                let second = self.roll_once(pool, rng);
                if second.net_successes > first.net_successes {
                    second
                } else {
                    first
                }
            }
            AdvantageType::Disadvantage => {
                let first = self.roll_once(pool, rng);
                let second = self.roll_once(pool, rng);
                if second.net_successes < first.net_successes {
                    second
                } else {
                    first
                }
            }
        }
    }

    /// Rolls `count` dice of type `die` and returns their sum.
    pub fn roll_damage(&self, count: u32, die: DieType, rng: &mut dyn DeterministicRng) -> u32 {
        self.roll_once(DicePool::new(count, die), rng).total
    }

    fn roll_once(&self, pool: DicePool, rng: &mut dyn DeterministicRng) -> RollResult {
        let max_face = pool.die().faces();
        let mut faces: Vec<u32> = (0..pool.count())
            .map(|_| rng.next_u32_range(1, max_face))
            .collect();

        if pool.is_exploding() {
            let mut pending = faces.iter().filter(|face| **face == max_face).count();
            let mut extra = 0u32;
            while pending > 0 && extra < self.max_explosions {
                let face = rng.next_u32_range(1, max_face);
                faces.push(face);
                extra += 1;
                pending -= 1;
                if face == max_face {
                    pending += 1;
                }
            }
            if pending > 0 {
                warn!(
                    pool = %pool,
                    max_explosions = self.max_explosions,
                    "explosion chain cut off at safety cap"
                );
            }
        }

        RollResult::from_faces(pool, faces)
    }
}

/// Rolls `pool` with the default resolver.
pub fn roll(pool: DicePool, advantage: AdvantageType, rng: &mut dyn DeterministicRng) -> RollResult {
    DiceResolver::default().roll(pool, advantage, rng)
}
