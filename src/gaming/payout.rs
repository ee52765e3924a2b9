//! Cash-out multiplier model
//!
//! The multiplier after `k` gems is the reciprocal of the hypergeometric
//! probability of surviving `k` reveals, scaled by the house factor
//! `h = 1 - house_edge`:
//!
//! ```text
//! survival(k) = Π_{i=0}^{k-1} (25 - mines - i) / (25 - i)
//! mult(k)     = h / survival(k)        for k >= 1
//! mult(0)     = 1.0
//! ```
//!
//! With at least 3 mines `h / survival(1)` is already above 1.0, so the
//! sequence is strictly increasing from the first gem.

use serde::{Deserialize, Serialize};

use super::board::{validate_mine_count, TILE_COUNT};
use crate::error::{Error, Result};

/// Default house edge (h = 0.97)
pub const DEFAULT_HOUSE_EDGE: f64 = 0.03;

/// Absorbs float noise before flooring so exact products are not shaved by one
const FLOOR_EPSILON: f64 = 1e-9;

/// Pure payout calculator, fixed for the lifetime of an engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutModel {
    house_factor: f64,
}

impl Default for PayoutModel {
    fn default() -> Self {
        Self {
            house_factor: 1.0 - DEFAULT_HOUSE_EDGE,
        }
    }
}

impl PayoutModel {
    /// Create a model for the given house edge in `[0, 0.1)`
    pub fn new(house_edge: f64) -> Result<Self> {
        if !(0.0..0.1).contains(&house_edge) {
            return Err(Error::InvalidConfiguration(format!(
                "house edge must be in [0, 0.1), got {}",
                house_edge
            )));
        }
        Ok(Self {
            house_factor: 1.0 - house_edge,
        })
    }

    /// The `h` applied on top of the fair multiplier
    pub fn house_factor(&self) -> f64 {
        self.house_factor
    }

    /// Probability of revealing `gems` tiles in a row without hitting a bomb
    pub fn survival_probability(mine_count: u8, gems: u8) -> f64 {
        let total = TILE_COUNT as f64;
        let safe = total - mine_count as f64;
        (0..gems)
            .map(|i| (safe - i as f64) / (total - i as f64))
            .product()
    }

    /// Multiplier after `gems_revealed` safe reveals on a board with `mine_count` bombs
    ///
    /// `gems_revealed` is clamped to the number of safe tiles.
    pub fn multiplier_after(&self, mine_count: u8, gems_revealed: u8) -> f64 {
        let safe = (TILE_COUNT as u8).saturating_sub(mine_count);
        let gems = gems_revealed.min(safe);
        if gems == 0 {
            return 1.0;
        }
        self.house_factor / Self::survival_probability(mine_count, gems)
    }

    /// `floor(bet * multiplier)`
    pub fn payout(bet: u64, multiplier: f64) -> u64 {
        (bet as f64 * multiplier + FLOOR_EPSILON).floor() as u64
    }

    /// Full multiplier ladder for a mine count, from 1 gem to a cleared board
    pub fn table(&self, mine_count: u8) -> Result<Vec<(u8, f64)>> {
        validate_mine_count(mine_count)?;
        let safe = TILE_COUNT as u8 - mine_count;
        Ok((1..=safe)
            .map(|gems| (gems, self.multiplier_after(mine_count, gems)))
            .collect())
    }
}
