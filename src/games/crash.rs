//! Crash round state.
//!
//! The rocket either busts on a tick or keeps flying with a bigger
//! multiplier. Bust probability rises linearly with the tick count, so every
//! extra tick is strictly riskier than the last. An independent instant-bust
//! check runs once, before the first tick.

use crate::config::CrashCurve;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashRound {
    pub tick: u32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Busted,
    Flying { multiplier: f64 },
    /// The configured multiplier ceiling was reached; the round pays out.
    MaxedOut { multiplier: f64 },
}

impl Default for CrashRound {
    fn default() -> Self {
        Self::new()
    }
}

impl CrashRound {
    pub fn new() -> Self {
        Self {
            tick: 0,
            multiplier: 1.0,
        }
    }

    /// Run one tick: bust check, then multiplier growth.
    pub fn advance(&mut self, rng: &mut impl Rng, curve: &CrashCurve) -> TickOutcome {
        if self.tick == 0 && rng.gen::<f64>() < curve.instant_bust {
            return TickOutcome::Busted;
        }
        if rng.gen::<f64>() < bust_probability(self.tick, curve) {
            return TickOutcome::Busted;
        }
        self.multiplier += curve.step_base + self.tick as f64 * curve.step_slope;
        self.tick += 1;
        if self.multiplier >= curve.max_multiplier {
            TickOutcome::MaxedOut {
                multiplier: self.multiplier,
            }
        } else {
            TickOutcome::Flying {
                multiplier: self.multiplier,
            }
        }
    }
}

/// Bust probability for a given tick, before the instant-bust check.
pub fn bust_probability(tick: u32, curve: &CrashCurve) -> f64 {
    curve.base + tick as f64 * curve.slope
}

/// Total chips returned when cashing out at the current multiplier.
pub fn cash_out(stake: u64, multiplier: f64) -> u64 {
    (stake as f64 * multiplier).floor() as u64
}
