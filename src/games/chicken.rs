//! Chicken ladder game.
//!
//! Ten lanes, each with an independent success chance and a multiplier that
//! only goes up. Failing any crossing forfeits the stake; cashing out locks
//! in the multiplier of the last cleared lane. Clearing the final lane
//! settles automatically at the top multiplier.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const TOTAL_LANES: u8 = 10;

/// (success chance, multiplier once cleared) per lane.
pub const LANES: [(f64, f64); TOTAL_LANES as usize] = [
    (0.95, 1.1),
    (0.90, 1.3),
    (0.85, 1.6),
    (0.75, 2.0),
    (0.65, 2.5),
    (0.55, 3.5),
    (0.45, 5.0),
    (0.35, 8.0),
    (0.25, 15.0),
    (0.15, 50.0),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChickenRun {
    /// Lanes cleared so far.
    pub lane: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrossOutcome {
    Survived { lane: u8, multiplier: f64 },
    Hit,
    Finished { multiplier: f64 },
}

impl ChickenRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiplier locked in by cashing out right now.
    pub fn current_multiplier(&self) -> f64 {
        multiplier(self.lane)
    }

    /// Attempt the next lane.
    pub fn cross(&mut self, rng: &mut impl Rng) -> CrossOutcome {
        let (chance, _) = LANES[self.lane as usize];
        if rng.gen::<f64>() >= chance {
            return CrossOutcome::Hit;
        }
        self.lane += 1;
        let m = self.current_multiplier();
        if self.lane == TOTAL_LANES {
            CrossOutcome::Finished { multiplier: m }
        } else {
            CrossOutcome::Survived {
                lane: self.lane,
                multiplier: m,
            }
        }
    }
}

/// Multiplier after clearing `lane` lanes; 1.0 before the first crossing.
pub fn multiplier(lane: u8) -> f64 {
    if lane == 0 {
        1.0
    } else {
        LANES[lane as usize - 1].1
    }
}

/// Total chips returned on cash-out.
pub fn cash_out(stake: u64, multiplier: f64) -> u64 {
    (stake as f64 * multiplier).floor() as u64
}
