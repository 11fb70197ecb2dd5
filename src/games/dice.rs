//! Sum-of-two-dice bet.
//!
//! The player calls under, over or exactly seven before one roll of two d6.
//! Seven pays highest because it is the least likely call to land.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiceCall {
    Under,
    Seven,
    Over,
}

impl DiceCall {
    /// Total-return multiplier applied to the stake on a win.
    pub fn payout_multiplier(&self) -> u64 {
        match self {
            DiceCall::Under | DiceCall::Over => 2,
            DiceCall::Seven => 5,
        }
    }
}

/// Roll two d6.
pub fn roll(rng: &mut impl Rng) -> (u8, u8) {
    (rng.gen_range(1..=6), rng.gen_range(1..=6))
}

/// Which call the rolled sum lands on.
pub fn outcome_of(sum: u8) -> DiceCall {
    match sum {
        s if s < 7 => DiceCall::Under,
        7 => DiceCall::Seven,
        _ => DiceCall::Over,
    }
}

/// Total chips returned for a call against a rolled sum.
pub fn payout(call: DiceCall, sum: u8, stake: u64) -> u64 {
    if outcome_of(sum) == call {
        stake * call.payout_multiplier()
    } else {
        0
    }
}
