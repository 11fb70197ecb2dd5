//! Coin flip: call a side, double or nothing.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSide {
    Heads,
    Tails,
}

pub fn flip(rng: &mut impl Rng) -> CoinSide {
    if rng.gen::<bool>() {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

/// Total chips returned: 2x on a correct call.
pub fn payout(call: CoinSide, landed: CoinSide, stake: u64) -> u64 {
    if call == landed {
        stake * 2
    } else {
        0
    }
}
