//! Higher-or-lower round.
//!
//! A first number is drawn uniformly from 1..=100; the player then guesses
//! whether the next draw lands higher, lower or equal. Each side's payout is
//! inversely proportional to its probability, edged and clamped; "equal"
//! carries a fixed long-shot payout.

use crate::config::HigherLowerCurve;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const NUMBER_MIN: u8 = 1;
pub const NUMBER_MAX: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiLoGuess {
    Higher,
    Lower,
    Equal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HiLoRound {
    /// Drawn at round start; `None` before the first draw.
    pub first: Option<u8>,
}

/// Payout multipliers offered for a given first number.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HiLoPayouts {
    pub higher: f64,
    pub lower: f64,
    pub equal: f64,
}

pub fn draw(rng: &mut impl Rng) -> u8 {
    rng.gen_range(NUMBER_MIN..=NUMBER_MAX)
}

/// Multipliers for each side given the first number. At the extremes one
/// side's probability hits zero; the clamp turns that into the cap.
pub fn payouts(first: u8, curve: &HigherLowerCurve) -> HiLoPayouts {
    let range = (NUMBER_MAX - NUMBER_MIN) as f64;
    let chance_higher = (NUMBER_MAX - first) as f64 / range;
    let chance_lower = (first - NUMBER_MIN) as f64 / range;
    let clamp = |chance: f64| -> f64 {
        (curve.edge / chance).min(curve.max_payout).max(curve.min_payout)
    };
    HiLoPayouts {
        higher: clamp(chance_higher),
        lower: clamp(chance_lower),
        equal: curve.equal_payout,
    }
}

/// Total chips returned for a guess once the second number is drawn.
pub fn payout(
    guess: HiLoGuess,
    first: u8,
    second: u8,
    stake: u64,
    curve: &HigherLowerCurve,
) -> u64 {
    let offered = payouts(first, curve);
    let won = match guess {
        HiLoGuess::Higher => second > first,
        HiLoGuess::Lower => second < first,
        HiLoGuess::Equal => second == first,
    };
    if !won {
        return 0;
    }
    let multiplier = match guess {
        HiLoGuess::Higher => offered.higher,
        HiLoGuess::Lower => offered.lower,
        HiLoGuess::Equal => offered.equal,
    };
    (stake as f64 * multiplier).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn curve() -> HigherLowerCurve {
        HigherLowerCurve::default()
    }

    #[test]
    fn test_midpoint_payouts_are_balanced() {
        let p = payouts(50, &curve());
        // chance of higher is 50/99, payout just under 2x
        assert!((p.higher - 0.95 * 99.0 / 50.0).abs() < 1e-9);
        assert!((p.lower - 0.95 * 99.0 / 49.0).abs() < 1e-9);
        assert_eq!(p.equal, 75.0);
    }

    #[test]
    fn test_extremes_hit_the_cap_and_floor() {
        // first = 100: nothing can be higher, the cap applies
        let p = payouts(100, &curve());
        assert_eq!(p.higher, 25.0);
        // lower is near-certain, the floor applies
        assert_eq!(p.lower, 1.05);

        let p = payouts(1, &curve());
        assert_eq!(p.lower, 25.0);
        assert_eq!(p.higher, 1.05);
    }

    #[test]
    fn test_payout_resolution() {
        let c = curve();
        // guess higher on 50, draw 80: wins at the offered rate
        let offered = payouts(50, &c).higher;
        assert_eq!(
            payout(HiLoGuess::Higher, 50, 80, 1000, &c),
            (1000.0 * offered).floor() as u64
        );
        assert_eq!(payout(HiLoGuess::Higher, 50, 20, 1000, &c), 0);
        assert_eq!(payout(HiLoGuess::Equal, 50, 50, 100, &c), 7500);
        assert_eq!(payout(HiLoGuess::Equal, 50, 51, 100, &c), 0);
    }

    #[test]
    fn test_draw_bounds() {
        let mut rng = StdRng::seed_from_u64(31);
        for _ in 0..1000 {
            let n = draw(&mut rng);
            assert!((NUMBER_MIN..=NUMBER_MAX).contains(&n));
        }
    }
}
