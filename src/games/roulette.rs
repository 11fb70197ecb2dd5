//! European roulette legs and settlement.
//!
//! One draw from the 37-slot wheel resolves every placed leg independently.
//! Winning legs return their stake plus `amount * winnings_multiplier`;
//! losing legs keep nothing. Zero loses every outside leg.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const RED_NUMBERS: [u8; 18] = [
    32, 19, 21, 25, 34, 27, 36, 30, 23, 5, 16, 1, 14, 9, 18, 7, 12, 3,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetColor {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeHalf {
    /// 1..=18
    Low,
    /// 19..=36
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouletteLeg {
    Straight { number: u8 },
    Color { color: BetColor },
    Parity { parity: Parity },
    Range { half: RangeHalf },
    /// 1 covers 1..=12, 2 covers 13..=24, 3 covers 25..=36.
    Dozen { index: u8 },
    /// Column 1 holds 1, 4, 7, ...; column 2 holds 2, 5, 8, ...
    Column { index: u8 },
}

impl RouletteLeg {
    pub fn is_valid(&self) -> bool {
        match self {
            RouletteLeg::Straight { number } => *number <= 36,
            RouletteLeg::Dozen { index } | RouletteLeg::Column { index } => {
                (1..=3).contains(index)
            }
            _ => true,
        }
    }

    pub fn wins(&self, drawn: u8) -> bool {
        match self {
            RouletteLeg::Straight { number } => *number == drawn,
            RouletteLeg::Color { color } => match color {
                BetColor::Red => RED_NUMBERS.contains(&drawn),
                BetColor::Black => drawn != 0 && !RED_NUMBERS.contains(&drawn),
            },
            RouletteLeg::Parity { parity } => {
                drawn != 0
                    && match parity {
                        Parity::Even => drawn % 2 == 0,
                        Parity::Odd => drawn % 2 == 1,
                    }
            }
            RouletteLeg::Range { half } => match half {
                RangeHalf::Low => (1..=18).contains(&drawn),
                RangeHalf::High => (19..=36).contains(&drawn),
            },
            RouletteLeg::Dozen { index } => {
                drawn != 0 && (drawn - 1) / 12 + 1 == *index
            }
            RouletteLeg::Column { index } => {
                drawn != 0 && (drawn - 1) % 3 + 1 == *index
            }
        }
    }

    /// Winnings per chip on top of the returned stake.
    pub fn winnings_multiplier(&self) -> u64 {
        match self {
            RouletteLeg::Straight { .. } => 35,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedLeg {
    pub leg: RouletteLeg,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouletteBoard {
    pub legs: Vec<PlacedLeg>,
}

impl RouletteBoard {
    pub fn total_staked(&self) -> u64 {
        self.legs.iter().map(|l| l.amount).sum()
    }
}

/// Uniform draw from the wheel.
pub fn spin(rng: &mut impl Rng) -> u8 {
    rng.gen_range(0..=36)
}

/// Total chips returned across all legs for one drawn number.
pub fn settle(legs: &[PlacedLeg], drawn: u8) -> u64 {
    legs.iter()
        .filter(|placed| placed.leg.wins(drawn))
        .map(|placed| placed.amount + placed.amount * placed.leg.winnings_multiplier())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_colors_partition_nonzero() {
        let red = RouletteLeg::Color { color: BetColor::Red };
        let black = RouletteLeg::Color { color: BetColor::Black };
        for n in 1..=36u8 {
            assert_ne!(red.wins(n), black.wins(n), "number {}", n);
        }
        assert!(!red.wins(0));
        assert!(!black.wins(0));
        assert_eq!(RED_NUMBERS.len(), 18);
    }

    #[test]
    fn test_outside_legs_lose_on_zero() {
        let legs = [
            RouletteLeg::Parity { parity: Parity::Even },
            RouletteLeg::Parity { parity: Parity::Odd },
            RouletteLeg::Range { half: RangeHalf::Low },
            RouletteLeg::Range { half: RangeHalf::High },
            RouletteLeg::Dozen { index: 1 },
            RouletteLeg::Column { index: 1 },
        ];
        for leg in legs {
            assert!(!leg.wins(0), "{:?} must lose on zero", leg);
        }
        assert!(RouletteLeg::Straight { number: 0 }.wins(0));
    }

    #[test]
    fn test_dozens_and_columns_partition() {
        for n in 1..=36u8 {
            let dozens: Vec<u8> = (1..=3)
                .filter(|&i| RouletteLeg::Dozen { index: i }.wins(n))
                .collect();
            assert_eq!(dozens.len(), 1, "number {}", n);
            let columns: Vec<u8> = (1..=3)
                .filter(|&i| RouletteLeg::Column { index: i }.wins(n))
                .collect();
            assert_eq!(columns.len(), 1, "number {}", n);
        }
        assert!(RouletteLeg::Column { index: 1 }.wins(4));
        assert!(RouletteLeg::Column { index: 2 }.wins(35));
        assert!(RouletteLeg::Dozen { index: 3 }.wins(25));
    }

    #[test]
    fn test_leg_validation() {
        assert!(RouletteLeg::Straight { number: 36 }.is_valid());
        assert!(!RouletteLeg::Straight { number: 37 }.is_valid());
        assert!(!RouletteLeg::Dozen { index: 0 }.is_valid());
        assert!(!RouletteLeg::Column { index: 4 }.is_valid());
    }

    #[test]
    fn test_settlement_sums_winning_legs() {
        let legs = vec![
            PlacedLeg {
                leg: RouletteLeg::Straight { number: 7 },
                amount: 100,
            },
            PlacedLeg {
                leg: RouletteLeg::Color { color: BetColor::Red },
                amount: 200,
            },
            PlacedLeg {
                leg: RouletteLeg::Parity { parity: Parity::Even },
                amount: 300,
            },
        ];
        // 7 is red and odd: straight pays 100 + 3500, color pays 200 + 400
        assert_eq!(settle(&legs, 7), 3600 + 600);
        // 8 is black and even: only the parity leg pays
        assert_eq!(settle(&legs, 8), 300 + 600);
        // 0 loses everything except a straight on zero
        assert_eq!(settle(&legs, 0), 0);
    }

    #[test]
    fn test_spin_stays_on_wheel() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..1000 {
            assert!(spin(&mut rng) <= 36);
        }
    }
}
