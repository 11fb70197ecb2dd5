//! Card and deck primitives shared by the card games.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One card out of a standard 52-card deck, encoded as `0..52`.
/// Rank is `index % 13` (0 is the ace), suit is `index / 13`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card(pub u8);

const RANKS: [&str; 13] = [
    "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];
const SUITS: [char; 4] = ['S', 'H', 'D', 'C'];

impl Card {
    pub fn rank_index(&self) -> u8 {
        self.0 % 13
    }

    /// Blackjack value: ace counts 11 here, demotion to 1 happens at the
    /// hand level.
    pub fn value(&self) -> u8 {
        match self.rank_index() {
            0 => 11,
            r if r >= 9 => 10,
            r => r + 1,
        }
    }

    pub fn is_ace(&self) -> bool {
        self.rank_index() == 0
    }

    /// Compact code like `AS` or `10H`, for snapshots.
    pub fn code(&self) -> String {
        format!(
            "{}{}",
            RANKS[self.rank_index() as usize],
            SUITS[(self.0 / 13) as usize]
        )
    }
}

/// A freshly shuffled 52-card deck. Draw by popping.
pub fn shuffled_deck(rng: &mut impl Rng) -> Vec<Card> {
    let mut deck: Vec<Card> = (0..52).map(Card).collect();
    deck.shuffle(rng);
    deck
}

/// Best blackjack value of a hand: aces start at 11 and are demoted to 1
/// one at a time while the total is over 21.
pub fn hand_value(cards: &[Card]) -> u8 {
    let mut total: u8 = cards.iter().map(Card::value).sum();
    let mut soft_aces = cards.iter().filter(|c| c.is_ace()).count();
    while total > 21 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    total
}
