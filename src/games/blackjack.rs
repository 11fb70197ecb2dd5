//! Blackjack hand resolution.
//!
//! One player hand against the dealer. The dealer's hole card stays hidden
//! until the player stands; the dealer then draws while below the stand
//! threshold. A two-card 21 on the deal settles immediately at the natural
//! rate.

use super::cards::{hand_value, shuffled_deck, Card};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackjackTable {
    deck: Vec<Card>,
    pub player: Vec<Card>,
    pub dealer: Vec<Card>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandResult {
    Win,
    Lose,
    Push,
}

impl BlackjackTable {
    /// Empty table, used while the bet is still open.
    pub fn pending() -> Self {
        Self {
            deck: Vec::new(),
            player: Vec::new(),
            dealer: Vec::new(),
        }
    }

    /// Deal two cards each from a fresh shuffled deck.
    pub fn deal(rng: &mut impl Rng) -> Self {
        let mut deck = shuffled_deck(rng);
        let player = vec![deck.pop().unwrap_or(Card(0)), deck.pop().unwrap_or(Card(1))];
        let dealer = vec![deck.pop().unwrap_or(Card(2)), deck.pop().unwrap_or(Card(3))];
        Self { deck, player, dealer }
    }

    pub fn player_value(&self) -> u8 {
        hand_value(&self.player)
    }

    pub fn dealer_value(&self) -> u8 {
        hand_value(&self.dealer)
    }

    /// Two-card 21 straight off the deal.
    pub fn is_natural(&self) -> bool {
        self.player.len() == 2 && self.player_value() == 21
    }

    /// Draw one card for the player. `None` means the deck ran dry, which a
    /// 52-card single-hand deck cannot reach through legal play.
    pub fn hit(&mut self) -> Option<Card> {
        let card = self.deck.pop()?;
        self.player.push(card);
        Some(card)
    }

    pub fn player_busted(&self) -> bool {
        self.player_value() > 21
    }

    /// Dealer draws while below `stands_on`, then the hands are compared.
    pub fn stand(&mut self, stands_on: u8) -> HandResult {
        while self.dealer_value() < stands_on {
            match self.deck.pop() {
                Some(card) => self.dealer.push(card),
                None => break,
            }
        }
        let player = self.player_value();
        let dealer = self.dealer_value();
        if dealer > 21 || player > dealer {
            HandResult::Win
        } else if dealer > player {
            HandResult::Lose
        } else {
            HandResult::Push
        }
    }
}

/// Total chips returned for a settled hand.
pub fn payout(result: HandResult, stake: u64) -> u64 {
    match result {
        HandResult::Win => stake * 2,
        HandResult::Push => stake,
        HandResult::Lose => 0,
    }
}

/// Total chips returned for a natural: the stake plus floored winnings.
pub fn natural_payout(stake: u64, natural_factor: f64) -> u64 {
    stake + (stake as f64 * natural_factor).floor() as u64
}
