//! Odds library: one module per game family.
//!
//! Everything in here is pure game logic. Stochastic functions take
//! `&mut impl Rng` so callers (and tests) control the randomness; money
//! only moves in the engine layer.

pub mod blackjack;
pub mod cards;
pub mod chicken;
pub mod coinflip;
pub mod crash;
pub mod dice;
pub mod hilo;
pub mod mines;
pub mod roulette;
pub mod scratch;
pub mod slots;
pub mod wheel;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Blackjack,
    Mines,
    Crash,
    Roulette,
    Dice,
    HigherLower,
    Chicken,
    Scratch,
    Wheel,
    Slots,
    CoinFlip,
}

impl GameType {
    pub const ALL: [GameType; 11] = [
        GameType::Blackjack,
        GameType::Mines,
        GameType::Crash,
        GameType::Roulette,
        GameType::Dice,
        GameType::HigherLower,
        GameType::Chicken,
        GameType::Scratch,
        GameType::Wheel,
        GameType::Slots,
        GameType::CoinFlip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Blackjack => "blackjack",
            GameType::Mines => "mines",
            GameType::Crash => "crash",
            GameType::Roulette => "roulette",
            GameType::Dice => "dice",
            GameType::HigherLower => "higher_lower",
            GameType::Chicken => "chicken",
            GameType::Scratch => "scratch",
            GameType::Wheel => "wheel",
            GameType::Slots => "slots",
            GameType::CoinFlip => "coin_flip",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-game session state. Carried inside a session from start to
/// settlement; serializable so snapshots can embed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameContext {
    Blackjack(blackjack::BlackjackTable),
    Mines(mines::MinesBoard),
    Crash(crash::CrashRound),
    Roulette(roulette::RouletteBoard),
    Dice,
    HigherLower(hilo::HiLoRound),
    Chicken(chicken::ChickenRun),
    Scratch(scratch::ScratchCard),
    Wheel,
    Slots(slots::MachineKind),
    CoinFlip,
}

impl GameContext {
    pub fn game_type(&self) -> GameType {
        match self {
            GameContext::Blackjack(_) => GameType::Blackjack,
            GameContext::Mines(_) => GameType::Mines,
            GameContext::Crash(_) => GameType::Crash,
            GameContext::Roulette(_) => GameType::Roulette,
            GameContext::Dice => GameType::Dice,
            GameContext::HigherLower(_) => GameType::HigherLower,
            GameContext::Chicken(_) => GameType::Chicken,
            GameContext::Scratch(_) => GameType::Scratch,
            GameContext::Wheel => GameType::Wheel,
            GameContext::Slots(_) => GameType::Slots,
            GameContext::CoinFlip => GameType::CoinFlip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_names_are_unique() {
        let mut names: Vec<&str> = GameType::ALL.iter().map(|g| g.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), GameType::ALL.len());
    }

    #[test]
    fn test_context_reports_its_game() {
        assert_eq!(GameContext::Dice.game_type(), GameType::Dice);
        assert_eq!(
            GameContext::Crash(crash::CrashRound::new()).game_type(),
            GameType::Crash
        );
        assert_eq!(
            GameContext::Scratch(scratch::ScratchCard::pending(scratch::TicketTier::Bronze))
                .game_type(),
            GameType::Scratch
        );
    }
}
