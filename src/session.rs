//! Session registry and the per-game state machine.
//!
//! One live session per `(player, surface)`. Lifecycle:
//! `AwaitingBet -> Playing -> Settled`, with `Cancelled` reachable from any
//! non-terminal state. Terminal sessions are removed from the registry;
//! playing again means a fresh session.
//!
//! Serialization: every transition runs under the session's map entry guard
//! and re-checks the state it expects to leave, so two racing intents
//! resolve to one winner and one `InvalidActionForState`.

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::fairness::SeedCommitment;
use crate::games::{
    blackjack, chicken, coinflip, crash, dice, hilo, mines, roulette, scratch, slots, wheel,
    GameContext, GameType,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub player: String,
    pub surface: String,
}

impl SessionKey {
    pub fn new(player: impl Into<String>, surface: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            surface: surface.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingBet,
    Playing,
    Settled,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Settled | SessionState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::AwaitingBet => "awaiting_bet",
            SessionState::Playing => "playing",
            SessionState::Settled => "settled",
            SessionState::Cancelled => "cancelled",
        }
    }
}

/// Everything a player can ask of a running session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum PlayerIntent {
    /// Replace the stake while still awaiting the deal.
    SetBet { amount: u64 },
    /// Mines only: choose the grid before arming it.
    Configure { side: u8, mines: u8 },
    /// Roulette only: add a leg to the board.
    PlaceLeg { leg: roulette::RouletteLeg, amount: u64 },
    /// Commit the bet: deal, arm, launch, spin or draw.
    Begin,
    Hit,
    Stand,
    Reveal { cell: u8 },
    /// Crash tick or chicken lane crossing.
    Advance,
    Guess { guess: hilo::HiLoGuess },
    Choose { call: dice::DiceCall },
    Call { side: coinflip::CoinSide },
    CashOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleReason {
    Won,
    Lost,
    Push,
    CashedOut,
    Cancelled,
    Expired,
}

/// Game-specific terminal facts, for the rendering layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum OutcomeDetail {
    Blackjack {
        player: Vec<String>,
        dealer: Vec<String>,
        player_value: u8,
        dealer_value: u8,
        natural: bool,
    },
    Mines {
        gems: u8,
        multiplier: f64,
        hit_mine: bool,
    },
    Crash {
        multiplier: f64,
        busted: bool,
    },
    Roulette {
        drawn: u8,
    },
    Dice {
        dice: (u8, u8),
        sum: u8,
    },
    HigherLower {
        first: u8,
        second: u8,
    },
    Chicken {
        lanes_cleared: u8,
        multiplier: f64,
    },
    Scratch {
        grid: Vec<String>,
    },
    Wheel {
        segment: String,
        value: u64,
    },
    Slots {
        grid: Vec<Vec<String>>,
        jackpot: bool,
    },
    CoinFlip {
        landed: coinflip::CoinSide,
    },
    /// Forfeiture with no game outcome to report.
    Refund,
}

/// Result of a terminal transition, before money moves.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub payout: u64,
    pub reason: SettleReason,
    pub detail: OutcomeDetail,
}

/// In-flight, rendering-free snapshot of a session's game state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameView {
    Blackjack {
        player: Vec<String>,
        player_value: u8,
        /// Dealer's visible card; the hole card stays hidden until stand.
        dealer_up: Option<String>,
    },
    Mines {
        side: u8,
        mines: u8,
        revealed_mask: u32,
        gems: u8,
        multiplier: f64,
    },
    Crash {
        tick: u32,
        multiplier: f64,
        potential_payout: u64,
    },
    Roulette {
        legs: Vec<roulette::PlacedLeg>,
        total_staked: u64,
    },
    Dice,
    HigherLower {
        first: Option<u8>,
        offered: Option<hilo::HiLoPayouts>,
    },
    Chicken {
        lanes_cleared: u8,
        multiplier: f64,
        next_chance: Option<f64>,
    },
    Scratch {
        /// Revealed symbol name per cell, `None` while covered.
        cells: Vec<Option<String>>,
    },
    Wheel,
    Slots {
        machine: String,
    },
    CoinFlip,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub player: String,
    pub surface: String,
    pub game: GameType,
    pub state: SessionState,
    pub stake: u64,
    /// Published fairness commitment; the seed is revealed at settlement.
    pub seed_commitment: String,
    pub view: GameView,
    pub actions: Vec<&'static str>,
}

#[derive(Debug)]
pub struct Session {
    pub game: GameType,
    pub state: SessionState,
    /// Chips already reserved from the player. For roulette this is the
    /// running sum of placed legs.
    pub stake: u64,
    pub context: GameContext,
    pub seed: SeedCommitment,
    pub created_at: DateTime<Utc>,
    pub last_activity: Instant,
}

impl Session {
    pub fn new(stake: u64, context: GameContext, seed: SeedCommitment) -> Self {
        Self {
            game: context.game_type(),
            state: SessionState::AwaitingBet,
            stake,
            context,
            seed,
            created_at: Utc::now(),
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_idle(&self, config: &EngineConfig) -> bool {
        self.last_activity.elapsed().as_secs() >= config.timeouts.idle_secs(self.game)
    }

    fn wrong_state<T>(&self) -> EngineResult<T> {
        Err(EngineError::InvalidActionForState(
            self.state.as_str().to_string(),
        ))
    }

    /// Apply one intent. `SetBet` and `PlaceLeg` are handled by the engine
    /// because they move money; everything else lands here. A returned
    /// settlement means the session just reached a terminal state.
    pub fn step(
        &mut self,
        intent: &PlayerIntent,
        rng: &mut impl Rng,
        config: &EngineConfig,
    ) -> EngineResult<Option<Settlement>> {
        if self.state.is_terminal() {
            return self.wrong_state();
        }
        self.touch();
        match intent {
            PlayerIntent::Begin => self.begin(rng, config),
            PlayerIntent::Configure { side, mines } => self.configure(*side, *mines),
            PlayerIntent::Hit => self.hit(),
            PlayerIntent::Stand => self.stand(config),
            PlayerIntent::Reveal { cell } => self.reveal(*cell, config),
            PlayerIntent::Advance => self.advance(rng, config),
            PlayerIntent::Guess { guess } => self.guess(*guess, rng, config),
            PlayerIntent::Choose { call } => self.choose(*call, rng),
            PlayerIntent::Call { side } => self.call(*side, rng),
            PlayerIntent::CashOut => self.cash_out(config),
            PlayerIntent::SetBet { .. } | PlayerIntent::PlaceLeg { .. } => {
                Err(EngineError::StorageFailure(
                    "bet adjustment routed past the engine".into(),
                ))
            }
        }
    }

    fn settle(&mut self, settlement: Settlement) -> EngineResult<Option<Settlement>> {
        self.state = SessionState::Settled;
        debug!(
            game = %self.game,
            stake = self.stake,
            payout = settlement.payout,
            reason = ?settlement.reason,
            house_delta = self.stake as i64 - settlement.payout as i64,
            "session settled"
        );
        Ok(Some(settlement))
    }

    fn begin(
        &mut self,
        rng: &mut impl Rng,
        config: &EngineConfig,
    ) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::AwaitingBet {
            return self.wrong_state();
        }
        let stake = self.stake;
        match &mut self.context {
            GameContext::Blackjack(table) => {
                *table = blackjack::BlackjackTable::deal(rng);
                if table.is_natural() {
                    let detail = OutcomeDetail::Blackjack {
                        player: table.player.iter().map(|c| c.code()).collect(),
                        dealer: table.dealer.iter().map(|c| c.code()).collect(),
                        player_value: 21,
                        dealer_value: table.dealer_value(),
                        natural: true,
                    };
                    return self.settle(Settlement {
                        payout: blackjack::natural_payout(stake, config.house.blackjack_natural),
                        reason: SettleReason::Won,
                        detail,
                    });
                }
                self.state = SessionState::Playing;
                Ok(None)
            }
            GameContext::Mines(board) => {
                board.arm(rng);
                self.state = SessionState::Playing;
                Ok(None)
            }
            GameContext::Crash(_) => {
                self.state = SessionState::Playing;
                Ok(None)
            }
            GameContext::Chicken(_) => {
                self.state = SessionState::Playing;
                Ok(None)
            }
            GameContext::Roulette(board) => {
                if board.legs.is_empty() {
                    return Err(EngineError::InvalidActionForState(
                        "awaiting_bet without placed legs".into(),
                    ));
                }
                let drawn = roulette::spin(rng);
                let payout = roulette::settle(&board.legs, drawn);
                let reason = if payout > 0 {
                    SettleReason::Won
                } else {
                    SettleReason::Lost
                };
                self.settle(Settlement {
                    payout,
                    reason,
                    detail: OutcomeDetail::Roulette { drawn },
                })
            }
            GameContext::HigherLower(round) => {
                round.first = Some(hilo::draw(rng));
                self.state = SessionState::Playing;
                Ok(None)
            }
            GameContext::Scratch(card) => {
                card.deal(rng);
                self.state = SessionState::Playing;
                Ok(None)
            }
            GameContext::Wheel => {
                let index = wheel::spin(rng);
                let segment = wheel::SEGMENTS[index];
                let reason = if segment.value > 0 {
                    SettleReason::Won
                } else {
                    SettleReason::Lost
                };
                self.settle(Settlement {
                    payout: segment.value,
                    reason,
                    detail: OutcomeDetail::Wheel {
                        segment: segment.label.to_string(),
                        value: segment.value,
                    },
                })
            }
            GameContext::Slots(kind) => {
                let machine = kind.machine();
                let result = slots::spin(*kind, rng);
                let grid = result
                    .grid
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|&s| machine.symbols[s as usize].to_string())
                            .collect()
                    })
                    .collect();
                let reason = if result.winnings > 0 {
                    SettleReason::Won
                } else {
                    SettleReason::Lost
                };
                self.settle(Settlement {
                    payout: result.winnings,
                    reason,
                    detail: OutcomeDetail::Slots {
                        grid,
                        jackpot: result.jackpot,
                    },
                })
            }
            // one-shot call games resolve through their call intent
            GameContext::Dice | GameContext::CoinFlip => self.wrong_state(),
        }
    }

    fn configure(&mut self, side: u8, mine_count: u8) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::AwaitingBet {
            return self.wrong_state();
        }
        match &mut self.context {
            GameContext::Mines(board) => {
                *board = mines::MinesBoard::configured(side, mine_count)
                    .ok_or(EngineError::OutOfRange { min: 1, max: 15 })?;
                Ok(None)
            }
            _ => self.wrong_state(),
        }
    }

    fn hit(&mut self) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::Playing {
            return self.wrong_state();
        }
        match &mut self.context {
            GameContext::Blackjack(table) => {
                table
                    .hit()
                    .ok_or_else(|| EngineError::StorageFailure("deck exhausted".into()))?;
                if table.player_busted() {
                    let detail = OutcomeDetail::Blackjack {
                        player: table.player.iter().map(|c| c.code()).collect(),
                        dealer: table.dealer.iter().map(|c| c.code()).collect(),
                        player_value: table.player_value(),
                        dealer_value: table.dealer_value(),
                        natural: false,
                    };
                    return self.settle(Settlement {
                        payout: 0,
                        reason: SettleReason::Lost,
                        detail,
                    });
                }
                Ok(None)
            }
            _ => self.wrong_state(),
        }
    }

    fn stand(&mut self, config: &EngineConfig) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::Playing {
            return self.wrong_state();
        }
        let stake = self.stake;
        match &mut self.context {
            GameContext::Blackjack(table) => {
                let result = table.stand(config.house.dealer_stands_on);
                let reason = match result {
                    blackjack::HandResult::Win => SettleReason::Won,
                    blackjack::HandResult::Lose => SettleReason::Lost,
                    blackjack::HandResult::Push => SettleReason::Push,
                };
                let detail = OutcomeDetail::Blackjack {
                    player: table.player.iter().map(|c| c.code()).collect(),
                    dealer: table.dealer.iter().map(|c| c.code()).collect(),
                    player_value: table.player_value(),
                    dealer_value: table.dealer_value(),
                    natural: false,
                };
                self.settle(Settlement {
                    payout: blackjack::payout(result, stake),
                    reason,
                    detail,
                })
            }
            _ => self.wrong_state(),
        }
    }

    fn reveal(&mut self, cell: u8, config: &EngineConfig) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::Playing {
            return self.wrong_state();
        }
        let stake = self.stake;
        match &mut self.context {
            GameContext::Mines(board) => {
                let cells = board.cells();
                match board.reveal(cell) {
                    None => Err(EngineError::OutOfRange {
                        min: 0,
                        max: cells as u64 - 1,
                    }),
                    Some(mines::RevealOutcome::AlreadyRevealed) => Err(
                        EngineError::InvalidActionForState("cell already revealed".into()),
                    ),
                    Some(mines::RevealOutcome::Mine) => {
                        let detail = OutcomeDetail::Mines {
                            gems: board.gems,
                            multiplier: 0.0,
                            hit_mine: true,
                        };
                        self.settle(Settlement {
                            payout: 0,
                            reason: SettleReason::Lost,
                            detail,
                        })
                    }
                    Some(mines::RevealOutcome::Gem { gems }) => {
                        let multiplier =
                            board.current_multiplier(config.house.mines_house_edge);
                        if board.cleared() {
                            // nothing left to reveal, lock in the board
                            let detail = OutcomeDetail::Mines {
                                gems,
                                multiplier,
                                hit_mine: false,
                            };
                            return self.settle(Settlement {
                                payout: mines::cash_out(stake, multiplier),
                                reason: SettleReason::CashedOut,
                                detail,
                            });
                        }
                        Ok(None)
                    }
                }
            }
            GameContext::Scratch(card) => {
                let table = card.tier.table();
                match card.reveal(cell, stake) {
                    None => Err(EngineError::OutOfRange {
                        min: 0,
                        max: scratch::GRID_CELLS as u64 - 1,
                    }),
                    Some(scratch::RevealOutcome::AlreadyRevealed) => Err(
                        EngineError::InvalidActionForState("cell already revealed".into()),
                    ),
                    Some(scratch::RevealOutcome::Revealed { .. }) => Ok(None),
                    Some(scratch::RevealOutcome::Won { payout, .. }) => {
                        let grid = card
                            .grid
                            .iter()
                            .map(|&s| table.symbols[s as usize].name.to_string())
                            .collect();
                        self.settle(Settlement {
                            payout,
                            reason: SettleReason::Won,
                            detail: OutcomeDetail::Scratch { grid },
                        })
                    }
                    Some(scratch::RevealOutcome::Exhausted) => {
                        let grid = card
                            .grid
                            .iter()
                            .map(|&s| table.symbols[s as usize].name.to_string())
                            .collect();
                        self.settle(Settlement {
                            payout: 0,
                            reason: SettleReason::Lost,
                            detail: OutcomeDetail::Scratch { grid },
                        })
                    }
                }
            }
            _ => self.wrong_state(),
        }
    }

    fn advance(
        &mut self,
        rng: &mut impl Rng,
        config: &EngineConfig,
    ) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::Playing {
            return self.wrong_state();
        }
        let stake = self.stake;
        match &mut self.context {
            GameContext::Crash(round) => match round.advance(rng, &config.house.crash) {
                crash::TickOutcome::Busted => {
                    let detail = OutcomeDetail::Crash {
                        multiplier: round.multiplier,
                        busted: true,
                    };
                    self.settle(Settlement {
                        payout: 0,
                        reason: SettleReason::Lost,
                        detail,
                    })
                }
                crash::TickOutcome::MaxedOut { multiplier } => {
                    let detail = OutcomeDetail::Crash {
                        multiplier,
                        busted: false,
                    };
                    self.settle(Settlement {
                        payout: crash::cash_out(stake, multiplier),
                        reason: SettleReason::CashedOut,
                        detail,
                    })
                }
                crash::TickOutcome::Flying { .. } => Ok(None),
            },
            GameContext::Chicken(run) => match run.cross(rng) {
                chicken::CrossOutcome::Hit => {
                    let detail = OutcomeDetail::Chicken {
                        lanes_cleared: run.lane,
                        multiplier: 0.0,
                    };
                    self.settle(Settlement {
                        payout: 0,
                        reason: SettleReason::Lost,
                        detail,
                    })
                }
                chicken::CrossOutcome::Finished { multiplier } => {
                    let detail = OutcomeDetail::Chicken {
                        lanes_cleared: run.lane,
                        multiplier,
                    };
                    self.settle(Settlement {
                        payout: chicken::cash_out(stake, multiplier),
                        reason: SettleReason::CashedOut,
                        detail,
                    })
                }
                chicken::CrossOutcome::Survived { .. } => Ok(None),
            },
            _ => self.wrong_state(),
        }
    }

    fn guess(
        &mut self,
        guess: hilo::HiLoGuess,
        rng: &mut impl Rng,
        config: &EngineConfig,
    ) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::Playing {
            return self.wrong_state();
        }
        let stake = self.stake;
        match &mut self.context {
            GameContext::HigherLower(round) => {
                let first = round.first.ok_or_else(|| {
                    EngineError::StorageFailure("higher-lower round missing first draw".into())
                })?;
                let second = hilo::draw(rng);
                let payout =
                    hilo::payout(guess, first, second, stake, &config.house.higher_lower);
                let reason = if payout > 0 {
                    SettleReason::Won
                } else {
                    SettleReason::Lost
                };
                self.settle(Settlement {
                    payout,
                    reason,
                    detail: OutcomeDetail::HigherLower { first, second },
                })
            }
            _ => self.wrong_state(),
        }
    }

    fn choose(
        &mut self,
        call: dice::DiceCall,
        rng: &mut impl Rng,
    ) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::AwaitingBet {
            return self.wrong_state();
        }
        let stake = self.stake;
        match &self.context {
            GameContext::Dice => {
                let (die1, die2) = dice::roll(rng);
                let sum = die1 + die2;
                let payout = dice::payout(call, sum, stake);
                let reason = if payout > 0 {
                    SettleReason::Won
                } else {
                    SettleReason::Lost
                };
                self.settle(Settlement {
                    payout,
                    reason,
                    detail: OutcomeDetail::Dice {
                        dice: (die1, die2),
                        sum,
                    },
                })
            }
            _ => self.wrong_state(),
        }
    }

    fn call(
        &mut self,
        side: coinflip::CoinSide,
        rng: &mut impl Rng,
    ) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::AwaitingBet {
            return self.wrong_state();
        }
        let stake = self.stake;
        match &self.context {
            GameContext::CoinFlip => {
                let landed = coinflip::flip(rng);
                let payout = coinflip::payout(side, landed, stake);
                let reason = if payout > 0 {
                    SettleReason::Won
                } else {
                    SettleReason::Lost
                };
                self.settle(Settlement {
                    payout,
                    reason,
                    detail: OutcomeDetail::CoinFlip { landed },
                })
            }
            _ => self.wrong_state(),
        }
    }

    fn cash_out(&mut self, config: &EngineConfig) -> EngineResult<Option<Settlement>> {
        if self.state != SessionState::Playing {
            return self.wrong_state();
        }
        let stake = self.stake;
        match &self.context {
            GameContext::Mines(board) => {
                let multiplier = board.current_multiplier(config.house.mines_house_edge);
                let detail = OutcomeDetail::Mines {
                    gems: board.gems,
                    multiplier,
                    hit_mine: false,
                };
                self.settle(Settlement {
                    payout: mines::cash_out(stake, multiplier),
                    reason: SettleReason::CashedOut,
                    detail,
                })
            }
            GameContext::Crash(round) => {
                let detail = OutcomeDetail::Crash {
                    multiplier: round.multiplier,
                    busted: false,
                };
                self.settle(Settlement {
                    payout: crash::cash_out(stake, round.multiplier),
                    reason: SettleReason::CashedOut,
                    detail,
                })
            }
            GameContext::Chicken(run) => {
                let multiplier = run.current_multiplier();
                let detail = OutcomeDetail::Chicken {
                    lanes_cleared: run.lane,
                    multiplier,
                };
                self.settle(Settlement {
                    payout: chicken::cash_out(stake, multiplier),
                    reason: SettleReason::CashedOut,
                    detail,
                })
            }
            _ => self.wrong_state(),
        }
    }

    /// Terminal transition for cancel and eviction. Forfeiture is
    /// game-specific: progress games cash out their progress, a flying
    /// crash round forfeits, a dealt blackjack hand is played out as a
    /// stand, everything else refunds the stake.
    pub fn forfeit(&mut self, expired: bool, config: &EngineConfig) -> Settlement {
        let reason = if expired {
            SettleReason::Expired
        } else {
            SettleReason::Cancelled
        };
        let stake = self.stake;
        let settlement = if self.state == SessionState::AwaitingBet {
            Settlement {
                payout: stake,
                reason,
                detail: OutcomeDetail::Refund,
            }
        } else {
            match &mut self.context {
                GameContext::Mines(board) => {
                    let multiplier = board.current_multiplier(config.house.mines_house_edge);
                    Settlement {
                        payout: mines::cash_out(stake, multiplier),
                        reason,
                        detail: OutcomeDetail::Mines {
                            gems: board.gems,
                            multiplier,
                            hit_mine: false,
                        },
                    }
                }
                GameContext::Crash(round) => Settlement {
                    payout: 0,
                    reason,
                    detail: OutcomeDetail::Crash {
                        multiplier: round.multiplier,
                        busted: true,
                    },
                },
                GameContext::Chicken(run) => {
                    let multiplier = run.current_multiplier();
                    Settlement {
                        payout: chicken::cash_out(stake, multiplier),
                        reason,
                        detail: OutcomeDetail::Chicken {
                            lanes_cleared: run.lane,
                            multiplier,
                        },
                    }
                }
                GameContext::Blackjack(table) => {
                    let result = table.stand(config.house.dealer_stands_on);
                    Settlement {
                        payout: blackjack::payout(result, stake),
                        reason,
                        detail: OutcomeDetail::Blackjack {
                            player: table.player.iter().map(|c| c.code()).collect(),
                            dealer: table.dealer.iter().map(|c| c.code()).collect(),
                            player_value: table.player_value(),
                            dealer_value: table.dealer_value(),
                            natural: false,
                        },
                    }
                }
                GameContext::Scratch(card) => Settlement {
                    payout: card.forced_outcome(stake),
                    reason,
                    detail: OutcomeDetail::Refund,
                },
                // higher-lower awaiting its guess, plus anything one-shot
                // that cannot actually sit in Playing
                _ => Settlement {
                    payout: stake,
                    reason,
                    detail: OutcomeDetail::Refund,
                },
            }
        };
        self.state = SessionState::Cancelled;
        debug!(
            game = %self.game,
            stake,
            payout = settlement.payout,
            expired,
            "session forfeited"
        );
        settlement
    }

    pub fn view(&self, key: &SessionKey, config: &EngineConfig) -> SessionView {
        let game_view = match &self.context {
            GameContext::Blackjack(table) => GameView::Blackjack {
                player: table.player.iter().map(|c| c.code()).collect(),
                player_value: table.player_value(),
                dealer_up: table.dealer.first().map(|c| c.code()),
            },
            GameContext::Mines(board) => GameView::Mines {
                side: board.side,
                mines: board.mines,
                revealed_mask: board.revealed_mask,
                gems: board.gems,
                multiplier: board.current_multiplier(config.house.mines_house_edge),
            },
            GameContext::Crash(round) => GameView::Crash {
                tick: round.tick,
                multiplier: round.multiplier,
                potential_payout: crash::cash_out(self.stake, round.multiplier),
            },
            GameContext::Roulette(board) => GameView::Roulette {
                legs: board.legs.clone(),
                total_staked: board.total_staked(),
            },
            GameContext::Dice => GameView::Dice,
            GameContext::HigherLower(round) => GameView::HigherLower {
                first: round.first,
                offered: round
                    .first
                    .map(|f| hilo::payouts(f, &config.house.higher_lower)),
            },
            GameContext::Chicken(run) => GameView::Chicken {
                lanes_cleared: run.lane,
                multiplier: run.current_multiplier(),
                next_chance: chicken::LANES
                    .get(run.lane as usize)
                    .map(|&(chance, _)| chance),
            },
            GameContext::Scratch(card) => GameView::Scratch {
                cells: (0..card.grid.len() as u8)
                    .map(|cell| {
                        if card.revealed & (1 << cell) != 0 {
                            let symbol = card.grid[cell as usize] as usize;
                            Some(card.tier.table().symbols[symbol].name.to_string())
                        } else {
                            None
                        }
                    })
                    .collect(),
            },
            GameContext::Wheel => GameView::Wheel,
            GameContext::Slots(kind) => GameView::Slots {
                machine: kind.machine().name.to_string(),
            },
            GameContext::CoinFlip => GameView::CoinFlip,
        };
        SessionView {
            player: key.player.clone(),
            surface: key.surface.clone(),
            game: self.game,
            state: self.state,
            stake: self.stake,
            seed_commitment: self.seed.commitment.clone(),
            view: game_view,
            actions: self.available_actions(),
        }
    }

    fn available_actions(&self) -> Vec<&'static str> {
        match (self.state, self.game) {
            (SessionState::AwaitingBet, GameType::Roulette) => {
                vec!["place_leg", "begin", "cancel"]
            }
            (SessionState::AwaitingBet, GameType::Dice) => vec!["set_bet", "choose", "cancel"],
            (SessionState::AwaitingBet, GameType::CoinFlip) => {
                vec!["set_bet", "call", "cancel"]
            }
            (SessionState::AwaitingBet, GameType::Mines) => {
                vec!["set_bet", "configure", "begin", "cancel"]
            }
            (SessionState::AwaitingBet, GameType::Scratch)
            | (SessionState::AwaitingBet, GameType::Slots)
            | (SessionState::AwaitingBet, GameType::Wheel) => vec!["begin", "cancel"],
            (SessionState::AwaitingBet, _) => vec!["set_bet", "begin", "cancel"],
            (SessionState::Playing, GameType::Blackjack) => vec!["hit", "stand", "cancel"],
            (SessionState::Playing, GameType::Mines) => vec!["reveal", "cash_out", "cancel"],
            (SessionState::Playing, GameType::Crash)
            | (SessionState::Playing, GameType::Chicken) => {
                vec!["advance", "cash_out", "cancel"]
            }
            (SessionState::Playing, GameType::Scratch) => vec!["reveal", "cancel"],
            (SessionState::Playing, GameType::HigherLower) => vec!["guess", "cancel"],
            (SessionState::Playing, _) => vec!["cancel"],
            _ => vec![],
        }
    }
}

/// Shared map of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionKey, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session if the key is free. The builder runs under the
    /// vacant entry's guard, so a racing start on the same key sees
    /// `SessionAlreadyActive` rather than a double insert.
    pub fn try_insert_with(
        &self,
        key: SessionKey,
        build: impl FnOnce() -> EngineResult<Session>,
    ) -> EngineResult<()> {
        match self.sessions.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(EngineError::SessionAlreadyActive),
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(build()?);
                Ok(())
            }
        }
    }

    /// Run a closure against the live session under its entry guard.
    pub fn with_session<R>(
        &self,
        key: &SessionKey,
        f: impl FnOnce(&mut Session) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let mut entry = self
            .sessions
            .get_mut(key)
            .ok_or(EngineError::NoActiveSession)?;
        f(entry.value_mut())
    }

    /// Remove the session only if it reached a terminal state.
    pub fn remove_terminal(&self, key: &SessionKey) {
        self.sessions
            .remove_if(key, |_, session| session.state.is_terminal());
    }

    /// Keys whose sessions have idled past their per-game window.
    pub fn idle_keys(&self, config: &EngineConfig) -> Vec<SessionKey> {
        self.sessions
            .iter()
            .filter(|entry| !entry.state.is_terminal() && entry.is_idle(config))
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
