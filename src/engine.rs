//! Engine facade.
//!
//! One `GameEngine` owns the ledger, the session registry, the shop stock,
//! the market simulator and the metrics counters, and is the only place
//! where chips actually move. Everything below it is pure; everything above
//! it (a bot, an HTTP layer, a test) talks to these methods and nothing
//! else.
//!
//! Money discipline: stakes are reserved before a session exists, payouts
//! are credited under the same session guard that produced them, and every
//! multi-step operation compensates on late failure instead of holding two
//! locks.

use crate::config::{BetWindow, EngineConfig};
use crate::errors::{EngineError, EngineResult};
use crate::fairness::SeedCommitment;
use crate::games::{
    blackjack, chicken, crash, hilo, roulette, scratch, slots, GameContext, GameType,
};
use crate::ledger::{AccountId, AccountSnapshot, Bucket, Ledger};
use crate::market::{MarketSimulator, MarketView};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::session::{
    OutcomeDetail, PlayerIntent, Session, SessionKey, SessionRegistry, SessionState, SessionView,
    SettleReason,
};
use crate::stock::{ListedItem, StockAllocator};
use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Upper bound on units per purchase request.
const MAX_PURCHASE_QTY: u64 = 1_000;

/// Terminal outcome of a session, with the fairness seed revealed.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementResult {
    pub game: GameType,
    pub stake: u64,
    pub payout: u64,
    pub reason: SettleReason,
    pub detail: OutcomeDetail,
    /// Hex server seed whose hash was published at session start.
    pub seed: String,
}

/// What an intent produced: the refreshed view, plus the settlement if the
/// session just ended.
#[derive(Debug, Clone, Serialize)]
pub struct ActResult {
    pub view: SessionView,
    pub settlement: Option<SettlementResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceiptKind {
    Purchase {
        item: String,
        qty: u64,
        unit_price: u64,
    },
    Transfer {
        from: String,
        to: String,
        tax: u64,
    },
    AssetTrade {
        ticker: String,
        units: u64,
        unit_price: u64,
        side: TradeSide,
        commission: u64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub id: Uuid,
    /// Chips or wallet currency that changed hands, net of discounts and
    /// commissions.
    pub total: u64,
    pub kind: ReceiptKind,
    pub at: chrono::DateTime<Utc>,
}

impl Receipt {
    fn new(total: u64, kind: ReceiptKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            total,
            kind,
            at: Utc::now(),
        }
    }
}

pub struct GameEngine {
    config: EngineConfig,
    ledger: Ledger,
    sessions: SessionRegistry,
    stock: StockAllocator,
    market: MarketSimulator,
    metrics: EngineMetrics,
    rng: Mutex<StdRng>,
}

impl GameEngine {
    pub fn new(config: EngineConfig) -> Result<Self, String> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Engine with a caller-supplied generator, for deterministic tests.
    pub fn with_rng(config: EngineConfig, rng: StdRng) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            market: MarketSimulator::new(config.market.clone(), Utc::now()),
            config,
            ledger: Ledger::new(),
            sessions: SessionRegistry::new(),
            stock: StockAllocator::new(),
            metrics: EngineMetrics::new(),
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn account(&self, id: &AccountId) -> AccountSnapshot {
        self.ledger.snapshot(id)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    // ---- sessions ----------------------------------------------------

    fn bet_window(&self, game: GameType) -> Option<&BetWindow> {
        let limits = &self.config.limits;
        match game {
            GameType::Blackjack => Some(&limits.blackjack),
            GameType::Mines => Some(&limits.mines),
            GameType::Crash => Some(&limits.crash),
            GameType::Roulette => Some(&limits.roulette),
            GameType::Dice => Some(&limits.dice),
            GameType::HigherLower => Some(&limits.higher_lower),
            GameType::Chicken => Some(&limits.chicken),
            GameType::CoinFlip => Some(&limits.coin_flip),
            GameType::Scratch | GameType::Wheel | GameType::Slots => None,
        }
    }

    fn check_window(&self, game: GameType, bet: u64) -> EngineResult<()> {
        let window = self
            .bet_window(game)
            .ok_or_else(|| EngineError::InvalidActionForState("fixed-cost game".into()))?;
        if window.contains(bet) {
            Ok(())
        } else {
            Err(EngineError::OutOfRange {
                min: window.min,
                max: window.max,
            })
        }
    }

    fn build_context(&self, game: GameType, bet: u64) -> EngineResult<GameContext> {
        match game {
            GameType::Blackjack => {
                self.check_window(game, bet)?;
                Ok(GameContext::Blackjack(blackjack::BlackjackTable::pending()))
            }
            GameType::Mines => {
                self.check_window(game, bet)?;
                Ok(GameContext::Mines(Default::default()))
            }
            GameType::Crash => {
                self.check_window(game, bet)?;
                Ok(GameContext::Crash(crash::CrashRound::new()))
            }
            // roulette stakes arrive leg by leg
            GameType::Roulette => {
                if bet != 0 {
                    return Err(EngineError::OutOfRange { min: 0, max: 0 });
                }
                Ok(GameContext::Roulette(roulette::RouletteBoard::default()))
            }
            GameType::Dice => {
                self.check_window(game, bet)?;
                Ok(GameContext::Dice)
            }
            GameType::HigherLower => {
                self.check_window(game, bet)?;
                Ok(GameContext::HigherLower(hilo::HiLoRound::default()))
            }
            GameType::Chicken => {
                self.check_window(game, bet)?;
                Ok(GameContext::Chicken(chicken::ChickenRun::default()))
            }
            GameType::Scratch => {
                let tier = scratch::TicketTier::for_cost(bet).ok_or(EngineError::OutOfRange {
                    min: scratch::TicketTier::Bronze.cost(),
                    max: scratch::TicketTier::Gold.cost(),
                })?;
                Ok(GameContext::Scratch(scratch::ScratchCard::pending(tier)))
            }
            GameType::Wheel => {
                let cost = self.config.house.wheel_spin_cost;
                if bet != cost {
                    return Err(EngineError::OutOfRange {
                        min: cost,
                        max: cost,
                    });
                }
                Ok(GameContext::Wheel)
            }
            GameType::Slots => {
                let kind = slots::MachineKind::for_cost(bet).ok_or(EngineError::OutOfRange {
                    min: slots::MachineKind::Basic.cost(),
                    max: slots::MachineKind::Ultimate.cost(),
                })?;
                Ok(GameContext::Slots(kind))
            }
            GameType::CoinFlip => {
                self.check_window(game, bet)?;
                Ok(GameContext::CoinFlip)
            }
        }
    }

    /// Open a session for `(player, surface)`, reserving `bet` chips up
    /// front. Fails if a session is already live on that key.
    pub fn start_session(
        &self,
        player: &str,
        surface: &str,
        game: GameType,
        bet: u64,
    ) -> EngineResult<SessionView> {
        let context = self.build_context(game, bet)?;
        let key = SessionKey::new(player, surface);
        let account = AccountId::new(player, surface);
        self.sessions.try_insert_with(key.clone(), || {
            self.ledger.reserve(&account, Bucket::Chips, bet)?;
            let seed = {
                let mut rng = self.rng.lock().unwrap();
                SeedCommitment::generate(&mut *rng)
            };
            Ok(Session::new(bet, context, seed))
        })?;
        self.metrics.record_session_started(bet);
        info!(player, surface, game = %game, bet, "session started");
        self.sessions
            .with_session(&key, |session| Ok(session.view(&key, &self.config)))
    }

    /// Apply one intent to the live session on `(player, surface)`.
    pub fn act(&self, player: &str, surface: &str, intent: PlayerIntent) -> EngineResult<ActResult> {
        let key = SessionKey::new(player, surface);
        let account = AccountId::new(player, surface);
        self.expire_if_idle(&key, &account)?;
        match intent {
            PlayerIntent::SetBet { amount } => self.set_bet(&key, &account, amount),
            PlayerIntent::PlaceLeg { leg, amount } => self.place_leg(&key, &account, leg, amount),
            other => self.play(&key, &account, other),
        }
    }

    /// An intent landing on a session past its idle window settles the
    /// session by forfeiture first and reports `SessionExpired`.
    fn expire_if_idle(&self, key: &SessionKey, account: &AccountId) -> EngineResult<()> {
        let expired = self.sessions.with_session(key, |session| {
            if session.state.is_terminal() || !session.is_idle(&self.config) {
                return Ok(None);
            }
            let stake = session.stake;
            let settlement = session.forfeit(true, &self.config);
            self.ledger.credit(account, Bucket::Chips, settlement.payout)?;
            Ok(Some((stake, settlement.payout)))
        })?;
        if let Some((stake, payout)) = expired {
            self.sessions.remove_terminal(key);
            self.metrics.record_eviction();
            self.metrics.record_cancellation(stake, payout);
            return Err(EngineError::SessionExpired);
        }
        Ok(())
    }

    fn set_bet(&self, key: &SessionKey, account: &AccountId, amount: u64) -> EngineResult<ActResult> {
        self.sessions.with_session(key, |session| {
            if session.state != SessionState::AwaitingBet {
                return Err(EngineError::InvalidActionForState(
                    session.state.as_str().into(),
                ));
            }
            // fixed-cost games swap their context to match the new cost
            let replacement = match session.game {
                GameType::Roulette | GameType::Wheel => {
                    return Err(EngineError::InvalidActionForState(
                        "fixed-cost game".into(),
                    ));
                }
                GameType::Scratch => {
                    let tier =
                        scratch::TicketTier::for_cost(amount).ok_or(EngineError::OutOfRange {
                            min: scratch::TicketTier::Bronze.cost(),
                            max: scratch::TicketTier::Gold.cost(),
                        })?;
                    Some(GameContext::Scratch(scratch::ScratchCard::pending(tier)))
                }
                GameType::Slots => {
                    let kind =
                        slots::MachineKind::for_cost(amount).ok_or(EngineError::OutOfRange {
                            min: slots::MachineKind::Basic.cost(),
                            max: slots::MachineKind::Ultimate.cost(),
                        })?;
                    Some(GameContext::Slots(kind))
                }
                game => {
                    self.check_window(game, amount)?;
                    None
                }
            };
            if amount > session.stake {
                let added = amount - session.stake;
                self.ledger.reserve(account, Bucket::Chips, added)?;
                self.metrics.record_stake_delta(added);
            } else {
                self.ledger
                    .credit(account, Bucket::Chips, session.stake - amount)?;
            }
            session.stake = amount;
            if let Some(context) = replacement {
                session.context = context;
            }
            session.touch();
            Ok(ActResult {
                view: session.view(key, &self.config),
                settlement: None,
            })
        })
    }

    fn place_leg(
        &self,
        key: &SessionKey,
        account: &AccountId,
        leg: roulette::RouletteLeg,
        amount: u64,
    ) -> EngineResult<ActResult> {
        self.sessions.with_session(key, |session| {
            if session.state != SessionState::AwaitingBet {
                return Err(EngineError::InvalidActionForState(
                    session.state.as_str().into(),
                ));
            }
            if !matches!(session.context, GameContext::Roulette(_)) {
                return Err(EngineError::InvalidActionForState(
                    "not a roulette session".into(),
                ));
            }
            if !leg.is_valid() {
                return Err(EngineError::OutOfRange { min: 0, max: 36 });
            }
            let window = &self.config.limits.roulette;
            if !window.contains(amount) {
                return Err(EngineError::OutOfRange {
                    min: window.min,
                    max: window.max,
                });
            }
            self.ledger.reserve(account, Bucket::Chips, amount)?;
            if let GameContext::Roulette(board) = &mut session.context {
                board.legs.push(roulette::PlacedLeg { leg, amount });
            }
            session.stake += amount;
            session.touch();
            self.metrics.record_stake_delta(amount);
            Ok(ActResult {
                view: session.view(key, &self.config),
                settlement: None,
            })
        })
    }

    fn play(
        &self,
        key: &SessionKey,
        account: &AccountId,
        intent: PlayerIntent,
    ) -> EngineResult<ActResult> {
        let result = self.sessions.with_session(key, |session| {
            let game = session.game;
            let stake = session.stake;
            let outcome = {
                let mut rng = self.rng.lock().unwrap();
                session.step(&intent, &mut *rng, &self.config)
            };
            match outcome? {
                None => Ok(ActResult {
                    view: session.view(key, &self.config),
                    settlement: None,
                }),
                Some(settlement) => {
                    self.ledger
                        .credit(account, Bucket::Chips, settlement.payout)?;
                    let view = session.view(key, &self.config);
                    Ok(ActResult {
                        view,
                        settlement: Some(SettlementResult {
                            game,
                            stake,
                            payout: settlement.payout,
                            reason: settlement.reason,
                            detail: settlement.detail,
                            seed: session.seed.reveal(),
                        }),
                    })
                }
            }
        });
        match result {
            Ok(act) => {
                if let Some(settlement) = &act.settlement {
                    self.metrics
                        .record_settlement(settlement.stake, settlement.payout);
                    self.sessions.remove_terminal(key);
                }
                Ok(act)
            }
            // a broken context cancels the session and refunds its stake
            Err(EngineError::StorageFailure(reason)) => {
                warn!(player = %key.player, %reason, "session failure, refunding stake");
                let _ = self.cancel_inner(key, account, false);
                self.sessions.remove_terminal(key);
                Err(EngineError::StorageFailure(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Cancel the live session, settling it by forfeiture.
    pub fn cancel_session(&self, player: &str, surface: &str) -> EngineResult<SettlementResult> {
        let key = SessionKey::new(player, surface);
        let account = AccountId::new(player, surface);
        let result = self.cancel_inner(&key, &account, false)?;
        info!(
            player, surface, game = %result.game, payout = result.payout,
            "session cancelled"
        );
        Ok(result)
    }

    fn cancel_inner(
        &self,
        key: &SessionKey,
        account: &AccountId,
        expired: bool,
    ) -> EngineResult<SettlementResult> {
        let result = self.sessions.with_session(key, |session| {
            if session.state.is_terminal() {
                return Err(EngineError::InvalidActionForState(
                    session.state.as_str().into(),
                ));
            }
            let game = session.game;
            let stake = session.stake;
            let settlement = session.forfeit(expired, &self.config);
            self.ledger.credit(account, Bucket::Chips, settlement.payout)?;
            Ok(SettlementResult {
                game,
                stake,
                payout: settlement.payout,
                reason: settlement.reason,
                detail: settlement.detail,
                seed: session.seed.reveal(),
            })
        })?;
        self.sessions.remove_terminal(key);
        self.metrics.record_cancellation(result.stake, result.payout);
        Ok(result)
    }

    /// Forfeit every session past its idle window. Returns what was evicted.
    pub fn evict_idle_sessions(&self) -> Vec<(SessionKey, SettlementResult)> {
        let mut evicted = Vec::new();
        for key in self.sessions.idle_keys(&self.config) {
            let account = AccountId::new(key.player.clone(), key.surface.clone());
            let result = self.sessions.with_session(&key, |session| {
                // re-check under the guard, the session may have just moved
                if session.state.is_terminal() || !session.is_idle(&self.config) {
                    return Err(EngineError::ConcurrencyConflict);
                }
                let game = session.game;
                let stake = session.stake;
                let settlement = session.forfeit(true, &self.config);
                self.ledger.credit(&account, Bucket::Chips, settlement.payout)?;
                Ok(SettlementResult {
                    game,
                    stake,
                    payout: settlement.payout,
                    reason: settlement.reason,
                    detail: settlement.detail,
                    seed: session.seed.reveal(),
                })
            });
            if let Ok(result) = result {
                self.sessions.remove_terminal(&key);
                self.metrics.record_eviction();
                self.metrics.record_cancellation(result.stake, result.payout);
                warn!(
                    player = %key.player, surface = %key.surface,
                    game = %result.game, payout = result.payout,
                    "idle session evicted"
                );
                evicted.push((key, result));
            }
        }
        evicted
    }

    /// Background task sweeping idle sessions on a fixed interval.
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        let period = Duration::from_secs(engine.config.timeouts.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = engine.evict_idle_sessions();
                if !evicted.is_empty() {
                    info!(count = evicted.len(), "idle sweep settled sessions");
                }
            }
        })
    }

    // ---- shop --------------------------------------------------------

    /// Today's shop listing, generating it on first call of the day.
    pub fn shop_catalog(&self) -> Vec<ListedItem> {
        let day = Self::today();
        {
            let mut rng = self.rng.lock().unwrap();
            self.stock.ensure_catalog(&day, &self.config.shop, &mut *rng);
        }
        self.stock.catalog(&day).unwrap_or_default()
    }

    /// Buy `qty` units of a listed item with wallet funds. Stock is taken
    /// first and restored if payment fails.
    pub fn purchase(&self, account: &AccountId, item: &str, qty: u64) -> EngineResult<Receipt> {
        if qty == 0 || qty > MAX_PURCHASE_QTY {
            return Err(EngineError::OutOfRange {
                min: 1,
                max: MAX_PURCHASE_QTY,
            });
        }
        let day = Self::today();
        {
            let mut rng = self.rng.lock().unwrap();
            self.stock.ensure_catalog(&day, &self.config.shop, &mut *rng);
        }
        let cutoff = (Utc::now() - ChronoDuration::days(self.config.shop.keep_days))
            .format("%Y-%m-%d")
            .to_string();
        self.stock.prune_before(&cutoff);

        let unit_price = self.stock.allocate(&day, item, qty)?;
        let total = match unit_price.checked_mul(qty) {
            Some(total) => total,
            None => {
                self.stock.restock(&day, item, qty);
                return Err(EngineError::StorageFailure("purchase total overflow".into()));
            }
        };
        if let Err(e) = self.ledger.reserve(account, Bucket::Wallet, total) {
            self.stock.restock(&day, item, qty);
            return Err(e);
        }
        if let Err(e) = self.ledger.credit_item(account, item, qty) {
            let _ = self.ledger.credit(account, Bucket::Wallet, total);
            self.stock.restock(&day, item, qty);
            return Err(e);
        }
        self.metrics.record_purchase();
        info!(player = %account.player, item, qty, total, "purchase settled");
        Ok(Receipt::new(
            total,
            ReceiptKind::Purchase {
                item: item.to_string(),
                qty,
                unit_price,
            },
        ))
    }

    // ---- economy -----------------------------------------------------

    /// Wallet-to-wallet transfer with a taxed minimum.
    pub fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> EngineResult<Receipt> {
        if from == to {
            return Err(EngineError::InvalidActionForState(
                "transfer to self".into(),
            ));
        }
        let min = self.config.economy.min_transfer;
        if amount < min {
            return Err(EngineError::OutOfRange {
                min,
                max: u64::MAX,
            });
        }
        let tax = (amount as f64 * self.config.economy.transfer_tax).ceil() as u64;
        self.ledger
            .transfer(from, Bucket::Wallet, to, Bucket::Wallet, amount, tax)?;
        self.metrics.record_transfer(tax);
        info!(from = %from.player, to = %to.player, amount, tax, "transfer settled");
        Ok(Receipt::new(
            amount,
            ReceiptKind::Transfer {
                from: from.player.clone(),
                to: to.player.clone(),
                tax,
            },
        ))
    }

    fn move_funds(
        &self,
        id: &AccountId,
        from: Bucket,
        to: Bucket,
        amount: u64,
    ) -> EngineResult<AccountSnapshot> {
        if amount == 0 {
            return Err(EngineError::OutOfRange {
                min: 1,
                max: u64::MAX,
            });
        }
        self.ledger.move_between_buckets(id, from, to, amount)?;
        Ok(self.ledger.snapshot(id))
    }

    pub fn deposit(&self, id: &AccountId, amount: u64) -> EngineResult<AccountSnapshot> {
        self.move_funds(id, Bucket::Wallet, Bucket::Bank, amount)
    }

    pub fn withdraw(&self, id: &AccountId, amount: u64) -> EngineResult<AccountSnapshot> {
        self.move_funds(id, Bucket::Bank, Bucket::Wallet, amount)
    }

    pub fn buy_chips(&self, id: &AccountId, amount: u64) -> EngineResult<AccountSnapshot> {
        self.move_funds(id, Bucket::Wallet, Bucket::Chips, amount)
    }

    pub fn sell_chips(&self, id: &AccountId, amount: u64) -> EngineResult<AccountSnapshot> {
        self.move_funds(id, Bucket::Chips, Bucket::Wallet, amount)
    }

    // ---- market ------------------------------------------------------

    fn spot_price(&self, ticker: &str) -> EngineResult<u64> {
        {
            let mut rng = self.rng.lock().unwrap();
            self.market.catch_up(Utc::now(), &mut *rng);
        }
        self.market
            .price(ticker)
            .ok_or_else(|| EngineError::OutOfStock(format!("no listed asset {}", ticker)))
    }

    pub fn market_snapshot(&self) -> MarketView {
        {
            let mut rng = self.rng.lock().unwrap();
            self.market.catch_up(Utc::now(), &mut *rng);
        }
        self.market.snapshot()
    }

    /// Buy asset units at spot with wallet funds.
    pub fn buy_asset(&self, id: &AccountId, ticker: &str, units: u64) -> EngineResult<Receipt> {
        if units == 0 {
            return Err(EngineError::OutOfRange {
                min: 1,
                max: u64::MAX,
            });
        }
        let unit_price = self.spot_price(ticker)?;
        let cost = unit_price
            .checked_mul(units)
            .ok_or_else(|| EngineError::StorageFailure("trade total overflow".into()))?;
        self.ledger.reserve(id, Bucket::Wallet, cost)?;
        if let Err(e) = self.ledger.credit_holding(id, ticker, units) {
            let _ = self.ledger.credit(id, Bucket::Wallet, cost);
            return Err(e);
        }
        info!(player = %id.player, ticker, units, cost, "asset bought");
        Ok(Receipt::new(
            cost,
            ReceiptKind::AssetTrade {
                ticker: ticker.to_string(),
                units,
                unit_price,
                side: TradeSide::Buy,
                commission: 0,
            },
        ))
    }

    /// Sell held asset units at spot, minus the sell commission.
    pub fn sell_asset(&self, id: &AccountId, ticker: &str, units: u64) -> EngineResult<Receipt> {
        if units == 0 {
            return Err(EngineError::OutOfRange {
                min: 1,
                max: u64::MAX,
            });
        }
        let unit_price = self.spot_price(ticker)?;
        self.ledger.debit_holding(id, ticker, units)?;
        let gross = match unit_price.checked_mul(units) {
            Some(gross) => gross,
            None => {
                let _ = self.ledger.credit_holding(id, ticker, units);
                return Err(EngineError::StorageFailure("trade total overflow".into()));
            }
        };
        let commission = (gross as f64 * self.config.market.sell_commission).round() as u64;
        let proceeds = gross.saturating_sub(commission);
        if let Err(e) = self.ledger.credit(id, Bucket::Wallet, proceeds) {
            let _ = self.ledger.credit_holding(id, ticker, units);
            return Err(e);
        }
        info!(player = %id.player, ticker, units, proceeds, commission, "asset sold");
        Ok(Receipt::new(
            proceeds,
            ReceiptKind::AssetTrade {
                ticker: ticker.to_string(),
                units,
                unit_price,
                side: TradeSide::Sell,
                commission,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeoutConfig;
    use crate::games::dice::DiceCall;

    fn engine_with_seed(seed: u64) -> GameEngine {
        GameEngine::with_rng(EngineConfig::default(), StdRng::seed_from_u64(seed)).unwrap()
    }

    fn funded(engine: &GameEngine, player: &str, wallet: u64, chips: u64) -> AccountId {
        let id = AccountId::new(player, "bench");
        engine.ledger.credit(&id, Bucket::Wallet, wallet).unwrap();
        engine.ledger.credit(&id, Bucket::Chips, chips).unwrap();
        id
    }

    #[test]
    fn test_start_reserves_stake_and_is_exclusive() {
        let engine = engine_with_seed(1);
        let id = funded(&engine, "ana", 0, 1000);

        let view = engine
            .start_session("ana", "bench", GameType::Blackjack, 500)
            .unwrap();
        assert_eq!(view.stake, 500);
        assert_eq!(engine.ledger.balance(&id, Bucket::Chips), 500);

        let err = engine
            .start_session("ana", "bench", GameType::Dice, 100)
            .unwrap_err();
        assert_eq!(err.code(), "SESSION_ALREADY_ACTIVE");
        // the losing start must not have touched the balance
        assert_eq!(engine.ledger.balance(&id, Bucket::Chips), 500);
    }

    #[test]
    fn test_bet_window_enforced() {
        let engine = engine_with_seed(2);
        funded(&engine, "ana", 0, 1_000_000);
        let err = engine
            .start_session("ana", "bench", GameType::Blackjack, 50)
            .unwrap_err();
        assert_eq!(err.code(), "OUT_OF_RANGE");
    }

    #[test]
    fn test_insufficient_chips_leaves_no_session() {
        let engine = engine_with_seed(3);
        funded(&engine, "ana", 0, 100);
        let err = engine
            .start_session("ana", "bench", GameType::Blackjack, 500)
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        // the key is free again
        funded(&engine, "ana", 0, 400);
        engine
            .start_session("ana", "bench", GameType::Blackjack, 500)
            .unwrap();
    }

    #[test]
    fn test_dice_settles_in_one_intent() {
        let engine = engine_with_seed(4);
        let id = funded(&engine, "ana", 0, 1000);
        engine
            .start_session("ana", "bench", GameType::Dice, 100)
            .unwrap();
        let result = engine
            .act("ana", "bench", PlayerIntent::Choose { call: DiceCall::Under })
            .unwrap();
        let settlement = result.settlement.expect("dice settles immediately");
        assert!(settlement.payout == 0 || settlement.payout == 200);
        assert_eq!(
            engine.ledger.balance(&id, Bucket::Chips),
            900 + settlement.payout
        );
        assert!(!settlement.seed.is_empty());
        // session is gone
        let err = engine
            .act("ana", "bench", PlayerIntent::Choose { call: DiceCall::Under })
            .unwrap_err();
        assert_eq!(err.code(), "NO_ACTIVE_SESSION");
    }

    #[test]
    fn test_cancel_awaiting_bet_refunds_stake() {
        let engine = engine_with_seed(5);
        let id = funded(&engine, "ana", 0, 1000);
        engine
            .start_session("ana", "bench", GameType::Mines, 300)
            .unwrap();
        assert_eq!(engine.ledger.balance(&id, Bucket::Chips), 700);

        let result = engine.cancel_session("ana", "bench").unwrap();
        assert_eq!(result.payout, 300);
        assert_eq!(result.reason, SettleReason::Cancelled);
        assert_eq!(engine.ledger.balance(&id, Bucket::Chips), 1000);
        assert_eq!(engine.active_sessions(), 0);
    }

    #[test]
    fn test_set_bet_adjusts_reservation_both_ways() {
        let engine = engine_with_seed(6);
        let id = funded(&engine, "ana", 0, 1000);
        engine
            .start_session("ana", "bench", GameType::Blackjack, 500)
            .unwrap();

        engine
            .act("ana", "bench", PlayerIntent::SetBet { amount: 200 })
            .unwrap();
        assert_eq!(engine.ledger.balance(&id, Bucket::Chips), 800);

        engine
            .act("ana", "bench", PlayerIntent::SetBet { amount: 400 })
            .unwrap();
        assert_eq!(engine.ledger.balance(&id, Bucket::Chips), 600);
    }

    #[test]
    fn test_roulette_legs_reserve_individually() {
        let engine = engine_with_seed(7);
        let id = funded(&engine, "ana", 0, 10_000);
        engine
            .start_session("ana", "bench", GameType::Roulette, 0)
            .unwrap();
        engine
            .act(
                "ana",
                "bench",
                PlayerIntent::PlaceLeg {
                    leg: roulette::RouletteLeg::Straight { number: 7 },
                    amount: 100,
                },
            )
            .unwrap();
        engine
            .act(
                "ana",
                "bench",
                PlayerIntent::PlaceLeg {
                    leg: roulette::RouletteLeg::Color {
                        color: roulette::BetColor::Red,
                    },
                    amount: 200,
                },
            )
            .unwrap();
        assert_eq!(engine.ledger.balance(&id, Bucket::Chips), 9_700);

        let result = engine.act("ana", "bench", PlayerIntent::Begin).unwrap();
        let settlement = result.settlement.expect("roulette settles on spin");
        assert_eq!(settlement.stake, 300);
        assert_eq!(
            engine.ledger.balance(&id, Bucket::Chips),
            9_700 + settlement.payout
        );
    }

    #[test]
    fn test_wheel_spin_cost_is_exact() {
        let engine = engine_with_seed(8);
        funded(&engine, "ana", 0, 1000);
        let err = engine
            .start_session("ana", "bench", GameType::Wheel, 5)
            .unwrap_err();
        assert_eq!(err.code(), "OUT_OF_RANGE");
        engine
            .start_session("ana", "bench", GameType::Wheel, 0)
            .unwrap();
    }

    #[test]
    fn test_idle_session_is_evicted_with_refund() {
        let config = EngineConfig {
            timeouts: TimeoutConfig {
                default_secs: 0,
                blackjack_secs: 0,
                crash_secs: 0,
                mines_secs: 0,
                sweep_interval_secs: 1,
            },
            ..EngineConfig::default()
        };
        let engine = GameEngine::with_rng(config, StdRng::seed_from_u64(9)).unwrap();
        let id = funded(&engine, "ana", 0, 1000);
        engine
            .start_session("ana", "bench", GameType::Mines, 250)
            .unwrap();

        let evicted = engine.evict_idle_sessions();
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].1.reason, SettleReason::Expired);
        assert_eq!(evicted[0].1.payout, 250);
        assert_eq!(engine.ledger.balance(&id, Bucket::Chips), 1000);
        assert_eq!(engine.active_sessions(), 0);

        let snap = engine.metrics_snapshot();
        assert_eq!(snap.sessions_evicted, 1);
    }

    #[test]
    fn test_purchase_and_stock_exhaustion() {
        let engine = engine_with_seed(10);
        let id = funded(&engine, "ana", 100_000_000, 0);
        let listing = engine.shop_catalog();
        assert!(!listing.is_empty());
        let first = &listing[0];

        let receipt = engine.purchase(&id, &first.item, first.remaining).unwrap();
        assert_eq!(receipt.total, first.unit_price * first.remaining);
        assert_eq!(
            engine.account(&id).inventory.get(&first.item),
            Some(&first.remaining)
        );

        let err = engine.purchase(&id, &first.item, 1).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_STOCK");
    }

    #[test]
    fn test_purchase_restocks_when_payment_fails() {
        let engine = engine_with_seed(11);
        let poor = AccountId::new("bo", "bench");
        let listing = engine.shop_catalog();
        let first = &listing[0];

        let err = engine.purchase(&poor, &first.item, 1).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        let after = engine.shop_catalog();
        let relisted = after.iter().find(|l| l.item == first.item).unwrap();
        assert_eq!(relisted.remaining, first.remaining);
    }

    #[test]
    fn test_transfer_minimum_and_tax() {
        let engine = engine_with_seed(12);
        let ana = funded(&engine, "ana", 10_000, 0);
        let bo = AccountId::new("bo", "bench");

        let err = engine.transfer(&ana, &bo, 99).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_RANGE");

        engine.transfer(&ana, &bo, 200).unwrap();
        assert_eq!(engine.ledger.balance(&ana, Bucket::Wallet), 9_800);
        // ceil(200 * 0.05) == 10 goes to the house
        assert_eq!(engine.ledger.balance(&bo, Bucket::Wallet), 190);
        assert_eq!(engine.metrics_snapshot().house_take, 10);
    }

    #[test]
    fn test_bank_and_chip_moves() {
        let engine = engine_with_seed(13);
        let id = funded(&engine, "ana", 1000, 0);

        engine.deposit(&id, 600).unwrap();
        engine.withdraw(&id, 100).unwrap();
        engine.buy_chips(&id, 200).unwrap();
        let snap = engine.sell_chips(&id, 50).unwrap();
        assert_eq!(snap.wallet, 350);
        assert_eq!(snap.bank, 500);
        assert_eq!(snap.chips, 150);
    }

    #[test]
    fn test_asset_round_trip_charges_commission() {
        let engine = engine_with_seed(14);
        let id = funded(&engine, "ana", 10_000, 0);

        let buy = engine.buy_asset(&id, "NOX", 4).unwrap();
        assert_eq!(engine.account(&id).holdings.get("NOX"), Some(&4));

        let sell = engine.sell_asset(&id, "NOX", 4).unwrap();
        assert!(engine.account(&id).holdings.is_empty());
        // same spot both ways inside one tick, so the gap is the commission
        assert!(sell.total <= buy.total);

        let err = engine.sell_asset(&id, "NOX", 1).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        let err = engine.buy_asset(&id, "DOGE", 1).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_STOCK");
    }

    #[test]
    fn test_scratch_requires_a_ticket_cost() {
        let engine = engine_with_seed(15);
        funded(&engine, "ana", 0, 10_000);
        let err = engine
            .start_session("ana", "bench", GameType::Scratch, 300)
            .unwrap_err();
        assert_eq!(err.code(), "OUT_OF_RANGE");
        engine
            .start_session("ana", "bench", GameType::Scratch, 250)
            .unwrap();
    }
}
