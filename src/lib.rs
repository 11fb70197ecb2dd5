//! Chipworks: an embeddable virtual-economy and casino engine.
//!
//! The crate is a library with one entry point, [`GameEngine`]. It keeps
//! every balance, shop listing, market price and live game session in
//! process, guarded by sharded maps, so a chat bot or HTTP frontend can
//! call it concurrently without its own locking.
//!
//! Layering, bottom to top:
//!
//! * [`games`] - pure odds and state machines, no money, injected RNG
//! * [`ledger`] - accounts with wallet/bank/chips buckets, inventory and
//!   asset holdings, all debits conditional
//! * [`stock`] / [`market`] - the rotating daily shop and the
//!   regime-switching asset simulator
//! * [`session`] - one live game per `(player, surface)`, with idle
//!   eviction and forfeiture rules
//! * [`engine`] - the facade where stakes are reserved and payouts land
//!
//! ```no_run
//! use chipworks::{AccountId, Bucket, EngineConfig, GameEngine, GameType};
//!
//! let engine = GameEngine::new(EngineConfig::default())?;
//! let ana = AccountId::new("ana", "guild-1");
//! engine.ledger().credit(&ana, Bucket::Chips, 10_000)?;
//!
//! let view = engine.start_session("ana", "guild-1", GameType::Blackjack, 500)?;
//! println!("commitment: {}", view.seed_commitment);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod fairness;
pub mod games;
pub mod ledger;
pub mod market;
pub mod metrics;
pub mod session;
pub mod stock;

pub use config::EngineConfig;
pub use engine::{ActResult, GameEngine, Receipt, ReceiptKind, SettlementResult, TradeSide};
pub use errors::{EngineError, EngineResult};
pub use games::GameType;
pub use ledger::{AccountId, AccountSnapshot, Bucket, Ledger};
pub use market::MarketView;
pub use metrics::MetricsSnapshot;
pub use session::{PlayerIntent, SessionKey, SessionState, SessionView, SettleReason};
pub use stock::ListedItem;
