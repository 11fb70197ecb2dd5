//! Engine configuration.
//!
//! All tunables live here: per-game bet windows, idle timeouts, market
//! cadence, shop rotation parameters and house-edge knobs. Every section has
//! a `Default` matching the built-in game tables, so `EngineConfig::default()`
//! is a fully playable configuration. A TOML file can override any subset.

use crate::games::GameType;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: LimitsConfig,
    pub timeouts: TimeoutConfig,
    pub market: MarketConfig,
    pub shop: ShopConfig,
    pub economy: EconomyConfig,
    pub house: HouseConfig,
}

/// Inclusive bet window for one game family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BetWindow {
    pub min: u64,
    pub max: u64,
}

impl BetWindow {
    pub fn contains(&self, amount: u64) -> bool {
        (self.min..=self.max).contains(&amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub blackjack: BetWindow,
    pub mines: BetWindow,
    pub crash: BetWindow,
    /// Per leg, not per session; a roulette session's stake is the leg sum.
    pub roulette: BetWindow,
    pub dice: BetWindow,
    pub higher_lower: BetWindow,
    pub chicken: BetWindow,
    pub coin_flip: BetWindow,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            blackjack: BetWindow { min: 100, max: 500_000 },
            mines: BetWindow { min: 100, max: 1_000_000 },
            crash: BetWindow { min: 100, max: 100_000 },
            roulette: BetWindow { min: 100, max: 250_000 },
            dice: BetWindow { min: 50, max: 100_000 },
            higher_lower: BetWindow { min: 25, max: 75_000 },
            chicken: BetWindow { min: 20, max: 25_000 },
            coin_flip: BetWindow { min: 10, max: 50_000 },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Idle window for games without a specific entry below.
    pub default_secs: u64,
    pub blackjack_secs: u64,
    pub crash_secs: u64,
    pub mines_secs: u64,
    /// How often the optional background sweeper wakes up.
    pub sweep_interval_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: 120,
            blackjack_secs: 60,
            crash_secs: 30,
            mines_secs: 180,
            sweep_interval_secs: 15,
        }
    }
}

impl TimeoutConfig {
    /// Idle seconds after which a session of this game is evictable.
    pub fn idle_secs(&self, game: GameType) -> u64 {
        match game {
            GameType::Blackjack => self.blackjack_secs,
            GameType::Crash => self.crash_secs,
            GameType::Mines => self.mines_secs,
            _ => self.default_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Wall-clock seconds between price steps. Catch-up is lazy: a read
    /// after a quiet hour replays the missed steps before answering.
    pub tick_secs: u64,
    /// Seconds a market regime persists before a uniform re-draw.
    pub regime_dwell_secs: u64,
    /// Price points retained per asset, FIFO.
    pub history_len: usize,
    /// Noise amplification while the Volatile regime is active.
    pub volatile_boost: f64,
    /// Per-tick drift applied under Bull (+) and Bear (-) regimes.
    pub drift: f64,
    /// Commission withheld from sale proceeds, rounded.
    pub sell_commission: f64,
    /// Upper bound on replayed steps per catch-up; older history is dropped
    /// anyway, so replaying further adds nothing observable.
    pub max_catchup_ticks: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tick_secs: 300,
            regime_dwell_secs: 3600,
            history_len: 24,
            volatile_boost: 2.5,
            drift: 0.02,
            sell_commission: 0.02,
            max_catchup_ticks: 96,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Catalog slots rolled per day.
    pub slots: usize,
    /// Shop price = ceil(base_price * price_factor).
    pub price_factor: f64,
    /// Deal-of-the-day price = ceil(shop_price * deal_discount).
    pub deal_discount: f64,
    /// Catalog days kept before pruning.
    pub keep_days: i64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            slots: 6,
            price_factor: 0.4,
            deal_discount: 0.3,
            keep_days: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Smallest allowed player-to-player transfer.
    pub min_transfer: u64,
    /// Transfer tax withheld from the receiver, ceil-rounded.
    pub transfer_tax: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            min_transfer: 100,
            transfer_tax: 0.05,
        }
    }
}

/// House-edge knobs shared with the odds library.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseConfig {
    /// Winnings factor for a two-card 21, floored (total = stake + floor).
    pub blackjack_natural: f64,
    /// Dealer draws while below this hand value.
    pub dealer_stands_on: u8,
    /// Multiplicative edge on the fair mines multiplier.
    pub mines_house_edge: f64,
    pub crash: CrashCurve,
    pub higher_lower: HigherLowerCurve,
    /// Stake reserved per wheel spin. The built-in wheel is free to spin.
    pub wheel_spin_cost: u64,
}

impl Default for HouseConfig {
    fn default() -> Self {
        Self {
            blackjack_natural: 1.5,
            dealer_stands_on: 17,
            mines_house_edge: 0.98,
            crash: CrashCurve::default(),
            higher_lower: HigherLowerCurve::default(),
            wheel_spin_cost: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CrashCurve {
    /// One-shot bust probability checked before the first tick.
    pub instant_bust: f64,
    /// Per-tick bust probability is `base + tick * slope`.
    pub base: f64,
    pub slope: f64,
    /// Multiplier grows by `step_base + tick * step_slope` per survived tick.
    pub step_base: f64,
    pub step_slope: f64,
    /// Surviving past this multiplier settles the round automatically.
    pub max_multiplier: f64,
}

impl Default for CrashCurve {
    fn default() -> Self {
        Self {
            instant_bust: 0.07,
            base: 0.01,
            slope: 0.006,
            step_base: 0.1,
            step_slope: 0.01,
            max_multiplier: 100_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct HigherLowerCurve {
    /// Fair payout is scaled by this before clamping.
    pub edge: f64,
    pub min_payout: f64,
    pub max_payout: f64,
    pub equal_payout: f64,
}

impl Default for HigherLowerCurve {
    fn default() -> Self {
        Self {
            edge: 0.95,
            min_payout: 1.05,
            max_payout: 25.0,
            equal_payout: 75.0,
        }
    }
}

impl EngineConfig {
    /// Load a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read config file: {}", e))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(raw).map_err(|e| format!("failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let windows = [
            ("blackjack", self.limits.blackjack),
            ("mines", self.limits.mines),
            ("crash", self.limits.crash),
            ("roulette", self.limits.roulette),
            ("dice", self.limits.dice),
            ("higher_lower", self.limits.higher_lower),
            ("chicken", self.limits.chicken),
            ("coin_flip", self.limits.coin_flip),
        ];
        for (name, window) in windows {
            if window.min == 0 || window.min > window.max {
                return Err(format!("limits.{}: min must be in 1..=max", name));
            }
        }
        if self.market.tick_secs == 0 {
            return Err("market.tick_secs must be positive".into());
        }
        if self.market.history_len == 0 {
            return Err("market.history_len must be positive".into());
        }
        for (name, p) in [
            ("market.sell_commission", self.market.sell_commission),
            ("economy.transfer_tax", self.economy.transfer_tax),
            ("shop.price_factor", self.shop.price_factor),
            ("shop.deal_discount", self.shop.deal_discount),
            ("house.crash.instant_bust", self.house.crash.instant_bust),
            ("house.crash.base", self.house.crash.base),
            ("house.mines_house_edge", self.house.mines_house_edge),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(format!("{} must be within 0..=1", name));
            }
        }
        if self.shop.slots == 0 {
            return Err("shop.slots must be positive".into());
        }
        if self.house.higher_lower.min_payout > self.house.higher_lower.max_payout {
            return Err("house.higher_lower: min_payout above max_payout".into());
        }
        if self.house.dealer_stands_on == 0 || self.house.dealer_stands_on > 21 {
            return Err("house.dealer_stands_on must be in 1..=21".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = EngineConfig::from_toml_str(
            r#"
            [limits.dice]
            min = 10
            max = 5000

            [economy]
            min_transfer = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.limits.dice.min, 10);
        assert_eq!(config.limits.dice.max, 5000);
        assert_eq!(config.economy.min_transfer, 500);
        // untouched sections keep their defaults
        assert_eq!(config.limits.blackjack.max, 500_000);
        assert_eq!(config.market.tick_secs, 300);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let err = EngineConfig::from_toml_str(
            r#"
            [limits.crash]
            min = 5000
            max = 100
            "#,
        )
        .unwrap_err();
        assert!(err.contains("limits.crash"));
    }

    #[test]
    fn test_probability_bounds_checked() {
        let mut config = EngineConfig::default();
        config.economy.transfer_tax = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_idle_secs_per_game() {
        let timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.idle_secs(GameType::Crash), 30);
        assert_eq!(timeouts.idle_secs(GameType::Dice), 120);
    }
}
