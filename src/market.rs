//! Regime-switching market simulator.
//!
//! Six built-in assets follow a random walk whose drift depends on a single
//! shared regime. There is no background timer: the clock is lazy, and any
//! read first replays the ticks that elapsed since the last one. Prices are
//! integers, floored at 1, with a bounded FIFO history per asset.

use crate::config::MarketConfig;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

pub struct AssetSpec {
    pub name: &'static str,
    pub ticker: &'static str,
    pub initial_price: u64,
    pub volatility: f64,
}

pub static ASSETS: &[AssetSpec] = &[
    AssetSpec { name: "NoxCoin", ticker: "NOX", initial_price: 150, volatility: 0.15 },
    AssetSpec { name: "Quantum Token", ticker: "QTM", initial_price: 350, volatility: 0.30 },
    AssetSpec { name: "Cypherium", ticker: "CYPH", initial_price: 80, volatility: 0.20 },
    AssetSpec { name: "Solaris", ticker: "SLR", initial_price: 220, volatility: 0.12 },
    AssetSpec { name: "Portal Protocol", ticker: "PORT", initial_price: 500, volatility: 0.45 },
    AssetSpec { name: "AstroPup", ticker: "PUP", initial_price: 25, volatility: 0.85 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Bull,
    Bear,
    Volatile,
    Stable,
}

impl Regime {
    const ALL: [Regime; 4] = [Regime::Bull, Regime::Bear, Regime::Volatile, Regime::Stable];

    fn roll(rng: &mut impl Rng) -> Regime {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

#[derive(Debug)]
struct AssetState {
    name: &'static str,
    volatility: f64,
    price: u64,
    history: VecDeque<u64>,
}

#[derive(Debug)]
struct MarketClock {
    last_tick: DateTime<Utc>,
    regime: Regime,
    regime_since: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetView {
    pub ticker: String,
    pub name: String,
    pub price: u64,
    /// Percent change against the previous history point, 0 with no history.
    pub change_pct: f64,
    pub history: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketView {
    pub regime: Regime,
    pub assets: Vec<AssetView>,
}

pub struct MarketSimulator {
    assets: DashMap<String, AssetState>,
    clock: Mutex<MarketClock>,
    config: MarketConfig,
}

impl MarketSimulator {
    pub fn new(config: MarketConfig, now: DateTime<Utc>) -> Self {
        let assets = DashMap::new();
        for spec in ASSETS {
            assets.insert(
                spec.ticker.to_string(),
                AssetState {
                    name: spec.name,
                    volatility: spec.volatility,
                    price: spec.initial_price,
                    history: VecDeque::from([spec.initial_price]),
                },
            );
        }
        Self {
            assets,
            clock: Mutex::new(MarketClock {
                last_tick: now,
                regime: Regime::Stable,
                regime_since: now,
            }),
            config,
        }
    }

    /// Replay every tick that elapsed since the last one. Replay is capped;
    /// beyond the cap the extra steps would only produce history the FIFO
    /// would drop anyway.
    pub fn catch_up(&self, now: DateTime<Utc>, rng: &mut impl Rng) {
        let mut clock = self.clock.lock().unwrap();
        let tick = Duration::seconds(self.config.tick_secs as i64);
        let mut pending = 0u64;
        while clock.last_tick + tick <= now && pending < self.config.max_catchup_ticks {
            pending += 1;
            clock.last_tick += tick;
            let sim_now = clock.last_tick;
            if (sim_now - clock.regime_since).num_seconds() as u64
                >= self.config.regime_dwell_secs
            {
                let next = Regime::roll(rng);
                if next != clock.regime {
                    info!(from = ?clock.regime, to = ?next, "market regime flipped");
                }
                clock.regime = next;
                clock.regime_since = sim_now;
            }
            self.step(clock.regime, rng);
        }
        // if the cap was hit, skip the rest of the gap outright
        if clock.last_tick + tick <= now {
            clock.last_tick = now;
        }
        if pending > 0 {
            debug!(ticks = pending, "market caught up");
        }
    }

    fn step(&self, regime: Regime, rng: &mut impl Rng) {
        let drift = match regime {
            Regime::Bull => self.config.drift,
            Regime::Bear => -self.config.drift,
            Regime::Volatile | Regime::Stable => 0.0,
        };
        let boost = if regime == Regime::Volatile {
            self.config.volatile_boost
        } else {
            1.0
        };
        for mut asset in self.assets.iter_mut() {
            let noise = rng.gen_range(-1.0..1.0) * asset.volatility * boost;
            let next = (asset.price as f64 * (1.0 + drift + noise)).round();
            asset.price = (next as i64).max(1) as u64;
            let price = asset.price;
            asset.history.push_back(price);
            while asset.history.len() > self.config.history_len {
                asset.history.pop_front();
            }
        }
    }

    /// Spot price; `None` for an unknown ticker.
    pub fn price(&self, ticker: &str) -> Option<u64> {
        self.assets.get(ticker).map(|a| a.price)
    }

    pub fn regime(&self) -> Regime {
        self.clock.lock().unwrap().regime
    }

    pub fn snapshot(&self) -> MarketView {
        let regime = self.regime();
        let mut assets: Vec<AssetView> = self
            .assets
            .iter()
            .map(|entry| {
                let history: Vec<u64> = entry.history.iter().copied().collect();
                let change_pct = if history.len() >= 2 {
                    let prev = history[history.len() - 2] as f64;
                    (entry.price as f64 - prev) / prev * 100.0
                } else {
                    0.0
                };
                AssetView {
                    ticker: entry.key().clone(),
                    name: entry.name.to_string(),
                    price: entry.price,
                    change_pct,
                    history,
                }
            })
            .collect();
        assets.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        MarketView { regime, assets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn simulator() -> (MarketSimulator, DateTime<Utc>) {
        let start = Utc::now();
        (MarketSimulator::new(MarketConfig::default(), start), start)
    }

    #[test]
    fn test_initial_prices_match_specs() {
        let (market, _) = simulator();
        assert_eq!(market.price("NOX"), Some(150));
        assert_eq!(market.price("PUP"), Some(25));
        assert_eq!(market.price("DOGE"), None);
    }

    #[test]
    fn test_no_elapsed_time_means_no_ticks() {
        let (market, start) = simulator();
        let mut rng = StdRng::seed_from_u64(91);
        market.catch_up(start + Duration::seconds(299), &mut rng);
        assert_eq!(market.price("NOX"), Some(150));
    }

    #[test]
    fn test_catch_up_replays_missed_ticks() {
        let (market, start) = simulator();
        let mut rng = StdRng::seed_from_u64(92);
        // an hour of silence is 12 ticks
        market.catch_up(start + Duration::seconds(3600), &mut rng);
        let view = market.snapshot();
        let nox = view.assets.iter().find(|a| a.ticker == "NOX").unwrap();
        assert_eq!(nox.history.len(), 13); // initial point + 12 steps
    }

    #[test]
    fn test_prices_never_reach_zero() {
        let config = MarketConfig {
            max_catchup_ticks: 5000,
            ..MarketConfig::default()
        };
        let start = Utc::now();
        let market = MarketSimulator::new(config, start);
        let mut rng = StdRng::seed_from_u64(93);
        market.catch_up(start + Duration::days(12), &mut rng);
        for spec in ASSETS {
            assert!(market.price(spec.ticker).unwrap() >= 1);
        }
    }

    #[test]
    fn test_history_is_bounded() {
        let config = MarketConfig {
            max_catchup_ticks: 500,
            ..MarketConfig::default()
        };
        let start = Utc::now();
        let market = MarketSimulator::new(config.clone(), start);
        let mut rng = StdRng::seed_from_u64(94);
        market.catch_up(start + Duration::days(2), &mut rng);
        for asset in market.snapshot().assets {
            assert!(asset.history.len() <= config.history_len);
        }
    }

    #[test]
    fn test_catch_up_cap_skips_the_rest() {
        let (market, start) = simulator();
        let mut rng = StdRng::seed_from_u64(95);
        market.catch_up(start + Duration::days(30), &mut rng);
        // after the capped replay the clock is current, so an immediate
        // second call does nothing
        let before = market.snapshot();
        market.catch_up(start + Duration::days(30), &mut rng);
        let after = market.snapshot();
        let prices = |v: &MarketView| v.assets.iter().map(|a| a.price).collect::<Vec<_>>();
        assert_eq!(prices(&before), prices(&after));
    }

    #[test]
    fn test_regime_dwell_respected() {
        let (market, start) = simulator();
        let mut rng = StdRng::seed_from_u64(96);
        // under an hour: regime must still be the starting one
        market.catch_up(start + Duration::seconds(3000), &mut rng);
        assert_eq!(market.regime(), Regime::Stable);
    }
}
