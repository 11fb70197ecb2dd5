//! Lightweight engine counters.
//!
//! Plain atomics, readable at any time without locking. The house take is
//! signed: stakes kept by the house push it up, payouts above stake pull it
//! down.

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineMetrics {
    sessions_started: AtomicU64,
    sessions_settled: AtomicU64,
    sessions_cancelled: AtomicU64,
    sessions_evicted: AtomicU64,
    chips_staked: AtomicU64,
    chips_paid_out: AtomicU64,
    purchases: AtomicU64,
    transfers: AtomicU64,
    house_take: AtomicI64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub sessions_started: u64,
    pub sessions_settled: u64,
    pub sessions_cancelled: u64,
    pub sessions_evicted: u64,
    pub chips_staked: u64,
    pub chips_paid_out: u64,
    pub purchases: u64,
    pub transfers: u64,
    pub house_take: i64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_session_started(&self, stake: u64) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        self.chips_staked.fetch_add(stake, Ordering::Relaxed);
    }

    pub fn record_stake_delta(&self, added: u64) {
        self.chips_staked.fetch_add(added, Ordering::Relaxed);
    }

    pub fn record_settlement(&self, stake: u64, payout: u64) {
        self.sessions_settled.fetch_add(1, Ordering::Relaxed);
        self.chips_paid_out.fetch_add(payout, Ordering::Relaxed);
        self.house_take
            .fetch_add(stake as i64 - payout as i64, Ordering::Relaxed);
    }

    pub fn record_cancellation(&self, stake: u64, payout: u64) {
        self.sessions_cancelled.fetch_add(1, Ordering::Relaxed);
        self.chips_paid_out.fetch_add(payout, Ordering::Relaxed);
        self.house_take
            .fetch_add(stake as i64 - payout as i64, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.sessions_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_purchase(&self) {
        self.purchases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transfer(&self, tax: u64) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
        self.house_take.fetch_add(tax as i64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_settled: self.sessions_settled.load(Ordering::Relaxed),
            sessions_cancelled: self.sessions_cancelled.load(Ordering::Relaxed),
            sessions_evicted: self.sessions_evicted.load(Ordering::Relaxed),
            chips_staked: self.chips_staked.load(Ordering::Relaxed),
            chips_paid_out: self.chips_paid_out.load(Ordering::Relaxed),
            purchases: self.purchases.load(Ordering::Relaxed),
            transfers: self.transfers.load(Ordering::Relaxed),
            house_take: self.house_take.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_house_take_tracks_both_directions() {
        let metrics = EngineMetrics::new();
        metrics.record_session_started(100);
        metrics.record_settlement(100, 0); // house keeps the stake
        metrics.record_session_started(100);
        metrics.record_settlement(100, 300); // house pays out 3x

        let snap = metrics.snapshot();
        assert_eq!(snap.sessions_started, 2);
        assert_eq!(snap.sessions_settled, 2);
        assert_eq!(snap.chips_staked, 200);
        assert_eq!(snap.chips_paid_out, 300);
        assert_eq!(snap.house_take, 100 - 200);
    }

    #[test]
    fn test_transfer_tax_counts_toward_house() {
        let metrics = EngineMetrics::new();
        metrics.record_transfer(10);
        metrics.record_transfer(5);
        let snap = metrics.snapshot();
        assert_eq!(snap.transfers, 2);
        assert_eq!(snap.house_take, 15);
    }
}
