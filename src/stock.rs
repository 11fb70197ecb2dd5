//! Finite-stock allocator and rotating daily shop.
//!
//! Stock is keyed by `(catalog_day, item)`. Allocation is one conditional
//! compare-and-decrement under the entry's guard: with N buyers racing on S
//! remaining units, exactly S succeed and the rest get `OutOfStock`.
//!
//! The daily catalog draws a fixed number of distinct items by rarity
//! weight, rolls per-rarity stock quantities, discounts every shop price to
//! a fraction of the item's base price and marks one slot as the deal of
//! the day at a further discount.

use crate::config::ShopConfig;
use crate::errors::{EngineError, EngineResult};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Mythical,
    Legendary,
}

impl Rarity {
    /// Relative weight of each rarity when rolling a catalog slot.
    pub fn weight(&self) -> u32 {
        match self {
            Rarity::Common => 45,
            Rarity::Rare => 30,
            Rarity::Epic => 17,
            Rarity::Mythical => 8,
            Rarity::Legendary => 6,
        }
    }

    /// Inclusive stock window rolled per listed item.
    pub fn stock_range(&self) -> (u64, u64) {
        match self {
            Rarity::Common => (7, 10),
            Rarity::Rare => (3, 6),
            Rarity::Epic => (4, 6),
            Rarity::Mythical => (2, 3),
            Rarity::Legendary => (1, 1),
        }
    }

    const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Mythical,
        Rarity::Legendary,
    ];
}

pub struct CatalogItem {
    pub name: &'static str,
    pub base_price: u64,
    pub rarity: Rarity,
}

macro_rules! item {
    ($name:literal, $price:literal, $rarity:ident) => {
        CatalogItem {
            name: $name,
            base_price: $price,
            rarity: Rarity::$rarity,
        }
    };
}

/// Every item the shop can list.
pub static ITEM_CATALOG: &[CatalogItem] = &[
    item!("Paper", 5, Common),
    item!("Old newspaper", 8, Common),
    item!("Wool", 10, Common),
    item!("Metal piece", 10, Common),
    item!("Rotten wood", 9, Common),
    item!("Plastic", 4, Common),
    item!("Razor blade", 6, Common),
    item!("Half-used Spray can", 5, Common),
    item!("Stick", 8, Common),
    item!("Wood", 15, Rare),
    item!("Smooth stone", 14, Rare),
    item!("String", 20, Rare),
    item!("Low-quality gunpowder", 30, Rare),
    item!("Magnifying glass", 25, Rare),
    item!("Adhesive tape", 18, Rare),
    item!("Bullets 9 mm", 20, Rare),
    item!("Metal parts", 25, Rare),
    item!("Steel plate", 180, Epic),
    item!("Worn axe head", 200, Epic),
    item!("Refined gunpowder", 250, Epic),
    item!("Basic weapon sight", 190, Epic),
    item!("Leather", 130, Epic),
    item!("Bullets 223 Remington", 180, Epic),
    item!("Carbon fiber", 700, Mythical),
    item!("Advanced weapon sight", 1000, Mythical),
    item!("Bullets 308 Winchester", 850, Mythical),
    item!("Sword handle", 1200, Mythical),
    item!("Sharp rock", 1300, Mythical),
    item!("Advanced thread", 1000, Mythical),
    item!("Old zippo", 3500, Mythical),
    item!("Strong leather", 2800, Mythical),
    item!("Kami", 9000, Legendary),
    item!("Tsuka", 1400, Legendary),
    item!("Military weapon magazine", 23000, Legendary),
    item!("Strong wood", 15000, Legendary),
    item!("Rolled steel", 20000, Legendary),
    item!("Bullets 7-62x39 mm", 70000, Legendary),
    item!("Crafting book", 30000, Legendary),
    item!("Tesseract", 100000, Legendary),
    item!("Golden ant", 90000, Legendary),
];

/// Name-keyed index over [`ITEM_CATALOG`], for base-price lookups outside
/// the daily listing.
pub static CATALOG_BY_NAME: Lazy<HashMap<&'static str, &'static CatalogItem>> =
    Lazy::new(|| ITEM_CATALOG.iter().map(|item| (item.name, item)).collect());

#[derive(Debug, Clone, Serialize)]
pub struct StockEntry {
    pub unit_price: u64,
    pub remaining: u64,
    pub rarity: Rarity,
    pub deal_of_the_day: bool,
}

/// One row of a catalog listing.
#[derive(Debug, Clone, Serialize)]
pub struct ListedItem {
    pub item: String,
    pub unit_price: u64,
    pub remaining: u64,
    pub rarity: Rarity,
    pub deal_of_the_day: bool,
}

#[derive(Debug, Default)]
pub struct StockAllocator {
    entries: DashMap<(String, String), StockEntry>,
    /// Day -> item names listed that day, in slot order.
    days: DashMap<String, Vec<String>>,
}

impl StockAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate the catalog for `day` if it does not exist yet. The entry
    /// guard on the day key makes generation race-free: one caller builds
    /// it, the rest see the finished listing.
    pub fn ensure_catalog(&self, day: &str, config: &ShopConfig, rng: &mut impl Rng) {
        if self.days.contains_key(day) {
            return;
        }
        self.days
            .entry(day.to_string())
            .or_insert_with(|| self.generate_catalog(day, config, rng));
    }

    fn generate_catalog(&self, day: &str, config: &ShopConfig, rng: &mut impl Rng) -> Vec<String> {
        let slots = config.slots.min(ITEM_CATALOG.len());
        let mut chosen: Vec<&CatalogItem> = Vec::with_capacity(slots);
        // rarity-weighted draws, retrying collisions; the pool is far
        // larger than the slot count so this terminates fast
        while chosen.len() < slots {
            let rarity = roll_rarity(rng);
            let pool: Vec<&CatalogItem> = ITEM_CATALOG
                .iter()
                .filter(|i| i.rarity == rarity && !chosen.iter().any(|c| c.name == i.name))
                .collect();
            if let Some(item) = pool.get(rng.gen_range(0..pool.len().max(1))) {
                chosen.push(item);
            }
        }
        let deal_slot = rng.gen_range(0..slots);
        let mut listing = Vec::with_capacity(slots);
        for (slot, item) in chosen.iter().enumerate() {
            let (min_stock, max_stock) = item.rarity.stock_range();
            let remaining = rng.gen_range(min_stock..=max_stock);
            let mut unit_price = price_ceil(item.base_price, config.price_factor);
            let deal = slot == deal_slot;
            if deal {
                unit_price = price_ceil(unit_price, config.deal_discount);
            }
            self.entries.insert(
                (day.to_string(), item.name.to_string()),
                StockEntry {
                    unit_price,
                    remaining,
                    rarity: item.rarity,
                    deal_of_the_day: deal,
                },
            );
            listing.push(item.name.to_string());
        }
        info!(day, slots, "shop catalog generated");
        listing
    }

    /// The day's listing in slot order, `None` if that day was never rolled.
    pub fn catalog(&self, day: &str) -> Option<Vec<ListedItem>> {
        let listing = self.days.get(day)?;
        Some(
            listing
                .iter()
                .filter_map(|item| {
                    let entry = self.entries.get(&(day.to_string(), item.clone()))?;
                    Some(ListedItem {
                        item: item.clone(),
                        unit_price: entry.unit_price,
                        remaining: entry.remaining,
                        rarity: entry.rarity,
                        deal_of_the_day: entry.deal_of_the_day,
                    })
                })
                .collect(),
        )
    }

    /// Atomically take `qty` units; returns the unit price. The availability
    /// check and the decrement share one entry guard.
    pub fn allocate(&self, day: &str, item: &str, qty: u64) -> EngineResult<u64> {
        let mut entry = self
            .entries
            .get_mut(&(day.to_string(), item.to_string()))
            .ok_or_else(|| EngineError::OutOfStock(format!("{} is not listed on {}", item, day)))?;
        if entry.remaining < qty {
            return Err(EngineError::OutOfStock(format!(
                "{} has {} left, wanted {}",
                item, entry.remaining, qty
            )));
        }
        entry.remaining -= qty;
        debug!(day, item, qty, remaining = entry.remaining, "stock allocated");
        Ok(entry.unit_price)
    }

    /// Return units taken by a purchase whose payment step failed.
    pub fn restock(&self, day: &str, item: &str, qty: u64) {
        if let Some(mut entry) = self.entries.get_mut(&(day.to_string(), item.to_string())) {
            entry.remaining += qty;
            debug!(day, item, qty, "stock restored");
        }
    }

    pub fn remaining(&self, day: &str, item: &str) -> u64 {
        self.entries
            .get(&(day.to_string(), item.to_string()))
            .map(|e| e.remaining)
            .unwrap_or(0)
    }

    /// Drop catalogs older than `cutoff_day` (ISO dates order lexically).
    pub fn prune_before(&self, cutoff_day: &str) {
        self.days.retain(|day, _| day.as_str() >= cutoff_day);
        self.entries.retain(|(day, _), _| day.as_str() >= cutoff_day);
    }
}

fn roll_rarity(rng: &mut impl Rng) -> Rarity {
    let total: u32 = Rarity::ALL.iter().map(|r| r.weight()).sum();
    let mut pick = rng.gen_range(0..total);
    for rarity in Rarity::ALL {
        if pick < rarity.weight() {
            return rarity;
        }
        pick -= rarity.weight();
    }
    Rarity::Common
}

fn price_ceil(base: u64, factor: f64) -> u64 {
    (base as f64 * factor).ceil() as u64
}
