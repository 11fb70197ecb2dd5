//! Scratch tickets.
//!
//! The full 9-cell grid is filled up-front by independent weighted draws,
//! so revealing a cell is purely a view operation. A heavily weighted loser
//! symbol keeps the odds honest. The round ends the moment any payable
//! symbol shows three times, or when the whole grid is revealed.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const GRID_CELLS: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketTier {
    Bronze,
    Silver,
    Gold,
}

pub struct SymbolSpec {
    pub name: &'static str,
    pub weight: u32,
    /// `None` marks the loser symbol.
    pub payout: Option<f64>,
}

pub struct TicketTable {
    pub cost: u64,
    pub symbols: &'static [SymbolSpec],
}

static BRONZE: TicketTable = TicketTable {
    cost: 250,
    symbols: &[
        SymbolSpec { name: "skull", weight: 100, payout: None },
        SymbolSpec { name: "cherry", weight: 40, payout: Some(1.0) },
        SymbolSpec { name: "lemon", weight: 30, payout: Some(2.0) },
        SymbolSpec { name: "orange", weight: 20, payout: Some(5.0) },
        SymbolSpec { name: "bell", weight: 10, payout: Some(10.0) },
        SymbolSpec { name: "diamond", weight: 5, payout: Some(50.0) },
    ],
};

static SILVER: TicketTable = TicketTable {
    cost: 1000,
    symbols: &[
        SymbolSpec { name: "skull", weight: 120, payout: None },
        SymbolSpec { name: "grape", weight: 40, payout: Some(1.5) },
        SymbolSpec { name: "melon", weight: 30, payout: Some(3.0) },
        SymbolSpec { name: "clover", weight: 20, payout: Some(7.0) },
        SymbolSpec { name: "bar", weight: 10, payout: Some(15.0) },
        SymbolSpec { name: "crown", weight: 5, payout: Some(100.0) },
    ],
};

static GOLD: TicketTable = TicketTable {
    cost: 5000,
    symbols: &[
        SymbolSpec { name: "skull", weight: 180, payout: None },
        SymbolSpec { name: "moneybag", weight: 40, payout: Some(2.0) },
        SymbolSpec { name: "star", weight: 30, payout: Some(5.0) },
        SymbolSpec { name: "seven", weight: 20, payout: Some(20.0) },
        SymbolSpec { name: "ring", weight: 10, payout: Some(100.0) },
        SymbolSpec { name: "trophy", weight: 5, payout: Some(500.0) },
    ],
};

impl TicketTier {
    pub const ALL: [TicketTier; 3] = [TicketTier::Bronze, TicketTier::Silver, TicketTier::Gold];

    pub fn table(&self) -> &'static TicketTable {
        match self {
            TicketTier::Bronze => &BRONZE,
            TicketTier::Silver => &SILVER,
            TicketTier::Gold => &GOLD,
        }
    }

    pub fn cost(&self) -> u64 {
        self.table().cost
    }

    /// Tier whose ticket costs exactly this much.
    pub fn for_cost(cost: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.cost() == cost)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchCard {
    pub tier: TicketTier,
    /// Symbol index per cell; empty until dealt.
    pub grid: Vec<u8>,
    /// Bit per revealed cell.
    pub revealed: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RevealOutcome {
    /// Symbol at the cell; the round continues.
    Revealed { symbol: u8 },
    AlreadyRevealed,
    /// Three of a payable symbol: total payout in chips.
    Won { symbol: u8, payout: u64 },
    /// Grid exhausted without a payable triple.
    Exhausted,
}

impl ScratchCard {
    pub fn pending(tier: TicketTier) -> Self {
        Self {
            tier,
            grid: Vec::new(),
            revealed: 0,
        }
    }

    /// Fill all cells by weighted draws. Idempotent once dealt.
    pub fn deal(&mut self, rng: &mut impl Rng) {
        if !self.grid.is_empty() {
            return;
        }
        let table = self.tier.table();
        self.grid = (0..GRID_CELLS)
            .map(|_| weighted_symbol(table, rng))
            .collect();
    }

    pub fn is_dealt(&self) -> bool {
        !self.grid.is_empty()
    }

    fn revealed_count(&self, symbol: u8) -> u8 {
        (0..self.grid.len() as u8)
            .filter(|&cell| {
                self.revealed & (1 << cell) != 0 && self.grid[cell as usize] == symbol
            })
            .count() as u8
    }

    pub fn all_revealed(&self) -> bool {
        self.is_dealt() && self.revealed.count_ones() as usize == self.grid.len()
    }

    /// Reveal one cell and check the end conditions.
    pub fn reveal(&mut self, cell: u8, stake: u64) -> Option<RevealOutcome> {
        if !self.is_dealt() || cell >= self.grid.len() as u8 {
            return None;
        }
        if self.revealed & (1 << cell) != 0 {
            return Some(RevealOutcome::AlreadyRevealed);
        }
        self.revealed |= 1 << cell;
        let symbol = self.grid[cell as usize];
        let table = self.tier.table();
        if let Some(rate) = table.symbols[symbol as usize].payout {
            if self.revealed_count(symbol) == 3 {
                return Some(RevealOutcome::Won {
                    symbol,
                    payout: (stake as f64 * rate).floor() as u64,
                });
            }
        }
        if self.all_revealed() {
            Some(RevealOutcome::Exhausted)
        } else {
            Some(RevealOutcome::Revealed { symbol })
        }
    }

    /// Outcome of revealing the remaining cells in index order, for
    /// settlement on cancel or eviction. Returns the total payout.
    pub fn forced_outcome(&self, stake: u64) -> u64 {
        if !self.is_dealt() {
            return 0;
        }
        let table = self.tier.table();
        let mut counts = [0u8; 8];
        // cells already revealed first, then the rest in order
        let order = (0..self.grid.len() as u8)
            .filter(|&c| self.revealed & (1 << c) != 0)
            .chain((0..self.grid.len() as u8).filter(|&c| self.revealed & (1 << c) == 0));
        for cell in order {
            let symbol = self.grid[cell as usize];
            counts[symbol as usize] += 1;
            if counts[symbol as usize] == 3 {
                if let Some(rate) = table.symbols[symbol as usize].payout {
                    return (stake as f64 * rate).floor() as u64;
                }
            }
        }
        0
    }
}

fn weighted_symbol(table: &TicketTable, rng: &mut impl Rng) -> u8 {
    let total: u32 = table.symbols.iter().map(|s| s.weight).sum();
    let mut pick = rng.gen_range(0..total);
    for (index, spec) in table.symbols.iter().enumerate() {
        if pick < spec.weight {
            return index as u8;
        }
        pick -= spec.weight;
    }
    // unreachable: weights sum to `total`
    (table.symbols.len() - 1) as u8
}
