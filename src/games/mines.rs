//! Mines board and its hypergeometric multiplier.
//!
//! An `n x n` grid hides `m` mines. Each safe reveal bumps the cash-out
//! multiplier; hitting a mine forfeits the stake. The multiplier for `k`
//! gems is `edge * C(n^2, k) / C(n^2 - m, k)`, rounded to two decimals, and
//! is strictly increasing in `k`.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Supported grid sides with their inclusive mine-count windows.
pub const GRID_OPTIONS: [(u8, u8, u8); 2] = [(3, 1, 8), (4, 1, 15)];

pub const DEFAULT_SIDE: u8 = 3;
pub const DEFAULT_MINES: u8 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinesBoard {
    pub side: u8,
    pub mines: u8,
    /// Bit `i` set means cell `i` hides a mine. Populated by [`arm`].
    mine_mask: u32,
    pub revealed_mask: u32,
    pub gems: u8,
    pub armed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Mine,
    Gem { gems: u8 },
    AlreadyRevealed,
}

impl Default for MinesBoard {
    fn default() -> Self {
        Self {
            side: DEFAULT_SIDE,
            mines: DEFAULT_MINES,
            mine_mask: 0,
            revealed_mask: 0,
            gems: 0,
            armed: false,
        }
    }
}

impl MinesBoard {
    /// Validate the grid parameters against [`GRID_OPTIONS`].
    pub fn configured(side: u8, mines: u8) -> Option<Self> {
        let (_, min_mines, max_mines) =
            *GRID_OPTIONS.iter().find(|(s, _, _)| *s == side)?;
        if !(min_mines..=max_mines).contains(&mines) {
            return None;
        }
        Some(Self {
            side,
            mines,
            mine_mask: 0,
            revealed_mask: 0,
            gems: 0,
            armed: false,
        })
    }

    pub fn cells(&self) -> u8 {
        self.side * self.side
    }

    /// Place the mines. Idempotent once armed.
    pub fn arm(&mut self, rng: &mut impl Rng) {
        if self.armed {
            return;
        }
        let mut positions: Vec<u8> = (0..self.cells()).collect();
        positions.shuffle(rng);
        for &cell in positions.iter().take(self.mines as usize) {
            self.mine_mask |= 1 << cell;
        }
        self.armed = true;
    }

    pub fn is_mine(&self, cell: u8) -> bool {
        self.mine_mask & (1 << cell) != 0
    }

    pub fn reveal(&mut self, cell: u8) -> Option<RevealOutcome> {
        if cell >= self.cells() || !self.armed {
            return None;
        }
        if self.revealed_mask & (1 << cell) != 0 {
            return Some(RevealOutcome::AlreadyRevealed);
        }
        self.revealed_mask |= 1 << cell;
        if self.is_mine(cell) {
            Some(RevealOutcome::Mine)
        } else {
            self.gems += 1;
            Some(RevealOutcome::Gem { gems: self.gems })
        }
    }

    /// Every safe cell has been revealed.
    pub fn cleared(&self) -> bool {
        self.gems == self.cells() - self.mines
    }

    pub fn current_multiplier(&self, edge: f64) -> f64 {
        multiplier(self.side, self.mines, self.gems, edge)
    }
}

fn combinations(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    let mut result = 1.0f64;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// Cash-out multiplier after `gems` safe reveals: 1.0 at zero, otherwise
/// the edged hypergeometric ratio rounded to two decimals.
pub fn multiplier(side: u8, mines: u8, gems: u8, edge: f64) -> f64 {
    if gems == 0 {
        return 1.0;
    }
    let cells = (side as u32) * (side as u32);
    let raw = edge * combinations(cells, gems as u32)
        / combinations(cells - mines as u32, gems as u32);
    (raw * 100.0).round() / 100.0
}

/// Total chips returned on cash-out.
pub fn cash_out(stake: u64, multiplier: f64) -> u64 {
    (stake as f64 * multiplier).floor() as u64
}
