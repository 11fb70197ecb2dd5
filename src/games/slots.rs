//! Slot machines.
//!
//! Four machines with fixed costs and paytables. One spin fills a 3x3 grid
//! with uniform draws; every three-in-a-row line (rows, columns, diagonals)
//! pays `cost * payout[symbol]`, and the machine's jackpot symbol overrides
//! its own line payout with the jackpot multiplier.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineKind {
    Basic,
    Advanced,
    Luxury,
    Ultimate,
}

pub struct Machine {
    pub name: &'static str,
    pub cost: u64,
    pub symbols: [&'static str; 6],
    pub payouts: [u64; 6],
    pub jackpot_symbol: usize,
    pub jackpot_multiplier: u64,
}

static BASIC: Machine = Machine {
    name: "Basic Slot Machine",
    cost: 250,
    symbols: ["chocolate", "charred_orange", "marshmallow", "banana_peel", "corn_kernel", "potato"],
    payouts: [2, 2, 3, 3, 5, 5],
    jackpot_symbol: 5,
    jackpot_multiplier: 100,
};

static ADVANCED: Machine = Machine {
    name: "Advanced Slot Machine",
    cost: 3200,
    symbols: ["lolly", "candy_wrapper", "donut", "candy", "popsicle", "lollipop"],
    payouts: [3, 6, 9, 13, 24, 40],
    jackpot_symbol: 5,
    jackpot_multiplier: 180,
};

static LUXURY: Machine = Machine {
    name: "Luxury Slot Machine",
    cost: 6000,
    symbols: ["banana", "apple", "strawberry", "orange", "coconut", "lemon"],
    payouts: [4, 6, 10, 20, 25, 30],
    jackpot_symbol: 5,
    jackpot_multiplier: 200,
};

static ULTIMATE: Machine = Machine {
    name: "Ultimate Slot Machine",
    cost: 100_000,
    symbols: ["peach", "pineapple", "cloudberry", "raspberry", "grape", "cherry"],
    payouts: [6, 9, 11, 21, 24, 70],
    jackpot_symbol: 5,
    jackpot_multiplier: 120,
};

impl MachineKind {
    pub const ALL: [MachineKind; 4] = [
        MachineKind::Basic,
        MachineKind::Advanced,
        MachineKind::Luxury,
        MachineKind::Ultimate,
    ];

    pub fn machine(&self) -> &'static Machine {
        match self {
            MachineKind::Basic => &BASIC,
            MachineKind::Advanced => &ADVANCED,
            MachineKind::Luxury => &LUXURY,
            MachineKind::Ultimate => &ULTIMATE,
        }
    }

    pub fn cost(&self) -> u64 {
        self.machine().cost
    }

    /// Machine whose spin costs exactly this much.
    pub fn for_cost(cost: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.cost() == cost)
    }
}

const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

#[derive(Debug, Clone, Serialize)]
pub struct SpinResult {
    /// Symbol index per `[row][column]`.
    pub grid: [[u8; 3]; 3],
    /// Total chips returned.
    pub winnings: u64,
    pub jackpot: bool,
}

/// Spin the machine and score every line.
pub fn spin(kind: MachineKind, rng: &mut impl Rng) -> SpinResult {
    let machine = kind.machine();
    let mut grid = [[0u8; 3]; 3];
    for row in &mut grid {
        for cell in row.iter_mut() {
            *cell = rng.gen_range(0..machine.symbols.len()) as u8;
        }
    }
    let (winnings, jackpot) = score(machine, &grid);
    SpinResult { grid, winnings, jackpot }
}

pub fn score(machine: &Machine, grid: &[[u8; 3]; 3]) -> (u64, bool) {
    let mut winnings = 0u64;
    let mut jackpot = false;
    for line in &LINES {
        let [a, b, c] = [
            grid[line[0].0][line[0].1],
            grid[line[1].0][line[1].1],
            grid[line[2].0][line[2].1],
        ];
        if a == b && b == c {
            let symbol = a as usize;
            let multiplier = if symbol == machine.jackpot_symbol {
                jackpot = true;
                machine.jackpot_multiplier
            } else {
                machine.payouts[symbol]
            };
            winnings += machine.cost * multiplier;
        }
    }
    (winnings, jackpot)
}
