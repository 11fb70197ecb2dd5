//! Wheel of fortune.
//!
//! Twelve fixed segments, weighted by duplication rather than explicit
//! weights. One uniform draw; win segments credit their face value.

use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Segment {
    pub label: &'static str,
    /// Chips credited when the wheel stops here; zero for the blank.
    pub value: u64,
}

pub const SEGMENTS: [Segment; 12] = [
    Segment { label: "100", value: 100 },
    Segment { label: "500", value: 500 },
    Segment { label: "200", value: 200 },
    Segment { label: "1000", value: 1000 },
    Segment { label: "300", value: 300 },
    Segment { label: "JACKPOT", value: 5000 },
    Segment { label: "100", value: 100 },
    Segment { label: "500", value: 500 },
    Segment { label: "200", value: 200 },
    Segment { label: "1000", value: 1000 },
    Segment { label: "300", value: 300 },
    Segment { label: "NOTHING", value: 0 },
];

/// Index of the segment the wheel stops on.
pub fn spin(rng: &mut impl Rng) -> usize {
    rng.gen_range(0..SEGMENTS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_segment_table() {
        assert_eq!(SEGMENTS.len(), 12);
        let jackpots = SEGMENTS.iter().filter(|s| s.value == 5000).count();
        assert_eq!(jackpots, 1);
        let blanks = SEGMENTS.iter().filter(|s| s.value == 0).count();
        assert_eq!(blanks, 1);
        // duplication weighting: 100 appears twice as often as the jackpot
        let hundreds = SEGMENTS.iter().filter(|s| s.value == 100).count();
        assert_eq!(hundreds, 2);
    }

    #[test]
    fn test_spin_hits_every_segment() {
        let mut rng = StdRng::seed_from_u64(51);
        let mut seen = [false; 12];
        for _ in 0..2000 {
            seen[spin(&mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
