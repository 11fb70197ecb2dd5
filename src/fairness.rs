//! Provably-fair seed commitments.
//!
//! Each session draws a random server seed at start and publishes only its
//! SHA-256 digest. The seed itself is revealed with the settlement result,
//! so a player can verify after the fact that the commitment was made before
//! any of their choices.

use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub const SEED_BYTES: usize = 32;

/// A server seed together with its published commitment.
#[derive(Debug, Clone, Serialize)]
pub struct SeedCommitment {
    #[serde(skip)]
    seed: [u8; SEED_BYTES],
    /// Hex SHA-256 of the seed, safe to publish at session start.
    pub commitment: String,
}

impl SeedCommitment {
    pub fn generate(rng: &mut impl Rng) -> Self {
        let mut seed = [0u8; SEED_BYTES];
        rng.fill(&mut seed);
        let commitment = hex::encode(Sha256::digest(seed));
        Self { seed, commitment }
    }

    /// Reveal the seed, hex-encoded. Only meaningful once the session has
    /// reached a terminal state.
    pub fn reveal(&self) -> String {
        hex::encode(self.seed)
    }
}

/// Check a revealed seed against a previously published commitment.
pub fn verify(seed_hex: &str, commitment: &str) -> bool {
    match hex::decode(seed_hex) {
        Ok(seed) => hex::encode(Sha256::digest(&seed)) == commitment,
        Err(_) => false,
    }
}
