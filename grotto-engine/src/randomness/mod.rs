pub mod scheme;

pub use scheme::{CommitmentScheme, SeedCommitment, Sha256Commitment};

use crate::{Result, WagerError};
use grotto_core::Address;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Picks a winner index among registered participants.
///
/// Implementations must be deterministic for a given seed, wager and
/// participant list so that every draw can be replayed.
pub trait RandomnessProvider: Send + Sync {
    /// Hex commitment to the seed behind every draw.
    fn commitment(&self) -> String;

    /// Index into `participants`, uniform over its length.
    fn select(&self, wager_id: u64, participants: &[Address]) -> Result<u64>;
}

/// Randomness derived from a secret seed the operator committed to up front.
pub struct CommittedSeed {
    seed: [u8; 32],
    commitment: SeedCommitment,
}

impl CommittedSeed {
    pub fn new(seed: [u8; 32]) -> Self {
        let commitment = Sha256Commitment::commit(&seed);
        Self { seed, commitment }
    }

    /// Fresh seed from the thread RNG
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::new(seed)
    }

    pub fn from_hex(seed: &str) -> Result<Self> {
        let bytes = hex::decode(seed)
            .map_err(|e| WagerError::invalid(format!("Seed is not valid hex: {}", e)))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| WagerError::invalid("Seed must be 32 bytes"))?;
        Ok(Self::new(seed))
    }

    pub fn seed_hex(&self) -> String {
        hex::encode(self.seed)
    }

    pub fn verify(&self, commitment: &SeedCommitment) -> bool {
        Sha256Commitment::verify(commitment, &self.seed)
    }
}

impl std::fmt::Debug for CommittedSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommittedSeed")
            .field("commitment", &self.commitment.to_hex())
            .finish()
    }
}

impl RandomnessProvider for CommittedSeed {
    fn commitment(&self) -> String {
        self.commitment.to_hex()
    }

    fn select(&self, wager_id: u64, participants: &[Address]) -> Result<u64> {
        if participants.is_empty() {
            return Err(WagerError::invalid("Cannot draw from zero participants"));
        }
        Ok(draw_index(&self.seed, wager_id, participants))
    }
}

/// `SHA-256(seed || id || players)` reduced modulo the participant count.
pub fn draw_index(seed: &[u8], wager_id: u64, participants: &[Address]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(wager_id.to_be_bytes());
    for participant in participants {
        hasher.update((participant.as_str().len() as u64).to_be_bytes());
        hasher.update(participant.as_str().as_bytes());
    }
    let digest = hasher.finalize();

    let mut word = [0u8; 16];
    word.copy_from_slice(&digest[..16]);
    (u128::from_be_bytes(word) % participants.len() as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players(n: usize) -> Vec<Address> {
        (0..n).map(|i| Address::new(format!("player{}", i))).collect()
    }

    #[test]
    fn test_commitment_scheme() {
        let seed = CommittedSeed::generate();
        let commitment = Sha256Commitment::commit(&hex::decode(seed.seed_hex()).unwrap());

        assert!(seed.verify(&commitment));
        assert_eq!(seed.commitment(), commitment.to_hex());
        assert!(!Sha256Commitment::verify(&commitment, b"wrong seed"));
    }

    #[test]
    fn test_draw_is_reproducible() {
        let seed = CommittedSeed::new([7u8; 32]);
        let players = players(5);

        let first = seed.select(42, &players).unwrap();
        let again = seed.select(42, &players).unwrap();
        assert_eq!(first, again);
        assert!(first < 5);
        assert_eq!(first, draw_index(&[7u8; 32], 42, &players));
    }

    #[test]
    fn test_draw_covers_every_index() {
        let seed = CommittedSeed::new([1u8; 32]);
        let players = players(3);
        let mut seen = [false; 3];
        for id in 0..200 {
            seen[seed.select(id, &players).unwrap() as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_seed_hex_round_trip_and_validation() {
        let seed = CommittedSeed::new([9u8; 32]);
        let restored = CommittedSeed::from_hex(&seed.seed_hex()).unwrap();
        assert_eq!(seed.commitment(), restored.commitment());

        assert!(CommittedSeed::from_hex("zz").is_err());
        assert!(CommittedSeed::from_hex("abcd").is_err());
        assert!(seed.select(1, &[]).is_err());
    }
}
