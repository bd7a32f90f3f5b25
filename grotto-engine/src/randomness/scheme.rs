use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Trait for commitment schemes
pub trait CommitmentScheme {
    type Secret: ?Sized;
    type Commitment;

    fn commit(secret: &Self::Secret) -> Self::Commitment;
    fn verify(commitment: &Self::Commitment, secret: &Self::Secret) -> bool;
}

/// SHA-256 commitment to a draw seed. Publishing it before any draw binds
/// the operator to the seed without revealing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedCommitment {
    hash: Vec<u8>,
}

impl SeedCommitment {
    pub fn from_hash(hash: Vec<u8>) -> Self {
        Self { hash }
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

pub struct Sha256Commitment;

impl CommitmentScheme for Sha256Commitment {
    type Secret = [u8];
    type Commitment = SeedCommitment;

    fn commit(secret: &[u8]) -> SeedCommitment {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        SeedCommitment {
            hash: hasher.finalize().to_vec(),
        }
    }

    fn verify(commitment: &SeedCommitment, secret: &[u8]) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.finalize().as_slice() == commitment.hash
    }
}
