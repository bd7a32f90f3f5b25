#![allow(dead_code)]

use grotto_core::{Address, Amount, EngineConfig, ManualClock};
use grotto_engine::{CommittedSeed, CreatePot, Grotto, PoolParams};
use grotto_core::GuessComparison;
use std::sync::Arc;

pub const START: i64 = 1_700_000_000;

pub struct Harness {
    pub grotto: Grotto,
    pub clock: Arc<ManualClock>,
    pub operator: Address,
    pub creator: Address,
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default(), [42u8; 32])
}

pub fn harness_with(config: EngineConfig, seed: [u8; 32]) -> Harness {
    let clock = Arc::new(ManualClock::new(START));
    let grotto = Grotto::new(config, Arc::new(CommittedSeed::new(seed)), clock.clone()).unwrap();
    let operator = addr("operator");
    grotto.bootstrap(&operator);

    Harness {
        grotto,
        clock,
        operator,
        creator: addr("creator"),
    }
}

pub fn addr(name: &str) -> Address {
    Address::from(name)
}

pub fn units(n: u64) -> Amount {
    Amount::from_units(n)
}

pub fn players(n: usize) -> Vec<Address> {
    (1..=n).map(|i| Address::new(format!("player{}", i))).collect()
}

pub fn pot_request(max: u32, bet: u64, target: &[u32], comparison: GuessComparison) -> CreatePot {
    CreatePot {
        params: PoolParams::count_based(max, units(bet)),
        winning_numbers: target.to_vec(),
        comparison,
    }
}
