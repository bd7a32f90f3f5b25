//! Single entry point over the three engines.
//!
//! Every public call is one serialized transaction: the role registry is
//! read-locked, then the ledger write-locked, for the whole call. Lock order
//! is always roles before ledger.

use crate::lotto::LottoEngine;
use crate::pool::{Call, PoolParams};
use crate::pot::{CreatePot, PotEngine};
use crate::query::Reader;
use crate::randomness::RandomnessProvider;
use crate::settlement::Settlement;
use crate::single_winner::SingleWinnerPotEngine;
use crate::{Result, WagerError};
use grotto_core::{
    Address, Amount, Clock, EngineConfig, Ledger, PoolStatus, PotKind, Role, RoleRegistry,
    Scope, WagerKind,
};
use parking_lot::RwLock;
use std::sync::Arc;

pub const FACADE_ADDRESS: &str = "grotto";
pub const LOTTO_ENGINE_ADDRESS: &str = "grotto-lotto";
pub const POT_ENGINE_ADDRESS: &str = "grotto-pot";
pub const SINGLE_WINNER_ENGINE_ADDRESS: &str = "grotto-single-winner-pot";

const ENGINE_SCOPES: [Scope; 3] = [Scope::Lotto, Scope::Pot, Scope::SingleWinnerPot];

pub struct Grotto {
    address: Address,
    config: Arc<EngineConfig>,
    ledger: Arc<RwLock<Ledger>>,
    roles: Arc<RwLock<RoleRegistry>>,
    clock: Arc<dyn Clock>,
    randomness: Arc<dyn RandomnessProvider>,
    lotto: LottoEngine,
    pot: PotEngine,
    single_winner: SingleWinnerPotEngine,
}

impl Grotto {
    /// Fresh deployment with an empty ledger and no grants.
    pub fn new(
        config: EngineConfig,
        randomness: Arc<dyn RandomnessProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::with_state(config, randomness, clock, Ledger::new(), RoleRegistry::new())
    }

    /// Deployment over previously persisted state.
    pub fn with_state(
        config: EngineConfig,
        randomness: Arc<dyn RandomnessProvider>,
        clock: Arc<dyn Clock>,
        ledger: Ledger,
        roles: RoleRegistry,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        Ok(Self {
            address: Address::from(FACADE_ADDRESS),
            lotto: LottoEngine::new(
                Address::from(LOTTO_ENGINE_ADDRESS),
                config.clone(),
                randomness.clone(),
            ),
            pot: PotEngine::new(
                Address::from(POT_ENGINE_ADDRESS),
                PotKind::MultiWinner,
                config.clone(),
            ),
            single_winner: SingleWinnerPotEngine::new(
                Address::from(SINGLE_WINNER_ENGINE_ADDRESS),
                config.clone(),
            ),
            config,
            ledger: Arc::new(RwLock::new(ledger)),
            roles: Arc::new(RwLock::new(roles)),
            clock,
            randomness,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> Arc<RwLock<Ledger>> {
        self.ledger.clone()
    }

    pub fn roles(&self) -> Arc<RwLock<RoleRegistry>> {
        self.roles.clone()
    }

    pub fn reader(&self) -> Reader {
        Reader::new(self.ledger.clone())
    }

    /// Engine clock, unix seconds.
    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Hex commitment to the draw seed, publishable before any lotto settles.
    pub fn seed_commitment(&self) -> String {
        self.randomness.commitment()
    }

    /// Full deployment grant set: the facade may create, play and administer
    /// on every engine scope, each engine administers the ledger, and
    /// `operator` administers everything. Returns the number of new grants.
    pub fn bootstrap(&self, operator: &Address) -> usize {
        let mut roles = self.roles.write();
        let mut granted = 0;

        for scope in ENGINE_SCOPES {
            for role in [Role::Creator, Role::Player, Role::Admin] {
                granted += roles.grant(scope, role, self.address.clone()) as usize;
            }
            granted += roles.grant(scope, Role::Admin, operator.clone()) as usize;
        }

        for engine in [
            self.lotto.address(),
            self.pot.address(),
            self.single_winner.address(),
        ] {
            granted += roles.grant(Scope::Ledger, Role::Admin, engine.clone()) as usize;
        }
        granted += roles.grant(Scope::Ledger, Role::Admin, operator.clone()) as usize;

        tracing::info!("Bootstrapped deployment for {} ({} new grants)", operator, granted);
        granted
    }

    pub fn grant_creator(&self, sender: &Address, scope: Scope, address: &Address) -> Result<bool> {
        self.grant(sender, scope, Role::Creator, address)
    }

    pub fn grant_player(&self, sender: &Address, scope: Scope, address: &Address) -> Result<bool> {
        self.grant(sender, scope, Role::Player, address)
    }

    pub fn grant_admin(&self, sender: &Address, scope: Scope, address: &Address) -> Result<bool> {
        self.grant(sender, scope, Role::Admin, address)
    }

    fn grant(&self, sender: &Address, scope: Scope, role: Role, address: &Address) -> Result<bool> {
        let mut roles = self.roles.write();
        roles.require(scope, Role::Admin, sender)?;
        Ok(roles.grant(scope, role, address.clone()))
    }

    pub fn create_lotto(&self, sender: &Address, params: PoolParams) -> Result<u64> {
        self.transact(sender, |ledger, call| self.lotto.create(ledger, call, params))
    }

    pub fn play_lotto(&self, sender: &Address, id: u64, value: Amount) -> Result<PoolStatus> {
        self.transact(sender, |ledger, call| self.lotto.play(ledger, call, id, value))
    }

    pub fn create_pot(&self, sender: &Address, request: CreatePot, kind: PotKind) -> Result<u64> {
        self.transact(sender, |ledger, call| match kind {
            PotKind::MultiWinner => self.pot.create(ledger, call, request),
            PotKind::SingleWinner => self.single_winner.create(ledger, call, request),
        })
    }

    pub fn play_pot(
        &self,
        sender: &Address,
        id: u64,
        guess: Vec<u32>,
        value: Amount,
    ) -> Result<PoolStatus> {
        self.transact(sender, |ledger, call| {
            self.pot.play(ledger, call, id, guess, value)
        })
    }

    pub fn play_single_winner_pot(
        &self,
        sender: &Address,
        id: u64,
        guess: Vec<u32>,
        value: Amount,
    ) -> Result<PoolStatus> {
        self.transact(sender, |ledger, call| {
            self.single_winner.play(ledger, call, id, guess, value)
        })
    }

    pub fn end(&self, sender: &Address, id: u64) -> Result<Settlement> {
        self.transact(sender, |ledger, call| match kind_of(ledger, id)? {
            WagerKind::Lotto => self.lotto.end(ledger, call, id),
            WagerKind::Pot => self.pot.end(ledger, call, id),
            WagerKind::SingleWinnerPot => self.single_winner.end(ledger, call, id),
        })
    }

    pub fn force_end(&self, sender: &Address, id: u64) -> Result<Settlement> {
        self.transact(sender, |ledger, call| match kind_of(ledger, id)? {
            WagerKind::Lotto => self.lotto.force_end(ledger, call, id),
            WagerKind::Pot => self.pot.force_end(ledger, call, id),
            WagerKind::SingleWinnerPot => self.single_winner.force_end(ledger, call, id),
        })
    }

    pub fn find_winner(&self, sender: &Address, id: u64) -> Result<Settlement> {
        self.transact(sender, |ledger, call| match kind_of(ledger, id)? {
            WagerKind::Lotto => self.lotto.find_winner(ledger, call, id),
            WagerKind::Pot => self.pot.find_winner(ledger, call, id),
            WagerKind::SingleWinnerPot => self.single_winner.find_winner(ledger, call, id),
        })
    }

    pub fn claim(&self, sender: &Address, id: u64) -> Result<Amount> {
        self.transact(sender, |ledger, call| match kind_of(ledger, id)? {
            WagerKind::Lotto => self.lotto.claim(ledger, call, id),
            WagerKind::Pot => self.pot.claim(ledger, call, id),
            WagerKind::SingleWinnerPot => self.single_winner.claim(ledger, call, id),
        })
    }

    pub fn claim_creator(&self, sender: &Address, id: u64) -> Result<Amount> {
        self.transact(sender, |ledger, call| match kind_of(ledger, id)? {
            WagerKind::Lotto => self.lotto.claim_creator(ledger, call, id),
            WagerKind::Pot => self.pot.claim_creator(ledger, call, id),
            WagerKind::SingleWinnerPot => self.single_winner.claim_creator(ledger, call, id),
        })
    }

    pub fn claim_platform(&self, sender: &Address, id: u64) -> Result<Amount> {
        self.transact(sender, |ledger, call| match kind_of(ledger, id)? {
            WagerKind::Lotto => self.lotto.claim_platform(ledger, call, id),
            WagerKind::Pot => self.pot.claim_platform(ledger, call, id),
            WagerKind::SingleWinnerPot => self.single_winner.claim_platform(ledger, call, id),
        })
    }

    /// Pays out everything `sender` has accumulated from claims.
    pub fn withdraw(&self, sender: &Address) -> Result<Amount> {
        let now = self.clock.now();
        let mut ledger = self.ledger.write();
        Ok(ledger.withdraw(sender, now)?)
    }

    fn transact<T>(
        &self,
        sender: &Address,
        op: impl FnOnce(&mut Ledger, &Call<'_>) -> Result<T>,
    ) -> Result<T> {
        let roles = self.roles.read();
        let mut ledger = self.ledger.write();
        let call = Call {
            principal: &self.address,
            sender,
            roles: &*roles,
            now: self.clock.now(),
        };

        let result = op(&mut *ledger, &call);
        if let Err(err) = &result {
            tracing::debug!("Call by {} rejected: {}", sender, err);
        }
        result
    }
}

fn kind_of(ledger: &Ledger, id: u64) -> Result<WagerKind> {
    ledger.kind_of(id).ok_or(WagerError::NotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::randomness::CommittedSeed;
    use grotto_core::ManualClock;

    fn grotto() -> Grotto {
        Grotto::new(
            EngineConfig::default(),
            Arc::new(CommittedSeed::new([0u8; 32])),
            Arc::new(ManualClock::new(1_000)),
        )
        .unwrap()
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let grotto = grotto();
        let operator = Address::from("operator");
        assert_eq!(grotto.bootstrap(&operator), 16);
        assert_eq!(grotto.bootstrap(&operator), 0);

        let roles = grotto.roles();
        let roles = roles.read();
        assert!(roles.has(Scope::Ledger, Role::Admin, &Address::from(LOTTO_ENGINE_ADDRESS)));
        assert!(roles.has(Scope::Pot, Role::Player, grotto.address()));
    }

    #[test]
    fn test_grants_need_admin_on_scope() {
        let grotto = grotto();
        let operator = Address::from("operator");
        let alice = Address::from("alice");
        grotto.bootstrap(&operator);

        assert!(matches!(
            grotto.grant_admin(&alice, Scope::Lotto, &alice),
            Err(WagerError::Unauthorized { .. })
        ));
        assert!(grotto.grant_admin(&operator, Scope::Lotto, &alice).unwrap());
        assert!(!grotto.grant_admin(&operator, Scope::Lotto, &alice).unwrap());
        assert!(grotto.grant_creator(&alice, Scope::Lotto, &alice).unwrap());
    }

    #[test]
    fn test_calls_fail_before_bootstrap() {
        let grotto = grotto();
        let result = grotto.create_lotto(
            &Address::from("alice"),
            PoolParams::count_based(2, Amount::from_units(1)),
        );
        assert!(matches!(
            result,
            Err(WagerError::Unauthorized {
                role: Role::Creator,
                ..
            })
        ));
    }

    #[test]
    fn test_dispatch_by_stored_kind() {
        let grotto = grotto();
        grotto.bootstrap(&Address::from("operator"));
        let alice = Address::from("alice");

        let id = grotto
            .create_lotto(&alice, PoolParams::count_based(2, Amount::from_units(5)))
            .unwrap();
        let result = grotto.play_pot(&Address::from("bob"), id, vec![1], Amount::from_units(5));
        assert!(matches!(result, Err(WagerError::WrongKind { .. })));
        assert!(matches!(
            grotto.claim(&alice, 99),
            Err(WagerError::NotFound(99))
        ));
    }
}
