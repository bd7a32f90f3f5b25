//! Custodial balance for all pools of one deployment.
//!
//! Stakes credit custody. Payouts move value from custody to a payee's
//! withdrawable balance. Withdrawals take it out of the engine.

use crate::error::{CoreError, Result};
use crate::types::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Stake,
    Payout,
    Withdrawal,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Stake => "stake",
            EntryKind::Payout => "payout",
            EntryKind::Withdrawal => "withdrawal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub account: Address,
    pub wager_id: Option<u64>,
    pub amount: Amount,
    pub timestamp: i64,
}

/// A value movement requested by an engine as part of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Stake { from: Address, amount: Amount },
    Payout { to: Address, amount: Amount },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Escrow {
    custody: Amount,
    balances: BTreeMap<Address, Amount>,
    entries: Vec<EscrowEntry>,
}

impl Escrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        custody: Amount,
        balances: BTreeMap<Address, Amount>,
        entries: Vec<EscrowEntry>,
    ) -> Self {
        Self {
            custody,
            balances,
            entries,
        }
    }

    pub fn custody(&self) -> Amount {
        self.custody
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    pub fn balances(&self) -> &BTreeMap<Address, Amount> {
        &self.balances
    }

    pub fn entries(&self) -> &[EscrowEntry] {
        &self.entries
    }

    /// Checks that `transfers` can be applied in order without custody
    /// going negative or any balance overflowing.
    pub fn check(&self, transfers: &[Transfer]) -> Result<()> {
        let mut custody = self.custody;
        let mut credited: BTreeMap<&Address, Amount> = BTreeMap::new();
        for transfer in transfers {
            match transfer {
                Transfer::Stake { amount, .. } => {
                    custody = custody
                        .checked_add(*amount)
                        .ok_or_else(|| CoreError::internal("Custody overflow"))?;
                }
                Transfer::Payout { to, amount } => {
                    custody = custody.checked_sub(*amount).ok_or(
                        CoreError::InsufficientCustody {
                            need: *amount,
                            available: custody,
                        },
                    )?;
                    let balance = credited.entry(to).or_insert_with(|| self.balance_of(to));
                    *balance = balance
                        .checked_add(*amount)
                        .ok_or_else(|| CoreError::internal("Balance overflow"))?;
                }
            }
        }
        Ok(())
    }

    /// Applies transfers already validated by [`Escrow::check`].
    pub(crate) fn apply(&mut self, wager_id: u64, transfers: Vec<Transfer>, timestamp: i64) {
        for transfer in transfers {
            match transfer {
                Transfer::Stake { from, amount } => {
                    self.custody += amount;
                    self.record(EntryKind::Stake, from, Some(wager_id), amount, timestamp);
                }
                Transfer::Payout { to, amount } => {
                    self.custody -= amount;
                    *self.balances.entry(to.clone()).or_insert(Amount::ZERO) += amount;
                    self.record(EntryKind::Payout, to, Some(wager_id), amount, timestamp);
                }
            }
        }
    }

    pub(crate) fn withdraw(&mut self, account: &Address, timestamp: i64) -> Result<Amount> {
        let amount = self.balance_of(account);
        if amount.is_zero() {
            return Err(CoreError::NothingToWithdraw(account.clone()));
        }

        self.balances.remove(account);
        self.record(EntryKind::Withdrawal, account.clone(), None, amount, timestamp);
        Ok(amount)
    }

    fn record(
        &mut self,
        kind: EntryKind,
        account: Address,
        wager_id: Option<u64>,
        amount: Amount,
        timestamp: i64,
    ) {
        self.entries.push(EscrowEntry {
            id: Uuid::new_v4(),
            kind,
            account,
            wager_id,
            amount,
            timestamp,
        });
    }
}
