//! Capability grants per engine scope.
//!
//! Grants are append-only: there is no revocation path.

use crate::error::{CoreError, Result};
use crate::types::{Address, WagerKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The component a capability is granted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    Lotto,
    Pot,
    SingleWinnerPot,
    Ledger,
}

impl Scope {
    pub fn for_kind(kind: WagerKind) -> Self {
        match kind {
            WagerKind::Lotto => Scope::Lotto,
            WagerKind::Pot => Scope::Pot,
            WagerKind::SingleWinnerPot => Scope::SingleWinnerPot,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Lotto => "lotto",
            Scope::Pot => "pot",
            Scope::SingleWinnerPot => "single_winner_pot",
            Scope::Ledger => "ledger",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lotto" => Ok(Scope::Lotto),
            "pot" => Ok(Scope::Pot),
            "single_winner_pot" => Ok(Scope::SingleWinnerPot),
            "ledger" => Ok(Scope::Ledger),
            other => Err(CoreError::config(format!("Unknown scope '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Creator,
    Player,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Player => "player",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "creator" => Ok(Role::Creator),
            "player" => Ok(Role::Player),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::config(format!("Unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub scope: Scope,
    pub role: Role,
    pub address: Address,
}

#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    grants: BTreeSet<(Scope, Role, Address)>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the grant already existed.
    pub fn grant(&mut self, scope: Scope, role: Role, address: Address) -> bool {
        let added = self.grants.insert((scope, role, address.clone()));
        if added {
            tracing::info!("Granted {} on {} to {}", role, scope, address);
        }
        added
    }

    pub fn has(&self, scope: Scope, role: Role, address: &Address) -> bool {
        self.grants.contains(&(scope, role, address.clone()))
    }

    pub fn require(&self, scope: Scope, role: Role, address: &Address) -> Result<()> {
        if self.has(scope, role, address) {
            Ok(())
        } else {
            Err(CoreError::Unauthorized {
                scope,
                role,
                address: address.clone(),
            })
        }
    }

    pub fn grants(&self) -> Vec<Grant> {
        self.grants
            .iter()
            .map(|(scope, role, address)| Grant {
                scope: *scope,
                role: *role,
                address: address.clone(),
            })
            .collect()
    }

    pub fn from_grants(grants: impl IntoIterator<Item = Grant>) -> Self {
        Self {
            grants: grants
                .into_iter()
                .map(|g| (g.scope, g.role, g.address))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants_are_scoped() {
        let mut roles = RoleRegistry::new();
        let facade = Address::from("grotto");

        assert!(roles.grant(Scope::Lotto, Role::Creator, facade.clone()));
        assert!(!roles.grant(Scope::Lotto, Role::Creator, facade.clone()));

        assert!(roles.require(Scope::Lotto, Role::Creator, &facade).is_ok());
        assert!(matches!(
            roles.require(Scope::Pot, Role::Creator, &facade),
            Err(CoreError::Unauthorized {
                scope: Scope::Pot,
                role: Role::Creator,
                ..
            })
        ));
        assert!(!roles.has(Scope::Lotto, Role::Admin, &facade));
    }

    #[test]
    fn test_grants_round_trip_through_list() {
        let mut roles = RoleRegistry::new();
        roles.grant(Scope::Ledger, Role::Admin, Address::from("lotto-engine"));
        roles.grant(Scope::Pot, Role::Player, Address::from("grotto"));

        let restored = RoleRegistry::from_grants(roles.grants());
        assert!(restored.has(Scope::Ledger, Role::Admin, &Address::from("lotto-engine")));
        assert!(restored.has(Scope::Pot, Role::Player, &Address::from("grotto")));
    }
}
