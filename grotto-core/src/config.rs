use crate::error::{CoreError, Result};
use crate::types::{Address, WagerKind};
use serde::{Deserialize, Serialize};

/// Percentages of a pool's stakes paid to each party. Must sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSplit {
    pub winner: u8,
    pub creator: u8,
    pub platform: u8,
}

impl ShareSplit {
    pub const fn new(winner: u8, creator: u8, platform: u8) -> Self {
        Self {
            winner,
            creator,
            platform,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let total = self.winner as u32 + self.creator as u32 + self.platform as u32;
        if total != 100 {
            return Err(CoreError::config(format!(
                "Share split {}/{}/{} sums to {}, expected 100",
                self.winner, self.creator, self.platform, total
            )));
        }
        Ok(())
    }
}

/// Versioned split policy. Settled pools record the version they used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPolicy {
    pub version: u32,
    pub lotto: ShareSplit,
    pub pot: ShareSplit,
    pub single_winner_pot: ShareSplit,
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self {
            version: 1,
            lotto: ShareSplit::new(80, 20, 0),
            pot: ShareSplit::new(80, 20, 0),
            single_winner_pot: ShareSplit::new(70, 20, 10),
        }
    }
}

impl SplitPolicy {
    pub fn for_kind(&self, kind: WagerKind) -> ShareSplit {
        match kind {
            WagerKind::Lotto => self.lotto,
            WagerKind::Pot => self.pot,
            WagerKind::SingleWinnerPot => self.single_winner_pot,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.lotto.validate()?;
        self.pot.validate()?;
        self.single_winner_pot.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Account that receives platform shares.
    pub platform_account: Address,
    pub split_policy: SplitPolicy,
    /// Settle in the same call that closes a pool.
    pub auto_settle: bool,
    pub max_guess_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform_account: Address::from("platform"),
            split_policy: SplitPolicy::default(),
            auto_settle: true,
            max_guess_len: 32,
        }
    }
}

impl EngineConfig {
    pub fn new(platform_account: Address) -> Self {
        Self {
            platform_account,
            ..Self::default()
        }
    }

    pub fn with_split_policy(mut self, split_policy: SplitPolicy) -> Self {
        self.split_policy = split_policy;
        self
    }

    pub fn with_auto_settle(mut self, auto_settle: bool) -> Self {
        self.auto_settle = auto_settle;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.platform_account.is_empty() {
            return Err(CoreError::config("Platform account cannot be empty"));
        }

        if self.max_guess_len == 0 {
            return Err(CoreError::config("Max guess length must be greater than 0"));
        }

        self.split_policy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_split_not_summing_to_100() {
        let policy = SplitPolicy {
            lotto: ShareSplit::new(80, 20, 10),
            ..SplitPolicy::default()
        };
        let config = EngineConfig::default().with_split_policy(policy);
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_platform_account() {
        let config = EngineConfig::new(Address::from("  "));
        assert!(config.validate().is_err());
    }
}
