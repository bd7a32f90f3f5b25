use super::Session;
use anyhow::{anyhow, bail};
use clap::{Args, Subcommand};
use grotto_core::{Address, Amount, GuessComparison, PotKind, WagerKind};
use grotto_engine::{CreatePot, PoolParams};

/// How a new wager closes: `--max` players, or `--duration` seconds.
#[derive(Args)]
pub struct Closure {
    /// Close after this many players
    #[arg(long)]
    max: Option<u32>,
    /// Close this many seconds after opening
    #[arg(long)]
    duration: Option<i64>,
    /// Open this many seconds from now (time based only)
    #[arg(long, default_value_t = 0)]
    starts_in: i64,
    /// Request a specific wager id
    #[arg(long)]
    id: Option<u64>,
}

impl Closure {
    fn params(&self, bet: u64, now: i64) -> anyhow::Result<PoolParams> {
        let params = match (self.max, self.duration) {
            (Some(max), None) => PoolParams::count_based(max, Amount::from_units(bet)),
            (None, Some(duration)) => {
                let (start, end) = window(now, self.starts_in, duration)?;
                PoolParams::time_based(start, end, Amount::from_units(bet))
            }
            _ => bail!("Pass exactly one of --max or --duration"),
        };
        Ok(match self.id {
            Some(id) => params.with_id(id),
            None => params,
        })
    }
}

fn window(now: i64, starts_in: i64, duration: i64) -> anyhow::Result<(i64, i64)> {
    let Some(start) = now.checked_add(starts_in) else {
        bail!("--starts-in {} is out of range", starts_in);
    };
    let Some(end) = start.checked_add(duration) else {
        bail!("--duration {} is out of range", duration);
    };
    Ok((start, end))
}

#[derive(Subcommand)]
pub enum LottoCommands {
    /// Create a lotto
    Create {
        /// Stake every player pays, in units
        bet: u64,
        #[command(flatten)]
        closure: Closure,
    },
    /// Buy into a lotto
    Play {
        id: u64,
        /// Stake in units (defaults to the lotto's bet)
        #[arg(long)]
        value: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum PotCommands {
    /// Create a guessing pot
    Create {
        /// Stake every player pays, in units
        bet: u64,
        /// Winning numbers, comma separated
        #[arg(value_delimiter = ',')]
        numbers: Vec<u32>,
        /// Guesses must match position by position
        #[arg(long)]
        exact: bool,
        /// First correct guess takes the pot
        #[arg(long)]
        single: bool,
        #[command(flatten)]
        closure: Closure,
    },
    /// Submit a guess
    Play {
        id: u64,
        /// Guessed numbers, comma separated
        #[arg(value_delimiter = ',')]
        numbers: Vec<u32>,
        /// Stake in units (defaults to the pot's bet)
        #[arg(long)]
        value: Option<u64>,
    },
}

pub fn handle_lotto_command(
    cmd: LottoCommands,
    session: &Session,
    sender: &Address,
) -> anyhow::Result<()> {
    let grotto = session.grotto();

    match cmd {
        LottoCommands::Create { bet, closure } => {
            let params = closure.params(bet, grotto.now())?;
            let id = grotto.create_lotto(sender, params)?;
            println!("Created lotto {}", id);
            println!("  Creator: {}", sender);
            println!("  Bet: {}", Amount::from_units(bet));
        }

        LottoCommands::Play { id, value } => {
            let value = stake(session, id, value)?;
            let status = grotto.play_lotto(sender, id, value)?;
            println!("{} played lotto {} with {}", sender, id, value);
            println!("  Status: {}", status.as_str());
        }
    }

    Ok(())
}

pub fn handle_pot_command(
    cmd: PotCommands,
    session: &Session,
    sender: &Address,
) -> anyhow::Result<()> {
    let grotto = session.grotto();

    match cmd {
        PotCommands::Create {
            bet,
            numbers,
            exact,
            single,
            closure,
        } => {
            let request = CreatePot {
                params: closure.params(bet, grotto.now())?,
                winning_numbers: numbers,
                comparison: if exact {
                    GuessComparison::ExactOrder
                } else {
                    GuessComparison::NumbersOnly
                },
            };
            let kind = if single {
                PotKind::SingleWinner
            } else {
                PotKind::MultiWinner
            };

            let id = grotto.create_pot(sender, request, kind)?;
            println!("Created {} {}", if single { "single-winner pot" } else { "pot" }, id);
            println!("  Creator: {}", sender);
            println!("  Bet: {}", Amount::from_units(bet));
        }

        PotCommands::Play { id, numbers, value } => {
            let value = stake(session, id, value)?;
            let status = match grotto.reader().get_by_id(id).map(|w| w.kind()) {
                Some(WagerKind::SingleWinnerPot) => {
                    grotto.play_single_winner_pot(sender, id, numbers, value)?
                }
                _ => grotto.play_pot(sender, id, numbers, value)?,
            };
            println!("{} played pot {} with {}", sender, id, value);
            println!("  Status: {}", status.as_str());
        }
    }

    Ok(())
}

fn stake(session: &Session, id: u64, value: Option<u64>) -> anyhow::Result<Amount> {
    match value {
        Some(units) => Ok(Amount::from_units(units)),
        None => session
            .grotto()
            .reader()
            .get_by_id(id)
            .map(|w| w.pool().bet_amount)
            .ok_or_else(|| anyhow!(grotto_engine::WagerError::NotFound(id))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_adds_offsets() {
        assert_eq!(window(100, 5, 60).unwrap(), (105, 165));
    }

    #[test]
    fn test_window_rejects_overflowing_flags() {
        assert!(window(1_700_000_000, i64::MAX, 60).is_err());
        assert!(window(1_700_000_000, 0, i64::MAX).is_err());
        assert!(window(0, i64::MIN, -1).is_err());
    }
}
