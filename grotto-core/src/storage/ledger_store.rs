use crate::error::{CoreError, Result};
use crate::escrow::{EntryKind, Escrow, EscrowEntry};
use crate::ledger::Ledger;
use crate::roles::{Grant, RoleRegistry};
use crate::storage::Storage;
use crate::types::{Address, Amount, EventRecord, Stats, Wager};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

const META_NEXT_ID: &str = "next_id";
const META_STATS: &str = "stats";
const META_CREATORS: &str = "creators";
const META_CUSTODY: &str = "custody";
const META_BALANCES: &str = "balances";

/// Snapshot persistence for a [`Ledger`] and its role grants.
pub struct LedgerStore<'a> {
    storage: &'a Storage,
}

impl<'a> LedgerStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Writes the whole ledger in one SQLite transaction.
    pub async fn save_ledger(&self, ledger: &Ledger) -> Result<()> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;
        let now = Utc::now().timestamp();

        for wager in ledger.wagers.values() {
            let pool = wager.pool();
            tx.execute(
                "INSERT OR REPLACE INTO wagers (id, kind, creator, status, body, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    pool.id as i64,
                    wager.kind().as_str(),
                    pool.creator.as_str(),
                    pool.status.as_str(),
                    serde_json::to_string(wager)?,
                    now,
                ],
            )?;
        }

        // Events and escrow entries are append-only
        for record in &ledger.events {
            tx.execute(
                "INSERT OR IGNORE INTO events (seq, name, timestamp, body) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.seq as i64,
                    record.event.name(),
                    record.timestamp,
                    serde_json::to_string(record)?,
                ],
            )?;
        }

        for (position, entry) in ledger.escrow.entries().iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO escrow_entries
                 (position, id, kind, account, wager_id, amount, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    position as i64,
                    entry.id.to_string(),
                    entry.kind.as_str(),
                    entry.account.as_str(),
                    entry.wager_id.map(|id| id as i64),
                    entry.amount.to_units() as i64,
                    entry.timestamp,
                ],
            )?;
        }

        let meta = [
            (META_NEXT_ID, ledger.next_id.to_string()),
            (META_STATS, serde_json::to_string(&ledger.stats)?),
            (META_CREATORS, serde_json::to_string(&ledger.creators)?),
            (
                META_CUSTODY,
                ledger.escrow.custody().to_units().to_string(),
            ),
            (META_BALANCES, serde_json::to_string(ledger.escrow.balances())?),
        ];
        for (key, value) in meta {
            tx.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }

        tx.commit()?;
        tracing::info!(
            "Saved ledger: {} wagers, {} events",
            ledger.wagers.len(),
            ledger.events.len()
        );
        Ok(())
    }

    /// Reads the ledger back. An empty database yields an empty ledger.
    pub async fn load_ledger(&self) -> Result<Ledger> {
        let conn = self.storage.get_connection().await;

        let mut wagers = BTreeMap::new();
        {
            let mut stmt = conn.prepare("SELECT body FROM wagers ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for row in rows {
                let wager: Wager = serde_json::from_str(&row?)?;
                wagers.insert(wager.id(), wager);
            }
        }

        let mut events = Vec::new();
        {
            let mut stmt = conn.prepare("SELECT body FROM events ORDER BY seq")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for row in rows {
                let record: EventRecord = serde_json::from_str(&row?)?;
                events.push(record);
            }
        }

        let mut entries = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT id, kind, account, wager_id, amount, timestamp
                 FROM escrow_entries ORDER BY position",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?;
            for row in rows {
                let (id, kind, account, wager_id, amount, timestamp) = row?;
                entries.push(EscrowEntry {
                    id: Uuid::parse_str(&id)
                        .map_err(|e| CoreError::internal(format!("Bad entry id {}: {}", id, e)))?,
                    kind: parse_entry_kind(&kind)?,
                    account: Address::from(account),
                    wager_id: wager_id.map(|id| id as u64),
                    amount: Amount::from_units(amount as u64),
                    timestamp,
                });
            }
        }

        let next_id = read_meta(&conn, META_NEXT_ID)?
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| CoreError::internal(format!("Bad next_id '{}': {}", v, e)))
            })
            .transpose()?
            .unwrap_or(1);
        let stats: Stats = match read_meta(&conn, META_STATS)? {
            Some(v) => serde_json::from_str(&v)?,
            None => Stats::default(),
        };
        let creators: BTreeSet<Address> = match read_meta(&conn, META_CREATORS)? {
            Some(v) => serde_json::from_str(&v)?,
            None => BTreeSet::new(),
        };
        let custody = read_meta(&conn, META_CUSTODY)?
            .map(|v| {
                v.parse::<u64>()
                    .map_err(|e| CoreError::internal(format!("Bad custody '{}': {}", v, e)))
            })
            .transpose()?
            .map(Amount::from_units)
            .unwrap_or(Amount::ZERO);
        let balances: BTreeMap<Address, Amount> = match read_meta(&conn, META_BALANCES)? {
            Some(v) => serde_json::from_str(&v)?,
            None => BTreeMap::new(),
        };

        tracing::info!(
            "Loaded ledger: {} wagers, {} events",
            wagers.len(),
            events.len()
        );

        Ok(Ledger {
            next_id,
            wagers,
            creators,
            stats,
            escrow: Escrow::from_parts(custody, balances, entries),
            events,
        })
    }

    pub async fn save_roles(&self, roles: &RoleRegistry) -> Result<()> {
        let conn = self.storage.get_connection().await;
        for grant in roles.grants() {
            conn.execute(
                "INSERT OR IGNORE INTO roles (scope, role, address) VALUES (?1, ?2, ?3)",
                params![grant.scope.as_str(), grant.role.as_str(), grant.address.as_str()],
            )?;
        }
        Ok(())
    }

    pub async fn load_roles(&self) -> Result<RoleRegistry> {
        let conn = self.storage.get_connection().await;
        let mut stmt = conn.prepare("SELECT scope, role, address FROM roles")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut grants = Vec::new();
        for row in rows {
            let (scope, role, address) = row?;
            grants.push(Grant {
                scope: scope.parse()?,
                role: role.parse()?,
                address: Address::from(address),
            });
        }

        Ok(RoleRegistry::from_grants(grants))
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.storage.get_connection().await;
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.storage.get_connection().await;
        read_meta(&conn, key)
    }
}

fn read_meta(conn: &rusqlite::Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn parse_entry_kind(kind: &str) -> Result<EntryKind> {
    match kind {
        "stake" => Ok(EntryKind::Stake),
        "payout" => Ok(EntryKind::Payout),
        "withdrawal" => Ok(EntryKind::Withdrawal),
        other => Err(CoreError::internal(format!(
            "Unknown escrow entry kind '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escrow::Transfer;
    use crate::ledger::{Commit, StatsDelta};
    use crate::roles::{Role, Scope};
    use crate::types::{Event, Lotto, PoolStatus, WagerKind, WagerPool, WinningKind};
    use tempfile::tempdir;

    fn open_lotto(id: u64) -> Lotto {
        Lotto {
            pool: WagerPool {
                id,
                creator: Address::from("creator"),
                bet_amount: Amount::from_units(10),
                stakes: Amount::ZERO,
                max_participants: 2,
                start_time: 0,
                end_time: 0,
                winning_kind: WinningKind::CountBased,
                status: PoolStatus::Open,
                players: Vec::new(),
                creator_shares: Amount::ZERO,
                platform_shares: Amount::ZERO,
                remainder: Amount::ZERO,
                claimed_by_creator: false,
                claimed_by_platform: false,
                policy_version: None,
                created_at: 1,
                closed_at: None,
                settled_at: None,
            },
            winner: None,
            winning_amount: Amount::ZERO,
            claimed_by_winner: false,
            draw: None,
        }
    }

    #[tokio::test]
    async fn test_ledger_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("grotto.db");

        let mut ledger = Ledger::new();
        let lotto = open_lotto(1);
        ledger
            .commit(
                Commit::new(Wager::Lotto(lotto.clone()), 1)
                    .stats(StatsDelta::created(WagerKind::Lotto))
                    .event(Event::LottoCreated {
                        id: 1,
                        creator: Address::from("creator"),
                    }),
            )
            .unwrap();

        let mut played = lotto;
        played.pool.players.push(Address::from("alice"));
        played.pool.stakes = Amount::from_units(10);
        ledger
            .commit(
                Commit::new(Wager::Lotto(played), 2)
                    .stats(StatsDelta::played(Amount::from_units(10)))
                    .transfer(Transfer::Stake {
                        from: Address::from("alice"),
                        amount: Amount::from_units(10),
                    }),
            )
            .unwrap();

        let mut roles = RoleRegistry::new();
        roles.grant(Scope::Lotto, Role::Player, Address::from("grotto"));

        {
            let storage = Storage::new(&db_path).await.unwrap();
            let store = LedgerStore::new(&storage);
            store.save_ledger(&ledger).await.unwrap();
            store.save_roles(&roles).await.unwrap();
            store.set_meta("seed", "abcd").await.unwrap();
        }

        let storage = Storage::new(&db_path).await.unwrap();
        let store = LedgerStore::new(&storage);
        let loaded = store.load_ledger().await.unwrap();

        assert_eq!(loaded.get(1), ledger.get(1));
        assert_eq!(loaded.stats(), ledger.stats());
        assert_eq!(loaded.events(), ledger.events());
        assert_eq!(loaded.escrow().custody(), Amount::from_units(10));
        assert_eq!(loaded.escrow().entries(), ledger.escrow().entries());
        assert_eq!(loaded.reserve_id(None).unwrap(), 2);

        let loaded_roles = store.load_roles().await.unwrap();
        assert!(loaded_roles.has(Scope::Lotto, Role::Player, &Address::from("grotto")));
        assert_eq!(store.get_meta("seed").await.unwrap().as_deref(), Some("abcd"));
        assert_eq!(store.get_meta("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_database_loads_empty_ledger() {
        let storage = Storage::in_memory().await.unwrap();
        let ledger = LedgerStore::new(&storage).load_ledger().await.unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.reserve_id(None).unwrap(), 1);
    }
}
