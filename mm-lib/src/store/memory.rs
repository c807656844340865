use super::{Changeset, ScopeChange, SignerChange, Store, Versioned};
use crate::syncer::EventSource;
use crate::types::{
    Borrow, Market, OracleSigner, Output, Proposal, Supply, Transaction, Transfer,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    markets: BTreeMap<String, Market>,
    supplies: BTreeMap<(String, String), Supply>,
    borrows: BTreeMap<(String, String), Borrow>,
    transactions: BTreeMap<String, Transaction>,
    proposals: BTreeMap<String, Proposal>,
    transfers: Vec<Transfer>,
    outputs: BTreeMap<i64, Output>,
    properties: BTreeMap<String, String>,
    signers: BTreeMap<String, OracleSigner>,
    scopes: BTreeSet<(String, String)>,
    failing_commits: usize,
}

/// Process-local store with the same write semantics as the database one.
/// Also serves as an event source over pushed outputs. Used for dry runs
/// and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| anyhow!("Memory store lock poisoned: {}", e))
    }

    pub fn push_output(&self, output: Output) -> Result<()> {
        self.lock()?.outputs.insert(output.id, output);
        Ok(())
    }

    pub fn transfers(&self) -> Result<Vec<Transfer>> {
        Ok(self.lock()?.transfers.clone())
    }

    pub fn supplies(&self) -> Result<Vec<Supply>> {
        Ok(self.lock()?.supplies.values().cloned().collect())
    }

    /// Makes the next `count` commits fail as if the database were down.
    pub fn fail_next_commits(&self, count: usize) -> Result<()> {
        self.lock()?.failing_commits = count;
        Ok(())
    }
}

fn apply_versioned<K, T>(
    rows: &mut BTreeMap<K, T>,
    key: K,
    write: &Versioned<T>,
    version_of: impl Fn(&T) -> i64,
) where
    K: Ord,
    T: Clone,
{
    match (rows.get(&key), write.expected_version) {
        (None, None) => {
            rows.insert(key, write.value.clone());
        }
        (Some(current), Some(expected)) if version_of(current) == expected => {
            rows.insert(key, write.value.clone());
        }
        _ => {}
    }
}

impl Store for MemoryStore {
    fn find_market(&self, asset_id: &str) -> Result<Option<Market>> {
        Ok(self.lock()?.markets.get(asset_id).cloned())
    }

    fn find_market_by_ctoken(&self, ctoken_asset_id: &str) -> Result<Option<Market>> {
        Ok(self
            .lock()?
            .markets
            .values()
            .find(|m| m.ctoken_asset_id == ctoken_asset_id)
            .cloned())
    }

    fn list_markets(&self) -> Result<Vec<Market>> {
        Ok(self.lock()?.markets.values().cloned().collect())
    }

    fn find_supply(&self, user_id: &str, ctoken_asset_id: &str) -> Result<Option<Supply>> {
        let key = (user_id.to_string(), ctoken_asset_id.to_string());
        Ok(self.lock()?.supplies.get(&key).cloned())
    }

    fn list_supplies(&self, user_id: &str) -> Result<Vec<Supply>> {
        Ok(self
            .lock()?
            .supplies
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_borrow(&self, user_id: &str, asset_id: &str) -> Result<Option<Borrow>> {
        let key = (user_id.to_string(), asset_id.to_string());
        Ok(self.lock()?.borrows.get(&key).cloned())
    }

    fn list_borrows(&self, user_id: &str) -> Result<Vec<Borrow>> {
        Ok(self
            .lock()?
            .borrows
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    fn list_all_borrows(&self) -> Result<Vec<Borrow>> {
        Ok(self.lock()?.borrows.values().cloned().collect())
    }

    fn list_borrowers(&self) -> Result<Vec<String>> {
        let users: BTreeSet<String> = self
            .lock()?
            .borrows
            .values()
            .map(|b| b.user_id.clone())
            .collect();
        Ok(users.into_iter().collect())
    }

    fn find_transaction(&self, trace_id: &str) -> Result<Option<Transaction>> {
        Ok(self.lock()?.transactions.get(trace_id).cloned())
    }

    fn find_proposal(&self, trace_id: &str) -> Result<Option<Proposal>> {
        Ok(self.lock()?.proposals.get(trace_id).cloned())
    }

    fn list_transfers(&self, output_id: i64) -> Result<Vec<Transfer>> {
        Ok(self
            .lock()?
            .transfers
            .iter()
            .filter(|t| t.output_id == output_id)
            .cloned()
            .collect())
    }

    fn list_oracle_signers(&self) -> Result<Vec<OracleSigner>> {
        Ok(self.lock()?.signers.values().cloned().collect())
    }

    fn is_scope_restricted(&self, scope: &str) -> Result<bool> {
        Ok(self.lock()?.scopes.iter().any(|(s, _)| s == scope))
    }

    fn is_allowed(&self, scope: &str, user_id: &str) -> Result<bool> {
        let key = (scope.to_string(), user_id.to_string());
        Ok(self.lock()?.scopes.contains(&key))
    }

    fn find_property(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.properties.get(key).cloned())
    }

    fn save_property(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?
            .properties
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn commit(&self, changeset: &Changeset) -> Result<()> {
        let mut state = self.lock()?;

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(anyhow!("Memory store commit failed"));
        }

        for write in &changeset.markets {
            let key = write.value.asset_id.clone();
            apply_versioned(&mut state.markets, key, write, |m| m.version);
        }
        for write in &changeset.supplies {
            let key = (
                write.value.user_id.clone(),
                write.value.ctoken_asset_id.clone(),
            );
            apply_versioned(&mut state.supplies, key, write, |s| s.version);
        }
        for write in &changeset.borrows {
            let key = (write.value.user_id.clone(), write.value.asset_id.clone());
            apply_versioned(&mut state.borrows, key, write, |b| b.version);
        }
        for write in &changeset.proposals {
            let key = write.value.trace_id.clone();
            apply_versioned(&mut state.proposals, key, write, |p| p.version);
        }

        if let Some(transaction) = &changeset.transaction {
            state
                .transactions
                .entry(transaction.trace_id.clone())
                .or_insert_with(|| transaction.clone());
        }

        for transfer in &changeset.transfers {
            if !state.transfers.iter().any(|t| t.trace_id == transfer.trace_id) {
                state.transfers.push(transfer.clone());
            }
        }

        for (key, value) in &changeset.properties {
            state.properties.insert(key.clone(), value.clone());
        }

        for change in &changeset.signer_changes {
            match change {
                SignerChange::Add(signer) => {
                    state
                        .signers
                        .entry(signer.user_id.clone())
                        .or_insert_with(|| signer.clone());
                }
                SignerChange::Remove(user_id) => {
                    state.signers.remove(user_id);
                }
            }
        }

        for change in &changeset.scope_changes {
            match change {
                ScopeChange::Add { scope, user_id } => {
                    state.scopes.insert((scope.clone(), user_id.clone()));
                }
                ScopeChange::Remove { scope, user_id } => {
                    state.scopes.remove(&(scope.clone(), user_id.clone()));
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventSource for MemoryStore {
    async fn list(&self, after: i64, limit: i64) -> Result<Vec<Output>> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self
            .lock()?
            .outputs
            .range(after + 1..)
            .take(limit)
            .map(|(_, o)| o.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accrual::tests::market;

    #[test]
    fn stale_versions_and_duplicate_creates_are_ignored() {
        let store = MemoryStore::new();
        let mut m = market();
        m.version = 5;

        let create = Changeset {
            markets: vec![Versioned {
                value: m.clone(),
                expected_version: None,
            }],
            ..Default::default()
        };
        store.commit(&create).unwrap();

        let mut dup = m.clone();
        dup.symbol = "DUP".into();
        store
            .commit(&Changeset {
                markets: vec![Versioned {
                    value: dup,
                    expected_version: None,
                }],
                ..Default::default()
            })
            .unwrap();

        let mut stale = m.clone();
        stale.symbol = "STALE".into();
        stale.version = 9;
        store
            .commit(&Changeset {
                markets: vec![Versioned {
                    value: stale,
                    expected_version: Some(4),
                }],
                ..Default::default()
            })
            .unwrap();

        let stored = store.find_market("usdt").unwrap().unwrap();
        assert_eq!(stored.symbol, "USDT");
        assert_eq!(stored.version, 5);
    }

    #[test]
    fn injected_failures_leave_state_untouched() {
        let store = MemoryStore::new();
        store.fail_next_commits(1).unwrap();

        let changeset = Changeset {
            properties: vec![("k".into(), "v".into())],
            ..Default::default()
        };
        assert!(store.commit(&changeset).is_err());
        assert_eq!(store.find_property("k").unwrap(), None);

        store.commit(&changeset).unwrap();
        assert_eq!(store.find_property("k").unwrap(), Some("v".into()));
    }

    #[tokio::test]
    async fn lists_outputs_after_checkpoint_in_order() {
        let store = MemoryStore::new();
        for id in [3, 1, 2] {
            store
                .push_output(Output {
                    id,
                    trace_id: format!("t{}", id),
                    sender: "alice".into(),
                    asset_id: "usdt".into(),
                    amount: rust_decimal::Decimal::ONE,
                    memo: String::new(),
                    created_at: chrono::Utc::now(),
                })
                .unwrap();
        }

        let ids: Vec<i64> = store.list(1, 10).await.unwrap().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
