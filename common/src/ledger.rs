//! Client-local transaction ledger.
//!
//! Records are kept newest-first in insertion order and never re-sorted.
//! Every mutation rewrites the whole snapshot under a single store key;
//! fine for the handful of records a dashboard session produces.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::WalletConfig;
use crate::error::LedgerError;
use crate::store::KeyValueStore;
use crate::transaction::{TransactionKind, TransactionRecord, TransactionStatus};

/// Transactions page filter. The default matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    /// Case-insensitive substring of `from`, `to` or `description`.
    pub search: Option<String>,
}

impl LedgerFilter {
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if self.kind.is_some_and(|kind| kind != record.kind) {
            return false;
        }
        if self.status.is_some_and(|status| status != record.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                record.from.to_lowercase().contains(&needle)
                    || record.to.to_lowercase().contains(&needle)
                    || record
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
        }
    }
}

pub struct Ledger<S> {
    store: S,
    key: String,
    records: RefCell<Vec<TransactionRecord>>,
}

impl<S: KeyValueStore> Ledger<S> {
    /// Empty ledger persisting under `key`. Call
    /// [`load_from_store`](Self::load_from_store) to pick up a prior session.
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            records: RefCell::new(Vec::new()),
        }
    }

    pub fn with_config(store: S, config: &WalletConfig) -> Self {
        Self::new(store, config.ledger_key.clone())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert at the head and persist the full list. A failed write is
    /// logged; the in-memory ledger stays correct.
    pub fn append(&self, record: TransactionRecord) {
        debug!(id = %record.id, kind = %record.kind, status = %record.status, "ledger append");
        self.records.borrow_mut().insert(0, record);
        self.persist_or_log();
    }

    /// Newest-first snapshot.
    pub fn list(&self) -> Vec<TransactionRecord> {
        self.records.borrow().clone()
    }

    /// The `n` newest records.
    pub fn recent(&self, n: usize) -> Vec<TransactionRecord> {
        self.records.borrow().iter().take(n).cloned().collect()
    }

    pub fn filtered(&self, filter: &LedgerFilter) -> Vec<TransactionRecord> {
        self.records
            .borrow()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<TransactionRecord> {
        self.records.borrow().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Replace the in-memory list with the persisted snapshot. A missing,
    /// unreadable or malformed snapshot leaves the ledger empty. Returns the
    /// number of records loaded.
    pub fn load_from_store(&self) -> usize {
        let records = match self.read_snapshot() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, key = %self.key, "discarding unreadable ledger snapshot");
                Vec::new()
            }
        };
        let count = records.len();
        *self.records.borrow_mut() = records;
        debug!(count, "ledger loaded");
        count
    }

    /// Move a pending record to a terminal status and persist.
    pub fn settle(
        &self,
        id: &str,
        status: TransactionStatus,
    ) -> Result<TransactionRecord, LedgerError> {
        let settled = {
            let mut records = self.records.borrow_mut();
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| LedgerError::UnknownRecord(id.to_string()))?;
            if !record.status.can_transition_to(status) {
                return Err(LedgerError::InvalidTransition {
                    id: id.to_string(),
                    from: record.status,
                    to: status,
                });
            }
            record.status = status;
            record.clone()
        };
        debug!(id, %status, "ledger settle");
        self.persist_or_log();
        Ok(settled)
    }

    /// Attach the broadcast hash to a record that has none yet.
    pub fn set_tx_hash(&self, id: &str, hash: &str) -> Result<(), LedgerError> {
        {
            let mut records = self.records.borrow_mut();
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| LedgerError::UnknownRecord(id.to_string()))?;
            if record.tx_hash.is_some() {
                return Err(LedgerError::HashAlreadySet(id.to_string()));
            }
            record.tx_hash = Some(hash.to_string());
        }
        self.persist_or_log();
        Ok(())
    }

    /// Persist now and report the outcome. Used on orderly shutdown.
    pub fn flush(&self) -> Result<(), LedgerError> {
        self.persist()
    }

    fn read_snapshot(&self) -> Result<Vec<TransactionRecord>, LedgerError> {
        let raw = self
            .store
            .get(&self.key)
            .map_err(|e| LedgerError::PersistenceRead(e.to_string()))?;
        match raw {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| LedgerError::PersistenceRead(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    fn persist(&self) -> Result<(), LedgerError> {
        let json = serde_json::to_string(&*self.records.borrow())
            .map_err(|e| LedgerError::PersistenceWrite(e.to_string()))?;
        self.store
            .set(&self.key, &json)
            .map_err(|e| LedgerError::PersistenceWrite(e.to_string()))
    }

    fn persist_or_log(&self) {
        if let Err(e) = self.persist() {
            warn!(error = %e, key = %self.key, "ledger snapshot not persisted");
        }
    }
}
