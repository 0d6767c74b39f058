//! Transaction coordinator: cooperative, single-writer transaction
//! lifecycle over the versioned table store.
//!
//! Writes apply to the shared store the moment they execute — there is no
//! per-transaction staging buffer. Isolation instead comes from the
//! coordinator allowing only one transaction to be *executing* at a time;
//! commit and abort decide whether the version range a transaction wrote
//! is kept (consolidated) or undone (rolled back to the snapshot taken at
//! open).

use crate::error::Error;
use crate::storage::{Store, VersionSnapshot};
use parking_lot::Mutex;
use relstore_proto::{RowId, TableRecord};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type TxId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committing,
    Committed,
    Aborted,
}

/// A single write issued inside a transaction, kept for diagnostics.
#[derive(Debug, Clone)]
pub enum Op {
    Put {
        table: String,
        id: Option<RowId>,
        record: TableRecord,
    },
    Delete {
        table: String,
        id: RowId,
    },
}

struct TxMeta {
    snapshot: VersionSnapshot,
    state: TxState,
    ops: Vec<Op>,
    abort_reason: Option<String>,
}

/// Coordinates transaction lifecycles over a shared [`Store`].
pub struct Coordinator {
    store: Arc<Store>,
    next_id: AtomicU64,
    open: Mutex<BTreeMap<TxId, TxMeta>>,
    pending_consolidate: Mutex<VecDeque<(TxId, VersionSnapshot)>>,
    current: Mutex<Option<TxId>>,
    aborted: Mutex<BTreeMap<TxId, String>>,
}

impl Coordinator {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(1),
            open: Mutex::new(BTreeMap::new()),
            pending_consolidate: Mutex::new(VecDeque::new()),
            current: Mutex::new(None),
            aborted: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Open a new transaction, snapshotting every table's current version.
    pub fn open(&self) -> TxId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.store.versions();
        self.open.lock().insert(
            id,
            TxMeta {
                snapshot,
                state: TxState::Open,
                ops: Vec::new(),
                abort_reason: None,
            },
        );
        id
    }

    /// Run `body` as the currently-executing transaction. Nested entry
    /// (calling `execute` again while a transaction is already executing)
    /// fails with [`Error::NestedTransaction`].
    pub fn execute<T>(
        &self,
        id: TxId,
        body: impl FnOnce(&TxHandle) -> Result<T, Error>,
    ) -> Result<T, Error> {
        {
            let mut current = self.current.lock();
            if current.is_some() {
                return Err(Error::NestedTransaction);
            }
            *current = Some(id);
        }

        let handle = TxHandle { id, coordinator: self };
        let result = body(&handle);

        *self.current.lock() = None;

        if result.is_err() {
            self.abort(id, "execute block returned an error".to_string())?;
        }
        result
    }

    pub fn record_op(&self, id: TxId, op: Op) {
        if let Some(meta) = self.open.lock().get_mut(&id) {
            meta.ops.push(op);
        }
    }

    /// Commit a transaction. If it is the only open transaction its writes
    /// are consolidated immediately; otherwise it is queued and flushed
    /// once the last open transaction closes.
    pub fn commit(&self, id: TxId) -> Result<(), Error> {
        if let Some(reason) = self.aborted.lock().get(&id).cloned() {
            return Err(Error::TransactionAborted { reason });
        }
        let mut open = self.open.lock();
        let meta = open.get_mut(&id).ok_or(Error::TransactionAborted {
            reason: "unknown transaction".to_string(),
        })?;
        if meta.state == TxState::Aborted {
            return Err(Error::TransactionAborted {
                reason: meta
                    .abort_reason
                    .clone()
                    .unwrap_or_else(|| "aborted".to_string()),
            });
        }
        meta.state = TxState::Committed;
        let snapshot = meta.snapshot.clone();
        drop(open);

        self.pending_consolidate.lock().push_back((id, snapshot));

        let mut open = self.open.lock();
        open.remove(&id);
        if open.is_empty() {
            drop(open);
            self.flush_consolidate();
        }
        tracing::debug!(tx = id, "transaction committed");
        Ok(())
    }

    /// Drain the pending-consolidate queue in ascending transaction-id
    /// order, folding each transaction's own open-time snapshot into the
    /// store's history in turn.
    fn flush_consolidate(&self) {
        let mut entries: Vec<(TxId, VersionSnapshot)> =
            self.pending_consolidate.lock().drain(..).collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        for (_, snapshot) in entries {
            self.store.consolidate(&snapshot);
        }
    }

    /// Abort a transaction: roll the store back to its open-time snapshot.
    /// The reason stays queryable via [`Coordinator::abort_reason`] after
    /// the transaction's metadata is removed from the open set.
    pub fn abort(&self, id: TxId, reason: String) -> Result<(), Error> {
        let mut open = self.open.lock();
        if let Some(meta) = open.get_mut(&id) {
            meta.state = TxState::Aborted;
            meta.abort_reason = Some(reason.clone());
            let snapshot = meta.snapshot.clone();
            drop(open);
            self.store.rollback(&snapshot);
            self.open.lock().remove(&id);
            self.aborted.lock().insert(id, reason.clone());
            tracing::warn!(tx = id, %reason, "transaction aborted");
        }
        Ok(())
    }

    pub fn abort_reason(&self, id: TxId) -> Option<String> {
        if let Some(reason) = self.open.lock().get(&id).and_then(|m| m.abort_reason.clone()) {
            return Some(reason);
        }
        self.aborted.lock().get(&id).cloned()
    }

    pub fn is_open(&self, id: TxId) -> bool {
        self.open.lock().contains_key(&id)
    }

    /// Run `body` as an auto-committing single-op transaction: open,
    /// execute, commit (or abort on error) in one step.
    pub fn auto_commit<T>(
        &self,
        body: impl FnOnce(&TxHandle) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let id = self.open();
        let result = self.execute(id, body);
        match result {
            Ok(value) => {
                self.commit(id)?;
                Ok(value)
            }
            Err(e) => Err(e),
        }
    }
}

/// A handle passed to a transaction's `execute` body, scoping writes to
/// that transaction's op log.
pub struct TxHandle<'a> {
    id: TxId,
    coordinator: &'a Coordinator,
}

impl<'a> TxHandle<'a> {
    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn put(
        &self,
        table: &str,
        catalog: &crate::catalog::Catalog,
        id: Option<RowId>,
        record: TableRecord,
    ) -> Result<(RowId, u64), Error> {
        let result = self.coordinator.store.put(catalog, table, id.clone(), record.clone())?;
        self.coordinator.record_op(
            self.id,
            Op::Put {
                table: table.to_string(),
                id,
                record,
            },
        );
        Ok(result)
    }

    pub fn delete(&self, table: &str, id: &RowId) -> Option<TableRecord> {
        let removed = self.coordinator.store.delete(table, id);
        if removed.is_some() {
            self.coordinator.record_op(
                self.id,
                Op::Delete {
                    table: table.to_string(),
                    id: id.clone(),
                },
            );
        }
        removed
    }

    pub fn abort(&self, reason: impl Into<String>) -> Result<(), Error> {
        self.coordinator.abort(self.id, reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, EntityDef, FieldDef, FieldType};
    use relstore_proto::Value;

    fn catalog_with_user() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .register(EntityDef::new("User", "id").with_field(FieldDef::new("id", FieldType::Int)))
            .unwrap();
        catalog
    }

    fn row(email: &str) -> TableRecord {
        let mut r = TableRecord::new();
        r.set("email", Value::Text(email.to_string()));
        r
    }

    #[test]
    fn commit_keeps_writes() {
        let store = Arc::new(Store::new());
        let catalog = catalog_with_user();
        let coordinator = Coordinator::new(store.clone());

        let id = coordinator.open();
        let row_id = coordinator
            .execute(id, |tx| {
                let (row_id, _) = tx.put("User", &catalog, None, row("a@x.com"))?;
                Ok(row_id)
            })
            .unwrap();
        coordinator.commit(id).unwrap();

        assert!(store.get("User", &row_id).is_some());
    }

    #[test]
    fn abort_rolls_back_writes() {
        let store = Arc::new(Store::new());
        let catalog = catalog_with_user();
        let coordinator = Coordinator::new(store.clone());

        let id = coordinator.open();
        let row_id = coordinator
            .execute(id, |tx| {
                let (row_id, _) = tx.put("User", &catalog, None, row("a@x.com"))?;
                tx.abort("Test")?;
                Ok(row_id)
            })
            .unwrap();

        assert!(store.get("User", &row_id).is_none());
        assert_eq!(coordinator.abort_reason(id).as_deref(), Some("Test"));
    }

    #[test]
    fn nested_execute_is_rejected() {
        let store = Arc::new(Store::new());
        let coordinator = Coordinator::new(store);
        let outer = coordinator.open();
        let inner = coordinator.open();

        let result = coordinator.execute(outer, |_| {
            coordinator.execute(inner, |_| Ok(()))
        });
        assert!(matches!(result, Err(Error::NestedTransaction)));
    }

    #[test]
    fn auto_commit_opens_executes_and_commits() {
        let store = Arc::new(Store::new());
        let catalog = catalog_with_user();
        let coordinator = Coordinator::new(store.clone());

        let row_id = coordinator
            .auto_commit(|tx| {
                let (row_id, _) = tx.put("User", &catalog, None, row("a@x.com"))?;
                Ok(row_id)
            })
            .unwrap();

        assert!(store.get("User", &row_id).is_some());
    }
}
