//! Backend adapter contract: the operations a storage backend must provide
//! so the repository layer can stay agnostic of how rows are actually
//! persisted. [`InMemoryBackend`] is the only implementation in this
//! repository; a real relational-database adapter would satisfy the same
//! trait without the repository changing.
//!
//! `EntityRepository` itself talks to [`crate::storage::Store`] and
//! [`crate::txn::Coordinator`] directly rather than through this trait —
//! with a single adapter ever implemented here, making the repository
//! generic over `Backend` would be speculative. The trait exists to pin
//! down the contract boundary a second adapter would need to meet.

use crate::catalog::Catalog;
use crate::error::Error;
use crate::repository::StoreRow;
use crate::txn::{Coordinator, TxId};
use relstore_lang::{evaluate, Expr, Params};
use relstore_proto::{RowId, TableRecord, Value};
use std::sync::Arc;

/// Connection lifecycle, transaction lifecycle, and per-table CRUD scoped
/// to an already-open transaction.
pub trait Backend {
    fn create_connection(&self) -> Result<(), Error>;
    fn close_connection(&self);
    fn is_valid(&self) -> bool;

    fn open_transaction(&self) -> TxId;
    fn close_transaction(&self, tx: TxId) -> Result<(), Error>;
    fn cancel_transaction(&self, tx: TxId, reason: String) -> Result<(), Error>;

    fn count(&self, table: &str, matcher: Option<(&Expr, &Params)>) -> Result<usize, Error>;
    fn select(&self, table: &str, matcher: &Expr, params: &Params) -> Result<Vec<TableRecord>, Error>;
    fn insert(&self, table: &str, id: Option<RowId>, record: TableRecord, tx: TxId) -> Result<RowId, Error>;
    fn update(&self, table: &str, id: RowId, record: TableRecord, tx: TxId) -> Result<(), Error>;
    fn delete(&self, table: &str, id: &RowId, tx: TxId) -> Result<Option<TableRecord>, Error>;
    fn insert_relationship(
        &self,
        rel_table: &str,
        source_column: &str,
        source: RowId,
        target_column: &str,
        target: RowId,
        tx: TxId,
    ) -> Result<(), Error>;
}

/// The in-memory adapter, wrapping the same catalog and coordinator the
/// repository uses directly elsewhere.
pub struct InMemoryBackend {
    catalog: Arc<Catalog>,
    coordinator: Arc<Coordinator>,
}

impl InMemoryBackend {
    pub fn new(catalog: Arc<Catalog>, coordinator: Arc<Coordinator>) -> Self {
        Self { catalog, coordinator }
    }
}

impl Backend for InMemoryBackend {
    fn create_connection(&self) -> Result<(), Error> {
        Ok(())
    }

    fn close_connection(&self) {}

    fn is_valid(&self) -> bool {
        true
    }

    fn open_transaction(&self) -> TxId {
        self.coordinator.open()
    }

    fn close_transaction(&self, tx: TxId) -> Result<(), Error> {
        self.coordinator.commit(tx)
    }

    fn cancel_transaction(&self, tx: TxId, reason: String) -> Result<(), Error> {
        self.coordinator.abort(tx, reason)
    }

    fn count(&self, table: &str, matcher: Option<(&Expr, &Params)>) -> Result<usize, Error> {
        match matcher {
            None => Ok(self.coordinator.store().len(table)),
            Some((expr, params)) => {
                let mut n = 0;
                for (id, record) in self.coordinator.store().entries(table) {
                    let row = StoreRow::new(&self.catalog, self.coordinator.store(), table, id, &record);
                    if evaluate(expr, &row, params)? {
                        n += 1;
                    }
                }
                Ok(n)
            }
        }
    }

    fn select(&self, table: &str, matcher: &Expr, params: &Params) -> Result<Vec<TableRecord>, Error> {
        let mut out = Vec::new();
        for (id, record) in self.coordinator.store().entries(table) {
            let row = StoreRow::new(&self.catalog, self.coordinator.store(), table, id, &record);
            if evaluate(matcher, &row, params)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn insert(&self, table: &str, id: Option<RowId>, record: TableRecord, tx: TxId) -> Result<RowId, Error> {
        self.coordinator.execute(tx, |h| {
            let (row_id, _) = h.put(table, &self.catalog, id.clone(), record.clone())?;
            Ok(row_id)
        })
    }

    fn update(&self, table: &str, id: RowId, record: TableRecord, tx: TxId) -> Result<(), Error> {
        self.coordinator.execute(tx, |h| {
            h.put(table, &self.catalog, Some(id.clone()), record.clone())?;
            Ok(())
        })
    }

    fn delete(&self, table: &str, id: &RowId, tx: TxId) -> Result<Option<TableRecord>, Error> {
        self.coordinator.execute(tx, |h| Ok(h.delete(table, id)))
    }

    fn insert_relationship(
        &self,
        rel_table: &str,
        source_column: &str,
        source: RowId,
        target_column: &str,
        target: RowId,
        tx: TxId,
    ) -> Result<(), Error> {
        let mut row = TableRecord::new();
        row.set(source_column.to_string(), Value::Id(source));
        row.set(target_column.to_string(), Value::Id(target));
        self.coordinator.execute(tx, |h| {
            h.put(rel_table, &self.catalog, None, row.clone())?;
            Ok(())
        })
    }
}
