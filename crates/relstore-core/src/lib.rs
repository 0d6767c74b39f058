//! relstore-core — in-memory transactional entity store.
//!
//! Layers, bottom-up: [`storage`] holds versioned rows; [`catalog`] derives
//! foreign keys and relationship tables from entity field types;
//! [`constraint`] validates rows against their schema; [`resolver`]
//! materializes and cascades relationships; [`txn`] coordinates transaction
//! lifecycles over the store; [`repository`] is the public façade;
//! [`reference`] holds the lazy entity-reference wrapper types; [`backend`]
//! names the adapter contract `repository` is built against, satisfied here
//! by the in-memory store.

pub mod backend;
pub mod catalog;
pub mod constraint;
pub mod error;
pub mod reference;
pub mod repository;
pub mod resolver;
pub mod storage;
pub mod txn;

pub use backend::{Backend, InMemoryBackend};
pub use catalog::{Catalog, EntityDef, FieldDef, FieldType, ForeignKeyRef, RelationshipTable, Schema};
pub use constraint::ConstraintValidator;
pub use error::{Error, FieldInvalidKind};
pub use reference::{EntityReference, EntityReferenceList};
pub use repository::EntityRepository;
pub use resolver::{ResolutionRules, Resolver};
pub use storage::{PopulateConfig, Store, StorageConfig, VersionSnapshot};
pub use txn::{Coordinator, Op, TxHandle, TxId, TxState};

/// Re-export protocol types (values, row ids, coercion errors).
pub use relstore_proto as proto;
/// Re-export the condition language (parser and evaluator).
pub use relstore_lang as lang;
