//! The versioned table store.
//!
//! A [`Store`] holds a named collection of [`Table`]s, each a map from row
//! id to record plus enough snapshot history to roll a transaction back to
//! the version it opened at.

mod config;
mod store;
mod table;

pub use config::{PopulateConfig, StorageConfig};
pub use store::{Store, VersionSnapshot};
pub use table::Table;
