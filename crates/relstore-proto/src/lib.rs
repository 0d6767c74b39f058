//! Shared value and identifier types for the relstore engine.
//!
//! This crate defines the runtime [`Value`] held in a single cell of a
//! [`TableRecord`], the [`RowId`] type used for primary and foreign keys, and
//! a small error type for value-level coercion failures. It has no
//! dependency on the catalog or storage layers so that both `relstore-lang`
//! and `relstore-core` can share one definition of "what a row holds".
//!
//! # Modules
//!
//! - [`value`] - Runtime value types and table records
//! - [`error`] - Value coercion error types

pub mod error;
pub mod value;

pub use error::Error;
pub use value::{RowId, TableRecord, Value};
