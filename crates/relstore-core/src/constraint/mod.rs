//! Constraint enforcement: required, unique, max-length, pattern, and type
//! validation for rows written to the table store.

mod validator;

pub use validator::ConstraintValidator;
