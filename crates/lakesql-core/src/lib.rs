//! # lakesql-core
//!
//! Validated, dialect-aware SQL generation for lakehouse warehouses.
//!
//! This crate provides:
//! - A [`Validator`](validate::Validator) that checks identifiers,
//!   expressions, and SQL text against a strict character set and a
//!   configurable deny-list of injection patterns
//! - An [`Operation`](operation::Operation) model describing DDL and DML
//!   independently of any backend
//! - Two [`SqlDialect`](dialect::SqlDialect) implementations, one for external
//!   tables over object storage and one for warehouse-managed tables
//! - A [selector](selector::select) that picks a dialect from a configuration
//!   descriptor
//!
//! Nothing here connects to a database: every function takes an operation
//! and returns SQL text or an error.
//!
//! ## Compiling an operation
//!
//! ```rust
//! use lakesql_core::operation::{CreateTableOp, Operation};
//! use lakesql_core::selector::DialectConfig;
//!
//! let config = DialectConfig::new("managed-table");
//! let op: Operation = CreateTableOp::builder("silver", "customers")
//!     .as_select("SELECT * FROM bronze.raw_customers")
//!     .build()
//!     .unwrap()
//!     .into();
//!
//! let sql = lakesql_core::compile(&op, &config).unwrap();
//! assert_eq!(
//!     sql,
//!     "CREATE TABLE [silver].[customers] USING DELTA AS SELECT * FROM bronze.raw_customers"
//! );
//! ```
//!
//! ## Injection checks
//!
//! Every fragment embedded in an operation is validated before any SQL is
//! produced, and the first failure is returned:
//!
//! ```rust
//! use lakesql_core::operation::{DeleteOp, Operation};
//! use lakesql_core::selector::DialectConfig;
//!
//! let config = DialectConfig::new("managed-table");
//! let op: Operation = DeleteOp::new("silver", "orders")
//!     .filter("1=1; DROP TABLE users")
//!     .into();
//!
//! let err = lakesql_core::compile(&op, &config).unwrap_err();
//! assert!(err.to_string().contains("dangerous pattern"));
//! ```

pub mod dialect;
pub mod error;
pub mod operation;
pub mod selector;
pub mod validate;

pub use dialect::SqlDialect;
pub use error::{CompileError, Result, ValidationError};
pub use operation::Operation;
pub use selector::{select, DialectConfig, FormatterHandle};

/// Selects the dialect for `config` and compiles `operation` with it.
///
/// Callers compiling many operations against one configuration should call
/// [`select`] once and reuse the handle.
///
/// # Errors
///
/// Returns any selection error, then any compilation error.
pub fn compile(operation: &Operation, config: &DialectConfig) -> Result<String> {
    select(config)?.compile(operation)
}
