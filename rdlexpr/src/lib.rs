//! Typed expression engine for report rendering.
//!
//! Report expressions are trees of [`expr::Expr`] nodes. Every node declares
//! one of the seven [`kind::ValueKind`]s and can be evaluated against a
//! per-render [`context::ReportContext`] and a per-record row. Submodules:
//!
//! - `kind` / `value`: the value kinds and the runtime values they describe
//! - `convert`: the single conversion table shared by every evaluator
//! - `expr`: node shapes (binary operators, `Switch`, references, ...)
//! - `optimize`: the constant-folding pass run once before the first row
//! - `context` / `aggregate`: evaluation state and aggregate accumulators
//!
//! A tree is built by an external producer, folded with
//! [`optimize::optimize`] and then shared read-only between workers.
pub mod aggregate;
pub mod context;
pub mod convert;
pub mod error;
pub mod expr;
pub mod kind;
pub mod optimize;
pub mod value;

pub use error::{Error, Result};
pub use expr::Expr;
pub use kind::ValueKind;
pub use value::Value;

pub extern crate bigdecimal;
pub extern crate chrono;
