//! # rulekit
//!
//! Composable validation rules for Rust structs.
//!
//! Rules are declared per property with a fluent builder, grouped in a
//! [`Validator`] per model type, and run either synchronously or on the
//! async path with cancellation. Failures carry the full property path
//! (`Orders[2].Total`), an error code, a severity and the offending value.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use rulekit::prelude::*;
//!
//! #[derive(serde::Serialize)]
//! struct Customer {
//!     name: String,
//!     orders: Vec<Order>,
//! }
//!
//! #[derive(serde::Serialize)]
//! struct Order {
//!     total: f64,
//! }
//!
//! let validator = Validator::new()
//!     .rule(
//!         PropertyRule::new("Name", |c: &Customer| &c.name)
//!             .must("NotEmpty", |_, name: &String| !name.is_empty())
//!             .with_message("'{PropertyName}' must not be empty"),
//!     )
//!     .rule(
//!         CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
//!             .must("Positive", |_, order: &Order| order.total > 0.0),
//!     );
//!
//! let report = validator.validate(&customer)?;
//! for failure in report.failures() {
//!     println!("{failure}");
//! }
//! ```
//!
//! ## Design
//!
//! - One shared failure sink per run: nested and collection scopes append
//!   to it in discovery order, so reports are deterministic.
//! - Conditions (`when`, `unless`) are evaluated on the owning model, once
//!   per rule per run.
//! - Sync and async paths share the same rule definitions; a chain with
//!   async units is rejected up front by the sync entry point instead of
//!   failing mid-run.

// Accessor and predicate aliases are genuinely this shape.
#![allow(clippy::type_complexity)]

pub mod checkers;
pub mod context;
mod element;
pub mod error;
pub mod failure;
pub mod path;
pub mod prelude;
pub mod rule;
pub mod validator;

pub use checkers::{Checker, ChildAdaptor, ConditionalChecker, PredicateChecker};
pub use context::{PropertyContext, RuleSetFilter, ValidationContext};
pub use error::RuleError;
pub use failure::{format_message, Placeholders, Severity, ValidationFailure};
pub use path::{PathSegment, PropertyPath};
pub use rule::{
    Accessor, CascadeMode, CollectionAccessor, CollectionRule, PropertyRule, ValidationRule,
};
pub use validator::{RunState, ValidationReport, Validator, ValidatorOptions};
