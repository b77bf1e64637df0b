//! Convenience re-exports for declaring and running rules.
//!
//! ```rust,ignore
//! use rulekit::prelude::*;
//! ```

pub use crate::checkers::{Checker, ChildAdaptor, ConditionalChecker, PredicateChecker};
pub use crate::context::{RuleSetFilter, ValidationContext};
pub use crate::error::RuleError;
pub use crate::failure::{Severity, ValidationFailure};
pub use crate::path::{PathSegment, PropertyPath};
pub use crate::rule::{CascadeMode, CollectionRule, PropertyRule, ValidationRule};
pub use crate::validator::{RunState, ValidationReport, Validator, ValidatorOptions};
