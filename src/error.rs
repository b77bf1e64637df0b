//! Configuration errors
//!
//! Two distinct error classes exist in this crate. Validation failures are
//! expected, data-dependent outcomes and are accumulated as
//! [`ValidationFailure`](crate::ValidationFailure) records. A [`RuleError`]
//! is a programmer error in how a rule was built or invoked: it is surfaced
//! immediately, never merged into the failure sequence, and must be fixed at
//! the call site.

use thiserror::Error;

/// Fatal rule-configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// A collection rule targeting the model itself was built without an
    /// explicit property name, so element paths cannot be constructed.
    #[error(
        "could not determine the property name for rule `{rule}`; \
         supply an explicit name when constructing the rule"
    )]
    MissingPropertyName {
        /// Identifier of the offending rule (its declared name or kind).
        rule: String,
    },

    /// A chain containing an asynchronous checking unit (or an async
    /// condition) was reached through the synchronous entry point.
    #[error(
        "rule for `{property}` requires asynchronous execution; \
         call `validate_async` instead of `validate`"
    )]
    AsyncRuleInSyncRun {
        /// Property name of the rule that requires async execution.
        property: String,
    },
}

impl RuleError {
    pub(crate) fn missing_name(rule: impl Into<String>) -> Self {
        Self::MissingPropertyName { rule: rule.into() }
    }

    pub(crate) fn async_in_sync(property: impl Into<String>) -> Self {
        Self::AsyncRuleInSyncRun {
            property: property.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = RuleError::missing_name("items");
        assert!(err.to_string().contains("`items`"));

        let err = RuleError::async_in_sync("email");
        assert!(err.to_string().contains("`email`"));
        assert!(err.to_string().contains("validate_async"));
    }
}
