//! Validator runner
//!
//! A [`Validator`] owns an ordered list of rules for one model type and
//! drives them through a shared [`ValidationContext`]. Rules run in
//! registration order; failures accumulate in registration order within the
//! run's sink, which makes reports deterministic for a given model and
//! rule configuration.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::context::{RuleSetFilter, ValidationContext};
use crate::error::RuleError;
use crate::failure::ValidationFailure;
use crate::rule::ValidationRule;

// ============================================================================
// OPTIONS
// ============================================================================

/// Run-wide knobs shared by every rule in a validator.
#[derive(Clone)]
pub struct ValidatorOptions {
    /// Maps a checking unit's name to the error code used when the rule
    /// does not set one explicitly. Defaults to the identity mapping.
    pub error_code_resolver: Arc<dyn Fn(&str) -> String + Send + Sync>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            error_code_resolver: Arc::new(str::to_owned),
        }
    }
}

impl fmt::Debug for ValidatorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorOptions").finish_non_exhaustive()
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Whether a run saw every selected rule or stopped early on cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Every selected rule was visited.
    Complete,
    /// The cancellation token fired; the report holds failures discovered
    /// up to that point.
    Cancelled,
}

/// Outcome of one validation run.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    failures: Vec<ValidationFailure>,
    state: RunState,
}

impl ValidationReport {
    pub(crate) fn new(failures: Vec<ValidationFailure>, state: RunState) -> Self {
        Self { failures, state }
    }

    /// True when no failures were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures in discovery order.
    #[must_use]
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Consumes the report, yielding the failures.
    #[must_use]
    pub fn into_failures(self) -> Vec<ValidationFailure> {
        self.failures
    }

    /// Run completion state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// True when the run was not cut short by cancellation.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == RunState::Complete
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "valid");
        }
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Ordered rule set for one model type.
///
/// # Examples
///
/// ```rust,ignore
/// use rulekit::prelude::*;
///
/// let validator = Validator::new()
///     .rule(
///         PropertyRule::new("Name", |u: &User| &u.name)
///             .must("NotEmpty", |_, name: &String| !name.is_empty()),
///     )
///     .rule(
///         CollectionRule::from_slice("Orders", |u: &User| u.orders.as_slice())
///             .must("Positive", |_, o: &Order| o.total > 0.0),
///     );
///
/// let report = validator.validate(&user)?;
/// assert!(report.is_valid());
/// ```
pub struct Validator<T> {
    rules: Vec<Box<dyn ValidationRule<T>>>,
    options: ValidatorOptions,
}

impl<T> Default for Validator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Validator<T> {
    /// Creates an empty validator with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            options: ValidatorOptions::default(),
        }
    }

    /// Creates an empty validator with the given options.
    #[must_use]
    pub fn with_options(options: ValidatorOptions) -> Self {
        Self {
            rules: Vec::new(),
            options,
        }
    }

    /// Appends a rule. Rules run in the order they were added.
    #[must_use = "builder methods must be chained or built"]
    pub fn rule<R>(mut self, rule: R) -> Self
    where
        R: ValidationRule<T> + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// True if any registered rule can only run on the async path.
    #[must_use]
    pub fn requires_async(&self) -> bool {
        self.rules.iter().any(|rule| rule.requires_async())
    }
}

impl<T> Validator<T>
where
    T: Send + Sync + Serialize,
{
    /// Runs every rule in the default rule set synchronously.
    ///
    /// Fails with [`RuleError::AsyncRuleInSyncRun`] before running anything
    /// from a rule that needs the async path.
    pub fn validate(&self, model: &T) -> Result<ValidationReport, RuleError> {
        self.validate_filtered(model, RuleSetFilter::Default)
    }

    /// Synchronous run restricted to the given rule-set filter.
    pub fn validate_filtered(
        &self,
        model: &T,
        filter: RuleSetFilter,
    ) -> Result<ValidationReport, RuleError> {
        let ctx = ValidationContext::new(model).with_filter(filter);
        self.run_rules(&ctx)?;
        Ok(ValidationReport::new(ctx.take_failures(), RunState::Complete))
    }

    /// Runs every rule in the default rule set on the async path.
    pub async fn validate_async(&self, model: &T) -> Result<ValidationReport, RuleError> {
        self.validate_async_with(model, RuleSetFilter::Default, CancellationToken::new())
            .await
    }

    /// Async run with an explicit rule-set filter and cancellation token.
    ///
    /// Cancellation is observed between rules, between chain units and
    /// between collection elements; the report's [`RunState`] records
    /// whether the run was cut short.
    pub async fn validate_async_with(
        &self,
        model: &T,
        filter: RuleSetFilter,
        cancellation: CancellationToken,
    ) -> Result<ValidationReport, RuleError> {
        let ctx = ValidationContext::new(model)
            .with_filter(filter)
            .with_cancellation(cancellation);
        self.run_rules_async(&ctx).await?;
        let state = if ctx.is_cancelled() {
            RunState::Cancelled
        } else {
            RunState::Complete
        };
        Ok(ValidationReport::new(ctx.take_failures(), state))
    }

    /// Drives rules against an existing context. Child adaptors re-enter
    /// here with the child scope so nested failures land in the caller's
    /// sink.
    pub(crate) fn run_rules(&self, ctx: &ValidationContext<'_, T>) -> Result<(), RuleError> {
        debug!(rules = self.rules.len(), "validation run started");
        for rule in &self.rules {
            if ctx.is_cancelled() {
                break;
            }
            if !ctx.filter().matches(rule.rule_sets()) {
                trace!(property = rule.property_name(), "rule skipped by filter");
                continue;
            }
            if rule.requires_async() {
                return Err(RuleError::async_in_sync(rule.property_name()));
            }
            rule.validate(ctx, &self.options)?;
        }
        debug!(failures = ctx.failure_count(), "validation run finished");
        Ok(())
    }

    pub(crate) async fn run_rules_async(
        &self,
        ctx: &ValidationContext<'_, T>,
    ) -> Result<(), RuleError> {
        debug!(rules = self.rules.len(), "validation run started");
        for rule in &self.rules {
            if ctx.is_cancelled() {
                break;
            }
            if !ctx.filter().matches(rule.rule_sets()) {
                trace!(property = rule.property_name(), "rule skipped by filter");
                continue;
            }
            rule.validate_async(ctx, &self.options).await?;
        }
        debug!(failures = ctx.failure_count(), "validation run finished");
        Ok(())
    }
}

impl<T> fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Serialize)]
    struct Model {
        value: i64,
    }

    use crate::rule::PropertyRule;

    fn positive_rule() -> PropertyRule<Model, i64> {
        PropertyRule::new("Value", |m: &Model| &m.value)
            .must("Positive", |_, v: &i64| *v > 0)
    }

    #[test]
    fn empty_validator_reports_valid() {
        let validator = Validator::<Model>::new();
        let report = validator.validate(&Model { value: 0 }).unwrap();
        assert!(report.is_valid());
        assert!(report.is_complete());
    }

    #[test]
    fn failing_rule_lands_in_report() {
        let validator = Validator::new().rule(positive_rule());
        let report = validator.validate(&Model { value: -3 }).unwrap();
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].property_name, "Value");
        assert_eq!(report.failures()[0].error_code.as_ref(), "Positive");
    }

    #[test]
    fn custom_error_code_resolver_applies() {
        let options = ValidatorOptions {
            error_code_resolver: Arc::new(|name| format!("err.{name}")),
        };
        let validator = Validator::with_options(options).rule(positive_rule());
        let report = validator.validate(&Model { value: -3 }).unwrap();
        assert_eq!(report.failures()[0].error_code.as_ref(), "err.Positive");
    }

    #[test]
    fn report_display_lists_failures() {
        let validator = Validator::new().rule(positive_rule());
        let report = validator.validate(&Model { value: -1 }).unwrap();
        let rendered = report.to_string();
        assert!(rendered.contains("[Value]"));
    }
}
