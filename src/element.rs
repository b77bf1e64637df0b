//! Rule elements
//!
//! A [`RuleElement`] pairs one checking unit with the metadata that shapes
//! the failure it emits: message template, error code, severity, custom
//! state and extra placeholders. The metadata is attached by the rule
//! builder's `with_*` methods and always targets the most recent unit.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::checkers::Checker;
use crate::context::PropertyContext;
use crate::error::RuleError;
use crate::failure::{format_message, Placeholders, Severity, ValidationFailure};
use crate::validator::ValidatorOptions;

/// Default template used when a unit carries no explicit message.
const DEFAULT_MESSAGE: &str = "The specified condition was not met for '{PropertyName}'.";

type StateFn<T, P> = Arc<dyn Fn(&T, &P) -> serde_json::Value + Send + Sync>;

// ============================================================================
// ELEMENT METADATA
// ============================================================================

/// Failure-shaping metadata for one checking unit.
pub(crate) struct ElementMeta<T, P: ?Sized> {
    pub(crate) message: Option<Cow<'static, str>>,
    pub(crate) error_code: Option<Cow<'static, str>>,
    pub(crate) severity: Severity,
    pub(crate) custom_state: Option<StateFn<T, P>>,
    pub(crate) placeholders: Placeholders,
}

impl<T, P: ?Sized> Default for ElementMeta<T, P> {
    fn default() -> Self {
        Self {
            message: None,
            error_code: None,
            severity: Severity::Error,
            custom_state: None,
            placeholders: Placeholders::new(),
        }
    }
}

impl<T, P> ElementMeta<T, P>
where
    P: Serialize + ?Sized,
{
    /// Builds the failure record for a unit that evaluated to false.
    ///
    /// Message templates resolve `{PropertyName}` and `{PropertyValue}`
    /// plus any placeholders attached to the element; the error code falls
    /// back to the run-wide resolver applied to the unit's name.
    pub(crate) fn build_failure(
        &self,
        ctx: &PropertyContext<'_, T, P>,
        checker_name: &str,
        options: &ValidatorOptions,
    ) -> ValidationFailure {
        let attempted =
            serde_json::to_value(ctx.value()).unwrap_or(serde_json::Value::Null);

        let mut placeholders = Placeholders::new();
        placeholders.push((
            Cow::Borrowed("PropertyName"),
            ctx.rule_name().to_owned(),
        ));
        placeholders.push((Cow::Borrowed("PropertyValue"), attempted.to_string()));
        placeholders.extend(self.placeholders.iter().cloned());

        let template = self
            .message
            .as_deref()
            .unwrap_or(DEFAULT_MESSAGE);
        let message = format_message(template, &placeholders);

        let code = match &self.error_code {
            Some(code) => code.clone(),
            None => Cow::Owned((options.error_code_resolver)(checker_name)),
        };

        let mut failure = ValidationFailure::new(ctx.property_name(), message)
            .with_code(code)
            .with_severity(self.severity)
            .with_attempted_value(attempted);
        if let Some(state) = &self.custom_state {
            failure = failure.with_custom_state(state(ctx.model(), ctx.value()));
        }
        failure.placeholders = placeholders;
        failure
    }
}

impl<T, P: ?Sized> Clone for ElementMeta<T, P> {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            error_code: self.error_code.clone(),
            severity: self.severity,
            custom_state: self.custom_state.as_ref().map(Arc::clone),
            placeholders: self.placeholders.clone(),
        }
    }
}

impl<T, P: ?Sized> fmt::Debug for ElementMeta<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementMeta")
            .field("message", &self.message)
            .field("error_code", &self.error_code)
            .field("severity", &self.severity)
            .field("has_custom_state", &self.custom_state.is_some())
            .field("placeholders", &self.placeholders)
            .finish()
    }
}

// ============================================================================
// RULE ELEMENT
// ============================================================================

/// One checking unit plus its failure metadata.
pub(crate) struct RuleElement<T, P: ?Sized> {
    pub(crate) checker: Checker<T, P>,
    pub(crate) meta: ElementMeta<T, P>,
}

impl<T, P: ?Sized> RuleElement<T, P> {
    pub(crate) fn new(checker: Checker<T, P>) -> Self {
        Self {
            checker,
            meta: ElementMeta::default(),
        }
    }

    pub(crate) fn requires_async(&self) -> bool {
        self.checker.requires_async()
    }

    /// Rewraps the checker, keeping the metadata. Used when a condition is
    /// attached to an already-built element.
    pub(crate) fn map_checker(self, f: impl FnOnce(Checker<T, P>) -> Checker<T, P>) -> Self {
        Self {
            checker: f(self.checker),
            meta: self.meta,
        }
    }
}

impl<T, P> RuleElement<T, P>
where
    T: Send + Sync,
    P: Send + Sync + Serialize + ?Sized,
{
    pub(crate) fn run(
        &self,
        ctx: &PropertyContext<'_, T, P>,
        options: &ValidatorOptions,
    ) -> Result<bool, RuleError> {
        self.checker.run(ctx, &self.meta, options)
    }

    pub(crate) fn run_async<'a>(
        &'a self,
        ctx: &'a PropertyContext<'a, T, P>,
        options: &'a ValidatorOptions,
    ) -> BoxFuture<'a, Result<bool, RuleError>> {
        self.checker.run_async(ctx, &self.meta, options)
    }
}

impl<T, P: ?Sized> Clone for RuleElement<T, P> {
    fn clone(&self) -> Self {
        Self {
            checker: self.checker.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<T, P: ?Sized> fmt::Debug for RuleElement<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleElement")
            .field("checker", &self.checker)
            .field("meta", &self.meta)
            .finish()
    }
}
