//! Checking units
//!
//! A rule is a chain of checking units over one property value. Three
//! shapes exist:
//!
//! - [`PredicateChecker`] — a boolean test over (model, value)
//! - [`ConditionalChecker`] — gates an inner unit on a model-level condition
//! - [`ChildAdaptor`] — recurses into a nested value's own rule set
//!
//! Every unit runs on both the sync and the async path; units that can
//! only run async report it through `requires_async`, and the sync entry
//! point rejects them up front rather than mid-run.

mod child;
mod conditional;
mod predicate;

pub use child::ChildAdaptor;
pub use conditional::{AsyncConditionFn, ConditionFn, ConditionalChecker};
pub use predicate::{AsyncPredicateFn, PredicateChecker, SyncPredicateFn};

use std::borrow::Cow;
use std::fmt;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::context::PropertyContext;
use crate::element::ElementMeta;
use crate::error::RuleError;
use crate::validator::ValidatorOptions;

// ============================================================================
// CHECKER
// ============================================================================

/// One checking unit in a rule chain.
pub enum Checker<T, P: ?Sized> {
    /// Boolean test over the model and the property value.
    Predicate(PredicateChecker<T, P>),
    /// Inner unit gated on a condition over the model.
    Conditional(Box<ConditionalChecker<T, P>>),
    /// Recursion into a nested value's rule set.
    Child(ChildAdaptor<T, P>),
}

impl<T, P: ?Sized> Checker<T, P> {
    /// Name used for error codes and trace output.
    #[must_use]
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::Predicate(p) => Cow::Owned(p.name().to_owned()),
            Self::Conditional(c) => c.inner().name(),
            Self::Child(_) => Cow::Borrowed("ChildValidator"),
        }
    }

    /// True if this unit (or any unit it wraps) can only run async.
    #[must_use]
    pub fn requires_async(&self) -> bool {
        match self {
            Self::Predicate(p) => p.requires_async(),
            Self::Conditional(c) => c.requires_async(),
            Self::Child(a) => a.requires_async(),
        }
    }

    /// Resolves stacked condition wrappers, evaluating each condition
    /// exactly once. Returns the unit beneath, or `None` when any condition
    /// gates it off. Collection rules call this before fan-out so a unit's
    /// condition fires once per rule invocation, not once per element.
    pub(crate) fn resolve_conditions(
        &self,
        model: &T,
        property: &str,
    ) -> Result<Option<&Checker<T, P>>, RuleError> {
        let mut current = self;
        loop {
            match current {
                Self::Conditional(c) => {
                    if c.async_condition().is_some() {
                        return Err(RuleError::async_in_sync(property));
                    }
                    if !c.check_condition(model) {
                        return Ok(None);
                    }
                    current = c.inner();
                }
                other => return Ok(Some(other)),
            }
        }
    }

    /// Async twin of [`resolve_conditions`](Self::resolve_conditions):
    /// sync conditions evaluate inline, async conditions are awaited.
    pub(crate) async fn resolve_conditions_async(
        &self,
        model: &T,
        cancellation: &CancellationToken,
    ) -> Option<&Checker<T, P>> {
        let mut current = self;
        loop {
            match current {
                Self::Conditional(c) => {
                    if !c.check_condition(model) {
                        return None;
                    }
                    if let Some(condition) = c.async_condition() {
                        if !condition(model, cancellation.clone()).await {
                            return None;
                        }
                    }
                    current = c.inner();
                }
                other => return Some(other),
            }
        }
    }
}

impl<T, P: ?Sized> Clone for Checker<T, P> {
    fn clone(&self) -> Self {
        match self {
            Self::Predicate(p) => Self::Predicate(p.clone()),
            Self::Conditional(c) => Self::Conditional(c.clone()),
            Self::Child(a) => Self::Child(a.clone()),
        }
    }
}

impl<T, P: ?Sized> fmt::Debug for Checker<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(p) => f.debug_tuple("Predicate").field(p).finish(),
            Self::Conditional(c) => f.debug_tuple("Conditional").field(c).finish(),
            Self::Child(a) => f.debug_tuple("Child").field(a).finish(),
        }
    }
}

impl<T, P> Checker<T, P>
where
    T: Send + Sync,
    P: Send + Sync + Serialize + ?Sized,
{
    /// Runs the unit synchronously. `Ok(true)` means the value passed,
    /// `Ok(false)` means a failure was recorded in the shared sink.
    pub(crate) fn run(
        &self,
        ctx: &PropertyContext<'_, T, P>,
        meta: &ElementMeta<T, P>,
        options: &ValidatorOptions,
    ) -> Result<bool, RuleError> {
        match self {
            Self::Predicate(p) => match p.evaluate_sync(ctx.model(), ctx.value()) {
                Some(true) => Ok(true),
                Some(false) => {
                    ctx.parent()
                        .add_failure(meta.build_failure(ctx, p.name(), options));
                    Ok(false)
                }
                None => Err(RuleError::async_in_sync(ctx.property_name())),
            },
            Self::Conditional(c) => {
                if c.async_condition().is_some() {
                    return Err(RuleError::async_in_sync(ctx.property_name()));
                }
                if !c.check_condition(ctx.model()) {
                    return Ok(true);
                }
                c.inner().run(ctx, meta, options)
            }
            Self::Child(a) => a.validate(ctx),
        }
    }

    /// Async twin of [`run`](Self::run). Boxed because conditional units
    /// recurse through their inner checker.
    pub(crate) fn run_async<'a>(
        &'a self,
        ctx: &'a PropertyContext<'a, T, P>,
        meta: &'a ElementMeta<T, P>,
        options: &'a ValidatorOptions,
    ) -> BoxFuture<'a, Result<bool, RuleError>> {
        Box::pin(async move {
            match self {
                Self::Predicate(p) => {
                    let token = ctx.parent().cancellation().clone();
                    if p.evaluate_async(ctx.model(), ctx.value(), token).await {
                        Ok(true)
                    } else {
                        ctx.parent()
                            .add_failure(meta.build_failure(ctx, p.name(), options));
                        Ok(false)
                    }
                }
                Self::Conditional(c) => {
                    if !c.check_condition(ctx.model()) {
                        return Ok(true);
                    }
                    if let Some(cond) = c.async_condition() {
                        let token = ctx.parent().cancellation().clone();
                        if !cond(ctx.model(), token).await {
                            return Ok(true);
                        }
                    }
                    c.inner().run_async(ctx, meta, options).await
                }
                Self::Child(a) => a.validate_async(ctx).await,
            }
        })
    }
}
