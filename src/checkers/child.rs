//! Child validator adaptor
//!
//! Delegates validation of a nested value to a different, independently
//! defined rule set, recursing through the object graph. The child scope
//! shares the run's failure sink, so nested failures propagate upward
//! without copying; the property path gains this rule's name as a prefix
//! unless the current scope is a collection-element scope (the container
//! name and index are already on the path there).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::context::{PropertyContext, ValidationContext};
use crate::error::RuleError;
use crate::validator::Validator;

// ============================================================================
// NESTED RUN CONTRACT
// ============================================================================

/// Internal erasure over the nested value's type: the adaptor only needs a
/// way to (maybe) resolve a child rule set for the current property value
/// and run it in a child scope, on either execution path.
#[async_trait]
pub(crate) trait NestedRun<T, P: ?Sized>: Send + Sync {
    fn requires_async(&self) -> bool;

    fn validate(&self, ctx: &PropertyContext<'_, T, P>) -> Result<bool, RuleError>;

    async fn validate_async(&self, ctx: &PropertyContext<'_, T, P>) -> Result<bool, RuleError>;
}

/// Builds the child scope for a resolved nested value.
fn child_scope<'a, T, P: ?Sized, C>(
    ctx: &PropertyContext<'a, T, P>,
    value: &'a C,
) -> ValidationContext<'a, C> {
    let parent = ctx.parent();
    let mut child = parent.clone_for_child_validator(value);
    if !parent.inside_collection() {
        child.path_mut().push_property(ctx.rule_name().to_owned());
    }
    child
}

// ============================================================================
// DIRECT CHILD
// ============================================================================

/// The property value itself is validated by the child rule set.
struct DirectChild<P> {
    provider: Arc<dyn Fn(&P) -> Option<Arc<Validator<P>>> + Send + Sync>,
    requires_async: bool,
}

#[async_trait]
impl<T, P> NestedRun<T, P> for DirectChild<P>
where
    T: Send + Sync,
    P: Send + Sync + Serialize + 'static,
{
    fn requires_async(&self) -> bool {
        self.requires_async
    }

    fn validate(&self, ctx: &PropertyContext<'_, T, P>) -> Result<bool, RuleError> {
        let Some(validator) = (self.provider)(ctx.value()) else {
            return Ok(true);
        };
        let child = child_scope(ctx, ctx.value());
        let before = child.failure_count();
        validator.run_rules(&child)?;
        Ok(child.failure_count() == before)
    }

    async fn validate_async(&self, ctx: &PropertyContext<'_, T, P>) -> Result<bool, RuleError> {
        let Some(validator) = (self.provider)(ctx.value()) else {
            return Ok(true);
        };
        let child = child_scope(ctx, ctx.value());
        let before = child.failure_count();
        validator.run_rules_async(&child).await?;
        Ok(child.failure_count() == before)
    }
}

// ============================================================================
// OPTIONAL CHILD
// ============================================================================

/// An `Option`-valued property; `None` is trivially valid (presence checks
/// are a separate, explicit rule).
struct OptionalChild<C> {
    provider: Arc<dyn Fn(&C) -> Option<Arc<Validator<C>>> + Send + Sync>,
    requires_async: bool,
}

#[async_trait]
impl<T, C> NestedRun<T, Option<C>> for OptionalChild<C>
where
    T: Send + Sync,
    C: Send + Sync + Serialize + 'static,
{
    fn requires_async(&self) -> bool {
        self.requires_async
    }

    fn validate(&self, ctx: &PropertyContext<'_, T, Option<C>>) -> Result<bool, RuleError> {
        let Some(value) = ctx.value().as_ref() else {
            return Ok(true);
        };
        let Some(validator) = (self.provider)(value) else {
            return Ok(true);
        };
        let child = child_scope(ctx, value);
        let before = child.failure_count();
        validator.run_rules(&child)?;
        Ok(child.failure_count() == before)
    }

    async fn validate_async(
        &self,
        ctx: &PropertyContext<'_, T, Option<C>>,
    ) -> Result<bool, RuleError> {
        let Some(value) = ctx.value().as_ref() else {
            return Ok(true);
        };
        let Some(validator) = (self.provider)(value) else {
            return Ok(true);
        };
        let child = child_scope(ctx, value);
        let before = child.failure_count();
        validator.run_rules_async(&child).await?;
        Ok(child.failure_count() == before)
    }
}

// ============================================================================
// CHILD ADAPTOR
// ============================================================================

/// Checking unit that recurses into a nested value's own rule set.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use rulekit::checkers::ChildAdaptor;
///
/// let address_rules: Arc<Validator<Address>> = Arc::new(address_validator());
///
/// // Customer.address: Address
/// let adaptor = ChildAdaptor::<Customer, Address>::new(address_rules.clone());
///
/// // Customer.shipping: Option<Address>
/// let optional = ChildAdaptor::<Customer, Option<Address>>::optional(address_rules);
/// ```
pub struct ChildAdaptor<T, P: ?Sized> {
    run: Arc<dyn NestedRun<T, P>>,
}

impl<T, P> ChildAdaptor<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + Serialize + 'static,
{
    /// Validates the property value with a fixed child rule set.
    #[must_use]
    pub fn new(validator: Arc<Validator<P>>) -> Self {
        let requires_async = validator.requires_async();
        Self {
            run: Arc::new(DirectChild {
                provider: Arc::new(move |_: &P| Some(Arc::clone(&validator))),
                requires_async,
            }),
        }
    }

    /// Resolves the child rule set per value (e.g. by runtime variant);
    /// returning `None` skips validation for that value.
    ///
    /// The resolved rule set must not require async when the run entered
    /// through the sync path; that mismatch surfaces as a
    /// [`RuleError::AsyncRuleInSyncRun`] when the child runs.
    #[must_use]
    pub fn with_provider<F>(provider: F) -> Self
    where
        F: Fn(&P) -> Option<Arc<Validator<P>>> + Send + Sync + 'static,
    {
        Self {
            run: Arc::new(DirectChild {
                provider: Arc::new(provider),
                requires_async: false,
            }),
        }
    }
}

impl<T, C> ChildAdaptor<T, Option<C>>
where
    T: Send + Sync + 'static,
    C: Send + Sync + Serialize + 'static,
{
    /// Validates an optional nested value; absence yields no failures.
    #[must_use]
    pub fn optional(validator: Arc<Validator<C>>) -> Self {
        let requires_async = validator.requires_async();
        Self {
            run: Arc::new(OptionalChild {
                provider: Arc::new(move |_: &C| Some(Arc::clone(&validator))),
                requires_async,
            }),
        }
    }
}

impl<T, P: ?Sized> ChildAdaptor<T, P> {
    /// Returns true if the child rule set requires the async path.
    #[must_use]
    pub fn requires_async(&self) -> bool {
        self.run.requires_async()
    }

    pub(crate) fn validate(&self, ctx: &PropertyContext<'_, T, P>) -> Result<bool, RuleError> {
        self.run.validate(ctx)
    }

    pub(crate) async fn validate_async(
        &self,
        ctx: &PropertyContext<'_, T, P>,
    ) -> Result<bool, RuleError> {
        self.run.validate_async(ctx).await
    }
}

impl<T, P: ?Sized> Clone for ChildAdaptor<T, P> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T, P: ?Sized> fmt::Debug for ChildAdaptor<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildAdaptor")
            .field("requires_async", &self.requires_async())
            .finish_non_exhaustive()
    }
}
