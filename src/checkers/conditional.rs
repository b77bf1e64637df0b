//! Conditional wrapper
//!
//! Gates an inner checking unit behind a predicate evaluated against the
//! *parent* model (the value that owns the property being checked), never
//! the element or child value itself. This lets a condition reference
//! sibling properties of the containing object even while a collection
//! element or nested object is being validated.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::Checker;

/// Synchronous condition over the owning model.
pub type ConditionFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Asynchronous condition over the owning model observing cancellation.
pub type AsyncConditionFn<T> =
    Arc<dyn for<'a> Fn(&'a T, CancellationToken) -> BoxFuture<'a, bool> + Send + Sync>;

/// Wraps an inner checking unit with a sync and/or async condition.
///
/// Constructing with an async condition implicitly sets the sync condition
/// to "always true": the real gating happens asynchronously, and the
/// presence of the async condition forces the chain through the async path.
pub struct ConditionalChecker<T, P: ?Sized> {
    inner: Checker<T, P>,
    condition: ConditionFn<T>,
    async_condition: Option<AsyncConditionFn<T>>,
}

impl<T, P: ?Sized> ConditionalChecker<T, P> {
    /// Gates `inner` behind a synchronous condition.
    pub fn when<C>(inner: Checker<T, P>, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            condition: Arc::new(condition),
            async_condition: None,
        }
    }

    /// Gates `inner` behind the inverse of a synchronous condition.
    pub fn unless<C>(inner: Checker<T, P>, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::when(inner, move |model: &T| !condition(model))
    }

    /// Gates `inner` behind an asynchronous condition.
    pub fn when_async<C>(inner: Checker<T, P>, condition: C) -> Self
    where
        C: for<'a> Fn(&'a T, CancellationToken) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        Self {
            inner,
            condition: Arc::new(|_| true),
            async_condition: Some(Arc::new(condition)),
        }
    }

    /// The wrapped checking unit.
    #[must_use]
    pub fn inner(&self) -> &Checker<T, P> {
        &self.inner
    }

    /// Evaluates the synchronous condition against the owning model.
    ///
    /// Collection rules use this as a quick single-shot gate without running
    /// the full chain; for async-conditioned wrappers it is always true.
    #[must_use]
    pub fn check_condition(&self, model: &T) -> bool {
        (self.condition)(model)
    }

    pub(crate) fn async_condition(&self) -> Option<&AsyncConditionFn<T>> {
        self.async_condition.as_ref()
    }

    /// Returns true if the async condition or the inner unit requires the
    /// async path.
    #[must_use]
    pub fn requires_async(&self) -> bool {
        self.async_condition.is_some() || self.inner.requires_async()
    }
}

impl<T, P: ?Sized> Clone for ConditionalChecker<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            condition: Arc::clone(&self.condition),
            async_condition: self.async_condition.as_ref().map(Arc::clone),
        }
    }
}

impl<T, P: ?Sized> fmt::Debug for ConditionalChecker<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalChecker")
            .field("inner", &self.inner)
            .field("has_async_condition", &self.async_condition.is_some())
            .finish()
    }
}
