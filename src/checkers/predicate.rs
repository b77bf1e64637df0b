//! Predicate checking units
//!
//! The plainest checking unit: a named predicate over the owning model and
//! the property value. Sync and async flavors exist; an async predicate
//! forces the whole chain through the async entry point.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Synchronous predicate over `(model, value)`.
pub type SyncPredicateFn<T, P> = Arc<dyn Fn(&T, &P) -> bool + Send + Sync>;

/// Asynchronous predicate over `(model, value)` observing cancellation.
pub type AsyncPredicateFn<T, P> =
    Arc<dyn for<'a> Fn(&'a T, &'a P, CancellationToken) -> BoxFuture<'a, bool> + Send + Sync>;

enum PredicateFn<T, P: ?Sized> {
    Sync(SyncPredicateFn<T, P>),
    Async(AsyncPredicateFn<T, P>),
}

/// A named pass/fail check over a single property value.
///
/// The name feeds the default error-code resolver when the rule does not set
/// an explicit code.
///
/// # Examples
///
/// ```rust,ignore
/// use rulekit::checkers::PredicateChecker;
///
/// let checker = PredicateChecker::must("not_empty", |_model: &User, name: &String| {
///     !name.is_empty()
/// });
/// ```
pub struct PredicateChecker<T, P: ?Sized> {
    name: Cow<'static, str>,
    predicate: PredicateFn<T, P>,
}

impl<T, P: ?Sized> PredicateChecker<T, P> {
    /// Creates a synchronous predicate checker.
    pub fn must<F>(name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&T, &P) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: PredicateFn::Sync(Arc::new(predicate)),
        }
    }

    /// Creates an asynchronous predicate checker.
    ///
    /// The predicate receives the run's cancellation token and should observe
    /// it at its own suspension points.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use futures::FutureExt;
    ///
    /// let checker = PredicateChecker::must_async("unique_email", |_m: &User, email: &String, _token| {
    ///     async move { lookup(email).await.is_none() }.boxed()
    /// });
    /// ```
    pub fn must_async<F>(name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: for<'a> Fn(&'a T, &'a P, CancellationToken) -> BoxFuture<'a, bool>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            predicate: PredicateFn::Async(Arc::new(predicate)),
        }
    }

    /// Name of this checking unit.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this checker must run through the async path.
    #[must_use]
    pub fn requires_async(&self) -> bool {
        matches!(self.predicate, PredicateFn::Async(_))
    }

    /// Evaluates the predicate synchronously; `None` if this checker is
    /// async-only and cannot be evaluated on the sync path.
    pub(crate) fn evaluate_sync(&self, model: &T, value: &P) -> Option<bool> {
        match &self.predicate {
            PredicateFn::Sync(predicate) => Some(predicate(model, value)),
            PredicateFn::Async(_) => None,
        }
    }

    /// Evaluates the predicate on the async path. Sync predicates evaluate
    /// eagerly so both paths yield the same verdict for the same input.
    pub(crate) async fn evaluate_async(
        &self,
        model: &T,
        value: &P,
        cancellation: CancellationToken,
    ) -> bool {
        match &self.predicate {
            PredicateFn::Sync(predicate) => predicate(model, value),
            PredicateFn::Async(predicate) => predicate(model, value, cancellation).await,
        }
    }
}

impl<T, P: ?Sized> Clone for PredicateChecker<T, P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: match &self.predicate {
                PredicateFn::Sync(f) => PredicateFn::Sync(Arc::clone(f)),
                PredicateFn::Async(f) => PredicateFn::Async(Arc::clone(f)),
            },
        }
    }
}

impl<T, P: ?Sized> fmt::Debug for PredicateChecker<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateChecker")
            .field("name", &self.name)
            .field("r#async", &self.requires_async())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct Model {
        limit: u32,
    }

    #[test]
    fn sync_predicate_sees_the_owning_model() {
        let checker =
            PredicateChecker::must("below_limit", |m: &Model, v: &u32| *v <= m.limit);
        let model = Model { limit: 10 };

        assert_eq!(checker.evaluate_sync(&model, &5), Some(true));
        assert_eq!(checker.evaluate_sync(&model, &15), Some(false));
        assert!(!checker.requires_async());
    }

    #[test]
    fn async_predicate_cannot_run_on_sync_path() {
        let checker = PredicateChecker::must_async(
            "async_check",
            |_m: &Model, _v: &u32, _token| async move { true }.boxed(),
        );
        let model = Model { limit: 10 };

        assert!(checker.requires_async());
        assert_eq!(checker.evaluate_sync(&model, &5), None);
    }

    #[tokio::test]
    async fn sync_predicate_evaluates_eagerly_on_async_path() {
        let checker =
            PredicateChecker::must("below_limit", |m: &Model, v: &u32| *v <= m.limit);
        let model = Model { limit: 10 };

        let token = CancellationToken::new();
        assert!(checker.evaluate_async(&model, &5, token.clone()).await);
        assert!(!checker.evaluate_async(&model, &15, token).await);
    }
}
