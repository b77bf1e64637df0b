//! Validation contexts
//!
//! A [`ValidationContext`] carries the per-run state: the model under
//! validation, the current property path, the shared failure sink and the
//! cancellation token. One context exists per validation scope (top-level model,
//! each nested object, each collection element); cloning for a child scope
//! shares the sink while extending the path.
//!
//! A [`PropertyContext`] is the narrower view handed to a checking unit: the
//! parent scope plus the resolved property value and its qualified name.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::failure::ValidationFailure;
use crate::path::PropertyPath;

// ============================================================================
// FAILURE SINK
// ============================================================================

/// Shared, append-only accumulator for validation failures.
///
/// The sink is the explicitly passed accumulator handle threaded through
/// every context clone; nested scopes append into the same sequence so no
/// failure is ever lost on the way back up. Appends never fail.
#[derive(Clone, Default)]
pub struct FailureSink {
    failures: Arc<Mutex<Vec<ValidationFailure>>>,
}

impl FailureSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one failure; order of appends is discovery order.
    pub fn push(&self, failure: ValidationFailure) {
        self.failures.lock().push(failure);
    }

    /// Appends a batch of failures, preserving their order.
    pub fn extend(&self, failures: Vec<ValidationFailure>) {
        self.failures.lock().extend(failures);
    }

    /// Number of accumulated failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    /// Returns true if nothing has been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }

    /// Removes and returns all accumulated failures.
    #[must_use]
    pub fn drain(&self) -> Vec<ValidationFailure> {
        std::mem::take(&mut *self.failures.lock())
    }

    /// Clones the accumulated failures without removing them.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ValidationFailure> {
        self.failures.lock().clone()
    }
}

impl fmt::Debug for FailureSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureSink")
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// RULE SET FILTER
// ============================================================================

/// Selects which rules take part in a run, by rule-set tag.
///
/// Applied before any rule executes and propagated into child validator
/// scopes unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RuleSetFilter {
    /// Only rules that carry no rule-set tag (the default set).
    #[default]
    Default,
    /// Rules tagged with any of the given names. The reserved name
    /// `"default"` additionally selects untagged rules.
    Named(Vec<String>),
    /// Every rule regardless of tags.
    All,
}

impl RuleSetFilter {
    /// Builds a filter from a list of rule-set names.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Named(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if a rule with the given tags should run.
    #[must_use]
    pub fn matches(&self, rule_sets: &[Cow<'static, str>]) -> bool {
        match self {
            Self::Default => rule_sets.is_empty(),
            Self::All => true,
            Self::Named(names) => names.iter().any(|name| {
                if name == "default" && rule_sets.is_empty() {
                    return true;
                }
                rule_sets.iter().any(|tag| tag == name.as_str())
            }),
        }
    }
}

// ============================================================================
// VALIDATION CONTEXT
// ============================================================================

/// Mutable per-scope validation state.
///
/// The path recorded here always reflects the navigation from the root model
/// to the instance this scope validates; failures are appended with names
/// derived from it at the moment they are discovered, never retroactively.
pub struct ValidationContext<'v, T> {
    model: &'v T,
    path: PropertyPath,
    sink: FailureSink,
    filter: RuleSetFilter,
    inside_collection: bool,
    cancellation: CancellationToken,
}

impl<'v, T> ValidationContext<'v, T> {
    /// Creates a root context for a run over the given model.
    #[must_use]
    pub fn new(model: &'v T) -> Self {
        Self {
            model,
            path: PropertyPath::root(),
            sink: FailureSink::new(),
            filter: RuleSetFilter::default(),
            inside_collection: false,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the rule-set filter for this run.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_filter(mut self, filter: RuleSetFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Attaches a cancellation token observed at checker boundaries.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The instance this scope validates.
    #[must_use]
    pub fn model(&self) -> &'v T {
        self.model
    }

    /// Path from the root model to this scope's instance.
    #[must_use]
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// Mutable access to the path, used by rules while setting up child
    /// scopes. The path must not change while checks against it are running.
    pub fn path_mut(&mut self) -> &mut PropertyPath {
        &mut self.path
    }

    /// The rule-set filter for this run.
    #[must_use]
    pub fn filter(&self) -> &RuleSetFilter {
        &self.filter
    }

    /// Returns true if this scope validates an element of a collection
    /// property. Child adaptors use this to avoid appending the container
    /// property name a second time.
    #[must_use]
    pub fn inside_collection(&self) -> bool {
        self.inside_collection
    }

    /// The cancellation token for this run.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Appends one failure to the shared sequence.
    pub fn add_failure(&self, failure: ValidationFailure) {
        self.sink.push(failure);
    }

    /// Merges a batch of failures into the shared sequence.
    pub fn extend_failures(&self, failures: Vec<ValidationFailure>) {
        self.sink.extend(failures);
    }

    /// Number of failures accumulated so far in this scope's sink.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.sink.len()
    }

    /// Removes and returns the accumulated failures.
    #[must_use]
    pub fn take_failures(&self) -> Vec<ValidationFailure> {
        self.sink.drain()
    }

    /// Clones a new scope for a nested object validated by its own rule set.
    ///
    /// The child shares this scope's failure sink, keeps the current path
    /// (the caller appends the property segment) and is no longer marked as
    /// a collection-element scope.
    #[must_use]
    pub fn clone_for_child_validator<'c, C>(&self, child: &'c C) -> ValidationContext<'c, C> {
        ValidationContext {
            model: child,
            path: self.path.clone(),
            sink: self.sink.clone(),
            filter: self.filter.clone(),
            inside_collection: false,
            cancellation: self.cancellation.clone(),
        }
    }

    /// Clones a new scope for one element of a collection property.
    ///
    /// The element scope keeps the parent model (element values travel in
    /// the [`PropertyContext`]) but gets its own failure buffer; the
    /// collection rule merges that buffer back in index order so the final
    /// sequence stays deterministic.
    #[must_use]
    pub fn clone_for_collection_element(&self) -> ValidationContext<'v, T> {
        ValidationContext {
            model: self.model,
            path: self.path.clone(),
            sink: FailureSink::new(),
            filter: self.filter.clone(),
            inside_collection: true,
            cancellation: self.cancellation.clone(),
        }
    }
}

impl<T> fmt::Debug for ValidationContext<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("path", &self.path.to_string())
            .field("failures", &self.sink.len())
            .field("inside_collection", &self.inside_collection)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// PROPERTY CONTEXT
// ============================================================================

/// The view of a validation scope handed to a single checking unit.
///
/// Bundles the parent scope (conditions are evaluated against it), the
/// resolved property value and both the simple and fully qualified property
/// names.
pub struct PropertyContext<'a, T, P: ?Sized> {
    parent: &'a ValidationContext<'a, T>,
    property_name: &'a str,
    rule_name: &'a str,
    value: &'a P,
}

impl<'a, T, P: ?Sized> PropertyContext<'a, T, P> {
    pub(crate) fn new(
        parent: &'a ValidationContext<'a, T>,
        property_name: &'a str,
        rule_name: &'a str,
        value: &'a P,
    ) -> Self {
        Self {
            parent,
            property_name,
            rule_name,
            value,
        }
    }

    /// The scope that owns the property being checked.
    #[must_use]
    pub fn parent(&self) -> &'a ValidationContext<'a, T> {
        self.parent
    }

    /// The model that owns the property (the parent scope's instance).
    #[must_use]
    pub fn model(&self) -> &'a T {
        self.parent.model()
    }

    /// The value under check.
    #[must_use]
    pub fn value(&self) -> &'a P {
        self.value
    }

    /// Fully qualified property name used on produced failures,
    /// e.g. `"Orders[2].Total"`.
    #[must_use]
    pub fn property_name(&self) -> &'a str {
        self.property_name
    }

    /// The rule's simple property name, e.g. `"Orders"`.
    #[must_use]
    pub fn rule_name(&self) -> &'a str {
        self.rule_name
    }
}

impl<T, P: ?Sized> fmt::Debug for PropertyContext<'_, T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyContext")
            .field("property_name", &self.property_name)
            .field("rule_name", &self.rule_name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
