//! Property and collection rules
//!
//! A rule binds a property accessor to a chain of checking units and the
//! run policy around them: cascade mode, conditions evaluated on the owning
//! model, and rule-set tags. [`PropertyRule`] covers a single value,
//! [`CollectionRule`] fans the same chain out over every element of a
//! collection, qualifying each failure path with the element index.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::checkers::{
    AsyncConditionFn, Checker, ChildAdaptor, ConditionFn, ConditionalChecker, PredicateChecker,
};
use crate::context::{PropertyContext, ValidationContext};
use crate::element::RuleElement;
use crate::error::RuleError;
use crate::failure::Severity;
use crate::validator::{Validator, ValidatorOptions};

/// Borrows a property value out of the model.
pub type Accessor<T, P> = Arc<dyn for<'a> Fn(&'a T) -> &'a P + Send + Sync>;

/// Borrows an iterator over collection elements out of the model.
pub type CollectionAccessor<T, P> =
    Arc<dyn for<'a> Fn(&'a T) -> Box<dyn Iterator<Item = &'a P> + Send + 'a> + Send + Sync>;

// ============================================================================
// CASCADE MODE
// ============================================================================

/// What happens to the rest of a rule's chain after a unit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadeMode {
    /// Run every unit; collect all failures.
    #[default]
    Continue,
    /// Stop the chain at the first failing unit. For collection rules the
    /// stop is per element; remaining elements are still visited.
    StopOnFirstFailure,
}

// ============================================================================
// VALIDATION RULE
// ============================================================================

/// Object-safe surface the runner drives rules through.
///
/// `validate`/`validate_async` record failures into the context's shared
/// sink and return whether the rule passed. A configuration error (an
/// async-only unit reached from the sync path, a collection rule without a
/// property name) aborts the run with a [`RuleError`].
#[async_trait]
pub trait ValidationRule<T>: Send + Sync {
    /// Simple property name this rule targets.
    fn property_name(&self) -> &str;

    /// Rule-set tags; empty means the implicit "default" set.
    fn rule_sets(&self) -> &[Cow<'static, str>];

    /// True if any part of the rule can only run on the async path.
    fn requires_async(&self) -> bool;

    /// Runs the rule synchronously.
    fn validate(
        &self,
        ctx: &ValidationContext<'_, T>,
        options: &ValidatorOptions,
    ) -> Result<bool, RuleError>;

    /// Runs the rule on the async path. Sync units are evaluated inline.
    async fn validate_async(
        &self,
        ctx: &ValidationContext<'_, T>,
        options: &ValidatorOptions,
    ) -> Result<bool, RuleError>;
}

// ============================================================================
// PROPERTY RULE
// ============================================================================

/// Rule over a single property value.
///
/// # Examples
///
/// ```rust,ignore
/// use rulekit::prelude::*;
///
/// let rule = PropertyRule::new("Name", |u: &User| &u.name)
///     .must("NotEmpty", |_, name: &String| !name.is_empty())
///     .with_message("'{PropertyName}' must not be empty")
///     .must("MaxLength", |_, name: &String| name.len() <= 64)
///     .cascade(CascadeMode::StopOnFirstFailure);
/// ```
pub struct PropertyRule<T, P: ?Sized> {
    name: Cow<'static, str>,
    accessor: Accessor<T, P>,
    cascade: CascadeMode,
    elements: Vec<RuleElement<T, P>>,
    rule_sets: Vec<Cow<'static, str>>,
    condition: Option<ConditionFn<T>>,
    async_condition: Option<AsyncConditionFn<T>>,
}

impl<T, P: ?Sized> PropertyRule<T, P> {
    /// Creates an empty rule for the named property.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, accessor: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> &'a P + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            accessor: Arc::new(accessor),
            cascade: CascadeMode::default(),
            elements: Vec::new(),
            rule_sets: Vec::new(),
            condition: None,
            async_condition: None,
        }
    }

    /// Appends a named synchronous predicate unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn must<F>(mut self, name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&T, &P) -> bool + Send + Sync + 'static,
    {
        self.elements.push(RuleElement::new(Checker::Predicate(
            PredicateChecker::must(name, predicate),
        )));
        self
    }

    /// Appends a named asynchronous predicate unit. The whole rule then
    /// requires the async entry point.
    #[must_use = "builder methods must be chained or built"]
    pub fn must_async<F>(mut self, name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: for<'a> Fn(&'a T, &'a P, CancellationToken) -> BoxFuture<'a, bool>
            + Send
            + Sync
            + 'static,
    {
        self.elements.push(RuleElement::new(Checker::Predicate(
            PredicateChecker::must_async(name, predicate),
        )));
        self
    }

    /// Appends a pre-built child adaptor unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn nested(mut self, adaptor: ChildAdaptor<T, P>) -> Self {
        self.elements
            .push(RuleElement::new(Checker::Child(adaptor)));
        self
    }

    /// Overrides the message template of the most recent unit.
    /// `{PropertyName}`, `{PropertyValue}` and placeholders added through
    /// [`with_placeholder`](Self::with_placeholder) are substituted.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_message(mut self, template: impl Into<Cow<'static, str>>) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.meta.message = Some(template.into());
        }
        self
    }

    /// Overrides the error code of the most recent unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_error_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.meta.error_code = Some(code.into());
        }
        self
    }

    /// Sets the severity of failures produced by the most recent unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.meta.severity = severity;
        }
        self
    }

    /// Attaches caller state to failures produced by the most recent unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_state<F>(mut self, state: F) -> Self
    where
        F: Fn(&T, &P) -> serde_json::Value + Send + Sync + 'static,
    {
        if let Some(last) = self.elements.last_mut() {
            last.meta.custom_state = Some(Arc::new(state));
        }
        self
    }

    /// Adds a named placeholder for the most recent unit's message template.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_placeholder(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<String>,
    ) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.meta.placeholders.push((key.into(), value.into()));
        }
        self
    }

    /// Gates only the most recent unit on a condition over the model.
    #[must_use = "builder methods must be chained or built"]
    pub fn when_current<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        if let Some(element) = self.elements.pop() {
            self.elements.push(element.map_checker(|checker| {
                Checker::Conditional(Box::new(ConditionalChecker::when(checker, condition)))
            }));
        }
        self
    }

    /// Inverse of [`when_current`](Self::when_current).
    #[must_use = "builder methods must be chained or built"]
    pub fn unless_current<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        if let Some(element) = self.elements.pop() {
            self.elements.push(element.map_checker(|checker| {
                Checker::Conditional(Box::new(ConditionalChecker::unless(checker, condition)))
            }));
        }
        self
    }

    /// Gates only the most recent unit on an asynchronous condition. The
    /// rule then requires the async entry point.
    #[must_use = "builder methods must be chained or built"]
    pub fn when_current_async<C>(mut self, condition: C) -> Self
    where
        C: for<'a> Fn(&'a T, CancellationToken) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        if let Some(element) = self.elements.pop() {
            self.elements.push(element.map_checker(|checker| {
                Checker::Conditional(Box::new(ConditionalChecker::when_async(checker, condition)))
            }));
        }
        self
    }

    /// Gates the whole rule on a condition over the model. Evaluated once
    /// per run; a false condition skips every unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn when<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Inverse of [`when`](Self::when).
    #[must_use = "builder methods must be chained or built"]
    pub fn unless<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(move |model| !condition(model)));
        self
    }

    /// Gates the whole rule on an asynchronous condition. The rule then
    /// requires the async entry point.
    #[must_use = "builder methods must be chained or built"]
    pub fn when_async<C>(mut self, condition: C) -> Self
    where
        C: for<'a> Fn(&'a T, CancellationToken) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        self.async_condition = Some(Arc::new(condition));
        self
    }

    /// Sets the cascade mode for this rule's chain.
    #[must_use = "builder methods must be chained or built"]
    pub fn cascade(mut self, mode: CascadeMode) -> Self {
        self.cascade = mode;
        self
    }

    /// Tags the rule with a rule-set name. Untagged rules belong to the
    /// implicit "default" set.
    #[must_use = "builder methods must be chained or built"]
    pub fn in_rule_set(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.rule_sets.push(name.into());
        self
    }
}

impl<T, P> PropertyRule<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + Serialize + 'static,
{
    /// Appends a unit that recurses into the value's own rule set.
    #[must_use = "builder methods must be chained or built"]
    pub fn child_validator(self, validator: Arc<Validator<P>>) -> Self {
        self.nested(ChildAdaptor::new(validator))
    }
}

impl<T, C> PropertyRule<T, Option<C>>
where
    T: Send + Sync + 'static,
    C: Send + Sync + Serialize + 'static,
{
    /// Child-validates an optional value; `None` produces no failures.
    #[must_use = "builder methods must be chained or built"]
    pub fn child_validator_opt(self, validator: Arc<Validator<C>>) -> Self {
        self.nested(ChildAdaptor::optional(validator))
    }
}

#[async_trait]
impl<T, P> ValidationRule<T> for PropertyRule<T, P>
where
    T: Send + Sync,
    P: Send + Sync + Serialize + ?Sized,
{
    fn property_name(&self) -> &str {
        &self.name
    }

    fn rule_sets(&self) -> &[Cow<'static, str>] {
        &self.rule_sets
    }

    fn requires_async(&self) -> bool {
        self.async_condition.is_some()
            || self.elements.iter().any(RuleElement::requires_async)
    }

    fn validate(
        &self,
        ctx: &ValidationContext<'_, T>,
        options: &ValidatorOptions,
    ) -> Result<bool, RuleError> {
        if self.async_condition.is_some() {
            return Err(RuleError::async_in_sync(self.name.as_ref()));
        }
        if let Some(condition) = &self.condition {
            if !condition(ctx.model()) {
                return Ok(true);
            }
        }

        let value = (self.accessor)(ctx.model());
        let qualified = ctx.path().qualify(&self.name);
        let pctx = PropertyContext::new(ctx, &qualified, &self.name, value);

        let mut valid = true;
        for element in &self.elements {
            if ctx.is_cancelled() {
                break;
            }
            if !element.run(&pctx, options)? {
                valid = false;
                if self.cascade == CascadeMode::StopOnFirstFailure {
                    break;
                }
            }
        }
        Ok(valid)
    }

    async fn validate_async(
        &self,
        ctx: &ValidationContext<'_, T>,
        options: &ValidatorOptions,
    ) -> Result<bool, RuleError> {
        if let Some(condition) = &self.condition {
            if !condition(ctx.model()) {
                return Ok(true);
            }
        }
        if let Some(condition) = &self.async_condition {
            if !condition(ctx.model(), ctx.cancellation().clone()).await {
                return Ok(true);
            }
        }

        let value = (self.accessor)(ctx.model());
        let qualified = ctx.path().qualify(&self.name);
        let pctx = PropertyContext::new(ctx, &qualified, &self.name, value);

        let mut valid = true;
        for element in &self.elements {
            if ctx.is_cancelled() {
                break;
            }
            if !element.run_async(&pctx, options).await? {
                valid = false;
                if self.cascade == CascadeMode::StopOnFirstFailure {
                    break;
                }
            }
        }
        Ok(valid)
    }
}

impl<T, P: ?Sized> fmt::Debug for PropertyRule<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRule")
            .field("name", &self.name)
            .field("cascade", &self.cascade)
            .field("elements", &self.elements.len())
            .field("rule_sets", &self.rule_sets)
            .field("has_condition", &self.condition.is_some())
            .field("has_async_condition", &self.async_condition.is_some())
            .finish()
    }
}

// ============================================================================
// COLLECTION RULE
// ============================================================================

/// Fans one chain of checking units out over every element of a collection.
///
/// Each element gets its own scope: failures carry the indexed path
/// (`Orders[2].Total`), cascade stops apply per element, and element
/// failures merge into the run's sink in element order.
///
/// # Examples
///
/// ```rust,ignore
/// let rule = CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
///     .must("Positive", |_, order: &Order| order.total > 0.0);
/// ```
pub struct CollectionRule<T, P> {
    name: Cow<'static, str>,
    accessor: CollectionAccessor<T, P>,
    cascade: CascadeMode,
    elements: Vec<RuleElement<T, P>>,
    rule_sets: Vec<Cow<'static, str>>,
    condition: Option<ConditionFn<T>>,
    async_condition: Option<AsyncConditionFn<T>>,
}

impl<T, P> CollectionRule<T, P> {
    fn with_accessor(name: Cow<'static, str>, accessor: CollectionAccessor<T, P>) -> Self {
        Self {
            name,
            accessor,
            cascade: CascadeMode::default(),
            elements: Vec::new(),
            rule_sets: Vec::new(),
            condition: None,
            async_condition: None,
        }
    }

    /// Collection exposed as a slice.
    pub fn from_slice<F>(name: impl Into<Cow<'static, str>>, accessor: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> &'a [P] + Send + Sync + 'static,
        P: Sync,
    {
        Self::with_accessor(
            name.into(),
            Arc::new(move |model| {
                let iter: Box<dyn Iterator<Item = &P> + Send + '_> =
                    Box::new(accessor(model).iter());
                iter
            }),
        )
    }

    /// Optional collection; `None` behaves like an empty collection.
    pub fn from_option<F>(name: impl Into<Cow<'static, str>>, accessor: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> Option<&'a [P]> + Send + Sync + 'static,
        P: Sync,
    {
        Self::with_accessor(
            name.into(),
            Arc::new(move |model| {
                let iter: Box<dyn Iterator<Item = &P> + Send + '_> =
                    Box::new(accessor(model).into_iter().flat_map(<[P]>::iter));
                iter
            }),
        )
    }

    /// Arbitrary element source; the accessor yields borrowed elements in
    /// the order their indexes should appear in failure paths.
    pub fn from_iter<F>(name: impl Into<Cow<'static, str>>, accessor: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> Box<dyn Iterator<Item = &'a P> + Send + 'a>
            + Send
            + Sync
            + 'static,
    {
        Self::with_accessor(name.into(), Arc::new(accessor))
    }

    /// Appends a named synchronous predicate unit, run once per element.
    #[must_use = "builder methods must be chained or built"]
    pub fn must<F>(mut self, name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&T, &P) -> bool + Send + Sync + 'static,
    {
        self.elements.push(RuleElement::new(Checker::Predicate(
            PredicateChecker::must(name, predicate),
        )));
        self
    }

    /// Appends a named asynchronous predicate unit, run once per element.
    #[must_use = "builder methods must be chained or built"]
    pub fn must_async<F>(mut self, name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: for<'a> Fn(&'a T, &'a P, CancellationToken) -> BoxFuture<'a, bool>
            + Send
            + Sync
            + 'static,
    {
        self.elements.push(RuleElement::new(Checker::Predicate(
            PredicateChecker::must_async(name, predicate),
        )));
        self
    }

    /// Appends a pre-built child adaptor unit, run once per element.
    #[must_use = "builder methods must be chained or built"]
    pub fn nested(mut self, adaptor: ChildAdaptor<T, P>) -> Self {
        self.elements
            .push(RuleElement::new(Checker::Child(adaptor)));
        self
    }

    /// Overrides the message template of the most recent unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_message(mut self, template: impl Into<Cow<'static, str>>) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.meta.message = Some(template.into());
        }
        self
    }

    /// Overrides the error code of the most recent unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_error_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.meta.error_code = Some(code.into());
        }
        self
    }

    /// Sets the severity of failures produced by the most recent unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.meta.severity = severity;
        }
        self
    }

    /// Attaches caller state to failures produced by the most recent unit.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_state<F>(mut self, state: F) -> Self
    where
        F: Fn(&T, &P) -> serde_json::Value + Send + Sync + 'static,
    {
        if let Some(last) = self.elements.last_mut() {
            last.meta.custom_state = Some(Arc::new(state));
        }
        self
    }

    /// Adds a named placeholder for the most recent unit's message template.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_placeholder(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<String>,
    ) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.meta.placeholders.push((key.into(), value.into()));
        }
        self
    }

    /// Gates only the most recent unit on a condition over the model.
    #[must_use = "builder methods must be chained or built"]
    pub fn when_current<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        if let Some(element) = self.elements.pop() {
            self.elements.push(element.map_checker(|checker| {
                Checker::Conditional(Box::new(ConditionalChecker::when(checker, condition)))
            }));
        }
        self
    }

    /// Inverse of [`when_current`](Self::when_current).
    #[must_use = "builder methods must be chained or built"]
    pub fn unless_current<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        if let Some(element) = self.elements.pop() {
            self.elements.push(element.map_checker(|checker| {
                Checker::Conditional(Box::new(ConditionalChecker::unless(checker, condition)))
            }));
        }
        self
    }

    /// Gates only the most recent unit on an asynchronous condition. The
    /// rule then requires the async entry point.
    #[must_use = "builder methods must be chained or built"]
    pub fn when_current_async<C>(mut self, condition: C) -> Self
    where
        C: for<'a> Fn(&'a T, CancellationToken) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        if let Some(element) = self.elements.pop() {
            self.elements.push(element.map_checker(|checker| {
                Checker::Conditional(Box::new(ConditionalChecker::when_async(checker, condition)))
            }));
        }
        self
    }

    /// Gates the whole rule on a condition over the model, evaluated once
    /// per run (not per element).
    #[must_use = "builder methods must be chained or built"]
    pub fn when<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Inverse of [`when`](Self::when).
    #[must_use = "builder methods must be chained or built"]
    pub fn unless<C>(mut self, condition: C) -> Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(move |model| !condition(model)));
        self
    }

    /// Gates the whole rule on an asynchronous condition.
    #[must_use = "builder methods must be chained or built"]
    pub fn when_async<C>(mut self, condition: C) -> Self
    where
        C: for<'a> Fn(&'a T, CancellationToken) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        self.async_condition = Some(Arc::new(condition));
        self
    }

    /// Sets the per-element cascade mode.
    #[must_use = "builder methods must be chained or built"]
    pub fn cascade(mut self, mode: CascadeMode) -> Self {
        self.cascade = mode;
        self
    }

    /// Tags the rule with a rule-set name.
    #[must_use = "builder methods must be chained or built"]
    pub fn in_rule_set(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.rule_sets.push(name.into());
        self
    }

    fn missing_name_error(&self) -> RuleError {
        RuleError::missing_name(format!("for_each<{}>", std::any::type_name::<P>()))
    }
}

impl<T, P> CollectionRule<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + Serialize + 'static,
{
    /// Child-validates every element with the given rule set.
    #[must_use = "builder methods must be chained or built"]
    pub fn child_validator(self, validator: Arc<Validator<P>>) -> Self {
        self.nested(ChildAdaptor::new(validator))
    }
}

#[async_trait]
impl<T, P> ValidationRule<T> for CollectionRule<T, P>
where
    T: Send + Sync,
    P: Send + Sync + Serialize,
{
    fn property_name(&self) -> &str {
        &self.name
    }

    fn rule_sets(&self) -> &[Cow<'static, str>] {
        &self.rule_sets
    }

    fn requires_async(&self) -> bool {
        self.async_condition.is_some()
            || self.elements.iter().any(RuleElement::requires_async)
    }

    fn validate(
        &self,
        ctx: &ValidationContext<'_, T>,
        options: &ValidatorOptions,
    ) -> Result<bool, RuleError> {
        if self.name.is_empty() {
            return Err(self.missing_name_error());
        }
        if self.async_condition.is_some() {
            return Err(RuleError::async_in_sync(self.name.as_ref()));
        }
        if let Some(condition) = &self.condition {
            if !condition(ctx.model()) {
                return Ok(true);
            }
        }

        // Unit-level conditions fire once per rule invocation, before any
        // element is visited; elements then run only the units left active.
        let mut active = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            active.push(element.checker.resolve_conditions(ctx.model(), &self.name)?);
        }

        let mut valid = true;
        for (index, value) in (self.accessor)(ctx.model()).enumerate() {
            if ctx.is_cancelled() {
                break;
            }
            // Per-element scope: fresh sink, indexed path. Failures merge
            // into the parent sink afterwards so element order is stable
            // even if this loop ever runs elements out of order.
            let mut element_ctx = ctx.clone_for_collection_element();
            element_ctx.path_mut().push_property(self.name.clone());
            element_ctx.path_mut().push_index(index);
            let qualified = element_ctx.path().to_string();

            {
                let pctx = PropertyContext::new(&element_ctx, &qualified, &self.name, value);
                for (element, checker) in self.elements.iter().zip(&active) {
                    let Some(checker) = checker else { continue };
                    if ctx.is_cancelled() {
                        break;
                    }
                    if !checker.run(&pctx, &element.meta, options)? {
                        valid = false;
                        if self.cascade == CascadeMode::StopOnFirstFailure {
                            break;
                        }
                    }
                }
            }
            ctx.extend_failures(element_ctx.take_failures());
        }
        Ok(valid)
    }

    async fn validate_async(
        &self,
        ctx: &ValidationContext<'_, T>,
        options: &ValidatorOptions,
    ) -> Result<bool, RuleError> {
        if self.name.is_empty() {
            return Err(self.missing_name_error());
        }
        if let Some(condition) = &self.condition {
            if !condition(ctx.model()) {
                return Ok(true);
            }
        }
        if let Some(condition) = &self.async_condition {
            if !condition(ctx.model(), ctx.cancellation().clone()).await {
                return Ok(true);
            }
        }

        let mut active = Vec::with_capacity(self.elements.len());
        for element in &self.elements {
            active.push(
                element
                    .checker
                    .resolve_conditions_async(ctx.model(), ctx.cancellation())
                    .await,
            );
        }

        let mut valid = true;
        for (index, value) in (self.accessor)(ctx.model()).enumerate() {
            if ctx.is_cancelled() {
                break;
            }
            let mut element_ctx = ctx.clone_for_collection_element();
            element_ctx.path_mut().push_property(self.name.clone());
            element_ctx.path_mut().push_index(index);
            let qualified = element_ctx.path().to_string();

            {
                let pctx = PropertyContext::new(&element_ctx, &qualified, &self.name, value);
                for (element, checker) in self.elements.iter().zip(&active) {
                    let Some(checker) = checker else { continue };
                    if ctx.is_cancelled() {
                        break;
                    }
                    if !checker.run_async(&pctx, &element.meta, options).await? {
                        valid = false;
                        if self.cascade == CascadeMode::StopOnFirstFailure {
                            break;
                        }
                    }
                }
            }
            ctx.extend_failures(element_ctx.take_failures());
        }
        Ok(valid)
    }
}

impl<T, P> fmt::Debug for CollectionRule<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionRule")
            .field("name", &self.name)
            .field("cascade", &self.cascade)
            .field("elements", &self.elements.len())
            .field("rule_sets", &self.rule_sets)
            .field("has_condition", &self.condition.is_some())
            .field("has_async_condition", &self.async_condition.is_some())
            .finish()
    }
}
