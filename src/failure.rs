//! Validation failure records
//!
//! This module provides the structured record produced when a checking unit
//! rejects a value. Failures are created exactly once, at the moment a check
//! fails, and are immutable afterwards.
//!
//! All static string fields use `Cow<'static, str>` for zero-allocation in
//! the common case of error codes known at compile time.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;

// ============================================================================
// SEVERITY
// ============================================================================

/// Severity level of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Severity {
    /// Failure that must be fixed (default).
    #[default]
    Error,
    /// Failure that should be addressed but may be tolerated by the caller.
    Warning,
    /// Informational finding.
    Info,
}

// ============================================================================
// PLACEHOLDERS
// ============================================================================

/// Ordered placeholder data collected for a failure message.
///
/// Typically 2-4 entries (`PropertyName`, `PropertyValue`, plus any
/// check-specific values). Consumed by external message formatting.
pub type Placeholders = SmallVec<[(Cow<'static, str>, String); 4]>;

/// Substitutes `{Key}` markers in a message template with placeholder values.
///
/// Unknown markers are left untouched so a downstream formatter can still
/// resolve them from the failure's placeholder data.
#[must_use]
pub fn format_message(template: &str, placeholders: &Placeholders) -> String {
    let mut message = template.to_owned();
    for (key, value) in placeholders {
        let marker = format!("{{{key}}}");
        if message.contains(marker.as_str()) {
            message = message.replace(marker.as_str(), value);
        }
    }
    message
}

// ============================================================================
// VALIDATION FAILURE
// ============================================================================

/// A structured record of one failed check.
///
/// Owned by the run's failure sequence once appended; discovery order is
/// preserved and duplicates are never collapsed.
///
/// # Examples
///
/// ```rust,ignore
/// use rulekit::ValidationFailure;
///
/// let failure = ValidationFailure::new("Orders[2].Total", "'Total' must be positive")
///     .with_code("positive")
///     .with_attempted_value(serde_json::json!(-5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationFailure {
    /// Full property path of the failed value, e.g. `"Orders[2].Total"`.
    pub property_name: String,

    /// Rendered error message (default template with placeholders applied).
    pub error_message: String,

    /// Error code for programmatic handling and i18n.
    pub error_code: Cow<'static, str>,

    /// The value that failed the check, captured as JSON.
    pub attempted_value: serde_json::Value,

    /// Severity of the failure.
    pub severity: Severity,

    /// Optional caller-supplied state attached by the rule configuration.
    pub custom_state: Option<serde_json::Value>,

    /// Additional positional message arguments, in the order they were
    /// appended by the checking unit.
    pub message_arguments: Vec<String>,

    /// Named placeholder values for message templating.
    pub placeholders: Placeholders,
}

impl ValidationFailure {
    /// Creates a new failure for a property with a rendered message.
    pub fn new(property_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            error_message: error_message.into(),
            error_code: Cow::Borrowed(""),
            attempted_value: serde_json::Value::Null,
            severity: Severity::Error,
            custom_state: None,
            message_arguments: Vec::new(),
            placeholders: SmallVec::new(),
        }
    }

    /// Sets the error code.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        self.error_code = code.into();
        self
    }

    /// Sets the attempted value.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_attempted_value(mut self, value: serde_json::Value) -> Self {
        self.attempted_value = value;
        self
    }

    /// Sets the severity.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Attaches custom state.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_custom_state(mut self, state: serde_json::Value) -> Self {
        self.custom_state = Some(state);
        self
    }

    /// Appends a named placeholder value.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_placeholder(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<String>,
    ) -> Self {
        self.placeholders.push((key.into(), value.into()));
        self
    }

    /// Appends a positional message argument.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_message_argument(mut self, argument: impl Into<String>) -> Self {
        self.message_arguments.push(argument.into());
        self
    }

    /// Looks up a placeholder value by key.
    #[must_use]
    pub fn placeholder(&self, key: &str) -> Option<&str> {
        self.placeholders
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.property_name.is_empty() {
            write!(f, "{}", self.error_message)
        } else {
            write!(f, "[{}] {}", self.property_name, self.error_message)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
