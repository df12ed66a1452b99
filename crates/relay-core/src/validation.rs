//! # Validation
//!
//! Field-level rule checks run against a bound request before dispatch.
//!
//! A [`Validator`] inspects one request type and reports every violated rule
//! as a [`FieldError`]. Validators for the same request type form a chain:
//! the registry runs all of them, in registration order, and concatenates
//! their findings into one [`ValidationErrors`]. An empty result means the
//! request may proceed to its handler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable rule message.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Ordered list of rule violations. Empty means the request passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, error: FieldError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = FieldError>) {
        self.0.extend(errors);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", err.field, err.message)?;
        }
        Ok(())
    }
}

/// Rule checks for one request type.
///
/// Implementations must report every violation they find rather than
/// stopping at the first.
pub trait Validator: Send + Sync + 'static {
    /// The request type this validator checks.
    type Request: 'static;

    fn validate(&self, request: &Self::Request) -> Vec<FieldError>;
}

type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;

struct Rule<R> {
    field: &'static str,
    predicate: Predicate<R>,
    message: String,
}

/// A validator built from a list of `(field, predicate, message)` rules.
///
/// ```
/// use relay_core::validation::{Rules, Validator};
///
/// #[derive(Default)]
/// struct Lookup { id: i32 }
///
/// let rules = Rules::<Lookup>::new()
///     .rule("Id", |r| r.id > 0, "Id needs to be greater than 0");
///
/// assert_eq!(rules.validate(&Lookup { id: 0 }).len(), 1);
/// assert!(rules.validate(&Lookup { id: 7 }).is_empty());
/// ```
pub struct Rules<R> {
    rules: Vec<Rule<R>>,
}

impl<R: 'static> Rules<R> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule that passes when `predicate` returns `true`.
    pub fn rule(
        mut self,
        field: &'static str,
        predicate: impl Fn(&R) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        self.rules.push(Rule {
            field,
            predicate: Box::new(predicate),
            message: message.into(),
        });
        self
    }
}

impl<R: 'static> Default for Rules<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Send + Sync + 'static> Validator for Rules<R> {
    type Request = R;

    fn validate(&self, request: &R) -> Vec<FieldError> {
        self.rules
            .iter()
            .filter(|rule| !(rule.predicate)(request))
            .map(|rule| FieldError::new(rule.field, rule.message.clone()))
            .collect()
    }
}
