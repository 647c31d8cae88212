//! Requirement rules.
//!
//! A [`Rule`] is a boolean expression over field presence. It is resolved
//! against the set of fields that survived filtering, and renders to a
//! human-readable text used in failure messages.
//!
//! ```rust,ignore
//! let name = schema.field("name")?;
//! let email = schema.field("email")?;
//! let phone = schema.field("phone")?;
//!
//! let rule = Rule::from(&name) & (Rule::from(&email) | Rule::from(&phone));
//! assert_eq!(rule.to_string(), "(name AND (email OR phone))");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use outpost_schema::FieldId;

use crate::error::{ErrorKind, ValidationError};

// ============================================================================
// RULE
// ============================================================================

/// Boolean expression over field presence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Rule {
    /// Always satisfied. Renders as the empty string.
    #[default]
    NoRequirement,
    /// Satisfied when the field is present.
    Require(FieldId),
    /// Satisfied when every child is satisfied.
    And(Vec<Rule>),
    /// Satisfied when at least one child is satisfied.
    Or(Vec<Rule>),
    /// Satisfied when the child is not.
    Not(Box<Rule>),
}

impl Rule {
    /// Requires a single field.
    #[must_use]
    pub fn require(field: &FieldId) -> Self {
        Self::Require(field.clone())
    }

    /// Conjunction of `rules`, flattened.
    ///
    /// Empty input yields [`Rule::NoRequirement`]; a single rule is returned
    /// unchanged.
    pub fn all(rules: impl IntoIterator<Item = impl Into<Rule>>) -> Self {
        rules
            .into_iter()
            .fold(Self::NoRequirement, |acc, rule| acc.and(rule.into()))
    }

    /// Disjunction of `rules`, flattened. Empty input yields
    /// [`Rule::NoRequirement`].
    pub fn any(rules: impl IntoIterator<Item = impl Into<Rule>>) -> Self {
        rules
            .into_iter()
            .map(Into::<Rule>::into)
            .reduce(Rule::or)
            .unwrap_or_default()
    }

    /// Combines two rules with AND.
    ///
    /// [`Rule::NoRequirement`] is the identity and nested AND groups are
    /// merged, so repeated composition stays one flat group.
    #[must_use]
    pub fn and(self, other: Rule) -> Self {
        match (self, other) {
            (Self::NoRequirement, rule) | (rule, Self::NoRequirement) => rule,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), rule) => {
                left.push(rule);
                Self::And(left)
            }
            (rule, Self::And(right)) => {
                let mut children = Vec::with_capacity(right.len() + 1);
                children.push(rule);
                children.extend(right);
                Self::And(children)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Combines two rules with OR, merging nested OR groups.
    ///
    /// An alternative that is always satisfied makes the whole group
    /// [`Rule::NoRequirement`].
    #[must_use]
    pub fn or(self, other: Rule) -> Self {
        match (self, other) {
            (Self::NoRequirement, _) | (_, Self::NoRequirement) => Self::NoRequirement,
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), rule) => {
                left.push(rule);
                Self::Or(left)
            }
            (rule, Self::Or(right)) => {
                let mut children = Vec::with_capacity(right.len() + 1);
                children.push(rule);
                children.extend(right);
                Self::Or(children)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }

    /// Logical negation.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoRequirement)
    }

    /// Every field referenced anywhere in the rule, in rendering order.
    #[must_use]
    pub fn fields(&self) -> Vec<&FieldId> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldId>) {
        match self {
            Self::NoRequirement => {}
            Self::Require(field) => out.push(field),
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Self::Not(child) => child.collect_fields(out),
        }
    }

    /// Human-readable rendering, e.g. `(a AND (b OR c))`.
    #[must_use]
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Checks the rule against the set of present fields.
    pub fn resolve(&self, present: &HashSet<FieldId>) -> Result<(), RequirementError> {
        if self.is_satisfied(present) {
            return Ok(());
        }
        Err(match self {
            Self::Require(field) => RequirementError::Missing {
                field: field.name().to_owned(),
            },
            Self::Not(_) => RequirementError::Forbidden { rule: self.text() },
            _ => RequirementError::Unsatisfied { rule: self.text() },
        })
    }

    /// Whether the rule holds for the present fields.
    #[must_use]
    pub fn is_satisfied(&self, present: &HashSet<FieldId>) -> bool {
        match self {
            Self::NoRequirement => true,
            Self::Require(field) => present.contains(field),
            Self::And(children) => children.iter().all(|child| child.is_satisfied(present)),
            Self::Or(children) => {
                children.is_empty() || children.iter().any(|child| child.is_satisfied(present))
            }
            Self::Not(child) => !child.is_satisfied(present),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRequirement => Ok(()),
            Self::Require(field) => f.write_str(field.name()),
            Self::And(children) => write_group(f, children, " AND "),
            Self::Or(children) => write_group(f, children, " OR "),
            Self::Not(child) => write!(f, "NOT {child}"),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, children: &[Rule], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

impl From<FieldId> for Rule {
    fn from(field: FieldId) -> Self {
        Self::Require(field)
    }
}

impl From<&FieldId> for Rule {
    fn from(field: &FieldId) -> Self {
        Self::Require(field.clone())
    }
}

impl<R: Into<Rule>> BitAnd<R> for Rule {
    type Output = Rule;

    fn bitand(self, rhs: R) -> Rule {
        self.and(rhs.into())
    }
}

impl<R: Into<Rule>> BitOr<R> for Rule {
    type Output = Rule;

    fn bitor(self, rhs: R) -> Rule {
        self.or(rhs.into())
    }
}

impl Not for Rule {
    type Output = Rule;

    fn not(self) -> Rule {
        self.negate()
    }
}

// ============================================================================
// REQUIREMENT ERROR
// ============================================================================

/// Why a rule was not satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequirementError {
    /// A single required field is absent.
    #[error("Field {field} required")]
    Missing { field: String },

    /// A compound rule is not satisfied.
    #[error("Required fields: {rule}")]
    Unsatisfied { rule: String },

    /// A negated rule is satisfied by the present fields.
    #[error("Fields must be absent: {rule}")]
    Forbidden { rule: String },
}

impl RequirementError {
    /// Rendering of the rule that failed.
    #[must_use]
    pub fn rule(&self) -> &str {
        match self {
            Self::Missing { field } => field,
            Self::Unsatisfied { rule } | Self::Forbidden { rule } => rule,
        }
    }
}

impl From<RequirementError> for ValidationError {
    fn from(err: RequirementError) -> Self {
        let error = ValidationError::new(ErrorKind::RequirementUnmet, err.to_string())
            .with_param("rule", err.rule().to_owned());
        match err {
            RequirementError::Missing { field } => error.in_field(field),
            _ => error,
        }
    }
}
