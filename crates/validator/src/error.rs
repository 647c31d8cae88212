//! Error types for validation failures
//!
//! Every failure surfaced by a validation pipeline is a [`ValidationError`]:
//! a kind, a human-readable message, the field path leading to the failure,
//! and optional parameters and nested causes. Definition-time problems are
//! [`ConfigError`]s and never reach a pipeline.

use std::borrow::Cow;
use std::fmt;
use std::fmt::Write as _;

use outpost_schema::SchemaError;
use serde_json::Value;
use smallvec::SmallVec;

/// Boxed error returned by user-supplied field functions and combinators.
///
/// Returning a boxed [`ValidationError`] keeps its kind; any other error is
/// treated as an unexpected failure of user code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// ERROR KIND
// ============================================================================

/// Classification of a validation failure.
///
/// Callers use the kind to tell malformed input (coercion, readonly,
/// unexpected fields, missing fields) from rejections authored by user
/// validation code and from bugs in that code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Inconsistent validator definition.
    Configuration,
    /// The requirement rule was not satisfied by the present fields.
    RequirementUnmet,
    /// A readonly field was supplied while readonly violations raise.
    ReadonlyViolation,
    /// A key outside the record's fields was supplied while unexpected keys raise.
    UnexpectedField,
    /// A value could not be cast to its declared type.
    TypeCoercion,
    /// Rejection raised deliberately by a field function or combinator.
    Validation,
    /// Any other failure inside user code.
    Unexpected,
    /// A pipeline stage was invoked out of order or after a failure.
    Pipeline,
}

impl ErrorKind {
    /// Machine-readable code for programmatic handling.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::RequirementUnmet => "requirement_unmet",
            Self::ReadonlyViolation => "readonly_violation",
            Self::UnexpectedField => "unexpected_field",
            Self::TypeCoercion => "type_coercion",
            Self::Validation => "validation",
            Self::Unexpected => "unexpected",
            Self::Pipeline => "pipeline",
        }
    }

    /// Whether the failure describes the shape of the input rather than a
    /// rejection from user validation code.
    #[must_use]
    pub fn is_malformed_input(self) -> bool {
        matches!(
            self,
            Self::RequirementUnmet
                | Self::ReadonlyViolation
                | Self::UnexpectedField
                | Self::TypeCoercion
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// PATH
// ============================================================================

/// One step of the path from the validated record to the failing value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named field.
    Field(Cow<'static, str>),
    /// A position inside a list or tuple.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// A structured validation error.
///
/// The rendered form prefixes the message with the field path:
///
/// ```text
/// contact -> number: cannot cast 42 to str
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Failure classification.
    pub kind: ErrorKind,

    /// Human-readable message, without the path prefix.
    pub message: Cow<'static, str>,

    /// Outermost segment first.
    pub path: Vec<PathSegment>,

    /// Ordered key-value parameters (typically 0-2).
    pub params: SmallVec<[(Cow<'static, str>, Cow<'static, str>); 2]>,

    /// Per-alternative causes of a failed union resolution.
    pub nested: Vec<ValidationError>,
}

impl ValidationError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: Vec::new(),
            params: SmallVec::new(),
            nested: Vec::new(),
        }
    }

    /// A rejection authored by validation code.
    ///
    /// ```rust,ignore
    /// let check = |value: &Value| -> Result<Value, BoxError> {
    ///     if value.as_str().is_some_and(str::is_empty) {
    ///         return Err(ValidationError::custom("name must not be blank").into());
    ///     }
    ///     Ok(value.clone())
    /// };
    /// ```
    pub fn custom(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn pipeline(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Pipeline, message)
    }

    /// A supplied readonly field while readonly violations raise.
    pub fn readonly(field: &str) -> Self {
        Self::new(
            ErrorKind::ReadonlyViolation,
            format!("field `{field}` is readonly"),
        )
        .with_param("field", field.to_owned())
        .in_field(field.to_owned())
    }

    /// A supplied key the record does not declare.
    pub fn unexpected_field(field: &str) -> Self {
        Self::new(
            ErrorKind::UnexpectedField,
            format!("unexpected field `{field}`"),
        )
        .with_param("field", field.to_owned())
        .in_field(field.to_owned())
    }

    /// A value that cannot be cast to `expected`.
    pub fn type_coercion(value: &Value, expected: &str) -> Self {
        Self::new(
            ErrorKind::TypeCoercion,
            format!("cannot cast {value} to {expected}"),
        )
        .with_param("value", value.to_string())
        .with_param("expected", expected.to_owned())
    }

    /// A failure of user code that was not a deliberate rejection.
    pub fn unexpected(value: &Value, source: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(
            ErrorKind::Unexpected,
            format!("unexpected error with value {value}: {source}"),
        )
        .with_param("value", value.to_string())
    }

    /// No alternative of a union accepted the value.
    ///
    /// Each cause is recorded under the name of the alternative that
    /// produced it.
    pub fn union_failed(
        type_name: &str,
        value: &Value,
        causes: impl IntoIterator<Item = (String, ValidationError)>,
    ) -> Self {
        Self::new(
            ErrorKind::TypeCoercion,
            format!("no alternative of {type_name} accepts {value}"),
        )
        .with_param("expected", type_name.to_owned())
        .with_nested(
            causes
                .into_iter()
                .map(|(alternative, cause)| cause.with_param("alternative", alternative))
                .collect(),
        )
    }

    /// Classifies an error returned by a field function.
    ///
    /// A boxed [`ValidationError`] passes through unchanged; anything else
    /// is wrapped as [`ErrorKind::Unexpected`] together with the raw value.
    pub fn from_user(error: BoxError, value: &Value) -> Self {
        match error.downcast::<ValidationError>() {
            Ok(error) => *error,
            Err(other) => Self::unexpected(value, &*other),
        }
    }

    /// Classifies an error returned by a combinator.
    pub fn from_combinator(error: BoxError, combinator: &str) -> Self {
        match error.downcast::<ValidationError>() {
            Ok(error) => *error,
            Err(other) => Self::new(
                ErrorKind::Unexpected,
                format!("combinator `{combinator}` failed unexpectedly: {other}"),
            )
            .with_param("combinator", combinator.to_owned()),
        }
    }

    /// Adds a parameter.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_param(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Replaces the nested causes.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_nested(mut self, errors: Vec<ValidationError>) -> Self {
        self.nested = errors;
        self
    }

    /// Prepends a field segment to the path.
    #[must_use = "builder methods must be chained or built"]
    pub fn in_field(mut self, field: impl Into<Cow<'static, str>>) -> Self {
        self.path.insert(0, PathSegment::Field(field.into()));
        self
    }

    /// Prepends a position segment to the path.
    #[must_use = "builder methods must be chained or built"]
    pub fn at_index(mut self, index: usize) -> Self {
        self.path.insert(0, PathSegment::Index(index));
        self
    }

    /// Looks up a parameter value by key.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_ref())
    }

    /// Machine-readable code of the kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Compact path notation, e.g. `phones[1].number`.
    #[must_use]
    pub fn field_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.path {
            match segment {
                PathSegment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Index(index) => {
                    let _ = write!(out, "[{index}]");
                }
            }
        }
        out
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.path.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{segment}")?;
        }
        if !self.path.is_empty() {
            f.write_str(": ")?;
        }
        write_message(self, f)
    }
}

fn write_message(error: &ValidationError, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&error.message)?;
    if !error.nested.is_empty() {
        f.write_str(" (")?;
        for (i, cause) in error.nested.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match cause.param("alternative") {
                Some(alternative) => write!(f, "{alternative}: {cause}")?,
                None => write!(f, "{cause}")?,
            }
        }
        f.write_str(")")?;
    }
    Ok(())
}

impl std::error::Error for ValidationError {}

// ============================================================================
// CONFIGURATION ERROR
// ============================================================================

/// Definition-time error raised while composing or registering validators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Neither the declarations nor a base validator name a record.
    #[error("validator declares no record and has no base to inherit one from")]
    MissingSchema,

    /// A derived validator targets a record unrelated to its base's record.
    #[error("record `{child}` is not `{parent}` or one of its sub-records")]
    SchemaMismatch { parent: String, child: String },

    /// A declaration references a field of another record.
    #[error("field `{field}` of record `{owner}` is not part of record `{record}`")]
    ForeignField {
        field: String,
        owner: String,
        record: String,
    },

    /// A delegate validator's record cannot appear in the field's declared type.
    #[error("delegate for field `{field}` validates `{target}`, but the field is declared as `{declared}`")]
    DelegateMismatch {
        field: String,
        target: String,
        declared: String,
    },

    /// A combinator names no fields.
    #[error("combinator `{name}` must reference at least one field")]
    EmptyCombinator { name: String },

    #[error("validator `{name}` is already defined")]
    AlreadyDefined { name: String },

    #[error("validator `{name}` is not defined")]
    UnknownValidator { name: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ConfigError {
    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSchema => "CONFIG_MISSING_SCHEMA",
            Self::SchemaMismatch { .. } => "CONFIG_SCHEMA_MISMATCH",
            Self::ForeignField { .. } => "CONFIG_FOREIGN_FIELD",
            Self::DelegateMismatch { .. } => "CONFIG_DELEGATE_MISMATCH",
            Self::EmptyCombinator { .. } => "CONFIG_EMPTY_COMBINATOR",
            Self::AlreadyDefined { .. } => "CONFIG_ALREADY_DEFINED",
            Self::UnknownValidator { .. } => "CONFIG_UNKNOWN_VALIDATOR",
            Self::Schema(err) => err.code(),
        }
    }
}

impl From<ConfigError> for ValidationError {
    fn from(err: ConfigError) -> Self {
        ValidationError::configuration(err.to_string()).with_param("code", err.code())
    }
}
