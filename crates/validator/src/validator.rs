//! Validators: named, frozen configurations and the entry points of the
//! validation pipeline.

use std::fmt;
use std::sync::Arc;

use outpost_schema::{FieldId, RecordSchema, SchemaError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::{
    Combinator, Declarations, FieldRule, FieldValidator, MissingValue, PolicyOverrides,
    ValidatorConfig,
};
use crate::context::{RawInput, ValidationContext};
use crate::error::{BoxError, ConfigError, ValidationError};
use crate::rule::Rule;

// ============================================================================
// VALIDATOR
// ============================================================================

/// A named validator for one record type.
///
/// Validators are immutable once built and shared behind an [`Arc`]. A
/// derived validator inherits everything from its base and adds its own
/// declarations on top; the base is left untouched.
///
/// ```rust,ignore
/// let user = Validator::builder("UserValidator", &schema)
///     .readonly([&id])
///     .require(Rule::from(&name))
///     .build()?;
///
/// let create = Validator::derive(&user, "CreateUserValidator")
///     .require(Rule::from(&pwd))
///     .raise_on_readonly(true)
///     .build()?;
///
/// let data = create.validation_results(json!({"name": "Ann", "pwd": "secret"}))?;
/// ```
pub struct Validator {
    name: String,
    base: Option<Arc<Validator>>,
    config: ValidatorConfig,
}

impl Validator {
    /// Starts a validator for `schema`.
    pub fn builder(name: impl Into<String>, schema: &Arc<RecordSchema>) -> ValidatorBuilder {
        ValidatorBuilder {
            name: name.into(),
            base: None,
            own: Declarations {
                schema: Some(Arc::clone(schema)),
                ..Declarations::default()
            },
        }
    }

    /// Starts a validator derived from `base`.
    pub fn derive(base: &Arc<Validator>, name: impl Into<String>) -> ValidatorBuilder {
        ValidatorBuilder {
            name: name.into(),
            base: Some(Arc::clone(base)),
            own: Declarations::default(),
        }
    }

    /// A validator with an empty configuration, used for nested records that
    /// have no delegate.
    #[must_use]
    pub fn basic(schema: &Arc<RecordSchema>) -> Arc<Validator> {
        Arc::new(Validator {
            name: format!("{}BasicValidator", schema.name()),
            base: None,
            config: ValidatorConfig::empty(schema),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The validator this one was derived from.
    #[must_use]
    pub fn base(&self) -> Option<&Arc<Validator>> {
        self.base.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// The validated record.
    #[must_use]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        self.config.schema()
    }

    /// Looks a field of the validated record up by name.
    pub fn field(&self, name: &str) -> Result<FieldId, SchemaError> {
        self.config.schema().field(name)
    }

    /// Whether this validator is `other` or was derived (transitively) from it.
    #[must_use]
    pub fn derives_from(&self, other: &Validator) -> bool {
        let mut current = Some(self);
        while let Some(validator) = current {
            if std::ptr::eq(validator, other) {
                return true;
            }
            current = validator.base.as_deref();
        }
        false
    }

    /// A fresh pipeline in its initial stage.
    #[must_use]
    pub fn context(self: &Arc<Self>) -> ValidationContext {
        ValidationContext::new(Arc::clone(self))
    }

    /// Runs the whole pipeline.
    pub fn validate(
        self: &Arc<Self>,
        raw: impl Into<RawInput>,
    ) -> Result<ValidationContext, ValidationError> {
        let mut context = self.context();
        context.validate(raw)?;
        Ok(context)
    }

    /// Runs the whole pipeline and exports the present fields.
    pub fn validation_results(
        self: &Arc<Self>,
        raw: impl Into<RawInput>,
    ) -> Result<Map<String, Value>, ValidationError> {
        self.validate(raw)?.export()
    }

    /// Runs the whole pipeline and reconstructs a record.
    pub fn map<T: DeserializeOwned>(
        self: &Arc<Self>,
        raw: impl Into<RawInput>,
    ) -> Result<T, ValidationError> {
        self.validate(raw)?.map()
    }

    /// Runs `f` against a fresh context and finalizes the context afterwards,
    /// whatever `f` returns.
    ///
    /// ```rust,ignore
    /// let data = validator.session(|ctx| {
    ///     ctx.without_requirement()?.validate(raw)?;
    ///     ctx.export()
    /// })?;
    /// ```
    pub fn session<R, F>(self: &Arc<Self>, f: F) -> Result<R, ValidationError>
    where
        F: FnOnce(&mut ValidationContext) -> Result<R, ValidationError>,
    {
        let mut context = self.context();
        tracing::trace!(validator = %self.name, "validation session opened");
        let result = f(&mut context);
        context.finalize();
        result
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name()))
            .field("config", &self.config)
            .finish()
    }
}

/// Multi-line summary of the validator's effective configuration.
impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = &self.config;
        write!(f, "{} (record {}", self.name, config.schema().name())?;
        if let Some(base) = &self.base {
            write!(f, ", base {}", base.name())?;
        }
        writeln!(f, ")")?;

        if !config.requirement().is_empty() {
            writeln!(f, "  requirement: {}", config.requirement())?;
        }
        if !config.readonly().is_empty() {
            writeln!(f, "  readonly: {}", join(config.readonly().iter().map(FieldId::name)))?;
        }
        if !config.defaults().is_empty() {
            let defaults = config
                .defaults()
                .iter()
                .map(|(field, value)| format!("{field} = {value}"));
            writeln!(f, "  defaults: {}", join(defaults))?;
        }
        if !config.validators().is_empty() {
            let validators = config.validators().iter().map(|(field, v)| match v.rule() {
                FieldRule::Custom(_) => format!("{field} -> custom"),
                FieldRule::Delegate(delegate) => format!("{field} -> {}", delegate.name()),
            });
            writeln!(f, "  validators: {}", join(validators))?;
        }
        if !config.combinators().is_empty() {
            let combinators = config.combinators().iter().map(|c| {
                format!("{}({})", c.name(), join(c.fields().iter().map(FieldId::name)))
            });
            writeln!(f, "  combinators: {}", join(combinators))?;
        }

        let policy = config.policy();
        let missing = match &policy.missing_value {
            MissingValue::Null => "null".to_owned(),
            MissingValue::Omit => "omit".to_owned(),
            MissingValue::Value(value) => value.to_string(),
        };
        write!(
            f,
            "  policy: raise_on_readonly={}, raise_on_unexpected={}, missing={missing}",
            policy.raise_on_readonly, policy.raise_on_unexpected
        )
    }
}

fn join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// BUILDER
// ============================================================================

/// Collects a validator's own declarations.
#[derive(Debug)]
#[must_use = "builder methods must be chained or built"]
pub struct ValidatorBuilder {
    name: String,
    base: Option<Arc<Validator>>,
    own: Declarations,
}

impl ValidatorBuilder {
    /// Name of the validator being built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validates a sub-record of the base's record instead.
    pub fn record(mut self, schema: &Arc<RecordSchema>) -> Self {
        self.own.schema = Some(Arc::clone(schema));
        self
    }

    /// Marks fields readonly.
    pub fn readonly<'a>(mut self, fields: impl IntoIterator<Item = &'a FieldId>) -> Self {
        self.own.readonly.extend(fields.into_iter().cloned());
        self
    }

    /// Sets the default value of a field.
    pub fn default_value(mut self, field: &FieldId, value: impl Into<Value>) -> Self {
        self.own.defaults.insert(field.clone(), value.into());
        self
    }

    /// Sets the validator of a field, replacing any inherited one.
    pub fn validator(mut self, field: &FieldId, validator: FieldValidator) -> Self {
        self.own.validators.insert(field.clone(), validator);
        self
    }

    /// Shorthand for [`FieldValidator::custom`].
    pub fn custom<F>(self, field: &FieldId, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.validator(field, FieldValidator::custom(f))
    }

    /// Shorthand for [`FieldValidator::delegate`].
    pub fn delegate(self, field: &FieldId, validator: &Arc<Validator>) -> Self {
        self.validator(field, FieldValidator::delegate(validator))
    }

    /// Adds a cross-field check over `fields`.
    pub fn combine<'a, F>(
        mut self,
        name: impl Into<String>,
        fields: impl IntoIterator<Item = &'a FieldId>,
        check: F,
    ) -> Self
    where
        F: Fn(&[&Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let fields = fields.into_iter().cloned().collect();
        self.own.combinators.push(Combinator::new(name, fields, check));
        self
    }

    /// ANDs `rule` into the validator's own requirement.
    pub fn require(mut self, rule: impl Into<Rule>) -> Self {
        self.own.requirement = std::mem::take(&mut self.own.requirement).and(rule.into());
        self
    }

    pub fn raise_on_readonly(mut self, raise: bool) -> Self {
        self.own.policy.raise_on_readonly = Some(raise);
        self
    }

    pub fn raise_on_unexpected(mut self, raise: bool) -> Self {
        self.own.policy.raise_on_unexpected = Some(raise);
        self
    }

    pub fn missing_value(mut self, missing: MissingValue) -> Self {
        self.own.policy.missing_value = Some(missing);
        self
    }

    /// Replaces all policy switches at once, e.g. with overrides loaded from
    /// a configuration file.
    pub fn policy(mut self, overrides: PolicyOverrides) -> Self {
        self.own.policy = overrides;
        self
    }

    /// Composes the declarations with the base configuration and freezes
    /// the result.
    pub fn build(self) -> Result<Arc<Validator>, ConfigError> {
        let config = ValidatorConfig::compose(self.base.as_ref().map(|b| b.config()), self.own)?;
        tracing::debug!(
            validator = %self.name,
            base = self.base.as_ref().map(|b| b.name()),
            record = config.schema().name(),
            "validator built"
        );
        Ok(Arc::new(Validator {
            name: self.name,
            base: self.base,
            config,
        }))
    }
}
