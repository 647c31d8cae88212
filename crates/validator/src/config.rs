//! Validator configuration and its composition model.
//!
//! A [`ValidatorConfig`] is the frozen result of merging a base validator's
//! configuration with a set of own [`Declarations`]. Each concern has its own
//! merge rule, see [`ValidatorConfig::compose`].

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use outpost_schema::{FieldId, RecordSchema, TypeDesc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BoxError, ConfigError};
use crate::rule::Rule;
use crate::validator::Validator;

/// Field transformation supplied by user code.
pub type FieldFn = Arc<dyn Fn(&Value) -> Result<Value, BoxError> + Send + Sync>;

/// Cross-field check supplied by user code. Receives the exported values of
/// the combinator's fields in declaration order.
pub type CombineFn = Arc<dyn Fn(&[&Value]) -> Result<(), BoxError> + Send + Sync>;

// ============================================================================
// POLICY
// ============================================================================

/// Filler for record fields that are absent after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValue {
    /// Absent fields are set to `null`.
    #[default]
    Null,
    /// Absent fields are left out.
    Omit,
    /// Absent fields are set to the given value.
    Value(Value),
}

/// Behavior switches of a validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorPolicy {
    /// Fail when a readonly field is supplied instead of dropping it.
    pub raise_on_readonly: bool,

    /// Fail when a key outside the record's fields is supplied instead of
    /// ignoring it.
    pub raise_on_unexpected: bool,

    /// Filler used when reconstructing a record.
    pub missing_value: MissingValue,
}

impl Default for ValidatorPolicy {
    fn default() -> Self {
        Self {
            raise_on_readonly: false,
            raise_on_unexpected: false,
            missing_value: MissingValue::Null,
        }
    }
}

/// Policy switches a derived validator sets explicitly. Unset switches are
/// inherited from the base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub raise_on_readonly: Option<bool>,
    pub raise_on_unexpected: Option<bool>,
    pub missing_value: Option<MissingValue>,
}

impl PolicyOverrides {
    /// Applies the set switches on top of `base`.
    #[must_use]
    pub fn apply(&self, base: &ValidatorPolicy) -> ValidatorPolicy {
        ValidatorPolicy {
            raise_on_readonly: self.raise_on_readonly.unwrap_or(base.raise_on_readonly),
            raise_on_unexpected: self
                .raise_on_unexpected
                .unwrap_or(base.raise_on_unexpected),
            missing_value: self
                .missing_value
                .clone()
                .unwrap_or_else(|| base.missing_value.clone()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raise_on_readonly.is_none()
            && self.raise_on_unexpected.is_none()
            && self.missing_value.is_none()
    }
}

// ============================================================================
// FIELD VALIDATORS
// ============================================================================

/// How a single field is resolved.
#[derive(Clone)]
pub enum FieldRule {
    /// A user function replaces type resolution entirely.
    Custom(FieldFn),
    /// Nested record values are validated by another validator.
    Delegate(Arc<Validator>),
}

/// Per-field validator.
#[derive(Clone)]
pub struct FieldValidator {
    rule: FieldRule,
    check_result_type: bool,
}

impl FieldValidator {
    /// Wraps a field function.
    ///
    /// The returned value must conform to the field's declared type unless
    /// [`unchecked`](Self::unchecked) is applied.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            rule: FieldRule::Custom(Arc::new(f)),
            check_result_type: true,
        }
    }

    /// Validates record values of the field with `validator`.
    #[must_use]
    pub fn delegate(validator: &Arc<Validator>) -> Self {
        Self {
            rule: FieldRule::Delegate(Arc::clone(validator)),
            check_result_type: true,
        }
    }

    /// Skips the conformance check on field function results.
    #[must_use]
    pub fn unchecked(mut self) -> Self {
        self.check_result_type = false;
        self
    }

    #[must_use]
    pub fn rule(&self) -> &FieldRule {
        &self.rule
    }

    #[must_use]
    pub fn check_result_type(&self) -> bool {
        self.check_result_type
    }

    /// The delegate validator, if any.
    #[must_use]
    pub fn as_delegate(&self) -> Option<&Arc<Validator>> {
        match &self.rule {
            FieldRule::Delegate(validator) => Some(validator),
            FieldRule::Custom(_) => None,
        }
    }
}

impl PartialEq for FieldValidator {
    fn eq(&self, other: &Self) -> bool {
        self.check_result_type == other.check_result_type
            && match (&self.rule, &other.rule) {
                (FieldRule::Custom(a), FieldRule::Custom(b)) => Arc::ptr_eq(a, b),
                (FieldRule::Delegate(a), FieldRule::Delegate(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
    }
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FieldValidator");
        match &self.rule {
            FieldRule::Custom(_) => s.field("custom", &"<function>"),
            FieldRule::Delegate(v) => s.field("delegate", &v.name()),
        };
        s.field("check_result_type", &self.check_result_type)
            .finish()
    }
}

/// Named cross-field check, run after normalization when every one of its
/// fields is present.
#[derive(Clone)]
pub struct Combinator {
    name: String,
    fields: Vec<FieldId>,
    check: CombineFn,
}

impl Combinator {
    pub fn new<F>(name: impl Into<String>, fields: Vec<FieldId>, check: F) -> Self
    where
        F: Fn(&[&Value]) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fields,
            check: Arc::new(check),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// Runs the check over the given values.
    pub fn check(&self, values: &[&Value]) -> Result<(), BoxError> {
        (self.check)(values)
    }
}

impl PartialEq for Combinator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.fields == other.fields
            && Arc::ptr_eq(&self.check, &other.check)
    }
}

impl fmt::Debug for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combinator")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("check", &"<function>")
            .finish()
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

/// What one validator declares for itself, before merging with its base.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub(crate) schema: Option<Arc<RecordSchema>>,
    pub(crate) readonly: IndexSet<FieldId>,
    pub(crate) defaults: IndexMap<FieldId, Value>,
    pub(crate) validators: IndexMap<FieldId, FieldValidator>,
    pub(crate) combinators: Vec<Combinator>,
    pub(crate) requirement: Rule,
    pub(crate) policy: PolicyOverrides,
}

impl Declarations {
    /// Whether nothing at all is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schema.is_none()
            && self.readonly.is_empty()
            && self.defaults.is_empty()
            && self.validators.is_empty()
            && self.combinators.is_empty()
            && self.requirement.is_empty()
            && self.policy.is_empty()
    }
}

// ============================================================================
// VALIDATOR CONFIG
// ============================================================================

/// Frozen configuration of one validator.
#[derive(Clone)]
pub struct ValidatorConfig {
    schema: Arc<RecordSchema>,
    readonly: IndexSet<FieldId>,
    defaults: IndexMap<FieldId, Value>,
    validators: IndexMap<FieldId, FieldValidator>,
    combinators: Vec<Combinator>,
    requirement: Rule,
    policy: ValidatorPolicy,
}

impl ValidatorConfig {
    /// An empty configuration for `schema`.
    #[must_use]
    pub fn empty(schema: &Arc<RecordSchema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            readonly: IndexSet::new(),
            defaults: IndexMap::new(),
            validators: IndexMap::new(),
            combinators: Vec::new(),
            requirement: Rule::NoRequirement,
            policy: ValidatorPolicy::default(),
        }
    }

    /// Merges `own` declarations on top of an optional base configuration.
    ///
    /// - record: the own record if declared (it must be the base's record or
    ///   one of its sub-records), the base's otherwise
    /// - readonly: union
    /// - defaults, field validators: union, own entries override
    /// - combinators: base's followed by own
    /// - requirement: `base AND own`, flattened, `NoRequirement` dropped
    /// - policy: own switches override inherited ones
    ///
    /// Every referenced field must belong to the resulting record, and every
    /// delegate must validate a record the field's declared type admits.
    pub fn compose(base: Option<&ValidatorConfig>, own: Declarations) -> Result<Self, ConfigError> {
        let schema = match (base, own.schema) {
            (None, None) => return Err(ConfigError::MissingSchema),
            (None, Some(schema)) => schema,
            (Some(base), None) => Arc::clone(&base.schema),
            (Some(base), Some(schema)) => {
                if !schema.is_subtype_of(&base.schema) {
                    return Err(ConfigError::SchemaMismatch {
                        parent: base.schema.name().to_owned(),
                        child: schema.name().to_owned(),
                    });
                }
                schema
            }
        };

        let mut config = match base {
            Some(base) => Self {
                schema,
                ..base.clone()
            },
            None => Self::empty(&schema),
        };

        config.readonly.extend(own.readonly);
        config.defaults.extend(own.defaults);
        config.validators.extend(own.validators);
        config.combinators.extend(own.combinators);
        config.requirement = std::mem::take(&mut config.requirement).and(own.requirement);
        config.policy = own.policy.apply(&config.policy);

        config.check_consistency()?;

        tracing::debug!(
            record = config.schema.name(),
            readonly = config.readonly.len(),
            defaults = config.defaults.len(),
            validators = config.validators.len(),
            combinators = config.combinators.len(),
            requirement = %config.requirement,
            "validator configuration composed"
        );

        Ok(config)
    }

    fn check_consistency(&self) -> Result<(), ConfigError> {
        let referenced = self
            .readonly
            .iter()
            .chain(self.defaults.keys())
            .chain(self.validators.keys())
            .chain(self.combinators.iter().flat_map(|c| c.fields.iter()))
            .chain(self.requirement.fields());
        for field in referenced {
            self.check_field(field)?;
        }

        for combinator in &self.combinators {
            if combinator.fields.is_empty() {
                return Err(ConfigError::EmptyCombinator {
                    name: combinator.name.clone(),
                });
            }
        }

        for (field, validator) in &self.validators {
            if !validator.check_result_type() {
                continue;
            }
            if let Some(delegate) = validator.as_delegate() {
                let declared = self.declared_type(field);
                if !declared.is_some_and(|ty| ty.admits_record(delegate.schema())) {
                    return Err(ConfigError::DelegateMismatch {
                        field: field.name().to_owned(),
                        target: delegate.schema().name().to_owned(),
                        declared: declared.map(TypeDesc::name).unwrap_or_default(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_field(&self, field: &FieldId) -> Result<(), ConfigError> {
        if self.schema.contains(field) {
            Ok(())
        } else {
            Err(ConfigError::ForeignField {
                field: field.name().to_owned(),
                owner: field.record_name().to_owned(),
                record: self.schema.name().to_owned(),
            })
        }
    }

    fn declared_type(&self, field: &FieldId) -> Option<&TypeDesc> {
        self.schema.def(field).map(|def| def.ty())
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    #[must_use]
    pub fn readonly(&self) -> &IndexSet<FieldId> {
        &self.readonly
    }

    #[must_use]
    pub fn is_readonly(&self, field: &FieldId) -> bool {
        self.readonly.contains(field)
    }

    #[must_use]
    pub fn defaults(&self) -> &IndexMap<FieldId, Value> {
        &self.defaults
    }

    #[must_use]
    pub fn default_for(&self, field: &FieldId) -> Option<&Value> {
        self.defaults.get(field)
    }

    #[must_use]
    pub fn validators(&self) -> &IndexMap<FieldId, FieldValidator> {
        &self.validators
    }

    #[must_use]
    pub fn validator_for(&self, field: &FieldId) -> Option<&FieldValidator> {
        self.validators.get(field)
    }

    #[must_use]
    pub fn combinators(&self) -> &[Combinator] {
        &self.combinators
    }

    #[must_use]
    pub fn requirement(&self) -> &Rule {
        &self.requirement
    }

    #[must_use]
    pub fn policy(&self) -> &ValidatorPolicy {
        &self.policy
    }
}

impl PartialEq for ValidatorConfig {
    fn eq(&self, other: &Self) -> bool {
        self.schema.id() == other.schema.id()
            && self.readonly == other.readonly
            && self.defaults == other.defaults
            && self.validators == other.validators
            && self.combinators == other.combinators
            && self.requirement == other.requirement
            && self.policy == other.policy
    }
}

impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("record", &self.schema.name())
            .field("readonly", &self.readonly)
            .field("defaults", &self.defaults)
            .field("validators", &self.validators)
            .field("combinators", &self.combinators)
            .field("requirement", &self.requirement.text())
            .field("policy", &self.policy)
            .finish()
    }
}
