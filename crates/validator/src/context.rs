//! Validation contexts: one forward-only pipeline run.
//!
//! ```text
//! Created -> Enumerated -> Filtered -> Checked -> Normalized -> Combined
//!     \___________\____________\__________\___________\-----> Failed
//! ```
//!
//! Each stage consumes the previous stage's output. A stage invoked out of
//! order, or any stage after a failure, is a [`ErrorKind::Pipeline`] error.
//!
//! [`ErrorKind::Pipeline`]: crate::ErrorKind::Pipeline

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use outpost_schema::{FieldId, RecordSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::MissingValue;
use crate::error::{ConfigError, ErrorKind, ValidationError};
use crate::resolve;
use crate::rule::Rule;
use crate::validator::Validator;

// ============================================================================
// RAW INPUT
// ============================================================================

/// Raw input of one pipeline run, keyed by field name, by field identifier,
/// or both.
///
/// When a field is supplied both ways, the name wins.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    by_name: Map<String, Value>,
    by_field: IndexMap<FieldId, Value>,
    malformed: Option<Value>,
}

impl RawInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies a value under a field name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.by_name.insert(name.into(), value.into());
        self
    }

    /// Supplies a value under a field identifier.
    #[must_use]
    pub fn with_field(mut self, field: &FieldId, value: impl Into<Value>) -> Self {
        self.by_field.insert(field.clone(), value.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty() && self.by_field.is_empty() && self.malformed.is_none()
    }
}

impl From<Map<String, Value>> for RawInput {
    fn from(by_name: Map<String, Value>) -> Self {
        Self {
            by_name,
            ..Self::default()
        }
    }
}

/// Objects are keyed by name. Any other value is kept and rejected during
/// enumeration.
impl From<Value> for RawInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(by_name) => by_name.into(),
            other => Self {
                malformed: Some(other),
                ..Self::default()
            },
        }
    }
}

impl FromIterator<(FieldId, Value)> for RawInput {
    fn from_iter<I: IntoIterator<Item = (FieldId, Value)>>(iter: I) -> Self {
        Self {
            by_field: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

// ============================================================================
// STAGE
// ============================================================================

/// Position of a context in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Created,
    Enumerated,
    Filtered,
    Checked,
    Normalized,
    Combined,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Enumerated => "enumerated",
            Self::Filtered => "filtered",
            Self::Checked => "checked",
            Self::Normalized => "normalized",
            Self::Combined => "combined",
            Self::Failed => "failed",
        })
    }
}

// ============================================================================
// NORMALIZED VALUES
// ============================================================================

/// A field value after type resolution.
#[derive(Debug, Clone)]
pub enum Normalized {
    /// A primitive or a field function result.
    Value(Value),
    /// A nested record, validated through its own completed pipeline.
    Record(Box<ValidationContext>),
    List(Vec<Normalized>),
    Tuple(Vec<Normalized>),
}

impl Normalized {
    /// Plain data: nested records become maps of their present fields.
    #[must_use]
    pub fn export(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Record(context) => Value::Object(context.present_map()),
            Self::List(items) | Self::Tuple(items) => {
                Value::Array(items.iter().map(Self::export).collect())
            }
        }
    }

    /// Like [`export`](Self::export), but nested records carry every field,
    /// absent ones filled per their validator's policy.
    #[must_use]
    pub fn to_record_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Record(context) => Value::Object(context.record_map()),
            Self::List(items) | Self::Tuple(items) => {
                Value::Array(items.iter().map(Self::to_record_value).collect())
            }
        }
    }

    /// The nested context, if this is a record.
    #[must_use]
    pub fn as_record(&self) -> Option<&ValidationContext> {
        match self {
            Self::Record(context) => Some(context.as_ref()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

// ============================================================================
// VALIDATION CONTEXT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Input,
    Default,
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    origin: Origin,
}

/// One pipeline run of a [`Validator`].
#[derive(Debug, Clone)]
pub struct ValidationContext {
    validator: Arc<Validator>,
    stage: Stage,
    defaults: IndexMap<FieldId, Value>,
    requirement: Option<Rule>,
    enumerated: IndexMap<FieldId, Entry>,
    unexpected: Vec<String>,
    filtered: IndexMap<FieldId, Value>,
    normalized: IndexMap<FieldId, Normalized>,
}

impl ValidationContext {
    pub(crate) fn new(validator: Arc<Validator>) -> Self {
        Self {
            validator,
            stage: Stage::Created,
            defaults: IndexMap::new(),
            requirement: None,
            enumerated: IndexMap::new(),
            unexpected: Vec::new(),
            filtered: IndexMap::new(),
            normalized: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn validator(&self) -> &Arc<Validator> {
        &self.validator
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<RecordSchema> {
        self.validator.schema()
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether every stage ran successfully.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Combined
    }

    // ------------------------------------------------------------------------
    // Overlays
    // ------------------------------------------------------------------------

    /// Adds defaults for this run only, on top of the validator's defaults.
    ///
    /// Only allowed before enumeration.
    pub fn with_defaults<I>(&mut self, defaults: I) -> Result<&mut Self, ValidationError>
    where
        I: IntoIterator<Item = (FieldId, Value)>,
    {
        self.expect(Stage::Created, "add defaults")?;
        for (field, value) in defaults {
            self.own_field(&field)?;
            self.defaults.insert(field, value);
        }
        Ok(self)
    }

    /// Replaces the validator's requirement for this run only.
    ///
    /// Only allowed before enumeration.
    pub fn with_requirement(
        &mut self,
        rule: impl Into<Rule>,
    ) -> Result<&mut Self, ValidationError> {
        self.expect(Stage::Created, "replace the requirement")?;
        let rule = rule.into();
        for field in rule.fields() {
            self.own_field(field)?;
        }
        self.requirement = Some(rule);
        Ok(self)
    }

    /// Skips the requirement check for this run only.
    ///
    /// Only allowed before enumeration.
    pub fn without_requirement(&mut self) -> Result<&mut Self, ValidationError> {
        self.expect(Stage::Created, "waive the requirement")?;
        self.requirement = Some(Rule::NoRequirement);
        Ok(self)
    }

    // ------------------------------------------------------------------------
    // Stages
    // ------------------------------------------------------------------------

    /// Runs every stage in order.
    pub fn validate(&mut self, raw: impl Into<RawInput>) -> Result<&mut Self, ValidationError> {
        self.enumerate(raw)?
            .filter()?
            .check_requirements()?
            .normalize()?
            .combine()
    }

    /// Gathers a candidate value for every field: the supplied value if any,
    /// the default otherwise. Keys outside the record are set aside.
    pub fn enumerate(&mut self, raw: impl Into<RawInput>) -> Result<&mut Self, ValidationError> {
        self.expect(Stage::Created, "enumerate")?;
        let result = self.enumerate_input(raw.into());
        self.finish(result, Stage::Enumerated)
    }

    /// Drops explicit nulls and readonly fields, applies the unexpected key
    /// policy. Absent or null fields fall back to their defaults; readonly
    /// fields never take one.
    pub fn filter(&mut self) -> Result<&mut Self, ValidationError> {
        self.expect(Stage::Enumerated, "filter")?;
        let result = self.filter_entries();
        self.finish(result, Stage::Filtered)
    }

    /// Like [`filter`](Self::filter), but filters `dataset` in place of the
    /// enumerated values. Every value counts as input, and keys set aside
    /// during enumeration are discarded.
    pub fn filter_with<I>(&mut self, dataset: I) -> Result<&mut Self, ValidationError>
    where
        I: IntoIterator<Item = (FieldId, Value)>,
    {
        self.expect(Stage::Enumerated, "filter")?;
        let mut enumerated = IndexMap::new();
        for (field, value) in dataset {
            self.own_field(&field)?;
            let entry = Entry {
                value,
                origin: Origin::Input,
            };
            enumerated.insert(field, entry);
        }
        self.enumerated = enumerated;
        self.unexpected.clear();
        let result = self.filter_entries();
        self.finish(result, Stage::Filtered)
    }

    /// Resolves the requirement rule against the filtered fields.
    pub fn check_requirements(&mut self) -> Result<&mut Self, ValidationError> {
        self.expect(Stage::Filtered, "check requirements")?;
        let present: HashSet<FieldId> = self.filtered.keys().cloned().collect();
        let result = self.resolve_requirement(&present);
        self.finish(result, Stage::Checked)
    }

    /// Resolves the requirement rule against `present` instead of the
    /// filtered fields.
    pub fn check_requirements_with<I>(&mut self, present: I) -> Result<&mut Self, ValidationError>
    where
        I: IntoIterator<Item = FieldId>,
    {
        self.expect(Stage::Filtered, "check requirements")?;
        let mut fields = HashSet::new();
        for field in present {
            self.own_field(&field)?;
            fields.insert(field);
        }
        let result = self.resolve_requirement(&fields);
        self.finish(result, Stage::Checked)
    }

    /// Resolves every present value against its declared type and field
    /// validator.
    pub fn normalize(&mut self) -> Result<&mut Self, ValidationError> {
        self.expect(Stage::Checked, "normalize")?;
        let result = self.normalize_values();
        self.finish(result, Stage::Normalized)
    }

    /// Like [`normalize`](Self::normalize), but resolves `dataset` in place
    /// of the filtered values.
    pub fn normalize_with<I>(&mut self, dataset: I) -> Result<&mut Self, ValidationError>
    where
        I: IntoIterator<Item = (FieldId, Value)>,
    {
        self.expect(Stage::Checked, "normalize")?;
        let mut filtered = IndexMap::new();
        for (field, value) in dataset {
            self.own_field(&field)?;
            filtered.insert(field, value);
        }
        self.filtered = filtered;
        let result = self.normalize_values();
        self.finish(result, Stage::Normalized)
    }

    /// Runs the combinators whose fields are all present.
    pub fn combine(&mut self) -> Result<&mut Self, ValidationError> {
        self.expect(Stage::Normalized, "combine")?;
        let result = self.run_combinators();
        self.finish(result, Stage::Combined)
    }

    fn expect(&self, expected: Stage, operation: &str) -> Result<(), ValidationError> {
        if self.stage == expected {
            return Ok(());
        }
        Err(ValidationError::pipeline(format!(
            "cannot {operation}: context is {}, expected {expected}",
            self.stage
        ))
        .with_param("stage", self.stage.to_string()))
    }

    fn own_field(&self, field: &FieldId) -> Result<(), ValidationError> {
        if self.schema().contains(field) {
            return Ok(());
        }
        Err(ConfigError::ForeignField {
            field: field.name().to_owned(),
            owner: field.record_name().to_owned(),
            record: self.schema().name().to_owned(),
        }
        .into())
    }

    fn finish(
        &mut self,
        result: Result<(), ValidationError>,
        next: Stage,
    ) -> Result<&mut Self, ValidationError> {
        match result {
            Ok(()) => {
                self.stage = next;
                tracing::debug!(validator = %self.validator.name(), stage = %next, "stage completed");
                Ok(self)
            }
            Err(error) => {
                self.stage = Stage::Failed;
                tracing::debug!(
                    validator = %self.validator.name(),
                    kind = error.code(),
                    %error,
                    "validation failed"
                );
                Err(error)
            }
        }
    }

    fn enumerate_input(&mut self, raw: RawInput) -> Result<(), ValidationError> {
        let schema = Arc::clone(self.schema());
        if let Some(value) = raw.malformed {
            return Err(ValidationError::type_coercion(&value, schema.name()));
        }

        let mut enumerated = IndexMap::with_capacity(schema.len());
        for field in schema.field_ids() {
            let supplied = raw
                .by_name
                .get(field.name())
                .or_else(|| raw.by_field.get(field));
            let entry = match supplied {
                Some(value) => Entry {
                    value: value.clone(),
                    origin: Origin::Input,
                },
                None => match self.default_for(field) {
                    Some(value) => Entry {
                        value: value.clone(),
                        origin: Origin::Default,
                    },
                    None => continue,
                },
            };
            enumerated.insert(field.clone(), entry);
        }

        self.unexpected = raw
            .by_name
            .keys()
            .filter(|name| schema.get(name).is_none())
            .cloned()
            .chain(
                raw.by_field
                    .keys()
                    .filter(|field| !schema.contains(field))
                    .map(|field| field.name().to_owned()),
            )
            .collect();
        self.enumerated = enumerated;
        Ok(())
    }

    fn filter_entries(&mut self) -> Result<(), ValidationError> {
        let validator = Arc::clone(&self.validator);
        let config = validator.config();
        let policy = config.policy();

        let mut filtered = IndexMap::with_capacity(self.enumerated.len());
        for (field, entry) in &self.enumerated {
            if config.is_readonly(field) {
                if entry.origin == Origin::Input && policy.raise_on_readonly {
                    return Err(ValidationError::readonly(field.name()));
                }
                tracing::trace!(
                    field = field.name(),
                    origin = ?entry.origin,
                    "readonly value dropped"
                );
                continue;
            }
            // explicit null counts as absent
            let value = Some(&entry.value)
                .filter(|v| !v.is_null())
                .or_else(|| self.default_for(field).filter(|v| !v.is_null()));
            if let Some(value) = value {
                filtered.insert(field.clone(), value.clone());
            }
        }

        for name in &self.unexpected {
            if policy.raise_on_unexpected {
                return Err(ValidationError::unexpected_field(name));
            }
            tracing::trace!(field = %name, "unexpected input ignored");
        }

        self.filtered = filtered;
        Ok(())
    }

    fn resolve_requirement(&self, present: &HashSet<FieldId>) -> Result<(), ValidationError> {
        let rule = match &self.requirement {
            Some(rule) => {
                tracing::trace!(validator = %self.validator.name(), %rule, "requirement replaced");
                rule
            }
            None => self.validator.config().requirement(),
        };
        rule.resolve(present).map_err(ValidationError::from)
    }

    fn normalize_values(&mut self) -> Result<(), ValidationError> {
        let validator = Arc::clone(&self.validator);
        let config = validator.config();

        let mut normalized = IndexMap::with_capacity(self.filtered.len());
        for (field, value) in &self.filtered {
            let Some(def) = config.schema().def(field) else {
                continue;
            };
            tracing::trace!(field = field.name(), ty = %def.ty(), "resolving field");
            let resolved = resolve::resolve_field(def.ty(), value, config.validator_for(field))
                .map_err(|error| error.in_field(field.name().to_owned()))?;
            normalized.insert(field.clone(), resolved);
        }
        self.normalized = normalized;
        Ok(())
    }

    fn run_combinators(&mut self) -> Result<(), ValidationError> {
        for combinator in self.validator.config().combinators() {
            let values: Option<Vec<Value>> = combinator
                .fields()
                .iter()
                .map(|field| self.normalized.get(field).map(Normalized::export))
                .collect();
            let Some(values) = values else {
                tracing::trace!(combinator = combinator.name(), "combinator skipped");
                continue;
            };
            let values: Vec<&Value> = values.iter().collect();
            combinator
                .check(&values)
                .map_err(|error| ValidationError::from_combinator(error, combinator.name()))?;
        }
        Ok(())
    }

    fn default_for(&self, field: &FieldId) -> Option<&Value> {
        self.defaults
            .get(field)
            .or_else(|| self.validator.config().default_for(field))
    }

    // ------------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------------

    /// Values that survived filtering, before type resolution.
    #[must_use]
    pub fn filtered(&self) -> &IndexMap<FieldId, Value> {
        &self.filtered
    }

    /// Input keys that are not fields of the record.
    #[must_use]
    pub fn unexpected_keys(&self) -> &[String] {
        &self.unexpected
    }

    /// The normalized value of a field.
    #[must_use]
    pub fn get(&self, field: &FieldId) -> Option<&Normalized> {
        self.normalized.get(field)
    }

    /// The exported value of a field.
    #[must_use]
    pub fn value(&self, field: &FieldId) -> Option<Value> {
        self.get(field).map(Normalized::export)
    }

    #[must_use]
    pub fn contains(&self, field: &FieldId) -> bool {
        self.normalized.contains_key(field)
    }

    /// Fields present after normalization, in declaration order.
    pub fn present_fields(&self) -> impl Iterator<Item = &FieldId> {
        self.normalized.keys()
    }

    /// Present fields as plain data, nested records exported recursively.
    pub fn export(&self) -> Result<Map<String, Value>, ValidationError> {
        self.expect(Stage::Combined, "export")?;
        Ok(self.present_map())
    }

    /// Every field of the record, absent ones filled per the missing value
    /// policy.
    pub fn to_record(&self) -> Result<Value, ValidationError> {
        self.expect(Stage::Combined, "build a record")?;
        Ok(Value::Object(self.record_map()))
    }

    /// Reconstructs a record of type `T` from the validated data.
    pub fn map<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        let record = self.to_record()?;
        serde_json::from_value(record).map_err(|err| {
            let name = self.schema().name();
            ValidationError::new(
                ErrorKind::TypeCoercion,
                format!("cannot build {name} from validated data: {err}"),
            )
            .with_param("expected", name.to_owned())
        })
    }

    fn present_map(&self) -> Map<String, Value> {
        self.normalized
            .iter()
            .map(|(field, value)| (field.name().to_owned(), value.export()))
            .collect()
    }

    fn record_map(&self) -> Map<String, Value> {
        let missing = &self.validator.config().policy().missing_value;
        let mut record = Map::new();
        for field in self.schema().field_ids() {
            let value = match (self.normalized.get(field), missing) {
                (Some(value), _) => value.to_record_value(),
                (None, MissingValue::Omit) => continue,
                (None, MissingValue::Null) => Value::Null,
                (None, MissingValue::Value(filler)) => filler.clone(),
            };
            record.insert(field.name().to_owned(), value);
        }
        record
    }

    pub(crate) fn finalize(&mut self) {
        tracing::trace!(
            validator = %self.validator.name(),
            stage = %self.stage,
            "validation session closed"
        );
        self.enumerated.clear();
        self.unexpected.clear();
        self.filtered.clear();
    }
}
