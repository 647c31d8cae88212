//! Type resolution: turning one raw field value into a [`Normalized`] value.
//!
//! Order of precedence for a field:
//!
//! 1. a custom field function replaces resolution entirely
//! 2. record values go through the delegate validator, or an empty one; an
//!    unchecked delegate takes any mapping regardless of the declared type
//! 3. unions try each alternative in order, first success wins
//! 4. lists and tuples resolve element by element
//! 5. primitives are cast

use std::sync::Arc;

use outpost_schema::TypeDesc;
use serde_json::{Number, Value};

use crate::config::{FieldRule, FieldValidator};
use crate::context::Normalized;
use crate::error::{ErrorKind, ValidationError};
use crate::validator::Validator;

/// Resolves the value of one field.
pub(crate) fn resolve_field(
    ty: &TypeDesc,
    value: &Value,
    validator: Option<&FieldValidator>,
) -> Result<Normalized, ValidationError> {
    let Some(validator) = validator else {
        return resolve(ty, value, None);
    };
    match validator.rule() {
        FieldRule::Custom(f) => {
            let output = f(value).map_err(|err| ValidationError::from_user(err, value))?;
            if validator.check_result_type() && !conforms(ty, &output) {
                return Err(ValidationError::new(
                    ErrorKind::TypeCoercion,
                    format!("field function returned {output}, expected {ty}"),
                )
                .with_param("expected", ty.name()));
            }
            Ok(Normalized::Value(output))
        }
        FieldRule::Delegate(delegate) if !validator.check_result_type() && value.is_object() => {
            let context = delegate.validate(value.clone())?;
            Ok(Normalized::Record(Box::new(context)))
        }
        FieldRule::Delegate(delegate) => resolve(ty, value, Some(delegate)),
    }
}

/// Resolves `value` against `ty`, validating record values with `delegate`
/// when its record fits.
pub fn resolve(
    ty: &TypeDesc,
    value: &Value,
    delegate: Option<&Arc<Validator>>,
) -> Result<Normalized, ValidationError> {
    match ty {
        TypeDesc::Union(alternatives) => resolve_union(ty, alternatives, value, delegate),
        TypeDesc::List(inner) => {
            let items = as_sequence(ty, value)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| resolve(inner, item, delegate).map_err(|err| err.at_index(i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Normalized::List)
        }
        TypeDesc::Tuple(elements) => {
            let items = as_sequence(ty, value)?;
            if items.len() != elements.len() {
                return Err(ValidationError::type_coercion(value, &ty.name())
                    .with_param("length", elements.len().to_string()));
            }
            elements
                .iter()
                .zip(items)
                .enumerate()
                .map(|(i, (element, item))| {
                    resolve(element, item, delegate).map_err(|err| err.at_index(i))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Normalized::Tuple)
        }
        TypeDesc::Record(schema) => {
            if !value.is_object() {
                return Err(ValidationError::type_coercion(value, schema.name()));
            }
            let validator = match delegate {
                Some(delegate) if delegate.schema().is_subtype_of(schema) => Arc::clone(delegate),
                _ => Validator::basic(schema),
            };
            let context = validator.validate(value.clone())?;
            Ok(Normalized::Record(Box::new(context)))
        }
        primitive => cast(primitive, value).map(Normalized::Value),
    }
}

fn resolve_union(
    ty: &TypeDesc,
    alternatives: &[TypeDesc],
    value: &Value,
    delegate: Option<&Arc<Validator>>,
) -> Result<Normalized, ValidationError> {
    let mut causes = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        match resolve(alternative, value, delegate) {
            Ok(resolved) => return Ok(resolved),
            Err(err) => causes.push((alternative.name(), err)),
        }
    }
    Err(ValidationError::union_failed(&ty.name(), value, causes))
}

fn as_sequence<'a>(ty: &TypeDesc, value: &'a Value) -> Result<&'a Vec<Value>, ValidationError> {
    value
        .as_array()
        .ok_or_else(|| ValidationError::type_coercion(value, &ty.name()))
}

/// Casts a primitive value.
///
/// - `int`: integers, integral floats, numeric strings
/// - `float`: numbers, numeric strings
/// - `str`: strings, numbers, booleans
/// - `bool`: booleans, `"true"` / `"false"` in any case
/// - `null`: only `null`
/// - enumerations: one of the declared variant strings
pub fn cast(ty: &TypeDesc, value: &Value) -> Result<Value, ValidationError> {
    let cast = match ty {
        TypeDesc::Any => Some(value.clone()),
        TypeDesc::Null => value.is_null().then_some(Value::Null),
        TypeDesc::Bool => cast_bool(value),
        TypeDesc::Int => cast_int(value),
        TypeDesc::Float => cast_float(value),
        TypeDesc::Str => match value {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        TypeDesc::Enum { variants, .. } => value
            .as_str()
            .filter(|s| variants.iter().any(|v| v == s))
            .map(|s| Value::String(s.to_owned())),
        TypeDesc::Record(_) | TypeDesc::Union(_) | TypeDesc::List(_) | TypeDesc::Tuple(_) => {
            None
        }
    };
    cast.ok_or_else(|| ValidationError::type_coercion(value, &ty.name()))
}

fn cast_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn cast_int(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(Value::Number(n.clone())),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn cast_float(value: &Value) -> Option<Value> {
    let float = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    Number::from_f64(float).map(Value::Number)
}

/// Whether `value` already has the shape of `ty`, without any casting.
#[must_use]
pub fn conforms(ty: &TypeDesc, value: &Value) -> bool {
    match ty {
        TypeDesc::Any => true,
        TypeDesc::Null => value.is_null(),
        TypeDesc::Bool => value.is_boolean(),
        TypeDesc::Int => value.is_i64() || value.is_u64(),
        TypeDesc::Float => value.is_number(),
        TypeDesc::Str => value.is_string(),
        TypeDesc::Enum { variants, .. } => value
            .as_str()
            .is_some_and(|s| variants.iter().any(|v| v == s)),
        TypeDesc::Record(_) => value.is_object(),
        TypeDesc::Union(alternatives) => alternatives.iter().any(|alt| conforms(alt, value)),
        TypeDesc::List(inner) => value
            .as_array()
            .is_some_and(|items| items.iter().all(|item| conforms(inner, item))),
        TypeDesc::Tuple(elements) => value.as_array().is_some_and(|items| {
            items.len() == elements.len()
                && elements
                    .iter()
                    .zip(items)
                    .all(|(element, item)| conforms(element, item))
        }),
    }
}
