//! Prelude module for convenient imports.
//!
//! Provides a single `use outpost_validator::prelude::*;` import that brings
//! in validators, rules, errors and the schema types they are declared over.

pub use crate::config::{FieldValidator, MissingValue, PolicyOverrides, ValidatorPolicy};
pub use crate::context::{RawInput, ValidationContext};
pub use crate::error::{BoxError, ConfigError, ErrorKind, ValidationError};
pub use crate::registry::ValidatorRegistry;
pub use crate::rule::Rule;
pub use crate::validator::Validator;

pub use outpost_schema::{FieldId, RecordSchema, TypeDesc};
