//! # outpost-validator
//!
//! Declarative validation and normalization of record data.
//!
//! A [`Validator`] describes, for one record type, which fields are
//! readonly, which defaults apply, which fields must be present, how each
//! field is resolved and which cross-field checks run. Validators derive from
//! one another; a derived validator merges its own declarations into its
//! base's configuration without touching the base.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use outpost_validator::prelude::*;
//! use serde_json::json;
//!
//! let schema = RecordSchema::builder("User")
//!     .field("id", TypeDesc::Int)
//!     .field("name", TypeDesc::Str)
//!     .build()?;
//! let id = schema.field("id")?;
//! let name = schema.field("name")?;
//!
//! let validator = Validator::builder("UserValidator", &schema)
//!     .readonly([&id])
//!     .require(Rule::from(&name))
//!     .custom(&name, |v| Ok(json!(v.as_str().unwrap_or_default().trim())))
//!     .build()?;
//!
//! let data = validator.validation_results(json!({"id": 7, "name": "  Ann "}))?;
//! assert_eq!(serde_json::Value::Object(data), json!({"name": "Ann"}));
//! ```
//!
//! ## Pipeline
//!
//! Every run goes through [`ValidationContext`]: enumerate, filter, check
//! requirements, normalize, combine, then export. Stages can be driven one
//! at a time; invoking them out of order is an error.

// ValidationError is returned unboxed from every pipeline stage.
#![allow(clippy::result_large_err)]

pub mod config;
pub mod context;
pub mod error;
pub mod prelude;
pub mod registry;
pub mod resolve;
pub mod rule;
pub mod validator;

pub use config::{
    Combinator, Declarations, FieldRule, FieldValidator, MissingValue, PolicyOverrides,
    ValidatorConfig, ValidatorPolicy,
};
pub use context::{Normalized, RawInput, Stage, ValidationContext};
pub use error::{BoxError, ConfigError, ErrorKind, PathSegment, ValidationError};
pub use registry::ValidatorRegistry;
pub use rule::{RequirementError, Rule};
pub use validator::{Validator, ValidatorBuilder};

pub use outpost_schema as schema;
