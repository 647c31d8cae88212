//! # outpost-schema
//!
//! Explicit record schemas for the outpost validation engine.
//!
//! A [`RecordSchema`] is the closed universe of fields for one record type.
//! Each field gets an interned [`FieldId`] when the schema is built, and a
//! [`TypeDesc`] describing what the engine should coerce raw values into.
//!
//! ```rust,ignore
//! use outpost_schema::{RecordSchema, TypeDesc};
//!
//! let phone = RecordSchema::builder("Phone")
//!     .field("id", TypeDesc::Int)
//!     .field("number", TypeDesc::Str)
//!     .build()?;
//!
//! let user = RecordSchema::builder("User")
//!     .field("id", TypeDesc::Int)
//!     .field("name", TypeDesc::Str)
//!     .field("contact", TypeDesc::record(&phone))
//!     .build()?;
//!
//! let name = user.field("name")?;
//! assert_eq!(name.name(), "name");
//! ```
//!
//! Schemas can also be produced from a [`FieldSource`], the contract an
//! ORM-like layer implements to describe its tables.

pub mod error;
pub mod field;
pub mod schema;
pub mod source;
pub mod types;

pub use error::SchemaError;
pub use field::{FieldId, RecordId};
pub use schema::{FieldDef, RecordSchema, RecordSchemaBuilder};
pub use source::{Column, ColumnType, FieldDescriptor, FieldSource, Relationship, TableSource};
pub use types::{Relation, TypeDesc};

pub mod prelude {
    pub use crate::{
        FieldDescriptor, FieldId, FieldSource, RecordSchema, Relation, SchemaError, TypeDesc,
    };
}
