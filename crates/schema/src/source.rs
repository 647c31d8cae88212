//! Field descriptor sources.
//!
//! The engine never reflects on record types. Whatever layer owns them (an
//! ORM mapping, generated code, hand-written tables) implements
//! [`FieldSource`] and the schema is built from its descriptors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::schema::RecordSchema;
use crate::types::{Relation, TypeDesc};

/// Name and declared type of one field, as supplied by a [`FieldSource`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDesc,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// To-one or to-many when the field refers to other records.
    #[must_use]
    pub fn relation(&self) -> Option<Relation> {
        self.ty.relation()
    }
}

/// Something that can describe a record type field by field.
pub trait FieldSource {
    /// Record type name.
    fn record_name(&self) -> &str;

    /// Ordered field descriptors.
    fn field_descriptors(&self) -> Vec<FieldDescriptor>;
}

impl RecordSchema {
    /// Builds a schema from a descriptor source.
    pub fn from_source<S>(source: &S) -> Result<Arc<RecordSchema>, SchemaError>
    where
        S: FieldSource + ?Sized,
    {
        source
            .field_descriptors()
            .into_iter()
            .fold(RecordSchema::builder(source.record_name()), |builder, d| {
                builder.field(d.name, d.ty)
            })
            .build()
    }
}

/// Storage-level column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    Float,
    /// Timestamps, dates and times travel as ISO-8601 text.
    DateTime,
    Date,
    Time,
    Enum { name: String, variants: Vec<String> },
}

impl ColumnType {
    fn type_desc(&self) -> TypeDesc {
        match self {
            Self::Text | Self::DateTime | Self::Date | Self::Time => TypeDesc::Str,
            Self::Integer => TypeDesc::Int,
            Self::Boolean => TypeDesc::Bool,
            Self::Float => TypeDesc::Float,
            Self::Enum { name, variants } => {
                TypeDesc::enumeration(name.as_str(), variants.iter().cloned())
            }
        }
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// A nullable, non-key column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            primary_key: false,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    fn type_desc(&self) -> TypeDesc {
        let base = self.ty.type_desc();
        if self.nullable && !self.primary_key {
            TypeDesc::optional(base)
        } else {
            base
        }
    }
}

/// A relationship to another mapped record.
#[derive(Debug, Clone)]
pub struct Relationship {
    pub name: String,
    pub target: Arc<RecordSchema>,
    pub uselist: bool,
}

impl Relationship {
    /// Many-to-one / one-to-one.
    pub fn to_one(name: impl Into<String>, target: &Arc<RecordSchema>) -> Self {
        Self {
            name: name.into(),
            target: Arc::clone(target),
            uselist: false,
        }
    }

    /// One-to-many.
    pub fn to_many(name: impl Into<String>, target: &Arc<RecordSchema>) -> Self {
        Self {
            name: name.into(),
            target: Arc::clone(target),
            uselist: true,
        }
    }
}

/// Table-shaped descriptor source: columns first, then relationships.
///
/// Nullable non-key columns become `T | null`; to-many relationships become
/// `list[Target]`.
#[derive(Debug, Clone)]
pub struct TableSource {
    name: String,
    columns: Vec<Column>,
    relationships: Vec<Relationship>,
}

impl TableSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            relationships: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }
}

impl FieldSource for TableSource {
    fn record_name(&self) -> &str {
        &self.name
    }

    fn field_descriptors(&self) -> Vec<FieldDescriptor> {
        let columns = self
            .columns
            .iter()
            .map(|c| FieldDescriptor::new(c.name.clone(), c.type_desc()));
        let relationships = self.relationships.iter().map(|r| {
            let target = TypeDesc::record(&r.target);
            let ty = if r.uselist {
                TypeDesc::list(target)
            } else {
                target
            };
            FieldDescriptor::new(r.name.clone(), ty)
        });
        columns.chain(relationships).collect()
    }
}
