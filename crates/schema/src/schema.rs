//! Record schemas: the closed field universe of one record type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::field::{FieldId, RecordId};
use crate::types::TypeDesc;

/// One field of a record schema.
#[derive(Debug, Clone)]
pub struct FieldDef {
    id: FieldId,
    ty: TypeDesc,
}

impl FieldDef {
    /// The interned identifier.
    #[must_use]
    pub fn id(&self) -> &FieldId {
        &self.id
    }

    /// Canonical field name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Declared type.
    #[must_use]
    pub fn ty(&self) -> &TypeDesc {
        &self.ty
    }
}

/// The ordered, immutable field table of one record type.
///
/// Built once per record type and shared behind an [`Arc`]. Field order is
/// declaration order, inherited fields first.
pub struct RecordSchema {
    id: RecordId,
    name: Arc<str>,
    fields: Vec<FieldDef>,
    by_name: HashMap<Arc<str>, usize>,
    parent: Option<Arc<RecordSchema>>,
}

impl RecordSchema {
    /// Starts a new record schema.
    pub fn builder(name: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// Starts a sub-record of `parent`.
    ///
    /// The sub-record inherits every parent field with the parent's
    /// identifiers, so validators written against the parent keep working.
    pub fn extend(parent: &Arc<RecordSchema>, name: impl Into<String>) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            name: name.into(),
            parent: Some(Arc::clone(parent)),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Record type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record this one was extended from, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<RecordSchema>> {
        self.parent.as_ref()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    /// Field identifiers in declaration order.
    pub fn field_ids(&self) -> impl Iterator<Item = &FieldId> {
        self.fields.iter().map(FieldDef::id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Looks a field up by its canonical name.
    pub fn field(&self, name: &str) -> Result<FieldId, SchemaError> {
        self.get(name)
            .map(|def| def.id.clone())
            .ok_or_else(|| SchemaError::UnknownField {
                record: self.name.to_string(),
                field: name.to_owned(),
            })
    }

    /// Looks several fields up at once, failing on the first unknown name.
    pub fn fields_named<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<FieldId>, SchemaError> {
        names.into_iter().map(|name| self.field(name)).collect()
    }

    /// Field definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Field definition by identifier. `None` for identifiers of other records.
    #[must_use]
    pub fn def(&self, id: &FieldId) -> Option<&FieldDef> {
        self.get(id.name()).filter(|def| def.id == *id)
    }

    /// Whether `id` belongs to this record's universe.
    #[must_use]
    pub fn contains(&self, id: &FieldId) -> bool {
        self.def(id).is_some()
    }

    /// Whether this record is `other` or was extended (transitively) from it.
    #[must_use]
    pub fn is_subtype_of(&self, other: &RecordSchema) -> bool {
        if self.id == other.id {
            return true;
        }
        let mut current = self.parent.as_deref();
        while let Some(schema) = current {
            if schema.id == other.id {
                return true;
            }
            current = schema.parent.as_deref();
        }
        false
    }
}

impl fmt::Debug for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSchema")
            .field("id", &self.id)
            .field("name", &self.name)
            .field(
                "fields",
                &self
                    .fields
                    .iter()
                    .map(|def| format!("{}: {}", def.name(), def.ty))
                    .collect::<Vec<_>>(),
            )
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Builder for [`RecordSchema`].
#[derive(Debug)]
pub struct RecordSchemaBuilder {
    name: String,
    parent: Option<Arc<RecordSchema>>,
    fields: Vec<(String, TypeDesc)>,
}

impl RecordSchemaBuilder {
    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: TypeDesc) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    /// Freezes the schema and interns its field identifiers.
    pub fn build(self) -> Result<Arc<RecordSchema>, SchemaError> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyRecordName);
        }

        let id = RecordId::next();
        let record_name: Arc<str> = Arc::from(self.name.as_str());
        let mut fields: Vec<FieldDef> = self
            .parent
            .as_ref()
            .map(|parent| parent.fields.clone())
            .unwrap_or_default();
        let mut by_name: HashMap<Arc<str>, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, def)| (Arc::from(def.name()), i))
            .collect();

        for (index, (name, ty)) in self.fields.into_iter().enumerate() {
            let name: Arc<str> = Arc::from(name);
            if by_name.contains_key(&name) {
                return Err(SchemaError::DuplicateField {
                    record: self.name,
                    field: name.to_string(),
                });
            }
            by_name.insert(Arc::clone(&name), fields.len());
            fields.push(FieldDef {
                id: FieldId::new(id, index as u32, name, Arc::clone(&record_name)),
                ty,
            });
        }

        Ok(Arc::new(RecordSchema {
            id,
            name: record_name,
            fields,
            by_name,
            parent: self.parent,
        }))
    }
}
