/// Error type for schema construction and field lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The record has no field with the given name.
    #[error("record `{record}` has no field `{field}`")]
    UnknownField { record: String, field: String },

    /// A field name was declared twice, including a redeclaration of an
    /// inherited field.
    #[error("record `{record}` declares field `{field}` more than once")]
    DuplicateField { record: String, field: String },

    /// Record names are used in error paths and must not be blank.
    #[error("record name must not be empty")]
    EmptyRecordName,
}

impl SchemaError {
    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownField { .. } => "SCHEMA_UNKNOWN_FIELD",
            Self::DuplicateField { .. } => "SCHEMA_DUPLICATE_FIELD",
            Self::EmptyRecordName => "SCHEMA_EMPTY_NAME",
        }
    }
}
