//! Type descriptors consumed by the type resolution strategy.

use std::fmt;
use std::sync::Arc;

use crate::schema::RecordSchema;

/// Declared type of one field.
///
/// This replaces runtime reflection: every record type hands the engine an
/// explicit description of what each field should hold.
#[derive(Debug, Clone)]
pub enum TypeDesc {
    /// Any value, passed through unchanged.
    Any,
    /// Only `null`.
    Null,
    Bool,
    Int,
    Float,
    Str,
    /// A string restricted to a fixed set of variants.
    Enum {
        name: Arc<str>,
        variants: Arc<[String]>,
    },
    /// A nested record, validated through its own pipeline.
    Record(Arc<RecordSchema>),
    /// Alternatives tried in declared order.
    Union(Vec<TypeDesc>),
    /// Homogeneous sequence.
    List(Box<TypeDesc>),
    /// Fixed-length heterogeneous sequence.
    Tuple(Vec<TypeDesc>),
}

/// Relationship kind of a record-typed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    ToOne,
    ToMany,
}

impl TypeDesc {
    /// A nested record type.
    #[must_use]
    pub fn record(schema: &Arc<RecordSchema>) -> Self {
        Self::Record(Arc::clone(schema))
    }

    /// A homogeneous list of `inner`.
    #[must_use]
    pub fn list(inner: TypeDesc) -> Self {
        Self::List(Box::new(inner))
    }

    /// Alternatives tried in the given order.
    #[must_use]
    pub fn union(alternatives: impl IntoIterator<Item = TypeDesc>) -> Self {
        Self::Union(alternatives.into_iter().collect())
    }

    /// A fixed-length tuple.
    #[must_use]
    pub fn tuple(elements: impl IntoIterator<Item = TypeDesc>) -> Self {
        Self::Tuple(elements.into_iter().collect())
    }

    /// A string enumeration.
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<Arc<str>>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// `inner` or `null`. Flattens into an existing union.
    #[must_use]
    pub fn optional(inner: TypeDesc) -> Self {
        match inner {
            Self::Union(mut alternatives) => {
                if !alternatives.iter().any(|alt| matches!(alt, Self::Null)) {
                    alternatives.push(Self::Null);
                }
                Self::Union(alternatives)
            }
            Self::Null => Self::Null,
            other => Self::Union(vec![other, Self::Null]),
        }
    }

    /// Human-readable type name used in error messages.
    #[must_use]
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// Relationship kind if this type refers to other records.
    #[must_use]
    pub fn relation(&self) -> Option<Relation> {
        match self {
            Self::Record(_) => Some(Relation::ToOne),
            Self::List(inner) => inner.relation().map(|_| Relation::ToMany),
            Self::Union(alternatives) => alternatives.iter().find_map(TypeDesc::relation),
            _ => None,
        }
    }

    /// Whether a record of type `schema` may appear somewhere in this type,
    /// directly, as a union alternative, or as a collection element.
    #[must_use]
    pub fn admits_record(&self, schema: &RecordSchema) -> bool {
        match self {
            Self::Record(declared) => schema.is_subtype_of(declared),
            Self::Union(alternatives) | Self::Tuple(alternatives) => {
                alternatives.iter().any(|alt| alt.admits_record(schema))
            }
            Self::List(inner) => inner.admits_record(schema),
            _ => false,
        }
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Any, Self::Any)
            | (Self::Null, Self::Null)
            | (Self::Bool, Self::Bool)
            | (Self::Int, Self::Int)
            | (Self::Float, Self::Float)
            | (Self::Str, Self::Str) => true,
            (
                Self::Enum { name, variants },
                Self::Enum {
                    name: other_name,
                    variants: other_variants,
                },
            ) => name == other_name && variants == other_variants,
            (Self::Record(a), Self::Record(b)) => a.id() == b.id(),
            (Self::Union(a), Self::Union(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Null => f.write_str("null"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Enum { name, .. } => f.write_str(name),
            Self::Record(schema) => f.write_str(schema.name()),
            Self::Union(alternatives) => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Tuple(elements) => {
                f.write_str("tuple[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> Arc<RecordSchema> {
        RecordSchema::builder("Phone")
            .field("number", TypeDesc::Str)
            .build()
            .unwrap()
    }

    #[test]
    fn renders_names() {
        let phone = phone();
        assert_eq!(TypeDesc::Int.name(), "int");
        assert_eq!(
            TypeDesc::union([TypeDesc::Int, TypeDesc::record(&phone)]).name(),
            "int | Phone"
        );
        assert_eq!(TypeDesc::list(TypeDesc::record(&phone)).name(), "list[Phone]");
        assert_eq!(
            TypeDesc::tuple([TypeDesc::Int, TypeDesc::Str]).name(),
            "tuple[int, str]"
        );
        assert_eq!(TypeDesc::optional(TypeDesc::Str).name(), "str | null");
    }

    #[test]
    fn optional_flattens_unions() {
        let ty = TypeDesc::optional(TypeDesc::union([TypeDesc::Int, TypeDesc::Str]));
        assert_eq!(ty, TypeDesc::union([TypeDesc::Int, TypeDesc::Str, TypeDesc::Null]));

        let twice = TypeDesc::optional(ty.clone());
        assert_eq!(twice, ty);
    }

    #[test]
    fn relation_kinds() {
        let phone = phone();
        assert_eq!(TypeDesc::record(&phone).relation(), Some(Relation::ToOne));
        assert_eq!(
            TypeDesc::list(TypeDesc::record(&phone)).relation(),
            Some(Relation::ToMany)
        );
        assert_eq!(
            TypeDesc::optional(TypeDesc::record(&phone)).relation(),
            Some(Relation::ToOne)
        );
        assert_eq!(TypeDesc::list(TypeDesc::Int).relation(), None);
        assert_eq!(TypeDesc::Str.relation(), None);
    }

    #[test]
    fn admits_record_looks_through_containers() {
        let phone = phone();
        let other = self::phone();
        let ty = TypeDesc::union([TypeDesc::Int, TypeDesc::list(TypeDesc::record(&phone))]);

        assert!(ty.admits_record(&phone));
        assert!(!ty.admits_record(&other));
        assert!(!TypeDesc::Int.admits_record(&phone));
    }
}
