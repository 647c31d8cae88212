//! Validator registry.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ConfigError;
use crate::validator::{Validator, ValidatorBuilder};

/// Named validators, in definition order.
///
/// A name can be defined once; there is no way to redefine or mutate a
/// registered validator. Thread-safety is the caller's responsibility, wrap
/// in `RwLock` if shared across threads.
///
/// ```rust,ignore
/// let mut registry = ValidatorRegistry::new();
/// registry.define(Validator::builder("UserValidator", &schema).readonly([&id]))?;
/// let create = registry
///     .derive("UserValidator", "CreateUserValidator")?
///     .require(Rule::from(&name))
///     .build()?;
/// registry.register(create)?;
/// ```
pub struct ValidatorRegistry {
    validators: IndexMap<String, Arc<Validator>>,
}

impl ValidatorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            validators: IndexMap::new(),
        }
    }

    /// Register a built validator. Fails if the name is taken.
    pub fn register(&mut self, validator: Arc<Validator>) -> Result<Arc<Validator>, ConfigError> {
        let name = validator.name().to_owned();
        if self.validators.contains_key(&name) {
            return Err(ConfigError::AlreadyDefined { name });
        }
        tracing::debug!(validator = %name, "validator registered");
        self.validators.insert(name, Arc::clone(&validator));
        Ok(validator)
    }

    /// Build and register in one step. The name is checked before building.
    pub fn define(&mut self, builder: ValidatorBuilder) -> Result<Arc<Validator>, ConfigError> {
        if self.validators.contains_key(builder.name()) {
            return Err(ConfigError::AlreadyDefined {
                name: builder.name().to_owned(),
            });
        }
        let validator = builder.build()?;
        self.register(validator)
    }

    /// Start a validator derived from the registered validator `base`.
    pub fn derive(
        &self,
        base: &str,
        name: impl Into<String>,
    ) -> Result<ValidatorBuilder, ConfigError> {
        Ok(Validator::derive(self.get(base)?, name))
    }

    /// Look up a validator by name.
    pub fn get(&self, name: &str) -> Result<&Arc<Validator>, ConfigError> {
        self.validators
            .get(name)
            .ok_or_else(|| ConfigError::UnknownValidator {
                name: name.to_owned(),
            })
    }

    /// Whether a validator with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Registered names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    /// Number of registered validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outpost_schema::{RecordSchema, TypeDesc};
    use pretty_assertions::assert_eq;

    fn schema() -> Arc<RecordSchema> {
        RecordSchema::builder("User")
            .field("id", TypeDesc::Int)
            .build()
            .unwrap()
    }

    #[test]
    fn define_and_lookup() {
        let schema = schema();
        let mut registry = ValidatorRegistry::new();
        registry
            .define(Validator::builder("UserValidator", &schema))
            .unwrap();

        assert!(registry.contains("UserValidator"));
        assert_eq!(registry.get("UserValidator").unwrap().name(), "UserValidator");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn redefinition_is_rejected() {
        let schema = schema();
        let mut registry = ValidatorRegistry::new();
        registry
            .define(Validator::builder("UserValidator", &schema))
            .unwrap();

        let err = registry
            .define(Validator::builder("UserValidator", &schema))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::AlreadyDefined {
                name: "UserValidator".into()
            }
        );
    }

    #[test]
    fn derive_from_registered_base() {
        let schema = schema();
        let mut registry = ValidatorRegistry::new();
        let base = registry
            .define(Validator::builder("UserValidator", &schema))
            .unwrap();

        let derived = registry
            .derive("UserValidator", "CreateUserValidator")
            .unwrap()
            .build()
            .unwrap();
        registry.register(Arc::clone(&derived)).unwrap();

        assert!(derived.derives_from(&base));
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["UserValidator", "CreateUserValidator"]
        );
    }

    #[test]
    fn unknown_base() {
        let registry = ValidatorRegistry::new();
        let err = registry.derive("Missing", "Child").unwrap_err();
        assert_eq!(err.code(), "CONFIG_UNKNOWN_VALIDATOR");
    }
}
