//! In-process behavior registry.

use crate::behavior::manifest::ManifestValidationError;
use crate::behavior::Behavior;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Behavior registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorRegistryError {
    InvalidManifest(ManifestValidationError),
    DuplicateBehaviorId(String),
}

impl Display for BehaviorRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidManifest(err) => write!(f, "invalid behavior manifest: {err}"),
            Self::DuplicateBehaviorId(value) => {
                write!(f, "behavior id already registered: {value}")
            }
        }
    }
}

impl Error for BehaviorRegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidManifest(err) => Some(err),
            Self::DuplicateBehaviorId(_) => None,
        }
    }
}

impl From<ManifestValidationError> for BehaviorRegistryError {
    fn from(value: ManifestValidationError) -> Self {
        Self::InvalidManifest(value)
    }
}

/// Registry of behaviors available to fragment directives.
#[derive(Default)]
pub struct BehaviorRegistry {
    behaviors: BTreeMap<String, Arc<dyn Behavior>>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one behavior after manifest validation.
    pub fn register(&mut self, behavior: Arc<dyn Behavior>) -> Result<(), BehaviorRegistryError> {
        let manifest = behavior.manifest();
        manifest.validate()?;
        let id = manifest.id.trim().to_string();
        if self.behaviors.contains_key(id.as_str()) {
            return Err(BehaviorRegistryError::DuplicateBehaviorId(id));
        }
        self.behaviors.insert(id, behavior);
        Ok(())
    }

    pub fn get(&self, behavior_id: &str) -> Option<Arc<dyn Behavior>> {
        self.behaviors.get(behavior_id.trim()).cloned()
    }

    pub fn contains(&self, behavior_id: &str) -> bool {
        self.behaviors.contains_key(behavior_id.trim())
    }

    /// Returns sorted behavior ids.
    pub fn ids(&self) -> Vec<String> {
        self.behaviors.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{BehaviorRegistry, BehaviorRegistryError};
    use crate::behavior::{Behavior, BehaviorError, BehaviorManifest, BehaviorScope, EchoBehavior, Value};
    use std::sync::Arc;

    struct NamelessBehavior {
        manifest: BehaviorManifest,
    }

    impl Behavior for NamelessBehavior {
        fn manifest(&self) -> &BehaviorManifest {
            &self.manifest
        }

        fn invoke(
            &self,
            method: &str,
            _scope: &mut BehaviorScope<'_>,
            _args: &[Value],
        ) -> Result<Value, BehaviorError> {
            Err(BehaviorError::UnknownMethod {
                behavior_id: self.manifest.id.clone(),
                method: method.to_string(),
            })
        }
    }

    #[test]
    fn registers_and_looks_up_behaviors() {
        let mut registry = BehaviorRegistry::new();
        registry
            .register(Arc::new(EchoBehavior::new()))
            .expect("echo registration");

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(EchoBehavior::ID));
        assert!(registry.get(EchoBehavior::ID).is_some());
        assert_eq!(registry.ids(), vec![EchoBehavior::ID.to_string()]);
    }

    #[test]
    fn rejects_duplicate_behavior_id() {
        let mut registry = BehaviorRegistry::new();
        registry
            .register(Arc::new(EchoBehavior::new()))
            .expect("first registration");
        let err = registry
            .register(Arc::new(EchoBehavior::new()))
            .expect_err("duplicate registration must fail");
        assert!(matches!(
            err,
            BehaviorRegistryError::DuplicateBehaviorId(_)
        ));
    }

    #[test]
    fn rejects_invalid_manifest() {
        let mut registry = BehaviorRegistry::new();
        let behavior = NamelessBehavior {
            manifest: BehaviorManifest::new("", "0.1.0", &["x"]),
        };
        let err = registry
            .register(Arc::new(behavior))
            .expect_err("invalid manifest must fail");
        assert!(matches!(err, BehaviorRegistryError::InvalidManifest(_)));
    }
}
