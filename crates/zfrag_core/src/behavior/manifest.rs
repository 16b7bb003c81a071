//! Behavior manifest declaration and validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reserved name for the connect lifecycle hook.
pub const HOOK_CONNECTED: &str = "connected";
/// Reserved name for the disconnect lifecycle hook.
pub const HOOK_DISCONNECTED: &str = "disconnected";

const RESERVED_METHOD_NAMES: &[&str] = &[HOOK_CONNECTED, HOOK_DISCONNECTED];

/// Lifecycle hook declarations for one behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleHooks {
    /// Behavior implements `connected`.
    #[serde(default)]
    pub connected: bool,
    /// Behavior implements `disconnected`.
    #[serde(default)]
    pub disconnected: bool,
}

/// Declarative capability manifest for one behavior.
///
/// The manifest is the explicit replacement for duck-typed "does this object
/// have a method named X" checks: dispatch only reaches methods declared
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorManifest {
    /// Stable behavior identifier, e.g. `builtin.echo`.
    pub id: String,
    /// Semantic version string (`major.minor.patch`).
    pub version: String,
    /// Named methods exported onto host component instances.
    pub methods: Vec<String>,
    /// Declared lifecycle hooks.
    #[serde(default)]
    pub hooks: LifecycleHooks,
}

impl BehaviorManifest {
    /// Convenience constructor for method-only behaviors.
    pub fn new(
        id: impl Into<String>,
        version: impl Into<String>,
        methods: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            hooks: LifecycleHooks::default(),
        }
    }

    /// Marks the connect/disconnect hooks as implemented.
    pub fn with_hooks(mut self, connected: bool, disconnected: bool) -> Self {
        self.hooks = LifecycleHooks {
            connected,
            disconnected,
        };
        self
    }

    /// Validates declaration-level manifest invariants.
    pub fn validate(&self) -> Result<(), ManifestValidationError> {
        if self.id.trim().is_empty() {
            return Err(ManifestValidationError::EmptyId);
        }
        if !is_valid_behavior_id(self.id.trim()) {
            return Err(ManifestValidationError::InvalidId(self.id.clone()));
        }

        if self.version.trim().is_empty() {
            return Err(ManifestValidationError::EmptyVersion);
        }
        if !is_semver_triplet(self.version.trim()) {
            return Err(ManifestValidationError::InvalidVersion(
                self.version.clone(),
            ));
        }

        if self.methods.is_empty() && !self.hooks.connected && !self.hooks.disconnected {
            return Err(ManifestValidationError::NoExports);
        }

        let mut seen = BTreeSet::<&str>::new();
        for method in &self.methods {
            let normalized = method.trim();
            if normalized.is_empty() {
                return Err(ManifestValidationError::EmptyMethod);
            }
            if RESERVED_METHOD_NAMES.contains(&normalized) {
                return Err(ManifestValidationError::ReservedMethod(
                    normalized.to_string(),
                ));
            }
            if !is_valid_method_name(normalized) {
                return Err(ManifestValidationError::InvalidMethod(
                    normalized.to_string(),
                ));
            }
            if !seen.insert(normalized) {
                return Err(ManifestValidationError::DuplicateMethod(
                    normalized.to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn is_valid_behavior_id(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

fn is_valid_method_name(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_semver_triplet(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() != 3 {
        return false;
    }
    parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

/// Manifest validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestValidationError {
    EmptyId,
    InvalidId(String),
    EmptyVersion,
    InvalidVersion(String),
    NoExports,
    EmptyMethod,
    InvalidMethod(String),
    DuplicateMethod(String),
    ReservedMethod(String),
}

impl Display for ManifestValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "behavior id must not be empty"),
            Self::InvalidId(value) => write!(f, "behavior id is invalid: {value}"),
            Self::EmptyVersion => write!(f, "behavior version must not be empty"),
            Self::InvalidVersion(value) => write!(
                f,
                "behavior version is invalid: {value} (expected major.minor.patch)"
            ),
            Self::NoExports => write!(f, "behavior declares no methods and no hooks"),
            Self::EmptyMethod => write!(f, "behavior declares an empty method name"),
            Self::InvalidMethod(value) => write!(f, "behavior method name is invalid: {value}"),
            Self::DuplicateMethod(value) => {
                write!(f, "behavior method is declared twice: {value}")
            }
            Self::ReservedMethod(value) => {
                write!(f, "behavior method name is reserved for lifecycle: {value}")
            }
        }
    }
}

impl Error for ManifestValidationError {}

#[cfg(test)]
mod tests {
    use super::{BehaviorManifest, ManifestValidationError};

    fn valid_manifest() -> BehaviorManifest {
        BehaviorManifest::new("builtin.echo", "0.1.0", &["echo", "reset"]).with_hooks(true, false)
    }

    #[test]
    fn validates_baseline_manifest() {
        assert!(valid_manifest().validate().is_ok());
    }

    #[test]
    fn accepts_hook_only_manifest() {
        let manifest = BehaviorManifest::new("hooks.only", "1.0.0", &[]).with_hooks(true, true);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn rejects_manifest_without_exports() {
        let manifest = BehaviorManifest::new("empty.one", "1.0.0", &[]);
        assert_eq!(
            manifest.validate().unwrap_err(),
            ManifestValidationError::NoExports
        );
    }

    #[test]
    fn rejects_invalid_id_forms() {
        for id in ["Builtin.Echo", "has space", "double..dot", "trailing.", ""] {
            let mut manifest = valid_manifest();
            manifest.id = id.to_string();
            assert!(
                manifest.validate().is_err(),
                "id should be rejected: {id:?}"
            );
        }
    }

    #[test]
    fn rejects_invalid_version_format() {
        let mut manifest = valid_manifest();
        manifest.version = "v1".to_string();
        assert!(matches!(
            manifest.validate().unwrap_err(),
            ManifestValidationError::InvalidVersion(_)
        ));
    }

    #[test]
    fn rejects_duplicate_method() {
        let manifest = BehaviorManifest::new("dup.methods", "0.1.0", &["echo", "echo"]);
        assert_eq!(
            manifest.validate().unwrap_err(),
            ManifestValidationError::DuplicateMethod("echo".to_string())
        );
    }

    #[test]
    fn rejects_reserved_lifecycle_names_as_methods() {
        let manifest = BehaviorManifest::new("bad.hooks", "0.1.0", &["connected"]);
        assert_eq!(
            manifest.validate().unwrap_err(),
            ManifestValidationError::ReservedMethod("connected".to_string())
        );
    }
}
