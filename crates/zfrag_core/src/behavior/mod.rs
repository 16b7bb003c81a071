//! Behavior capability interface.
//!
//! # Responsibility
//! - Define the plugin surface that replaces arbitrary fragment script
//!   execution: named behavior objects with a declared capability set.
//! - Scope what a behavior may touch during a call to one component
//!   instance.
//!
//! # Invariants
//! - Dispatch only reaches methods the behavior manifest declares.
//! - Behaviors read the document but mutate only the instance property
//!   bag; the element's attributes are a connect-time snapshot.

pub mod manifest;
pub mod registry;

pub use manifest::{
    BehaviorManifest, LifecycleHooks, ManifestValidationError, HOOK_CONNECTED, HOOK_DISCONNECTED,
};
pub use registry::{BehaviorRegistry, BehaviorRegistryError};

use crate::component::ComponentId;
use crate::dom::{Document, NodeId};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Method argument and return payload type.
pub type Value = serde_json::Value;

/// Behavior invocation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorError {
    /// The method is not implemented even though dispatch resolved it.
    UnknownMethod {
        behavior_id: String,
        method: String,
    },
    /// Arguments did not match what the method expects.
    InvalidArguments { method: String, reason: String },
    /// The behavior ran and failed.
    Failed { behavior_id: String, reason: String },
}

impl Display for BehaviorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMethod {
                behavior_id,
                method,
            } => write!(f, "behavior {behavior_id} has no method: {method}"),
            Self::InvalidArguments { method, reason } => {
                write!(f, "invalid arguments for {method}: {reason}")
            }
            Self::Failed {
                behavior_id,
                reason,
            } => write!(f, "behavior {behavior_id} failed: {reason}"),
        }
    }
}

impl Error for BehaviorError {}

/// What one behavior call may touch on its host component instance.
///
/// The document reference is read-only; behaviors observe the tree but
/// mutate only the instance property bag.
pub struct BehaviorScope<'a> {
    component_id: ComponentId,
    document: &'a Document,
    element: NodeId,
    attributes: &'a BTreeMap<String, String>,
    props: &'a mut BTreeMap<String, Value>,
}

impl<'a> BehaviorScope<'a> {
    pub(crate) fn new(
        component_id: ComponentId,
        document: &'a Document,
        element: NodeId,
        attributes: &'a BTreeMap<String, String>,
        props: &'a mut BTreeMap<String, Value>,
    ) -> Self {
        Self {
            component_id,
            document,
            element,
            attributes,
            props,
        }
    }

    /// Id of the host component instance.
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// The document hosting the component, read-only.
    pub fn document(&self) -> &Document {
        self.document
    }

    /// The hosting element node.
    pub fn element(&self) -> NodeId {
        self.element
    }

    /// Element attribute snapshot taken at connect time.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    pub fn set_prop(&mut self, name: impl Into<String>, value: Value) {
        self.props.insert(name.into(), value);
    }

    pub fn remove_prop(&mut self, name: &str) -> Option<Value> {
        self.props.remove(name)
    }
}

/// Named behavior object: the explicit replacement for fragment-embedded
/// script execution.
///
/// Lifecycle hooks default to no-ops; a behavior that declares a hook in its
/// manifest is expected to override the matching method.
pub trait Behavior: Send + Sync {
    /// Declared capability set; validated on registration.
    fn manifest(&self) -> &BehaviorManifest;

    /// Runs after the host's fragment children are appended.
    fn connected(&self, _scope: &mut BehaviorScope<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Runs when the host instance is unmounted.
    fn disconnected(&self, _scope: &mut BehaviorScope<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }

    /// Invokes one declared method.
    fn invoke(
        &self,
        method: &str,
        scope: &mut BehaviorScope<'_>,
        args: &[Value],
    ) -> Result<Value, BehaviorError>;
}

/// Built-in baseline behavior used to verify the registry and dispatch path.
///
/// Exports `echo` (returns its arguments as an array) and records the number
/// of connects in the `echo.connects` instance property.
pub struct EchoBehavior {
    manifest: BehaviorManifest,
}

impl EchoBehavior {
    pub const ID: &'static str = "builtin.echo";

    pub fn new() -> Self {
        Self {
            manifest: BehaviorManifest::new(Self::ID, "0.1.0", &["echo"]).with_hooks(true, true),
        }
    }
}

impl Default for EchoBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl Behavior for EchoBehavior {
    fn manifest(&self) -> &BehaviorManifest {
        &self.manifest
    }

    fn connected(&self, scope: &mut BehaviorScope<'_>) -> Result<(), BehaviorError> {
        let connects = scope
            .prop("echo.connects")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        scope.set_prop("echo.connects", Value::from(connects + 1));
        Ok(())
    }

    fn disconnected(&self, scope: &mut BehaviorScope<'_>) -> Result<(), BehaviorError> {
        scope.set_prop("echo.disconnected", Value::Bool(true));
        Ok(())
    }

    fn invoke(
        &self,
        method: &str,
        _scope: &mut BehaviorScope<'_>,
        args: &[Value],
    ) -> Result<Value, BehaviorError> {
        match method {
            "echo" => Ok(Value::Array(args.to_vec())),
            other => Err(BehaviorError::UnknownMethod {
                behavior_id: Self::ID.to_string(),
                method: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Behavior, BehaviorScope, EchoBehavior, Value};
    use crate::dom::Document;
    use std::collections::BTreeMap;

    #[test]
    fn echo_returns_arguments_and_counts_connects() {
        let behavior = EchoBehavior::new();
        let doc = Document::new();
        let attributes = BTreeMap::new();
        let mut props = BTreeMap::new();

        let mut scope = BehaviorScope::new(1, &doc, doc.root(), &attributes, &mut props);
        behavior.connected(&mut scope).expect("connect hook");
        behavior.connected(&mut scope).expect("connect hook");
        let result = behavior
            .invoke("echo", &mut scope, &[Value::from("hi")])
            .expect("echo invocation");

        assert_eq!(result, Value::Array(vec![Value::from("hi")]));
        assert_eq!(props.get("echo.connects"), Some(&Value::from(2)));
    }

    #[test]
    fn echo_rejects_undeclared_method() {
        let behavior = EchoBehavior::new();
        let doc = Document::new();
        let attributes = BTreeMap::new();
        let mut props = BTreeMap::new();
        let mut scope = BehaviorScope::new(1, &doc, doc.root(), &attributes, &mut props);
        assert!(behavior.invoke("reset", &mut scope, &[]).is_err());
    }

    #[test]
    fn scope_reads_attributes_case_insensitively() {
        let doc = Document::new();
        let mut attributes = BTreeMap::new();
        attributes.insert("remote-src".to_string(), "/a.html".to_string());
        let mut props = BTreeMap::new();
        let scope = BehaviorScope::new(7, &doc, doc.root(), &attributes, &mut props);
        assert_eq!(scope.attribute("REMOTE-SRC"), Some("/a.html"));
        assert_eq!(scope.component_id(), 7);
    }
}
