//! Component instance model.
//!
//! # Responsibility
//! - Hold the per-instance state the connect sequence produces: connect-time
//!   attributes, the mutable property bag, and the merged export table.
//! - Implement the export merge with an explicit collision policy.
//!
//! # Invariants
//! - Attributes are read once at connect time and never re-read.
//! - Export merging is last-declaration-wins; every overwrite is reported to
//!   the caller so it can be logged.

use crate::behavior::{BehaviorManifest, Value};
use crate::dom::{Document, NodeId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Monotonically increasing instance id, unique within one runtime.
pub type ComponentId = u64;

/// Attribute naming the fragment URL to fetch.
pub const ATTR_REMOTE_SRC: &str = "remote-src";
/// Attribute carrying a CSS display value applied before the fetch.
pub const ATTR_DISPLAY: &str = "display";
/// Flag attribute that publishes the merged exports on the debug slot.
pub const ATTR_DEBUG: &str = "debug";

/// Recognized component attributes, read once at connect time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentAttributes {
    pub remote_src: Option<String>,
    pub display: Option<String>,
    pub debug: bool,
}

impl ComponentAttributes {
    /// Reads the recognized attributes from an element.
    pub fn from_element(doc: &Document, element: NodeId) -> Self {
        Self {
            remote_src: doc.attribute(element, ATTR_REMOTE_SRC).map(str::to_string),
            display: doc.attribute(element, ATTR_DISPLAY).map(str::to_string),
            debug: doc.has_attribute(element, ATTR_DEBUG),
        }
    }
}

/// One entry of the instance export table: method name bound to a behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportBinding {
    pub behavior_id: String,
    pub method: String,
}

/// One overwrite produced by the export merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportCollision {
    /// Export name that was rebound (`connected`/`disconnected` for hooks).
    pub name: String,
    pub previous: String,
    pub replacement: String,
}

/// Live component instance.
#[derive(Debug)]
pub struct ComponentInstance {
    id: ComponentId,
    element: NodeId,
    attributes: ComponentAttributes,
    element_attributes: BTreeMap<String, String>,
    props: BTreeMap<String, Value>,
    exports: BTreeMap<String, ExportBinding>,
    connected_hook: Option<String>,
    disconnected_hook: Option<String>,
}

impl ComponentInstance {
    pub(crate) fn new(
        id: ComponentId,
        element: NodeId,
        attributes: ComponentAttributes,
        element_attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id,
            element,
            attributes,
            element_attributes,
            props: BTreeMap::new(),
            exports: BTreeMap::new(),
            connected_hook: None,
            disconnected_hook: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn attributes(&self) -> &ComponentAttributes {
        &self.attributes
    }

    /// Full element attribute snapshot taken at connect time.
    pub fn element_attributes(&self) -> &BTreeMap<String, String> {
        &self.element_attributes
    }

    pub fn props(&self) -> &BTreeMap<String, Value> {
        &self.props
    }

    /// Merged export table: method name to behavior binding.
    pub fn exports(&self) -> &BTreeMap<String, ExportBinding> {
        &self.exports
    }

    /// Behavior id bound to the connect hook, if any.
    pub fn connected_hook(&self) -> Option<&str> {
        self.connected_hook.as_deref()
    }

    /// Behavior id bound to the disconnect hook, if any.
    pub fn disconnected_hook(&self) -> Option<&str> {
        self.disconnected_hook.as_deref()
    }

    /// Merges one behavior's declared exports onto this instance.
    ///
    /// Later merges overwrite earlier bindings of the same name; every
    /// overwrite is returned so the runtime can log it.
    pub fn merge_behavior(&mut self, manifest: &BehaviorManifest) -> Vec<ExportCollision> {
        let mut collisions = Vec::new();
        let behavior_id = manifest.id.clone();

        for method in &manifest.methods {
            let binding = ExportBinding {
                behavior_id: behavior_id.clone(),
                method: method.clone(),
            };
            if let Some(previous) = self.exports.insert(method.clone(), binding) {
                collisions.push(ExportCollision {
                    name: method.clone(),
                    previous: previous.behavior_id,
                    replacement: behavior_id.clone(),
                });
            }
        }

        if manifest.hooks.connected {
            if let Some(previous) = self.connected_hook.replace(behavior_id.clone()) {
                collisions.push(ExportCollision {
                    name: crate::behavior::HOOK_CONNECTED.to_string(),
                    previous,
                    replacement: behavior_id.clone(),
                });
            }
        }
        if manifest.hooks.disconnected {
            if let Some(previous) = self.disconnected_hook.replace(behavior_id.clone()) {
                collisions.push(ExportCollision {
                    name: crate::behavior::HOOK_DISCONNECTED.to_string(),
                    previous,
                    replacement: behavior_id,
                });
            }
        }
        collisions
    }

    /// Splits the borrows a behavior scope needs.
    pub(crate) fn scope_parts(
        &mut self,
    ) -> (&BTreeMap<String, String>, &mut BTreeMap<String, Value>) {
        (&self.element_attributes, &mut self.props)
    }
}
