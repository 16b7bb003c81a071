//! Component lifecycle controller and static dispatch.
//!
//! # Responsibility
//! - Drive the connect sequence: fetch, parse, extract scripts, resolve
//!   behaviors, merge exports, append children, run the connect hook.
//! - Resolve dispatch targets (id, selector, node) to live instances and
//!   invoke declared methods.
//!
//! # Invariants
//! - An instance is registered at construction, before connect can fail;
//!   a failed fragment load leaves the instance registered, mirroring a
//!   constructed-but-never-connected element.
//! - Script and hook failures degrade to log lines; only load failures are
//!   returned to the caller as typed errors.
//! - Dispatch never reaches a method the export table does not declare.

use crate::behavior::{
    Behavior, BehaviorError, BehaviorRegistry, BehaviorRegistryError, BehaviorScope, Value,
    HOOK_CONNECTED, HOOK_DISCONNECTED,
};
use crate::component::{ComponentAttributes, ComponentId, ComponentInstance, ExportBinding};
use crate::dom::{Document, NodeId, Selector, SelectorError};
use crate::loader::{FragmentLoader, LoadError};
use crate::registry::{InstanceRegistry, RegistryError};
use crate::script;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Element tag the runtime recognizes as a component host.
pub const COMPONENT_TAG: &str = "zjs-component";

/// Mount (construct + connect) errors.
#[derive(Debug)]
pub enum MountError {
    NotAComponentElement(NodeId),
    AlreadyMounted(NodeId),
    Load(LoadError),
}

impl Display for MountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAComponentElement(node) => {
                write!(f, "node {node} is not a {COMPONENT_TAG} element")
            }
            Self::AlreadyMounted(node) => {
                write!(f, "node {node} already hosts a component instance")
            }
            Self::Load(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LoadError> for MountError {
    fn from(value: LoadError) -> Self {
        Self::Load(value)
    }
}

/// Dispatch and disconnect errors.
#[derive(Debug)]
pub enum DispatchError {
    UnknownComponent(ComponentId),
    Selector(SelectorError),
    NoMatch(String),
    NotInComponent(NodeId),
    NotMounted(NodeId),
    UnknownMethod {
        component: ComponentId,
        method: String,
    },
    UnknownBehavior {
        component: ComponentId,
        behavior_id: String,
    },
    Behavior(BehaviorError),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownComponent(id) => write!(f, "no live component with id {id}"),
            Self::Selector(err) => write!(f, "{err}"),
            Self::NoMatch(selector) => write!(f, "selector matched nothing: {selector}"),
            Self::NotInComponent(node) => {
                write!(f, "node {node} has no {COMPONENT_TAG} ancestor")
            }
            Self::NotMounted(node) => {
                write!(f, "element at node {node} is not a mounted component")
            }
            Self::UnknownMethod { component, method } => {
                write!(f, "component {component} exports no method: {method}")
            }
            Self::UnknownBehavior {
                component,
                behavior_id,
            } => write!(
                f,
                "component {component} is bound to unregistered behavior: {behavior_id}"
            ),
            Self::Behavior(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Selector(err) => Some(err),
            Self::Behavior(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SelectorError> for DispatchError {
    fn from(value: SelectorError) -> Self {
        Self::Selector(value)
    }
}

impl From<BehaviorError> for DispatchError {
    fn from(value: BehaviorError) -> Self {
        Self::Behavior(value)
    }
}

/// Dispatch target forms accepted by [`ComponentRuntime::send`].
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Registry id.
    Id(ComponentId),
    /// CSS selector resolved against the document.
    Selector(&'a str),
    /// Any node; resolves via the nearest component ancestor-or-self.
    Node(NodeId),
}

/// Snapshot of one instance's merged exports, kept when the element carries
/// the `debug` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugSnapshot {
    pub component: ComponentId,
    pub exports: BTreeMap<String, ExportBinding>,
}

enum Hook {
    Connected,
    Disconnected,
}

impl Hook {
    fn name(&self) -> &'static str {
        match self {
            Self::Connected => HOOK_CONNECTED,
            Self::Disconnected => HOOK_DISCONNECTED,
        }
    }
}

/// Owns the document, the registries and the loader; drives every component
/// lifecycle.
pub struct ComponentRuntime {
    document: Document,
    instances: InstanceRegistry,
    behaviors: BehaviorRegistry,
    loader: Box<dyn FragmentLoader>,
    debug: Option<DebugSnapshot>,
}

impl ComponentRuntime {
    pub fn new(document: Document, loader: Box<dyn FragmentLoader>) -> Self {
        Self {
            document,
            instances: InstanceRegistry::new(),
            behaviors: BehaviorRegistry::new(),
            loader,
            debug: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Registers a behavior for fragment directives to reference.
    pub fn register_behavior(
        &mut self,
        behavior: Arc<dyn Behavior>,
    ) -> Result<(), BehaviorRegistryError> {
        let id = behavior.manifest().id.clone();
        self.behaviors.register(behavior)?;
        info!("event=behavior_registered module=runtime behavior={id}");
        Ok(())
    }

    pub fn instance(&self, id: ComponentId) -> Option<&ComponentInstance> {
        self.instances.get(id)
    }

    /// Sorted ids of live instances.
    pub fn instance_ids(&self) -> Vec<ComponentId> {
        self.instances.ids()
    }

    /// Last debug export snapshot (`debug` attribute).
    pub fn debug_exports(&self) -> Option<&DebugSnapshot> {
        self.debug.as_ref()
    }

    /// Constructs and connects a component on a `zjs-component` element.
    ///
    /// Without a `remote-src` attribute the connect part is a no-op; the
    /// instance is still registered.
    pub fn mount(&mut self, element: NodeId) -> Result<ComponentId, MountError> {
        match self.document.tag(element) {
            Some(tag) if tag == COMPONENT_TAG => {}
            _ => return Err(MountError::NotAComponentElement(element)),
        }

        let attributes = ComponentAttributes::from_element(&self.document, element);
        let element_attributes = self
            .document
            .attributes(element)
            .cloned()
            .unwrap_or_default();
        let id = self
            .instances
            .insert(element, attributes.clone(), element_attributes)
            .map_err(|err| match err {
                RegistryError::ElementAlreadyMounted(node) => MountError::AlreadyMounted(node),
            })?;
        info!("event=instance_created module=runtime id={id} element={element}");

        let Some(remote_src) = attributes.remote_src else {
            info!("event=connect_skipped module=runtime id={id} reason=no_remote_src");
            return Ok(id);
        };

        if let Some(display) = &attributes.display {
            let style = merged_style(self.document.attribute(element, "style"), display);
            self.document.set_attribute(element, "style", &style);
        }

        let html = match self.loader.load(&remote_src) {
            Ok(text) => text,
            Err(err) => {
                error!(
                    "event=fragment_load_failed module=runtime id={id} url={remote_src} error={err}"
                );
                return Err(MountError::Load(err));
            }
        };

        let fragment = self.document.parse_fragment(&html);
        let script_text = script::extract_scripts(&mut self.document, fragment);

        let directives = match script::parse_directives(&script_text) {
            Ok(directives) => directives,
            Err(err) => {
                // Degrades to "no exports"; the connect sequence continues.
                error!(
                    "event=script_parse_failed module=runtime id={id} url={remote_src} error={err}"
                );
                Vec::new()
            }
        };

        let mut resolved: Vec<Arc<dyn Behavior>> = Vec::new();
        for behavior_id in &directives {
            match self.behaviors.get(behavior_id) {
                Some(behavior) => resolved.push(behavior),
                None => {
                    // Exports merged before the failure are kept.
                    error!(
                        "event=behavior_unresolved module=runtime id={id} behavior={behavior_id}"
                    );
                    break;
                }
            }
        }

        if let Some(instance) = self.instances.get_mut(id) {
            for behavior in &resolved {
                for collision in instance.merge_behavior(behavior.manifest()) {
                    warn!(
                        "event=export_collision module=runtime id={id} name={} previous={} replacement={}",
                        collision.name, collision.previous, collision.replacement
                    );
                }
            }
            if attributes.debug {
                let snapshot = DebugSnapshot {
                    component: id,
                    exports: instance.exports().clone(),
                };
                info!(
                    "event=debug_exports module=runtime id={id} exports={}",
                    snapshot
                        .exports
                        .keys()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(",")
                );
                self.debug = Some(snapshot);
            }
        }

        let children: Vec<NodeId> = self
            .document
            .children(fragment)
            .into_iter()
            .filter(|&child| self.document.is_element(child))
            .collect();
        for &child in &children {
            self.document.append_child(element, child);
        }

        self.run_hook(id, Hook::Connected);
        info!(
            "event=component_mounted module=runtime id={id} url={remote_src} children={}",
            children.len()
        );
        Ok(id)
    }

    /// Mounts every unmounted `zjs-component` element in document order,
    /// repeating until fetched fragments stop introducing new ones.
    ///
    /// Individual mount failures are logged and skipped. A fragment cycle
    /// (a fragment that transitively includes its own host) does not
    /// terminate; fragment sets are expected to be acyclic.
    pub fn mount_all(&mut self) -> Vec<ComponentId> {
        let mut mounted = Vec::new();
        loop {
            let root = self.document.root();
            let candidates: Vec<NodeId> = self
                .document
                .descendants(root)
                .into_iter()
                .filter(|&node| self.document.tag(node) == Some(COMPONENT_TAG))
                .filter(|&node| self.instances.by_element(node).is_none())
                .collect();
            if candidates.is_empty() {
                return mounted;
            }
            for element in candidates {
                match self.mount(element) {
                    Ok(id) => mounted.push(id),
                    Err(err) => {
                        error!(
                            "event=mount_failed module=runtime element={element} error={err}"
                        );
                    }
                }
            }
        }
    }

    /// Disconnects an instance: runs its `disconnected` hook, then removes it
    /// from the registry. The hosting element stays in the document.
    pub fn unmount(&mut self, id: ComponentId) -> Result<(), DispatchError> {
        if !self.instances.contains(id) {
            return Err(DispatchError::UnknownComponent(id));
        }
        self.run_hook(id, Hook::Disconnected);
        self.instances.remove(id);
        info!("event=component_unmounted module=runtime id={id}");
        Ok(())
    }

    /// Static dispatch helper: resolves `target` to a live instance and
    /// invokes one of its exported methods.
    pub fn send(
        &mut self,
        target: Target<'_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, DispatchError> {
        let id = self.resolve_target(target)?;
        let binding = {
            let instance = self
                .instances
                .get(id)
                .ok_or(DispatchError::UnknownComponent(id))?;
            instance
                .exports()
                .get(method)
                .cloned()
                .ok_or_else(|| DispatchError::UnknownMethod {
                    component: id,
                    method: method.to_string(),
                })?
        };
        let behavior =
            self.behaviors
                .get(&binding.behavior_id)
                .ok_or_else(|| DispatchError::UnknownBehavior {
                    component: id,
                    behavior_id: binding.behavior_id.clone(),
                })?;
        let instance = self
            .instances
            .get_mut(id)
            .ok_or(DispatchError::UnknownComponent(id))?;
        let element = instance.element();
        let (attributes, props) = instance.scope_parts();
        let mut scope = BehaviorScope::new(id, &self.document, element, attributes, props);
        behavior
            .invoke(&binding.method, &mut scope, args)
            .map_err(DispatchError::Behavior)
    }

    fn resolve_target(&self, target: Target<'_>) -> Result<ComponentId, DispatchError> {
        match target {
            Target::Id(id) => {
                if self.instances.contains(id) {
                    Ok(id)
                } else {
                    Err(DispatchError::UnknownComponent(id))
                }
            }
            Target::Selector(text) => {
                let selector = Selector::parse(text)?;
                let node = self
                    .document
                    .query_selector(&selector)
                    .ok_or_else(|| DispatchError::NoMatch(text.to_string()))?;
                self.resolve_node(node)
            }
            Target::Node(node) => self.resolve_node(node),
        }
    }

    fn resolve_node(&self, node: NodeId) -> Result<ComponentId, DispatchError> {
        let element = self
            .document
            .closest(node, COMPONENT_TAG)
            .ok_or(DispatchError::NotInComponent(node))?;
        self.instances
            .by_element(element)
            .ok_or(DispatchError::NotMounted(element))
    }

    fn run_hook(&mut self, id: ComponentId, hook: Hook) {
        let behavior_id = {
            let Some(instance) = self.instances.get(id) else {
                return;
            };
            let bound = match hook {
                Hook::Connected => instance.connected_hook(),
                Hook::Disconnected => instance.disconnected_hook(),
            };
            match bound {
                Some(behavior_id) => behavior_id.to_string(),
                None => return,
            }
        };
        let Some(behavior) = self.behaviors.get(&behavior_id) else {
            error!("event=hook_behavior_missing module=runtime id={id} behavior={behavior_id}");
            return;
        };
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        let element = instance.element();
        let (attributes, props) = instance.scope_parts();
        let mut scope = BehaviorScope::new(id, &self.document, element, attributes, props);
        let result = match hook {
            Hook::Connected => behavior.connected(&mut scope),
            Hook::Disconnected => behavior.disconnected(&mut scope),
        };
        if let Err(err) = result {
            // Hook failures never abort the lifecycle transition.
            error!(
                "event=hook_failed module=runtime id={id} behavior={behavior_id} hook={} error={err}",
                hook.name()
            );
        }
    }
}

/// Replaces any `display` declaration in `style` with the given value.
fn merged_style(style: Option<&str>, display: &str) -> String {
    let mut declarations: Vec<String> = style
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|declaration| {
            !declaration.is_empty()
                && declaration
                    .split(':')
                    .next()
                    .map(|name| !name.trim().eq_ignore_ascii_case("display"))
                    .unwrap_or(true)
        })
        .map(str::to_string)
        .collect();
    declarations.push(format!("display: {display}"));
    declarations.join("; ")
}
