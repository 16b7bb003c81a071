//! Runtime-owned instance registry.
//!
//! # Responsibility
//! - Map monotonically increasing component ids to live instances.
//! - Index mounted elements so node references resolve to instances.
//!
//! # Invariants
//! - Ids are unique and never reused within one registry's lifetime.
//! - An element hosts at most one instance at a time.

use crate::component::{ComponentAttributes, ComponentId, ComponentInstance};
use crate::dom::NodeId;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Instance registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    ElementAlreadyMounted(NodeId),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ElementAlreadyMounted(node) => {
                write!(f, "element already hosts a component instance: node {node}")
            }
        }
    }
}

impl Error for RegistryError {}

/// Registry of live component instances, owned by the runtime.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: BTreeMap<ComponentId, ComponentInstance>,
    by_element: BTreeMap<NodeId, ComponentId>,
    next_id: ComponentId,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and stores an instance for `element`, assigning the next id.
    pub fn insert(
        &mut self,
        element: NodeId,
        attributes: ComponentAttributes,
        element_attributes: BTreeMap<String, String>,
    ) -> Result<ComponentId, RegistryError> {
        if self.by_element.contains_key(&element) {
            return Err(RegistryError::ElementAlreadyMounted(element));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.instances.insert(
            id,
            ComponentInstance::new(id, element, attributes, element_attributes),
        );
        self.by_element.insert(element, id);
        Ok(id)
    }

    /// Removes an instance on disconnect. Its id is never handed out again.
    pub fn remove(&mut self, id: ComponentId) -> Option<ComponentInstance> {
        let instance = self.instances.remove(&id)?;
        self.by_element.remove(&instance.element());
        Some(instance)
    }

    pub fn get(&self, id: ComponentId) -> Option<&ComponentInstance> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut ComponentInstance> {
        self.instances.get_mut(&id)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Instance hosted by `element`, if any.
    pub fn by_element(&self, element: NodeId) -> Option<ComponentId> {
        self.by_element.get(&element).copied()
    }

    /// Returns sorted live instance ids.
    pub fn ids(&self) -> Vec<ComponentId> {
        self.instances.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{InstanceRegistry, RegistryError};
    use crate::component::ComponentAttributes;
    use std::collections::BTreeMap;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut registry = InstanceRegistry::new();
        let first = registry
            .insert(10, ComponentAttributes::default(), BTreeMap::new())
            .expect("first insert");
        let second = registry
            .insert(11, ComponentAttributes::default(), BTreeMap::new())
            .expect("second insert");
        assert!(second > first);

        registry.remove(first).expect("remove first");
        let third = registry
            .insert(12, ComponentAttributes::default(), BTreeMap::new())
            .expect("third insert");
        assert!(third > second);
    }

    #[test]
    fn element_hosts_at_most_one_instance() {
        let mut registry = InstanceRegistry::new();
        registry
            .insert(10, ComponentAttributes::default(), BTreeMap::new())
            .expect("first insert");
        let err = registry
            .insert(10, ComponentAttributes::default(), BTreeMap::new())
            .expect_err("second mount on same element must fail");
        assert_eq!(err, RegistryError::ElementAlreadyMounted(10));
    }

    #[test]
    fn remove_clears_element_index() {
        let mut registry = InstanceRegistry::new();
        let id = registry
            .insert(10, ComponentAttributes::default(), BTreeMap::new())
            .expect("insert");
        assert_eq!(registry.by_element(10), Some(id));

        registry.remove(id).expect("remove");
        assert_eq!(registry.by_element(10), None);
        assert!(registry.is_empty());
        assert!(!registry.contains(id));
    }
}
