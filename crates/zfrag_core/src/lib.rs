//! Headless runtime for remote HTML fragment components.
//!
//! A host document contains `zjs-component` elements. Mounting one fetches
//! the fragment named by its `remote-src` attribute, strips the fragment's
//! `<script>` directives, binds the named behaviors onto the instance, and
//! appends the remaining children to the element. A static `send` helper
//! dispatches exported methods across instances.

pub mod behavior;
pub mod component;
pub mod dom;
pub mod loader;
pub mod logging;
pub mod registry;
pub mod runtime;
pub mod script;

pub use behavior::{
    Behavior, BehaviorError, BehaviorManifest, BehaviorRegistry, BehaviorRegistryError,
    BehaviorScope, EchoBehavior, LifecycleHooks, ManifestValidationError, Value, HOOK_CONNECTED,
    HOOK_DISCONNECTED,
};
pub use component::{
    ComponentAttributes, ComponentId, ComponentInstance, ExportBinding, ExportCollision,
    ATTR_DEBUG, ATTR_DISPLAY, ATTR_REMOTE_SRC,
};
pub use dom::{Document, Node, NodeId, NodeKind, Selector, SelectorError};
#[cfg(feature = "http")]
pub use loader::HttpFragmentLoader;
pub use loader::{FileFragmentLoader, FragmentLoader, LoadError, LoadResult, StaticFragmentLoader};
pub use logging::{default_log_level, init_logging, logging_status};
pub use registry::{InstanceRegistry, RegistryError};
pub use runtime::{
    ComponentRuntime, DebugSnapshot, DispatchError, MountError, Target, COMPONENT_TAG,
};
pub use script::{extract_scripts, parse_directives, ScriptError, ScriptResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
