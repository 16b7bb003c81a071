//! Export merge semantics: last declaration wins, and the `debug`
//! attribute captures the merged table.

use std::sync::Arc;
use zfrag_core::{
    Behavior, BehaviorError, BehaviorManifest, BehaviorScope, ComponentRuntime, Document,
    StaticFragmentLoader, Target, Value,
};

/// Fixed-answer behavior used to tell merge winners apart.
struct TaggedBehavior {
    manifest: BehaviorManifest,
    answer: &'static str,
}

impl TaggedBehavior {
    fn new(id: &str, methods: &[&str], answer: &'static str) -> Self {
        Self {
            manifest: BehaviorManifest::new(id, "0.1.0", methods),
            answer,
        }
    }
}

impl Behavior for TaggedBehavior {
    fn manifest(&self) -> &BehaviorManifest {
        &self.manifest
    }

    fn invoke(
        &self,
        _method: &str,
        _scope: &mut BehaviorScope<'_>,
        _args: &[Value],
    ) -> Result<Value, BehaviorError> {
        Ok(Value::from(self.answer))
    }
}

fn runtime(host: &str, fragment: &str) -> ComponentRuntime {
    let mut loader = StaticFragmentLoader::new();
    loader.insert("/widget.html", fragment);
    let mut runtime = ComponentRuntime::new(Document::from_html(host), Box::new(loader));
    runtime
        .register_behavior(Arc::new(TaggedBehavior::new(
            "alpha",
            &["render", "refresh"],
            "alpha",
        )))
        .expect("alpha registration");
    runtime
        .register_behavior(Arc::new(TaggedBehavior::new(
            "beta",
            &["render"],
            "beta",
        )))
        .expect("beta registration");
    runtime
}

#[test]
fn later_directives_overwrite_colliding_exports() {
    let mut runtime = runtime(
        "<zjs-component remote-src=\"/widget.html\"></zjs-component>",
        "<p>w</p><script>use alpha;\nuse beta;</script>",
    );
    let mounted = runtime.mount_all();
    assert_eq!(mounted.len(), 1);
    let id = mounted[0];

    // `render` collides; beta was declared last and wins.
    let render = runtime.send(Target::Id(id), "render", &[]).expect("render");
    assert_eq!(render, Value::from("beta"));

    // `refresh` was never contested and still points at alpha.
    let refresh = runtime
        .send(Target::Id(id), "refresh", &[])
        .expect("refresh");
    assert_eq!(refresh, Value::from("alpha"));
}

#[test]
fn directive_order_decides_the_winner() {
    let mut runtime = runtime(
        "<zjs-component remote-src=\"/widget.html\"></zjs-component>",
        "<p>w</p><script>use beta;\nuse alpha;</script>",
    );
    let mounted = runtime.mount_all();
    let render = runtime
        .send(Target::Id(mounted[0]), "render", &[])
        .expect("render");
    assert_eq!(render, Value::from("alpha"));
}

#[test]
fn debug_attribute_captures_the_merged_export_table() {
    let mut runtime = runtime(
        "<zjs-component remote-src=\"/widget.html\" debug></zjs-component>",
        "<p>w</p><script>use alpha;\nuse beta;</script>",
    );
    let mounted = runtime.mount_all();
    let snapshot = runtime.debug_exports().expect("debug snapshot");
    assert_eq!(snapshot.component, mounted[0]);
    assert_eq!(
        snapshot.exports.keys().cloned().collect::<Vec<_>>(),
        vec!["refresh".to_string(), "render".to_string()]
    );
    assert_eq!(snapshot.exports["render"].behavior_id, "beta");
    assert_eq!(snapshot.exports["refresh"].behavior_id, "alpha");
}

#[test]
fn instances_without_debug_leave_no_snapshot() {
    let mut runtime = runtime(
        "<zjs-component remote-src=\"/widget.html\"></zjs-component>",
        "<p>w</p><script>use alpha;</script>",
    );
    runtime.mount_all();
    assert!(runtime.debug_exports().is_none());
}
