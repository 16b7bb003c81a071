//! CLI smoke entry point.
//!
//! # Responsibility
//! - Mount a host HTML file with a filesystem fragment loader and print the
//!   resulting document, to verify `zfrag_core` wiring end to end.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use zfrag_core::{ComponentRuntime, Document, EchoBehavior, FileFragmentLoader};

fn main() -> ExitCode {
    let Some(host_path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: zfrag_cli <host.html>");
        eprintln!("zfrag_core version={}", zfrag_core::core_version());
        return ExitCode::FAILURE;
    };

    let host_text = match std::fs::read_to_string(&host_path) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("failed to read {}: {err}", host_path.display());
            return ExitCode::FAILURE;
        }
    };

    // Fragments resolve next to the host file.
    let base = host_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let loader = FileFragmentLoader::new(base);

    let mut runtime = ComponentRuntime::new(Document::from_html(&host_text), Box::new(loader));
    if let Err(err) = runtime.register_behavior(Arc::new(EchoBehavior::new())) {
        eprintln!("failed to register baseline behavior: {err}");
        return ExitCode::FAILURE;
    }

    let mounted = runtime.mount_all();
    eprintln!("mounted {} component(s)", mounted.len());
    let root = runtime.document().root();
    println!("{}", runtime.document().to_html(root));
    ExitCode::SUCCESS
}
