//! Fragment script extraction and behavior directive parsing.
//!
//! # Responsibility
//! - Pull `<script>` nodes out of a fetched fragment, document order, so
//!   they are never re-inserted into the live tree.
//! - Parse the concatenated script text as a behavior directive list.
//!
//! # Invariants
//! - Extraction always succeeds; it is directive *parsing* that can fail.
//! - A malformed directive fails the whole script, which callers degrade to
//!   "no exports" instead of failing the connect sequence.

use crate::dom::{Document, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^use\s+([a-z0-9]+(?:[._-][a-z0-9]+)*)\s*;?$").expect("valid directive regex")
});

pub type ScriptResult<T> = Result<T, ScriptError>;

/// Directive parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    MalformedDirective { line: usize, text: String },
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedDirective { line, text } => {
                write!(f, "malformed behavior directive on line {line}: {text}")
            }
        }
    }
}

impl Error for ScriptError {}

/// Removes every `<script>` element under `fragment` and returns their text
/// content concatenated in document order, newline-joined.
pub fn extract_scripts(doc: &mut Document, fragment: NodeId) -> String {
    let scripts: Vec<NodeId> = doc
        .descendants(fragment)
        .into_iter()
        .filter(|&node| doc.tag(node) == Some("script"))
        .collect();

    let mut text = String::new();
    for script in scripts {
        text.push_str(&doc.text_content(script));
        text.push('\n');
        doc.detach(script);
    }
    text
}

/// Parses script text into an ordered behavior id list.
///
/// One directive per line: `use <behavior-id>;` (the `;` is optional).
/// Blank lines and `#`/`//` comment lines are skipped. Duplicate ids are
/// kept; merge order is what the collision policy acts on.
pub fn parse_directives(text: &str) -> ScriptResult<Vec<String>> {
    let mut directives = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let Some(captures) = DIRECTIVE_RE.captures(line) else {
            return Err(ScriptError::MalformedDirective {
                line: index + 1,
                text: line.to_string(),
            });
        };
        if let Some(id) = captures.get(1) {
            directives.push(id.as_str().to_string());
        }
    }
    Ok(directives)
}
