//! CSS selector subset for dispatch-target resolution.
//!
//! Supports compound selectors built from a tag name (or `*`), `#id`,
//! `.class` and `[attr]`/`[attr=value]` parts, combined with descendant
//! (whitespace) combinators. Anything outside the subset is a typed error.

use crate::dom::{Document, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static SELECTOR_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:",
        r"(?P<tag>\*|[a-zA-Z][a-zA-Z0-9_-]*)",
        r"|#(?P<id>[a-zA-Z0-9_-]+)",
        r"|\.(?P<class>[a-zA-Z0-9_-]+)",
        r#"|\[\s*(?P<attr>[a-zA-Z0-9_-]+)\s*(?:=\s*(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\]\s]+)))?\s*\]"#,
        r")",
    ))
    .expect("valid selector token regex")
});

/// Selector parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    Unsupported(String),
}

impl Display for SelectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "selector must not be empty"),
            Self::Unsupported(value) => write!(f, "unsupported selector syntax: {value}"),
        }
    }
}

impl Error for SelectorError {}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

/// Parsed selector: compounds joined by descendant combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    /// Parses a selector string.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut compounds = Vec::new();
        for part in trimmed.split_whitespace() {
            compounds.push(parse_compound(part)?);
        }
        Ok(Self { compounds })
    }

    /// Whether `node` matches this selector within `doc`.
    ///
    /// The last compound must match the node itself; earlier compounds must
    /// match ancestors in order, nearest-last.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !compound_matches(doc, node, last) {
            return false;
        }

        let mut current = doc.parent(node);
        for compound in rest.iter().rev() {
            let mut matched = false;
            while let Some(ancestor) = current {
                current = doc.parent(ancestor);
                if compound_matches(doc, ancestor, compound) {
                    matched = true;
                    break;
                }
            }
            if !matched {
                return false;
            }
        }
        true
    }
}

fn parse_compound(input: &str) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();
    let mut rest = input;
    let mut first = true;
    while !rest.is_empty() {
        let Some(captures) = SELECTOR_TOKEN_RE.captures(rest) else {
            return Err(SelectorError::Unsupported(input.to_string()));
        };
        let token = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
        if let Some(tag) = captures.name("tag") {
            // A bare tag is only valid as the leading token of a compound.
            if !first {
                return Err(SelectorError::Unsupported(input.to_string()));
            }
            if tag.as_str() != "*" {
                compound.tag = Some(tag.as_str().to_ascii_lowercase());
            }
        } else if let Some(id) = captures.name("id") {
            compound.id = Some(id.as_str().to_string());
        } else if let Some(class) = captures.name("class") {
            compound.classes.push(class.as_str().to_string());
        } else if let Some(attr) = captures.name("attr") {
            let value = captures
                .name("dq")
                .or_else(|| captures.name("sq"))
                .or_else(|| captures.name("bare"))
                .map(|m| m.as_str().to_string());
            compound
                .attributes
                .push((attr.as_str().to_ascii_lowercase(), value));
        }
        rest = &rest[token.len()..];
        first = false;
    }
    Ok(compound)
}

fn compound_matches(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(tag) = doc.tag(node) else {
        return false;
    };
    if tag.starts_with('#') {
        return false;
    }
    if let Some(wanted) = &compound.tag {
        if tag != wanted {
            return false;
        }
    }
    if let Some(wanted) = &compound.id {
        if doc.attribute(node, "id") != Some(wanted.as_str()) {
            return false;
        }
    }
    for class in &compound.classes {
        let has_class = doc
            .attribute(node, "class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false);
        if !has_class {
            return false;
        }
    }
    for (name, value) in &compound.attributes {
        match (doc.attribute(node, name), value) {
            (Some(_), None) => {}
            (Some(actual), Some(wanted)) if actual == wanted => {}
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::{Selector, SelectorError};
    use crate::dom::Document;

    fn sample() -> Document {
        Document::from_html(
            "<div id=\"outer\" class=\"wrap main\">\
             <zjs-component remote-src=\"/a.html\" class=\"card\"><p id=\"inner\">x</p></zjs-component>\
             </div>",
        )
    }

    #[test]
    fn matches_by_tag_id_class_and_attribute() {
        let doc = sample();
        for selector in [
            "zjs-component",
            ".card",
            "#outer",
            "[remote-src=/a.html]",
            "[remote-src=\"/a.html\"]",
            "zjs-component.card[remote-src]",
            "*",
        ] {
            let parsed = Selector::parse(selector).expect("selector parses");
            assert!(
                doc.query_selector(&parsed).is_some(),
                "selector should match: {selector}"
            );
        }
    }

    #[test]
    fn descendant_combinator_requires_ancestry() {
        let doc = sample();
        let hit = Selector::parse("div.wrap zjs-component #inner").expect("selector parses");
        let found = doc.query_selector(&hit).expect("descendant match");
        assert_eq!(doc.attribute(found, "id"), Some("inner"));

        let miss = Selector::parse("zjs-component div").expect("selector parses");
        assert!(doc.query_selector(&miss).is_none());
    }

    #[test]
    fn first_match_is_document_order() {
        let doc = Document::from_html("<p id=\"a\"></p><p id=\"b\"></p>");
        let parsed = Selector::parse("p").expect("selector parses");
        let found = doc.query_selector(&parsed).expect("match");
        assert_eq!(doc.attribute(found, "id"), Some("a"));
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert_eq!(Selector::parse("  "), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("p > span"),
            Err(SelectorError::Unsupported(_))
        ));
        assert!(matches!(
            Selector::parse("p::before"),
            Err(SelectorError::Unsupported(_))
        ));
    }

    #[test]
    fn tag_must_lead_a_compound() {
        assert!(matches!(
            Selector::parse(".card p"),
            Ok(_)
        ));
        assert!(matches!(
            Selector::parse(".cardp[x]p"),
            Err(SelectorError::Unsupported(_))
        ));
    }
}
