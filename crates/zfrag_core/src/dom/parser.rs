//! Permissive HTML fragment parser.
//!
//! # Responsibility
//! - Turn fetched fragment text into a detached subtree under a container.
//! - Treat `<script>`/`<style>` as raw-text elements so script extraction
//!   sees their content verbatim.
//!
//! # Invariants
//! - Parsing never fails; malformed input degrades the way a forgiving
//!   browser parser would (unmatched close tags ignored, open elements
//!   implicitly closed at end of input).
//! - Tag and attribute names are folded to lowercase.

use crate::dom::{Document, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements that never take children or a close tag.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Elements whose content is taken verbatim until the matching close tag.
pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Parses `input` and appends the resulting nodes as children of `container`.
pub(crate) fn parse_into(doc: &mut Document, container: NodeId, input: &str) {
    Parser::new(input).run(doc, container);
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn run(&mut self, doc: &mut Document, container: NodeId) {
        // Stack of open elements; new nodes attach to the top.
        let mut open: Vec<NodeId> = vec![container];

        while self.pos < self.chars.len() {
            let parent = *open.last().unwrap_or(&container);
            if self.starts_with("<!--") {
                self.pos += 4;
                let text = self.consume_until("-->");
                let comment = doc.create_comment(&text);
                doc.append_child(parent, comment);
            } else if self.starts_with("<!") {
                // Doctype or other declaration: skip to the closing bracket.
                self.consume_until(">");
            } else if self.starts_with("</") {
                self.pos += 2;
                let name = self.read_tag_name();
                self.consume_until(">");
                if name.is_empty() {
                    continue;
                }
                // Pop to the matching open element; never past the container.
                if let Some(depth) = open
                    .iter()
                    .skip(1)
                    .rposition(|&id| doc.tag(id) == Some(name.as_str()))
                {
                    open.truncate(depth + 1);
                }
            } else if self.starts_with("<") && self.peek_is_tag_start() {
                self.parse_open_tag(doc, parent, &mut open);
            } else {
                let mut text = String::new();
                if self.peek() == Some('<') {
                    // Lone `<` that opens nothing; take it literally.
                    text.push('<');
                    self.pos += 1;
                }
                text.push_str(&self.consume_text());
                if !text.is_empty() {
                    let decoded = decode_entities(&text);
                    let node = doc.create_text_node(&decoded);
                    doc.append_child(parent, node);
                }
            }
        }
    }

    fn parse_open_tag(&mut self, doc: &mut Document, parent: NodeId, open: &mut Vec<NodeId>) {
        self.pos += 1;
        let tag = self.read_tag_name();
        let element = doc.create_element(&tag);

        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                Some('/') => {
                    self.pos += 1;
                    if self.peek() == Some('>') {
                        self.pos += 1;
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    let (name, value) = self.read_attribute();
                    if !name.is_empty() {
                        doc.set_attribute(element, &name, &value);
                    }
                }
            }
        }

        doc.append_child(parent, element);

        if self_closing || is_void_element(&tag) {
            return;
        }
        if is_raw_text_element(&tag) {
            let close = format!("</{tag}");
            let raw = self.consume_until_ci(&close);
            if !raw.is_empty() {
                let text = doc.create_text_node(&raw);
                doc.append_child(element, text);
            }
            self.consume_until(">");
            return;
        }
        open.push(element);
    }

    fn read_attribute(&mut self) -> (String, String) {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '=' || c == '>' || c == '/' {
                break;
            }
            name.push(c);
            self.pos += 1;
        }
        self.skip_whitespace();
        if self.peek() != Some('=') {
            // Bare flag attribute, e.g. `debug`.
            return (name.to_ascii_lowercase(), String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
                value
            }
            _ => {
                let mut value = String::new();
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' {
                        break;
                    }
                    if c == '/' && self.peek_at(1) == Some('>') {
                        break;
                    }
                    value.push(c);
                    self.pos += 1;
                }
                value
            }
        };
        (name.to_ascii_lowercase(), decode_entities(&value))
    }

    fn read_tag_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        name.to_ascii_lowercase()
    }

    fn consume_text(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '<' {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    /// Consumes up to and including `marker`; returns the text before it.
    fn consume_until(&mut self, marker: &str) -> String {
        let mut out = String::new();
        while self.pos < self.chars.len() {
            if self.starts_with(marker) {
                self.pos += marker.chars().count();
                return out;
            }
            out.push(self.chars[self.pos]);
            self.pos += 1;
        }
        out
    }

    /// Case-insensitive variant of `consume_until`.
    fn consume_until_ci(&mut self, marker: &str) -> String {
        let marker_lower: Vec<char> = marker.chars().map(|c| c.to_ascii_lowercase()).collect();
        let mut out = String::new();
        while self.pos < self.chars.len() {
            if self.matches_ci_at(self.pos, &marker_lower) {
                self.pos += marker_lower.len();
                return out;
            }
            out.push(self.chars[self.pos]);
            self.pos += 1;
        }
        out
    }

    fn matches_ci_at(&self, at: usize, marker_lower: &[char]) -> bool {
        if at + marker_lower.len() > self.chars.len() {
            return false;
        }
        marker_lower
            .iter()
            .enumerate()
            .all(|(offset, &m)| self.chars[at + offset].to_ascii_lowercase() == m)
    }

    fn starts_with(&self, marker: &str) -> bool {
        let marker: Vec<char> = marker.chars().collect();
        if self.pos + marker.len() > self.chars.len() {
            return false;
        }
        marker
            .iter()
            .enumerate()
            .all(|(offset, &m)| self.chars[self.pos + offset] == m)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn peek_is_tag_start(&self) -> bool {
        matches!(self.peek_at(1), Some(c) if c.is_ascii_alphabetic())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }
}

/// Decodes the named entities `amp lt gt quot apos` plus numeric character
/// references. Unknown references pass through literally.
fn decode_entities(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    while pos < chars.len() {
        if chars[pos] != '&' {
            out.push(chars[pos]);
            pos += 1;
            continue;
        }
        let end = chars[pos + 1..]
            .iter()
            .take(32)
            .position(|&c| c == ';')
            .map(|offset| pos + 1 + offset);
        let Some(end) = end else {
            out.push('&');
            pos += 1;
            continue;
        };
        let name: String = chars[pos + 1..end].iter().collect();
        match decode_entity_name(&name) {
            Some(decoded) => {
                out.push(decoded);
                pos = end + 1;
            }
            None => {
                out.push('&');
                pos += 1;
            }
        }
    }
    out
}

fn decode_entity_name(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let rest = name.strip_prefix('#')?;
            let code = if let Some(hex) = rest.strip_prefix('x').or_else(|| rest.strip_prefix('X'))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                rest.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
