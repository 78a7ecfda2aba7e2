//! Compound simple-selector matching.
//!
//! Supported syntax: `*`, `tag`, `#id`, `.class`, `[attr]`, `[attr=value]`
//! (value optionally single- or double-quoted), conjunctions of those
//! (`button.primary[name]`), and comma-separated lists.
//!
//! Known limitations (intentional): no combinators, no pseudo-classes.
//! Component roots, patch markers, and trigger filters address single
//! elements, so compound selectors cover the whole protocol surface.

use crate::document::{Document, NodeId};

#[derive(Clone, Debug, PartialEq)]
enum Simple {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    AttrPresent(String),
    AttrEquals(String, String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Compound {
    parts: Vec<Simple>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectorList {
    compounds: Vec<Compound>,
}

impl SelectorList {
    /// Parses a selector list; `None` when empty or syntactically unsupported.
    pub fn parse(input: &str) -> Option<SelectorList> {
        let mut compounds = Vec::new();
        for part in split_top_level_commas(input) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            compounds.push(parse_compound(part)?);
        }
        if compounds.is_empty() {
            None
        } else {
            Some(SelectorList { compounds })
        }
    }
}

/// Splits on commas that are not inside an attribute bracket.
fn split_top_level_commas(input: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&input[start..]);
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(input: &str) -> Option<Compound> {
    let mut parts = Vec::new();
    let bytes: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            '*' => {
                parts.push(Simple::Universal);
                i += 1;
            }
            '#' => {
                let (ident, next) = read_ident(&bytes, i + 1)?;
                parts.push(Simple::Id(ident));
                i = next;
            }
            '.' => {
                let (ident, next) = read_ident(&bytes, i + 1)?;
                parts.push(Simple::Class(ident));
                i = next;
            }
            '[' => {
                let close = bytes[i..].iter().position(|&c| c == ']')? + i;
                let body: String = bytes[i + 1..close].iter().collect();
                let body = body.trim();
                match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim();
                        let value = value
                            .strip_prefix('"')
                            .and_then(|v| v.strip_suffix('"'))
                            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                            .unwrap_or(value);
                        parts.push(Simple::AttrEquals(
                            name.trim().to_ascii_lowercase(),
                            value.to_string(),
                        ));
                    }
                    None => {
                        if body.is_empty() {
                            return None;
                        }
                        parts.push(Simple::AttrPresent(body.to_ascii_lowercase()));
                    }
                }
                i = close + 1;
            }
            c if is_ident_char(c) => {
                let (ident, next) = read_ident(&bytes, i)?;
                parts.push(Simple::Type(ident.to_ascii_lowercase()));
                i = next;
            }
            _ => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(Compound { parts })
    }
}

fn read_ident(chars: &[char], from: usize) -> Option<(String, usize)> {
    let mut i = from;
    let mut out = String::new();
    while i < chars.len() && is_ident_char(chars[i]) {
        out.push(chars[i]);
        i += 1;
    }
    if out.is_empty() { None } else { Some((out, i)) }
}

impl Document {
    /// Whether element `id` matches any compound of the list.
    pub fn matches(&self, id: NodeId, selector: &SelectorList) -> bool {
        if !self.is_element(id) {
            return false;
        }
        selector
            .compounds
            .iter()
            .any(|compound| self.matches_compound(id, compound))
    }

    fn matches_compound(&self, id: NodeId, compound: &Compound) -> bool {
        compound.parts.iter().all(|part| match part {
            Simple::Universal => true,
            Simple::Type(name) => self
                .tag_name(id)
                .is_some_and(|t| t.eq_ignore_ascii_case(name)),
            Simple::Id(want) => self.attr(id, "id") == Some(want.as_str()),
            Simple::Class(want) => self.attr_has_token(id, "class", want),
            Simple::AttrPresent(name) => self.has_attr(id, name),
            Simple::AttrEquals(name, value) => self.attr(id, name) == Some(value.as_str()),
        })
    }

    /// First matching descendant of `scope`, in document order.
    pub fn query_selector(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        self.descendants(scope).find(|&n| self.matches(n, selector))
    }

    pub fn query_selector_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&n| self.matches(n, selector))
            .collect()
    }

    /// Nearest ancestor-or-self matching the selector.
    pub fn closest(&self, id: NodeId, selector: &SelectorList) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| self.matches(n, selector))
    }
}
