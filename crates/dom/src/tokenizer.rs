//! Simplified, recovering HTML tokenizer.
//!
//! Supported tag-name and attribute-name characters (ASCII only):
//! `[A-Za-z0-9:_-]`.
//!
//! This is not a full HTML5 state machine. Server component markup is
//! machine-generated and well-formed in practice, so the tokenizer favors a
//! small, allocation-light scan over spec-complete error recovery.
//!
//! Known limitations (intentional):
//! - No spec parse-error recovery; malformed constructs degrade to text or
//!   are skipped, never panic.
//! - Rawtext close-tag scanning for `<script>`/`<style>` accepts only ASCII
//!   whitespace before `>`.
//! - Entity decoding covers the named entities component markup actually
//!   uses plus numeric references.

use memchr::memchr;
use std::borrow::Cow;

#[derive(Debug, PartialEq)]
pub(crate) enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    Text(String),
    Comment(String),
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b':' || b == b'_' || b == b'-'
}

pub(crate) fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub(crate) fn is_rawtext_element(name: &str) -> bool {
    name == "script" || name == "style"
}

pub(crate) fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let Some(rel) = memchr(b'<', &bytes[i..]) else {
            push_text(&mut out, &input[i..]);
            break;
        };
        if rel > 0 {
            push_text(&mut out, &input[i..i + rel]);
            i += rel;
        }

        // i is at '<'
        if bytes[i + 1..].is_empty() {
            push_text(&mut out, "<");
            break;
        }
        let next = bytes[i + 1];

        if input[i..].starts_with("<!--") {
            let body_start = i + 4;
            match input[body_start..].find("-->") {
                Some(end) => {
                    out.push(Token::Comment(input[body_start..body_start + end].to_string()));
                    i = body_start + end + 3;
                }
                None => {
                    out.push(Token::Comment(input[body_start..].to_string()));
                    i = bytes.len();
                }
            }
            continue;
        }

        if next == b'!' {
            // doctype or bogus markup declaration; both end at the next '>'
            let end = memchr(b'>', &bytes[i..]).map(|r| i + r).unwrap_or(bytes.len());
            let body = &input[i + 2..end];
            if body.len() >= 7 && body[..7].eq_ignore_ascii_case("doctype") {
                out.push(Token::Doctype(body[7..].trim().to_string()));
            }
            i = end.saturating_add(1);
            continue;
        }

        if next == b'/' {
            let mut j = i + 2;
            let name_start = j;
            while j < bytes.len() && is_name_byte(bytes[j]) {
                j += 1;
            }
            let name = input[name_start..j].to_ascii_lowercase();
            let end = memchr(b'>', &bytes[j..]).map(|r| j + r).unwrap_or(bytes.len());
            if !name.is_empty() {
                out.push(Token::EndTag(name));
            }
            i = end.saturating_add(1);
            continue;
        }

        if next.is_ascii_alphabetic() {
            match scan_start_tag(input, i) {
                Some((name, attributes, self_closing, after)) => {
                    let void = is_void_element(&name);
                    let rawtext = !self_closing && is_rawtext_element(&name);
                    out.push(Token::StartTag {
                        name: name.clone(),
                        attributes,
                        self_closing: self_closing || void,
                    });
                    i = after;
                    if rawtext {
                        i = scan_rawtext(input, i, &name, &mut out);
                    }
                }
                None => {
                    // unterminated tag at EOF; drop the tail
                    break;
                }
            }
            continue;
        }

        // stray '<'
        push_text(&mut out, "<");
        i += 1;
    }

    out
}

fn push_text(out: &mut Vec<Token>, raw: &str) {
    if raw.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(Token::Text(existing)) => existing.push_str(&decode_entities(raw)),
        _ => out.push(Token::Text(decode_entities(raw).into_owned())),
    }
}

/// Scans a start tag beginning at `start` (which points at '<').
/// Returns (name, attributes, self_closing, index-after-'>').
fn scan_start_tag(
    input: &str,
    start: usize,
) -> Option<(String, Vec<(String, Option<String>)>, bool, usize)> {
    let bytes = input.as_bytes();
    let mut j = start + 1;
    let name_start = j;
    while j < bytes.len() && is_name_byte(bytes[j]) {
        j += 1;
    }
    let name = input[name_start..j].to_ascii_lowercase();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        match bytes[j] {
            b'>' => return Some((name, attributes, self_closing, j + 1)),
            b'/' => {
                self_closing = true;
                j += 1;
            }
            _ => {
                let attr_start = j;
                while j < bytes.len() && is_name_byte(bytes[j]) {
                    j += 1;
                }
                if j == attr_start {
                    // unexpected byte; skip it to keep scanning
                    j += 1;
                    continue;
                }
                let attr_name = input[attr_start..j].to_ascii_lowercase();
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if j < bytes.len() && bytes[j] == b'=' {
                    j += 1;
                    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                        j += 1;
                    }
                    if j >= bytes.len() {
                        return None;
                    }
                    let value = if bytes[j] == b'"' || bytes[j] == b'\'' {
                        let quote = bytes[j];
                        j += 1;
                        let value_start = j;
                        let rel = memchr(quote, &bytes[j..])?;
                        j += rel;
                        let raw = &input[value_start..j];
                        j += 1; // past the closing quote
                        decode_entities(raw).into_owned()
                    } else {
                        let value_start = j;
                        while j < bytes.len()
                            && !bytes[j].is_ascii_whitespace()
                            && bytes[j] != b'>'
                            && bytes[j] != b'/'
                        {
                            j += 1;
                        }
                        decode_entities(&input[value_start..j]).into_owned()
                    };
                    attributes.push((attr_name, Some(value)));
                } else {
                    attributes.push((attr_name, None));
                }
            }
        }
    }
}

/// Emits raw text up to (and the end tag of) `</name ... >`, returning the
/// index after the close tag. Unterminated rawtext swallows the rest.
fn scan_rawtext(input: &str, from: usize, name: &str, out: &mut Vec<Token>) -> usize {
    let bytes = input.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        let Some(rel) = memchr(b'<', &bytes[i..]) else {
            break;
        };
        let at = i + rel;
        if bytes.get(at + 1) == Some(&b'/')
            && input[at + 2..]
                .as_bytes()
                .get(..name.len())
                .is_some_and(|s| s.eq_ignore_ascii_case(name.as_bytes()))
        {
            let mut k = at + 2 + name.len();
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < bytes.len() && bytes[k] == b'>' {
                if at > from {
                    out.push(Token::Text(input[from..at].to_string()));
                }
                out.push(Token::EndTag(name.to_string()));
                return k + 1;
            }
        }
        i = at + 1;
    }
    if from < input.len() {
        out.push(Token::Text(input[from..].to_string()));
    }
    out.push(Token::EndTag(name.to_string()));
    input.len()
}

/// Decodes the entity subset component markup uses; unknown references pass
/// through verbatim.
pub(crate) fn decode_entities(raw: &str) -> Cow<'_, str> {
    if memchr(b'&', raw.as_bytes()).is_none() {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let Some(rel) = memchr(b'&', &bytes[i..]) else {
            out.push_str(&raw[i..]);
            break;
        };
        out.push_str(&raw[i..i + rel]);
        i += rel;
        let Some(end_rel) = memchr(b';', &bytes[i..(i + 32).min(bytes.len())]) else {
            out.push('&');
            i += 1;
            continue;
        };
        let entity = &raw[i + 1..i + end_rel];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => decode_numeric(entity),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                i += end_rel + 1;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    Cow::Owned(out)
}

fn decode_numeric(entity: &str) -> Option<char> {
    let body = entity.strip_prefix('#')?;
    let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        body.parse::<u32>().ok()?
    };
    char::from_u32(code)
}
