//! Minimal CSS selector support
//!
//! Supports type selectors, `*`, `.class`, `#id`, `[attr]`, `[attr=value]`,
//! the descendant and child combinators and comma-separated selector lists.
//! That is enough to describe the host page shapes; anything else is rejected.

use crate::error::{Error, Result};

use super::tree::{Document, NodeId};

#[derive(Debug, Clone, PartialEq)]
enum AttrTest {
    Exists(String),
    Equals(String, String),
}

/// One compound selector such as `a.index-item[href]`
#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds in source order; `links[i]` joins `parts[i]` to `parts[i + 1]`
#[derive(Debug, Clone, PartialEq)]
struct Complex {
    parts: Vec<Compound>,
    links: Vec<Combinator>,
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    /// Parse a selector list
    pub fn parse(source: &str) -> Result<Self> {
        let mut alternatives = Vec::new();
        for part in source.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(Error::selector(source));
            }
            alternatives.push(parse_complex(part).ok_or_else(|| Error::selector(source))?);
        }
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    /// Original selector text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` matches any alternative
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if !doc.is_element(node) {
            return false;
        }
        self.alternatives
            .iter()
            .any(|complex| match_from(doc, node, complex, complex.parts.len() - 1))
    }
}

fn match_from(doc: &Document, node: NodeId, complex: &Complex, index: usize) -> bool {
    if !compound_matches(doc, node, &complex.parts[index]) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match complex.links[index - 1] {
        Combinator::Child => doc
            .parent_element(node)
            .is_some_and(|parent| match_from(doc, parent, complex, index - 1)),
        Combinator::Descendant => {
            let mut current = doc.parent_element(node);
            while let Some(ancestor) = current {
                if match_from(doc, ancestor, complex, index - 1) {
                    return true;
                }
                current = doc.parent_element(ancestor);
            }
            false
        }
    }
}

fn compound_matches(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    if let Some(tag) = &compound.tag {
        if !doc.tag(node).is_some_and(|t| t.eq_ignore_ascii_case(tag)) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if doc.attribute(node, "id") != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|class| doc.has_class(node, class)) {
        return false;
    }
    compound.attrs.iter().all(|test| match test {
        AttrTest::Exists(name) => doc.has_attribute(node, name),
        AttrTest::Equals(name, value) => doc.attribute(node, name) == Some(value.as_str()),
    })
}

fn parse_complex(source: &str) -> Option<Complex> {
    let mut parts = Vec::new();
    let mut links = Vec::new();
    let mut pending = None;

    // `>` may be written with or without surrounding whitespace
    let spaced = source.replace('>', " > ");
    for token in spaced.split_whitespace() {
        if token == ">" {
            if parts.is_empty() || pending.is_some() {
                return None;
            }
            pending = Some(Combinator::Child);
            continue;
        }
        if !parts.is_empty() {
            links.push(pending.take().unwrap_or(Combinator::Descendant));
        }
        parts.push(parse_compound(token)?);
    }

    if parts.is_empty() || pending.is_some() {
        return None;
    }
    Some(Complex { parts, links })
}

fn parse_compound(token: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let chars: Vec<char> = token.chars().collect();
    let mut i = 0;

    let ident = |chars: &[char], mut i: usize| -> (String, usize) {
        let start = i;
        while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '-' || chars[i] == '_') {
            i += 1;
        }
        (chars[start..i].iter().collect(), i)
    };

    if i < chars.len() && chars[i] == '*' {
        i += 1;
    } else if i < chars.len() && chars[i].is_alphabetic() {
        let (tag, next) = ident(&chars, i);
        compound.tag = Some(tag.to_ascii_lowercase());
        i = next;
    }

    while i < chars.len() {
        match chars[i] {
            '.' => {
                let (class, next) = ident(&chars, i + 1);
                if class.is_empty() {
                    return None;
                }
                compound.classes.push(class);
                i = next;
            }
            '#' => {
                let (id, next) = ident(&chars, i + 1);
                if id.is_empty() {
                    return None;
                }
                compound.id = Some(id);
                i = next;
            }
            '[' => {
                let close = chars[i..].iter().position(|&c| c == ']')? + i;
                let inner: String = chars[i + 1..close].iter().collect();
                compound.attrs.push(parse_attr(&inner)?);
                i = close + 1;
            }
            _ => return None,
        }
    }

    Some(compound)
}

fn parse_attr(inner: &str) -> Option<AttrTest> {
    match inner.split_once('=') {
        None => {
            let name = inner.trim();
            (!name.is_empty()).then(|| AttrTest::Exists(name.to_string()))
        }
        Some((name, value)) => {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            Some(AttrTest::Equals(name.to_string(), value.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("div[").is_err());
        assert!(Selector::parse("a, ").is_err());
        assert!(Selector::parse("> a").is_err());
        assert!(Selector::parse("a:hover").is_err());
    }

    #[test]
    fn test_parse_accepts_shapes() {
        for source in [
            ".grid-item",
            "a.index-item[href]",
            ".detail-header h1",
            ".detail-subtitle > a[href]",
            "[data-pa-injected='1']",
            "img, picture img",
            "*",
        ] {
            assert!(Selector::parse(source).is_ok(), "{source} should parse");
        }
    }

    #[test]
    fn test_matching() {
        let mut doc = Document::new("https://shop.example.com/");
        let body = doc.body();
        let header = doc.create_element("div");
        doc.add_class(header, "detail-header");
        let title = doc.create_element("h1");
        doc.append_child(body, header);
        doc.append_child(header, title);

        let descendant = Selector::parse(".detail-header h1").unwrap();
        let child = Selector::parse("body > h1").unwrap();
        let direct = Selector::parse("div.detail-header > h1").unwrap();

        assert!(descendant.matches(&doc, title));
        assert!(!descendant.matches(&doc, header));
        assert!(!child.matches(&doc, title));
        assert!(direct.matches(&doc, title));
    }
}
