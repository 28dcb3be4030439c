//! Owned, mutable SVG tree.
//!
//! `roxmltree` is read-only, so documents are copied into this model once, edited in place by the
//! post-processor and serialized back. Comments and processing instructions are dropped; attribute
//! order is preserved.

use crate::num::{fmt_number, parse_length};
use crate::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

const SVG_NS: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: IndexMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Attribute parsed as a plain or `px` length.
    pub fn number_attr(&self, key: &str) -> Option<f64> {
        self.attr(key).and_then(parse_length)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        self.attrs.shift_remove(key)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|s| !s.is_empty())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .unwrap_or_default()
            .split_whitespace()
            .any(|t| t == class)
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Pre-order iterator over this element and every element below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Concatenated character data of the subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.push_text(out),
            }
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_xml_into(out, v);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(out),
                Node::Text(t) => escape_xml_into(out, t),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        let before = self.stack.len();
        self.stack.extend(el.child_elements());
        self.stack[before..].reverse();
        Some(el)
    }
}

/// `viewBox="min-x min-y width height"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn parse(raw: &str) -> Option<Self> {
        let nums: Vec<f64> = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<_>>()?;
        let [min_x, min_y, width, height] = nums[..] else {
            return None;
        };
        Some(Self {
            min_x,
            min_y,
            width,
            height,
        })
    }
}

impl fmt::Display for ViewBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            fmt_number(self.min_x),
            fmt_number(self.min_y),
            fmt_number(self.width),
            fmt_number(self.height)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn parse(svg: &str) -> Result<Self> {
        let opts = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(svg, opts)?;
        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(Error::MissingSvgRoot {
                found: root.tag_name().name().to_string(),
            });
        }

        let built = build_element(root, None);
        let mut attrs = IndexMap::new();
        for ns in root.namespaces() {
            let key = match ns.name() {
                Some("xml") => continue,
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            attrs.insert(key, ns.uri().to_string());
        }
        for (k, v) in built.attrs {
            attrs.entry(k).or_insert(v);
        }
        let el = Element { attrs, ..built };
        Ok(Self { root: el })
    }

    pub fn to_svg_string(&self) -> String {
        let mut out = String::new();
        self.root.write_to(&mut out);
        out
    }

    pub fn view_box(&self) -> Option<ViewBox> {
        self.root.attr("viewBox").and_then(ViewBox::parse)
    }

    pub fn set_view_box(&mut self, vb: ViewBox) {
        self.root.set_attr("viewBox", vb.to_string());
    }
}

fn qualified_name(node: roxmltree::Node<'_, '_>, ns: Option<&str>, local: &str) -> String {
    match ns {
        Some(uri) if uri != SVG_NS => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
            _ => local.to_string(),
        },
        _ => local.to_string(),
    }
}

fn build_element(n: roxmltree::Node<'_, '_>, parent_ns: Option<&str>) -> Element {
    let tag = n.tag_name();
    let mut el = Element::new(qualified_name(n, tag.namespace(), tag.name()));

    // Default-namespace switches below the root (e.g. XHTML inside `foreignObject`).
    if parent_ns.is_some() && tag.namespace() != parent_ns {
        if let Some(uri) = tag.namespace() {
            el.set_attr("xmlns", uri);
        }
    }

    for a in n.attributes() {
        let key = match a.namespace() {
            Some(uri) => match n.lookup_prefix(uri) {
                Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", a.name()),
                _ => a.name().to_string(),
            },
            None => a.name().to_string(),
        };
        el.attrs.insert(key, a.value().to_string());
    }
    for child in n.children() {
        if child.is_element() {
            el.children
                .push(Node::Element(build_element(child, tag.namespace())));
        } else if child.is_text() {
            if let Some(t) = child.text() {
                el.children.push(Node::Text(t.to_string()));
            }
        }
    }
    el
}

fn escape_xml_into(out: &mut String, text: &str) {
    let mut start = 0usize;
    for (i, b) in text.bytes().enumerate() {
        let esc = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'"' => "&quot;",
            _ => continue,
        };
        out.push_str(&text[start..i]);
        out.push_str(esc);
        start = i + 1;
    }
    out.push_str(&text[start..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_serialize_keeps_structure() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><!-- c --><g class="node a" id="n1"><rect width="5" height="5"/><text>a &amp; b</text></g></svg>"#;
        let doc = Document::parse(svg).unwrap();
        let out = doc.to_svg_string();
        assert_eq!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><g class="node a" id="n1"><rect width="5" height="5"/><text>a &amp; b</text></g></svg>"#
        );
        let g = doc.root.child_elements().next().unwrap();
        assert!(g.has_class("node"));
        assert!(!g.has_class("nod"));
        assert_eq!(g.text_content(), "a & b");
    }

    #[test]
    fn xlink_prefix_survives_round_trip() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a"/></svg>"##;
        let doc = Document::parse(svg).unwrap();
        let out = doc.to_svg_string();
        assert!(out.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#));
        assert!(out.contains(r##"<use xlink:href="#a"/>"##));
        Document::parse(&out).unwrap();
    }

    #[test]
    fn non_svg_root_is_rejected() {
        let err = Document::parse("<html/>").unwrap_err();
        assert!(matches!(err, Error::MissingSvgRoot { .. }));
        assert!(matches!(Document::parse("<svg"), Err(Error::Xml(_))));
    }

    #[test]
    fn descendants_are_preorder() {
        let root = Element::new("svg")
            .with_child(Element::new("a").with_child(Element::new("b")))
            .with_child(Element::new("c"));
        let names: Vec<_> = root.descendants().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["svg", "a", "b", "c"]);
    }

    #[test]
    fn view_box_parse_and_format() {
        let vb = ViewBox::parse("-4,-4 108  58").unwrap();
        assert_eq!(vb.min_x, -4.0);
        assert_eq!(vb.to_string(), "-4 -4 108 58");
        assert_eq!(ViewBox::parse("0 0 10"), None);
        assert_eq!(ViewBox::parse("0 0 a 10"), None);
    }
}
