//! Displayable tree produced by the renderer.
//!
//! A `Document` is a small element tree rooted at `<article>`. It is what the
//! editor stores as processed content; presentation layers either walk it or
//! serialize it with [`Document::to_html`].

use std::fmt::Write;

use serde::Serialize;
use smallvec::SmallVec;

/// Elements that never have children or a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input"];

/// Attributes written bare when their value is empty.
const BOOLEAN_ATTRS: &[&str] = &["checked", "disabled"];

pub type Attrs = SmallVec<[(String, String); 2]>;
pub type Children = SmallVec<[Node; 4]>;

/// A node of the displayable tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Node {
    Element(Box<Element>),
    Text(String),
}

/// An element with attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Attrs,
    pub children: Children,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: SmallVec::new(),
            children: SmallVec::new(),
        }
    }

    pub fn with_attrs(tag: impl Into<String>, attrs: Vec<(String, String)>) -> Self {
        Self {
            tag: tag.into(),
            attrs: SmallVec::from_vec(attrs),
            children: SmallVec::new(),
        }
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// First descendant element (depth-first, self excluded) with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        for child in &self.children {
            if let Node::Element(elem) = child {
                if elem.tag == tag {
                    return Some(elem);
                }
                if let Some(found) = elem.find(tag) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        for (key, value) in &self.attrs {
            if value.is_empty() && BOOLEAN_ATTRS.contains(&key.as_str()) {
                let _ = write!(out, " {key}");
            } else {
                let _ = write!(out, " {key}=\"{}\"", escape(value, true));
            }
        }
        out.push('>');

        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }

        for child in &self.children {
            match child {
                Node::Element(elem) => elem.write_html(out),
                Node::Text(text) => out.push_str(&escape(text, false)),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn collect_text(children: &[Node], out: &mut String) {
    for child in children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(elem) => collect_text(&elem.children, out),
        }
    }
}

/// Root of a rendered tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// Top-level nodes under the root element.
    pub fn children(&self) -> &[Node] {
        &self.root.children
    }

    /// First element with the given tag anywhere in the tree.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        if self.root.tag == tag {
            return Some(&self.root);
        }
        self.root.find(tag)
    }

    /// Serialize the tree to an HTML fragment.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.root.write_html(&mut out);
        out
    }
}

/// Escape text for HTML content (`attr = false`) or attribute values.
pub(crate) fn escape(s: &str, attr: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut h1 = Element::new("h1");
        h1.children.push(Node::Text("Title".into()));

        let mut a = Element::with_attrs("a", vec![("href".into(), "https://x.dev?a=1&b=\"2\"".into())]);
        a.children.push(Node::Text("link <here>".into()));
        let mut p = Element::new("p");
        p.children.push(Node::Element(Box::new(a)));
        p.children.push(Node::Element(Box::new(Element::new("br"))));

        let mut root = Element::new("article");
        root.children.push(Node::Element(Box::new(h1)));
        root.children.push(Node::Element(Box::new(p)));
        Document::new(root)
    }

    #[test]
    fn test_find_and_text() {
        let doc = sample();
        assert_eq!(doc.find("h1").map(Element::text), Some("Title".to_string()));
        assert_eq!(doc.find("a").and_then(|a| a.attr("href")), Some("https://x.dev?a=1&b=\"2\""));
        assert!(doc.find("table").is_none());
        assert_eq!(doc.find("article").map(|e| e.children.len()), Some(2));
    }

    #[test]
    fn test_to_html_escapes() {
        let html = sample().to_html();
        assert_eq!(
            html,
            "<article><h1>Title</h1><p><a href=\"https://x.dev?a=1&amp;b=&quot;2&quot;\">link &lt;here&gt;</a><br></p></article>"
        );
    }

    #[test]
    fn test_empty_attr_value_is_boolean() {
        let input = Element::with_attrs(
            "input",
            vec![("type".into(), "checkbox".into()), ("disabled".into(), String::new())],
        );
        let doc = Document::new(input);
        assert_eq!(doc.to_html(), "<input type=\"checkbox\" disabled>");
    }

    #[test]
    fn test_empty_attr_value_is_kept() {
        let a = Element::with_attrs("a", vec![("href".into(), String::new())]);
        assert_eq!(Document::new(a).to_html(), "<a href=\"\"></a>");
    }

    #[test]
    fn test_serialize_json() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["root"]["tag"], "article");
        assert_eq!(json["root"]["children"][0]["type"], "element");
        assert_eq!(json["root"]["children"][0]["value"]["tag"], "h1");
    }
}
