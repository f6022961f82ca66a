//! Minimal HTML querying over an html5ever DOM.
//!
//! Built pages only need two lookups: "an element with this tag and class"
//! and "a descendant with this tag and attribute value".

use html5ever::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::io;

/// A parsed HTML document.
pub struct HtmlDocument {
    dom: RcDom,
}

/// An element found in a document.
#[derive(Clone)]
pub struct Element {
    handle: Handle,
}

impl HtmlDocument {
    /// Parse a full document. html5ever recovers from malformed markup, so
    /// only I/O on the in-memory reader can fail.
    pub fn parse(html: &str) -> io::Result<Self> {
        let opts = ParseOpts {
            tree_builder: TreeBuilderOpts {
                scripting_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let dom = parse_document(RcDom::default(), opts)
            .from_utf8()
            .read_from(&mut io::Cursor::new(html.as_bytes()))?;
        Ok(Self { dom })
    }

    fn root(&self) -> Element {
        Element {
            handle: self.dom.document.clone(),
        }
    }

    /// First element named `tag` whose class list contains `class` (any
    /// class when `None`), in document order.
    pub fn find(&self, tag: &str, class: Option<&str>) -> Option<Element> {
        self.root().find_descendant(&|el: &Element| {
            el.tag_name().as_deref() == Some(tag) && class.is_none_or(|c| el.has_class(c))
        })
    }
}

impl Element {
    /// Lowercase tag name, `None` for non-element nodes.
    pub fn tag_name(&self) -> Option<String> {
        match &self.handle.data {
            NodeData::Element { name, .. } => Some(name.local.to_string()),
            _ => None,
        }
    }

    pub fn attr(&self, attr_name: &str) -> Option<String> {
        match &self.handle.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.to_string()),
            _ => None,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }

    /// First descendant named `tag` whose `attr_name` equals `value`.
    pub fn find_with_attr(&self, tag: &str, attr_name: &str, value: &str) -> Option<Element> {
        self.find_descendant(&|el: &Element| {
            el.tag_name().as_deref() == Some(tag) && el.attr(attr_name).as_deref() == Some(value)
        })
    }

    /// Depth-first, pre-order search excluding `self`.
    fn find_descendant(&self, pred: &dyn Fn(&Element) -> bool) -> Option<Element> {
        let mut stack: Vec<Handle> = self.handle.children.borrow().iter().rev().cloned().collect();
        while let Some(handle) = stack.pop() {
            let element = Element {
                handle: handle.clone(),
            };
            if pred(&element) {
                return Some(element);
            }
            for child in handle.children.borrow().iter().rev() {
                stack.push(child.clone());
            }
        }
        None
    }
}
