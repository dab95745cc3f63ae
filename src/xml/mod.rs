//! Owned XML node tree.
//!
//! Every element carries its full in-scope namespace map, so a subtree can be
//! serialized or moved without consulting its ancestors. Text is stored as
//! child nodes; comments and processing instructions keep their position.

mod parser;
mod serialize;

pub use serialize::{EscapeMode, XhtmlSerializer};

use crate::model::XHTML_NS;
use std::collections::BTreeMap;

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// In-scope bindings, `None` being the default namespace.
pub type NsMap = BTreeMap<Option<String>, String>;

/// Expanded name of an element or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    pub namespace: Option<String>,
    pub local: String,
}

impl Name {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(String::from),
            local: local.to_string(),
        }
    }

    pub fn is(&self, namespace: Option<&str>, local: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local == local
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: Name,
    /// Prefix used in the source, if any.
    pub prefix: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: Name,
    pub prefix: Option<String>,
    pub nsmap: NsMap,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub standalone: Option<bool>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            standalone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub declaration: Option<XmlDeclaration>,
    /// Comments and processing instructions before the root element.
    pub prolog: Vec<Node>,
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: None,
            prolog: Vec::new(),
            root,
        }
    }

    pub fn parse(bytes: &[u8]) -> crate::Result<Self> {
        parser::parse(bytes)
    }

    pub fn parse_str(s: &str) -> crate::Result<Self> {
        parser::parse(s.as_bytes())
    }
}

impl Element {
    /// Element with no namespace bindings of its own. Bindings of the parent
    /// are inherited when it is appended.
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            name: Name::new(namespace, local),
            prefix: None,
            nsmap: NsMap::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Unprefixed element in the XHTML namespace.
    pub fn xhtml(local: &str) -> Self {
        let mut e = Self::new(Some(XHTML_NS), local);
        e.nsmap.insert(None, XHTML_NS.to_string());
        e
    }

    pub fn with_attribute(mut self, local: &str, value: &str) -> Self {
        self.set_attribute(local, value);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    pub fn is(&self, namespace: Option<&str>, local: &str) -> bool {
        self.name.is(namespace, local)
    }

    /// Value of an attribute without namespace.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(None, local))
            .map(|a| a.value.as_str())
    }

    pub fn set_attribute(&mut self, local: &str, value: &str) {
        match self.attributes.iter_mut().find(|a| a.name.is(None, local)) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attributes.push(Attribute {
                name: Name::new(None, local),
                prefix: None,
                value: value.to_string(),
            }),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Follow element-child indices down from this element.
    pub fn element_at_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            current = current.child_elements_mut().nth(index)?;
        }
        Some(current)
    }

    /// Concatenated text of the direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_content(&self) -> bool {
        !self.children.is_empty()
    }

    /// Append a node. Appended elements inherit the bindings in scope here.
    pub fn append(&mut self, node: Node) {
        let node = match node {
            Node::Element(mut e) => {
                e.inherit_scope(&self.nsmap);
                Node::Element(e)
            }
            other => other,
        };
        self.children.push(node);
    }

    pub fn append_element(&mut self, element: Element) {
        self.append(Node::Element(element));
    }

    fn inherit_scope(&mut self, parent: &NsMap) {
        for (prefix, uri) in parent {
            // A namespace-less element must not pick up a default namespace.
            if prefix.is_none() && self.name.namespace.is_none() {
                continue;
            }
            self.nsmap.entry(prefix.clone()).or_insert_with(|| uri.clone());
        }
        let scope = self.nsmap.clone();
        for child in self.child_elements_mut() {
            child.inherit_scope(&scope);
        }
    }
}
