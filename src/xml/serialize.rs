//! XHTML serialization that HTML parsers read the same way XML parsers do.
//!
//! Only void HTML elements are written self-closed, `>` is escaped outside
//! `<style>` and left alone inside it, and `<`/`&` in style content use CSS
//! escapes.

use super::{Attribute, Document, Element, Node, NsMap, XML_NS};
use crate::model::XHTML_NS;
use crate::Result;
use std::fmt::Write as _;
use std::io::Write;

/// Elements that HTML parsers treat as having no end tag.
const SELF_CLOSABLE: &[&str] = &[
    "area", "base", "basefont", "br", "col", "frame", "hr", "img", "input", "isindex", "link",
    "meta", "param",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeMode {
    Default,
    Style,
}

#[derive(Debug, Clone, Copy)]
pub struct XhtmlSerializer {
    pub xml_declaration: bool,
    /// Treat elements without a namespace as XHTML.
    pub assume_xhtml: bool,
}

impl Default for XhtmlSerializer {
    fn default() -> Self {
        Self {
            xml_declaration: true,
            assume_xhtml: true,
        }
    }
}

impl XhtmlSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }

    pub fn with_assume_xhtml(mut self, enabled: bool) -> Self {
        self.assume_xhtml = enabled;
        self
    }

    pub fn serialize<W: Write>(&self, doc: &Document, out: &mut W) -> Result<()> {
        out.write_all(self.to_string(doc).as_bytes())?;
        Ok(())
    }

    pub fn to_bytes(&self, doc: &Document) -> Vec<u8> {
        self.to_string(doc).into_bytes()
    }

    pub fn to_string(&self, doc: &Document) -> String {
        let mut out = String::with_capacity(64 * 1024);
        if self.xml_declaration {
            let (version, standalone) = match &doc.declaration {
                Some(decl) => (decl.version.as_str(), decl.standalone),
                None => ("1.0", None),
            };
            let _ = write!(out, "<?xml version=\"{}\" encoding=\"utf-8\"", escape_attr(version));
            if let Some(standalone) = standalone {
                let _ = write!(out, " standalone=\"{}\"", if standalone { "yes" } else { "no" });
            }
            out.push_str("?>\n");
        }
        for node in &doc.prolog {
            match node {
                Node::Comment(text) => write_comment(&mut out, text),
                Node::ProcessingInstruction { target, data } => write_pi(&mut out, target, data),
                _ => continue,
            }
            out.push('\n');
        }
        self.write_node_element(&mut out, &doc.root, &NsMap::new(), EscapeMode::Default);
        out
    }

    /// Serialize a single element as if it were a document root.
    pub fn write_element(&self, element: &Element) -> String {
        let mut out = String::new();
        self.write_node_element(&mut out, element, &NsMap::new(), EscapeMode::Default);
        out
    }

    fn is_self_closable(&self, e: &Element) -> bool {
        SELF_CLOSABLE.contains(&e.name.local.as_str())
            && match e.name.namespace.as_deref() {
                Some(ns) => ns == XHTML_NS,
                None => self.assume_xhtml,
            }
    }

    fn write_node_element(&self, out: &mut String, e: &Element, parent_nsmap: &NsMap, mode: EscapeMode) {
        let name = element_qname(e);
        out.push('<');
        out.push_str(&name);

        for decl in namespace_declarations(&e.nsmap, parent_nsmap) {
            out.push(' ');
            out.push_str(&decl);
        }

        let mut attributes: Vec<(String, &str)> = e
            .attributes
            .iter()
            .map(|a| (attribute_qname(a, &e.nsmap), a.value.as_str()))
            .collect();
        attributes.sort();
        for (name, value) in attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
        }

        if !e.has_content() && self.is_self_closable(e) {
            out.push_str("/>");
            return;
        }
        out.push('>');

        let inner = if e.name.local == "style" {
            EscapeMode::Style
        } else {
            mode
        };
        for child in &e.children {
            match child {
                Node::Element(c) => self.write_node_element(out, c, &e.nsmap, inner),
                Node::Text(text) => out.push_str(&escape_text(text, inner)),
                Node::Comment(text) => write_comment(out, text),
                Node::ProcessingInstruction { target, data } => write_pi(out, target, data),
            }
        }

        out.push_str("</");
        out.push_str(&name);
        out.push('>');
    }
}

fn write_comment(out: &mut String, text: &str) {
    out.push_str("<!--");
    out.push_str(text);
    out.push_str("-->");
}

fn write_pi(out: &mut String, target: &str, data: &str) {
    out.push_str("<?");
    out.push_str(target);
    if !data.is_empty() {
        out.push(' ');
        out.push_str(data);
    }
    out.push_str("?>");
}

/// Qualified name of `e` from its in-scope bindings. Expects the namespace to
/// be bound in `e.nsmap`, as it always is for parsed or appended elements;
/// otherwise the source prefix is written with no declaration.
fn element_qname(e: &Element) -> String {
    let Some(ns) = e.name.namespace.as_deref() else {
        return e.name.local.clone();
    };
    let prefix = if ns == XML_NS {
        Some("xml")
    } else if e.nsmap.get(&None).map(String::as_str) == Some(ns) {
        None
    } else if e.prefix.is_some() && e.nsmap.get(&e.prefix).map(String::as_str) == Some(ns) {
        e.prefix.as_deref()
    } else {
        e.nsmap
            .iter()
            .find(|(_, uri)| uri.as_str() == ns)
            .and_then(|(p, _)| p.as_deref())
            .or(e.prefix.as_deref())
    };
    match prefix {
        Some(p) => format!("{}:{}", p, e.name.local),
        None => e.name.local.clone(),
    }
}

/// Attribute counterpart of [`element_qname`], with the same expectation that
/// the namespace is bound to a prefix in `nsmap`.
fn attribute_qname(a: &Attribute, nsmap: &NsMap) -> String {
    let Some(ns) = a.name.namespace.as_deref() else {
        return a.name.local.clone();
    };
    let prefix = if ns == XML_NS {
        Some("xml")
    } else if a.prefix.is_some() && nsmap.get(&a.prefix).map(String::as_str) == Some(ns) {
        a.prefix.as_deref()
    } else {
        nsmap
            .iter()
            .find(|(p, uri)| p.is_some() && uri.as_str() == ns)
            .and_then(|(p, _)| p.as_deref())
            .or(a.prefix.as_deref())
    };
    match prefix {
        Some(p) => format!("{}:{}", p, a.name.local),
        None => a.name.local.clone(),
    }
}

/// Declarations for bindings that differ from the parent's, default first.
fn namespace_declarations(nsmap: &NsMap, parent: &NsMap) -> Vec<String> {
    let mut decls = Vec::new();
    if nsmap.get(&None).is_none() && parent.get(&None).is_some() {
        decls.push("xmlns=\"\"".to_string());
    }
    for (prefix, uri) in nsmap {
        if parent.get(prefix) == Some(uri) {
            continue;
        }
        match prefix {
            None => decls.push(format!("xmlns=\"{}\"", escape_attr(uri))),
            Some(p) => decls.push(format!("xmlns:{}=\"{}\"", p, escape_attr(uri))),
        }
    }
    decls
}

#[inline]
fn is_restricted_char(c: char) -> bool {
    matches!(c, '\u{1}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{7f}'..='\u{9f}')
}

fn push_char_ref(out: &mut String, c: char) {
    let _ = write!(out, "&#x{:X};", c as u32);
}

/// Style content is raw text to an HTML parser, so characters that need
/// escaping there use six-digit CSS escapes rather than references.
fn push_css_escape(out: &mut String, c: char) {
    let _ = write!(out, "\\{:06X}", c as u32);
}

pub fn escape_text(s: &str, mode: EscapeMode) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match (mode, c) {
            (EscapeMode::Style, '<' | '&' | '\r') => push_css_escape(&mut out, c),
            (EscapeMode::Style, c) if is_restricted_char(c) => push_css_escape(&mut out, c),
            (EscapeMode::Style, '>') => {
                if out.ends_with("]]") {
                    out.push_str("&gt;");
                } else {
                    out.push('>');
                }
            }
            (EscapeMode::Default, '<') => out.push_str("&lt;"),
            (EscapeMode::Default, '>') => out.push_str("&gt;"),
            (EscapeMode::Default, '&') => out.push_str("&amp;"),
            (_, '\r') => out.push_str("&#13;"),
            (_, c) if is_restricted_char(c) => push_char_ref(&mut out, c),
            (_, c) => out.push(c),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c if is_restricted_char(c) => push_char_ref(&mut out, c),
            c => out.push(c),
        }
    }
    out
}
