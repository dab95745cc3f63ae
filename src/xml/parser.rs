use super::{Attribute, Document, Element, Name, Node, NsMap, XmlDeclaration, XML_NS};
use crate::{Error, Result};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub(super) fn parse(bytes: &[u8]) -> Result<Document> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut declaration = None;
    let mut prolog = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::Xml(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Decl(ref d) => {
                let version = utf8(&d.version()?)?.to_string();
                let standalone = match d.standalone() {
                    Some(value) => Some(utf8(&value?)?.trim() == "yes"),
                    None => None,
                };
                declaration = Some(XmlDeclaration { version, standalone });
            }
            Event::Start(ref e) => {
                if root.is_some() {
                    return Err(Error::Xml("content after the root element".to_string()));
                }
                let scope = stack.last().map(|p| &p.nsmap);
                let element = start_element(e, scope)?;
                stack.push(element);
            }
            Event::Empty(ref e) => {
                if root.is_some() {
                    return Err(Error::Xml("content after the root element".to_string()));
                }
                let scope = stack.last().map(|p| &p.nsmap);
                let element = start_element(e, scope)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unexpected end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            Event::Text(ref t) => {
                let raw = utf8(t)?;
                match stack.last_mut() {
                    Some(parent) => {
                        let normalized = normalize_newlines(raw);
                        let text = unescape(&normalized).map_err(|e| Error::Xml(e.to_string()))?;
                        push_text(parent, &text);
                    }
                    None if raw.trim().is_empty() => {}
                    None => return Err(Error::Xml("text outside the root element".to_string())),
                }
            }
            Event::CData(ref c) => {
                let text = normalize_newlines(utf8(c)?);
                match stack.last_mut() {
                    Some(parent) => push_text(parent, &text),
                    None => return Err(Error::Xml("CDATA outside the root element".to_string())),
                }
            }
            Event::Comment(ref c) => {
                let node = Node::Comment(normalize_newlines(utf8(c)?));
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None if root.is_none() => prolog.push(node),
                    None => {}
                }
            }
            Event::PI(ref pi) => {
                let target = utf8(pi.target())?.to_string();
                let data = normalize_newlines(utf8(pi.content())?.trim_start());
                let node = Node::ProcessingInstruction { target, data };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None if root.is_none() => prolog.push(node),
                    None => {}
                }
            }
            Event::DocType(_) => {}
            Event::Eof => break,
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::Xml("unexpected end of document".to_string()));
    }
    let root = root.ok_or_else(|| Error::Xml("document has no root element".to_string()))?;
    Ok(Document {
        declaration,
        prolog,
        root,
    })
}

fn start_element(e: &BytesStart<'_>, parent_scope: Option<&NsMap>) -> Result<Element> {
    let mut nsmap = parent_scope.cloned().unwrap_or_default();
    let mut raw_attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?.to_string();
        let raw = utf8(&attr.value)?;
        let value = unescape(&normalize_attribute(raw))
            .map_err(|err| Error::Xml(err.to_string()))?
            .into_owned();

        if key == "xmlns" {
            if value.is_empty() {
                nsmap.remove(&None);
            } else {
                nsmap.insert(None, value);
            }
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            nsmap.insert(Some(prefix.to_string()), value);
        } else {
            raw_attributes.push((key, value));
        }
    }

    let qname = utf8(e.name().as_ref())?.to_string();
    let (prefix, local) = split_qname(&qname);
    let namespace = match prefix {
        Some("xml") => Some(XML_NS.to_string()),
        Some(p) => Some(
            nsmap
                .get(&Some(p.to_string()))
                .cloned()
                .ok_or_else(|| Error::Xml(format!("unbound namespace prefix `{}`", p)))?,
        ),
        None => nsmap.get(&None).cloned(),
    };

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let (attr_prefix, attr_local) = split_qname(&key);
        let attr_ns = match attr_prefix {
            None => None,
            Some("xml") => Some(XML_NS.to_string()),
            Some(p) => Some(
                nsmap
                    .get(&Some(p.to_string()))
                    .cloned()
                    .ok_or_else(|| Error::Xml(format!("unbound namespace prefix `{}`", p)))?,
            ),
        };
        attributes.push(Attribute {
            name: Name {
                namespace: attr_ns,
                local: attr_local.to_string(),
            },
            prefix: attr_prefix.map(String::from),
            value,
        });
    }

    Ok(Element {
        name: Name {
            namespace,
            local: local.to_string(),
        },
        prefix: prefix.map(String::from),
        nsmap,
        attributes,
        children: Vec::new(),
    })
}

fn push_text(parent: &mut Element, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_string()));
    }
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Xml(e.to_string()))
}

fn normalize_newlines(s: &str) -> String {
    if s.contains('\r') {
        s.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        s.to_string()
    }
}

/// Literal whitespace in attribute values becomes a space. Character
/// references are unaffected since they are expanded afterwards.
fn normalize_attribute(s: &str) -> String {
    normalize_newlines(s).replace(['\t', '\n'], " ")
}
