//! Injection of the viewer script and taxonomy data into a report document.

use crate::model::XHTML_NS;
use crate::xml::{Document, Element, Node};
use crate::{Error, Result};
use std::fmt::Write;

pub const VIEWER_DATA_TYPE: &str = "application/x.ixbrl-viewer+json";
pub const BEGIN_MARKER: &str = "BEGIN IXBRL VIEWER EXTENSIONS";
pub const END_MARKER: &str = "END IXBRL VIEWER EXTENSIONS";

/// Escape JSON so it can sit inside a `<script>` element. The result parses
/// to the same value and contains nothing the serializer would turn into a
/// reference: no `<`, `>`, `&`, carriage return or C1 control character.
///
/// Script content is raw text to an HTML parser, so references would reach
/// `JSON.parse` undecoded.
pub fn escape_json_for_script_tag(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + json.len() / 16);
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            // Valid JSON only carries a raw CR as whitespace.
            '\r' => out.push('\n'),
            '\u{7f}'..='\u{9f}' => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    script_url: String,
}

impl DocumentAssembler {
    pub fn new(script_url: impl Into<String>) -> Self {
        Self {
            script_url: script_url.into(),
        }
    }

    pub fn script_url(&self) -> &str {
        &self.script_url
    }

    /// Return a copy of `doc` with the viewer extensions appended to its body.
    /// The input is never modified.
    pub fn insert(&self, doc: &Document, taxonomy_json: &str) -> Result<Document> {
        let mut out = doc.clone();
        self.insert_in_place(&mut out, taxonomy_json)?;
        Ok(out)
    }

    /// Append the extensions to `doc` itself. On error `doc` is unchanged.
    pub fn insert_in_place(&self, doc: &mut Document, taxonomy_json: &str) -> Result<()> {
        let body = doc
            .root
            .child_elements_mut()
            .find(|e| e.is(Some(XHTML_NS), "body"))
            .ok_or(Error::NoBody)?;

        if has_viewer_data(body) {
            return Err(Error::ViewerDataExists);
        }

        body.append(Node::Comment(BEGIN_MARKER.to_string()));
        body.append_element(
            script_element()
                .with_attribute("src", &self.script_url)
                .with_attribute("type", "text/javascript"),
        );
        body.append_element(
            script_element()
                .with_attribute("type", VIEWER_DATA_TYPE)
                .with_text(&escape_json_for_script_tag(taxonomy_json)),
        );
        body.append(Node::Comment(END_MARKER.to_string()));
        Ok(())
    }
}

fn script_element() -> Element {
    Element::xhtml("script")
}

fn has_viewer_data(body: &Element) -> bool {
    body.child_elements()
        .any(|e| e.is(Some(XHTML_NS), "script") && e.attribute("type") == Some(VIEWER_DATA_TYPE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XhtmlSerializer;
    use pretty_assertions::assert_eq;

    const JSON: &str = r#"{"a": "</script><b>&amp;"}"#;

    fn serialize(doc: &Document) -> String {
        XhtmlSerializer::new().with_xml_declaration(false).to_string(doc)
    }

    #[test]
    fn escaped_json_parses_to_same_value() {
        let escaped = escape_json_for_script_tag(JSON);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert!(!escaped.contains('&'));
        let a: serde_json::Value = serde_json::from_str(JSON).unwrap();
        let b: serde_json::Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn control_characters_are_json_escaped() {
        let json = serde_json::to_string(&serde_json::json!({"label": "Cash\u{85}end\u{7f}"})).unwrap();
        assert!(json.contains('\u{85}'));
        let escaped = escape_json_for_script_tag(&json);
        assert_eq!(escaped, r#"{"label":"Cash\u0085end\u007F"}"#);
        let a: serde_json::Value = serde_json::from_str(&json).unwrap();
        let b: serde_json::Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(a, b);

        let pretty = escape_json_for_script_tag("{\r\n \"a\": 1\r}");
        assert_eq!(pretty, "{\n\n \"a\": 1\n}");
    }

    #[test]
    fn script_data_has_no_character_references() {
        let doc = Document::parse_str(r#"<html xmlns="http://www.w3.org/1999/xhtml"><body/></html>"#).unwrap();
        let json = serde_json::to_string(&serde_json::json!({"label": "Cash\u{85}end"})).unwrap();
        let out = serialize(&DocumentAssembler::new("v.js").insert(&doc, &json).unwrap());
        let start = out.find(VIEWER_DATA_TYPE).unwrap();
        let data = &out[start..];
        let data = &data[..data.find("</script>").unwrap()];
        assert!(!data.contains("&#"));
        assert!(data.contains("Cash\\u0085end"));
    }

    #[test]
    fn extensions_are_appended_to_body() {
        let doc = Document::parse_str(
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><head></head><body><p>x</p></body></html>"#,
        )
        .unwrap();
        let out = DocumentAssembler::new("viewer.js").insert(&doc, "{}").unwrap();
        assert_eq!(
            serialize(&out),
            concat!(
                r#"<html xmlns="http://www.w3.org/1999/xhtml"><head></head><body><p>x</p>"#,
                r#"<!--BEGIN IXBRL VIEWER EXTENSIONS-->"#,
                r#"<script src="viewer.js" type="text/javascript"></script>"#,
                r#"<script type="application/x.ixbrl-viewer+json">{}</script>"#,
                r#"<!--END IXBRL VIEWER EXTENSIONS--></body></html>"#
            )
        );
        assert_ne!(out, doc);
    }

    #[test]
    fn script_data_never_closes_the_element() {
        let doc = Document::parse_str(r#"<html xmlns="http://www.w3.org/1999/xhtml"><body/></html>"#).unwrap();
        let out = serialize(&DocumentAssembler::new("v.js").insert(&doc, JSON).unwrap());
        let start = out.find(VIEWER_DATA_TYPE).unwrap();
        let data = &out[start..];
        let end = data.find("</script>").unwrap();
        assert!(!data[..end].contains("</"));
        assert!(data[..end].contains("\\u003C/script\\u003E"));
    }

    #[test]
    fn second_insertion_is_a_conflict() {
        let doc = Document::parse_str(r#"<html xmlns="http://www.w3.org/1999/xhtml"><body/></html>"#).unwrap();
        let assembler = DocumentAssembler::new("v.js");
        let mut once = assembler.insert(&doc, "{}").unwrap();
        let before = once.clone();
        let err = assembler.insert_in_place(&mut once, "{}").unwrap_err();
        assert!(matches!(err, Error::ViewerDataExists));
        assert_eq!(once, before);
    }

    #[test]
    fn prefixed_xhtml_gets_unprefixed_scripts() {
        let doc = Document::parse_str(
            r#"<xhtml:html xmlns:xhtml="http://www.w3.org/1999/xhtml"><xhtml:body></xhtml:body></xhtml:html>"#,
        )
        .unwrap();
        let out = serialize(&DocumentAssembler::new("v.js").insert(&doc, "{}").unwrap());
        assert_eq!(
            out,
            concat!(
                r#"<xhtml:html xmlns:xhtml="http://www.w3.org/1999/xhtml"><xhtml:body>"#,
                r#"<!--BEGIN IXBRL VIEWER EXTENSIONS-->"#,
                r#"<script xmlns="http://www.w3.org/1999/xhtml" src="v.js" type="text/javascript"></script>"#,
                r#"<script xmlns="http://www.w3.org/1999/xhtml" type="application/x.ixbrl-viewer+json">{}</script>"#,
                r#"<!--END IXBRL VIEWER EXTENSIONS--></xhtml:body></xhtml:html>"#
            )
        );
        assert_eq!(serialize(&Document::parse_str(&out).unwrap()), out);
    }

    #[test]
    fn foreign_default_namespace_is_overridden() {
        let doc = Document::parse_str(
            r#"<xhtml:html xmlns="http://example.com/other" xmlns:xhtml="http://www.w3.org/1999/xhtml"><xhtml:body/></xhtml:html>"#,
        )
        .unwrap();
        let out = serialize(&DocumentAssembler::new("v.js").insert(&doc, "{}").unwrap());
        assert!(out.contains(
            r#"<script xmlns="http://www.w3.org/1999/xhtml" src="v.js" type="text/javascript"></script>"#
        ));
        let reparsed = Document::parse_str(&out).unwrap();
        let body = reparsed.root.child_elements().next().unwrap();
        assert!(body.child_elements().all(|e| e.is(Some(XHTML_NS), "script")));
    }

    #[test]
    fn missing_body_is_reported() {
        let doc = Document::parse_str(r#"<html xmlns="http://www.w3.org/1999/xhtml"><head/></html>"#).unwrap();
        assert!(matches!(
            DocumentAssembler::new("v.js").insert(&doc, "{}"),
            Err(Error::NoBody)
        ));
    }
}
