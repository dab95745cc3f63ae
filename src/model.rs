use ahash::AHashMap;
use chrono::NaiveDateTime;
use compact_str::CompactString;
use serde::Deserialize;
use std::fmt;

// ============================================================================
// Report model - read-only view of an already-loaded inline XBRL report
// ============================================================================

pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const LINK_NS: &str = "http://www.xbrl.org/2003/linkbase";

pub const STANDARD_LABEL_ROLE: &str = "http://www.xbrl.org/2003/role/label";
pub const DOCUMENTATION_LABEL_ROLE: &str = "http://www.xbrl.org/2003/role/documentation";

pub const SUMMATION_ITEM_ARCROLE: &str = "http://www.xbrl.org/2003/arcrole/summation-item";
pub const SUMMATION_ITEM_11_ARCROLE: &str = "https://xbrl.org/2023/arcrole/summation-item";
pub const PARENT_CHILD_ARCROLE: &str = "http://www.xbrl.org/2003/arcrole/parent-child";
pub const DIMENSION_DEFAULT_ARCROLE: &str = "http://xbrl.org/int/dim/arcrole/dimension-default";
pub const WIDER_NARROWER_ARCROLE: &str = "http://www.esma.europa.eu/xbrl/esef/arcrole/wider-narrower";

/// Qualified name. The prefix is the one used in the source and only serves
/// as a hint when allocating output prefixes.
#[derive(Debug, Clone, Deserialize)]
pub struct QName {
    #[serde(default)]
    pub namespace: Option<CompactString>,
    pub local_name: CompactString,
    #[serde(default)]
    pub prefix: Option<CompactString>,
}

impl QName {
    pub fn new(namespace: &str, local_name: &str) -> Self {
        Self {
            namespace: Some(CompactString::new(namespace)),
            local_name: CompactString::new(local_name),
            prefix: None,
        }
    }

    pub fn with_prefix(prefix: &str, namespace: &str, local_name: &str) -> Self {
        Self {
            namespace: Some(CompactString::new(namespace)),
            local_name: CompactString::new(local_name),
            prefix: Some(CompactString::new(prefix)),
        }
    }

    /// Clark notation, `{namespace}local`.
    pub fn clark(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{{{}}}{}", ns, self.local_name),
            None => self.local_name.to_string(),
        }
    }
}

// Identity ignores the prefix.
impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl std::hash::Hash for QName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

// Concept definitions with labels and references
#[derive(Debug, Clone, Deserialize)]
pub struct Concept {
    pub qname: QName,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(default)]
    pub is_enumeration: bool,
    #[serde(default)]
    pub is_text_block: bool,
    #[serde(default)]
    pub typed_domain: Option<QName>,
    #[serde(default)]
    pub data_type: Option<QName>,
}

impl Concept {
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            labels: Vec::new(),
            references: Vec::new(),
            balance: None,
            is_enumeration: false,
            is_text_block: false,
            typed_domain: None,
            data_type: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub role: String,
    pub lang: String,
    pub text: String,
}

/// One reference resource; parts keep document order.
#[derive(Debug, Clone, Deserialize)]
pub struct Reference {
    pub parts: Vec<ReferencePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferencePart {
    pub local_name: String,
    pub value: String,
}

// Facts
#[derive(Debug, Clone, Deserialize)]
pub struct Fact {
    #[serde(default)]
    pub id: Option<String>,
    pub concept: QName,
    pub context: Context,
    #[serde(default)]
    pub numeric: bool,
    #[serde(default)]
    pub unit: Option<Unit>,
    pub value: FactValue,
    #[serde(default)]
    pub format: Option<QName>,
    /// Inferred decimals; may be infinite or NaN.
    #[serde(default)]
    pub decimals: Option<f64>,
    #[serde(default)]
    pub footnotes: Vec<String>,
    #[serde(default)]
    pub element: Option<ElementRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FactValue {
    Nil,
    Text(String),
    /// Literal that failed inline value transformation.
    Invalid(String),
    Enumeration(Vec<QName>),
}

/// Position of a fact's element within one of the report's documents, as the
/// element-child index path from the root element.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ElementRef {
    pub file: String,
    pub path: Vec<usize>,
}

// Context with dimension support
#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    pub entity: EntityIdentifier,
    pub period: Period,
    #[serde(default)]
    pub dimensions: Vec<DimensionValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityIdentifier {
    pub scheme: String,
    pub identifier: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DimensionValue {
    pub dimension: QName,
    #[serde(default)]
    pub member: Option<QName>,
    /// Text of the typed member element.
    #[serde(default)]
    pub typed_member: Option<String>,
}

// Period with forever support
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Instant(NaiveDateTime),
    Duration {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    Forever,
    /// Incomplete period in a draft document.
    Unknown,
}

// Complex unit support with divide/multiply
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Unit {
    #[serde(default)]
    pub numerators: Vec<QName>,
    #[serde(default)]
    pub denominators: Vec<QName>,
}

// Relationship networks
#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipSet {
    pub arcrole: String,
    #[serde(default)]
    pub elr: Option<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Relationship {
    pub from: Option<QName>,
    pub to: Option<QName>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleType {
    #[serde(default)]
    pub definition: Option<String>,
}

// Documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    InlineXbrl,
    InlineXbrlDocumentSet,
    Schema,
    Linkbase,
    Instance,
    Other,
}

/// A document the report loaded, keyed by URL or file path.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlDoc {
    pub url: String,
    pub doc_type: DocumentType,
    /// Qualified name of the root's first child element (linkbases).
    #[serde(default)]
    pub first_child: Option<QName>,
    /// Creation software names found in the document.
    #[serde(default)]
    pub software_credits: Vec<String>,
}

impl UrlDoc {
    pub fn basename(&self) -> &str {
        self.url
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.url)
    }
}

/// One physical inline XBRL file of the report.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceDocument {
    pub filename: String,
    #[serde(default)]
    pub object_index: usize,
    /// Where to read the file from; resolved by the caller.
    #[serde(default)]
    pub location: Option<String>,
}

// Main report structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportModel {
    /// Inline documents of the report (one, or the members of a docset).
    #[serde(default)]
    pub documents: Vec<SourceDocument>,
    /// Target of a multi-target inline XBRL document set.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub facts: Vec<Fact>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub relationship_sets: Vec<RelationshipSet>,
    #[serde(default)]
    pub role_types: AHashMap<String, Vec<RoleType>>,
    #[serde(default)]
    pub url_docs: Vec<UrlDoc>,
}

impl ReportModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concept lookup table keyed by qualified name.
    pub fn concept_index(&self) -> AHashMap<&QName, &Concept> {
        self.concepts.iter().map(|c| (&c.qname, c)).collect()
    }

    /// Docset file names in the order the files were specified.
    pub fn docset_files(&self) -> Vec<String> {
        let mut docs: Vec<&SourceDocument> = self.documents.iter().collect();
        docs.sort_by_key(|d| d.object_index);
        docs.into_iter().map(|d| d.filename.clone()).collect()
    }
}
