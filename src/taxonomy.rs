//! Wire types of the taxonomy-data document read by the browser viewer.
//!
//! Key names are part of the contract with the viewer and must not change.
//! Fields that do not apply are left out rather than given a default value.

use crate::features::FeatureConfig;
use crate::validation::ValidationMessage;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaxonomyData {
    #[serde(rename = "sourceReports")]
    pub source_reports: Vec<SourceReport>,
    pub prefixes: BTreeMap<String, Option<String>>,
    pub roles: BTreeMap<String, Option<String>>,
    pub languages: BTreeMap<String, String>,
    pub features: FeatureConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Vec<ValidationMessage>>,
    #[serde(rename = "filingDocuments")]
    pub filing_documents: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceReport {
    #[serde(rename = "docSetFiles")]
    pub doc_set_files: Vec<String>,
    #[serde(rename = "targetReports")]
    pub target_reports: Vec<TargetReport>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetReport {
    pub target: Option<String>,
    pub concepts: BTreeMap<String, ConceptRecord>,
    pub facts: BTreeMap<String, FactRecord>,
    /// arcrole prefix -> ELR prefix -> source concept -> targets
    pub rels: BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<RelRecord>>>>,
    #[serde(rename = "roleDefs")]
    pub role_defs: BTreeMap<String, RoleDefinition>,
    #[serde(rename = "localDocs")]
    pub local_docs: BTreeMap<String, BTreeSet<String>>,
    #[serde(rename = "softwareCredits")]
    pub software_credits: Vec<String>,
}

impl TargetReport {
    pub fn new(target: Option<String>) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DimensionKind {
    #[serde(rename = "e")]
    Explicit,
    #[serde(rename = "t")]
    Typed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConceptRecord {
    /// label role prefix -> language -> text
    pub labels: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Vec<[String; 2]>>>,
    #[serde(rename = "e", skip_serializing_if = "std::ops::Not::not")]
    pub enumeration: bool,
    #[serde(rename = "t", skip_serializing_if = "std::ops::Not::not")]
    pub text_block: bool,
    #[serde(rename = "b", skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(rename = "d", skip_serializing_if = "Option::is_none")]
    pub dimension: Option<DimensionKind>,
    #[serde(rename = "td", skip_serializing_if = "Option::is_none")]
    pub typed_domain: Option<String>,
    #[serde(rename = "dt", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRecord {
    pub v: Option<String>,
    pub a: Aspects,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<i64>,
    #[serde(rename = "fn", skip_serializing_if = "Vec::is_empty")]
    pub footnotes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<&'static str>,
}

/// Aspect values of a fact.
///
/// `unit` is `None` for non-numeric facts and `Some(None)` for numeric facts
/// whose unit could not be resolved; the viewer relies on the key being
/// present to recognise numeric facts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aspects {
    pub concept: String,
    pub entity: String,
    pub period: Option<String>,
    pub unit: Option<Option<String>>,
    pub dimensions: BTreeMap<String, String>,
}

impl Serialize for Aspects {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 2
            + self.period.is_some() as usize
            + self.unit.is_some() as usize
            + self.dimensions.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("c", &self.concept)?;
        map.serialize_entry("e", &self.entity)?;
        if let Some(period) = &self.period {
            map.serialize_entry("p", period)?;
        }
        if let Some(unit) = &self.unit {
            map.serialize_entry("u", unit)?;
        }
        for (dim, value) in &self.dimensions {
            map.serialize_entry(dim, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelRecord {
    pub t: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleDefinition {
    pub en: String,
}

impl TaxonomyData {
    /// Serialize with one-space indentation.
    pub fn to_json(&self) -> crate::Result<String> {
        let mut out = Vec::with_capacity(64 * 1024);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        String::from_utf8(out)
            .map_err(|e| crate::Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}
