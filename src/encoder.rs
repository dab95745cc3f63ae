//! Encoding of report-model entities into taxonomy-data records.
//!
//! The encoder owns the namespace and role prefix maps, the language table and
//! the fact id counter for one build. All shared entities are keyed by the
//! prefixes it hands out, so a single encoder must see every report of a build.

use crate::model::*;
use crate::namespace::NamespaceMap;
use crate::taxonomy::*;
use ahash::AHashMap;
use chrono::{NaiveDateTime, Timelike};
use std::collections::{BTreeMap, BTreeSet};

/// Arc roles whose networks are passed to the viewer.
pub const VIEWER_ARCROLES: &[&str] = &[
    SUMMATION_ITEM_ARCROLE,
    SUMMATION_ITEM_11_ARCROLE,
    PARENT_CHILD_ARCROLE,
    DIMENSION_DEFAULT_ARCROLE,
    WIDER_NARROWER_ARCROLE,
];

/// Role prefixes fixed up front so the viewer can find well-known roles.
pub const PRESET_ROLE_PREFIXES: &[(&str, &str)] = &[
    (STANDARD_LABEL_ROLE, "std"),
    (DOCUMENTATION_LABEL_ROLE, "doc"),
    (SUMMATION_ITEM_ARCROLE, "calc"),
    (SUMMATION_ITEM_11_ARCROLE, "calc11"),
    (PARENT_CHILD_ARCROLE, "pres"),
    (DIMENSION_DEFAULT_ARCROLE, "d-d"),
    (WIDER_NARROWER_ARCROLE, "w-n"),
];

pub const INVALID_VALUE_MARKER: &str = "INVALID_IX_VALUE";
pub const UNRECOGNIZED_LINKBASE: &str = "unrecognizedLinkbase";

/// Read-only view of one report with its concepts indexed by name.
pub struct ReportView<'a> {
    pub report: &'a ReportModel,
    concepts: AHashMap<&'a QName, &'a Concept>,
}

impl<'a> ReportView<'a> {
    pub fn new(report: &'a ReportModel) -> Self {
        Self {
            report,
            concepts: report.concept_index(),
        }
    }

    #[inline]
    pub fn concept(&self, qname: &QName) -> Option<&'a Concept> {
        self.concepts.get(qname).copied()
    }
}

pub struct EntityEncoder {
    nsmap: NamespaceMap,
    role_map: NamespaceMap,
    languages: BTreeMap<String, String>,
    id_gen: usize,
}

impl Default for EntityEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityEncoder {
    pub fn new() -> Self {
        let mut role_map = NamespaceMap::new();
        for (role, prefix) in PRESET_ROLE_PREFIXES {
            role_map.prefix_for(role, Some(prefix));
        }
        Self {
            nsmap: NamespaceMap::new(),
            role_map,
            languages: BTreeMap::new(),
            id_gen: 0,
        }
    }

    pub fn nsmap(&self) -> &NamespaceMap {
        &self.nsmap
    }

    pub fn role_map(&self) -> &NamespaceMap {
        &self.role_map
    }

    pub fn role_prefix(&mut self, role: &str) -> String {
        self.role_map.prefix_for(role, None).to_string()
    }

    pub fn languages(&self) -> &BTreeMap<String, String> {
        &self.languages
    }

    pub fn add_language(&mut self, code: &str) {
        if !self.languages.contains_key(code) {
            self.languages.insert(code.to_string(), language_name(code));
        }
    }

    // ------------------------------------------------------------------------
    // Concepts
    // ------------------------------------------------------------------------

    /// Add the named concept to the target report. Unknown concepts are
    /// ignored; a concept already present is left untouched.
    pub fn add_concept(
        &mut self,
        view: &ReportView<'_>,
        target: &mut TargetReport,
        qname: &QName,
        dimension: Option<DimensionKind>,
    ) {
        if let Some(concept) = view.concept(qname) {
            self.encode_concept(view, target, concept, dimension);
        }
    }

    pub fn encode_concept(
        &mut self,
        view: &ReportView<'_>,
        target: &mut TargetReport,
        concept: &Concept,
        dimension: Option<DimensionKind>,
    ) {
        let name = self.nsmap.qname(&concept.qname);
        if target.concepts.contains_key(&name) {
            return;
        }

        let mut record = ConceptRecord::default();
        for label in &concept.labels {
            let role = self.role_map.prefix_for(&label.role, None).to_string();
            let lang = label.lang.to_lowercase();
            self.add_language(&lang);
            record
                .labels
                .entry(role)
                .or_default()
                .insert(lang, label.text.clone());
        }

        let references: Vec<Vec<[String; 2]>> = concept
            .references
            .iter()
            .map(|r| {
                r.parts
                    .iter()
                    .map(|p| [p.local_name.clone(), p.value.trim().to_string()])
                    .collect()
            })
            .collect();
        if !references.is_empty() {
            record.references = Some(references);
        }

        record.enumeration = concept.is_enumeration;
        record.text_block = concept.is_text_block;
        record.balance = concept.balance.clone();
        record.dimension = dimension;
        record.typed_domain = concept.typed_domain.as_ref().map(|td| self.nsmap.qname(td));
        record.data_type = concept.data_type.as_ref().map(|dt| self.nsmap.qname(dt));

        target.concepts.insert(name, record);

        if let Some(domain) = &concept.typed_domain {
            self.add_concept(view, target, domain, None);
        }
    }

    // ------------------------------------------------------------------------
    // Facts
    // ------------------------------------------------------------------------

    /// Encode a fact, returning its id (assigned when the fact has none) and
    /// its record. Concepts the fact refers to are added to the target report.
    pub fn encode_fact(
        &mut self,
        view: &ReportView<'_>,
        target: &mut TargetReport,
        fact: &Fact,
    ) -> (String, FactRecord) {
        let id = match &fact.id {
            Some(id) => id.clone(),
            None => format!("ixv-{}", self.id_gen),
        };
        self.id_gen += 1;

        let entity = &fact.context.entity;
        let scheme_prefix = self.nsmap.prefix_for(&entity.scheme, Some("e"));

        let mut aspects = Aspects {
            concept: self.nsmap.qname(&fact.concept),
            entity: format!("{}:{}", scheme_prefix, entity.identifier),
            ..Aspects::default()
        };

        let concept = view.concept(&fact.concept);
        let is_enumeration = concept.map(|c| c.is_enumeration).unwrap_or(false);

        let mut err = None;
        let value = match &fact.value {
            FactValue::Nil => None,
            FactValue::Enumeration(members) => {
                let encoded: Vec<String> = members.iter().map(|m| self.nsmap.qname(m)).collect();
                for member in members {
                    self.add_concept(view, target, member, None);
                }
                Some(encoded.join(" "))
            }
            FactValue::Text(text) => {
                if is_enumeration {
                    err = Some(INVALID_VALUE_MARKER);
                }
                Some(text.clone())
            }
            FactValue::Invalid(text) => {
                err = Some(INVALID_VALUE_MARKER);
                Some(text.clone())
            }
        };

        let mut decimals = None;
        if fact.numeric {
            aspects.unit = Some(fact.unit.as_ref().and_then(|u| self.encode_unit(u)));
            decimals = fact.decimals.filter(|d| d.is_finite()).map(|d| d as i64);
        }

        for dim in &fact.context.dimensions {
            let dim_name = self.nsmap.qname(&dim.dimension);
            if let Some(member) = &dim.member {
                let member_name = self.nsmap.qname(member);
                aspects.dimensions.insert(dim_name, member_name);
                self.add_concept(view, target, member, None);
                self.add_concept(view, target, &dim.dimension, Some(DimensionKind::Explicit));
            } else if let Some(typed) = &dim.typed_member {
                aspects.dimensions.insert(dim_name, typed.clone());
                self.add_concept(view, target, &dim.dimension, Some(DimensionKind::Typed));
            } else {
                // Dimension without a usable value: keep the fact, drop the aspect.
                self.add_concept(view, target, &dim.dimension, None);
            }
        }

        aspects.period = format_period(&fact.context.period);

        let record = FactRecord {
            v: value,
            a: aspects,
            f: fact.format.as_ref().map(|f| f.to_string()),
            d: decimals,
            footnotes: fact.footnotes.clone(),
            err,
        };

        self.add_concept(view, target, &fact.concept, None);
        (id, record)
    }

    /// `num1*num2/den`, with parentheses around multi-measure numerators
    /// (when divided) and multi-measure denominators. `None` when the unit
    /// has no numerator.
    pub fn encode_unit(&mut self, unit: &Unit) -> Option<String> {
        if unit.numerators.is_empty() {
            return None;
        }
        let numerators: Vec<String> = unit.numerators.iter().map(|m| self.nsmap.qname(m)).collect();
        let denominators: Vec<String> =
            unit.denominators.iter().map(|m| self.nsmap.qname(m)).collect();

        let mut out = numerators.join("*");
        if !denominators.is_empty() {
            if numerators.len() > 1 {
                out = format!("({})", out);
            }
            out.push('/');
            if denominators.len() > 1 {
                out.push_str(&format!("({})", denominators.join("*")));
            } else {
                out.push_str(&denominators[0]);
            }
        }
        Some(out)
    }

    // ------------------------------------------------------------------------
    // Relationships and roles
    // ------------------------------------------------------------------------

    pub fn encode_relationships(
        &mut self,
        view: &ReportView<'_>,
        target: &mut TargetReport,
    ) -> BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<RelRecord>>>> {
        let mut rels: BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<RelRecord>>>> =
            BTreeMap::new();

        for set in &view.report.relationship_sets {
            let elr = match &set.elr {
                Some(elr) if VIEWER_ARCROLES.contains(&set.arcrole.as_str()) => elr,
                _ => continue,
            };
            self.add_role_definition(view, target, elr);

            let mut network: BTreeMap<String, Vec<RelRecord>> = BTreeMap::new();
            for rel in &set.relationships {
                let (Some(from), Some(to)) = (&rel.from, &rel.to) else {
                    continue;
                };
                let from_key = self.nsmap.qname(from);
                let record = RelRecord {
                    t: self.nsmap.qname(to),
                    w: rel.weight,
                };
                network.entry(from_key).or_default().push(record);
                self.add_concept(view, target, to, None);
                self.add_concept(view, target, from, None);
            }

            // Base sets sharing an arcrole and ELR form one network.
            let arcrole_prefix = self.role_prefix(&set.arcrole);
            let elr_prefix = self.role_prefix(elr);
            let merged = rels.entry(arcrole_prefix).or_default().entry(elr_prefix).or_default();
            for (from, records) in network {
                merged.entry(from).or_default().extend(records);
            }
        }
        rels
    }

    /// Record the first declared definition of an ELR. ELRs without one are
    /// left out of the table.
    pub fn add_role_definition(&mut self, view: &ReportView<'_>, target: &mut TargetReport, elr: &str) {
        let prefix = self.role_prefix(elr);
        if target.role_defs.contains_key(&prefix) {
            return;
        }
        let definition = view
            .report
            .role_types
            .get(elr)
            .and_then(|rts| rts.iter().find_map(|rt| rt.definition.clone()));
        if let Some(en) = definition {
            target.role_defs.insert(prefix, RoleDefinition { en });
        }
    }
}

/// ISO date-time with a zero time of day stripped.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    let mut s = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = dt.nanosecond() / 1_000;
    if micros != 0 {
        s.push_str(&format!(".{:06}", micros));
    }
    match s.strip_suffix("T00:00:00") {
        Some(date) => date.to_string(),
        None => s,
    }
}

pub fn format_period(period: &Period) -> Option<String> {
    match period {
        Period::Forever => Some("f".to_string()),
        Period::Instant(dt) => Some(format_datetime(dt)),
        Period::Duration { start, end } => {
            Some(format!("{}/{}", format_datetime(start), format_datetime(end)))
        }
        Period::Unknown => None,
    }
}

/// English display name for a language tag: `en` -> `English`,
/// `en-gb` -> `English (GB)`. Unknown languages map to the tag itself.
pub fn language_name(code: &str) -> String {
    let (base, region) = match code.split_once('-') {
        Some((base, region)) => (base, Some(region)),
        None => (code, None),
    };
    let language = isolang::Language::from_639_1(base).or_else(|| isolang::Language::from_639_3(base));
    match (language, region) {
        (Some(lang), Some(region)) => format!("{} ({})", lang.to_name(), region.to_uppercase()),
        (Some(lang), None) => lang.to_name().to_string(),
        (None, _) => code.to_string(),
    }
}

fn is_http_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn linkbase_kind(first_child: Option<&QName>) -> &'static str {
    let Some(qname) = first_child else {
        return UNRECOGNIZED_LINKBASE;
    };
    if qname.namespace.as_deref() != Some(LINK_NS) {
        return UNRECOGNIZED_LINKBASE;
    }
    match qname.local_name.as_str() {
        "labelLink" => "labelLinkbase",
        "presentationLink" => "presLinkbase",
        "calculationLink" => "calcLinkbase",
        "definitionLink" => "defLinkbase",
        "referenceLink" => "refLinkbase",
        _ => UNRECOGNIZED_LINKBASE,
    }
}

/// Classify every locally available document of the report by basename.
pub fn local_documents(report: &ReportModel) -> BTreeMap<String, BTreeSet<String>> {
    let mut docs: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for doc in &report.url_docs {
        if is_http_url(&doc.url) {
            continue;
        }
        let kind = match doc.doc_type {
            DocumentType::InlineXbrl => "inline",
            DocumentType::Schema => "schema",
            DocumentType::Linkbase => linkbase_kind(doc.first_child.as_ref()),
            _ => continue,
        };
        docs.entry(doc.basename().to_string())
            .or_default()
            .insert(kind.to_string());
    }
    docs
}

/// Distinct creation-software names across the report's documents.
pub fn software_credits(report: &ReportModel) -> Vec<String> {
    let mut credits: Vec<String> = Vec::new();
    for name in report.url_docs.iter().flat_map(|d| d.software_credits.iter()) {
        if !credits.contains(name) {
            credits.push(name.clone());
        }
    }
    credits
}
