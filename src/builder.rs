//! Build driver: runs the encoder over one or more reports and turns the
//! result into a [`Viewer`].

use crate::assembler::DocumentAssembler;
use crate::encoder::{local_documents, software_credits, EntityEncoder, ReportView};
use crate::features::FeatureConfig;
use crate::model::{ElementRef, ReportModel};
use crate::taxonomy::{SourceReport, TargetReport, TaxonomyData};
use crate::validation::{collect_messages, LogHandler, ValidationMessage};
use crate::viewer::{Viewer, ViewerFile};
use crate::xml::Document;
use crate::{Error, Result, ERROR_MESSAGE_CODE, INFO_MESSAGE_CODE};
use ahash::AHashMap;

pub const DEFAULT_SCRIPT_URL: &str = "ixbrlviewer.js";
pub const STUB_FILENAME: &str = "ixbrlviewer.html";

const STUB_PAGE: &str = concat!(
    r#"<html xmlns="http://www.w3.org/1999/xhtml">"#,
    r#"<head><meta charset="utf-8"/><title>Inline XBRL Viewer</title></head>"#,
    r#"<body></body></html>"#
);

/// Parsed report documents keyed by file name.
pub type DocumentSet = AHashMap<String, Document>;

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub script_url: String,
    /// Put the data into a separate stub page instead of the report.
    pub use_stub_viewer: bool,
    pub show_validations: bool,
    /// Name of a filing-documents archive advertised to the viewer.
    pub filing_documents: Option<String>,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            use_stub_viewer: false,
            show_validations: false,
            filing_documents: None,
        }
    }
}

impl ViewerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script_url(mut self, url: impl Into<String>) -> Self {
        self.script_url = url.into();
        self
    }

    pub fn with_stub_viewer(mut self, enabled: bool) -> Self {
        self.use_stub_viewer = enabled;
        self
    }

    pub fn with_validations(mut self, enabled: bool) -> Self {
        self.show_validations = enabled;
        self
    }

    pub fn with_filing_documents(mut self, name: impl Into<String>) -> Self {
        self.filing_documents = Some(name.into());
        self
    }
}

pub struct ViewerBuilder<'a> {
    log: &'a dyn LogHandler,
    options: ViewerOptions,
    features: FeatureConfig,
    encoder: EntityEncoder,
    source_reports: Vec<SourceReport>,
    /// Ids generated for facts whose element is known.
    assigned_ids: Vec<(ElementRef, String)>,
}

impl<'a> ViewerBuilder<'a> {
    pub fn new(log: &'a dyn LogHandler, options: ViewerOptions) -> Self {
        Self {
            log,
            options,
            features: FeatureConfig::default(),
            encoder: EntityEncoder::new(),
            source_reports: Vec::new(),
            assigned_ids: Vec::new(),
        }
    }

    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    /// Encode one report as a new target report. Reports with the same docset
    /// files share a source report.
    pub fn process_report(&mut self, report: &ReportModel) {
        let view = ReportView::new(report);
        let mut target = TargetReport::new(report.target.clone());

        for fact in &report.facts {
            let (id, record) = self.encoder.encode_fact(&view, &mut target, fact);
            if fact.id.is_none() {
                if let Some(element) = &fact.element {
                    self.assigned_ids.push((element.clone(), id.clone()));
                }
            }
            target.facts.insert(id, record);
        }

        target.rels = self.encoder.encode_relationships(&view, &mut target);
        target.local_docs = local_documents(report);
        target.software_credits = software_credits(report);

        let doc_set_files = report.docset_files();
        log::debug!(
            "encoded {} facts and {} concepts for {:?}",
            target.facts.len(),
            target.concepts.len(),
            doc_set_files
        );

        match self
            .source_reports
            .iter_mut()
            .find(|s| s.doc_set_files == doc_set_files)
        {
            Some(source) => source.target_reports.push(target),
            None => self.source_reports.push(SourceReport {
                doc_set_files,
                target_reports: vec![target],
            }),
        }
    }

    pub fn validation_errors(&self) -> Result<Vec<ValidationMessage>> {
        let records = self.log.log_record_buffer().ok_or(Error::LogNotBuffered)?;
        Ok(collect_messages(records))
    }

    pub fn taxonomy_data(&self) -> Result<TaxonomyData> {
        let validation = if self.options.show_validations {
            Some(self.validation_errors()?)
        } else {
            None
        };
        Ok(TaxonomyData {
            source_reports: self.source_reports.clone(),
            prefixes: self.encoder.nsmap().prefixes(),
            roles: self.encoder.role_map().prefixes(),
            languages: self.encoder.languages().clone(),
            features: self.features.clone(),
            validation,
            filing_documents: self.options.filing_documents.clone(),
        })
    }

    /// Assemble the viewer from working copies of `documents`. Failures are
    /// logged before being returned.
    pub fn create_viewer(&self, documents: &DocumentSet) -> Result<Viewer> {
        self.build_viewer(documents).map_err(|e| {
            log::error!(target: ERROR_MESSAGE_CODE, "{}", e);
            e
        })
    }

    fn build_viewer(&self, documents: &DocumentSet) -> Result<Viewer> {
        let data = self.taxonomy_data()?;
        let json = data.to_json()?;

        log::info!(target: INFO_MESSAGE_CODE, "Creating iXBRL viewer");

        let mut files: Vec<ViewerFile> = Vec::new();
        for name in self.source_reports.iter().flat_map(|s| s.doc_set_files.iter()) {
            if files.iter().any(|f| &f.filename == name) {
                continue;
            }
            let doc = documents
                .get(name)
                .ok_or_else(|| Error::MissingDocument(name.clone()))?;
            files.push(ViewerFile::new(name.clone(), doc.clone()));
        }

        for (element, id) in &self.assigned_ids {
            let target = files
                .iter_mut()
                .find(|f| f.filename == element.file)
                .and_then(|f| f.document.root.element_at_path_mut(&element.path));
            match target {
                Some(e) => e.set_attribute("id", id),
                None => log::warn!(
                    "no element at {:?} in {} for fact {}",
                    element.path,
                    element.file,
                    id
                ),
            }
        }

        let assembler = DocumentAssembler::new(self.options.script_url.clone());
        if self.options.use_stub_viewer {
            let stub = assembler.insert(&Document::parse_str(STUB_PAGE)?, &json)?;
            files.insert(0, ViewerFile::new(STUB_FILENAME.to_string(), stub));
        } else {
            let first = files.first_mut().ok_or(Error::NoDocuments)?;
            assembler.insert_in_place(&mut first.document, &json)?;
        }

        Ok(Viewer::new(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;
    use crate::validation::{LogRecord, LogRecordBuffer, Severity, UnbufferedLog};
    use crate::xml::XhtmlSerializer;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const PAGE: &str = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:ix="http://www.xbrl.org/2013/inlineXBRL"><body><ix:nonNumeric name="us-gaap:Cash">100</ix:nonNumeric></body></html>"#;

    fn cash() -> QName {
        QName::with_prefix("us-gaap", "http://viewer.com", "Cash")
    }

    fn report(filename: &str, fact_id: Option<&str>) -> ReportModel {
        let mut concept = Concept::new(cash());
        concept.labels.push(Label {
            role: STANDARD_LABEL_ROLE.into(),
            lang: "en".into(),
            text: "Cash".into(),
        });
        ReportModel {
            documents: vec![SourceDocument {
                filename: filename.into(),
                object_index: 0,
                location: None,
            }],
            facts: vec![Fact {
                id: fact_id.map(String::from),
                concept: cash(),
                context: Context {
                    entity: EntityIdentifier {
                        scheme: "http://www.sec.gov/CIK".into(),
                        identifier: "0000001".into(),
                    },
                    period: Period::Instant(
                        NaiveDate::from_ymd_opt(2020, 1, 1)
                            .unwrap()
                            .and_hms_opt(0, 0, 0)
                            .unwrap(),
                    ),
                    dimensions: vec![],
                },
                numeric: false,
                unit: None,
                value: FactValue::Text("100".into()),
                format: None,
                decimals: None,
                footnotes: vec![],
                element: Some(ElementRef {
                    file: filename.into(),
                    path: vec![0, 0],
                }),
            }],
            concepts: vec![concept],
            ..ReportModel::default()
        }
    }

    fn documents(names: &[&str]) -> DocumentSet {
        names
            .iter()
            .map(|n| (n.to_string(), Document::parse_str(PAGE).unwrap()))
            .collect()
    }

    fn viewer_json(viewer: &Viewer, file: usize) -> Value {
        let html = XhtmlSerializer::new().to_string(&viewer.files[file].document);
        let start = html.find("application/x.ixbrl-viewer+json\">").unwrap();
        let rest = &html[start..];
        let body = &rest[rest.find('>').unwrap() + 1..rest.find("</script>").unwrap()];
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn simple_report() {
        let log = LogRecordBuffer::new();
        let mut builder = ViewerBuilder::new(&log, ViewerOptions::default());
        let report = report("a.html", Some("f1"));
        builder.process_report(&report);
        let viewer = builder.create_viewer(&documents(&["a.html"])).unwrap();

        assert_eq!(viewer.files.len(), 1);
        let data = viewer_json(&viewer, 0);
        let target = &data["sourceReports"][0]["targetReports"][0];
        assert_eq!(
            target["facts"]["f1"],
            json!({"v": "100", "a": {"c": "us-gaap:Cash", "e": "e:0000001", "p": "2020-01-01"}})
        );
        assert_eq!(target["concepts"]["us-gaap:Cash"]["labels"]["std"]["en"], json!("Cash"));
        assert_eq!(data["sourceReports"][0]["docSetFiles"], json!(["a.html"]));
        assert_eq!(data["languages"], json!({"en": "English"}));
        assert_eq!(data["prefixes"]["e"], json!("http://www.sec.gov/CIK"));
        assert_eq!(data["roles"]["std"], json!(STANDARD_LABEL_ROLE));
        assert!(data.get("validation").is_none());
    }

    #[test]
    fn generated_ids_are_written_back() {
        let log = LogRecordBuffer::new();
        let mut builder = ViewerBuilder::new(&log, ViewerOptions::default());
        let report = report("a.html", None);
        builder.process_report(&report);
        let docs = documents(&["a.html"]);
        let viewer = builder.create_viewer(&docs).unwrap();

        let html = XhtmlSerializer::new().to_string(&viewer.files[0].document);
        assert!(html.contains(r#"<ix:nonNumeric id="ixv-0" name="us-gaap:Cash">"#));
        // Source documents are untouched
        let original = XhtmlSerializer::new().to_string(&docs["a.html"]);
        assert!(!original.contains("ixv-0"));
        assert!(viewer_json(&viewer, 0)["sourceReports"][0]["targetReports"][0]["facts"]
            .get("ixv-0")
            .is_some());
    }

    #[test]
    fn reports_sharing_a_docset_share_a_source_report() {
        let log = LogRecordBuffer::new();
        let mut builder = ViewerBuilder::new(&log, ViewerOptions::default());
        let mut first = report("a.html", Some("f1"));
        first.target = Some("t1".into());
        let mut second = report("a.html", Some("f2"));
        second.target = Some("t2".into());
        let third = report("b.html", Some("f3"));
        builder.process_report(&first);
        builder.process_report(&second);
        builder.process_report(&third);

        let data = builder.taxonomy_data().unwrap();
        assert_eq!(data.source_reports.len(), 2);
        assert_eq!(data.source_reports[0].target_reports.len(), 2);
        assert_eq!(data.source_reports[0].target_reports[1].target.as_deref(), Some("t2"));

        let viewer = builder.create_viewer(&documents(&["a.html", "b.html"])).unwrap();
        let names: Vec<_> = viewer.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.html", "b.html"]);
    }

    #[test]
    fn validation_messages_require_a_buffer() {
        let report = report("a.html", Some("f1"));
        let options = ViewerOptions::default().with_validations(true);

        let mut builder = ViewerBuilder::new(&UnbufferedLog, options.clone());
        builder.process_report(&report);
        assert!(matches!(
            builder.create_viewer(&documents(&["a.html"])),
            Err(Error::LogNotBuffered)
        ));

        let log = LogRecordBuffer::from_records(vec![
            LogRecord::new(Severity::Info, "info", "Loaded"),
            LogRecord::new(Severity::Error, "code1", "Error message"),
        ]);
        let mut builder = ViewerBuilder::new(&log, options);
        builder.process_report(&report);
        let viewer = builder.create_viewer(&documents(&["a.html"])).unwrap();
        assert_eq!(
            viewer_json(&viewer, 0)["validation"],
            json!([{"sev": "ERROR", "code": "code1", "msg": "Error message"}])
        );
    }

    #[test]
    fn features_are_passed_through() {
        let log = LogRecordBuffer::new();
        let features = FeatureConfig::from_pairs([("review", json!(true))]).unwrap();
        let mut builder = ViewerBuilder::new(&log, ViewerOptions::default()).with_features(features);
        builder.process_report(&report("a.html", Some("f1")));
        let viewer = builder.create_viewer(&documents(&["a.html"])).unwrap();
        assert_eq!(viewer_json(&viewer, 0)["features"], json!({"review": true}));
    }

    #[test]
    fn stub_viewer_leaves_report_without_data() {
        let log = LogRecordBuffer::new();
        let options = ViewerOptions::default()
            .with_stub_viewer(true)
            .with_filing_documents("filing.zip");
        let mut builder = ViewerBuilder::new(&log, options);
        builder.process_report(&report("a.html", Some("f1")));
        let viewer = builder.create_viewer(&documents(&["a.html"])).unwrap();

        let names: Vec<_> = viewer.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec![STUB_FILENAME, "a.html"]);
        assert_eq!(viewer_json(&viewer, 0)["filingDocuments"], json!("filing.zip"));
        let report_html = XhtmlSerializer::new().to_string(&viewer.files[1].document);
        assert!(!report_html.contains("ixbrl-viewer+json"));
    }

    #[test]
    fn existing_viewer_data_is_a_conflict() {
        let log = LogRecordBuffer::new();
        let mut builder = ViewerBuilder::new(&log, ViewerOptions::default());
        builder.process_report(&report("a.html", Some("f1")));
        let viewer = builder.create_viewer(&documents(&["a.html"])).unwrap();

        let mut again: DocumentSet = AHashMap::new();
        again.insert("a.html".into(), viewer.files[0].document.clone());
        assert!(matches!(builder.create_viewer(&again), Err(Error::ViewerDataExists)));
    }

    #[test]
    fn missing_document_is_reported() {
        let log = LogRecordBuffer::new();
        let mut builder = ViewerBuilder::new(&log, ViewerOptions::default());
        builder.process_report(&report("a.html", Some("f1")));
        assert!(matches!(
            builder.create_viewer(&DocumentSet::new()),
            Err(Error::MissingDocument(ref name)) if name == "a.html"
        ));
    }
}
