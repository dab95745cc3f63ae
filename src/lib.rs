//! ixbrl-viewer - inline XBRL viewer builder
//!
//! Compiles a parsed report model into the taxonomy-data JSON consumed by the
//! browser viewer, embeds it into the report's XHTML documents and writes them
//! back out in a form that both XML and HTML parsers accept.
//!
//! Licensed under Apache-2.0

pub mod assembler;
pub mod builder;
pub mod encoder;
pub mod features;
pub mod model;
pub mod namespace;
pub mod taxonomy;
pub mod validation;
pub mod viewer;
pub mod xml;

pub use assembler::DocumentAssembler;
pub use builder::{DocumentSet, ViewerBuilder, ViewerOptions};
pub use features::FeatureConfig;
pub use model::{Concept, Context, Fact, FactValue, Period, QName, ReportModel, Unit};
pub use namespace::NamespaceMap;
pub use taxonomy::TaxonomyData;
pub use validation::{LogHandler, LogRecord, LogRecordBuffer, Severity};
pub use viewer::{SaveOptions, Viewer, ViewerFile};
pub use xml::{Document, Element, Node, XhtmlSerializer};

/// Message code for progress messages.
pub const INFO_MESSAGE_CODE: &str = "viewer:info";
/// Message code for build and output failures.
pub const ERROR_MESSAGE_CODE: &str = "viewer:error";
/// Message code for unexpected failures surfaced by the CLI.
pub const EXCEPTION_MESSAGE_CODE: &str = "viewer:exception";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Logging must be configured to use a buffer in order to include validation messages")]
    LogNotBuffered,

    #[error("Given feature name `{0}` does not match any defined features")]
    UnknownFeature(String),

    #[error("Invalid value for feature `{key}`: {reason}")]
    InvalidFeatureValue { key: String, reason: String },

    #[error("File already contains iXBRL viewer")]
    ViewerDataExists,

    #[error("Document has no body element")]
    NoBody,

    #[error("Report has no inline documents")]
    NoDocuments,

    #[error("Source document `{0}` was not supplied")]
    MissingDocument(String),

    #[error("Output error: {0}")]
    OutputTarget(String),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(e.to_string())
    }
}
