//! Compact Topic Maps (CTM) writer.
//!
//! The `ctm-writer` crate serializes a topic-map graph, read through
//! [`ctm_model::TopicMapSource`], into one CTM document. Topics are written
//! under their most compact identity, namespaces are compressed into
//! `%prefix` directives, and recurring topic and association shapes can be
//! mined into templates that are defined once and invoked many times.
//!
//! # Entry Point
//!
//! ```
//! use ctm_model::TopicMap;
//! use ctm_writer::{CtmWriter, WriterConfig};
//!
//! let mut tm = TopicMap::new();
//! let person = tm.create_topic_by_subject_identifier("http://example.org/Person");
//! let alice = tm.create_topic_by_subject_identifier("http://example.org/alice");
//! tm.add_type(alice, person);
//! tm.create_default_name(alice, "Alice", &[]);
//!
//! let writer = CtmWriter::new(WriterConfig::default())?;
//! let ctm = writer.write_to_string(&tm)?;
//! assert!(ctm.starts_with("%encoding \"UTF-8\"\n%version 1.0\n"));
//! assert!(ctm.contains("isa example:Person"));
//! # Ok::<(), ctm_writer::CtmError>(())
//! ```
//!
//! # Modules
//!
//! - [`identity`]: choosing and rendering the identity of a topic
//! - [`prefix`]: namespace bindings and their detection
//! - [`literal`]: quoting and datatype suffixes
//! - [`encode`]: topic blocks and association lines
//! - [`template`]: template model, matching, detection and merging
//! - [`document`]: stage order of a whole document

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod affected;
pub mod buffer;
pub mod config;
pub mod document;
pub mod encode;
pub mod error;
pub mod identity;
pub mod literal;
pub mod prefix;
pub mod session;
pub mod template;
pub mod tmdm;

use std::io::Write;

use ctm_model::TopicMapSource;

pub use config::WriterConfig;
pub use document::WriteReport;
pub use error::{CtmError, Result};
pub use prefix::{LabelStrategy, PathSegmentLabels, PrefixTable};
pub use template::{Template, TemplateKind};

/// A configured CTM writer.
///
/// The writer is immutable during a write; each call to [`CtmWriter::write`]
/// runs in its own session, so one writer can serialize many graphs.
pub struct CtmWriter {
    pub(crate) config: WriterConfig,
    pub(crate) prefixes: PrefixTable,
    pub(crate) includes: Vec<String>,
    pub(crate) merge_maps: Vec<(String, String)>,
    pub(crate) templates: Vec<Template>,
    pub(crate) label_strategy: Box<dyn LabelStrategy>,
}

impl CtmWriter {
    /// Creates a writer with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::InvalidConfig`] if a value is out of range.
    pub fn new(config: WriterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            prefixes: PrefixTable::new(),
            includes: Vec::new(),
            merge_maps: Vec::new(),
            templates: Vec::new(),
            label_strategy: Box::new(PathSegmentLabels),
        })
    }

    /// Replaces the labelling of detected namespaces.
    #[must_use]
    pub fn with_label_strategy(mut self, strategy: impl LabelStrategy + 'static) -> Self {
        self.label_strategy = Box::new(strategy);
        self
    }

    /// The configuration this writer was created with.
    #[must_use]
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Binds `label` to `namespace` for every document this writer produces.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::InvalidConfig`] if `label` is not a CTM identifier
    /// and [`CtmError::PrefixConflict`] if it is already bound elsewhere.
    pub fn add_prefix(&mut self, label: &str, namespace: &str) -> Result<()> {
        if !identity::is_identifier(label) {
            return Err(CtmError::InvalidConfig {
                key: format!("prefix {label}"),
                message: "label is not a CTM identifier".to_owned(),
            });
        }
        self.prefixes.bind(label, namespace)
    }

    /// Adds an `%include` directive.
    pub fn add_include(&mut self, iri: impl Into<String>) {
        self.includes.push(iri.into());
    }

    /// Adds a `%mergemap` directive for a document in `notation`.
    pub fn add_merge_map(&mut self, iri: impl Into<String>, notation: impl Into<String>) {
        self.merge_maps.push((iri.into(), notation.into()));
    }

    /// Registers a template that is defined and invoked in every document.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::InvalidTemplate`] if the template cannot be
    /// written as CTM.
    pub fn add_template(&mut self, template: Template) -> Result<()> {
        template.validate()?;
        self.templates.push(template);
        Ok(())
    }

    /// Writes `graph` as one CTM document to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::StructuralConstraint`] for a malformed reserved
    /// association (before any output), [`CtmError::AdaptivityViolation`] if
    /// a template match cannot be extracted, and [`CtmError::Io`] if the sink
    /// fails. After an I/O error the sink may hold a truncated document.
    pub fn write<G, W>(&self, graph: &G, sink: &mut W) -> Result<WriteReport>
    where
        G: TopicMapSource + ?Sized,
        W: Write + ?Sized,
    {
        document::assemble(self, graph, sink)
    }

    /// Writes `graph` into a string.
    ///
    /// # Errors
    ///
    /// Same as [`CtmWriter::write`], except for I/O failures.
    pub fn write_to_string<G: TopicMapSource + ?Sized>(&self, graph: &G) -> Result<String> {
        let mut out = Vec::new();
        self.write(graph, &mut out)?;
        String::from_utf8(out).map_err(|e| {
            CtmError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}
