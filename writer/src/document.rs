//! Document assembly.
//!
//! A write runs in fixed stages: encoding and version header (with the
//! document reifier), prefixes, includes, merge maps, template definitions,
//! topic blocks, associations and the trailing comment. Each stage is
//! rendered into a buffer and flushed to the sink before the next starts;
//! non-empty stages are separated by one blank line.
//!
//! Everything that can reject the graph (reserved association patterns,
//! template preparation and rendering of definitions) runs before the first
//! byte is written.

use std::io::Write;

use ctm_model::TopicMapSource;

use crate::buffer::CtmBuffer;
use crate::encode::{write_association, write_topic, Emitted};
use crate::error::Result;
use crate::identity::absolute;
use crate::prefix;
use crate::session::WriteSession;
use crate::template::detect::TemplateDetector;
use crate::template::merge::TemplateMerger;
use crate::template::{dependency_order, Template};
use crate::tmdm::TmdmIndex;
use crate::CtmWriter;

/// Counters of one completed write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Topic blocks written.
    pub topics: usize,
    /// Associations written, literally or as invocations.
    pub associations: usize,
    /// Template invocations written.
    pub invocations: usize,
    /// Template definitions written.
    pub templates_defined: usize,
    /// `%prefix` directives written.
    pub prefixes: usize,
    /// Constructs skipped because a referenced topic has no identity.
    pub skipped: usize,
}

/// Writes `graph` as one CTM document to `sink`.
pub(crate) fn assemble<G, W>(writer: &CtmWriter, graph: &G, sink: &mut W) -> Result<WriteReport>
where
    G: TopicMapSource + ?Sized,
    W: Write + ?Sized,
{
    let config = &writer.config;

    let mut prefixes = writer.prefixes.clone();
    if config.prefix_auto_detect {
        let bound = prefix::detect(graph, writer.label_strategy.as_ref(), &mut prefixes);
        tracing::debug!(detected = bound.len(), "prefix detection");
    }
    let tmdm = TmdmIndex::build(graph)?;
    let mut session = WriteSession::new(graph, config, prefixes, tmdm);
    let templates = prepare_templates(writer, &mut session);
    for template in &templates {
        template.validate()?;
    }
    session.templates = invocation_order(&templates);
    let definitions = if config.template_export {
        render_definitions(&templates, &mut session)?
    } else {
        Vec::new()
    };

    let mut report = WriteReport::default();
    let mut buf = CtmBuffer::new();

    buf.line("%encoding \"UTF-8\"");
    buf.line("%version 1.0");
    if let Some(reifier) = graph.reifier() {
        match session.reference(reifier) {
            Some(text) => buf.line(&format!("~ {text}")),
            None => {
                tracing::warn!(?reifier, "document reifier has no identity");
                session.record_skip();
            }
        }
    }
    sink.write_all(buf.take().as_bytes())?;

    for (label, namespace) in session.prefixes.iter() {
        buf.line(&format!("%prefix {label} {}", absolute(namespace)));
        report.prefixes += 1;
    }
    flush_stage(sink, &mut buf)?;

    for iri in &writer.includes {
        buf.line(&format!("%include {}", absolute(iri)));
    }
    flush_stage(sink, &mut buf)?;

    for (iri, notation) in &writer.merge_maps {
        buf.line(&format!("%mergemap {} {notation}", absolute(iri)));
    }
    flush_stage(sink, &mut buf)?;

    for definition in &definitions {
        if !buf.is_empty() {
            buf.blank();
        }
        buf.append(definition);
        report.templates_defined += 1;
    }
    flush_stage(sink, &mut buf)?;

    for topic in graph.topic_ids() {
        let mut block = CtmBuffer::new();
        if let Emitted::Written { invocations } = write_topic(&mut session, &mut block, topic)? {
            if !buf.is_empty() {
                buf.blank();
            }
            buf.append(&block.finish());
            report.topics += 1;
            report.invocations += invocations;
        }
    }
    flush_stage(sink, &mut buf)?;

    for association in graph.association_ids() {
        if let Emitted::Written { invocations } = write_association(&mut session, &mut buf, association)? {
            report.associations += 1;
            report.invocations += invocations;
        }
    }
    flush_stage(sink, &mut buf)?;

    buf.comment(&format!("generated by ctm-writer {}", env!("CARGO_PKG_VERSION")));
    flush_stage(sink, &mut buf)?;
    sink.flush()?;

    report.skipped = session.skipped();
    tracing::info!(
        topics = report.topics,
        associations = report.associations,
        invocations = report.invocations,
        templates = report.templates_defined,
        skipped = report.skipped,
        "wrote CTM document"
    );
    Ok(report)
}

/// Explicit templates, then detected ones, then the merge pass.
fn prepare_templates<G: TopicMapSource + ?Sized>(
    writer: &CtmWriter,
    session: &mut WriteSession<'_, G>,
) -> Vec<Template> {
    let config = session.config;
    let mut templates = writer.templates.clone();
    if config.template_auto_detect {
        let mut detector = TemplateDetector::new(
            config.template_relevance_threshold,
            templates.iter().map(|t| t.name.clone()),
        );
        templates.extend(detector.detect_all(session));
    }
    if config.template_merge {
        let before = templates.len();
        let mut merger = TemplateMerger::new(
            config.template_merge_threshold,
            config.template_merge_max_subset_size,
        );
        templates = merger.merge(templates);
        tracing::debug!(before, after = templates.len(), "merged templates");
    }
    templates
}

/// `def … end` blocks of the exported templates, invoked templates first.
fn render_definitions<G: TopicMapSource + ?Sized>(
    templates: &[Template],
    session: &mut WriteSession<'_, G>,
) -> Result<Vec<String>> {
    let config = session.config;
    let mut definitions = Vec::new();
    for template in dependency_order(templates) {
        if config.is_export_excluded(&template.name) {
            continue;
        }
        definitions.push(template.render(session)?);
    }
    Ok(definitions)
}

/// Templates covering more statements are tried first.
fn invocation_order(templates: &[Template]) -> Vec<Template> {
    let mut ordered = templates.to_vec();
    ordered.sort_by_key(|t| std::cmp::Reverse(t.flattened().len()));
    ordered
}

fn flush_stage<W: Write + ?Sized>(sink: &mut W, buf: &mut CtmBuffer) -> Result<()> {
    let text = buf.take();
    if !text.is_empty() {
        sink.write_all(b"\n")?;
        sink.write_all(text.as_bytes())?;
    }
    Ok(())
}
