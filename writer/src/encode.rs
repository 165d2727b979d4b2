//! Construct encoders.
//!
//! Each encoder turns one graph construct into CTM statement text and records
//! what it wrote in the session's affected set. An encoder returns `None`
//! when a topic it must reference has no identity; the construct is then
//! skipped and logged, never half-written.
//!
//! The `*_text` helpers only assemble already-encoded parts and are shared
//! with template definitions.

use ctm_model::iris;
use ctm_model::{AssociationId, LocatorKind, NameId, OccurrenceId, RoleId, TopicId, TopicMapSource, VariantId};

use crate::affected::Construct;
use crate::buffer::CtmBuffer;
use crate::error::Result;
use crate::literal::{encode_literal, QuotePath};
use crate::session::WriteSession;
use crate::template::TemplateKind;

/// Outcome of writing one topic or association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitted {
    /// Nothing was written.
    Skipped,
    /// The construct was written, using `invocations` template invocations.
    Written {
        /// Number of template invocations emitted.
        invocations: usize,
    },
}

/// Returns true if `topic` is the TMDM default name type.
#[must_use]
pub fn is_default_name_type<G: TopicMapSource + ?Sized>(graph: &G, topic: TopicId) -> bool {
    graph
        .topic(topic)
        .subject_identifiers
        .iter()
        .any(|si| si == iris::TOPIC_NAME)
}

/// ` @ a, b`, or nothing for an empty scope.
#[must_use]
pub fn scope_text(themes: &[String]) -> String {
    if themes.is_empty() {
        String::new()
    } else {
        format!(" @ {}", themes.join(", "))
    }
}

/// ` ~ r`, or nothing.
#[must_use]
pub fn reifier_text(reifier: Option<&str>) -> String {
    reifier.map(|r| format!(" ~ {r}")).unwrap_or_default()
}

/// `(value @ s ~ r)`.
#[must_use]
pub fn variant_text(value: &str, scope: &str, reifier: &str) -> String {
    format!("({value}{scope}{reifier})")
}

/// `- type: value @ s ~ r (variant)*`; the type is omitted for default names.
#[must_use]
pub fn name_text(
    type_: Option<&str>,
    value: &str,
    scope: &str,
    reifier: &str,
    variants: &[String],
) -> String {
    let mut out = String::from("- ");
    if let Some(t) = type_ {
        out.push_str(t);
        out.push_str(": ");
    }
    out.push_str(value);
    out.push_str(scope);
    out.push_str(reifier);
    for v in variants {
        out.push(' ');
        out.push_str(v);
    }
    out
}

/// `type: value @ s ~ r`.
#[must_use]
pub fn occurrence_text(type_: &str, value: &str, scope: &str, reifier: &str) -> String {
    format!("{type_}: {value}{scope}{reifier}")
}

/// `type : player ~ r`.
#[must_use]
pub fn role_text(type_: &str, player: &str, reifier: &str) -> String {
    format!("{type_} : {player}{reifier}")
}

/// `type(role, …) @ s ~ r`.
#[must_use]
pub fn association_text(type_: &str, roles: &[String], scope: &str, reifier: &str) -> String {
    format!("{type_}({}){scope}{reifier}", roles.join(", "))
}

/// Resolves every theme, or returns `None` if one has no identity.
pub fn encode_scope<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    themes: &[TopicId],
) -> Option<String> {
    let mut resolved = Vec::with_capacity(themes.len());
    for &theme in themes {
        resolved.push(session.reference(theme)?);
    }
    Some(scope_text(&resolved))
}

/// Resolves a reifier. A reifier without identity is dropped with a warning;
/// the reified statement is still written.
pub fn encode_reifier<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    reifier: Option<TopicId>,
) -> String {
    let Some(topic) = reifier else {
        return String::new();
    };
    match session.reference(topic) {
        Some(r) => reifier_text(Some(&r)),
        None => {
            tracing::warn!(reifier = ?topic, "reifier has no identity, reification dropped");
            String::new()
        }
    }
}

/// Encodes a variant and marks it written.
pub fn encode_variant<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    id: VariantId,
) -> Option<String> {
    let graph = session.graph;
    let variant = graph.variant(id);
    let value = encode_literal(&variant.value, &variant.datatype, QuotePath::Block, &session.prefixes);
    let scope = encode_scope(session, &variant.scope)?;
    let reifier = encode_reifier(session, variant.reifier);
    session.affected.insert(Construct::Variant(id));
    Some(variant_text(&value, &scope, &reifier))
}

/// Encodes a name with its unwritten variants and marks them written.
pub fn encode_name<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    id: NameId,
) -> Option<String> {
    let graph = session.graph;
    let name = graph.name(id);
    let type_ = if is_default_name_type(graph, name.type_) {
        None
    } else {
        Some(session.reference(name.type_)?)
    };
    let value = encode_literal(&name.value, iris::XSD_STRING, QuotePath::Block, &session.prefixes);
    let scope = encode_scope(session, &name.scope)?;
    let reifier = encode_reifier(session, name.reifier);

    let mut variants = Vec::with_capacity(name.variants.len());
    for &v in &name.variants {
        if session.affected.contains(&Construct::Variant(v)) {
            continue;
        }
        match encode_variant(session, v) {
            Some(text) => variants.push(text),
            None => skipped(session, "variant", v),
        }
    }
    session.affected.insert(Construct::Name(id));
    Some(name_text(type_.as_deref(), &value, &scope, &reifier, &variants))
}

/// Encodes an occurrence and marks it written.
pub fn encode_occurrence<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    id: OccurrenceId,
) -> Option<String> {
    let graph = session.graph;
    let occurrence = graph.occurrence(id);
    let type_ = session.reference(occurrence.type_)?;
    let value = encode_literal(
        &occurrence.value,
        &occurrence.datatype,
        QuotePath::Block,
        &session.prefixes,
    );
    let scope = encode_scope(session, &occurrence.scope)?;
    let reifier = encode_reifier(session, occurrence.reifier);
    session.affected.insert(Construct::Occurrence(id));
    Some(occurrence_text(&type_, &value, &scope, &reifier))
}

/// Encodes a role. The caller marks it written together with its
/// association.
pub fn encode_role<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    id: RoleId,
) -> Option<String> {
    let graph = session.graph;
    let role = graph.role(id);
    let type_ = session.reference(role.type_)?;
    let player = session.reference(role.player)?;
    let reifier = encode_reifier(session, role.reifier);
    Some(role_text(&type_, &player, &reifier))
}

/// Encodes an association literally and marks it and its roles written.
pub fn encode_association<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    id: AssociationId,
) -> Option<String> {
    let graph = session.graph;
    let association = graph.association(id);
    let type_ = session.reference(association.type_)?;
    let mut roles = Vec::with_capacity(association.roles.len());
    for &r in &association.roles {
        roles.push(encode_role(session, r)?);
    }
    let scope = encode_scope(session, &association.scope)?;
    let reifier = encode_reifier(session, association.reifier);
    session.affected.insert(Construct::Association(id));
    session
        .affected
        .extend(association.roles.iter().map(|&r| Construct::Role(r)));
    Some(association_text(&type_, &roles, &scope, &reifier))
}

/// Writes the topic block of `topic`.
///
/// Reserved TMDM topics and topics without identity are skipped. Topic
/// templates are tried first; whatever they consume is not repeated in the
/// block.
///
/// # Errors
///
/// Propagates [`crate::CtmError::AdaptivityViolation`] from argument
/// extraction.
pub fn write_topic<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    buf: &mut CtmBuffer,
    topic: TopicId,
) -> Result<Emitted> {
    if session.is_reserved_topic(topic) {
        return Ok(Emitted::Skipped);
    }
    let Some(identity) = session.identity(topic) else {
        let data = session.graph.topic(topic);
        if !data.names.is_empty() || !data.occurrences.is_empty() {
            tracing::warn!(?topic, "topic has no identity, its block is skipped");
        }
        session.record_skip();
        return Ok(Emitted::Skipped);
    };
    session
        .affected
        .insert(Construct::Locator(topic, identity.kind, identity.iri.clone()));

    let invocations = invoke_topic_templates(session, topic)?;
    let graph = session.graph;
    let data = graph.topic(topic);
    let mut statements = Vec::new();

    for type_ in session.types_of(topic) {
        let construct = Construct::Type { instance: topic, type_ };
        if session.affected.contains(&construct) {
            continue;
        }
        match session.reference(type_) {
            Some(r) => {
                statements.push(format!("isa {r}"));
                session.affected.insert(construct);
            }
            None => skipped(session, "type", type_),
        }
    }
    for supertype in session.supertypes_of(topic) {
        let construct = Construct::Supertype {
            subtype: topic,
            supertype,
        };
        if session.affected.contains(&construct) {
            continue;
        }
        match session.reference(supertype) {
            Some(r) => {
                statements.push(format!("ako {r}"));
                session.affected.insert(construct);
            }
            None => skipped(session, "supertype", supertype),
        }
    }
    let invocation_count = invocations.len();
    statements.extend(invocations);

    for &name in &data.names {
        if session.affected.contains(&Construct::Name(name)) {
            continue;
        }
        match encode_name(session, name) {
            Some(text) => statements.push(text),
            None => skipped(session, "name", name),
        }
    }
    for &occurrence in &data.occurrences {
        if session.affected.contains(&Construct::Occurrence(occurrence)) {
            continue;
        }
        match encode_occurrence(session, occurrence) {
            Some(text) => statements.push(text),
            None => skipped(session, "occurrence", occurrence),
        }
    }

    for kind in [
        LocatorKind::SubjectIdentifier,
        LocatorKind::SubjectLocator,
        LocatorKind::ItemIdentifier,
    ] {
        for iri in data.locators(kind) {
            if kind == LocatorKind::ItemIdentifier
                && (!session.config.export_item_identifiers || session.is_system_locator(iri))
            {
                continue;
            }
            if !session
                .affected
                .insert(Construct::Locator(topic, kind, iri.clone()))
            {
                continue;
            }
            statements.push(session.locator_identity(kind, iri).to_string());
        }
    }

    buf.begin_block(&identity.to_string());
    for statement in &statements {
        buf.statement(statement);
    }
    buf.end_block();
    Ok(Emitted::Written {
        invocations: invocation_count,
    })
}

/// Writes `association` as template invocations or as a literal
/// association line.
///
/// Associations already written, consumed by a topic template, or folded into
/// `isa`/`ako` are skipped.
///
/// # Errors
///
/// Propagates [`crate::CtmError::AdaptivityViolation`] from argument
/// extraction.
pub fn write_association<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    buf: &mut CtmBuffer,
    association: AssociationId,
) -> Result<Emitted> {
    if session.affected.contains(&Construct::Association(association))
        || session.tmdm.is_pattern_association(association)
    {
        return Ok(Emitted::Skipped);
    }

    let templates = std::mem::take(&mut session.templates);
    let mut lines = Vec::new();
    let mut outcome = Ok(());
    for template in templates
        .iter()
        .filter(|t| t.kind == TemplateKind::Association)
    {
        if !template.is_adaptive_for_association(session, association) {
            continue;
        }
        match template.extract_association_arguments(session, association) {
            Ok(args) => lines.push(template.invocation(&args)),
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    session.templates = templates;
    outcome?;

    if !lines.is_empty() {
        let invocations = lines.len();
        for line in &lines {
            buf.line(line);
        }
        return Ok(Emitted::Written { invocations });
    }

    match encode_association(session, association) {
        Some(text) => {
            buf.line(&text);
            Ok(Emitted::Written { invocations: 0 })
        }
        None => {
            skipped(session, "association", association);
            Ok(Emitted::Skipped)
        }
    }
}

/// Runs every topic template against `topic` until none applies and returns
/// the invocation statements.
fn invoke_topic_templates<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    topic: TopicId,
) -> Result<Vec<String>> {
    let templates = std::mem::take(&mut session.templates);
    let result = (|| -> Result<Vec<String>> {
        let mut invocations = Vec::new();
        for template in templates
            .iter()
            .filter(|t| t.kind == TemplateKind::Topic && !t.entries.is_empty())
        {
            while template.is_adaptive_for_topic(session, topic) {
                let before = session.affected.len();
                let args = template.extract_topic_arguments(session, topic)?;
                // A match that consumed nothing would match again.
                if session.affected.len() == before {
                    break;
                }
                invocations.push(template.invocation(&args));
            }
        }
        Ok(invocations)
    })();
    session.templates = templates;
    result
}

fn skipped<G: TopicMapSource + ?Sized>(
    session: &mut WriteSession<'_, G>,
    what: &str,
    id: impl std::fmt::Debug,
) {
    tracing::warn!(construct = what, id = ?id, "references a topic without identity, skipped");
    session.record_skip();
}
