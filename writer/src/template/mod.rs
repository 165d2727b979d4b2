//! CTM templates.
//!
//! A [`Template`] is a named list of [`Entry`] statements with `$variable`
//! placeholders. Topic templates describe statements about an implicit subject
//! `$topic` and are invoked inside topic blocks; association templates
//! describe one association and are invoked at the top level.
//!
//! Templates come from three places: the caller
//! ([`crate::CtmWriter::add_template`]), the [`detect`] miner and the
//! [`merge`] optimizer. Matching a template against graph constructs lives in
//! [`matching`].

pub mod detect;
pub mod entry;
pub mod matching;
pub mod merge;

use std::collections::HashSet;

use ctm_model::{LocatorKind, TopicMapSource};

pub use entry::{
    AssociationEntry, Entry, IdentifierEntry, InvocationEntry, NameEntry, OccurrenceEntry,
    ReifierEntry, RoleEntry, ScopeEntry, TopicEntry, TopicRef, VariantEntry,
};

use crate::buffer::{indent_lines, CtmBuffer, INDENT};
use crate::encode;
use crate::error::{CtmError, Result};
use crate::identity::is_identifier;
use crate::literal::{encode_literal, is_variable, quote, QuotePath};
use crate::session::WriteSession;

/// Name of the implicit subject parameter of topic templates.
pub const SUBJECT_VARIABLE: &str = "$topic";

/// What a template is invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateKind {
    /// Invoked inside a topic block; `$topic` is the block's topic.
    Topic,
    /// Invoked in place of an association.
    Association,
}

/// A named, parameterized CTM template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Template {
    /// Template name; a CTM identifier.
    pub name: String,
    /// Invocation site.
    pub kind: TemplateKind,
    /// Body statements, in order.
    pub entries: Vec<Entry>,
}

impl Template {
    /// Creates a topic template.
    #[must_use]
    pub fn topic(name: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            name: name.into(),
            kind: TemplateKind::Topic,
            entries,
        }
    }

    /// Creates an association template around a single association entry.
    #[must_use]
    pub fn association(name: impl Into<String>, association: AssociationEntry) -> Self {
        Self {
            name: name.into(),
            kind: TemplateKind::Association,
            entries: vec![Entry::Association(association)],
        }
    }

    /// The `$` tokens of all entries, in order, without duplicates and
    /// without [`SUBJECT_VARIABLE`].
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        let mut all = Vec::new();
        for entry in &self.entries {
            entry.collect_variables(&mut all);
        }
        let mut seen = HashSet::new();
        all.into_iter()
            .filter(|v| v != SUBJECT_VARIABLE && seen.insert(v.clone()))
            .collect()
    }

    /// The parameter list of the definition: `$topic` first for topic
    /// templates, followed by [`Self::variables`].
    #[must_use]
    pub fn parameters(&self) -> Vec<String> {
        let mut params = Vec::new();
        if self.kind == TemplateKind::Topic {
            params.push(SUBJECT_VARIABLE.to_owned());
        }
        params.extend(self.variables());
        params
    }

    /// Entries with nested invocations and topic groups inlined.
    #[must_use]
    pub fn flattened(&self) -> Vec<&Entry> {
        let mut out = Vec::new();
        flatten(&self.entries, &mut out);
        out
    }

    /// Templates invoked directly by this one.
    #[must_use]
    pub fn nested(&self) -> Vec<&Template> {
        fn walk<'t>(entries: &'t [Entry], out: &mut Vec<&'t Template>) {
            for entry in entries {
                match entry {
                    Entry::Invocation(inv) => out.push(&inv.template),
                    Entry::Topic(group) => walk(&group.entries, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.entries, &mut out);
        out
    }

    /// Invocation text `name(arg, …)`.
    #[must_use]
    pub fn invocation(&self, arguments: &[String]) -> String {
        format!("{}({})", self.name, arguments.join(", "))
    }

    /// Checks that the template can be written and matched.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::InvalidTemplate`] if the name is not a CTM
    /// identifier, a topic template has no statements once flattened, holds
    /// an empty topic group, has a variant, role, scope or reifier entry at
    /// the top level or invokes an association template, or an association
    /// template is anything but a single association entry.
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.name) {
            return Err(self.invalid("name is not a CTM identifier"));
        }
        match self.kind {
            TemplateKind::Topic => {
                // A template matching nothing would match every topic forever.
                if self.flattened().is_empty() {
                    return Err(self.invalid("topic template has no statements"));
                }
                self.validate_topic_entries(&self.entries)
            }
            TemplateKind::Association => match self.entries.as_slice() {
                [Entry::Association(_)] => Ok(()),
                _ => Err(self.invalid("an association template holds exactly one association entry")),
            },
        }
    }

    fn validate_topic_entries(&self, entries: &[Entry]) -> Result<()> {
        for entry in entries {
            match entry {
                Entry::Variant(_) | Entry::Role(_) | Entry::Scope(_) | Entry::Reifier(_) => {
                    return Err(self.invalid(&format!(
                        "{} entry outside of the statement it belongs to",
                        entry.kind_name()
                    )));
                }
                Entry::Invocation(inv) => {
                    if inv.template.kind != TemplateKind::Topic {
                        return Err(self.invalid("a topic template can only invoke topic templates"));
                    }
                    inv.template.validate()?;
                }
                Entry::Topic(group) => {
                    if group.entries.is_empty() {
                        return Err(self.invalid("empty topic group"));
                    }
                    self.validate_topic_entries(&group.entries)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> CtmError {
        CtmError::InvalidTemplate {
            template: self.name.clone(),
            reason: reason.to_owned(),
        }
    }

    /// Renders the `def … end` block of this template.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::InvalidTemplate`] if a fixed topic of the body has
    /// no identity.
    pub fn render<G: TopicMapSource + ?Sized>(&self, session: &mut WriteSession<'_, G>) -> Result<String> {
        let mut subject = Vec::new();
        let mut associations = Vec::new();
        for entry in self.entries.iter().flat_map(top_level) {
            match entry {
                Entry::Association(a) => associations.push(self.association_text(session, a)?),
                other => subject.push(self.statement_text(session, other)?),
            }
        }

        let mut body = CtmBuffer::new();
        if !subject.is_empty() {
            body.begin_block(SUBJECT_VARIABLE);
            for statement in &subject {
                body.statement(statement);
            }
        }
        for line in &associations {
            body.line(line);
        }

        let mut out = format!("def {}({})\n", self.name, self.parameters().join(", "));
        out.push_str(&indent_lines(&body.finish(), INDENT));
        out.push_str("end\n");
        Ok(out)
    }

    fn statement_text<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        entry: &Entry,
    ) -> Result<String> {
        Ok(match entry {
            Entry::IsInstanceOf(t) => format!("isa {}", self.topic_text(session, t)?),
            Entry::AKindOf(t) => format!("ako {}", self.topic_text(session, t)?),
            Entry::Name(n) => {
                let type_ = match &n.type_ {
                    TopicRef::Topic(id) if encode::is_default_name_type(session.graph, *id) => None,
                    other => Some(self.topic_text(session, other)?),
                };
                let value = if is_variable(&n.value) {
                    n.value.clone()
                } else {
                    quote(&n.value, QuotePath::Block)
                };
                let scope = self.scope_text(session, n.scope.as_ref())?;
                let reifier = self.reifier_text(session, n.reifier.as_ref())?;
                let mut variants = Vec::with_capacity(n.variants.len());
                for v in &n.variants {
                    let value = encode_literal(&v.value, &v.datatype, QuotePath::Block, &session.prefixes);
                    let scope = self.scope_text(session, v.scope.as_ref())?;
                    let reifier = self.reifier_text(session, v.reifier.as_ref())?;
                    variants.push(encode::variant_text(&value, &scope, &reifier));
                }
                encode::name_text(type_.as_deref(), &value, &scope, &reifier, &variants)
            }
            Entry::Occurrence(o) => {
                let type_ = self.topic_text(session, &o.type_)?;
                let value = encode_literal(&o.value, &o.datatype, QuotePath::Block, &session.prefixes);
                let scope = self.scope_text(session, o.scope.as_ref())?;
                let reifier = self.reifier_text(session, o.reifier.as_ref())?;
                encode::occurrence_text(&type_, &value, &scope, &reifier)
            }
            Entry::Identifier(i) => {
                let text = if is_variable(&i.value) {
                    i.value.clone()
                } else {
                    session.locator_identity(LocatorKind::SubjectIdentifier, &i.value).text
                };
                match i.kind {
                    LocatorKind::SubjectIdentifier => text,
                    LocatorKind::SubjectLocator => format!("= {text}"),
                    LocatorKind::ItemIdentifier => format!("^ {text}"),
                }
            }
            Entry::Invocation(inv) => inv.template.invocation(&inv.template.variables()),
            other => {
                return Err(self.invalid(&format!(
                    "{} entry outside of the statement it belongs to",
                    other.kind_name()
                )))
            }
        })
    }

    fn association_text<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        a: &AssociationEntry,
    ) -> Result<String> {
        let type_ = self.topic_text(session, &a.type_)?;
        let mut roles = Vec::with_capacity(a.roles.len());
        for r in &a.roles {
            let role_type = self.topic_text(session, &r.type_)?;
            let player = self.topic_text(session, &r.player)?;
            let reifier = self.reifier_text(session, r.reifier.as_ref())?;
            roles.push(encode::role_text(&role_type, &player, &reifier));
        }
        let scope = self.scope_text(session, a.scope.as_ref())?;
        let reifier = self.reifier_text(session, a.reifier.as_ref())?;
        Ok(encode::association_text(&type_, &roles, &scope, &reifier))
    }

    fn topic_text<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        topic: &TopicRef,
    ) -> Result<String> {
        match topic {
            TopicRef::Variable(v) => Ok(v.clone()),
            TopicRef::Topic(id) => session
                .reference(*id)
                .ok_or_else(|| self.invalid(&format!("topic {id:?} has no identity"))),
        }
    }

    fn scope_text<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        scope: Option<&ScopeEntry>,
    ) -> Result<String> {
        let mut themes = Vec::new();
        for theme in scope.map(|s| s.themes.as_slice()).unwrap_or_default() {
            themes.push(self.topic_text(session, theme)?);
        }
        Ok(encode::scope_text(&themes))
    }

    fn reifier_text<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        reifier: Option<&ReifierEntry>,
    ) -> Result<String> {
        let text = match reifier {
            Some(r) => Some(self.topic_text(session, &r.reifier)?),
            None => None,
        };
        Ok(encode::reifier_text(text.as_deref()))
    }
}

/// Orders `templates` so every template follows the templates it invokes.
/// Templates reachable only through invocations are included once.
#[must_use]
pub fn dependency_order(templates: &[Template]) -> Vec<&Template> {
    fn visit<'t>(t: &'t Template, seen: &mut HashSet<&'t str>, out: &mut Vec<&'t Template>) {
        if !seen.insert(t.name.as_str()) {
            return;
        }
        for nested in t.nested() {
            visit(nested, seen, out);
        }
        out.push(t);
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for t in templates {
        visit(t, &mut seen, &mut out);
    }
    out
}

fn flatten<'e>(entries: &'e [Entry], out: &mut Vec<&'e Entry>) {
    for entry in entries {
        match entry {
            Entry::Invocation(inv) => flatten(&inv.template.entries, out),
            Entry::Topic(group) => flatten(&group.entries, out),
            other => out.push(other),
        }
    }
}

/// Top-level statements with topic groups inlined; nested invocations stay.
fn top_level(entry: &Entry) -> Vec<&Entry> {
    match entry {
        Entry::Topic(group) => group.entries.iter().flat_map(top_level).collect(),
        other => vec![other],
    }
}
