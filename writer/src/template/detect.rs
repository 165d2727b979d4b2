//! Frequency-based template mining.
//!
//! For a topic type, the names and occurrences of all its instances are
//! bucketed by structural signature: type and scope for names, type, datatype
//! and scope for occurrences. A construct's bucket key also carries its
//! ordinal among the same-signature constructs of its topic, so a topic with
//! two names of one type fills two buckets. A bucket reached by at least
//! `threshold` of the instances becomes a template entry with a fresh
//! variable. Association types are mined the same way over their roles.
//!
//! Only plain constructs are counted: names without variants or reifier,
//! occurrences and roles without reifier. A counted construct is then always
//! matched by the entry its bucket produces.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use ctm_model::{TopicId, TopicMapSource};

use super::entry::{AssociationEntry, Entry, NameEntry, OccurrenceEntry, RoleEntry, ScopeEntry, TopicRef};
use super::{Template, SUBJECT_VARIABLE};
use crate::encode::is_default_name_type;
use crate::session::WriteSession;

/// Counts keys in first-seen order.
#[derive(Debug)]
struct Buckets<K> {
    order: Vec<K>,
    counts: HashMap<K, usize>,
}

impl<K: Clone + Eq + Hash> Buckets<K> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            counts: HashMap::new(),
        }
    }

    fn add(&mut self, key: K) {
        let count = self.counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            self.order.push(key);
        }
        *count += 1;
    }

    /// Keys whose share of `total` reaches `threshold`, in first-seen order.
    fn relevant(&self, total: usize, threshold: f64) -> Vec<&K> {
        self.order
            .iter()
            .filter(|k| {
                let count = self.counts.get(*k).copied().unwrap_or(0);
                total > 0 && count as f64 / total as f64 >= threshold
            })
            .collect()
    }
}

/// Assigns ordinals to repeated keys within one construct.
#[derive(Debug)]
struct Ordinals<K> {
    seen: HashMap<K, usize>,
}

impl<K: Clone + Eq + Hash> Ordinals<K> {
    fn new() -> Self {
        Self {
            seen: HashMap::new(),
        }
    }

    fn next(&mut self, key: &K) -> usize {
        let n = self.seen.entry(key.clone()).or_insert(0);
        *n += 1;
        *n - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NameSignature {
    type_: TopicId,
    scope: Vec<TopicId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OccurrenceSignature {
    type_: TopicId,
    datatype: String,
    scope: Vec<TopicId>,
}

/// Mines templates for one write.
///
/// Template names and variable names are derived from local names of type
/// identities; the detector remembers every template name it handed out so
/// names stay unique across types.
#[derive(Debug)]
pub struct TemplateDetector {
    threshold: f64,
    template_names: HashSet<String>,
}

impl TemplateDetector {
    /// Creates a detector. `taken` are template names already in use.
    #[must_use]
    pub fn new(threshold: f64, taken: impl IntoIterator<Item = String>) -> Self {
        Self {
            threshold,
            template_names: taken.into_iter().collect(),
        }
    }

    /// Mines every topic and association type the configuration asks for.
    pub fn detect_all<G: TopicMapSource + ?Sized>(
        &mut self,
        session: &mut WriteSession<'_, G>,
    ) -> Vec<Template> {
        let mut templates = Vec::new();
        if session.config.template_detect_topics {
            for type_ in session.tmdm.topic_types(session.graph) {
                templates.extend(self.detect_topic_templates(session, type_));
            }
        }
        if session.config.template_detect_associations {
            for type_ in session.graph.association_types() {
                templates.extend(self.detect_association_templates(session, type_));
            }
        }
        tracing::debug!(count = templates.len(), "detected templates");
        templates
    }

    /// Mines a topic template for the instances of `type_`.
    ///
    /// The template starts with `isa type_` and is only returned if it ends
    /// up with more than two entries.
    pub fn detect_topic_templates<G: TopicMapSource + ?Sized>(
        &mut self,
        session: &mut WriteSession<'_, G>,
        type_: TopicId,
    ) -> Vec<Template> {
        let graph = session.graph;
        if session.is_reserved_topic(type_) {
            return Vec::new();
        }
        let Some(base) = self.local_name(session, type_) else {
            return Vec::new();
        };
        let instances: Vec<TopicId> = session
            .tmdm
            .instances_of(graph, type_)
            .into_iter()
            .filter(|&t| !session.is_reserved_topic(t))
            .collect();
        if instances.is_empty() {
            return Vec::new();
        }

        let mut names = Buckets::new();
        let mut occurrences = Buckets::new();
        for &instance in &instances {
            let topic = graph.topic(instance);
            let mut name_ordinals = Ordinals::new();
            for &id in &topic.names {
                let name = graph.name(id);
                if name.reifier.is_some() || !name.variants.is_empty() {
                    continue;
                }
                let sig = NameSignature {
                    type_: name.type_,
                    scope: name.scope.clone(),
                };
                let ordinal = name_ordinals.next(&sig);
                names.add((sig, ordinal));
            }
            let mut occurrence_ordinals = Ordinals::new();
            for &id in &topic.occurrences {
                let occurrence = graph.occurrence(id);
                if occurrence.reifier.is_some() {
                    continue;
                }
                let sig = OccurrenceSignature {
                    type_: occurrence.type_,
                    datatype: occurrence.datatype.clone(),
                    scope: occurrence.scope.clone(),
                };
                let ordinal = occurrence_ordinals.next(&sig);
                occurrences.add((sig, ordinal));
            }
        }

        let mut variables = VariableNames::new();
        let mut entries = vec![Entry::IsInstanceOf(TopicRef::Topic(type_))];
        for (sig, _) in names.relevant(instances.len(), self.threshold) {
            if !self.identifiable(session, sig.type_, &sig.scope) {
                continue;
            }
            let var_base = if is_default_name_type(graph, sig.type_) {
                "name".to_owned()
            } else {
                self.local_name(session, sig.type_).unwrap_or_else(|| "name".to_owned())
            };
            entries.push(Entry::Name(NameEntry {
                type_: TopicRef::Topic(sig.type_),
                value: variables.fresh(&var_base),
                scope: scope_entry(&sig.scope),
                reifier: None,
                variants: Vec::new(),
            }));
        }
        for (sig, _) in occurrences.relevant(instances.len(), self.threshold) {
            if !self.identifiable(session, sig.type_, &sig.scope) {
                continue;
            }
            let var_base = self
                .local_name(session, sig.type_)
                .unwrap_or_else(|| "value".to_owned());
            entries.push(Entry::Occurrence(OccurrenceEntry {
                type_: TopicRef::Topic(sig.type_),
                value: variables.fresh(&var_base),
                datatype: sig.datatype.clone(),
                scope: scope_entry(&sig.scope),
                reifier: None,
            }));
        }

        if entries.len() <= 2 {
            tracing::debug!(?type_, entries = entries.len(), "too few shared statements for a topic template");
            return Vec::new();
        }
        let name = self.template_name(&base);
        tracing::debug!(template = %name, instances = instances.len(), entries = entries.len(), "topic template");
        vec![Template::topic(name, entries)]
    }

    /// Mines the association template of `type_`.
    ///
    /// Unlike topic templates, one template is produced for every
    /// identifiable association type, whatever its role count.
    pub fn detect_association_templates<G: TopicMapSource + ?Sized>(
        &mut self,
        session: &mut WriteSession<'_, G>,
        type_: TopicId,
    ) -> Vec<Template> {
        let graph = session.graph;
        if session.is_reserved_topic(type_) {
            return Vec::new();
        }
        let Some(base) = self.local_name(session, type_) else {
            return Vec::new();
        };
        let associations: Vec<_> = graph
            .associations_of_type(type_)
            .into_iter()
            .filter(|&a| !session.tmdm.is_pattern_association(a))
            .collect();
        if associations.is_empty() {
            return Vec::new();
        }

        let mut roles = Buckets::new();
        for &id in &associations {
            let mut ordinals = Ordinals::new();
            for &r in &graph.association(id).roles {
                let role = graph.role(r);
                if role.reifier.is_some() {
                    continue;
                }
                let ordinal = ordinals.next(&role.type_);
                roles.add((role.type_, ordinal));
            }
        }

        let mut variables = VariableNames::new();
        let mut role_entries = Vec::new();
        for &(role_type, _) in roles.relevant(associations.len(), self.threshold) {
            let Some(var_base) = self.local_name(session, role_type) else {
                continue;
            };
            role_entries.push(RoleEntry {
                type_: TopicRef::Topic(role_type),
                player: TopicRef::Variable(variables.fresh(&var_base)),
                reifier: None,
            });
        }

        let name = self.template_name(&base);
        tracing::debug!(template = %name, associations = associations.len(), roles = role_entries.len(), "association template");
        vec![Template::association(
            name,
            AssociationEntry {
                type_: TopicRef::Topic(type_),
                roles: role_entries,
                scope: None,
                reifier: None,
            },
        )]
    }

    fn identifiable<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        type_: TopicId,
        scope: &[TopicId],
    ) -> bool {
        std::iter::once(&type_)
            .chain(scope)
            .all(|&t| session.identity(t).is_some())
    }

    /// Local part of the identity IRI of `topic`, as an identifier.
    fn local_name<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        topic: TopicId,
    ) -> Option<String> {
        let identity = session.identity(topic)?;
        let iri = identity.iri.trim_end_matches(['/', '#']);
        let local = iri.rsplit(['/', '#', ':']).next().unwrap_or(iri);
        Some(sanitize(local))
    }

    fn template_name(&mut self, base: &str) -> String {
        let stem = format!("{base}-template");
        let mut candidate = stem.clone();
        let mut suffix = 1usize;
        while self.template_names.contains(&candidate) {
            candidate = format!("{stem}{suffix}");
            suffix += 1;
        }
        self.template_names.insert(candidate.clone());
        candidate
    }
}

/// Allocates `$name`, `$name1`, … within one template.
#[derive(Debug)]
struct VariableNames {
    used: HashSet<String>,
}

impl VariableNames {
    fn new() -> Self {
        Self {
            used: HashSet::from([SUBJECT_VARIABLE.to_owned()]),
        }
    }

    fn fresh(&mut self, base: &str) -> String {
        let stem = format!("${base}");
        let mut candidate = stem.clone();
        let mut suffix = 1usize;
        while self.used.contains(&candidate) {
            candidate = format!("{stem}{suffix}");
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

fn scope_entry(scope: &[TopicId]) -> Option<ScopeEntry> {
    (!scope.is_empty()).then(|| ScopeEntry {
        themes: scope.iter().map(|&t| TopicRef::Topic(t)).collect(),
    })
}

/// Keeps identifier characters; prefixes `t` if the result does not start
/// with a letter or underscore.
fn sanitize(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    if !out.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        out.insert(0, 't');
    }
    out
}
