//! Prefix table and namespace auto-detection.
//!
//! A [`PrefixTable`] maps labels to namespace IRIs for one write. Labels are
//! unique and, once bound, never rebound. [`detect`] mines namespaces from
//! the subject identifiers and subject locators of a graph and binds a label
//! for each accepted one.

use std::collections::{BTreeMap, HashMap};

use ctm_model::iris::XSD;
use ctm_model::TopicMapSource;

use crate::error::{CtmError, Result};

/// Conventional label of the XML Schema datatype namespace.
pub const XSD_LABEL: &str = "xsd";

/// Label-to-namespace bindings of one write session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTable {
    by_label: BTreeMap<String, String>,
}

impl Default for PrefixTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTable {
    /// Creates a table with only `xsd` bound.
    #[must_use]
    pub fn new() -> Self {
        let mut by_label = BTreeMap::new();
        by_label.insert(XSD_LABEL.to_owned(), XSD.to_owned());
        Self { by_label }
    }

    /// Creates a table without any binding.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_label: BTreeMap::new(),
        }
    }

    /// Binds `label` to `namespace`.
    ///
    /// Rebinding a label to the namespace it already has is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::PrefixConflict`] if the label is bound to a
    /// different namespace.
    pub fn bind(&mut self, label: &str, namespace: &str) -> Result<()> {
        match self.by_label.get(label) {
            Some(existing) if existing == namespace => Ok(()),
            Some(existing) => Err(CtmError::PrefixConflict {
                label: label.to_owned(),
                existing: existing.clone(),
                requested: namespace.to_owned(),
            }),
            None => {
                self.by_label.insert(label.to_owned(), namespace.to_owned());
                Ok(())
            }
        }
    }

    /// Binds `namespace` under `label`, or under `label1`, `label2`, … if the
    /// label is taken. Returns the label the namespace ends up bound to; an
    /// already-bound namespace keeps its existing label.
    pub fn bind_unique(&mut self, label: &str, namespace: &str) -> String {
        if let Some(existing) = self.label_for(namespace) {
            return existing.to_owned();
        }
        let mut candidate = label.to_owned();
        let mut suffix = 1usize;
        while self.by_label.contains_key(&candidate) {
            candidate = format!("{label}{suffix}");
            suffix += 1;
        }
        self.by_label.insert(candidate.clone(), namespace.to_owned());
        candidate
    }

    /// Returns the namespace bound to `label`.
    #[must_use]
    pub fn namespace(&self, label: &str) -> Option<&str> {
        self.by_label.get(label).map(String::as_str)
    }

    /// Returns the label bound to `namespace`.
    #[must_use]
    pub fn label_for(&self, namespace: &str) -> Option<&str> {
        self.by_label
            .iter()
            .find(|(_, ns)| ns.as_str() == namespace)
            .map(|(label, _)| label.as_str())
    }

    /// Returns the binding with the longest namespace that is a literal
    /// prefix of `iri`.
    #[must_use]
    pub fn longest_match(&self, iri: &str) -> Option<(&str, &str)> {
        self.by_label
            .iter()
            .filter(|(_, ns)| iri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(label, ns)| (label.as_str(), ns.as_str()))
    }

    /// Iterates bindings ordered by label.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_label
            .iter()
            .map(|(label, ns)| (label.as_str(), ns.as_str()))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    /// Compresses `iri` to `label:local` if possible, else returns the
    /// bracketed absolute form.
    #[must_use]
    pub fn compress(&self, iri: &str) -> String {
        crate::identity::compress_iri(self, iri).0
    }
}

/// Strategy for generating a prefix label from a namespace IRI.
pub trait LabelStrategy {
    /// Returns a label candidate for `namespace`. Collisions are resolved by
    /// the caller.
    fn label(&self, namespace: &str) -> String;
}

/// Default [`LabelStrategy`]: the last path segment before any `#`, else a
/// token derived from the host name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathSegmentLabels;

impl LabelStrategy for PathSegmentLabels {
    fn label(&self, namespace: &str) -> String {
        let before_fragment = namespace.split('#').next().unwrap_or(namespace);
        let trimmed = before_fragment.trim_end_matches('/');
        let (host, path) = split_authority(trimmed);
        let segment = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("");
        let raw = if segment.is_empty() {
            host_token(host)
        } else {
            segment
        };
        sanitize_label(raw)
    }
}

/// Returns the namespace part of `iri`: everything up to and including the
/// later of the last `#` or last `/`. IRIs whose only separators belong to
/// the scheme (`http://host`) have no namespace.
#[must_use]
pub fn namespace_of(iri: &str) -> Option<&str> {
    let cut = iri.rfind(['#', '/'])?;
    if let Some(scheme_end) = iri.find("://") {
        if cut <= scheme_end + 2 {
            return None;
        }
    }
    Some(&iri[..=cut])
}

/// Mines candidate namespaces from all subject identifiers and subject
/// locators of `graph`.
///
/// Candidates seen only once are discarded. The rest are taken in descending
/// frequency (ties broken by namespace text) and accepted greedily unless a
/// candidate is a substring of an accepted one or contains one.
#[must_use]
pub fn detect_namespaces<G: TopicMapSource + ?Sized>(graph: &G) -> Vec<String> {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for id in graph.topic_ids() {
        let topic = graph.topic(id);
        for iri in topic
            .subject_identifiers
            .iter()
            .chain(topic.subject_locators.iter())
        {
            if let Some(ns) = namespace_of(iri) {
                *frequency.entry(ns).or_default() += 1;
            }
        }
    }

    let mut candidates: Vec<(&str, usize)> =
        frequency.into_iter().filter(|&(_, n)| n > 1).collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut accepted: Vec<String> = Vec::new();
    for (candidate, _) in candidates {
        let overlaps = accepted
            .iter()
            .any(|a| a.contains(candidate) || candidate.contains(a.as_str()));
        if !overlaps {
            accepted.push(candidate.to_owned());
        }
    }
    accepted
}

/// Detects namespaces in `graph` and binds a label for each in `table`.
///
/// Returns the new bindings as `(label, namespace)` pairs. Namespaces that are
/// already bound (including `xsd`) keep their label and are not returned.
pub fn detect<G: TopicMapSource + ?Sized>(
    graph: &G,
    strategy: &dyn LabelStrategy,
    table: &mut PrefixTable,
) -> Vec<(String, String)> {
    let mut bound = Vec::new();
    for namespace in detect_namespaces(graph) {
        if table.label_for(&namespace).is_some() {
            continue;
        }
        let label = table.bind_unique(&strategy.label(&namespace), &namespace);
        tracing::debug!(%label, %namespace, "detected prefix");
        bound.push((label, namespace));
    }
    bound
}

fn split_authority(iri: &str) -> (&str, &str) {
    let rest = match iri.find("://") {
        Some(i) => &iri[i + 3..],
        None => match iri.find(':') {
            Some(i) => &iri[i + 1..],
            None => iri,
        },
    };
    match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    }
}

fn host_token(host: &str) -> &str {
    let host = host.split(':').next().unwrap_or(host);
    let host = host.strip_prefix("www.").unwrap_or(host);
    host.split('.').next().unwrap_or(host)
}

fn sanitize_label(raw: &str) -> String {
    let mut label: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if !label
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    {
        label.insert_str(0, "ns");
    }
    label
}
