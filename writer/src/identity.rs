//! Identity resolution and IRI compression.
//!
//! Every topic written to CTM is referenced through one canonical identity.
//! [`IdentityResolver::resolve`] picks it by a fixed priority:
//!
//! 1. the first subject identifier that is not a reserved TMDM identifier;
//! 2. the first subject locator;
//! 3. the first item identifier that was not assigned by the engine;
//! 4. a reserved or engine-assigned locator as a last resort.
//!
//! A topic without any locator has no identity and is skipped by callers as
//! an internal construct. Results are memoized for the rest of the write, so
//! the prefix table must be complete before the first resolution.

use std::collections::HashMap;
use std::fmt;

use ctm_model::iris;
use ctm_model::{LocatorKind, Topic, TopicId, TopicMapSource};

use crate::prefix::PrefixTable;

/// How the text of an identity was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityForm {
    /// `label:local`.
    QName,
    /// `<absolute-iri>`.
    Absolute,
    /// A bare document-local identifier (item identifiers under the base IRI).
    Local,
}

/// The resolved display form of a topic reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Which kind of locator the identity was built from.
    pub kind: LocatorKind,
    /// The source IRI.
    pub iri: String,
    /// Compressed, absolute or local text, without the kind marker.
    pub text: String,
    /// How `text` was produced.
    pub form: IdentityForm,
}

impl Identity {
    /// Builds the identity of a single locator.
    #[must_use]
    pub fn of_locator(
        kind: LocatorKind,
        iri: &str,
        prefixes: &PrefixTable,
        base_iri: Option<&str>,
    ) -> Self {
        if kind == LocatorKind::ItemIdentifier {
            if let Some(local) = base_iri.and_then(|base| local_identifier(iri, base)) {
                return Self {
                    kind,
                    iri: iri.to_owned(),
                    text: local.to_owned(),
                    form: IdentityForm::Local,
                };
            }
        }
        let (text, form) = compress_iri(prefixes, iri);
        Self {
            kind,
            iri: iri.to_owned(),
            text,
            form,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.form) {
            (LocatorKind::SubjectIdentifier, _) | (_, IdentityForm::Local) => {
                f.write_str(&self.text)
            }
            (LocatorKind::SubjectLocator, _) => write!(f, "= {}", self.text),
            (LocatorKind::ItemIdentifier, _) => write!(f, "^ {}", self.text),
        }
    }
}

/// Resolves and memoizes topic identities for one write.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    cache: HashMap<TopicId, Option<Identity>>,
    engine_prefix: Option<String>,
    base_iri: Option<String>,
}

impl IdentityResolver {
    /// Creates a resolver. Item identifiers starting with `engine_prefix` are
    /// system locators; item identifiers under `base_iri` become local ids.
    #[must_use]
    pub fn new(engine_prefix: Option<String>, base_iri: Option<String>) -> Self {
        Self {
            cache: HashMap::new(),
            engine_prefix,
            base_iri,
        }
    }

    /// Returns the identity of `topic`, or `None` if it has no locator.
    pub fn resolve<G: TopicMapSource + ?Sized>(
        &mut self,
        graph: &G,
        prefixes: &PrefixTable,
        topic: TopicId,
    ) -> Option<Identity> {
        if let Some(cached) = self.cache.get(&topic) {
            return cached.clone();
        }
        let resolved = self
            .select_locator(graph.topic(topic))
            .map(|(kind, iri)| Identity::of_locator(kind, iri, prefixes, self.base_iri.as_deref()));
        if resolved.is_none() {
            tracing::debug!(?topic, "topic has no identity");
        }
        self.cache.insert(topic, resolved.clone());
        resolved
    }

    /// Applies the identity priority to the locators of `topic`.
    #[must_use]
    pub fn select_locator<'t>(&self, topic: &'t Topic) -> Option<(LocatorKind, &'t str)> {
        if let Some(si) = topic
            .subject_identifiers
            .iter()
            .find(|iri| !iris::is_reserved(iri))
        {
            return Some((LocatorKind::SubjectIdentifier, si.as_str()));
        }
        if let Some(sl) = topic.subject_locators.first() {
            return Some((LocatorKind::SubjectLocator, sl.as_str()));
        }
        if let Some(ii) = topic.item_identifiers.iter().find(|iri| !self.is_system(iri)) {
            return Some((LocatorKind::ItemIdentifier, ii.as_str()));
        }
        if let Some(si) = topic.subject_identifiers.first() {
            return Some((LocatorKind::SubjectIdentifier, si.as_str()));
        }
        topic
            .item_identifiers
            .first()
            .map(|ii| (LocatorKind::ItemIdentifier, ii.as_str()))
    }

    /// Returns true if `iri` was assigned by the engine.
    #[must_use]
    pub fn is_system(&self, iri: &str) -> bool {
        self.engine_prefix
            .as_deref()
            .is_some_and(|prefix| !prefix.is_empty() && iri.starts_with(prefix))
    }

    /// The configured base IRI.
    #[must_use]
    pub fn base_iri(&self) -> Option<&str> {
        self.base_iri.as_deref()
    }

    /// Number of memoized topics.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

/// Compresses `iri` against `prefixes`.
///
/// The local part is percent-encoded first; if the encoded text contains `%`
/// or `,`, is not a plain name, or no namespace matched, the bracketed
/// absolute form is returned instead.
#[must_use]
pub fn compress_iri(prefixes: &PrefixTable, iri: &str) -> (String, IdentityForm) {
    if let Some((label, namespace)) = prefixes.longest_match(iri) {
        let encoded = escape_local_part(&iri[namespace.len()..]);
        if !encoded.contains(['%', ',']) && is_qname_local(&encoded) {
            return (format!("{label}:{encoded}"), IdentityForm::QName);
        }
    }
    (absolute(iri), IdentityForm::Absolute)
}

/// Wraps `iri` in angle brackets, percent-encoding characters that cannot
/// appear inside an IRI reference.
#[must_use]
pub fn absolute(iri: &str) -> String {
    let mut out = String::with_capacity(iri.len() + 2);
    out.push('<');
    for c in iri.chars() {
        if c.is_whitespace() || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`') {
            percent_encode_char(c, &mut out);
        } else {
            out.push(c);
        }
    }
    out.push('>');
    out
}

/// Percent-encodes the characters a QName local part may not contain.
#[must_use]
pub fn escape_local_part(local: &str) -> String {
    let mut out = String::with_capacity(local.len());
    for c in local.chars() {
        if needs_escape(c) {
            percent_encode_char(c, &mut out);
        } else {
            out.push(c);
        }
    }
    out
}

fn needs_escape(c: char) -> bool {
    !c.is_ascii()
        || c.is_whitespace()
        || c.is_ascii_control()
        || matches!(
            c,
            '"' | '\''
                | '('
                | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '<'
                | '>'
                | '&'
                | '#'
                | '@'
                | '~'
                | '^'
                | '='
                | ';'
                | '|'
                | '\\'
                | '`'
        )
}

fn percent_encode_char(c: char, out: &mut String) {
    let mut bytes = [0u8; 4];
    for b in c.encode_utf8(&mut bytes).bytes() {
        out.push_str(&format!("%{b:02X}"));
    }
}

/// Returns true if `local` can stand after `label:` in a QName.
fn is_qname_local(local: &str) -> bool {
    !local.is_empty()
        && !local.ends_with('.')
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Returns the fragment of `iri` if it is `<base>#fragment` and the fragment
/// is a CTM identifier.
fn local_identifier<'i>(iri: &'i str, base: &str) -> Option<&'i str> {
    let fragment = iri.strip_prefix(base)?.strip_prefix('#')?;
    is_identifier(fragment).then_some(fragment)
}

/// Returns true if `s` is a bare CTM identifier that is not a keyword.
#[must_use]
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        && !matches!(s, "isa" | "ako" | "def" | "end")
}
