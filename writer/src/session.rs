//! State of one write call.
//!
//! Everything mutable during a write lives here: the prefix table, the
//! identity cache, the set of emitted constructs and the active templates.
//! A session is created per call and dropped afterwards, so the writer
//! itself stays immutable and reusable.

use ctm_model::{LocatorKind, TopicId, TopicMapSource};

use crate::affected::AffectedSet;
use crate::config::WriterConfig;
use crate::identity::{Identity, IdentityResolver};
use crate::prefix::PrefixTable;
use crate::template::Template;
use crate::tmdm::{self, TmdmIndex};

/// Mutable state of one write.
pub struct WriteSession<'a, G: TopicMapSource + ?Sized> {
    /// The graph being written.
    pub graph: &'a G,
    /// Writer configuration.
    pub config: &'a WriterConfig,
    /// Prefix bindings; complete before the first identity is resolved.
    pub prefixes: PrefixTable,
    /// Constructs emitted so far.
    pub affected: AffectedSet,
    /// Typing and subtyping decoded from reserved associations.
    pub tmdm: TmdmIndex,
    /// Templates available for invocation, most specific first.
    pub templates: Vec<Template>,
    identities: IdentityResolver,
    skipped: usize,
}

impl<'a, G: TopicMapSource + ?Sized> WriteSession<'a, G> {
    /// Creates a session over `graph`.
    #[must_use]
    pub fn new(
        graph: &'a G,
        config: &'a WriterConfig,
        prefixes: PrefixTable,
        tmdm: TmdmIndex,
    ) -> Self {
        Self {
            graph,
            config,
            prefixes,
            affected: AffectedSet::new(),
            tmdm,
            templates: Vec::new(),
            identities: IdentityResolver::new(config.engine_prefix.clone(), config.base_iri.clone()),
            skipped: 0,
        }
    }

    /// Resolves the identity of `topic`.
    pub fn identity(&mut self, topic: TopicId) -> Option<Identity> {
        self.identities.resolve(self.graph, &self.prefixes, topic)
    }

    /// Returns the reference text of `topic` (`ex:a`, `= <…>`, `^ id`).
    pub fn reference(&mut self, topic: TopicId) -> Option<String> {
        self.identity(topic).map(|id| id.to_string())
    }

    /// Identity of one specific locator, never in the local-identifier form.
    #[must_use]
    pub fn locator_identity(&self, kind: LocatorKind, iri: &str) -> Identity {
        Identity::of_locator(kind, iri, &self.prefixes, None)
    }

    /// Returns true if `iri` is an engine-assigned item identifier.
    #[must_use]
    pub fn is_system_locator(&self, iri: &str) -> bool {
        self.identities.is_system(iri)
    }

    /// Direct and derived types of `topic`.
    #[must_use]
    pub fn types_of(&self, topic: TopicId) -> Vec<TopicId> {
        self.tmdm.types_of(self.graph, topic)
    }

    /// Supertypes of `topic`.
    #[must_use]
    pub fn supertypes_of(&self, topic: TopicId) -> Vec<TopicId> {
        self.tmdm.supertypes(topic).to_vec()
    }

    /// Returns true if `topic` is a reserved TMDM topic.
    #[must_use]
    pub fn is_reserved_topic(&self, topic: TopicId) -> bool {
        tmdm::is_reserved_topic(self.graph, topic)
    }

    /// Compresses an IRI against the session prefixes.
    #[must_use]
    pub fn compress(&self, iri: &str) -> String {
        self.prefixes.compress(iri)
    }

    /// Counts a construct dropped because something it references has no
    /// identity.
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Number of constructs dropped so far.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
