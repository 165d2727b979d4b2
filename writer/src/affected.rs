//! Set of constructs already written during one write.

use std::collections::HashSet;

use ctm_model::{AssociationId, LocatorKind, NameId, OccurrenceId, RoleId, TopicId, VariantId};

/// A graph construct that can be emitted at most once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Construct {
    /// A topic name.
    Name(NameId),
    /// A variant name.
    Variant(VariantId),
    /// An occurrence.
    Occurrence(OccurrenceId),
    /// An association.
    Association(AssociationId),
    /// An association role.
    Role(RoleId),
    /// A locator of a topic.
    Locator(TopicId, LocatorKind, String),
    /// `instance isa type`.
    Type {
        /// The instance.
        instance: TopicId,
        /// The type.
        type_: TopicId,
    },
    /// `subtype ako supertype`.
    Supertype {
        /// The subtype.
        subtype: TopicId,
        /// The supertype.
        supertype: TopicId,
    },
}

/// Constructs emitted so far. Monotonic: entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct AffectedSet {
    inner: HashSet<Construct>,
}

impl AffectedSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `construct`. Returns false if it was already recorded.
    pub fn insert(&mut self, construct: Construct) -> bool {
        self.inner.insert(construct)
    }

    /// Records every construct of `constructs`.
    pub fn extend(&mut self, constructs: impl IntoIterator<Item = Construct>) {
        self.inner.extend(constructs);
    }

    /// Returns true if `construct` was already recorded.
    #[must_use]
    pub fn contains(&self, construct: &Construct) -> bool {
        self.inner.contains(construct)
    }

    /// Number of recorded constructs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
