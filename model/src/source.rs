//! Read-only access to a topic-map graph.
//!
//! [`TopicMapSource`] is the capability a serializer consumes: enumeration of
//! topics and associations, per-construct records, and a small type index.
//! [`TopicMap`] implements it directly; other stores can implement it over
//! their own storage.

use std::collections::HashSet;

use crate::model::{
    Association, AssociationId, LocatorKind, Name, NameId, Occurrence, OccurrenceId, Role,
    RoleId, Topic, TopicId, TopicMap, Variant, VariantId,
};

/// Read-only view of a topic-map graph.
///
/// Record accessors take ids obtained from the same source; passing a foreign
/// id is a caller bug.
pub trait TopicMapSource {
    /// All topic ids, in a stable order.
    fn topic_ids(&self) -> Vec<TopicId>;

    /// All association ids, in a stable order.
    fn association_ids(&self) -> Vec<AssociationId>;

    /// The reifier of the topic map itself.
    fn reifier(&self) -> Option<TopicId>;

    /// Returns the topic record.
    fn topic(&self, id: TopicId) -> &Topic;

    /// Returns the name record.
    fn name(&self, id: NameId) -> &Name;

    /// Returns the variant record.
    fn variant(&self, id: VariantId) -> &Variant;

    /// Returns the occurrence record.
    fn occurrence(&self, id: OccurrenceId) -> &Occurrence;

    /// Returns the association record.
    fn association(&self, id: AssociationId) -> &Association;

    /// Returns the role record.
    fn role(&self, id: RoleId) -> &Role;

    /// Looks up a topic by subject identifier. Returns `None` if not found.
    fn topic_by_subject_identifier(&self, iri: &str) -> Option<TopicId> {
        self.topic_ids().into_iter().find(|&id| {
            self.topic(id)
                .locators(LocatorKind::SubjectIdentifier)
                .iter()
                .any(|l| l == iri)
        })
    }

    /// All distinct topic types that have at least one direct instance, in
    /// first-seen order.
    fn topic_types(&self) -> Vec<TopicId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in self.topic_ids() {
            for &type_ in &self.topic(id).types {
                if seen.insert(type_) {
                    out.push(type_);
                }
            }
        }
        out
    }

    /// All direct instances of `type_`.
    fn instances_of(&self, type_: TopicId) -> Vec<TopicId> {
        self.topic_ids()
            .into_iter()
            .filter(|&id| self.topic(id).types.contains(&type_))
            .collect()
    }

    /// All distinct association types, in first-seen order.
    fn association_types(&self) -> Vec<TopicId> {
        let mut seen = HashSet::new();
        self.association_ids()
            .into_iter()
            .map(|id| self.association(id).type_)
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// All associations of type `type_`.
    fn associations_of_type(&self, type_: TopicId) -> Vec<AssociationId> {
        self.association_ids()
            .into_iter()
            .filter(|&id| self.association(id).type_ == type_)
            .collect()
    }
}

impl TopicMapSource for TopicMap {
    fn topic_ids(&self) -> Vec<TopicId> {
        (0..self.topics_slice().len()).map(TopicId).collect()
    }

    fn association_ids(&self) -> Vec<AssociationId> {
        (0..self.associations_slice().len())
            .map(AssociationId)
            .collect()
    }

    fn reifier(&self) -> Option<TopicId> {
        self.reifier
    }

    fn topic(&self, id: TopicId) -> &Topic {
        &self.topics_slice()[id.0]
    }

    fn name(&self, id: NameId) -> &Name {
        &self.names_slice()[id.0]
    }

    fn variant(&self, id: VariantId) -> &Variant {
        &self.variants_slice()[id.0]
    }

    fn occurrence(&self, id: OccurrenceId) -> &Occurrence {
        &self.occurrences_slice()[id.0]
    }

    fn association(&self, id: AssociationId) -> &Association {
        &self.associations_slice()[id.0]
    }

    fn role(&self, id: RoleId) -> &Role {
        &self.roles_slice()[id.0]
    }

    fn topic_by_subject_identifier(&self, iri: &str) -> Option<TopicId> {
        self.find_by_locator(LocatorKind::SubjectIdentifier, iri)
    }
}
