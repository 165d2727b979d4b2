//! Core topic-map model types.
//!
//! These types represent a topic map as typed Rust data. Constructs are owned
//! by per-kind arenas inside [`TopicMap`] and addressed by small copyable ids,
//! so a construct can be referenced from anywhere (types, scope themes, role
//! players, reifiers) without borrowing the map.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a [`Topic`] inside its [`TopicMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TopicId(pub usize);

/// Index of a [`Name`] inside its [`TopicMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NameId(pub usize);

/// Index of a [`Variant`] inside its [`TopicMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VariantId(pub usize);

/// Index of an [`Occurrence`] inside its [`TopicMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OccurrenceId(pub usize);

/// Index of an [`Association`] inside its [`TopicMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AssociationId(pub usize);

/// Index of a [`Role`] inside its [`TopicMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoleId(pub usize);

/// The three ways an IRI can identify a topic.
///
/// - `SubjectIdentifier`: the IRI indicates the subject (a PSI).
/// - `SubjectLocator`: the IRI *is* the subject (an information resource).
/// - `ItemIdentifier`: the IRI identifies the topic construct itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LocatorKind {
    /// Subject identifier.
    SubjectIdentifier,
    /// Subject locator.
    SubjectLocator,
    /// Item identifier.
    ItemIdentifier,
}

impl LocatorKind {
    /// Returns a short human-readable tag for the locator kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LocatorKind::SubjectIdentifier => "subject-identifier",
            LocatorKind::SubjectLocator => "subject-locator",
            LocatorKind::ItemIdentifier => "item-identifier",
        }
    }
}

/// A topic: a node representing one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Topic {
    /// Subject identifiers, in insertion order.
    pub subject_identifiers: Vec<String>,
    /// Subject locators, in insertion order.
    pub subject_locators: Vec<String>,
    /// Item identifiers, in insertion order.
    pub item_identifiers: Vec<String>,
    /// Direct types (`isa`), in insertion order.
    pub types: Vec<TopicId>,
    /// Names owned by this topic.
    pub names: Vec<NameId>,
    /// Occurrences owned by this topic.
    pub occurrences: Vec<OccurrenceId>,
}

impl Topic {
    /// Returns the locators of the given kind.
    #[must_use]
    pub fn locators(&self, kind: LocatorKind) -> &[String] {
        match kind {
            LocatorKind::SubjectIdentifier => &self.subject_identifiers,
            LocatorKind::SubjectLocator => &self.subject_locators,
            LocatorKind::ItemIdentifier => &self.item_identifiers,
        }
    }

    /// Returns true if the topic carries no locator at all.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.subject_identifiers.is_empty()
            && self.subject_locators.is_empty()
            && self.item_identifiers.is_empty()
    }
}

/// A topic name.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Name {
    /// Owning topic.
    pub parent: TopicId,
    /// Name type (the TMDM default name type when none was given).
    pub type_: TopicId,
    /// The name string.
    pub value: String,
    /// Scope themes.
    pub scope: Vec<TopicId>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
    /// Variants of this name.
    pub variants: Vec<VariantId>,
}

/// A variant name: an alternative form of a [`Name`] for a given scope.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Variant {
    /// Owning name.
    pub parent: NameId,
    /// Lexical value.
    pub value: String,
    /// Full datatype IRI.
    pub datatype: String,
    /// Scope themes (in addition to the parent name's scope).
    pub scope: Vec<TopicId>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}

/// An occurrence: a typed, datatyped property value of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Occurrence {
    /// Owning topic.
    pub parent: TopicId,
    /// Occurrence type.
    pub type_: TopicId,
    /// Lexical value.
    pub value: String,
    /// Full datatype IRI.
    pub datatype: String,
    /// Scope themes.
    pub scope: Vec<TopicId>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}

/// An n-ary association between topics.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Association {
    /// Association type.
    pub type_: TopicId,
    /// Roles, in insertion order.
    pub roles: Vec<RoleId>,
    /// Scope themes.
    pub scope: Vec<TopicId>,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}

/// A typed association member.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Role {
    /// Owning association.
    pub parent: AssociationId,
    /// Role type.
    pub type_: TopicId,
    /// Role player.
    pub player: TopicId,
    /// Reifying topic, if any.
    pub reifier: Option<TopicId>,
}

/// A construct that can be reified by a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Reifiable {
    /// The topic map itself.
    TopicMap,
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
}

/// An in-memory topic map.
///
/// All constructs are appended to arenas and never removed; ids stay valid for
/// the lifetime of the map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TopicMap {
    /// Reifier of the topic map itself.
    pub reifier: Option<TopicId>,
    topics: Vec<Topic>,
    names: Vec<Name>,
    variants: Vec<Variant>,
    occurrences: Vec<Occurrence>,
    associations: Vec<Association>,
    roles: Vec<Role>,
}

impl TopicMap {
    /// Creates an empty topic map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Returns the number of associations.
    #[must_use]
    pub fn association_count(&self) -> usize {
        self.associations.len()
    }

    /// Creates a topic without any locator.
    pub fn create_topic(&mut self) -> TopicId {
        self.topics.push(Topic::default());
        TopicId(self.topics.len() - 1)
    }

    /// Returns the topic carrying the given subject identifier, creating it if
    /// no such topic exists.
    pub fn create_topic_by_subject_identifier(&mut self, iri: &str) -> TopicId {
        if let Some(id) = self.find_by_locator(LocatorKind::SubjectIdentifier, iri) {
            return id;
        }
        let id = self.create_topic();
        self.add_subject_identifier(id, iri);
        id
    }

    /// Returns the topic carrying the given subject locator, creating it if no
    /// such topic exists.
    pub fn create_topic_by_subject_locator(&mut self, iri: &str) -> TopicId {
        if let Some(id) = self.find_by_locator(LocatorKind::SubjectLocator, iri) {
            return id;
        }
        let id = self.create_topic();
        self.add_subject_locator(id, iri);
        id
    }

    /// Returns the topic carrying the given item identifier, creating it if no
    /// such topic exists.
    pub fn create_topic_by_item_identifier(&mut self, iri: &str) -> TopicId {
        if let Some(id) = self.find_by_locator(LocatorKind::ItemIdentifier, iri) {
            return id;
        }
        let id = self.create_topic();
        self.add_item_identifier(id, iri);
        id
    }

    /// Looks up a topic by one of its locators. Returns `None` if not found.
    #[must_use]
    pub fn find_by_locator(&self, kind: LocatorKind, iri: &str) -> Option<TopicId> {
        self.topics
            .iter()
            .position(|t| t.locators(kind).iter().any(|l| l == iri))
            .map(TopicId)
    }

    /// Adds a subject identifier to a topic. Duplicates are ignored.
    pub fn add_subject_identifier(&mut self, topic: TopicId, iri: &str) {
        push_unique(&mut self.topics[topic.0].subject_identifiers, iri);
    }

    /// Adds a subject locator to a topic. Duplicates are ignored.
    pub fn add_subject_locator(&mut self, topic: TopicId, iri: &str) {
        push_unique(&mut self.topics[topic.0].subject_locators, iri);
    }

    /// Adds an item identifier to a topic. Duplicates are ignored.
    pub fn add_item_identifier(&mut self, topic: TopicId, iri: &str) {
        push_unique(&mut self.topics[topic.0].item_identifiers, iri);
    }

    /// Adds a direct type to a topic. Duplicates are ignored.
    pub fn add_type(&mut self, topic: TopicId, type_: TopicId) {
        let types = &mut self.topics[topic.0].types;
        if !types.contains(&type_) {
            types.push(type_);
        }
    }

    /// Creates a typed name on `topic`.
    pub fn create_name(
        &mut self,
        topic: TopicId,
        type_: TopicId,
        value: &str,
        scope: &[TopicId],
    ) -> NameId {
        self.names.push(Name {
            parent: topic,
            type_,
            value: value.to_owned(),
            scope: scope.to_vec(),
            reifier: None,
            variants: Vec::new(),
        });
        let id = NameId(self.names.len() - 1);
        self.topics[topic.0].names.push(id);
        id
    }

    /// Creates a name of the TMDM default name type on `topic`.
    pub fn create_default_name(&mut self, topic: TopicId, value: &str, scope: &[TopicId]) -> NameId {
        let type_ = self.create_topic_by_subject_identifier(iris::TOPIC_NAME);
        self.create_name(topic, type_, value, scope)
    }

    /// Creates a variant on `name`.
    pub fn create_variant(
        &mut self,
        name: NameId,
        value: &str,
        datatype: &str,
        scope: &[TopicId],
    ) -> VariantId {
        self.variants.push(Variant {
            parent: name,
            value: value.to_owned(),
            datatype: datatype.to_owned(),
            scope: scope.to_vec(),
            reifier: None,
        });
        let id = VariantId(self.variants.len() - 1);
        self.names[name.0].variants.push(id);
        id
    }

    /// Creates an occurrence on `topic`.
    pub fn create_occurrence(
        &mut self,
        topic: TopicId,
        type_: TopicId,
        value: &str,
        datatype: &str,
        scope: &[TopicId],
    ) -> OccurrenceId {
        self.occurrences.push(Occurrence {
            parent: topic,
            type_,
            value: value.to_owned(),
            datatype: datatype.to_owned(),
            scope: scope.to_vec(),
            reifier: None,
        });
        let id = OccurrenceId(self.occurrences.len() - 1);
        self.topics[topic.0].occurrences.push(id);
        id
    }

    /// Creates an association without roles.
    pub fn create_association(&mut self, type_: TopicId, scope: &[TopicId]) -> AssociationId {
        self.associations.push(Association {
            type_,
            roles: Vec::new(),
            scope: scope.to_vec(),
            reifier: None,
        });
        AssociationId(self.associations.len() - 1)
    }

    /// Adds a role to `association`.
    pub fn create_role(
        &mut self,
        association: AssociationId,
        type_: TopicId,
        player: TopicId,
    ) -> RoleId {
        self.roles.push(Role {
            parent: association,
            type_,
            player,
            reifier: None,
        });
        let id = RoleId(self.roles.len() - 1);
        self.associations[association.0].roles.push(id);
        id
    }

    /// Sets (or clears) the reifier of a construct.
    pub fn set_reifier(&mut self, construct: Reifiable, reifier: Option<TopicId>) {
        match construct {
            Reifiable::TopicMap => self.reifier = reifier,
            Reifiable::Name(id) => self.names[id.0].reifier = reifier,
            Reifiable::Variant(id) => self.variants[id.0].reifier = reifier,
            Reifiable::Occurrence(id) => self.occurrences[id.0].reifier = reifier,
            Reifiable::Association(id) => self.associations[id.0].reifier = reifier,
            Reifiable::Role(id) => self.roles[id.0].reifier = reifier,
        }
    }

    /// Records `instance isa type_` as a TMDM type-instance association
    /// instead of a direct type.
    pub fn create_type_instance_association(
        &mut self,
        type_: TopicId,
        instance: TopicId,
    ) -> AssociationId {
        let assoc_type = self.create_topic_by_subject_identifier(iris::TYPE_INSTANCE);
        let type_role = self.create_topic_by_subject_identifier(iris::TYPE);
        let instance_role = self.create_topic_by_subject_identifier(iris::INSTANCE);
        let assoc = self.create_association(assoc_type, &[]);
        self.create_role(assoc, type_role, type_);
        self.create_role(assoc, instance_role, instance);
        assoc
    }

    /// Records `subtype ako supertype` as a TMDM supertype-subtype association.
    pub fn create_supertype_subtype_association(
        &mut self,
        supertype: TopicId,
        subtype: TopicId,
    ) -> AssociationId {
        let assoc_type = self.create_topic_by_subject_identifier(iris::SUPERTYPE_SUBTYPE);
        let super_role = self.create_topic_by_subject_identifier(iris::SUPERTYPE);
        let sub_role = self.create_topic_by_subject_identifier(iris::SUBTYPE);
        let assoc = self.create_association(assoc_type, &[]);
        self.create_role(assoc, super_role, supertype);
        self.create_role(assoc, sub_role, subtype);
        assoc
    }

    pub(crate) fn topics_slice(&self) -> &[Topic] {
        &self.topics
    }

    pub(crate) fn names_slice(&self) -> &[Name] {
        &self.names
    }

    pub(crate) fn variants_slice(&self) -> &[Variant] {
        &self.variants
    }

    pub(crate) fn occurrences_slice(&self) -> &[Occurrence] {
        &self.occurrences
    }

    pub(crate) fn associations_slice(&self) -> &[Association] {
        &self.associations
    }

    pub(crate) fn roles_slice(&self) -> &[Role] {
        &self.roles
    }
}

fn push_unique(list: &mut Vec<String>, iri: &str) {
    if !list.iter().any(|l| l == iri) {
        list.push(iri.to_owned());
    }
}

/// Well-known IRI constants: TMDM reserved subject identifiers and XSD datatypes.
pub mod iris {
    /// TMDM model namespace; every reserved subject identifier starts with it.
    pub const TMDM: &str = "http://psi.topicmaps.org/iso13250/model/";
    /// Default name type.
    pub const TOPIC_NAME: &str = "http://psi.topicmaps.org/iso13250/model/topic-name";
    /// Type-instance association type.
    pub const TYPE_INSTANCE: &str = "http://psi.topicmaps.org/iso13250/model/type-instance";
    /// Type role of the type-instance association.
    pub const TYPE: &str = "http://psi.topicmaps.org/iso13250/model/type";
    /// Instance role of the type-instance association.
    pub const INSTANCE: &str = "http://psi.topicmaps.org/iso13250/model/instance";
    /// Supertype-subtype association type.
    pub const SUPERTYPE_SUBTYPE: &str =
        "http://psi.topicmaps.org/iso13250/model/supertype-subtype";
    /// Supertype role of the supertype-subtype association.
    pub const SUPERTYPE: &str = "http://psi.topicmaps.org/iso13250/model/supertype";
    /// Subtype role of the supertype-subtype association.
    pub const SUBTYPE: &str = "http://psi.topicmaps.org/iso13250/model/subtype";

    /// XSD namespace.
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
    /// `xsd:string`.
    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    /// `xsd:anyURI`.
    pub const XSD_ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
    /// `xsd:integer`.
    pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    /// `xsd:decimal`.
    pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    /// `xsd:boolean`.
    pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    /// `xsd:date`.
    pub const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    /// `xsd:dateTime`.
    pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

    /// Returns true if `iri` is one of the TMDM reserved subject identifiers.
    #[must_use]
    pub fn is_reserved(iri: &str) -> bool {
        iri.starts_with(TMDM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_identifier_lookup_is_get_or_create() {
        let mut tm = TopicMap::new();
        let a = tm.create_topic_by_subject_identifier("http://ex.org/a");
        let b = tm.create_topic_by_subject_identifier("http://ex.org/a");
        assert_eq!(a, b);
        assert_eq!(tm.topic_count(), 1);
    }

    #[test]
    fn default_name_uses_tmdm_type() {
        let mut tm = TopicMap::new();
        let t = tm.create_topic_by_subject_identifier("http://ex.org/a");
        let n = tm.create_default_name(t, "A", &[]);
        let name_type = tm.names_slice()[n.0].type_;
        assert_eq!(
            tm.topics_slice()[name_type.0].subject_identifiers,
            vec![iris::TOPIC_NAME.to_owned()]
        );
    }

    #[test]
    fn duplicate_locators_are_ignored() {
        let mut tm = TopicMap::new();
        let t = tm.create_topic();
        tm.add_item_identifier(t, "http://ex.org/#t");
        tm.add_item_identifier(t, "http://ex.org/#t");
        assert_eq!(tm.topics_slice()[t.0].item_identifiers.len(), 1);
        assert!(!tm.topics_slice()[t.0].is_anonymous());
    }

    #[test]
    fn reserved_iris() {
        assert!(iris::is_reserved(iris::TYPE_INSTANCE));
        assert!(!iris::is_reserved("http://ex.org/person"));
    }
}
