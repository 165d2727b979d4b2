//! Decoding of the two reserved TMDM association patterns.
//!
//! Typing and subtyping may be stored as ordinary associations typed by the
//! TMDM `type-instance` and `supertype-subtype` subject identifiers. CTM has
//! dedicated `isa` and `ako` statements for them, so the writer folds such
//! associations into the topic blocks of the instance (or subtype) and never
//! writes them as associations.
//!
//! An association of a reserved type must have exactly one player for each of
//! the two reserved roles. An association that satisfies this but carries a
//! scope, a reifier, reified roles or extra roles cannot be expressed as `isa`
//! or `ako` and stays an ordinary association.

use std::collections::{HashMap, HashSet};

use ctm_model::iris;
use ctm_model::{AssociationId, TopicId, TopicMapSource};

use crate::error::{CtmError, Result};

/// One reserved association pattern: association type plus its two roles.
#[derive(Debug, Clone, Copy)]
struct Pattern {
    association: &'static str,
    /// Role played by the type (or supertype).
    general: &'static str,
    /// Role played by the instance (or subtype).
    specific: &'static str,
}

const TYPE_INSTANCE: Pattern = Pattern {
    association: iris::TYPE_INSTANCE,
    general: iris::TYPE,
    specific: iris::INSTANCE,
};

const SUPERTYPE_SUBTYPE: Pattern = Pattern {
    association: iris::SUPERTYPE_SUBTYPE,
    general: iris::SUPERTYPE,
    specific: iris::SUBTYPE,
};

/// Typing and subtyping derived from reserved associations.
#[derive(Debug, Clone, Default)]
pub struct TmdmIndex {
    derived_types: HashMap<TopicId, Vec<TopicId>>,
    supertypes: HashMap<TopicId, Vec<TopicId>>,
    patterns: HashSet<AssociationId>,
}

impl TmdmIndex {
    /// Scans the associations of both reserved types.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::StructuralConstraint`] if an association of a
    /// reserved type does not have exactly one player per reserved role.
    pub fn build<G: TopicMapSource + ?Sized>(graph: &G) -> Result<Self> {
        let mut index = Self::default();
        for (pattern, target) in [
            (TYPE_INSTANCE, Target::Types),
            (SUPERTYPE_SUBTYPE, Target::Supertypes),
        ] {
            index.decode(graph, pattern, target)?;
        }
        tracing::debug!(
            patterns = index.patterns.len(),
            "decoded reserved associations"
        );
        Ok(index)
    }

    fn decode<G: TopicMapSource + ?Sized>(
        &mut self,
        graph: &G,
        pattern: Pattern,
        target: Target,
    ) -> Result<()> {
        let Some(assoc_type) = graph.topic_by_subject_identifier(pattern.association) else {
            return Ok(());
        };
        let general_type = graph.topic_by_subject_identifier(pattern.general);
        let specific_type = graph.topic_by_subject_identifier(pattern.specific);

        for id in graph.associations_of_type(assoc_type) {
            let association = graph.association(id);
            let players_of = |role_type: Option<TopicId>| -> Vec<TopicId> {
                association
                    .roles
                    .iter()
                    .map(|&r| graph.role(r))
                    .filter(|role| Some(role.type_) == role_type)
                    .map(|role| role.player)
                    .collect()
            };
            let general = players_of(general_type);
            let specific = players_of(specific_type);
            for (players, role) in [(&general, pattern.general), (&specific, pattern.specific)] {
                if players.len() != 1 {
                    return Err(CtmError::StructuralConstraint {
                        association: id,
                        pattern: pattern.association,
                        role,
                        count: players.len(),
                    });
                }
            }

            let plain = association.scope.is_empty()
                && association.reifier.is_none()
                && association.roles.len() == 2
                && association
                    .roles
                    .iter()
                    .all(|&r| graph.role(r).reifier.is_none());
            if !plain {
                tracing::debug!(
                    association = ?id,
                    "reserved association kept as ordinary association"
                );
                continue;
            }

            let map = match target {
                Target::Types => &mut self.derived_types,
                Target::Supertypes => &mut self.supertypes,
            };
            let list = map.entry(specific[0]).or_default();
            if !list.contains(&general[0]) {
                list.push(general[0]);
            }
            self.patterns.insert(id);
        }
        Ok(())
    }

    /// Types of `topic` expressed through type-instance associations.
    #[must_use]
    pub fn derived_types(&self, topic: TopicId) -> &[TopicId] {
        self.derived_types.get(&topic).map_or(&[], Vec::as_slice)
    }

    /// Supertypes of `topic` expressed through supertype-subtype associations.
    #[must_use]
    pub fn supertypes(&self, topic: TopicId) -> &[TopicId] {
        self.supertypes.get(&topic).map_or(&[], Vec::as_slice)
    }

    /// Returns true if `association` is folded into `isa` or `ako`.
    #[must_use]
    pub fn is_pattern_association(&self, association: AssociationId) -> bool {
        self.patterns.contains(&association)
    }

    /// Direct types of `topic` followed by derived ones, without duplicates.
    #[must_use]
    pub fn types_of<G: TopicMapSource + ?Sized>(&self, graph: &G, topic: TopicId) -> Vec<TopicId> {
        let mut types = graph.topic(topic).types.clone();
        for &t in self.derived_types(topic) {
            if !types.contains(&t) {
                types.push(t);
            }
        }
        types
    }

    /// Every topic having `type_` among [`Self::types_of`], in graph order.
    #[must_use]
    pub fn instances_of<G: TopicMapSource + ?Sized>(
        &self,
        graph: &G,
        type_: TopicId,
    ) -> Vec<TopicId> {
        graph
            .topic_ids()
            .into_iter()
            .filter(|&t| {
                graph.topic(t).types.contains(&type_) || self.derived_types(t).contains(&type_)
            })
            .collect()
    }

    /// Every type with at least one instance, direct types first, in graph
    /// order.
    #[must_use]
    pub fn topic_types<G: TopicMapSource + ?Sized>(&self, graph: &G) -> Vec<TopicId> {
        let mut types = graph.topic_types();
        for t in graph.topic_ids() {
            for &d in self.derived_types(t) {
                if !types.contains(&d) {
                    types.push(d);
                }
            }
        }
        types
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Types,
    Supertypes,
}

/// Returns true if `topic` carries a reserved TMDM subject identifier.
#[must_use]
pub fn is_reserved_topic<G: TopicMapSource + ?Sized>(graph: &G, topic: TopicId) -> bool {
    graph
        .topic(topic)
        .subject_identifiers
        .iter()
        .any(|si| iris::is_reserved(si))
}
