//! Matching templates against graph constructs.
//!
//! A match binds every `$variable` of a template to a topic or a literal and
//! claims the constructs the template body would produce. Entries are matched
//! in order with backtracking, so a variable bound by one entry constrains
//! the following ones. Constructs already in the affected set, or claimed
//! earlier in the same match, are never claimed twice.
//!
//! [`Template::is_adaptive_for_topic`] and
//! [`Template::is_adaptive_for_association`] only test for a match.
//! The `extract_*_arguments` functions match again, encode the bound values
//! as invocation arguments and commit the claims to the affected set.

use std::collections::BTreeMap;

use ctm_model::iris::{XSD_ANY_URI, XSD_STRING};
use ctm_model::{AssociationId, NameId, OccurrenceId, RoleId, TopicId, TopicMapSource, VariantId};

use super::entry::{
    AssociationEntry, Entry, NameEntry, OccurrenceEntry, ReifierEntry, RoleEntry, ScopeEntry,
    TopicRef, VariantEntry,
};
use super::{Template, TemplateKind, SUBJECT_VARIABLE};
use crate::affected::{AffectedSet, Construct};
use crate::error::{CtmError, Result};
use crate::literal::{encode_literal, is_variable, QuotePath};
use crate::session::WriteSession;
use crate::tmdm::TmdmIndex;

/// Value bound to a template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A topic, written as its identity.
    Topic(TopicId),
    /// A literal, written with its datatype.
    Literal {
        /// Lexical value.
        value: String,
        /// Full datatype IRI.
        datatype: String,
    },
}

/// A successful (partial) match.
#[derive(Debug, Clone, Default)]
pub struct MatchState {
    bindings: BTreeMap<String, Binding>,
    claims: Vec<Construct>,
}

impl MatchState {
    fn for_subject(subject: TopicId) -> Self {
        let mut state = Self::default();
        state
            .bindings
            .insert(SUBJECT_VARIABLE.to_owned(), Binding::Topic(subject));
        state
    }

    /// The value bound to `variable`.
    #[must_use]
    pub fn binding(&self, variable: &str) -> Option<&Binding> {
        self.bindings.get(variable)
    }

    /// Constructs the match would consume.
    #[must_use]
    pub fn claims(&self) -> &[Construct] {
        &self.claims
    }
}

/// Read-only matching context borrowed from a session.
struct Matcher<'s, G: TopicMapSource + ?Sized> {
    graph: &'s G,
    affected: &'s AffectedSet,
    tmdm: &'s TmdmIndex,
}

impl<'s, G: TopicMapSource + ?Sized> Matcher<'s, G> {
    fn new(session: &'s WriteSession<'_, G>) -> Self {
        Self {
            graph: session.graph,
            affected: &session.affected,
            tmdm: &session.tmdm,
        }
    }

    fn available(&self, state: &MatchState, construct: &Construct) -> bool {
        !self.affected.contains(construct) && !state.claims.contains(construct)
    }

    fn match_topic(&self, template: &Template, subject: TopicId) -> Option<MatchState> {
        let entries = template.flattened();
        self.search(Some(subject), &entries, MatchState::for_subject(subject))
    }

    fn match_association(&self, template: &Template, id: AssociationId) -> Option<MatchState> {
        let [Entry::Association(pattern)] = template.entries.as_slice() else {
            return None;
        };
        let state = MatchState::default();
        if !self.available(&state, &Construct::Association(id)) || self.tmdm.is_pattern_association(id) {
            return None;
        }
        self.association(state, pattern, id)
    }

    fn search(
        &self,
        subject: Option<TopicId>,
        entries: &[&Entry],
        state: MatchState,
    ) -> Option<MatchState> {
        let Some((first, rest)) = entries.split_first() else {
            return Some(state);
        };
        self.extend(subject, first, &state)
            .into_iter()
            .find_map(|next| self.search(subject, rest, next))
    }

    /// Every way `entry` can extend `state`.
    fn extend(&self, subject: Option<TopicId>, entry: &Entry, state: &MatchState) -> Vec<MatchState> {
        let graph = self.graph;
        let mut out = Vec::new();
        match entry {
            Entry::IsInstanceOf(pattern) => {
                let Some(topic) = subject else { return out };
                for type_ in self.tmdm.types_of(graph, topic) {
                    let construct = Construct::Type { instance: topic, type_ };
                    self.try_topic(state, construct, pattern, type_, &mut out);
                }
            }
            Entry::AKindOf(pattern) => {
                let Some(topic) = subject else { return out };
                for &supertype in self.tmdm.supertypes(topic) {
                    let construct = Construct::Supertype {
                        subtype: topic,
                        supertype,
                    };
                    self.try_topic(state, construct, pattern, supertype, &mut out);
                }
            }
            Entry::Name(pattern) => {
                let Some(topic) = subject else { return out };
                for &id in &graph.topic(topic).names {
                    if self.available(state, &Construct::Name(id)) {
                        out.extend(self.name(state.clone(), pattern, id));
                    }
                }
            }
            Entry::Occurrence(pattern) => {
                let Some(topic) = subject else { return out };
                for &id in &graph.topic(topic).occurrences {
                    if self.available(state, &Construct::Occurrence(id)) {
                        out.extend(self.occurrence(state.clone(), pattern, id));
                    }
                }
            }
            Entry::Identifier(pattern) => {
                let Some(topic) = subject else { return out };
                for iri in graph.topic(topic).locators(pattern.kind) {
                    let construct = Construct::Locator(topic, pattern.kind, iri.clone());
                    if !self.available(state, &construct) {
                        continue;
                    }
                    let mut next = state.clone();
                    if bind_value(&mut next, &pattern.value, XSD_ANY_URI, iri, XSD_ANY_URI) {
                        next.claims.push(construct);
                        out.push(next);
                    }
                }
            }
            Entry::Association(pattern) => {
                for id in graph.association_ids() {
                    if self.available(state, &Construct::Association(id))
                        && !self.tmdm.is_pattern_association(id)
                    {
                        out.extend(self.association(state.clone(), pattern, id));
                    }
                }
            }
            Entry::Invocation(_) | Entry::Topic(_) => {
                let mut inner = Vec::new();
                super::flatten(std::slice::from_ref(entry), &mut inner);
                out.extend(self.search(subject, &inner, state.clone()));
            }
            // Rejected by `Template::validate`.
            Entry::Variant(_) | Entry::Role(_) | Entry::Reifier(_) | Entry::Scope(_) => {}
        }
        out
    }

    fn try_topic(
        &self,
        state: &MatchState,
        construct: Construct,
        pattern: &TopicRef,
        actual: TopicId,
        out: &mut Vec<MatchState>,
    ) {
        if !self.available(state, &construct) {
            return;
        }
        let mut next = state.clone();
        if self.bind_topic(&mut next, pattern, actual) {
            next.claims.push(construct);
            out.push(next);
        }
    }

    fn name(&self, mut state: MatchState, pattern: &NameEntry, id: NameId) -> Option<MatchState> {
        let name = self.graph.name(id);
        let matched = self.bind_topic(&mut state, &pattern.type_, name.type_)
            && bind_value(&mut state, &pattern.value, XSD_STRING, &name.value, XSD_STRING)
            && self.bind_scope(&mut state, pattern.scope.as_ref(), &name.scope)
            && self.bind_reifier(&mut state, pattern.reifier.as_ref(), name.reifier)
            && pattern.variants.len() == name.variants.len();
        if !matched {
            return None;
        }
        for (variant_pattern, &variant) in pattern.variants.iter().zip(&name.variants) {
            state = self.variant(state, variant_pattern, variant)?;
        }
        state.claims.push(Construct::Name(id));
        Some(state)
    }

    fn variant(&self, mut state: MatchState, pattern: &VariantEntry, id: VariantId) -> Option<MatchState> {
        if !self.available(&state, &Construct::Variant(id)) {
            return None;
        }
        let variant = self.graph.variant(id);
        let matched = bind_value(
            &mut state,
            &pattern.value,
            &pattern.datatype,
            &variant.value,
            &variant.datatype,
        ) && self.bind_scope(&mut state, pattern.scope.as_ref(), &variant.scope)
            && self.bind_reifier(&mut state, pattern.reifier.as_ref(), variant.reifier);
        matched.then(|| {
            state.claims.push(Construct::Variant(id));
            state
        })
    }

    fn occurrence(
        &self,
        mut state: MatchState,
        pattern: &OccurrenceEntry,
        id: OccurrenceId,
    ) -> Option<MatchState> {
        let occurrence = self.graph.occurrence(id);
        let matched = self.bind_topic(&mut state, &pattern.type_, occurrence.type_)
            && bind_value(
                &mut state,
                &pattern.value,
                &pattern.datatype,
                &occurrence.value,
                &occurrence.datatype,
            )
            && self.bind_scope(&mut state, pattern.scope.as_ref(), &occurrence.scope)
            && self.bind_reifier(&mut state, pattern.reifier.as_ref(), occurrence.reifier);
        matched.then(|| {
            state.claims.push(Construct::Occurrence(id));
            state
        })
    }

    fn association(
        &self,
        mut state: MatchState,
        pattern: &AssociationEntry,
        id: AssociationId,
    ) -> Option<MatchState> {
        let association = self.graph.association(id);
        let matched = pattern.roles.len() == association.roles.len()
            && self.bind_topic(&mut state, &pattern.type_, association.type_)
            && self.bind_scope(&mut state, pattern.scope.as_ref(), &association.scope)
            && self.bind_reifier(&mut state, pattern.reifier.as_ref(), association.reifier);
        if !matched {
            return None;
        }
        let mut state = self.roles(state, &pattern.roles, &association.roles)?;
        state.claims.push(Construct::Association(id));
        Some(state)
    }

    /// Assigns each role pattern to a distinct role, backtracking over
    /// repeated role types.
    fn roles(&self, state: MatchState, patterns: &[RoleEntry], remaining: &[RoleId]) -> Option<MatchState> {
        let Some((first, rest)) = patterns.split_first() else {
            return Some(state);
        };
        for (i, &id) in remaining.iter().enumerate() {
            let role = self.graph.role(id);
            let mut next = state.clone();
            let matched = self.bind_topic(&mut next, &first.type_, role.type_)
                && self.bind_topic(&mut next, &first.player, role.player)
                && self.bind_reifier(&mut next, first.reifier.as_ref(), role.reifier);
            if !matched {
                continue;
            }
            next.claims.push(Construct::Role(id));
            let mut others = remaining.to_vec();
            others.remove(i);
            if let Some(done) = self.roles(next, rest, &others) {
                return Some(done);
            }
        }
        None
    }

    fn bind_topic(&self, state: &mut MatchState, pattern: &TopicRef, actual: TopicId) -> bool {
        match pattern {
            TopicRef::Topic(expected) => *expected == actual,
            TopicRef::Variable(name) => match state.bindings.get(name) {
                Some(Binding::Topic(bound)) => *bound == actual,
                Some(Binding::Literal { .. }) => false,
                None => {
                    // An argument must be writable as a topic reference.
                    if self.graph.topic(actual).is_anonymous() {
                        return false;
                    }
                    state.bindings.insert(name.clone(), Binding::Topic(actual));
                    true
                }
            },
        }
    }

    fn bind_scope(&self, state: &mut MatchState, pattern: Option<&ScopeEntry>, actual: &[TopicId]) -> bool {
        let themes = pattern.map(|s| s.themes.as_slice()).unwrap_or_default();
        themes.len() == actual.len()
            && themes
                .iter()
                .zip(actual)
                .all(|(theme, &t)| self.bind_topic(state, theme, t))
    }

    fn bind_reifier(
        &self,
        state: &mut MatchState,
        pattern: Option<&ReifierEntry>,
        actual: Option<TopicId>,
    ) -> bool {
        match (pattern, actual) {
            (None, None) => true,
            (Some(p), Some(r)) => self.bind_topic(state, &p.reifier, r),
            _ => false,
        }
    }
}

fn bind_value(
    state: &mut MatchState,
    pattern: &str,
    expected_datatype: &str,
    value: &str,
    datatype: &str,
) -> bool {
    if expected_datatype != datatype {
        return false;
    }
    if !is_variable(pattern) {
        return pattern == value;
    }
    match state.bindings.get(pattern) {
        Some(Binding::Literal { value: bound, .. }) => bound == value,
        Some(Binding::Topic(_)) => false,
        None => {
            state.bindings.insert(
                pattern.to_owned(),
                Binding::Literal {
                    value: value.to_owned(),
                    datatype: datatype.to_owned(),
                },
            );
            true
        }
    }
}

impl Template {
    /// Returns true if every entry of this topic template matches unwritten
    /// statements of `topic`.
    pub fn is_adaptive_for_topic<G: TopicMapSource + ?Sized>(
        &self,
        session: &WriteSession<'_, G>,
        topic: TopicId,
    ) -> bool {
        self.kind == TemplateKind::Topic && Matcher::new(session).match_topic(self, topic).is_some()
    }

    /// Returns true if this association template matches `association`.
    pub fn is_adaptive_for_association<G: TopicMapSource + ?Sized>(
        &self,
        session: &WriteSession<'_, G>,
        association: AssociationId,
    ) -> bool {
        self.kind == TemplateKind::Association
            && Matcher::new(session)
                .match_association(self, association)
                .is_some()
    }

    /// Matches `topic`, marks the matched statements written and returns the
    /// invocation arguments. The subject itself is implicit and not part of
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::AdaptivityViolation`] if the template does not
    /// match or a bound topic has no identity.
    pub fn extract_topic_arguments<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        topic: TopicId,
    ) -> Result<Vec<String>> {
        let state = if self.kind == TemplateKind::Topic {
            Matcher::new(session).match_topic(self, topic)
        } else {
            None
        };
        let state = state.ok_or_else(|| self.violation(format!("topic {topic:?}"), "no match"))?;
        self.commit(session, state, &format!("topic {topic:?}"))
    }

    /// Matches `association`, marks it written and returns the invocation
    /// arguments.
    ///
    /// # Errors
    ///
    /// Returns [`CtmError::AdaptivityViolation`] if the template does not
    /// match or a bound topic has no identity.
    pub fn extract_association_arguments<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        association: AssociationId,
    ) -> Result<Vec<String>> {
        let construct = format!("association {association:?}");
        let state = if self.kind == TemplateKind::Association {
            Matcher::new(session).match_association(self, association)
        } else {
            None
        };
        let state = state.ok_or_else(|| self.violation(construct.clone(), "no match"))?;
        self.commit(session, state, &construct)
    }

    fn commit<G: TopicMapSource + ?Sized>(
        &self,
        session: &mut WriteSession<'_, G>,
        state: MatchState,
        construct: &str,
    ) -> Result<Vec<String>> {
        let mut arguments = Vec::new();
        for variable in self.variables() {
            let argument = match state.binding(&variable) {
                Some(Binding::Topic(topic)) => session.reference(*topic).ok_or_else(|| {
                    self.violation(construct.to_owned(), &format!("{variable} has no identity"))
                })?,
                Some(Binding::Literal { value, datatype }) => {
                    encode_literal(value, datatype, QuotePath::Argument, &session.prefixes)
                }
                None => {
                    return Err(self.violation(construct.to_owned(), &format!("{variable} is unbound")))
                }
            };
            arguments.push(argument);
        }
        session.affected.extend(state.claims);
        Ok(arguments)
    }

    fn violation(&self, construct: String, reason: &str) -> CtmError {
        CtmError::AdaptivityViolation {
            template: self.name.clone(),
            construct,
            reason: reason.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctm_model::iris::{self, XSD_INTEGER};
    use ctm_model::TopicMap;

    use crate::config::WriterConfig;
    use crate::prefix::PrefixTable;
    use crate::template::entry::OccurrenceEntry;

    struct Fixture {
        tm: TopicMap,
        person: TopicId,
        age: TopicId,
        default_name: TopicId,
        alice: TopicId,
    }

    fn fixture() -> Fixture {
        let mut tm = TopicMap::new();
        let person = tm.create_topic_by_subject_identifier("http://ex.org/Person");
        let age = tm.create_topic_by_subject_identifier("http://ex.org/age");
        let alice = tm.create_topic_by_subject_identifier("http://ex.org/alice");
        tm.add_type(alice, person);
        tm.create_default_name(alice, "Ä \"x\" B", &[]);
        tm.create_occurrence(alice, age, "42", XSD_INTEGER, &[]);
        let default_name = tm
            .topic_by_subject_identifier(iris::TOPIC_NAME)
            .expect("created by create_default_name");
        Fixture {
            tm,
            person,
            age,
            default_name,
            alice,
        }
    }

    fn person_template(f: &Fixture) -> Template {
        Template::topic(
            "person",
            vec![
                Entry::IsInstanceOf(TopicRef::Topic(f.person)),
                Entry::Name(NameEntry {
                    type_: TopicRef::Topic(f.default_name),
                    value: "$name".to_owned(),
                    scope: None,
                    reifier: None,
                    variants: Vec::new(),
                }),
                Entry::Occurrence(OccurrenceEntry {
                    type_: TopicRef::Topic(f.age),
                    value: "$age".to_owned(),
                    datatype: XSD_INTEGER.to_owned(),
                    scope: None,
                    reifier: None,
                }),
            ],
        )
    }

    fn session<'a>(tm: &'a TopicMap, config: &'a WriterConfig) -> WriteSession<'a, TopicMap> {
        let mut prefixes = PrefixTable::new();
        prefixes.bind("ex", "http://ex.org/").expect("bind");
        WriteSession::new(tm, config, prefixes, TmdmIndex::build(tm).expect("index"))
    }

    #[test]
    fn extraction_triple_quotes_and_consumes() {
        let f = fixture();
        let config = WriterConfig::default();
        let mut s = session(&f.tm, &config);
        let template = person_template(&f);

        assert!(template.is_adaptive_for_topic(&s, f.alice));
        let args = template
            .extract_topic_arguments(&mut s, f.alice)
            .expect("adaptive");
        assert_eq!(args, ["\"\"\"Ä \"x\" B\"\"\"", "42"]);
        assert_eq!(s.affected.len(), 3);
        assert!(!template.is_adaptive_for_topic(&s, f.alice));
    }

    #[test]
    fn extraction_without_match_is_a_violation() {
        let f = fixture();
        let config = WriterConfig::default();
        let mut s = session(&f.tm, &config);
        let template = person_template(&f);
        template
            .extract_topic_arguments(&mut s, f.alice)
            .expect("first match");
        let err = template
            .extract_topic_arguments(&mut s, f.alice)
            .expect_err("everything consumed");
        assert!(matches!(err, CtmError::AdaptivityViolation { .. }));
    }

    #[test]
    fn datatype_must_agree() {
        let f = fixture();
        let config = WriterConfig::default();
        let s = session(&f.tm, &config);
        let mut template = person_template(&f);
        if let Entry::Occurrence(o) = &mut template.entries[2] {
            o.datatype = XSD_STRING.to_owned();
        }
        assert!(!template.is_adaptive_for_topic(&s, f.alice));
    }

    #[test]
    fn symmetric_roles_are_assigned_by_backtracking() {
        let mut tm = TopicMap::new();
        let knows = tm.create_topic_by_subject_identifier("http://ex.org/knows");
        let person = tm.create_topic_by_subject_identifier("http://ex.org/person");
        let alice = tm.create_topic_by_subject_identifier("http://ex.org/alice");
        let bob = tm.create_topic_by_subject_identifier("http://ex.org/bob");
        let assoc = tm.create_association(knows, &[]);
        tm.create_role(assoc, person, alice);
        tm.create_role(assoc, person, bob);

        let template = Template::association(
            "knows",
            AssociationEntry {
                type_: TopicRef::Topic(knows),
                roles: vec![
                    RoleEntry {
                        type_: TopicRef::Topic(person),
                        player: TopicRef::Topic(bob),
                        reifier: None,
                    },
                    RoleEntry {
                        type_: TopicRef::Topic(person),
                        player: TopicRef::variable("other"),
                        reifier: None,
                    },
                ],
                scope: None,
                reifier: None,
            },
        );
        let config = WriterConfig::default();
        let mut s = session(&tm, &config);
        assert!(template.is_adaptive_for_association(&s, assoc));
        let args = template
            .extract_association_arguments(&mut s, assoc)
            .expect("adaptive");
        assert_eq!(args, ["ex:alice"]);
        assert!(s.affected.contains(&Construct::Association(assoc)));
        assert_eq!(s.affected.len(), 3);
    }

    #[test]
    fn repeated_variable_must_bind_consistently() {
        let mut tm = TopicMap::new();
        let label = tm.create_topic_by_subject_identifier("http://ex.org/label");
        let alt = tm.create_topic_by_subject_identifier("http://ex.org/alt");
        let t = tm.create_topic_by_subject_identifier("http://ex.org/t");
        tm.create_occurrence(t, label, "a", XSD_STRING, &[]);
        tm.create_occurrence(t, alt, "b", XSD_STRING, &[]);

        let occ = |type_, value: &str| {
            Entry::Occurrence(OccurrenceEntry {
                type_: TopicRef::Topic(type_),
                value: value.to_owned(),
                datatype: XSD_STRING.to_owned(),
                scope: None,
                reifier: None,
            })
        };
        let same = Template::topic("same", vec![occ(label, "$v"), occ(alt, "$v")]);
        let config = WriterConfig::default();
        let s = session(&tm, &config);
        assert!(!same.is_adaptive_for_topic(&s, t));
    }
}
