//! Template entries.
//!
//! An [`Entry`] is one statement of a template body. The set of entry kinds
//! is closed; matching, rendering and merging dispatch on the variant.
//! Entries are plain comparable data so the merger can group equal entries
//! across templates.

use ctm_model::{LocatorKind, TopicId};

use super::Template;
use crate::literal::is_variable;

/// A topic position in a template: a concrete topic or a `$variable`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopicRef {
    /// A fixed topic of the graph.
    Topic(TopicId),
    /// A variable, including the leading `$`.
    Variable(String),
}

impl TopicRef {
    /// Builds a variable reference. A missing `$` is added.
    #[must_use]
    pub fn variable(name: &str) -> Self {
        if name.starts_with('$') {
            Self::Variable(name.to_owned())
        } else {
            Self::Variable(format!("${name}"))
        }
    }

    fn variable_name(&self) -> Option<&str> {
        match self {
            Self::Topic(_) => None,
            Self::Variable(v) => Some(v),
        }
    }
}

/// `@ theme, …` attached to a name, occurrence, variant or association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeEntry {
    /// Scope themes, in order.
    pub themes: Vec<TopicRef>,
}

/// `~ reifier` attached to a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReifierEntry {
    /// The reifying topic.
    pub reifier: TopicRef,
}

/// `(value @ scope ~ reifier)` inside a name entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantEntry {
    /// Literal value or `$variable`.
    pub value: String,
    /// Full datatype IRI.
    pub datatype: String,
    /// Variant scope.
    pub scope: Option<ScopeEntry>,
    /// Variant reifier.
    pub reifier: Option<ReifierEntry>,
}

/// `- type: value @ scope ~ reifier (variant)*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameEntry {
    /// Name type.
    pub type_: TopicRef,
    /// Name value or `$variable`.
    pub value: String,
    /// Name scope; `None` matches only unscoped names.
    pub scope: Option<ScopeEntry>,
    /// Name reifier; `None` matches only unreified names.
    pub reifier: Option<ReifierEntry>,
    /// Variants, matched positionally.
    pub variants: Vec<VariantEntry>,
}

/// `type: value @ scope ~ reifier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccurrenceEntry {
    /// Occurrence type.
    pub type_: TopicRef,
    /// Literal value or `$variable`.
    pub value: String,
    /// Full datatype IRI.
    pub datatype: String,
    /// Occurrence scope.
    pub scope: Option<ScopeEntry>,
    /// Occurrence reifier.
    pub reifier: Option<ReifierEntry>,
}

/// `type : player ~ reifier` inside an association entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleEntry {
    /// Role type.
    pub type_: TopicRef,
    /// Role player.
    pub player: TopicRef,
    /// Role reifier.
    pub reifier: Option<ReifierEntry>,
}

/// `type(role, …) @ scope ~ reifier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssociationEntry {
    /// Association type.
    pub type_: TopicRef,
    /// Roles; an association matches only if every role is matched.
    pub roles: Vec<RoleEntry>,
    /// Association scope.
    pub scope: Option<ScopeEntry>,
    /// Association reifier.
    pub reifier: Option<ReifierEntry>,
}

/// A locator statement of the subject topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentifierEntry {
    /// Locator kind.
    pub kind: LocatorKind,
    /// IRI or `$variable`.
    pub value: String,
}

/// A call of another topic template for the same subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationEntry {
    /// The invoked template.
    pub template: Box<Template>,
}

/// A group of statements about the subject topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicEntry {
    /// Statements of the group.
    pub entries: Vec<Entry>,
}

/// One statement of a template body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entry {
    /// `isa type`.
    IsInstanceOf(TopicRef),
    /// `ako supertype`.
    AKindOf(TopicRef),
    /// A topic name.
    Name(NameEntry),
    /// An occurrence.
    Occurrence(OccurrenceEntry),
    /// A variant; only valid inside a name.
    Variant(VariantEntry),
    /// A role; only valid inside an association.
    Role(RoleEntry),
    /// An association, written after the subject block.
    Association(AssociationEntry),
    /// A subject identifier, subject locator or item identifier.
    Identifier(IdentifierEntry),
    /// A reifier; only valid inside another entry.
    Reifier(ReifierEntry),
    /// A scope; only valid inside another entry.
    Scope(ScopeEntry),
    /// A nested template invocation.
    Invocation(InvocationEntry),
    /// A group of subject statements.
    Topic(TopicEntry),
}

impl Entry {
    /// Short name of the entry kind, used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Entry::IsInstanceOf(_) => "isa",
            Entry::AKindOf(_) => "ako",
            Entry::Name(_) => "name",
            Entry::Occurrence(_) => "occurrence",
            Entry::Variant(_) => "variant",
            Entry::Role(_) => "role",
            Entry::Association(_) => "association",
            Entry::Identifier(_) => "identifier",
            Entry::Reifier(_) => "reifier",
            Entry::Scope(_) => "scope",
            Entry::Invocation(_) => "invocation",
            Entry::Topic(_) => "topic",
        }
    }

    /// Appends the `$` tokens of this entry to `out`, in statement order.
    ///
    /// A nested invocation contributes the parameters of the invoked
    /// template, which it passes through unchanged.
    pub fn collect_variables(&self, out: &mut Vec<String>) {
        fn push(out: &mut Vec<String>, token: Option<&str>) {
            if let Some(t) = token {
                out.push(t.to_owned());
            }
        }
        fn value(out: &mut Vec<String>, v: &str) {
            push(out, is_variable(v).then_some(v));
        }
        fn scope(out: &mut Vec<String>, s: Option<&ScopeEntry>) {
            for theme in s.map(|s| s.themes.as_slice()).unwrap_or_default() {
                push(out, theme.variable_name());
            }
        }
        fn reifier(out: &mut Vec<String>, r: Option<&ReifierEntry>) {
            push(out, r.and_then(|r| r.reifier.variable_name()));
        }
        fn variant(out: &mut Vec<String>, v: &VariantEntry) {
            value(out, &v.value);
            scope(out, v.scope.as_ref());
            reifier(out, v.reifier.as_ref());
        }
        fn role(out: &mut Vec<String>, r: &RoleEntry) {
            push(out, r.type_.variable_name());
            push(out, r.player.variable_name());
            reifier(out, r.reifier.as_ref());
        }

        match self {
            Entry::IsInstanceOf(t) | Entry::AKindOf(t) => push(out, t.variable_name()),
            Entry::Name(n) => {
                push(out, n.type_.variable_name());
                value(out, &n.value);
                scope(out, n.scope.as_ref());
                reifier(out, n.reifier.as_ref());
                for v in &n.variants {
                    variant(out, v);
                }
            }
            Entry::Occurrence(o) => {
                push(out, o.type_.variable_name());
                value(out, &o.value);
                scope(out, o.scope.as_ref());
                reifier(out, o.reifier.as_ref());
            }
            Entry::Variant(v) => variant(out, v),
            Entry::Role(r) => role(out, r),
            Entry::Association(a) => {
                push(out, a.type_.variable_name());
                for r in &a.roles {
                    role(out, r);
                }
                scope(out, a.scope.as_ref());
                reifier(out, a.reifier.as_ref());
            }
            Entry::Identifier(i) => value(out, &i.value),
            Entry::Reifier(r) => reifier(out, Some(r)),
            Entry::Scope(s) => scope(out, Some(s)),
            Entry::Invocation(inv) => out.extend(inv.template.variables()),
            Entry::Topic(group) => {
                for e in &group.entries {
                    e.collect_variables(out);
                }
            }
        }
    }
}
