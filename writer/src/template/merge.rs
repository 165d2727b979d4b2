//! Factoring entries shared between topic templates.
//!
//! Every entry subset of every topic template (of at least `threshold`
//! entries) is a merge candidate. Equal subsets are grouped across templates.
//! Candidates are applied largest first, then most referenced first, without
//! backtracking: each referencing template loses the candidate's entries and
//! gains one nested invocation of a new sub-template holding them.
//!
//! Enumerating subsets is exponential in a template's entry count. The
//! optional `max_subset_size` bounds the subsets considered.
//!
//! Association templates are passed through unchanged: an association body
//! has no place for a nested invocation.

use std::collections::{BTreeMap, BTreeSet};

use super::entry::{Entry, InvocationEntry};
use super::{Template, TemplateKind};

/// An entry subset shared by several templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCandidate {
    /// The shared entries, sorted.
    pub entries: Vec<Entry>,
    /// Indices of the templates containing all of them.
    pub templates: BTreeSet<usize>,
}

/// Applies merge candidates to a template list.
#[derive(Debug, Clone)]
pub struct TemplateMerger {
    threshold: usize,
    max_subset_size: Option<usize>,
    counter: usize,
}

impl TemplateMerger {
    /// Creates a merger. Subsets smaller than `threshold` (at least 1) are
    /// never factored out.
    #[must_use]
    pub fn new(threshold: usize, max_subset_size: Option<usize>) -> Self {
        Self {
            threshold: threshold.max(1),
            max_subset_size,
            counter: 0,
        }
    }

    /// Groups the entry subsets of the topic templates in `templates`,
    /// sorted by entry count and then by reference count, both descending.
    #[must_use]
    pub fn candidates(&self, templates: &[Template]) -> Vec<MergeCandidate> {
        let mut grouped: BTreeMap<Vec<Entry>, BTreeSet<usize>> = BTreeMap::new();
        for (index, template) in templates.iter().enumerate() {
            if template.kind != TemplateKind::Topic {
                continue;
            }
            let upper = self
                .max_subset_size
                .map_or(template.entries.len(), |cap| cap.min(template.entries.len()));
            for size in self.threshold..=upper {
                for_each_subset(&template.entries, size, &mut |subset| {
                    let mut key: Vec<Entry> = subset.iter().map(|&e| e.clone()).collect();
                    key.sort();
                    grouped.entry(key).or_default().insert(index);
                });
            }
        }
        let mut candidates: Vec<MergeCandidate> = grouped
            .into_iter()
            .map(|(entries, templates)| MergeCandidate { entries, templates })
            .collect();
        // Stable sort keeps the key order for ties.
        candidates.sort_by(|a, b| {
            b.entries
                .len()
                .cmp(&a.entries.len())
                .then_with(|| b.templates.len().cmp(&a.templates.len()))
        });
        candidates
    }

    /// Factors shared subsets out of `templates`.
    ///
    /// The result holds the (possibly reduced) input templates in their
    /// original order, followed by the sub-templates and the standalone
    /// templates of applied candidates in creation order.
    pub fn merge(&mut self, templates: Vec<Template>) -> Vec<Template> {
        let candidates = self.candidates(&templates);
        let mut working = templates;
        let mut created = Vec::new();

        for candidate in candidates {
            if candidate.templates.len() <= 1 {
                continue;
            }
            let mut applied = false;
            for &index in &candidate.templates {
                let template = &mut working[index];
                let Some(positions) = find_all(&template.entries, &candidate.entries) else {
                    continue;
                };
                let sub = Template::topic(
                    format!("{}-invoc-{}", template.name, self.next_suffix()),
                    positions.iter().map(|&p| template.entries[p].clone()).collect(),
                );
                let first = positions[0];
                for &p in positions.iter().rev() {
                    template.entries.remove(p);
                }
                template.entries.insert(
                    first,
                    Entry::Invocation(InvocationEntry {
                        template: Box::new(sub.clone()),
                    }),
                );
                tracing::debug!(template = %template.name, sub = %sub.name, entries = sub.entries.len(), "factored shared entries");
                created.push(sub);
                applied = true;
            }
            if applied {
                created.push(Template::topic(
                    format!("merged-{}", self.next_suffix()),
                    candidate.entries,
                ));
            }
        }

        working.extend(created);
        working
    }

    fn next_suffix(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }
}

/// Positions (ascending) of one distinct entry per element of `wanted`, or
/// `None` unless every element was found.
fn find_all(entries: &[Entry], wanted: &[Entry]) -> Option<Vec<usize>> {
    let mut taken = vec![false; entries.len()];
    let mut positions = Vec::with_capacity(wanted.len());
    for w in wanted {
        if let Some(p) = (0..entries.len()).find(|&p| !taken[p] && entries[p] == *w) {
            taken[p] = true;
            positions.push(p);
        }
    }
    if positions.len() != wanted.len() {
        return None;
    }
    positions.sort_unstable();
    Some(positions)
}

/// Calls `f` with every `size`-element subset of `items`, preserving order.
fn for_each_subset<'a, T>(items: &'a [T], size: usize, f: &mut dyn FnMut(&[&'a T])) {
    fn go<'a, T>(
        items: &'a [T],
        start: usize,
        size: usize,
        current: &mut Vec<&'a T>,
        f: &mut dyn FnMut(&[&'a T]),
    ) {
        if current.len() == size {
            f(current);
            return;
        }
        let needed = size - current.len();
        for i in start..items.len() {
            if items.len() - i < needed {
                break;
            }
            current.push(&items[i]);
            go(items, i + 1, size, current, f);
            current.pop();
        }
    }
    if size == 0 || size > items.len() {
        return;
    }
    let mut current = Vec::with_capacity(size);
    go(items, 0, size, &mut current, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::entry::{NameEntry, OccurrenceEntry, TopicRef};
    use ctm_model::iris::XSD_STRING;
    use ctm_model::TopicId;

    fn isa(t: usize) -> Entry {
        Entry::IsInstanceOf(TopicRef::Topic(TopicId(t)))
    }

    fn name(var: &str) -> Entry {
        Entry::Name(NameEntry {
            type_: TopicRef::Topic(TopicId(100)),
            value: var.to_owned(),
            scope: None,
            reifier: None,
            variants: Vec::new(),
        })
    }

    fn occ(t: usize, var: &str) -> Entry {
        Entry::Occurrence(OccurrenceEntry {
            type_: TopicRef::Topic(TopicId(t)),
            value: var.to_owned(),
            datatype: XSD_STRING.to_owned(),
            scope: None,
            reifier: None,
        })
    }

    #[test]
    fn subsets_are_enumerated_by_size() {
        let items = [1, 2, 3, 4];
        let mut seen = Vec::new();
        for_each_subset(&items, 2, &mut |s| seen.push(s.iter().map(|&&x| x).collect::<Vec<_>>()));
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[0], [1, 2]);
        assert_eq!(seen[5], [3, 4]);
    }

    #[test]
    fn shared_subset_becomes_sub_templates() {
        let person = Template::topic("person", vec![isa(1), name("$name"), occ(2, "$email")]);
        let company = Template::topic("company", vec![isa(3), name("$name"), occ(2, "$email")]);
        let mut merger = TemplateMerger::new(2, None);
        let merged = merger.merge(vec![person, company]);

        let names: Vec<&str> = merged.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            ["person", "company", "person-invoc-1", "company-invoc-2", "merged-3"]
        );
        assert_eq!(merged[0].entries.len(), 2);
        assert_eq!(merged[0].entries[0], isa(1));
        assert!(matches!(&merged[0].entries[1], Entry::Invocation(inv) if inv.template.name == "person-invoc-1"));
        assert_eq!(merged[2].entries, [name("$name"), occ(2, "$email")]);
        // Reduced templates keep their parameters through the invocation.
        assert_eq!(merged[0].variables(), ["$name", "$email"]);
    }

    #[test]
    fn candidate_of_one_template_is_not_materialized() {
        let person = Template::topic("person", vec![isa(1), name("$name"), occ(2, "$email")]);
        let place = Template::topic("place", vec![isa(3), occ(4, "$lat"), occ(5, "$long")]);
        let input = vec![person, place];
        let mut merger = TemplateMerger::new(2, None);
        assert_eq!(merger.merge(input.clone()), input);
    }

    #[test]
    fn threshold_bounds_subset_size() {
        let a = Template::topic("a", vec![isa(1), name("$name"), occ(2, "$x")]);
        let b = Template::topic("b", vec![isa(3), name("$name"), occ(4, "$y")]);
        let mut merger = TemplateMerger::new(2, None);
        // Only one entry is shared, below the threshold.
        assert_eq!(merger.merge(vec![a.clone(), b.clone()]).len(), 2);

        let mut single = TemplateMerger::new(1, None);
        assert_eq!(single.merge(vec![a, b]).len(), 5);
    }

    #[test]
    fn later_candidates_skip_mutated_templates() {
        let shared = vec![name("$name"), occ(2, "$email"), occ(5, "$phone")];
        let mut a_entries = vec![isa(1)];
        a_entries.extend(shared.clone());
        let mut b_entries = vec![isa(3)];
        b_entries.extend(shared);
        let mut merger = TemplateMerger::new(2, None);
        let merged = merger.merge(vec![
            Template::topic("a", a_entries),
            Template::topic("b", b_entries),
        ]);
        // The three-entry subset wins; its two-entry subsets no longer find
        // all their entries and leave the reduced templates alone.
        assert_eq!(merged.len(), 5);
        assert_eq!(merged[0].entries.len(), 2);
        assert_eq!(merged[2].entries.len(), 3);
    }

    #[test]
    fn cap_limits_enumeration() {
        let merger = TemplateMerger::new(2, Some(2));
        let t = Template::topic("t", vec![isa(1), name("$a"), occ(2, "$b"), occ(3, "$c")]);
        let candidates = merger.candidates(std::slice::from_ref(&t));
        assert_eq!(candidates.len(), 6);
        assert!(candidates.iter().all(|c| c.entries.len() == 2));
    }

    #[test]
    fn association_templates_pass_through() {
        use crate::template::entry::AssociationEntry;
        let assoc = Template::association(
            "rel",
            AssociationEntry {
                type_: TopicRef::Topic(TopicId(1)),
                roles: Vec::new(),
                scope: None,
                reifier: None,
            },
        );
        let mut merger = TemplateMerger::new(1, None);
        assert_eq!(merger.merge(vec![assoc.clone(), assoc.clone()]), vec![assoc.clone(), assoc]);
    }
}
