//! Hierarchy reconstruction over a flat item collection.
//!
//! The resolver rebuilds a parent/child structure from a snapshot of board
//! items. Ground-truth links asserted by the source system always win; when
//! the snapshot carries no native hierarchy at all, weaker signals are tried
//! in order: lexical overlap between requirement and test titles, then
//! grouping of tests by a shared identifier field.
//!
//! The graph is a pure function of the input slice: resolving the same
//! collection twice yields identical edges and partitions.

use std::collections::HashMap;
use std::fmt;

use petgraph::{algo::has_path_connecting, graphmap::DiGraphMap};
use tracing::{debug, instrument};

use super::item::Item;

/// Exclusive length cutoff for title tokens in lexical overlap: tokens of
/// this many characters or fewer are discarded as stop words.
const SIGNIFICANT_TOKEN_LEN: usize = 3;

/// How heuristic matching assigns parents when a child matches more than one
/// candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// The first matching parent (in collection order) claims the child and
    /// later matches are dropped. The result is a forest: every item has at
    /// most one parent.
    #[default]
    FirstWins,
    /// A child is attached under every matching parent. The result is a DAG;
    /// [`Hierarchy::parent_of`] reports the first parent.
    MultiParent,
}

/// A non-fatal anomaly observed while indexing or resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Two items claimed the same sequence number. The later one in
    /// collection order is kept for lookups.
    DuplicateNumber {
        /// The contested sequence number.
        number: u64,
        /// Id of the item that lookups now resolve to.
        kept: String,
        /// Id of the item that was shadowed.
        shadowed: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNumber {
                number,
                kept,
                shadowed,
            } => write!(
                f,
                "duplicate item number #{number}: keeping {kept}, shadowing {shadowed}"
            ),
        }
    }
}

/// Lookup structures over an item collection.
///
/// Maps stable ids and sequence numbers to positions in the source slice.
/// Construction is a single pass; empty input yields empty maps.
#[derive(Debug)]
pub struct ItemIndex<'a> {
    items: &'a [Item],
    by_id: HashMap<&'a str, usize>,
    by_number: HashMap<u64, usize>,
    warnings: Vec<Warning>,
}

impl<'a> ItemIndex<'a> {
    /// Indexes the collection.
    ///
    /// If two items claim the same sequence number the later one wins and a
    /// [`Warning::DuplicateNumber`] is recorded.
    #[must_use]
    pub fn new(items: &'a [Item]) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_number = HashMap::new();
        let mut warnings = Vec::new();

        for (position, item) in items.iter().enumerate() {
            by_id.insert(item.id.as_str(), position);

            if let Some(number) = item.number {
                if let Some(previous) = by_number.insert(number, position) {
                    warnings.push(Warning::DuplicateNumber {
                        number,
                        kept: item.id.clone(),
                        shadowed: items[previous].id.clone(),
                    });
                }
            }
        }

        Self {
            items,
            by_id,
            by_number,
            warnings,
        }
    }

    /// Looks up an item by its stable id.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<&'a Item> {
        self.by_id.get(id).map(|&position| &self.items[position])
    }

    /// Looks up an item by its sequence number.
    #[must_use]
    pub fn by_number(&self, number: u64) -> Option<&'a Item> {
        self.by_number
            .get(&number)
            .map(|&position| &self.items[position])
    }

    /// Anomalies recorded during indexing.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    fn position_of_id(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    fn position_of_number(&self, number: u64) -> Option<usize> {
        self.by_number.get(&number).copied()
    }
}

/// The resolved relationship graph over one item collection.
///
/// Edges point parent → child. Depending on the [`MatchPolicy`] the graph is
/// a forest (`FirstWins`) or a DAG (`MultiParent`); it is never cyclic, since
/// every edge insertion rejects edges that would make an item its own
/// ancestor.
#[derive(Debug)]
pub struct Hierarchy<'a> {
    items: &'a [Item],
    by_id: HashMap<&'a str, usize>,
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
    roots: Vec<usize>,
    orphans: Vec<usize>,
    warnings: Vec<Warning>,
}

impl<'a> Hierarchy<'a> {
    /// Resolves the hierarchy for a collection snapshot.
    ///
    /// Four tiers contribute edges, each only for children still unplaced by
    /// the previous tier:
    ///
    /// 1. explicit parent references;
    /// 2. declared sub-issue lists;
    /// 3. lexical title overlap between requirement-like and test-like items
    ///    (only when tiers 1–2 produced no edges at all);
    /// 4. grouping of test-like items by their test identifier (only when
    ///    tier 3 also produced nothing).
    ///
    /// References to numbers outside the collection and self references are
    /// ignored.
    #[instrument(level = "debug", skip(items), fields(items = items.len()))]
    #[must_use]
    pub fn resolve(items: &'a [Item], policy: MatchPolicy) -> Self {
        let index = ItemIndex::new(items);
        let mut builder = Builder::new(items, index, policy);

        builder.declared_parents();
        builder.declared_children();

        if builder.edges == 0 {
            builder.title_overlap();
        }
        if builder.edges == 0 {
            builder.identifier_groups();
        }

        builder.finish()
    }

    /// The items that own children but have no parent, in collection order.
    pub fn roots(&self) -> impl Iterator<Item = &'a Item> + '_ {
        self.roots.iter().map(|&position| &self.items[position])
    }

    /// The items with neither parent nor children, in collection order.
    pub fn orphans(&self) -> impl Iterator<Item = &'a Item> + '_ {
        self.orphans.iter().map(|&position| &self.items[position])
    }

    /// The children of an item, in the order they were attached.
    ///
    /// Unknown ids yield an empty iterator.
    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &'a Item> + '_ {
        self.by_id
            .get(id)
            .map(|&position| self.children[position].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&child| &self.items[child])
    }

    /// The first resolved parent of an item, if any.
    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&'a Item> {
        self.by_id
            .get(id)
            .and_then(|&position| self.parents[position].first())
            .map(|&parent| &self.items[parent])
    }

    /// All resolved parents of an item. More than one only occurs under
    /// [`MatchPolicy::MultiParent`].
    pub fn parents_of(&self, id: &str) -> impl Iterator<Item = &'a Item> + '_ {
        self.by_id
            .get(id)
            .map(|&position| self.parents[position].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|&parent| &self.items[parent])
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn item(&self, id: &str) -> Option<&'a Item> {
        self.by_id.get(id).map(|&position| &self.items[position])
    }

    /// Whether any parent/child edge was resolved. When this is `false` a
    /// caller should fall back to a flat presentation.
    #[must_use]
    pub fn has_relationships(&self) -> bool {
        !self.roots.is_empty()
    }

    /// Total number of resolved edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.children.iter().map(Vec::len).sum()
    }

    /// Anomalies recorded during indexing and resolution.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Incremental edge accumulator shared by the four tiers.
struct Builder<'a> {
    items: &'a [Item],
    index: ItemIndex<'a>,
    policy: MatchPolicy,
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
    /// Edges run child → parent, so ancestor queries walk in edge direction.
    graph: DiGraphMap<usize, ()>,
    edges: usize,
}

impl<'a> Builder<'a> {
    fn new(items: &'a [Item], index: ItemIndex<'a>, policy: MatchPolicy) -> Self {
        let mut graph = DiGraphMap::with_capacity(items.len(), items.len());
        for position in 0..items.len() {
            graph.add_node(position);
        }

        Self {
            items,
            index,
            policy,
            children: vec![Vec::new(); items.len()],
            parents: vec![Vec::new(); items.len()],
            graph,
            edges: 0,
        }
    }

    /// Tier 1: explicit parent references.
    fn declared_parents(&mut self) {
        for (child, item) in self.items.iter().enumerate() {
            let Some(parent_ref) = &item.parent else {
                continue;
            };
            // References to items outside the collection are expected
            // (cross-query scoping) and skipped without error.
            if let Some(parent) = self.index.position_of_number(parent_ref.number) {
                self.attach(parent, child);
            }
        }
    }

    /// Tier 2: declared sub-issue lists. Tier 1 placements take precedence.
    fn declared_children(&mut self) {
        for (parent, item) in self.items.iter().enumerate() {
            for sub in &item.sub_issues {
                if let Some(child) = self.index.position_of_number(sub.number) {
                    self.attach(parent, child);
                }
            }
        }
    }

    /// Tier 3: lexical overlap between requirement titles and test titles.
    fn title_overlap(&mut self) {
        let requirements: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.fields.is_requirement_like())
            .map(|(position, _)| position)
            .collect();
        let tests: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.fields.is_requirement_like() && item.fields.is_test_like())
            .map(|(position, _)| position)
            .collect();

        for &requirement in &requirements {
            for &test in &tests {
                if titles_overlap(&self.items[requirement].title, &self.items[test].title) {
                    self.attach(requirement, test);
                }
            }
        }
    }

    /// Tier 4: group test-like items by their test identifier. The first
    /// member of each group (collection order) becomes a synthetic parent.
    /// Requirement-like items never join a group, mirroring the tier 3
    /// partition.
    fn identifier_groups(&mut self) {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();

        for (position, item) in self.items.iter().enumerate() {
            if item.fields.is_requirement_like() || !item.fields.is_test_like() {
                continue;
            }
            let Some(test_id) = item.fields.test_id.as_deref() else {
                continue;
            };
            let members = groups.entry(test_id).or_default();
            if members.is_empty() {
                order.push(test_id);
            }
            members.push(position);
        }

        for test_id in order {
            let members = &groups[test_id];
            if members.len() < 2 {
                continue;
            }
            let parent = members[0];
            for &child in &members[1..] {
                self.attach(parent, child);
            }
        }
    }

    /// Adds a parent → child edge if it is admissible.
    ///
    /// Rejected: self references, duplicate edges, edges that would make an
    /// item its own ancestor, and (under `FirstWins`) edges to a child that
    /// already has a parent.
    fn attach(&mut self, parent: usize, child: usize) -> bool {
        if parent == child {
            return false;
        }
        if self.parents[child].contains(&parent) {
            return false;
        }
        if self.policy == MatchPolicy::FirstWins && !self.parents[child].is_empty() {
            return false;
        }
        // A cycle would form exactly when the child is already an ancestor of
        // the parent: edges run child → parent, so that ancestry shows up as
        // a path from `parent` to `child`.
        if has_path_connecting(&self.graph, parent, child, None) {
            debug!(
                parent = %self.items[parent].id,
                child = %self.items[child].id,
                "skipping edge that would create a cycle"
            );
            return false;
        }

        self.children[parent].push(child);
        self.parents[child].push(parent);
        self.graph.add_edge(child, parent, ());
        self.edges += 1;
        true
    }

    fn finish(self) -> Hierarchy<'a> {
        let mut roots = Vec::new();
        let mut orphans = Vec::new();

        for position in 0..self.items.len() {
            let has_children = !self.children[position].is_empty();
            let has_parent = !self.parents[position].is_empty();

            if has_children && !has_parent {
                roots.push(position);
            } else if !has_children && !has_parent {
                orphans.push(position);
            }
        }

        let ItemIndex {
            by_id, warnings, ..
        } = self.index;

        Hierarchy {
            items: self.items,
            by_id,
            children: self.children,
            parents: self.parents,
            roots,
            orphans,
            warnings,
        }
    }
}

/// Whether two titles share at least one significant token.
///
/// Titles are lower-cased and split on whitespace; tokens of
/// [`SIGNIFICANT_TOKEN_LEN`] characters or fewer are discarded as stop-word
/// noise. Surviving tokens compare by shared stem: equal, or one a prefix of
/// the other, so "error"/"errors" and "login"/"logins" still count as
/// overlap. Pairs where neither token is a prefix of the other, like
/// "logging"/"logs", do not.
fn titles_overlap(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    let significant = |title: &'_ str| {
        title
            .split_whitespace()
            .filter(|token| token.chars().count() > SIGNIFICANT_TOKEN_LEN)
            .map(str::to_string)
            .collect::<Vec<_>>()
    };

    let left = significant(&a);
    let right = significant(&b);

    left.iter().any(|l| {
        right
            .iter()
            .any(|r| l == r || l.starts_with(r.as_str()) || r.starts_with(l.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::{ItemKind, ItemRef};

    fn issue(id: &str, number: u64, title: &str) -> Item {
        let mut item = Item::new(id, ItemKind::Issue, title);
        item.number = Some(number);
        item
    }

    fn requirement(id: &str, title: &str) -> Item {
        let mut item = Item::new(id, ItemKind::Issue, title);
        item.fields.acceptance = Some("yes".to_string());
        item
    }

    fn test_case(id: &str, title: &str) -> Item {
        let mut item = Item::new(id, ItemKind::Issue, title);
        item.fields.test_type = Some("Unit".to_string());
        item
    }

    fn ids<'a>(iter: impl Iterator<Item = &'a Item>) -> Vec<&'a str> {
        iter.map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn empty_collection_yields_empty_graph() {
        let items: Vec<Item> = Vec::new();
        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert_eq!(hierarchy.roots().count(), 0);
        assert_eq!(hierarchy.orphans().count(), 0);
        assert_eq!(hierarchy.edge_count(), 0);
    }

    #[test]
    fn unrelated_items_are_all_orphans() {
        let items = vec![
            issue("a", 1, "First task"),
            issue("b", 2, "Second task"),
            Item::new("c", ItemKind::Draft, "A draft"),
        ];
        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert!(!hierarchy.has_relationships());
        assert_eq!(ids(hierarchy.orphans()), ["a", "b", "c"]);
        assert_eq!(hierarchy.roots().count(), 0);
    }

    #[test]
    fn declared_parent_creates_edge() {
        let mut child = issue("child", 2, "Implement login");
        child.parent = Some(ItemRef {
            number: 1,
            title: "Auth epic".to_string(),
        });
        let items = vec![issue("epic", 1, "Auth epic"), child];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert_eq!(ids(hierarchy.children_of("epic")), ["child"]);
        assert_eq!(hierarchy.parent_of("child").unwrap().id, "epic");
        assert_eq!(ids(hierarchy.roots()), ["epic"]);
        assert_eq!(hierarchy.orphans().count(), 0);
    }

    #[test]
    fn declared_children_create_edges() {
        let mut parent = issue("epic", 1, "Epic");
        parent.sub_issues = vec![
            ItemRef {
                number: 2,
                title: "Task A".to_string(),
            },
            ItemRef {
                number: 3,
                title: "Task B".to_string(),
            },
        ];
        let items = vec![parent, issue("a", 2, "Task A"), issue("b", 3, "Task B")];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert_eq!(ids(hierarchy.children_of("epic")), ["a", "b"]);
        assert_eq!(hierarchy.parent_of("a").unwrap().id, "epic");
        assert_eq!(hierarchy.parent_of("b").unwrap().id, "epic");
    }

    #[test]
    fn explicit_parent_takes_precedence_over_declared_child() {
        // A declares B as a sub-issue, but B declares C as its parent.
        let mut a = issue("a", 1, "A");
        a.sub_issues = vec![ItemRef {
            number: 2,
            title: "B".to_string(),
        }];
        let mut b = issue("b", 2, "B");
        b.parent = Some(ItemRef {
            number: 3,
            title: "C".to_string(),
        });
        let items = vec![a, b, issue("c", 3, "C")];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert_eq!(hierarchy.parent_of("b").unwrap().id, "c");
        assert_eq!(hierarchy.children_of("a").count(), 0);
        assert_eq!(ids(hierarchy.children_of("c")), ["b"]);
    }

    #[test]
    fn dangling_parent_reference_is_ignored() {
        let mut child = issue("child", 2, "Task");
        child.parent = Some(ItemRef {
            number: 99,
            title: "Out of scope".to_string(),
        });
        let items = vec![child];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert!(hierarchy.parent_of("child").is_none());
        assert_eq!(ids(hierarchy.orphans()), ["child"]);
    }

    #[test]
    fn self_reference_is_ignored() {
        let mut item = issue("a", 1, "Self-referential");
        item.parent = Some(ItemRef {
            number: 1,
            title: "Self-referential".to_string(),
        });
        let items = vec![item];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);
        assert!(hierarchy.parent_of("a").is_none());
        assert_eq!(hierarchy.edge_count(), 0);
    }

    #[test]
    fn mutual_references_never_create_a_cycle() {
        let mut a = issue("a", 1, "A");
        a.parent = Some(ItemRef {
            number: 2,
            title: "B".to_string(),
        });
        let mut b = issue("b", 2, "B");
        b.parent = Some(ItemRef {
            number: 1,
            title: "A".to_string(),
        });
        let items = vec![a, b];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        // First edge wins; the reverse edge would close a cycle and is dropped.
        assert_eq!(hierarchy.parent_of("a").unwrap().id, "b");
        assert!(hierarchy.parent_of("b").is_none());
        assert_eq!(hierarchy.edge_count(), 1);
    }

    #[test]
    fn no_item_is_its_own_ancestor() {
        // A chain plus a back-reference from the top to the bottom.
        let mut b = issue("b", 2, "B");
        b.parent = Some(ItemRef {
            number: 1,
            title: "A".to_string(),
        });
        let mut c = issue("c", 3, "C");
        c.parent = Some(ItemRef {
            number: 2,
            title: "B".to_string(),
        });
        let mut a = issue("a", 1, "A");
        a.parent = Some(ItemRef {
            number: 3,
            title: "C".to_string(),
        });
        let items = vec![a, b, c];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        // Walk up from every item; the walk must terminate without revisiting.
        for item in &items {
            let mut seen = vec![item.id.as_str()];
            let mut current = hierarchy.parent_of(&item.id);
            while let Some(parent) = current {
                assert!(!seen.contains(&parent.id.as_str()), "cycle through {}", parent.id);
                seen.push(&parent.id);
                current = hierarchy.parent_of(&parent.id);
            }
        }
    }

    #[test]
    fn title_overlap_links_requirement_to_test() {
        let items = vec![
            requirement("req", "System shall log errors"),
            test_case("test", "Verify that error logging works"),
        ];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        // "errors" and "error" share a stem, which is enough overlap.
        assert_eq!(ids(hierarchy.children_of("req")), ["test"]);
        assert_eq!(hierarchy.parent_of("test").unwrap().id, "req");
        assert_eq!(ids(hierarchy.roots()), ["req"]);
    }

    #[test]
    fn title_overlap_requires_shared_significant_token() {
        let items = vec![
            requirement("req", "System shall support error logging"),
            test_case("test", "Verify that error logging works"),
            test_case("other", "Verify startup banner"),
        ];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        // "error" and "logging" are shared; the startup test shares nothing.
        assert_eq!(ids(hierarchy.children_of("req")), ["test"]);
        assert_eq!(hierarchy.parent_of("test").unwrap().id, "req");
        assert_eq!(ids(hierarchy.roots()), ["req"]);
        assert_eq!(ids(hierarchy.orphans()), ["other"]);
    }

    #[test]
    fn title_overlap_skipped_when_declared_links_exist() {
        let mut child = issue("child", 2, "Verify error logging");
        child.parent = Some(ItemRef {
            number: 1,
            title: "Epic".to_string(),
        });
        let mut req = requirement("req", "Support error logging");
        req.number = Some(3);
        let mut test = test_case("test", "Verify error logging again");
        test.number = Some(4);

        let items = vec![issue("epic", 1, "Epic"), child, req, test];
        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        // Tier 3 must not run: the declared edge exists, so the matching
        // requirement/test pair stays unlinked.
        assert_eq!(hierarchy.children_of("req").count(), 0);
        assert!(hierarchy.parent_of("test").is_none());
        assert_eq!(hierarchy.edge_count(), 1);
    }

    #[test]
    fn first_wins_policy_keeps_single_parent() {
        let items = vec![
            requirement("req1", "Validate payment flow"),
            requirement("req2", "Reconcile payment records"),
            test_case("test", "Verify payment handling"),
        ];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert_eq!(ids(hierarchy.children_of("req1")), ["test"]);
        assert_eq!(hierarchy.children_of("req2").count(), 0);
        assert_eq!(hierarchy.parents_of("test").count(), 1);
    }

    #[test]
    fn multi_parent_policy_allows_fan_out() {
        let items = vec![
            requirement("req1", "Validate payment flow"),
            requirement("req2", "Reconcile payment records"),
            test_case("test", "Verify payment handling"),
        ];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::MultiParent);

        assert_eq!(ids(hierarchy.children_of("req1")), ["test"]);
        assert_eq!(ids(hierarchy.children_of("req2")), ["test"]);
        assert_eq!(ids(hierarchy.parents_of("test")), ["req1", "req2"]);
        // parent_of still reports a single, deterministic parent.
        assert_eq!(hierarchy.parent_of("test").unwrap().id, "req1");
    }

    #[test]
    fn identifier_grouping_promotes_first_member() {
        let mut t1 = test_case("t1", "Check throughput");
        t1.fields.test_id = Some("TID-7".to_string());
        let mut t2 = test_case("t2", "Measure latency");
        t2.fields.test_id = Some("TID-7".to_string());
        let mut t3 = test_case("t3", "Unrelated probe");
        t3.fields.test_id = Some("TID-9".to_string());

        let items = vec![t1, t2, t3];
        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert_eq!(ids(hierarchy.children_of("t1")), ["t2"]);
        assert_eq!(hierarchy.parent_of("t2").unwrap().id, "t1");
        assert_eq!(ids(hierarchy.roots()), ["t1"]);
        // The singleton group stays ungrouped.
        assert_eq!(ids(hierarchy.orphans()), ["t3"]);
    }

    #[test]
    fn identifier_grouping_excludes_requirement_like_items() {
        // Carries both markers, so it is requirement-like and must stay out
        // of the group even with a matching identifier.
        let mut hybrid = requirement("hybrid", "Persist audit records");
        hybrid.fields.test_type = Some("Integration".to_string());
        hybrid.fields.test_id = Some("TID-4".to_string());
        let mut t1 = test_case("t1", "Check throughput");
        t1.fields.test_id = Some("TID-4".to_string());
        let mut t2 = test_case("t2", "Measure latency");
        t2.fields.test_id = Some("TID-4".to_string());

        let items = vec![hybrid, t1, t2];
        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert_eq!(ids(hierarchy.children_of("t1")), ["t2"]);
        assert_eq!(hierarchy.children_of("hybrid").count(), 0);
        assert!(hierarchy.parent_of("hybrid").is_none());
        assert_eq!(ids(hierarchy.orphans()), ["hybrid"]);
    }

    #[test]
    fn identifier_grouping_only_runs_when_overlap_found_nothing() {
        let mut t1 = test_case("t1", "Verify database writes");
        t1.fields.test_id = Some("TID-1".to_string());
        let mut t2 = test_case("t2", "Verify database reads");
        t2.fields.test_id = Some("TID-1".to_string());
        let items = vec![requirement("req", "Persist records to the database"), t1, t2];

        let hierarchy = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        // Tier 3 matched on "database", so tier 4 must not group by TID-1.
        assert_eq!(ids(hierarchy.children_of("req")), ["t1", "t2"]);
        assert_eq!(hierarchy.children_of("t1").count(), 0);
    }

    #[test]
    fn duplicate_numbers_keep_last_and_warn() {
        let items = vec![issue("first", 7, "First"), issue("second", 7, "Second")];
        let index = ItemIndex::new(&items);

        assert_eq!(index.by_number(7).unwrap().id, "second");
        assert_eq!(
            index.warnings(),
            [Warning::DuplicateNumber {
                number: 7,
                kept: "second".to_string(),
                shadowed: "first".to_string(),
            }]
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut child = issue("child", 2, "Task");
        child.parent = Some(ItemRef {
            number: 1,
            title: "Epic".to_string(),
        });
        let items = vec![
            issue("epic", 1, "Epic"),
            child,
            requirement("req", "Handle network failures"),
            test_case("test", "Verify network recovery"),
        ];

        let first = Hierarchy::resolve(&items, MatchPolicy::FirstWins);
        let second = Hierarchy::resolve(&items, MatchPolicy::FirstWins);

        assert_eq!(ids(first.roots()), ids(second.roots()));
        assert_eq!(ids(first.orphans()), ids(second.orphans()));
        for item in &items {
            assert_eq!(
                ids(first.children_of(&item.id)),
                ids(second.children_of(&item.id))
            );
        }
    }

    #[test]
    fn significant_tokens_are_longer_than_three_chars() {
        assert!(titles_overlap("Parse input stream", "Validate input stream"));
        // Only short tokens in common.
        assert!(!titles_overlap("Fix the bug now", "The fix is in"));
        // Case-insensitive.
        assert!(titles_overlap("LOGIN page", "login page redesign"));
    }

    #[test]
    fn stem_matching_requires_a_shared_prefix() {
        // Prefix in either direction counts.
        assert!(titles_overlap("Surface parse error", "Count errors during import"));
        // A common root is not enough when neither token prefixes the other.
        assert!(!titles_overlap("Improve logging", "Rotate logs"));
    }
}
