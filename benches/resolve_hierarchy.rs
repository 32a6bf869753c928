//! This bench resolves the relationship graph over a large board snapshot,
//! covering both the declared-link path and the heuristic matching path.

#![allow(missing_docs)]

use boardtree::{Hierarchy, Item, ItemKind, MatchPolicy};
use boardtree::domain::ItemRef;
use criterion::{criterion_group, criterion_main, Criterion};

/// Generates a board with declared parent links: 100 epics with 10 children
/// each.
fn declared_items() -> Vec<Item> {
    let mut items = Vec::new();
    for epic in 0..100u64 {
        let number = epic * 100;
        let mut parent = Item::new(format!("epic-{epic}"), ItemKind::Issue, format!("Epic {epic}"));
        parent.number = Some(number);
        items.push(parent);

        for child in 1..=10u64 {
            let mut item = Item::new(
                format!("task-{epic}-{child}"),
                ItemKind::Issue,
                format!("Task {child} of epic {epic}"),
            );
            item.number = Some(number + child);
            item.parent = Some(ItemRef {
                number,
                title: format!("Epic {epic}"),
            });
            items.push(item);
        }
    }
    items
}

/// Generates a board with no declared links, forcing lexical title matching
/// between requirements and test cases.
fn heuristic_items() -> Vec<Item> {
    let mut items = Vec::new();
    for group in 0..100u64 {
        let mut requirement = Item::new(
            format!("req-{group}"),
            ItemKind::Issue,
            format!("System shall support feature{group} operations"),
        );
        requirement.fields.acceptance = Some("Given/When/Then".to_string());
        items.push(requirement);

        for case in 0..5u64 {
            let mut test = Item::new(
                format!("test-{group}-{case}"),
                ItemKind::Issue,
                format!("Verify feature{group} behaviour case {case}"),
            );
            test.fields.test_type = Some("Integration".to_string());
            items.push(test);
        }
    }
    items
}

fn resolve_declared(c: &mut Criterion) {
    let items = declared_items();
    c.bench_function("resolve declared links", |b| {
        b.iter(|| Hierarchy::resolve(&items, MatchPolicy::FirstWins));
    });
}

fn resolve_heuristic(c: &mut Criterion) {
    let items = heuristic_items();
    c.bench_function("resolve title overlap", |b| {
        b.iter(|| Hierarchy::resolve(&items, MatchPolicy::FirstWins));
    });
}

criterion_group!(benches, resolve_declared, resolve_heuristic);
criterion_main!(benches);
