//! Item filtering applied before hierarchy resolution.

use std::collections::BTreeMap;

use regex::Regex;

use super::item::{Item, ItemKind};

/// Filter criteria over an item collection.
///
/// All criteria are conjunctive: an item must satisfy every populated field
/// to pass. String comparisons are case-insensitive except for assignee
/// logins, which the source system treats as exact.
#[derive(Debug, Default)]
pub struct Filters {
    /// Keep only items of this kind.
    pub kind: Option<ItemKind>,
    /// Keep only items whose status field matches this value.
    pub status: Option<String>,
    /// Keep only items assigned to this login.
    pub assignee: Option<String>,
    /// Keep only items carrying this label.
    pub label: Option<String>,
    /// Keep only items whose title or body contains this substring.
    pub contains: Option<String>,
    /// Keep only items whose title or body matches this pattern.
    pub regex: Option<Regex>,
}

impl Filters {
    /// Whether any criterion is populated.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.kind.is_some()
            || self.status.is_some()
            || self.assignee.is_some()
            || self.label.is_some()
            || self.contains.is_some()
            || self.regex.is_some()
    }

    /// Whether an item satisfies every populated criterion.
    #[must_use]
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(kind) = self.kind {
            if item.kind != kind {
                return false;
            }
        }

        if let Some(status) = &self.status {
            let matched = item
                .fields
                .status
                .as_deref()
                .is_some_and(|value| value.eq_ignore_ascii_case(status));
            if !matched {
                return false;
            }
        }

        if let Some(assignee) = &self.assignee {
            if !item.assignees.iter().any(|login| login == assignee) {
                return false;
            }
        }

        if let Some(label) = &self.label {
            if !item
                .labels
                .iter()
                .any(|candidate| candidate.name.eq_ignore_ascii_case(label))
            {
                return false;
            }
        }

        if let Some(needle) = &self.contains {
            let needle = needle.to_lowercase();
            if !item.title.to_lowercase().contains(&needle)
                && !item.body.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if let Some(regex) = &self.regex {
            if !regex.is_match(&item.title) && !regex.is_match(&item.body) {
                return false;
            }
        }

        true
    }

    /// Retains only the matching items, preserving collection order.
    pub fn apply(&self, items: &mut Vec<Item>) {
        if self.any() {
            items.retain(|item| self.matches(item));
        }
    }

    /// The populated criteria as name → value pairs, for reporting.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<&'static str, String> {
        let mut summary = BTreeMap::new();
        if let Some(kind) = self.kind {
            summary.insert("type", kind.label().to_string());
        }
        if let Some(status) = &self.status {
            summary.insert("status", status.clone());
        }
        if let Some(assignee) = &self.assignee {
            summary.insert("assignee", assignee.clone());
        }
        if let Some(label) = &self.label {
            summary.insert("label", label.clone());
        }
        if let Some(contains) = &self.contains {
            summary.insert("contains", contains.clone());
        }
        if let Some(regex) = &self.regex {
            summary.insert("regex", regex.to_string());
        }
        summary
    }
}
