//! Fuzzy item lookup over a board snapshot.
//!
//! These helpers locate items by loose title matching rather than by id or
//! number: a bidirectional substring match for single lookups, and a
//! key-term scan for guessing which items belong under a given parent when
//! the board asserts no links.

use super::item::Item;

/// Words too common to count as key terms when comparing titles.
const COMMON_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "shall", "have", "means",
];

/// Finds the first item whose title matches the search text.
///
/// The comparison is case-insensitive and bidirectional: the search text may
/// be a fragment of the title, or a longer phrase that contains the whole
/// title.
#[must_use]
pub fn find_by_title<'a>(items: &'a [Item], search: &str) -> Option<&'a Item> {
    let needle = search.trim().to_lowercase();
    items.iter().find(|item| {
        let title = item.title.to_lowercase();
        title.contains(&needle) || needle.contains(&title)
    })
}

/// Items that look like children of `parent`, judged by shared key terms.
///
/// Key terms are the parent-title words longer than two characters that are
/// not in [`COMMON_WORDS`]. An item qualifies when its title contains at
/// least `min(2, terms / 2)` of them, and always at least one; the parent
/// itself never qualifies.
#[must_use]
pub fn potential_children<'a>(parent: &Item, items: &'a [Item]) -> Vec<&'a Item> {
    let parent_title = parent.title.to_lowercase();
    let terms: Vec<&str> = parent_title
        .split_whitespace()
        .filter(|word| !COMMON_WORDS.contains(word) && word.chars().count() > 2)
        .collect();
    let threshold = 2.min(terms.len() / 2);

    items
        .iter()
        .filter(|item| item.id != parent.id)
        .filter(|item| {
            let title = item.title.to_lowercase();
            let matching = terms.iter().filter(|term| title.contains(*term)).count();
            matching >= threshold && matching > 0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::ItemKind;

    fn item(id: &str, title: &str) -> Item {
        Item::new(id, ItemKind::Issue, title)
    }

    #[test]
    fn title_match_is_bidirectional_and_case_insensitive() {
        let items = vec![item("a", "Implement Login Page"), item("b", "Fix timeout")];

        // Fragment of the title.
        assert_eq!(find_by_title(&items, "login").unwrap().id, "a");
        // Longer phrase containing the whole title.
        assert_eq!(
            find_by_title(&items, "please fix timeout soon").unwrap().id,
            "b"
        );
        assert!(find_by_title(&items, "deployment").is_none());
    }

    #[test]
    fn title_match_returns_first_hit_in_collection_order() {
        let items = vec![item("a", "Login page"), item("b", "Login form")];
        assert_eq!(find_by_title(&items, "LOGIN").unwrap().id, "a");
    }

    #[test]
    fn potential_children_require_shared_key_terms() {
        let parent = item("parent", "The system shall validate payment records");
        let items = vec![
            item("parent", "The system shall validate payment records"),
            // Two shared terms.
            item("child", "Verify payment records cleanup"),
            // Only one shared term, under the threshold of two.
            item("weak", "Validate input format"),
            item("unrelated", "Update dependency pins"),
        ];

        let found = potential_children(&parent, &items);
        let ids: Vec<&str> = found.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["child"]);
    }

    #[test]
    fn short_parent_titles_lower_the_threshold() {
        // Two key terms, so one shared term is enough.
        let parent = item("parent", "Login page");
        let items = vec![
            item("parent", "Login page"),
            item("child", "Login flow redesign"),
            item("other", "Deployment checklist"),
        ];

        let found = potential_children(&parent, &items);
        let ids: Vec<&str> = found.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["child"]);
    }

    #[test]
    fn common_words_never_count_as_terms() {
        let parent = item("parent", "The api shall have retries");
        let items = vec![
            item("parent", "The api shall have retries"),
            // Shares only stop words with the parent title.
            item("noise", "The shall and the have"),
            item("child", "Add api retries with backoff"),
        ];

        let found = potential_children(&parent, &items);
        let ids: Vec<&str> = found.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["child"]);
    }
}
