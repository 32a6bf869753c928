//! Work item model.
//!
//! An [`Item`] is one unit of work on a project board: an issue, a pull
//! request, or a draft note. Items are materialized by the data-acquisition
//! layer and consumed read-only by the hierarchy resolver and the renderers.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// The kind of work item on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A repository issue.
    Issue,
    /// A pull request.
    PullRequest,
    /// A draft note that exists only on the board.
    Draft,
}

impl ItemKind {
    /// Human-readable label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::PullRequest => "Pull Request",
            Self::Draft => "Draft",
        }
    }
}

/// A lightweight reference to another item, as asserted by the source system.
///
/// References carry the externally visible sequence number; resolution to an
/// item in the same collection happens in the resolver, and references that
/// point outside the collection are ignored there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    /// Sequence number of the referenced item.
    pub number: u64,
    /// Title of the referenced item, for display when it is out of scope.
    pub title: String,
}

/// An issue label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Label {
    /// Label name.
    pub name: String,
    /// Hex color, without the leading `#`.
    pub color: String,
}

/// Completion summary over an item's declared sub-issues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubIssuesSummary {
    /// Total number of sub-issues.
    pub total: u64,
    /// Number of completed sub-issues.
    pub completed: u64,
    /// Percentage completed, 0–100.
    pub percent_completed: f64,
}

/// A scalar project field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free-text field.
    Text(String),
    /// Numeric field.
    Number(f64),
    /// Date field.
    Date(NaiveDate),
    /// Single-select option name.
    SingleSelect(String),
    /// Iteration title.
    Iteration(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) | Self::SingleSelect(text) | Self::Iteration(text) => {
                f.write_str(text)
            }
            Self::Number(number) => write!(f, "{number}"),
            Self::Date(date) => write!(f, "{date}"),
        }
    }
}

/// Project field values attached to an item.
///
/// The three fields that drive hierarchy inference are first-class members;
/// everything else the board defines lands in [`Fields::extra`]. Which board
/// field maps to which member is decided by the field-name configuration at
/// decode time, so boards using different field labels still work.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fields {
    /// The status column, when the board has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Acceptance-criteria field. Presence marks the item requirement-like.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acceptance: Option<String>,
    /// Test-classification field. Presence marks the item test-like.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
    /// Test identifier used for fallback grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    /// All remaining fields, keyed by field name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, FieldValue>,
}

impl Fields {
    /// Whether the item carries the acceptance-criteria marker.
    #[must_use]
    pub const fn is_requirement_like(&self) -> bool {
        self.acceptance.is_some()
    }

    /// Whether the item carries the test-classification marker.
    #[must_use]
    pub const fn is_test_like(&self) -> bool {
        self.test_type.is_some()
    }
}

/// One work item on the project board.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    /// Opaque stable identifier, unique across the collection.
    pub id: String,
    /// Item kind.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Externally visible sequence number. Absent for drafts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    /// Title, non-empty for well-formed input.
    pub title: String,
    /// Body text.
    pub body: String,
    /// URL of the backing issue or pull request. Empty for drafts.
    pub url: String,
    /// Lifecycle state (`OPEN`, `CLOSED`, `merged`, ...).
    pub state: String,
    /// Login of the author or creator.
    pub author: String,
    /// Assignee logins.
    pub assignees: Vec<String>,
    /// Labels on the backing issue or pull request.
    pub labels: Vec<Label>,
    /// `owner/name` of the backing repository. Empty for drafts.
    pub repository: String,
    /// Parent reference asserted by the source system.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemRef>,
    /// Sub-issue references asserted by the source system, in source order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_issues: Vec<ItemRef>,
    /// Completion summary over the declared sub-issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_issues_summary: Option<SubIssuesSummary>,
    /// Creation timestamp of the backing content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last-update timestamp of the backing content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Project field values.
    pub fields: Fields,
}

impl Item {
    /// Creates an item with the given identity and title and empty metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ItemKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            number: None,
            title: title.into(),
            body: String::new(),
            url: String::new(),
            state: String::new(),
            author: String::new(),
            assignees: Vec::new(),
            labels: Vec::new(),
            repository: String::new(),
            parent: None,
            sub_issues: Vec::new(),
            sub_issues_summary: None,
            created_at: None,
            updated_at: None,
            fields: Fields::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_markers_classify_items() {
        let mut fields = Fields::default();
        assert!(!fields.is_requirement_like());
        assert!(!fields.is_test_like());

        fields.acceptance = Some("Given/When/Then".to_string());
        assert!(fields.is_requirement_like());

        fields.test_type = Some("Unit".to_string());
        assert!(fields.is_test_like());
    }

    #[test]
    fn item_serializes_kind_as_snake_case() {
        let item = Item::new("I_1", ItemKind::PullRequest, "Title");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "pull_request");
        // Optional members that are absent stay out of the payload.
        assert!(value.get("number").is_none());
        assert!(value.get("parent").is_none());
    }

    #[test]
    fn field_value_display() {
        assert_eq!(FieldValue::Text("abc".to_string()).to_string(), "abc");
        assert_eq!(FieldValue::Number(3.5).to_string(), "3.5");
        assert_eq!(
            FieldValue::SingleSelect("Done".to_string()).to_string(),
            "Done"
        );
    }
}
