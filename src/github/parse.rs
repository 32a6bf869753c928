//! Decoding of GraphQL item payloads into domain work items.
//!
//! The API returns a union of content shapes with per-fragment members, so
//! every field on the raw structs is optional. Classification goes by shape:
//! content with a number and a repository is an issue or a pull request
//! (pull requests are the ones carrying a merge flag), content with a
//! creator is a draft, and anything else (redacted or missing content) is
//! skipped.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::domain::item::{Fields, Item, ItemKind, ItemRef, Label, SubIssuesSummary};
use crate::domain::FieldNames;

/// A paginated connection, flattened to its nodes.
#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
    /// The nodes of the current page.
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
}

/// Cursor state of a connection page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether another page follows.
    pub has_next_page: bool,
    /// Cursor to resume from.
    pub end_cursor: Option<String>,
}

/// One page of project items.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsPage {
    /// Cursor state.
    pub page_info: PageInfo,
    /// Raw items of this page.
    pub nodes: Vec<RawItem>,
}

/// A project item as returned by the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    /// Project item node id.
    pub id: String,
    /// The backing content. `None` for redacted items.
    pub content: Option<RawContent>,
    /// Project field values attached to the item.
    #[serde(default)]
    pub field_values: Option<Nodes<RawFieldValue>>,
}

/// The content union behind a project item, with every member optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContent {
    pub number: Option<u64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<String>,
    pub merged: Option<bool>,
    pub url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author: Option<Actor>,
    pub creator: Option<Actor>,
    pub assignees: Option<Nodes<Actor>>,
    pub labels: Option<Nodes<RawLabel>>,
    pub repository: Option<RawRepository>,
    pub parent: Option<RawRef>,
    pub sub_issues: Option<Nodes<RawRef>>,
    pub sub_issues_summary: Option<RawSummary>,
}

/// A user reference.
#[derive(Debug, Deserialize)]
pub struct Actor {
    /// Login name.
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RawLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Deserialize)]
pub struct RawRepository {
    pub name: String,
    pub owner: Actor,
}

/// A parent or sub-issue reference.
#[derive(Debug, Deserialize)]
pub struct RawRef {
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSummary {
    pub total: u64,
    pub completed: u64,
    pub percent_completed: f64,
}

/// One project field value. Unmatched union members decode as an empty
/// object, which [`RawFieldValue::take`] treats as absent.
#[derive(Debug, Default, Deserialize)]
pub struct RawFieldValue {
    field: Option<RawFieldName>,
    text: Option<String>,
    number: Option<f64>,
    name: Option<String>,
    date: Option<NaiveDate>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFieldName {
    name: String,
}

impl RawFieldValue {
    /// The field name and value, when this node carried both.
    fn take(self) -> Option<(String, crate::domain::FieldValue)> {
        use crate::domain::FieldValue;

        let name = self.field?.name;
        let value = if let Some(text) = self.text {
            FieldValue::Text(text)
        } else if let Some(number) = self.number {
            FieldValue::Number(number)
        } else if let Some(option) = self.name {
            FieldValue::SingleSelect(option)
        } else if let Some(date) = self.date {
            FieldValue::Date(date)
        } else if let Some(title) = self.title {
            FieldValue::Iteration(title)
        } else {
            return None;
        };
        Some((name, value))
    }
}

fn logins(nodes: Option<Nodes<Actor>>) -> Vec<String> {
    nodes
        .map(|n| n.nodes.into_iter().map(|a| a.login).collect())
        .unwrap_or_default()
}

fn refs(nodes: Option<Nodes<RawRef>>) -> Vec<ItemRef> {
    nodes
        .map(|n| {
            n.nodes
                .into_iter()
                .map(|r| ItemRef {
                    number: r.number,
                    title: r.title,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn route_fields(values: Option<Nodes<RawFieldValue>>, names: &FieldNames) -> Fields {
    let mut fields = Fields::default();
    let Some(values) = values else {
        return fields;
    };

    for value in values.nodes {
        let Some((name, value)) = value.take() else {
            continue;
        };
        if name == names.status {
            fields.status = Some(value.to_string());
        } else if name == names.acceptance {
            fields.acceptance = Some(value.to_string());
        } else if name == names.test_type {
            fields.test_type = Some(value.to_string());
        } else if name == names.test_id {
            fields.test_id = Some(value.to_string());
        } else {
            fields.extra.insert(name, value);
        }
    }
    fields
}

/// Converts a raw project item into a domain [`Item`].
///
/// Returns `None` for items without usable content (redacted items, or
/// content shapes the tool does not handle).
pub fn item(raw: RawItem, names: &FieldNames) -> Option<Item> {
    let content = raw.content?;

    let kind = if content.number.is_some() && content.repository.is_some() {
        if content.merged.is_some() {
            ItemKind::PullRequest
        } else {
            ItemKind::Issue
        }
    } else if content.creator.is_some() {
        ItemKind::Draft
    } else {
        return None;
    };

    let author = content
        .author
        .or(content.creator)
        .map(|a| a.login)
        .unwrap_or_default();
    let repository = content
        .repository
        .map(|r| format!("{}/{}", r.owner.login, r.name))
        .unwrap_or_default();

    Some(Item {
        id: raw.id,
        kind,
        number: content.number,
        title: content.title.unwrap_or_default(),
        body: content.body.unwrap_or_default(),
        url: content.url.unwrap_or_default(),
        state: content.state.unwrap_or_default(),
        author,
        assignees: logins(content.assignees),
        labels: content
            .labels
            .map(|n| {
                n.nodes
                    .into_iter()
                    .map(|l| Label {
                        name: l.name,
                        color: l.color,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        repository,
        parent: content.parent.map(|r| ItemRef {
            number: r.number,
            title: r.title,
        }),
        sub_issues: refs(content.sub_issues),
        sub_issues_summary: content.sub_issues_summary.map(|s| SubIssuesSummary {
            total: s.total,
            completed: s.completed,
            percent_completed: s.percent_completed,
        }),
        created_at: content.created_at,
        updated_at: content.updated_at,
        fields: route_fields(raw.field_values, names),
    })
}
