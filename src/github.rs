//! GitHub GraphQL API access.
//!
//! [`Client`] wraps a blocking HTTP client with bearer authentication and
//! exposes the project queries and mutations the tool needs. All requests go
//! through a single `graphql` helper that surfaces API-level errors.

mod parse;
mod queries;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::domain::{FieldNames, Item};

const GRAPHQL_URL: &str = "https://api.github.com/graphql";
const PAGE_SIZE: u64 = 100;

/// Errors raised by the GitHub API layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP request itself failed.
    #[error("GitHub API request failed")]
    Http(#[from] reqwest::Error),

    /// The API answered with GraphQL errors.
    #[error("GitHub API error: {0}")]
    Api(String),

    /// The requested project does not exist or is not visible to the token.
    #[error("project {number} not found in organization '{org}'")]
    ProjectNotFound {
        /// Organization login.
        org: String,
        /// Project number.
        number: u64,
    },

    /// The response decoded, but a node the tool relies on was missing.
    #[error("unexpected API response: {0}")]
    Missing(String),
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// A GitHub Projects (v2) board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project node id.
    pub id: String,
    /// Project title.
    pub title: String,
    /// Short description, when set.
    pub short_description: Option<String>,
    /// Whether the project is publicly visible.
    pub public: bool,
    /// Whether the project is closed.
    pub closed: bool,
    /// Project URL.
    pub url: String,
    /// Field definitions on the board.
    #[serde(default, deserialize_with = "flatten_nodes")]
    pub fields: Vec<ProjectField>,
}

/// Deserializes a `{ "nodes": [...] }` connection down to its node list.
fn flatten_nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    struct Connection<T> {
        #[serde(default = "Vec::new")]
        nodes: Vec<T>,
    }
    Ok(Connection::deserialize(deserializer)?.nodes)
}

/// A field defined on a project board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectField {
    /// Field node id.
    pub id: String,
    /// Field name.
    pub name: String,
    /// Field data type (`TEXT`, `NUMBER`, `SINGLE_SELECT`, ...).
    pub data_type: String,
}

impl Project {
    /// The node id of the field with the given name, if the board defines it.
    #[must_use]
    pub fn field_id(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.id.as_str())
    }
}

/// An issue to create.
#[derive(Debug, Clone)]
pub struct NewIssue {
    /// Repository node id.
    pub repository_id: String,
    /// Issue title.
    pub title: String,
    /// Issue body.
    pub body: String,
    /// Assignee node ids.
    pub assignee_ids: Vec<String>,
    /// Label node ids.
    pub label_ids: Vec<String>,
}

/// A freshly created issue.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    /// Issue node id.
    pub id: String,
    /// Issue number.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Issue URL.
    pub url: String,
}

/// Authenticated GitHub GraphQL client.
#[derive(Debug)]
pub struct Client {
    http: reqwest::blocking::Client,
    token: String,
}

impl Client {
    /// Creates a client authenticated with the given token.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("boardtree/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            token: token.into(),
        })
    }

    fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, Error> {
        let response = self
            .http
            .post(GRAPHQL_URL)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()?
            .error_for_status()?;

        let envelope: Envelope<T> = response.json()?;
        if !envelope.errors.is_empty() {
            let messages: Vec<String> = envelope.errors.into_iter().map(|e| e.message).collect();
            return Err(Error::Api(messages.join("; ")));
        }
        envelope
            .data
            .ok_or_else(|| Error::Missing("response carried no data".to_string()))
    }

    /// Fetches a project board by organization login and project number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`] when the organization or project
    /// does not exist, and transport or API errors otherwise.
    #[instrument(skip(self))]
    pub fn project(&self, org: &str, number: u64) -> Result<Project, Error> {
        #[derive(Deserialize)]
        struct Data {
            organization: Option<Organization>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Organization {
            project_v2: Option<Project>,
        }

        let data: Data = self.graphql(
            queries::PROJECT,
            json!({ "org": org, "projectNumber": number }),
        )?;
        data.organization
            .and_then(|o| o.project_v2)
            .ok_or_else(|| Error::ProjectNotFound {
                org: org.to_string(),
                number,
            })
    }

    /// Fetches every item on a project board, following pagination.
    ///
    /// Items without usable content (for example redacted ones) are dropped.
    /// Field values are routed into the domain model using `names`.
    ///
    /// # Errors
    ///
    /// Returns an error when a page request fails.
    #[instrument(skip(self, names))]
    pub fn items(&self, project_id: &str, names: &FieldNames) -> Result<Vec<Item>, Error> {
        #[derive(Deserialize)]
        struct Data {
            node: Option<Node>,
        }
        #[derive(Deserialize)]
        struct Node {
            items: parse::ItemsPage,
        }

        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let data: Data = self.graphql(
                queries::ITEMS,
                json!({ "projectId": project_id, "first": PAGE_SIZE, "after": cursor }),
            )?;
            let page = data
                .node
                .ok_or_else(|| Error::Missing(format!("project node {project_id} not found")))?
                .items;

            debug!(fetched = page.nodes.len(), total = items.len(), "page");
            items.extend(
                page.nodes
                    .into_iter()
                    .filter_map(|raw| parse::item(raw, names)),
            );

            if !page.page_info.has_next_page {
                return Ok(items);
            }
            cursor = page.page_info.end_cursor;
        }
    }

    /// Resolves a repository node id.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository does not exist or the request
    /// fails.
    #[instrument(skip(self))]
    pub fn repository_id(&self, owner: &str, repo: &str) -> Result<String, Error> {
        #[derive(Deserialize)]
        struct Data {
            repository: Option<Id>,
        }

        let data: Data =
            self.graphql(queries::REPOSITORY_ID, json!({ "owner": owner, "repo": repo }))?;
        data.repository
            .map(|r| r.id)
            .ok_or_else(|| Error::Missing(format!("repository {owner}/{repo} not found")))
    }

    /// Resolves an issue node id by repository and issue number.
    ///
    /// # Errors
    ///
    /// Returns an error when the issue does not exist or the request fails.
    #[instrument(skip(self))]
    pub fn issue_id(&self, owner: &str, repo: &str, number: u64) -> Result<String, Error> {
        #[derive(Deserialize)]
        struct Data {
            repository: Option<Repository>,
        }
        #[derive(Deserialize)]
        struct Repository {
            issue: Option<Id>,
        }

        let data: Data = self.graphql(
            queries::ISSUE_ID,
            json!({ "owner": owner, "repo": repo, "number": number }),
        )?;
        data.repository
            .and_then(|r| r.issue)
            .map(|i| i.id)
            .ok_or_else(|| Error::Missing(format!("issue {owner}/{repo}#{number} not found")))
    }

    /// Resolves a user node id by login.
    ///
    /// # Errors
    ///
    /// Returns an error when the user does not exist or the request fails.
    #[instrument(skip(self))]
    pub fn user_id(&self, login: &str) -> Result<String, Error> {
        #[derive(Deserialize)]
        struct Data {
            user: Option<Id>,
        }

        let data: Data = self.graphql(queries::USER_ID, json!({ "username": login }))?;
        data.user
            .map(|u| u.id)
            .ok_or_else(|| Error::Missing(format!("user '{login}' not found")))
    }

    /// Resolves label names to node ids in a repository.
    ///
    /// Names without a matching label are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository does not exist or the request
    /// fails.
    #[instrument(skip(self, wanted))]
    pub fn label_ids(&self, owner: &str, repo: &str, wanted: &[String]) -> Result<Vec<String>, Error> {
        #[derive(Deserialize)]
        struct Data {
            repository: Option<Repository>,
        }
        #[derive(Deserialize)]
        struct Repository {
            labels: parse::Nodes<NamedId>,
        }
        #[derive(Deserialize)]
        struct NamedId {
            id: String,
            name: String,
        }

        let data: Data = self.graphql(queries::LABELS, json!({ "owner": owner, "repo": repo }))?;
        let labels = data
            .repository
            .ok_or_else(|| Error::Missing(format!("repository {owner}/{repo} not found")))?
            .labels
            .nodes;

        let mut ids = Vec::new();
        for name in wanted {
            match labels.iter().find(|l| l.name.eq_ignore_ascii_case(name)) {
                Some(label) => ids.push(label.id.clone()),
                None => warn!(label = %name, "label not found in {owner}/{repo}, skipping"),
            }
        }
        Ok(ids)
    }

    /// Creates an issue.
    ///
    /// # Errors
    ///
    /// Returns an error when the mutation is rejected or the request fails.
    #[instrument(skip(self, issue), fields(title = %issue.title))]
    pub fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            create_issue: Option<Payload>,
        }
        #[derive(Deserialize)]
        struct Payload {
            issue: CreatedIssue,
        }

        let mut input = json!({
            "repositoryId": issue.repository_id,
            "title": issue.title,
            "body": issue.body,
        });
        if !issue.assignee_ids.is_empty() {
            input["assigneeIds"] = json!(issue.assignee_ids);
        }
        if !issue.label_ids.is_empty() {
            input["labelIds"] = json!(issue.label_ids);
        }

        let data: Data = self.graphql(queries::CREATE_ISSUE, json!({ "input": input }))?;
        data.create_issue
            .map(|p| p.issue)
            .ok_or_else(|| Error::Missing("createIssue returned no issue".to_string()))
    }

    /// Links an issue as a sub-issue of a parent issue.
    ///
    /// # Errors
    ///
    /// Returns an error when the mutation is rejected or the request fails.
    #[instrument(skip(self))]
    pub fn link_sub_issue(&self, parent_id: &str, child_id: &str) -> Result<(), Error> {
        let _: Value = self.graphql(
            queries::ADD_SUB_ISSUE,
            json!({ "input": { "issueId": parent_id, "subIssueId": child_id } }),
        )?;
        Ok(())
    }

    /// Adds existing content to a project and returns the new item's id.
    ///
    /// # Errors
    ///
    /// Returns an error when the mutation is rejected or the request fails.
    #[instrument(skip(self))]
    pub fn add_item_to_project(&self, project_id: &str, content_id: &str) -> Result<String, Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            add_project_v2_item_by_id: Option<Payload>,
        }
        #[derive(Deserialize)]
        struct Payload {
            item: Id,
        }

        let data: Data = self.graphql(
            queries::ADD_TO_PROJECT,
            json!({ "input": { "projectId": project_id, "contentId": content_id } }),
        )?;
        data.add_project_v2_item_by_id
            .map(|p| p.item.id)
            .ok_or_else(|| Error::Missing("addProjectV2ItemById returned no item".to_string()))
    }

    /// Sets a text field on a project item.
    ///
    /// # Errors
    ///
    /// Returns an error when the mutation is rejected or the request fails.
    #[instrument(skip(self, text))]
    pub fn update_text_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        text: &str,
    ) -> Result<(), Error> {
        let _: Value = self.graphql(
            queries::UPDATE_FIELD,
            json!({ "input": {
                "projectId": project_id,
                "itemId": item_id,
                "fieldId": field_id,
                "value": { "text": text },
            } }),
        )?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Id {
    id: String,
}
