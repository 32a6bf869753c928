//! MCP server implementation exposing project board queries as tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use boardtree::domain::{search, FieldNames};
use boardtree::{Client, Filters, Item, ItemIndex, ItemKind, Project};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// MCP server backed by an authenticated GitHub client.
#[derive(Clone)]
pub struct BoardMcpServer {
    /// Shared GraphQL client. Blocking, so every query runs off the runtime.
    client: Arc<Client>,
    /// Board field names with reserved meaning.
    fields: FieldNames,
    /// Organization applied when a tool call does not name one.
    default_org: Option<String>,
    /// Generated router containing all exposed tools.
    tool_router: ToolRouter<Self>,
}

impl BoardMcpServer {
    /// Create a new server around the given client and configuration.
    #[must_use]
    pub fn new(client: Client, fields: FieldNames, default_org: Option<String>) -> Self {
        Self {
            client: Arc::new(client),
            fields,
            default_org,
            tool_router: Self::tool_router(),
        }
    }

    fn serialize<T: Serialize>(value: T, context: &str) -> Result<Value, McpError> {
        serde_json::to_value(value).map_err(|error| {
            McpError::internal_error(
                "failed to serialize response",
                Some(json!({ "context": context, "reason": error.to_string() })),
            )
        })
    }

    fn success(summary: impl Into<String>, data: Value) -> CallToolResult {
        CallToolResult {
            content: vec![Content::text(summary.into())],
            structured_content: Some(data),
            is_error: Some(false),
            meta: None,
        }
    }

    fn org_or_default(&self, org: Option<String>) -> Result<String, McpError> {
        org.or_else(|| self.default_org.clone()).ok_or_else(|| {
            McpError::invalid_params(
                "`org` is required when no default organization is configured",
                Some(json!({ "field": "org" })),
            )
        })
    }

    /// Fetches the board and all of its items on a blocking worker thread.
    async fn fetch_board(&self, org: &str, number: u64) -> Result<(Project, Vec<Item>), McpError> {
        let client = Arc::clone(&self.client);
        let fields = self.fields.clone();
        let org = org.to_string();

        tokio::task::spawn_blocking(move || {
            let project = client.project(&org, number)?;
            let items = client.items(&project.id, &fields)?;
            Ok::<_, boardtree::github::Error>((project, items))
        })
        .await
        .map_err(|error| {
            McpError::internal_error(
                "board fetch task failed",
                Some(json!({ "reason": error.to_string() })),
            )
        })?
        .map_err(|error| {
            McpError::internal_error(
                "GitHub query failed",
                Some(json!({ "reason": error.to_string() })),
            )
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ProjectTasksParams {
    /// Organization login; the configured default applies when absent.
    #[serde(default)]
    org: Option<String>,
    /// Project number from the board URL.
    project_number: u64,
    /// Filter by label name (case-insensitive).
    #[serde(default)]
    label: Option<String>,
    /// Filter by status field value (case-insensitive).
    #[serde(default)]
    status: Option<String>,
    /// Filter by assignee login.
    #[serde(default)]
    assignee: Option<String>,
    /// Filter by item type: "issue", "pull_request", or "draft_issue".
    #[serde(default)]
    item_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectTasksResponse {
    /// The board the tasks belong to.
    project: Project,
    /// Number of tasks after filtering.
    total_count: usize,
    /// The populated filter criteria.
    filters_applied: BTreeMap<&'static str, String>,
    /// The matching tasks.
    tasks: Vec<Item>,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ChildTasksParams {
    /// Organization login; the configured default applies when absent.
    #[serde(default)]
    org: Option<String>,
    /// Project number from the board URL.
    project_number: u64,
    /// Issue number of the parent task. Takes precedence over `taskId`.
    #[serde(default)]
    task_number: Option<u64>,
    /// Stable id of the parent task.
    #[serde(default)]
    task_id: Option<String>,
    /// Filter children by label name (case-insensitive).
    #[serde(default)]
    label: Option<String>,
    /// Filter children by status field value (case-insensitive).
    #[serde(default)]
    status: Option<String>,
    /// Filter children by assignee login.
    #[serde(default)]
    assignee: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChildTasksResponse {
    /// The parent task that was looked up.
    parent_task: Item,
    /// Number of children after filtering.
    total_children: usize,
    /// The populated filter criteria.
    filters_applied: BTreeMap<&'static str, String>,
    /// The declared children present in the project.
    child_tasks: Vec<Item>,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
struct TaskInfoParams {
    /// Organization login; the configured default applies when absent.
    #[serde(default)]
    org: Option<String>,
    /// Project number from the board URL.
    project_number: u64,
    /// Issue number of the task. Takes precedence over `taskId`.
    #[serde(default)]
    task_number: Option<u64>,
    /// Stable id of the task.
    #[serde(default)]
    task_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectSummary {
    /// Project node id.
    id: String,
    /// Project title.
    title: String,
    /// Project URL.
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskInfoResponse {
    /// The board the task belongs to.
    project: ProjectSummary,
    /// The complete task record.
    task: Item,
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
struct FindTaskParams {
    /// Organization login; the configured default applies when absent.
    #[serde(default)]
    org: Option<String>,
    /// Project number from the board URL.
    project_number: u64,
    /// Title text to match. The comparison is case-insensitive and matches
    /// in either direction.
    query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindTaskResponse {
    /// The first task whose title matched the query.
    task: Item,
    /// Tasks whose titles share key terms with the match, as candidate
    /// children when the board asserts no links.
    potential_children: Vec<Item>,
}

#[tool_router]
impl BoardMcpServer {
    #[tool(description = "Get all tasks from a project board with optional filters")]
    async fn get_project_tasks_full(
        &self,
        params: Parameters<ProjectTasksParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let org = self.org_or_default(params.org)?;
        let kind = params.item_type.as_deref().map(parse_kind).transpose()?;

        let (project, mut items) = self.fetch_board(&org, params.project_number).await?;

        let filters = Filters {
            kind,
            status: params.status,
            assignee: params.assignee,
            label: params.label,
            contains: None,
            regex: None,
        };
        let applied = filters.summary();
        filters.apply(&mut items);

        let summary = format!("Found {} tasks in {}", items.len(), project.title);
        let response = ProjectTasksResponse {
            project,
            total_count: items.len(),
            filters_applied: applied,
            tasks: items,
        };
        Ok(Self::success(
            summary,
            Self::serialize(response, "get_project_tasks_full response")?,
        ))
    }

    #[tool(description = "Get the declared child tasks of a parent task")]
    async fn get_child_tasks(
        &self,
        params: Parameters<ChildTasksParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if params.task_number.is_none() && params.task_id.is_none() {
            return Err(McpError::invalid_params(
                "either `taskNumber` or `taskId` is required",
                None,
            ));
        }
        let org = self.org_or_default(params.org)?;

        let (_, items) = self.fetch_board(&org, params.project_number).await?;
        let Some(parent) = find_item(&items, params.task_number, params.task_id.as_deref()) else {
            return Err(task_not_found(params.task_number, params.task_id.as_deref()));
        };

        let index = ItemIndex::new(&items);
        let mut children: Vec<Item> = declared_children(parent, &index)
            .into_iter()
            .cloned()
            .collect();

        let filters = Filters {
            kind: None,
            status: params.status,
            assignee: params.assignee,
            label: params.label,
            contains: None,
            regex: None,
        };
        let applied = filters.summary();
        filters.apply(&mut children);

        let summary = format!("{} children returned for '{}'", children.len(), parent.title);
        let response = ChildTasksResponse {
            parent_task: parent.clone(),
            total_children: children.len(),
            filters_applied: applied,
            child_tasks: children,
        };
        Ok(Self::success(
            summary,
            Self::serialize(response, "get_child_tasks response")?,
        ))
    }

    #[tool(description = "Get detailed information about a single task")]
    async fn get_task_info(
        &self,
        params: Parameters<TaskInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if params.task_number.is_none() && params.task_id.is_none() {
            return Err(McpError::invalid_params(
                "either `taskNumber` or `taskId` is required",
                None,
            ));
        }
        let org = self.org_or_default(params.org)?;

        let (project, items) = self.fetch_board(&org, params.project_number).await?;
        let Some(task) = find_item(&items, params.task_number, params.task_id.as_deref()) else {
            return Err(task_not_found(params.task_number, params.task_id.as_deref()));
        };

        let summary = format!("Fetched task '{}'", task.title);
        let response = TaskInfoResponse {
            project: ProjectSummary {
                id: project.id,
                title: project.title,
                url: project.url,
            },
            task: task.clone(),
        };
        Ok(Self::success(
            summary,
            Self::serialize(response, "get_task_info response")?,
        ))
    }

    #[tool(description = "Find a task by title text and suggest likely children")]
    async fn find_task(
        &self,
        params: Parameters<FindTaskParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if params.query.trim().is_empty() {
            return Err(McpError::invalid_params(
                "`query` is required",
                Some(json!({ "field": "query" })),
            ));
        }
        let org = self.org_or_default(params.org)?;

        let (_, items) = self.fetch_board(&org, params.project_number).await?;
        let Some(task) = search::find_by_title(&items, &params.query) else {
            return Err(McpError::resource_not_found(
                "no task title matches the query",
                Some(json!({ "query": params.query })),
            ));
        };

        let potential_children: Vec<Item> = search::potential_children(task, &items)
            .into_iter()
            .cloned()
            .collect();

        let summary = format!(
            "Matched '{}' with {} candidate children",
            task.title,
            potential_children.len()
        );
        let response = FindTaskResponse {
            task: task.clone(),
            potential_children,
        };
        Ok(Self::success(
            summary,
            Self::serialize(response, "find_task response")?,
        ))
    }
}

#[tool_handler]
impl ServerHandler for BoardMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Use get_project_tasks_full to list board tasks with filters, \
                 get_child_tasks and get_task_info to navigate by number or id, \
                 and find_task to locate a task by title text."
                    .to_string(),
            ),
            ..ServerInfo::default()
        }
    }
}

/// Maps the wire item-type names onto [`ItemKind`].
fn parse_kind(raw: &str) -> Result<ItemKind, McpError> {
    match raw {
        "issue" => Ok(ItemKind::Issue),
        "pull_request" => Ok(ItemKind::PullRequest),
        "draft_issue" => Ok(ItemKind::Draft),
        other => Err(McpError::invalid_params(
            "unknown item type",
            Some(json!({
                "itemType": other,
                "expected": ["issue", "pull_request", "draft_issue"],
            })),
        )),
    }
}

/// Looks up an item by number or id; the number takes precedence.
fn find_item<'a>(items: &'a [Item], number: Option<u64>, id: Option<&str>) -> Option<&'a Item> {
    if let Some(number) = number {
        return items.iter().find(|item| item.number == Some(number));
    }
    id.and_then(|id| items.iter().find(|item| item.id == id))
}

fn task_not_found(number: Option<u64>, id: Option<&str>) -> McpError {
    McpError::resource_not_found(
        "task not found in project",
        Some(json!({ "taskNumber": number, "taskId": id })),
    )
}

/// Resolves a parent's declared sub-issues to items in the same snapshot,
/// dropping references that point outside it.
fn declared_children<'a>(parent: &Item, index: &ItemIndex<'a>) -> Vec<&'a Item> {
    parent
        .sub_issues
        .iter()
        .filter_map(|sub| index.by_number(sub.number))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardtree::domain::ItemRef;

    fn issue(id: &str, number: u64, title: &str) -> Item {
        let mut item = Item::new(id, ItemKind::Issue, title);
        item.number = Some(number);
        item
    }

    #[test]
    fn kind_names_follow_the_wire_format() {
        assert_eq!(parse_kind("issue").unwrap(), ItemKind::Issue);
        assert_eq!(parse_kind("pull_request").unwrap(), ItemKind::PullRequest);
        assert_eq!(parse_kind("draft_issue").unwrap(), ItemKind::Draft);
        assert!(parse_kind("epic").is_err());
    }

    #[test]
    fn lookup_prefers_number_over_id() {
        let items = vec![issue("a", 1, "First"), issue("b", 2, "Second")];

        assert_eq!(find_item(&items, Some(2), Some("a")).unwrap().id, "b");
        assert_eq!(find_item(&items, None, Some("a")).unwrap().id, "a");
        assert!(find_item(&items, Some(9), None).is_none());
        assert!(find_item(&items, None, None).is_none());
    }

    #[test]
    fn declared_children_resolve_within_the_snapshot() {
        let mut parent = issue("parent", 1, "Epic");
        parent.sub_issues = vec![
            ItemRef {
                number: 2,
                title: "In scope".to_string(),
            },
            ItemRef {
                number: 99,
                title: "Out of scope".to_string(),
            },
        ];
        let items = vec![parent.clone(), issue("child", 2, "In scope")];
        let index = ItemIndex::new(&items);

        let children = declared_children(&parent, &index);
        let ids: Vec<&str> = children.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["child"]);
    }
}
