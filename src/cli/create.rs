use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use boardtree::github::{CreatedIssue, NewIssue};
use boardtree::{Client, Config, Project};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::prompt_to_proceed;
use super::terminal::Colorize;

/// Name of the tool-call objects extracted from the task definition file.
const TOOL_NAME: &str = "create_test_case_task";

/// Command arguments for `boardtree create`.
#[derive(Debug, Parser)]
#[command(about = "Create test-case tasks from a JSON definition file")]
pub struct Create {
    /// Path to the JSON file containing task definitions
    file: PathBuf,

    /// Show what would be created without actually creating tasks
    #[arg(short, long)]
    dry_run: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    yes: bool,

    /// Save results to a JSON file
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// One test-case task extracted from the definition file.
#[derive(Debug, Clone, Deserialize)]
struct TaskSpec {
    title: String,
    #[serde(default)]
    body: String,
    /// Issue number of the parent task in the same repository.
    parent_task_number: Option<u64>,
    /// `owner/name` of the repository the issue is created in.
    repository: Option<String>,
    #[serde(default)]
    assignees: Vec<String>,
    #[serde(default)]
    labels: Vec<String>,
    test_id: Option<String>,
    /// Project number override; the config value applies when absent.
    project_id: Option<u64>,
}

#[derive(Debug, Serialize)]
struct RunResults {
    total: usize,
    success: usize,
    failed: usize,
    skipped: usize,
    results: Vec<TaskOutcome>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum TaskOutcome {
    Success {
        title: String,
        issue_number: u64,
        issue_url: String,
    },
    Failed {
        title: String,
        error: String,
    },
    Skipped {
        title: String,
        reason: String,
    },
}

impl Create {
    #[instrument(level = "debug", skip_all, fields(file = %self.file.display()))]
    pub fn run(self, client: &Client, config: &Config, org: Option<String>) -> anyhow::Result<()> {
        let content = std::fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let data: Value = serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", self.file.display()))?;

        let mut calls = Vec::new();
        find_tool_calls(&data, TOOL_NAME, &mut calls);

        if calls.is_empty() {
            println!(
                "{}",
                format!("⚠️  No {TOOL_NAME} tool calls found in the JSON file").warning()
            );
            return Ok(());
        }

        println!("\n📋 Found {} test case(s) to create", calls.len());

        if self.dry_run {
            println!("\n{}\n", "🔍 DRY RUN MODE - No tasks will be created".info());
            println!("{}", "=".repeat(80).dim());
            for (position, call) in calls.iter().enumerate() {
                print_preview(position + 1, call);
            }
            println!("\n{}", "=".repeat(80).dim());
            return Ok(());
        }

        if !self.yes {
            println!("About to create {} task(s) on GitHub", calls.len());
            prompt_to_proceed()?;
        }

        let org = org.context("an organization is required; pass --org or set GITHUB_ORG")?;

        let mut results = RunResults {
            total: calls.len(),
            success: 0,
            failed: 0,
            skipped: 0,
            results: Vec::new(),
        };
        let mut cache = LookupCache::default();

        // Malformed definitions are dropped up front; the run continues with
        // the rest.
        let (specs, skips) = decode_specs(calls);
        for skip in &skips {
            if let TaskOutcome::Skipped { title, reason } = skip {
                println!(
                    "{}",
                    format!("⏭️  Skipping '{title}': {reason}").warning()
                );
            }
        }
        results.skipped = skips.len();
        results.results.extend(skips);

        println!("\n{}", "=".repeat(80).dim());
        println!("Creating test case tasks...");
        println!("{}\n", "=".repeat(80).dim());

        let planned = specs.len();
        for (position, spec) in specs.into_iter().enumerate() {
            let title = spec.title.clone();
            println!("{}/{planned}: Creating '{title}'", position + 1);

            match create_task(client, config, &org, &spec, &mut cache) {
                Ok(issue) => {
                    results.success += 1;
                    println!("{}", format!("         ✅ Created: #{}", issue.number).success());
                    println!("         🔗 {}", issue.url);
                    results.results.push(TaskOutcome::Success {
                        title,
                        issue_number: issue.number,
                        issue_url: issue.url,
                    });
                }
                Err(error) => {
                    results.failed += 1;
                    println!("{}", format!("         ❌ Failed: {error:#}").error());
                    results.results.push(TaskOutcome::Failed {
                        title,
                        error: format!("{error:#}"),
                    });
                }
            }
            println!();
        }

        print_summary(&results);

        if let Some(path) = &self.output {
            let rendered = serde_json::to_string_pretty(&results)?;
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write results to {}", path.display()))?;
            println!("\n💾 Results saved to: {}", path.display());
        }

        if results.failed > 0 {
            anyhow::bail!("{} of {} task(s) failed", results.failed, results.total);
        }
        Ok(())
    }
}

/// Node-id lookups resolved once per run.
#[derive(Debug, Default)]
struct LookupCache {
    repositories: HashMap<String, String>,
    users: HashMap<String, String>,
    projects: HashMap<u64, Project>,
}

/// Decodes tool-call arguments, separating malformed definitions into
/// skip outcomes.
fn decode_specs(calls: Vec<Value>) -> (Vec<TaskSpec>, Vec<TaskOutcome>) {
    let mut specs = Vec::new();
    let mut skips = Vec::new();
    for call in calls {
        let title = call
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled")
            .to_string();
        match serde_json::from_value::<TaskSpec>(call) {
            Ok(spec) => specs.push(spec),
            Err(error) => skips.push(TaskOutcome::Skipped {
                title,
                reason: error.to_string(),
            }),
        }
    }
    (specs, skips)
}

/// Creates one test-case issue: create, link under its parent, add to the
/// project, and set the test identifier field.
fn create_task(
    client: &Client,
    config: &Config,
    org: &str,
    spec: &TaskSpec,
    cache: &mut LookupCache,
) -> anyhow::Result<CreatedIssue> {
    let repository = spec
        .repository
        .as_deref()
        .context("task definition is missing 'repository'")?;
    let (owner, repo) = split_repository(repository)
        .with_context(|| format!("invalid repository '{repository}', expected owner/name"))?;

    let repository_id = match cache.repositories.get(repository) {
        Some(id) => id.clone(),
        None => {
            let id = client.repository_id(owner, repo)?;
            cache
                .repositories
                .insert(repository.to_string(), id.clone());
            id
        }
    };

    let mut assignee_ids = Vec::new();
    for login in &spec.assignees {
        let id = match cache.users.get(login) {
            Some(id) => id.clone(),
            None => {
                let id = client.user_id(login)?;
                cache.users.insert(login.clone(), id.clone());
                id
            }
        };
        assignee_ids.push(id);
    }

    let label_ids = if spec.labels.is_empty() {
        Vec::new()
    } else {
        client.label_ids(owner, repo, &spec.labels)?
    };

    let issue = client.create_issue(&NewIssue {
        repository_id,
        title: spec.title.clone(),
        body: spec.body.clone(),
        assignee_ids,
        label_ids,
    })?;

    if let Some(parent_number) = spec.parent_task_number {
        let parent_id = client.issue_id(owner, repo, parent_number)?;
        client
            .link_sub_issue(&parent_id, &issue.id)
            .with_context(|| format!("failed to link #{} under #{parent_number}", issue.number))?;
    }

    let project_number = spec
        .project_id
        .or(config.project)
        .context("task definition has no 'project_id' and no default is configured")?;
    let project = match cache.projects.entry(project_number) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => entry.insert(client.project(org, project_number)?),
    };

    let item_id = client.add_item_to_project(&project.id, &issue.id)?;

    if let Some(test_id) = &spec.test_id {
        let field_id = project.field_id(&config.fields.test_id).with_context(|| {
            format!(
                "project '{}' has no '{}' field",
                project.title, config.fields.test_id
            )
        })?;
        client.update_text_field(&project.id, &item_id, field_id, test_id)?;
    }

    Ok(issue)
}

/// Recursively collects the `arguments` of every matching tool-call object.
fn find_tool_calls(value: &Value, tool: &str, out: &mut Vec<Value>) {
    match value {
        Value::Object(map) => {
            if map.get("tool").and_then(Value::as_str) == Some(tool) {
                if let Some(arguments) = map.get("arguments") {
                    out.push(arguments.clone());
                }
            }
            for nested in map.values() {
                find_tool_calls(nested, tool, out);
            }
        }
        Value::Array(values) => {
            for nested in values {
                find_tool_calls(nested, tool, out);
            }
        }
        _ => {}
    }
}

fn split_repository(repository: &str) -> Option<(&str, &str)> {
    let (owner, repo) = repository.split_once('/')?;
    (!owner.is_empty() && !repo.is_empty() && !repo.contains('/')).then_some((owner, repo))
}

fn print_preview(position: usize, call: &Value) {
    let field = |name: &str| {
        call.get(name)
            .map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "N/A".to_string())
    };

    println!("\n{position}. {}", field("title"));
    println!("   Parent: #{}", field("parent_task_number"));
    println!("   Project: {}", field("project_id"));
    let assignees = call
        .get("assignees")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    println!("   Assignees: {assignees}");
    println!("   Test ID: {}", field("test_id"));
}

fn print_summary(results: &RunResults) {
    println!("{}", "=".repeat(80).dim());
    println!("📊 SUMMARY");
    println!("{}", "=".repeat(80).dim());
    println!("Total tasks:      {}", results.total);
    println!("✅ Created:       {}", results.success);
    println!("❌ Failed:        {}", results.failed);
    println!("⏭️  Skipped:       {}", results.skipped);
    println!("{}", "=".repeat(80).dim());

    if results.failed > 0 {
        println!("\n{}", "⚠️  Failed tasks:".warning());
        for outcome in &results.results {
            if let TaskOutcome::Failed { title, error } = outcome {
                println!("  - {title}");
                println!("    Error: {error}");
            }
        }
    }
    if results.success > 0 {
        println!(
            "\n{}",
            format!("✅ Successfully created {} test case(s)", results.success).success()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_calls_are_found_at_any_depth() {
        let data = json!({
            "conversation": [
                {"role": "assistant", "content": [
                    {"tool": "create_test_case_task", "arguments": {"title": "First"}},
                    {"tool": "unrelated_tool", "arguments": {"title": "Skip me"}}
                ]},
                {"nested": {"deeper": {"tool": "create_test_case_task", "arguments": {"title": "Second"}}}}
            ]
        });

        let mut calls = Vec::new();
        find_tool_calls(&data, TOOL_NAME, &mut calls);

        let titles: Vec<&str> = calls
            .iter()
            .filter_map(|call| call.get("title").and_then(Value::as_str))
            .collect();
        assert_eq!(titles, ["First", "Second"]);
    }

    #[test]
    fn tool_call_without_arguments_is_ignored() {
        let data = json!({"tool": "create_test_case_task"});
        let mut calls = Vec::new();
        find_tool_calls(&data, TOOL_NAME, &mut calls);
        assert!(calls.is_empty());
    }

    #[test]
    fn task_spec_fills_defaults() {
        let spec: TaskSpec = serde_json::from_value(json!({
            "title": "Verify retries",
            "repository": "acme/widgets",
            "parent_task_number": 12,
            "test_id": "QA-3"
        }))
        .unwrap();

        assert_eq!(spec.title, "Verify retries");
        assert!(spec.body.is_empty());
        assert!(spec.assignees.is_empty());
        assert!(spec.labels.is_empty());
        assert_eq!(spec.parent_task_number, Some(12));
        assert!(spec.project_id.is_none());
    }

    #[test]
    fn malformed_definitions_are_skipped_not_fatal() {
        let calls = vec![
            json!({"title": "Good", "repository": "acme/widgets"}),
            json!({"title": "Bad", "parent_task_number": "twelve"}),
        ];

        let (specs, skips) = decode_specs(calls);

        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].title, "Good");
        match skips.as_slice() {
            [TaskOutcome::Skipped { title, reason }] => {
                assert_eq!(title, "Bad");
                assert!(!reason.is_empty());
            }
            other => panic!("expected one skip, got {other:?}"),
        }
    }

    #[test]
    fn repository_must_be_owner_slash_name() {
        assert_eq!(split_repository("acme/widgets"), Some(("acme", "widgets")));
        assert!(split_repository("widgets").is_none());
        assert!(split_repository("/widgets").is_none());
        assert!(split_repository("acme/").is_none());
        assert!(split_repository("a/b/c").is_none());
    }
}
