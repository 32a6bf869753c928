use anyhow::Context;
use boardtree::{Client, Config, Filters, Hierarchy, Item, ItemKind, MatchPolicy, Project};
use clap::{Parser, ValueEnum};
use regex::Regex;
use serde_json::json;
use tracing::instrument;

use super::terminal::{terminal_width, Colorize};

/// Command arguments for `boardtree list`.
#[derive(Debug, Parser)]
#[command(about = "List project items with filters and relationship views")]
pub struct List {
    /// Project number, e.g. 745 from the board URL (defaults to the config
    /// file value)
    #[arg(short, long)]
    project: Option<u64>,

    /// Filter by item type
    #[arg(long = "type", value_enum, value_name = "TYPE")]
    kind: Option<KindFilter>,

    /// Filter by status field value (case-insensitive)
    #[arg(long)]
    status: Option<String>,

    /// Filter by assignee login
    #[arg(long)]
    assignee: Option<String>,

    /// Filter by label name (case-insensitive)
    #[arg(long)]
    label: Option<String>,

    /// Case-insensitive substring match against title/body
    #[arg(long, conflicts_with = "regex")]
    contains: Option<String>,

    /// Regular expression match against title/body
    #[arg(long)]
    regex: Option<String>,

    /// Output format (default: table)
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Show item description/body content in the output
    #[arg(long)]
    show_description: bool,

    /// Parent assignment when heuristics match several candidates
    #[arg(long, value_enum, default_value_t)]
    policy: Policy,

    /// Suppress progress messages
    #[arg(short, long)]
    quiet: bool,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Tree,
    Json,
    StatusGroups,
}

/// Item kinds accepted by `--type`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindFilter {
    Issue,
    PullRequest,
    Draft,
}

impl From<KindFilter> for ItemKind {
    fn from(kind: KindFilter) -> Self {
        match kind {
            KindFilter::Issue => Self::Issue,
            KindFilter::PullRequest => Self::PullRequest,
            KindFilter::Draft => Self::Draft,
        }
    }
}

/// Heuristic parent assignment policies.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum Policy {
    #[default]
    FirstWins,
    MultiParent,
}

impl From<Policy> for MatchPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::FirstWins => Self::FirstWins,
            Policy::MultiParent => Self::MultiParent,
        }
    }
}

impl List {
    #[instrument(level = "debug", skip_all)]
    pub fn run(self, client: &Client, config: &Config, org: Option<String>) -> anyhow::Result<()> {
        let org = org.context("an organization is required; pass --org or set GITHUB_ORG")?;
        let number = self.project.or(config.project).context(
            "a project number is required; pass --project or set it in .boardtree.toml",
        )?;

        if !self.quiet {
            eprintln!("Fetching project {number} from organization {org}...");
        }
        let project = client.project(&org, number)?;
        if !self.quiet {
            eprintln!("Found project: {}", project.title);
        }

        let mut items = client.items(&project.id, &config.fields)?;
        if !self.quiet {
            eprintln!("Retrieved {} items", items.len());
        }

        let filters = self.filters()?;
        if filters.any() {
            filters.apply(&mut items);
            if !self.quiet {
                eprintln!("{} items after filtering", items.len());
            }
        }

        match self.output {
            OutputFormat::Table => self.render_table(&project, &items),
            OutputFormat::Tree => self.render_tree(&project, &items),
            OutputFormat::Json => render_json(&project, &items, &filters)?,
            OutputFormat::StatusGroups => self.render_status_groups(&project, &items),
        }
        Ok(())
    }

    fn filters(&self) -> anyhow::Result<Filters> {
        let regex = self
            .regex
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("invalid --regex pattern")?;

        Ok(Filters {
            kind: self.kind.map(Into::into),
            status: self.status.clone(),
            assignee: self.assignee.clone(),
            label: self.label.clone(),
            contains: self.contains.clone(),
            regex,
        })
    }

    fn render_tree(&self, project: &Project, items: &[Item]) {
        println!("\n🌲 Project Relationship Tree: {}", project.title);
        print_board_header(project, self.show_description);

        if items.is_empty() {
            println!("No items found matching the criteria.");
            return;
        }

        let hierarchy = Hierarchy::resolve(items, self.policy.into());
        for warning in hierarchy.warnings() {
            eprintln!("{}", format!("⚠️  {warning}").warning());
        }

        if !hierarchy.has_relationships() {
            println!("\n📋 No clear task relationships found. Displaying flat list:");
            for line in flat_lines(items, self.show_description) {
                println!("{line}");
            }
            return;
        }

        for line in tree_lines(&hierarchy, self.show_description) {
            println!("{line}");
        }

        let orphans: Vec<&Item> = hierarchy.orphans().collect();
        if !orphans.is_empty() {
            println!("\n📄 Independent Tasks ({} items):", orphans.len());
            for orphan in orphans {
                for line in task_lines(orphan, "├── ", self.show_description, false) {
                    println!("{line}");
                }
            }
        }
    }

    fn render_table(&self, project: &Project, items: &[Item]) {
        println!("\n🎯 Project: {}", project.title);
        print_board_header(project, self.show_description);
        println!("📊 Total items: {}", items.len());

        if items.is_empty() {
            println!("No items found matching the criteria.");
            return;
        }

        let title_width = terminal_width().map_or(50, |w| usize::from(w / 3).clamp(30, 80));

        let mut headers = vec![
            "Type",
            "Title",
            "Repository",
            "State",
            "Author",
            "Assignees",
            "Status",
        ];
        if self.show_description {
            headers.push("Description");
        }

        let mut data: Vec<Vec<String>> = Vec::new();
        for item in items {
            let mut row = vec![
                item.kind.label().to_string(),
                truncate(&item.title, title_width),
                truncate(&item.repository, 30),
                title_case(&item.state),
                item.author.clone(),
                assignee_summary(&item.assignees),
                item.fields.status.clone().unwrap_or_else(|| "N/A".to_string()),
            ];
            if self.show_description {
                let flattened = item.body.replace(['\n', '\r'], " ");
                let description = truncate(&flattened, 100);
                row.push(if description.is_empty() {
                    "N/A".to_string()
                } else {
                    description
                });
            }
            data.push(row);
        }

        // Column widths for alignment.
        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                data.iter()
                    .map(|row| row[idx].chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(header.len())
            })
            .collect();

        for (header, width) in headers.iter().zip(&widths) {
            print!("{header:<width$}  ");
        }
        println!();
        for width in &widths {
            print!("{:-<width$}  ", "");
        }
        println!();

        for row in data {
            for (value, width) in row.iter().zip(&widths) {
                print!("{value:<width$}  ");
            }
            println!();
        }
    }

    fn render_status_groups(&self, project: &Project, items: &[Item]) {
        println!("\n📊 Project Status Groups: {}", project.title);
        print_board_header(project, self.show_description);

        if items.is_empty() {
            println!("No items found matching the criteria.");
            return;
        }

        for (status, group) in status_groups(items) {
            println!("\n📁 {status} ({} items)", group.len());
            for (position, item) in group.iter().enumerate() {
                let prefix = if position + 1 == group.len() {
                    "└── "
                } else {
                    "├── "
                };
                for line in task_lines(item, prefix, self.show_description, false) {
                    println!("{line}");
                }
            }
        }
    }
}

fn print_board_header(project: &Project, show_description: bool) {
    println!(
        "📄 Description: {}",
        project.short_description.as_deref().unwrap_or("N/A")
    );
    println!("🔗 URL: {}", project.url);
    if show_description {
        println!("📝 Task descriptions will be shown");
    }
    println!("{}", "=".repeat(80).dim());
}

fn render_json(project: &Project, items: &[Item], filters: &Filters) -> anyhow::Result<()> {
    let output = json!({
        "project": project,
        "items": items,
        "total_count": items.len(),
        "filters_applied": filters.summary(),
    });
    serde_json::to_writer_pretty(std::io::stdout(), &output)
        .context("failed to render json output")?;
    println!();
    Ok(())
}

/// Groups items by their status field, preserving first-seen order.
fn status_groups(items: &[Item]) -> Vec<(String, Vec<&Item>)> {
    let mut groups: Vec<(String, Vec<&Item>)> = Vec::new();
    for item in items {
        let status = item
            .fields
            .status
            .clone()
            .unwrap_or_else(|| "No Status".to_string());
        match groups.iter_mut().find(|(name, _)| *name == status) {
            Some((_, members)) => members.push(item),
            None => groups.push((status, vec![item])),
        }
    }
    groups
}

/// Lines for the whole relationship tree, depth-first from the roots.
///
/// Traversal is iterative with an explicit stack, so a deep chain cannot
/// overflow the call stack. Children are pushed in reverse so they pop in
/// attachment order.
fn tree_lines(hierarchy: &Hierarchy<'_>, show_description: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let roots: Vec<&Item> = hierarchy.roots().collect();
    let mut stack: Vec<(&Item, usize)> = roots.into_iter().rev().map(|item| (item, 0)).collect();

    while let Some((item, level)) = stack.pop() {
        let indent = "    ".repeat(level);
        let prefix = if level > 0 {
            format!("{indent}└── ")
        } else {
            format!("{indent}│ ")
        };
        lines.extend(task_lines(item, &prefix, show_description, true));

        let children: Vec<&Item> = hierarchy.children_of(&item.id).collect();
        for child in children.into_iter().rev() {
            stack.push((child, level + 1));
        }
    }
    lines
}

/// Lines for a flat listing with `├──`/`└──` prefixes.
fn flat_lines(items: &[Item], show_description: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for (position, item) in items.iter().enumerate() {
        let prefix = if position + 1 == items.len() {
            "└── "
        } else {
            "├── "
        };
        lines.extend(task_lines(item, prefix, show_description, false));
    }
    lines
}

/// Lines for one item: the title line plus indented detail lines.
fn task_lines(item: &Item, prefix: &str, show_description: bool, in_tree: bool) -> Vec<String> {
    let mut lines = Vec::new();

    let mut title_line = format!("{prefix}{} {}", icon(item), item.title);
    if let Some(number) = item.number {
        title_line.push_str(&format!(" #{number}"));
    }
    if !item.repository.is_empty() {
        title_line.push_str(&format!(" ({})", item.repository));
    }
    lines.push(title_line);

    let detail = format!(
        "    {}",
        prefix.replace("├── ", "│   ").replace("└── ", "    ")
    );

    // Test cases always show their body; it carries the test steps.
    let title_lower = item.title.to_lowercase();
    let is_test_case = title_lower.contains("verify that") || title_lower.contains("test case");
    if (show_description || is_test_case) && !item.body.is_empty() {
        lines.push(format!("{detail}📝 Description:"));
        for line in item.body.trim().lines() {
            lines.push(format!("{detail}   {}", line.trim()));
        }
    }

    if !item.author.is_empty() {
        lines.push(format!("{detail}👤 Author: {}", item.author));
    }
    if !item.assignees.is_empty() {
        lines.push(format!("{detail}👥 Assignees: {}", item.assignees.join(", ")));
    }
    if !item.state.is_empty() {
        lines.push(format!("{detail}🏷️  State: {}", title_case(&item.state)));
    }
    if !item.labels.is_empty() {
        let labels: Vec<&str> = item.labels.iter().map(|label| label.name.as_str()).collect();
        lines.push(format!("{detail}🏷  Labels: {}", labels.join(", ")));
    }
    if let Some(summary) = &item.sub_issues_summary {
        lines.push(format!(
            "{detail}📊 Sub-issues: {}/{} completed ({}%)",
            summary.completed, summary.total, summary.percent_completed
        ));
    }
    // In tree views the structure already shows the parent.
    if !in_tree {
        if let Some(parent) = &item.parent {
            lines.push(format!(
                "{detail}⬆️  Parent: {} #{}",
                parent.title, parent.number
            ));
        }
    }
    if let Some(status) = &item.fields.status {
        lines.push(format!("{detail}📌 Status: {status}"));
    }
    if let Some(acceptance) = &item.fields.acceptance {
        push_field(&mut lines, &detail, "Acceptance", acceptance);
    }
    if let Some(test_type) = &item.fields.test_type {
        push_field(&mut lines, &detail, "Test type", test_type);
    }
    if let Some(test_id) = &item.fields.test_id {
        push_field(&mut lines, &detail, "Test ID", test_id);
    }
    for (name, value) in &item.fields.extra {
        push_field(&mut lines, &detail, name, &value.to_string());
    }
    if !item.url.is_empty() {
        lines.push(format!("{detail}🔗 {}", item.url));
    }

    lines
}

/// Long field values are elided from the detail block.
fn push_field(lines: &mut Vec<String>, detail: &str, name: &str, value: &str) {
    if !value.is_empty() && value.chars().count() < 100 {
        lines.push(format!("{detail}📌 {name}: {value}"));
    }
}

/// Icon for an item, chosen from its labels first and its kind second.
fn icon(item: &Item) -> &'static str {
    let labels: Vec<String> = item
        .labels
        .iter()
        .map(|label| label.name.to_lowercase())
        .collect();

    // More specific labels first.
    if labels.iter().any(|name| name.contains("bug")) {
        return "🐛";
    }
    if labels.iter().any(|name| name.contains("test")) {
        return "🧪";
    }
    if labels.iter().any(|name| name.contains("requirement")) {
        return "📋";
    }
    if labels.iter().any(|name| name.contains("feature")) {
        return "✨";
    }
    if labels.iter().any(|name| name.contains("dev")) {
        return "⚙️";
    }

    match item.kind {
        ItemKind::Issue => "📄",
        ItemKind::PullRequest => "🔀",
        ItemKind::Draft => "📝",
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn assignee_summary(assignees: &[String]) -> String {
    let mut summary = assignees
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if assignees.len() > 3 {
        summary.push_str(&format!(" (+{})", assignees.len() - 3));
    }
    summary
}

/// `OPEN` → `Open`, `pull request` → `Pull Request`.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
