//! GraphQL documents sent to the GitHub API.

/// Fetch a project by organization login and project number, including its
/// field definitions.
pub const PROJECT: &str = "
query GetProject($org: String!, $projectNumber: Int!) {
    organization(login: $org) {
        projectV2(number: $projectNumber) {
            id
            title
            shortDescription
            public
            closed
            url
            fields(first: 50) {
                nodes {
                    ... on ProjectV2Field { id name dataType }
                    ... on ProjectV2IterationField { id name dataType }
                    ... on ProjectV2SingleSelectField { id name dataType }
                }
            }
        }
    }
}
";

/// Fetch one page of project items with their content and field values.
pub const ITEMS: &str = "
query GetProjectItems($projectId: ID!, $first: Int!, $after: String) {
    node(id: $projectId) {
        ... on ProjectV2 {
            items(first: $first, after: $after) {
                pageInfo { hasNextPage endCursor }
                nodes {
                    id
                    content {
                        ... on Issue {
                            id number title body state
                            createdAt updatedAt url
                            author { login }
                            assignees(first: 10) { nodes { login } }
                            labels(first: 10) { nodes { name color } }
                            repository { name owner { login } }
                            parent { id title number }
                            subIssues(first: 50) { nodes { id title number } }
                            subIssuesSummary { total completed percentCompleted }
                        }
                        ... on PullRequest {
                            id number title body state merged
                            createdAt updatedAt url
                            author { login }
                            assignees(first: 10) { nodes { login } }
                            labels(first: 10) { nodes { name color } }
                            repository { name owner { login } }
                        }
                        ... on DraftIssue {
                            id title body
                            createdAt updatedAt
                            creator { login }
                            assignees(first: 10) { nodes { login } }
                        }
                    }
                    fieldValues(first: 20) {
                        nodes {
                            ... on ProjectV2ItemFieldTextValue {
                                text
                                field { ... on ProjectV2FieldCommon { name } }
                            }
                            ... on ProjectV2ItemFieldNumberValue {
                                number
                                field { ... on ProjectV2FieldCommon { name } }
                            }
                            ... on ProjectV2ItemFieldSingleSelectValue {
                                name
                                field { ... on ProjectV2FieldCommon { name } }
                            }
                            ... on ProjectV2ItemFieldDateValue {
                                date
                                field { ... on ProjectV2FieldCommon { name } }
                            }
                            ... on ProjectV2ItemFieldIterationValue {
                                title
                                field { ... on ProjectV2FieldCommon { name } }
                            }
                        }
                    }
                }
            }
        }
    }
}
";

/// Resolve a repository node id.
pub const REPOSITORY_ID: &str = "
query GetRepositoryId($owner: String!, $repo: String!) {
    repository(owner: $owner, name: $repo) { id }
}
";

/// Resolve an issue node id by repository and issue number.
pub const ISSUE_ID: &str = "
query GetIssueId($owner: String!, $repo: String!, $number: Int!) {
    repository(owner: $owner, name: $repo) {
        issue(number: $number) { id }
    }
}
";

/// Resolve a user node id by login.
pub const USER_ID: &str = "
query GetUserId($username: String!) {
    user(login: $username) { id }
}
";

/// List repository labels for name → id resolution.
pub const LABELS: &str = "
query GetLabels($owner: String!, $repo: String!) {
    repository(owner: $owner, name: $repo) {
        labels(first: 100) { nodes { id name } }
    }
}
";

/// Create a new issue.
pub const CREATE_ISSUE: &str = "
mutation CreateIssue($input: CreateIssueInput!) {
    createIssue(input: $input) {
        issue { id number title url }
    }
}
";

/// Link an issue as a sub-issue of a parent issue.
pub const ADD_SUB_ISSUE: &str = "
mutation LinkSubIssue($input: AddSubIssueInput!) {
    addSubIssue(input: $input) {
        subIssue { id }
    }
}
";

/// Add existing content (an issue or pull request) to a project.
pub const ADD_TO_PROJECT: &str = "
mutation AddProjectV2Item($input: AddProjectV2ItemByIdInput!) {
    addProjectV2ItemById(input: $input) {
        item { id }
    }
}
";

/// Set a project field value on an item.
pub const UPDATE_FIELD: &str = "
mutation UpdateProjectV2ItemFieldValue($input: UpdateProjectV2ItemFieldValueInput!) {
    updateProjectV2ItemFieldValue(input: $input) {
        projectV2Item { id }
    }
}
";
