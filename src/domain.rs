//! Domain models for project boards.
//!
//! This module contains the work item model, the filter criteria, the
//! hierarchy resolver, and tool configuration.

/// Work item model.
pub mod item;
pub use item::{FieldValue, Fields, Item, ItemKind, ItemRef, Label, SubIssuesSummary};

/// Hierarchy reconstruction over a flat item collection.
pub mod hierarchy;
pub use hierarchy::{Hierarchy, ItemIndex, MatchPolicy, Warning};

/// Item filtering.
pub mod filter;
pub use filter::Filters;

/// Fuzzy item lookup.
pub mod search;

mod config;
pub use config::{Config, FieldNames, CONFIG_FILE};
