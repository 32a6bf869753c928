//! GitHub project task retrieval and hierarchy reconstruction.
//!
//! Items are fetched from a GitHub Projects (v2) board and assembled into a
//! parent/child relationship graph, inferring the hierarchy when the source
//! data does not assert one.

pub mod domain;
pub use domain::{Config, Filters, Hierarchy, Item, ItemIndex, ItemKind, MatchPolicy};

pub mod github;
pub use github::{Client, Project};
