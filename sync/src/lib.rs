//! Bidirectional GitHub Issues mirroring for the task graph: issue body
//! rendering/parsing, the REST client, and the dispatch policy that decides
//! when a mutation should trigger a sync (spec §4.6).
//!
//! # Architecture
//!
//! - [`body`] — issue body render/parse, metadata comment encoding
//! - [`client`] — `reqwest`-based GitHub REST client
//! - [`dispatch`] — on-change vs. staleness policy
//! - [`error`] — transport/status-code error mapping

pub mod body;
pub mod client;
pub mod dispatch;
pub mod error;

pub use body::{
    parse_issue_body, parse_metadata_bool, parse_metadata_timestamp, render_issue_body, ParsedIssue,
    ParsedSubtask,
};
pub use client::{labels_for, merge_labels, parse_issue_ref, GithubClient, Issue, IssueRef, RepoRef};
pub use dispatch::should_sync;
