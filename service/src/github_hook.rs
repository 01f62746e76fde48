//! Wires the transactional façade to the GitHub sync protocol: the
//! concrete [`SyncHook`] the CLI installs when `sync.github.enabled` is
//! true. `dex-sync` stays a pure protocol/client crate; this module is the
//! engine that actually drives it against a task store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dex_core::config::GithubSyncConfig;
use dex_core::error::Result;
use dex_core::graph;
use dex_core::model::{GithubMeta, SyncState, Task, TaskStore};
use dex_storage::AsyncSyncStateStore;
use dex_sync::{labels_for, merge_labels, parse_issue_body, render_issue_body, should_sync, GithubClient, RepoRef};
use tokio::sync::Mutex;

use crate::task_service::SyncHook;

/// Maps a root task id to the GitHub issue number mirroring it, populated
/// lazily from the dex-labeled issue listing on first use (spec §4.6's
/// "identification cache").
struct IdentificationCache {
    by_root_id: HashMap<String, i64>,
    loaded: bool,
}

pub struct GithubSyncHook {
    config: GithubSyncConfig,
    client: GithubClient,
    repo: RepoRef,
    sync_state: Arc<dyn AsyncSyncStateStore>,
    cache: Mutex<IdentificationCache>,
    /// Issue metadata for roots that were just created remotely, keyed by
    /// root id. The task service's caller applies these back onto
    /// `root.metadata.github` via a follow-up `update`; the hook itself
    /// never writes to active storage, to avoid a mutation triggering
    /// another mutation.
    pending_metadata: Mutex<HashMap<String, GithubMeta>>,
}

impl GithubSyncHook {
    pub fn new(
        config: GithubSyncConfig,
        repo: RepoRef,
        token: String,
        sync_state: Arc<dyn AsyncSyncStateStore>,
    ) -> Self {
        Self {
            client: GithubClient::new(token, repo.clone()),
            config,
            repo,
            sync_state,
            cache: Mutex::new(IdentificationCache {
                by_root_id: HashMap::new(),
                loaded: false,
            }),
            pending_metadata: Mutex::new(HashMap::new()),
        }
    }

    /// Takes (removes) any pending GitHub metadata recorded for `root_id`
    /// since the last call. Intended to be polled by the caller right
    /// after a mutation completes.
    pub async fn take_pending_metadata(&self, root_id: &str) -> Option<GithubMeta> {
        self.pending_metadata.lock().await.remove(root_id)
    }

    async fn resolve_issue_number(&self, root: &Task) -> Result<Option<i64>> {
        if let Some(github) = root.metadata.as_ref().and_then(|m| m.github.as_ref()) {
            return Ok(Some(github.issue_number));
        }

        let mut cache = self.cache.lock().await;
        if !cache.loaded {
            let issues = self
                .client
                .list_labeled_issues(&self.config.label_prefix)
                .await?;
            for issue in issues {
                if let Some(body) = &issue.body {
                    let parsed = parse_issue_body(body);
                    if let Some(id) = parsed.root_metadata.get("id") {
                        cache.by_root_id.insert(id.clone(), issue.number);
                    }
                }
            }
            cache.loaded = true;
        }
        Ok(cache.by_root_id.get(&root.id).copied())
    }
}

#[async_trait]
impl SyncHook for GithubSyncHook {
    async fn after_mutation(&self, store: &TaskStore, root_id: &str) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let Some(root) = store.get(root_id) else {
            return Ok(());
        };

        let now = Utc::now();
        let state = self.sync_state.load().await?;
        if !should_sync(&self.config.auto, state.last_sync, now) {
            return Ok(());
        }

        let descendant_ids = graph::descendants(store, root_id);
        let descendants: Vec<&Task> = descendant_ids.iter().filter_map(|id| store.get(id)).collect();
        let body = render_issue_body(root, &descendants);
        let labels = labels_for(&self.config.label_prefix, root.priority, root.completed);
        let state_str = if root.completed { "closed" } else { "open" };

        let issue_number = self.resolve_issue_number(root).await?;
        let issue = match issue_number {
            Some(number) => {
                let remote = self.client.get_issue(number).await?;
                let merged = merge_labels(&remote.labels, &self.config.label_prefix, &labels);
                self.client
                    .update_issue(number, Some(&body), Some(&merged), Some(state_str))
                    .await?
            }
            None => {
                let created = self.client.create_issue(&root.name, &body, &labels).await?;
                self.pending_metadata.lock().await.insert(
                    root.id.clone(),
                    GithubMeta {
                        issue_number: created.number,
                        issue_url: created.html_url.clone(),
                        repo: self.repo.to_string(),
                    },
                );
                created
            }
        };
        let _ = issue;

        self.sync_state
            .save(SyncState { last_sync: Some(now) })
            .await
    }
}
