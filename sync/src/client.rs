//! A small GitHub REST v3 client covering exactly what sync needs: listing
//! dex-labeled issues, creating/updating one, and acquiring a token.

use std::process::Command;

use dex_core::error::{DexError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{map_status, map_transport};

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "dex-sync";
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: i64,
    pub html_url: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Serialize)]
struct CreateIssue<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [String],
}

#[derive(Debug, Serialize)]
struct UpdateIssue<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
}

/// `owner/name`, as accepted throughout spec §4.6.
#[derive(Debug, Clone)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn parse(spec: &str) -> Result<Self> {
        let (owner, name) = spec
            .split_once('/')
            .ok_or_else(|| DexError::validation(format!("invalid repo reference: {spec}")))?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// An issue reference as accepted by import: a bare number (uses the
/// configured repo), `owner/repo#N`, or a full issue URL.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRef {
    pub repo: Option<RepoRef>,
    pub number: i64,
}

/// Parses `#N`, `owner/repo#N` or `https://github.com/owner/repo/issues/N`.
pub fn parse_issue_ref(spec: &str) -> Result<IssueRef> {
    let spec = spec.trim();
    if let Some(rest) = spec.strip_prefix('#') {
        let number = rest
            .parse()
            .map_err(|_| DexError::validation(format!("invalid issue reference: {spec}")))?;
        return Ok(IssueRef { repo: None, number });
    }
    if let Some(path) = spec
        .strip_prefix("https://github.com/")
        .or_else(|| spec.strip_prefix("http://github.com/"))
    {
        let mut parts = path.splitn(4, '/');
        let owner = parts.next();
        let name = parts.next();
        let kind = parts.next();
        let number = parts.next();
        if let (Some(owner), Some(name), Some("issues"), Some(number)) = (owner, name, kind, number) {
            let number = number
                .trim_end_matches('/')
                .parse()
                .map_err(|_| DexError::validation(format!("invalid issue reference: {spec}")))?;
            return Ok(IssueRef {
                repo: Some(RepoRef {
                    owner: owner.to_string(),
                    name: name.to_string(),
                }),
                number,
            });
        }
        return Err(DexError::validation(format!("invalid issue reference: {spec}")));
    }
    if let Some((repo_part, number_part)) = spec.split_once('#') {
        let repo = RepoRef::parse(repo_part)?;
        let number = number_part
            .parse()
            .map_err(|_| DexError::validation(format!("invalid issue reference: {spec}")))?;
        return Ok(IssueRef { repo: Some(repo), number });
    }
    Err(DexError::validation(format!("invalid issue reference: {spec}")))
}

pub struct GithubClient {
    http: Client,
    token: String,
    repo: RepoRef,
}

impl GithubClient {
    pub fn new(token: impl Into<String>, repo: RepoRef) -> Self {
        Self {
            http: Client::new(),
            token: token.into(),
            repo,
        }
    }

    /// Reads the token from the named environment variable; falls back to
    /// invoking `gh auth token` once if the variable is unset or empty.
    pub fn acquire_token(token_env: &str) -> Result<String> {
        if let Ok(value) = std::env::var(token_env) {
            if !value.trim().is_empty() {
                return Ok(value);
            }
        }
        let output = Command::new("gh")
            .args(["auth", "token"])
            .output()
            .map_err(|e| DexError::GitHubAuth(format!("failed to invoke gh auth token: {e}")))?;
        if !output.status.success() {
            return Err(DexError::GitHubAuth(
                "no GitHub token in environment and `gh auth token` failed".to_string(),
            ));
        }
        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(DexError::GitHubAuth(
                "`gh auth token` returned an empty token".to_string(),
            ));
        }
        Ok(token)
    }

    fn issues_url(&self) -> String {
        format!("{API_BASE}/repos/{}/issues", self.repo)
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let reset_at = resp
            .headers()
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.unwrap_or_default();
        Err(map_status(status, reset_at, &body))
    }

    /// Fetches every issue labeled with `{label_prefix}` (the bare marker
    /// label, not the priority/completion variants), paginated 100-at-a-time
    /// until an empty page, per spec §4.6's identification cache.
    pub async fn list_labeled_issues(&self, label_prefix: &str) -> Result<Vec<Issue>> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let resp = self
                .http
                .get(self.issues_url())
                .bearer_auth(&self.token)
                .header("User-Agent", USER_AGENT)
                .header("Accept", "application/vnd.github+json")
                .query(&[
                    ("labels", label_prefix.to_string()),
                    ("state", "all".to_string()),
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .map_err(map_transport)?;
            let resp = Self::check_response(resp).await?;
            let batch: Vec<Issue> = resp.json().await.map_err(map_transport)?;
            debug!(page, count = batch.len(), "fetched dex-labeled issues page");
            if batch.is_empty() {
                break;
            }
            let fetched_full_page = batch.len() as u32 == PAGE_SIZE;
            all.extend(batch);
            if !fetched_full_page {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    pub async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<Issue> {
        let resp = self
            .http
            .post(self.issues_url())
            .bearer_auth(&self.token)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .json(&CreateIssue { title, body, labels })
            .send()
            .await
            .map_err(map_transport)?;
        let resp = Self::check_response(resp).await?;
        resp.json().await.map_err(map_transport)
    }

    pub async fn update_issue(
        &self,
        number: i64,
        body: Option<&str>,
        labels: Option<&[String]>,
        state: Option<&str>,
    ) -> Result<Issue> {
        let url = format!("{}/{number}", self.issues_url());
        let resp = self
            .http
            .patch(url)
            .bearer_auth(&self.token)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .json(&UpdateIssue { body, labels, state })
            .send()
            .await
            .map_err(map_transport)?;
        let resp = Self::check_response(resp).await?;
        resp.json().await.map_err(map_transport)
    }

    pub async fn get_issue(&self, number: i64) -> Result<Issue> {
        let url = format!("{}/{number}", self.issues_url());
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(map_transport)?;
        let resp = Self::check_response(resp).await?;
        resp.json().await.map_err(map_transport)
    }
}

/// Builds the full label set for a task's current state: the bare prefix
/// marker, a priority label and a completion label, per spec §4.6.
pub fn labels_for(label_prefix: &str, priority: i32, completed: bool) -> Vec<String> {
    vec![
        label_prefix.to_string(),
        format!("{label_prefix}:priority-{priority}"),
        format!(
            "{label_prefix}:{}",
            if completed { "completed" } else { "pending" }
        ),
    ]
}

/// Merges freshly-computed labels with the remote's existing labels,
/// preserving any that sync does not own (spec: "remote-only labels are
/// preserved").
pub fn merge_labels(remote: &[Label], owned_prefix: &str, desired: &[String]) -> Vec<String> {
    let remote_foreign: Vec<String> = remote
        .iter()
        .map(|l| l.name.clone())
        .filter(|name| !name.starts_with(owned_prefix))
        .collect();
    if !remote_foreign.is_empty() {
        warn_once();
    }
    let mut merged = desired.to_vec();
    merged.extend(remote_foreign);
    merged
}

fn warn_once() {
    warn!("preserving remote-only labels outside the sync-owned prefix");
}
