use thiserror::Error;

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DexError>;

/// The error taxonomy of the task graph core.
///
/// Variants are grouped, per spec, into user-input errors, storage errors
/// and remote (GitHub) errors. Each carries a one-line message; an optional
/// [`DexError::hint`] supplies a "Run `list --all` to see all tasks"-style
/// follow-up suggestion callers can surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DexError {
    #[error("task not found: {0}")]
    NotFound(String),

    #[error("task already exists: {0}")]
    AlreadyExists(String),

    #[error("referenced task does not exist: {0}")]
    ReferenceMissing(String),

    #[error("depth exceeded: task would sit more than three levels deep")]
    DepthExceeded,

    #[error("cycle would form: {0}")]
    CycleWouldForm(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("task {0} is already started")]
    AlreadyStarted(String),

    #[error("data corruption in {file} at line {line}: {reason}")]
    DataCorruption {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("storage I/O error: {0}")]
    StorageIO(String),

    #[error("GitHub authentication failed: {0}")]
    GitHubAuth(String),

    #[error("GitHub transport error: {0}")]
    GitHubTransport(String),

    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    GitHubRateLimit { reset_at: String },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// An invariant was violated mid-mutation. This is a programming error,
    /// never expected to surface in practice; the store is never written
    /// when it occurs.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DexError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists(id.into())
    }

    pub fn reference_missing(id: impl Into<String>) -> Self {
        Self::ReferenceMissing(id.into())
    }

    pub fn cycle_would_form(detail: impl Into<String>) -> Self {
        Self::CycleWouldForm(detail.into())
    }

    pub fn precondition_failed(detail: impl Into<String>) -> Self {
        Self::PreconditionFailed(detail.into())
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::ValidationFailed(detail.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::StorageIO(_) | Self::DataCorruption { .. })
    }

    /// Stable machine-readable identifier, e.g. for MCP-style callers.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::ReferenceMissing(_) => "reference_missing",
            Self::DepthExceeded => "depth_exceeded",
            Self::CycleWouldForm(_) => "cycle_would_form",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::AlreadyStarted(_) => "already_started",
            Self::DataCorruption { .. } => "data_corruption",
            Self::StorageIO(_) => "storage_io",
            Self::GitHubAuth(_) => "github_auth",
            Self::GitHubTransport(_) => "github_transport",
            Self::GitHubRateLimit { .. } => "github_rate_limit",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Internal(_) => "internal",
        }
    }

    /// Process exit code for this error at the CLI boundary: `1` for
    /// user-input errors, `2` for storage/I/O failures, `3` for remote sync
    /// failures surfaced to the user.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StorageIO(_) | Self::DataCorruption { .. } => 2,
            Self::GitHubAuth(_) | Self::GitHubTransport(_) | Self::GitHubRateLimit { .. } => 3,
            _ => 1,
        }
    }

    /// A short, user-facing follow-up suggestion, when one exists.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotFound(_) => Some("Run `list --all` to see all tasks".to_string()),
            Self::DepthExceeded => {
                Some("Tasks may be nested at most three levels: epic, task, subtask".to_string())
            }
            Self::AlreadyStarted(_) => Some("Pass force to restart it anyway".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_produce_expected_variants() {
        let err = DexError::not_found("abc12345");
        assert!(err.is_not_found());
        assert_eq!(err.error_kind(), "not_found");
        assert!(err.hint().is_some());
    }

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            DexError::DepthExceeded.to_string(),
            "depth exceeded: task would sit more than three levels deep"
        );
        assert_eq!(
            DexError::AlreadyStarted("abc12345".to_string()).to_string(),
            "task abc12345 is already started"
        );
    }

    #[test]
    fn storage_predicate_covers_both_storage_variants() {
        assert!(DexError::StorageIO("disk full".to_string()).is_storage());
        assert!(DexError::DataCorruption {
            file: "tasks.jsonl".to_string(),
            line: 3,
            reason: "invalid json".to_string()
        }
        .is_storage());
        assert!(!DexError::ValidationFailed("x".to_string()).is_storage());
    }

    #[test]
    fn exit_codes_match_the_cli_boundary_contract() {
        assert_eq!(DexError::not_found("abc12345").exit_code(), 1);
        assert_eq!(DexError::ValidationFailed("x".to_string()).exit_code(), 1);
        assert_eq!(DexError::Internal("x".to_string()).exit_code(), 1);
        assert_eq!(DexError::StorageIO("disk full".to_string()).exit_code(), 2);
        assert_eq!(
            DexError::DataCorruption {
                file: "tasks.jsonl".to_string(),
                line: 3,
                reason: "invalid json".to_string()
            }
            .exit_code(),
            2
        );
        assert_eq!(DexError::GitHubAuth("no token".to_string()).exit_code(), 3);
        assert_eq!(DexError::GitHubTransport("timeout".to_string()).exit_code(), 3);
        assert_eq!(
            DexError::GitHubRateLimit { reset_at: "soon".to_string() }.exit_code(),
            3
        );
    }
}
