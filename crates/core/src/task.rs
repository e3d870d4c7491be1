//! Task, result, poke, and file descriptor types.
//!
//! Field names on the wire mirror the gateway protocol's JSON names, so a
//! `Task` produced here is recognizably the same document other gateway
//! clients exchange. Optional scalar fields default to empty rather than
//! `Option` wrapping, matching the protocol's zero-value semantics.

use serde::{Deserialize, Serialize};

/// Content types accepted by the silo for [`TaskResult::data`].
pub const MIME_APPLICATION_JSON: &str = "application/json";
/// RFC 7396 merge patch.
pub const MIME_APPLICATION_MERGE_PATCH_JSON: &str = "application/merge-patch+json";
/// RFC 6902 patch list.
pub const MIME_APPLICATION_JSON_PATCH: &str = "application/json-patch+json";

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Terminal (from the gateway's perspective) classification of a task result.
///
/// Exactly one status is set per result. `Queued` is the only status that
/// implies future activity, and that activity travels through the poke
/// channel, not through the task pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Invalid zero value; never produced by the gateway.
    #[default]
    Na,
    /// Completed successfully.
    Ok,
    /// Transient failure; the caller may retry, optionally after
    /// [`TaskResult::retry_in`] seconds.
    Err,
    /// Accepted but deferred; completion arrives later (e.g. via a poke).
    Queued,
    /// Permanent failure; retrying is useless until the caller changes the
    /// input or configuration.
    Ko,
    /// Deliberately not processed; [`TaskResult::message`] explains why.
    Skip,
    /// External signal asking the caller to re-check an intent.
    Poke,
    /// Caller-requested cancellation was honored.
    Cancel,
}

impl TaskStatus {
    /// Whether [`TaskResult::retry_in`] carries meaning for this status.
    pub fn is_retryable(self) -> bool {
        matches!(self, TaskStatus::Err | TaskStatus::Queued)
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of work received over the bus.
///
/// Created by the caller's client, consumed exactly once by a worker, and
/// never persisted by this subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    /// Opaque task identifier; immutable and unique per task instance.
    pub id: String,
    pub job_id: String,
    /// Reference to the silo entry being processed.
    pub silo_entry_id: String,
    pub owner_id: String,
    /// Caller-supplied correlation token, echoed back verbatim on the result.
    pub r#ref: String,
    /// Operation name understood by the task handler.
    pub action: String,
    /// Bearer credential the handler may use for follow-up calls.
    pub token: String,
    /// Caller-visible lifecycle label of the silo entry.
    pub state: String,
    /// Opaque envelope payload.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub envelope: Vec<u8>,
    /// Opaque handler configuration payload.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub config: Vec<u8>,
    /// Pointer into the file side-channel for the envelope payload.
    pub envelope_public_url: String,
    /// Files attached to the silo entry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    /// Issue timestamp, epoch seconds.
    pub ts: f64,
}

impl Task {
    /// Create a task with the given id and action, stamped with the current
    /// time.
    pub fn new(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: action.into(),
            ts: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            ..Self::default()
        }
    }

    /// Attach the job this task belongs to.
    pub fn with_job(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = job_id.into();
        self
    }

    /// Attach the caller's correlation token.
    pub fn with_ref(mut self, r: impl Into<String>) -> Self {
        self.r#ref = r.into();
        self
    }

    /// Attach the envelope payload.
    pub fn with_envelope(mut self, envelope: Vec<u8>) -> Self {
        self.envelope = envelope;
        self
    }
}

// ---------------------------------------------------------------------------
// TaskResult
// ---------------------------------------------------------------------------

/// The outcome of executing a [`Task`]; published exactly once per task to
/// the inbound message's reply address.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskResult {
    pub status: TaskStatus,
    /// Handler-defined short code.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
    /// Copy of the originating task's `ref`, set by the worker.
    pub r#ref: String,
    /// New or patched payload for the silo entry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    /// How [`data`](Self::data) should be interpreted: one of the
    /// `MIME_APPLICATION_*` content types.
    pub content_type: String,
    /// Suggested backoff in seconds; meaningful only when
    /// [`TaskStatus::is_retryable`] holds.
    pub retry_in: u32,
}

impl TaskResult {
    /// Everything went fine.
    pub fn ok() -> Self {
        Self {
            status: TaskStatus::Ok,
            ..Self::default()
        }
    }

    /// Transient failure the caller may retry.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Err,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Permanent failure; the caller must change something before retrying.
    pub fn ko(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Ko,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Deliberately not processed; processing can safely continue.
    pub fn skip(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Skip,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Accepted but deferred; completion will be announced later.
    pub fn queued(retry_in: u32) -> Self {
        Self {
            status: TaskStatus::Queued,
            retry_in,
            ..Self::default()
        }
    }

    /// Attach a handler-defined short code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Attach a result payload and the content type it should be read as.
    pub fn with_data(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.data = data;
        self.content_type = content_type.into();
        self
    }
}

// ---------------------------------------------------------------------------
// TaskPoke
// ---------------------------------------------------------------------------

/// Request to re-surface a queued task, identified by `id` + `job_id`, or by
/// `ref` when those are unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPoke {
    pub id: String,
    pub job_id: String,
    pub r#ref: String,
    pub code: String,
    pub message: String,
}

/// Reply to a [`TaskPoke`]; empty when the poke was accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPokeResponse {
    pub err: Option<RemoteError>,
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Reference to a binary object held by the silo.
///
/// `hash` is the signed digest used as the `h` query parameter of
/// side-channel URLs; `sha256` is the content digest used for integrity
/// verification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub id: String,
    pub silo_entry_id: String,
    pub name: String,
    pub hash: String,
    pub mime: String,
    pub size: u32,
    pub sha256: String,
}

/// Registration request for a new silo file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateFile {
    pub job_id: String,
    pub silo_entry_id: String,
    pub name: String,
    pub description: String,
    pub mime: String,
    pub size: u32,
    pub sha256: String,
}

impl CreateFile {
    /// Fill size, MIME, and SHA-256 from the payload about to be uploaded.
    ///
    /// The MIME type is content-sniffed only when not already set by the
    /// caller. The trade-off of deriving everything from an in-memory slice
    /// is that the full payload must be held in memory.
    pub fn fill_from_data(&mut self, data: &[u8]) {
        self.size = data.len() as u32;
        if self.mime.is_empty() {
            self.mime = crate::sniff::detect_mime(data);
        }
        self.sha256 = crate::hashing::sha256_hex(data);
    }
}

/// Reply to a [`CreateFile`] request: a file reference or an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResponse {
    pub file: Option<File>,
    pub err: Option<RemoteError>,
}

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Error classification used by upstream gateway services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteErrorCode {
    #[default]
    Internal,
    Invalid,
    NotFound,
}

impl std::fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemoteErrorCode::Internal => "INTERNAL",
            RemoteErrorCode::Invalid => "INVALID",
            RemoteErrorCode::NotFound => "NOT_FOUND",
        };
        f.write_str(s)
    }
}

/// Typed error returned by upstream gateway services over the bus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
#[serde(default)]
pub struct RemoteError {
    pub code: RemoteErrorCode,
    pub message: String,
}

impl RemoteError {
    pub fn is_internal(&self) -> bool {
        self.code == RemoteErrorCode::Internal
    }

    pub fn is_validation(&self) -> bool {
        self.code == RemoteErrorCode::Invalid
    }

    pub fn is_not_found(&self) -> bool {
        self.code == RemoteErrorCode::NotFound
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_to_protocol_names() {
        let json = |s: TaskStatus| serde_json::to_string(&s).unwrap();
        assert_eq!(json(TaskStatus::Ok), "\"OK\"");
        assert_eq!(json(TaskStatus::Err), "\"ERR\"");
        assert_eq!(json(TaskStatus::Queued), "\"QUEUED\"");
        assert_eq!(json(TaskStatus::Ko), "\"KO\"");
        assert_eq!(json(TaskStatus::Skip), "\"SKIP\"");
        assert_eq!(json(TaskStatus::Poke), "\"POKE\"");
        assert_eq!(json(TaskStatus::Cancel), "\"CANCEL\"");
        assert_eq!(json(TaskStatus::Na), "\"NA\"");
    }

    #[test]
    fn retry_in_meaningful_only_for_err_and_queued() {
        assert!(TaskStatus::Err.is_retryable());
        assert!(TaskStatus::Queued.is_retryable());
        assert!(!TaskStatus::Ok.is_retryable());
        assert!(!TaskStatus::Ko.is_retryable());
        assert!(!TaskStatus::Skip.is_retryable());
        assert!(!TaskStatus::Cancel.is_retryable());
    }

    #[test]
    fn result_constructors_set_exactly_one_status() {
        assert_eq!(TaskResult::ok().status, TaskStatus::Ok);
        assert_eq!(TaskResult::error("boom").status, TaskStatus::Err);
        assert_eq!(TaskResult::ko("bad config").status, TaskStatus::Ko);
        assert_eq!(TaskResult::skip("nothing to do").status, TaskStatus::Skip);

        let queued = TaskResult::queued(30);
        assert_eq!(queued.status, TaskStatus::Queued);
        assert_eq!(queued.retry_in, 30);
    }

    #[test]
    fn ok_result_has_empty_message() {
        let res = TaskResult::ok();
        assert!(res.message.is_empty());
        assert!(res.code.is_empty());
    }

    #[test]
    fn task_builder_stamps_timestamp() {
        let task = Task::new("t1", "verify").with_job("j1").with_ref("r1");
        assert_eq!(task.id, "t1");
        assert_eq!(task.action, "verify");
        assert_eq!(task.job_id, "j1");
        assert_eq!(task.r#ref, "r1");
        assert!(task.ts > 0.0);
    }

    #[test]
    fn fill_from_data_sniffs_the_mime_type() {
        let mut req = CreateFile::default();
        let data = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

        req.fill_from_data(data);

        assert_eq!(req.mime, "text/xml");
        assert_eq!(req.size, data.len() as u32);
        assert_eq!(req.sha256.len(), 64);
    }

    #[test]
    fn fill_from_data_keeps_an_explicit_mime_type() {
        let mut req = CreateFile {
            mime: "text/plain".into(),
            ..CreateFile::default()
        };

        req.fill_from_data(b"<?xml version=\"1.0\"?>");

        assert_eq!(req.mime, "text/plain");
    }

    #[test]
    fn fill_from_data_computes_the_content_digest() {
        let mut req = CreateFile::default();
        req.fill_from_data(b"hello world");
        assert_eq!(
            req.sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn remote_error_predicates() {
        let err = RemoteError {
            code: RemoteErrorCode::NotFound,
            message: "missing".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_internal());
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "NOT_FOUND: missing");
    }
}
