use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one upload session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random session ID
    pub fn new() -> Self {
        Self(format!("ses_{}", Uuid::new_v4().simple()))
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form used when deriving object keys
    pub fn short(&self) -> &str {
        let inner = self.0.strip_prefix("ses_").unwrap_or(&self.0);
        inner.get(..8).unwrap_or(inner)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One file selected for upload, regardless of where it came from
/// (local disk, pasted URL, remote picker)
#[derive(Debug, Clone)]
pub struct FileSource {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FileSource {
    pub fn new<S: Into<String>>(name: S, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Status of an upload session.
///
/// Transitions are one-directional: `Pending → Transferring → Succeeded |
/// Failed`; nothing leaves a terminal state. The terminal variants carry
/// their payload, so a resolved URL exists exactly when the session
/// succeeded and a failure reason exactly when it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    /// Created, transfer not yet issued
    Pending,
    /// Transfer issued, progress events expected
    Transferring,
    /// Terminal: the object is stored and retrievable at `url`
    Succeeded { url: String },
    /// Terminal: the transfer failed
    Failed { reason: String },
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }

    /// Get status name as string
    pub fn status_name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Transferring => "transferring",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Tracked state for one file's end-to-end upload attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: SessionId,
    pub source_name: String,
    /// Object key the transfer writes to, derived at creation
    pub key: String,
    pub content_type: Option<String>,
    pub status: UploadStatus,
    pub bytes_transferred: u64,
    /// Unknown until the transfer subsystem reports it
    pub total_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    pub(crate) fn new(id: SessionId, source: &FileSource, key: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            source_name: source.name.clone(),
            key,
            content_type: source.content_type.clone(),
            status: UploadStatus::Pending,
            bytes_transferred: 0,
            total_bytes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Progress percentage clamped to [0, 100]; `None` (indeterminate) while
    /// the total is unknown
    pub fn progress_percent(&self) -> Option<f64> {
        let total = self.total_bytes?;
        if total == 0 {
            return Some(100.0);
        }
        Some(((self.bytes_transferred as f64 / total as f64) * 100.0).clamp(0.0, 100.0))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Resolved download URL, present only once the session succeeded
    pub fn result_url(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Succeeded { url } => Some(url),
            _ => None,
        }
    }

    /// Failure reason, present only once the session failed
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// An object resident in remote storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedObject {
    pub key: String,
    pub url: String,
}

/// Terminal outcome reported by the transfer subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success,
    Failure { reason: String },
}

/// Point-in-time view of the orchestrator state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderSnapshot {
    /// Sessions in creation order
    pub sessions: Vec<UploadSession>,
    /// Published uploaded objects, deduplicated by key
    pub uploaded: Vec<UploadedObject>,
}

impl UploaderSnapshot {
    pub fn session(&self, id: &SessionId) -> Option<&UploadSession> {
        self.sessions.iter().find(|session| &session.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(bytes_transferred: u64, total_bytes: Option<u64>) -> UploadSession {
        let source = FileSource::new("f.bin", Bytes::new());
        let mut session = UploadSession::new(SessionId::new(), &source, "uploads/f.bin".into());
        session.bytes_transferred = bytes_transferred;
        session.total_bytes = total_bytes;
        session
    }

    #[test]
    fn percent_is_indeterminate_without_a_total() {
        assert_eq!(session_with(512, None).progress_percent(), None);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(session_with(50, Some(200)).progress_percent(), Some(25.0));
        assert_eq!(session_with(500, Some(200)).progress_percent(), Some(100.0));
    }

    #[test]
    fn zero_byte_total_reads_as_complete() {
        assert_eq!(session_with(0, Some(0)).progress_percent(), Some(100.0));
    }

    #[test]
    fn terminal_payloads_are_status_scoped() {
        let mut session = session_with(0, None);
        assert_eq!(session.result_url(), None);
        assert_eq!(session.error(), None);

        session.status = UploadStatus::Succeeded {
            url: "memory://blobs/f".into(),
        };
        assert_eq!(session.result_url(), Some("memory://blobs/f"));
        assert_eq!(session.error(), None);
        assert!(session.is_terminal());
    }

    #[test]
    fn session_ids_are_prefixed_and_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert!(a.as_str().starts_with("ses_"));
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
    }
}
