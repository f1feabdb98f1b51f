use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SessionId;

/// Minimal stable event protocol for change notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UploaderEvent {
    /// Session was created in the pending state
    SessionCreated {
        session_id: SessionId,
        source_name: String,
        at: DateTime<Utc>,
    },

    /// Transfer was issued to the storage client
    TransferStarted {
        session_id: SessionId,
        at: DateTime<Utc>,
    },

    /// Progress counters moved
    Progress {
        session_id: SessionId,
        bytes_transferred: u64,
        total_bytes: Option<u64>,
        at: DateTime<Utc>,
    },

    /// Session reached its success terminal state
    Succeeded {
        session_id: SessionId,
        key: String,
        url: String,
        at: DateTime<Utc>,
    },

    /// Session reached its failure terminal state
    Failed {
        session_id: SessionId,
        reason: String,
        at: DateTime<Utc>,
    },

    /// Remote listing was merged into the published state
    ListingSynced {
        prefix: String,
        objects: usize,
        at: DateTime<Utc>,
    },
}

impl UploaderEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::TransferStarted { .. } => "transfer_started",
            Self::Progress { .. } => "progress",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::ListingSynced { .. } => "listing_synced",
        }
    }

    /// Get the session ID, if the event concerns a single session
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::SessionCreated { session_id, .. } => Some(session_id),
            Self::TransferStarted { session_id, .. } => Some(session_id),
            Self::Progress { session_id, .. } => Some(session_id),
            Self::Succeeded { session_id, .. } => Some(session_id),
            Self::Failed { session_id, .. } => Some(session_id),
            Self::ListingSynced { .. } => None,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::SessionCreated { at, .. } => at,
            Self::TransferStarted { at, .. } => at,
            Self::Progress { at, .. } => at,
            Self::Succeeded { at, .. } => at,
            Self::Failed { at, .. } => at,
            Self::ListingSynced { at, .. } => at,
        }
    }
}
