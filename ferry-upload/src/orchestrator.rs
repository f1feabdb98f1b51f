use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use ferry_blob::{BlobClient, TransferEvent};
use futures_util::StreamExt;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::sync::{resolve_with_retry, ListingSynchronizer};
use crate::{
    DefaultKeyStrategy, FileSource, ObjectKeyStrategy, PreviewCache, SessionId, TransferOutcome,
    UploadResult, UploadSession, UploadStatus, UploadedObject, UploaderConfig, UploaderEvent,
    UploaderSnapshot,
};

/// Owns the set of upload sessions and the published uploaded-object list.
///
/// All mutation goes through the ingestion methods; every terminal
/// transition happens under one write-lock hold, so [`snapshot`](Self::snapshot)
/// can never observe a succeeded session without its URL or a half-applied
/// published-list update.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct UploadOrchestrator {
    client: Arc<dyn BlobClient>,
    keys: Arc<dyn ObjectKeyStrategy>,
    config: UploaderConfig,
    state: Arc<RwLock<OrchestratorState>>,
    previews: PreviewCache,
    events: broadcast::Sender<UploaderEvent>,
}

#[derive(Default)]
struct OrchestratorState {
    sessions: HashMap<SessionId, UploadSession>,
    /// Creation order, for stable snapshots
    order: Vec<SessionId>,
    uploaded: Vec<UploadedObject>,
}

impl UploadOrchestrator {
    pub fn new<C: BlobClient + 'static>(client: C, config: UploaderConfig) -> Self {
        Self::with_key_strategy(client, DefaultKeyStrategy, config)
    }

    pub fn with_key_strategy<C, K>(client: C, keys: K, config: UploaderConfig) -> Self
    where
        C: BlobClient + 'static,
        K: ObjectKeyStrategy + 'static,
    {
        let (events, _) = broadcast::channel(config.event_capacity);
        Self {
            client: Arc::new(client),
            keys: Arc::new(keys),
            config,
            state: Arc::new(RwLock::new(OrchestratorState::default())),
            previews: PreviewCache::new(),
            events,
        }
    }

    /// Local preview cache for the current batch
    pub fn previews(&self) -> &PreviewCache {
        &self.previews
    }

    /// Orchestrator configuration
    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<UploaderEvent> {
        self.events.subscribe()
    }

    /// Create one pending session per source and start each transfer.
    ///
    /// Session creation is synchronous and ids are returned in creation
    /// order; the transfers themselves run on independently spawned tasks
    /// and are never awaited here. Must be called within a Tokio runtime.
    pub fn submit(&self, sources: Vec<FileSource>) -> Vec<SessionId> {
        // A new selection supersedes the previous preview batch
        self.previews.clear();

        let mut ids = Vec::with_capacity(sources.len());
        let mut started = Vec::with_capacity(sources.len());

        {
            let mut state = self.state.write();
            for source in sources {
                let id = SessionId::new();
                let key = self
                    .keys
                    .object_key(&self.config.key_prefix, &id, &source.name);
                let session = UploadSession::new(id.clone(), &source, key.clone());

                self.previews.register(&id, &source);
                state.sessions.insert(id.clone(), session);
                state.order.push(id.clone());

                ids.push(id.clone());
                started.push((id, key, source));
            }
        }

        for (id, _, source) in &started {
            let _ = self.events.send(UploaderEvent::SessionCreated {
                session_id: id.clone(),
                source_name: source.name.clone(),
                at: Utc::now(),
            });
        }

        for (id, key, source) in started {
            let this = self.clone();
            tokio::spawn(async move {
                this.drive_transfer(id, key, source.bytes).await;
            });
        }

        ids
    }

    /// Ingest a progress notification from the transfer subsystem.
    ///
    /// Unknown sessions are tolerated silently: the session may have been
    /// evicted while its transfer was still draining events. Counters are
    /// monotonic and clamped to the total once known.
    pub fn ingest_progress(&self, id: &SessionId, bytes_transferred: u64, total_bytes: Option<u64>) {
        let event = {
            let mut state = self.state.write();
            let Some(session) = state.sessions.get_mut(id) else {
                debug!(session_id = %id, "progress for unknown session dropped");
                return;
            };
            if session.is_terminal() {
                debug!(session_id = %id, "progress after terminal state dropped");
                return;
            }

            // Progress implies the transfer is in flight
            if session.status == UploadStatus::Pending {
                session.status = UploadStatus::Transferring;
            }
            if session.total_bytes.is_none() {
                session.total_bytes = total_bytes;
            }

            let mut next = bytes_transferred.max(session.bytes_transferred);
            if let Some(total) = session.total_bytes {
                next = next.min(total);
            }
            session.bytes_transferred = next;
            session.updated_at = Utc::now();

            UploaderEvent::Progress {
                session_id: id.clone(),
                bytes_transferred: session.bytes_transferred,
                total_bytes: session.total_bytes,
                at: Utc::now(),
            }
        };
        let _ = self.events.send(event);
    }

    /// Ingest the terminal notification for a session.
    ///
    /// On success the download URL is resolved first (with bounded retry),
    /// then the transition and the published-list upsert are applied
    /// together, so an observer never sees a succeeded session without its
    /// URL. A duplicate terminal event is dropped.
    pub async fn ingest_terminal(&self, id: &SessionId, outcome: TransferOutcome) {
        let key = {
            let state = self.state.read();
            let Some(session) = state.sessions.get(id) else {
                debug!(session_id = %id, "terminal event for unknown session dropped");
                return;
            };
            if session.is_terminal() {
                warn!(session_id = %id, "duplicate terminal event dropped");
                return;
            }
            session.key.clone()
        };

        match outcome {
            TransferOutcome::Success => {
                let resolved = resolve_with_retry(
                    self.client.as_ref(),
                    &key,
                    self.config.resolve_attempts,
                    self.config.resolve_retry_delay,
                )
                .await;

                match resolved {
                    Ok(url) => self.complete_success(id, &key, url),
                    Err(err) => {
                        let reason = format!(
                            "upload stored but download URL resolution failed after {} attempts: {}",
                            self.config.resolve_attempts, err
                        );
                        self.complete_failure(id, reason);
                    }
                }
            }
            TransferOutcome::Failure { reason } => self.complete_failure(id, reason),
        }
    }

    /// Consistent point-in-time view for presentation
    pub fn snapshot(&self) -> UploaderSnapshot {
        let state = self.state.read();
        let sessions = state
            .order
            .iter()
            .filter_map(|id| state.sessions.get(id).cloned())
            .collect();
        UploaderSnapshot {
            sessions,
            uploaded: state.uploaded.clone(),
        }
    }

    /// Look up one session
    pub fn session(&self, id: &SessionId) -> Option<UploadSession> {
        self.state.read().sessions.get(id).cloned()
    }

    /// Fetch the authoritative remote listing and merge it into the
    /// published list, collapsing duplicates by key (the fresh listing wins).
    /// On failure the previously published list is left untouched.
    pub async fn refresh_remote(&self) -> UploadResult<usize> {
        let synchronizer = ListingSynchronizer::from_shared(self.client.clone())
            .with_resolution_retry(self.config.resolve_attempts, self.config.resolve_retry_delay);
        let remote = synchronizer.sync(&self.config.key_prefix).await?;

        let merged = {
            let mut state = self.state.write();
            let mut next = remote;
            for local in state.uploaded.drain(..) {
                if !next.iter().any(|object| object.key == local.key) {
                    next.push(local);
                }
            }
            state.uploaded = next;
            state.uploaded.len()
        };

        let _ = self.events.send(UploaderEvent::ListingSynced {
            prefix: self.config.key_prefix.clone(),
            objects: merged,
            at: Utc::now(),
        });
        Ok(merged)
    }

    /// Drop terminal sessions from the working set and release their
    /// previews. Progress or terminal events still in flight for an evicted
    /// session are dropped by the ingestion hooks.
    pub fn evict_terminal(&self) -> usize {
        let evicted: Vec<SessionId> = {
            let mut guard = self.state.write();
            let state = &mut *guard;

            let ids: Vec<SessionId> = state
                .order
                .iter()
                .filter(|id| state.sessions.get(*id).map_or(false, |s| s.is_terminal()))
                .cloned()
                .collect();
            for id in &ids {
                state.sessions.remove(id);
            }
            let sessions = &state.sessions;
            state.order.retain(|id| sessions.contains_key(id));
            ids
        };

        for id in &evicted {
            self.previews.release(id);
        }
        evicted.len()
    }

    async fn drive_transfer(&self, id: SessionId, key: String, bytes: Bytes) {
        self.mark_transferring(&id);

        let mut events = match self.client.begin_upload(&key, bytes).await {
            Ok(events) => events,
            Err(err) => {
                self.ingest_terminal(
                    &id,
                    TransferOutcome::Failure {
                        reason: err.to_string(),
                    },
                )
                .await;
                return;
            }
        };

        let mut terminal_seen = false;
        while let Some(event) = events.next().await {
            match event {
                TransferEvent::Progress {
                    bytes_transferred,
                    total_bytes,
                } => {
                    self.ingest_progress(&id, bytes_transferred, total_bytes);
                }
                TransferEvent::Completed { .. } => {
                    terminal_seen = true;
                    self.ingest_terminal(&id, TransferOutcome::Success).await;
                }
                TransferEvent::Failed { reason } => {
                    terminal_seen = true;
                    self.ingest_terminal(&id, TransferOutcome::Failure { reason })
                        .await;
                }
            }
            if terminal_seen {
                break;
            }
        }

        if !terminal_seen {
            self.ingest_terminal(
                &id,
                TransferOutcome::Failure {
                    reason: "transfer ended without a terminal event".to_string(),
                },
            )
            .await;
        }
    }

    fn mark_transferring(&self, id: &SessionId) {
        {
            let mut state = self.state.write();
            let Some(session) = state.sessions.get_mut(id) else {
                return;
            };
            if session.status != UploadStatus::Pending {
                return;
            }
            session.status = UploadStatus::Transferring;
            session.updated_at = Utc::now();
        }
        let _ = self.events.send(UploaderEvent::TransferStarted {
            session_id: id.clone(),
            at: Utc::now(),
        });
    }

    fn complete_success(&self, id: &SessionId, key: &str, url: String) {
        let event = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            let Some(session) = state.sessions.get_mut(id) else {
                return;
            };
            // Re-checked: resolution was awaited outside the lock
            if session.is_terminal() {
                return;
            }
            if let Some(total) = session.total_bytes {
                session.bytes_transferred = total;
            }
            session.status = UploadStatus::Succeeded { url: url.clone() };
            session.updated_at = Utc::now();

            upsert_uploaded(
                &mut state.uploaded,
                UploadedObject {
                    key: key.to_string(),
                    url: url.clone(),
                },
            );

            UploaderEvent::Succeeded {
                session_id: id.clone(),
                key: key.to_string(),
                url,
                at: Utc::now(),
            }
        };
        info!(session_id = %id, key, "upload succeeded");
        let _ = self.events.send(event);
    }

    fn complete_failure(&self, id: &SessionId, reason: String) {
        let event = {
            let mut state = self.state.write();
            let Some(session) = state.sessions.get_mut(id) else {
                return;
            };
            if session.is_terminal() {
                return;
            }
            session.status = UploadStatus::Failed {
                reason: reason.clone(),
            };
            session.updated_at = Utc::now();

            UploaderEvent::Failed {
                session_id: id.clone(),
                reason,
                at: Utc::now(),
            }
        };
        warn!(session_id = %id, "upload failed");
        let _ = self.events.send(event);
    }
}

/// Published entries collapse by key; a re-upload of the same key replaces
/// the previous URL.
fn upsert_uploaded(uploaded: &mut Vec<UploadedObject>, object: UploadedObject) {
    if let Some(existing) = uploaded.iter_mut().find(|o| o.key == object.key) {
        *existing = object;
    } else {
        uploaded.push(object);
    }
}
