use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FileSource, SessionId};

/// Ephemeral local handle used to render a file before remote storage
/// confirms it. Valid only within the process lifetime; never a durable
/// identifier and never persisted remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRef {
    /// Opaque process-local token
    pub token: String,
    pub source_name: String,
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

/// Cache of local previews for pending sessions, keyed by session id
#[derive(Clone, Default)]
pub struct PreviewCache {
    entries: Arc<RwLock<HashMap<SessionId, PreviewRef>>>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive and register a preview for a session; never touches the network
    pub fn register(&self, id: &SessionId, source: &FileSource) -> PreviewRef {
        let preview = PreviewRef {
            token: format!("prv_{}", Uuid::new_v4().simple()),
            source_name: source.name.clone(),
            content_type: source.content_type.clone(),
            size_bytes: source.size_bytes(),
        };
        self.entries.write().insert(id.clone(), preview.clone());
        preview
    }

    /// Look up the preview for a session; absence is not an error
    pub fn get(&self, id: &SessionId) -> Option<PreviewRef> {
        self.entries.read().get(id).cloned()
    }

    /// Release a preview; safe to call on an unknown or already-released id
    pub fn release(&self, id: &SessionId) {
        self.entries.write().remove(id);
    }

    /// Release the whole batch
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
