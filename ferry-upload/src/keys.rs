use crate::SessionId;

/// Strategy for deriving object keys for submitted sources
pub trait ObjectKeyStrategy: Send + Sync {
    /// Derive the storage key for one session's object
    fn object_key(&self, prefix: &str, session_id: &SessionId, source_name: &str) -> String;
}

/// Default key strategy: `<prefix>/<session-short-id>-<sanitized-name>`.
///
/// Keys carry the synthetic session id, so two same-named sources in one
/// batch never collide in storage; the display name stays readable.
#[derive(Debug, Clone, Default)]
pub struct DefaultKeyStrategy;

impl ObjectKeyStrategy for DefaultKeyStrategy {
    fn object_key(&self, prefix: &str, session_id: &SessionId, source_name: &str) -> String {
        format!(
            "{}/{}-{}",
            prefix.trim_end_matches('/'),
            session_id.short(),
            sanitize(source_name)
        )
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
