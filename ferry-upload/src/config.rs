use std::time::Duration;

/// Configuration for the upload orchestrator
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Logical prefix all object keys are namespaced under
    pub key_prefix: String,

    /// Attempts for download-URL resolution after a successful transfer
    pub resolve_attempts: u32,

    /// Delay between resolution attempts
    pub resolve_retry_delay: Duration,

    /// Capacity of the change-notification channel
    pub event_capacity: usize,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            key_prefix: "uploads".to_string(),
            resolve_attempts: 3,
            resolve_retry_delay: Duration::from_millis(250),
            event_capacity: 1024,
        }
    }
}

impl UploaderConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the object key prefix
    pub fn with_key_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the bounded retry for URL resolution (at least one attempt)
    pub fn with_resolve_attempts(mut self, attempts: u32) -> Self {
        self.resolve_attempts = attempts.max(1);
        self
    }

    /// Set the delay between resolution attempts
    pub fn with_resolve_retry_delay(mut self, delay: Duration) -> Self {
        self.resolve_retry_delay = delay;
        self
    }

    /// Set the change-notification channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}
