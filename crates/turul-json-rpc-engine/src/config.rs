//! Configuration types for the JSON-RPC engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout applied by `call` when no explicit timeout is given
    #[serde(with = "duration_serde")]
    pub call_timeout: Duration,

    /// Whether inbound notifications (requests without `id`) get a reply.
    /// JSON-RPC 2.0 says they must not, so this is off by default.
    pub reply_to_notifications: bool,

    /// Pause after a failed receive before the pump tries again
    #[serde(with = "duration_serde")]
    pub receive_error_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(1000),
            reply_to_notifications: false,
            receive_error_backoff: Duration::from_millis(10),
        }
    }
}

impl EngineConfig {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_reply_to_notifications(mut self, reply: bool) -> Self {
        self.reply_to_notifications = reply;
        self
    }

    pub fn with_receive_error_backoff(mut self, backoff: Duration) -> Self {
        self.receive_error_backoff = backoff;
        self
    }
}

// Helper module for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
