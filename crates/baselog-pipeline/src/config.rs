use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the commit pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on waiting for inclusion of the registry write.
    /// `None` waits indefinitely.
    pub confirmation_timeout_ms: Option<u64>,
}

impl PipelineConfig {
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.confirmation_timeout_ms = Some(millis);
        self
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_ms.map(Duration::from_millis)
    }
}
