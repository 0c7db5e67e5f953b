/*!
 * Worker pool sizing.
 *
 * Every request makes one script call and up to four media calls, so the
 * pool size follows the rate limits of the script provider.
 */

use crate::app_config::ScriptProvider;

/// Provider-specific concurrency profile with tuned defaults
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerPoolProfile {
    /// Maximum requests processed at once
    pub max_concurrent_requests: usize,
}

impl WorkerPoolProfile {
    /// Get the profile for a given script provider
    pub fn for_provider(provider: ScriptProvider) -> Self {
        match provider {
            ScriptProvider::OpenAI => Self {
                max_concurrent_requests: 10,
            },
            ScriptProvider::Anthropic => Self {
                // Lower rate limits
                max_concurrent_requests: 5,
            },
        }
    }

    /// Get effective pool size, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override
            .unwrap_or(self.max_concurrent_requests)
            .max(1)
    }
}
