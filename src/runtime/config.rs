//! Event loop configuration.
//!
//! | Field | Default |
//! |-------|---------|
//! | `default_timeout_ms` | 5000 |
//! | `max_steps` | `Some(1_000_000)` |

/// Default per-test timeout in virtual milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default bound on task invocations per run call.
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;

/// Configuration for an [`EventLoop`](super::EventLoop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Virtual time a test may take before it times out.
    pub default_timeout_ms: u64,
    /// Maximum number of task invocations per run call.
    ///
    /// `None` disables the guard.
    pub max_steps: Option<u64>,
}

impl LoopConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_steps: Some(DEFAULT_MAX_STEPS),
        }
    }

    /// Sets the default per-test timeout.
    #[must_use]
    pub const fn default_timeout_ms(mut self, millis: u64) -> Self {
        self.default_timeout_ms = millis;
        self
    }

    /// Sets the step guard.
    #[must_use]
    pub const fn max_steps(mut self, steps: Option<u64>) -> Self {
        self.max_steps = steps;
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LoopConfig::default();
        assert_eq!(config.default_timeout_ms, 5_000);
        assert_eq!(config.max_steps, Some(DEFAULT_MAX_STEPS));
    }

    #[test]
    fn builder_overrides() {
        let config = LoopConfig::new().default_timeout_ms(50).max_steps(None);
        assert_eq!(config.default_timeout_ms, 50);
        assert_eq!(config.max_steps, None);
    }
}
