//! Edit buffer configuration.
//!
//! # Invariants
//! - `debounce_ms` is non-zero and at most `MAX_DEBOUNCE_MS`.
//! - `retry_delay_ms` never exceeds `debounce_ms`.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default quiet period before a record edit is persisted.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_500;
/// Default delay before the single automatic retry of a failed flush.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
/// Longest accepted quiet period (one hour).
pub const MAX_DEBOUNCE_MS: u64 = 60 * 60 * 1_000;

/// What happens to unflushed edits when a different context is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSwitchPolicy {
    /// Flush every dirty record first; abort the load if any flush fails.
    FlushBeforeSwitch,
    /// Cancel pending writes and drop unflushed edits with a warning log.
    DropPending,
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroDebounce,
    DebounceTooLong { debounce_ms: u64, max_ms: u64 },
    RetryDelayExceedsDebounce { retry_delay_ms: u64, debounce_ms: u64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDebounce => write!(f, "debounce window must be greater than zero"),
            Self::DebounceTooLong {
                debounce_ms,
                max_ms,
            } => write!(
                f,
                "debounce window {debounce_ms}ms exceeds maximum {max_ms}ms"
            ),
            Self::RetryDelayExceedsDebounce {
                retry_delay_ms,
                debounce_ms,
            } => write!(
                f,
                "retry delay {retry_delay_ms}ms exceeds debounce window {debounce_ms}ms"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Timing and switch policy for an `EditBufferStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    pub debounce_ms: u64,
    pub retry_delay_ms: u64,
    pub switch_policy: ContextSwitchPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            switch_policy: ContextSwitchPolicy::FlushBeforeSwitch,
        }
    }
}

impl BufferConfig {
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_switch_policy(mut self, switch_policy: ContextSwitchPolicy) -> Self {
        self.switch_policy = switch_policy;
        self
    }

    /// Checks timing invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::DebounceTooLong {
                debounce_ms: self.debounce_ms,
                max_ms: MAX_DEBOUNCE_MS,
            });
        }
        if self.retry_delay_ms > self.debounce_ms {
            return Err(ConfigError::RetryDelayExceedsDebounce {
                retry_delay_ms: self.retry_delay_ms,
                debounce_ms: self.debounce_ms,
            });
        }
        Ok(())
    }
}
