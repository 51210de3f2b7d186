//! Plugin configuration.
//!
//! # Configuration Precedence
//!
//! 1. **Programmatic**: values set through builder methods
//! 2. **Environment variables**: `MUST_ASSERT_*`, applied by
//!    [`MustAssertConfig::from_env`] or [`MustAssertConfig::apply_env`]
//! 3. **Defaults**: [`MustAssertConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `MUST_ASSERT_LATE_TASKS` | `error` \| `warn` | `on_invoke_task` |
//! | `MUST_ASSERT_IGNORE_STACK` | comma-separated list | `ignore_stack` (appended) |
//! | `MUST_ASSERT_TRACE_LIMIT` | `usize` | `trace_limit` |
//! | `MUST_ASSERT_CAPTURE_BACKTRACE` | `bool` | `capture_backtraces` |

use core::fmt;
use std::sync::Arc;

use crate::observability::{Logger, TracingLogger};
use crate::trace::DEFAULT_TRACE_LIMIT;
use crate::zone::{LateTaskPolicy, OnInvokeTask, RejectLateTasks, ZoneRegistry};

/// Environment variable selecting the built-in late-task policy.
pub const ENV_LATE_TASKS: &str = "MUST_ASSERT_LATE_TASKS";
/// Environment variable with extra stack patterns to elide.
pub const ENV_IGNORE_STACK: &str = "MUST_ASSERT_IGNORE_STACK";
/// Environment variable for the causal-trace length.
pub const ENV_TRACE_LIMIT: &str = "MUST_ASSERT_TRACE_LIMIT";
/// Environment variable enabling backtrace capture at task creation.
pub const ENV_CAPTURE_BACKTRACE: &str = "MUST_ASSERT_CAPTURE_BACKTRACE";

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set to a value that does not parse.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// What the variable accepts.
        expected: &'static str,
        /// The raw value.
        value: String,
    },
}

impl From<ConfigError> for crate::error::Error {
    fn from(err: ConfigError) -> Self {
        Self::config(err.to_string()).with_source(err)
    }
}

/// Configuration of a [`MustAssert`](crate::plugin::MustAssert) instance.
#[derive(Clone)]
pub struct MustAssertConfig {
    /// Hook consulted before every zoned task invocation.
    pub on_invoke_task: Arc<dyn OnInvokeTask>,
    /// Sink for late-task diagnostics.
    pub logger: Arc<dyn Logger>,
    /// Extra substrings; stack frames containing any of them are elided.
    pub ignore_stack: Vec<String>,
    /// Maximum causal-trace length recorded per task.
    pub trace_limit: usize,
    /// Capture a backtrace whenever a zoned task is created.
    pub capture_backtraces: bool,
    /// Registry holding the active-zone pointer.
    pub registry: Arc<ZoneRegistry>,
}

impl MustAssertConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the default configuration with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Applies `MUST_ASSERT_*` overrides that are set in the environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(read_env)
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = lookup(ENV_LATE_TASKS) {
            let policy = val
                .parse::<LateTaskPolicy>()
                .map_err(|_| invalid(ENV_LATE_TASKS, "error|warn", &val))?;
            self.on_invoke_task = policy.hook();
        }
        if let Some(val) = lookup(ENV_IGNORE_STACK) {
            self.ignore_stack.extend(
                val.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from),
            );
        }
        if let Some(val) = lookup(ENV_TRACE_LIMIT) {
            self.trace_limit = parse_usize(ENV_TRACE_LIMIT, &val)?;
        }
        if let Some(val) = lookup(ENV_CAPTURE_BACKTRACE) {
            self.capture_backtraces = parse_bool(ENV_CAPTURE_BACKTRACE, &val)?;
        }
        Ok(())
    }

    /// Installs a custom interception hook.
    #[must_use]
    pub fn on_invoke_task(mut self, hook: impl OnInvokeTask + 'static) -> Self {
        self.on_invoke_task = Arc::new(hook);
        self
    }

    /// Installs one of the built-in interception policies.
    #[must_use]
    pub fn late_task_policy(mut self, policy: LateTaskPolicy) -> Self {
        self.on_invoke_task = policy.hook();
        self
    }

    /// Sets the diagnostics logger.
    #[must_use]
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Adds stack patterns to elide.
    #[must_use]
    pub fn ignore_stack<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_stack.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the causal-trace length.
    #[must_use]
    pub fn trace_limit(mut self, limit: usize) -> Self {
        self.trace_limit = limit;
        self
    }

    /// Enables or disables backtrace capture.
    #[must_use]
    pub fn capture_backtraces(mut self, enabled: bool) -> Self {
        self.capture_backtraces = enabled;
        self
    }

    /// Uses `registry` instead of the process-wide one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<ZoneRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

impl Default for MustAssertConfig {
    fn default() -> Self {
        Self {
            on_invoke_task: Arc::new(RejectLateTasks),
            logger: Arc::new(TracingLogger),
            ignore_stack: Vec::new(),
            trace_limit: DEFAULT_TRACE_LIMIT,
            capture_backtraces: false,
            registry: ZoneRegistry::global(),
        }
    }
}

impl fmt::Debug for MustAssertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MustAssertConfig")
            .field("ignore_stack", &self.ignore_stack)
            .field("trace_limit", &self.trace_limit)
            .field("capture_backtraces", &self.capture_backtraces)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn invalid(var: &'static str, expected: &'static str, val: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        expected,
        value: val.to_string(),
    }
}

fn parse_usize(var: &'static str, val: &str) -> Result<usize, ConfigError> {
    val.trim()
        .parse::<usize>()
        .map_err(|_| invalid(var, "unsigned integer", val))
}

fn parse_bool(var: &'static str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, "bool (true/false/1/0/yes/no)", val)),
    }
}
