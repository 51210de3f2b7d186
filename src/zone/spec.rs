//! Behavior shared by every zone forked from one plugin instance.

use core::fmt;
use std::backtrace::Backtrace;
use std::sync::Arc;

use super::interceptor::OnInvokeTask;
use super::registry::ZoneRegistry;
use super::stack::StackCleaner;
use crate::config::MustAssertConfig;
use crate::error::Error;
use crate::observability::Logger;

/// Zone behavior: the interception policy, the diagnostics logger, stack
/// cleaning and the registry whose active pointer the policy compares against.
pub struct ZoneSpec {
    on_invoke_task: Arc<dyn OnInvokeTask>,
    logger: Arc<dyn Logger>,
    stack: StackCleaner,
    registry: Arc<ZoneRegistry>,
    trace_limit: usize,
    capture_backtraces: bool,
}

impl ZoneSpec {
    /// Returns the interception policy.
    #[must_use]
    pub fn on_invoke_task(&self) -> &dyn OnInvokeTask {
        self.on_invoke_task.as_ref()
    }

    /// Returns the diagnostics logger.
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Returns the stack cleaner.
    #[must_use]
    pub fn stack(&self) -> &StackCleaner {
        &self.stack
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ZoneRegistry> {
        &self.registry
    }

    /// Maximum causal-trace length of tasks created in these zones.
    #[must_use]
    pub const fn trace_limit(&self) -> usize {
        self.trace_limit
    }

    /// Whether task creation captures a backtrace.
    #[must_use]
    pub const fn capture_backtraces(&self) -> bool {
        self.capture_backtraces
    }

    /// Captures a backtrace when enabled.
    #[must_use]
    pub fn capture_backtrace(&self) -> Option<Backtrace> {
        self.capture_backtraces.then(Backtrace::force_capture)
    }

    /// Captures and cleans a backtrace when enabled.
    #[must_use]
    pub fn cleaned_backtrace(&self) -> Option<String> {
        self.capture_backtrace()
            .map(|bt| self.stack.clean(&bt.to_string()))
    }

    /// Handles an error raised while a task of this zone was being invoked.
    ///
    /// Exposed errors are logged as `message` + blank line + cleaned stack and
    /// swallowed. Anything else is handed back to be re-raised.
    pub fn handle_error(&self, err: Error) -> Option<Error> {
        if !err.is_exposed() {
            return Some(err);
        }
        let message = err
            .message()
            .map_or_else(|| err.to_string(), ToString::to_string);
        let stack = err.stack().map(|s| self.stack.clean(s)).unwrap_or_default();
        self.logger.warn(&format!("{message}\n\n{stack}"));
        None
    }
}

impl From<MustAssertConfig> for ZoneSpec {
    fn from(config: MustAssertConfig) -> Self {
        let MustAssertConfig {
            on_invoke_task,
            logger,
            ignore_stack,
            trace_limit,
            capture_backtraces,
            registry,
        } = config;
        Self {
            on_invoke_task,
            logger,
            stack: StackCleaner::new(ignore_stack),
            registry,
            trace_limit,
            capture_backtraces,
        }
    }
}

impl Default for ZoneSpec {
    fn default() -> Self {
        MustAssertConfig::default().into()
    }
}

impl fmt::Debug for ZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneSpec")
            .field("stack", &self.stack)
            .field("registry", &self.registry)
            .field("trace_limit", &self.trace_limit)
            .field("capture_backtraces", &self.capture_backtraces)
            .finish_non_exhaustive()
    }
}
