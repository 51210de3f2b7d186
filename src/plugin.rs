//! The enabling entry point.

use std::sync::Arc;

use crate::config::{ConfigError, MustAssertConfig};
use crate::enhancer::Enhanced;
use crate::host::TestApi;
use crate::wrapper::{wrap_test, TestFn};
use crate::zone::{ZoneRegistry, ZoneSpec};

/// A configured must-assert instance.
///
/// Every zone it forks shares one [`ZoneSpec`]: the interception policy,
/// logger, stack cleaning and registry come from the configuration it was
/// built with.
///
/// # Example
///
/// ```
/// use must_assert::host::{Runner, RunnerConfig, Suite, TestStatus};
/// use must_assert::wrapper::TestFn;
/// use must_assert::MustAssert;
///
/// let plugin = MustAssert::default();
/// let mut api = plugin.enhance(Suite::new("example"));
/// api.it("forgot to assert", TestFn::sync(|_| Ok(())), None);
/// let report = Runner::new(RunnerConfig::new()).run(api.into_inner());
/// assert_eq!(report.test_results[0].status, TestStatus::Failed);
/// ```
#[derive(Debug, Clone)]
pub struct MustAssert {
    spec: Arc<ZoneSpec>,
}

impl MustAssert {
    /// Creates an instance from `config`.
    #[must_use]
    pub fn new(config: MustAssertConfig) -> Self {
        Self {
            spec: Arc::new(config.into()),
        }
    }

    /// Creates an instance from the default configuration with `MUST_ASSERT_*`
    /// environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        MustAssertConfig::from_env().map(Self::new)
    }

    /// Wraps one test body.
    #[must_use]
    pub fn wrap(&self, name: &str, test: TestFn) -> TestFn {
        wrap_test(&self.spec, name, test)
    }

    /// Enhances a host API so its `test` and `only` bodies run in zones.
    #[must_use]
    pub fn enhance<A: TestApi>(&self, api: A) -> Enhanced<A> {
        Enhanced::new(api, Arc::clone(&self.spec))
    }

    /// Returns the shared zone behavior.
    #[must_use]
    pub fn spec(&self) -> &Arc<ZoneSpec> {
        &self.spec
    }

    /// Returns the registry holding the active-zone pointer.
    #[must_use]
    pub fn registry(&self) -> &Arc<ZoneRegistry> {
        self.spec.registry()
    }
}

impl Default for MustAssert {
    fn default() -> Self {
        Self::new(MustAssertConfig::default())
    }
}

impl From<MustAssertConfig> for MustAssert {
    fn from(config: MustAssertConfig) -> Self {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::MemoryLogger;
    use crate::runtime::EventLoop;

    #[test]
    fn wrap_uses_configured_registry() {
        let registry = Arc::new(ZoneRegistry::new());
        let plugin = MustAssert::new(
            MustAssertConfig::default()
                .registry(Arc::clone(&registry))
                .logger(MemoryLogger::new()),
        );
        assert!(Arc::ptr_eq(plugin.registry(), &registry));
        let event_loop = EventLoop::new();
        let seen = std::rc::Rc::new(std::cell::Cell::new(None));
        let s = std::rc::Rc::clone(&seen);
        let registry_in_test = Arc::clone(&registry);
        let TestFn::Sync(body) = plugin.wrap(
            "sees its zone",
            TestFn::sync(move |cx| {
                s.set(registry_in_test.current());
                cx.expect(1).to_be(1)
            }),
        ) else {
            panic!("expected sync body");
        };
        body(&event_loop.cx()).expect("passes");
        let zone = event_loop.zones()[0].id();
        assert_eq!(seen.get(), Some(zone));
        assert_eq!(registry.current(), None);
    }
}
