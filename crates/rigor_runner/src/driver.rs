//! The capabilities the runner consumes from test drivers.

use std::fmt;

use camino::Utf8Path;
use rigor_package::{PackageId, PackageSettings};

use crate::registry::IsolationContext;

/// A piece of driver output describing the tests of one unit.
///
/// The runner treats it as opaque text and only concatenates fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFragment(String);

impl ResultFragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResultFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A test selection expression, handed to every driver unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFilter(String);

impl TestFilter {
    pub const EMPTY: &'static str = "<filter/>";

    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// A filter that selects every test.
    pub fn empty() -> Self {
        Self::new(Self::EMPTY)
    }

    pub fn as_text(&self) -> &str {
        &self.0
    }
}

impl Default for TestFilter {
    fn default() -> Self {
        Self::empty()
    }
}

/// Receives progress reports from drivers while tests run.
pub trait TestEventListener: Send + Sync {
    fn on_test_event(&self, report: &str);
}

/// A backend bound to exactly one loadable unit for its whole lifetime.
///
/// `stop_run` may be called from another thread while `run` is in progress, so
/// implementations must honor it without waiting for the run to finish.
pub trait Driver: Send + Sync {
    /// Namespaces the ids of the tests this driver reports.
    fn set_id(&mut self, id: &PackageId);

    fn load(&mut self, path: &Utf8Path, settings: &PackageSettings)
    -> anyhow::Result<ResultFragment>;

    fn explore(&self, filter: &str) -> anyhow::Result<ResultFragment>;

    fn count_test_cases(&self, filter: &str) -> anyhow::Result<usize>;

    fn run(&self, listener: &dyn TestEventListener, filter: &str)
    -> anyhow::Result<ResultFragment>;

    /// Requests the current run to end. `force` asks the driver to abandon it outright.
    /// Without an active run this does nothing.
    fn stop_run(&self, force: bool) -> anyhow::Result<()>;
}

/// Produces a driver for a unit.
pub trait DriverResolver: Send + Sync {
    fn resolve(
        &self,
        isolation: Option<&IsolationContext>,
        path: &Utf8Path,
        framework: Option<&str>,
        skip_non_test: bool,
    ) -> anyhow::Result<Box<dyn Driver>>;
}
