//! Driver selection by static inspection of a unit.

use camino::{Utf8Path, Utf8PathBuf};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use rigor_package::{PackageId, PackageSettings, is_unit_path};

use crate::driver::{Driver, DriverResolver, ResultFragment, TestEventListener};
use crate::registry::IsolationContext;

/// Creates drivers for the units it recognizes.
pub trait DriverFactory: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this factory can drive the unit at `path`.
    fn accepts(&self, path: &Utf8Path, framework: Option<&str>) -> bool;

    fn create(&self, isolation: Option<&IsolationContext>) -> anyhow::Result<Box<dyn Driver>>;
}

/// Resolves drivers through an ordered list of factories.
///
/// Units no factory accepts still get a driver, one that reports why the unit cannot be run.
#[derive(Default)]
pub struct DriverService {
    factories: Vec<Box<dyn DriverFactory>>,
}

impl DriverService {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_factory(mut self, factory: impl DriverFactory + 'static) -> Self {
        self.register(factory);
        self
    }

    /// Adds a factory after the ones already registered.
    pub fn register(&mut self, factory: impl DriverFactory + 'static) {
        self.factories.push(Box::new(factory));
    }
}

impl DriverResolver for DriverService {
    fn resolve(
        &self,
        isolation: Option<&IsolationContext>,
        path: &Utf8Path,
        framework: Option<&str>,
        skip_non_test: bool,
    ) -> anyhow::Result<Box<dyn Driver>> {
        if !is_unit_path(path) {
            tracing::warn!("`{path}` is not a loadable unit");
            return Ok(Box::new(InvalidUnitDriver::new(
                InvalidUnitDriver::UNSUPPORTED_FILE_TYPE,
            )));
        }

        if let Some(factory) = self
            .factories
            .iter()
            .find(|factory| factory.accepts(path, framework))
        {
            tracing::debug!("Using driver `{}` for `{path}`", factory.name());
            return factory.create(isolation);
        }

        if skip_non_test {
            tracing::info!("Skipping `{path}`, no test driver accepts it");
            Ok(Box::new(SkippedUnitDriver::new(
                SkippedUnitDriver::NON_TEST_UNIT,
            )))
        } else {
            tracing::warn!("No test driver accepts `{path}`");
            Ok(Box::new(InvalidUnitDriver::new(
                InvalidUnitDriver::NO_SUITABLE_DRIVER,
            )))
        }
    }
}

/// The unit and reason a placeholder driver reports.
#[derive(Debug)]
struct UnitReport {
    reason: String,
    id: Option<PackageId>,
    path: Option<Utf8PathBuf>,
}

impl UnitReport {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            id: None,
            path: None,
        }
    }

    fn suite(&self, runstate: &str, result: Option<&str>) -> anyhow::Result<ResultFragment> {
        let suite_id = self
            .id
            .as_ref()
            .map(|id| format!("{id}-1"))
            .unwrap_or_default();
        let full_name = self.path.as_ref().map(|path| path.as_str()).unwrap_or_default();
        let name = self
            .path
            .as_ref()
            .and_then(|path| path.file_name())
            .unwrap_or_default();

        let mut suite = BytesStart::new("test-suite");
        suite.push_attribute(("type", "Unit"));
        suite.push_attribute(("id", suite_id.as_str()));
        suite.push_attribute(("name", name));
        suite.push_attribute(("fullname", full_name));
        suite.push_attribute(("runstate", runstate));
        suite.push_attribute(("testcasecount", "0"));
        if let Some(result) = result {
            suite.push_attribute(("result", result));
        }

        let mut property = BytesStart::new("property");
        property.push_attribute(("name", "_SKIPREASON"));
        property.push_attribute(("value", self.reason.as_str()));

        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Start(suite))?;
        writer.write_event(Event::Start(BytesStart::new("properties")))?;
        writer.write_event(Event::Empty(property))?;
        writer.write_event(Event::End(BytesEnd::new("properties")))?;
        writer.write_event(Event::End(BytesEnd::new("test-suite")))?;

        Ok(ResultFragment::new(String::from_utf8(writer.into_inner())?))
    }
}

/// Stands in for a unit that cannot be run, failing it with the reason.
#[derive(Debug)]
pub struct InvalidUnitDriver {
    report: UnitReport,
}

impl InvalidUnitDriver {
    pub const UNSUPPORTED_FILE_TYPE: &'static str = "File type is not supported";
    pub const NO_SUITABLE_DRIVER: &'static str = "No suitable test driver was found";

    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            report: UnitReport::new(reason),
        }
    }
}

impl Driver for InvalidUnitDriver {
    fn set_id(&mut self, id: &PackageId) {
        self.report.id = Some(id.clone());
    }

    fn load(
        &mut self,
        path: &Utf8Path,
        _settings: &PackageSettings,
    ) -> anyhow::Result<ResultFragment> {
        self.report.path = Some(path.to_path_buf());
        self.report.suite("NotRunnable", None)
    }

    fn explore(&self, _filter: &str) -> anyhow::Result<ResultFragment> {
        self.report.suite("NotRunnable", None)
    }

    fn count_test_cases(&self, _filter: &str) -> anyhow::Result<usize> {
        Ok(0)
    }

    fn run(
        &self,
        _listener: &dyn TestEventListener,
        _filter: &str,
    ) -> anyhow::Result<ResultFragment> {
        self.report.suite("NotRunnable", Some("Failed"))
    }

    fn stop_run(&self, _force: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Stands in for a unit that holds no tests and was asked to be skipped.
#[derive(Debug)]
pub struct SkippedUnitDriver {
    report: UnitReport,
}

impl SkippedUnitDriver {
    pub const NON_TEST_UNIT: &'static str = "Skipping non-test unit";

    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            report: UnitReport::new(reason),
        }
    }
}

impl Driver for SkippedUnitDriver {
    fn set_id(&mut self, id: &PackageId) {
        self.report.id = Some(id.clone());
    }

    fn load(
        &mut self,
        path: &Utf8Path,
        _settings: &PackageSettings,
    ) -> anyhow::Result<ResultFragment> {
        self.report.path = Some(path.to_path_buf());
        self.report.suite("Runnable", None)
    }

    fn explore(&self, _filter: &str) -> anyhow::Result<ResultFragment> {
        self.report.suite("Runnable", None)
    }

    fn count_test_cases(&self, _filter: &str) -> anyhow::Result<usize> {
        Ok(0)
    }

    fn run(
        &self,
        _listener: &dyn TestEventListener,
        _filter: &str,
    ) -> anyhow::Result<ResultFragment> {
        self.report.suite("Runnable", Some("Skipped"))
    }

    fn stop_run(&self, _force: bool) -> anyhow::Result<()> {
        Ok(())
    }
}
