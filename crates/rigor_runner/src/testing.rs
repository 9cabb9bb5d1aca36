//! Scripted drivers for exercising the runner.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Condvar, Mutex};
use rigor_package::{FormatError, PackageId, PackageSettings};

use crate::driver::{Driver, DriverResolver, ResultFragment, TestEventListener};
use crate::error::DriverStage;
use crate::registry::IsolationContext;

/// The calls made on every mock driver of a test, in order.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn record(&self, call: String) {
        self.0.lock().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// What a scripted failure looks like to the runner.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    /// An error the engine knows nothing about.
    Foreign,
    /// An error the engine itself defines.
    Engine,
}

pub(crate) struct MockResolver {
    log: CallLog,
    counts: HashMap<Utf8PathBuf, usize>,
    failures: HashMap<Utf8PathBuf, (DriverStage, Failure)>,
    unresolvable: HashSet<Utf8PathBuf>,
}

impl MockResolver {
    pub(crate) fn new(log: CallLog) -> Self {
        Self {
            log,
            counts: HashMap::new(),
            failures: HashMap::new(),
            unresolvable: HashSet::new(),
        }
    }

    /// Every driver reports one test case unless told otherwise.
    pub(crate) fn with_count(mut self, path: &str, count: usize) -> Self {
        self.counts.insert(path.into(), count);
        self
    }

    pub(crate) fn failing(mut self, path: &str, stage: DriverStage, failure: Failure) -> Self {
        self.failures.insert(path.into(), (stage, failure));
        self
    }

    pub(crate) fn unresolvable(mut self, path: &str) -> Self {
        self.unresolvable.insert(path.into());
        self
    }
}

impl DriverResolver for MockResolver {
    fn resolve(
        &self,
        isolation: Option<&IsolationContext>,
        path: &Utf8Path,
        framework: Option<&str>,
        skip_non_test: bool,
    ) -> anyhow::Result<Box<dyn Driver>> {
        let mut call = format!("resolve {path} framework={framework:?} skip={skip_non_test}");
        if let Some(isolation) = isolation {
            call.push_str(&format!(" isolation={}", isolation.name()));
        }
        self.log.record(call);

        if self.unresolvable.contains(path) {
            anyhow::bail!("no driver for {path}");
        }

        Ok(Box::new(MockDriver {
            log: self.log.clone(),
            name: path.file_name().unwrap_or_default().to_string(),
            id: None,
            count: self.counts.get(path).copied().unwrap_or(1),
            failure: self.failures.get(path).copied(),
        }))
    }
}

struct MockDriver {
    log: CallLog,
    name: String,
    id: Option<PackageId>,
    count: usize,
    failure: Option<(DriverStage, Failure)>,
}

impl MockDriver {
    fn enter(&self, stage: DriverStage, call: String) -> anyhow::Result<()> {
        self.log.record(call);
        match self.failure {
            Some((failing, Failure::Foreign)) if failing == stage => {
                anyhow::bail!("{} failed to {}", self.name, stage.as_str())
            }
            Some((failing, Failure::Engine)) if failing == stage => {
                Err(FormatError::MissingPackage.into())
            }
            _ => Ok(()),
        }
    }

    fn fragment(&self, stage: DriverStage) -> ResultFragment {
        let id = self.id.as_ref().map(PackageId::as_str).unwrap_or_default();
        ResultFragment::new(format!("<{} unit=\"{}\" id=\"{id}\"/>", stage.as_str(), self.name))
    }
}

impl Driver for MockDriver {
    fn set_id(&mut self, id: &PackageId) {
        self.log.record(format!("set_id {} {id}", self.name));
        self.id = Some(id.clone());
    }

    fn load(&mut self, path: &Utf8Path, settings: &PackageSettings) -> anyhow::Result<ResultFragment> {
        self.enter(
            DriverStage::Load,
            format!("load {} path={path} settings={}", self.name, settings.len()),
        )?;
        Ok(self.fragment(DriverStage::Load))
    }

    fn explore(&self, filter: &str) -> anyhow::Result<ResultFragment> {
        self.enter(DriverStage::Explore, format!("explore {} {filter}", self.name))?;
        Ok(self.fragment(DriverStage::Explore))
    }

    fn count_test_cases(&self, _filter: &str) -> anyhow::Result<usize> {
        self.enter(DriverStage::Count, format!("count {}", self.name))?;
        Ok(self.count)
    }

    fn run(&self, listener: &dyn TestEventListener, filter: &str) -> anyhow::Result<ResultFragment> {
        self.enter(DriverStage::Run, format!("run {} {filter}", self.name))?;
        listener.on_test_event(&format!("<start-run unit=\"{}\"/>", self.name));
        Ok(self.fragment(DriverStage::Run))
    }

    fn stop_run(&self, force: bool) -> anyhow::Result<()> {
        self.enter(DriverStage::Stop, format!("stop {} force={force}", self.name))
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingListener(Mutex<Vec<String>>);

impl RecordingListener {
    pub(crate) fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

impl TestEventListener for RecordingListener {
    fn on_test_event(&self, report: &str) {
        self.0.lock().push(report.to_string());
    }
}

#[derive(Debug, Default)]
struct GateState {
    running: bool,
    stop: Option<bool>,
}

/// Holds a run open until a stop is requested.
#[derive(Debug, Default)]
pub(crate) struct StopGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl StopGate {
    pub(crate) fn wait_until_running(&self) {
        let mut state = self.state.lock();
        while !state.running {
            self.changed.wait(&mut state);
        }
    }
}

/// Resolves every unit to a driver whose run blocks on a shared [`StopGate`].
pub(crate) struct BlockingResolver(pub(crate) Arc<StopGate>);

impl DriverResolver for BlockingResolver {
    fn resolve(
        &self,
        _isolation: Option<&IsolationContext>,
        _path: &Utf8Path,
        _framework: Option<&str>,
        _skip_non_test: bool,
    ) -> anyhow::Result<Box<dyn Driver>> {
        Ok(Box::new(BlockingDriver(Arc::clone(&self.0))))
    }
}

struct BlockingDriver(Arc<StopGate>);

impl Driver for BlockingDriver {
    fn set_id(&mut self, _id: &PackageId) {}

    fn load(&mut self, _path: &Utf8Path, _settings: &PackageSettings) -> anyhow::Result<ResultFragment> {
        Ok(ResultFragment::new("<loaded/>"))
    }

    fn explore(&self, _filter: &str) -> anyhow::Result<ResultFragment> {
        Ok(ResultFragment::new("<explored/>"))
    }

    fn count_test_cases(&self, _filter: &str) -> anyhow::Result<usize> {
        Ok(0)
    }

    fn run(&self, _listener: &dyn TestEventListener, _filter: &str) -> anyhow::Result<ResultFragment> {
        let gate = &self.0;
        let mut state = gate.state.lock();
        state.running = true;
        gate.changed.notify_all();
        while state.stop.is_none() {
            gate.changed.wait(&mut state);
        }
        Ok(ResultFragment::new(format!(
            "<stopped force=\"{}\"/>",
            state.stop.unwrap_or_default()
        )))
    }

    fn stop_run(&self, force: bool) -> anyhow::Result<()> {
        let gate = &self.0;
        gate.state.lock().stop = Some(force);
        gate.changed.notify_all();
        Ok(())
    }
}
