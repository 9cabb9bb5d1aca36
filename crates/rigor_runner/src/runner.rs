use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::RwLock;
use rigor_package::{PackageId, PackageNode, keys};

use crate::driver::{Driver, DriverResolver, ResultFragment, TestEventListener, TestFilter};
use crate::error::{DriverStage, EngineError, LoadFailure};
use crate::registry::IsolationContext;
use crate::result::AggregateResult;

/// A driver together with the leaf it is bound to.
struct BoundDriver {
    id: PackageId,
    driver: Arc<dyn Driver>,
}

/// Everything a successful load produces. Never changes afterwards.
struct Loaded {
    drivers: Vec<BoundDriver>,
    result: AggregateResult,
}

/// Runs a package by fanning each operation out to one driver per leaf.
///
/// The package is loaded on first use. Every operation calls the drivers one at a time,
/// in leaf order, and stops at the first driver that fails.
///
/// Stopping may be requested from another thread while tests are running.
pub struct DriverRunner {
    package: PackageNode,
    resolver: Arc<dyn DriverResolver>,
    isolation: Option<IsolationContext>,
    state: RwLock<Option<Arc<Loaded>>>,
}

impl DriverRunner {
    pub fn new(package: PackageNode, resolver: Arc<dyn DriverResolver>) -> Self {
        Self {
            package,
            resolver,
            isolation: None,
            state: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_isolation(mut self, isolation: IsolationContext) -> Self {
        self.isolation = Some(isolation);
        self
    }

    pub const fn package(&self) -> &PackageNode {
        &self.package
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().is_some()
    }

    /// Binds a driver to every leaf and loads it.
    ///
    /// On failure the fragments of the leaves that did load are returned with the error
    /// and the runner stays unloaded. Once loaded, the stored result is returned again.
    pub fn load(&self) -> Result<AggregateResult, LoadFailure> {
        Ok(self.loaded()?.result.clone())
    }

    pub fn explore(&self, filter: &TestFilter) -> Result<AggregateResult, EngineError> {
        let loaded = self.loaded()?;
        tracing::debug!("Exploring {} driver(s)", loaded.drivers.len());

        loaded
            .drivers
            .iter()
            .map(|bound| {
                tracing::debug!("Exploring package {}", bound.id);
                bound
                    .driver
                    .explore(filter.as_text())
                    .map_err(|error| EngineError::from_driver(DriverStage::Explore, error))
            })
            .collect()
    }

    pub fn count_test_cases(&self, filter: &TestFilter) -> Result<usize, EngineError> {
        let loaded = self.loaded()?;

        loaded.drivers.iter().try_fold(0, |total, bound| {
            let count = bound
                .driver
                .count_test_cases(filter.as_text())
                .map_err(|error| EngineError::from_driver(DriverStage::Count, error))?;
            tracing::debug!("Package {} has {count} test case(s)", bound.id);
            Ok(total + count)
        })
    }

    /// Runs the selected tests, passing `listener` to every driver.
    ///
    /// After a successful run the path of every leaf is removed from the isolation
    /// context's path registry. A failed run leaves the registry untouched.
    pub fn run_tests(
        &self,
        listener: &dyn TestEventListener,
        filter: &TestFilter,
    ) -> Result<AggregateResult, EngineError> {
        let loaded = self.loaded()?;
        tracing::info!("Running {} driver(s)", loaded.drivers.len());

        let result = loaded
            .drivers
            .iter()
            .map(|bound| {
                tracing::debug!("Running package {}", bound.id);
                bound
                    .driver
                    .run(listener, filter.as_text())
                    .map_err(|error| EngineError::from_driver(DriverStage::Run, error))
            })
            .collect::<Result<AggregateResult, _>>()?;

        self.release_unit_paths();

        Ok(result)
    }

    /// Asks every driver to end its run gracefully.
    pub fn request_stop(&self) -> Result<(), EngineError> {
        self.stop(false)
    }

    /// Asks every driver to abandon its run.
    pub fn force_stop(&self) -> Result<(), EngineError> {
        self.stop(true)
    }

    fn stop(&self, force: bool) -> Result<(), EngineError> {
        let loaded = self.loaded()?;
        tracing::info!(force, "Stopping {} driver(s)", loaded.drivers.len());

        for bound in &loaded.drivers {
            bound
                .driver
                .stop_run(force)
                .map_err(|error| EngineError::from_driver(DriverStage::Stop, error))?;
        }
        Ok(())
    }

    fn release_unit_paths(&self) {
        let Some(registry) = self.isolation.as_ref().and_then(IsolationContext::registry) else {
            return;
        };

        for package in self.package.leaves() {
            if let Some(path) = package.full_name()
                && registry.remove_path(path)
            {
                tracing::debug!("Released `{path}` from the path registry");
            }
        }
    }

    /// The loaded drivers, loading them first if needed.
    ///
    /// The returned handle is independent of the lock, so drivers are never called with
    /// the lock held.
    fn loaded(&self) -> Result<Arc<Loaded>, LoadFailure> {
        if let Some(loaded) = self.state.read().clone() {
            return Ok(loaded);
        }

        let mut state = self.state.write();
        if let Some(loaded) = state.clone() {
            return Ok(loaded);
        }

        let loaded = Arc::new(self.load_drivers()?);
        *state = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    fn load_drivers(&self) -> Result<Loaded, LoadFailure> {
        let leaves = self.package.leaves();
        tracing::info!("Loading {} test unit(s)", leaves.len());

        let mut drivers = Vec::with_capacity(leaves.len());
        let mut result = AggregateResult::new();

        for (leaf, path) in leaves
            .into_iter()
            .filter_map(|leaf| Some((leaf, leaf.full_name()?)))
        {
            match self.load_leaf(leaf, path) {
                Ok((driver, fragment)) => {
                    drivers.push(BoundDriver {
                        id: leaf.id().clone(),
                        driver,
                    });
                    result.push(fragment);
                }
                Err(error) => {
                    tracing::debug!("Loading package {} failed: {error}", leaf.id());
                    return Err(LoadFailure {
                        partial: result,
                        error,
                    });
                }
            }
        }

        Ok(Loaded { drivers, result })
    }

    fn load_leaf(
        &self,
        leaf: &PackageNode,
        path: &Utf8Path,
    ) -> Result<(Arc<dyn Driver>, ResultFragment), EngineError> {
        let framework = leaf.setting::<String>(keys::TARGET_FRAMEWORK)?;
        let skip_non_test = leaf.get_setting(keys::SKIP_NON_TEST_UNITS, false)?;

        let mut driver = self
            .resolver
            .resolve(
                self.isolation.as_ref(),
                path,
                framework.as_deref(),
                skip_non_test,
            )
            .map_err(|error| EngineError::from_driver(DriverStage::Load, error))?;
        driver.set_id(leaf.id());

        if let Some(registry) = self.isolation.as_ref().and_then(IsolationContext::registry)
            && leaf.get_setting(keys::REQUIRES_DEFAULT_RESOLVER, false)?
            && registry.add_path(path)
        {
            tracing::debug!("Registered `{path}` with the path registry");
        }

        tracing::debug!("Loading package {} from `{path}`", leaf.id());
        let fragment = driver
            .load(path, leaf.settings())
            .map_err(|error| EngineError::from_driver(DriverStage::Load, error))?;

        Ok((Arc::from(driver), fragment))
    }
}
