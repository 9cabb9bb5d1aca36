mod driver;
mod error;
mod registry;
mod result;
mod runner;
pub mod service;

#[cfg(test)]
mod testing;

pub use driver::{Driver, DriverResolver, ResultFragment, TestEventListener, TestFilter};
pub use error::{DriverStage, EngineError, LoadFailure};
pub use registry::{IsolationContext, PathRegistry};
pub use result::AggregateResult;
pub use runner::DriverRunner;
pub use service::{DriverFactory, DriverService, InvalidUnitDriver, SkippedUnitDriver};
