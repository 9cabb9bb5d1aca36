use std::fmt;

use rigor_package::{FormatError, TypeMismatchError};
use thiserror::Error;

use crate::result::AggregateResult;

/// The driver operation an [`EngineError::DriverOperation`] is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverStage {
    Load,
    Explore,
    Count,
    Run,
    Stop,
}

impl DriverStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Explore => "explore",
            Self::Count => "count",
            Self::Run => "run",
            Self::Stop => "stop",
        }
    }

    const fn activity(self) -> &'static str {
        match self {
            Self::Load => "loading tests",
            Self::Explore => "exploring tests",
            Self::Count => "counting test cases",
            Self::Run => "running tests",
            Self::Stop => "stopping the test run",
        }
    }
}

impl fmt::Display for DriverStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.activity())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// A driver failed with an error the engine does not recognize.
    #[error("a test driver failed while {stage}")]
    DriverOperation {
        stage: DriverStage,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),
}

impl EngineError {
    /// Attributes a driver failure to `stage`.
    ///
    /// Errors that already belong to the engine are returned unchanged; anything else is
    /// wrapped in [`EngineError::DriverOperation`].
    pub(crate) fn from_driver(stage: DriverStage, error: anyhow::Error) -> Self {
        let error = match error.downcast::<Self>() {
            Ok(engine) => return engine,
            Err(error) => error,
        };
        let error = match error.downcast::<FormatError>() {
            Ok(format) => return Self::Format(format),
            Err(error) => error,
        };
        match error.downcast::<TypeMismatchError>() {
            Ok(mismatch) => Self::TypeMismatch(mismatch),
            Err(source) => Self::DriverOperation { stage, source },
        }
    }

    pub const fn stage(&self) -> Option<DriverStage> {
        match self {
            Self::DriverOperation { stage, .. } => Some(*stage),
            Self::Format(_) | Self::TypeMismatch(_) => None,
        }
    }
}

/// Loading stopped at a failing leaf.
///
/// The fragments of the leaves loaded before the failure are kept in `partial`.
#[derive(Debug, Error)]
#[error("failed to load the test package")]
pub struct LoadFailure {
    pub partial: AggregateResult,
    #[source]
    pub error: EngineError,
}

impl From<LoadFailure> for EngineError {
    fn from(failure: LoadFailure) -> Self {
        failure.error
    }
}
