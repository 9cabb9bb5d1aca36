use rigor_static::EnvVars;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default)]
pub enum VerbosityLevel {
    /// Default output level. Only shows Rigor events up to the [`WARN`](tracing::Level::WARN).
    #[default]
    Default,

    /// Enables verbose output. Emits Rigor events up to the [`INFO`](tracing::Level::INFO).
    /// Corresponds to `-v`.
    Verbose,

    /// Emits Rigor events up to [`DEBUG`](tracing::Level::DEBUG). Corresponds to `-vv`.
    ExtraVerbose,

    /// Enables all tracing events and includes event targets. Corresponds to `-vvv`.
    Trace,
}

impl VerbosityLevel {
    /// Maps the number of `-v` flags given on the command line to a level.
    #[must_use]
    pub const fn from_flag_count(count: u8) -> Self {
        match count {
            0 => Self::Default,
            1 => Self::Verbose,
            2 => Self::ExtraVerbose,
            _ => Self::Trace,
        }
    }

    #[must_use]
    pub const fn level_filter(self) -> LevelFilter {
        match self {
            Self::Default => LevelFilter::WARN,
            Self::Verbose => LevelFilter::INFO,
            Self::ExtraVerbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }

    #[must_use]
    pub const fn is_trace(self) -> bool {
        matches!(self, Self::Trace)
    }
}

/// Install the global tracing subscriber.
///
/// Events are written to stderr. When [`EnvVars::RIGOR_LOG`] is set it takes precedence over
/// the verbosity level.
pub fn setup_tracing(level: VerbosityLevel) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_env(EnvVars::RIGOR_LOG)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.level_filter().into()));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(level.is_trace());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, VerbosityLevel::Default, LevelFilter::WARN)]
    #[case(1, VerbosityLevel::Verbose, LevelFilter::INFO)]
    #[case(2, VerbosityLevel::ExtraVerbose, LevelFilter::DEBUG)]
    #[case(3, VerbosityLevel::Trace, LevelFilter::TRACE)]
    #[case(7, VerbosityLevel::Trace, LevelFilter::TRACE)]
    fn flag_count_maps_to_level(
        #[case] count: u8,
        #[case] expected: VerbosityLevel,
        #[case] filter: LevelFilter,
    ) {
        let level = VerbosityLevel::from_flag_count(count);
        assert_eq!(level, expected);
        assert_eq!(level.level_filter(), filter);
    }
}
