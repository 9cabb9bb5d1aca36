pub struct EnvVars;

impl EnvVars {
    /// Overrides the tracing filter, using the `tracing_subscriber::EnvFilter` syntax.
    pub const RIGOR_LOG: &'static str = "RIGOR_LOG";

    /// Path to a configuration file used instead of discovering `rigor.toml`.
    pub const RIGOR_CONFIG_FILE: &'static str = "RIGOR_CONFIG_FILE";
}

/// Name of the configuration file looked up in the working directory.
pub const RIGOR_CONFIG_FILE_NAME: &str = "rigor.toml";
