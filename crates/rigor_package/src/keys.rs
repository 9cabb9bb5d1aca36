//! Names of the package settings the engine itself reads.

/// Opaque framework hint handed to driver resolution. String.
pub const TARGET_FRAMEWORK: &str = "TargetFramework";

/// When `true`, units that no driver accepts are skipped instead of reported as invalid. Bool.
pub const SKIP_NON_TEST_UNITS: &str = "SkipNonTestUnits";

/// When `true`, the unit's path is registered with the isolation context's path registry
/// for the duration of a load and run. Bool.
pub const REQUIRES_DEFAULT_RESOLVER: &str = "RequiresDefaultResolver";
