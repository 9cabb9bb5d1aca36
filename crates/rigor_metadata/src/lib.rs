mod configuration_file;
mod options;

pub use configuration_file::{ConfigurationFile, ConfigurationFileError};
pub use options::{Options, RigorTomlError, SettingOption};
