use camino::{Utf8Path, Utf8PathBuf};
use rigor_static::RIGOR_CONFIG_FILE_NAME;
use thiserror::Error;

use crate::options::{Options, RigorTomlError};

/// A `rigor.toml` configuration file with the options it contains.
#[derive(Debug)]
pub struct ConfigurationFile {
    path: Utf8PathBuf,
    options: Options,
}

impl ConfigurationFile {
    pub fn from_path(path: Utf8PathBuf) -> Result<Self, ConfigurationFileError> {
        let content = std::fs::read_to_string(&path).map_err(|source| {
            ConfigurationFileError::FileReadError {
                source,
                path: path.clone(),
            }
        })?;

        match Options::from_toml_str(&content) {
            Ok(options) => Ok(Self { path, options }),
            Err(error) => Err(ConfigurationFileError::InvalidRigorToml {
                source: Box::new(error),
                path,
            }),
        }
    }

    /// Loads `rigor.toml` from `directory` if there is one.
    pub fn discover(directory: &Utf8Path) -> Result<Option<Self>, ConfigurationFileError> {
        let path = directory.join(RIGOR_CONFIG_FILE_NAME);

        tracing::debug!("Searching for a configuration file at `{path}`");

        if !path.is_file() {
            return Ok(None);
        }

        Self::from_path(path).map(Some)
    }

    /// Returns the path to the configuration file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub const fn options(&self) -> &Options {
        &self.options
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationFileError {
    #[error("{path} is not a valid `rigor.toml`: {source}")]
    InvalidRigorToml {
        source: Box<RigorTomlError>,
        path: Utf8PathBuf,
    },
    #[error("Failed to read `{path}`: {source}")]
    FileReadError {
        #[source]
        source: std::io::Error,
        path: Utf8PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    use super::*;

    fn temp_dir() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Path is not valid UTF-8");
        (dir, path)
    }

    #[test]
    fn discover_without_file() {
        let (_dir, path) = temp_dir();
        assert!(ConfigurationFile::discover(&path).unwrap().is_none());
    }

    #[test]
    fn discover_reads_settings() {
        let (_dir, path) = temp_dir();
        std::fs::write(path.join("rigor.toml"), "[settings]\nTargetFramework = \"native\"\n").unwrap();

        let file = ConfigurationFile::discover(&path).unwrap().unwrap();

        assert_eq!(file.path(), path.join("rigor.toml").as_path());
        insta::assert_debug_snapshot!(file.options(), @r#"
        Options {
            settings: {
                "TargetFramework": String(
                    "native",
                ),
            },
        }
        "#);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let (_dir, path) = temp_dir();
        let file = path.join("custom.toml");
        std::fs::write(&file, "[settings\n").unwrap();

        let error = ConfigurationFile::from_path(file.clone()).unwrap_err();

        assert!(matches!(error, ConfigurationFileError::InvalidRigorToml { .. }));
        assert!(error.to_string().starts_with(&format!("{file} is not a valid `rigor.toml`")));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let (_dir, path) = temp_dir();

        let error = ConfigurationFile::from_path(path.join("absent.toml")).unwrap_err();

        assert!(matches!(error, ConfigurationFileError::FileReadError { .. }));
    }
}
