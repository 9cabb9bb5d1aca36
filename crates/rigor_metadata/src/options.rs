use std::collections::BTreeMap;

use rigor_package::{PackageNode, SettingValue};
use serde::Deserialize;
use thiserror::Error;

/// The contents of a `rigor.toml` file.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    /// Default settings applied to every node of a package tree.
    #[serde(default)]
    pub settings: BTreeMap<String, SettingOption>,
}

/// A setting value as written in TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SettingOption {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<SettingOption> for SettingValue {
    fn from(option: SettingOption) -> Self {
        match option {
            SettingOption::Bool(value) => Self::Bool(value),
            SettingOption::Int(value) => Self::Int(value),
            SettingOption::Float(value) => Self::Float(value),
            SettingOption::String(value) => Self::String(value),
        }
    }
}

impl Options {
    pub fn from_toml_str(content: &str) -> Result<Self, RigorTomlError> {
        toml::from_str(content).map_err(RigorTomlError)
    }

    /// Adds every configured setting to `package` and all of its descendants.
    pub fn apply_to(&self, package: &mut PackageNode) {
        for (name, value) in &self.settings {
            tracing::debug!(name, "Applying configured setting");
            package.add_setting(name.clone(), value.clone());
        }
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct RigorTomlError(toml::de::Error);
