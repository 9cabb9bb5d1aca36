use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A scalar package setting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl SettingValue {
    const STRING: &'static str = "string";
    const BOOL: &'static str = "bool";
    const INT: &'static str = "integer";
    const FLOAT: &'static str = "float";

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => Self::STRING,
            Self::Bool(_) => Self::BOOL,
            Self::Int(_) => Self::INT,
            Self::Float(_) => Self::FLOAT,
        }
    }

    /// Reads `text` as a value of the type called `type_name`, as named by
    /// [`SettingValue::type_name`]. `None` for an unknown type or text that does not parse.
    pub fn from_typed_text(type_name: &str, text: &str) -> Option<Self> {
        match type_name {
            Self::STRING => Some(Self::String(text.to_string())),
            Self::BOOL => text.parse().ok().map(Self::Bool),
            Self::INT => text.parse().ok().map(Self::Int),
            Self::FLOAT => text.parse().ok().map(Self::Float),
            _ => None,
        }
    }

    /// Recover a typed value from its textual form.
    ///
    /// A bool, integer or float is only produced when rendering it back yields `text`
    /// unchanged, so `"007"` or `"2.50"` stay strings.
    pub fn parse_typed(text: &str) -> Self {
        let typed = match text {
            "true" => Some(Self::Bool(true)),
            "false" => Some(Self::Bool(false)),
            _ => text.parse::<i64>().map(Self::Int).ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .map(Self::Float)
            }),
        };

        match typed {
            Some(value) if value.to_string() == text => value,
            _ => Self::String(text.to_string()),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            // Keep a fractional part so whole floats do not read back as integers.
            Self::Float(value) if value.fract() == 0.0 => write!(f, "{value:.1}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A stored setting could not be read as the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("setting `{name}` holds a {found} value, which cannot be read as {expected}")]
pub struct TypeMismatchError {
    pub name: String,
    pub expected: &'static str,
    pub found: &'static str,
}

/// Types a [`SettingValue`] can be read as.
pub trait FromSettingValue: Sized {
    const TYPE_NAME: &'static str;

    fn from_setting_value(value: &SettingValue) -> Option<Self>;
}

impl FromSettingValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_setting_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::String(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl FromSettingValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_setting_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

macro_rules! impl_from_setting_for_int {
    ($($ty:ty),*) => {
        $(
            impl FromSettingValue for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);

                fn from_setting_value(value: &SettingValue) -> Option<Self> {
                    match value {
                        SettingValue::Int(value) => <$ty>::try_from(*value).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_from_setting_for_int!(i64, i32, u32, usize);

impl FromSettingValue for f64 {
    const TYPE_NAME: &'static str = "f64";

    #[expect(clippy::cast_precision_loss)]
    fn from_setting_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Float(value) => Some(*value),
            SettingValue::Int(value) => Some(*value as Self),
            _ => None,
        }
    }
}

/// The settings of a single package node, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageSettings {
    inner: BTreeMap<String, SettingValue>,
}

impl PackageSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` on this node only, returning the value it replaced.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<SettingValue>,
    ) -> Option<SettingValue> {
        self.inner.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.inner.get(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.inner.iter()
    }

    /// Reads `name` as `T`, `None` when the setting is absent.
    pub fn read<T: FromSettingValue>(&self, name: &str) -> Result<Option<T>, TypeMismatchError> {
        let Some(value) = self.inner.get(name) else {
            return Ok(None);
        };

        T::from_setting_value(value)
            .map(Some)
            .ok_or_else(|| TypeMismatchError {
                name: name.to_string(),
                expected: T::TYPE_NAME,
                found: value.type_name(),
            })
    }
}

impl<'a> IntoIterator for &'a PackageSettings {
    type Item = (&'a String, &'a SettingValue);
    type IntoIter = std::collections::btree_map::Iter<'a, String, SettingValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<K: Into<String>, V: Into<SettingValue>> FromIterator<(K, V)> for PackageSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
