use camino::{Utf8Path, Utf8PathBuf};

use crate::id::{IdGenerator, PackageId};
use crate::setting::{FromSettingValue, PackageSettings, SettingValue, TypeMismatchError};

/// File extensions of units a driver can be bound to.
const UNIT_EXTENSIONS: [&str; 5] = ["dll", "exe", "so", "dylib", "wasm"];

/// Whether `path` names a unit a driver can load, judged by its extension.
pub fn is_unit_path(path: &Utf8Path) -> bool {
    path.extension().is_some_and(|extension| {
        UNIT_EXTENSIONS
            .iter()
            .any(|unit| extension.eq_ignore_ascii_case(unit))
    })
}

/// A node in the package tree.
///
/// A node with a full name and no sub packages is a leaf and backs exactly one loadable
/// unit. A node with sub packages only groups them and is never bound to a driver.
#[derive(Debug, PartialEq)]
pub struct PackageNode {
    id: PackageId,

    /// Path of the backing unit, `None` for an anonymous grouping node.
    full_name: Option<Utf8PathBuf>,

    /// Order is significant: it is the order leaves are bound and results are merged.
    sub_packages: Vec<Self>,

    settings: PackageSettings,
}

impl PackageNode {
    /// Creates an empty anonymous node.
    pub fn new(ids: &dyn IdGenerator) -> Self {
        Self::with_id(ids.next_id(), None)
    }

    /// Creates a node backed by the unit at `path`.
    ///
    /// The path is stored as given; callers resolve it to an absolute path first.
    pub fn from_path(path: impl Into<Utf8PathBuf>, ids: &dyn IdGenerator) -> Self {
        Self::with_id(ids.next_id(), Some(path.into()))
    }

    /// Creates an anonymous node with one leaf per path, in order.
    pub fn from_paths<I, P>(paths: I, ids: &dyn IdGenerator) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        let mut package = Self::new(ids);
        for path in paths {
            package.add_sub_package(Self::from_path(path, ids));
        }
        package
    }

    pub(crate) fn with_id(id: PackageId, full_name: Option<Utf8PathBuf>) -> Self {
        Self {
            id,
            full_name,
            sub_packages: Vec::new(),
            settings: PackageSettings::new(),
        }
    }

    pub const fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn full_name(&self) -> Option<&Utf8Path> {
        self.full_name.as_deref()
    }

    /// The last component of the full name.
    pub fn name(&self) -> Option<&str> {
        self.full_name.as_deref().and_then(Utf8Path::file_name)
    }

    pub fn sub_packages(&self) -> &[Self] {
        &self.sub_packages
    }

    /// Mutable access to the children, for adjusting their settings in place.
    pub fn sub_packages_mut(&mut self) -> &mut [Self] {
        &mut self.sub_packages
    }

    pub const fn settings(&self) -> &PackageSettings {
        &self.settings
    }

    /// Direct access to this node's settings. Changes made here are not propagated to
    /// sub packages; use [`PackageNode::add_setting`] for that.
    pub fn settings_mut(&mut self) -> &mut PackageSettings {
        &mut self.settings
    }

    pub fn is_leaf(&self) -> bool {
        self.sub_packages.is_empty() && self.full_name.is_some()
    }

    /// Whether the full name points at a unit a driver can load.
    pub fn is_unit_package(&self) -> bool {
        self.full_name.as_deref().is_some_and(is_unit_path)
    }

    /// Appends `child` and copies this node's current settings into it.
    ///
    /// Only the settings present now are copied; later direct changes to this node's
    /// settings do not reach the child.
    pub fn add_sub_package(&mut self, mut child: Self) {
        for (name, value) in &self.settings {
            child.settings.insert(name.clone(), value.clone());
        }
        self.sub_packages.push(child);
    }

    /// Appends `child` as is. Used when the child's settings are already complete.
    pub(crate) fn push_sub_package(&mut self, child: Self) {
        self.sub_packages.push(child);
    }

    /// Sets `name` on this node and every descendant, overwriting existing values.
    pub fn add_setting(&mut self, name: impl Into<String>, value: impl Into<SettingValue>) {
        let name = name.into();
        let value = value.into();

        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            node.settings.insert(name.clone(), value.clone());
            stack.extend(node.sub_packages.iter_mut().rev());
        }
    }

    /// Reads `name` as `T`, `None` when this node does not have it.
    pub fn setting<T: FromSettingValue>(&self, name: &str) -> Result<Option<T>, TypeMismatchError> {
        self.settings.read(name)
    }

    /// Reads `name` as `T`, falling back to `default` when this node does not have it.
    pub fn get_setting<T: FromSettingValue>(
        &self,
        name: &str,
        default: T,
    ) -> Result<T, TypeMismatchError> {
        Ok(self.setting(name)?.unwrap_or(default))
    }

    /// Iterates over this node and all of its descendants, depth first, pre-order.
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    /// All nodes, this one included, that match `predicate`, in pre-order.
    pub fn select(&self, predicate: impl Fn(&Self) -> bool) -> Vec<&Self> {
        self.iter().filter(|node| predicate(node)).collect()
    }

    /// The terminal nodes that back a unit and get bound to a driver.
    pub fn leaves(&self) -> Vec<&Self> {
        self.select(Self::is_leaf)
    }

    /// The nodes whose full name denotes a loadable unit, structural or not.
    pub fn unit_packages(&self) -> Vec<&Self> {
        self.select(Self::is_unit_package)
    }

    pub fn find(&self, id: &str) -> Option<&Self> {
        self.iter().find(|node| node.id.as_str() == id)
    }
}

impl<'a> IntoIterator for &'a PackageNode {
    type Item = &'a PackageNode;
    type IntoIter = PreOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Depth-first, pre-order traversal of a package tree.
#[derive(Debug)]
pub struct PreOrder<'a> {
    stack: Vec<&'a PackageNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a PackageNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.sub_packages.iter().rev());
        Some(node)
    }
}
