use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a package node, unique among the nodes created from one [`IdGenerator`].
///
/// Drivers use it to namespace the test identifiers they produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> PackageId;
}

/// Hands out ids from a monotonically increasing counter, rendered as decimal strings.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

static GLOBAL_IDS: SequentialIds = SequentialIds::new();

impl SequentialIds {
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// The process-wide generator, for callers that have no generator of their own.
    pub fn global() -> &'static Self {
        &GLOBAL_IDS
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> PackageId {
        PackageId(self.next.fetch_add(1, Ordering::Relaxed).to_string())
    }
}
