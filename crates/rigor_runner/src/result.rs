use std::fmt;

use crate::driver::ResultFragment;

/// The fragments of every contributing driver call, in driver order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    fragments: Vec<ResultFragment>,
}

impl AggregateResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: ResultFragment) {
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[ResultFragment] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl Extend<ResultFragment> for AggregateResult {
    fn extend<T: IntoIterator<Item = ResultFragment>>(&mut self, iter: T) {
        self.fragments.extend(iter);
    }
}

impl FromIterator<ResultFragment> for AggregateResult {
    fn from_iter<T: IntoIterator<Item = ResultFragment>>(iter: T) -> Self {
        Self {
            fragments: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, fragment) in self.fragments.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            f.write_str(fragment.as_str())?;
        }
        Ok(())
    }
}
