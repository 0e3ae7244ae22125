//! Configuration options for plan building.

use serde::{Deserialize, Serialize};

/// Options controlling how plans are built and rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Build filters, each geographic level and indicators on the rayon
    /// thread pool. Output is identical either way.
    pub parallel: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl MatchOptions {
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
