//! Program variables

use serde::{Deserialize, Serialize};
use std::fmt;

/// A variable in an IL program.
///
/// Variables are plain numbered identifiers scoped to a single program.
/// They are created by the builder and are only meaningful relative to the
/// program that defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable(u32);

impl Variable {
    /// Create a variable with the given number.
    pub fn new(number: u32) -> Self {
        Variable(number)
    }

    /// The variable's number.
    pub fn number(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
