//! TIOS run configuration.

use serde::{Serialize, Deserialize};

/// Settings handed to [`Tios`](crate::system::Tios) at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiosConfig {
    /// Log every bus access.
    pub trace: bool,
    /// Stop after this many instructions.
    pub instruction_limit: Option<u64>,
}

impl TiosConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_instruction_limit(mut self, limit: Option<u64>) -> Self {
        self.instruction_limit = limit;
        self
    }
}
