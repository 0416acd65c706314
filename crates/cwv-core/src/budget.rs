//! Model token budgets.

use serde::{Deserialize, Serialize};

/// Input and output token limits declared for a model.
///
/// A configuration lookup, never mutated during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBudget {
    /// Maximum prompt tokens accepted by the model.
    #[serde(rename = "input")]
    pub input_limit: u64,
    /// Maximum tokens the model may generate.
    #[serde(rename = "output")]
    pub output_limit: u64,
}

impl TokenBudget {
    /// Create a budget from explicit limits.
    pub const fn new(input_limit: u64, output_limit: u64) -> Self {
        Self {
            input_limit,
            output_limit,
        }
    }

    /// Tokens left for the prompt once the response is reserved.
    pub fn prompt_capacity(&self) -> u64 {
        self.input_limit.saturating_sub(self.output_limit)
    }
}
