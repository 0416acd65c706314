//! Budget gate.
//!
//! A full-tier plan is admissible iff its total is at most 90% of the
//! model's prompt capacity (`input - output`). Integer arithmetic only, so
//! the boundary is exact.

use cwv_core::{PromptPlan, TokenBudget};

/// Share of the prompt capacity a plan may use, in tenths.
const ADMISSIBLE_TENTHS: u64 = 9;

/// Outcome of comparing a plan against a budget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BudgetCheck {
    /// Estimated plan tokens.
    pub total_tokens: u64,
    /// Largest admissible total.
    pub ceiling: u64,
    /// Plan tokens as a percentage of the input limit.
    pub usage_percent: f64,
    /// Whether the plan fits.
    pub admissible: bool,
}

impl BudgetCheck {
    /// Evaluate a plan against a budget.
    pub fn evaluate(plan: &PromptPlan, budget: TokenBudget) -> Self {
        Self::for_total(plan.total_tokens(), budget)
    }

    /// Evaluate a raw token total against a budget.
    #[allow(clippy::cast_precision_loss)]
    pub fn for_total(total_tokens: u64, budget: TokenBudget) -> Self {
        let capacity = budget.prompt_capacity();
        let usage_percent = if budget.input_limit == 0 {
            100.0
        } else {
            total_tokens as f64 / budget.input_limit as f64 * 100.0
        };
        Self {
            total_tokens,
            ceiling: capacity.saturating_mul(ADMISSIBLE_TENTHS) / 10,
            usage_percent,
            admissible: fits(total_tokens, capacity),
        }
    }
}

/// Whether a plan fits the budget.
pub fn is_admissible(plan: &PromptPlan, budget: TokenBudget) -> bool {
    fits(plan.total_tokens(), budget.prompt_capacity())
}

fn fits(total: u64, capacity: u64) -> bool {
    u128::from(total) * 10 <= u128::from(capacity) * u128::from(ADMISSIBLE_TENTHS)
}
