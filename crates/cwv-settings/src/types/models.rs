use std::collections::BTreeMap;

use cwv_core::TokenBudget;
use serde::{Deserialize, Serialize};

/// Model selection and per-model token limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSettings {
    /// Model used when none is requested.
    pub default: String,
    /// Token limits keyed by model id.
    pub limits: BTreeMap<String, TokenBudget>,
    /// Limits assumed for a model missing from `limits`.
    pub fallback_limits: TokenBudget,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let limits = [
            ("gpt-4.1", TokenBudget::new(1_047_576, 32_768)),
            ("gpt-4.1-mini", TokenBudget::new(1_047_576, 32_768)),
            ("gpt-4o", TokenBudget::new(128_000, 16_384)),
            ("gpt-4o-mini", TokenBudget::new(128_000, 16_384)),
            ("o3", TokenBudget::new(200_000, 100_000)),
            ("gemini-2.5-pro", TokenBudget::new(1_048_576, 65_536)),
            ("gemini-2.5-flash", TokenBudget::new(1_048_576, 65_536)),
            ("claude-sonnet-4", TokenBudget::new(200_000, 64_000)),
            ("claude-opus-4", TokenBudget::new(200_000, 32_000)),
        ]
        .into_iter()
        .map(|(id, budget)| (id.to_string(), budget))
        .collect();

        Self {
            default: "gpt-4.1".to_string(),
            limits,
            fallback_limits: TokenBudget::new(128_000, 8_192),
        }
    }
}

impl ModelSettings {
    /// Declared limits for a model.
    ///
    /// Exact ids win; otherwise the longest configured id that prefixes
    /// `model` (so dated snapshots like `gpt-4o-2024-08-06` resolve).
    pub fn budget_for(&self, model: &str) -> Option<TokenBudget> {
        if let Some(budget) = self.limits.get(model) {
            return Some(*budget);
        }
        self.limits
            .iter()
            .filter(|(id, _)| model.starts_with(id.as_str()))
            .max_by_key(|(id, _)| id.len())
            .map(|(_, budget)| *budget)
    }

    /// Declared limits for a model, or the fallback limits.
    pub fn resolve_budget(&self, model: &str) -> TokenBudget {
        self.budget_for(model).unwrap_or_else(|| {
            tracing::warn!(
                model,
                input = self.fallback_limits.input_limit,
                output = self.fallback_limits.output_limit,
                "unknown model, using fallback token limits"
            );
            self.fallback_limits
        })
    }
}
