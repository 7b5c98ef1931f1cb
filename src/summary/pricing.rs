//! Per-model token pricing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPrice {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    /// Cost in USD for the given token counts.
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        input_tokens as f64 / 1_000_000.0 * self.input_per_million
            + output_tokens as f64 / 1_000_000.0 * self.output_per_million
    }
}

const BUILTIN: &[(&str, ModelPrice)] = &[
    ("claude-opus-4", ModelPrice::new(15.0, 75.0)),
    ("claude-sonnet-4", ModelPrice::new(3.0, 15.0)),
    ("claude-haiku-4", ModelPrice::new(0.80, 4.0)),
];

const FALLBACK: ModelPrice = ModelPrice::new(3.0, 15.0);

/// Maps model names to prices by family prefix.
///
/// A model matches a family when its name contains the family key. Overrides
/// win over built-in families, and the longest matching key wins within each.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    overrides: HashMap<String, ModelPrice>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add overrides keyed by model family (e.g. `claude-sonnet-4`).
    pub fn with_overrides(mut self, overrides: HashMap<String, ModelPrice>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    /// Price for a model.
    pub fn price_for(&self, model: &str) -> ModelPrice {
        let overridden = self
            .overrides
            .iter()
            .filter(|(key, _)| model.contains(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, price)| *price);

        overridden
            .or_else(|| {
                BUILTIN
                    .iter()
                    .filter(|(key, _)| model.contains(key))
                    .max_by_key(|(key, _)| key.len())
                    .map(|(_, price)| *price)
            })
            .unwrap_or(FALLBACK)
    }

    /// Cost in USD of a call to `model`.
    pub fn cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        self.price_for(model).cost(input_tokens, output_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_builtin_families() {
        let table = PricingTable::new();
        assert!(approx(table.cost("claude-opus-4-1", 1_000_000, 0), 15.0));
        assert!(approx(table.cost("claude-sonnet-4-6", 1200, 300), 0.0081));
        assert!(approx(table.cost("claude-haiku-4-5", 0, 1_000_000), 4.0));
        assert!(approx(table.cost("some-other-model", 1_000_000, 1_000_000), 18.0));
    }

    #[test]
    fn test_override_wins() {
        let table = PricingTable::new().with_overrides(HashMap::from([(
            "claude-sonnet-4".to_string(),
            ModelPrice::new(1.0, 2.0),
        )]));
        assert!(approx(table.cost("claude-sonnet-4-6", 1_000_000, 1_000_000), 3.0));
        assert!(approx(table.cost("claude-opus-4", 1_000_000, 0), 15.0));
    }
}
