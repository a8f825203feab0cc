use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the pricing subproblem is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingStrategy {
    /// Dynamic-programming knapsack only.
    Exact,
    /// Ratio heuristic first, dynamic programming whenever the heuristic finds no improving column.
    #[default]
    HeuristicThenExact,
    /// Knapsack as a binary program on a fresh engine per round.
    Mip,
}

/// What happens after the LP relaxation is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegerPolicy {
    /// Report the LP bound and the patterns used by the relaxed solution.
    #[default]
    Skip,
    /// Solve the master once more with binary columns over all generated patterns.
    SolveMaster,
}

/// Settings of one column generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGenerationConfig {
    /// Maximum number of pricing rounds. Has no default.
    pub max_iterations: usize,

    /// A column is added only if its reduced cost is below `-reduced_cost_tolerance`.
    #[serde(default = "default_reduced_cost_tolerance")]
    pub reduced_cost_tolerance: f64,

    /// Column value above which a pattern counts as selected.
    #[serde(default = "default_selection_tolerance")]
    pub selection_tolerance: f64,

    #[serde(default)]
    pub pricing: PricingStrategy,

    #[serde(default)]
    pub integer: IntegerPolicy,

    /// Wall-clock limit in seconds for every single engine solve.
    #[serde(default)]
    pub time_limit: Option<f64>,
}

fn default_reduced_cost_tolerance() -> f64 {
    1e-6
}

fn default_selection_tolerance() -> f64 {
    crate::master::DEFAULT_SELECTION_TOLERANCE
}

impl ColumnGenerationConfig {
    /// Default settings with the given iteration bound.
    pub fn new(max_iterations: usize) -> Self {
        ColumnGenerationConfig {
            max_iterations,
            reduced_cost_tolerance: default_reduced_cost_tolerance(),
            selection_tolerance: default_selection_tolerance(),
            pricing: PricingStrategy::default(),
            integer: IntegerPolicy::default(),
            time_limit: None,
        }
    }

    pub fn with_pricing(mut self, pricing: PricingStrategy) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_integer(mut self, integer: IntegerPolicy) -> Self {
        self.integer = integer;
        self
    }

    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit.map(|d| d.as_secs_f64());
        self
    }

    /// The per-solve time limit. Negative or non-finite values mean no limit.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: ColumnGenerationConfig =
            serde_json::from_str(r#"{ "max_iterations": 50 }"#).unwrap();
        assert_eq!(config, ColumnGenerationConfig::new(50));
        assert_eq!(config.pricing, PricingStrategy::HeuristicThenExact);
        assert_eq!(config.integer, IntegerPolicy::Skip);
        assert_eq!(config.reduced_cost_tolerance, 1e-6);
        assert_eq!(config.selection_tolerance, 0.01);
        assert_eq!(config.time_limit(), None);
    }

    #[test]
    fn max_iterations_is_required() {
        let err = serde_json::from_str::<ColumnGenerationConfig>(r#"{ "pricing": "exact" }"#)
            .unwrap_err();
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn reads_every_field() {
        let config: ColumnGenerationConfig = serde_json::from_str(
            r#"{
                "max_iterations": 3,
                "reduced_cost_tolerance": 1e-4,
                "selection_tolerance": 0.5,
                "pricing": "mip",
                "integer": "solve_master",
                "time_limit": 2.5
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.pricing, PricingStrategy::Mip);
        assert_eq!(config.integer, IntegerPolicy::SolveMaster);
        assert_eq!(config.time_limit(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn negative_time_limit_means_none() {
        let mut config = ColumnGenerationConfig::new(1);
        config.time_limit = Some(-1.0);
        assert_eq!(config.time_limit(), None);
        let config = config.with_time_limit(Some(Duration::from_secs(3)));
        assert_eq!(config.time_limit(), Some(Duration::from_secs(3)));
    }
}
