//! Engine configuration, parsed from environment variables with fallback defaults.

use std::time::Duration;

use crate::scoring::ScoreWeights;

/// What the engine does when loading a single profile fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the error and score the user against an empty profile.
    #[default]
    FailOpen,
    /// Abort the whole recommendation pass with the error.
    FailFast,
}

/// Configuration for the recommendation engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Maximum number of recommendations returned (default 10).
    pub top_n: usize,
    /// Scoring weights (default 0.5 / 0.3 / 0.2).
    pub weights: ScoreWeights,
    /// Per-profile fetch failure handling (default fail-open).
    pub failure_policy: FailurePolicy,
    /// Wall-clock budget for one recommendation pass (default unbounded).
    pub time_budget: Option<Duration>,
    /// Reuse loaded profiles across passes (default off).
    pub cache_profiles: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            weights: ScoreWeights::default(),
            failure_policy: FailurePolicy::FailOpen,
            time_budget: None,
            cache_profiles: false,
        }
    }
}

impl EngineConfig {
    /// Parses configuration from environment variables.
    ///
    /// Falls back to defaults when env vars are not set or invalid.
    ///
    /// # Environment Variables
    ///
    /// - `MUTUALS_TOP_N` (usize, default 10)
    /// - `MUTUALS_WEIGHT_CONNECTIONS` (f64 >= 0, default 0.5)
    /// - `MUTUALS_WEIGHT_PROJECT_TAGS` (f64 >= 0, default 0.3)
    /// - `MUTUALS_WEIGHT_CONNECTED_TAGS` (f64 >= 0, default 0.2)
    /// - `MUTUALS_FAIL_FAST` (bool, default false)
    /// - `MUTUALS_TIME_BUDGET_MS` (u64, unset means no budget)
    /// - `MUTUALS_CACHE_PROFILES` (bool, default false)
    ///
    /// # Examples
    ///
    /// ```
    /// use mutuals::config::EngineConfig;
    ///
    /// let config = EngineConfig::from_env();
    /// assert!(config.weights.connections >= 0.0);
    /// ```
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let top_n = env_parse("MUTUALS_TOP_N").unwrap_or(defaults.top_n);

        let weights = ScoreWeights {
            connections: env_weight("MUTUALS_WEIGHT_CONNECTIONS")
                .unwrap_or(defaults.weights.connections),
            project_tags: env_weight("MUTUALS_WEIGHT_PROJECT_TAGS")
                .unwrap_or(defaults.weights.project_tags),
            connected_tags: env_weight("MUTUALS_WEIGHT_CONNECTED_TAGS")
                .unwrap_or(defaults.weights.connected_tags),
        };

        let failure_policy = if env_flag("MUTUALS_FAIL_FAST") {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::FailOpen
        };

        let time_budget = env_parse::<u64>("MUTUALS_TIME_BUDGET_MS").map(Duration::from_millis);

        Self {
            top_n,
            weights,
            failure_policy,
            time_budget,
            cache_profiles: env_flag("MUTUALS_CACHE_PROFILES"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

// Negative or non-finite weights would break the non-negative score guarantee.
fn env_weight(key: &str) -> Option<f64> {
    env_parse::<f64>(key).filter(|w| w.is_finite() && *w >= 0.0)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "MUTUALS_TOP_N",
        "MUTUALS_WEIGHT_CONNECTIONS",
        "MUTUALS_WEIGHT_PROJECT_TAGS",
        "MUTUALS_WEIGHT_CONNECTED_TAGS",
        "MUTUALS_FAIL_FAST",
        "MUTUALS_TIME_BUDGET_MS",
        "MUTUALS_CACHE_PROFILES",
    ];

    fn clear_env() {
        for key in KEYS {
            // SAFETY: tests touching the environment are serialized.
            unsafe { std::env::remove_var(key) };
        }
    }

    fn set(key: &str, value: &str) {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    #[serial]
    fn from_env_uses_defaults_when_unset() {
        clear_env();

        assert_eq!(EngineConfig::from_env(), EngineConfig::default());
    }

    #[test]
    #[serial]
    fn from_env_reads_overrides() {
        clear_env();
        set("MUTUALS_TOP_N", "3");
        set("MUTUALS_WEIGHT_CONNECTIONS", "1.5");
        set("MUTUALS_FAIL_FAST", "true");
        set("MUTUALS_TIME_BUDGET_MS", "250");
        set("MUTUALS_CACHE_PROFILES", "1");

        let config = EngineConfig::from_env();
        clear_env();

        assert_eq!(config.top_n, 3);
        assert_eq!(config.weights.connections, 1.5);
        assert_eq!(config.weights.project_tags, 0.3);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.time_budget, Some(Duration::from_millis(250)));
        assert!(config.cache_profiles);
    }

    #[test]
    #[serial]
    fn from_env_ignores_invalid_values() {
        clear_env();
        set("MUTUALS_TOP_N", "many");
        set("MUTUALS_WEIGHT_PROJECT_TAGS", "-1");
        set("MUTUALS_WEIGHT_CONNECTED_TAGS", "NaN");
        set("MUTUALS_FAIL_FAST", "nope");

        let config = EngineConfig::from_env();
        clear_env();

        assert_eq!(config.top_n, 10);
        assert_eq!(config.weights.project_tags, 0.3);
        assert_eq!(config.weights.connected_tags, 0.2);
        assert_eq!(config.failure_policy, FailurePolicy::FailOpen);
    }
}
