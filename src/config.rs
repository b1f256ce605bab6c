use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const DEFAULT_ADAPTIVE_AFTER_CYCLES: u32 = 5;
const DEFAULT_MIN_ATTEMPTS_FOR_ADAPTIVE: u64 = 25;
const DEFAULT_HIGH_ACCURACY: f64 = 0.88;
const DEFAULT_EASY_REVIEW_FRACTION: f64 = 0.25;
const DEFAULT_NUMBER_CYCLE_SIZE: usize = 20;
const DEFAULT_PHRASE_CYCLE_SIZE: usize = 20;
const DEFAULT_NUMBER_MAX: u32 = 1_000;

/// Largest number the German speller supports.
pub const NUMBER_MAX_LIMIT: u32 = 1_000_000;

/// Scheduling knobs shared by the adaptivity policy and the composers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Cycles after which every session runs adaptive.
    pub adaptive_after_cycles: u32,
    pub min_attempts_for_adaptive: u64,
    /// Accuracy needed both to graduate early and for an item to count as easy.
    pub high_accuracy: f64,
    /// Streak an item needs before it can count as easy.
    pub easy_min_streak: u32,
    pub easy_review_fraction: f64,
    pub number_cycle_size: usize,
    pub phrase_cycle_size: usize,
    pub number_default_max: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            adaptive_after_cycles: DEFAULT_ADAPTIVE_AFTER_CYCLES,
            min_attempts_for_adaptive: DEFAULT_MIN_ATTEMPTS_FOR_ADAPTIVE,
            high_accuracy: DEFAULT_HIGH_ACCURACY,
            easy_min_streak: 3,
            easy_review_fraction: DEFAULT_EASY_REVIEW_FRACTION,
            number_cycle_size: DEFAULT_NUMBER_CYCLE_SIZE,
            phrase_cycle_size: DEFAULT_PHRASE_CYCLE_SIZE,
            number_default_max: DEFAULT_NUMBER_MAX,
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            adaptive_after_cycles: env_or("VAJA_ADAPTIVE_AFTER_CYCLES", defaults.adaptive_after_cycles),
            min_attempts_for_adaptive: env_or(
                "VAJA_MIN_ATTEMPTS_FOR_ADAPTIVE",
                defaults.min_attempts_for_adaptive,
            ),
            high_accuracy: env_or("VAJA_HIGH_ACCURACY", defaults.high_accuracy)
                .clamp(0.0, 1.0),
            easy_min_streak: defaults.easy_min_streak,
            easy_review_fraction: env_or("VAJA_EASY_REVIEW_FRACTION", defaults.easy_review_fraction)
                .clamp(0.0, 1.0),
            number_cycle_size: env_or("VAJA_NUMBER_CYCLE_SIZE", defaults.number_cycle_size).max(1),
            phrase_cycle_size: env_or("VAJA_PHRASE_CYCLE_SIZE", defaults.phrase_cycle_size).max(1),
            number_default_max: env_or("VAJA_NUMBER_DEFAULT_MAX", defaults.number_default_max)
                .min(NUMBER_MAX_LIMIT),
        }
    }
}

/// Process-level settings for hosts embedding the scheduler.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let db_path = std::env::var("VAJA_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("vaja.db"));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            log_level,
            scheduler: SchedulerConfig::from_env(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy_constants() {
        let config = SchedulerConfig::default();
        assert_eq!(config.adaptive_after_cycles, 5);
        assert_eq!(config.min_attempts_for_adaptive, 25);
        assert!((config.high_accuracy - 0.88).abs() < f64::EPSILON);
        assert!((config.easy_review_fraction - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.number_cycle_size, 20);
        assert_eq!(config.phrase_cycle_size, 20);
        assert_eq!(config.number_default_max, 1_000);
    }

    #[test]
    fn env_values_override_and_garbage_falls_back() {
        std::env::set_var("VAJA_TEST_ENV_OR_NUMBER", "42");
        std::env::set_var("VAJA_TEST_ENV_OR_GARBAGE", "forty-two");
        assert_eq!(env_or("VAJA_TEST_ENV_OR_NUMBER", 7u32), 42);
        assert_eq!(env_or("VAJA_TEST_ENV_OR_GARBAGE", 7u32), 7);
        assert_eq!(env_or("VAJA_TEST_ENV_OR_MISSING", 0.5f64), 0.5);
    }
}
