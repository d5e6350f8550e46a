//! Engine tuning: defaults, optional TOML file, CLI flag overrides.
//!
//! Precedence is flags > file > defaults; every knob is optional at every
//! layer.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use nk_core::{
    DEFAULT_CAPACITY, DEFAULT_DECAY_LAMBDA, DEFAULT_MIN_DIFFICULTY, DEFAULT_NEUTRAL_WEIGHT,
    DEFAULT_REPLY_WEIGHT, DEFAULT_REPORT_WEIGHT, DEFAULT_SWEEP_INTERVAL_SECS, RetentionConfig,
    ScoreConfig,
};

/// Tuning flags, shared by every subcommand. All optional; unset flags
/// fall through to the config file and then the defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct Tuning {
    /// Minimum admission difficulty in leading zero bits
    #[arg(long, global = true)]
    pub min_difficulty: Option<u32>,

    /// Maximum number of notes retained
    #[arg(long, global = true)]
    pub capacity: Option<usize>,

    /// Per-day exponential decay rate for retention scores
    #[arg(long, global = true)]
    pub decay_lambda: Option<f64>,

    /// Seconds between retention sweeps
    #[arg(long, global = true)]
    pub sweep_interval: Option<u64>,

    /// Multiplier on accumulated report mass
    #[arg(long, global = true)]
    pub report_weight: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    min_difficulty: Option<u32>,
    capacity: Option<usize>,
    decay_lambda: Option<f64>,
    sweep_interval: Option<u64>,
    report_weight: Option<f64>,
}

/// Fully resolved engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub min_difficulty: u32,
    pub capacity: usize,
    pub decay_lambda: f64,
    pub sweep_interval: u64,
    pub report_weight: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_difficulty: DEFAULT_MIN_DIFFICULTY,
            capacity: DEFAULT_CAPACITY,
            decay_lambda: DEFAULT_DECAY_LAMBDA,
            sweep_interval: DEFAULT_SWEEP_INTERVAL_SECS,
            report_weight: DEFAULT_REPORT_WEIGHT,
        }
    }
}

impl EngineConfig {
    pub fn resolve(file: Option<&Path>, flags: &Tuning) -> Result<Self> {
        let from_file = match file {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                toml::from_str::<FileConfig>(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => FileConfig::default(),
        };

        let defaults = Self::default();
        Ok(Self {
            min_difficulty: flags
                .min_difficulty
                .or(from_file.min_difficulty)
                .unwrap_or(defaults.min_difficulty),
            capacity: flags
                .capacity
                .or(from_file.capacity)
                .unwrap_or(defaults.capacity),
            decay_lambda: flags
                .decay_lambda
                .or(from_file.decay_lambda)
                .unwrap_or(defaults.decay_lambda),
            sweep_interval: flags
                .sweep_interval
                .or(from_file.sweep_interval)
                .unwrap_or(defaults.sweep_interval),
            report_weight: flags
                .report_weight
                .or(from_file.report_weight)
                .unwrap_or(defaults.report_weight),
        })
    }

    pub fn score_config(&self) -> ScoreConfig {
        ScoreConfig {
            min_difficulty: self.min_difficulty,
            report_weight: self.report_weight,
            neutral_weight: DEFAULT_NEUTRAL_WEIGHT,
        }
    }

    pub fn retention_config(&self) -> RetentionConfig {
        RetentionConfig {
            capacity: self.capacity,
            decay_lambda: self.decay_lambda,
            reply_weight: DEFAULT_REPLY_WEIGHT,
            neutral_weight: DEFAULT_NEUTRAL_WEIGHT,
        }
    }
}
