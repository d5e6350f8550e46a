//! Retention scoring math.
//!
//! The pruner's side of the scoring split: a wholesale per-sweep score for
//! every root item, built from the full current child population rather than
//! incremental updates, then attenuated by exponential age decay and ranked
//! for capacity eviction. Deliberately independent of the live aggregator —
//! the two views are allowed to disagree transiently.

use std::cmp::Ordering;

use crate::constants::{
    DEFAULT_CAPACITY, DEFAULT_DECAY_LAMBDA, DEFAULT_NEUTRAL_WEIGHT, DEFAULT_REPLY_WEIGHT,
};
use crate::sentiment::{Sentiment, classify};

/// Retention configuration.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Maximum number of notes kept before eviction.
    pub capacity: usize,
    /// Per-day exponential decay rate.
    pub decay_lambda: f64,
    /// Contribution of each reply to the raw total.
    pub reply_weight: f64,
    /// Weight of a neutral reaction's difficulty.
    pub neutral_weight: f64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            decay_lambda: DEFAULT_DECAY_LAMBDA,
            reply_weight: DEFAULT_REPLY_WEIGHT,
            neutral_weight: DEFAULT_NEUTRAL_WEIGHT,
        }
    }
}

/// Per-sweep score for one root item. Ephemeral — recomputed wholesale
/// every cycle, never persisted.
#[derive(Debug, Clone)]
pub struct EventScore {
    pub id: String,
    pub root_difficulty: u32,
    /// Signed sum of reaction difficulties.
    pub reaction_sum: f64,
    pub reply_count: usize,
    pub age_days: f64,
    pub raw_total: f64,
    pub decayed: f64,
}

impl EventScore {
    pub fn compute(
        id: String,
        root_difficulty: u32,
        reaction_sum: f64,
        reply_count: usize,
        age_days: f64,
        config: &RetentionConfig,
    ) -> Self {
        let raw_total =
            root_difficulty as f64 + reaction_sum + config.reply_weight * reply_count as f64;
        let decayed = raw_total * decay_factor(age_days, config.decay_lambda);
        Self {
            id,
            root_difficulty,
            reaction_sum,
            reply_count,
            age_days,
            raw_total,
            decayed,
        }
    }
}

/// `exp(-lambda * age_days)` — 1.0 at age 0, strictly decreasing for
/// positive lambda.
pub fn decay_factor(age_days: f64, lambda: f64) -> f64 {
    (-lambda * age_days).exp()
}

/// Signed contribution of one reaction to its parent's reaction sum.
pub fn reaction_contribution(content: &str, difficulty: u32, neutral_weight: f64) -> f64 {
    let d = difficulty as f64;
    match classify(content) {
        Sentiment::Positive => d,
        Sentiment::Negative => -d,
        Sentiment::Neutral => neutral_weight * d,
    }
}

/// Select the items to evict: the `population - capacity` lowest by decayed
/// score, empty when the population fits. Ties on decayed score break by
/// identifier lexical order so the result is deterministic regardless of
/// sort algorithm.
pub fn rank_evictions(mut scores: Vec<EventScore>, capacity: usize) -> Vec<EventScore> {
    if scores.len() <= capacity {
        return Vec::new();
    }
    scores.sort_by(|a, b| {
        a.decayed
            .partial_cmp(&b.decayed)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    let excess = scores.len() - capacity;
    scores.truncate(excess);
    scores
}
