//! Real-time reputation aggregation.
//!
//! One append-only [`ScoreAggregate`] per referenced item, keyed by
//! identifier and created lazily on first reference. Children arriving
//! before their root are tolerated: the aggregate starts with `base = 0`
//! and is backfilled when the root is ingested. Negative feedback is
//! irreversible by design — no accumulator is ever decremented.
//!
//! The whole map sits behind a single reader/writer lock; every ingest is
//! a read-modify-write under the write lock, which makes updates to one
//! aggregate linearizable while readers (`should_suppress`, `score`) take
//! shared access.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::constants::{DEFAULT_MIN_DIFFICULTY, DEFAULT_NEUTRAL_WEIGHT, DEFAULT_REPORT_WEIGHT};
use crate::item::Item;
use crate::pow::difficulty_of;
use crate::sentiment::{Sentiment, classify};

/// Scoring configuration.
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Suppression threshold — also the admission minimum.
    pub min_difficulty: u32,
    /// Multiplier on accumulated report mass, applied at score time so it
    /// can be reconfigured without replaying history.
    pub report_weight: f64,
    /// Weight of a neutral reaction, counted on the positive side.
    pub neutral_weight: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            min_difficulty: DEFAULT_MIN_DIFFICULTY,
            report_weight: DEFAULT_REPORT_WEIGHT,
            neutral_weight: DEFAULT_NEUTRAL_WEIGHT,
        }
    }
}

/// Per-item reputation accumulator.
///
/// Invariant: `total == base + positive - negative - report_weight * report_mass`
/// after every mutation. All component fields are monotonically
/// non-decreasing.
#[derive(Debug, Clone, Default)]
pub struct ScoreAggregate {
    pub id: String,
    /// Proof-of-work difficulty of the root item itself (0 until ingested).
    pub base: f64,
    pub positive: f64,
    pub negative: f64,
    /// Raw report difficulty mass; the report weight is applied at score time.
    pub report_mass: f64,
    pub total: f64,
}

impl ScoreAggregate {
    fn new(id: String) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    fn recompute(&mut self, report_weight: f64) {
        self.total = self.base + self.positive - self.negative - report_weight * self.report_mass;
    }
}

/// Summary of tracked aggregates, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorerStats {
    pub tracked: usize,
    pub below_threshold: usize,
}

/// Concurrent reputation aggregator.
///
/// Safe under unbounded concurrent callers; construct one per engine
/// instance and share it by reference.
pub struct Scorer {
    config: ScoreConfig,
    aggregates: RwLock<HashMap<String, ScoreAggregate>>,
}

impl Scorer {
    pub fn new(config: ScoreConfig) -> Self {
        Self {
            config,
            aggregates: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ScoreAggregate>> {
        self.aggregates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ScoreAggregate>> {
        self.aggregates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Ingest a root note: set its base difficulty, creating the aggregate
    /// if children arrived first.
    pub fn ingest_root(&self, item: &Item) {
        let difficulty = difficulty_of(&item.id) as f64;
        let mut map = self.write();
        let agg = map
            .entry(item.id.clone())
            .or_insert_with(|| ScoreAggregate::new(item.id.clone()));
        agg.base = difficulty;
        agg.recompute(self.config.report_weight);
    }

    /// Ingest a reaction against its parent's aggregate.
    ///
    /// Returns true iff this call moved the parent's total from at-or-above
    /// the threshold to below it — strict edge detection, so repeated calls
    /// while already below return false. Reactions without a resolvable
    /// parent are ignored.
    pub fn ingest_reaction(&self, reaction: &Item) -> bool {
        let parent = match reaction.parent() {
            Some(p) => p.to_string(),
            None => return false,
        };
        let pow = difficulty_of(&reaction.id) as f64;

        let mut map = self.write();
        let agg = map
            .entry(parent.clone())
            .or_insert_with(|| ScoreAggregate::new(parent));
        let old_total = agg.total;

        match classify(&reaction.content) {
            Sentiment::Negative => agg.negative += pow,
            Sentiment::Positive => agg.positive += pow,
            Sentiment::Neutral => agg.positive += pow * self.config.neutral_weight,
        }
        agg.recompute(self.config.report_weight);

        self.crossed_down(old_total, agg.total)
    }

    /// Ingest a report against its parent's aggregate. Same edge-detection
    /// contract as [`Scorer::ingest_reaction`].
    pub fn ingest_report(&self, report: &Item) -> bool {
        let parent = match report.parent() {
            Some(p) => p.to_string(),
            None => return false,
        };
        let pow = difficulty_of(&report.id) as f64;

        let mut map = self.write();
        let agg = map
            .entry(parent.clone())
            .or_insert_with(|| ScoreAggregate::new(parent));
        let old_total = agg.total;

        agg.report_mass += pow;
        agg.recompute(self.config.report_weight);

        self.crossed_down(old_total, agg.total)
    }

    fn crossed_down(&self, old_total: f64, new_total: f64) -> bool {
        let min = self.config.min_difficulty as f64;
        old_total >= min && new_total < min
    }

    /// Whether a tracked item's total sits below the threshold. Unknown
    /// identifiers are never suppressed — absence is not evidence.
    pub fn should_suppress(&self, id: &str) -> bool {
        self.read()
            .get(id)
            .is_some_and(|agg| agg.total < self.config.min_difficulty as f64)
    }

    /// Current total for an identifier; 0 when untracked.
    pub fn score(&self, id: &str) -> f64 {
        self.read().get(id).map_or(0.0, |agg| agg.total)
    }

    /// Copy of the full aggregate, for diagnostics.
    pub fn aggregate(&self, id: &str) -> Option<ScoreAggregate> {
        self.read().get(id).cloned()
    }

    pub fn stats(&self) -> ScorerStats {
        let min = self.config.min_difficulty as f64;
        let map = self.read();
        ScorerStats {
            tracked: map.len(),
            below_threshold: map.values().filter(|agg| agg.total < min).count(),
        }
    }
}
