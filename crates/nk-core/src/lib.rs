//! notekeep scoring engine.
//!
//! Proof-of-work difficulty as the unit of reputation: notes buy admission
//! with leading-zero bits on their content hash, reactions and reports spend
//! their own difficulty for or against the notes they reference, and an
//! exponential age decay ranks the population for capacity eviction.
//!
//! Zero I/O — pure math and in-memory state with no opinions about transport
//! or persistence.

pub mod constants;
pub mod item;
pub mod pow;
pub mod retention;
pub mod scorer;
pub mod sentiment;

pub use constants::{
    DEFAULT_CAPACITY, DEFAULT_DECAY_LAMBDA, DEFAULT_MIN_DIFFICULTY, DEFAULT_NEUTRAL_WEIGHT,
    DEFAULT_REPLY_WEIGHT, DEFAULT_REPORT_WEIGHT, DEFAULT_SWEEP_INTERVAL_SECS,
};
pub use item::{Item, ItemKind, now_unix_secs};
pub use pow::{PowError, claimed_target, difficulty_of, is_admissible};
pub use retention::{
    EventScore, RetentionConfig, decay_factor, rank_evictions, reaction_contribution,
};
pub use scorer::{ScoreAggregate, ScoreConfig, Scorer, ScorerStats};
pub use sentiment::{Sentiment, classify};
