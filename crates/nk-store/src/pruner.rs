//! Periodic age-decayed capacity eviction.
//!
//! Each sweep rebuilds every note's retention score from live store
//! queries, ranks the population, and removes the lowest-scoring excess
//! along with their dependents. Nothing is cached between sweeps, so the
//! pruner tolerates any interleaving with concurrent ingest at the cost of
//! reading a point-in-time snapshot per item.

use tracing::{debug, warn};

use nk_core::{
    EventScore, Item, ItemKind, RetentionConfig, difficulty_of, now_unix_secs, rank_evictions,
    reaction_contribution,
};

use crate::cascade::cascade_dependents;
use crate::error::Result;
use crate::store::Store;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Notes scored this cycle.
    pub tracked: usize,
    /// Roots removed (dependents not counted).
    pub evicted: usize,
    pub capacity: usize,
}

/// Run one retention pass: score every note, evict the excess lowest.
///
/// A failure to score one item is logged and that item skipped — it stays
/// resident until a later sweep can score it. Only a failure to enumerate
/// the population aborts the sweep.
pub fn sweep(store: &Store, config: &RetentionConfig) -> Result<SweepReport> {
    let now = now_unix_secs();
    let notes = store.query_all(ItemKind::Note)?;
    let tracked = notes.len();

    let mut scores = Vec::with_capacity(tracked);
    for note in &notes {
        match score_note(store, note, now, config) {
            Ok(score) => scores.push(score),
            Err(e) => warn!(id = %note.id, error = %e, "skipping unscoreable note"),
        }
    }

    let mut evicted = 0;
    for victim in rank_evictions(scores, config.capacity) {
        let dependents = cascade_dependents(store, &victim.id);
        match store.delete(&victim.id) {
            Ok(true) => {
                evicted += 1;
                debug!(
                    id = %victim.id,
                    decayed = victim.decayed,
                    dependents,
                    "evicted note"
                );
            }
            // Already gone — deleted as a dependent of an earlier victim.
            Ok(false) => {}
            Err(e) => warn!(id = %victim.id, error = %e, "failed to evict note"),
        }
    }

    Ok(SweepReport {
        tracked,
        evicted,
        capacity: config.capacity,
    })
}

fn score_note(
    store: &Store,
    note: &Item,
    now: u64,
    config: &RetentionConfig,
) -> Result<EventScore> {
    let mut reaction_sum = 0.0;
    for reaction in store.query_by_kind_and_reference(ItemKind::Reaction, &note.id)? {
        reaction_sum += reaction_contribution(
            &reaction.content,
            difficulty_of(&reaction.id),
            config.neutral_weight,
        );
    }
    let replies = store.query_by_kind_and_reference(ItemKind::Note, &note.id)?;

    Ok(EventScore::compute(
        note.id.clone(),
        difficulty_of(&note.id),
        reaction_sum,
        replies.len(),
        note.age_days(now),
        config,
    ))
}
