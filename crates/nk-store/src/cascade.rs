//! Cascade deletion of an item's dependents.
//!
//! Reactions referencing the subject go first, then replies, each reply's
//! own subtree before the reply itself. The subject is never deleted here;
//! callers decide its fate separately. A visited set makes termination
//! structural even if stored references form a cycle, and every per-item
//! failure is logged and skipped so one bad row cannot stall the walk.

use std::collections::HashSet;

use tracing::warn;

use nk_core::ItemKind;

use crate::store::Store;

/// Delete everything that references `id`, transitively. Returns the
/// number of items removed.
pub fn cascade_dependents(store: &Store, id: &str) -> usize {
    let mut visited = HashSet::new();
    cascade(store, id, &mut visited)
}

fn cascade(store: &Store, id: &str, visited: &mut HashSet<String>) -> usize {
    if !visited.insert(id.to_string()) {
        return 0;
    }
    let mut removed = 0;

    match store.query_by_kind_and_reference(ItemKind::Reaction, id) {
        Ok(reactions) => {
            for reaction in reactions {
                match store.delete(&reaction.id) {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(e) => warn!(id = %reaction.id, error = %e, "failed to delete reaction"),
                }
            }
        }
        Err(e) => warn!(id = %id, error = %e, "failed to list reactions"),
    }

    match store.query_by_kind_and_reference(ItemKind::Note, id) {
        Ok(replies) => {
            for reply in replies {
                // A cyclic reference can lead back to an ancestor — or the
                // subject itself, which is never ours to delete.
                if visited.contains(reply.id.as_str()) {
                    continue;
                }
                removed += cascade(store, &reply.id, visited);
                match store.delete(&reply.id) {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(e) => warn!(id = %reply.id, error = %e, "failed to delete reply"),
                }
            }
        }
        Err(e) => warn!(id = %id, error = %e, "failed to list replies"),
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use nk_core::Item;

    fn persist(store: &Store, id: &str, kind: ItemKind, parent: Option<&str>) {
        let tags = match parent {
            Some(p) => vec![vec!["e".to_string(), p.to_string()]],
            None => vec![],
        };
        store
            .persist(&Item {
                id: id.to_string(),
                kind,
                created_at: 0,
                content: String::new(),
                tags,
            })
            .unwrap();
    }

    #[test]
    fn test_deletes_direct_reactions() {
        let store = Store::open_in_memory().unwrap();
        persist(&store, "root", ItemKind::Note, None);
        persist(&store, "r1", ItemKind::Reaction, Some("root"));
        persist(&store, "r2", ItemKind::Reaction, Some("root"));

        assert_eq!(cascade_dependents(&store, "root"), 2);
        assert!(store.get("r1").unwrap().is_none());
        // The subject itself is untouched
        assert!(store.get("root").unwrap().is_some());
    }

    #[test]
    fn test_recurses_through_replies() {
        let store = Store::open_in_memory().unwrap();
        persist(&store, "root", ItemKind::Note, None);
        persist(&store, "reply", ItemKind::Note, Some("root"));
        persist(&store, "nested", ItemKind::Note, Some("reply"));
        persist(&store, "deep-reaction", ItemKind::Reaction, Some("nested"));

        assert_eq!(cascade_dependents(&store, "root"), 3);
        assert_eq!(store.count_all().unwrap(), 1);
        assert!(store.get("root").unwrap().is_some());
    }

    #[test]
    fn test_terminates_on_reference_cycle() {
        let store = Store::open_in_memory().unwrap();
        // a and b reference each other
        persist(&store, "a", ItemKind::Note, Some("b"));
        persist(&store, "b", ItemKind::Note, Some("a"));
        persist(&store, "r", ItemKind::Reaction, Some("b"));

        let removed = cascade_dependents(&store, "a");
        assert_eq!(removed, 2, "b and its reaction");
        assert!(store.get("a").unwrap().is_some());
        assert!(store.get("b").unwrap().is_none());
        assert!(store.get("r").unwrap().is_none());
    }

    #[test]
    fn test_self_referencing_subject_survives() {
        let store = Store::open_in_memory().unwrap();
        // A note whose reply reference points at itself
        persist(&store, "loop", ItemKind::Note, Some("loop"));
        persist(&store, "r", ItemKind::Reaction, Some("loop"));

        assert_eq!(cascade_dependents(&store, "loop"), 1);
        assert!(store.get("loop").unwrap().is_some());
        assert!(store.get("r").unwrap().is_none());
    }

    #[test]
    fn test_no_dependents_is_noop() {
        let store = Store::open_in_memory().unwrap();
        persist(&store, "root", ItemKind::Note, None);
        assert_eq!(cascade_dependents(&store, "root"), 0);
        // Repeat runs see nothing left to do
        assert_eq!(cascade_dependents(&store, "root"), 0);
    }

    #[test]
    fn test_unrelated_items_survive() {
        let store = Store::open_in_memory().unwrap();
        persist(&store, "root", ItemKind::Note, None);
        persist(&store, "other", ItemKind::Note, None);
        persist(&store, "other-r", ItemKind::Reaction, Some("other"));
        persist(&store, "victim", ItemKind::Reaction, Some("root"));

        assert_eq!(cascade_dependents(&store, "root"), 1);
        assert!(store.get("other-r").unwrap().is_some());
    }
}
