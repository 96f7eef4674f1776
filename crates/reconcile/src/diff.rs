//! The identity-set reconciler.
//!
//! Compares a persisted collection with a desired list and brings the
//! collection in line, in place:
//!
//! 1. **Remove** every entity whose id no desired entry carries
//! 2. **Update** every entity matched by id, copying only changed fields
//! 3. **Add**: hand back every desired entry without an id
//!
//! Desired entries with an id that matches nothing are ignored, and only the
//! first desired entry carrying a given id is used for the update.

use std::collections::HashMap;

use crate::traits::{Absorb, Keyed};

/// Identity comparison where "no id" never matches anything, not even "no id"
pub fn same_identity(a: Option<i64>, b: Option<i64>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// What a reconciliation did, and what it left for the caller to create
#[derive(Debug)]
pub struct Diff<'d, E, D> {
    /// Entities taken out of the collection
    pub removed: Vec<E>,
    /// Ids of entities that had at least one field rewritten
    pub updated: Vec<i64>,
    /// Entries without an id, with their position in the desired list
    pub pending: Vec<(usize, &'d D)>,
    /// Ids present in the desired list that match no entity
    pub ignored: Vec<i64>,
}

/// Reconcile `existing` against `desired` (remove + update) and return the entries to create.
pub fn reconcile<'d, E, D>(existing: &mut Vec<E>, desired: &'d [D]) -> Diff<'d, E, D>
where
    E: Absorb<D>,
    D: Keyed,
{
    // First entry wins for duplicated ids
    let mut by_id: HashMap<i64, &'d D> = HashMap::new();
    for entry in desired {
        if let Some(id) = entry.key() {
            by_id.entry(id).or_insert(entry);
        }
    }

    let (kept, removed): (Vec<E>, Vec<E>) = existing
        .drain(..)
        .partition(|entity| entity.key().is_some_and(|id| by_id.contains_key(&id)));
    *existing = kept;

    let mut updated = Vec::new();
    for entity in existing.iter_mut() {
        let Some(id) = entity.key() else { continue };
        if let Some(entry) = by_id.get(&id) {
            if entity.absorb(entry) {
                updated.push(id);
            }
        }
    }

    let mut pending = Vec::new();
    let mut ignored = Vec::new();
    for (position, entry) in desired.iter().enumerate() {
        match entry.key() {
            None => pending.push((position, entry)),
            Some(id) => {
                if !existing.iter().any(|entity| same_identity(entity.key(), Some(id)))
                    && !ignored.contains(&id)
                {
                    ignored.push(id);
                }
            }
        }
    }

    Diff {
        removed,
        updated,
        pending,
        ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: Option<i64>,
        label: String,
        touched: u32,
    }

    struct Wanted {
        id: Option<i64>,
        label: &'static str,
    }

    impl Keyed for Row {
        fn key(&self) -> Option<i64> {
            self.id
        }
    }

    impl Keyed for Wanted {
        fn key(&self) -> Option<i64> {
            self.id
        }
    }

    impl Absorb<Wanted> for Row {
        fn absorb(&mut self, desired: &Wanted) -> bool {
            if self.label == desired.label {
                return false;
            }
            self.label = desired.label.to_string();
            self.touched += 1;
            true
        }
    }

    fn row(id: i64, label: &str) -> Row {
        Row {
            id: Some(id),
            label: label.to_string(),
            touched: 0,
        }
    }

    fn wanted(id: Option<i64>, label: &'static str) -> Wanted {
        Wanted { id, label }
    }

    #[test]
    fn test_null_never_matches_null() {
        assert!(!same_identity(None, None));
        assert!(!same_identity(Some(1), None));
        assert!(!same_identity(Some(1), Some(2)));
        assert!(same_identity(Some(3), Some(3)));
    }

    #[test]
    fn test_empty_desired_removes_everything() {
        let mut existing = vec![row(1, "a"), row(2, "b")];
        let diff = reconcile::<Row, Wanted>(&mut existing, &[]);

        assert!(existing.is_empty());
        assert_eq!(diff.removed.len(), 2);
        assert!(diff.pending.is_empty());
    }

    #[test]
    fn test_remove_update_add() {
        let mut existing = vec![row(1, "a"), row(2, "b"), row(3, "c")];
        let desired = vec![wanted(Some(1), "a"), wanted(Some(3), "C"), wanted(None, "d")];

        let diff = reconcile(&mut existing, &desired);

        assert_eq!(existing.len(), 2);
        assert_eq!(diff.removed, vec![row(2, "b")]);
        assert_eq!(diff.updated, vec![3]);
        assert_eq!(existing[0].touched, 0, "unchanged rows are not rewritten");
        assert_eq!(existing[1].label, "C");
        assert_eq!(diff.pending.len(), 1);
        assert_eq!(diff.pending[0].0, 2);
    }

    #[test]
    fn test_orphan_ids_are_ignored() {
        let mut existing = vec![row(1, "a")];
        let desired = vec![wanted(Some(1), "a"), wanted(Some(99), "ghost")];

        let diff = reconcile(&mut existing, &desired);

        assert_eq!(existing.len(), 1);
        assert!(diff.pending.is_empty());
        assert_eq!(diff.ignored, vec![99]);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let mut existing = vec![row(1, "a")];
        let desired = vec![wanted(Some(1), "first"), wanted(Some(1), "second")];

        let diff = reconcile(&mut existing, &desired);

        assert_eq!(existing[0].label, "first");
        assert_eq!(diff.updated, vec![1]);
        assert!(diff.ignored.is_empty());
    }

    #[test]
    fn test_entries_without_id_are_always_new() {
        let mut existing = vec![row(1, "a")];
        let desired = vec![wanted(None, "a"), wanted(None, "a")];

        let diff = reconcile(&mut existing, &desired);

        assert!(existing.is_empty(), "row 1 is not referenced by id");
        assert_eq!(diff.pending.len(), 2);
    }

    #[test]
    fn test_unpersisted_existing_rows_never_match() {
        let mut existing = vec![Row {
            id: None,
            label: "draft".to_string(),
            touched: 0,
        }];
        let desired = vec![wanted(None, "draft")];

        let diff = reconcile(&mut existing, &desired);

        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.pending.len(), 1);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let mut existing = vec![row(1, "a"), row(2, "b")];
        let desired = vec![wanted(Some(1), "x"), wanted(Some(2), "b")];

        reconcile(&mut existing, &desired);
        let snapshot = existing.clone();
        let diff = reconcile(&mut existing, &desired);

        assert_eq!(existing, snapshot);
        assert!(diff.removed.is_empty());
        assert!(diff.updated.is_empty());
    }
}
