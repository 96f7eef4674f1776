//! The role association store: one reconciliation algorithm for every roster.
//!
//! Each crew category (and the cast) plugs in through the [`Roster`] trait.
//! The functions here never know which category they are working on.

use tracing::debug;

use catalog::{CatalogError, EntryFailure, Movie, PersonId, Result};

use crate::batch;
use crate::diff;
use crate::traits::{Keyed, Roster};

/// Summary of what a reconciliation changed on one roster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterChanges {
    pub removed: Vec<i64>,
    pub updated: Vec<i64>,
    pub created: usize,
    pub ignored: Vec<i64>,
}

impl RosterChanges {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.updated.is_empty() && self.created == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} removed, {} updated, {} created",
            self.removed.len(),
            self.updated.len(),
            self.created
        )
    }
}

/// Validate every entry, reporting all failures together
pub fn validate_all<R: Roster>(roster: &R, desired: &[R::Entry]) -> Result<()> {
    let failures: Vec<EntryFailure> = desired
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            roster
                .validate(entry)
                .err()
                .map(|error| EntryFailure { position, error })
        })
        .collect();

    match CatalogError::aggregate(failures) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Bring `roster`'s collection on `movie` in line with `desired`.
///
/// ## Algorithm
/// 1. Validate all entries; any failure aborts before anything is touched
/// 2. Remove and update through the identity-set reconciler
/// 3. Create the entries without an id, one at a time
/// 4. Attach the new entities to the collection
///
/// The collection must have been fetched beforehand.
pub async fn reconcile_roster<R: Roster>(
    roster: &R,
    movie: &mut Movie,
    desired: &[R::Entry],
) -> Result<RosterChanges> {
    validate_all(roster, desired)?;

    let diff = diff::reconcile(roster.collection(movie)?, desired);
    for id in &diff.ignored {
        debug!(
            "Ignoring {} entry {} on movie {}: no such row",
            roster.name(),
            id,
            movie.id
        );
    }

    let created = {
        let movie_ref: &Movie = movie;
        batch::create_all(diff.pending, |entry| roster.create(movie_ref, entry)).await?
    };
    let created_count = created.len();
    roster.collection(movie)?.extend(created);

    let changes = RosterChanges {
        removed: diff.removed.iter().filter_map(|entity| entity.key()).collect(),
        updated: diff.updated,
        created: created_count,
        ignored: diff.ignored,
    };
    debug!(
        "Reconciled {} on movie {}: {}",
        roster.name(),
        movie.id,
        changes.summary()
    );
    Ok(changes)
}

/// Remove every entry of `person_id` from the roster. Returns the removed ids.
pub fn remove_person<R: Roster>(roster: &R, movie: &mut Movie, person_id: PersonId) -> Result<Vec<i64>> {
    let items = roster.collection(movie)?;
    let mut removed = Vec::new();
    items.retain(|entity| {
        if roster.person_of(entity) == person_id {
            removed.extend(entity.key());
            false
        } else {
            true
        }
    });
    Ok(removed)
}

/// Remove every entry of the roster. Returns the removed ids.
pub fn clear<R: Roster>(roster: &R, movie: &mut Movie) -> Result<Vec<i64>> {
    let items = roster.collection(movie)?;
    Ok(items.drain(..).filter_map(|entity| entity.key()).collect())
}
