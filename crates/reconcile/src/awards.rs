//! Nested award reconciliation: ceremony → awards → awardees.
//!
//! The orchestrator drives it in four steps:
//! 1. [`resolve_ceremony`]: use an existing ceremony or create a new one
//! 2. [`locate_ceremony_award`]: find (or add) the movie's entry for that ceremony
//! 3. fetch the award list of that entry through the session
//! 4. [`reconcile_awards`]: run the identity-set reconciler over the award
//!    list, then resolve each award's awardees against the caller's person map

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use catalog::{
    Award, CatalogError, Ceremony, CeremonyAward, CeremonyAwardId, CeremonyId, EntryFailure,
    MovieId, MovieSession, Person, PersonId, Result,
};

use crate::diff::{self, same_identity};
use crate::entries::{AwardEntry, CeremonyEntry};
use crate::traits::{Absorb, Keyed};

/// Summary of an award-list reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwardChanges {
    pub removed: Vec<i64>,
    pub updated: Vec<i64>,
    pub created: usize,
    pub ignored: Vec<i64>,
    /// Awardee ids that were not in the person map
    pub unresolved_awardees: Vec<PersonId>,
}

impl AwardChanges {
    pub fn summary(&self) -> String {
        format!(
            "{} removed, {} updated, {} created",
            self.removed.len(),
            self.updated.len(),
            self.created
        )
    }
}

/// Returns the referenced ceremony, or creates one when the entry has no id
pub async fn resolve_ceremony(session: &mut dyn MovieSession, entry: &CeremonyEntry) -> Result<Ceremony> {
    if let Some(id) = entry.id {
        return session
            .find_ceremony(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("ceremony", id));
    }

    let name = entry.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(CatalogError::validation(
            "ceremony.name",
            "a new ceremony needs a name",
        ));
    }
    session.create_ceremony(name).await
}

/// Find the position of the ceremony award a descriptor targets, adding a
/// new one when the movie has none for `ceremony_id`.
///
/// A descriptor id must name one of the movie's ceremony awards. Re-pointing
/// it at a ceremony another entry of the movie already uses is rejected.
pub fn locate_ceremony_award(
    ceremony_awards: &mut Vec<CeremonyAward>,
    movie_id: MovieId,
    descriptor_id: Option<CeremonyAwardId>,
    ceremony_id: CeremonyId,
) -> Result<usize> {
    let Some(id) = descriptor_id else {
        if let Some(position) = ceremony_awards.iter().position(|ca| ca.ceremony_id == ceremony_id) {
            return Ok(position);
        }
        ceremony_awards.push(CeremonyAward::new(movie_id, ceremony_id));
        return Ok(ceremony_awards.len() - 1);
    };

    let position = ceremony_awards
        .iter()
        .position(|ca| ca.id == Some(id))
        .ok_or_else(|| CatalogError::not_found("ceremony award", id))?;

    let taken = ceremony_awards
        .iter()
        .enumerate()
        .any(|(other, ca)| other != position && ca.ceremony_id == ceremony_id);
    if taken {
        return Err(CatalogError::validation(
            "ceremony",
            format!("movie {} already has awards for ceremony {}", movie_id, ceremony_id),
        ));
    }

    ceremony_awards[position].ceremony_id = ceremony_id;
    Ok(position)
}

/// Reconcile the award list of `ceremony_award` against `entries`.
///
/// Awardees are resolved against `people`; ids missing from the map are
/// dropped from the award and reported in [`AwardChanges::unresolved_awardees`].
/// The award list must have been fetched.
pub fn reconcile_awards(
    ceremony_award: &mut CeremonyAward,
    entries: &[AwardEntry],
    people: &HashMap<PersonId, Person>,
) -> Result<AwardChanges> {
    validate_awards(entries)?;
    let awards = ceremony_award.awards.require_mut("awards")?;

    let diff = diff::reconcile(awards, entries);
    let mut updated = diff.updated;
    let mut unresolved = Vec::new();

    for award in awards.iter_mut() {
        let Some(entry) = entries.iter().find(|e| same_identity(e.id, award.id)) else {
            continue;
        };
        if assign_awardees(award, entry, people, &mut unresolved) {
            if let Some(id) = award.id {
                if !updated.contains(&id) {
                    updated.push(id);
                }
            }
        }
    }

    let created = diff.pending.len();
    for (_, entry) in diff.pending {
        let mut award = Award::new(entry.name.clone(), entry.year);
        assign_awardees(&mut award, entry, people, &mut unresolved);
        awards.push(award);
    }

    for person_id in &unresolved {
        debug!(
            "Dropping awardee {} on movie {}: not in the person map",
            person_id, ceremony_award.movie_id
        );
    }

    Ok(AwardChanges {
        removed: diff.removed.iter().filter_map(|award| award.key()).collect(),
        updated,
        created,
        ignored: diff.ignored,
        unresolved_awardees: unresolved,
    })
}

fn validate_awards(entries: &[AwardEntry]) -> Result<()> {
    let failures: Vec<EntryFailure> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.name.trim().is_empty())
        .map(|(position, _)| EntryFailure {
            position,
            error: CatalogError::validation("award.name", "must not be blank"),
        })
        .collect();

    match CatalogError::aggregate(failures) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Replace the awardees of `award` with the resolvable ids of `entry`.
/// Returns whether the set changed.
fn assign_awardees(
    award: &mut Award,
    entry: &AwardEntry,
    people: &HashMap<PersonId, Person>,
    unresolved: &mut Vec<PersonId>,
) -> bool {
    let mut resolved = BTreeSet::new();
    for person_id in &entry.awardees {
        if people.contains_key(person_id) {
            resolved.insert(*person_id);
        } else if !unresolved.contains(person_id) {
            unresolved.push(*person_id);
        }
    }

    if award.awardees == resolved {
        return false;
    }
    award.awardees = resolved;
    true
}

impl Absorb<AwardEntry> for Award {
    fn absorb(&mut self, desired: &AwardEntry) -> bool {
        let mut changed = false;
        if self.name != desired.name {
            self.name = desired.name.clone();
            changed = true;
        }
        if self.year != desired.year {
            self.year = desired.year;
            changed = true;
        }
        changed
    }
}
