//! CatalogIndex: the in-memory tables behind the reference store.
//!
//! Rows are kept per table in `BTreeMap`s keyed by id, so iteration order is
//! id order and every listing the store hands out is deterministic.
//!
//! Associations are stored once. There is no person → movie collection; the
//! inverse view is answered by scanning the association tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CatalogError, Result};
use crate::types::*;

// =============================================================================
// Table rows
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRow {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub year: Option<u16>,
}

/// One row of the generic crew table; `category` is the discriminator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewRow {
    pub id: AssignmentId,
    pub movie_id: MovieId,
    pub person_id: PersonId,
    pub role: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastRow {
    pub id: AssignmentId,
    pub movie_id: MovieId,
    pub person_id: PersonId,
    pub role: String,
    pub rank: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeremonyAwardRow {
    pub id: CeremonyAwardId,
    pub ceremony_id: CeremonyId,
    pub movie_id: MovieId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardRow {
    pub id: AwardId,
    pub ceremony_award_id: CeremonyAwardId,
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub awardees: Vec<PersonId>,
}

// =============================================================================
// CatalogIndex
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    pub(crate) movies: BTreeMap<MovieId, MovieRow>,
    pub(crate) people: BTreeMap<PersonId, Person>,
    pub(crate) ceremonies: BTreeMap<CeremonyId, Ceremony>,
    pub(crate) crew: BTreeMap<AssignmentId, CrewRow>,
    pub(crate) cast: BTreeMap<AssignmentId, CastRow>,
    pub(crate) ceremony_awards: BTreeMap<CeremonyAwardId, CeremonyAwardRow>,
    pub(crate) awards: BTreeMap<AwardId, AwardRow>,
    /// Shared id sequence for every table
    pub(crate) next_id: i64,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn get_movie(&self, id: MovieId) -> Option<&MovieRow> {
        self.movies.get(&id)
    }

    pub fn get_person(&self, id: PersonId) -> Option<&Person> {
        self.people.get(&id)
    }

    pub fn get_ceremony(&self, id: CeremonyId) -> Option<&Ceremony> {
        self.ceremonies.get(&id)
    }

    pub fn get_crew(&self, id: AssignmentId) -> Option<&CrewRow> {
        self.crew.get(&id)
    }

    pub fn movies(&self) -> impl Iterator<Item = &MovieRow> {
        self.movies.values()
    }

    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    // Mutators used when seeding the index. Each keeps the id sequence ahead
    // of every id it has seen.

    pub fn insert_movie(&mut self, movie: MovieRow) {
        self.bump(movie.id);
        self.movies.insert(movie.id, movie);
    }

    pub fn insert_person(&mut self, person: Person) {
        self.bump(person.id);
        self.people.insert(person.id, person);
    }

    pub fn insert_ceremony(&mut self, ceremony: Ceremony) {
        self.bump(ceremony.id);
        self.ceremonies.insert(ceremony.id, ceremony);
    }

    pub fn insert_crew(&mut self, row: CrewRow) {
        self.bump(row.id);
        self.crew.insert(row.id, row);
    }

    pub fn insert_cast(&mut self, row: CastRow) {
        self.bump(row.id);
        self.cast.insert(row.id, row);
    }

    pub fn insert_ceremony_award(&mut self, row: CeremonyAwardRow) {
        self.bump(row.id);
        self.ceremony_awards.insert(row.id, row);
    }

    pub fn insert_award(&mut self, row: AwardRow) {
        self.bump(row.id);
        self.awards.insert(row.id, row);
    }

    /// First identifier not used by any seeded row
    pub(crate) fn next_id(&self) -> i64 {
        self.next_id.max(1)
    }

    fn bump(&mut self, seen: i64) {
        if seen >= self.next_id {
            self.next_id = seen + 1;
        }
    }

    /// Get counts for debugging/validation: (movies, people, associations)
    pub fn counts(&self) -> (usize, usize, usize) {
        let associations = self.crew.len() + self.cast.len() + self.awards.len();
        (self.movies.len(), self.people.len(), associations)
    }

    /// Removes a movie and every row that belongs to it
    pub(crate) fn remove_movie(&mut self, id: MovieId) -> bool {
        if self.movies.remove(&id).is_none() {
            return false;
        }
        self.crew.retain(|_, row| row.movie_id != id);
        self.cast.retain(|_, row| row.movie_id != id);

        let owned: Vec<CeremonyAwardId> = self
            .ceremony_awards
            .values()
            .filter(|row| row.movie_id == id)
            .map(|row| row.id)
            .collect();
        for ceremony_award_id in owned {
            self.remove_ceremony_award(ceremony_award_id);
        }
        true
    }

    /// Removes a ceremony award together with its awards
    pub(crate) fn remove_ceremony_award(&mut self, id: CeremonyAwardId) {
        self.ceremony_awards.remove(&id);
        self.awards.retain(|_, row| row.ceremony_award_id != id);
    }

    /// Validate referential integrity
    ///
    /// Check that:
    /// - every association points at an existing movie and person
    /// - every ceremony award points at an existing movie and ceremony
    /// - every award belongs to an existing ceremony award
    /// - at most one ceremony award exists per (movie, ceremony)
    pub fn validate(&self) -> Result<()> {
        for row in self.crew.values() {
            self.require_movie(row.movie_id)?;
            self.require_person(row.person_id)?;
        }
        for row in self.cast.values() {
            self.require_movie(row.movie_id)?;
            self.require_person(row.person_id)?;
        }

        let mut pairs = std::collections::HashSet::new();
        for row in self.ceremony_awards.values() {
            self.require_movie(row.movie_id)?;
            if !self.ceremonies.contains_key(&row.ceremony_id) {
                return Err(CatalogError::MissingReference {
                    entity: "ceremony",
                    id: row.ceremony_id,
                });
            }
            if !pairs.insert((row.movie_id, row.ceremony_id)) {
                return Err(CatalogError::validation(
                    "ceremony award",
                    format!(
                        "movie {} has more than one entry for ceremony {}",
                        row.movie_id, row.ceremony_id
                    ),
                ));
            }
        }

        for row in self.awards.values() {
            if !self.ceremony_awards.contains_key(&row.ceremony_award_id) {
                return Err(CatalogError::MissingReference {
                    entity: "ceremony award",
                    id: row.ceremony_award_id,
                });
            }
            for person_id in &row.awardees {
                self.require_person(*person_id)?;
            }
        }
        Ok(())
    }

    pub(crate) fn require_movie(&self, id: MovieId) -> Result<()> {
        if self.movies.contains_key(&id) {
            Ok(())
        } else {
            Err(CatalogError::MissingReference { entity: "movie", id })
        }
    }

    pub(crate) fn require_person(&self, id: PersonId) -> Result<()> {
        if self.people.contains_key(&id) {
            Ok(())
        } else {
            Err(CatalogError::MissingReference { entity: "person", id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_index() -> CatalogIndex {
        let mut index = CatalogIndex::new();
        index.insert_movie(MovieRow {
            id: 1,
            title: "Heat".to_string(),
            year: Some(1995),
        });
        index.insert_person(Person {
            id: 10,
            name: "Michael Mann".to_string(),
        });
        index.insert_ceremony(Ceremony {
            id: 20,
            name: "BAFTA".to_string(),
        });
        index.insert_crew(CrewRow {
            id: 30,
            movie_id: 1,
            person_id: 10,
            role: "Director".to_string(),
            category: Category::Director,
        });
        index.insert_ceremony_award(CeremonyAwardRow {
            id: 40,
            ceremony_id: 20,
            movie_id: 1,
        });
        index.insert_award(AwardRow {
            id: 41,
            ceremony_award_id: 40,
            name: "Best Direction".to_string(),
            year: Some(1996),
            awardees: vec![10],
        });
        index
    }

    #[test]
    fn test_empty_index() {
        let index = CatalogIndex::new();
        assert_eq!(index.counts(), (0, 0, 0));
        assert!(index.validate().is_ok());
    }

    #[test]
    fn test_sequence_stays_ahead_of_seeded_ids() {
        let index = small_index();
        assert_eq!(index.next_id(), 42);
        assert_eq!(CatalogIndex::new().next_id(), 1);
    }

    #[test]
    fn test_validate_accepts_consistent_index() {
        let index = small_index();
        assert!(index.validate().is_ok());
        assert_eq!(index.counts(), (1, 1, 2));
    }

    #[test]
    fn test_validate_rejects_dangling_person() {
        let mut index = small_index();
        index.insert_cast(CastRow {
            id: 50,
            movie_id: 1,
            person_id: 999,
            role: "Neil".to_string(),
            rank: 1,
        });

        let err = index.validate().unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MissingReference { entity: "person", id: 999 }
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_ceremony_pair() {
        let mut index = small_index();
        index.insert_ceremony_award(CeremonyAwardRow {
            id: 60,
            ceremony_id: 20,
            movie_id: 1,
        });
        assert!(index.validate().is_err());
    }

    #[test]
    fn test_remove_movie_cascades() {
        let mut index = small_index();
        assert!(index.remove_movie(1));
        assert_eq!(index.counts(), (0, 1, 0));
        assert!(index.ceremony_awards.is_empty());
        assert!(!index.remove_movie(1));
    }
}
