//! In-memory reference implementation of the store ports.
//!
//! `begin()` clones the committed [`CatalogIndex`] into a private working copy.
//! All reads and writes of the session go to that copy. The session records
//! every section it writes (one crew category, the cast, one ceremony of a
//! movie, a deletion), and `commit()` replays only those sections into the
//! committed index. Sessions touching different sections never undo each
//! other; two sessions writing the same section race and the last commit wins.
//! Rollback just drops the working copy.
//!
//! Ids come from one sequence shared by every session of the store, so rows
//! created by concurrent sessions never collide once merged.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::collection::Collection;
use crate::error::{CatalogError, Result};
use crate::index::*;
use crate::ports::*;
use crate::types::*;

/// Shared in-memory catalog
#[derive(Clone)]
pub struct InMemoryMovieStore {
    state: Arc<RwLock<CatalogIndex>>,
    sequence: Arc<AtomicI64>,
}

impl Default for InMemoryMovieStore {
    fn default() -> Self {
        Self::new(CatalogIndex::new())
    }
}

impl InMemoryMovieStore {
    pub fn new(index: CatalogIndex) -> Self {
        Self {
            sequence: Arc::new(AtomicI64::new(index.next_id())),
            state: Arc::new(RwLock::new(index)),
        }
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> CatalogIndex {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl MovieStore for InMemoryMovieStore {
    async fn begin(&self) -> Result<Box<dyn MovieSession>> {
        let working = self.state.read().await.clone();
        Ok(Box::new(InMemorySession {
            working,
            touched: BTreeSet::new(),
            committed: self.state.clone(),
            sequence: self.sequence.clone(),
        }))
    }
}

#[async_trait]
impl PersonResolver for InMemoryMovieStore {
    async fn by_id(&self, id: PersonId) -> Result<Option<Person>> {
        Ok(self.state.read().await.get_person(id).cloned())
    }

    async fn by_ids(&self, ids: &[PersonId]) -> Result<Vec<Person>> {
        let state = self.state.read().await;
        let unique: BTreeSet<PersonId> = ids.iter().copied().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| state.get_person(id).cloned())
            .collect())
    }
}

/// A section of the catalog a session has written.
///
/// Variant order is replay order: ceremonies exist before ceremony awards
/// point at them, and deletions run last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Touched {
    Ceremony(CeremonyId),
    Movie(MovieId),
    Crew(MovieId, Category),
    Cast(MovieId),
    CeremonyAward(MovieId, CeremonyId),
    Deleted(MovieId),
}

impl Touched {
    /// Copy this section from `source` over the same section of `target`.
    ///
    /// Sections of a movie that is gone from `target` are skipped, so a
    /// concurrent delete is never undone.
    fn replay(self, source: &CatalogIndex, target: &mut CatalogIndex) {
        match self {
            Touched::Ceremony(id) => {
                if let Some(ceremony) = source.get_ceremony(id) {
                    target.ceremonies.insert(id, ceremony.clone());
                }
            }
            Touched::Movie(id) => {
                if let (Some(row), Some(current)) = (source.movies.get(&id), target.movies.get_mut(&id)) {
                    current.title = row.title.clone();
                    current.year = row.year;
                }
            }
            Touched::Crew(movie_id, category) => {
                if !target.movies.contains_key(&movie_id) {
                    return;
                }
                let in_section = |row: &CrewRow| row.movie_id == movie_id && row.category == category;
                target.crew.retain(|_, row| !in_section(&*row));
                for row in source.crew.values().filter(|row| in_section(*row)) {
                    target.crew.insert(row.id, row.clone());
                }
            }
            Touched::Cast(movie_id) => {
                if !target.movies.contains_key(&movie_id) {
                    return;
                }
                target.cast.retain(|_, row| row.movie_id != movie_id);
                for row in source.cast.values().filter(|row| row.movie_id == movie_id) {
                    target.cast.insert(row.id, row.clone());
                }
            }
            Touched::CeremonyAward(movie_id, ceremony_id) => {
                if !target.movies.contains_key(&movie_id) {
                    return;
                }
                let in_section =
                    |row: &CeremonyAwardRow| row.movie_id == movie_id && row.ceremony_id == ceremony_id;
                let stale: Vec<CeremonyAwardId> = target
                    .ceremony_awards
                    .values()
                    .filter(|row| in_section(*row))
                    .map(|row| row.id)
                    .collect();
                for id in stale {
                    target.remove_ceremony_award(id);
                }
                for row in source.ceremony_awards.values().filter(|row| in_section(*row)) {
                    target.ceremony_awards.insert(row.id, row.clone());
                    for award in source.awards.values().filter(|a| a.ceremony_award_id == row.id) {
                        target.awards.insert(award.id, award.clone());
                    }
                }
            }
            Touched::Deleted(id) => {
                target.remove_movie(id);
            }
        }
    }
}

fn next_id(sequence: &AtomicI64) -> i64 {
    sequence.fetch_add(1, Ordering::SeqCst)
}

pub struct InMemorySession {
    working: CatalogIndex,
    touched: BTreeSet<Touched>,
    committed: Arc<RwLock<CatalogIndex>>,
    sequence: Arc<AtomicI64>,
}

impl InMemorySession {
    fn ceremony_award_from_row(row: &CeremonyAwardRow) -> CeremonyAward {
        CeremonyAward {
            id: Some(row.id),
            ceremony_id: row.ceremony_id,
            movie_id: row.movie_id,
            awards: Collection::Unloaded,
        }
    }

    fn write_crew(&mut self, movie_id: MovieId, category: Category, items: &mut [Assignment]) -> Result<()> {
        self.touched.insert(Touched::Crew(movie_id, category));
        let sequence = &self.sequence;
        let index = &mut self.working;
        index
            .crew
            .retain(|_, row| !(row.movie_id == movie_id && row.category == category));

        for assignment in items.iter_mut() {
            index.require_person(assignment.person_id)?;
            let id = match assignment.id {
                Some(id) => id,
                None => next_id(sequence),
            };
            assignment.id = Some(id);
            index.crew.insert(
                id,
                CrewRow {
                    id,
                    movie_id,
                    person_id: assignment.person_id,
                    role: assignment.role.clone(),
                    category,
                },
            );
        }
        Ok(())
    }

    fn write_cast(&mut self, movie_id: MovieId, items: &mut [CastAssignment]) -> Result<()> {
        self.touched.insert(Touched::Cast(movie_id));
        let sequence = &self.sequence;
        let index = &mut self.working;
        index.cast.retain(|_, row| row.movie_id != movie_id);

        for member in items.iter_mut() {
            index.require_person(member.person_id)?;
            let id = match member.id {
                Some(id) => id,
                None => next_id(sequence),
            };
            member.id = Some(id);
            index.cast.insert(
                id,
                CastRow {
                    id,
                    movie_id,
                    person_id: member.person_id,
                    role: member.role.clone(),
                    rank: member.rank,
                },
            );
        }
        Ok(())
    }

    fn write_ceremony_awards(&mut self, movie_id: MovieId, items: &mut [CeremonyAward]) -> Result<()> {
        let sequence = &self.sequence;
        let touched = &mut self.touched;
        let index = &mut self.working;

        let kept: BTreeSet<CeremonyAwardId> = items.iter().filter_map(|ca| ca.id).collect();
        let dropped: Vec<(CeremonyAwardId, CeremonyId)> = index
            .ceremony_awards
            .values()
            .filter(|row| row.movie_id == movie_id && !kept.contains(&row.id))
            .map(|row| (row.id, row.ceremony_id))
            .collect();
        for (id, ceremony_id) in dropped {
            touched.insert(Touched::CeremonyAward(movie_id, ceremony_id));
            index.remove_ceremony_award(id);
        }

        for ceremony_award in items.iter_mut() {
            if index.get_ceremony(ceremony_award.ceremony_id).is_none() {
                return Err(CatalogError::MissingReference {
                    entity: "ceremony",
                    id: ceremony_award.ceremony_id,
                });
            }
            // Rows that already exist and whose awards were never loaded are unchanged.
            if ceremony_award.id.is_some() && !ceremony_award.awards.is_loaded() {
                continue;
            }
            touched.insert(Touched::CeremonyAward(movie_id, ceremony_award.ceremony_id));
            if let Some(previous) = ceremony_award.id.and_then(|id| index.ceremony_awards.get(&id)) {
                touched.insert(Touched::CeremonyAward(movie_id, previous.ceremony_id));
            }

            let ceremony_award_id = match ceremony_award.id {
                Some(id) => id,
                None => next_id(sequence),
            };
            ceremony_award.id = Some(ceremony_award_id);
            index.ceremony_awards.insert(
                ceremony_award_id,
                CeremonyAwardRow {
                    id: ceremony_award_id,
                    ceremony_id: ceremony_award.ceremony_id,
                    movie_id,
                },
            );

            let Some(awards) = ceremony_award.awards.items_mut() else {
                continue;
            };
            index
                .awards
                .retain(|_, row| row.ceremony_award_id != ceremony_award_id);
            for award in awards.iter_mut() {
                for person_id in &award.awardees {
                    index.require_person(*person_id)?;
                }
                let id = match award.id {
                    Some(id) => id,
                    None => next_id(sequence),
                };
                award.id = Some(id);
                index.awards.insert(
                    id,
                    AwardRow {
                        id,
                        ceremony_award_id,
                        name: award.name.clone(),
                        year: award.year,
                        awardees: award.awardees.iter().copied().collect(),
                    },
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MovieSession for InMemorySession {
    async fn find_movie(&self, id: MovieId) -> Result<Option<Movie>> {
        Ok(self
            .working
            .get_movie(id)
            .map(|row| Movie::new(row.id, row.title.clone(), row.year)))
    }

    async fn fetch_crew(&self, movie: &mut Movie, category: Category) -> Result<()> {
        let items = self
            .working
            .crew
            .values()
            .filter(|row| row.movie_id == movie.id && row.category == category)
            .map(|row| Assignment {
                id: Some(row.id),
                movie_id: row.movie_id,
                person_id: row.person_id,
                role: row.role.clone(),
                category: row.category,
            })
            .collect();
        *movie.crew_mut(category) = Collection::loaded(items);
        Ok(())
    }

    async fn fetch_cast(&self, movie: &mut Movie) -> Result<()> {
        let items = self
            .working
            .cast
            .values()
            .filter(|row| row.movie_id == movie.id)
            .map(|row| CastAssignment {
                id: Some(row.id),
                movie_id: row.movie_id,
                person_id: row.person_id,
                role: row.role.clone(),
                rank: row.rank,
            })
            .collect();
        movie.cast = Collection::loaded(items);
        Ok(())
    }

    async fn fetch_ceremony_awards(&self, movie: &mut Movie) -> Result<()> {
        let items = self
            .working
            .ceremony_awards
            .values()
            .filter(|row| row.movie_id == movie.id)
            .map(Self::ceremony_award_from_row)
            .collect();
        movie.ceremony_awards = Collection::loaded(items);
        Ok(())
    }

    async fn fetch_awards(&self, ceremony_award: &mut CeremonyAward) -> Result<()> {
        let Some(ceremony_award_id) = ceremony_award.id else {
            // Not persisted yet, so nothing can be stored for it.
            if !ceremony_award.awards.is_loaded() {
                ceremony_award.awards = Collection::loaded(Vec::new());
            }
            return Ok(());
        };
        let items = self
            .working
            .awards
            .values()
            .filter(|row| row.ceremony_award_id == ceremony_award_id)
            .map(|row| Award {
                id: Some(row.id),
                name: row.name.clone(),
                year: row.year,
                awardees: row.awardees.iter().copied().collect(),
            })
            .collect();
        ceremony_award.awards = Collection::loaded(items);
        Ok(())
    }

    async fn find_ceremony(&self, id: CeremonyId) -> Result<Option<Ceremony>> {
        Ok(self.working.get_ceremony(id).cloned())
    }

    async fn create_ceremony(&mut self, name: &str) -> Result<Ceremony> {
        let ceremony = Ceremony {
            id: next_id(&self.sequence),
            name: name.to_string(),
        };
        self.touched.insert(Touched::Ceremony(ceremony.id));
        debug!("Created ceremony {} ({})", ceremony.id, ceremony.name);
        self.working.insert_ceremony(ceremony.clone());
        Ok(ceremony)
    }

    async fn persist(&mut self, movie: &mut Movie) -> Result<()> {
        let movie_id = movie.id;
        self.working.require_movie(movie_id)?;

        for (category, items) in movie.loaded_crew_mut() {
            self.write_crew(movie_id, category, items)?;
        }
        if let Some(items) = movie.cast.items_mut() {
            self.write_cast(movie_id, items)?;
        }
        if let Some(items) = movie.ceremony_awards.items_mut() {
            self.write_ceremony_awards(movie_id, items)?;
        }

        if let Some(row) = self.working.movies.get_mut(&movie_id) {
            row.title = movie.title.clone();
            row.year = movie.year;
        }
        self.touched.insert(Touched::Movie(movie_id));
        Ok(())
    }

    async fn delete_movie(&mut self, id: MovieId) -> Result<bool> {
        let removed = self.working.remove_movie(id);
        if removed {
            self.touched.insert(Touched::Deleted(id));
        }
        Ok(removed)
    }

    async fn credits_for_person(&self, person_id: PersonId) -> Result<Vec<Credit>> {
        let index = &self.working;
        let title = |movie_id: MovieId| {
            index
                .get_movie(movie_id)
                .map(|m| m.title.clone())
                .unwrap_or_default()
        };

        let mut credits: Vec<Credit> = index
            .crew
            .values()
            .filter(|row| row.person_id == person_id)
            .map(|row| Credit {
                movie_id: row.movie_id,
                movie_title: title(row.movie_id),
                section: Section::Crew(row.category),
                label: row.role.clone(),
                rank: None,
            })
            .collect();

        credits.extend(index.cast.values().filter(|row| row.person_id == person_id).map(|row| Credit {
            movie_id: row.movie_id,
            movie_title: title(row.movie_id),
            section: Section::Cast,
            label: row.role.clone(),
            rank: Some(row.rank),
        }));

        for award in index.awards.values().filter(|row| row.awardees.contains(&person_id)) {
            if let Some(owner) = index.ceremony_awards.get(&award.ceremony_award_id) {
                credits.push(Credit {
                    movie_id: owner.movie_id,
                    movie_title: title(owner.movie_id),
                    section: Section::Awards,
                    label: award.name.clone(),
                    rank: None,
                });
            }
        }

        credits.sort_by_key(|c| c.movie_id);
        Ok(credits)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut committed = self.committed.write().await;
        for key in &self.touched {
            key.replay(&self.working, &mut committed);
        }
        committed.next_id = committed.next_id.max(self.sequence.load(Ordering::SeqCst));
        debug!("Committed {} section(s)", self.touched.len());
        Ok(())
    }

    async fn rollback(self: Box<Self>) {
        debug!("Rolling back in-memory session");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryMovieStore {
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
        index.insert_person(Person {
            id: 11,
            name: "Al Pacino".to_string(),
        });
        index.insert_crew(CrewRow {
            id: 20,
            movie_id: 1,
            person_id: 10,
            role: "Director".to_string(),
            category: Category::Director,
        });
        InMemoryMovieStore::new(index)
    }

    #[tokio::test]
    async fn test_find_movie_starts_unloaded() {
        let store = store();
        let session = store.begin().await.unwrap();
        let movie = session.find_movie(1).await.unwrap().unwrap();
        assert!(!movie.crew(Category::Director).is_loaded());
        assert!(session.find_movie(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_assigns_ids_and_commit_publishes() {
        let store = store();
        let mut session = store.begin().await.unwrap();
        let mut movie = session.find_movie(1).await.unwrap().unwrap();
        session.fetch_crew(&mut movie, Category::Producer).await.unwrap();

        movie
            .crew_mut(Category::Producer)
            .require_mut("producer")
            .unwrap()
            .push(Assignment::new(1, 11, "Producer", Category::Producer));
        session.persist(&mut movie).await.unwrap();

        let producers = movie.crew(Category::Producer).items().unwrap();
        assert_eq!(producers[0].id, Some(21));

        // Not visible before commit
        assert_eq!(store.snapshot().await.crew.len(), 1);
        session.commit().await.unwrap();
        assert_eq!(store.snapshot().await.crew.len(), 2);
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let store = store();
        let mut session = store.begin().await.unwrap();
        assert!(session.delete_movie(1).await.unwrap());
        session.rollback().await;

        assert!(store.snapshot().await.get_movie(1).is_some());
    }

    #[tokio::test]
    async fn test_persist_leaves_unloaded_collections_alone() {
        let store = store();
        let mut session = store.begin().await.unwrap();
        let mut movie = session.find_movie(1).await.unwrap().unwrap();
        session.persist(&mut movie).await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(store.snapshot().await.crew.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_rejects_unknown_person() {
        let store = store();
        let mut session = store.begin().await.unwrap();
        let mut movie = session.find_movie(1).await.unwrap().unwrap();
        session.fetch_cast(&mut movie).await.unwrap();
        movie
            .cast
            .require_mut("cast")
            .unwrap()
            .push(CastAssignment::new(1, 404, "Ghost", 1));

        let err = session.persist(&mut movie).await.unwrap_err();
        assert!(matches!(err, CatalogError::MissingReference { entity: "person", id: 404 }));
    }

    #[tokio::test]
    async fn test_credits_are_derived_from_associations() {
        let store = store();
        let session = store.begin().await.unwrap();
        let credits = session.credits_for_person(10).await.unwrap();

        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].movie_title, "Heat");
        assert_eq!(credits[0].section, Section::Crew(Category::Director));
    }

    async fn add_crew(session: &mut Box<dyn MovieSession>, category: Category, person_id: PersonId) -> AssignmentId {
        let mut movie = session.find_movie(1).await.unwrap().unwrap();
        session.fetch_crew(&mut movie, category).await.unwrap();
        movie
            .crew_mut(category)
            .require_mut("crew")
            .unwrap()
            .push(Assignment::new(1, person_id, "Crew", category));
        session.persist(&mut movie).await.unwrap();
        movie.crew(category).items().unwrap().last().unwrap().id.unwrap()
    }

    #[tokio::test]
    async fn test_sessions_on_different_sections_both_survive() {
        let store = store();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        let producer = add_crew(&mut first, Category::Producer, 11).await;
        let editor = add_crew(&mut second, Category::Editor, 11).await;
        assert_ne!(producer, editor, "Concurrent sessions must not share ids");

        first.commit().await.unwrap();
        second.commit().await.unwrap();

        let committed = store.snapshot().await;
        assert_eq!(committed.crew.len(), 3);
        assert_eq!(committed.get_crew(producer).unwrap().category, Category::Producer);
        assert_eq!(committed.get_crew(editor).unwrap().category, Category::Editor);
    }

    #[tokio::test]
    async fn test_same_section_last_commit_wins() {
        let store = store();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        add_crew(&mut first, Category::Producer, 10).await;
        let kept = add_crew(&mut second, Category::Producer, 11).await;

        first.commit().await.unwrap();
        second.commit().await.unwrap();

        let committed = store.snapshot().await;
        let producers: Vec<&CrewRow> = committed
            .crew
            .values()
            .filter(|row| row.category == Category::Producer)
            .collect();
        assert_eq!(producers.len(), 1);
        assert_eq!(producers[0].id, kept);
    }

    #[tokio::test]
    async fn test_commit_does_not_resurrect_a_deleted_movie() {
        let store = store();
        let mut editing = store.begin().await.unwrap();
        let mut deleting = store.begin().await.unwrap();

        add_crew(&mut editing, Category::Producer, 11).await;
        assert!(deleting.delete_movie(1).await.unwrap());
        deleting.commit().await.unwrap();
        editing.commit().await.unwrap();

        let committed = store.snapshot().await;
        assert!(committed.get_movie(1).is_none());
        assert!(committed.crew.is_empty());
    }

    #[tokio::test]
    async fn test_by_ids_skips_unknown_and_duplicates() {
        let store = store();
        let people = store.by_ids(&[11, 10, 11, 99]).await.unwrap();
        let ids: Vec<_> = people.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![10, 11]);
    }
}
