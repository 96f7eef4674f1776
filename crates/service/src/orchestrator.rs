//! # Catalog Orchestrator
//!
//! Every mutating operation runs the same sequence for one (movie, section):
//! 1. Begin a transaction and load the movie (`NotFound` if absent)
//! 2. Fetch the collection the section lives in
//! 3. Reconcile: remove, update, then create new entries one at a time
//! 4. Persist the aggregate; the store assigns ids to new rows
//! 5. Commit, or roll back everything on the first failure
//! 6. Publish a notification (a failure here is only logged)
//! 7. Project the movie as this call persisted it to views
//!
//! The views show this call's own result even if another writer commits
//! the same section right after it.
//!
//! Domain errors reach the caller unchanged. Anything else is logged and
//! replaced by `UpdateFailed` for the movie and section.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use catalog::{
    CatalogError, Category, Ceremony, CeremonyAward, CeremonyAwardId, Movie, MovieId, MovieSession, MovieStore,
    Notification, NotificationSink, PersonId, PersonResolver, Result, Section,
};
use reconcile::{
    AwardChanges, CastRoster, CeremonyAwardEntry, CrewRoster, RoleEntry, Roster, RosterChanges,
    clear, locate_ceremony_award, reconcile_awards, reconcile_roster, remove_person,
    resolve_ceremony,
};

use crate::views::{
    AssignmentView, CastAssignmentView, CeremonyAwardView, CreditView, PersonMap, project_cast,
};

/// What to do to a roster inside one transaction
enum RosterEdit<'a, E> {
    Reconcile(&'a [E]),
    RemovePerson(PersonId),
    Clear,
}

/// Entry point for every catalog operation
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn MovieStore>,
    people: Arc<dyn PersonResolver>,
    notifier: Arc<dyn NotificationSink>,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn MovieStore>,
        people: Arc<dyn PersonResolver>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            people,
            notifier,
        }
    }

    // =========================================================================
    // Crew
    // =========================================================================

    /// Make the movie's `category` crew match `desired` and return the result
    pub async fn reconcile_role_assignments(
        &self,
        movie_id: MovieId,
        category: Category,
        desired: &[RoleEntry],
    ) -> Result<Vec<AssignmentView>> {
        let section = Section::Crew(category);
        self.guarded(movie_id, section, async {
            let roster = CrewRoster::new(category, self.people.clone());
            let (movie, _) = self
                .edit_roster(movie_id, section, &roster, RosterEdit::Reconcile(desired))
                .await?;
            self.crew_views(&movie, category).await
        })
        .await
    }

    /// Remove every `category` entry of `person_id` from the movie
    pub async fn remove_assignment(
        &self,
        movie_id: MovieId,
        category: Category,
        person_id: PersonId,
    ) -> Result<Vec<AssignmentView>> {
        let section = Section::Crew(category);
        self.guarded(movie_id, section, async {
            let roster = CrewRoster::new(category, self.people.clone());
            let (movie, _) = self
                .edit_roster(movie_id, section, &roster, RosterEdit::RemovePerson(person_id))
                .await?;
            self.crew_views(&movie, category).await
        })
        .await
    }

    /// Remove the whole `category` crew. Returns whether anything was removed.
    pub async fn clear_assignments(&self, movie_id: MovieId, category: Category) -> Result<bool> {
        let section = Section::Crew(category);
        self.guarded(movie_id, section, async {
            let roster = CrewRoster::new(category, self.people.clone());
            let (_, changes) = self
                .edit_roster(movie_id, section, &roster, RosterEdit::Clear)
                .await?;
            Ok(!changes.removed.is_empty())
        })
        .await
    }

    pub async fn role_assignments(&self, movie_id: MovieId, category: Category) -> Result<Vec<AssignmentView>> {
        let session = self.store.begin().await?;
        let loaded = async {
            let mut movie = load_movie(session.as_ref(), movie_id).await?;
            session.fetch_crew(&mut movie, category).await?;
            Ok::<_, CatalogError>(movie)
        }
        .await;
        session.rollback().await;
        let movie: Movie = loaded?;
        self.crew_views(&movie, category).await
    }

    async fn crew_views(&self, movie: &Movie, category: Category) -> Result<Vec<AssignmentView>> {
        let crew = movie.crew(category).require(category.as_str())?;
        let ids: Vec<PersonId> = crew.iter().map(|a| a.person_id).collect();
        let people = self.resolve_people(&ids).await?;
        Ok(crew
            .iter()
            .map(|assignment| AssignmentView::project(assignment, &people))
            .collect())
    }

    // =========================================================================
    // Cast
    // =========================================================================

    /// Make the movie's cast match `desired`. The result is in billing order.
    pub async fn reconcile_cast_assignments(
        &self,
        movie_id: MovieId,
        desired: &[RoleEntry],
    ) -> Result<Vec<CastAssignmentView>> {
        self.guarded(movie_id, Section::Cast, async {
            let roster = CastRoster::new(self.people.clone());
            let (movie, _) = self
                .edit_roster(movie_id, Section::Cast, &roster, RosterEdit::Reconcile(desired))
                .await?;
            self.cast_views(&movie).await
        })
        .await
    }

    pub async fn remove_cast_member(
        &self,
        movie_id: MovieId,
        person_id: PersonId,
    ) -> Result<Vec<CastAssignmentView>> {
        self.guarded(movie_id, Section::Cast, async {
            let roster = CastRoster::new(self.people.clone());
            let (movie, _) = self
                .edit_roster(movie_id, Section::Cast, &roster, RosterEdit::RemovePerson(person_id))
                .await?;
            self.cast_views(&movie).await
        })
        .await
    }

    pub async fn clear_cast(&self, movie_id: MovieId) -> Result<bool> {
        self.guarded(movie_id, Section::Cast, async {
            let roster = CastRoster::new(self.people.clone());
            let (_, changes) = self
                .edit_roster(movie_id, Section::Cast, &roster, RosterEdit::Clear)
                .await?;
            Ok(!changes.removed.is_empty())
        })
        .await
    }

    pub async fn cast_assignments(&self, movie_id: MovieId) -> Result<Vec<CastAssignmentView>> {
        let session = self.store.begin().await?;
        let loaded = async {
            let mut movie = load_movie(session.as_ref(), movie_id).await?;
            session.fetch_cast(&mut movie).await?;
            Ok::<_, CatalogError>(movie)
        }
        .await;
        session.rollback().await;
        let movie: Movie = loaded?;
        self.cast_views(&movie).await
    }

    async fn cast_views(&self, movie: &Movie) -> Result<Vec<CastAssignmentView>> {
        let cast = movie.cast.require("cast")?;
        let ids: Vec<PersonId> = cast.iter().map(|c| c.person_id).collect();
        let people = self.resolve_people(&ids).await?;
        Ok(project_cast(cast, &people))
    }

    // =========================================================================
    // Awards
    // =========================================================================

    /// Reconcile the movie's awards at one ceremony.
    ///
    /// Awardees are resolved against `people` (see [`resolve_people`](Self::resolve_people));
    /// ids missing from it are dropped.
    pub async fn reconcile_ceremony_awards(
        &self,
        movie_id: MovieId,
        descriptor: &CeremonyAwardEntry,
        people: &PersonMap,
    ) -> Result<CeremonyAwardView> {
        self.guarded(movie_id, Section::Awards, async {
            let start_time = Instant::now();
            let mut session = self.store.begin().await?;
            let outcome = reconcile_awards_in(session.as_mut(), movie_id, descriptor, people).await;
            let (movie, position, ceremony, changes) = settle(session, outcome).await?;

            info!(
                "Reconciled awards of movie {} in {:.2?}: {}",
                movie.id,
                start_time.elapsed(),
                changes.summary()
            );
            if !changes.unresolved_awardees.is_empty() {
                debug!(
                    "Unresolved awardees on movie {}: {:?}",
                    movie_id, changes.unresolved_awardees
                );
            }
            self.notify(format!(
                "Updated awards of \"{}\": {}",
                movie.title,
                changes.summary()
            ))
            .await;

            let ceremony_award = movie
                .ceremony_awards
                .require("ceremony awards")?
                .get(position)
                .ok_or_else(|| CatalogError::Store("ceremony award went missing".to_string()))?;
            let people = self.resolve_people(&awardee_ids(ceremony_award)).await?;
            Ok(CeremonyAwardView::project(ceremony_award, ceremony, &people))
        })
        .await
    }

    /// Remove one ceremony award and its awards. Returns whether it existed.
    pub async fn remove_ceremony_award(
        &self,
        movie_id: MovieId,
        ceremony_award_id: CeremonyAwardId,
    ) -> Result<bool> {
        self.guarded(movie_id, Section::Awards, async {
            let mut session = self.store.begin().await?;
            let outcome = async {
                let mut movie = load_movie(session.as_ref(), movie_id).await?;
                session.fetch_ceremony_awards(&mut movie).await?;
                let list = movie.ceremony_awards.require_mut("ceremony awards")?;
                let before = list.len();
                list.retain(|ca| ca.id != Some(ceremony_award_id));
                let removed = list.len() != before;
                session.persist(&mut movie).await?;
                Ok::<_, CatalogError>((movie.title, removed))
            }
            .await;
            let (title, removed) = settle(session, outcome).await?;

            if removed {
                self.notify(format!(
                    "Removed ceremony award {} from \"{}\"",
                    ceremony_award_id, title
                ))
                .await;
            }
            Ok(removed)
        })
        .await
    }

    /// Every ceremony award of the movie, with its award list
    pub async fn ceremony_awards(&self, movie_id: MovieId) -> Result<Vec<CeremonyAwardView>> {
        let session = self.store.begin().await?;
        let loaded = async {
            let mut movie = load_movie(session.as_ref(), movie_id).await?;
            session.fetch_ceremony_awards(&mut movie).await?;

            let mut ceremonies = HashMap::new();
            for ceremony_award in movie.ceremony_awards.require_mut("ceremony awards")? {
                session.fetch_awards(ceremony_award).await?;
                let ceremony = session
                    .find_ceremony(ceremony_award.ceremony_id)
                    .await?
                    .ok_or_else(|| CatalogError::not_found("ceremony", ceremony_award.ceremony_id))?;
                ceremonies.insert(ceremony.id, ceremony);
            }
            Ok::<_, CatalogError>((movie, ceremonies))
        }
        .await;
        session.rollback().await;
        let (movie, ceremonies): (Movie, HashMap<i64, Ceremony>) = loaded?;

        let list = movie.ceremony_awards.require("ceremony awards")?;
        let ids: Vec<PersonId> = list.iter().flat_map(awardee_ids).collect();
        let people = self.resolve_people(&ids).await?;

        let mut views = Vec::with_capacity(list.len());
        for ceremony_award in list {
            let ceremony = ceremonies
                .get(&ceremony_award.ceremony_id)
                .cloned()
                .ok_or_else(|| CatalogError::not_found("ceremony", ceremony_award.ceremony_id))?;
            views.push(CeremonyAwardView::project(ceremony_award, ceremony, &people));
        }
        Ok(views)
    }

    // =========================================================================
    // Movies and people
    // =========================================================================

    /// Delete the movie with everything it owns. Returns whether it existed.
    pub async fn delete_movie(&self, movie_id: MovieId) -> Result<bool> {
        self.guarded(movie_id, Section::Movie, async {
            let mut session = self.store.begin().await?;
            let outcome = session.delete_movie(movie_id).await;
            let deleted = settle(session, outcome).await?;

            if deleted {
                info!("Deleted movie {}", movie_id);
                self.notify(format!("Deleted movie {}", movie_id)).await;
            }
            Ok(deleted)
        })
        .await
    }

    /// Every credit of a person across the catalog
    pub async fn credits_for_person(&self, person_id: PersonId) -> Result<Vec<CreditView>> {
        if self.people.by_id(person_id).await?.is_none() {
            return Err(CatalogError::not_found("person", person_id));
        }

        let session = self.store.begin().await?;
        let credits = session.credits_for_person(person_id).await;
        session.rollback().await;
        Ok(credits?.into_iter().map(CreditView::from).collect())
    }

    /// Build the person map award reconciliation resolves awardees against
    pub async fn resolve_people(&self, ids: &[PersonId]) -> Result<PersonMap> {
        let people = self.people.by_ids(ids).await?;
        Ok(people.into_iter().map(|person| (person.id, person)).collect())
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Run one roster edit in its own transaction and announce it
    async fn edit_roster<R: Roster>(
        &self,
        movie_id: MovieId,
        section: Section,
        roster: &R,
        edit: RosterEdit<'_, R::Entry>,
    ) -> Result<(Movie, RosterChanges)> {
        let start_time = Instant::now();
        let mut session = self.store.begin().await?;
        let outcome = edit_in_session(session.as_mut(), movie_id, section, roster, edit).await;
        let (movie, changes) = settle(session, outcome).await?;

        info!(
            "Updated {} of movie {} in {:.2?}: {}",
            section,
            movie_id,
            start_time.elapsed(),
            changes.summary()
        );
        self.notify(format!(
            "Updated {} of \"{}\": {}",
            section,
            movie.title,
            changes.summary()
        ))
        .await;
        Ok((movie, changes))
    }

    /// Publish after commit. The change is already durable, so a failure is only logged.
    async fn notify(&self, message: String) {
        if let Err(e) = self.notifier.publish(Notification::info(message)).await {
            warn!("Failed to publish notification: {}", e);
        }
    }

    /// Pass domain errors through and hide everything else behind `UpdateFailed`
    async fn guarded<T>(
        &self,
        movie_id: MovieId,
        section: Section,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        work.await.map_err(|err| {
            if err.is_domain() {
                return err;
            }
            error!(
                movie_id,
                section = %section,
                error = %err,
                "Update failed"
            );
            CatalogError::UpdateFailed {
                movie_id,
                section: section.to_string(),
            }
        })
    }
}

async fn load_movie(session: &dyn MovieSession, movie_id: MovieId) -> Result<Movie> {
    session
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| CatalogError::not_found("movie", movie_id))
}

/// Commit on success, roll back on failure
async fn settle<T>(session: Box<dyn MovieSession>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(e) => {
            session.rollback().await;
            Err(e)
        }
    }
}

async fn fetch_section(session: &dyn MovieSession, movie: &mut Movie, section: Section) -> Result<()> {
    match section {
        Section::Crew(category) => session.fetch_crew(movie, category).await,
        Section::Cast => session.fetch_cast(movie).await,
        Section::Awards => session.fetch_ceremony_awards(movie).await,
        Section::Movie => Ok(()),
    }
}

async fn edit_in_session<R: Roster>(
    session: &mut dyn MovieSession,
    movie_id: MovieId,
    section: Section,
    roster: &R,
    edit: RosterEdit<'_, R::Entry>,
) -> Result<(Movie, RosterChanges)> {
    let mut movie = load_movie(&*session, movie_id).await?;
    fetch_section(&*session, &mut movie, section).await?;

    let changes = match edit {
        RosterEdit::Reconcile(desired) => reconcile_roster(roster, &mut movie, desired).await?,
        RosterEdit::RemovePerson(person_id) => RosterChanges {
            removed: remove_person(roster, &mut movie, person_id)?,
            ..Default::default()
        },
        RosterEdit::Clear => RosterChanges {
            removed: clear(roster, &mut movie)?,
            ..Default::default()
        },
    };

    session.persist(&mut movie).await?;
    Ok((movie, changes))
}

async fn reconcile_awards_in(
    session: &mut dyn MovieSession,
    movie_id: MovieId,
    descriptor: &CeremonyAwardEntry,
    people: &PersonMap,
) -> Result<(Movie, usize, Ceremony, AwardChanges)> {
    let mut movie = load_movie(&*session, movie_id).await?;
    let ceremony = resolve_ceremony(&mut *session, &descriptor.ceremony).await?;
    session.fetch_ceremony_awards(&mut movie).await?;

    let list = movie.ceremony_awards.require_mut("ceremony awards")?;
    let position = locate_ceremony_award(list, movie_id, descriptor.id, ceremony.id)?;
    session.fetch_awards(&mut list[position]).await?;
    let changes = reconcile_awards(&mut list[position], &descriptor.awards, people)?;

    session.persist(&mut movie).await?;
    Ok((movie, position, ceremony, changes))
}

fn awardee_ids(ceremony_award: &CeremonyAward) -> Vec<PersonId> {
    ceremony_award
        .awards
        .items()
        .unwrap_or_default()
        .iter()
        .flat_map(|award| award.awardees.iter().copied())
        .collect()
}
