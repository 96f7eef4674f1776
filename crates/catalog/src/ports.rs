//! Collaborators the reconciliation engine consumes.
//!
//! The engine never talks to a database directly. It goes through:
//! - [`MovieStore`] to open a transactional [`MovieSession`]
//! - [`PersonResolver`] to look people up when building new associations
//! - [`NotificationSink`] to announce committed changes

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::types::*;

/// Resolves people referenced by desired entries.
#[async_trait]
pub trait PersonResolver: Send + Sync {
    async fn by_id(&self, id: PersonId) -> Result<Option<Person>>;

    /// Returns the people that exist among `ids`, each at most once.
    /// Unknown ids are skipped.
    async fn by_ids(&self, ids: &[PersonId]) -> Result<Vec<Person>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A human-readable message describing a committed change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, notification: Notification) -> Result<()>;
}

/// Opens transactions against the catalog.
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn MovieSession>>;
}

/// One credit of a person, derived from the association records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub movie_id: MovieId,
    pub movie_title: String,
    pub section: Section,
    /// Role, character or award name depending on the section
    pub label: String,
    pub rank: Option<i32>,
}

/// A single transaction.
///
/// Every change made through a session becomes visible to others only on
/// [`commit`](MovieSession::commit); dropping the session or calling
/// [`rollback`](MovieSession::rollback) discards it.
///
/// Fetch methods populate the lazily loaded collections of an aggregate in place.
#[async_trait]
pub trait MovieSession: Send + Sync {
    /// Loads a movie with every roster unloaded
    async fn find_movie(&self, id: MovieId) -> Result<Option<Movie>>;

    async fn fetch_crew(&self, movie: &mut Movie, category: Category) -> Result<()>;

    async fn fetch_cast(&self, movie: &mut Movie) -> Result<()>;

    /// Loads the movie's ceremony awards; their award lists stay unloaded
    async fn fetch_ceremony_awards(&self, movie: &mut Movie) -> Result<()>;

    async fn fetch_awards(&self, ceremony_award: &mut CeremonyAward) -> Result<()>;

    async fn find_ceremony(&self, id: CeremonyId) -> Result<Option<Ceremony>>;

    async fn create_ceremony(&mut self, name: &str) -> Result<Ceremony>;

    /// Writes every loaded collection of the aggregate back to the store.
    ///
    /// Rows without an id get one, and the id is written into the aggregate.
    /// Unloaded collections are left untouched.
    async fn persist(&mut self, movie: &mut Movie) -> Result<()>;

    /// Deletes the movie and everything it owns. Returns whether it existed.
    async fn delete_movie(&mut self, id: MovieId) -> Result<bool>;

    async fn credits_for_person(&self, person_id: PersonId) -> Result<Vec<Credit>>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>);
}
