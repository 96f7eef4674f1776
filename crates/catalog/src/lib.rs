//! # Catalog Crate
//!
//! Domain model and storage seams for the movie catalog.
//!
//! ## Main Components
//!
//! - **types**: Movie aggregate, people, ceremonies, crew/cast assignments, awards
//! - **collection**: lazily fetched collections on the aggregate
//! - **error**: the error taxonomy shared by every crate in the workspace
//! - **ports**: `MovieStore`/`MovieSession`, `PersonResolver`, `NotificationSink`
//! - **index**: the in-memory tables behind the reference store
//! - **memory**: transactional in-memory store built on `CatalogIndex`
//! - **snapshot**: JSON snapshot loading and saving
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{CatalogIndex, InMemoryMovieStore, MovieStore};
//! use std::path::Path;
//!
//! let index = CatalogIndex::load_from_file(Path::new("data/catalog.json"))?;
//! let store = InMemoryMovieStore::new(index);
//!
//! let session = store.begin().await?;
//! let mut movie = session.find_movie(1).await?.expect("movie 1");
//! session.fetch_crew(&mut movie, Category::Director).await?;
//! ```

pub mod collection;
pub mod error;
pub mod index;
pub mod memory;
pub mod ports;
pub mod snapshot;
pub mod types;

pub use collection::Collection;
pub use error::{CatalogError, EntryFailure, Result};
pub use index::{AwardRow, CastRow, CatalogIndex, CeremonyAwardRow, CrewRow, MovieRow};
pub use memory::InMemoryMovieStore;
pub use ports::{
    Credit, MovieSession, MovieStore, Notification, NotificationSink, PersonResolver, Severity,
};
pub use snapshot::CatalogSnapshot;
pub use types::{
    // Identifiers
    AssignmentId,
    AwardId,
    CeremonyAwardId,
    CeremonyId,
    MovieId,
    PersonId,
    // Aggregate and entities
    Assignment,
    Award,
    CastAssignment,
    Ceremony,
    CeremonyAward,
    Movie,
    Person,
    // Enums
    Category,
    Section,
};
