//! Core traits for reconciliation.
//!
//! The diff algorithm only needs to know how to read an identity ([`Keyed`])
//! and how to copy changed fields onto a persisted entity ([`Absorb`]).
//! Rosters add the per-category capabilities on top ([`Roster`]).

use async_trait::async_trait;

use catalog::{
    Assignment, Award, CastAssignment, Movie, PersonId, Result,
};

use crate::entries::{AwardEntry, RoleEntry};

/// Anything that may carry a persisted identity.
///
/// `None` means "not persisted yet".
pub trait Keyed {
    fn key(&self) -> Option<i64>;
}

/// A persisted entity that can take over the mutable fields of a desired entry.
pub trait Absorb<D>: Keyed {
    /// Copies the fields of `desired` that differ from `self`.
    ///
    /// Returns whether anything was written. Identity is never touched.
    fn absorb(&mut self, desired: &D) -> bool;
}

/// Capabilities a roster category hands to the shared reconciliation algorithm.
///
/// ## Design Note
/// - `collection` is the accessor from the Movie aggregate to the live list
/// - `create` is the async factory for entries without an id
/// - `Send + Sync` lets one roster value be shared by every creation of a batch
#[async_trait]
pub trait Roster: Send + Sync {
    type Entity: Absorb<Self::Entry> + Send + Sync;
    type Entry: Keyed + Send + Sync;

    /// Returns the name of this roster (for logging and errors)
    fn name(&self) -> String;

    /// Structural checks on one desired entry
    fn validate(&self, entry: &Self::Entry) -> Result<()>;

    /// The roster's collection on `movie`; fails when it was never fetched
    fn collection<'m>(&self, movie: &'m mut Movie) -> Result<&'m mut Vec<Self::Entity>>;

    /// Builds a new, unpersisted entity for `entry`
    async fn create(&self, movie: &Movie, entry: &Self::Entry) -> Result<Self::Entity>;

    fn person_of(&self, entity: &Self::Entity) -> PersonId;
}

impl Keyed for Assignment {
    fn key(&self) -> Option<i64> {
        self.id
    }
}

impl Keyed for CastAssignment {
    fn key(&self) -> Option<i64> {
        self.id
    }
}

impl Keyed for Award {
    fn key(&self) -> Option<i64> {
        self.id
    }
}

impl Keyed for RoleEntry {
    fn key(&self) -> Option<i64> {
        self.id
    }
}

impl Keyed for AwardEntry {
    fn key(&self) -> Option<i64> {
        self.id
    }
}
