//! Roster implementations.
//!
//! Every crew category is served by [`CrewRoster`]; the cast, which carries a
//! billing rank on top of the role, by [`CastRoster`].

pub mod cast;
pub mod crew;

// Re-export for convenience
pub use cast::CastRoster;
pub use crew::CrewRoster;

use catalog::{CatalogError, Person, PersonId, PersonResolver, Result};

/// Looks a person up, failing with `NotFound` when unknown
pub(crate) async fn resolve_person(people: &dyn PersonResolver, id: PersonId) -> Result<Person> {
    people
        .by_id(id)
        .await?
        .ok_or_else(|| CatalogError::not_found("person", id))
}

/// A role is required and can't be blank
pub(crate) fn require_role(role: &str) -> Result<()> {
    if role.trim().is_empty() {
        Err(CatalogError::validation("role", "must not be blank"))
    } else {
        Ok(())
    }
}
