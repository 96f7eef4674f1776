//! Cast roster: like a crew category, plus a billing rank.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use catalog::{CastAssignment, CatalogError, Movie, PersonId, PersonResolver, Result};

use super::{require_role, resolve_person};
use crate::entries::RoleEntry;
use crate::traits::{Absorb, Roster};

pub struct CastRoster {
    people: Arc<dyn PersonResolver>,
}

impl CastRoster {
    pub fn new(people: Arc<dyn PersonResolver>) -> Self {
        Self { people }
    }
}

#[async_trait]
impl Roster for CastRoster {
    type Entity = CastAssignment;
    type Entry = RoleEntry;

    fn name(&self) -> String {
        "cast".to_string()
    }

    /// Role (the character) must be set, and every cast entry needs a
    /// non-negative rank.
    fn validate(&self, entry: &RoleEntry) -> Result<()> {
        require_role(&entry.role)?;
        match entry.rank {
            None => Err(CatalogError::validation("rank", "is required for cast entries")),
            Some(rank) if rank < 0 => Err(CatalogError::validation(
                "rank",
                format!("must not be negative, got {}", rank),
            )),
            Some(_) => Ok(()),
        }
    }

    fn collection<'m>(&self, movie: &'m mut Movie) -> Result<&'m mut Vec<CastAssignment>> {
        movie.cast.require_mut("cast")
    }

    async fn create(&self, movie: &Movie, entry: &RoleEntry) -> Result<CastAssignment> {
        let person = resolve_person(self.people.as_ref(), entry.person_id).await?;
        let rank = entry
            .rank
            .ok_or_else(|| CatalogError::validation("rank", "is required for cast entries"))?;
        debug!(
            "New cast member on movie {}: {} as {} (#{})",
            movie.id, person.name, entry.role, rank
        );
        Ok(CastAssignment::new(movie.id, person.id, entry.role.clone(), rank))
    }

    fn person_of(&self, entity: &CastAssignment) -> PersonId {
        entity.person_id
    }
}

impl Absorb<RoleEntry> for CastAssignment {
    fn absorb(&mut self, desired: &RoleEntry) -> bool {
        let mut changed = false;
        if self.role != desired.role {
            self.role = desired.role.clone();
            changed = true;
        }
        if let Some(rank) = desired.rank {
            if self.rank != rank {
                self.rank = rank;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::reconcile_roster;
    use catalog::{Collection, Person};

    struct Everyone;

    #[async_trait]
    impl PersonResolver for Everyone {
        async fn by_id(&self, id: PersonId) -> Result<Option<Person>> {
            Ok(Some(Person {
                id,
                name: format!("Person {}", id),
            }))
        }

        async fn by_ids(&self, ids: &[PersonId]) -> Result<Vec<Person>> {
            let mut people = Vec::new();
            for id in ids {
                people.extend(self.by_id(*id).await?);
            }
            Ok(people)
        }
    }

    fn billed(id: i64, person_id: PersonId, role: &str, rank: i32) -> CastAssignment {
        CastAssignment {
            id: Some(id),
            ..CastAssignment::new(1, person_id, role, rank)
        }
    }

    fn movie_with_cast(cast: Vec<CastAssignment>) -> Movie {
        let mut movie = Movie::new(1, "Heat", Some(1995));
        movie.cast = Collection::loaded(cast);
        movie
    }

    #[tokio::test]
    async fn test_rank_and_role_are_updated() {
        let roster = CastRoster::new(Arc::new(Everyone));
        let mut movie = movie_with_cast(vec![
            billed(1, 11, "Vincent Hanna", 1),
            billed(2, 12, "Neil McCauley", 2),
        ]);
        let desired = vec![
            RoleEntry::existing(1, 11, "Vincent Hanna").with_rank(2),
            RoleEntry::existing(2, 12, "Neil McCauley").with_rank(1),
        ];

        let changes = reconcile_roster(&roster, &mut movie, &desired).await.unwrap();

        let cast = movie.cast.items().unwrap();
        assert_eq!(cast[0].rank, 2);
        assert_eq!(cast[1].rank, 1);
        assert_eq!(changes.updated, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unchanged_entries_are_not_rewritten() {
        let roster = CastRoster::new(Arc::new(Everyone));
        let mut movie = movie_with_cast(vec![billed(1, 11, "Vincent Hanna", 1)]);

        let changes = reconcile_roster(
            &roster,
            &mut movie,
            &[RoleEntry::existing(1, 11, "Vincent Hanna").with_rank(1)],
        )
        .await
        .unwrap();

        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn test_new_members_get_their_rank() {
        let roster = CastRoster::new(Arc::new(Everyone));
        let mut movie = movie_with_cast(Vec::new());

        reconcile_roster(&roster, &mut movie, &[RoleEntry::new(13, "Chris Shiherlis").with_rank(3)])
            .await
            .unwrap();

        let cast = movie.cast.items().unwrap();
        assert_eq!(cast.len(), 1);
        assert_eq!(cast[0].rank, 3);
        assert_eq!(cast[0].role, "Chris Shiherlis");
    }

    #[tokio::test]
    async fn test_rank_is_required_and_non_negative() {
        let roster = CastRoster::new(Arc::new(Everyone));
        let mut movie = movie_with_cast(Vec::new());
        let desired = vec![
            RoleEntry::new(11, "Vincent Hanna"),
            RoleEntry::new(12, "Neil McCauley").with_rank(-1),
            RoleEntry::new(13, "Chris Shiherlis").with_rank(3),
        ];

        let err = reconcile_roster(&roster, &mut movie, &desired).await.unwrap_err();

        match err {
            CatalogError::Aggregate { failures } => {
                let positions: Vec<usize> = failures.iter().map(|f| f.position).collect();
                assert_eq!(positions, vec![0, 1]);
            }
            other => panic!("expected aggregate, got {:?}", other),
        }
        assert!(movie.cast.items().unwrap().is_empty());
    }
}
