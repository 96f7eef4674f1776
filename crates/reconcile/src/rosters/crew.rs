//! Crew roster: directors, producers, editors and the rest.
//!
//! One value of [`CrewRoster`] per category. The category selects the live
//! collection on the Movie and stamps the assignments it creates.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use catalog::{Assignment, Category, Movie, PersonId, PersonResolver, Result};

use super::{require_role, resolve_person};
use crate::entries::RoleEntry;
use crate::traits::{Absorb, Roster};

pub struct CrewRoster {
    category: Category,
    people: Arc<dyn PersonResolver>,
}

impl CrewRoster {
    pub fn new(category: Category, people: Arc<dyn PersonResolver>) -> Self {
        Self { category, people }
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

#[async_trait]
impl Roster for CrewRoster {
    type Entity = Assignment;
    type Entry = RoleEntry;

    fn name(&self) -> String {
        self.category.to_string()
    }

    fn validate(&self, entry: &RoleEntry) -> Result<()> {
        require_role(&entry.role)
    }

    fn collection<'m>(&self, movie: &'m mut Movie) -> Result<&'m mut Vec<Assignment>> {
        movie.crew_mut(self.category).require_mut(self.category.as_str())
    }

    async fn create(&self, movie: &Movie, entry: &RoleEntry) -> Result<Assignment> {
        let person = resolve_person(self.people.as_ref(), entry.person_id).await?;
        debug!(
            "New {} on movie {}: {} as {}",
            self.category, movie.id, person.name, entry.role
        );
        Ok(Assignment::new(movie.id, person.id, entry.role.clone(), self.category))
    }

    fn person_of(&self, entity: &Assignment) -> PersonId {
        entity.person_id
    }
}

impl Absorb<RoleEntry> for Assignment {
    fn absorb(&mut self, desired: &RoleEntry) -> bool {
        if self.role == desired.role {
            return false;
        }
        self.role = desired.role.clone();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{clear, reconcile_roster, remove_person};
    use catalog::{CatalogError, Collection, Person};
    use std::collections::HashMap;

    /// Person lookups served from a fixed map
    struct Directory(HashMap<PersonId, Person>);

    #[async_trait]
    impl PersonResolver for Directory {
        async fn by_id(&self, id: PersonId) -> Result<Option<Person>> {
            Ok(self.0.get(&id).cloned())
        }

        async fn by_ids(&self, ids: &[PersonId]) -> Result<Vec<Person>> {
            Ok(ids.iter().filter_map(|id| self.0.get(id).cloned()).collect())
        }
    }

    fn directory() -> Arc<dyn PersonResolver> {
        let people = [(10, "Michael Mann"), (11, "Art Linson"), (12, "Dov Hoenig")]
            .into_iter()
            .map(|(id, name)| {
                (
                    id,
                    Person {
                        id,
                        name: name.to_string(),
                    },
                )
            })
            .collect();
        Arc::new(Directory(people))
    }

    fn persisted(id: i64, person_id: PersonId, role: &str, category: Category) -> Assignment {
        Assignment {
            id: Some(id),
            ..Assignment::new(1, person_id, role, category)
        }
    }

    fn movie_with_directors(directors: Vec<Assignment>) -> Movie {
        let mut movie = Movie::new(1, "Heat", Some(1995));
        *movie.crew_mut(Category::Director) = Collection::loaded(directors);
        movie
    }

    #[tokio::test]
    async fn test_add_alongside_unchanged_entry() {
        let roster = CrewRoster::new(Category::Director, directory());
        let mut movie = movie_with_directors(vec![persisted(1, 10, "Director", Category::Director)]);
        let desired = vec![
            RoleEntry::existing(1, 10, "Director"),
            RoleEntry::new(11, "Co-Director"),
        ];

        let changes = reconcile_roster(&roster, &mut movie, &desired).await.unwrap();

        let directors = movie.crew(Category::Director).items().unwrap();
        assert_eq!(directors.len(), 2);
        assert_eq!(directors[0], persisted(1, 10, "Director", Category::Director));
        assert_eq!(directors[1].id, None, "ids are assigned on persist");
        assert_eq!(directors[1].person_id, 11);
        assert_eq!(directors[1].category, Category::Director);
        assert_eq!(changes.created, 1);
        assert!(changes.updated.is_empty());
    }

    #[tokio::test]
    async fn test_role_update_keeps_identity() {
        let roster = CrewRoster::new(Category::Director, directory());
        let mut movie = movie_with_directors(vec![persisted(1, 10, "Director", Category::Director)]);

        let changes = reconcile_roster(&roster, &mut movie, &[RoleEntry::existing(1, 10, "Second Unit")])
            .await
            .unwrap();

        let directors = movie.crew(Category::Director).items().unwrap();
        assert_eq!(directors[0].id, Some(1));
        assert_eq!(directors[0].role, "Second Unit");
        assert_eq!(changes.updated, vec![1]);
    }

    #[tokio::test]
    async fn test_other_categories_are_untouched() {
        let roster = CrewRoster::new(Category::Director, directory());
        let mut movie = movie_with_directors(vec![persisted(1, 10, "Director", Category::Director)]);
        *movie.crew_mut(Category::Editor) =
            Collection::loaded(vec![persisted(2, 12, "Editor", Category::Editor)]);

        reconcile_roster(&roster, &mut movie, &[]).await.unwrap();

        assert!(movie.crew(Category::Director).items().unwrap().is_empty());
        assert_eq!(movie.crew(Category::Editor).items().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_person_fails_the_batch() {
        let roster = CrewRoster::new(Category::Producer, directory());
        let mut movie = Movie::new(1, "Heat", Some(1995));
        *movie.crew_mut(Category::Producer) = Collection::loaded(Vec::new());
        let desired = vec![RoleEntry::new(11, "Producer"), RoleEntry::new(404, "Producer")];

        let err = reconcile_roster(&roster, &mut movie, &desired).await.unwrap_err();

        match err {
            CatalogError::Aggregate { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].position, 1);
                assert!(matches!(failures[0].error, CatalogError::NotFound { entity: "person", id: 404 }));
            }
            other => panic!("expected aggregate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_roles_are_all_reported() {
        let roster = CrewRoster::new(Category::Editor, directory());
        let mut movie = Movie::new(1, "Heat", Some(1995));
        *movie.crew_mut(Category::Editor) = Collection::loaded(Vec::new());
        let desired = vec![
            RoleEntry::new(10, " "),
            RoleEntry::new(11, "Editor"),
            RoleEntry::new(12, ""),
        ];

        let err = reconcile_roster(&roster, &mut movie, &desired).await.unwrap_err();

        assert!(err.is_domain());
        if let CatalogError::Aggregate { failures } = err {
            let positions: Vec<usize> = failures.iter().map(|f| f.position).collect();
            assert_eq!(positions, vec![0, 2]);
        }
        assert!(movie.crew(Category::Editor).items().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unfetched_collection_is_refused() {
        let roster = CrewRoster::new(Category::Stuntman, directory());
        let mut movie = Movie::new(1, "Heat", Some(1995));

        let err = reconcile_roster(&roster, &mut movie, &[]).await.unwrap_err();

        assert!(matches!(err, CatalogError::UninitializedCollection { .. }));
    }

    #[test]
    fn test_remove_person_and_clear() {
        let roster = CrewRoster::new(Category::Director, directory());
        let mut movie = movie_with_directors(vec![
            persisted(1, 10, "Director", Category::Director),
            persisted(2, 11, "Co-Director", Category::Director),
            persisted(3, 10, "Second Unit", Category::Director),
        ]);

        let removed = remove_person(&roster, &mut movie, 10).unwrap();
        assert_eq!(removed, vec![1, 3]);
        assert_eq!(movie.crew(Category::Director).items().unwrap().len(), 1);

        assert_eq!(clear(&roster, &mut movie).unwrap(), vec![2]);
        assert!(movie.crew(Category::Director).items().unwrap().is_empty());
    }
}
