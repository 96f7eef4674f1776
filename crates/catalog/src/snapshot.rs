//! JSON catalog snapshots.
//!
//! A snapshot is the full content of the reference store as one JSON document:
//!
//! ```json
//! {
//!   "movies": [{"id": 1, "title": "Heat", "year": 1995}],
//!   "people": [{"id": 10, "name": "Michael Mann"}],
//!   "ceremonies": [],
//!   "crew": [{"id": 30, "movie_id": 1, "person_id": 10, "role": "Director", "category": "director"}],
//!   "cast": [],
//!   "ceremony_awards": [],
//!   "awards": []
//! }
//! ```
//!
//! Every table is optional. Loading validates referential integrity before
//! the index is handed out.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::index::*;
use crate::types::{Ceremony, Person};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSnapshot {
    pub movies: Vec<MovieRow>,
    pub people: Vec<Person>,
    pub ceremonies: Vec<Ceremony>,
    pub crew: Vec<CrewRow>,
    pub cast: Vec<CastRow>,
    pub ceremony_awards: Vec<CeremonyAwardRow>,
    pub awards: Vec<AwardRow>,
}

impl CatalogIndex {
    /// Builds and validates an index from a parsed snapshot
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self> {
        let mut index = CatalogIndex::new();

        for movie in snapshot.movies {
            index.insert_movie(movie);
        }
        for person in snapshot.people {
            index.insert_person(person);
        }
        for ceremony in snapshot.ceremonies {
            index.insert_ceremony(ceremony);
        }
        for row in snapshot.crew {
            index.insert_crew(row);
        }
        for row in snapshot.cast {
            index.insert_cast(row);
        }
        for row in snapshot.ceremony_awards {
            index.insert_ceremony_award(row);
        }
        for row in snapshot.awards {
            index.insert_award(row);
        }

        index.validate()?;
        Ok(index)
    }

    pub fn to_snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            movies: self.movies.values().cloned().collect(),
            people: self.people.values().cloned().collect(),
            ceremonies: self.ceremonies.values().cloned().collect(),
            crew: self.crew.values().cloned().collect(),
            cast: self.cast.values().cloned().collect(),
            ceremony_awards: self.ceremony_awards.values().cloned().collect(),
            awards: self.awards.values().cloned().collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }

    /// Load a catalog snapshot file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading catalog snapshot from {:?}", path);
        let json = fs::read_to_string(path)?;
        let index = Self::from_json(&json)?;

        let (movies, people, associations) = index.counts();
        info!(
            "Loaded {} movies, {} people, {} associations",
            movies, people, associations
        );
        Ok(index)
    }

    /// Write the index back as a pretty-printed snapshot
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_snapshot())?;
        fs::write(path, json)?;
        info!("Saved catalog snapshot to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;

    const SAMPLE: &str = r#"{
        "movies": [{"id": 1, "title": "Heat", "year": 1995}],
        "people": [{"id": 10, "name": "Michael Mann"}, {"id": 11, "name": "Al Pacino"}],
        "crew": [{"id": 30, "movie_id": 1, "person_id": 10, "role": "Director", "category": "director"}],
        "cast": [{"id": 31, "movie_id": 1, "person_id": 11, "role": "Vincent Hanna", "rank": 1}]
    }"#;

    #[test]
    fn test_missing_tables_default_to_empty() {
        let index = CatalogIndex::from_json(SAMPLE).unwrap();
        assert_eq!(index.counts(), (1, 2, 2));
        assert!(index.ceremonies.is_empty());
    }

    #[test]
    fn test_snapshot_keeps_rows() {
        let index = CatalogIndex::from_json(SAMPLE).unwrap();
        let snapshot = index.to_snapshot();
        assert_eq!(snapshot.crew.len(), 1);
        assert_eq!(snapshot.crew[0].category, crate::Category::Director);
        assert_eq!(snapshot.cast[0].rank, 1);
    }

    #[test]
    fn test_dangling_movie_is_rejected() {
        let json = r#"{
            "people": [{"id": 10, "name": "Michael Mann"}],
            "crew": [{"id": 30, "movie_id": 5, "person_id": 10, "role": "Director", "category": "director"}]
        }"#;
        let err = CatalogIndex::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::MissingReference { entity: "movie", id: 5 }));
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let err = CatalogIndex::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Json(_)));
    }

    #[test]
    fn test_save_and_reload_file() {
        let index = CatalogIndex::from_json(SAMPLE).unwrap();
        let path = std::env::temp_dir().join(format!("castlist-snapshot-{}.json", std::process::id()));

        index.save_to_file(&path).unwrap();
        let reloaded = CatalogIndex::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(reloaded.counts(), index.counts());
        assert_eq!(reloaded.get_person(11).unwrap().name, "Al Pacino");
    }
}
