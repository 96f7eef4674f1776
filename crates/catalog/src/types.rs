//! Core domain types for the movie catalog.
//!
//! The Movie is the aggregate root. Everything the reconciliation engine
//! touches hangs off it:
//! - one crew collection per [`Category`]
//! - one cast collection
//! - one ceremony-award collection, each with its own award list
//!
//! Collections are fetched lazily (see [`Collection`]), so a Movie loaded
//! from the store starts with every roster unloaded.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::collection::Collection;
use crate::error::CatalogError;

// =============================================================================
// Identifiers
// =============================================================================

pub type MovieId = i64;
pub type PersonId = i64;
pub type AssignmentId = i64;
pub type CeremonyId = i64;
pub type CeremonyAwardId = i64;
pub type AwardId = i64;

// =============================================================================
// Category
// =============================================================================

/// The crew-role kinds a person can hold on a movie.
///
/// All of them share the exact same `{id, movie, person, role}` shape and are
/// stored in one table with this enum as discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Director,
    Producer,
    Editor,
    Caster,
    ArtDirector,
    SoundEditor,
    VisualEffectsSupervisor,
    MakeupArtist,
    HairDresser,
    Stuntman,
    Musician,
    Photographer,
    Costumier,
    Decorator,
    Screenwriter,
}

impl Category {
    pub const ALL: [Category; 15] = [
        Category::Director,
        Category::Producer,
        Category::Editor,
        Category::Caster,
        Category::ArtDirector,
        Category::SoundEditor,
        Category::VisualEffectsSupervisor,
        Category::MakeupArtist,
        Category::HairDresser,
        Category::Stuntman,
        Category::Musician,
        Category::Photographer,
        Category::Costumier,
        Category::Decorator,
        Category::Screenwriter,
    ];

    /// Wire name, as used in JSON and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Director => "director",
            Category::Producer => "producer",
            Category::Editor => "editor",
            Category::Caster => "caster",
            Category::ArtDirector => "art-director",
            Category::SoundEditor => "sound-editor",
            Category::VisualEffectsSupervisor => "visual-effects-supervisor",
            Category::MakeupArtist => "makeup-artist",
            Category::HairDresser => "hair-dresser",
            Category::Stuntman => "stuntman",
            Category::Musician => "musician",
            Category::Photographer => "photographer",
            Category::Costumier => "costumier",
            Category::Decorator => "decorator",
            Category::Screenwriter => "screenwriter",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| CatalogError::validation("category", format!("unknown category '{}'", s)))
    }
}

/// The part of a movie an operation works on.
///
/// Used to scope logs, notifications and `UpdateFailed` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Crew(Category),
    Cast,
    Awards,
    Movie,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Crew(category) => write!(f, "{}", category),
            Section::Cast => f.write_str("cast"),
            Section::Awards => f.write_str("awards"),
            Section::Movie => f.write_str("movie"),
        }
    }
}

// =============================================================================
// People and ceremonies
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ceremony {
    pub id: CeremonyId,
    pub name: String,
}

// =============================================================================
// Associations
// =============================================================================

/// A crew member's role on a movie within one category.
///
/// `id` is `None` until the store persists the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Option<AssignmentId>,
    pub movie_id: MovieId,
    pub person_id: PersonId,
    pub role: String,
    pub category: Category,
}

impl Assignment {
    pub fn new(movie_id: MovieId, person_id: PersonId, role: impl Into<String>, category: Category) -> Self {
        Self {
            id: None,
            movie_id,
            person_id,
            role: role.into(),
            category,
        }
    }
}

/// A cast member's billing on a movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastAssignment {
    pub id: Option<AssignmentId>,
    pub movie_id: MovieId,
    pub person_id: PersonId,
    /// Character played
    pub role: String,
    /// Billing order, lowest first
    pub rank: i32,
}

impl CastAssignment {
    pub fn new(movie_id: MovieId, person_id: PersonId, role: impl Into<String>, rank: i32) -> Self {
        Self {
            id: None,
            movie_id,
            person_id,
            role: role.into(),
            rank,
        }
    }
}

/// A single award won (or nominated) at a ceremony
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub id: Option<AwardId>,
    pub name: String,
    pub year: Option<i32>,
    pub awardees: BTreeSet<PersonId>,
}

impl Award {
    pub fn new(name: impl Into<String>, year: Option<i32>) -> Self {
        Self {
            id: None,
            name: name.into(),
            year,
            awardees: BTreeSet::new(),
        }
    }
}

/// The awards a movie received at one ceremony
#[derive(Debug, Clone)]
pub struct CeremonyAward {
    pub id: Option<CeremonyAwardId>,
    pub ceremony_id: CeremonyId,
    pub movie_id: MovieId,
    pub awards: Collection<Award>,
}

impl CeremonyAward {
    /// A ceremony award that doesn't exist in the store yet, with an empty award list
    pub fn new(movie_id: MovieId, ceremony_id: CeremonyId) -> Self {
        Self {
            id: None,
            ceremony_id,
            movie_id,
            awards: Collection::loaded(Vec::new()),
        }
    }
}

// =============================================================================
// Movie aggregate
// =============================================================================

#[derive(Debug, Clone)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub year: Option<u16>,
    crew: BTreeMap<Category, Collection<Assignment>>,
    pub cast: Collection<CastAssignment>,
    pub ceremony_awards: Collection<CeremonyAward>,
}

impl Movie {
    /// Creates a movie with every roster unloaded
    pub fn new(id: MovieId, title: impl Into<String>, year: Option<u16>) -> Self {
        Self {
            id,
            title: title.into(),
            year,
            crew: BTreeMap::new(),
            cast: Collection::Unloaded,
            ceremony_awards: Collection::Unloaded,
        }
    }

    /// The crew collection of one category
    pub fn crew(&self, category: Category) -> &Collection<Assignment> {
        static UNLOADED: Collection<Assignment> = Collection::Unloaded;
        self.crew.get(&category).unwrap_or(&UNLOADED)
    }

    /// Live, mutable crew collection of one category
    pub fn crew_mut(&mut self, category: Category) -> &mut Collection<Assignment> {
        self.crew.entry(category).or_default()
    }

    /// Iterate over the crew categories that have been fetched
    pub fn loaded_crew(&self) -> impl Iterator<Item = (Category, &[Assignment])> {
        self.crew
            .iter()
            .filter_map(|(category, collection)| collection.items().map(|items| (*category, items)))
    }

    /// Mutable access to every fetched crew category
    pub fn loaded_crew_mut(&mut self) -> impl Iterator<Item = (Category, &mut Vec<Assignment>)> {
        self.crew
            .iter_mut()
            .filter_map(|(category, collection)| collection.items_mut().map(|items| (*category, items)))
    }
}
