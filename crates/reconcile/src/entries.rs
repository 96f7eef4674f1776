//! Desired-state entries as callers send them.
//!
//! JSON field names are camelCase. A missing or null `id` means "create";
//! a present `id` means "match an existing row, or ignore the entry".

use serde::{Deserialize, Serialize};

use catalog::{AssignmentId, AwardId, CeremonyAwardId, CeremonyId, PersonId};

/// One desired crew or cast association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleEntry {
    #[serde(default)]
    pub id: Option<AssignmentId>,
    pub person_id: PersonId,
    #[serde(default)]
    pub role: String,
    /// Billing order; only meaningful for cast
    #[serde(default)]
    pub rank: Option<i32>,
}

impl RoleEntry {
    /// An entry for a row that doesn't exist yet
    pub fn new(person_id: PersonId, role: impl Into<String>) -> Self {
        Self {
            id: None,
            person_id,
            role: role.into(),
            rank: None,
        }
    }

    /// An entry targeting an existing row
    pub fn existing(id: AssignmentId, person_id: PersonId, role: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            ..Self::new(person_id, role)
        }
    }

    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// The ceremony side of a ceremony-award descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyEntry {
    /// Existing ceremony; when absent a new ceremony named `name` is created
    #[serde(default)]
    pub id: Option<CeremonyId>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardEntry {
    #[serde(default)]
    pub id: Option<AwardId>,
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub awardees: Vec<PersonId>,
}

impl AwardEntry {
    pub fn new(name: impl Into<String>, year: Option<i32>, awardees: Vec<PersonId>) -> Self {
        Self {
            id: None,
            name: name.into(),
            year,
            awardees,
        }
    }
}

/// The desired state of a movie's awards at one ceremony
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyAwardEntry {
    #[serde(default)]
    pub id: Option<CeremonyAwardId>,
    #[serde(default)]
    pub ceremony: CeremonyEntry,
    #[serde(default)]
    pub awards: Vec<AwardEntry>,
}

impl CeremonyAwardEntry {
    /// Every awardee id referenced by the descriptor, deduplicated and sorted
    pub fn awardee_ids(&self) -> Vec<PersonId> {
        let mut ids: Vec<PersonId> = self
            .awards
            .iter()
            .flat_map(|award| award.awardees.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
