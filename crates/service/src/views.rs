//! Response shapes returned by the service.
//!
//! Views are flat, serializable copies of the aggregate. They carry each
//! person's name next to the id so callers don't need a second lookup.

use serde::Serialize;
use std::collections::HashMap;

use catalog::{
    Assignment, Award, CastAssignment, Category, Ceremony, CeremonyAward, Credit, MovieId, Person,
    PersonId,
};

/// Lookup table from person id to person, as returned by `resolve_people`
pub type PersonMap = HashMap<PersonId, Person>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonRef {
    pub id: PersonId,
    /// `None` when the person could not be resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PersonRef {
    pub fn lookup(id: PersonId, people: &PersonMap) -> Self {
        Self {
            id,
            name: people.get(&id).map(|p| p.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: Option<i64>,
    pub person: PersonRef,
    pub role: String,
    pub category: Category,
}

impl AssignmentView {
    pub fn project(assignment: &Assignment, people: &PersonMap) -> Self {
        Self {
            id: assignment.id,
            person: PersonRef::lookup(assignment.person_id, people),
            role: assignment.role.clone(),
            category: assignment.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastAssignmentView {
    pub id: Option<i64>,
    pub person: PersonRef,
    pub role: String,
    pub rank: i32,
}

impl CastAssignmentView {
    pub fn project(member: &CastAssignment, people: &PersonMap) -> Self {
        Self {
            id: member.id,
            person: PersonRef::lookup(member.person_id, people),
            role: member.role.clone(),
            rank: member.rank,
        }
    }
}

/// Project a cast list in billing order
pub fn project_cast(cast: &[CastAssignment], people: &PersonMap) -> Vec<CastAssignmentView> {
    let mut views: Vec<CastAssignmentView> = cast
        .iter()
        .map(|member| CastAssignmentView::project(member, people))
        .collect();
    views.sort_by_key(|view| (view.rank, view.id));
    views
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardView {
    pub id: Option<i64>,
    pub name: String,
    pub year: Option<i32>,
    pub awardees: Vec<PersonRef>,
}

impl AwardView {
    pub fn project(award: &Award, people: &PersonMap) -> Self {
        Self {
            id: award.id,
            name: award.name.clone(),
            year: award.year,
            awardees: award
                .awardees
                .iter()
                .map(|id| PersonRef::lookup(*id, people))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyAwardView {
    pub id: Option<i64>,
    pub ceremony: Ceremony,
    pub awards: Vec<AwardView>,
}

impl CeremonyAwardView {
    /// Unloaded award lists project as empty
    pub fn project(ceremony_award: &CeremonyAward, ceremony: Ceremony, people: &PersonMap) -> Self {
        let awards = ceremony_award
            .awards
            .items()
            .unwrap_or_default()
            .iter()
            .map(|award| AwardView::project(award, people))
            .collect();
        Self {
            id: ceremony_award.id,
            ceremony,
            awards,
        }
    }
}

/// One line of a person's filmography
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditView {
    pub movie_id: MovieId,
    pub movie_title: String,
    pub section: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i32>,
}

impl From<Credit> for CreditView {
    fn from(credit: Credit) -> Self {
        Self {
            movie_id: credit.movie_id,
            movie_title: credit.movie_title,
            section: credit.section.to_string(),
            label: credit.label,
            rank: credit.rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> PersonMap {
        HashMap::from([(
            10,
            Person {
                id: 10,
                name: "Al Pacino".to_string(),
            },
        )])
    }

    #[test]
    fn test_cast_is_projected_in_billing_order() {
        let cast = vec![
            CastAssignment {
                id: Some(2),
                ..CastAssignment::new(1, 11, "Neil McCauley", 2)
            },
            CastAssignment {
                id: Some(1),
                ..CastAssignment::new(1, 10, "Vincent Hanna", 1)
            },
        ];

        let views = project_cast(&cast, &people());

        assert_eq!(views[0].role, "Vincent Hanna");
        assert_eq!(views[0].person.name.as_deref(), Some("Al Pacino"));
        assert_eq!(views[1].person.name, None);
    }

    #[test]
    fn test_views_serialize_camel_case() {
        let view = CreditView {
            movie_id: 1,
            movie_title: "Heat".to_string(),
            section: "cast".to_string(),
            label: "Vincent Hanna".to_string(),
            rank: None,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["movieTitle"], "Heat");
        assert!(json.get("rank").is_none());
    }
}
