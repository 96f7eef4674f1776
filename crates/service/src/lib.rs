//! Service crate for the movie catalog.
//!
//! This crate contains the orchestrator that runs every roster and award
//! operation inside one transaction, the response views it returns, and the
//! notification sinks it publishes to.

pub mod notify;
pub mod orchestrator;
pub mod views;

pub use notify::{RecordingNotifier, TracingNotifier};
pub use orchestrator::CatalogService;
pub use views::{
    AssignmentView, AwardView, CastAssignmentView, CeremonyAwardView, CreditView, PersonMap,
    PersonRef,
};
