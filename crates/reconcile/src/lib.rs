//! Reconciliation of movie rosters against caller-supplied desired state.
//!
//! This crate provides:
//! - the identity-set reconciler ([`diff`]) shared by every roster
//! - the [`Roster`] capability trait and its crew and cast implementations
//! - the nested award reconciler ([`awards`])
//! - the bounded-concurrency batch creator ([`batch`])
//!
//! ## Architecture
//! A reconciliation runs in stages against an already fetched collection:
//! 1. Entries are validated; all failures are reported together
//! 2. Obsolete rows are removed and matched rows updated in place
//! 3. Entries without an id are created, one at a time
//!
//! Persisting the result is the caller's job.
//!
//! ## Example Usage
//! ```ignore
//! use reconcile::{reconcile_roster, CrewRoster, RoleEntry};
//!
//! let roster = CrewRoster::new(Category::Director, people.clone());
//! session.fetch_crew(&mut movie, Category::Director).await?;
//!
//! let desired = vec![
//!     RoleEntry::existing(1, 10, "Director"),
//!     RoleEntry::new(11, "Co-Director"),
//! ];
//! let changes = reconcile_roster(&roster, &mut movie, &desired).await?;
//! session.persist(&mut movie).await?;
//! ```

pub mod awards;
pub mod batch;
pub mod diff;
pub mod entries;
pub mod roster;
pub mod rosters;
pub mod traits;

// Re-export main types
pub use awards::{AwardChanges, locate_ceremony_award, reconcile_awards, resolve_ceremony};
pub use batch::{CREATE_CONCURRENCY, create_all};
pub use diff::{Diff, same_identity};
pub use entries::{AwardEntry, CeremonyAwardEntry, CeremonyEntry, RoleEntry};
pub use roster::{RosterChanges, clear, reconcile_roster, remove_person, validate_all};
pub use rosters::{CastRoster, CrewRoster};
pub use traits::{Absorb, Keyed, Roster};
