//! Bounded-concurrency creation of new associations.
//!
//! Every creation runs against the same transactional session, and parallel
//! writes through one session corrupt it. The batch is therefore driven through
//! a stream buffered at [`CREATE_CONCURRENCY`], which is 1: the next creation
//! only starts once the previous one has finished.
//!
//! Failures don't stop the batch. All of them are collected so the caller sees
//! every bad entry at once, and any failure fails the batch as a whole.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::debug;

use catalog::{CatalogError, EntryFailure, Result};

/// Maximum number of creations in flight
pub const CREATE_CONCURRENCY: usize = 1;

/// Run `create` for every pending entry, in order.
///
/// `pending` pairs each entry with its position in the desired list; failures
/// are reported with that position.
pub async fn create_all<'d, D, T, F, Fut>(pending: Vec<(usize, &'d D)>, mut create: F) -> Result<Vec<T>>
where
    D: ?Sized,
    F: FnMut(&'d D) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if pending.is_empty() {
        return Ok(Vec::new());
    }
    debug!("Creating {} new entries", pending.len());

    let results: Vec<(usize, Result<T>)> = stream::iter(pending)
        .map(|(position, entry)| {
            let creation = create(entry);
            async move { (position, creation.await) }
        })
        .buffered(CREATE_CONCURRENCY)
        .collect()
        .await;

    let mut created = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (position, result) in results {
        match result {
            Ok(entity) => created.push(entity),
            Err(error) => {
                debug!("Entry #{} could not be created: {}", position, error);
                failures.push(EntryFailure { position, error });
            }
        }
    }

    match CatalogError::aggregate(failures) {
        Some(err) => Err(err),
        None => Ok(created),
    }
}
