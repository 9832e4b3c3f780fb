//! Bounded fan-out over a list of domains.

use futures_util::stream::{self, StreamExt};
use std::future::Future;

/// Default number of domains processed concurrently
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Upper bound on concurrent domains
pub const MAX_CONCURRENCY: usize = 20;

/// Clamp a requested worker count to `1..=MAX_CONCURRENCY`
#[must_use]
pub fn clamp_concurrency(requested: usize) -> usize {
    requested.clamp(1, MAX_CONCURRENCY)
}

/// Run `f` for every item with at most `concurrency` in flight.
///
/// Results come back in input order regardless of completion order.
pub async fn run_bounded<'a, I, T, F, Fut>(items: &'a [I], concurrency: usize, f: F) -> Vec<T>
where
    F: FnMut(&'a I) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(f)
        .buffered(clamp_concurrency(concurrency))
        .collect()
        .await
}
