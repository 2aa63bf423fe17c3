use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SelectionPolicy;
use crate::metrics;
use crate::track::TrackSet;

/// Key used to rank tracks, always descending.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    Distance,
    SampleCount,
}

/// Ids of the `top_n` tracks with at least `min_samples` samples, best first.
///
/// Ties keep the order in which the identities first appeared.
pub fn select(tracks: &TrackSet, min_samples: usize, top_n: usize, order_by: OrderBy) -> Vec<i64> {
    let mut scored: Vec<(i64, f64)> = tracks
        .iter()
        .filter(|t| t.len() >= min_samples)
        .map(|t| {
            let key = match order_by {
                OrderBy::Distance => metrics::distance(&t.positions),
                OrderBy::SampleCount => t.len() as f64,
            };

            (t.track_id, key)
        })
        .collect();

    // stable, so equal keys keep insertion order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_n);

    debug!(
        "selected {} of {} tracks by {:?} (min {} samples)",
        scored.len(),
        tracks.len(),
        order_by,
        min_samples
    );

    scored.into_iter().map(|(id, _)| id).collect()
}

#[inline]
pub fn select_with(tracks: &TrackSet, policy: &SelectionPolicy) -> Vec<i64> {
    select(tracks, policy.min_samples, policy.top_n, policy.order_by)
}
