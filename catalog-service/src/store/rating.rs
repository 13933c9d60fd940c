//! Running rating accumulator

use std::collections::HashMap;

use tokio::sync::RwLock;

/// Running (count, sum) pair for one laptop. The average is derived by the
/// caller, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating {
    pub count: u32,
    pub sum: f64,
}

/// Concurrency-safe accumulator mapping laptop id to its running rating.
#[derive(Default)]
pub struct RatingStore {
    data: RwLock<HashMap<String, Rating>>,
}

impl RatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one rating event and return the updated pair.
    ///
    /// The mutation and the returned snapshot happen under the same exclusive
    /// lock: no caller can observe a half-updated pair.
    pub async fn add(&self, laptop_id: &str, score: f64) -> Rating {
        let mut data = self.data.write().await;

        let rating = data
            .entry(laptop_id.to_string())
            .and_modify(|r| {
                r.count += 1;
                r.sum += score;
            })
            .or_insert(Rating {
                count: 1,
                sum: score,
            });

        *rating
    }
}
