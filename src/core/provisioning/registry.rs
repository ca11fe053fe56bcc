use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

/// Result of a registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub number: String,
    /// `true` when this request provisioned the number
    pub newly_assigned: bool,
}

/// In-memory user → phone number table.
///
/// Empty at start and never persisted. Each user gets a once-cell, so
/// concurrent requests for the same user run the provisioning closure at most
/// once and all observe the same number. A failed provisioning leaves the cell
/// empty and the next request retries.
#[derive(Debug, Default)]
pub struct NumberRegistry {
    numbers: DashMap<String, Arc<OnceCell<String>>>,
}

impl NumberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Option<String> {
        self.numbers
            .get(user_id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Number of users holding a number.
    pub fn len(&self) -> usize {
        self.numbers
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn get_or_create<F, Fut, E>(
        &self,
        user_id: &str,
        provision: F,
    ) -> Result<Assignment, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        // Clone the cell out so no map shard lock is held across the await.
        let cell = self
            .numbers
            .entry(user_id.to_string())
            .or_default()
            .value()
            .clone();

        if let Some(number) = cell.get() {
            return Ok(Assignment {
                number: number.clone(),
                newly_assigned: false,
            });
        }

        let mut provisioned = false;
        let number = cell
            .get_or_try_init(|| {
                provisioned = true;
                provision()
            })
            .await?
            .clone();

        Ok(Assignment {
            number,
            newly_assigned: provisioned,
        })
    }
}
