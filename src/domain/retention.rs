use std::cmp::Ordering;

use super::dataset::Dataset;
use super::error::{AppError, Result};

pub const DEFAULT_RETENTION_LIMIT: usize = 5;

/// Where an owner stands relative to the retention limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionState {
    WithinLimit,
    OverLimit { surplus: usize },
}

/// Per-owner cap on stored datasets. Newest uploads are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    limit: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RETENTION_LIMIT,
        }
    }
}

impl RetentionPolicy {
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(AppError::ConfigError(
                "retention_limit must be at least 1".to_string(),
            ));
        }
        Ok(Self { limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn assess(&self, count: usize) -> RetentionState {
        if count > self.limit {
            RetentionState::OverLimit {
                surplus: count - self.limit,
            }
        } else {
            RetentionState::WithinLimit
        }
    }

    /// Ids of the datasets to delete so that at most `limit` remain.
    ///
    /// `datasets` must all belong to one owner; order does not matter. The
    /// newest by `uploaded_at` survive, and on equal timestamps the higher
    /// (later assigned) id wins.
    pub fn evictions(&self, datasets: &[Dataset]) -> Vec<i64> {
        if let RetentionState::WithinLimit = self.assess(datasets.len()) {
            return Vec::new();
        }

        let mut ordered: Vec<&Dataset> = datasets.iter().collect();
        ordered.sort_by(|a, b| newest_first(a, b));
        ordered
            .into_iter()
            .skip(self.limit)
            .map(|dataset| dataset.id)
            .collect()
    }
}

/// Ordering used for listings and retention: newest upload first.
pub fn newest_first(a: &Dataset, b: &Dataset) -> Ordering {
    b.uploaded_at
        .cmp(&a.uploaded_at)
        .then_with(|| b.id.cmp(&a.id))
}
