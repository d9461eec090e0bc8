use std::collections::BTreeSet;

use crate::error::ConfigError;
use crate::models::{Review, MAX_STARS, MIN_STARS};

/// Set of ratings a review must have to be kept. An empty set means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StarFilter {
    allowed: BTreeSet<u8>,
}

impl StarFilter {
    /// Build a filter from explicit ratings, rejecting anything outside 1-5.
    pub fn new<I: IntoIterator<Item = i64>>(values: I) -> Result<Self, ConfigError> {
        let mut allowed = BTreeSet::new();
        for value in values {
            if value < i64::from(MIN_STARS) || value > i64::from(MAX_STARS) {
                return Err(ConfigError::StarOutOfRange(value));
            }
            allowed.insert(value as u8);
        }
        Ok(Self { allowed })
    }

    /// Parse a comma separated list such as `"3,5"`. Blank entries are ignored.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let values = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>().map_err(|e| ConfigError::InvalidValue {
                    field: "stars".to_string(),
                    reason: format!("\"{s}\": {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(values)
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn allowed(&self) -> impl Iterator<Item = u8> + '_ {
        self.allowed.iter().copied()
    }

    pub fn keep(&self, review: &Review) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        review.stars.is_some_and(|s| self.allowed.contains(&s))
    }
}

/// A review passes when there is no active filter, or when its rating is
/// present and allowed. Unrated reviews never pass an active filter.
pub fn keep(review: &Review, allowed: Option<&StarFilter>) -> bool {
    allowed.map_or(true, |filter| filter.keep(review))
}

/// Keep the passing subset in source order.
pub fn apply(reviews: Vec<Review>, allowed: Option<&StarFilter>) -> Vec<Review> {
    reviews.into_iter().filter(|r| keep(r, allowed)).collect()
}
