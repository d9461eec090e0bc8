use serde::{Deserialize, Serialize};

/// Lowest and highest rating a listing page can display.
pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

/// Core review data model.
///
/// Both capture modes (rendered cards and intercepted API payloads) map onto
/// this one shape. Every field that can fail to extract is an `Option`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub reviewer_name: Option<String>,
    pub reviewer_profile_url: Option<String>,
    pub reviewer_profile_pic: Option<String>,
    pub stars: Option<u8>,
    #[serde(default)]
    pub text: String,
    pub date: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl Review {
    /// Whether extraction located anything worth emitting.
    pub fn has_signal(&self) -> bool {
        self.stars.is_some() || !self.text.is_empty()
    }

    /// Advisory range check. Out-of-range ratings are kept on the record
    /// and only reported.
    pub fn rating_in_range(&self) -> bool {
        self.stars
            .map_or(true, |s| (MIN_STARS..=MAX_STARS).contains(&s))
    }
}
