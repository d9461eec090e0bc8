use crate::models::Review;

/// One intercepted review RPC response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub url: String,
    pub body: String,
    /// DevTools hands binary bodies over as base64.
    pub base64_encoded: bool,
}

impl CapturedResponse {
    pub fn text(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            base64_encoded: false,
        }
    }
}

/// Per-payload extraction counters, returned alongside the reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Blocks (or cards) looked at.
    pub blocks_seen: usize,
    pub extracted: usize,
    /// Blocks dropped because no field path produced a rating or text.
    pub skipped: usize,
    /// Extracted reviews whose rating is outside 1-5.
    pub out_of_range: usize,
}

impl ExtractReport {
    pub fn merge(&mut self, other: &ExtractReport) {
        self.blocks_seen += other.blocks_seen;
        self.extracted += other.extracted;
        self.skipped += other.skipped;
        self.out_of_range += other.out_of_range;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub reviews: Vec<Review>,
    pub report: ExtractReport,
}

impl Extraction {
    /// Record one candidate block; `None` means it was skipped.
    pub(crate) fn push(&mut self, review: Option<Review>) {
        self.report.blocks_seen += 1;
        match review {
            Some(review) => {
                if !review.rating_in_range() {
                    self.report.out_of_range += 1;
                }
                self.report.extracted += 1;
                self.reviews.push(review);
            }
            None => self.report.skipped += 1,
        }
    }
}
