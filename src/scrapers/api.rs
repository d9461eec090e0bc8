use serde_json::Value;
use tracing::debug;

use crate::models::Review;
use crate::scrapers::tree::{at, list_at, parse_stars, str_at};
use crate::scrapers::types::Extraction;

/// Position of the review block list in a decoded payload.
const REVIEW_LIST: &[usize] = &[2];

/// Index paths for one known shape of a review block.
#[derive(Debug, Clone, Copy)]
pub struct BlockLayout {
    pub label: &'static str,
    /// List that only this shape carries. A block is read with the first
    /// layout whose marker is present.
    marker: &'static [usize],
    reviewer_name: &'static [usize],
    profile_url: &'static [usize],
    profile_pic: &'static [usize],
    date: Option<&'static [usize]>,
    stars: &'static [usize],
    text: &'static [usize],
    /// List of photo entries, and the URL path inside each entry.
    photos: Option<(&'static [usize], &'static [usize])>,
}

/// Shape served by the current review panel RPC.
pub const NESTED: BlockLayout = BlockLayout {
    label: "nested",
    marker: &[0, 1],
    reviewer_name: &[0, 1, 4, 5, 0],
    profile_url: &[0, 1, 4, 5, 2, 0],
    profile_pic: &[0, 1, 4, 5, 1],
    date: Some(&[0, 1, 3]),
    stars: &[0, 2, 0],
    text: &[0, 2, 15, 0, 0],
    photos: None,
};

/// Older flat shape that still shows up for some listings. It carries photos
/// but no separate date position.
pub const COMPACT: BlockLayout = BlockLayout {
    label: "compact",
    marker: &[0, 5],
    reviewer_name: &[0, 5, 0, 0],
    profile_url: &[0, 5, 1],
    profile_pic: &[0, 5, 2],
    date: None,
    stars: &[0, 4],
    text: &[3, 0, 0],
    photos: Some((&[1, 1], &[0, 6, 0])),
};

/// Layouts checked in order for every block.
pub const LAYOUTS: [BlockLayout; 2] = [NESTED, COMPACT];

impl BlockLayout {
    pub fn matches(&self, block: &Value) -> bool {
        at(block, self.marker).is_some_and(Value::is_array)
    }

    pub fn reviewer_name(&self, block: &Value) -> Option<String> {
        str_at(block, self.reviewer_name)
    }

    pub fn profile_url(&self, block: &Value) -> Option<String> {
        str_at(block, self.profile_url)
    }

    pub fn profile_pic(&self, block: &Value) -> Option<String> {
        str_at(block, self.profile_pic)
    }

    pub fn date(&self, block: &Value) -> Option<String> {
        self.date.and_then(|path| str_at(block, path))
    }

    pub fn stars(&self, block: &Value) -> Option<u8> {
        at(block, self.stars).and_then(parse_stars)
    }

    pub fn text(&self, block: &Value) -> Option<String> {
        str_at(block, self.text)
    }

    pub fn photos(&self, block: &Value) -> Vec<String> {
        let Some((list, url)) = self.photos else {
            return Vec::new();
        };
        list_at(block, list)
            .iter()
            .filter_map(|entry| str_at(entry, url))
            .collect()
    }

    /// Read a review, or `None` if neither a rating nor a body is present.
    pub fn read(&self, block: &Value) -> Option<Review> {
        let review = Review {
            reviewer_name: self.reviewer_name(block),
            reviewer_profile_url: self.profile_url(block),
            reviewer_profile_pic: self.profile_pic(block),
            stars: self.stars(block),
            text: self.text(block).unwrap_or_default(),
            date: self.date(block),
            photos: self.photos(block),
        };
        review.has_signal().then_some(review)
    }
}

/// Extract every readable review from a decoded payload, in source order.
pub fn extract_payload(tree: &Value) -> Extraction {
    extract_with(tree, &LAYOUTS)
}

pub fn extract_with(tree: &Value, layouts: &[BlockLayout]) -> Extraction {
    let mut extraction = Extraction::default();
    let Some(blocks) = at(tree, REVIEW_LIST).and_then(Value::as_array) else {
        debug!("Payload has no review list");
        return extraction;
    };

    for block in blocks {
        let review = layouts
            .iter()
            .find(|layout| layout.matches(block))
            .and_then(|layout| layout.read(block));
        extraction.push(review);
    }
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested_block(name: &str, stars: i64, text: &str) -> Value {
        json!([[
            "review-id",
            [null, null, null, "2 weeks ago", [null, null, null, null, null,
                [name, "https://pics/a.jpg", ["https://maps/contrib/1"]]]],
            [stars, null, null, null, null, null, null, null, null, null,
             null, null, null, null, null, [[text]]]
        ]])
    }

    fn compact_block(stars: i64, text: &str) -> Value {
        json!([
            [null, null, null, null, stars, [["Budi"], "https://maps/contrib/2", "https://pics/b.jpg"]],
            [null, [
                [[null, null, null, null, null, null, ["https://photo/1"]]],
                [[null, null, null, null, null, null, ["https://photo/2"]]]
            ]],
            null,
            [[text]]
        ])
    }

    fn payload(blocks: Vec<Value>) -> Value {
        json!([null, null, blocks])
    }

    #[test]
    fn reads_nested_block() {
        let extraction = extract_payload(&payload(vec![nested_block("Ana", 4, "Great place")]));
        assert_eq!(extraction.reviews.len(), 1);
        let review = &extraction.reviews[0];
        assert_eq!(review.reviewer_name.as_deref(), Some("Ana"));
        assert_eq!(review.reviewer_profile_url.as_deref(), Some("https://maps/contrib/1"));
        assert_eq!(review.reviewer_profile_pic.as_deref(), Some("https://pics/a.jpg"));
        assert_eq!(review.date.as_deref(), Some("2 weeks ago"));
        assert_eq!(review.stars, Some(4));
        assert_eq!(review.text, "Great place");
        assert!(review.photos.is_empty());
    }

    #[test]
    fn reads_compact_block_with_photos() {
        let extraction = extract_payload(&payload(vec![compact_block(5, "Enak")]));
        let review = &extraction.reviews[0];
        assert_eq!(review.reviewer_name.as_deref(), Some("Budi"));
        assert_eq!(review.stars, Some(5));
        assert_eq!(review.text, "Enak");
        assert_eq!(review.date, None);
        assert_eq!(review.photos, vec!["https://photo/1", "https://photo/2"]);
    }

    #[test]
    fn truncated_block_is_skipped() {
        let tree = payload(vec![nested_block("Ana", 4, "Great place"), json!([[null]])]);
        let extraction = extract_payload(&tree);
        assert_eq!(extraction.reviews.len(), 1);
        assert_eq!(extraction.reviews[0].stars, Some(4));
        assert_eq!(extraction.report.blocks_seen, 2);
        assert_eq!(extraction.report.skipped, 1);
    }

    #[test]
    fn malformed_block_costs_exactly_one_review() {
        let good = || nested_block("Ana", 3, "Fine");
        let all_valid = extract_payload(&payload(vec![good(), good(), good()]));
        let one_broken = extract_payload(&payload(vec![good(), json!("oops"), good()]));
        assert_eq!(all_valid.reviews.len(), 3);
        assert_eq!(one_broken.reviews.len(), 2);
    }

    #[test]
    fn rating_without_text_is_still_emitted() {
        let mut block = nested_block("Ana", 2, "x");
        block[0][2][15] = Value::Null;
        let extraction = extract_payload(&payload(vec![block]));
        assert_eq!(extraction.reviews[0].stars, Some(2));
        assert_eq!(extraction.reviews[0].text, "");
    }

    #[test]
    fn out_of_range_rating_is_kept_and_counted() {
        let extraction = extract_payload(&payload(vec![nested_block("Ana", 7, "Odd")]));
        assert_eq!(extraction.reviews[0].stars, Some(7));
        assert_eq!(extraction.report.out_of_range, 1);
    }

    #[test]
    fn source_order_is_preserved() {
        let tree = payload(vec![
            nested_block("A", 1, "one"),
            compact_block(2, "two"),
            nested_block("C", 3, "three"),
        ]);
        let texts: Vec<_> = extract_payload(&tree)
            .reviews
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn payload_without_review_list_yields_nothing() {
        for tree in [json!(null), json!([null, null]), json!([null, null, "x"])] {
            let extraction = extract_payload(&tree);
            assert!(extraction.reviews.is_empty());
            assert_eq!(extraction.report.blocks_seen, 0);
        }
    }

    #[test]
    fn nested_block_without_rating_or_text_is_dropped() {
        let mut block = nested_block("Ana", 4, "x");
        block[0][2] = Value::Null;
        block[0].as_array_mut().unwrap().extend([Value::Null, json!("3 weeks ago edited")]);
        assert_eq!(block[0][4], json!("3 weeks ago edited"));

        let extraction = extract_payload(&payload(vec![block]));
        assert!(extraction.reviews.is_empty());
        assert_eq!(extraction.report.skipped, 1);
    }

    #[test]
    fn string_at_rating_position_is_not_a_rating() {
        let mut block = compact_block(5, "Enak");
        block[0][4] = json!("5 stars");
        let extraction = extract_payload(&payload(vec![block]));
        assert_eq!(extraction.reviews[0].stars, None);
        assert_eq!(extraction.reviews[0].text, "Enak");
    }

    #[test]
    fn single_layout_can_be_forced() {
        let tree = payload(vec![compact_block(5, "Enak")]);
        assert!(extract_with(&tree, &[NESTED]).reviews.is_empty());
        assert_eq!(extract_with(&tree, &[COMPACT]).reviews.len(), 1);
    }
}
