use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::models::Review;
use crate::scrapers::tree::{leading_number, round_rating};
use crate::scrapers::types::Extraction;

/// Card containers, newest page layout first. The first selector that matches
/// anything is used for the whole page so nested matches are not doubled.
const CARD_SELECTORS: &[&str] = &[
    r#"div.jftiEf[data-review-id]"#,
    r#"div[jscontroller="H6eOGe"]"#,
    r#"div[data-review-id][aria-label]"#,
];
const AUTHOR_SELECTORS: &[&str] = &["div.d4r55", ".d4r55", "button.al6Kxe div"];
const DATE_SELECTORS: &[&str] = &["span.rsqaWe", "span.dehysf", "span.xRkPPb"];
const STAR_SELECTORS: &[&str] = &[
    "span.kvMYJc",
    "span.ODSEW-ShBeI-stars",
    r#"span[role="img"][aria-label]"#,
];
const TEXT_SELECTORS: &[&str] = &["span.wiI7pd", "span.raw__09lO3", "div.MyEned span"];
const PROFILE_PIC_SELECTORS: &[&str] = &["img.NBa7we"];
const PROFILE_URL_SELECTORS: &[&str] = &["button.WEBjve", "button.al6Kxe"];

/// Compiled candidate lists for each card field.
#[derive(Debug)]
pub struct CardSelectors {
    cards: Vec<Selector>,
    author: Vec<Selector>,
    date: Vec<Selector>,
    stars: Vec<Selector>,
    text: Vec<Selector>,
    profile_pic: Vec<Selector>,
    profile_url: Vec<Selector>,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            cards: compile(CARD_SELECTORS),
            author: compile(AUTHOR_SELECTORS),
            date: compile(DATE_SELECTORS),
            stars: compile(STAR_SELECTORS),
            text: compile(TEXT_SELECTORS),
            profile_pic: compile(PROFILE_PIC_SELECTORS),
            profile_url: compile(PROFILE_URL_SELECTORS),
        }
    }
}

fn compile(candidates: &[&str]) -> Vec<Selector> {
    candidates
        .iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(err) => {
                warn!("Ignoring invalid selector {css}: {err}");
                None
            }
        })
        .collect()
}

/// First descendant matching any candidate, in candidate order.
fn find<'a>(card: ElementRef<'a>, candidates: &[Selector]) -> Option<ElementRef<'a>> {
    candidates
        .iter()
        .find_map(|selector| card.select(selector).next())
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl CardSelectors {
    /// Read one card. Author, date, star label and body must all be present;
    /// profile links are optional.
    pub fn read(&self, card: ElementRef<'_>) -> Option<Review> {
        let author = text_of(find(card, &self.author)?);
        let date = text_of(find(card, &self.date)?);
        let label = find(card, &self.stars)?.value().attr("aria-label")?;
        let stars = star_label(label)?;
        let text = text_of(find(card, &self.text)?);

        let profile_pic = find(card, &self.profile_pic)
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);
        let profile_url = find(card, &self.profile_url)
            .and_then(|button| button.value().attr("data-href"))
            .map(str::to_string);

        Some(Review {
            reviewer_name: non_empty(author),
            reviewer_profile_url: profile_url,
            reviewer_profile_pic: profile_pic,
            stars: Some(stars),
            text,
            date: non_empty(date),
            photos: Vec::new(),
        })
    }

    /// Extract every card of a rendered page, in document order.
    pub fn extract(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);
        let mut extraction = Extraction::default();

        let Some(cards) = self
            .cards
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|cards| !cards.is_empty())
        else {
            debug!("No review cards in page");
            return extraction;
        };

        for card in cards {
            extraction.push(self.read(card));
        }
        extraction
    }
}

/// Rating from labels like `"4 stars"`, `"4,0 bintang"` or `"5 étoiles"`.
pub fn star_label(label: &str) -> Option<u8> {
    leading_number(label).and_then(round_rating)
}

/// Extract with the default selector lists.
pub fn extract_cards(html: &str) -> Extraction {
    CardSelectors::default().extract(html)
}
