use anyhow::Result;

use crate::config::SortOrder;
use crate::scrapers::types::CapturedResponse;

/// A live place page the pipeline can drive.
///
/// The browser implementation lives in [`crate::scrapers::browser`]; tests use
/// scripted sessions so the pipeline runs without Chrome.
pub trait CaptureSession {
    /// Open the reviews panel. Returns `Ok(false)` when no locator matched.
    fn open_reviews(&mut self) -> Result<bool>;

    /// Switch review order. Returns `Ok(false)` when the control was not found.
    fn apply_sort(&mut self, order: SortOrder) -> Result<bool>;

    /// Find the scrollable review container. `Ok(false)` means scrolling falls
    /// back to the whole window.
    fn locate_panel(&mut self) -> Result<bool>;

    /// Scroll once and wait for the page to settle.
    fn scroll(&mut self, step: u32) -> Result<()>;

    /// Take every review response captured since the last call.
    fn drain_responses(&mut self) -> Vec<CapturedResponse>;

    /// Current rendered page.
    fn page_html(&mut self) -> Result<String>;

    /// Short name used in logs.
    fn source_name(&self) -> &'static str;
}
