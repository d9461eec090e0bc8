use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use headless_chrome::browser::tab::ResponseHandler;
use headless_chrome::{Browser, LaunchOptions, Tab};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Settings, SortOrder};
use crate::scrapers::traits::CaptureSession;
use crate::scrapers::types::CapturedResponse;

/// URL fragment of the RPC that serves review pages.
pub const REVIEWS_ENDPOINT: &str = "listugcposts";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/136.0.0.0 Safari/537.36";
const WINDOW_SIZE: (u32, u32) = (1200, 800);

const PAGE_LOAD_WAIT: Duration = Duration::from_secs(5);
const PANEL_OPEN_WAIT: Duration = Duration::from_secs(3);
const SORT_SETTLE_WAIT: Duration = Duration::from_secs(2);
const LOCATOR_TIMEOUT: Duration = Duration::from_secs(10);
const FALLBACK_LOCATOR_TIMEOUT: Duration = Duration::from_secs(5);
const SCROLL_DISTANCE: u32 = 10_000;

/// Reviews tab/button, tried in order.
const REVIEW_TAB_XPATHS: &[&str] = &[
    "//button[contains(@aria-label,'Ulasan')]",
    "//button[contains(@aria-label,'ulasan')]",
    "//button[contains(@aria-label,'Reviews')]",
    "//button[contains(@aria-label,'reviews')]",
    "//button[contains(text(),'Ulasan')]",
    "//button[contains(text(),'Reviews')]",
    "//div[@role='tab'][contains(text(),'Ulasan')]",
    "//div[@role='tab'][contains(text(),'Reviews')]",
    "//div[contains(@role,'button')][contains(@aria-label,'reviews')]",
];

const SORT_BUTTON_SELECTORS: &[&str] = &[
    r#"button[aria-label="Urutkan ulasan"]"#,
    r#"button[aria-label="Sort reviews"]"#,
    "button.DVeyrd",
    r#"button[jsaction*="pane.reviewSort"]"#,
];

/// Scrollable review containers. The first entry is the list itself.
const CONTAINER_SELECTORS: &[&str] = &[
    r#"div[jslog="26354;mutable:true;"]"#,
    r#"div[role="region"]"#,
    "div.m6QErb-qJTHM-haAclf",
    "div.m6QErb[aria-label]",
    "div.m6QErb",
    "div.section-scrollbox",
];

/// Sort menu entries for `order`, tried in order.
pub fn sort_option_selectors(order: SortOrder) -> Vec<String> {
    let index = order.menu_index();
    let label = order.label();
    let mut capitalized = label.to_string();
    capitalized[..1].make_ascii_uppercase();
    vec![
        format!(r#"div.fxNQSd[data-index="{index}"]"#),
        format!(r#"div[data-value="{}"]"#, label.to_uppercase()),
        format!(r#"div[data-value="{label}"]"#),
        format!(r#"li[aria-label="Sort by: {capitalized}"]"#),
        format!(r#"li[data-index="{index}"]"#),
    ]
}

/// Try candidates in order and return the first that succeeds together with
/// its result. Failures are logged at debug level only.
pub fn first_match<'c, C, T, F>(candidates: &'c [C], mut attempt: F) -> Option<(&'c C, T)>
where
    C: AsRef<str>,
    F: FnMut(&str) -> Result<T>,
{
    candidates.iter().find_map(|candidate| match attempt(candidate.as_ref()) {
        Ok(found) => Some((candidate, found)),
        Err(err) => {
            debug!("Locator {} did not match: {err}", candidate.as_ref());
            None
        }
    })
}

/// JavaScript that scrolls the review list, or the window when no container
/// was found.
pub fn scroll_script(container: Option<&str>) -> String {
    match container {
        Some(selector) => {
            // A JSON string literal is a valid JS string literal.
            let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
            format!(
                "(() => {{ const el = document.querySelector({quoted}); \
                 if (el) {{ el.scrollBy(0, {SCROLL_DISTANCE}); return true; }} \
                 window.scrollBy(0, {SCROLL_DISTANCE}); return false; }})()"
            )
        }
        None => format!("window.scrollBy(0, {SCROLL_DISTANCE})"),
    }
}

/// Headless Chrome session on one place page, capturing review RPC responses.
pub struct BrowserSession {
    // Keeps the Chrome process alive for as long as the tab is used.
    _browser: Browser,
    tab: Arc<Tab>,
    captured: Arc<Mutex<Vec<CapturedResponse>>>,
    container: Option<&'static str>,
    scroll_pause: Duration,
}

impl BrowserSession {
    /// Launch Chrome, start capturing review responses and open the place page.
    pub fn launch(settings: &Settings) -> Result<Self> {
        info!("Launching Chrome (headless: {})...", settings.headless);

        let options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .window_size(Some(WINDOW_SIZE))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open tab")?;
        tab.set_user_agent(USER_AGENT, None, None)
            .context("Failed to set user agent")?;

        let captured = Arc::new(Mutex::new(Vec::new()));
        tab.register_response_handling("reviews", capture_handler(Arc::clone(&captured)))
            .context("Failed to register response capture")?;

        info!("Opening {}", settings.place_url);
        tab.navigate_to(settings.place_url.as_str())?;
        tab.wait_until_navigated()?;
        thread::sleep(PAGE_LOAD_WAIT);

        Ok(Self {
            _browser: browser,
            tab,
            captured,
            container: None,
            scroll_pause: settings.scroll_pause,
        })
    }

    fn click_css(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)?
            .click()?;
        Ok(())
    }

    fn click_xpath(&self, xpath: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_xpath_with_custom_timeout(xpath, timeout)?
            .click()?;
        Ok(())
    }
}

fn capture_handler(captured: Arc<Mutex<Vec<CapturedResponse>>>) -> ResponseHandler {
    Box::new(move |params, fetch_body| {
        let url = params.response.url;
        if !url.contains(REVIEWS_ENDPOINT) {
            return;
        }
        match fetch_body() {
            Ok(body) if !body.body.is_empty() => {
                debug!("Captured review response from {url}");
                captured.lock().push(CapturedResponse {
                    url,
                    body: body.body,
                    base64_encoded: body.base_64_encoded,
                });
            }
            Ok(_) => debug!("Ignoring empty review response from {url}"),
            Err(err) => warn!("Could not read body of {url}: {err}"),
        }
    })
}

impl CaptureSession for BrowserSession {
    fn open_reviews(&mut self) -> Result<bool> {
        let clicked = first_match(REVIEW_TAB_XPATHS, |xpath| {
            self.click_xpath(xpath, LOCATOR_TIMEOUT)
        });
        match clicked {
            Some((xpath, ())) => {
                info!("Opened reviews with {xpath}");
                thread::sleep(PANEL_OPEN_WAIT);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn apply_sort(&mut self, order: SortOrder) -> Result<bool> {
        let opened = first_match(SORT_BUTTON_SELECTORS, |selector| {
            let timeout = if selector == SORT_BUTTON_SELECTORS[0] {
                LOCATOR_TIMEOUT
            } else {
                FALLBACK_LOCATOR_TIMEOUT
            };
            self.click_css(selector, timeout)
        });
        if opened.is_none() {
            warn!("Sort reviews button not found");
            return Ok(false);
        }
        thread::sleep(SORT_SETTLE_WAIT);

        let options = sort_option_selectors(order);
        let picked = first_match(options.as_slice(), |selector| {
            let timeout = if selector == options[0] {
                LOCATOR_TIMEOUT
            } else {
                FALLBACK_LOCATOR_TIMEOUT
            };
            self.click_css(selector, timeout)
        });
        match picked {
            Some((selector, ())) => {
                info!("Sorted reviews by {} with {selector}", order.label());
                thread::sleep(SORT_SETTLE_WAIT);
                Ok(true)
            }
            None => {
                warn!("Sort option '{}' not found", order.label());
                Ok(false)
            }
        }
    }

    fn locate_panel(&mut self) -> Result<bool> {
        let found = first_match(CONTAINER_SELECTORS, |selector| {
            self.tab
                .wait_for_element_with_custom_timeout(selector, FALLBACK_LOCATOR_TIMEOUT)
                .map(|_| ())
        });
        self.container = found.map(|(selector, ())| *selector);
        if let Some(selector) = self.container {
            info!("Found review container with {selector}");
        }
        Ok(self.container.is_some())
    }

    fn scroll(&mut self, step: u32) -> Result<()> {
        self.tab
            .evaluate(&scroll_script(self.container), false)
            .with_context(|| format!("Scroll step {} failed", step + 1))?;
        thread::sleep(self.scroll_pause);
        Ok(())
    }

    fn drain_responses(&mut self) -> Vec<CapturedResponse> {
        std::mem::take(&mut *self.captured.lock())
    }

    fn page_html(&mut self) -> Result<String> {
        let html = self
            .tab
            .evaluate("document.documentElement.outerHTML", false)?
            .value
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();
        if html.is_empty() {
            warn!("Could not get HTML from page");
        }
        Ok(html)
    }

    fn source_name(&self) -> &'static str {
        "maps place page"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_stops_at_first_success() {
        let mut tried = Vec::new();
        let found = first_match(&["a", "b", "c"], |candidate| {
            tried.push(candidate.to_string());
            if candidate == "b" {
                Ok(42)
            } else {
                anyhow::bail!("no {candidate}")
            }
        });
        assert_eq!(found, Some((&"b", 42)));
        assert_eq!(tried, vec!["a", "b"]);
    }

    #[test]
    fn first_match_exhausts_to_none() {
        let found: Option<(&&str, ())> =
            first_match(&["a", "b"], |_| anyhow::bail!("never"));
        assert!(found.is_none());
    }

    #[test]
    fn sort_options_follow_order() {
        let newest = sort_option_selectors(SortOrder::Newest);
        assert_eq!(newest[0], r#"div.fxNQSd[data-index="2"]"#);
        assert!(newest.contains(&r#"div[data-value="NEWEST"]"#.to_string()));
        let oldest = sort_option_selectors(SortOrder::Oldest);
        assert_eq!(oldest[0], r#"div.fxNQSd[data-index="3"]"#);
        assert!(oldest.contains(&r#"li[aria-label="Sort by: Oldest"]"#.to_string()));
    }

    #[test]
    fn scroll_script_targets_container_or_window() {
        let script = scroll_script(Some(r#"div[jslog="26354;mutable:true;"]"#));
        assert!(script.contains(r#"document.querySelector("div[jslog=\"26354;mutable:true;\"]")"#));
        assert_eq!(scroll_script(None), "window.scrollBy(0, 10000)");
    }
}
