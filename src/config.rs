use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use url::Url;

use crate::error::ConfigError;
use crate::filter::StarFilter;
use crate::sink::OutputFormat;

/// Order the review panel is switched to before scrolling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    #[default]
    #[value(alias = "desc")]
    Newest,
    #[value(alias = "asc")]
    Oldest,
}

impl SortOrder {
    /// `data-index` of the matching entry in the sort menu.
    pub fn menu_index(self) -> u8 {
        match self {
            Self::Newest => 2,
            Self::Oldest => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
        }
    }
}

/// Where reviews are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CaptureMode {
    /// Intercepted review RPC responses.
    #[default]
    Api,
    /// Rendered review cards.
    Dom,
}

/// Run configuration. Read-only once the session starts.
#[derive(Debug, Clone)]
pub struct Settings {
    pub place_url: Url,
    pub star_filter: Option<StarFilter>,
    pub sort: SortOrder,
    pub scroll_iterations: u32,
    pub scroll_pause: Duration,
    pub output_path: PathBuf,
    pub format: OutputFormat,
    pub mode: CaptureMode,
    pub headless: bool,
    pub debug_dir: Option<PathBuf>,
}

pub const DEFAULT_SCROLL_ITERATIONS: u32 = 15;
pub const DEFAULT_SCROLL_PAUSE: Duration = Duration::from_millis(2000);
pub const DEFAULT_OUTPUT: &str = "reviews.json";

impl Settings {
    /// Settings with defaults for everything except the place URL.
    pub fn new(place_url: &str) -> Result<Self, ConfigError> {
        let output_path = PathBuf::from(DEFAULT_OUTPUT);
        Ok(Self {
            place_url: parse_place_url(place_url)?,
            star_filter: None,
            sort: SortOrder::default(),
            scroll_iterations: DEFAULT_SCROLL_ITERATIONS,
            scroll_pause: DEFAULT_SCROLL_PAUSE,
            format: OutputFormat::from_path(&output_path),
            output_path,
            mode: CaptureMode::default(),
            headless: true,
            debug_dir: None,
        })
    }

    /// Active filter, if any. An empty set counts as no filter.
    pub fn active_filter(&self) -> Option<&StarFilter> {
        self.star_filter.as_ref().filter(|f| !f.is_empty())
    }

    /// Checks that need the filesystem. Run before any browser activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_output_path(&self.output_path)
    }
}

/// Only absolute http(s) URLs are accepted.
pub fn parse_place_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {other}"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

pub fn validate_output_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::EmptyOutputPath);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "output".to_string(),
                reason: format!("directory {} does not exist", parent.display()),
            });
        }
    }
    Ok(())
}
