use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::config::{
    parse_place_url, CaptureMode, Settings, SortOrder, DEFAULT_OUTPUT, DEFAULT_SCROLL_ITERATIONS,
};
use crate::error::ConfigError;
use crate::filter::StarFilter;
use crate::sink::OutputFormat;

/// Collect reviews for a map place listing.
#[derive(Debug, Parser)]
#[command(name = "review-scout", version, about)]
pub struct Cli {
    /// Place listing URL.
    #[arg(long, env = "PLACE_URL")]
    pub url: String,

    /// Only keep these ratings, e.g. `4` or `3,5`.
    #[arg(long, env = "STAR_FILTER")]
    pub stars: Option<String>,

    /// Review order to switch the panel to before scrolling.
    #[arg(long, value_enum, env = "SORT_DIRECTION", default_value_t = SortOrder::Newest)]
    pub sort: SortOrder,

    /// Scroll steps used to load more reviews.
    #[arg(long = "iter", env = "SCROLL_ITERATIONS", default_value_t = DEFAULT_SCROLL_ITERATIONS)]
    pub iterations: u32,

    /// Settle time after each scroll step, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    pub pause_ms: u64,

    #[arg(long, env = "OUTPUT_PATH", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Output format; guessed from the output extension when omitted.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[arg(long, value_enum, default_value_t = CaptureMode::Api)]
    pub mode: CaptureMode,

    /// Run Chrome without a window.
    #[arg(long, env = "HEADLESS", default_value_t = true, action = ArgAction::Set)]
    pub headless: bool,

    /// Keep every captured payload in this directory.
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,
}

impl Cli {
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let star_filter = self
            .stars
            .as_deref()
            .map(StarFilter::parse)
            .transpose()?;
        let format = self
            .format
            .unwrap_or_else(|| OutputFormat::from_path(&self.output));

        let settings = Settings {
            place_url: parse_place_url(&self.url)?,
            star_filter,
            sort: self.sort,
            scroll_iterations: self.iterations,
            scroll_pause: Duration::from_millis(self.pause_ms),
            output_path: self.output,
            format,
            mode: self.mode,
            headless: self.headless,
            debug_dir: self.debug_dir,
        };
        settings.validate()?;
        Ok(settings)
    }
}
