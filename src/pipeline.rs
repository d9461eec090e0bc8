use std::io::Write;

use tracing::{debug, info, warn};

use crate::config::{CaptureMode, Settings};
use crate::error::{ScrapeError, ScrapeResult, SinkError};
use crate::filter::{self, StarFilter};
use crate::scrapers::api::extract_payload;
use crate::scrapers::decode::{decode, payload_bytes, PayloadDump};
use crate::scrapers::dom::extract_cards;
use crate::scrapers::traits::CaptureSession;
use crate::scrapers::types::{CapturedResponse, ExtractReport, Extraction};
use crate::sink::ReviewSink;

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Review responses looked at.
    pub payloads: usize,
    pub decode_failures: usize,
    /// Reviews extracted before filtering.
    pub extracted: usize,
    /// Reviews that passed the star filter.
    pub kept: usize,
    pub written: usize,
    pub skipped_blocks: usize,
    pub out_of_range: usize,
    pub sorted: bool,
    /// Scrolling fell back to the whole window.
    pub window_scroll: bool,
}

impl RunSummary {
    fn absorb(&mut self, report: &ExtractReport, kept: usize, written: usize) {
        self.extracted += report.extracted;
        self.skipped_blocks += report.skipped;
        self.out_of_range += report.out_of_range;
        self.kept += kept;
        self.written += written;
    }
}

/// Decodes, extracts, filters and writes captured payloads.
pub struct Processor<'a, W: Write> {
    sink: &'a mut ReviewSink<W>,
    filter: Option<&'a StarFilter>,
    dump: Option<PayloadDump>,
    pub summary: RunSummary,
}

impl<'a, W: Write> Processor<'a, W> {
    pub fn new(sink: &'a mut ReviewSink<W>, filter: Option<&'a StarFilter>) -> Self {
        Self {
            sink,
            filter,
            dump: None,
            summary: RunSummary::default(),
        }
    }

    pub fn with_dump(mut self, dump: Option<PayloadDump>) -> Self {
        self.dump = dump;
        self
    }

    /// Handle one captured response. A payload that does not decode is
    /// counted and skipped; only sink failures are returned.
    pub fn payload(&mut self, captured: &CapturedResponse) -> Result<usize, SinkError> {
        self.summary.payloads += 1;
        let decoded = match payload_bytes(&captured.body, captured.base64_encoded) {
            Ok(bytes) => {
                let decoded = decode(&bytes);
                if let Some(dump) = self.dump.as_mut() {
                    dump.record(&bytes, decoded.as_ref().ok());
                }
                decoded
            }
            Err(err) => {
                if let Some(dump) = self.dump.as_mut() {
                    dump.record(captured.body.as_bytes(), None);
                }
                Err(err)
            }
        };

        let tree = match decoded {
            Ok(tree) => tree,
            Err(err) => {
                self.summary.decode_failures += 1;
                warn!("Skipping undecodable response from {}: {err}", captured.url);
                return Ok(0);
            }
        };

        let extraction = extract_payload(&tree);
        info!(
            "Extracted {} reviews from response ({} blocks, {} skipped)",
            extraction.report.extracted, extraction.report.blocks_seen, extraction.report.skipped
        );
        self.write(extraction)
    }

    /// Filter and write one extraction as a single batch.
    pub fn write(&mut self, extraction: Extraction) -> Result<usize, SinkError> {
        let Extraction { reviews, report } = extraction;
        if report.out_of_range > 0 {
            warn!("{} reviews carry a rating outside 1-5", report.out_of_range);
        }
        let kept = filter::apply(reviews, self.filter);
        let written = self.sink.write_batch(&kept)?;
        self.summary.absorb(&report, kept.len(), written);
        Ok(written)
    }

    fn drain<S: CaptureSession>(&mut self, session: &mut S) -> Result<(), SinkError> {
        for captured in session.drain_responses() {
            self.payload(&captured)?;
        }
        Ok(())
    }
}

/// Drive a session through one full run, writing batches as they arrive.
///
/// Failing to open the reviews panel aborts the run. A missing sort control or
/// review container only degrades it, and a scroll error ends scrolling early
/// while keeping what was already captured.
pub fn run<S, W>(
    session: &mut S,
    settings: &Settings,
    sink: &mut ReviewSink<W>,
) -> ScrapeResult<RunSummary>
where
    S: CaptureSession,
    W: Write,
{
    let dump = match &settings.debug_dir {
        Some(dir) => match PayloadDump::new(dir) {
            Ok(dump) => Some(dump),
            Err(err) => {
                warn!("Payload dump disabled, cannot create {}: {err}", dir.display());
                None
            }
        },
        None => None,
    };
    let mut processor = Processor::new(sink, settings.active_filter()).with_dump(dump);

    if !session.open_reviews()? {
        return Err(ScrapeError::ReviewsPanelNotFound);
    }

    // Responses captured up to here hold the unsorted first page. Anything
    // arriving while the sort is applied belongs to the sorted list.
    let unsorted = session.drain_responses();
    let sorted = session.apply_sort(settings.sort)?;
    processor.summary.sorted = sorted;
    if sorted {
        debug!("Discarded {} responses captured before sorting", unsorted.len());
    } else {
        warn!("Could not switch to {} first, keeping page order", settings.sort.label());
    }
    if !sorted && settings.mode == CaptureMode::Api {
        for captured in &unsorted {
            processor.payload(captured)?;
        }
    }

    if !session.locate_panel()? {
        warn!("Review container not found, falling back to window scrolling");
        processor.summary.window_scroll = true;
    }

    info!(
        "Scrolling {} with {} iterations",
        session.source_name(),
        settings.scroll_iterations
    );
    for step in 0..settings.scroll_iterations {
        if let Err(err) = session.scroll(step) {
            warn!("Scroll {} failed, stopping early: {err:#}", step + 1);
            break;
        }
        debug!("Scrolled {}/{}", step + 1, settings.scroll_iterations);
        if settings.mode == CaptureMode::Api {
            processor.drain(session)?;
        }
    }

    match settings.mode {
        CaptureMode::Api => {
            processor.drain(session)?;
            if processor.summary.payloads > 0 && processor.summary.extracted == 0 {
                warn!(
                    "Captured {} review responses but none yielded reviews",
                    processor.summary.payloads
                );
            } else if processor.summary.payloads == 0 {
                warn!("No review responses were captured");
            }
        }
        CaptureMode::Dom => {
            let html = session.page_html()?;
            let extraction = extract_cards(&html);
            info!(
                "Extracted {} reviews from {} cards",
                extraction.report.extracted, extraction.report.blocks_seen
            );
            processor.write(extraction)?;
        }
    }

    let summary = processor.summary;
    info!(
        "Run finished: {} written, {} filtered out, {} blocks skipped, {} undecodable payloads",
        summary.written,
        summary.extracted - summary.kept,
        summary.skipped_blocks,
        summary.decode_failures
    );
    Ok(summary)
}
