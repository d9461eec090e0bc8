use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::debug;

use crate::error::SinkError;
use crate::models::Review;

pub const CSV_COLUMNS: [&str; 7] = [
    "reviewer_name",
    "reviewer_profile_url",
    "reviewer_profile_pic",
    "stars",
    "text",
    "date",
    "photos",
];

/// Joins photo URLs into a single CSV cell.
pub const PHOTO_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    /// Guess from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Appends and flushes review batches as they arrive. The JSON array is only
/// closed by [`ReviewSink::close`]; a process killed before that leaves an
/// unterminated array behind.
pub struct ReviewSink<W: Write = BufWriter<File>> {
    out: W,
    format: OutputFormat,
    path: Option<PathBuf>,
    written: usize,
}

impl ReviewSink {
    /// Create (truncating) the output file and write the opening framing.
    pub fn open(path: impl AsRef<Path>, format: OutputFormat) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut sink = Self::from_writer(BufWriter::new(file), format)?;
        sink.path = Some(path.to_path_buf());
        Ok(sink)
    }
}

impl<W: Write> ReviewSink<W> {
    pub fn from_writer(mut out: W, format: OutputFormat) -> Result<Self, SinkError> {
        match format {
            OutputFormat::Json => out.write_all(b"[")?,
            OutputFormat::Csv => write_row(&mut out, &CSV_COLUMNS)?,
        }
        out.flush()?;
        Ok(Self {
            out,
            format,
            path: None,
            written: 0,
        })
    }

    /// Append a batch and flush it. Returns how many reviews this batch wrote.
    pub fn write_batch(&mut self, reviews: &[Review]) -> Result<usize, SinkError> {
        for review in reviews {
            match self.format {
                OutputFormat::Json => {
                    // Separator goes before every element except the very first.
                    if self.written > 0 {
                        self.out.write_all(b",")?;
                    }
                    self.out.write_all(b"\n")?;
                    serde_json::to_writer_pretty(&mut self.out, review)?;
                }
                OutputFormat::Csv => write_row(&mut self.out, &csv_cells(review))?,
            }
            self.written += 1;
        }
        self.out.flush()?;
        debug!("Wrote batch of {} reviews ({} total)", reviews.len(), self.written);
        Ok(reviews.len())
    }

    /// Write the closing framing. Returns the total number of reviews written.
    pub fn close(self) -> Result<usize, SinkError> {
        let written = self.written;
        self.finish()?;
        Ok(written)
    }

    /// Write the closing framing and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, SinkError> {
        if self.format == OutputFormat::Json {
            self.out.write_all(b"\n]\n")?;
        }
        self.out.flush()?;
        Ok(self.out)
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Row cells in [`CSV_COLUMNS`] order. Missing values are empty cells.
pub fn csv_cells(review: &Review) -> [String; 7] {
    [
        review.reviewer_name.clone().unwrap_or_default(),
        review.reviewer_profile_url.clone().unwrap_or_default(),
        review.reviewer_profile_pic.clone().unwrap_or_default(),
        review.stars.map(|s| s.to_string()).unwrap_or_default(),
        review.text.clone(),
        review.date.clone().unwrap_or_default(),
        review.photos.join(PHOTO_SEPARATOR),
    ]
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one comma separated row, quoting cells that need it.
pub fn write_row<W: Write, S: AsRef<str>>(mut w: W, row: &[S]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        let cell = cell.as_ref();
        if !first {
            w.write_all(b",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\n")
}
