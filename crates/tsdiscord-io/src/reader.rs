//! CSV series reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use tsdiscord_core::Series;

use crate::IoError;
use crate::domain::ColumnLayout;

/// Reads a single time series from a CSV file.
///
/// Expected CSV format (header row required):
/// - `value` — one observation per row; times are the 1-based row positions
/// - `time,value` — explicit time stamp and observation per row
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::UnsupportedColumns`] | Header has neither 1 nor 2 columns |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::Series`] | Parsed columns rejected by [`Series::new`] |
pub struct SeriesReader {
    path: PathBuf,
}

impl SeriesReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`Series`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Series, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that our own InconsistentRowLength check fires
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let layout =
            ColumnLayout::from_width(header.len()).ok_or_else(|| IoError::UnsupportedColumns {
                path: self.path.clone(),
                got: header.len(),
            })?;
        debug!(?layout, "read CSV header");

        let mut times = Vec::new();
        let mut values = Vec::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != layout.width() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: layout.width(),
                    got: record.len(),
                });
            }

            match layout {
                ColumnLayout::ValuesOnly => {
                    times.push((row_index + 1) as f64);
                    values.push(self.parse_cell(&record, row_index, 0)?);
                }
                ColumnLayout::TimeAndValue => {
                    times.push(self.parse_cell(&record, row_index, 0)?);
                    values.push(self.parse_cell(&record, row_index, 1)?);
                }
            }
        }

        if values.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let series = Series::new(times, values).map_err(|e| IoError::Series {
            path: self.path.clone(),
            source: e,
        })?;

        info!(n_observations = series.len(), "series loaded");
        Ok(series)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn parse_cell(
        &self,
        record: &csv::StringRecord,
        row_index: usize,
        col_index: usize,
    ) -> Result<f64, IoError> {
        let raw = record.get(col_index).unwrap_or("");
        let non_finite = || IoError::NonFiniteValue {
            path: self.path.clone(),
            row_index,
            col_index,
            raw: raw.to_string(),
        };
        let value: f64 = raw.parse().map_err(|_| non_finite())?;
        if !value.is_finite() {
            return Err(non_finite());
        }
        Ok(value)
    }
}
