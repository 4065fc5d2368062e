//! All-pairs window distance matrix.

use std::slice::ChunksExact;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::distance::{Distance, DistanceMetric, Threshold};
use crate::error::DiscordError;
use crate::series::Series;

/// One cell of a [`DistanceMatrix`].
///
/// Replaces numeric sentinels: an excluded pair and a row with no neighbor are
/// distinct states that can never be confused with a finite distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry {
    /// A qualifying distance between two windows.
    Valid(Distance),
    /// Masked out: a self/overlap match or a pair beyond the threshold.
    Excluded,
    /// Marks a row in which no window qualified as a match. Orders below every distance.
    NoNeighbor,
}

impl Entry {
    /// Return the distance for [`Entry::Valid`], `None` otherwise.
    #[must_use]
    pub fn distance(self) -> Option<Distance> {
        match self {
            Self::Valid(d) => Some(d),
            Self::Excluded | Self::NoNeighbor => None,
        }
    }

    /// Return true for [`Entry::Excluded`].
    #[must_use]
    pub fn is_excluded(self) -> bool {
        matches!(self, Self::Excluded)
    }

    /// Return true for [`Entry::NoNeighbor`].
    #[must_use]
    pub fn is_no_neighbor(self) -> bool {
        matches!(self, Self::NoNeighbor)
    }

    /// Numeric encoding: the distance, `NaN` when excluded, `-inf` for no neighbor.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Valid(d) => d.value(),
            Self::Excluded => f64::NAN,
            Self::NoNeighbor => f64::NEG_INFINITY,
        }
    }
}

/// Square matrix of distances between every pair of windows of one length.
///
/// Entry `(i, j)` holds the distance between the windows at zero-based offsets
/// `i` and `j`. The matrix is built once by [`DistanceMatrix::build`] and then
/// handed through the masking stages, each of which takes ownership and
/// returns the transformed matrix.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n_windows: usize,
    window_len: usize,
    threshold: Option<Threshold>,
    entries: Vec<Entry>,
}

impl DistanceMatrix {
    /// The matrix path compares raw values only; z-normalized comparison is
    /// available through the scalar path in [`crate::reference`].
    pub const SUPPORTS_NORMALIZATION: bool = false;

    /// Compute the distance between every pair of windows of length `window_len`.
    ///
    /// The strict upper triangle is computed in parallel over rows with rayon
    /// and mirrored, so `get(i, j) == get(j, i)` holds exactly and the diagonal
    /// is exactly zero whatever the metric.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InvalidWindowLength`](crate::InvalidArgument::InvalidWindowLength) | `window_len` is zero or exceeds the series length |
    /// | [`InvalidDistance`](crate::InvalidArgument::InvalidDistance) | The metric overflowed or returned a negative value |
    #[instrument(skip(series, metric), fields(series_len = series.len()))]
    pub fn build<M>(series: &Series, window_len: usize, metric: &M) -> Result<Self, DiscordError>
    where
        M: DistanceMetric + ?Sized,
    {
        let n = series.window_count(window_len)?;
        let values = series.values();
        let windows: Vec<&[f64]> = (0..n).map(|i| &values[i..i + window_len]).collect();

        let upper: Vec<Vec<Distance>> = (0..n)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..n)
                    .map(|j| Distance::new(metric.measure(windows[i], windows[j])))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<_, _>>()?;

        let mut entries = vec![Entry::Valid(Distance::ZERO); n * n];
        for (i, row) in upper.into_iter().enumerate() {
            for (k, d) in row.into_iter().enumerate() {
                let j = i + 1 + k;
                let entry = Entry::Valid(d);
                entries[i * n + j] = entry;
                entries[j * n + i] = entry;
            }
        }

        debug!(n_windows = n, cells = n * n, "distance matrix built");
        Ok(Self {
            n_windows: n,
            window_len,
            threshold: None,
            entries,
        })
    }

    /// Return the number of windows, i.e. the side length `m - n + 1`.
    #[must_use]
    pub fn n_windows(&self) -> usize {
        self.n_windows
    }

    /// Return the window length `n` the matrix was built for.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Return the threshold applied by [`mask_above`](Self::mask_above), if any.
    #[must_use]
    pub fn threshold(&self) -> Option<Threshold> {
        self.threshold
    }

    /// Return the entry at row `i`, column `j`.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is not below [`n_windows`](Self::n_windows).
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> Entry {
        assert!(
            i < self.n_windows && j < self.n_windows,
            "index ({i}, {j}) out of bounds for matrix of size {}",
            self.n_windows
        );
        self.entries[i * self.n_windows + j]
    }

    /// Return row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not below [`n_windows`](Self::n_windows).
    #[must_use]
    pub fn row(&self, i: usize) -> &[Entry] {
        let start = i * self.n_windows;
        &self.entries[start..start + self.n_windows]
    }

    /// Iterate over rows in order.
    pub fn rows(&self) -> ChunksExact<'_, Entry> {
        self.entries.chunks_exact(self.n_windows)
    }

    /// Return the number of excluded cells.
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_excluded()).count()
    }

    pub(crate) fn set_threshold(&mut self, threshold: Threshold) {
        self.threshold = Some(match self.threshold {
            Some(current) if current.value() < threshold.value() => current,
            _ => threshold,
        });
    }

    pub(crate) fn par_rows_mut(&mut self) -> rayon::slice::ChunksExactMut<'_, Entry> {
        let n = self.n_windows;
        self.entries.par_chunks_exact_mut(n)
    }
}
