//! Masking of self/overlap matches and over-threshold pairs.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::distance::Threshold;
use crate::matrix::{DistanceMatrix, Entry};

impl DistanceMatrix {
    /// Exclude every pair whose distance is strictly greater than `threshold`.
    ///
    /// Commutes with [`mask_self_matches`](Self::mask_self_matches) and is idempotent.
    #[must_use]
    #[instrument(skip(self), fields(n_windows = self.n_windows()))]
    pub fn mask_above(mut self, threshold: Threshold) -> Self {
        let before = self.excluded_count();
        self.par_rows_mut().for_each(|row| {
            for entry in row.iter_mut() {
                if let Entry::Valid(d) = *entry
                    && !threshold.admits(d)
                {
                    *entry = Entry::Excluded;
                }
            }
        });
        self.set_threshold(threshold);
        debug!(masked = self.excluded_count() - before, "over-threshold pairs excluded");
        self
    }

    /// Exclude every pair of windows whose offsets satisfy `|i - j| <= n`.
    ///
    /// Covers the diagonal and every overlapping pair, plus adjacent windows
    /// starting exactly `n` apart. Idempotent.
    #[must_use]
    #[instrument(skip(self), fields(n_windows = self.n_windows()))]
    pub fn mask_self_matches(mut self) -> Self {
        let n = self.window_len();
        let before = self.excluded_count();
        self.par_rows_mut().enumerate().for_each(|(i, row)| {
            let lo = i.saturating_sub(n);
            let hi = (i + n + 1).min(row.len());
            row[lo..hi].fill(Entry::Excluded);
        });
        debug!(masked = self.excluded_count() - before, "self and overlap matches excluded");
        self
    }

    /// Mark the last column of each fully excluded row as [`Entry::NoNeighbor`].
    ///
    /// Afterwards every row has at least one non-excluded cell, so a row-wise
    /// minimum is always defined, and a row with no qualifying match is
    /// recognizable by its minimum being `NoNeighbor`.
    #[must_use]
    #[instrument(skip(self), fields(n_windows = self.n_windows()))]
    pub fn mark_unmatched_rows(mut self) -> Self {
        let unmatched: usize = self
            .par_rows_mut()
            .map(|row| {
                if row.iter().all(|e| e.is_excluded()) {
                    if let Some(last) = row.last_mut() {
                        *last = Entry::NoNeighbor;
                    }
                    1
                } else {
                    0
                }
            })
            .sum();
        debug!(unmatched, "rows without a qualifying neighbor marked");
        self
    }
}

/// The fixed masking sequence applied between building and resolving.
///
/// Applies the optional threshold mask, then the self/overlap mask, then
/// no-neighbor marking. The two masks commute; marking must come last.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchFilter {
    threshold: Option<Threshold>,
}

impl MatchFilter {
    /// Create a filter with no threshold: only self/overlap matches are excluded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also exclude pairs farther apart than `threshold`.
    #[must_use]
    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Return the threshold, if any.
    #[must_use]
    pub fn threshold(&self) -> Option<Threshold> {
        self.threshold
    }

    /// Run all masking stages over `matrix`.
    #[must_use]
    pub fn apply(&self, matrix: DistanceMatrix) -> DistanceMatrix {
        let matrix = match self.threshold {
            Some(h) => matrix.mask_above(h),
            None => matrix,
        };
        matrix.mask_self_matches().mark_unmatched_rows()
    }
}
