//! Time series and fixed-length window types with validation guarantees.

use std::cell::OnceCell;
use std::ops::Index;

use crate::error::InvalidArgument;

/// Owned, validated time series.
///
/// Guaranteed non-empty, with one time value per observation and every
/// observation finite. Time values are carried for display only; the engine
/// never reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    times: Vec<f64>,
    values: Vec<f64>,
    mean: f64,
    stdev: f64,
}

impl Series {
    /// Create a new series from paired times and observations.
    ///
    /// Mean and (population) standard deviation are computed once here.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InvalidArgument::LengthMismatch`] | `times.len() != values.len()` |
    /// | [`InvalidArgument::EmptySeries`] | `values` is empty |
    /// | [`InvalidArgument::NonFiniteValue`] | Any observation is NaN or infinite |
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self, InvalidArgument> {
        if times.len() != values.len() {
            return Err(InvalidArgument::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        if values.is_empty() {
            return Err(InvalidArgument::EmptySeries);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(InvalidArgument::NonFiniteValue {
                index,
                value: values[index],
            });
        }
        let (mean, stdev) = mean_and_stdev(&values);
        Ok(Self {
            times,
            values,
            mean,
            stdev,
        })
    }

    /// Create a series whose times are the 1-based positions `1, 2, ..., m`.
    ///
    /// # Errors
    ///
    /// Same as [`Series::new`], minus the length mismatch.
    pub fn from_values(values: Vec<f64>) -> Result<Self, InvalidArgument> {
        let times = (1..=values.len()).map(|t| t as f64).collect();
        Self::new(times, values)
    }

    /// Return the number of observations `m`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return true if the series has no observations.
    ///
    /// Always `false` for a constructed [`Series`]; provided for the
    /// `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return the observations.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the time values.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Return the mean of all observations.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Return the population standard deviation of all observations.
    #[must_use]
    pub fn stdev(&self) -> f64 {
        self.stdev
    }

    /// Return the number of windows of length `window_len`, i.e. `m - n + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::InvalidWindowLength`] unless `1 <= window_len <= m`.
    pub fn window_count(&self, window_len: usize) -> Result<usize, InvalidArgument> {
        if window_len == 0 || window_len > self.len() {
            return Err(InvalidArgument::InvalidWindowLength {
                window_len,
                series_len: self.len(),
            });
        }
        Ok(self.len() - window_len + 1)
    }

    /// Borrow the window starting at 1-based `start` with length `len`.
    ///
    /// # Errors
    ///
    /// See [`Window::new`].
    pub fn window(&self, start: usize, len: usize) -> Result<Window<'_>, InvalidArgument> {
        Window::new(self, start, len)
    }

    /// Iterate over every window of length `window_len`, in start order.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::InvalidWindowLength`] unless `1 <= window_len <= m`.
    pub fn windows(
        &self,
        window_len: usize,
    ) -> Result<impl ExactSizeIterator<Item = Window<'_>> + '_, InvalidArgument> {
        let count = self.window_count(window_len)?;
        Ok((1..count + 1).map(move |start| Window::new_unchecked(self, start, window_len)))
    }
}

impl Index<usize> for Series {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl AsRef<[f64]> for Series {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

/// A fixed-length subsequence of a [`Series`].
///
/// Holds a borrowed reference to its parent plus a 1-based `start` and a
/// length. Its mean and standard deviation come from its own slice, not the
/// parent's. The z-normalized form is computed on first request and cached.
#[derive(Debug, Clone)]
pub struct Window<'a> {
    parent: &'a Series,
    start: usize,
    len: usize,
    mean: f64,
    stdev: f64,
    z_norm: OnceCell<Vec<f64>>,
}

impl<'a> Window<'a> {
    /// Create a window over `parent` starting at 1-based `start`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InvalidArgument::InvalidWindowLength`] | `len` is zero or exceeds the series length |
    /// | [`InvalidArgument::WindowOutOfBounds`] | `start == 0` or `start > m - len + 1` |
    pub fn new(parent: &'a Series, start: usize, len: usize) -> Result<Self, InvalidArgument> {
        let last_start = parent.window_count(len)?;
        if start == 0 || start > last_start {
            return Err(InvalidArgument::WindowOutOfBounds {
                start,
                window_len: len,
                series_len: parent.len(),
            });
        }
        Ok(Self::new_unchecked(parent, start, len))
    }

    /// Create a window without bounds checks. For internal use where bounds are known.
    pub(crate) fn new_unchecked(parent: &'a Series, start: usize, len: usize) -> Self {
        debug_assert!(start >= 1 && start + len - 1 <= parent.len());
        let (mean, stdev) = mean_and_stdev(&parent.values[start - 1..start - 1 + len]);
        Self {
            parent,
            start,
            len,
            mean,
            stdev,
            z_norm: OnceCell::new(),
        }
    }

    /// Return the parent series.
    #[must_use]
    pub fn parent(&self) -> &'a Series {
        self.parent
    }

    /// Return the 1-based start position.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Return the position one past the last element, `start + len`.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Return the zero-based offset of the first element, `start - 1`.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.start - 1
    }

    /// Return the window length `n`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always `false`: windows have length at least one.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Return the raw observations covered by this window.
    #[must_use]
    pub fn values(&self) -> &'a [f64] {
        &self.parent.values[self.offset()..self.offset() + self.len]
    }

    /// Return the time values covered by this window.
    #[must_use]
    pub fn times(&self) -> &'a [f64] {
        &self.parent.times[self.offset()..self.offset() + self.len]
    }

    /// Return the mean of this window's own observations.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Return the population standard deviation of this window's observations.
    #[must_use]
    pub fn stdev(&self) -> f64 {
        self.stdev
    }

    /// Return `(value - mean) / stdev` for each observation, computed once.
    ///
    /// A constant window (zero standard deviation) normalizes to all zeros.
    #[must_use]
    pub fn z_normalized(&self) -> &[f64] {
        self.z_norm.get_or_init(|| {
            if self.stdev == 0.0 {
                return vec![0.0; self.len];
            }
            self.values()
                .iter()
                .map(|&x| (x - self.mean) / self.stdev)
                .collect()
        })
    }
}

impl PartialEq for Window<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.parent, other.parent) && self.start == other.start && self.len == other.len
    }
}

fn mean_and_stdev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
