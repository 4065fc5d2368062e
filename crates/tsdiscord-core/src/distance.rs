//! Distance values, match thresholds, and pluggable distance metrics.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{DiscordError, InvalidArgument};
use crate::series::Window;

/// A non-negative, finite distance between two windows.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    /// Zero distance: a window compared with itself.
    pub const ZERO: Self = Self(0.0);

    /// Create a distance from a raw metric output. `-0.0` is stored as `0.0`
    /// so that every zero distance ties with every other.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::InvalidDistance`] if `value` is NaN, infinite
    /// or negative.
    pub(crate) fn new(value: f64) -> Result<Self, InvalidArgument> {
        if !value.is_finite() || value < 0.0 {
            return Err(InvalidArgument::InvalidDistance { value });
        }
        Ok(Self(value + 0.0))
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }

    /// Return true if this distance is exactly equal to `other`.
    #[must_use]
    pub fn same_as(self, other: Self) -> bool {
        self.total_cmp(&other) == Ordering::Equal
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// Maximum distance at which two windows still count as a match.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f64);

impl Threshold {
    /// Validate a threshold `h`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::InvalidThreshold`] if `h` is not a positive finite number.
    pub fn new(h: f64) -> Result<Self, InvalidArgument> {
        if !h.is_finite() || h <= 0.0 {
            return Err(InvalidArgument::InvalidThreshold { threshold: h });
        }
        Ok(Self(h))
    }

    /// Return the raw threshold value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Return true if `distance` is within this threshold (`d <= h`).
    #[must_use]
    pub fn admits(self, distance: Distance) -> bool {
        distance.value() <= self.0
    }
}

/// Which values of a window a metric compares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Normalization {
    /// Compare raw observations.
    #[default]
    Raw,
    /// Compare each window's z-normalized observations.
    ZNormalized,
}

/// A dissimilarity between two equal-length value vectors.
///
/// Implementors only provide [`measure`](DistanceMetric::measure); window
/// handling, length checks, and normalization come from the provided
/// [`distance`](DistanceMetric::distance). `measure` must be symmetric; a
/// result that is not a finite, non-negative number is rejected as
/// [`InvalidArgument::InvalidDistance`].
pub trait DistanceMetric: Sync {
    /// Compute the distance between two slices of equal length.
    fn measure(&self, a: &[f64], b: &[f64]) -> f64;

    /// Compute the distance between two windows.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InvalidArgument::WindowLengthMismatch`] | The windows differ in length |
    /// | [`InvalidArgument::InvalidDistance`] | `measure` overflowed or returned a negative value |
    fn distance(
        &self,
        a: &Window<'_>,
        b: &Window<'_>,
        mode: Normalization,
    ) -> Result<Distance, DiscordError> {
        if a.len() != b.len() {
            return Err(InvalidArgument::WindowLengthMismatch {
                left: a.len(),
                right: b.len(),
            }
            .into());
        }
        let value = match mode {
            Normalization::Raw => self.measure(a.values(), b.values()),
            Normalization::ZNormalized => self.measure(a.z_normalized(), b.z_normalized()),
        };
        Ok(Distance::new(value)?)
    }
}

/// Euclidean norm of the element-wise difference. The default metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl DistanceMetric for Euclidean {
    #[inline]
    fn measure(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }
}

/// Sum of absolute element-wise differences (L1 norm).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

impl DistanceMetric for Manhattan {
    #[inline]
    fn measure(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }
}
