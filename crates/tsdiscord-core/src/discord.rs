//! Discord selection and the high-level search configuration.

use tracing::{info, instrument};

use crate::distance::{Distance, DistanceMetric, Euclidean, Threshold};
use crate::error::{DiscordError, InvalidArgument};
use crate::filter::MatchFilter;
use crate::matrix::DistanceMatrix;
use crate::neighbor::{NearestNeighbors, NeighborDistance};
use crate::series::{Series, Window};

/// Result of a discord search.
#[derive(Debug, Clone)]
pub struct Discords<'a> {
    /// Every window whose nearest-neighbor distance equals the score, in start order.
    pub windows: Vec<Window<'a>>,
    /// The largest nearest-neighbor distance over all windows.
    pub score: Distance,
    /// Nearest-neighbor distance of every window, indexed by zero-based offset.
    pub profile: Vec<NeighborDistance>,
    /// Window length searched.
    pub window_len: usize,
    /// Threshold in effect, if any.
    pub threshold: Option<Threshold>,
}

impl Discords<'_> {
    /// Return the 1-based start positions of the discords.
    #[must_use]
    pub fn starts(&self) -> Vec<usize> {
        self.windows.iter().map(Window::start).collect()
    }

    /// Return the number of discords (more than one on ties).
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Return true if there are no discords. Never true for a successful search.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Select the windows whose nearest neighbor is farthest away.
///
/// `matrix` must have been passed through [`MatchFilter::apply`] and
/// `neighbors` resolved from it. Every row with a marked nearest-neighbor cell
/// equal to the maximum nearest-neighbor distance is a discord; ties are all
/// returned, in ascending start order.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DiscordError::ThresholdTooStrict`] | No window has any qualifying neighbor |
/// | [`DiscordError::InvalidArgument`] | `matrix` was not built from `series` |
pub fn select_discords<'a>(
    series: &'a Series,
    matrix: &DistanceMatrix,
    neighbors: &NearestNeighbors,
) -> Result<Discords<'a>, DiscordError> {
    let n_windows = matrix.n_windows();
    let window_len = matrix.window_len();
    let expected = series.window_count(window_len)?;
    if expected != n_windows || neighbors.len() != n_windows {
        return Err(InvalidArgument::InvalidWindowLength {
            window_len,
            series_len: series.len(),
        }
        .into());
    }

    let best = neighbors
        .profile()
        .iter()
        .copied()
        .max_by(NeighborDistance::total_cmp)
        .unwrap_or(NeighborDistance::Unmatched);

    let NeighborDistance::Found(score) = best else {
        return Err(DiscordError::ThresholdTooStrict {
            threshold: matrix.threshold().map(Threshold::value),
            window_len,
            n_windows,
        });
    };

    let windows = (0..n_windows)
        .filter(|&i| {
            neighbors.nearest_columns(i).any(|j| {
                matrix
                    .get(i, j)
                    .distance()
                    .is_some_and(|d| d.same_as(score))
            })
        })
        .map(|i| series.window(i + 1, window_len))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Discords {
        windows,
        score,
        profile: neighbors.profile().to_vec(),
        window_len,
        threshold: matrix.threshold(),
    })
}

/// Configuration for a discord search.
///
/// Construct via [`DiscordConfig::new`], then chain `with_*` methods to override defaults.
///
/// # Defaults
///
/// | Parameter   | Default        |
/// |-------------|----------------|
/// | `threshold` | none           |
/// | metric      | [`Euclidean`]  |
///
/// # Examples
///
/// ```
/// use tsdiscord_core::{DiscordConfig, Series};
///
/// let ts = Series::from_values(vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 1.0, 2.0, 3.0, 20.0])?;
/// let discords = DiscordConfig::new(3)?.find(&ts)?;
/// assert_eq!(discords.starts(), vec![5]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscordConfig {
    window_len: usize,
    threshold: Option<Threshold>,
}

impl DiscordConfig {
    /// Create a configuration for windows of length `window_len`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InvalidArgument::ZeroWindowLength`] | `window_len` is zero |
    pub fn new(window_len: usize) -> Result<Self, InvalidArgument> {
        if window_len == 0 {
            return Err(InvalidArgument::ZeroWindowLength);
        }
        Ok(Self {
            window_len,
            threshold: None,
        })
    }

    /// Only count pairs within `threshold` of each other as matches.
    #[must_use]
    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Return the window length.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Return the match threshold, if any.
    #[must_use]
    pub fn threshold(&self) -> Option<Threshold> {
        self.threshold
    }

    /// Find the discords of `series` using Euclidean distance on raw values.
    ///
    /// # Errors
    ///
    /// See [`find_with`](Self::find_with).
    pub fn find<'a>(&self, series: &'a Series) -> Result<Discords<'a>, DiscordError> {
        self.find_with(series, &Euclidean)
    }

    /// Find the discords of `series` using `metric` on raw values.
    ///
    /// Runs build, filter, resolve and select in that order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DiscordError::InvalidArgument`] | The window length exceeds the series length |
    /// | [`DiscordError::ThresholdTooStrict`] | No window has any qualifying neighbor |
    #[instrument(skip(self, series, metric), fields(series_len = series.len(), window_len = self.window_len))]
    pub fn find_with<'a, M>(
        &self,
        series: &'a Series,
        metric: &M,
    ) -> Result<Discords<'a>, DiscordError>
    where
        M: DistanceMetric + ?Sized,
    {
        let mut filter = MatchFilter::new();
        if let Some(h) = self.threshold {
            filter = filter.with_threshold(h);
        }

        let matrix = filter.apply(DistanceMatrix::build(series, self.window_len, metric)?);
        let neighbors = NearestNeighbors::resolve(&matrix);
        let discords = select_discords(series, &matrix, &neighbors)?;

        info!(
            n_discords = discords.len(),
            score = discords.score.value(),
            "discord search complete"
        );
        Ok(discords)
    }
}

/// Find the discords of `series` for windows of length `window_len`.
///
/// One-call form of [`DiscordConfig`] with Euclidean distance on raw values.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`DiscordError::InvalidArgument`] | Bad window length or threshold |
/// | [`DiscordError::ThresholdTooStrict`] | No window has any qualifying neighbor |
pub fn find_discords(
    series: &Series,
    window_len: usize,
    threshold: Option<f64>,
) -> Result<Vec<Window<'_>>, DiscordError> {
    let mut config = DiscordConfig::new(window_len)?;
    if let Some(h) = threshold {
        config = config.with_threshold(Threshold::new(h)?);
    }
    Ok(config.find(series)?.windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Manhattan;

    fn series(values: Vec<f64>) -> Series {
        Series::from_values(values).unwrap()
    }

    #[test]
    fn finds_isolated_window() {
        let ts = series(vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 1.0, 2.0, 3.0, 20.0]);
        let d = DiscordConfig::new(3).unwrap().find(&ts).unwrap();
        assert_eq!(d.starts(), vec![5]);
        assert!((d.score.value() - 204.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(d.windows[0].values(), &[11.0, 12.0, 1.0]);
        assert_eq!(d.windows[0].end(), 8);
        assert_eq!(d.profile.len(), 8);
        assert_eq!(d.window_len, 3);
        assert_eq!(d.threshold, None);
    }

    #[test]
    fn constant_series_returns_every_matched_window() {
        let ts = series(vec![0.0; 6]);
        let d = DiscordConfig::new(2).unwrap().find(&ts).unwrap();
        // offset 2 has no window more than 2 positions away
        assert_eq!(d.starts(), vec![1, 2, 4, 5]);
        assert_eq!(d.score, Distance::ZERO);
        assert!(d.profile[2].is_unmatched());

        let d = DiscordConfig::new(1).unwrap().find(&ts).unwrap();
        assert_eq!(d.starts(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn single_window_is_too_strict() {
        let ts = series(vec![1.0, 2.0, 3.0, 4.0]);
        let result = DiscordConfig::new(4).unwrap().find(&ts);
        assert!(matches!(
            result,
            Err(DiscordError::ThresholdTooStrict {
                threshold: None,
                window_len: 4,
                n_windows: 1
            })
        ));
    }

    #[test]
    fn strict_threshold_is_too_strict() {
        let ts = series(vec![1.0, 5.0, 2.0, 8.0, 3.0, 9.0, 4.0]);
        let h = Threshold::new(0.5).unwrap();
        let result = DiscordConfig::new(2).unwrap().with_threshold(h).find(&ts);
        assert!(matches!(
            result,
            Err(DiscordError::ThresholdTooStrict {
                threshold: Some(t),
                ..
            }) if t == 0.5
        ));
    }

    #[test]
    fn threshold_changes_the_discord() {
        // nearest neighbors without threshold: row 4 = sqrt(204) is the maximum
        let ts = series(vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 1.0, 2.0, 3.0, 20.0]);
        let h = Threshold::new(12.0).unwrap();
        let d = DiscordConfig::new(3).unwrap().with_threshold(h).find(&ts).unwrap();
        // rows 3 (sqrt 192) and 4 (sqrt 204) lose every match; row 2 keeps sqrt(131)
        assert!(d.profile[3].is_unmatched());
        assert!(d.profile[4].is_unmatched());
        assert_eq!(d.starts(), vec![3]);
        assert!((d.score.value() - 131.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(d.threshold, Some(h));
    }

    #[test]
    fn pluggable_metric() {
        let ts = series(vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 1.0, 2.0, 3.0, 20.0]);
        let d = DiscordConfig::new(3)
            .unwrap()
            .find_with(&ts, &Manhattan)
            .unwrap();
        // L1 ranks differently: row 3 (only (3,7) = 8+8+8 = 24) beats row 4 ((4,0) = 22)
        assert_eq!(d.starts(), vec![4]);
        assert!((d.score.value() - 24.0).abs() < 1e-12);
    }

    #[test]
    fn config_rejects_zero_window() {
        assert!(matches!(
            DiscordConfig::new(0),
            Err(InvalidArgument::ZeroWindowLength)
        ));
        let msg = InvalidArgument::ZeroWindowLength.to_string();
        assert!(msg.contains("at least 1"), "{msg}");
    }

    #[test]
    fn overflowing_metric_is_an_error_not_a_score() {
        let ts = series(vec![1e200, -1e200, 0.0, 1e200, 5.0, -1e200, 2.0, 3.0]);
        let result = DiscordConfig::new(1).unwrap().find(&ts);
        assert!(matches!(
            result,
            Err(DiscordError::InvalidArgument(
                InvalidArgument::InvalidDistance { .. }
            ))
        ));
    }

    /// Returns `-0.0` for identical slices.
    struct SignedZero;

    impl DistanceMetric for SignedZero {
        fn measure(&self, a: &[f64], b: &[f64]) -> f64 {
            if a == b { -0.0 } else { Euclidean.measure(a, b) }
        }
    }

    #[test]
    fn negative_zero_distances_still_tie() {
        let ts = series(vec![0.0; 6]);
        let d = DiscordConfig::new(1).unwrap().find_with(&ts, &SignedZero).unwrap();
        assert!(d.score.value().is_sign_positive());
        assert_eq!(d.starts(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn window_longer_than_series() {
        let ts = series(vec![1.0, 2.0]);
        let result = DiscordConfig::new(3).unwrap().find(&ts);
        assert!(matches!(
            result,
            Err(DiscordError::InvalidArgument(
                InvalidArgument::InvalidWindowLength {
                    window_len: 3,
                    series_len: 2
                }
            ))
        ));
    }

    #[test]
    fn find_discords_free_function() {
        let ts = series(vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 1.0, 2.0, 3.0, 20.0]);
        let windows = find_discords(&ts, 3, None).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start(), 5);
        assert!(matches!(
            find_discords(&ts, 3, Some(-1.0)),
            Err(DiscordError::InvalidArgument(
                InvalidArgument::InvalidThreshold { .. }
            ))
        ));
    }

    #[test]
    fn select_rejects_matrix_from_other_series() {
        let a = series(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = series(vec![1.0, 2.0, 3.0, 4.0]);
        let matrix = MatchFilter::new().apply(DistanceMatrix::build(&a, 2, &Euclidean).unwrap());
        let nn = NearestNeighbors::resolve(&matrix);
        assert!(matches!(
            select_discords(&b, &matrix, &nn),
            Err(DiscordError::InvalidArgument(_))
        ));
    }
}
