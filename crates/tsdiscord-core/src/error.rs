//! Error types for series construction and discord detection.

/// Malformed-call conditions detected before or during discord search.
///
/// Every variant names the bound that was violated so the caller can correct
/// the call without inspecting engine internals.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidArgument {
    /// Returned when a series is constructed from zero observations.
    #[error("time series must contain at least one observation")]
    EmptySeries,

    /// Returned when the time and observation sequences differ in length.
    #[error("times and observations must be the same length: {times} times, {values} observations")]
    LengthMismatch {
        /// Number of time values supplied.
        times: usize,
        /// Number of observations supplied.
        values: usize,
    },

    /// Returned when an observation is NaN or infinite.
    #[error("observation at index {index} is not finite ({value})")]
    NonFiniteValue {
        /// Zero-based position of the first offending observation.
        index: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when a search is configured with a window length of zero.
    #[error("window length must be at least 1, got 0")]
    ZeroWindowLength,

    /// Returned when a window length is zero or longer than the series.
    #[error("window length {window_len} must satisfy 1 <= n <= {series_len}")]
    InvalidWindowLength {
        /// Requested window length.
        window_len: usize,
        /// Length of the parent series.
        series_len: usize,
    },

    /// Returned when a window would start before position 1 or run past the series end.
    #[error("window [start={start}, len={window_len}] falls outside series of length {series_len} (requires 1 <= start and start + len - 1 <= {series_len})")]
    WindowOutOfBounds {
        /// Requested 1-based start position.
        start: usize,
        /// Requested window length.
        window_len: usize,
        /// Length of the parent series.
        series_len: usize,
    },

    /// Returned when two windows of different lengths are compared.
    #[error("windows must be the same length to be compared: {left} vs {right}")]
    WindowLengthMismatch {
        /// Length of the first window.
        left: usize,
        /// Length of the second window.
        right: usize,
    },

    /// Returned when a metric yields a value that is not a finite, non-negative
    /// distance, e.g. when squared differences of very large observations overflow.
    #[error("metric returned {value}, expected a finite non-negative distance")]
    InvalidDistance {
        /// The rejected metric output.
        value: f64,
    },

    /// Returned when a match threshold is zero, negative, or not finite.
    #[error("threshold must be a positive finite distance, got {threshold}")]
    InvalidThreshold {
        /// The rejected threshold.
        threshold: f64,
    },
}

/// Errors from discord detection.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiscordError {
    /// The call itself was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    /// No window kept a single qualifying neighbor, so no discord exists.
    #[error(
        "no non-self matches found for any of the {n_windows} windows of length {window_len} \
         (threshold: {}); relax the threshold or shorten the window",
        .threshold.map_or_else(|| "none".to_string(), |h| h.to_string())
    )]
    ThresholdTooStrict {
        /// Threshold in effect, if any.
        threshold: Option<f64>,
        /// Window length searched.
        window_len: usize,
        /// Number of windows in the distance matrix.
        n_windows: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_converts_into_discord_error() {
        let err: DiscordError = InvalidArgument::EmptySeries.into();
        assert!(matches!(
            err,
            DiscordError::InvalidArgument(InvalidArgument::EmptySeries)
        ));
    }

    #[test]
    fn threshold_message_names_the_threshold() {
        let err = DiscordError::ThresholdTooStrict {
            threshold: Some(0.5),
            window_len: 3,
            n_windows: 8,
        };
        let msg = err.to_string();
        assert!(msg.contains("0.5"), "{msg}");
        assert!(msg.contains("8 windows"), "{msg}");
    }

    #[test]
    fn threshold_message_without_threshold() {
        let err = DiscordError::ThresholdTooStrict {
            threshold: None,
            window_len: 6,
            n_windows: 1,
        };
        assert!(err.to_string().contains("threshold: none"));
    }

    #[test]
    fn window_bounds_message_names_the_bound() {
        let err = InvalidArgument::WindowOutOfBounds {
            start: 5,
            window_len: 4,
            series_len: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("start=5"), "{msg}");
        assert!(msg.contains("<= 6"), "{msg}");
    }
}
