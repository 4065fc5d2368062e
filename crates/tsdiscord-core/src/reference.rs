//! Scalar, one-pair-at-a-time match checks.
//!
//! Slow, but supports z-normalized comparison, which the matrix path does not.
//! Useful for cross-checking the matrix path on small inputs.
//!
//! Windows here are non-overlapping when their starts differ by at least the
//! window length, so windows exactly `n` apart qualify. The matrix path
//! excludes those as well (`|i - j| <= n`); the two rules differ by one
//! position.

use tracing::{debug, instrument};

use crate::distance::{DistanceMetric, Normalization, Threshold};
use crate::error::{DiscordError, InvalidArgument};
use crate::series::Window;

/// Return true if `a` and `b` are a non-self match.
///
/// The windows must not overlap (`|a.start - b.start| >= n`) and, when a
/// threshold is given, their distance must be at most `h`.
///
/// # Errors
///
/// Returns [`InvalidArgument::WindowLengthMismatch`] if the windows differ in length.
pub fn is_non_self_match<M>(
    a: &Window<'_>,
    b: &Window<'_>,
    threshold: Option<Threshold>,
    metric: &M,
    mode: Normalization,
) -> Result<bool, DiscordError>
where
    M: DistanceMetric + ?Sized,
{
    if a.len() != b.len() {
        return Err(InvalidArgument::WindowLengthMismatch {
            left: a.len(),
            right: b.len(),
        }
        .into());
    }
    if a.start().abs_diff(b.start()) < a.len() {
        return Ok(false);
    }
    let distance = metric.distance(a, b, mode)?;
    Ok(threshold.is_none_or(|h| h.admits(distance)))
}

/// Find every window of the same parent and length that is a non-self match for `window`.
///
/// Candidates are returned in start order.
///
/// # Errors
///
/// Propagates errors from [`is_non_self_match`].
#[instrument(skip(window, metric), fields(start = window.start(), len = window.len()))]
pub fn find_non_self_matches<'a, M>(
    window: &Window<'a>,
    threshold: Option<Threshold>,
    metric: &M,
    mode: Normalization,
) -> Result<Vec<Window<'a>>, DiscordError>
where
    M: DistanceMetric + ?Sized,
{
    let mut matches = Vec::new();
    for candidate in window.parent().windows(window.len())? {
        if is_non_self_match(window, &candidate, threshold, metric, mode)? {
            matches.push(candidate);
        }
    }
    debug!(n_matches = matches.len(), "non-self matches found");
    Ok(matches)
}
