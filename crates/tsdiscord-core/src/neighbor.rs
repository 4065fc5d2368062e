//! Per-window nearest-neighbor resolution over a filtered distance matrix.

use std::cmp::Ordering;
use std::fmt;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::distance::Distance;
use crate::matrix::{DistanceMatrix, Entry};

/// Distance from a window to its best qualifying match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeighborDistance {
    /// Distance to the nearest non-self, threshold-qualifying window.
    Found(Distance),
    /// No window qualified as a match.
    Unmatched,
}

impl NeighborDistance {
    /// Return the distance if a neighbor was found.
    #[must_use]
    pub fn distance(self) -> Option<Distance> {
        match self {
            Self::Found(d) => Some(d),
            Self::Unmatched => None,
        }
    }

    /// Return true if no neighbor was found.
    #[must_use]
    pub fn is_unmatched(self) -> bool {
        matches!(self, Self::Unmatched)
    }

    /// Total ordering in which `Unmatched` sorts below every distance.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Unmatched, Self::Unmatched) => Ordering::Equal,
            (Self::Unmatched, Self::Found(_)) => Ordering::Less,
            (Self::Found(_), Self::Unmatched) => Ordering::Greater,
            (Self::Found(a), Self::Found(b)) => a.total_cmp(b),
        }
    }

    /// Return true if `entry` holds exactly this value.
    fn attained_by(self, entry: Entry) -> bool {
        match self {
            Self::Found(d) => entry.distance().is_some_and(|e| e.same_as(d)),
            Self::Unmatched => entry.is_no_neighbor(),
        }
    }
}

impl fmt::Display for NeighborDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(d) => fmt::Display::fmt(d, f),
            Self::Unmatched => f.write_str("unmatched"),
        }
    }
}

/// Row minima of a filtered distance matrix, with every column attaining them.
#[derive(Debug, Clone)]
pub struct NearestNeighbors {
    n_windows: usize,
    distances: Vec<NeighborDistance>,
    nearest: Vec<bool>,
}

impl NearestNeighbors {
    /// Resolve the nearest neighbor of every window.
    ///
    /// Excluded cells are ignored. A [`Entry::NoNeighbor`] cell makes the row
    /// [`NeighborDistance::Unmatched`]. Ties are kept: every column equal to
    /// the row minimum is marked. A row with only excluded cells (the
    /// no-neighbor marking stage was skipped) resolves to `Unmatched` with no
    /// marked columns.
    #[must_use]
    #[instrument(skip(matrix), fields(n_windows = matrix.n_windows()))]
    pub fn resolve(matrix: &DistanceMatrix) -> Self {
        let n = matrix.n_windows();
        let rows: Vec<(NeighborDistance, Vec<bool>)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let row = matrix.row(i);
                let min = row_minimum(row);
                let marks = match min {
                    Some(m) => row.iter().map(|&e| m.attained_by(e)).collect(),
                    None => vec![false; n],
                };
                (min.unwrap_or(NeighborDistance::Unmatched), marks)
            })
            .collect();

        let mut distances = Vec::with_capacity(n);
        let mut nearest = Vec::with_capacity(n * n);
        for (d, marks) in rows {
            distances.push(d);
            nearest.extend(marks);
        }

        debug!(
            unmatched = distances.iter().filter(|d| d.is_unmatched()).count(),
            "nearest neighbors resolved"
        );
        Self {
            n_windows: n,
            distances,
            nearest,
        }
    }

    /// Return the number of windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n_windows
    }

    /// Return true if there are no windows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_windows == 0
    }

    /// Return the nearest-neighbor distance of window `i`.
    #[must_use]
    pub fn distance(&self, i: usize) -> NeighborDistance {
        self.distances[i]
    }

    /// Return the nearest-neighbor distance of every window, in offset order.
    #[must_use]
    pub fn profile(&self) -> &[NeighborDistance] {
        &self.distances
    }

    /// Return true if column `j` attains the minimum of row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of bounds.
    #[must_use]
    pub fn is_nearest(&self, i: usize, j: usize) -> bool {
        assert!(
            i < self.n_windows && j < self.n_windows,
            "index ({i}, {j}) out of bounds for {} windows",
            self.n_windows
        );
        self.nearest[i * self.n_windows + j]
    }

    /// Iterate over the columns attaining the minimum of row `i`.
    pub fn nearest_columns(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
        let start = i * self.n_windows;
        self.nearest[start..start + self.n_windows]
            .iter()
            .enumerate()
            .filter_map(|(j, &marked)| marked.then_some(j))
    }
}

fn row_minimum(row: &[Entry]) -> Option<NeighborDistance> {
    row.iter()
        .filter_map(|&e| match e {
            Entry::Valid(d) => Some(NeighborDistance::Found(d)),
            Entry::NoNeighbor => Some(NeighborDistance::Unmatched),
            Entry::Excluded => None,
        })
        .min_by(NeighborDistance::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{Euclidean, Threshold};
    use crate::filter::MatchFilter;
    use crate::series::Series;

    fn filtered(values: Vec<f64>, n: usize, h: Option<f64>) -> DistanceMatrix {
        let ts = Series::from_values(values).unwrap();
        let mut filter = MatchFilter::new();
        if let Some(h) = h {
            filter = filter.with_threshold(Threshold::new(h).unwrap());
        }
        filter.apply(DistanceMatrix::build(&ts, n, &Euclidean).unwrap())
    }

    #[test]
    fn unmatched_sorts_below_distances() {
        let found = NeighborDistance::Found(Distance::ZERO);
        assert_eq!(
            NeighborDistance::Unmatched.total_cmp(&found),
            Ordering::Less
        );
        assert_eq!(found.total_cmp(&NeighborDistance::Unmatched), Ordering::Greater);
    }

    #[test]
    fn row_minimum_ignores_excluded() {
        // windows [0], [5], [1], [9]; n=1 keeps |i-j| >= 2
        let d = filtered(vec![0.0, 5.0, 1.0, 9.0], 1, None);
        let nn = NearestNeighbors::resolve(&d);
        // row 0: candidates (0,2)=1, (0,3)=9
        assert_eq!(nn.distance(0).distance().map(Distance::value), Some(1.0));
        assert!(nn.is_nearest(0, 2));
        assert!(!nn.is_nearest(0, 3));
        assert!(!nn.is_nearest(0, 0));
        // row 1: candidate (1,3)=4
        assert_eq!(nn.distance(1).distance().map(Distance::value), Some(4.0));
        assert_eq!(nn.nearest_columns(1).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn ties_mark_every_column() {
        // windows [2], [0], [0], [2], [4], [4]; n=1
        // row 0 candidates: cols 2..=5 -> [2, 0, 2, 2]
        let d = filtered(vec![2.0, 0.0, 0.0, 2.0, 4.0, 4.0], 1, None);
        let nn = NearestNeighbors::resolve(&d);
        assert_eq!(nn.distance(0).distance().map(Distance::value), Some(0.0));
        assert_eq!(nn.nearest_columns(0).collect::<Vec<_>>(), vec![3]);
        // row 5 candidates: cols 0..=3 -> [2, 4, 4, 2]
        assert_eq!(nn.distance(5).distance().map(Distance::value), Some(2.0));
        assert_eq!(nn.nearest_columns(5).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn unmatched_row_resolves_to_marked_last_column() {
        let d = filtered(vec![1.0, 2.0, 3.0, 4.0, 5.0], 2, None);
        let nn = NearestNeighbors::resolve(&d);
        assert!(nn.distance(1).is_unmatched());
        assert_eq!(nn.nearest_columns(1).collect::<Vec<_>>(), vec![3]);
        assert!(!nn.distance(0).is_unmatched());
        assert_eq!(nn.len(), 4);
        assert_eq!(nn.profile().len(), 4);
    }

    #[test]
    fn threshold_leaves_every_row_unmatched() {
        let d = filtered(vec![1.0, 5.0, 2.0, 8.0, 3.0, 9.0, 4.0], 2, Some(0.5));
        let nn = NearestNeighbors::resolve(&d);
        assert!(nn.profile().iter().all(|d| d.is_unmatched()));
    }

    #[test]
    fn fully_excluded_row_without_marking() {
        let ts = Series::from_values(vec![1.0, 2.0, 3.0]).unwrap();
        let d = DistanceMatrix::build(&ts, 2, &Euclidean)
            .unwrap()
            .mask_self_matches();
        let nn = NearestNeighbors::resolve(&d);
        assert!(nn.distance(0).is_unmatched());
        assert_eq!(nn.nearest_columns(0).count(), 0);
    }

    #[test]
    fn display() {
        assert_eq!(NeighborDistance::Unmatched.to_string(), "unmatched");
        assert_eq!(NeighborDistance::Found(Distance::ZERO).to_string(), "0.000000");
    }
}
