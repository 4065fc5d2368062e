//! Brute-force time series discord detection.
//!
//! Pure math library with zero I/O. Builds the all-pairs distance matrix over
//! every window of a given length, excludes self/overlap matches and pairs
//! beyond an optional threshold, resolves each window's nearest neighbor, and
//! returns the window(s) whose nearest neighbor is farthest away.
//!
//! Pipeline: [`DistanceMatrix::build`] → [`MatchFilter::apply`] →
//! [`NearestNeighbors::resolve`] → [`select_discords`]. [`DiscordConfig`]
//! runs all four.

mod discord;
mod distance;
mod error;
mod filter;
mod matrix;
mod neighbor;
pub mod reference;
mod series;

pub use discord::{DiscordConfig, Discords, find_discords, select_discords};
pub use distance::{Distance, DistanceMetric, Euclidean, Manhattan, Normalization, Threshold};
pub use error::{DiscordError, InvalidArgument};
pub use filter::MatchFilter;
pub use matrix::{DistanceMatrix, Entry};
pub use neighbor::{NearestNeighbors, NeighborDistance};
pub use series::{Series, Window};
