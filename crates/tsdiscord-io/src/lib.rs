//! File I/O, validation, and serialization for the tsdiscord pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{ColumnLayout, ExperimentName};
pub use error::IoError;
pub use reader::SeriesReader;
pub use writer::ResultWriter;
