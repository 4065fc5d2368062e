//! Domain types for tsdiscord-io.

use std::fmt;

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the artifact file name `{experiment}_{kind}.json`.
    pub(crate) fn file_name(&self, kind: &str) -> String {
        format!("{}_{kind}.json", self.0)
    }
}

impl fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layout of an input CSV, decided by its header width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    /// A single `value` column; times are 1-based positions.
    ValuesOnly,
    /// A `time,value` pair per row.
    TimeAndValue,
}

impl ColumnLayout {
    /// Pick the layout for a header with `n_columns` columns.
    pub(crate) fn from_width(n_columns: usize) -> Option<Self> {
        match n_columns {
            1 => Some(Self::ValuesOnly),
            2 => Some(Self::TimeAndValue),
            _ => None,
        }
    }

    /// Number of columns each row must carry.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::ValuesOnly => 1,
            Self::TimeAndValue => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("ecg-run_01".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "ecg-run_01");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_special_chars() {
        let name = ExperimentName::new("../escape".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn file_name_appends_kind() {
        let name = ExperimentName::new("run".to_string()).unwrap();
        assert_eq!(name.file_name("discords"), "run_discords.json");
    }

    #[test]
    fn layout_from_width() {
        assert_eq!(ColumnLayout::from_width(1), Some(ColumnLayout::ValuesOnly));
        assert_eq!(ColumnLayout::from_width(2), Some(ColumnLayout::TimeAndValue));
        assert_eq!(ColumnLayout::from_width(0), None);
        assert_eq!(ColumnLayout::from_width(3), None);
        assert_eq!(ColumnLayout::TimeAndValue.width(), 2);
    }
}
