//! JSON result writer for discord and match outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};
use tsdiscord_core::{Discords, Normalization, Threshold, Window};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes discord and match results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_discords.json` and
/// `{experiment}_matches.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a discord search result to `{experiment}_discords.json`.
    ///
    /// Returns the path of the written file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] if the file
    /// cannot be produced.
    #[instrument(skip_all, fields(n_discords = discords.len()))]
    pub fn write_discords(&self, discords: &Discords<'_>) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(self.experiment.file_name("discords"));

        let series_len = discords
            .windows
            .first()
            .map_or(0, |w| w.parent().len());
        let artifact = DiscordsArtifact {
            experiment: self.experiment.as_str(),
            series_len,
            window_len: discords.window_len,
            threshold: discords.threshold.map(Threshold::value),
            score: discords.score.value(),
            discords: discords.windows.iter().map(WindowEntry::from).collect(),
            profile: discords
                .profile
                .iter()
                .map(|p| p.distance().map(|d| d.value()))
                .collect(),
        };

        write_json(&path, &artifact)?;
        info!(path = %path.display(), "discords written");
        Ok(path)
    }

    /// Write the non-self matches of `query` to `{experiment}_matches.json`.
    ///
    /// Returns the path of the written file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`] if the file
    /// cannot be produced.
    #[instrument(skip_all, fields(start = query.start(), n_matches = matches.len()))]
    pub fn write_matches(
        &self,
        query: &Window<'_>,
        matches: &[Window<'_>],
        threshold: Option<Threshold>,
        mode: Normalization,
    ) -> Result<PathBuf, IoError> {
        let path = self.output_dir.join(self.experiment.file_name("matches"));

        let artifact = MatchesArtifact {
            experiment: self.experiment.as_str(),
            series_len: query.parent().len(),
            query: WindowEntry::from(query),
            normalize: mode == Normalization::ZNormalized,
            threshold: threshold.map(Threshold::value),
            n_matches: matches.len(),
            matches: matches.iter().map(WindowEntry::from).collect(),
        };

        write_json(&path, &artifact)?;
        info!(path = %path.display(), "matches written");
        Ok(path)
    }
}

fn write_json<T: Serialize>(path: &Path, artifact: &T) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, &json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct DiscordsArtifact<'a> {
    experiment: &'a str,
    series_len: usize,
    window_len: usize,
    threshold: Option<f64>,
    score: f64,
    discords: Vec<WindowEntry>,
    profile: Vec<Option<f64>>,
}

#[derive(Serialize)]
struct MatchesArtifact<'a> {
    experiment: &'a str,
    series_len: usize,
    query: WindowEntry,
    normalize: bool,
    threshold: Option<f64>,
    n_matches: usize,
    matches: Vec<WindowEntry>,
}

#[derive(Serialize)]
struct WindowEntry {
    start: usize,
    end: usize,
    length: usize,
    start_time: f64,
    end_time: f64,
}

impl From<&Window<'_>> for WindowEntry {
    fn from(w: &Window<'_>) -> Self {
        let times = w.times();
        Self {
            start: w.start(),
            end: w.end(),
            length: w.len(),
            start_time: times.first().copied().unwrap_or(f64::NAN),
            end_time: times.last().copied().unwrap_or(f64::NAN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tsdiscord_core::{DiscordConfig, Euclidean, Series, reference};

    fn spiky() -> Series {
        Series::from_values(vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 1.0, 2.0, 3.0, 20.0]).unwrap()
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn write_discords_json_structure() {
        let dir = TempDir::new().unwrap();
        let experiment = ExperimentName::new("test_run".into()).unwrap();
        let writer = ResultWriter::new(dir.path(), experiment).unwrap();

        let series = spiky();
        let discords = DiscordConfig::new(3).unwrap().find(&series).unwrap();
        let path = writer.write_discords(&discords).unwrap();

        assert_eq!(path, dir.path().join("test_run_discords.json"));
        let content = read_json(&path);
        assert_eq!(content["experiment"], "test_run");
        assert_eq!(content["series_len"], 10);
        assert_eq!(content["window_len"], 3);
        assert!(content["threshold"].is_null());
        assert!((content["score"].as_f64().unwrap() - 204.0_f64.sqrt()).abs() < 1e-12);

        let found = content["discords"].as_array().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["start"], 5);
        assert_eq!(found[0]["end"], 8);
        assert_eq!(found[0]["length"], 3);
        assert_eq!(found[0]["start_time"], 5.0);
        assert_eq!(found[0]["end_time"], 7.0);

        assert_eq!(content["profile"].as_array().unwrap().len(), 8);
    }

    #[test]
    fn unmatched_profile_entries_are_null() {
        let dir = TempDir::new().unwrap();
        let writer =
            ResultWriter::new(dir.path(), ExperimentName::new("flat".into()).unwrap()).unwrap();

        let series = Series::from_values(vec![0.0; 6]).unwrap();
        let discords = DiscordConfig::new(2).unwrap().find(&series).unwrap();
        let content = read_json(&writer.write_discords(&discords).unwrap());

        let profile = content["profile"].as_array().unwrap();
        assert!(profile[2].is_null());
        assert_eq!(profile[0], 0.0);
    }

    #[test]
    fn write_matches_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer =
            ResultWriter::new(dir.path(), ExperimentName::new("m".into()).unwrap()).unwrap();

        let series = spiky();
        let query = series.window(1, 3).unwrap();
        let h = Threshold::new(1.0).unwrap();
        let matches =
            reference::find_non_self_matches(&query, Some(h), &Euclidean, Normalization::Raw)
                .unwrap();
        let path = writer
            .write_matches(&query, &matches, Some(h), Normalization::Raw)
            .unwrap();

        assert_eq!(path, dir.path().join("m_matches.json"));
        let content = read_json(&path);
        assert_eq!(content["query"]["start"], 1);
        assert_eq!(content["normalize"], false);
        assert_eq!(content["threshold"], 1.0);
        assert_eq!(content["n_matches"], 1);
        assert_eq!(content["matches"][0]["start"], 7);
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let writer = ResultWriter::new(&nested, ExperimentName::new("x".into()).unwrap());
        assert!(writer.is_ok());
        assert!(nested.is_dir());
    }
}
