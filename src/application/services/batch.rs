//! Batch scoring
//!
//! Scores every graph file of a directory in parallel. Failures are kept per row
//! so one bad file does not abort the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::application::services::{ScoreRequest, ScoringService};
use crate::application::{ApplicationResult, IoResultExt};
use crate::infrastructure::traits::FileSystem;

/// Outcome of scoring one file on one obstruction attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    pub patient_id: String,
    pub obstruction_attr: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchRow {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct BatchService {
    fs: Arc<dyn FileSystem>,
    scoring: ScoringService,
}

impl BatchService {
    pub fn new(fs: Arc<dyn FileSystem>, scoring: ScoringService) -> Self {
        Self { fs, scoring }
    }

    /// Graph files in DIR with their patient IDs, sorted by ID.
    pub fn discover(&self, dir: &Path) -> ApplicationResult<Vec<(String, PathBuf)>> {
        let regex = self.scoring.graphs().file_name_regex()?;
        let files = self.fs.list_files(dir).with_path_context("list graphs", dir)?;

        let mut found: Vec<(String, PathBuf)> = files
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                let id = regex.captures(name)?.get(1)?.as_str().to_string();
                Some((id, path))
            })
            .collect();
        found.sort();
        Ok(found)
    }

    /// Score every graph in DIR on each of ATTRIBUTES (the request's own attribute when empty).
    #[instrument(level = "debug", skip(self, request))]
    pub fn score_directory(
        &self,
        dir: &Path,
        request: &ScoreRequest,
        attributes: &[String],
    ) -> ApplicationResult<Vec<BatchRow>> {
        let files = self.discover(dir)?;
        info!("Scoring {} graph files in {}", files.len(), dir.display());

        let requests: Vec<ScoreRequest> = if attributes.is_empty() {
            vec![request.clone()]
        } else {
            attributes.iter().map(|attr| request.with_attr(attr)).collect()
        };

        let rows = files
            .par_iter()
            .flat_map_iter(|(patient_id, path)| self.score_one(patient_id, path, &requests))
            .collect();
        Ok(rows)
    }

    /// Load once, score for each request. Row order follows REQUESTS.
    fn score_one(&self, patient_id: &str, path: &Path, requests: &[ScoreRequest]) -> Vec<BatchRow> {
        let row = |request: &ScoreRequest, outcome: Result<f64, String>| {
            let (score, error) = match outcome {
                Ok(score) => (Some(score), None),
                Err(e) => {
                    warn!("{}: {}", path.display(), e);
                    (None, Some(e))
                }
            };
            BatchRow {
                patient_id: patient_id.to_string(),
                obstruction_attr: request.obstruction_attr().to_string(),
                path: path.to_path_buf(),
                score,
                error,
            }
        };

        match self.scoring.graphs().load_derived(path) {
            Ok(tree) => requests
                .iter()
                .map(|request| {
                    let outcome = request
                        .score(&tree)
                        .map(|report| report.score)
                        .map_err(|e| e.to_string());
                    row(request, outcome)
                })
                .collect(),
            Err(e) => requests
                .iter()
                .map(|request| row(request, Err(e.to_string())))
                .collect(),
        }
    }
}
