//! Graph service
//!
//! Resolves patient IDs to graph files and loads them into arterial trees.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, instrument};

use crate::application::node_link::NodeLinkGraph;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::{Settings, PATIENT_ID_PLACEHOLDER};
use crate::domain::{derive_obstruction_attributes, ArterialTree, TreeBuilder};
use crate::infrastructure::traits::FileSystem;

/// Width patient IDs are zero-padded to.
const PATIENT_ID_WIDTH: usize = 4;

/// Service for locating and loading arterial tree graphs.
#[derive(Clone)]
pub struct GraphService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl GraphService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Zero-padded patient ID from an input such as `55`, `0055` or `55.json`.
    pub fn patient_id(input: &str) -> String {
        let stem = Path::new(input)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string());
        format!("{stem:0>width$}", width = PATIENT_ID_WIDTH)
    }

    /// File name of a patient's graph.
    pub fn graph_file_name(&self, patient_id: &str) -> String {
        self.settings
            .graph_file_pattern
            .replace(PATIENT_ID_PLACEHOLDER, patient_id)
    }

    /// Resolve INPUT to a graph file: an existing file is used as is, anything else
    /// is taken as a patient ID and looked up in the configured graph directories.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve(&self, input: &str) -> ApplicationResult<PathBuf> {
        let direct = Path::new(input);
        if self.fs.is_file(direct) {
            return Ok(direct.to_path_buf());
        }

        let patient_id = Self::patient_id(input);
        let file_name = self.graph_file_name(&patient_id);
        let mut tried = Vec::with_capacity(self.settings.graphs_dirs.len());
        for dir in &self.settings.graphs_dirs {
            let candidate = dir.join(&file_name);
            debug!("trying {}", candidate.display());
            if self.fs.is_file(&candidate) {
                return Ok(candidate);
            }
            tried.push(candidate);
        }
        Err(ApplicationError::GraphNotFound { patient_id, tried })
    }

    /// Pattern matching graph file names; group 1 captures the patient ID.
    pub fn file_name_regex(&self) -> ApplicationResult<Regex> {
        let escaped = regex::escape(&self.settings.graph_file_pattern);
        let placeholder = regex::escape(PATIENT_ID_PLACEHOLDER);
        if !escaped.contains(&placeholder) {
            return Err(ApplicationError::Config {
                message: format!(
                    "graph_file_pattern '{}' lacks the {} placeholder",
                    self.settings.graph_file_pattern, PATIENT_ID_PLACEHOLDER
                ),
            });
        }
        let pattern = format!("^{}$", escaped.replacen(&placeholder, r"(\d+)", 1));
        Regex::new(&pattern).map_err(|e| ApplicationError::Config {
            message: format!("graph_file_pattern: {e}"),
        })
    }

    /// Parse a node-link JSON file into a validated tree.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<ArterialTree> {
        info!("Loading graph from {}", path.display());
        let content = self.fs.read_to_string(path).with_path_context("read graph", path)?;

        let invalid = |message: String| ApplicationError::InvalidGraphFile {
            path: path.to_path_buf(),
            message,
        };
        let graph = NodeLinkGraph::from_json(&content).map_err(|e| invalid(e.to_string()))?;
        if graph.directed == Some(false) {
            debug!("{}: undirected flag ignored, links read source -> target", path.display());
        }
        let (nodes, links) = graph.into_specs().map_err(invalid)?;

        let tree = TreeBuilder::new().build(nodes, links)?;
        Ok(tree)
    }

    /// Load a tree and compute max, propagated and cumulated obstruction attributes.
    pub fn load_derived(&self, path: &Path) -> ApplicationResult<ArterialTree> {
        let mut tree = self.load(path)?;
        derive_obstruction_attributes(&mut tree, &self.settings.derived_attributes())?;
        Ok(tree)
    }
}
