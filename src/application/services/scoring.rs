//! Scoring service
//!
//! Loads one graph, derives path attributes and runs a scorer on it.

use std::path::Path;

use tracing::{debug, instrument};

use crate::application::services::GraphService;
use crate::application::ApplicationResult;
use crate::domain::{
    compute_mastora, compute_qanadli, ArterialTree, DomainResult, MastoraConfig, QanadliConfig,
    ScoreReport,
};

/// Which score to compute, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreRequest {
    Mastora(MastoraConfig),
    Qanadli(QanadliConfig),
}

impl ScoreRequest {
    pub fn obstruction_attr(&self) -> &str {
        match self {
            ScoreRequest::Mastora(config) => &config.obstruction_attr,
            ScoreRequest::Qanadli(config) => &config.obstruction_attr,
        }
    }

    /// Same request on another obstruction attribute.
    pub fn with_attr(&self, attr: &str) -> Self {
        match self {
            ScoreRequest::Mastora(config) => ScoreRequest::Mastora(MastoraConfig {
                obstruction_attr: attr.to_string(),
                ..config.clone()
            }),
            ScoreRequest::Qanadli(config) => ScoreRequest::Qanadli(QanadliConfig {
                obstruction_attr: attr.to_string(),
                ..config.clone()
            }),
        }
    }

    pub fn score(&self, tree: &ArterialTree) -> DomainResult<ScoreReport> {
        match self {
            ScoreRequest::Mastora(config) => compute_mastora(tree, config),
            ScoreRequest::Qanadli(config) => compute_qanadli(tree, config),
        }
    }
}

/// Service scoring single graph files.
#[derive(Clone)]
pub struct ScoringService {
    graphs: GraphService,
}

impl ScoringService {
    pub fn new(graphs: GraphService) -> Self {
        Self { graphs }
    }

    pub fn graphs(&self) -> &GraphService {
        &self.graphs
    }

    /// Resolve INPUT (path or patient ID) and score it.
    #[instrument(level = "debug", skip(self))]
    pub fn score_input(&self, input: &str, request: &ScoreRequest) -> ApplicationResult<ScoreReport> {
        let path = self.graphs.resolve(input)?;
        self.score_file(&path, request)
    }

    pub fn score_file(&self, path: &Path, request: &ScoreRequest) -> ApplicationResult<ScoreReport> {
        let tree = self.graphs.load_derived(path)?;
        debug!(
            "scoring {} ({} edges) on '{}'",
            path.display(),
            tree.edge_count(),
            request.obstruction_attr()
        );
        Ok(request.score(&tree)?)
    }
}
