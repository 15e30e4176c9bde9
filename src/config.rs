//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/graphscore/graphscore.toml`
//! 3. Local config: `<dir>/.graphscore.toml` (project directory, `-C`)
//! 4. Environment variables: `GRAPHSCORE_*` prefix
//!
//! Command-line flags override all of these.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::obstruction::{
    MAX_TRANSVERSAL_OBSTRUCTION, MAX_TRANSVERSAL_OBSTRUCTION_CUMULATED,
    MAX_TRANSVERSAL_OBSTRUCTION_PROPAGATED, TRANSVERSAL_OBSTRUCTION,
};
use crate::domain::{DerivedAttributes, DomainResult, MastoraConfig, ProximalBoundary, QanadliConfig};

/// Placeholder for the zero-padded patient ID in `graph_file_pattern`.
pub const PATIENT_ID_PLACEHOLDER: &str = "{id}";

/// Names of the derived obstruction attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AttributeSettings {
    pub input_attr: String,
    pub max_attr: String,
    pub propagated_attr: String,
    pub cumulated_attr: String,
    pub root_obstruction: f64,
}

impl Default for AttributeSettings {
    fn default() -> Self {
        Self {
            input_attr: TRANSVERSAL_OBSTRUCTION.into(),
            max_attr: MAX_TRANSVERSAL_OBSTRUCTION.into(),
            propagated_attr: MAX_TRANSVERSAL_OBSTRUCTION_PROPAGATED.into(),
            cumulated_attr: MAX_TRANSVERSAL_OBSTRUCTION_CUMULATED.into(),
            root_obstruction: 0.0,
        }
    }
}

/// Mastora defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MastoraSettings {
    /// Level keys: m (mediastinal), l (lobar), s (segmental)
    pub mode: String,
    pub use_percentage: bool,
}

impl Default for MastoraSettings {
    fn default() -> Self {
        Self {
            mode: "mls".into(),
            use_percentage: false,
        }
    }
}

/// Qanadli defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QanadliSettings {
    pub min_obstruction_thresh: f64,
    pub max_obstruction_thresh: f64,
    pub boundary: ProximalBoundary,
}

impl Default for QanadliSettings {
    fn default() -> Self {
        Self {
            min_obstruction_thresh: 0.25,
            max_obstruction_thresh: 0.75,
            boundary: ProximalBoundary::Exclusive,
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit from base).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub graphs_dirs: Option<Vec<PathBuf>>,
    pub graph_file_pattern: Option<String>,
    pub obstruction_attr: Option<String>,
    pub attributes: RawAttributeSettings,
    pub mastora: RawMastoraSettings,
    pub qanadli: RawQanadliSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawAttributeSettings {
    pub input_attr: Option<String>,
    pub max_attr: Option<String>,
    pub propagated_attr: Option<String>,
    pub cumulated_attr: Option<String>,
    pub root_obstruction: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawMastoraSettings {
    pub mode: Option<String>,
    pub use_percentage: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawQanadliSettings {
    pub min_obstruction_thresh: Option<f64>,
    pub max_obstruction_thresh: Option<f64>,
    pub boundary: Option<ProximalBoundary>,
}

impl AttributeSettings {
    fn merge(&self, overlay: &RawAttributeSettings) -> Self {
        Self {
            input_attr: overlay.input_attr.clone().unwrap_or_else(|| self.input_attr.clone()),
            max_attr: overlay.max_attr.clone().unwrap_or_else(|| self.max_attr.clone()),
            propagated_attr: overlay
                .propagated_attr
                .clone()
                .unwrap_or_else(|| self.propagated_attr.clone()),
            cumulated_attr: overlay
                .cumulated_attr
                .clone()
                .unwrap_or_else(|| self.cumulated_attr.clone()),
            root_obstruction: overlay.root_obstruction.unwrap_or(self.root_obstruction),
        }
    }
}

impl MastoraSettings {
    fn merge(&self, overlay: &RawMastoraSettings) -> Self {
        Self {
            mode: overlay.mode.clone().unwrap_or_else(|| self.mode.clone()),
            use_percentage: overlay.use_percentage.unwrap_or(self.use_percentage),
        }
    }
}

impl QanadliSettings {
    fn merge(&self, overlay: &RawQanadliSettings) -> Self {
        Self {
            min_obstruction_thresh: overlay
                .min_obstruction_thresh
                .unwrap_or(self.min_obstruction_thresh),
            max_obstruction_thresh: overlay
                .max_obstruction_thresh
                .unwrap_or(self.max_obstruction_thresh),
            boundary: overlay.boundary.unwrap_or(self.boundary),
        }
    }
}

/// Unified configuration for graphscore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directories searched when INPUT is a patient ID
    pub graphs_dirs: Vec<PathBuf>,
    /// Graph file name, `{id}` is replaced by the 4-digit patient ID
    pub graph_file_pattern: String,
    /// Attribute scored when no `--obstruction-attr` is given
    pub obstruction_attr: String,
    pub attributes: AttributeSettings,
    pub mastora: MastoraSettings,
    pub qanadli: QanadliSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graphs_dirs: vec![PathBuf::from("../data/graphs"), PathBuf::from("data/graphs")],
            graph_file_pattern: "{id}_graph_ep_transversal_obstruction.json".into(),
            obstruction_attr: MAX_TRANSVERSAL_OBSTRUCTION.into(),
            attributes: AttributeSettings::default(),
            mastora: MastoraSettings::default(),
            qanadli: QanadliSettings::default(),
        }
    }
}

/// Get the XDG config directory for graphscore.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "graphscore").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("graphscore.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".graphscore.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Expand shell variables and tilde in `graphs_dirs`.
    fn expand_paths(&mut self) {
        self.graphs_dirs = self.graphs_dirs.iter().map(|p| expand_path(p)).collect();
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - `graphs_dirs`: overlay directories are searched first, base ones follow
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        let graphs_dirs = match &overlay.graphs_dirs {
            Some(dirs) => {
                let mut merged = dirs.clone();
                for dir in &self.graphs_dirs {
                    if !merged.contains(dir) {
                        merged.push(dir.clone());
                    }
                }
                merged
            }
            None => self.graphs_dirs.clone(),
        };
        Self {
            graphs_dirs,
            graph_file_pattern: overlay
                .graph_file_pattern
                .clone()
                .unwrap_or_else(|| self.graph_file_pattern.clone()),
            obstruction_attr: overlay
                .obstruction_attr
                .clone()
                .unwrap_or_else(|| self.obstruction_attr.clone()),
            attributes: self.attributes.merge(&overlay.attributes),
            mastora: self.mastora.merge(&overlay.mastora),
            qanadli: self.qanadli.merge(&overlay.qanadli),
        }
    }

    /// Apply global config onto defaults: `graphs_dirs` is REPLACED, not merged.
    ///
    /// Compiled default directories are only examples; the global config defines
    /// where the data really lives.
    fn apply_global(&self, global: &RawSettings) -> Self {
        let mut settings = self.merge_with(global);
        if let Some(dirs) = &global.graphs_dirs {
            settings.graphs_dirs = dirs.clone();
        }
        settings
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional project directory holding `.graphscore.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config replaces defaults
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        // 3. Local config merges onto global
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        Ok(current)
    }

    /// Apply GRAPHSCORE_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`, e.g. `GRAPHSCORE_QANADLI__MIN_OBSTRUCTION_THRESH=0.3`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("GRAPHSCORE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("graphs_dirs"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Some(val) = env_value::<Vec<String>>(&config, "graphs_dirs")? {
            settings.graphs_dirs = val.into_iter().map(PathBuf::from).collect();
        }
        if let Some(val) = env_value(&config, "graph_file_pattern")? {
            settings.graph_file_pattern = val;
        }
        if let Some(val) = env_value(&config, "obstruction_attr")? {
            settings.obstruction_attr = val;
        }

        let attributes = &mut settings.attributes;
        if let Some(val) = env_value(&config, "attributes.input_attr")? {
            attributes.input_attr = val;
        }
        if let Some(val) = env_value(&config, "attributes.max_attr")? {
            attributes.max_attr = val;
        }
        if let Some(val) = env_value(&config, "attributes.propagated_attr")? {
            attributes.propagated_attr = val;
        }
        if let Some(val) = env_value(&config, "attributes.cumulated_attr")? {
            attributes.cumulated_attr = val;
        }
        if let Some(val) = env_value(&config, "attributes.root_obstruction")? {
            attributes.root_obstruction = val;
        }

        if let Some(val) = env_value(&config, "mastora.mode")? {
            settings.mastora.mode = val;
        }
        if let Some(val) = env_value(&config, "mastora.use_percentage")? {
            settings.mastora.use_percentage = val;
        }
        if let Some(val) = env_value(&config, "qanadli.min_obstruction_thresh")? {
            settings.qanadli.min_obstruction_thresh = val;
        }
        if let Some(val) = env_value(&config, "qanadli.max_obstruction_thresh")? {
            settings.qanadli.max_obstruction_thresh = val;
        }
        if let Some(val) = env_value(&config, "qanadli.boundary")? {
            settings.qanadli.boundary = val;
        }

        Ok(settings)
    }

    /// Names for the derived-attribute pre-pass.
    pub fn derived_attributes(&self) -> DerivedAttributes {
        DerivedAttributes {
            input_attr: self.attributes.input_attr.clone(),
            max_attr: self.attributes.max_attr.clone(),
            propagated_attr: self.attributes.propagated_attr.clone(),
            cumulated_attr: self.attributes.cumulated_attr.clone(),
            root_obstruction: self.attributes.root_obstruction,
        }
    }

    /// Mastora configuration from settings; fails on an invalid level mode.
    pub fn mastora_config(&self) -> DomainResult<MastoraConfig> {
        Ok(MastoraConfig {
            obstruction_attr: self.obstruction_attr.clone(),
            mode: self.mastora.mode.parse()?,
            use_percentage: self.mastora.use_percentage,
        })
    }

    pub fn qanadli_config(&self) -> QanadliConfig {
        QanadliConfig {
            obstruction_attr: self.obstruction_attr.clone(),
            min_obstruction_thresh: self.qanadli.min_obstruction_thresh,
            max_obstruction_thresh: self.qanadli.max_obstruction_thresh,
            boundary: self.qanadli.boundary,
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# graphscore configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/graphscore/graphscore.toml
#   Local:  <project_dir>/.graphscore.toml
#   Env:    GRAPHSCORE_* environment variables (nested keys with __)

# Directories searched when INPUT is a patient ID (local dirs are searched first)
# graphs_dirs = ["../data/graphs", "data/graphs"]

# Graph file name, {id} is the patient ID padded to 4 digits
# graph_file_pattern = "{id}_graph_ep_transversal_obstruction.json"

# Edge attribute scored by default
# obstruction_attr = "max_transversal_obstruction"

[attributes]
# input_attr = "transversal_obstruction"
# max_attr = "max_transversal_obstruction"
# propagated_attr = "max_transversal_obstruction_propagated"
# cumulated_attr = "max_transversal_obstruction_cumulated"
# root_obstruction = 0.0

[mastora]
# mode = "mls"            # m: mediastinal, l: lobar, s: segmental
# use_percentage = false

[qanadli]
# min_obstruction_thresh = 0.25
# max_obstruction_thresh = 0.75
# boundary = "exclusive"  # "inclusive" selects proximal arteries with o >= min
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// Value of an environment key; `None` when unset, an error when it does not parse.
fn env_value<T: DeserializeOwned>(
    config: &Config,
    key: &str,
) -> Result<Option<T>, ApplicationError> {
    match config.get::<T>(key) {
        Ok(val) => Ok(Some(val)),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(config_err(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_defaults_then_match_cli_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.obstruction_attr, "max_transversal_obstruction");
        assert_eq!(settings.mastora.mode, "mls");
        assert_eq!(settings.qanadli.min_obstruction_thresh, 0.25);
        assert_eq!(settings.qanadli.max_obstruction_thresh, 0.75);
        assert_eq!(settings.qanadli.boundary, ProximalBoundary::Exclusive);
    }

    #[test]
    fn given_overlay_dirs_when_merging_then_overlay_is_searched_first() {
        let base = Settings::default();
        let overlay = RawSettings {
            graphs_dirs: Some(vec![PathBuf::from("/scans"), PathBuf::from("data/graphs")]),
            ..RawSettings::default()
        };
        let merged = base.merge_with(&overlay);
        assert_eq!(
            merged.graphs_dirs,
            vec![
                PathBuf::from("/scans"),
                PathBuf::from("data/graphs"),
                PathBuf::from("../data/graphs"),
            ]
        );
    }

    #[test]
    fn given_global_dirs_when_applying_then_defaults_are_replaced() {
        let base = Settings::default();
        let global = RawSettings {
            graphs_dirs: Some(vec![PathBuf::from("/scans")]),
            ..RawSettings::default()
        };
        assert_eq!(
            base.apply_global(&global).graphs_dirs,
            vec![PathBuf::from("/scans")]
        );
    }

    #[test]
    fn given_partial_overlay_when_merging_then_unspecified_values_are_kept() {
        let base = Settings::default();
        let overlay: RawSettings = toml::from_str(
            r#"
obstruction_attr = "max_transversal_obstruction_cumulated"
[qanadli]
min_obstruction_thresh = 0.3
boundary = "inclusive"
"#,
        )
        .unwrap();
        let merged = base.merge_with(&overlay);
        assert_eq!(merged.obstruction_attr, "max_transversal_obstruction_cumulated");
        assert_eq!(merged.qanadli.min_obstruction_thresh, 0.3);
        assert_eq!(merged.qanadli.max_obstruction_thresh, 0.75);
        assert_eq!(merged.qanadli.boundary, ProximalBoundary::Inclusive);
        assert_eq!(merged.mastora, MastoraSettings::default());

        let qanadli = merged.qanadli_config();
        assert_eq!(qanadli.obstruction_attr, "max_transversal_obstruction_cumulated");
    }

    #[test]
    fn given_invalid_mode_when_building_mastora_config_then_fails() {
        let mut settings = Settings::default();
        settings.mastora.mode = "mx".into();
        assert!(settings.mastora_config().is_err());
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: Result<RawSettings, _> = toml::from_str(&Settings::template());
        assert!(raw.is_ok());
    }

    #[test]
    fn given_defaults_when_serialized_then_round_trip() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
