//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};

/// Pulmonary embolism severity scores on arterial obstruction trees
#[derive(Parser, Debug)]
#[command(name = "graphscore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose logging to stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Directory searched for a local .graphscore.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the Mastora score of a graph
    Mastora {
        #[command(flatten)]
        input: InputArgs,

        /// Report the mean obstruction instead of the degree-based score
        #[arg(long)]
        use_percentage: bool,

        /// Levels to score: any combination of m (mediastinal), l (lobar), s (segmental)
        #[arg(long)]
        mode: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compute the Qanadli score of a graph
    Qanadli {
        #[command(flatten)]
        input: InputArgs,

        /// Proximal edges at or below this obstruction are descended through
        #[arg(long)]
        min_obstruction_thresh: Option<f64>,

        /// Obstruction from which a segment counts as totally occluded
        #[arg(long)]
        max_obstruction_thresh: Option<f64>,

        /// Select proximal edges whose obstruction equals the minimum threshold
        #[arg(long)]
        inclusive_boundary: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the arterial tree with levels and obstruction values
    Tree {
        #[command(flatten)]
        input: InputArgs,

        /// Mark the edges selected by a scoring method
        #[arg(long, value_enum)]
        highlight: Option<MethodArg>,
    },

    /// Score every graph file in a directory
    Batch {
        /// Directory containing graph files
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,

        /// Scoring method
        #[arg(long, value_enum)]
        score: MethodArg,

        /// Score on the max, propagated and cumulated attributes
        #[arg(long)]
        all_attributes: bool,

        /// Obstruction attribute (default from settings)
        #[arg(long)]
        obstruction_attr: Option<String>,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Graph selection shared by the scoring commands.
#[derive(clap::Args, Debug, Clone)]
pub struct InputArgs {
    /// Graph file, or patient ID looked up in the graph directories
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: String,

    /// Obstruction attribute (default from settings)
    #[arg(long)]
    pub obstruction_attr: Option<String>,
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// List every selected edge with its obstruction, degree and weight
    #[arg(long)]
    pub breakdown: bool,

    /// Emit the score report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    Mastora,
    Qanadli,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,

    /// Create a config file template
    Init {
        /// Write the global config instead of the local one
        #[arg(short, long)]
        global: bool,
    },

    /// Show config file locations
    Path,
}
