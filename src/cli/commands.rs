//! Command dispatch and per-command handlers

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::services::{BatchRow, ScoreRequest};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, InputArgs, MethodArg, OutputArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::tree_view::TreeView;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{ProximalBoundary, ScoreReport};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{InfraError, InfraResult};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, run with --help for usage".to_string(),
        ));
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let project_dir = project_dir(cli)?;
    let settings = Settings::load(Some(&project_dir))?;
    debug!("settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Mastora {
            input,
            use_percentage,
            mode,
            output,
        } => cmd_mastora(&container, input, *use_percentage, mode.as_deref(), *output),
        Commands::Qanadli {
            input,
            min_obstruction_thresh,
            max_obstruction_thresh,
            inclusive_boundary,
            output,
        } => {
            let request = qanadli_request(
                &container.settings,
                input.obstruction_attr.as_deref(),
                *min_obstruction_thresh,
                *max_obstruction_thresh,
                *inclusive_boundary,
            );
            cmd_score(&container, &input.input, &request, *output)
        }
        Commands::Tree { input, highlight } => cmd_tree(&container, input, *highlight),
        Commands::Batch {
            dir,
            score,
            all_attributes,
            obstruction_attr,
            json,
        } => cmd_batch(
            &container,
            dir,
            *score,
            *all_attributes,
            obstruction_attr.as_deref(),
            *json,
        ),
        Commands::Config { command } => cmd_config(&container, command, &project_dir),
        Commands::Completion { .. } => Ok(()),
    }
}

fn project_dir(cli: &Cli) -> InfraResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().map_err(|e| InfraError::io("get current directory", e)),
    }
}

fn mastora_request(
    settings: &Settings,
    obstruction_attr: Option<&str>,
    use_percentage: bool,
    mode: Option<&str>,
) -> CliResult<ScoreRequest> {
    let mut config = settings.mastora_config()?;
    if let Some(attr) = obstruction_attr {
        config.obstruction_attr = attr.to_string();
    }
    if let Some(mode) = mode {
        config.mode = mode.parse()?;
    }
    config.use_percentage |= use_percentage;
    Ok(ScoreRequest::Mastora(config))
}

fn qanadli_request(
    settings: &Settings,
    obstruction_attr: Option<&str>,
    min_thresh: Option<f64>,
    max_thresh: Option<f64>,
    inclusive_boundary: bool,
) -> ScoreRequest {
    let mut config = settings.qanadli_config();
    if let Some(attr) = obstruction_attr {
        config.obstruction_attr = attr.to_string();
    }
    if let Some(t) = min_thresh {
        config.min_obstruction_thresh = t;
    }
    if let Some(t) = max_thresh {
        config.max_obstruction_thresh = t;
    }
    if inclusive_boundary {
        config.boundary = ProximalBoundary::Inclusive;
    }
    ScoreRequest::Qanadli(config)
}

/// Request for METHOD with all other parameters from settings.
fn default_request(settings: &Settings, method: MethodArg) -> CliResult<ScoreRequest> {
    match method {
        MethodArg::Mastora => mastora_request(settings, None, false, None),
        MethodArg::Qanadli => Ok(qanadli_request(settings, None, None, None, false)),
    }
}

fn cmd_mastora(
    container: &ServiceContainer,
    input: &InputArgs,
    use_percentage: bool,
    mode: Option<&str>,
    opts: OutputArgs,
) -> CliResult<()> {
    let request = mastora_request(
        &container.settings,
        input.obstruction_attr.as_deref(),
        use_percentage,
        mode,
    )?;
    cmd_score(container, &input.input, &request, opts)
}

#[instrument(level = "debug", skip(container))]
fn cmd_score(
    container: &ServiceContainer,
    input: &str,
    request: &ScoreRequest,
    opts: OutputArgs,
) -> CliResult<()> {
    let report = container.scoring_service().score_input(input, request)?;
    if opts.json {
        output::info(&to_json(&report)?);
    } else {
        print_report(&report, opts.breakdown);
    }
    Ok(())
}

fn print_report(report: &ScoreReport, breakdown: bool) {
    output::score(
        &format!("{} score ({})", report.method, report.obstruction_attr),
        report.score,
    );
    if breakdown {
        output::header(&format!(
            "{} selected edges, total weight {}",
            report.breakdown.len(),
            report.total_weight
        ));
        for contribution in &report.breakdown {
            output::detail(&format!("{:<16} {}", contribution.edge, contribution.label()));
        }
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_tree(
    container: &ServiceContainer,
    input: &InputArgs,
    highlight: Option<MethodArg>,
) -> CliResult<()> {
    let graphs = container.graph_service();
    let path = graphs.resolve(&input.input)?;
    let tree = graphs.load_derived(&path)?;
    let attr = input
        .obstruction_attr
        .clone()
        .unwrap_or_else(|| container.settings.obstruction_attr.clone());

    let mut view = TreeView::new(&attr);
    if let Some(method) = highlight {
        let request = default_request(&container.settings, method)?.with_attr(&attr);
        let report = request.score(&tree)?;
        view = view.with_report(&report);
    }

    match view.render(&tree) {
        Some(rendered) => {
            output::header(&path.display());
            output::info(&rendered);
        }
        None => output::warning(&format!("{}: empty tree", path.display())),
    }
    Ok(())
}

#[instrument(level = "debug", skip(container))]
fn cmd_batch(
    container: &ServiceContainer,
    dir: &Path,
    method: MethodArg,
    all_attributes: bool,
    obstruction_attr: Option<&str>,
    json: bool,
) -> CliResult<()> {
    if !container.fs.is_dir(dir) {
        return Err(CliError::InvalidArgs(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut request = default_request(&container.settings, method)?;
    if let Some(attr) = obstruction_attr {
        request = request.with_attr(attr);
    }
    let attributes: Vec<String> = if all_attributes {
        container
            .settings
            .derived_attributes()
            .score_attributes()
            .iter()
            .map(|a| a.to_string())
            .collect()
    } else {
        Vec::new()
    };

    let rows = container
        .batch_service()
        .score_directory(dir, &request, &attributes)?;

    if json {
        output::info(&to_json(&rows)?);
        return Ok(());
    }
    print_rows(&rows, dir);
    Ok(())
}

fn print_rows(rows: &[BatchRow], dir: &Path) {
    if rows.is_empty() {
        output::warning(&format!("no graph files found in {}", dir.display()));
        return;
    }
    for row in rows {
        match (row.score, &row.error) {
            (Some(score), _) => output::success(&format!(
                "{} {}: {:.4}",
                row.patient_id, row.obstruction_attr, score
            )),
            (None, error) => output::failure(&format!(
                "{} {}: {}",
                row.patient_id,
                row.obstruction_attr,
                error.as_deref().unwrap_or("failed")
            )),
        }
    }
    let failed = rows.iter().filter(|r| !r.is_ok()).count();
    output::header(&format!("{} scored, {} failed", rows.len() - failed, failed));
}

fn cmd_config(
    container: &ServiceContainer,
    command: &ConfigCommands,
    project_dir: &Path,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine the global config directory".to_string())
                })?
            } else {
                local_config_path(project_dir)
            };
            if container.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config file already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                container
                    .fs
                    .create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            container
                .fs
                .write(&path, &Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("Created {}", path.display()));
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}", path.display())),
                None => output::detail(&"global: (unavailable)"),
            }
            output::detail(&format!(
                "local:  {}",
                local_config_path(project_dir).display()
            ));
        }
    }
    Ok(())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        CliError::from(ApplicationError::OperationFailed {
            context: "serialize output".to_string(),
            source: Box::new(e),
        })
    })
}
