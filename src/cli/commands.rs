//! Command dispatch: one typed handler per subcommand

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::application::services::{BulkOutcome, PollEvent};
use crate::application::{ApplicationError, IoResultExt};
use crate::cli::args::{Cli, Commands, ConfigCommands, JobTarget, OutputFormat};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{
    resolve_job_spec, ApiRequest, JobHandle, JobSummary, RemoteEntry, RemoteEntryKind,
    TransferDirection, TransferReport, TransferSpec,
};
use crate::infrastructure::di::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => cmd_config(cli.config.as_deref(), command),
        command => {
            let settings = Settings::load(cli.config.as_deref())?;
            let creds = settings.resolve_credentials(
                cli.username.clone(),
                cli.apikey.clone(),
                cli.apiurl.clone(),
            )?;
            let container = ServiceContainer::new(settings, creds)?;
            run(&container, command, cli.format)
        }
    }
}

/// Run a job or vault command against an already wired container.
pub fn run(container: &ServiceContainer, command: &Commands, format: OutputFormat) -> CliResult<()> {
    match command {
        Commands::Connect(target) => passthrough(container, ApiRequest::Connect(handle(target)?), format),
        Commands::Info(target) => passthrough(container, ApiRequest::Info(handle(target)?), format),
        Commands::Status(target) => passthrough(container, ApiRequest::Status(handle(target)?), format),
        Commands::Terminate(target) => {
            passthrough(container, ApiRequest::Terminate(handle(target)?), format)
        }
        Commands::Shutdown(target) => {
            passthrough(container, ApiRequest::Shutdown(handle(target)?), format)
        }
        Commands::Action { target, action } => passthrough(
            container,
            ApiRequest::Action {
                job: handle(target)?,
                action: action.clone(),
            },
            format,
        ),
        Commands::Output { target, lines } => passthrough(
            container,
            ApiRequest::Output {
                job: handle(target)?,
                lines: *lines,
            },
            format,
        ),
        Commands::Tail { target, lines } => passthrough(
            container,
            ApiRequest::Tail {
                job: handle(target)?,
                lines: *lines,
            },
            format,
        ),
        Commands::Jobs { name } => {
            passthrough(container, ApiRequest::Jobs { name: name.clone() }, format)
        }
        Commands::Apps { name } => {
            passthrough(container, ApiRequest::Apps { name: name.clone() }, format)
        }
        Commands::Machines { name } => {
            passthrough(container, ApiRequest::Machines { name: name.clone() }, format)
        }
        Commands::Submit { job } => {
            let job = resolve_job_spec(job)?;
            passthrough(container, ApiRequest::Submit(job), format)
        }
        Commands::Summary => cmd_summary(container, format),
        Commands::TerminateAll => {
            let outcome = container.jobs_service().terminate_all()?;
            report_bulk(&outcome, format)
        }
        Commands::ShutdownAll => {
            let outcome = container.jobs_service().shutdown_all()?;
            report_bulk(&outcome, format)
        }
        Commands::WaitFor {
            target,
            interval,
            max_errors,
            timeout,
        } => cmd_wait_for(container, target, *interval, *max_errors, *timeout),
        Commands::Download {
            remote,
            local,
            vault,
        } => transfer(
            container,
            TransferSpec {
                vault: container.vault_address(vault.vault.as_deref())?,
                direction: TransferDirection::Download {
                    remote: remote.clone(),
                    local: local.clone(),
                },
            },
            format,
        ),
        Commands::Upload {
            local,
            remote,
            overwrite,
            vault,
        } => transfer(
            container,
            TransferSpec {
                vault: container.vault_address(vault.vault.as_deref())?,
                direction: TransferDirection::Upload {
                    local: local.clone(),
                    remote: remote.clone(),
                    overwrite: *overwrite,
                },
            },
            format,
        ),
        Commands::Ls { remote, vault } => {
            let address = container.vault_address(vault.vault.as_deref())?;
            let entries = container
                .transfer_service(&address)?
                .list(remote)
                .map_err(ApplicationError::from)?;
            report_listing(&entries, format)
        }
        Commands::Config { .. } | Commands::Completion { .. } => Err(CliError::Usage(
            "command does not talk to the job API".into(),
        )),
    }
}

fn handle(target: &JobTarget) -> CliResult<JobHandle> {
    Ok(JobHandle::from_parts(target.name.clone(), target.number)?)
}

fn to_json<T: Serialize>(value: &T) -> CliResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        CliError::from(ApplicationError::OperationFailed {
            context: "serialize output".into(),
            source: Box::new(e),
        })
    })
}

#[instrument(skip(container, request), fields(endpoint = request.endpoint()))]
fn passthrough(container: &ServiceContainer, request: ApiRequest, format: OutputFormat) -> CliResult<()> {
    let body = container.jobs_service().call(&request)?;
    output::print_body(&body, format);
    Ok(())
}

fn cmd_summary(container: &ServiceContainer, format: OutputFormat) -> CliResult<()> {
    let jobs = container.jobs_service().summary()?;
    match format {
        OutputFormat::Json => output::info(&output::render(&to_json(&jobs)?, format)),
        OutputFormat::Text => {
            for line in summary_lines(&jobs) {
                output::info(&line);
            }
        }
    }
    Ok(())
}

/// Column layout of `summary --format text`.
pub fn summary_lines(jobs: &[JobSummary]) -> Vec<String> {
    jobs.iter()
        .map(|job| {
            format!(
                "{:<10} {:<32} {:<22} {}",
                job.number, job.name, job.status, job.application
            )
        })
        .collect()
}

fn report_bulk(outcome: &BulkOutcome, format: OutputFormat) -> CliResult<()> {
    output::info(&output::render(&to_json(outcome)?, format));
    if outcome.errors.is_empty() {
        return Ok(());
    }
    for failure in &outcome.errors {
        output::warning(&format!("job {}: {}", failure.number, failure.error));
    }
    Err(CliError::BatchFailed {
        failed: outcome.errors.len(),
        total: outcome.errors.len() + outcome.results.len(),
    })
}

#[instrument(skip(container))]
fn cmd_wait_for(
    container: &ServiceContainer,
    target: &JobTarget,
    interval: Option<u64>,
    max_errors: Option<u32>,
    timeout: Option<u64>,
) -> CliResult<()> {
    let job = handle(target)?;
    let mut options = container.settings.wait_options();
    if let Some(secs) = interval {
        options.interval = Duration::from_secs(secs);
    }
    if let Some(max) = max_errors {
        options.max_consecutive_errors = max.max(1);
    }
    if let Some(secs) = timeout {
        options.timeout = Some(Duration::from_secs(secs));
    }
    debug!("wait_for: job={}, options={:?}", job, options);

    let mut dots = false;
    let result = container.wait_service(options).wait_for_with(&job, |event| {
        if let PollEvent::Pending { .. } = event {
            print!(".");
            io::stdout().flush().ok();
            dots = true;
        }
    });
    if dots {
        println!();
    }

    let outcome = result?;
    output::info(&format!(
        "Job {} ended with Status: {}",
        outcome.job, outcome.status
    ));
    Ok(())
}

#[instrument(skip(container))]
fn transfer(container: &ServiceContainer, spec: TransferSpec, format: OutputFormat) -> CliResult<()> {
    let report = container
        .transfer_service(&spec.vault)?
        .execute(&spec.direction)
        .map_err(ApplicationError::from)?;
    report_transfer(&report, format)
}

fn report_transfer(report: &TransferReport, format: OutputFormat) -> CliResult<()> {
    if let OutputFormat::Json = format {
        output::info(&output::render(&to_json(report)?, format));
        return Ok(());
    }
    for file in &report.files {
        output::success_detail(&format!(
            "{} -> {} ({} B)",
            file.source, file.destination, file.bytes
        ));
    }
    for skipped in &report.skipped {
        output::failure(&format!("{} (skipped)", skipped));
    }
    output::success(&format!(
        "{} file(s), {} B transferred",
        report.files.len(),
        report.total_bytes()
    ));
    Ok(())
}

fn report_listing(entries: &[RemoteEntry], format: OutputFormat) -> CliResult<()> {
    if let OutputFormat::Json = format {
        output::info(&output::render(&to_json(&entries)?, format));
        return Ok(());
    }
    for entry in entries {
        let name = if entry.is_dir() {
            format!("{}/", entry.name)
        } else if entry.kind == RemoteEntryKind::Symlink {
            format!("{}@", entry.name)
        } else {
            entry.name.clone()
        };
        match entry.size {
            Some(size) => output::info(&format!("{:>12}  {}", size, name)),
            None => output::info(&format!("{:>12}  {}", "-", name)),
        }
    }
    Ok(())
}

// ============================================================
// config
// ============================================================

fn cmd_config(explicit: Option<&Path>, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(explicit)?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { force } => {
            let path = config_target(explicit)?;
            if path.exists() && !force {
                return Err(CliError::Usage(format!(
                    "config file already exists: {} (use --force to replace)",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_path_context("create config dir", parent)?;
            }
            std::fs::write(&path, Settings::template()).with_path_context("write config", &path)?;
            output::action("Created", &path.display());
            Ok(())
        }
        ConfigCommands::Path => {
            output::header("Config locations");
            match global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "exists" } else { "not found" };
                    output::detail(&format!("global: {} ({})", path.display(), state));
                }
                None => output::detail(&"global: unavailable (no home directory)"),
            }
            if let Some(path) = explicit {
                output::detail(&format!("--config: {}", path.display()));
            }
            output::detail(&"env: JARVICE_* (nested keys with __)");
            Ok(())
        }
    }
}

fn config_target(explicit: Option<&Path>) -> CliResult<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(global_config_path)
        .ok_or_else(|| CliError::Usage("cannot determine config directory; pass --config".into()))
}
