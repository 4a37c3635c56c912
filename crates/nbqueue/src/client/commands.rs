use std::path::PathBuf;

use clap::Parser;

use crate::client::globalsettings::GlobalSettings;
use crate::client::rundef::RunDef;
use crate::common::timeutils::ArgDuration;
use crate::runner::config::{RunnerConfig, SubmitOrder};
use crate::runner::instance::{delete_instance, render_instance_config};
use crate::runner::jobspec::JobSpec;
use crate::runner::process::SubmissionLoop;
use crate::runner::quota::poll_accelerators;

#[derive(Parser)]
pub struct RunOpts {
    /// Path to a TOML run definition
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// How long to wait before checking the quota again when no accelerator is free
    ///
    /// Overrides `poll_interval` of the run definition.
    #[arg(long)]
    pub poll_interval: Option<ArgDuration>,

    /// Order in which notebooks are submitted
    #[arg(long, value_enum)]
    pub order: Option<SubmitOrder>,

    /// Maximum number of accelerators used at once, on top of the regional quota
    #[arg(long)]
    pub max_accelerators: Option<u64>,
}

#[derive(Parser)]
pub struct DryRunOpts {
    /// Path to a TOML run definition
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,
}

#[derive(Parser)]
pub struct QuotaOpts {
    /// Path to a TOML run definition
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,
}

#[derive(Parser)]
pub struct DeleteOpts {
    /// Path to a TOML run definition
    ///
    /// Only `project` and `zone` are read from it, the rest of the file is not validated.
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Name of the instance
    pub instance: String,

    /// Project of the instance, if it differs from the project of the run definition
    #[arg(long)]
    pub project: Option<String>,

    /// Zone of the instance, if it differs from the zone of the run definition
    #[arg(long)]
    pub zone: Option<String>,
}

fn load_run(path: &std::path::Path) -> anyhow::Result<(RunnerConfig, Vec<JobSpec>)> {
    let rdef = RunDef::load(path)?;
    Ok(rdef.into_parts()?)
}

pub async fn command_run(gsettings: &GlobalSettings, opts: RunOpts) -> anyhow::Result<()> {
    let (mut config, jobs) = load_run(&opts.path)?;
    if let Some(interval) = opts.poll_interval {
        config.poll_interval = interval.unpack();
    }
    if let Some(order) = opts.order {
        config.submit_order = order;
    }
    if let Some(max) = opts.max_accelerators {
        if max == 0 {
            anyhow::bail!("--max-accelerators must be at least 1");
        }
        config.max_accelerators = Some(max);
    }

    log::info!(
        "Submitting {} notebook(s) to project {}, zone {} ({} x {} per instance)",
        jobs.len(),
        config.project,
        config.zone,
        config.accelerators_per_node,
        config.accelerator_type
    );

    let mut runner = SubmissionLoop::new(config, Box::new(gsettings.compute_api()), jobs);
    let result = runner.run().await;

    let stats = runner.stats();
    match result {
        Ok(()) => {
            log::info!(
                "All {} notebook(s) were submitted: {}",
                stats.submitted.len(),
                stats.submitted.join(", ")
            );
            Ok(())
        }
        Err(error) => {
            log::error!("{}", format_unsubmitted(runner.failed(), &runner.remaining()));
            Err(error.into())
        }
    }
}

/// Describes notebooks that were not submitted because the run has stopped.
fn format_unsubmitted(failed: Option<&JobSpec>, remaining: &[&JobSpec]) -> String {
    let mut lines = vec![];
    if let Some(job) = failed {
        lines.push(format!("Failed notebook: {job}"));
    }
    if remaining.is_empty() {
        lines.push("No other notebooks were waiting".to_string());
    } else {
        lines.push(format!("{} notebook(s) were not submitted:", remaining.len()));
        lines.extend(remaining.iter().map(|job| format!("  {job}")));
    }
    lines.join("\n")
}

pub fn command_dry_run(opts: DryRunOpts) -> anyhow::Result<()> {
    let (config, jobs) = load_run(&opts.path)?;
    println!("{}", format_dry_run(&config, &jobs)?);
    Ok(())
}

fn format_dry_run(config: &RunnerConfig, jobs: &[JobSpec]) -> anyhow::Result<String> {
    let instances: Vec<_> = jobs
        .iter()
        .map(|job| render_instance_config(config, job))
        .collect();
    Ok(serde_json::to_string_pretty(&instances)?)
}

pub async fn command_quota(gsettings: &GlobalSettings, opts: QuotaOpts) -> anyhow::Result<()> {
    let (config, _) = load_run(&opts.path)?;
    let api = gsettings.compute_api();
    let quota = poll_accelerators(&api, &config).await?;
    println!(
        "{} in region {}: {}/{} used",
        config.accelerator_type, config.region, quota.usage, quota.limit
    );
    if let Some(max) = config.max_accelerators {
        let capped = quota.capped(Some(max));
        println!("Limit of this run: {}/{} used", capped.usage, capped.limit);
    }
    Ok(())
}

/// Finds the project and zone of an instance that should be deleted.
fn delete_location(opts: &DeleteOpts) -> anyhow::Result<(String, String)> {
    let runner = RunDef::read(&opts.path)?.runner;
    let project = opts.project.clone().unwrap_or(runner.project);
    let zone = opts.zone.clone().unwrap_or(runner.zone);
    if project.trim().is_empty() || zone.trim().is_empty() {
        anyhow::bail!("Project and zone of the instance must not be empty");
    }
    Ok((project, zone))
}

pub async fn command_delete(gsettings: &GlobalSettings, opts: DeleteOpts) -> anyhow::Result<()> {
    let (project, zone) = delete_location(&opts)?;
    let api = gsettings.compute_api();
    let operation = delete_instance(&api, &project, &zone, &opts.instance).await?;
    log::info!(
        "Deletion of instance {} requested (operation {})",
        opts.instance,
        operation.name
    );
    Ok(())
}
