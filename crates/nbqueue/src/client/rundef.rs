use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::common::error::NbqError;
use crate::common::timeutils::parse_human_time;
use crate::runner::config::{
    DEFAULT_ACCELERATOR_TYPE, DEFAULT_MACHINE_TYPE, DEFAULT_POLL_INTERVAL, DEFAULT_REGION,
    DEFAULT_STARTUP_SCRIPT, DEFAULT_ZONE, RunnerConfig, SubmitOrder,
};
use crate::runner::jobspec::JobSpec;

fn deserialize_human_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    parse_human_time(&buf).map_err(serde::de::Error::custom)
}

fn default_machine_type() -> String {
    DEFAULT_MACHINE_TYPE.to_string()
}

fn default_accelerator_type() -> String {
    DEFAULT_ACCELERATOR_TYPE.to_string()
}

fn default_accelerators_per_node() -> u32 {
    1
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_zone() -> String {
    DEFAULT_ZONE.to_string()
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RunnerDef {
    pub project: String,
    pub image: String,
    pub docker_image: String,
    pub data_folder: PathBuf,
    pub model_folder: PathBuf,
    pub input_notebook: PathBuf,
    pub output_notebook_dir: PathBuf,
    pub model_bucket: String,

    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_zone")]
    pub zone: String,
    #[serde(default = "default_machine_type")]
    pub machine_type: String,
    #[serde(default = "default_accelerator_type")]
    pub accelerator_type: String,
    #[serde(default = "default_accelerators_per_node")]
    pub accelerators_per_node: u32,
    #[serde(default)]
    pub preemptible: bool,
    pub max_accelerators: Option<u64>,

    /// Path to a custom startup script template.
    /// A relative path is resolved against the directory of the run definition.
    pub startup_script: Option<PathBuf>,

    #[serde(default = "default_poll_interval")]
    #[serde(deserialize_with = "deserialize_human_duration")]
    pub poll_interval: Duration,
    #[serde(default)]
    pub submit_order: SubmitOrder,
}

/// Definition of a whole run: how to provision instances and which notebooks to execute.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RunDef {
    pub runner: RunnerDef,

    #[serde(default)]
    #[serde(rename = "job")]
    pub jobs: Vec<JobSpec>,
}

impl RunDef {
    pub fn validate(&self) -> crate::Result<()> {
        if self.jobs.is_empty() {
            return Err(NbqError::DeserializationError("No jobs defined".into()));
        }
        if self.runner.max_accelerators == Some(0) {
            return Err(NbqError::DeserializationError(
                "Runner attribute 'max_accelerators' must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn parse(str: &str) -> crate::Result<RunDef> {
        let rdef: RunDef = toml::from_str(str)?;
        rdef.validate()?;
        Ok(rdef)
    }

    /// Reads a run definition from a file without validating it.
    /// The startup script template is not read either.
    pub fn read(path: &Path) -> crate::Result<RunDef> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NbqError::GenericError(format!("Cannot read {}: {e}", path.display()))
        })?;
        let mut rdef: RunDef = toml::from_str(&content)?;
        if let Some(script) = rdef.runner.startup_script.take() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            rdef.runner.startup_script = Some(base.join(script));
        }
        Ok(rdef)
    }

    /// Reads and validates a run definition from a file.
    pub fn load(path: &Path) -> crate::Result<RunDef> {
        let rdef = Self::read(path)?;
        rdef.validate()?;
        Ok(rdef)
    }

    /// Creates a validated runner configuration and the queue of notebooks.
    pub fn into_parts(self) -> crate::Result<(RunnerConfig, Vec<JobSpec>)> {
        let RunnerDef {
            project,
            image,
            docker_image,
            data_folder,
            model_folder,
            input_notebook,
            output_notebook_dir,
            model_bucket,
            region,
            zone,
            machine_type,
            accelerator_type,
            accelerators_per_node,
            preemptible,
            max_accelerators,
            startup_script,
            poll_interval,
            submit_order,
        } = self.runner;

        let startup_script_template = match startup_script {
            Some(path) => std::fs::read_to_string(&path).map_err(|e| {
                NbqError::GenericError(format!(
                    "Cannot read startup script {}: {e}",
                    path.display()
                ))
            })?,
            None => DEFAULT_STARTUP_SCRIPT.to_string(),
        };

        let config = RunnerConfig {
            project,
            region,
            zone,
            image,
            machine_type,
            accelerator_type,
            accelerators_per_node,
            preemptible,
            max_accelerators,
            docker_image,
            data_folder,
            model_folder,
            input_notebook,
            output_notebook_dir,
            model_bucket,
            startup_script_template,
            poll_interval,
            submit_order,
        };
        config.validate()?;
        Ok((config, self.jobs))
    }
}
