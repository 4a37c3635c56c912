use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::common::error::NbqError;
use crate::common::placeholders::{KNOWN_PLACEHOLDERS, find_unknown_placeholders};

/// How long to wait before the quota is checked again when there is no free accelerator.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_MACHINE_TYPE: &str = "n1-highmem-16";
pub const DEFAULT_ACCELERATOR_TYPE: &str = "nvidia-tesla-t4";
pub const DEFAULT_REGION: &str = "us-west1";
pub const DEFAULT_ZONE: &str = "us-west1-a";

/// OAuth scope granted to the default service account of created instances.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Script executed by each instance after it boots.
/// It runs the notebook, uploads the produced models and then deletes the instance itself.
pub const DEFAULT_STARTUP_SCRIPT: &str = r#"#!/bin/bash
sudo docker run --gpus all -v %{DATA_FOLDER}:/data %{DOCKER_IMAGE} papermill %{INPUT_NOTEBOOK} %{OUTPUT_NOTEBOOK} %{PARAMETERS}
gsutil cp -r %{MODEL_FOLDER}/* %{MODEL_BUCKET}
sudo gcloud --quiet compute instances delete %{INSTANCE_NAME} --zone %{ZONE}
"#;

/// Order in which queued notebooks are submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubmitOrder {
    /// Submit notebooks in the order in which they were defined.
    #[default]
    Fifo,
    /// Submit the last defined notebook first.
    Lifo,
}

/// Provisioning options shared by all instances launched by a single run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub project: String,
    pub region: String,
    pub zone: String,
    /// Name of the boot disk image, looked up in `project`.
    pub image: String,

    pub machine_type: String,
    pub accelerator_type: String,
    pub accelerators_per_node: u32,
    pub preemptible: bool,
    /// Upper bound on the accelerators used at once, applied on top of the regional quota.
    pub max_accelerators: Option<u64>,

    pub docker_image: String,
    /// Paths on the instance.
    pub data_folder: PathBuf,
    pub model_folder: PathBuf,
    pub input_notebook: PathBuf,
    pub output_notebook_dir: PathBuf,
    /// Cloud storage destination of the model folder.
    pub model_bucket: String,

    pub startup_script_template: String,
    pub poll_interval: Duration,
    pub submit_order: SubmitOrder,
}

impl RunnerConfig {
    /// Prefix of generated instance names.
    pub fn instance_name_prefix(&self) -> &str {
        &self.project
    }

    pub fn validate(&self) -> crate::Result<()> {
        let required = [
            ("project", self.project.as_str()),
            ("region", self.region.as_str()),
            ("zone", self.zone.as_str()),
            ("image", self.image.as_str()),
            ("machine_type", self.machine_type.as_str()),
            ("accelerator_type", self.accelerator_type.as_str()),
            ("docker_image", self.docker_image.as_str()),
            ("model_bucket", self.model_bucket.as_str()),
        ];
        let paths = [
            ("data_folder", &self.data_folder),
            ("model_folder", &self.model_folder),
            ("input_notebook", &self.input_notebook),
            ("output_notebook_dir", &self.output_notebook_dir),
        ];
        let paths = paths
            .into_iter()
            .map(|(name, path)| (name, path.to_string_lossy()));
        let required = required
            .into_iter()
            .map(|(name, value)| (name, Cow::Borrowed(value)))
            .chain(paths);
        // An empty path would be expanded by the startup script, e.g. `''/*` into `/*`
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(NbqError::DeserializationError(format!(
                    "Runner attribute '{name}' must not be empty"
                )));
            }
        }
        if self.accelerators_per_node == 0 {
            return Err(NbqError::DeserializationError(
                "Runner attribute 'accelerators_per_node' must be at least 1".into(),
            ));
        }
        if !self
            .zone
            .strip_prefix(self.region.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
        {
            return Err(NbqError::DeserializationError(format!(
                "Zone {} does not belong to region {}",
                self.zone, self.region
            )));
        }
        let unknown =
            find_unknown_placeholders(&self.startup_script_template, &KNOWN_PLACEHOLDERS);
        if !unknown.is_empty() {
            return Err(NbqError::DeserializationError(format!(
                "Startup script contains unknown placeholder(s): {}",
                unknown.join(", ")
            )));
        }
        Ok(())
    }
}
