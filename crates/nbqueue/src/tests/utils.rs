use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use derive_builder::Builder;

use crate::common::error::NbqError;
use crate::runner::config::{
    DEFAULT_ACCELERATOR_TYPE, DEFAULT_MACHINE_TYPE, DEFAULT_POLL_INTERVAL,
    DEFAULT_STARTUP_SCRIPT, RunnerConfig, SubmitOrder,
};
use crate::runner::instance::InstanceConfig;
use crate::runner::jobspec::JobSpec;
use crate::runner::provider::{ApiFuture, ComputeApi, Image, Operation, QuotaEntry};

pub fn job(params: &[(&str, &str)]) -> JobSpec {
    params.iter().copied().collect()
}

#[derive(Builder)]
#[builder(pattern = "owned", build_fn(name = "finish"))]
pub struct Runner {
    #[builder(default = "\"proj\".to_string()", setter(into))]
    project: String,
    #[builder(default = "\"us-west1\".to_string()", setter(into))]
    region: String,
    #[builder(default = "\"us-west1-a\".to_string()", setter(into))]
    zone: String,
    #[builder(default = "\"gpu-image\".to_string()", setter(into))]
    image: String,
    #[builder(default = "DEFAULT_MACHINE_TYPE.to_string()", setter(into))]
    machine_type: String,
    #[builder(default = "DEFAULT_ACCELERATOR_TYPE.to_string()", setter(into))]
    accelerator_type: String,
    #[builder(default = "1")]
    accelerators_per_node: u32,
    #[builder(default)]
    preemptible: bool,
    #[builder(default)]
    max_accelerators: Option<u64>,
    #[builder(default = "\"nbq/notebook:latest\".to_string()", setter(into))]
    docker_image: String,
    #[builder(default = "PathBuf::from(\"/data\")", setter(into))]
    data_folder: PathBuf,
    #[builder(default = "PathBuf::from(\"/data/models\")", setter(into))]
    model_folder: PathBuf,
    #[builder(default = "PathBuf::from(\"/data/notebook.ipynb\")", setter(into))]
    input_notebook: PathBuf,
    #[builder(default = "PathBuf::from(\"/data/output\")", setter(into))]
    output_notebook_dir: PathBuf,
    #[builder(default = "\"gs://bucket/models\".to_string()", setter(into))]
    model_bucket: String,
    #[builder(default = "DEFAULT_STARTUP_SCRIPT.to_string()", setter(into))]
    startup_script_template: String,
    #[builder(default = "DEFAULT_POLL_INTERVAL")]
    poll_interval: Duration,
    #[builder(default)]
    submit_order: SubmitOrder,
}

impl RunnerBuilder {
    pub fn build(self) -> RunnerConfig {
        let Runner {
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
        } = self.finish().unwrap();
        RunnerConfig {
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
        }
    }
}

/// State shared between a test and [`TestApi`].
pub struct ApiState {
    /// Scripted `(usage, limit)` answers. The last one is repeated forever.
    pub quotas: VecDeque<(u64, u64)>,
    /// Metric under which the scripted quotas are reported.
    pub metric: String,
    pub polls: usize,
    pub created: Vec<InstanceConfig>,
    /// Number of quota polls that happened before each instance creation.
    pub polls_at_creation: Vec<usize>,
    /// `(project, zone, name)` of deleted instances.
    pub deleted: Vec<(String, String, String)>,
    /// Index of the creation request that fails.
    pub fail_create_at: Option<usize>,
    /// Index of the quota poll that fails.
    pub fail_poll_at: Option<usize>,
    pub missing_image: bool,
    create_attempts: usize,
}

impl ApiState {
    pub fn with_quotas(quotas: &[(u64, u64)]) -> Rc<RefCell<ApiState>> {
        Rc::new(RefCell::new(ApiState {
            quotas: quotas.iter().copied().collect(),
            metric: "NVIDIA_T4_GPUS".to_string(),
            polls: 0,
            created: vec![],
            polls_at_creation: vec![],
            deleted: vec![],
            fail_create_at: None,
            fail_poll_at: None,
            missing_image: false,
            create_attempts: 0,
        }))
    }

    /// Values of the `id` parameter of created instances, read from their startup scripts.
    pub fn submitted_ids(&self) -> Vec<String> {
        self.created
            .iter()
            .filter_map(|instance| {
                let script = instance.startup_script()?;
                let (_, rest) = script.split_once("-p id ")?;
                rest.split_whitespace().next().map(|id| id.to_string())
            })
            .collect()
    }

    fn next_quota(&mut self) -> Option<(u64, u64)> {
        if self.quotas.len() > 1 {
            self.quotas.pop_front()
        } else {
            self.quotas.front().copied()
        }
    }
}

/// In-memory provisioning API driven by [`ApiState`].
pub struct TestApi {
    state: Rc<RefCell<ApiState>>,
}

impl TestApi {
    pub fn new(state: Rc<RefCell<ApiState>>) -> Self {
        Self { state }
    }
}

impl ComputeApi for TestApi {
    fn get_region_quotas(&self, _project: &str, _region: &str) -> ApiFuture<Vec<QuotaEntry>> {
        let state = self.state.clone();
        Box::pin(async move {
            let mut state = state.borrow_mut();
            if state.fail_poll_at == Some(state.polls) {
                return Err(NbqError::ProvisioningApiError {
                    status: 503,
                    message: "The service is currently unavailable".to_string(),
                });
            }
            state.polls += 1;
            let mut quotas = vec![QuotaEntry {
                metric: "CPUS".to_string(),
                limit: 64.0,
                usage: 8.0,
            }];
            if let Some((usage, limit)) = state.next_quota() {
                quotas.push(QuotaEntry {
                    metric: state.metric.clone(),
                    limit: limit as f64,
                    usage: usage as f64,
                });
            }
            Ok(quotas)
        })
    }

    fn get_image(&self, project: &str, image: &str) -> ApiFuture<Image> {
        let state = self.state.clone();
        let project = project.to_string();
        let image = image.to_string();
        Box::pin(async move {
            if state.borrow().missing_image {
                return Err(NbqError::ImageNotFound { project, image });
            }
            Ok(Image {
                self_link: format!("https://compute.test/projects/{project}/global/images/{image}"),
                name: image,
            })
        })
    }

    fn insert_instance(
        &self,
        _project: &str,
        _zone: &str,
        config: &InstanceConfig,
    ) -> ApiFuture<Operation> {
        let state = self.state.clone();
        let config = config.clone();
        Box::pin(async move {
            let mut state = state.borrow_mut();
            let attempt = state.create_attempts;
            state.create_attempts += 1;
            if state.fail_create_at == Some(attempt) {
                return Err(NbqError::ProvisioningApiError {
                    status: 409,
                    message: format!("The resource '{}' already exists", config.name),
                });
            }
            let polls = state.polls;
            state.polls_at_creation.push(polls);
            let operation = Operation {
                name: format!("operation-{attempt}"),
                status: Some("PENDING".to_string()),
                target_link: Some(config.name.clone()),
            };
            state.created.push(config);
            Ok(operation)
        })
    }

    fn delete_instance(&self, project: &str, zone: &str, name: &str) -> ApiFuture<Operation> {
        let state = self.state.clone();
        let deleted = (project.to_string(), zone.to_string(), name.to_string());
        Box::pin(async move {
            state.borrow_mut().deleted.push(deleted);
            Ok(Operation {
                name: "operation-delete".to_string(),
                ..Default::default()
            })
        })
    }
}
