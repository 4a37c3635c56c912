use serde::Serialize;

use crate::runner::config::{CLOUD_PLATFORM_SCOPE, RunnerConfig};
use crate::runner::jobspec::JobSpec;
use crate::runner::provider::{ComputeApi, Operation};
use crate::runner::template::{build_startup_script, generate_instance_name};

const STARTUP_SCRIPT_KEY: &str = "startup-script";
const DEFAULT_NETWORK: &str = "global/networks/default";
const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Body of an instance insertion request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    pub name: String,
    pub machine_type: String,
    pub guest_accelerators: Vec<AcceleratorConfig>,
    pub scheduling: Scheduling,
    pub disks: Vec<AttachedDisk>,
    pub network_interfaces: Vec<NetworkInterface>,
    pub service_accounts: Vec<ServiceAccount>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcceleratorConfig {
    pub accelerator_type: String,
    pub accelerator_count: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scheduling {
    /// Instances with accelerators cannot be live migrated.
    pub on_host_maintenance: String,
    pub preemptible: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    pub boot: bool,
    pub auto_delete: bool,
    pub initialize_params: DiskInitializeParams,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskInitializeParams {
    pub source_image: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    pub network: String,
    pub access_configs: Vec<AccessConfig>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccessConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceAccount {
    pub email: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metadata {
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetadataItem {
    pub key: String,
    pub value: String,
}

impl InstanceConfig {
    pub fn startup_script(&self) -> Option<&str> {
        self.metadata
            .items
            .iter()
            .find(|item| item.key == STARTUP_SCRIPT_KEY)
            .map(|item| item.value.as_str())
    }
}

/// Instance whose creation was requested, but not necessarily finished yet.
#[derive(Debug, Clone)]
pub struct SubmittedInstance {
    pub name: String,
    pub operation: Operation,
}

pub fn machine_type_path(config: &RunnerConfig) -> String {
    format!(
        "projects/{}/zones/{}/machineTypes/{}",
        config.project, config.zone, config.machine_type
    )
}

pub fn accelerator_type_path(config: &RunnerConfig) -> String {
    format!(
        "projects/{}/zones/{}/acceleratorTypes/{}",
        config.project, config.zone, config.accelerator_type
    )
}

/// Path of the boot image that is used when the image is not resolved through the API.
pub fn global_image_path(config: &RunnerConfig) -> String {
    format!("projects/{}/global/images/{}", config.project, config.image)
}

pub fn build_instance_config(
    config: &RunnerConfig,
    name: String,
    source_image: String,
    startup_script: String,
) -> InstanceConfig {
    InstanceConfig {
        name,
        machine_type: machine_type_path(config),
        guest_accelerators: vec![AcceleratorConfig {
            accelerator_type: accelerator_type_path(config),
            accelerator_count: config.accelerators_per_node,
        }],
        scheduling: Scheduling {
            on_host_maintenance: "TERMINATE".to_string(),
            preemptible: config.preemptible,
        },
        disks: vec![AttachedDisk {
            boot: true,
            auto_delete: true,
            initialize_params: DiskInitializeParams { source_image },
        }],
        network_interfaces: vec![NetworkInterface {
            network: DEFAULT_NETWORK.to_string(),
            access_configs: vec![AccessConfig {
                kind: "ONE_TO_ONE_NAT".to_string(),
                name: "External NAT".to_string(),
            }],
        }],
        service_accounts: vec![ServiceAccount {
            email: DEFAULT_SERVICE_ACCOUNT.to_string(),
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
        }],
        metadata: Metadata {
            items: vec![MetadataItem {
                key: STARTUP_SCRIPT_KEY.to_string(),
                value: startup_script,
            }],
        },
    }
}

/// Builds the instance configuration of a single notebook execution without contacting the API.
pub fn render_instance_config(config: &RunnerConfig, params: &JobSpec) -> InstanceConfig {
    let name = generate_instance_name(config.instance_name_prefix());
    let script = build_startup_script(config, params, &name);
    build_instance_config(config, name, global_image_path(config), script)
}

/// Requests an instance that executes the notebook with the given parameters.
/// Does not wait until the instance is running.
pub async fn create_instance(
    api: &dyn ComputeApi,
    config: &RunnerConfig,
    params: &JobSpec,
) -> crate::Result<SubmittedInstance> {
    let image = api.get_image(&config.project, &config.image).await?;
    let name = generate_instance_name(config.instance_name_prefix());
    let script = build_startup_script(config, params, &name);
    let instance = build_instance_config(config, name, image.self_link, script);

    log::debug!("Creating instance {} for {params}", instance.name);
    let operation = api
        .insert_instance(&config.project, &config.zone, &instance)
        .await?;

    Ok(SubmittedInstance {
        name: instance.name,
        operation,
    })
}

pub async fn delete_instance(
    api: &dyn ComputeApi,
    project: &str,
    zone: &str,
    name: &str,
) -> crate::Result<Operation> {
    log::debug!("Deleting instance {name} in zone {zone}");
    api.delete_instance(project, zone, name).await
}
