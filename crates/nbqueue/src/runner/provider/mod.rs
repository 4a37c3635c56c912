pub mod auth;
pub mod gce;

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::runner::instance::InstanceConfig;

pub type ApiFuture<T> = Pin<Box<dyn Future<Output = crate::Result<T>>>>;

/// Usage and limit of a single regional quota metric.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuotaEntry {
    pub metric: String,
    #[serde(default)]
    pub limit: f64,
    #[serde(default)]
    pub usage: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub name: String,
    /// Fully qualified URL of the image, used as a boot disk source.
    pub self_link: String,
}

/// Long-running operation started by the provisioning API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub target_link: Option<String>,
}

/// Handler that can communicate with a compute provisioning API.
///
/// All returned futures own their data, so that they can outlive the borrow of the handler.
pub trait ComputeApi {
    /// Get all quotas of a region.
    fn get_region_quotas(&self, project: &str, region: &str) -> ApiFuture<Vec<QuotaEntry>>;

    /// Find a boot disk image by its name.
    ///
    /// Returns [`crate::Error::ImageNotFound`] if the image does not exist.
    fn get_image(&self, project: &str, image: &str) -> ApiFuture<Image>;

    /// Request the creation of a new instance.
    /// The instance is not running yet when the returned operation resolves.
    fn insert_instance(
        &self,
        project: &str,
        zone: &str,
        config: &InstanceConfig,
    ) -> ApiFuture<Operation>;

    /// Request the deletion of an existing instance.
    fn delete_instance(&self, project: &str, zone: &str, name: &str) -> ApiFuture<Operation>;
}
