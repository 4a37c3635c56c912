use crate::common::error::NbqError;
use crate::runner::config::RunnerConfig;
use crate::runner::provider::{ComputeApi, QuotaEntry};

const PREEMPTIBLE_PREFIX: &str = "PREEMPTIBLE_";
const VENDOR_PREFIX: &str = "NVIDIA_";

/// Accelerator usage and limit of a single quota metric at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub usage: u64,
    pub limit: u64,
}

impl QuotaSnapshot {
    /// Lowers the limit to `max`, if it is set.
    pub fn capped(self, max: Option<u64>) -> Self {
        match max {
            Some(max) => Self {
                usage: self.usage,
                limit: self.limit.min(max),
            },
            None => self,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.usage < self.limit
    }
}

/// Accelerator families that have their own quota metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorFamily {
    T4,
    V100,
    P100,
}

impl AcceleratorFamily {
    /// Finds the family by a substring of the accelerator type (e.g. `nvidia-tesla-t4`).
    pub fn detect(accelerator_type: &str) -> Option<Self> {
        let accelerator_type = accelerator_type.to_lowercase();
        if accelerator_type.contains("t4") {
            Some(Self::T4)
        } else if accelerator_type.contains("v100") {
            Some(Self::V100)
        } else if accelerator_type.contains("p100") {
            Some(Self::P100)
        } else {
            None
        }
    }

    fn metric_code(&self) -> &'static str {
        match self {
            Self::T4 => "T4_GPUS",
            Self::V100 => "V100_GPUS",
            Self::P100 => "P100_GPUS",
        }
    }
}

/// Returns the name of the quota metric that limits the given accelerators, e.g.
/// `PREEMPTIBLE_NVIDIA_T4_GPUS`.
pub fn accelerator_metric(family: AcceleratorFamily, preemptible: bool) -> String {
    let prefix = if preemptible { PREEMPTIBLE_PREFIX } else { "" };
    format!("{prefix}{VENDOR_PREFIX}{}", family.metric_code())
}

pub fn find_quota(quotas: &[QuotaEntry], metric: &str) -> Option<QuotaSnapshot> {
    quotas
        .iter()
        .find(|quota| quota.metric == metric)
        .map(|quota| QuotaSnapshot {
            usage: quota_value(quota.usage),
            limit: quota_value(quota.limit),
        })
}

/// The API reports quota values as floating point numbers.
fn quota_value(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

/// Fetches the current usage and limit of the accelerators configured in `config`.
/// The quota is queried again on every call.
pub async fn poll_accelerators(
    api: &dyn ComputeApi,
    config: &RunnerConfig,
) -> crate::Result<QuotaSnapshot> {
    let Some(family) = AcceleratorFamily::detect(&config.accelerator_type) else {
        return Err(NbqError::QuotaMetricNotFound {
            metric: format!(
                "{VENDOR_PREFIX}<unknown accelerator {}>",
                config.accelerator_type
            ),
            region: config.region.clone(),
        });
    };
    let metric = accelerator_metric(family, config.preemptible);

    let quotas = api
        .get_region_quotas(&config.project, &config.region)
        .await?;
    log::trace!("Region {} quotas: {quotas:?}", config.region);

    find_quota(&quotas, &metric).ok_or_else(|| NbqError::QuotaMetricNotFound {
        metric,
        region: config.region.clone(),
    })
}
