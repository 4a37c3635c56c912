use thiserror::Error;

#[derive(Debug, Error)]
pub enum NbqError {
    #[error("Quota metric {metric} was not found in region {region}")]
    QuotaMetricNotFound { metric: String, region: String },
    #[error("Image {image} was not found in project {project}")]
    ImageNotFound { project: String, image: String },
    #[error("Provisioning API error (HTTP {status}): {message}")]
    ProvisioningApiError { status: u16, message: String },
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<anyhow::Error> for NbqError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(error.to_string())
    }
}

impl From<toml::de::Error> for NbqError {
    fn from(error: toml::de::Error) -> Self {
        Self::DeserializationError(error.to_string())
    }
}
