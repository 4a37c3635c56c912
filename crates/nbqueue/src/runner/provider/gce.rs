use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::common::error::NbqError;
use crate::runner::instance::InstanceConfig;
use crate::runner::provider::auth::TokenSource;
use crate::runner::provider::{ApiFuture, ComputeApi, Image, Operation, QuotaEntry};

pub const DEFAULT_API_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

/// Client of the Compute Engine REST API.
#[derive(Clone)]
pub struct GceClient {
    client: reqwest::Client,
    endpoint: String,
    tokens: TokenSource,
}

impl GceClient {
    pub fn new(endpoint: &str, tokens: TokenSource) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint)
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> crate::Result<T> {
        let token = self.tokens.token().await?;
        log::debug!("GET {url}");
        let request = self.client.get(url).bearer_auth(token);
        read_response(request).await
    }
}

#[derive(Deserialize)]
struct RegionResponse {
    #[serde(default)]
    quotas: Vec<QuotaEntry>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Creates an error out of an unsuccessful response.
fn api_error(status: u16, body: &str) -> NbqError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(response) if !response.error.message.is_empty() => response.error.message,
        _ => body.trim().to_string(),
    };
    NbqError::ProvisioningApiError { status, message }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> crate::Result<T> {
    serde_json::from_str(body).map_err(|error| {
        NbqError::DeserializationError(format!(
            "Cannot parse API response: {error}, body: {body}"
        ))
    })
}

async fn read_response<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> crate::Result<T> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }
    parse_body(&body)
}

impl ComputeApi for GceClient {
    fn get_region_quotas(&self, project: &str, region: &str) -> ApiFuture<Vec<QuotaEntry>> {
        let client = self.clone();
        let url = self.url(&format!("projects/{project}/regions/{region}"));
        Box::pin(async move {
            let region: RegionResponse = client.get(url).await?;
            Ok(region.quotas)
        })
    }

    fn get_image(&self, project: &str, image: &str) -> ApiFuture<Image> {
        let client = self.clone();
        let url = self.url(&format!("projects/{project}/global/images/{image}"));
        let project = project.to_string();
        let image = image.to_string();
        Box::pin(async move {
            match client.get::<Image>(url).await {
                Err(NbqError::ProvisioningApiError { status: 404, .. }) => {
                    Err(NbqError::ImageNotFound { project, image })
                }
                result => result,
            }
        })
    }

    fn insert_instance(
        &self,
        project: &str,
        zone: &str,
        config: &InstanceConfig,
    ) -> ApiFuture<Operation> {
        let client = self.clone();
        let url = self.url(&format!("projects/{project}/zones/{zone}/instances"));
        let config = config.clone();
        Box::pin(async move {
            let token = client.tokens.token().await?;
            log::debug!("POST {url}");
            let request = client.client.post(url).bearer_auth(token).json(&config);
            read_response(request).await
        })
    }

    fn delete_instance(&self, project: &str, zone: &str, name: &str) -> ApiFuture<Operation> {
        let client = self.clone();
        let url = self.url(&format!("projects/{project}/zones/{zone}/instances/{name}"));
        Box::pin(async move {
            let token = client.tokens.token().await?;
            log::debug!("DELETE {url}");
            let request = client.client.delete(url).bearer_auth(token);
            read_response(request).await
        })
    }
}
