use crate::runner::provider::auth::TokenSource;
use crate::runner::provider::gce::GceClient;

/// Settings shared by all commands.
pub struct GlobalSettings {
    api_endpoint: String,
    tokens: TokenSource,
}

impl GlobalSettings {
    pub fn new(api_endpoint: String, access_token: Option<String>) -> Self {
        let tokens = match access_token {
            Some(token) => TokenSource::Static(token),
            None => TokenSource::Gcloud,
        };
        GlobalSettings {
            api_endpoint,
            tokens,
        }
    }

    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    pub fn compute_api(&self) -> GceClient {
        GceClient::new(&self.api_endpoint, self.tokens.clone())
    }
}
