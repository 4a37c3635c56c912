use std::process::Output;

use anyhow::Context;
use bstr::ByteSlice;
use tokio::process::Command;

use crate::common::error::NbqError;

/// Program used to obtain access tokens when no token was passed explicitly.
pub const GCLOUD_PROGRAM: &str = "gcloud";

/// Source of OAuth access tokens for the provisioning API.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// A fixed token.
    Static(String),
    /// Ask the `gcloud` CLI for a token before each request.
    /// It caches the token by itself and refreshes it when it expires.
    Gcloud,
}

impl TokenSource {
    pub async fn token(&self) -> crate::Result<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Gcloud => gcloud_access_token().await,
        }
    }
}

async fn gcloud_access_token() -> crate::Result<String> {
    let output = Command::new(GCLOUD_PROGRAM)
        .args(["auth", "print-access-token"])
        .output()
        .await
        .with_context(|| format!("{GCLOUD_PROGRAM} start failed"))?;
    let output = check_command_output(output)
        .with_context(|| format!("{GCLOUD_PROGRAM} execution failed"))?;
    parse_token(&output.stdout)
}

fn parse_token(stdout: &[u8]) -> crate::Result<String> {
    let token = stdout
        .to_str()
        .map_err(|e| NbqError::GenericError(format!("Invalid UTF-8 access token: {e:?}")))?
        .trim();
    if token.is_empty() {
        return Err(NbqError::GenericError(format!(
            "{GCLOUD_PROGRAM} returned an empty access token"
        )));
    }
    Ok(token.to_string())
}

pub fn check_command_output(output: Output) -> anyhow::Result<Output> {
    let status = output.status;
    if !status.success() {
        return Err(anyhow::anyhow!(
            "Exit code: {}\nStderr: {}\nStdout: {}",
            status.code().unwrap_or(-1),
            output.stderr.to_str_lossy().trim(),
            output.stdout.to_str_lossy().trim()
        ));
    }
    Ok(output)
}
