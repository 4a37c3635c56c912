use clap::Parser;

use crate::client::commands::{DeleteOpts, DryRunOpts, QuotaOpts, RunOpts};
use crate::runner::provider::gce::DEFAULT_API_ENDPOINT;

// Common CLI options
#[derive(Parser)]
pub struct CommonOpts {
    /// Enables more detailed log output
    #[arg(
        long,
        env = "NBQ_DEBUG",
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub debug: bool,

    /// OAuth access token used for the Compute Engine API
    ///
    /// If it is not set, a token is obtained with `gcloud auth print-access-token`.
    #[arg(
        long,
        env = "NBQ_ACCESS_TOKEN",
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_env_values(true)
    )]
    pub access_token: Option<String>,

    /// Base URL of the Compute Engine API
    #[arg(
        long,
        env = "NBQ_API_ENDPOINT",
        default_value = DEFAULT_API_ENDPOINT,
        global = true,
        help_heading("GLOBAL OPTIONS"),
        hide_short_help(true)
    )]
    pub api_endpoint: String,
}

// Root CLI options
#[derive(Parser)]
#[command(
    about,
    version(crate::NBQ_VERSION),
    disable_help_subcommand(true),
    help_expected(true)
)]
pub struct RootOptions {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Parser)]
pub enum SubCommand {
    /// Submit all notebooks of a run definition, waiting for free accelerators when needed
    Run(RunOpts),
    /// Print instance configurations of a run definition without creating anything
    DryRun(DryRunOpts),
    /// Show the current usage of the accelerator quota
    Quota(QuotaOpts),
    /// Delete an instance created by a run
    Delete(DeleteOpts),
}
