use clap::{CommandFactory, FromArgMatches};

use nbqueue::client::commands::{command_delete, command_dry_run, command_quota, command_run};
use nbqueue::client::globalsettings::GlobalSettings;
use nbqueue::common::cli::{CommonOpts, RootOptions, SubCommand};
use nbqueue::common::setup::setup_logging;

fn make_global_settings(opts: CommonOpts) -> GlobalSettings {
    GlobalSettings::new(opts.api_endpoint, opts.access_token)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> nbqueue::Result<()> {
    let matches = RootOptions::command().get_matches();
    let top_opts = match RootOptions::from_arg_matches(&matches) {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    setup_logging(top_opts.common.debug);

    let gsettings = make_global_settings(top_opts.common);
    log::debug!("Using Compute Engine API at {}", gsettings.api_endpoint());

    let result = match top_opts.subcmd {
        SubCommand::Run(opts) => command_run(&gsettings, opts).await,
        SubCommand::DryRun(opts) => command_dry_run(opts),
        SubCommand::Quota(opts) => command_quota(&gsettings, opts).await,
        SubCommand::Delete(opts) => command_delete(&gsettings, opts).await,
    };

    if let Err(e) = result {
        log::error!("{e:?}");
        std::process::exit(1);
    }

    Ok(())
}
