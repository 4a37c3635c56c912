use std::io::Write;

use env_logger::DEFAULT_FILTER_ENV;
use log::LevelFilter;

/// Modules of the HTTP stack that are too chatty on the debug level.
const HTTP_MODULES: [&str; 4] = ["reqwest", "hyper", "hyper_util", "rustls"];

/// Configures the global logger.
///
/// `debug` switches from the info level to the debug level and enables full timestamps.
/// A filter passed in `RUST_LOG` always takes precedence.
pub fn setup_logging(debug: bool) {
    let mut builder = env_logger::Builder::default();
    builder.filter_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    for module in HTTP_MODULES {
        builder.filter_module(module, LevelFilter::Info);
    }

    let env_debug = std::env::var(DEFAULT_FILTER_ENV)
        .map(|v| v.contains("debug") || v.contains("trace"))
        .unwrap_or(false);

    if debug || env_debug {
        builder.format_timestamp_millis();
    } else {
        // <time> <level> <message>
        builder.format(|buf, record| {
            let level_style = buf.default_level_style(record.level()).bold();
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        });
    }

    builder.parse_default_env();
    builder.init();
}
