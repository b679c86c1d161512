//! Logging setup for the binary.

use tracing_subscriber::EnvFilter;

use crate::args::LogFormat;

/// Install a global `tracing` subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Stdout is left
/// for answers.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("warning: logging already initialised: {e}");
    }
}
