//! Logger setup for the binaries.

use log::LevelFilter;

/// Initialize `env_logger`.
///
/// `RUST_LOG` applies as usual (default `warn`); `verbose` forces `debug`.
pub fn init(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.format_timestamp(None).try_init();
}
