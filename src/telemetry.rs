//! Logging for the engine driver.
//!
//! The driver answers on stdout, one JSON reply per line, so every log line
//! is written to stderr. `LOG_LEVEL` takes `EnvFilter` directives and defaults
//! to debug output for the `attempt` (draws) and `credit` (propagation)
//! targets over an `info` baseline that covers `activity_engine`.
//! `LOG_FORMAT=json` switches to one JSON object per event for log shippers.

use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new("info,attempt=debug,credit=debug"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => {
            builder.json().init();
        }
        _ => {
            builder.init();
        }
    }
}
