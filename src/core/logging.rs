//! Logger initialization

/// Initialize the console logger
///
/// `RUST_LOG` wins when present; otherwise `default_level` (e.g. `"info"`,
/// `"carrierbot=debug"`) is used as the filter. Calling this more than once
/// is harmless: later calls are ignored.
pub fn init_logger(default_level: &str) {
    let mut builder = pretty_env_logger::formatted_timed_builder();

    match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.is_empty() => builder.parse_filters(&filter),
        _ => builder.parse_filters(default_level),
    };

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
