use tracing_subscriber::EnvFilter;

/// Initializes a `tracing_subscriber` using `PIXLINE_LOG` first, then
/// `RUST_LOG`, then a default of `info`.
///
/// Log field contract for reader events:
/// - Include `event` on every structured pipeline event.
/// - Include `rank`/`world_size` on any sharding-related event.
/// - Include the sample index on any per-sample warning.
pub fn init_tracing() {
    let filter = env_filter();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("PIXLINE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
