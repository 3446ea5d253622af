use tracing_subscriber::EnvFilter;

/// Log to stderr; RUST_LOG overrides, otherwise `--detailed` raises the level
pub fn init_logging(detailed: bool) {
    let default_level = if detailed {
        "info,suv_http_client=debug"
    } else {
        "warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}
