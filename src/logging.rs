use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. Silent unless `RUST_LOG` asks for output,
/// so stdout carries only the report and stderr only diagnostics.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
