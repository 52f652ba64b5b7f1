use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "guoxue=info,guoxue_core=info";
const VERBOSE_FILTER: &str = "guoxue=debug,guoxue_core=debug";

/// Install the stderr subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => DEFAULT_FILTER,
        1 => VERBOSE_FILTER,
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}
