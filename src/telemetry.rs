use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Filter used when `RUST_LOG` is unset. Debug output is only emitted outside
/// production (`APP_ENV=PRODUCTION`).
pub fn default_filter(environment: Option<&str>) -> &'static str {
    match environment {
        Some(env) if env.eq_ignore_ascii_case("production") => "info,sqlx=warn",
        _ => "debug,sqlx=warn,html5ever=info,selectors=info",
    }
}

/// Sets up the global tracing subscriber with a fmt formatter and env filter.
///
/// The caller provides a fallback filter string that is used when `RUST_LOG` is
/// not set.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
