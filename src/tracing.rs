//! Tracing (logging)

use crate::cli::CommandLineArgs;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initlialise tracing (logging)
///
/// Applies a filter based on the `RUST_LOG` environment variable, falling back to enable debug
/// logging for this crate and tower_http if not set.
///
/// If enabled, spans are also exported to a Jaeger agent.
///
/// # Arguments
///
/// * `args`: Command line arguments
pub fn init_tracing(args: &CommandLineArgs) {
    let jaeger_layer = if args.enable_jaeger {
        let tracer = opentelemetry_jaeger::new_agent_pipeline()
            .with_service_name("xray")
            .install_simple()
            .expect("Failed to initialise Jaeger tracing");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xray=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(jaeger_layer)
        .init();
}

/// Flush any outstanding spans and shut down the tracer provider.
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}
