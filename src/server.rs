//! Web server

use crate::cli;

use std::{net::SocketAddr, path::PathBuf, process::exit, str::FromStr, time::Duration};

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;

/// Serve the X-Ray service
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `service`: The [crate::app::Service] to serve
pub async fn serve(args: &cli::CommandLineArgs, service: crate::app::Service) {
    let addr = SocketAddr::from_str(&format!("{}:{}", args.host, args.port))
        .expect("invalid host name, IP address or port number");

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    if args.https {
        let abs_cert_file = tls_file_path(&args.cert_file, "certificate");
        let abs_key_file = tls_file_path(&args.key_file, "key");
        // Set up TLS config
        let tls_config = RustlsConfig::from_pem_file(abs_cert_file, abs_key_file)
            .await
            .expect("Failed to load TLS certificate files");
        tracing::info!("listening on https://{}", addr);
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(service.into_make_service())
            .await
            .expect("HTTPS server failed");
    } else {
        tracing::info!("listening on http://{}", addr);
        axum_server::bind(addr)
            .handle(handle)
            .serve(service.into_make_service())
            .await
            .expect("HTTP server failed");
    }
}

/// Expand and canonicalize the path of a TLS file, exiting if it does not exist.
fn tls_file_path(path: &str, kind: &str) -> PathBuf {
    match resolve_file(path) {
        Some(abs_path) => abs_path,
        None => {
            tracing::error!("TLS {} file expected at '{}' but not found.", kind, path);
            exit(1)
        }
    }
}

/// Returns the absolute path of an existing file, or `None` if it does not exist.
fn resolve_file(path: &str) -> Option<PathBuf> {
    let expanded = expanduser(path)
        .expect("Failed to expand ~ to user name. Please provide an absolute path instead.");
    if !expanded.exists() {
        return None;
    }
    let abs_path = expanded
        .canonicalize()
        .expect("failed to determine absolute path to TLS file");
    Some(abs_path)
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
    // Force shutdown if graceful shutdown takes longer than the timeout
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}
