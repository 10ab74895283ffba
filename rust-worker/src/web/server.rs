//! Admin server listener.
//!
//! Serves the admin router over HTTPS when a certificate and key are
//! configured, plain HTTP otherwise. The listener is bound by the caller so a
//! bind failure surfaces before anything is spawned.

use std::io;
use std::path::Path;

use axum::Router;
use axum_server::tls_rustls::{from_tcp_rustls, RustlsConfig};
use tokio::net::TcpListener;
use tracing::info;

/// Load the admin certificate chain and private key from PEM files.
pub async fn load_tls(cert: &Path, key: &Path) -> io::Result<RustlsConfig> {
    // Server configs use the process-wide provider; ring is the one reqwest links.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = RustlsConfig::from_pem_file(cert, key).await?;

    info!(
        cert_file = %cert.display(),
        key_file = %key.display(),
        "admin_tls_loaded"
    );

    Ok(config)
}

/// Serve `app` on an already-bound listener until it fails.
pub async fn serve(listener: TcpListener, app: Router, tls: Option<RustlsConfig>) -> io::Result<()> {
    let addr = listener.local_addr()?;

    match tls {
        Some(config) => {
            info!(address = %addr, scheme = "https", "admin_server_listening");
            from_tcp_rustls(listener.into_std()?, config)
                .serve(app.into_make_service())
                .await
        }
        None => {
            info!(address = %addr, scheme = "http", "admin_server_listening");
            axum::serve(listener, app).await
        }
    }
}
