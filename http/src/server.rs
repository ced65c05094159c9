use axum::Router;
use axum_server::{
    tls_rustls::RustlsConfig,
    Handle,
};
use color_eyre::Result;
use eyre::Context as _;
use logstash_exporter_config::WebConfig;
use std::{
    net::SocketAddr,
    time::Duration,
};
use tokio::net::TcpListener;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Serve `app` until ctrl-c, terminating TLS when the web config asks for it.
pub async fn serve(app: Router, address: SocketAddr, web_config: Option<WebConfig>) -> Result<()> {
    match web_config.as_ref().and_then(WebConfig::tls) {
        Some(tls) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls.cert_file, &tls.key_file)
                .await
                .wrap_err_with(|| {
                    format!(
                        "Failed to load TLS certificate {} and key {}",
                        tls.cert_file.display(),
                        tls.key_file.display()
                    )
                })?;

            let handle = Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                async move {
                    shutdown_signal().await;
                    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
                }
            });

            info!(%address, "listening with TLS");
            axum_server::bind_rustls(address, rustls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(address)
                .await
                .wrap_err_with(|| format!("Failed to listen on {address}"))?;
            info!(%address, "listening");
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
