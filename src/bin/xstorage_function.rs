//! Storage composition function server
//!
//! Serves one function variant over gRPC to the Crossplane function runtime.

use clap::Parser;
use tokio::signal;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use xstorage::config::{FunctionConfig, TlsPaths};
use xstorage::function::StorageFunction;
use xstorage::transport::FunctionServiceImpl;

fn setup_tracing(config: &FunctionConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn load_tls(paths: &TlsPaths) -> Result<ServerTlsConfig, Box<dyn std::error::Error>> {
    let cert = tokio::fs::read(&paths.cert)
        .await
        .map_err(|e| format!("cannot read {}: {e}", paths.cert.display()))?;
    let key = tokio::fs::read(&paths.key)
        .await
        .map_err(|e| format!("cannot read {}: {e}", paths.key.display()))?;
    let ca = tokio::fs::read(&paths.ca)
        .await
        .map_err(|e| format!("cannot read {}: {e}", paths.ca.display()))?;

    Ok(ServerTlsConfig::new()
        .identity(Identity::from_pem(cert, key))
        .client_ca_root(Certificate::from_pem(ca)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = FunctionConfig::parse();
    setup_tracing(&config);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        variant = %config.variant,
        group_key = %config.group_key,
        address = %config.address,
        insecure = config.insecure,
        "starting storage function"
    );

    let composer = config.variant.composer_with_keys(config.resource_keys());
    let function = StorageFunction::new(composer).with_ttl(config.ttl());
    let svc = FunctionServiceImpl::new(function).into_server();

    let mut builder = Server::builder();
    if let Some(paths) = config.tls_paths() {
        builder = builder.tls_config(load_tls(&paths).await?)?;
    }

    builder
        .add_service(svc)
        .serve_with_shutdown(config.address, async {
            let _ = signal::ctrl_c().await;
        })
        .await?;

    info!("shut down");
    Ok(())
}
