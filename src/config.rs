//! Function server configuration.
//!
//! Flags mirror the ones every Crossplane function runtime accepts, so the
//! binary drops into a standard function package unchanged.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::compose::{ResourceKeys, Variant};
use crate::error::ValidationError;

/// Server certificate file name inside the TLS certificates directory.
pub const TLS_CERT_FILE: &str = "tls.crt";
/// Private key file name.
pub const TLS_KEY_FILE: &str = "tls.key";
/// CA bundle used to verify clients.
pub const TLS_CA_FILE: &str = "ca.crt";

/// Command line and environment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "xstorage-function", version, about = "Storage composition function")]
pub struct FunctionConfig {
    /// Address to listen on for gRPC connections.
    #[arg(long, env = "FUNCTION_ADDRESS", default_value = "0.0.0.0:9443")]
    pub address: SocketAddr,

    /// Serve without TLS. Only for local development.
    #[arg(long)]
    pub insecure: bool,

    /// Directory containing tls.crt, tls.key and ca.crt.
    #[arg(long, env = "TLS_SERVER_CERTS_DIR")]
    pub tls_certs_dir: Option<PathBuf>,

    /// Which function variant to serve.
    #[arg(long, env = "XSTORAGE_VARIANT", default_value = "bucket")]
    pub variant: Variant,

    /// Key of the resource group among the composed resources, for the
    /// chained variants. Set to `rg` to adopt resources composed under
    /// that key.
    #[arg(long, env = "XSTORAGE_GROUP_KEY", default_value = "group")]
    pub group_key: String,

    /// Seconds the reconciler may cache a response.
    #[arg(long, default_value_t = 60)]
    pub ttl_seconds: u64,

    /// Emit debug logs.
    #[arg(long, short)]
    pub debug: bool,
}

impl FunctionConfig {
    /// Checks combinations clap cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.insecure && self.tls_certs_dir.is_none() {
            return Err(ValidationError::missing(
                "tls-certs-dir (or TLS_SERVER_CERTS_DIR); pass --insecure to serve without TLS",
            ));
        }
        let keys = self.resource_keys();
        if keys.group.is_empty() {
            return Err(ValidationError::invalid("group-key", "must not be empty"));
        }
        if keys.group == keys.account || keys.group == keys.container {
            return Err(ValidationError::invalid(
                "group-key",
                format!("'{}' is already used by another resource", keys.group),
            ));
        }
        if self.ttl_seconds == 0 {
            return Err(ValidationError::invalid("ttl-seconds", "must be greater than zero"));
        }
        Ok(())
    }

    /// Resource keys for the chained variants.
    #[must_use]
    pub fn resource_keys(&self) -> ResourceKeys {
        ResourceKeys {
            group: self.group_key.clone(),
            ..ResourceKeys::default()
        }
    }

    /// Response TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Default log filter when `RUST_LOG` is unset.
    #[must_use]
    pub const fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Paths of the certificate, key and CA bundle, when TLS is enabled.
    #[must_use]
    pub fn tls_paths(&self) -> Option<TlsPaths> {
        if self.insecure {
            return None;
        }
        self.tls_certs_dir.as_deref().map(TlsPaths::in_dir)
    }
}

/// Locations of the TLS material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    /// Server certificate chain.
    pub cert: PathBuf,
    /// Server private key.
    pub key: PathBuf,
    /// CA bundle for client verification.
    pub ca: PathBuf,
}

impl TlsPaths {
    /// The standard file names inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cert: dir.join(TLS_CERT_FILE),
            key: dir.join(TLS_KEY_FILE),
            ca: dir.join(TLS_CA_FILE),
        }
    }
}
