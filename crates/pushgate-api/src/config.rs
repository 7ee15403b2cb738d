//! Service configuration.
//!
//! A single JSON file provides everything the server needs: the bind
//! address, broker coordinates and token, TLS material paths, the access
//! control list, and operational switches. Missing required keys and
//! unknown log levels fail the load; TLS material is only assembled when
//! TLS is enabled.

use std::{fs, net::SocketAddr, path::Path};

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Format, Json},
    Figment,
};
use serde::{Deserialize, Serialize};
use tonic::transport::{Certificate, Identity, ServerTlsConfig};

const LOG_LEVELS: [&str; 4] = ["DEBUG", "INFO", "WARNING", "ERROR"];

/// Complete service configuration, loaded from one JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port the control plane binds to.
    pub service_port: u16,
    /// Address the control plane binds to; all interfaces when empty.
    #[serde(default)]
    pub bind_ip: String,
    /// Certificate file enabling TLS.
    #[serde(default)]
    pub certificate: String,
    /// The certificate's private key.
    #[serde(default)]
    pub certificate_key: String,
    /// Directory whose `.pem` files build the trusted client CA pool.
    #[serde(default)]
    pub certificate_authorities_dir: String,
    /// Token for broker interaction.
    pub ams_token: String,
    /// Broker host.
    pub ams_host: String,
    /// Broker port.
    pub ams_port: u16,
    /// Whether HTTP clients spawned by the service verify upstream TLS
    /// certificates.
    #[serde(default)]
    pub verify_ssl: bool,
    /// Whether the control plane serves with TLS enabled.
    #[serde(default)]
    pub tls_enabled: bool,
    /// Trust client certificates signed by unknown CAs.
    #[serde(default)]
    pub trust_unknown_cas: bool,
    /// Log level: DEBUG, INFO, WARNING or ERROR.
    pub log_level: String,
    /// Skip loading push enabled subscriptions on startup.
    #[serde(default)]
    pub skip_subs_load: bool,
    /// Certificate common names allowed through the auth gate.
    #[serde(default)]
    pub acl: Vec<String>,
}

impl Config {
    /// Loads and validates the configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = Figment::new()
            .merge(Json::file_exact(path))
            .extract()
            .context("Failed to load configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// The tracing filter directive for the configured log level.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.to_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" => "error",
            _ => "info",
        }
    }

    /// The socket address the control plane binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip = if self.bind_ip.is_empty() {
            "0.0.0.0"
        } else {
            &self.bind_ip
        };
        format!("{ip}:{}", self.service_port)
            .parse()
            .context("Invalid server address")
    }

    /// Assembles the server TLS configuration from the configured material:
    /// the identity from the certificate and key files, and the client CA
    /// pool from every `.pem` file in the authorities directory.
    pub fn tls_server_config(&self) -> Result<ServerTlsConfig> {
        let certificate = fs::read(&self.certificate)
            .with_context(|| format!("Could not read certificate {}", self.certificate))?;
        let key = fs::read(&self.certificate_key)
            .with_context(|| format!("Could not read certificate key {}", self.certificate_key))?;
        let authorities = load_ca_bundle(Path::new(&self.certificate_authorities_dir))?;

        Ok(ServerTlsConfig::new()
            .identity(Identity::from_pem(certificate, key))
            .client_ca_root(Certificate::from_pem(authorities))
            .client_auth_optional(self.trust_unknown_cas))
    }

    fn validate(&self) -> Result<()> {
        if self.service_port == 0 {
            bail!("service_port must be greater than 0");
        }

        if !LOG_LEVELS.contains(&self.log_level.to_uppercase().as_str()) {
            bail!("Invalid log level {}", self.log_level);
        }

        if self.tls_enabled {
            for (field, value) in [
                ("certificate", &self.certificate),
                ("certificate_key", &self.certificate_key),
                ("certificate_authorities_dir", &self.certificate_authorities_dir),
            ] {
                if value.is_empty() {
                    bail!("Empty value for field {field}");
                }
            }
        }

        Ok(())
    }
}

/// Concatenates every `.pem` file in the directory into one CA bundle.
fn load_ca_bundle(dir: &Path) -> Result<Vec<u8>> {
    let mut bundle = Vec::new();

    let entries = fs::read_dir(dir)
        .with_context(|| format!("Could not read certificate authorities dir {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pem")) {
            bundle.extend(
                fs::read(&path)
                    .with_context(|| format!("Could not read CA file {}", path.display()))?,
            );
            bundle.push(b'\n');
        }
    }

    if bundle.is_empty() {
        bail!("No .pem certificate authorities found in {}", dir.display());
    }

    Ok(bundle)
}
