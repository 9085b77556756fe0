// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CLUSTER_NAME: &str = "kubernetes";
pub const DEFAULT_SERVICE_CIDR: &str = "10.96.0.0/12";
pub const DEFAULT_CERT_DAYS: u32 = 3650;
pub const DEFAULT_CA_DAYS: u32 = 36500;

/// Inputs for one generation run.
///
/// `Default` returns a fresh, independently owned value with every field at
/// its kubeadm default and an empty `api_server_address`, which must be
/// filled in before generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    /// Control-plane node IP or DNS name. Required.
    #[serde(default)]
    pub api_server_address: String,
    /// Extra API server SANs, comma separated.
    #[serde(default)]
    pub additional_sans: String,
    #[serde(default = "default_service_cidr")]
    pub service_cidr: String,
    /// etcd member addresses, comma separated. Empty means the API server
    /// address is the only member.
    #[serde(default)]
    pub etcd_servers: String,
    #[serde(default = "default_cert_days")]
    pub cert_days: u32,
    #[serde(default = "default_ca_days")]
    pub ca_days: u32,
    #[serde(default = "default_true")]
    pub include_etcd: bool,
    #[serde(default = "default_true")]
    pub include_kubeconfig: bool,
}

fn default_cluster_name() -> String {
    DEFAULT_CLUSTER_NAME.to_string()
}

fn default_service_cidr() -> String {
    DEFAULT_SERVICE_CIDR.to_string()
}

fn default_cert_days() -> u32 {
    DEFAULT_CERT_DAYS
}

fn default_ca_days() -> u32 {
    DEFAULT_CA_DAYS
}

fn default_true() -> bool {
    true
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cluster_name: default_cluster_name(),
            api_server_address: String::new(),
            additional_sans: String::new(),
            service_cidr: default_service_cidr(),
            etcd_servers: String::new(),
            cert_days: default_cert_days(),
            ca_days: default_ca_days(),
            include_etcd: true,
            include_kubeconfig: true,
        }
    }
}

impl ClusterConfig {
    /// Defaults with the given API server address.
    pub fn new(api_server_address: impl Into<String>) -> Self {
        Self {
            api_server_address: api_server_address.into(),
            ..Self::default()
        }
    }

    /// Load from a TOML file. Missing keys take their defaults; the file
    /// itself must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// The API server address with surrounding whitespace removed.
    pub fn api_server(&self) -> &str {
        self.api_server_address.trim()
    }

    /// Check inputs before any key material is generated.
    pub fn validate(&self) -> Result<()> {
        if self.api_server().is_empty() {
            return Err(Error::MissingApiServerAddress);
        }
        validate_days("cert_days", self.cert_days)?;
        validate_days("ca_days", self.ca_days)?;
        Ok(())
    }
}

/// Validity periods must be at least one day.
pub fn validate_days(field: &'static str, days: u32) -> Result<()> {
    if days == 0 {
        return Err(Error::InvalidDays {
            field,
            reason: "days cannot be 0".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let config = ClusterConfig::default();
        assert_eq!(config.cluster_name, "kubernetes");
        assert_eq!(config.api_server_address, "");
        assert_eq!(config.service_cidr, "10.96.0.0/12");
        assert_eq!(config.cert_days, 3650);
        assert_eq!(config.ca_days, 36500);
        assert!(config.include_etcd);
        assert!(config.include_kubeconfig);
    }

    #[test]
    fn test_defaults_are_independent() {
        let mut a = ClusterConfig::default();
        a.cluster_name.push_str("-changed");
        a.cert_days = 1;

        let b = ClusterConfig::default();
        assert_eq!(b.cluster_name, "kubernetes");
        assert_eq!(b.cert_days, 3650);
    }

    #[test]
    fn test_validate_missing_api_server() {
        let result = ClusterConfig::default().validate();
        assert!(matches!(result, Err(Error::MissingApiServerAddress)));

        let result = ClusterConfig::new("   ").validate();
        assert!(matches!(result, Err(Error::MissingApiServerAddress)));
    }

    #[test]
    fn test_validate_ok() {
        let config = ClusterConfig::new(" 10.0.0.5 ");
        assert!(config.validate().is_ok());
        assert_eq!(config.api_server(), "10.0.0.5");
    }

    #[test]
    fn test_validate_zero_days() {
        let config = ClusterConfig {
            cert_days: 0,
            ..ClusterConfig::new("10.0.0.5")
        };
        let err = config.validate().expect_err("zero cert_days should be rejected");
        assert!(err.is_validation());

        let config = ClusterConfig {
            ca_days: 0,
            ..ClusterConfig::new("10.0.0.5")
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidDays { field: "ca_days", .. })
        ));
    }

    #[test]
    fn test_config_load_partial() {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "api_server_address = \"10.0.0.5\"").expect("write should succeed");
        writeln!(file, "include_etcd = false").expect("write should succeed");

        let config = ClusterConfig::load(file.path()).expect("config should load");
        assert_eq!(config.api_server_address, "10.0.0.5");
        assert!(!config.include_etcd);
        assert!(config.include_kubeconfig);
        assert_eq!(config.cluster_name, "kubernetes");
        assert_eq!(config.ca_days, 36500);
    }

    #[test]
    fn test_config_load_full() {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        writeln!(
            file,
            r#"
cluster_name = "prod"
api_server_address = "k8s.example.com"
additional_sans = "lb.example.com, 10.0.0.100"
service_cidr = "172.20.0.0/16"
etcd_servers = "10.0.0.11,10.0.0.12"
cert_days = 365
ca_days = 3650
include_etcd = true
include_kubeconfig = false
"#
        )
        .expect("write should succeed");

        let config = ClusterConfig::load(file.path()).expect("config should load");
        assert_eq!(config.cluster_name, "prod");
        assert_eq!(config.service_cidr, "172.20.0.0/16");
        assert_eq!(config.etcd_servers, "10.0.0.11,10.0.0.12");
        assert_eq!(config.cert_days, 365);
        assert!(!config.include_kubeconfig);
    }

    #[test]
    fn test_config_load_missing_file() {
        let result = ClusterConfig::load(Path::new("/nonexistent/cluster.toml"));
        assert!(matches!(result, Err(Error::ReadFile { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "cert_days = \"many\"").expect("write should succeed");

        let result = ClusterConfig::load(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
