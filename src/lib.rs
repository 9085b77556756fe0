// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! kubeadm-compatible PKI and kubeconfig generation for Kubernetes clusters.
//!
//! ```rust,no_run
//! use kubepki::{write_bundle, ClusterConfig};
//! use std::path::Path;
//!
//! let config = ClusterConfig::new("10.0.0.5");
//! let bundle = kubepki::generate(&config)?;
//!
//! let summary = bundle.summary();
//! println!("{} files", summary.total_files);
//!
//! write_bundle(Path::new("./pki"), &bundle.artifacts, false)?;
//! # Ok::<(), kubepki::Error>(())
//! ```

/// Certificate authorities.
pub mod ca;
/// Leaf certificate issuance.
pub mod cert;
/// Cluster configuration.
pub mod config;
/// Error types.
pub mod error;
/// Writing bundles to disk.
pub mod fs;
/// Key pair generation.
pub mod keys;
/// Kubeconfig documents.
pub mod kubeconfig;
/// The generation sequence.
pub mod pki;
/// Subject alternative names.
pub mod san;
/// X.509 certificate parsing.
pub mod x509;

pub use ca::CertificateAuthority;
pub use cert::{issue, CertProfile, Certificate, IssueParams};
pub use config::{
    validate_days, ClusterConfig, DEFAULT_CA_DAYS, DEFAULT_CERT_DAYS, DEFAULT_CLUSTER_NAME,
    DEFAULT_SERVICE_CIDR,
};
pub use error::{Error, Result};
pub use fs::{artifact_path, write_bundle, write_secret_file};
pub use keys::{KeyPairGenerator, RsaKeyGenerator, ServiceAccountKey};
pub use kubeconfig::{ClientConfigBuilder, Kubeconfig, API_SERVER_PORT};
pub use pki::{
    generate, ArtifactKind, BundleSummary, GeneratedArtifact, PkiBundle, PkiOrchestrator,
    CLUSTER_ADMIN_GROUP, NODES_GROUP,
};
pub use san::{
    build_apiserver_sans, build_etcd_sans, classify, first_address_in_cidr, parse_list, SanKind,
    SubjectAltName,
};
pub use x509::{parse_cert_file, parse_cert_pem, CertInfo, KeyUsageBits};
