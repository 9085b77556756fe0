// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! The kubeadm PKI generation sequence.
//!
//! Order and paths are fixed: installers consume the output by file name, so
//! artifacts are always appended in the order below.
//!
//! | step | authority | artifact(s) |
//! |---|---|---|
//! | 1 | self | `ssl/ca.{crt,key}` |
//! | 2 | self | `ssl/front-proxy-ca.{crt,key}` |
//! | 3 | kubernetes | `ssl/apiserver.{crt,key}` |
//! | 4 | kubernetes | `ssl/apiserver-kubelet-client.{crt,key}` |
//! | 5 | front-proxy-ca | `ssl/front-proxy-client.{crt,key}` |
//! | 6 | none | `ssl/sa.{pub,key}` |
//! | 7 | self / etcd-ca | `ssl/etcd/*`, `ssl/apiserver-etcd-client.{crt,key}` |

use crate::ca::CertificateAuthority;
use crate::cert::{issue, CertProfile, Certificate, IssueParams};
use crate::config::ClusterConfig;
use crate::error::Result;
use crate::keys::{KeyPairGenerator, RsaKeyGenerator, ServiceAccountKey};
use crate::kubeconfig::ClientConfigBuilder;
use crate::san::{build_apiserver_sans, build_etcd_sans};
use tracing::{debug, info};

/// Group granting cluster-admin rights.
pub const CLUSTER_ADMIN_GROUP: &str = "system:masters";
/// Group every kubelet client identity belongs to.
pub const NODES_GROUP: &str = "system:nodes";

pub const KUBERNETES_CA_NAME: &str = "kubernetes";
pub const FRONT_PROXY_CA_NAME: &str = "front-proxy-ca";
pub const ETCD_CA_NAME: &str = "etcd-ca";

pub const APISERVER_CN: &str = "kube-apiserver";
pub const APISERVER_KUBELET_CLIENT_CN: &str = "kube-apiserver-kubelet-client";
pub const FRONT_PROXY_CLIENT_CN: &str = "front-proxy-client";
pub const ETCD_HEALTHCHECK_CLIENT_CN: &str = "kube-etcd-healthcheck-client";
pub const APISERVER_ETCD_CLIENT_CN: &str = "kube-apiserver-etcd-client";

/// Number of artifacts with etcd enabled and no kubeconfigs.
pub const PKI_ARTIFACT_COUNT: usize = 22;
/// Number of artifacts with etcd disabled and no kubeconfigs.
pub const PKI_ARTIFACT_COUNT_WITHOUT_ETCD: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Certificate,
    Key,
    Kubeconfig,
}

impl ArtifactKind {
    /// Private material that must only be readable by its owner.
    pub fn is_secret(self) -> bool {
        !matches!(self, ArtifactKind::Certificate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// Relative output path, e.g. `ssl/ca.crt`.
    pub path: String,
    pub content: String,
    pub kind: ArtifactKind,
}

impl GeneratedArtifact {
    pub fn new(path: impl Into<String>, content: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            kind,
        }
    }
}

/// Counts of a bundle's artifacts by category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BundleSummary {
    pub total_files: usize,
    /// Artifacts whose path names an authority (`ca.` in the path).
    pub ca_files: usize,
    pub cert_files: usize,
    pub key_files: usize,
    pub kubeconfig_files: usize,
}

/// Complete output of one generation run.
#[derive(Debug)]
pub struct PkiBundle {
    pub kubernetes_ca: CertificateAuthority,
    pub front_proxy_ca: CertificateAuthority,
    pub etcd_ca: Option<CertificateAuthority>,
    pub artifacts: Vec<GeneratedArtifact>,
}

impl PkiBundle {
    pub fn summary(&self) -> BundleSummary {
        let count = |kind: ArtifactKind| self.artifacts.iter().filter(|a| a.kind == kind).count();
        BundleSummary {
            total_files: self.artifacts.len(),
            ca_files: self
                .artifacts
                .iter()
                .filter(|a| a.path.contains("ca."))
                .count(),
            cert_files: count(ArtifactKind::Certificate),
            key_files: count(ArtifactKind::Key),
            kubeconfig_files: count(ArtifactKind::Kubeconfig),
        }
    }

    pub fn artifact(&self, path: &str) -> Option<&GeneratedArtifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }
}

fn push_ca(artifacts: &mut Vec<GeneratedArtifact>, stem: &str, ca: &CertificateAuthority) {
    artifacts.push(GeneratedArtifact::new(
        format!("{stem}.crt"),
        ca.cert_pem.clone(),
        ArtifactKind::Certificate,
    ));
    artifacts.push(GeneratedArtifact::new(
        format!("{stem}.key"),
        ca.key_pem.clone(),
        ArtifactKind::Key,
    ));
}

fn push_cert(artifacts: &mut Vec<GeneratedArtifact>, stem: &str, cert: Certificate) {
    artifacts.push(GeneratedArtifact::new(
        format!("{stem}.crt"),
        cert.cert_pem,
        ArtifactKind::Certificate,
    ));
    artifacts.push(GeneratedArtifact::new(
        format!("{stem}.key"),
        cert.key_pem,
        ArtifactKind::Key,
    ));
}

/// Runs the fixed generation sequence with keys from `G`.
#[derive(Debug, Clone, Default)]
pub struct PkiOrchestrator<G = RsaKeyGenerator> {
    keygen: G,
}

impl PkiOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: KeyPairGenerator> PkiOrchestrator<G> {
    pub fn with_key_generator(keygen: G) -> Self {
        Self { keygen }
    }

    /// Validate `config`, generate the PKI and, when enabled, the kubeconfig
    /// files. Either every artifact is produced or an error is returned.
    pub fn generate(&self, config: &ClusterConfig) -> Result<PkiBundle> {
        config.validate()?;

        info!(
            cluster = %config.cluster_name,
            api_server = config.api_server(),
            etcd = config.include_etcd,
            kubeconfig = config.include_kubeconfig,
            "generating cluster PKI"
        );

        let mut bundle = self.generate_pki(config)?;

        if config.include_kubeconfig {
            let kubeconfigs = ClientConfigBuilder::with_key_generator(&self.keygen).generate(
                &bundle.kubernetes_ca,
                config.api_server(),
                &config.cluster_name,
                config.cert_days,
            )?;
            bundle.artifacts.extend(kubeconfigs);
        }

        info!(files = bundle.artifacts.len(), "cluster PKI generated");
        Ok(bundle)
    }

    /// Steps 1 through 7 only. Callers are expected to have validated
    /// `config`; see [`ClusterConfig::validate`].
    pub fn generate_pki(&self, config: &ClusterConfig) -> Result<PkiBundle> {
        let keygen: &dyn KeyPairGenerator = &self.keygen;
        let api_server = config.api_server();
        let cert_days = config.cert_days;
        let mut artifacts = Vec::new();

        let kubernetes_ca =
            CertificateAuthority::create_with(keygen, KUBERNETES_CA_NAME, config.ca_days, None)?;
        push_ca(&mut artifacts, "ssl/ca", &kubernetes_ca);

        let front_proxy_ca = CertificateAuthority::create_with(
            keygen,
            FRONT_PROXY_CA_NAME,
            config.ca_days,
            Some(FRONT_PROXY_CA_NAME),
        )?;
        push_ca(&mut artifacts, "ssl/front-proxy-ca", &front_proxy_ca);

        let apiserver_sans = build_apiserver_sans(
            &config.cluster_name,
            api_server,
            &config.service_cidr,
            &config.additional_sans,
        );
        let apiserver = issue(
            keygen,
            &kubernetes_ca,
            IssueParams {
                profile: CertProfile::Server,
                common_name: APISERVER_CN,
                organization: None,
                days: cert_days,
                sans: &apiserver_sans,
            },
        )?;
        push_cert(&mut artifacts, "ssl/apiserver", apiserver);

        let kubelet_client = issue(
            keygen,
            &kubernetes_ca,
            client_params(APISERVER_KUBELET_CLIENT_CN, Some(CLUSTER_ADMIN_GROUP), cert_days),
        )?;
        push_cert(&mut artifacts, "ssl/apiserver-kubelet-client", kubelet_client);

        let front_proxy_client = issue(
            keygen,
            &front_proxy_ca,
            client_params(FRONT_PROXY_CLIENT_CN, None, cert_days),
        )?;
        push_cert(&mut artifacts, "ssl/front-proxy-client", front_proxy_client);

        let sa = ServiceAccountKey::generate(keygen)?;
        debug!("generated service account signing key");
        artifacts.push(GeneratedArtifact::new(
            "ssl/sa.pub",
            sa.public_pem,
            ArtifactKind::Key,
        ));
        artifacts.push(GeneratedArtifact::new(
            "ssl/sa.key",
            sa.private_pem,
            ArtifactKind::Key,
        ));

        let etcd_ca = if config.include_etcd {
            Some(self.generate_etcd(config, &mut artifacts)?)
        } else {
            None
        };

        Ok(PkiBundle {
            kubernetes_ca,
            front_proxy_ca,
            etcd_ca,
            artifacts,
        })
    }

    fn generate_etcd(
        &self,
        config: &ClusterConfig,
        artifacts: &mut Vec<GeneratedArtifact>,
    ) -> Result<CertificateAuthority> {
        let keygen: &dyn KeyPairGenerator = &self.keygen;
        let api_server = config.api_server();
        let cert_days = config.cert_days;

        let etcd_ca = CertificateAuthority::create_with(
            keygen,
            ETCD_CA_NAME,
            config.ca_days,
            Some(ETCD_CA_NAME),
        )?;
        push_ca(artifacts, "ssl/etcd/ca", &etcd_ca);

        let sans = build_etcd_sans(api_server, &config.etcd_servers);

        for (profile, stem) in [
            (CertProfile::Server, "ssl/etcd/server"),
            (CertProfile::Peer, "ssl/etcd/peer"),
        ] {
            let cert = issue(
                keygen,
                &etcd_ca,
                IssueParams {
                    profile,
                    common_name: api_server,
                    organization: None,
                    days: cert_days,
                    sans: &sans,
                },
            )?;
            push_cert(artifacts, stem, cert);
        }

        let healthcheck = issue(
            keygen,
            &etcd_ca,
            client_params(ETCD_HEALTHCHECK_CLIENT_CN, Some(CLUSTER_ADMIN_GROUP), cert_days),
        )?;
        push_cert(artifacts, "ssl/etcd/healthcheck-client", healthcheck);

        let apiserver_client = issue(
            keygen,
            &etcd_ca,
            client_params(APISERVER_ETCD_CLIENT_CN, Some(CLUSTER_ADMIN_GROUP), cert_days),
        )?;
        push_cert(artifacts, "ssl/apiserver-etcd-client", apiserver_client);

        Ok(etcd_ca)
    }
}

fn client_params<'a>(
    common_name: &'a str,
    organization: Option<&'a str>,
    days: u32,
) -> IssueParams<'a> {
    IssueParams {
        profile: CertProfile::Client,
        common_name,
        organization,
        days,
        sans: &[],
    }
}

/// Generate a complete bundle for `config` with RSA 2048 keys.
pub fn generate(config: &ClusterConfig) -> Result<PkiBundle> {
    PkiOrchestrator::new().generate(config)
}
