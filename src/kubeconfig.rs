// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Client connection profiles (kubeconfig files) for the control-plane
//! components and administrators.
//!
//! Each profile gets its own client certificate issued by the cluster CA and
//! embeds the CA, certificate and key inline as base64 payloads.

use crate::ca::CertificateAuthority;
use crate::cert::{issue, CertProfile, IssueParams};
use crate::error::Result;
use crate::keys::{KeyPairGenerator, RsaKeyGenerator};
use crate::pki::{ArtifactKind, GeneratedArtifact, CLUSTER_ADMIN_GROUP, NODES_GROUP};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const API_SERVER_PORT: u16 = 6443;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub clusters: Vec<NamedCluster>,
    pub contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    pub current_context: String,
    pub preferences: BTreeMap<String, String>,
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub cluster: ClusterEntry,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClusterEntry {
    pub certificate_authority_data: String,
    pub server: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedContext {
    pub context: ContextEntry,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub cluster: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedUser {
    pub name: String,
    pub user: UserEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserEntry {
    pub client_certificate_data: String,
    pub client_key_data: String,
}

impl Kubeconfig {
    /// Single cluster/context/user document whose current context is
    /// `<user>@<cluster_name>`. PEM inputs are reduced to their payloads.
    pub fn new(
        cluster_name: &str,
        server: &str,
        ca_pem: &str,
        user: &str,
        client_cert_pem: &str,
        client_key_pem: &str,
    ) -> Self {
        let context_name = format!("{}@{}", user, cluster_name);
        Self {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            clusters: vec![NamedCluster {
                cluster: ClusterEntry {
                    certificate_authority_data: pem_payload(ca_pem),
                    server: server.to_string(),
                },
                name: cluster_name.to_string(),
            }],
            contexts: vec![NamedContext {
                context: ContextEntry {
                    cluster: cluster_name.to_string(),
                    user: user.to_string(),
                },
                name: context_name.clone(),
            }],
            current_context: context_name,
            preferences: BTreeMap::new(),
            users: vec![NamedUser {
                name: user.to_string(),
                user: UserEntry {
                    client_certificate_data: pem_payload(client_cert_pem),
                    client_key_data: pem_payload(client_key_pem),
                },
            }],
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Strip `-----BEGIN/END` lines and blank lines and join the rest, leaving
/// the base64 payload.
pub fn pem_payload(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----") && !line.trim().is_empty())
        .collect()
}

/// One kubeconfig identity: the client certificate subject and output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: String,
    pub organization: Option<&'static str>,
    pub path: &'static str,
}

/// The five kubeadm identities, in output order.
pub fn identities(api_server_address: &str) -> Vec<Identity> {
    vec![
        Identity {
            user: "kubernetes-admin".to_string(),
            organization: Some(CLUSTER_ADMIN_GROUP),
            path: "admin.conf",
        },
        Identity {
            user: "system:kube-controller-manager".to_string(),
            organization: None,
            path: "controller-manager.conf",
        },
        Identity {
            user: "system:kube-scheduler".to_string(),
            organization: None,
            path: "scheduler.conf",
        },
        Identity {
            user: format!("system:node:{}", api_server_address),
            organization: Some(NODES_GROUP),
            path: "kubelet.conf",
        },
        Identity {
            user: "kubernetes-super-admin".to_string(),
            organization: Some(CLUSTER_ADMIN_GROUP),
            path: "super-admin.conf",
        },
    ]
}

/// Issues client certificates under the cluster CA and renders kubeconfigs.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder<G = RsaKeyGenerator> {
    keygen: G,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: KeyPairGenerator> ClientConfigBuilder<G> {
    pub fn with_key_generator(keygen: G) -> Self {
        Self { keygen }
    }

    /// Produce `admin.conf`, `controller-manager.conf`, `scheduler.conf`,
    /// `kubelet.conf` and `super-admin.conf`, in that order.
    pub fn generate(
        &self,
        kubernetes_ca: &CertificateAuthority,
        api_server_address: &str,
        cluster_name: &str,
        cert_days: u32,
    ) -> Result<Vec<GeneratedArtifact>> {
        let server = format!("https://{}:{}", api_server_address, API_SERVER_PORT);

        identities(api_server_address)
            .into_iter()
            .map(|identity| -> Result<GeneratedArtifact> {
                let cert = issue(
                    &self.keygen,
                    kubernetes_ca,
                    IssueParams {
                        profile: CertProfile::Client,
                        common_name: &identity.user,
                        organization: identity.organization,
                        days: cert_days,
                        sans: &[],
                    },
                )?;

                let content = Kubeconfig::new(
                    cluster_name,
                    &server,
                    &kubernetes_ca.cert_pem,
                    &identity.user,
                    &cert.cert_pem,
                    &cert.key_pem,
                )
                .to_yaml()?;

                debug!(path = identity.path, user = %identity.user, "rendered kubeconfig");

                Ok(GeneratedArtifact::new(
                    identity.path,
                    content,
                    ArtifactKind::Kubeconfig,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x509::parse_cert_pem;

    const SAMPLE_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\nAbCd\n\n-----END CERTIFICATE-----\n";

    fn decode_pem_payload(tag: &str, payload: &str) -> String {
        let body: Vec<String> = payload
            .as_bytes()
            .chunks(64)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        format!(
            "-----BEGIN {tag}-----\n{}\n-----END {tag}-----\n",
            body.join("\n")
        )
    }

    #[test]
    fn test_pem_payload() {
        assert_eq!(pem_payload(SAMPLE_PEM), "MIIBAbCd");
        assert_eq!(pem_payload("-----BEGIN X-----\r\nAA\r\n-----END X-----\r\n"), "AA");
        assert_eq!(pem_payload(""), "");
    }

    #[test]
    fn test_identities() {
        let ids = identities("10.0.0.5");
        let paths: Vec<&str> = ids.iter().map(|i| i.path).collect();

        assert_eq!(
            paths,
            vec![
                "admin.conf",
                "controller-manager.conf",
                "scheduler.conf",
                "kubelet.conf",
                "super-admin.conf"
            ]
        );
        assert_eq!(ids[3].user, "system:node:10.0.0.5");
        assert_eq!(ids[3].organization, Some("system:nodes"));
        assert_eq!(ids[0].organization, Some("system:masters"));
        assert_eq!(ids[4].organization, Some("system:masters"));
        assert_eq!(ids[1].organization, None);
        assert_eq!(ids[2].organization, None);
    }

    #[test]
    fn test_kubeconfig_document() {
        let doc = Kubeconfig::new(
            "kubernetes",
            "https://10.0.0.5:6443",
            SAMPLE_PEM,
            "kubernetes-admin",
            SAMPLE_PEM,
            SAMPLE_PEM,
        );

        assert_eq!(doc.current_context, "kubernetes-admin@kubernetes");
        assert_eq!(doc.contexts[0].name, doc.current_context);
        assert_eq!(doc.contexts[0].context.cluster, "kubernetes");
        assert_eq!(doc.contexts[0].context.user, "kubernetes-admin");
        assert_eq!(doc.users[0].name, "kubernetes-admin");
        assert_eq!(doc.clusters[0].cluster.certificate_authority_data, "MIIBAbCd");

        let yaml = doc.to_yaml().expect("kubeconfig should serialize");
        assert!(yaml.starts_with("apiVersion: v1\nkind: Config\n"));
        assert!(yaml.contains("certificate-authority-data: MIIBAbCd"));
        assert!(yaml.contains("client-certificate-data: MIIBAbCd"));
        assert!(yaml.contains("client-key-data: MIIBAbCd"));
        assert!(yaml.contains("current-context: kubernetes-admin@kubernetes"));
        assert!(yaml.contains("preferences: {}"));

        let parsed: Kubeconfig = serde_yaml::from_str(&yaml).expect("kubeconfig should parse");
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_generate_profiles() {
        let ca = CertificateAuthority::create("kubernetes", 365, None).expect("CA should be created");
        let artifacts = ClientConfigBuilder::new()
            .generate(&ca, "10.0.0.5", "prod", 30)
            .expect("kubeconfigs should be generated");

        assert_eq!(artifacts.len(), 5);
        assert!(artifacts.iter().all(|a| a.kind == ArtifactKind::Kubeconfig));

        let kubelet: Kubeconfig =
            serde_yaml::from_str(&artifacts[3].content).expect("kubelet.conf should parse");
        assert_eq!(kubelet.current_context, "system:node:10.0.0.5@prod");
        assert_eq!(kubelet.clusters[0].name, "prod");
        assert_eq!(kubelet.clusters[0].cluster.server, "https://10.0.0.5:6443");
        assert_eq!(
            kubelet.clusters[0].cluster.certificate_authority_data,
            pem_payload(&ca.cert_pem)
        );

        let cert_pem = decode_pem_payload(
            "CERTIFICATE",
            &kubelet.users[0].user.client_certificate_data,
        );
        let info = parse_cert_pem(&cert_pem).expect("embedded client cert should parse");
        assert_eq!(info.common_name.as_deref(), Some("system:node:10.0.0.5"));
        assert_eq!(info.organization.as_deref(), Some("system:nodes"));
        assert_eq!(info.issuer, "CN=kubernetes");
        assert!(info.client_auth);
    }

    #[test]
    fn test_profile_identities() {
        let ca = CertificateAuthority::create("kubernetes", 365, None).expect("CA should be created");
        let artifacts = ClientConfigBuilder::new()
            .generate(&ca, "10.0.0.5", "prod", 30)
            .expect("kubeconfigs should be generated");

        let expected = [
            ("admin.conf", "kubernetes-admin", Some("system:masters")),
            ("controller-manager.conf", "system:kube-controller-manager", None),
            ("scheduler.conf", "system:kube-scheduler", None),
            ("kubelet.conf", "system:node:10.0.0.5", Some("system:nodes")),
            ("super-admin.conf", "kubernetes-super-admin", Some("system:masters")),
        ];
        assert_eq!(artifacts.len(), expected.len());

        for (artifact, (path, cn, org)) in artifacts.iter().zip(expected) {
            assert_eq!(artifact.path, path);

            let doc: Kubeconfig =
                serde_yaml::from_str(&artifact.content).expect("kubeconfig should parse");
            assert_eq!(doc.users[0].name, cn, "{path} user");
            assert_eq!(doc.current_context, format!("{cn}@prod"), "{path} context");

            let cert_pem = decode_pem_payload(
                "CERTIFICATE",
                &doc.users[0].user.client_certificate_data,
            );
            let info = parse_cert_pem(&cert_pem).expect("embedded client cert should parse");
            assert_eq!(info.common_name.as_deref(), Some(cn), "{path} CN");
            assert_eq!(info.organization.as_deref(), org, "{path} O");
        }
    }

    #[test]
    fn test_each_profile_has_its_own_credential() {
        let ca = CertificateAuthority::create("kubernetes", 365, None).expect("CA should be created");
        let artifacts = ClientConfigBuilder::new()
            .generate(&ca, "10.0.0.5", "kubernetes", 30)
            .expect("kubeconfigs should be generated");

        let keys: std::collections::HashSet<String> = artifacts
            .iter()
            .map(|a| {
                let doc: Kubeconfig = serde_yaml::from_str(&a.content).expect("should parse");
                doc.users[0].user.client_key_data.clone()
            })
            .collect();
        assert_eq!(keys.len(), 5);
    }
}
