// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::ca::CertificateAuthority;
use crate::error::Result;
use crate::keys::{KeyPairGenerator, RsaKeyGenerator};
use crate::san::SubjectAltName;
use rand::RngCore;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyUsagePurpose, SerialNumber,
};
use time::OffsetDateTime;
use tracing::debug;

/// Role a leaf certificate is issued for. Each variant maps to a fixed set of
/// extensions; see [`CertProfile::extended_key_usages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertProfile {
    /// TLS server (serverAuth), SANs required.
    Server,
    /// TLS client (clientAuth), no SAN extension.
    Client,
    /// Mutually authenticating cluster member (serverAuth + clientAuth), SANs required.
    Peer,
}

impl CertProfile {
    pub fn key_usages(self) -> Vec<KeyUsagePurpose> {
        match self {
            CertProfile::Server | CertProfile::Client | CertProfile::Peer => vec![
                KeyUsagePurpose::DigitalSignature,
                KeyUsagePurpose::KeyEncipherment,
            ],
        }
    }

    pub fn extended_key_usages(self) -> Vec<ExtendedKeyUsagePurpose> {
        match self {
            CertProfile::Server => vec![ExtendedKeyUsagePurpose::ServerAuth],
            CertProfile::Client => vec![ExtendedKeyUsagePurpose::ClientAuth],
            CertProfile::Peer => vec![
                ExtendedKeyUsagePurpose::ServerAuth,
                ExtendedKeyUsagePurpose::ClientAuth,
            ],
        }
    }

    /// Whether the profile carries a subjectAltName extension.
    pub fn has_sans(self) -> bool {
        !matches!(self, CertProfile::Client)
    }
}

/// A leaf certificate with its private key.
#[derive(Debug, Clone)]
pub struct Certificate {
    pub subject_name: String,
    /// Group membership for client identities (e.g. `system:masters`).
    pub organization: Option<String>,
    /// Always the issuing authority's `subject_name`.
    pub issuer_name: String,
    /// Hex-encoded 128-bit serial.
    pub serial_number: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub profile: CertProfile,
    pub subject_alt_names: Vec<SubjectAltName>,
    pub cert_pem: String,
    pub key_pem: String,
}

/// Inputs to a single issuance.
#[derive(Debug, Clone, Copy)]
pub struct IssueParams<'a> {
    pub profile: CertProfile,
    pub common_name: &'a str,
    pub organization: Option<&'a str>,
    pub days: u32,
    pub sans: &'a [SubjectAltName],
}

/// 128 random bits for a certificate serial, with their hex encoding.
pub(crate) fn random_serial() -> (SerialNumber, String) {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    (SerialNumber::from(bytes.to_vec()), hex)
}

/// `[now, now + days)`.
pub(crate) fn validity_window(days: u32) -> (OffsetDateTime, OffsetDateTime) {
    let now = OffsetDateTime::now_utc();
    (now, now + time::Duration::days(days as i64))
}

/// Sign a new leaf certificate under `ca`, drawing a fresh key from `keygen`.
///
/// Every profile gets `basicConstraints(CA:false)` and the issuer DN copied
/// from the authority. SANs are ignored for [`CertProfile::Client`].
pub fn issue(
    keygen: &dyn KeyPairGenerator,
    ca: &CertificateAuthority,
    params: IssueParams<'_>,
) -> Result<Certificate> {
    let mut cert_params = CertificateParams::default();
    cert_params.distinguished_name = DistinguishedName::new();
    cert_params
        .distinguished_name
        .push(DnType::CommonName, params.common_name);
    if let Some(org) = params.organization {
        cert_params
            .distinguished_name
            .push(DnType::OrganizationName, org);
    }

    cert_params.is_ca = IsCa::ExplicitNoCa;
    cert_params.key_usages = params.profile.key_usages();
    cert_params.extended_key_usages = params.profile.extended_key_usages();
    cert_params.use_authority_key_identifier_extension = true;

    let subject_alt_names = if params.profile.has_sans() {
        params.sans.to_vec()
    } else {
        Vec::new()
    };
    for san in &subject_alt_names {
        cert_params.subject_alt_names.push(san.to_san_type()?);
    }

    let (serial, serial_number) = random_serial();
    cert_params.serial_number = Some(serial);

    let (not_before, not_after) = validity_window(params.days);
    cert_params.not_before = not_before;
    cert_params.not_after = not_after;

    let key_pair = keygen.generate()?;
    let cert = cert_params.signed_by(&key_pair, ca.issuer())?;

    debug!(
        common_name = params.common_name,
        profile = ?params.profile,
        issuer = %ca.subject_name,
        days = params.days,
        "issued certificate"
    );

    Ok(Certificate {
        subject_name: params.common_name.to_string(),
        organization: params.organization.map(str::to_string),
        issuer_name: ca.subject_name.clone(),
        serial_number,
        not_before,
        not_after,
        profile: params.profile,
        subject_alt_names,
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
    })
}

impl Certificate {
    /// Issue a server certificate (serverAuth) for `sans`.
    pub fn issue_server(
        ca: &CertificateAuthority,
        common_name: &str,
        days: u32,
        sans: &[SubjectAltName],
    ) -> Result<Self> {
        issue(
            &RsaKeyGenerator,
            ca,
            IssueParams {
                profile: CertProfile::Server,
                common_name,
                organization: None,
                days,
                sans,
            },
        )
    }

    /// Issue a client certificate (clientAuth). `organization` encodes the
    /// identity's group, e.g. `system:masters`.
    pub fn issue_client(
        ca: &CertificateAuthority,
        common_name: &str,
        organization: Option<&str>,
        days: u32,
    ) -> Result<Self> {
        issue(
            &RsaKeyGenerator,
            ca,
            IssueParams {
                profile: CertProfile::Client,
                common_name,
                organization,
                days,
                sans: &[],
            },
        )
    }

    /// Issue a dual-purpose peer certificate (serverAuth + clientAuth).
    pub fn issue_peer(
        ca: &CertificateAuthority,
        common_name: &str,
        days: u32,
        sans: &[SubjectAltName],
    ) -> Result<Self> {
        issue(
            &RsaKeyGenerator,
            ca,
            IssueParams {
                profile: CertProfile::Peer,
                common_name,
                organization: None,
                days,
                sans,
            },
        )
    }
}
