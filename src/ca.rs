// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

use crate::cert::{random_serial, validity_window};
use crate::error::Result;
use crate::keys::{KeyPairGenerator, RsaKeyGenerator};
use crate::san::SubjectAltName;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, Issuer, KeyPair,
    KeyUsagePurpose,
};
use std::fmt;
use time::OffsetDateTime;
use tracing::debug;

/// Self-signed trust anchor.
///
/// Holds the PEM encodings for output alongside the in-memory [`Issuer`]
/// that signs every certificate beneath it. The issuer is never rebuilt from
/// `cert_pem`/`key_pem`.
pub struct CertificateAuthority {
    /// Common name; subject and issuer are both exactly `CN=<subject_name>`.
    pub subject_name: String,
    /// Hex-encoded 128-bit serial.
    pub serial_number: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    pub cert_pem: String,
    pub key_pem: String,
    issuer: Issuer<'static, KeyPair>,
}

impl CertificateAuthority {
    /// Create an authority with a fresh RSA 2048 key.
    pub fn create(
        common_name: &str,
        validity_days: u32,
        subject_alt_dns: Option<&str>,
    ) -> Result<Self> {
        Self::create_with(&RsaKeyGenerator, common_name, validity_days, subject_alt_dns)
    }

    /// Create an authority drawing its key from `keygen`.
    ///
    /// `subject_alt_dns` attaches a single DNS SAN to the authority's own
    /// certificate; kubeadm does this for the front-proxy and etcd CAs.
    pub fn create_with(
        keygen: &dyn KeyPairGenerator,
        common_name: &str,
        validity_days: u32,
        subject_alt_dns: Option<&str>,
    ) -> Result<Self> {
        let mut params = CertificateParams::default();
        params.distinguished_name = DistinguishedName::new();
        params
            .distinguished_name
            .push(DnType::CommonName, common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];

        if let Some(dns) = subject_alt_dns {
            params
                .subject_alt_names
                .push(SubjectAltName::dns(dns).to_san_type()?);
        }

        let (serial, serial_number) = random_serial();
        params.serial_number = Some(serial);

        let (not_before, not_after) = validity_window(validity_days);
        params.not_before = not_before;
        params.not_after = not_after;

        let key_pair = keygen.generate()?;
        let cert = params.self_signed(&key_pair)?;
        let key_pem = key_pair.serialize_pem();

        debug!(
            common_name,
            validity_days,
            serial = %serial_number,
            "created certificate authority"
        );

        Ok(Self {
            subject_name: common_name.to_string(),
            serial_number,
            not_before,
            not_after,
            cert_pem: cert.pem(),
            key_pem,
            issuer: Issuer::new(params, key_pair),
        })
    }

    pub(crate) fn issuer(&self) -> &Issuer<'static, KeyPair> {
        &self.issuer
    }
}

impl fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("subject_name", &self.subject_name)
            .field("serial_number", &self.serial_number)
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x509::parse_cert_pem;

    #[test]
    fn test_ca_create() {
        let ca = CertificateAuthority::create("kubernetes", 30, None).expect("CA should be created");

        assert_eq!(ca.subject_name, "kubernetes");
        assert!(ca.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(ca.key_pem.contains("BEGIN PRIVATE KEY"));
        assert_eq!(ca.serial_number.len(), 32);
    }

    #[test]
    fn test_ca_is_self_signed() {
        let ca = CertificateAuthority::create("kubernetes", 30, None).expect("CA should be created");
        let info = parse_cert_pem(&ca.cert_pem).expect("CA PEM should parse");

        assert_eq!(info.subject, "CN=kubernetes");
        assert_eq!(info.issuer, info.subject);
        assert_eq!(info.common_name.as_deref(), Some("kubernetes"));
        assert_eq!(info.organization, None);
    }

    #[test]
    fn test_ca_extensions() {
        let ca = CertificateAuthority::create("kubernetes", 30, None).expect("CA should be created");
        let info = parse_cert_pem(&ca.cert_pem).expect("CA PEM should parse");

        assert!(info.is_ca);
        assert!(info.basic_constraints_critical);
        assert!(info.key_usage_critical);
        assert!(info.key_usage.key_cert_sign);
        assert!(info.key_usage.crl_sign);
        assert!(info.key_usage.digital_signature);
        assert!(info.key_usage.key_encipherment);
        assert!(!info.server_auth);
        assert!(!info.client_auth);
        assert!(info.subject_alt_names.is_empty());
    }

    #[test]
    fn test_ca_with_subject_alt_dns() {
        let ca = CertificateAuthority::create("front-proxy-ca", 30, Some("front-proxy-ca"))
            .expect("CA should be created");
        let info = parse_cert_pem(&ca.cert_pem).expect("CA PEM should parse");

        assert_eq!(
            info.subject_alt_names,
            vec![SubjectAltName::dns("front-proxy-ca")]
        );
    }

    #[test]
    fn test_ca_validity_window() {
        let ca =
            CertificateAuthority::create("kubernetes", 36500, None).expect("CA should be created");
        let info = parse_cert_pem(&ca.cert_pem).expect("CA PEM should parse");

        let days = (info.not_after_timestamp - info.not_before_timestamp) / 86_400;
        assert!((36499..=36501).contains(&days));
        assert_eq!((ca.not_after - ca.not_before).whole_days(), 36500);
    }

    #[test]
    fn test_ca_serials_are_unique() {
        let a = CertificateAuthority::create("a", 1, None).expect("CA a");
        let b = CertificateAuthority::create("b", 1, None).expect("CA b");

        assert_ne!(a.serial_number, b.serial_number);
    }
}
