// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Parse generated X.509 certificates back for inspection and verification.

use crate::error::{Error, Result};
use crate::san::SubjectAltName;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use x509_parser::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsageBits {
    pub digital_signature: bool,
    pub key_encipherment: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
}

#[derive(Debug, Clone)]
pub struct CertInfo {
    /// Subject DN in `CN=..., O=...` form.
    pub subject: String,
    pub issuer: String,
    pub common_name: Option<String>,
    pub organization: Option<String>,
    /// Hex serial as encoded in the certificate.
    pub serial: String,
    pub not_before_timestamp: i64,
    pub not_after_timestamp: i64,
    pub is_ca: bool,
    pub basic_constraints_critical: bool,
    pub key_usage: KeyUsageBits,
    pub key_usage_critical: bool,
    pub server_auth: bool,
    pub client_auth: bool,
    pub has_san_extension: bool,
    pub subject_alt_names: Vec<SubjectAltName>,
    /// Encoded length of each IP SAN, 4 for IPv4 and 16 for IPv6.
    pub ip_address_lengths: Vec<usize>,
}

impl CertInfo {
    pub fn expiry_string(&self) -> String {
        match ::time::OffsetDateTime::from_unix_timestamp(self.not_after_timestamp) {
            Ok(dt) => format!("{}-{:02}-{:02}", dt.year(), dt.month() as u8, dt.day()),
            Err(_) => "Invalid date".to_string(),
        }
    }

    pub fn days_remaining(&self) -> i64 {
        let now = ::time::OffsetDateTime::now_utc();
        match ::time::OffsetDateTime::from_unix_timestamp(self.not_after_timestamp) {
            Ok(expiry) => (expiry - now).whole_days(),
            Err(_) => -1,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.days_remaining() < 0
    }

    /// Validity length in whole days.
    pub fn validity_days(&self) -> i64 {
        (self.not_after_timestamp - self.not_before_timestamp) / 86_400
    }

    pub fn role(&self) -> &'static str {
        match (self.is_ca, self.server_auth, self.client_auth) {
            (true, _, _) => "Certificate Authority",
            (false, true, true) => "Peer (serverAuth, clientAuth)",
            (false, true, false) => "Server (serverAuth)",
            (false, false, true) => "Client (clientAuth)",
            (false, false, false) => "Unknown",
        }
    }
}

pub fn parse_cert_file(path: &Path) -> Result<CertInfo> {
    let pem_data = std::fs::read_to_string(path).map_err(|e| Error::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_cert_pem(&pem_data)
}

pub fn parse_cert_pem(pem_str: &str) -> Result<CertInfo> {
    let pem = ::pem::parse(pem_str)
        .map_err(|e| Error::CertParse(format!("Failed to parse PEM: {}", e)))?;

    if pem.tag() != "CERTIFICATE" {
        return Err(Error::CertParse(format!(
            "Expected CERTIFICATE, got {}",
            pem.tag()
        )));
    }

    let (_, cert) = X509Certificate::from_der(pem.contents())
        .map_err(|e| Error::CertParse(format!("Invalid X.509: {}", e)))?;

    let common_name = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(String::from);

    let organization = cert
        .subject()
        .iter_organization()
        .next()
        .and_then(|o| o.as_str().ok())
        .map(String::from);

    let serial: String = cert
        .raw_serial()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    let mut info = CertInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        common_name,
        organization,
        serial,
        not_before_timestamp: cert.validity().not_before.timestamp(),
        not_after_timestamp: cert.validity().not_after.timestamp(),
        is_ca: false,
        basic_constraints_critical: false,
        key_usage: KeyUsageBits::default(),
        key_usage_critical: false,
        server_auth: false,
        client_auth: false,
        has_san_extension: false,
        subject_alt_names: Vec::new(),
        ip_address_lengths: Vec::new(),
    };

    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::SubjectAlternativeName(san) => {
                info.has_san_extension = true;
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => {
                            info.subject_alt_names.push(SubjectAltName::dns(*dns));
                        }
                        GeneralName::IPAddress(ip_bytes) => {
                            info.ip_address_lengths.push(ip_bytes.len());
                            if let Ok(v4) = <[u8; 4]>::try_from(*ip_bytes) {
                                info.subject_alt_names
                                    .push(SubjectAltName::ip(Ipv4Addr::from(v4).to_string()));
                            } else if let Ok(v6) = <[u8; 16]>::try_from(*ip_bytes) {
                                info.subject_alt_names
                                    .push(SubjectAltName::ip(Ipv6Addr::from(v6).to_string()));
                            }
                        }
                        _ => {}
                    }
                }
            }
            ParsedExtension::BasicConstraints(bc) => {
                info.is_ca = bc.ca;
                info.basic_constraints_critical = ext.critical;
            }
            ParsedExtension::KeyUsage(ku) => {
                info.key_usage = KeyUsageBits {
                    digital_signature: ku.digital_signature(),
                    key_encipherment: ku.key_encipherment(),
                    key_cert_sign: ku.key_cert_sign(),
                    crl_sign: ku.crl_sign(),
                };
                info.key_usage_critical = ext.critical;
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                info.server_auth = eku.server_auth;
                info.client_auth = eku.client_auth;
            }
            _ => {}
        }
    }

    Ok(info)
}
