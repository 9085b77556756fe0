// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Subject Alternative Name lists built from textual cluster configuration.
//!
//! Classification is deliberately narrow: anything shaped like four dotted
//! decimal groups is an IP address, everything else is a DNS name.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use rcgen::SanType;
use std::net::{IpAddr, Ipv4Addr};

/// Four groups of one to three ASCII digits. Octet ranges are not checked.
static IPV4_SHAPE: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^([0-9]{1,3}\.){3}[0-9]{1,3}$").expect("invalid IPv4 regex")
});

/// DNS names every API server certificate carries, in order.
pub const APISERVER_DNS_NAMES: &[&str] = &[
    "kubernetes",
    "kubernetes.default",
    "kubernetes.default.svc",
    "kubernetes.default.svc.cluster.local",
    "localhost",
];

pub const LOOPBACK_V4: &str = "127.0.0.1";
pub const LOOPBACK_V6: &str = "::1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanKind {
    Dns,
    Ip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAltName {
    pub kind: SanKind,
    pub value: String,
}

impl SubjectAltName {
    pub fn dns(value: impl Into<String>) -> Self {
        Self {
            kind: SanKind::Dns,
            value: value.into(),
        }
    }

    pub fn ip(value: impl Into<String>) -> Self {
        Self {
            kind: SanKind::Ip,
            value: value.into(),
        }
    }

    /// Build an entry whose kind is decided by [`classify`].
    pub fn classified(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            kind: classify(&value),
            value,
        }
    }

    /// Encode for the certificate extension. IP entries become raw
    /// network-order bytes, DNS entries stay literal IA5 text.
    pub(crate) fn to_san_type(&self) -> Result<SanType> {
        match self.kind {
            SanKind::Ip if IPV4_SHAPE.is_match(&self.value) => {
                Ok(SanType::IpAddress(IpAddr::V4(self.dotted_quad()?)))
            }
            SanKind::Ip => {
                let ip = self
                    .value
                    .parse::<IpAddr>()
                    .map_err(|_| Error::InvalidSan {
                        value: self.value.clone(),
                        reason: "not a valid IPv4 or IPv6 address".into(),
                    })?;
                Ok(SanType::IpAddress(ip))
            }
            SanKind::Dns => Ok(SanType::DnsName(self.value.clone().try_into().map_err(
                |_| Error::InvalidSan {
                    value: self.value.clone(),
                    reason: "DNS names must be ASCII".into(),
                },
            )?)),
        }
    }

    /// Dotted-decimal groups read as decimal octets, so `10.0.0.05` is
    /// `10.0.0.5`. Groups above 255 are rejected.
    fn dotted_quad(&self) -> Result<Ipv4Addr> {
        let mut octets = [0u8; 4];
        for (octet, group) in octets.iter_mut().zip(self.value.split('.')) {
            *octet = group.parse::<u8>().map_err(|_| Error::InvalidSan {
                value: self.value.clone(),
                reason: format!("octet {} is out of range", group),
            })?;
        }
        Ok(Ipv4Addr::from(octets))
    }
}

pub fn classify(value: &str) -> SanKind {
    if IPV4_SHAPE.is_match(value) {
        SanKind::Ip
    } else {
        SanKind::Dns
    }
}

/// Split comma-separated text into classified entries, trimming each and
/// dropping empties. Order is preserved.
pub fn parse_list(text: &str) -> Vec<SubjectAltName> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(SubjectAltName::classified)
        .collect()
}

/// The service network's first address, by the kubeadm convention of
/// replacing the fourth component with `1`. The prefix length is ignored.
///
/// `10.96.0.0/12` yields `10.96.0.1`. Not CIDR arithmetic and not IPv6 aware.
pub fn first_address_in_cidr(cidr: &str) -> String {
    let network = cidr.split('/').next().unwrap_or(cidr);
    let mut parts: Vec<&str> = network.split('.').collect();
    if parts.len() >= 4 {
        parts[3] = "1";
    }
    parts.join(".")
}

pub fn build_apiserver_sans(
    _cluster_name: &str,
    api_server_address: &str,
    service_cidr: &str,
    additional_sans: &str,
) -> Vec<SubjectAltName> {
    let mut sans: Vec<SubjectAltName> = APISERVER_DNS_NAMES
        .iter()
        .map(|name| SubjectAltName::dns(*name))
        .collect();

    sans.push(SubjectAltName::classified(api_server_address));
    sans.push(SubjectAltName::ip(first_address_in_cidr(service_cidr)));
    sans.push(SubjectAltName::ip(LOOPBACK_V4));
    sans.extend(parse_list(additional_sans));
    sans
}

/// SANs shared by the etcd server and peer certificates. With no configured
/// etcd members the API server address stands in for the single member.
pub fn build_etcd_sans(api_server_address: &str, etcd_servers: &str) -> Vec<SubjectAltName> {
    let mut sans = vec![
        SubjectAltName::dns("localhost"),
        SubjectAltName::ip(LOOPBACK_V4),
        SubjectAltName::ip(LOOPBACK_V6),
    ];

    let members = parse_list(etcd_servers);
    if members.is_empty() {
        sans.push(SubjectAltName::classified(api_server_address));
    } else {
        sans.extend(members);
    }
    sans
}
