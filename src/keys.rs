// Copyright 2025 Jayashankar
// SPDX-License-Identifier: Apache-2.0

//! Asymmetric key material for authorities, leaf certificates and the
//! service-account signing key.

use crate::error::Result;
use rcgen::{KeyPair, PKCS_RSA_SHA256};

/// Source of fresh key pairs.
///
/// Every authority and certificate owns its own key pair; the generator is
/// asked once per key. Implementations must draw from a cryptographically
/// secure source.
pub trait KeyPairGenerator {
    fn generate(&self) -> Result<KeyPair>;
}

/// RSA 2048 with SHA-256 signatures, the algorithm kubeadm expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaKeyGenerator;

impl KeyPairGenerator for RsaKeyGenerator {
    fn generate(&self) -> Result<KeyPair> {
        Ok(KeyPair::generate_for(&PKCS_RSA_SHA256)?)
    }
}

impl<G: KeyPairGenerator + ?Sized> KeyPairGenerator for &G {
    fn generate(&self) -> Result<KeyPair> {
        (**self).generate()
    }
}

/// A bare key pair with no certificate, used to sign service-account tokens.
#[derive(Debug, Clone)]
pub struct ServiceAccountKey {
    /// SubjectPublicKeyInfo PEM (`sa.pub`).
    pub public_pem: String,
    /// PKCS#8 PEM (`sa.key`).
    pub private_pem: String,
}

impl ServiceAccountKey {
    pub fn generate(keygen: &dyn KeyPairGenerator) -> Result<Self> {
        let key_pair = keygen.generate()?;
        Ok(Self {
            public_pem: key_pair.public_key_pem(),
            private_pem: key_pair.serialize_pem(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_key_generation() {
        let key_pair = RsaKeyGenerator.generate().expect("RSA key should be generated");

        assert!(key_pair.is_compatible(&PKCS_RSA_SHA256));
        assert!(key_pair.serialize_pem().contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn test_rsa_key_is_2048_bits() {
        let key_pair = RsaKeyGenerator.generate().expect("RSA key should be generated");
        let public_pem = key_pair.public_key_pem();
        let spki = pem::parse(&public_pem).expect("public key PEM should parse");

        // 2048-bit modulus plus DER framing lands at 294 bytes of SPKI
        assert_eq!(spki.contents().len(), 294);
    }

    #[test]
    fn test_service_account_key() {
        let sa = ServiceAccountKey::generate(&RsaKeyGenerator)
            .expect("service account key should be generated");

        assert!(sa.public_pem.contains("BEGIN PUBLIC KEY"));
        assert!(sa.private_pem.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn test_keys_are_distinct() {
        let a = RsaKeyGenerator.generate().expect("first key");
        let b = RsaKeyGenerator.generate().expect("second key");

        assert_ne!(a.serialize_pem(), b.serialize_pem());
    }
}
