//! COSE plumbing shared by the issuer-auth and device-auth paths.

pub mod mac0;
pub mod sign1;

use ciborium::Value;
use coset::{iana, RegisteredLabelWithPrivate, TaggedCborSerializable};
use serde::{Deserialize, Serialize};

use crate::definitions::device_key::cose_key::{self, CoseKey, EC2Curve, OKPCurve};

/// Trait to represent the signature algorithm of a signer or verifier.
pub trait SignatureAlgorithm {
    fn algorithm(&self) -> iana::Algorithm;
}

/// A COSE structure together with whether it arrived wrapped in its CBOR tag.
///
/// ISO/IEC 18013-5 carries COSE_Sign1 and COSE_Mac0 untagged, but wallets in
/// the wild emit both forms; re-serialization preserves whichever was seen.
#[derive(Debug, Clone, PartialEq)]
pub struct MaybeTagged<T> {
    pub tagged: bool,
    pub inner: T,
}

impl<T> MaybeTagged<T> {
    pub fn new(tagged: bool, inner: T) -> Self {
        Self { tagged, inner }
    }
}

impl<T: Clone + TaggedCborSerializable> Serialize for MaybeTagged<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let value = self
            .inner
            .clone()
            .to_cbor_value()
            .map_err(serde::ser::Error::custom)?;
        if self.tagged {
            Value::Tag(T::TAG, Box::new(value)).serialize(serializer)
        } else {
            value.serialize(serializer)
        }
    }
}

impl<'de, T: TaggedCborSerializable> Deserialize<'de> for MaybeTagged<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let (tagged, value) = match value {
            Value::Tag(tag, inner) if tag == T::TAG => (true, *inner),
            other => (false, other),
        };
        T::from_cbor_value(value)
            .map(|inner| MaybeTagged { tagged, inner })
            .map_err(serde::de::Error::custom)
    }
}

/// A public key usable for COSE signature verification, as extracted from a
/// certificate SPKI or from the MSO's device key.
#[derive(Clone)]
pub enum VerifierKey {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
    P521(p521::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

impl std::fmt::Debug for VerifierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifierKey::P256(key) => f.debug_tuple("P256").field(key).finish(),
            VerifierKey::P384(key) => f.debug_tuple("P384").field(key).finish(),
            VerifierKey::P521(_) => f.debug_tuple("P521").field(&"<opaque>").finish(),
            VerifierKey::Ed25519(key) => f.debug_tuple("Ed25519").field(key).finish(),
        }
    }
}

impl VerifierKey {
    pub fn cose_algorithm(&self) -> iana::Algorithm {
        match self {
            VerifierKey::P256(_) => iana::Algorithm::ES256,
            VerifierKey::P384(_) => iana::Algorithm::ES384,
            VerifierKey::P521(_) => iana::Algorithm::ES512,
            VerifierKey::Ed25519(_) => iana::Algorithm::EdDSA,
        }
    }
}

impl TryFrom<&CoseKey> for VerifierKey {
    type Error = cose_key::Error;

    fn try_from(key: &CoseKey) -> Result<VerifierKey, cose_key::Error> {
        match key {
            CoseKey::EC2 {
                crv: EC2Curve::P256,
                ..
            } => Ok(VerifierKey::P256(key.try_into()?)),
            CoseKey::EC2 {
                crv: EC2Curve::P384,
                ..
            } => Ok(VerifierKey::P384(key.try_into()?)),
            CoseKey::EC2 {
                crv: EC2Curve::P521,
                ..
            } => Ok(VerifierKey::P521(key.try_into()?)),
            CoseKey::OKP {
                crv: OKPCurve::Ed25519,
                ..
            } => Ok(VerifierKey::Ed25519(key.try_into()?)),
            CoseKey::OKP { .. } => Err(cose_key::Error::UnsupportedCurve),
        }
    }
}

/// Read the `alg` protected header (label 1) of a COSE structure.
pub(crate) fn protected_algorithm(
    header: &coset::ProtectedHeader,
) -> Option<iana::Algorithm> {
    match header.header.alg.as_ref() {
        Some(RegisteredLabelWithPrivate::Assigned(alg)) => Some(*alg),
        _ => None,
    }
}

/// Human-readable name of a COSE algorithm, for reports and reasons.
pub fn algorithm_name(alg: iana::Algorithm) -> &'static str {
    match alg {
        iana::Algorithm::ES256 => "ES256",
        iana::Algorithm::ES384 => "ES384",
        iana::Algorithm::ES512 => "ES512",
        iana::Algorithm::EdDSA => "EdDSA",
        iana::Algorithm::HMAC_256_256 => "HMAC-256/256",
        _ => "unsupported",
    }
}

mod p256_impls {
    use coset::iana;

    use super::SignatureAlgorithm;

    impl SignatureAlgorithm for p256::ecdsa::VerifyingKey {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::ES256
        }
    }
}

mod p384_impls {
    use coset::iana;

    use super::SignatureAlgorithm;

    impl SignatureAlgorithm for p384::ecdsa::VerifyingKey {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::ES384
        }
    }
}

mod p521_impls {
    use coset::iana;

    use super::SignatureAlgorithm;

    impl SignatureAlgorithm for p521::ecdsa::VerifyingKey {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::ES512
        }
    }
}

mod ed25519_impls {
    use coset::iana;

    use super::SignatureAlgorithm;

    impl SignatureAlgorithm for ed25519_dalek::VerifyingKey {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::EdDSA
        }
    }
}

mod hmac_impls {
    use coset::iana;
    use hmac::Hmac;
    use sha2::Sha256;

    use super::SignatureAlgorithm;

    impl SignatureAlgorithm for Hmac<Sha256> {
        fn algorithm(&self) -> iana::Algorithm {
            iana::Algorithm::HMAC_256_256
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cbor;
    use coset::CoseSign1;

    #[test]
    fn untagged_cose_sign1_roundtrip() {
        // [{1: -7}, {}, 'hi', h'01020304']
        let bytes = hex::decode("8443a10126a04268694401020304").unwrap();
        let parsed: MaybeTagged<CoseSign1> = cbor::from_slice(&bytes).unwrap();
        assert!(!parsed.tagged);
        let reencoded = cbor::to_vec(&parsed).unwrap();
        assert_eq!(bytes, reencoded);
    }

    #[test]
    fn tagged_cose_sign1_roundtrip() {
        let bytes = hex::decode("d28443a10126a04268694401020304").unwrap();
        let parsed: MaybeTagged<CoseSign1> = cbor::from_slice(&bytes).unwrap();
        assert!(parsed.tagged);
        let reencoded = cbor::to_vec(&parsed).unwrap();
        assert_eq!(bytes, reencoded);
    }
}
