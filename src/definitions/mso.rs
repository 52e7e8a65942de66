//! Typed view of the `MobileSecurityObject`, the issuer-signed payload that
//! commits to the digests of every disclosable element and to the device key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::definitions::{helpers::ByteStr, DeviceKeyInfo, ValidityInfo};

/// DigestId is an unsigned integer between `0` and `(2^31 - 1)` inclusive,
/// represented as an i32 that is enforced to be positive.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, Ord, PartialEq, PartialOrd, Copy, Hash)]
pub struct DigestId(i32);

pub type DigestIds = BTreeMap<DigestId, ByteStr>;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mso {
    pub version: String,

    /// The algorithm the issuer used to digest the disclosable elements.
    pub digest_algorithm: DigestAlgorithm,

    /// Per-namespace map of digest ID to the committed digest bytes.
    pub value_digests: BTreeMap<String, DigestIds>,

    pub device_key_info: DeviceKeyInfo,

    pub doc_type: String,

    pub validity_info: ValidityInfo,
}

/// Digest algorithms admitted by ISO/IEC 18013-5. Unknown names survive the
/// round trip so that an unsupported algorithm is a verification verdict, not
/// a parse failure.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
    Unsupported(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigestAlgorithm(String),
}

impl From<String> for DigestAlgorithm {
    fn from(s: String) -> DigestAlgorithm {
        match s.as_str() {
            "SHA-256" => DigestAlgorithm::Sha256,
            "SHA-384" => DigestAlgorithm::Sha384,
            "SHA-512" => DigestAlgorithm::Sha512,
            _ => DigestAlgorithm::Unsupported(s),
        }
    }
}

impl From<DigestAlgorithm> for String {
    fn from(alg: DigestAlgorithm) -> String {
        match alg {
            DigestAlgorithm::Sha256 => "SHA-256".to_string(),
            DigestAlgorithm::Sha384 => "SHA-384".to_string(),
            DigestAlgorithm::Sha512 => "SHA-512".to_string(),
            DigestAlgorithm::Unsupported(s) => s,
        }
    }
}

impl DigestAlgorithm {
    /// Digest `bytes` with this algorithm.
    pub fn digest(&self, bytes: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            DigestAlgorithm::Sha256 => Ok(Sha256::digest(bytes).to_vec()),
            DigestAlgorithm::Sha384 => Ok(Sha384::digest(bytes).to_vec()),
            DigestAlgorithm::Sha512 => Ok(Sha512::digest(bytes).to_vec()),
            DigestAlgorithm::Unsupported(s) => Err(Error::UnsupportedDigestAlgorithm(s.clone())),
        }
    }
}

impl DigestId {
    pub fn new(i: i32) -> DigestId {
        DigestId(if i.is_negative() { -i } else { i })
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl Mso {
    /// The digest the issuer committed to for the given namespace and digest ID.
    pub fn committed_digest(&self, namespace: &str, digest_id: DigestId) -> Option<&ByteStr> {
        self.value_digests.get(namespace)?.get(&digest_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn digest_algorithm_names_roundtrip() {
        for name in ["SHA-256", "SHA-384", "SHA-512", "SHA-1"] {
            let alg = DigestAlgorithm::from(name.to_string());
            assert_eq!(String::from(alg), name);
        }
    }

    #[test]
    fn unsupported_digest_algorithm_fails_at_digest_time() {
        let alg = DigestAlgorithm::from("SHA-1".to_string());
        assert!(matches!(alg, DigestAlgorithm::Unsupported(_)));
        assert!(alg.digest(b"data").is_err());
    }

    #[test]
    fn sha256_known_answer() {
        let alg = DigestAlgorithm::Sha256;
        assert_eq!(
            hex::encode(alg.digest(b"abc").unwrap()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
