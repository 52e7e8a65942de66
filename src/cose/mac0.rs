//! Verification of `COSE_Mac0` structures over the RFC 8152
//! `MAC_structure = ["MAC0", protected, external_aad, payload]`.
//!
//! The only admitted algorithm is HMAC 256/256 (alg 5), per ISO/IEC 18013-5.

use coset::{iana, mac_structure_data, CoseMac0, MacContext};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::cose::sign1::{Error, VerificationResult};
use crate::cose::{protected_algorithm, MaybeTagged};

type HmacSha256 = Hmac<Sha256>;

impl MaybeTagged<CoseMac0> {
    /// The algorithm claimed by the protected headers.
    pub fn algorithm(&self) -> Option<iana::Algorithm> {
        protected_algorithm(&self.inner.protected)
    }

    /// Verify the authentication tag with the derived EMacKey.
    pub fn verify_tag(&self, key: &[u8], detached_payload: Option<&[u8]>) -> VerificationResult {
        match self.algorithm() {
            Some(iana::Algorithm::HMAC_256_256) => {}
            Some(other) => {
                return VerificationResult::Error(Error::UnsupportedAlgorithm(
                    coset::Algorithm::Assigned(other),
                ))
            }
            None => return VerificationResult::Error(Error::NoAlgHeader),
        }

        let payload = match (self.inner.payload.as_ref(), detached_payload) {
            (None, None) => return VerificationResult::Error(Error::NoPayload),
            (Some(attached), None) => attached.as_slice(),
            (None, Some(detached)) => detached,
            _ => return VerificationResult::Error(Error::DoublePayload),
        };

        let mac_payload = mac_structure_data(
            MacContext::CoseMac0,
            self.inner.protected.clone(),
            &[],
            payload,
        );

        let mut hmac = match HmacSha256::new_from_slice(key) {
            Ok(hmac) => hmac,
            Err(_) => return VerificationResult::Failure("MAC key has an invalid length".into()),
        };
        hmac.update(&mac_payload);
        match hmac.verify_slice(&self.inner.tag) {
            Ok(()) => VerificationResult::Success,
            Err(_) => VerificationResult::Failure("tag is not authentic".into()),
        }
    }
}
