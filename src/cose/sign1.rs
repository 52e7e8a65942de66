//! Verification of `COSE_Sign1` structures over the RFC 8152
//! `Sig_structure = ["Signature1", protected, external_aad, payload]`.

use coset::{iana, sig_structure_data, CoseSign1, SignatureContext};
use signature::Verifier;

use crate::cose::{protected_algorithm, MaybeTagged, SignatureAlgorithm, VerifierKey};

/// Errors that can occur when verifying a COSE_Sign1.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the COSE_Sign1 has an attached payload but a detached payload was provided")]
    DoublePayload,
    #[error("the COSE_Sign1 has a detached payload which was not provided")]
    NoPayload,
    #[error("signature did not match the structure expected by the verifier: {0}")]
    MalformedSignature(signature::Error),
    #[error("the alg header is absent")]
    NoAlgHeader,
    #[error("unsupported signature algorithm: {0:?}")]
    UnsupportedAlgorithm(coset::Algorithm),
}

/// Result with error type: [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Result for verification of a COSE_Sign1 or COSE_Mac0.
#[derive(Debug)]
pub enum VerificationResult {
    Success,
    Failure(String),
    Error(Error),
}

impl VerificationResult {
    /// `false` implies the signature is inauthentic or the verification
    /// algorithm encountered an error.
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationResult::Success)
    }

    /// Translate to a std::result::Result, converting failure reasons and
    /// errors into a String.
    pub fn into_result(self) -> Result<(), String> {
        match self {
            VerificationResult::Success => Ok(()),
            VerificationResult::Failure(reason) => Err(reason),
            VerificationResult::Error(e) => Err(format!("{}", e)),
        }
    }
}

impl MaybeTagged<CoseSign1> {
    /// Verify that the signature of a COSE_Sign1 is authentic.
    pub fn verify<'a, V, S>(
        &'a self,
        verifier: &V,
        detached_payload: Option<&[u8]>,
        external_aad: Option<&[u8]>,
    ) -> VerificationResult
    where
        V: Verifier<S> + SignatureAlgorithm,
        S: TryFrom<&'a [u8]>,
        S::Error: Into<signature::Error>,
    {
        if let Some(alg) = protected_algorithm(&self.inner.protected) {
            if verifier.algorithm() != alg {
                return VerificationResult::Failure(
                    "algorithm in protected headers did not match verifier's algorithm".into(),
                );
            }
        }

        let payload = match (self.inner.payload.as_ref(), detached_payload) {
            (None, None) => return VerificationResult::Error(Error::NoPayload),
            (Some(attached), None) => attached,
            (None, Some(detached)) => detached,
            _ => return VerificationResult::Error(Error::DoublePayload),
        };

        let signature = match S::try_from(self.inner.signature.as_ref())
            .map_err(Into::into)
            .map_err(Error::MalformedSignature)
        {
            Ok(sig) => sig,
            Err(e) => return VerificationResult::Error(e),
        };

        let signature_payload = sig_structure_data(
            SignatureContext::CoseSign1,
            self.inner.protected.clone(),
            None,
            external_aad.unwrap_or_default(),
            payload,
        );

        match verifier.verify(&signature_payload, &signature) {
            Ok(()) => VerificationResult::Success,
            Err(e) => VerificationResult::Failure(format!("signature is not authentic: {}", e)),
        }
    }

    /// Verify against `key`, dispatching on the protected `alg` header.
    ///
    /// ECDSA signatures are fixed-width `r ‖ s`, not DER.
    pub fn verify_with_key(
        &self,
        key: &VerifierKey,
        detached_payload: Option<&[u8]>,
    ) -> VerificationResult {
        let alg = match protected_algorithm(&self.inner.protected) {
            Some(alg) => alg,
            None => match self.inner.protected.header.alg.clone() {
                Some(other) => return VerificationResult::Error(Error::UnsupportedAlgorithm(other)),
                None => return VerificationResult::Error(Error::NoAlgHeader),
            },
        };
        match alg {
            iana::Algorithm::ES256 | iana::Algorithm::ES384 | iana::Algorithm::ES512
            | iana::Algorithm::EdDSA => {}
            other => {
                return VerificationResult::Error(Error::UnsupportedAlgorithm(
                    coset::Algorithm::Assigned(other),
                ))
            }
        }
        match key {
            VerifierKey::P256(vk) => {
                self.verify::<_, p256::ecdsa::Signature>(vk, detached_payload, None)
            }
            VerifierKey::P384(vk) => {
                self.verify::<_, p384::ecdsa::Signature>(vk, detached_payload, None)
            }
            VerifierKey::P521(vk) => {
                self.verify::<_, p521::ecdsa::Signature>(vk, detached_payload, None)
            }
            VerifierKey::Ed25519(vk) => {
                self.verify::<_, ed25519_dalek::Signature>(vk, detached_payload, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor;
    use hex::FromHex;
    use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
    use p256::SecretKey;

    const RFC8392_KEY: &str = "6c1382765aec5358f117733d281c1c7bdc39884d04a45a1e6c67c858bc206c19";
    const RFC8392_COSE_SIGN1: &str = "d28443a10126a104524173796d6d657472696345434453413235365850a70175636f61703a2f2f61732e6578616d706c652e636f6d02656572696b77037818636f61703a2f2f6c696768742e6578616d706c652e636f6d041a5612aeb0051a5610d9f0061a5610d9f007420b7158405427c1ff28d23fbad1f29c4c7c6a555e601d6fa29f9179bc3d7438bacaca5acd08c8d4d4f96131680c429a01f85951ecee743a52b9b63632c57209120e1c9e30";

    #[test]
    fn verify_rfc8392_example() {
        let key = Vec::<u8>::from_hex(RFC8392_KEY).unwrap();
        let signer: SigningKey = SecretKey::from_slice(&key).unwrap().into();
        let verifier: VerifyingKey = (&signer).into();

        let bytes = Vec::<u8>::from_hex(RFC8392_COSE_SIGN1).unwrap();
        let sign1: MaybeTagged<coset::CoseSign1> =
            cbor::from_slice(&bytes).expect("failed to parse COSE_Sign1 from bytes");
        assert!(sign1.tagged);

        sign1
            .verify::<VerifyingKey, Signature>(&verifier, None, None)
            .into_result()
            .expect("COSE_Sign1 could not be verified");
    }

    #[test]
    fn verify_rfc8392_example_via_dispatch() {
        let key = Vec::<u8>::from_hex(RFC8392_KEY).unwrap();
        let signer: SigningKey = SecretKey::from_slice(&key).unwrap().into();
        let verifier = VerifierKey::P256((&signer).into());

        let bytes = Vec::<u8>::from_hex(RFC8392_COSE_SIGN1).unwrap();
        let sign1: MaybeTagged<coset::CoseSign1> = cbor::from_slice(&bytes).unwrap();
        assert!(sign1.verify_with_key(&verifier, None).is_success());
    }

    #[test]
    fn tampered_payload_fails() {
        let key = Vec::<u8>::from_hex(RFC8392_KEY).unwrap();
        let signer: SigningKey = SecretKey::from_slice(&key).unwrap().into();
        let verifier = VerifierKey::P256((&signer).into());

        let bytes = Vec::<u8>::from_hex(RFC8392_COSE_SIGN1).unwrap();
        let mut sign1: MaybeTagged<coset::CoseSign1> = cbor::from_slice(&bytes).unwrap();
        if let Some(payload) = sign1.inner.payload.as_mut() {
            payload[0] ^= 0xff;
        }
        assert!(!sign1.verify_with_key(&verifier, None).is_success());
    }

    #[test]
    fn detached_and_attached_payload_is_an_error() {
        let bytes = Vec::<u8>::from_hex(RFC8392_COSE_SIGN1).unwrap();
        let sign1: MaybeTagged<coset::CoseSign1> = cbor::from_slice(&bytes).unwrap();
        let key = Vec::<u8>::from_hex(RFC8392_KEY).unwrap();
        let signer: SigningKey = SecretKey::from_slice(&key).unwrap().into();
        let verifier: VerifyingKey = (&signer).into();
        let result = sign1.verify::<VerifyingKey, Signature>(&verifier, Some(b"detached"), None);
        assert!(matches!(
            result,
            VerificationResult::Error(Error::DoublePayload)
        ));
    }
}
