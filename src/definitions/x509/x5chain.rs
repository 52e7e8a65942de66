//! The certificate chain carried in the COSE `x5chain` header (label 33),
//! ordered leaf first.

use anyhow::{anyhow, Result};
use const_oid::AssociatedOid;
use der::asn1::ObjectIdentifier;
use elliptic_curve::{
    sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint},
    AffinePoint, CurveArithmetic, FieldBytesSize, PublicKey,
};
use p256::NistP256;
use p384::NistP384;
use p521::NistP521;
use signature::Verifier;
use x509_cert::{
    certificate::Certificate,
    der::{referenced::OwnedToRef, Decode, Encode},
};

use crate::cose::VerifierKey;
use crate::definitions::helpers::NonEmptyVec;
use crate::definitions::x509::error::Error as X509Error;
use crate::definitions::x509::trust_anchor::{check_validity_period, TrustAnchorRegistry};

pub const X5CHAIN_HEADER_LABEL: i64 = 33;

const SECP_256_R_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP_384_R_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP_521_R_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");
const ED_25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct X509 {
    pub bytes: Vec<u8>,
}

impl X509 {
    pub fn certificate(&self) -> Result<Certificate, X509Error> {
        Ok(Certificate::from_der(&self.bytes)?)
    }

    pub fn public_key<C>(&self) -> Result<PublicKey<C>, X509Error>
    where
        C: AssociatedOid + CurveArithmetic,
        AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
        FieldBytesSize<C>: ModulusSize,
    {
        let cert = self.certificate()?;
        cert.tbs_certificate
            .subject_public_key_info
            .owned_to_ref()
            .try_into()
            .map_err(|_| {
                X509Error::ValidationError("could not parse public key from spki".to_string())
            })
    }

    /// The subject public key as a COSE-verifier key, discerning the curve
    /// from the SPKI algorithm parameters.
    pub fn verifier_key(&self) -> Result<VerifierKey, X509Error> {
        let cert = self.certificate()?;
        let spki = &cert.tbs_certificate.subject_public_key_info;
        let point = spki.subject_public_key.raw_bytes();
        if spki.algorithm.oid == ED_25519 {
            let bytes: [u8; 32] = point.try_into().map_err(|_| {
                X509Error::ValidationError("malformed Ed25519 public key".to_string())
            })?;
            let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes).map_err(|e| {
                X509Error::ValidationError(format!("malformed Ed25519 public key: {e}"))
            })?;
            return Ok(VerifierKey::Ed25519(key));
        }
        match spki.algorithm.owned_to_ref().parameters_oid()? {
            SECP_256_R_1 => p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map(VerifierKey::P256)
                .map_err(|e| X509Error::ValidationError(e.to_string())),
            SECP_384_R_1 => p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map(VerifierKey::P384)
                .map_err(|e| X509Error::ValidationError(e.to_string())),
            SECP_521_R_1 => p521::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map(VerifierKey::P521)
                .map_err(|e| X509Error::ValidationError(e.to_string())),
            oid => Err(X509Error::ValidationError(format!(
                "unsupported signer key curve: {oid}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct X5Chain(NonEmptyVec<X509>);

impl From<NonEmptyVec<X509>> for X5Chain {
    fn from(v: NonEmptyVec<X509>) -> Self {
        Self(v)
    }
}

impl X5Chain {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Parse the value of an `x5chain` header: a single byte string or an
    /// array of byte strings holding DER certificates, leaf first.
    pub fn from_cbor(value: &ciborium::Value) -> Result<Self, X509Error> {
        match value {
            ciborium::Value::Bytes(bytes) => Ok(Self(NonEmptyVec::new(X509 {
                bytes: bytes.clone(),
            }))),
            ciborium::Value::Array(certs) => certs
                .iter()
                .map(|cert| match cert {
                    ciborium::Value::Bytes(bytes) => Ok(X509 {
                        bytes: bytes.clone(),
                    }),
                    _ => Err(X509Error::DecodingError(
                        "x5chain array must contain byte strings".to_string(),
                    )),
                })
                .collect::<Result<Vec<X509>, X509Error>>()?
                .try_into()
                .map(Self)
                .map_err(X509Error::from),
            _ => Err(X509Error::DecodingError(
                "unexpected type for x5chain header".to_string(),
            )),
        }
    }

    pub fn into_cbor(&self) -> ciborium::Value {
        match self.0.as_ref() {
            [cert] => ciborium::Value::Bytes(cert.bytes.clone()),
            certs => ciborium::Value::Array(
                certs
                    .iter()
                    .map(|x509| ciborium::Value::Bytes(x509.bytes.clone()))
                    .collect(),
            ),
        }
    }

    /// The end-entity certificate: the document signer.
    pub fn leaf(&self) -> &X509 {
        &self.0[0]
    }

    /// Validate the chain against the trust anchor registry at instant
    /// `now_secs` (unix seconds): every hop signature, every validity
    /// window, and the link from the chain's top certificate to an anchor.
    pub fn validate(&self, registry: &TrustAnchorRegistry, now_secs: i64) -> Vec<X509Error> {
        let x5chain = self.0.as_ref();
        let mut errors: Vec<X509Error> = vec![];

        for pair in x5chain.windows(2) {
            if let Err(e) = check_signature(&pair[0], &pair[1]) {
                errors.push(e);
            }
        }

        for x509 in x5chain {
            match x509.certificate() {
                Ok(cert) => {
                    if let Err(e) = check_validity_period(&cert, now_secs) {
                        errors.push(e);
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        // the last certificate in the chain must be issued by a trust anchor
        let last = &x5chain[x5chain.len() - 1];
        match last.certificate() {
            Ok(cert) => match registry.find_anchor(&cert) {
                Some(anchor) => {
                    if let Err(e) = check_signature(last, anchor) {
                        errors.push(e);
                    }
                    errors.append(&mut registry.validate_anchor_link(self.leaf(), anchor, now_secs));
                }
                None => errors.push(X509Error::UntrustedRoot(
                    "the certificate issuer does not match any known trusted issuer".to_string(),
                )),
            },
            Err(e) => errors.push(e),
        }

        errors
    }
}

/// Verify that `issuer`'s subject key signed `target`.
pub fn check_signature(target: &X509, issuer: &X509) -> Result<(), X509Error> {
    let child_cert = target.certificate()?;
    let bytes = child_cert.tbs_certificate.to_der()?;
    let sig_bytes = child_cert.signature.raw_bytes();
    match issuer.verifier_key()? {
        VerifierKey::P256(key) => {
            let sig: ecdsa::Signature<NistP256> = ecdsa::Signature::from_der(sig_bytes)?;
            Ok(key.verify(&bytes, &sig)?)
        }
        VerifierKey::P384(key) => {
            let sig: ecdsa::Signature<NistP384> = ecdsa::Signature::from_der(sig_bytes)?;
            Ok(key.verify(&bytes, &sig)?)
        }
        VerifierKey::P521(key) => {
            let sig: ecdsa::Signature<NistP521> = ecdsa::Signature::from_der(sig_bytes)?;
            Ok(key.verify(&bytes, &sig)?)
        }
        VerifierKey::Ed25519(key) => {
            let sig = ed25519_dalek::Signature::from_slice(sig_bytes)?;
            Ok(key.verify(&bytes, &sig)?)
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct Builder {
    certs: Vec<X509>,
}

impl Builder {
    pub fn with_pem(mut self, data: &[u8]) -> Result<Builder> {
        let bytes = pem_rfc7468::decode_vec(data)
            .map_err(|e| anyhow!("unable to parse pem: {}", e))?
            .1;
        self.certs.push(parse_der(&bytes)?);
        Ok(self)
    }

    pub fn with_der(mut self, data: &[u8]) -> Result<Builder> {
        self.certs.push(parse_der(data)?);
        Ok(self)
    }

    pub fn build(self) -> Result<X5Chain> {
        Ok(X5Chain(self.certs.try_into().map_err(|_| {
            anyhow!("at least one certificate must be given to the builder")
        })?))
    }
}

fn parse_der(data: &[u8]) -> Result<X509> {
    let cert: Certificate = Certificate::from_der(data)
        .map_err(|e| anyhow!("unable to parse certificate from der encoding: {}", e))?;
    Ok(X509 {
        bytes: cert
            .to_der()
            .map_err(|e| anyhow!("unable to convert certificate to bytes: {}", e))?,
    })
}
