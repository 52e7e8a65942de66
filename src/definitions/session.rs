//! Session-bound material: reconstruction of the `DeviceAuthentication`
//! bytes the device signed, and the ISO/IEC 18013-5 §9.1 key schedule
//! (EMacKey for the MAC proof path, SKDevice/SKReader session keys).

use elliptic_curve::ecdh::SharedSecret;
use hkdf::Hkdf;
use p256::pkcs8::DecodePrivateKey;
use p256::NistP256;
use p384::NistP384;
use p521::NistP521;
use sha2::{Digest, Sha256};

use crate::cbor::{self, Value as CborValue};
use crate::definitions::device_key::cose_key::{self, CoseKey, EC2Curve};
use crate::definitions::device_signed::{DeviceAuthentication, DeviceNamespacesBytes};
use crate::definitions::helpers::{tag24, Tag24};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("session transcript is not valid CBOR: {0}")]
    InvalidTranscript(cbor::CborError),
    #[error("unable to encode value as CBOR: {0}")]
    Cbor(#[from] cbor::CborError),
    #[error("unable to construct tag-24 wrapper: {0}")]
    Tag24(#[from] tag24::Error),
    #[error("device key is not usable for key agreement: {0}")]
    CoseKey(#[from] cose_key::Error),
    #[error("ephemeral reader key is not usable: {0}")]
    InvalidEphemeralKey(String),
    #[error("unable to perform HKDF expansion")]
    Hkdf,
}

/// The verifier's ephemeral private key, as supplied by the caller for the
/// MAC proof path: either a COSE_Key map carrying the private scalar
/// (label -4) or a PKCS#8 DER document.
#[derive(Debug, Clone)]
pub enum EphemeralReaderKey {
    CoseKey(CborValue),
    Pkcs8(Vec<u8>),
}

impl EphemeralReaderKey {
    pub fn p256_secret(&self) -> Result<p256::SecretKey, Error> {
        match self {
            EphemeralReaderKey::Pkcs8(der) => p256::SecretKey::from_pkcs8_der(der)
                .map_err(|e| Error::InvalidEphemeralKey(e.to_string())),
            EphemeralReaderKey::CoseKey(value) => p256::SecretKey::from_slice(private_scalar(value)?)
                .map_err(|e| Error::InvalidEphemeralKey(e.to_string())),
        }
    }

    pub fn p384_secret(&self) -> Result<p384::SecretKey, Error> {
        match self {
            EphemeralReaderKey::Pkcs8(der) => p384::SecretKey::from_pkcs8_der(der)
                .map_err(|e| Error::InvalidEphemeralKey(e.to_string())),
            EphemeralReaderKey::CoseKey(value) => p384::SecretKey::from_slice(private_scalar(value)?)
                .map_err(|e| Error::InvalidEphemeralKey(e.to_string())),
        }
    }

    pub fn p521_secret(&self) -> Result<p521::SecretKey, Error> {
        match self {
            EphemeralReaderKey::Pkcs8(der) => p521::SecretKey::from_pkcs8_der(der)
                .map_err(|e| Error::InvalidEphemeralKey(e.to_string())),
            EphemeralReaderKey::CoseKey(value) => p521::SecretKey::from_slice(private_scalar(value)?)
                .map_err(|e| Error::InvalidEphemeralKey(e.to_string())),
        }
    }
}

fn private_scalar(value: &CborValue) -> Result<&[u8], Error> {
    let ciborium::Value::Map(entries) = &value.0 else {
        return Err(Error::InvalidEphemeralKey(
            "COSE_Key must be a map".to_string(),
        ));
    };
    entries
        .iter()
        .find(|(k, _)| k.as_integer().map(i128::from) == Some(-4))
        .and_then(|(_, v)| v.as_bytes())
        .map(Vec::as_slice)
        .ok_or_else(|| {
            Error::InvalidEphemeralKey("COSE_Key carries no private scalar (label -4)".to_string())
        })
}

/// The result of key agreement on the device key's curve.
pub enum SharedSecrets {
    P256(SharedSecret<NistP256>),
    P384(SharedSecret<NistP384>),
    P521(SharedSecret<NistP521>),
}

impl SharedSecrets {
    fn raw_secret_bytes(&self) -> &[u8] {
        match self {
            SharedSecrets::P256(shared) => shared.raw_secret_bytes().as_slice(),
            SharedSecrets::P384(shared) => shared.raw_secret_bytes().as_slice(),
            SharedSecrets::P521(shared) => shared.raw_secret_bytes().as_slice(),
        }
    }
}

/// Decode caller-supplied session transcript bytes, requiring valid CBOR.
pub fn decode_session_transcript(encoded: &[u8]) -> Result<CborValue, Error> {
    cbor::from_slice(encoded).map_err(Error::InvalidTranscript)
}

/// The tag-24 `SessionTranscriptBytes` form of the caller-supplied encoding.
pub fn session_transcript_bytes(encoded: &[u8]) -> Result<Vec<u8>, Error> {
    cbor::to_vec(&ciborium::Value::Tag(
        24,
        Box::new(ciborium::Value::Bytes(encoded.to_vec())),
    ))
    .map_err(Error::Cbor)
}

/// Reconstruct the exact `DeviceAuthenticationBytes` the device signed:
/// `tag24(encode(["DeviceAuthentication", SessionTranscript, DocType,
/// DeviceNameSpacesBytes]))`, encoded.
pub fn device_authentication_bytes(
    encoded_session_transcript: &[u8],
    doc_type: &str,
    namespaces: &DeviceNamespacesBytes,
) -> Result<Vec<u8>, Error> {
    let transcript = decode_session_transcript(encoded_session_transcript)?;
    let auth = DeviceAuthentication::new(transcript, doc_type.to_string(), namespaces.clone());
    let bytes = cbor::to_vec(&Tag24::new(auth)?)?;
    Ok(bytes)
}

/// ECDH between the verifier's ephemeral private key and the device's public
/// key, on whichever curve the device key lives on; the shared secret is the
/// x-coordinate.
pub fn get_shared_secret(
    device_key: &CoseKey,
    e_reader_key: &EphemeralReaderKey,
) -> Result<SharedSecrets, Error> {
    match device_key {
        CoseKey::EC2 {
            crv: EC2Curve::P256,
            ..
        } => {
            let public_key: p256::PublicKey = device_key.try_into()?;
            let secret = e_reader_key.p256_secret()?;
            Ok(SharedSecrets::P256(p256::ecdh::diffie_hellman(
                secret.to_nonzero_scalar(),
                public_key.as_affine(),
            )))
        }
        CoseKey::EC2 {
            crv: EC2Curve::P384,
            ..
        } => {
            let public_key: p384::PublicKey = device_key.try_into()?;
            let secret = e_reader_key.p384_secret()?;
            Ok(SharedSecrets::P384(p384::ecdh::diffie_hellman(
                secret.to_nonzero_scalar(),
                public_key.as_affine(),
            )))
        }
        CoseKey::EC2 {
            crv: EC2Curve::P521,
            ..
        } => {
            let public_key: p521::PublicKey = device_key.try_into()?;
            let secret = e_reader_key.p521_secret()?;
            Ok(SharedSecrets::P521(p521::ecdh::diffie_hellman(
                secret.to_nonzero_scalar(),
                public_key.as_affine(),
            )))
        }
        CoseKey::OKP { .. } => Err(Error::CoseKey(cose_key::Error::UnsupportedCurve)),
    }
}

/// Derive the EMacKey per ISO/IEC 18013-5 §9.1.3.5:
/// HKDF-SHA-256 with `salt = SHA-256(SessionTranscriptBytes)` and
/// `info = "EMacKey"`, yielding a 32-byte key.
pub fn derive_e_mac_key(
    shared_secret: &SharedSecrets,
    encoded_session_transcript: &[u8],
) -> Result<[u8; 32], Error> {
    derive_key(shared_secret, encoded_session_transcript, b"EMacKey")
}

/// Derive a session encryption key: `info = "SKReader"` for reader-to-device
/// traffic, `"SKDevice"` for the reverse direction.
pub fn derive_session_key(
    shared_secret: &SharedSecrets,
    encoded_session_transcript: &[u8],
    reader: bool,
) -> Result<[u8; 32], Error> {
    let info: &[u8] = if reader { b"SKReader" } else { b"SKDevice" };
    derive_key(shared_secret, encoded_session_transcript, info)
}

fn derive_key(
    shared_secret: &SharedSecrets,
    encoded_session_transcript: &[u8],
    info: &[u8],
) -> Result<[u8; 32], Error> {
    let salt = Sha256::digest(session_transcript_bytes(encoded_session_transcript)?);
    let mut key = [0u8; 32];
    Hkdf::<Sha256>::new(Some(&salt), shared_secret.raw_secret_bytes())
        .expand(info, &mut key)
        .map_err(|_| Error::Hkdf)?;
    Ok(key)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::definitions::device_key::cose_key::EC2Y;
    use crate::definitions::device_signed::DeviceNamespaces;
    use elliptic_curve::sec1::ToEncodedPoint;

    fn transcript() -> Vec<u8> {
        cbor::to_vec(&ciborium::Value::Array(vec![
            ciborium::Value::Null,
            ciborium::Value::Null,
            ciborium::Value::Array(vec![
                ciborium::Value::Text("test".to_string()),
                ciborium::Value::Bytes(vec![1, 2, 3]),
            ]),
        ]))
        .unwrap()
    }

    #[test]
    fn device_authentication_bytes_are_deterministic() {
        let namespaces = Tag24::new(DeviceNamespaces::new()).unwrap();
        let a = device_authentication_bytes(&transcript(), "org.iso.18013.5.1.mDL", &namespaces)
            .unwrap();
        let b = device_authentication_bytes(&transcript(), "org.iso.18013.5.1.mDL", &namespaces)
            .unwrap();
        assert_eq!(a, b);
        // tag 24 wrapping the encoded array
        assert_eq!(&a[..2], &[0xd8, 0x18]);
    }

    #[test]
    fn non_cbor_transcript_rejected() {
        let namespaces = Tag24::new(DeviceNamespaces::new()).unwrap();
        assert!(
            device_authentication_bytes(&[0xff, 0xff], "org.iso.18013.5.1.mDL", &namespaces)
                .is_err()
        );
    }

    fn p256_cose_key(secret: &p256::SecretKey) -> CoseKey {
        let point = secret.public_key().to_encoded_point(false);
        CoseKey::EC2 {
            crv: EC2Curve::P256,
            x: point.x().unwrap().to_vec(),
            y: EC2Y::Value(point.y().unwrap().to_vec()),
        }
    }

    fn cose_private_key(scalar: &[u8]) -> EphemeralReaderKey {
        EphemeralReaderKey::CoseKey(
            ciborium::Value::Map(vec![(
                ciborium::Value::Integer((-4).into()),
                ciborium::Value::Bytes(scalar.to_vec()),
            )])
            .into(),
        )
    }

    #[test]
    fn shared_secret_agrees_between_parties() {
        let device = p256::SecretKey::from_slice(&[0x11; 32]).unwrap();
        let reader = p256::SecretKey::from_slice(&[0x22; 32]).unwrap();

        let from_reader_side =
            get_shared_secret(&p256_cose_key(&device), &cose_private_key(&reader.to_bytes()))
                .unwrap();
        let from_device_side =
            get_shared_secret(&p256_cose_key(&reader), &cose_private_key(&device.to_bytes()))
                .unwrap();
        assert_eq!(
            from_reader_side.raw_secret_bytes(),
            from_device_side.raw_secret_bytes()
        );

        let key_a = derive_e_mac_key(&from_reader_side, &transcript()).unwrap();
        let key_b = derive_e_mac_key(&from_device_side, &transcript()).unwrap();
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn shared_secret_dispatches_on_the_device_key_curve() {
        let device = p384::SecretKey::from_slice(&[0x11; 48]).unwrap();
        let reader = p384::SecretKey::from_slice(&[0x22; 48]).unwrap();
        let point = device.public_key().to_encoded_point(false);
        let device_key = CoseKey::EC2 {
            crv: EC2Curve::P384,
            x: point.x().unwrap().to_vec(),
            y: EC2Y::Value(point.y().unwrap().to_vec()),
        };

        let shared = get_shared_secret(&device_key, &cose_private_key(&reader.to_bytes())).unwrap();
        assert!(matches!(shared, SharedSecrets::P384(_)));
        assert!(derive_e_mac_key(&shared, &transcript()).is_ok());

        // a P-256 ephemeral key cannot agree with a P-384 device key
        let p256_reader = p256::SecretKey::from_slice(&[0x22; 32]).unwrap();
        assert!(get_shared_secret(&device_key, &cose_private_key(&p256_reader.to_bytes())).is_err());
    }

    #[test]
    fn session_keys_differ_by_direction() {
        let device = p256::SecretKey::from_slice(&[0x11; 32]).unwrap();
        let reader = p256::SecretKey::from_slice(&[0x22; 32]).unwrap();
        let shared =
            get_shared_secret(&p256_cose_key(&device), &cose_private_key(&reader.to_bytes()))
                .unwrap();
        let sk_reader = derive_session_key(&shared, &transcript(), true).unwrap();
        let sk_device = derive_session_key(&shared, &transcript(), false).unwrap();
        assert_ne!(sk_reader, sk_device);
    }
}
