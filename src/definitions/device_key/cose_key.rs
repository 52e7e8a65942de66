//! An implementation of RFC-8152 [COSE_Key](https://datatracker.ietf.org/doc/html/rfc8152#section-13)
//! restricted to the requirements of ISO/IEC 18013-5:2021.

use std::collections::BTreeMap;

use coset::iana::Algorithm;
use serde::{Deserialize, Serialize};
use ssi_jwk::JWK;

use crate::cbor::Value as CborValue;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "CborValue", into = "CborValue")]
pub enum CoseKey {
    EC2 { crv: EC2Curve, x: Vec<u8>, y: EC2Y },
    OKP { crv: OKPCurve, x: Vec<u8> },
}

/// The sign bit or value of the y-coordinate for the EC point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EC2Y {
    Value(Vec<u8>),
    SignBit(bool),
}

/// The RFC-8152 identifier of the curve, for EC2 key type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EC2Curve {
    P256,
    P384,
    P521,
}

/// The RFC-8152 identifier of the curve, for OKP key type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OKPCurve {
    X25519,
    X448,
    Ed25519,
    Ed448,
}

/// Errors that can occur when deserialising or converting a COSE_Key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("COSE_Key of kty 'EC2' missing x coordinate")]
    EC2MissingX,
    #[error("COSE_Key of kty 'EC2' missing y coordinate")]
    EC2MissingY,
    #[error("Expected to parse a CBOR bool or bstr for y-coordinate, received: '{0:?}'")]
    InvalidTypeY(CborValue),
    #[error("Expected to parse a CBOR map, received: '{0:?}'")]
    NotAMap(CborValue),
    #[error("Unable to discern the elliptic curve")]
    UnknownCurve,
    #[error("This implementation of COSE_Key only supports P-256, P-384, P-521, Ed25519 and Ed448 elliptic curves")]
    UnsupportedCurve,
    #[error("This implementation of COSE_Key only supports EC2 and OKP keys")]
    UnsupportedKeyType,
    #[error("Could not reconstruct coordinates from the provided COSE_Key")]
    InvalidCoseKey,
    #[error("Constructing a JWK from a COSE_Key with point-compression is not supported")]
    UnsupportedFormat,
}

impl CoseKey {
    /// The COSE signature algorithm a key of this curve signs with.
    pub fn signature_algorithm(&self) -> Option<Algorithm> {
        match self {
            CoseKey::EC2 {
                crv: EC2Curve::P256,
                ..
            } => Some(Algorithm::ES256),
            CoseKey::EC2 {
                crv: EC2Curve::P384,
                ..
            } => Some(Algorithm::ES384),
            CoseKey::EC2 {
                crv: EC2Curve::P521,
                ..
            } => Some(Algorithm::ES512),
            CoseKey::OKP {
                crv: OKPCurve::Ed25519,
                ..
            }
            | CoseKey::OKP {
                crv: OKPCurve::Ed448,
                ..
            } => Some(Algorithm::EdDSA),
            _ => None,
        }
    }

    /// The key as a SEC1 encoded point, uncompressed where the y-coordinate
    /// is carried by value and compressed where only the sign bit is known.
    pub fn to_sec1_bytes(&self) -> Result<Vec<u8>, Error> {
        match self {
            CoseKey::EC2 { crv, x, y } => {
                let len = match crv {
                    EC2Curve::P256 => 32,
                    EC2Curve::P384 => 48,
                    EC2Curve::P521 => 66,
                };
                if x.len() > len {
                    return Err(Error::InvalidCoseKey);
                }
                let mut padded_x = vec![0u8; len - x.len()];
                padded_x.extend_from_slice(x);
                match y {
                    EC2Y::Value(y) => {
                        if y.len() > len {
                            return Err(Error::InvalidCoseKey);
                        }
                        let mut bytes = Vec::with_capacity(1 + 2 * len);
                        bytes.push(0x04);
                        bytes.extend_from_slice(&padded_x);
                        bytes.extend(std::iter::repeat(0u8).take(len - y.len()));
                        bytes.extend_from_slice(y);
                        Ok(bytes)
                    }
                    EC2Y::SignBit(sign) => {
                        let mut bytes = Vec::with_capacity(1 + len);
                        bytes.push(if *sign { 0x03 } else { 0x02 });
                        bytes.extend_from_slice(&padded_x);
                        Ok(bytes)
                    }
                }
            }
            CoseKey::OKP { .. } => Err(Error::UnsupportedKeyType),
        }
    }
}

impl TryFrom<&CoseKey> for p256::ecdsa::VerifyingKey {
    type Error = Error;

    fn try_from(key: &CoseKey) -> Result<Self, Error> {
        match key {
            CoseKey::EC2 {
                crv: EC2Curve::P256,
                ..
            } => p256::ecdsa::VerifyingKey::from_sec1_bytes(&key.to_sec1_bytes()?)
                .map_err(|_| Error::InvalidCoseKey),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl TryFrom<&CoseKey> for p384::ecdsa::VerifyingKey {
    type Error = Error;

    fn try_from(key: &CoseKey) -> Result<Self, Error> {
        match key {
            CoseKey::EC2 {
                crv: EC2Curve::P384,
                ..
            } => p384::ecdsa::VerifyingKey::from_sec1_bytes(&key.to_sec1_bytes()?)
                .map_err(|_| Error::InvalidCoseKey),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl TryFrom<&CoseKey> for p521::ecdsa::VerifyingKey {
    type Error = Error;

    fn try_from(key: &CoseKey) -> Result<Self, Error> {
        match key {
            CoseKey::EC2 {
                crv: EC2Curve::P521,
                ..
            } => p521::ecdsa::VerifyingKey::from_sec1_bytes(&key.to_sec1_bytes()?)
                .map_err(|_| Error::InvalidCoseKey),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl TryFrom<&CoseKey> for ed25519_dalek::VerifyingKey {
    type Error = Error;

    fn try_from(key: &CoseKey) -> Result<Self, Error> {
        match key {
            CoseKey::OKP {
                crv: OKPCurve::Ed25519,
                x,
            } => {
                let bytes: [u8; 32] = x.as_slice().try_into().map_err(|_| Error::InvalidCoseKey)?;
                ed25519_dalek::VerifyingKey::from_bytes(&bytes).map_err(|_| Error::InvalidCoseKey)
            }
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl TryFrom<&CoseKey> for p256::PublicKey {
    type Error = Error;

    fn try_from(key: &CoseKey) -> Result<Self, Error> {
        match key {
            CoseKey::EC2 {
                crv: EC2Curve::P256,
                ..
            } => p256::PublicKey::from_sec1_bytes(&key.to_sec1_bytes()?)
                .map_err(|_| Error::InvalidCoseKey),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl TryFrom<&CoseKey> for p384::PublicKey {
    type Error = Error;

    fn try_from(key: &CoseKey) -> Result<Self, Error> {
        match key {
            CoseKey::EC2 {
                crv: EC2Curve::P384,
                ..
            } => p384::PublicKey::from_sec1_bytes(&key.to_sec1_bytes()?)
                .map_err(|_| Error::InvalidCoseKey),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl TryFrom<&CoseKey> for p521::PublicKey {
    type Error = Error;

    fn try_from(key: &CoseKey) -> Result<Self, Error> {
        match key {
            CoseKey::EC2 {
                crv: EC2Curve::P521,
                ..
            } => p521::PublicKey::from_sec1_bytes(&key.to_sec1_bytes()?)
                .map_err(|_| Error::InvalidCoseKey),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl From<CoseKey> for CborValue {
    fn from(key: CoseKey) -> CborValue {
        let mut map = Vec::new();
        match key {
            CoseKey::EC2 { crv, x, y } => {
                // kty: 1, EC2: 2
                map.push((int(1), int(2)));
                // crv: -1
                map.push((
                    int(-1),
                    match crv {
                        EC2Curve::P256 => int(1),
                        EC2Curve::P384 => int(2),
                        EC2Curve::P521 => int(3),
                    },
                ));
                // x: -2
                map.push((int(-2), ciborium::Value::Bytes(x)));
                // y: -3
                map.push((
                    int(-3),
                    match y {
                        EC2Y::Value(v) => ciborium::Value::Bytes(v),
                        EC2Y::SignBit(b) => ciborium::Value::Bool(b),
                    },
                ));
            }
            CoseKey::OKP { crv, x } => {
                // kty: 1, OKP: 1
                map.push((int(1), int(1)));
                // crv: -1
                map.push((
                    int(-1),
                    match crv {
                        OKPCurve::X25519 => int(4),
                        OKPCurve::X448 => int(5),
                        OKPCurve::Ed25519 => int(6),
                        OKPCurve::Ed448 => int(7),
                    },
                ));
                // x: -2
                map.push((int(-2), ciborium::Value::Bytes(x)));
            }
        }
        ciborium::Value::Map(map).into()
    }
}

impl TryFrom<CborValue> for CoseKey {
    type Error = Error;

    fn try_from(v: CborValue) -> Result<Self, Error> {
        if let ciborium::Value::Map(map) = v.0 {
            let mut map: BTreeMap<i128, ciborium::Value> = map
                .into_iter()
                .filter_map(|(k, v)| k.as_integer().map(|k| (k.into(), v)))
                .collect();
            match (map.remove(&1), map.remove(&-1), map.remove(&-2)) {
                (
                    Some(ciborium::Value::Integer(kty)),
                    Some(ciborium::Value::Integer(crv_id)),
                    Some(ciborium::Value::Bytes(x)),
                ) if <i128>::from(kty) == 2 => {
                    let crv = <i128>::from(crv_id).try_into()?;
                    let y = map.remove(&-3).ok_or(Error::EC2MissingY)?;
                    let y = match y {
                        ciborium::Value::Bytes(v) => EC2Y::Value(v),
                        ciborium::Value::Bool(b) => EC2Y::SignBit(b),
                        other => return Err(Error::InvalidTypeY(other.into())),
                    };
                    Ok(Self::EC2 { crv, x, y })
                }
                (
                    Some(ciborium::Value::Integer(kty)),
                    Some(ciborium::Value::Integer(crv_id)),
                    Some(ciborium::Value::Bytes(x)),
                ) if <i128>::from(kty) == 1 => {
                    let crv = <i128>::from(crv_id).try_into()?;
                    Ok(Self::OKP { crv, x })
                }
                _ => Err(Error::UnsupportedKeyType),
            }
        } else {
            Err(Error::NotAMap(v))
        }
    }
}

impl TryFrom<i128> for EC2Curve {
    type Error = Error;

    fn try_from(crv_id: i128) -> Result<Self, Error> {
        match crv_id {
            1 => Ok(EC2Curve::P256),
            2 => Ok(EC2Curve::P384),
            3 => Ok(EC2Curve::P521),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl TryFrom<i128> for OKPCurve {
    type Error = Error;

    fn try_from(crv_id: i128) -> Result<Self, Error> {
        match crv_id {
            4 => Ok(OKPCurve::X25519),
            5 => Ok(OKPCurve::X448),
            6 => Ok(OKPCurve::Ed25519),
            7 => Ok(OKPCurve::Ed448),
            _ => Err(Error::UnsupportedCurve),
        }
    }
}

impl TryFrom<CoseKey> for JWK {
    type Error = Error;

    fn try_from(cose: CoseKey) -> Result<JWK, Error> {
        Ok(match cose {
            CoseKey::EC2 { crv, x, y } => JWK {
                params: ssi_jwk::Params::EC(ssi_jwk::ECParams {
                    curve: Some(match crv {
                        EC2Curve::P256 => "P-256".to_string(),
                        EC2Curve::P384 => "P-384".to_string(),
                        EC2Curve::P521 => "P-521".to_string(),
                    }),
                    x_coordinate: Some(ssi_jwk::Base64urlUInt(x)),
                    y_coordinate: match y {
                        EC2Y::Value(vec) => Some(ssi_jwk::Base64urlUInt(vec)),
                        EC2Y::SignBit(_) => return Err(Error::UnsupportedFormat),
                    },
                    ecc_private_key: None,
                }),
                public_key_use: None,
                key_operations: None,
                algorithm: None,
                key_id: None,
                x509_url: None,
                x509_certificate_chain: None,
                x509_thumbprint_sha1: None,
                x509_thumbprint_sha256: None,
            },
            CoseKey::OKP { crv, x } => JWK {
                params: ssi_jwk::Params::OKP(ssi_jwk::OctetParams {
                    curve: match crv {
                        OKPCurve::X25519 => "X25519".to_string(),
                        OKPCurve::X448 => "X448".to_string(),
                        OKPCurve::Ed25519 => "Ed25519".to_string(),
                        OKPCurve::Ed448 => "Ed448".to_string(),
                    },
                    public_key: ssi_jwk::Base64urlUInt(x),
                    private_key: None,
                }),
                public_key_use: None,
                key_operations: None,
                algorithm: None,
                key_id: None,
                x509_url: None,
                x509_certificate_chain: None,
                x509_thumbprint_sha1: None,
                x509_thumbprint_sha256: None,
            },
        })
    }
}

fn int(i: i64) -> ciborium::Value {
    ciborium::Value::Integer(i.into())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cbor;

    #[test]
    fn ec_p256_roundtrip() {
        let key = CoseKey::EC2 {
            crv: EC2Curve::P256,
            x: vec![0x01, 0x02, 0x03],
            y: EC2Y::Value(vec![0x04, 0x05, 0x06]),
        };
        let bytes = cbor::to_vec(&key).unwrap();
        let key2: CoseKey = cbor::from_slice(&bytes).unwrap();
        assert_eq!(key, key2);
    }

    #[test]
    fn signature_algorithms() {
        let p256 = CoseKey::EC2 {
            crv: EC2Curve::P256,
            x: vec![],
            y: EC2Y::SignBit(false),
        };
        assert_eq!(p256.signature_algorithm(), Some(Algorithm::ES256));
        let ed = CoseKey::OKP {
            crv: OKPCurve::Ed25519,
            x: vec![],
        };
        assert_eq!(ed.signature_algorithm(), Some(Algorithm::EdDSA));
        let x25519 = CoseKey::OKP {
            crv: OKPCurve::X25519,
            x: vec![],
        };
        assert_eq!(x25519.signature_algorithm(), None);
    }

    #[test]
    fn sec1_point_is_padded_to_field_size() {
        let key = CoseKey::EC2 {
            crv: EC2Curve::P256,
            x: vec![0xab; 31],
            y: EC2Y::Value(vec![0xcd; 32]),
        };
        let sec1 = key.to_sec1_bytes().unwrap();
        assert_eq!(sec1.len(), 65);
        assert_eq!(sec1[0], 0x04);
        assert_eq!(sec1[1], 0x00);
    }

    #[test]
    fn jwk_from_ec2() {
        let key = CoseKey::EC2 {
            crv: EC2Curve::P256,
            x: vec![0x01; 32],
            y: EC2Y::Value(vec![0x02; 32]),
        };
        let jwk: JWK = key.try_into().unwrap();
        match jwk.params {
            ssi_jwk::Params::EC(p) => assert_eq!(p.curve.as_deref(), Some("P-256")),
            _ => panic!("expected EC params"),
        }
    }
}
