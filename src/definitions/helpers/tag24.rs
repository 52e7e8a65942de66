//! Support for embedded
//! [CBOR Data Items](https://www.ietf.org/rfc/rfc8949.html#name-encoded-cbor-data-item),
//! also known as a tagged data item with tag number 24.

use ciborium::Value;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};

use crate::cbor::{self, CborError};

/// A wrapper for a struct that is to be encoded as a CBOR tagged item, with tag number 24.
///
/// If this struct is created through deserializing CBOR, then the original byte representation
/// is preserved verbatim in `inner_bytes` and reused for future serializing. Digest
/// verification depends on this: the issuer committed to the bytes as transmitted, not to a
/// re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag24<T> {
    inner: T,
    pub inner_bytes: Vec<u8>,
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Expected a CBOR byte string, received: '{0:?}'")]
    InvalidTag24(Box<Value>),
    #[error("Expected a CBOR tagged data item with tag number 24, received: '{0:?}'")]
    NotATag24(Value),
    #[error("Inner bytes are not deterministically encoded CBOR")]
    NonCanonical,
    #[error("Unable to encode value as CBOR: {0}")]
    UnableToEncode(CborError),
    #[error("Unable to decode bytes to inner type: {0}")]
    UnableToDecode(CborError),
}

impl<T> Tag24<T> {
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn inner_bytes(&self) -> &[u8] {
        &self.inner_bytes
    }
}

impl<T: Serialize> Tag24<T> {
    pub fn new(inner: T) -> Result<Tag24<T>> {
        let inner_bytes = cbor::to_vec(&inner).map_err(Error::UnableToEncode)?;
        Ok(Self { inner, inner_bytes })
    }
}

impl<T: DeserializeOwned> Tag24<T> {
    /// Reconstruct from the inner byte string of a tag-24 item.
    ///
    /// The bytes must hold a single deterministically-encoded data item: indefinite lengths
    /// and non-shortest integer forms are rejected, since digests are computed over these
    /// bytes and a re-encoding would not round-trip.
    pub fn from_bytes(inner_bytes: Vec<u8>) -> Result<Tag24<T>> {
        let value: Value = cbor::from_slice(&inner_bytes).map_err(Error::UnableToDecode)?;
        let reencoded = cbor::to_vec(&value).map_err(Error::UnableToEncode)?;
        if reencoded != inner_bytes {
            return Err(Error::NonCanonical);
        }
        let inner: T = cbor::from_value(value).map_err(Error::UnableToDecode)?;
        Ok(Self { inner, inner_bytes })
    }
}

impl<T: DeserializeOwned> TryFrom<Value> for Tag24<T> {
    type Error = Error;

    fn try_from(v: Value) -> Result<Tag24<T>> {
        match v {
            Value::Tag(24, inner_value) => match *inner_value {
                Value::Bytes(inner_bytes) => Self::from_bytes(inner_bytes),
                other => Err(Error::InvalidTag24(Box::new(other))),
            },
            _ => Err(Error::NotATag24(v)),
        }
    }
}

impl<T> From<Tag24<T>> for Value {
    fn from(Tag24 { inner_bytes, .. }: Tag24<T>) -> Value {
        Value::Tag(24, Box::new(Value::Bytes(inner_bytes)))
    }
}

impl<T> AsRef<T> for Tag24<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

impl<T> Serialize for Tag24<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        Value::Tag(24, Box::new(Value::Bytes(self.inner_bytes.clone()))).serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Tag24<T> {
    fn deserialize<D>(d: D) -> std::result::Result<Tag24<T>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(d)?;
        value.try_into().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::Tag24;
    use crate::cbor;

    #[test]
    fn cbor_roundtrip() {
        let original = Tag24::new(String::from("some data")).unwrap();
        let bytes = cbor::to_vec(&original).unwrap();
        let roundtripped: Tag24<String> = cbor::from_slice(&bytes).unwrap();
        assert_eq!(original, roundtripped);
        assert_eq!(bytes, cbor::to_vec(&roundtripped).unwrap());
    }

    #[test]
    fn wrapping_is_idempotent_on_inner_bytes() {
        let inner = Tag24::new(42u64).unwrap();
        let outer = Tag24::new(inner.clone()).unwrap();
        let decoded: Tag24<Tag24<u64>> =
            cbor::from_slice(&cbor::to_vec(&outer).unwrap()).unwrap();
        assert_eq!(decoded.as_ref().inner_bytes, inner.inner_bytes);
    }

    #[test]
    fn indefinite_length_inner_bytes_rejected() {
        // 0x5f..0xff: indefinite-length byte string (two chunks)
        let inner_bytes = hex::decode("5f41004101ff").unwrap();
        assert!(Tag24::<Vec<u8>>::from_bytes(inner_bytes).is_err());
    }

    #[test]
    fn non_shortest_form_inner_bytes_rejected() {
        // 0x1800 is the two-byte encoding of 0, which must be encoded as 0x00
        let inner_bytes = hex::decode("1800").unwrap();
        assert!(Tag24::<u64>::from_bytes(inner_bytes).is_err());
    }
}
