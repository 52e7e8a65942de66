//! CBOR codec built on [ciborium], with the deterministic-encoding rules of
//! RFC 8949 §4.2.1 that ISO/IEC 18013-5 requires: shortest-form integers,
//! definite lengths, and map keys ordered by their encoded bytes.

use std::borrow::{Borrow, BorrowMut};
use std::io::Cursor;
use std::ops::{Deref, DerefMut};

use coset::{cbor, CoseError, EndOfFile};
use serde::{de, Deserialize, Serialize};
use thiserror::Error;

/// Wraps [ciborium::Value] and implements [PartialEq], [Eq], [PartialOrd] and
/// [Ord], so it can be used in maps and sets.
#[derive(Debug, Clone)]
pub struct Value(pub ciborium::Value);

#[derive(Debug, Error)]
pub enum CborError {
    /// CBOR decoding failure.
    #[error("CBOR decoding failure: {0}")]
    DecodeFailed(cbor::de::Error<EndOfFile>),
    /// Duplicate map key detected.
    #[error("duplicate map key")]
    DuplicateMapKey,
    /// CBOR encoding failure.
    #[error("CBOR encoding failure")]
    EncodeFailed,
    /// CBOR input had extra data.
    #[error("extraneous data")]
    ExtraneousData,
    /// Integer value on the wire is outside the range of integers representable in this crate.
    #[error("integer value out of range")]
    OutOfRangeIntegerValue,
    /// Unexpected CBOR item encountered (got, want).
    #[error("unexpected item: {0}, want {1}")]
    UnexpectedItem(&'static str, &'static str),
    /// Unrecognized value in IANA-controlled range (with no private range).
    #[error("unregistered IANA value")]
    UnregisteredIanaValue,
    /// Unrecognized value in neither IANA-controlled range nor private range.
    #[error("unregistered non-private IANA value")]
    UnregisteredIanaNonPrivateValue,
}

impl From<CoseError> for CborError {
    fn from(e: CoseError) -> Self {
        match e {
            CoseError::DecodeFailed(e) => CborError::DecodeFailed(e),
            CoseError::DuplicateMapKey => CborError::DuplicateMapKey,
            CoseError::EncodeFailed => CborError::EncodeFailed,
            CoseError::ExtraneousData => CborError::ExtraneousData,
            CoseError::OutOfRangeIntegerValue => CborError::OutOfRangeIntegerValue,
            CoseError::UnexpectedItem(s, s2) => CborError::UnexpectedItem(s, s2),
            CoseError::UnregisteredIanaValue => CborError::UnregisteredIanaValue,
            CoseError::UnregisteredIanaNonPrivateValue => CborError::UnregisteredIanaNonPrivateValue,
        }
    }
}

pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, CborError>
where
    T: Serialize,
{
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(CoseError::from)
        .map_err(CborError::from)?;
    Ok(buf)
}

pub fn from_slice<T>(slice: &[u8]) -> Result<T, CborError>
where
    T: de::DeserializeOwned,
{
    ciborium::from_reader(Cursor::new(&slice)).map_err(|e| {
        CborError::from(CoseError::DecodeFailed(ciborium::de::Error::Semantic(
            None,
            e.to_string(),
        )))
    })
}

/// Convert a [ciborium::Value] into a type `T`.
#[allow(clippy::needless_pass_by_value)]
pub fn from_value<T>(value: ciborium::Value) -> Result<T, CborError>
where
    T: de::DeserializeOwned,
{
    let buf = to_vec(&value)?;
    from_slice(buf.as_slice())
}

pub fn into_value<S>(v: S) -> Result<ciborium::Value, CborError>
where
    S: Serialize,
{
    let bytes = to_vec(&v)?;
    from_slice(&bytes)
}

/// Re-encode `value` with maps ordered deterministically: keys sorted by
/// their encoded bytes, shorter encodings first.
pub fn to_vec_sorted<T>(value: &T) -> Result<Vec<u8>, CborError>
where
    T: Serialize,
{
    let value = into_value(value)?;
    to_vec(&sort_maps(value)?)
}

fn sort_maps(value: ciborium::Value) -> Result<ciborium::Value, CborError> {
    Ok(match value {
        ciborium::Value::Map(entries) => {
            let mut encoded: Vec<(Vec<u8>, (ciborium::Value, ciborium::Value))> = entries
                .into_iter()
                .map(|(k, v)| {
                    let k = sort_maps(k)?;
                    let v = sort_maps(v)?;
                    Ok((to_vec(&k)?, (k, v)))
                })
                .collect::<Result<_, CborError>>()?;
            encoded.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
            ciborium::Value::Map(encoded.into_iter().map(|(_, kv)| kv).collect())
        }
        ciborium::Value::Array(items) => ciborium::Value::Array(
            items
                .into_iter()
                .map(sort_maps)
                .collect::<Result<_, CborError>>()?,
        ),
        ciborium::Value::Tag(t, inner) => ciborium::Value::Tag(t, Box::new(sort_maps(*inner)?)),
        other => other,
    })
}

/// Walk a decoded value and reject maps carrying the same encoded key twice.
pub fn reject_duplicate_keys(value: &ciborium::Value) -> Result<(), CborError> {
    match value {
        ciborium::Value::Map(entries) => {
            let mut keys: Vec<Vec<u8>> = entries
                .iter()
                .map(|(k, _)| to_vec(k))
                .collect::<Result<_, CborError>>()?;
            keys.sort();
            if keys.windows(2).any(|w| w[0] == w[1]) {
                return Err(CborError::DuplicateMapKey);
            }
            entries
                .iter()
                .try_for_each(|(_, v)| reject_duplicate_keys(v))
        }
        ciborium::Value::Array(items) => items.iter().try_for_each(reject_duplicate_keys),
        ciborium::Value::Tag(_, inner) => reject_duplicate_keys(inner),
        _ => Ok(()),
    }
}

impl Deref for Value {
    type Target = ciborium::Value;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Value {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}

impl From<ciborium::Value> for Value {
    fn from(value: ciborium::Value) -> Self {
        Self(value)
    }
}

impl From<Value> for ciborium::Value {
    fn from(value: Value) -> Self {
        value.0
    }
}

impl AsRef<ciborium::Value> for Value {
    fn as_ref(&self) -> &ciborium::Value {
        &self.0
    }
}

impl Borrow<ciborium::Value> for Value {
    fn borrow(&self) -> &ciborium::Value {
        &self.0
    }
}

impl BorrowMut<ciborium::Value> for Value {
    fn borrow_mut(&mut self) -> &mut ciborium::Value {
        &mut self.0
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        ciborium::Value::deserialize(deserializer).map(Value)
    }
}

macro_rules! impl_from {
    ($variant:path, $for_type:ty) => {
        impl From<$for_type> for Value {
            fn from(v: $for_type) -> Value {
                $variant(v.into()).into()
            }
        }
    };
}

impl_from!(ciborium::Value::Bool, bool);
impl_from!(ciborium::Value::Integer, i8);
impl_from!(ciborium::Value::Integer, i16);
impl_from!(ciborium::Value::Integer, i32);
impl_from!(ciborium::Value::Integer, i64);
impl_from!(ciborium::Value::Integer, u8);
impl_from!(ciborium::Value::Integer, u16);
impl_from!(ciborium::Value::Integer, u32);
impl_from!(ciborium::Value::Integer, u64);
impl_from!(ciborium::Value::Float, f32);
impl_from!(ciborium::Value::Float, f64);
impl_from!(ciborium::Value::Bytes, Vec<u8>);
impl_from!(ciborium::Value::Text, String);
impl_from!(ciborium::Value::Array, Vec<ciborium::Value>);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sorted_encoding_orders_keys_by_encoded_bytes() {
        let map = ciborium::Value::Map(vec![
            (
                ciborium::Value::Text("aa".to_string()),
                ciborium::Value::Integer(1.into()),
            ),
            (
                ciborium::Value::Text("b".to_string()),
                ciborium::Value::Integer(2.into()),
            ),
            (
                ciborium::Value::Integer(10.into()),
                ciborium::Value::Integer(3.into()),
            ),
        ]);
        // length-then-lex: the one-byte int key sorts first, then "b", then "aa"
        let sorted = to_vec_sorted(&map).unwrap();
        assert_eq!(hex::encode(sorted), "a30a0361620262616101");
    }

    #[test]
    fn duplicate_keys_rejected() {
        // {"a": 1, "a": 2}
        let bytes = hex::decode("a2616101616102").unwrap();
        let value: ciborium::Value = from_slice(&bytes).unwrap();
        assert!(matches!(
            reject_duplicate_keys(&value),
            Err(CborError::DuplicateMapKey)
        ));
    }

    #[test]
    fn nested_duplicate_keys_rejected() {
        // {"x": {"a": 1, "a": 2}}
        let bytes = hex::decode("a16178a2616101616102").unwrap();
        let value: ciborium::Value = from_slice(&bytes).unwrap();
        assert!(reject_duplicate_keys(&value).is_err());
    }

    #[test]
    fn canonical_input_roundtrips_bit_exact() {
        // {"id": 0, "foo": [1, 1004("2024-01-01")]}
        let bytes = hex::decode("a26269640063666f6f8201d903ec6a323032342d30312d3031").unwrap();
        let value: ciborium::Value = from_slice(&bytes).unwrap();
        assert_eq!(to_vec(&value).unwrap(), bytes);
    }
}
