use std::collections::BTreeMap;

use chrono::{DateTime, ParseError as ChronoParseError, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::cbor::Value as CborValue;

/// The MSO validity window. Each instant is carried on the wire as a tag-0
/// RFC 3339 date-time with a trailing `Z` and no fractional seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CborValue", into = "CborValue")]
pub struct ValidityInfo {
    pub signed: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub expected_update: Option<DateTime<Utc>>,
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("When parsing a CBOR map, could not find required field: '{0:?}'")]
    MissingField(CborValue),
    #[error("Expected to parse a CBOR map, received: '{0:?}'")]
    NotAMap(CborValue),
    #[error("Expected to parse a CBOR text string, received: '{0:?}'")]
    NotATextString(Box<CborValue>),
    #[error("Expected to parse a CBOR tag (number {0}), received: '{1:?}'")]
    NotATag(u64, CborValue),
    #[error("Failed to parse date string as an rfc3339 date: {0}")]
    UnableToParseDate(ChronoParseError),
}

impl From<ValidityInfo> for CborValue {
    fn from(v: ValidityInfo) -> CborValue {
        let mut map = Vec::new();

        map.push((text("signed"), datetime_to_cbor(&v.signed)));
        map.push((text("validFrom"), datetime_to_cbor(&v.valid_from)));
        map.push((text("validUntil"), datetime_to_cbor(&v.valid_until)));
        if let Some(expected_update) = &v.expected_update {
            map.push((text("expectedUpdate"), datetime_to_cbor(expected_update)));
        }

        ciborium::Value::Map(map).into()
    }
}

impl TryFrom<CborValue> for ValidityInfo {
    type Error = Error;

    fn try_from(v: CborValue) -> Result<ValidityInfo> {
        if let ciborium::Value::Map(map) = v.0 {
            let mut map: BTreeMap<String, ciborium::Value> = map
                .into_iter()
                .filter_map(|(k, v)| k.into_text().ok().map(|k| (k, v)))
                .collect();

            let signed = remove_datetime(&mut map, "signed")?;
            let valid_from = remove_datetime(&mut map, "validFrom")?;
            let valid_until = remove_datetime(&mut map, "validUntil")?;
            let expected_update = map
                .remove("expectedUpdate")
                .map(cbor_to_datetime)
                .transpose()?;

            Ok(Self {
                signed,
                valid_from,
                valid_until,
                expected_update,
            })
        } else {
            Err(Error::NotAMap(v))
        }
    }
}

fn text(s: &str) -> ciborium::Value {
    ciborium::Value::Text(s.to_string())
}

fn remove_datetime(
    map: &mut BTreeMap<String, ciborium::Value>,
    name: &str,
) -> Result<DateTime<Utc>> {
    map.remove(name)
        .ok_or_else(|| Error::MissingField(text(name).into()))
        .and_then(cbor_to_datetime)
}

fn datetime_to_cbor(dt: &DateTime<Utc>) -> ciborium::Value {
    ciborium::Value::Tag(
        0,
        Box::new(ciborium::Value::Text(
            dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        )),
    )
}

fn cbor_to_datetime(v: ciborium::Value) -> Result<DateTime<Utc>> {
    if let ciborium::Value::Tag(0, inner) = v {
        if let ciborium::Value::Text(date_str) = *inner {
            DateTime::parse_from_rfc3339(&date_str)
                .map(Into::into)
                .map_err(Error::UnableToParseDate)
        } else {
            Err(Error::NotATextString(Box::new(CborValue(*inner))))
        }
    } else {
        Err(Error::NotATag(0, CborValue(v)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cbor;

    #[test]
    fn tag0_roundtrip() {
        // {"signed": 0("2023-06-01T00:00:00Z"),
        //  "validFrom": 0("2023-06-01T00:00:00Z"),
        //  "validUntil": 0("2040-01-01T00:00:00Z")}
        let bytes = hex::decode(concat!(
            "a3667369676e6564c074323032332d30362d30315430303a30303a30305a69",
            "76616c696446726f6dc074323032332d30362d30315430303a30303a30305a",
            "6a76616c6964556e74696cc074323034302d30312d30315430303a30303a30",
            "305a"
        ))
        .unwrap();
        let info: ValidityInfo = cbor::from_slice(&bytes).unwrap();
        assert!(info.valid_from <= info.valid_until);
        assert_eq!(cbor::to_vec(&info).unwrap(), bytes);
    }

    #[test]
    fn untagged_datetime_rejected() {
        let value = CborValue(ciborium::Value::Map(vec![(
            text("signed"),
            text("2023-06-01T00:00:00Z"),
        )]));
        assert!(ValidityInfo::try_from(value).is_err());
    }
}
