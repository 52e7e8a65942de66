use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cbor::Value as CborValue;

/// `full-date` as defined in RFC 3339, carried on the wire as CBOR tag 1004.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CborValue", into = "CborValue")]
pub struct FullDate(NaiveDate);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Expected to parse a CBOR tag (number 1004), received: '{0:?}'")]
    NotATag1004(CborValue),
    #[error("Failed to parse text as a full-date: {0}")]
    UnableToParseDate(chrono::ParseError),
}

impl From<FullDate> for CborValue {
    fn from(d: FullDate) -> CborValue {
        ciborium::Value::Tag(1004, Box::new(ciborium::Value::Text(d.to_string()))).into()
    }
}

impl TryFrom<CborValue> for FullDate {
    type Error = Error;

    fn try_from(v: CborValue) -> Result<FullDate, Error> {
        match v.0 {
            ciborium::Value::Tag(1004, inner) => match *inner {
                ciborium::Value::Text(date_str) => date_str.parse(),
                other => Err(Error::NotATag1004(CborValue(other))),
            },
            other => Err(Error::NotATag1004(CborValue(other))),
        }
    }
}

impl fmt::Display for FullDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for FullDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(FullDate)
            .map_err(Error::UnableToParseDate)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cbor;

    #[test]
    fn fulldate_str_roundtrip() {
        const DATESTR: &str = "2000-02-01";
        let fulldate = FullDate::from_str(DATESTR).expect("unable to parse datestr");
        assert_eq!(DATESTR, fulldate.to_string());
    }

    #[test]
    fn fulldate_cbor_roundtrip() {
        // 1004("2024-03-31")
        let bytes = hex::decode("d903ec6a323032342d30332d3331").unwrap();
        let fulldate: FullDate = cbor::from_slice(&bytes).unwrap();
        assert_eq!(fulldate.to_string(), "2024-03-31");
        assert_eq!(cbor::to_vec(&fulldate).unwrap(), bytes);
    }
}
