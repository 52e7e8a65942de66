//! Top-level `DeviceResponse` structure returned by the holder's wallet.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::definitions::{
    helpers::{NonEmptyMap, NonEmptyVec},
    DeviceSigned, IssuerSigned,
};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Documents>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_errors: Option<DocumentErrors>,
    pub status: Status,
}

pub type Documents = NonEmptyVec<Document>;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub doc_type: String,
    pub issuer_signed: IssuerSigned,
    /// Absent for issuer-only presentations; device authentication then fails
    /// with a verdict instead of a parse error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_signed: Option<DeviceSigned>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Errors>,
}

pub type Errors = NonEmptyMap<String, NonEmptyMap<String, i128>>;

pub type DocumentErrors = NonEmptyVec<HashMap<String, i128>>;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum Status {
    OK,
    GeneralError,
    CborDecodingError,
    CborValidationError,
}

impl From<Status> for u64 {
    fn from(s: Status) -> u64 {
        match s {
            Status::OK => 0,
            Status::GeneralError => 10,
            Status::CborDecodingError => 11,
            Status::CborValidationError => 12,
        }
    }
}

impl TryFrom<u64> for Status {
    type Error = String;

    fn try_from(n: u64) -> Result<Status, String> {
        match n {
            0 => Ok(Status::OK),
            10 => Ok(Status::GeneralError),
            11 => Ok(Status::CborDecodingError),
            12 => Ok(Status::CborValidationError),
            _ => Err(format!("unrecognised error code: {n}")),
        }
    }
}

impl DeviceResponse {
    pub const VERSION: &'static str = "1.0";

    /// Whether `version` parses as `major.minor[.patch]` and is at least 1.0.
    pub fn version_supported(&self) -> bool {
        let mut parts = self.version.split('.').map(|p| p.parse::<u32>());
        match (parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(_))) => major >= 1,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn response_with_version(version: &str) -> DeviceResponse {
        DeviceResponse {
            version: version.to_string(),
            documents: None,
            document_errors: None,
            status: Status::OK,
        }
    }

    #[test]
    fn version_bounds() {
        assert!(response_with_version("1.0").version_supported());
        assert!(response_with_version("1.1").version_supported());
        assert!(response_with_version("2.0").version_supported());
        assert!(!response_with_version("0.9").version_supported());
        assert!(!response_with_version("1").version_supported());
        assert!(!response_with_version("not-a-version").version_supported());
    }

    #[test]
    fn status_codes() {
        assert!(Status::try_from(0).is_ok());
        assert!(Status::try_from(11).is_ok());
        assert!(Status::try_from(1).is_err());
    }
}
