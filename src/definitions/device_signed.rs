//! The device-signed half of a document: device namespaces plus the proof of
//! possession, either a signature or a session-bound MAC.

use std::collections::BTreeMap;

use coset::{CoseMac0, CoseSign1};
use serde::{Deserialize, Serialize};

use crate::cbor::Value as CborValue;
use crate::cose::MaybeTagged;
use crate::definitions::helpers::{NonEmptyMap, Tag24};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSigned {
    #[serde(rename = "nameSpaces")]
    pub namespaces: DeviceNamespacesBytes,

    pub device_auth: DeviceAuth,
}

pub type DeviceNamespacesBytes = Tag24<DeviceNamespaces>;
pub type DeviceNamespaces = BTreeMap<String, DeviceSignedItems>;
pub type DeviceSignedItems = NonEmptyMap<String, CborValue>;

/// The proof-of-possession structure. Exactly one of the fields must be
/// present; both are parsed so that a malformed wallet response reaches the
/// device-auth state machine instead of failing decode.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAuth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_signature: Option<MaybeTagged<CoseSign1>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_mac: Option<MaybeTagged<CoseMac0>>,
}

pub type DeviceAuthenticationBytes = Tag24<DeviceAuthentication>;

/// The structure the device signs or MACs:
/// `["DeviceAuthentication", SessionTranscript, DocType, DeviceNameSpacesBytes]`.
///
/// The session transcript is embedded as the value decoded from the
/// caller-supplied bytes; for canonical input the re-encoding is
/// byte-identical, so both ends of the session agree on the signed bytes.
#[derive(Clone, Debug, Serialize)]
pub struct DeviceAuthentication(
    &'static str,
    CborValue,
    String,
    DeviceNamespacesBytes,
);

impl DeviceAuthentication {
    pub fn new(
        transcript: CborValue,
        doc_type: String,
        namespaces_bytes: DeviceNamespacesBytes,
    ) -> Self {
        Self(
            "DeviceAuthentication",
            transcript,
            doc_type,
            namespaces_bytes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor;

    #[test]
    fn device_authentication_encoding_is_deterministic() {
        let transcript: CborValue = ciborium::Value::Array(vec![
            ciborium::Value::Null,
            ciborium::Value::Null,
            ciborium::Value::Text("handover".to_string()),
        ])
        .into();
        let namespaces = Tag24::new(DeviceNamespaces::new()).unwrap();
        let auth = DeviceAuthentication::new(
            transcript.clone(),
            "org.iso.18013.5.1.mDL".to_string(),
            namespaces.clone(),
        );
        let bytes1 = cbor::to_vec(&Tag24::new(auth).unwrap()).unwrap();
        let auth2 =
            DeviceAuthentication::new(transcript, "org.iso.18013.5.1.mDL".to_string(), namespaces);
        let bytes2 = cbor::to_vec(&Tag24::new(auth2).unwrap()).unwrap();
        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn device_auth_with_signature_only_roundtrips() {
        // {"deviceSignature": [{1: -7}, {}, null, h'00']}
        let bytes = hex::decode("a16f6465766963655369676e61747572658443a10126a0f64100").unwrap();
        let auth: DeviceAuth = cbor::from_slice(&bytes).unwrap();
        assert!(auth.device_signature.is_some());
        assert!(auth.device_mac.is_none());
        assert_eq!(cbor::to_vec(&auth).unwrap(), bytes);
    }
}
