//! Device key material carried inside the MSO.
//!
//! [DeviceKeyInfo] holds the key the document is bound to, plus optional
//! authorizations restricting which namespaces and elements that key may
//! sign over.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cbor::Value as CborValue;
use crate::definitions::helpers::{NonEmptyMap, NonEmptyVec};

pub mod cose_key;

pub use cose_key::CoseKey;
pub use cose_key::EC2Curve;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceKeyInfo {
    /// The device key. Optional here so that its absence is a device-auth
    /// verdict rather than a parse failure.
    pub device_key: Option<CoseKey>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_authorizations: Option<KeyAuthorizations>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_info: Option<BTreeMap<CborValue, CborValue>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAuthorizations {
    #[serde(skip_serializing_if = "Option::is_none", rename = "nameSpaces")]
    pub namespaces: Option<NonEmptyVec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_elements: Option<NonEmptyMap<String, NonEmptyVec<String>>>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("namespace '{0}' cannot be present in both authorized_namespaces and authorized_data_elements")]
    DoubleAuthorized(String),
}

impl KeyAuthorizations {
    /// If a namespace is present in authorized namespaces, then it cannot be
    /// present in authorized data elements.
    pub fn validate(&self) -> Result<(), Error> {
        let Some(authorized_data_elements) = &self.data_elements else {
            return Ok(());
        };
        if let Some(authorized_namespaces) = &self.namespaces {
            authorized_namespaces.iter().try_for_each(|namespace| {
                authorized_data_elements
                    .get(namespace)
                    .map_or(Ok(()), |_| Err(Error::DoubleAuthorized(namespace.clone())))
            })
        } else {
            Ok(())
        }
    }

    /// Determine whether the key is permitted to sign over the designated element.
    pub fn permitted(&self, namespace: &str, element_identifier: &str) -> bool {
        if let Some(namespaces) = self.namespaces.as_ref() {
            return namespaces.iter().any(|ns| ns == namespace);
        }
        if let Some(namespaces) = self.data_elements.as_ref() {
            if let Some(data_elements) = namespaces.get(namespace) {
                return data_elements.iter().any(|el| el == element_identifier);
            }
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn double_authorization_rejected() {
        let auth = KeyAuthorizations {
            namespaces: Some(NonEmptyVec::new("org.iso.18013.5.1".to_string())),
            data_elements: Some(NonEmptyMap::new(
                "org.iso.18013.5.1".to_string(),
                NonEmptyVec::new("family_name".to_string()),
            )),
        };
        assert!(auth.validate().is_err());
    }

    #[test]
    fn namespace_authorization_permits_all_elements() {
        let auth = KeyAuthorizations {
            namespaces: Some(NonEmptyVec::new("org.iso.18013.5.1".to_string())),
            data_elements: None,
        };
        assert!(auth.permitted("org.iso.18013.5.1", "family_name"));
        assert!(!auth.permitted("org.iso.18013.5.1.aamva", "family_name"));
    }
}
