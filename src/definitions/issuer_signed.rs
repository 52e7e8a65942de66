//! The issuer-signed half of a document: disclosed attributes grouped by
//! namespace, plus the `issuerAuth` COSE_Sign1 whose payload is the tag-24
//! wrapped MSO.

use coset::CoseSign1;
use serde::{Deserialize, Serialize};

use crate::cbor::Value as CborValue;
use crate::cose::MaybeTagged;
use crate::definitions::{
    helpers::{ByteStr, NonEmptyMap, NonEmptyVec, Tag24},
    DigestId,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSigned {
    #[serde(skip_serializing_if = "Option::is_none", rename = "nameSpaces")]
    pub namespaces: Option<IssuerNamespaces>,
    pub issuer_auth: MaybeTagged<CoseSign1>,
}

pub type IssuerNamespaces = NonEmptyMap<String, NonEmptyVec<IssuerSignedItemBytes>>;
pub type IssuerSignedItemBytes = Tag24<IssuerSignedItem>;

/// An item disclosed by the holder. Digest verification runs over the tag-24
/// inner bytes as transmitted, not over a re-encoding of this struct.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSignedItem {
    #[serde(rename = "digestID")]
    pub digest_id: DigestId,

    /// Salt hashed alongside the element to blind undisclosed values.
    pub random: ByteStr,

    pub element_identifier: String,

    pub element_value: CborValue,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cbor;
    use crate::definitions::DigestId;

    #[test]
    fn issuer_signed_item_tag24_roundtrip() {
        let item = IssuerSignedItem {
            digest_id: DigestId::new(0),
            random: ByteStr::from(vec![0, 1, 2, 3]),
            element_identifier: "family_name".to_string(),
            element_value: ciborium::Value::Text("Doe".to_string()).into(),
        };
        let wrapped = Tag24::new(item).unwrap();
        let bytes = cbor::to_vec(&wrapped).unwrap();
        let roundtripped: IssuerSignedItemBytes = cbor::from_slice(&bytes).unwrap();
        assert_eq!(wrapped.inner_bytes, roundtripped.inner_bytes);
        assert_eq!(bytes, cbor::to_vec(&roundtripped).unwrap());
    }
}
