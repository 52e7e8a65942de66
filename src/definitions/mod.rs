//! Data model for ISO/IEC 18013-5 `DeviceResponse` documents and their
//! supporting structures.

pub mod device_key;
pub mod device_response;
pub mod device_signed;
pub mod fulldate;
pub mod helpers;
pub mod issuer_signed;
pub mod mso;
pub mod session;
pub mod validity_info;
pub mod x509;

pub use device_key::DeviceKeyInfo;
pub use device_response::{DeviceResponse, Document};
pub use device_signed::{DeviceAuth, DeviceSigned};
pub use fulldate::FullDate;
pub use issuer_signed::{IssuerSigned, IssuerSignedItem};
pub use mso::{DigestAlgorithm, DigestId, Mso};
pub use session::EphemeralReaderKey;
pub use validity_info::ValidityInfo;
