use crate::definitions::device_key::cose_key::Error as CoseKeyError;
use crate::definitions::helpers::non_empty_vec;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("certificate chain is incomplete: {0}")]
    ChainIncomplete(String),
    #[error("certificate chain signature is invalid: {0}")]
    ChainSignatureInvalid(String),
    #[error("certificate expired or not yet valid: {0}")]
    CertificateExpired(String),
    #[error("certificate does not chain to a trusted root: {0}")]
    UntrustedRoot(String),
    #[error("error occurred while validating x509 certificate: {0}")]
    ValidationError(String),
    #[error("error occurred while decoding a x509 certificate: {0}")]
    DecodingError(String),
}

impl From<x509_cert::der::Error> for Error {
    fn from(value: x509_cert::der::Error) -> Self {
        Error::DecodingError(value.to_string())
    }
}

impl From<x509_cert::spki::Error> for Error {
    fn from(value: x509_cert::spki::Error) -> Self {
        Error::DecodingError(value.to_string())
    }
}

impl From<ecdsa::Error> for Error {
    fn from(value: ecdsa::Error) -> Self {
        Error::ChainSignatureInvalid(value.to_string())
    }
}

impl From<CoseKeyError> for Error {
    fn from(value: CoseKeyError) -> Self {
        Error::ValidationError(value.to_string())
    }
}

impl From<non_empty_vec::Error> for Error {
    fn from(value: non_empty_vec::Error) -> Self {
        Error::ChainIncomplete(value.to_string())
    }
}
