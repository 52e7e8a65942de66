//! Verifier for ISO/IEC 18013-5 mobile driving licence (mDL) `DeviceResponse`
//! documents.
//!
//! Given the encoded response produced by a holder's wallet, the [Verifier]
//! decides whether each embedded document is signed by a trusted issuer,
//! bound to the presenting device, and internally consistent, and reports
//! every check it performs as an [Assessment].
//!
//! ```no_run
//! use mdl_verifier::{VerificationOptions, Verifier};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let iaca_root_der: Vec<u8> = std::fs::read("iaca_root.der")?;
//! let verifier = Verifier::new(&[iaca_root_der])?;
//!
//! let encoded_response: Vec<u8> = std::fs::read("device_response.cbor")?;
//! let options = VerificationOptions {
//!     encoded_session_transcript: Some(std::fs::read("session_transcript.cbor")?),
//!     ..Default::default()
//! };
//!
//! // fail-fast: the first failed check raises
//! let response = verifier.verify(&encoded_response, &options)?;
//!
//! // or collect everything
//! let mut assessments = Vec::new();
//! verifier.verify_with_sink(&encoded_response, &options, &mut assessments)?;
//! # Ok(())
//! # }
//! ```

pub mod cbor;
pub mod cose;
pub mod definitions;
pub mod verify;

pub use definitions::x509::TrustAnchorRegistry;
pub use definitions::{DeviceResponse, EphemeralReaderKey};
pub use verify::{
    Assessment, AssessmentSink, Category, MdlError, Report, Status, VerificationOptions, Verifier,
};
