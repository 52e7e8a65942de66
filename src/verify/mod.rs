//! The verification pipeline: issuer authentication, device authentication
//! and data integrity, in that order, emitting one [Assessment] per check.

pub mod assessment;
pub mod diagnostics;

use chrono::{DateTime, Utc};
use coset::iana;

use crate::cbor::{self, Value as CborValue};
use crate::cose::{algorithm_name, protected_algorithm, MaybeTagged, VerifierKey};
use crate::definitions::session::{self, EphemeralReaderKey};
use crate::definitions::x509::{TrustAnchorRegistry, X5Chain, X509, X5CHAIN_HEADER_LABEL};
use crate::definitions::x509::{error::Error as X509Error, trust_anchor};
use crate::definitions::{DeviceResponse, DigestAlgorithm, Document, Mso};

pub use assessment::{Assessment, AssessmentSink, Category, Status};
use assessment::Recorder;
pub use diagnostics::Report;

/// The single error kind surfaced by verification; the machine-readable form
/// is the list of FAILED assessments delivered to the sink.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MdlError(pub String);

/// Per-call options.
#[derive(Debug, Default, Clone)]
pub struct VerificationOptions {
    /// The exact CBOR encoding of the `SessionTranscript` used during the
    /// session. Required for device authentication.
    pub encoded_session_transcript: Option<Vec<u8>>,

    /// The verifier's ephemeral private key. Required when the document
    /// carries a `deviceMac` proof.
    pub ephemeral_reader_key: Option<EphemeralReaderKey>,

    /// Skip certificate chain validation; the issuer signature is still
    /// checked against the leaf.
    pub disable_certificate_chain_validation: bool,

    /// Pin the verification instant; defaults to the current time.
    pub at: Option<DateTime<Utc>>,
}

/// Immutable after construction; `verify` and `diagnose` are reentrant and
/// hold no mutable process-wide state.
#[derive(Debug, Clone)]
pub struct Verifier {
    trust_anchors: TrustAnchorRegistry,
}

pub(crate) struct AttributeOutcome {
    pub namespace: String,
    pub id: String,
    pub value: CborValue,
    pub is_valid: bool,
    pub match_certificate: Option<bool>,
}

pub(crate) struct DocumentOutcome {
    pub doc_type: String,
    pub issuer_alg: Option<iana::Algorithm>,
    pub device_alg: Option<iana::Algorithm>,
    pub leaf: Option<X509>,
    pub mso: Option<Mso>,
    pub attributes: Vec<AttributeOutcome>,
    pub device_attributes: Vec<(String, String, CborValue)>,
    pub has_device_signed: bool,
    pub disclosed_count: usize,
    pub total_digests: usize,
}

impl Verifier {
    /// Build a verifier trusting the given DER-encoded IACA roots.
    pub fn new<T: AsRef<[u8]>>(trust_anchors_der: &[T]) -> Result<Self, X509Error> {
        Ok(Verifier {
            trust_anchors: TrustAnchorRegistry::from_der(trust_anchors_der)?,
        })
    }

    pub fn with_registry(trust_anchors: TrustAnchorRegistry) -> Self {
        Verifier { trust_anchors }
    }

    /// Verify an encoded `DeviceResponse`, failing fast: the first FAILED
    /// check becomes an [MdlError].
    pub fn verify(
        &self,
        encoded_response: &[u8],
        options: &VerificationOptions,
    ) -> Result<DeviceResponse, MdlError> {
        let mut recorder = Recorder::new(None);
        let response = self.run(encoded_response, options, &mut recorder)?;
        if let Some(failed) = recorder.first_failed() {
            return Err(MdlError(failed.message().to_string()));
        }
        Ok(response.0)
    }

    /// Verify an encoded `DeviceResponse`, streaming every assessment to
    /// `sink`. Only fatal format errors (input that is not a `DeviceResponse`
    /// at all) are surfaced as [MdlError]; verdicts live in the assessments.
    pub fn verify_with_sink(
        &self,
        encoded_response: &[u8],
        options: &VerificationOptions,
        sink: &mut dyn AssessmentSink,
    ) -> Result<DeviceResponse, MdlError> {
        let mut recorder = Recorder::new(Some(sink));
        let response = self.run(encoded_response, options, &mut recorder)?;
        Ok(response.0)
    }

    /// Run the full pipeline and aggregate a structured [Report].
    pub fn diagnose(
        &self,
        encoded_response: &[u8],
        options: &VerificationOptions,
    ) -> Result<Report, MdlError> {
        let mut recorder = Recorder::new(None);
        let (_, outcomes) = self.run(encoded_response, options, &mut recorder)?;
        Ok(diagnostics::build_report(
            recorder.into_assessments(),
            outcomes,
        ))
    }

    fn run(
        &self,
        encoded_response: &[u8],
        options: &VerificationOptions,
        recorder: &mut Recorder<'_>,
    ) -> Result<(DeviceResponse, Vec<DocumentOutcome>), MdlError> {
        let now = options.at.unwrap_or_else(Utc::now);

        // Bytes that are not CBOR at all abort before any category loop.
        let value: ciborium::Value = cbor::from_slice(encoded_response)
            .map_err(|e| MdlError(format!("DeviceResponse is not valid CBOR: {e}")))?;

        if cbor::reject_duplicate_keys(&value).is_err() {
            let assessment = Assessment::failed(
                Category::DocumentFormat,
                "DeviceResponse must not contain duplicate map keys",
                "duplicate map key",
            );
            let message = assessment.message().to_string();
            recorder.record(assessment);
            return Err(MdlError(message));
        }

        let response: DeviceResponse = match cbor::from_value(value) {
            Ok(response) => response,
            Err(e) => {
                let assessment = Assessment::failed(
                    Category::DocumentFormat,
                    "DeviceResponse must be well-formed",
                    format!("unable to decode DeviceResponse: {e}"),
                );
                let message = assessment.message().to_string();
                recorder.record(assessment);
                return Err(MdlError(message));
            }
        };

        if response.version_supported() {
            recorder.record(Assessment::passed(
                Category::DocumentFormat,
                "DeviceResponse version must be 1.0 or greater",
            ));
        } else {
            recorder.record(Assessment::failed(
                Category::DocumentFormat,
                "DeviceResponse version must be 1.0 or greater",
                format!("unsupported DeviceResponse version: {}", response.version),
            ));
        }

        let documents = match response.documents.as_ref() {
            Some(documents) => documents.as_ref(),
            None => {
                recorder.record(Assessment::failed(
                    Category::DocumentFormat,
                    "DeviceResponse must contain at least one document",
                    "no documents in DeviceResponse",
                ));
                return Ok((response, Vec::new()));
            }
        };

        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            tracing::debug!(doc_type = %document.doc_type, "verifying document");
            let mut outcome = DocumentOutcome {
                doc_type: document.doc_type.clone(),
                issuer_alg: None,
                device_alg: None,
                leaf: None,
                mso: None,
                attributes: Vec::new(),
                device_attributes: Vec::new(),
                has_device_signed: document.device_signed.is_some(),
                disclosed_count: 0,
                total_digests: 0,
            };
            self.issuer_auth(document, now, options, recorder, &mut outcome);
            self.device_auth(document, options, recorder, &mut outcome);
            self.data_integrity(document, recorder, &mut outcome);
            outcomes.push(outcome);
        }

        Ok((response, outcomes))
    }

    fn issuer_auth(
        &self,
        document: &Document,
        now: DateTime<Utc>,
        options: &VerificationOptions,
        recorder: &mut Recorder<'_>,
        outcome: &mut DocumentOutcome,
    ) {
        let issuer_auth = &document.issuer_signed.issuer_auth;
        outcome.issuer_alg = protected_algorithm(&issuer_auth.inner.protected);

        let x5chain = match extract_x5chain(issuer_auth) {
            Ok(x5chain) => {
                recorder.record(Assessment::passed(
                    Category::IssuerAuth,
                    "Issuer certificate must be valid",
                ));
                outcome.leaf = Some(x5chain.leaf().clone());
                Some(x5chain)
            }
            Err(reason) => {
                recorder.record(Assessment::failed(
                    Category::IssuerAuth,
                    "Issuer certificate must be valid",
                    reason,
                ));
                None
            }
        };

        if let Some(x5chain) = x5chain.as_ref() {
            if !options.disable_certificate_chain_validation {
                let errors = x5chain.validate(&self.trust_anchors, now.timestamp());
                if errors.is_empty() {
                    recorder.record(Assessment::passed(
                        Category::IssuerAuth,
                        "Issuer certificate must be trusted",
                    ));
                } else {
                    let reasons = errors
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ");
                    recorder.record(Assessment::failed(
                        Category::IssuerAuth,
                        "Issuer certificate must be trusted",
                        reasons,
                    ));
                }
            }
        }

        let mso = match issuer_auth.inner.payload.as_ref() {
            Some(payload) => match cbor::from_slice::<crate::definitions::helpers::Tag24<Mso>>(
                payload,
            ) {
                Ok(mso) => Some(mso.into_inner()),
                Err(e) => {
                    recorder.record(Assessment::failed(
                        Category::IssuerAuth,
                        "MSO must be parseable",
                        format!("unable to parse issuerAuth payload as an MSO: {e}"),
                    ));
                    None
                }
            },
            None => {
                recorder.record(Assessment::failed(
                    Category::IssuerAuth,
                    "MSO must be parseable",
                    "issuerAuth carries a detached payload",
                ));
                None
            }
        };

        if let Some(x5chain) = x5chain.as_ref() {
            match x5chain.leaf().verifier_key() {
                Ok(key) => match issuer_auth.verify_with_key(&key, None) {
                    crate::cose::sign1::VerificationResult::Success => {
                        recorder.record(Assessment::passed(
                            Category::IssuerAuth,
                            "Issuer signature must be valid",
                        ));
                    }
                    other => {
                        recorder.record(Assessment::failed(
                            Category::IssuerAuth,
                            "Issuer signature must be valid",
                            other
                                .into_result()
                                .err()
                                .unwrap_or_else(|| "signature is not authentic".to_string()),
                        ));
                    }
                },
                Err(e) => {
                    recorder.record(Assessment::failed(
                        Category::IssuerAuth,
                        "Issuer signature must be valid",
                        format!("unable to extract the signer public key: {e}"),
                    ));
                }
            }
        }

        if let (Some(x5chain), Some(mso)) = (x5chain.as_ref(), mso.as_ref()) {
            if let Ok(leaf) = x5chain.leaf().certificate() {
                let validity = leaf.tbs_certificate.validity;
                let not_before = validity.not_before.to_unix_duration().as_secs() as i64;
                let not_after = validity.not_after.to_unix_duration().as_secs() as i64;
                let signed = mso.validity_info.signed.timestamp();
                if signed < not_before || signed > not_after {
                    recorder.record(Assessment::failed(
                        Category::IssuerAuth,
                        "MSO must be signed during the certificate validity period",
                        format!(
                            "the MSO signed date ({}) is outside the certificate validity period",
                            mso.validity_info.signed.to_rfc3339()
                        ),
                    ));
                } else {
                    recorder.record(Assessment::passed(
                        Category::IssuerAuth,
                        "MSO must be signed during the certificate validity period",
                    ));
                }
            }
        }

        if let Some(mso) = mso.as_ref() {
            if mso.validity_info.valid_from <= now && now <= mso.validity_info.valid_until {
                recorder.record(Assessment::passed(
                    Category::IssuerAuth,
                    "MSO must be valid at the time of verification",
                ));
            } else {
                recorder.record(Assessment::failed(
                    Category::IssuerAuth,
                    "MSO must be valid at the time of verification",
                    format!(
                        "the MSO is valid from {} until {}",
                        mso.validity_info.valid_from.to_rfc3339(),
                        mso.validity_info.valid_until.to_rfc3339()
                    ),
                ));
            }
        }

        if let Some(x5chain) = x5chain.as_ref() {
            match x5chain.leaf().certificate() {
                Ok(leaf) if trust_anchor::subject_country_name(&leaf).is_some() => {
                    recorder.record(Assessment::passed(
                        Category::IssuerAuth,
                        "Issuer certificate must contain a country name",
                    ));
                }
                _ => {
                    recorder.record(Assessment::failed(
                        Category::IssuerAuth,
                        "Issuer certificate must contain a country name",
                        "no countryName (C) in the issuer certificate subject",
                    ));
                }
            }
        }

        outcome.mso = mso;
    }

    fn device_auth(
        &self,
        document: &Document,
        options: &VerificationOptions,
        recorder: &mut Recorder<'_>,
        outcome: &mut DocumentOutcome,
    ) {
        let Some(device_signed) = document.device_signed.as_ref() else {
            recorder.record(Assessment::failed(
                Category::DeviceAuth,
                "Document must be signed by the device",
                "not signed by the device",
            ));
            return;
        };

        for (namespace, items) in device_signed.namespaces.as_ref() {
            for (id, value) in items.as_ref() {
                outcome
                    .device_attributes
                    .push((namespace.clone(), id.clone(), value.clone()));
            }
        }

        let auth = &device_signed.device_auth;
        match (&auth.device_signature, &auth.device_mac) {
            (None, None) => {
                recorder.record(Assessment::failed(
                    Category::DeviceAuth,
                    "Device authentication must carry exactly one proof",
                    "neither deviceSignature nor deviceMac is present",
                ));
                return;
            }
            (Some(_), Some(_)) => {
                recorder.record(Assessment::failed(
                    Category::DeviceAuth,
                    "Device authentication must carry exactly one proof",
                    "both deviceSignature and deviceMac are present",
                ));
                return;
            }
            _ => {}
        }

        let device_key = match outcome
            .mso
            .as_ref()
            .and_then(|mso| mso.device_key_info.device_key.as_ref())
        {
            Some(device_key) => device_key,
            None => {
                recorder.record(Assessment::failed(
                    Category::DeviceAuth,
                    "MSO must contain a device key",
                    "no deviceKey in the MSO",
                ));
                return;
            }
        };

        let Some(transcript) = options.encoded_session_transcript.as_deref() else {
            recorder.record(Assessment::failed(
                Category::DeviceAuth,
                "Session transcript must be provided",
                "no session transcript was supplied",
            ));
            return;
        };

        let device_authentication_bytes = match session::device_authentication_bytes(
            transcript,
            &document.doc_type,
            &device_signed.namespaces,
        ) {
            Ok(bytes) => bytes,
            Err(e) => {
                recorder.record(Assessment::failed(
                    Category::DeviceAuth,
                    "Device authentication payload must be constructible",
                    e.to_string(),
                ));
                return;
            }
        };

        if let Some(signature) = auth.device_signature.as_ref() {
            outcome.device_alg = protected_algorithm(&signature.inner.protected);
            let key = match VerifierKey::try_from(device_key) {
                Ok(key) => key,
                Err(e) => {
                    recorder.record(Assessment::failed(
                        Category::DeviceAuth,
                        "Device signature must be valid",
                        format!("the MSO device key is unusable: {e}"),
                    ));
                    return;
                }
            };
            match signature.verify_with_key(&key, Some(&device_authentication_bytes)) {
                crate::cose::sign1::VerificationResult::Success => {
                    recorder.record(Assessment::passed(
                        Category::DeviceAuth,
                        "Device signature must be valid",
                    ));
                }
                other => {
                    recorder.record(Assessment::failed(
                        Category::DeviceAuth,
                        "Device signature must be valid",
                        other
                            .into_result()
                            .err()
                            .unwrap_or_else(|| "signature is not authentic".to_string()),
                    ));
                }
            }
        } else if let Some(mac) = auth.device_mac.as_ref() {
            outcome.device_alg = mac.algorithm();
            match mac.algorithm() {
                Some(iana::Algorithm::HMAC_256_256) => {}
                other => {
                    recorder.record(Assessment::failed(
                        Category::DeviceAuth,
                        "Device MAC algorithm must be HMAC-256/256",
                        format!("unsupported deviceMac algorithm: {other:?}"),
                    ));
                    return;
                }
            }
            let Some(reader_key) = options.ephemeral_reader_key.as_ref() else {
                recorder.record(Assessment::failed(
                    Category::DeviceAuth,
                    "Ephemeral private key must be present",
                    "Ephemeral private key must be present",
                ));
                return;
            };
            let e_mac_key = session::get_shared_secret(device_key, reader_key)
                .and_then(|shared| session::derive_e_mac_key(&shared, transcript));
            match e_mac_key {
                Ok(key) => match mac.verify_tag(&key, Some(&device_authentication_bytes)) {
                    crate::cose::sign1::VerificationResult::Success => {
                        recorder.record(Assessment::passed(
                            Category::DeviceAuth,
                            "Device MAC must be valid",
                        ));
                    }
                    other => {
                        recorder.record(Assessment::failed(
                            Category::DeviceAuth,
                            "Device MAC must be valid",
                            other
                                .into_result()
                                .err()
                                .unwrap_or_else(|| "tag is not authentic".to_string()),
                        ));
                    }
                },
                Err(e) => {
                    recorder.record(Assessment::failed(
                        Category::DeviceAuth,
                        "Device MAC must be valid",
                        format!("unable to derive the EMacKey: {e}"),
                    ));
                }
            }
        }
    }

    fn data_integrity(
        &self,
        document: &Document,
        recorder: &mut Recorder<'_>,
        outcome: &mut DocumentOutcome,
    ) {
        let Some(mso) = outcome.mso.as_ref() else {
            recorder.record(Assessment::failed(
                Category::DataIntegrity,
                "Issuer item digests must be verifiable",
                "the MSO could not be parsed",
            ));
            return;
        };
        outcome.total_digests = mso.value_digests.values().map(|d| d.len()).sum();

        let digest_algorithm = &mso.digest_algorithm;
        if let DigestAlgorithm::Unsupported(name) = digest_algorithm {
            recorder.record(Assessment::failed(
                Category::DataIntegrity,
                "Digest algorithm must be supported",
                format!("unsupported digest algorithm: {name}"),
            ));
        } else {
            recorder.record(Assessment::passed(
                Category::DataIntegrity,
                "Digest algorithm must be supported",
            ));
        }

        let leaf_cert = outcome
            .leaf
            .as_ref()
            .and_then(|leaf| leaf.certificate().ok());

        let Some(namespaces) = document.issuer_signed.namespaces.as_ref() else {
            return;
        };

        for (namespace, items) in namespaces.as_ref() {
            let namespace_known = mso.value_digests.contains_key(namespace);
            if namespace_known {
                recorder.record(Assessment::passed(
                    Category::DataIntegrity,
                    format!("Namespace '{namespace}' must be present in the MSO"),
                ));
            } else {
                recorder.record(Assessment::failed(
                    Category::DataIntegrity,
                    format!("Namespace '{namespace}' must be present in the MSO"),
                    format!("namespace '{namespace}' has no entry in the MSO value digests"),
                ));
            }

            for item_bytes in items.as_ref() {
                outcome.disclosed_count += 1;
                let item = item_bytes.as_ref();
                let check = format!(
                    "Attribute '{}' must match the MSO digest",
                    item.element_identifier
                );
                let mut is_valid = false;
                if !namespace_known {
                    recorder.record(Assessment::failed(
                        Category::DataIntegrity,
                        check,
                        format!(
                            "namespace '{}' is not covered by the MSO value digests",
                            namespace
                        ),
                    ));
                } else {
                    match digest_algorithm.digest(item_bytes.inner_bytes()) {
                        Ok(digest) => {
                            let committed = mso.committed_digest(namespace, item.digest_id);
                            if committed.map(|c| c.as_ref()) == Some(digest.as_slice()) {
                                is_valid = true;
                                recorder.record(Assessment::passed(
                                    Category::DataIntegrity,
                                    check,
                                ));
                            } else {
                                recorder.record(Assessment::failed(
                                    Category::DataIntegrity,
                                    check,
                                    format!(
                                        "the digest of element '{}' in namespace '{}' does not match the MSO value digest",
                                        item.element_identifier, namespace
                                    ),
                                ));
                            }
                        }
                        Err(e) => {
                            recorder.record(Assessment::failed(
                                Category::DataIntegrity,
                                check,
                                e.to_string(),
                            ));
                        }
                    }
                }

                let mut match_certificate = None;
                if namespace == "org.iso.18013.5.1" {
                    match_certificate = self.check_certificate_coupling(
                        item,
                        leaf_cert.as_ref(),
                        recorder,
                    );
                    if match_certificate == Some(false) {
                        is_valid = false;
                    }
                }

                outcome.attributes.push(AttributeOutcome {
                    namespace: namespace.clone(),
                    id: item.element_identifier.clone(),
                    value: item.element_value.clone(),
                    is_valid,
                    match_certificate,
                });
            }
        }
    }

    /// Cross-check the self-describing elements of the core namespace
    /// against the issuer leaf certificate subject.
    fn check_certificate_coupling(
        &self,
        item: &crate::definitions::IssuerSignedItem,
        leaf: Option<&x509_cert::Certificate>,
        recorder: &mut Recorder<'_>,
    ) -> Option<bool> {
        let element_text = item.element_value.as_text();
        match item.element_identifier.as_str() {
            "issuing_country" => {
                let check = "issuing_country must match the certificate countryName";
                let country = leaf.and_then(trust_anchor::subject_country_name);
                match (element_text, country) {
                    (Some(value), Some(country)) if value == country => {
                        recorder.record(Assessment::passed(Category::DataIntegrity, check));
                        Some(true)
                    }
                    (Some(value), Some(country)) => {
                        recorder.record(Assessment::failed(
                            Category::DataIntegrity,
                            check,
                            format!(
                                "issuing_country '{value}' does not match the issuer certificate countryName '{country}'"
                            ),
                        ));
                        Some(false)
                    }
                    (_, None) => {
                        recorder.record(Assessment::failed(
                            Category::DataIntegrity,
                            check,
                            "the issuer certificate subject carries no countryName".to_string(),
                        ));
                        Some(false)
                    }
                    (None, _) => {
                        recorder.record(Assessment::failed(
                            Category::DataIntegrity,
                            check,
                            "issuing_country is not a text value".to_string(),
                        ));
                        Some(false)
                    }
                }
            }
            "issuing_jurisdiction" => {
                let check = "issuing_jurisdiction must match the certificate stateOrProvinceName";
                let state = leaf.and_then(trust_anchor::subject_state_or_province);
                match (element_text, state) {
                    (Some(value), Some(state)) if value == state => {
                        recorder.record(Assessment::passed(Category::DataIntegrity, check));
                        Some(true)
                    }
                    (Some(value), Some(state)) => {
                        recorder.record(Assessment::failed(
                            Category::DataIntegrity,
                            check,
                            format!(
                                "issuing_jurisdiction '{value}' does not match the issuer certificate stateOrProvinceName '{state}'"
                            ),
                        ));
                        Some(false)
                    }
                    (Some(_), None) => {
                        recorder.record(Assessment::warning(
                            Category::DataIntegrity,
                            check,
                            "the issuer certificate subject carries no stateOrProvinceName",
                        ));
                        None
                    }
                    (None, _) => {
                        recorder.record(Assessment::failed(
                            Category::DataIntegrity,
                            check,
                            "issuing_jurisdiction is not a text value".to_string(),
                        ));
                        Some(false)
                    }
                }
            }
            _ => None,
        }
    }
}

fn extract_x5chain(
    issuer_auth: &MaybeTagged<coset::CoseSign1>,
) -> Result<X5Chain, String> {
    let label = coset::Label::Int(X5CHAIN_HEADER_LABEL);
    let value = issuer_auth
        .inner
        .unprotected
        .rest
        .iter()
        .chain(issuer_auth.inner.protected.header.rest.iter())
        .find(|(l, _)| *l == label)
        .map(|(_, v)| v)
        .ok_or_else(|| "no x5chain header (label 33) in issuerAuth".to_string())?;
    X5Chain::from_cbor(value).map_err(|e| e.to_string())
}

/// Human-readable name for an optional COSE algorithm.
pub(crate) fn optional_algorithm_name(alg: Option<iana::Algorithm>) -> Option<String> {
    alg.map(|alg| algorithm_name(alg).to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn garbage_input_aborts_before_assessments() {
        let verifier = Verifier::with_registry(TrustAnchorRegistry::default());
        let mut sink: Vec<Assessment> = Vec::new();
        let result = verifier.verify_with_sink(
            &[0xff, 0x00, 0x01],
            &VerificationOptions::default(),
            &mut sink,
        );
        assert!(result.is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn map_input_fails_document_format() {
        let verifier = Verifier::with_registry(TrustAnchorRegistry::default());
        // {} is valid CBOR but not a DeviceResponse
        let mut sink: Vec<Assessment> = Vec::new();
        let result = verifier.verify_with_sink(
            &[0xa0],
            &VerificationOptions::default(),
            &mut sink,
        );
        assert!(result.is_err());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].category, Category::DocumentFormat);
        assert_eq!(sink[0].status, Status::Failed);
    }
}
