//! End-to-end verification scenarios over static fixtures: a P-256 issuer
//! signing an MSO for a P-256 device key, chained to a test IACA root.

use chrono::{TimeZone, Utc};

use mdl_verifier::verify::{Assessment, Category, Status};
use mdl_verifier::{EphemeralReaderKey, VerificationOptions, Verifier};

static DEVICE_RESPONSE: &str = include_str!("../test/verification/device_response.cbor");
static DEVICE_RESPONSE_TAMPERED: &str =
    include_str!("../test/verification/device_response_tampered.cbor");
static DEVICE_RESPONSE_EXPIRED: &str =
    include_str!("../test/verification/device_response_expired.cbor");
static DEVICE_RESPONSE_MAC: &str = include_str!("../test/verification/device_response_mac.cbor");
static DEVICE_RESPONSE_COUNTRY_MISMATCH: &str =
    include_str!("../test/verification/device_response_country_mismatch.cbor");
static SESSION_TRANSCRIPT: &str = include_str!("../test/verification/session_transcript.cbor");
static READER_EPHEMERAL_KEY: &str =
    include_str!("../test/verification/reader_ephemeral_key.pkcs8");
static IACA_ROOT: &[u8] = include_bytes!("../test/x509/iaca_root_cert.pem");

fn fixture(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str.trim()).expect("fixture is not valid hex")
}

fn verifier() -> Verifier {
    let root = pem_rfc7468::decode_vec(IACA_ROOT)
        .expect("unable to parse root pem")
        .1;
    Verifier::new(&[root]).expect("unable to construct verifier")
}

fn options() -> VerificationOptions {
    VerificationOptions {
        encoded_session_transcript: Some(fixture(SESSION_TRANSCRIPT)),
        ephemeral_reader_key: None,
        disable_certificate_chain_validation: false,
        at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
    }
}

fn collect(response: &[u8], options: &VerificationOptions) -> Vec<Assessment> {
    let mut assessments: Vec<Assessment> = Vec::new();
    verifier()
        .verify_with_sink(response, options, &mut assessments)
        .expect("response should decode");
    assessments
}

fn failed_in(assessments: &[Assessment], category: Category) -> Vec<&Assessment> {
    assessments
        .iter()
        .filter(|a| a.category == category && a.status == Status::Failed)
        .collect()
}

#[test]
fn valid_mdl_passes_every_check() {
    let assessments = collect(&fixture(DEVICE_RESPONSE), &options());
    let failed: Vec<_> = assessments
        .iter()
        .filter(|a| a.status == Status::Failed)
        .collect();
    assert!(failed.is_empty(), "unexpected failures: {failed:?}");
    // every category was exercised
    for category in [
        Category::DocumentFormat,
        Category::IssuerAuth,
        Category::DeviceAuth,
        Category::DataIntegrity,
    ] {
        assert!(
            assessments.iter().any(|a| a.category == category),
            "no assessments in {category:?}"
        );
    }
    // fail-fast mode agrees
    verifier()
        .verify(&fixture(DEVICE_RESPONSE), &options())
        .expect("fail-fast verification should succeed");
}

#[test]
fn valid_mdl_report_is_all_green() {
    let report = verifier()
        .diagnose(&fixture(DEVICE_RESPONSE), &options())
        .expect("diagnose should succeed");

    assert_eq!(report.document_type.as_deref(), Some("org.iso.18013.5.1.mDL"));
    assert_eq!(report.issuer_signature.alg.as_deref(), Some("ES256"));
    assert!(report.issuer_signature.is_valid);
    assert!(report.issuer_signature.reasons.is_empty());
    assert_eq!(
        report.issuer_signature.digests.get("org.iso.18013.5.1"),
        Some(&10)
    );

    let device = report.device_signature.expect("device signature section");
    assert_eq!(device.alg.as_deref(), Some("ES256"));
    assert!(device.is_valid);

    assert!(report.data_integrity.is_valid);
    assert_eq!(report.data_integrity.disclosed_attributes, "10 of 10");

    let age_over_21 = report
        .attributes
        .iter()
        .find(|a| a.id == "age_over_21")
        .expect("age_over_21 attribute");
    assert_eq!(age_over_21.value, serde_json::json!(true));
    assert!(age_over_21.is_valid);

    let issuing_country = report
        .attributes
        .iter()
        .find(|a| a.id == "issuing_country")
        .expect("issuing_country attribute");
    assert_eq!(issuing_country.match_certificate, Some(true));

    let cert = report.issuer_certificate.expect("issuer certificate");
    assert!(cert.subject_name.contains("Test Document Signer"));
    assert!(cert.pem.unwrap().starts_with("-----BEGIN CERTIFICATE-----"));
    assert_eq!(cert.thumbprint.len(), 64);

    let device_key = report.device_key.expect("device key");
    assert_eq!(device_key.jwk["kty"], "EC");
    assert_eq!(device_key.jwk["crv"], "P-256");
}

#[test]
fn tampered_attribute_fails_data_integrity_only() {
    let assessments = collect(&fixture(DEVICE_RESPONSE_TAMPERED), &options());

    assert!(failed_in(&assessments, Category::IssuerAuth).is_empty());
    assert!(failed_in(&assessments, Category::DeviceAuth).is_empty());
    let failed = failed_in(&assessments, Category::DataIntegrity);
    assert!(!failed.is_empty());
    assert!(
        failed
            .iter()
            .any(|a| a.check.contains("age_over_21") || a.message().contains("age_over_21")),
        "failure should name age_over_21: {failed:?}"
    );
}

#[test]
fn expired_mso_fails_issuer_auth() {
    let assessments = collect(&fixture(DEVICE_RESPONSE_EXPIRED), &options());
    let failed = failed_in(&assessments, Category::IssuerAuth);
    assert!(
        failed
            .iter()
            .any(|a| a.check == "MSO must be valid at the time of verification"),
        "expected MSO validity failure: {failed:?}"
    );
    // the issuer signature itself is still good
    assert!(assessments
        .iter()
        .any(|a| a.check == "Issuer signature must be valid" && a.status == Status::Passed));

    assert!(verifier()
        .verify(&fixture(DEVICE_RESPONSE_EXPIRED), &options())
        .is_err());
}

#[test]
fn mac_proof_passes_with_ephemeral_key() {
    let mut opts = options();
    opts.ephemeral_reader_key = Some(EphemeralReaderKey::Pkcs8(fixture(READER_EPHEMERAL_KEY)));
    let assessments = collect(&fixture(DEVICE_RESPONSE_MAC), &opts);
    let failed: Vec<_> = assessments
        .iter()
        .filter(|a| a.status == Status::Failed)
        .collect();
    assert!(failed.is_empty(), "unexpected failures: {failed:?}");
    assert!(assessments
        .iter()
        .any(|a| a.check == "Device MAC must be valid" && a.status == Status::Passed));
}

#[test]
fn mac_proof_without_ephemeral_key_fails() {
    let assessments = collect(&fixture(DEVICE_RESPONSE_MAC), &options());
    let failed = failed_in(&assessments, Category::DeviceAuth);
    assert!(
        failed
            .iter()
            .any(|a| a.message() == "Ephemeral private key must be present"),
        "expected missing ephemeral key failure: {failed:?}"
    );

    let error = verifier()
        .verify(&fixture(DEVICE_RESPONSE_MAC), &options())
        .expect_err("fail-fast verification should fail");
    assert_eq!(error.to_string(), "Ephemeral private key must be present");
}

#[test]
fn country_mismatch_fails_data_integrity() {
    let assessments = collect(&fixture(DEVICE_RESPONSE_COUNTRY_MISMATCH), &options());
    let failed = failed_in(&assessments, Category::DataIntegrity);
    let coupling = failed
        .iter()
        .find(|a| a.check.contains("issuing_country"))
        .expect("issuing_country failure");
    let reason = coupling.message();
    assert!(
        reason.contains("DE") && reason.contains("US"),
        "reason should pair the two values: {reason}"
    );
}

#[test]
fn missing_session_transcript_fails_device_auth() {
    let mut opts = options();
    opts.encoded_session_transcript = None;
    let assessments = collect(&fixture(DEVICE_RESPONSE), &opts);
    let failed = failed_in(&assessments, Category::DeviceAuth);
    assert!(
        failed
            .iter()
            .any(|a| a.check == "Session transcript must be provided"),
        "expected transcript failure: {failed:?}"
    );
}

#[test]
fn chain_validation_can_be_disabled() {
    // an empty trust anchor registry would normally fail the chain check
    let verifier = Verifier::new::<Vec<u8>>(&[]).unwrap();
    let mut opts = options();
    opts.disable_certificate_chain_validation = true;
    let mut assessments: Vec<Assessment> = Vec::new();
    verifier
        .verify_with_sink(&fixture(DEVICE_RESPONSE), &opts, &mut assessments)
        .unwrap();
    let failed: Vec<_> = assessments
        .iter()
        .filter(|a| a.status == Status::Failed)
        .collect();
    assert!(failed.is_empty(), "unexpected failures: {failed:?}");
    // the signature check still ran
    assert!(assessments
        .iter()
        .any(|a| a.check == "Issuer signature must be valid" && a.status == Status::Passed));
    // but the chain check did not
    assert!(!assessments
        .iter()
        .any(|a| a.check == "Issuer certificate must be trusted"));
}

#[test]
fn untrusted_root_fails_issuer_auth() {
    let verifier = Verifier::new::<Vec<u8>>(&[]).unwrap();
    let mut assessments: Vec<Assessment> = Vec::new();
    verifier
        .verify_with_sink(&fixture(DEVICE_RESPONSE), &options(), &mut assessments)
        .unwrap();
    let failed = failed_in(&assessments, Category::IssuerAuth);
    assert!(
        failed
            .iter()
            .any(|a| a.check == "Issuer certificate must be trusted"),
        "expected chain failure: {failed:?}"
    );
}

#[test]
fn decoded_response_reencodes_bit_exactly() {
    let bytes = fixture(DEVICE_RESPONSE);
    let response = verifier()
        .verify(&bytes, &options())
        .expect("verification should succeed");
    let reencoded = mdl_verifier::cbor::to_vec(&response).unwrap();
    assert_eq!(bytes, reencoded, "round trip is not bit-exact");
}

#[test]
fn exactly_one_assessment_per_check() {
    let assessments = collect(&fixture(DEVICE_RESPONSE), &options());
    let mut checks: Vec<&str> = assessments.iter().map(|a| a.check.as_str()).collect();
    checks.sort();
    let before = checks.len();
    checks.dedup();
    assert_eq!(before, checks.len(), "duplicate assessments were emitted");
}
