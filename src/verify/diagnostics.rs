//! Aggregation of a verification run into a structured, serialisable report.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use ssi_jwk::JWK;

use crate::definitions::device_key::CoseKey;
use crate::verify::{
    optional_algorithm_name, Assessment, AttributeOutcome, Category, DocumentOutcome, Status,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    pub issuer_signature: IssuerSignatureReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_signature: Option<DeviceSignatureReport>,
    pub data_integrity: DataIntegrityReport,
    pub attributes: Vec<AttributeReport>,
    pub device_attributes: Vec<DeviceAttributeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_certificate: Option<CertificateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_key: Option<DeviceKeyReport>,
    /// Every assessment of the run, in category-grouped order of emission.
    pub assessments: Vec<Assessment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSignatureReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    pub is_valid: bool,
    pub reasons: Vec<String>,
    /// Per-namespace count of digests committed in the MSO.
    pub digests: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSignatureReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    pub is_valid: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIntegrityReport {
    /// `"k of n"`: disclosed attributes against digests committed in the MSO.
    pub disclosed_attributes: String,
    pub is_valid: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeReport {
    pub ns: String,
    pub id: String,
    pub value: serde_json::Value,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_certificate: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAttributeReport {
    pub ns: String,
    pub id: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateReport {
    pub subject_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
    pub serial_number: String,
    pub thumbprint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceKeyReport {
    pub jwk: serde_json::Value,
}

pub(crate) fn build_report(
    assessments: Vec<Assessment>,
    outcomes: Vec<DocumentOutcome>,
) -> Report {
    let primary = outcomes.into_iter().next();

    let category_valid = |category: Category| {
        !assessments
            .iter()
            .any(|a| a.category == category && a.status == Status::Failed)
    };
    let category_reasons = |category: Category| {
        assessments
            .iter()
            .filter(|a| a.category == category && a.status == Status::Failed)
            .filter_map(|a| a.reason.clone())
            .collect::<Vec<_>>()
    };

    let issuer_signature = IssuerSignatureReport {
        alg: primary
            .as_ref()
            .and_then(|o| optional_algorithm_name(o.issuer_alg)),
        is_valid: category_valid(Category::IssuerAuth),
        reasons: category_reasons(Category::IssuerAuth),
        digests: primary
            .as_ref()
            .and_then(|o| o.mso.as_ref())
            .map(|mso| {
                mso.value_digests
                    .iter()
                    .map(|(ns, digests)| (ns.clone(), digests.len()))
                    .collect()
            })
            .unwrap_or_default(),
    };

    let device_signature = primary
        .as_ref()
        .filter(|o| o.has_device_signed)
        .map(|o| DeviceSignatureReport {
            alg: optional_algorithm_name(o.device_alg),
            is_valid: category_valid(Category::DeviceAuth),
            reasons: category_reasons(Category::DeviceAuth),
        });

    let data_integrity = DataIntegrityReport {
        disclosed_attributes: primary
            .as_ref()
            .map(|o| format!("{} of {}", o.disclosed_count, o.total_digests))
            .unwrap_or_else(|| "0 of 0".to_string()),
        is_valid: category_valid(Category::DataIntegrity),
        reasons: category_reasons(Category::DataIntegrity),
    };

    let attributes = primary
        .as_ref()
        .map(|o| o.attributes.iter().map(attribute_report).collect())
        .unwrap_or_default();

    let device_attributes = primary
        .as_ref()
        .map(|o| {
            o.device_attributes
                .iter()
                .map(|(ns, id, value)| DeviceAttributeReport {
                    ns: ns.clone(),
                    id: id.clone(),
                    value: cbor_to_json(value.as_ref()),
                })
                .collect()
        })
        .unwrap_or_default();

    let issuer_certificate = primary
        .as_ref()
        .and_then(|o| o.leaf.as_ref())
        .and_then(|leaf| certificate_report(&leaf.bytes).ok());

    let device_key = primary
        .as_ref()
        .and_then(|o| o.mso.as_ref())
        .and_then(|mso| mso.device_key_info.device_key.clone())
        .and_then(device_key_report);

    Report {
        document_type: primary.map(|o| o.doc_type),
        issuer_signature,
        device_signature,
        data_integrity,
        attributes,
        device_attributes,
        issuer_certificate,
        device_key,
        assessments,
    }
}

fn attribute_report(outcome: &AttributeOutcome) -> AttributeReport {
    AttributeReport {
        ns: outcome.namespace.clone(),
        id: outcome.id.clone(),
        value: cbor_to_json(outcome.value.as_ref()),
        is_valid: outcome.is_valid,
        match_certificate: outcome.match_certificate,
    }
}

fn certificate_report(der: &[u8]) -> Result<CertificateReport, crate::definitions::x509::error::Error> {
    use x509_cert::der::Decode;
    let cert = x509_cert::Certificate::from_der(der)?;
    let validity = cert.tbs_certificate.validity;
    Ok(CertificateReport {
        subject_name: cert.tbs_certificate.subject.to_string(),
        pem: pem_rfc7468::encode_string("CERTIFICATE", pem_rfc7468::LineEnding::LF, der).ok(),
        not_before: unix_to_rfc3339(validity.not_before.to_unix_duration().as_secs() as i64),
        not_after: unix_to_rfc3339(validity.not_after.to_unix_duration().as_secs() as i64),
        serial_number: hex::encode(cert.tbs_certificate.serial_number.as_bytes()),
        thumbprint: hex::encode(Sha256::digest(der)),
    })
}

fn unix_to_rfc3339(secs: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

fn device_key_report(key: CoseKey) -> Option<DeviceKeyReport> {
    let jwk: JWK = key.try_into().ok()?;
    serde_json::to_value(&jwk)
        .ok()
        .map(|jwk| DeviceKeyReport { jwk })
}

/// Render a disclosed CBOR value for the JSON report.
pub(crate) fn cbor_to_json(value: &ciborium::Value) -> serde_json::Value {
    match value {
        ciborium::Value::Null => serde_json::Value::Null,
        ciborium::Value::Bool(b) => serde_json::Value::Bool(*b),
        ciborium::Value::Text(s) => serde_json::Value::String(s.clone()),
        ciborium::Value::Integer(i) => {
            let i: i128 = (*i).into();
            serde_json::Number::from_i128(i)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        }
        ciborium::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ciborium::Value::Bytes(b) => serde_json::Value::String(hex::encode(b)),
        ciborium::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(cbor_to_json).collect())
        }
        ciborium::Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .filter_map(|(k, v)| {
                    k.as_text().map(|k| (k.to_string(), cbor_to_json(v)))
                })
                .collect(),
        ),
        // tag 0 date-times and tag 1004 full-dates render as their text form
        ciborium::Value::Tag(_, inner) => cbor_to_json(inner),
        _ => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dates_and_bytes_render_as_strings() {
        let date = ciborium::Value::Tag(
            1004,
            Box::new(ciborium::Value::Text("2024-03-31".to_string())),
        );
        assert_eq!(cbor_to_json(&date), serde_json::json!("2024-03-31"));

        let bytes = ciborium::Value::Bytes(vec![0xde, 0xad]);
        assert_eq!(cbor_to_json(&bytes), serde_json::json!("dead"));
    }

    #[test]
    fn empty_run_produces_an_invalid_report() {
        let assessments = vec![Assessment::failed(
            Category::DocumentFormat,
            "DeviceResponse must contain at least one document",
            "no documents in DeviceResponse",
        )];
        let report = build_report(assessments, Vec::new());
        assert!(report.issuer_signature.is_valid);
        assert!(report.device_signature.is_none());
        assert_eq!(report.data_integrity.disclosed_attributes, "0 of 0");
    }
}
