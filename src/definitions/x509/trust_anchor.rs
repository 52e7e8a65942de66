//! IACA trust anchors and the certificate-profile checks applied when
//! linking a document-signer chain to one.

use der::asn1::{ObjectIdentifier, PrintableStringRef, TeletexStringRef, Utf8StringRef};
use der::Decode;
use x509_cert::certificate::Certificate;
use x509_cert::ext::pkix::{BasicConstraints, KeyUsage};

use crate::definitions::x509::error::Error as X509Error;
use crate::definitions::x509::x5chain::X509;

// -- DISTINGUISHED NAME OIDs -- //
// C    countryName          2.5.4.6
// ST   stateOrProvinceName  2.5.4.8
const OID_COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const OID_STATE_OR_PROVINCE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");

// -- X509 EXTENSION OIDs -- //
const OID_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");
const OID_BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");

/// The configured IACA roots. Built once, borrowed by every verification.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorRegistry {
    pub certificates: Vec<X509>,
}

impl TrustAnchorRegistry {
    /// Build a registry from DER-encoded root certificates, rejecting any
    /// that do not parse.
    pub fn from_der<T: AsRef<[u8]>>(certs: &[T]) -> Result<TrustAnchorRegistry, X509Error> {
        let certificates = certs
            .iter()
            .map(|der| {
                Certificate::from_der(der.as_ref())?;
                Ok(X509 {
                    bytes: der.as_ref().to_vec(),
                })
            })
            .collect::<Result<Vec<X509>, X509Error>>()?;
        Ok(TrustAnchorRegistry { certificates })
    }

    /// The anchor whose subject matches the issuer of `cert`, if any.
    pub fn find_anchor(&self, cert: &Certificate) -> Option<&X509> {
        self.certificates.iter().find(|anchor| {
            anchor
                .certificate()
                .map(|root| root.tbs_certificate.subject == cert.tbs_certificate.issuer)
                .unwrap_or(false)
        })
    }

    /// Profile checks on an anchor and the leaf it vouches for: the anchor
    /// must be a valid CA certificate authorized to sign certificates, and
    /// the leaf must be authorized to sign documents.
    pub fn validate_anchor_link(
        &self,
        leaf: &X509,
        anchor: &X509,
        now_secs: i64,
    ) -> Vec<X509Error> {
        let mut errors: Vec<X509Error> = vec![];

        match anchor.certificate() {
            Ok(root) => {
                if let Err(e) = check_validity_period(&root, now_secs) {
                    errors.push(e);
                }
                match extension::<BasicConstraints>(&root, OID_BASIC_CONSTRAINTS) {
                    Ok(Some(bc)) if bc.ca => {}
                    Ok(_) => errors.push(X509Error::ValidationError(
                        "trust anchor is not a CA certificate".to_string(),
                    )),
                    Err(e) => errors.push(e),
                }
                match extension::<KeyUsage>(&root, OID_KEY_USAGE) {
                    Ok(Some(ku)) if ku.key_cert_sign() => {}
                    Ok(_) => errors.push(X509Error::ValidationError(
                        "trust anchor key usage does not include keyCertSign".to_string(),
                    )),
                    Err(e) => errors.push(e),
                }
            }
            Err(e) => errors.push(e),
        }

        match leaf.certificate() {
            Ok(leaf) => match extension::<KeyUsage>(&leaf, OID_KEY_USAGE) {
                Ok(Some(ku)) if ku.digital_signature() => {}
                Ok(_) => errors.push(X509Error::ValidationError(
                    "signer key usage does not include digitalSignature".to_string(),
                )),
                Err(e) => errors.push(e),
            },
            Err(e) => errors.push(e),
        }

        errors
    }
}

/// `notBefore <= now <= notAfter`.
pub fn check_validity_period(certificate: &Certificate, now_secs: i64) -> Result<(), X509Error> {
    let validity = certificate.tbs_certificate.validity;
    if (validity.not_after.to_unix_duration().as_secs() as i64) < now_secs {
        return Err(X509Error::CertificateExpired(format!(
            "expired certificate with subject: {}",
            certificate.tbs_certificate.subject
        )));
    };
    if (validity.not_before.to_unix_duration().as_secs() as i64) > now_secs {
        return Err(X509Error::CertificateExpired(format!(
            "not yet valid certificate with subject: {}",
            certificate.tbs_certificate.subject
        )));
    };
    Ok(())
}

/// The subject `countryName` (C) attribute.
pub fn subject_country_name(cert: &Certificate) -> Option<String> {
    subject_attribute(cert, OID_COUNTRY_NAME)
}

/// The subject `stateOrProvinceName` (ST) attribute.
pub fn subject_state_or_province(cert: &Certificate) -> Option<String> {
    subject_attribute(cert, OID_STATE_OR_PROVINCE)
}

// A dedicated RDN walk; matching on the formatted subject string would
// confuse escaping with content.
fn subject_attribute(cert: &Certificate, oid: ObjectIdentifier) -> Option<String> {
    cert.tbs_certificate
        .subject
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == oid)
        .and_then(|atv| {
            let any = &atv.value;
            any.decode_as::<PrintableStringRef>()
                .map(|s| s.to_string())
                .or_else(|_| any.decode_as::<Utf8StringRef>().map(|s| s.to_string()))
                .or_else(|_| any.decode_as::<TeletexStringRef>().map(|s| s.to_string()))
                .ok()
        })
}

fn extension<T: for<'a> Decode<'a>>(
    cert: &Certificate,
    oid: ObjectIdentifier,
) -> Result<Option<T>, X509Error> {
    let Some(extensions) = cert.tbs_certificate.extensions.as_ref() else {
        return Ok(None);
    };
    extensions
        .iter()
        .find(|ext| ext.extn_id == oid)
        .map(|ext| T::from_der(ext.extn_value.as_bytes()).map_err(X509Error::from))
        .transpose()
}
