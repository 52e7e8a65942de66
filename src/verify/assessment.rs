//! One verification result row per performed check.

use serde::{Deserialize, Serialize};

/// Verdict of a single check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Passed,
    Failed,
    Warning,
}

/// The verification stage a check belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    DocumentFormat,
    IssuerAuth,
    DeviceAuth,
    DataIntegrity,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assessment {
    pub status: Status,
    pub category: Category,
    pub check: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Assessment {
    pub fn passed(category: Category, check: impl Into<String>) -> Self {
        Assessment {
            status: Status::Passed,
            category,
            check: check.into(),
            reason: None,
        }
    }

    pub fn failed(
        category: Category,
        check: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Assessment {
            status: Status::Failed,
            category,
            check: check.into(),
            reason: Some(reason.into()),
        }
    }

    pub fn warning(
        category: Category,
        check: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Assessment {
            status: Status::Warning,
            category,
            check: check.into(),
            reason: Some(reason.into()),
        }
    }

    /// The text surfaced when this assessment is converted into an error.
    pub fn message(&self) -> &str {
        self.reason.as_deref().unwrap_or(&self.check)
    }
}

/// Streaming consumer of assessments.
///
/// The default behaviour of [`Verifier::verify`][crate::verify::Verifier::verify]
/// is fail-fast: the first FAILED assessment becomes an error. Callers that
/// want the complete picture install a sink and inspect everything recorded.
pub trait AssessmentSink {
    fn record(&mut self, assessment: &Assessment);
}

impl AssessmentSink for Vec<Assessment> {
    fn record(&mut self, assessment: &Assessment) {
        self.push(assessment.clone())
    }
}

/// Collects every assessment of a run, optionally forwarding each one to a
/// caller-supplied sink as it is produced.
pub(crate) struct Recorder<'a> {
    assessments: Vec<Assessment>,
    sink: Option<&'a mut dyn AssessmentSink>,
}

impl<'a> Recorder<'a> {
    pub fn new(sink: Option<&'a mut dyn AssessmentSink>) -> Self {
        Recorder {
            assessments: Vec::new(),
            sink,
        }
    }

    pub fn record(&mut self, assessment: Assessment) {
        match assessment.status {
            Status::Failed => {
                tracing::warn!(
                    category = ?assessment.category,
                    check = %assessment.check,
                    reason = assessment.reason.as_deref().unwrap_or(""),
                    "check failed"
                )
            }
            _ => tracing::debug!(
                category = ?assessment.category,
                check = %assessment.check,
                status = ?assessment.status,
                "check recorded"
            ),
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.record(&assessment);
        }
        self.assessments.push(assessment);
    }

    pub fn first_failed(&self) -> Option<&Assessment> {
        self.assessments
            .iter()
            .find(|a| a.status == Status::Failed)
    }

    pub fn into_assessments(self) -> Vec<Assessment> {
        self.assessments
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn serialized_forms_match_the_wire_vocabulary() {
        let assessment = Assessment::failed(
            Category::DataIntegrity,
            "Attribute 'age_over_21' must match the MSO digest",
            "digest mismatch",
        );
        let json = serde_json::to_value(&assessment).unwrap();
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["category"], "DATA_INTEGRITY");
    }

    #[test]
    fn message_prefers_reason() {
        let failed = Assessment::failed(Category::IssuerAuth, "check", "reason");
        assert_eq!(failed.message(), "reason");
        let passed = Assessment::passed(Category::IssuerAuth, "check");
        assert_eq!(passed.message(), "check");
    }
}
