//! Inbound export job payload and its validation.
//!
//! The dispatcher posts a loosely-typed JSON body. [`ExportRequest`] mirrors
//! that body field-for-field (every field optional) and
//! [`ExportRequest::validate`] turns it into an immutable [`ExportJob`] or a
//! [`ValidationError`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::naming::{adr_file_path, branch_name};
use crate::types::ReviewRequestDraft;

/// Raw job payload as received from the background dispatcher.
///
/// Accepts both the current field names and the names used by older
/// outbox rows (`adr_id`, `markdown`). When a body carries both, the current
/// name wins unless it is empty. Ids may arrive as JSON numbers and are kept
/// in their decimal text form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default, deserialize_with = "string_or_number")]
    pub record_id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub adr_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub document_body: Option<String>,
    #[serde(default)]
    pub markdown: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}

/// Reasons an inbound job is rejected before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON: {0}")]
    Malformed(String),
    #[error("missing or empty {field}")]
    MissingField { field: &'static str },
}

impl ExportRequest {
    /// Parses a raw request body.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Malformed`] if the body is not a JSON object
    /// with string-or-null fields (ids may also be numbers).
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Checks required fields and applies the title default.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] when `record_id` or
    /// `document_body` is absent or empty.
    pub fn validate(self) -> Result<ExportJob, ValidationError> {
        let record_id = non_empty(self.record_id)
            .or_else(|| non_empty(self.adr_id))
            .ok_or(ValidationError::MissingField { field: "record_id" })?;
        let document_body = non_empty(self.document_body)
            .or_else(|| non_empty(self.markdown))
            .ok_or(
            ValidationError::MissingField {
                field: "document_body",
            },
        )?;
        let title = non_empty(self.title).unwrap_or_else(|| record_id.clone());

        Ok(ExportJob {
            record_id,
            title,
            document_body,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// One accepted request to export a single record as a document.
///
/// Fields are private so a job can only be built through validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportJob {
    record_id: String,
    title: String,
    document_body: String,
}

impl ExportJob {
    /// Builds a job directly, applying the same rules as [`ExportRequest::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] for an empty id or body.
    pub fn new(
        record_id: impl Into<String>,
        title: Option<String>,
        document_body: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        ExportRequest {
            record_id: Some(record_id.into()),
            title,
            document_body: Some(document_body.into()),
            ..ExportRequest::default()
        }
        .validate()
    }

    #[must_use]
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn document_body(&self) -> &str {
        &self.document_body
    }

    /// Export branch for this job on the given UTC day.
    #[must_use]
    pub fn branch_name(&self, date: chrono::NaiveDate) -> String {
        branch_name(&self.title, date)
    }

    /// Repository path the document is written to.
    #[must_use]
    pub fn file_path(&self) -> String {
        adr_file_path(&self.record_id)
    }

    /// Commit message used for the file write.
    #[must_use]
    pub fn commit_message(&self) -> String {
        format!("Add {}: {}", self.record_id, self.title)
    }

    /// Pull request opened from `head` into `base` for this job.
    #[must_use]
    pub fn review_request(&self, head: &str, base: &str) -> ReviewRequestDraft {
        ReviewRequestDraft {
            title: format!("{}: {}", self.record_id, self.title),
            head: head.to_string(),
            base: base.to_string(),
            body: format!(
                "## Architectural Decision Record\n\n**{}**: {}\n\nExported from Slack ADR Bot.",
                self.record_id, self.title
            ),
        }
    }
}
