//! crates/docvault_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Identifier of a persisted `DocumentVersion`, assigned by the metadata store.
pub type DocumentVersionId = i64;

/// Identifier of a persisted `AnalysisRecord`, assigned by the metadata store.
pub type AnalysisId = i64;

/// Identifier of the actor who uploaded a document.
pub type ActorId = i64;

/// One immutable upload of a logical document name.
///
/// Every record sharing an `original_name` carries a distinct `version`, and the
/// versions of one name always form the gap-free sequence `1..=k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentVersion {
    pub id: DocumentVersionId,
    pub original_name: String,
    /// Opaque token issued by the content store for this version's bytes.
    pub content_location: String,
    pub version: i32,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: ActorId,
}

/// A document version that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocumentVersion {
    pub original_name: String,
    pub content_location: String,
    pub version: i32,
    pub size_bytes: i64,
    /// Filled in by the store when absent.
    pub uploaded_at: Option<DateTime<Utc>>,
    pub uploaded_by: ActorId,
}

impl NewDocumentVersion {
    /// Attaches the store-assigned identifier, defaulting `uploaded_at` to `now`.
    pub fn into_persisted(self, id: DocumentVersionId, now: DateTime<Utc>) -> DocumentVersion {
        DocumentVersion {
            id,
            original_name: self.original_name,
            content_location: self.content_location,
            version: self.version,
            size_bytes: self.size_bytes,
            uploaded_at: self.uploaded_at.unwrap_or(now),
            uploaded_by: self.uploaded_by,
        }
    }
}

/// Lifecycle state of an analysis attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStatus {
    Pending,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown analysis status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for AnalysisStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// The immutable outcome of analyzing one document version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRecord {
    pub id: AnalysisId,
    pub document_version_id: DocumentVersionId,
    pub status: AnalysisStatus,
    /// Present when `status` is `Completed`.
    pub result_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An analysis record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnalysisRecord {
    pub document_version_id: DocumentVersionId,
    pub status: AnalysisStatus,
    pub result_text: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewAnalysisRecord {
    /// A successful analysis carrying the capability's text.
    pub fn completed(document_version_id: DocumentVersionId, result_text: String) -> Self {
        Self {
            document_version_id,
            status: AnalysisStatus::Completed,
            result_text: Some(result_text),
            created_at: Some(Utc::now()),
        }
    }

    pub fn into_persisted(self, id: AnalysisId, now: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord {
            id,
            document_version_id: self.document_version_id,
            status: self.status,
            result_text: self.result_text,
            created_at: self.created_at.unwrap_or(now),
        }
    }
}

/// Returns the extension of a display name (the text after the last `.`), if any.
///
/// `"report.v2.PDF"` yields `Some("PDF")`; `"README"` and `"archive."` yield `None`.
pub fn file_extension(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_forms_parse_back() {
        for status in [
            AnalysisStatus::Pending,
            AnalysisStatus::Completed,
            AnalysisStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<AnalysisStatus>().unwrap(), status);
        }
        assert!("done".parse::<AnalysisStatus>().is_err());
    }

    #[test]
    fn extension_is_taken_after_last_dot() {
        assert_eq!(file_extension("report.v2.PDF"), Some("PDF"));
        assert_eq!(file_extension("notes.txt"), Some("txt"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("archive."), None);
    }

    #[test]
    fn store_assigns_timestamp_only_when_absent() {
        let fixed = Utc::now() - chrono::Duration::days(1);
        let now = Utc::now();
        let new = NewDocumentVersion {
            original_name: "a.txt".into(),
            content_location: "documents/x".into(),
            version: 1,
            size_bytes: 0,
            uploaded_at: Some(fixed),
            uploaded_by: 1,
        };
        assert_eq!(new.clone().into_persisted(7, now).uploaded_at, fixed);

        let unset = NewDocumentVersion { uploaded_at: None, ..new };
        let persisted = unset.into_persisted(7, now);
        assert_eq!(persisted.uploaded_at, now);
        assert_eq!(persisted.id, 7);
    }
}
