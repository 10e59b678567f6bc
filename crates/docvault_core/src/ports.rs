//! crates/docvault_core/src/ports.rs
//!
//! Defines the service contracts (traits) consumed by the orchestrators.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database, object storage, or model provider.

use crate::domain::{
    AnalysisRecord, DocumentVersion, DocumentVersionId, NewAnalysisRecord, NewDocumentVersion,
};
use async_trait::async_trait;
use std::fmt;

//=========================================================================================
// Port Error and Result Types
//=========================================================================================

/// The kind of record a `PortError::NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Document,
    Analysis,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Document => f.write_str("document"),
            ResourceKind::Analysis => f.write_str("analysis"),
        }
    }
}

/// The error type shared by all port operations and both orchestrators.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The requested document or analysis does not exist. `id` is the document
    /// version identifier the caller asked about.
    #[error("{kind} not found for document id {id}")]
    NotFound {
        kind: ResourceKind,
        id: DocumentVersionId,
    },

    /// The content store failed to put or get bytes.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The analysis capability failed for any reason.
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// The metadata store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The metadata store rejected a version number already taken for this name.
    /// This is a persistence failure that can be resolved by recomputing the version.
    #[error("Persistence error: version {version} of '{original_name}' already exists")]
    VersionConflict { original_name: String, version: i32 },
}

impl PortError {
    pub fn document_not_found(id: DocumentVersionId) -> Self {
        PortError::NotFound {
            kind: ResourceKind::Document,
            id,
        }
    }

    pub fn analysis_not_found(id: DocumentVersionId) -> Self {
        PortError::NotFound {
            kind: ResourceKind::Analysis,
            id,
        }
    }

    /// True for failures of the metadata store, including version conflicts.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            PortError::Persistence(_) | PortError::VersionConflict { .. }
        )
    }

    /// True when retrying the whole operation can succeed without outside help.
    pub fn is_retriable(&self) -> bool {
        matches!(self, PortError::VersionConflict { .. })
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable record of document versions and analysis records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // --- Document Versions ---

    /// Persists a new version, assigning its identifier (and `uploaded_at` when absent).
    ///
    /// Fails with `PortError::VersionConflict` if `(original_name, version)` is taken.
    async fn create_version(&self, record: NewDocumentVersion) -> PortResult<DocumentVersion>;

    async fn get_version_by_id(&self, id: DocumentVersionId)
        -> PortResult<Option<DocumentVersion>>;

    /// The record with the highest version for `name`.
    async fn find_latest_version_by_name(&self, name: &str) -> PortResult<Option<DocumentVersion>>;

    /// Exactly one record per distinct name, each the highest version for that name.
    /// Order is unspecified.
    async fn list_latest_versions(&self) -> PortResult<Vec<DocumentVersion>>;

    // --- Analysis Records ---

    async fn create_analysis(&self, record: NewAnalysisRecord) -> PortResult<AnalysisRecord>;

    /// The most recently created analysis for a document version.
    async fn find_latest_analysis_by_version_id(
        &self,
        id: DocumentVersionId,
    ) -> PortResult<Option<AnalysisRecord>>;
}

/// Opaque blob storage addressed by the location tokens it issues.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Stores `content` under a freshly generated key and returns its location token.
    async fn put(&self, display_name: &str, content: &[u8]) -> PortResult<String>;

    /// Returns exactly the bytes previously stored under `location`.
    async fn get(&self, location: &str) -> PortResult<Vec<u8>>;
}

/// Produces a text analysis of a document's content.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, content: &[u8], display_name: &str) -> PortResult<String>;
}
