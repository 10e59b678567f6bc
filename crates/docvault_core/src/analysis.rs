//! crates/docvault_core/src/analysis.rs
//!
//! Runs the analysis capability against a stored document version and records
//! the outcome.

use crate::domain::{AnalysisRecord, DocumentVersion, DocumentVersionId, NewAnalysisRecord};
use crate::ports::{AnalysisService, ContentStore, MetadataStore, PortError, PortResult};
use std::sync::Arc;

#[derive(Clone)]
pub struct AnalysisOrchestrator {
    metadata: Arc<dyn MetadataStore>,
    content: Arc<dyn ContentStore>,
    analyzer: Arc<dyn AnalysisService>,
}

impl AnalysisOrchestrator {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        content: Arc<dyn ContentStore>,
        analyzer: Arc<dyn AnalysisService>,
    ) -> Self {
        Self {
            metadata,
            content,
            analyzer,
        }
    }

    /// Analyzes the content of a document version and persists a completed record.
    ///
    /// Nothing is written unless the lookup, the content read and the analysis
    /// all succeed.
    pub async fn analyze(
        &self,
        document_version_id: DocumentVersionId,
    ) -> PortResult<AnalysisRecord> {
        let document = self.resolve_document(document_version_id).await?;
        let content = self.content.get(&document.content_location).await?;
        let result_text = self
            .analyzer
            .analyze(&content, &document.original_name)
            .await?;

        self.metadata
            .create_analysis(NewAnalysisRecord::completed(document.id, result_text))
            .await
    }

    /// The most recent analysis of a document version.
    pub async fn get_analysis(
        &self,
        document_version_id: DocumentVersionId,
    ) -> PortResult<AnalysisRecord> {
        let document = self.resolve_document(document_version_id).await?;
        self.metadata
            .find_latest_analysis_by_version_id(document.id)
            .await?
            .ok_or_else(|| PortError::analysis_not_found(document_version_id))
    }

    async fn resolve_document(&self, id: DocumentVersionId) -> PortResult<DocumentVersion> {
        self.metadata
            .get_version_by_id(id)
            .await?
            .ok_or_else(|| PortError::document_not_found(id))
    }
}
