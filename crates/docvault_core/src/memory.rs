//! crates/docvault_core/src/memory.rs
//!
//! In-process implementations of the `MetadataStore` and `ContentStore` ports.
//! They enforce the same contracts as the durable adapters, including the
//! `(original_name, version)` uniqueness rule, and back development runs and tests.

use crate::domain::{
    AnalysisRecord, DocumentVersion, DocumentVersionId, NewAnalysisRecord, NewDocumentVersion,
};
use crate::ports::{ContentStore, MetadataStore, PortError, PortResult};
use crate::versioning::latest_per_name;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

//=========================================================================================
// Metadata
//=========================================================================================

#[derive(Default)]
struct MetadataTables {
    versions: Vec<DocumentVersion>,
    analyses: Vec<AnalysisRecord>,
}

/// A `MetadataStore` held in memory. Identifiers start at 1 and are never reused.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    tables: Mutex<MetadataTables>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> PortResult<MutexGuard<'_, MetadataTables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Persistence("metadata store lock poisoned".to_string()))
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create_version(&self, record: NewDocumentVersion) -> PortResult<DocumentVersion> {
        let mut tables = self.tables()?;
        let taken = tables
            .versions
            .iter()
            .any(|v| v.original_name == record.original_name && v.version == record.version);
        if taken {
            return Err(PortError::VersionConflict {
                original_name: record.original_name,
                version: record.version,
            });
        }

        let id = tables.versions.len() as DocumentVersionId + 1;
        let created = record.into_persisted(id, Utc::now());
        tables.versions.push(created.clone());
        Ok(created)
    }

    async fn get_version_by_id(
        &self,
        id: DocumentVersionId,
    ) -> PortResult<Option<DocumentVersion>> {
        let tables = self.tables()?;
        Ok(tables.versions.iter().find(|v| v.id == id).cloned())
    }

    async fn find_latest_version_by_name(&self, name: &str) -> PortResult<Option<DocumentVersion>> {
        let same_name: Vec<DocumentVersion> = {
            let tables = self.tables()?;
            tables
                .versions
                .iter()
                .filter(|v| v.original_name == name)
                .cloned()
                .collect()
        };
        Ok(latest_per_name(same_name)?.into_iter().next())
    }

    async fn list_latest_versions(&self) -> PortResult<Vec<DocumentVersion>> {
        let all = self.tables()?.versions.clone();
        latest_per_name(all)
    }

    async fn create_analysis(&self, record: NewAnalysisRecord) -> PortResult<AnalysisRecord> {
        let mut tables = self.tables()?;
        if !tables
            .versions
            .iter()
            .any(|v| v.id == record.document_version_id)
        {
            return Err(PortError::Persistence(format!(
                "analysis references unknown document version {}",
                record.document_version_id
            )));
        }

        let id = tables.analyses.len() as i64 + 1;
        let created = record.into_persisted(id, Utc::now());
        tables.analyses.push(created.clone());
        Ok(created)
    }

    async fn find_latest_analysis_by_version_id(
        &self,
        id: DocumentVersionId,
    ) -> PortResult<Option<AnalysisRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .analyses
            .iter()
            .filter(|a| a.document_version_id == id)
            .max_by_key(|a| (a.created_at, a.id))
            .cloned())
    }
}

//=========================================================================================
// Content
//=========================================================================================

/// Bucket name embedded in every location token issued by `InMemoryContentStore`.
pub const MEMORY_BUCKET: &str = "memory";

/// A `ContentStore` keeping blobs in a map, keyed by random UUIDs.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held, orphaned ones included.
    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn blobs(&self) -> PortResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| PortError::Storage("content store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, _display_name: &str, content: &[u8]) -> PortResult<String> {
        let key = Uuid::new_v4().to_string();
        self.blobs()?.insert(key.clone(), content.to_vec());
        Ok(format!("{}/{}", MEMORY_BUCKET, key))
    }

    async fn get(&self, location: &str) -> PortResult<Vec<u8>> {
        let key = match location.split_once('/') {
            Some((MEMORY_BUCKET, key)) if !key.is_empty() => key,
            _ => {
                return Err(PortError::Storage(format!(
                    "malformed location token '{}'",
                    location
                )))
            }
        };
        self.blobs()?
            .get(key)
            .cloned()
            .ok_or_else(|| PortError::Storage(format!("no content stored at '{}'", location)))
    }
}
