//! crates/docvault_core/src/versioning.rs
//!
//! Version assignment on upload and the "latest version per name" listing.

use crate::domain::{ActorId, DocumentVersion, NewDocumentVersion};
use crate::ports::{ContentStore, MetadataStore, PortError, PortResult};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

/// How many times `upload` recomputes the version after a conflicting insert.
pub const DEFAULT_CONFLICT_RETRIES: usize = 1;

/// Assigns per-name version numbers and stores uploads.
#[derive(Clone)]
pub struct VersioningOrchestrator {
    metadata: Arc<dyn MetadataStore>,
    content: Arc<dyn ContentStore>,
    conflict_retries: usize,
}

impl VersioningOrchestrator {
    pub fn new(metadata: Arc<dyn MetadataStore>, content: Arc<dyn ContentStore>) -> Self {
        Self {
            metadata,
            content,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Sets how many times a `VersionConflict` is retried before it is returned.
    pub fn with_conflict_retries(mut self, retries: usize) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Stores `content` as the next version of `original_name`.
    ///
    /// The bytes are written once. If the metadata store reports that another
    /// upload took the computed version first, the latest version is re-read and
    /// the insert retried against the same content location. A failed content
    /// write leaves no metadata behind; a failed metadata write leaves the blob
    /// orphaned and is returned to the caller.
    pub async fn upload(
        &self,
        original_name: &str,
        content: &[u8],
        uploaded_by: ActorId,
    ) -> PortResult<DocumentVersion> {
        let mut version = self.next_version(original_name).await?;
        let content_location = self.content.put(original_name, content).await?;
        let size_bytes = i64::try_from(content.len())
            .map_err(|_| PortError::Storage("content length exceeds i64".to_string()))?;

        let mut attempt = 0;
        loop {
            let record = NewDocumentVersion {
                original_name: original_name.to_string(),
                content_location: content_location.clone(),
                version,
                size_bytes,
                uploaded_at: Some(Utc::now()),
                uploaded_by,
            };

            match self.metadata.create_version(record).await {
                Ok(created) => return Ok(created),
                Err(PortError::VersionConflict { .. }) if attempt < self.conflict_retries => {
                    attempt += 1;
                    version = self.next_version(original_name).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One entry per distinct name: the highest version uploaded under it.
    pub async fn list_latest(&self) -> PortResult<Vec<DocumentVersion>> {
        self.metadata.list_latest_versions().await
    }

    async fn next_version(&self, original_name: &str) -> PortResult<i32> {
        match self.metadata.find_latest_version_by_name(original_name).await? {
            None => Ok(1),
            Some(previous) => previous.version.checked_add(1).ok_or_else(|| {
                PortError::Persistence(format!(
                    "version counter for '{}' overflowed",
                    original_name
                ))
            }),
        }
    }
}

/// Reduces a set of records to the highest version of each name.
///
/// Two records sharing a name and its maximum version violate the version
/// invariant and are reported as a persistence error rather than resolved.
pub fn latest_per_name<I>(records: I) -> PortResult<Vec<DocumentVersion>>
where
    I: IntoIterator<Item = DocumentVersion>,
{
    let mut latest: HashMap<String, (DocumentVersion, Option<i64>)> = HashMap::new();
    for record in records {
        let replace = match latest.get_mut(&record.original_name) {
            Some((current, duplicate)) => {
                if current.version == record.version {
                    *duplicate = Some(record.id);
                }
                current.version < record.version
            }
            None => true,
        };
        if replace {
            latest.insert(record.original_name.clone(), (record, None));
        }
    }

    latest
        .into_values()
        .map(|(record, duplicate)| match duplicate {
            None => Ok(record),
            Some(other) => Err(PortError::Persistence(format!(
                "duplicate version {} stored for '{}' (ids {} and {})",
                record.version, record.original_name, record.id, other
            ))),
        })
        .collect()
}
