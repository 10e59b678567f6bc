//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `MetadataStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docvault_core::domain::{
    AnalysisRecord, AnalysisStatus, DocumentVersion, DocumentVersionId, NewAnalysisRecord,
    NewDocumentVersion,
};
use docvault_core::ports::{MetadataStore, PortError, PortResult};
use docvault_core::versioning::latest_per_name;
use sqlx::{FromRow, PgPool};
use tracing::warn;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `MetadataStore` port.
#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    /// Creates a new `PgMetadataStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const VERSION_COLUMNS: &str =
    "id, original_name, content_location, version, size_bytes, uploaded_at, uploaded_by";

const ANALYSIS_COLUMNS: &str = "id, document_version_id, status, result_text, created_at";

#[derive(FromRow)]
struct DocumentVersionRecord {
    id: i64,
    original_name: String,
    content_location: String,
    version: i32,
    size_bytes: i64,
    uploaded_at: DateTime<Utc>,
    uploaded_by: i64,
}
impl DocumentVersionRecord {
    fn to_domain(self) -> DocumentVersion {
        DocumentVersion {
            id: self.id,
            original_name: self.original_name,
            content_location: self.content_location,
            version: self.version,
            size_bytes: self.size_bytes,
            uploaded_at: self.uploaded_at,
            uploaded_by: self.uploaded_by,
        }
    }
}

#[derive(FromRow)]
struct AnalysisRow {
    id: i64,
    document_version_id: i64,
    status: String,
    result_text: Option<String>,
    created_at: DateTime<Utc>,
}
impl AnalysisRow {
    fn to_domain(self) -> PortResult<AnalysisRecord> {
        let status = self
            .status
            .parse::<AnalysisStatus>()
            .map_err(|e| PortError::Persistence(format!("analysis {}: {}", self.id, e)))?;
        Ok(AnalysisRecord {
            id: self.id,
            document_version_id: self.document_version_id,
            status,
            result_text: self.result_text,
            created_at: self.created_at,
        })
    }
}

fn persistence(e: sqlx::Error) -> PortError {
    PortError::Persistence(e.to_string())
}

//=========================================================================================
// `MetadataStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn create_version(&self, record: NewDocumentVersion) -> PortResult<DocumentVersion> {
        let sql = format!(
            "INSERT INTO document_versions \
                (original_name, content_location, version, size_bytes, uploaded_at, uploaded_by) \
             VALUES ($1, $2, $3, $4, COALESCE($5, now()), $6) \
             RETURNING {}",
            VERSION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, DocumentVersionRecord>(&sql)
            .bind(&record.original_name)
            .bind(&record.content_location)
            .bind(record.version)
            .bind(record.size_bytes)
            .bind(record.uploaded_at)
            .bind(record.uploaded_by)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(row) => Ok(row.to_domain()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(
                    "Version {} of '{}' was taken by a concurrent upload",
                    record.version, record.original_name
                );
                Err(PortError::VersionConflict {
                    original_name: record.original_name,
                    version: record.version,
                })
            }
            Err(e) => Err(persistence(e)),
        }
    }

    async fn get_version_by_id(
        &self,
        id: DocumentVersionId,
    ) -> PortResult<Option<DocumentVersion>> {
        let sql = format!("SELECT {} FROM document_versions WHERE id = $1", VERSION_COLUMNS);
        let row = sqlx::query_as::<_, DocumentVersionRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(row.map(DocumentVersionRecord::to_domain))
    }

    async fn find_latest_version_by_name(&self, name: &str) -> PortResult<Option<DocumentVersion>> {
        // Two rows are enough to notice a duplicated maximum.
        let sql = format!(
            "SELECT {} FROM document_versions WHERE original_name = $1 \
             ORDER BY version DESC LIMIT 2",
            VERSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, DocumentVersionRecord>(&sql)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

        let latest = latest_per_name(rows.into_iter().map(DocumentVersionRecord::to_domain))?;
        Ok(latest.into_iter().next())
    }

    async fn list_latest_versions(&self) -> PortResult<Vec<DocumentVersion>> {
        let sql = "SELECT dv.id, dv.original_name, dv.content_location, dv.version, \
                          dv.size_bytes, dv.uploaded_at, dv.uploaded_by \
                   FROM document_versions dv \
                   JOIN (SELECT original_name, MAX(version) AS max_version \
                         FROM document_versions GROUP BY original_name) latest \
                     ON dv.original_name = latest.original_name \
                    AND dv.version = latest.max_version";
        let rows = sqlx::query_as::<_, DocumentVersionRecord>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;

        latest_per_name(rows.into_iter().map(DocumentVersionRecord::to_domain))
    }

    async fn create_analysis(&self, record: NewAnalysisRecord) -> PortResult<AnalysisRecord> {
        let sql = format!(
            "INSERT INTO analyses (document_version_id, status, result_text, created_at) \
             VALUES ($1, $2, $3, COALESCE($4, now())) \
             RETURNING {}",
            ANALYSIS_COLUMNS
        );
        let row = sqlx::query_as::<_, AnalysisRow>(&sql)
            .bind(record.document_version_id)
            .bind(record.status.as_str())
            .bind(&record.result_text)
            .bind(record.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;
        row.to_domain()
    }

    async fn find_latest_analysis_by_version_id(
        &self,
        id: DocumentVersionId,
    ) -> PortResult<Option<AnalysisRecord>> {
        let sql = format!(
            "SELECT {} FROM analyses WHERE document_version_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1",
            ANALYSIS_COLUMNS
        );
        let row = sqlx::query_as::<_, AnalysisRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(AnalysisRow::to_domain).transpose()
    }
}
