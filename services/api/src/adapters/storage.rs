//! services/api/src/adapters/storage.rs
//!
//! This module contains the content store adapter, which implements the
//! `ContentStore` port on top of the `object_store` crate. The same adapter serves
//! MinIO, AWS S3, a local directory, or an in-memory store depending on configuration.

use crate::config::{StorageConfig, StorageProvider};
use crate::error::ApiError;
use async_trait::async_trait;
use docvault_core::domain::file_extension;
use docvault_core::ports::{ContentStore, PortError, PortResult};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{Attribute, AttributeValue, ObjectStore, PutOptions, PutPayload};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A content store that writes each upload to `<bucket>/<uuid>[.<ext>]`.
///
/// The returned location token is exactly that string, so a read can be routed
/// back to the right bucket from the token alone.
#[derive(Clone)]
pub struct ObjectContentStore {
    bucket: String,
    store: Arc<dyn ObjectStore>,
    /// Whether the backend accepts object attributes such as `Content-Type`.
    tag_content_type: bool,
}

impl ObjectContentStore {
    /// Creates a new `ObjectContentStore` that tags objects with a content type.
    pub fn new(bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            bucket: bucket.into(),
            store,
            tag_content_type: true,
        }
    }

    /// Stops attaching the content type, for backends without attribute support.
    pub fn without_content_type(mut self) -> Self {
        self.tag_content_type = false;
        self
    }

    /// Builds the store described by `config`.
    pub fn from_config(config: &StorageConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn ObjectStore> = match config.provider {
            StorageProvider::MinIO => {
                let endpoint = config.endpoint_url();
                info!("Using MinIO bucket '{}' at {}", config.bucket, endpoint);
                Arc::new(
                    AmazonS3Builder::new()
                        .with_bucket_name(&config.bucket)
                        .with_region(&config.region)
                        .with_endpoint(&endpoint)
                        .with_allow_http(endpoint.starts_with("http://"))
                        .with_virtual_hosted_style_request(false)
                        .with_access_key_id(&config.access_key)
                        .with_secret_access_key(&config.secret_key)
                        .build()?,
                )
            }
            StorageProvider::AwsS3 => {
                // Credentials come from the standard AWS environment variables.
                info!("Using S3 bucket '{}' in {}", config.bucket, config.region);
                Arc::new(
                    AmazonS3Builder::from_env()
                        .with_bucket_name(&config.bucket)
                        .with_region(&config.region)
                        .build()?,
                )
            }
            StorageProvider::Local => {
                let dir = config.root.join(&config.bucket);
                std::fs::create_dir_all(&dir)?;
                info!("Using local storage directory {}", dir.display());
                let store = Arc::new(LocalFileSystem::new_with_prefix(&dir)?);
                return Ok(Self::new(config.bucket.clone(), store).without_content_type());
            }
            StorageProvider::Memory => {
                info!("Using in-memory content storage");
                Arc::new(InMemory::new())
            }
        };
        Ok(Self::new(config.bucket.clone(), store))
    }

    fn resolve(&self, location: &str) -> PortResult<Path> {
        let (bucket, key) = location.split_once('/').ok_or_else(|| {
            PortError::Storage(format!(
                "invalid location '{}', expected 'bucket/key'",
                location
            ))
        })?;
        if bucket != self.bucket {
            return Err(PortError::Storage(format!(
                "location '{}' refers to unknown bucket '{}'",
                location, bucket
            )));
        }
        if key.is_empty() {
            return Err(PortError::Storage(format!(
                "location '{}' has an empty key",
                location
            )));
        }
        Path::parse(key)
            .map_err(|e| PortError::Storage(format!("invalid location '{}': {}", location, e)))
    }
}

/// A fresh object key: a random UUID plus the display name's extension when it
/// is a short alphanumeric suffix.
fn object_key(display_name: &str) -> String {
    let id = Uuid::new_v4();
    match file_extension(display_name) {
        Some(ext) if ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!("{}.{}", id, ext)
        }
        _ => id.to_string(),
    }
}

/// MIME type for a display name, by extension.
pub fn content_type_for(display_name: &str) -> &'static str {
    let ext = file_extension(display_name)
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

//=========================================================================================
// `ContentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentStore for ObjectContentStore {
    async fn put(&self, display_name: &str, content: &[u8]) -> PortResult<String> {
        let key = object_key(display_name);
        let path = Path::from(key.as_str());

        let mut options = PutOptions::default();
        if self.tag_content_type {
            options.attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type_for(display_name)),
            );
        }

        self.store
            .put_opts(&path, PutPayload::from(content.to_vec()), options)
            .await
            .map_err(|e| PortError::Storage(format!("failed to store '{}': {}", display_name, e)))?;

        Ok(format!("{}/{}", self.bucket, key))
    }

    async fn get(&self, location: &str) -> PortResult<Vec<u8>> {
        let path = self.resolve(location)?;
        let result = self.store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => {
                PortError::Storage(format!("no content stored at '{}'", location))
            }
            other => PortError::Storage(format!("failed to read '{}': {}", location, other)),
        })?;
        let bytes = result
            .bytes()
            .await
            .map_err(|e| PortError::Storage(format!("failed to read '{}': {}", location, e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn memory_store() -> ObjectContentStore {
        ObjectContentStore::new("documents", Arc::new(InMemory::new()))
    }

    #[tokio::test]
    async fn put_then_get_returns_same_bytes() {
        let store = memory_store();
        let payloads: [&[u8]; 3] = [b"", b"A", &[0, 159, 146, 150, 255]];
        for content in payloads {
            let location = store.put("report.pdf", content).await.unwrap();
            assert_eq!(store.get(&location).await.unwrap(), content);
        }
    }

    #[tokio::test]
    async fn location_names_bucket_and_keeps_extension() {
        let store = memory_store();
        let location = store.put("Quarterly Report.PDF", b"%PDF").await.unwrap();
        let (bucket, key) = location.split_once('/').unwrap();
        assert_eq!(bucket, "documents");
        assert!(key.ends_with(".PDF"), "{}", key);
        assert!(Uuid::parse_str(key.trim_end_matches(".PDF")).is_ok());

        let bare = store.put("Makefile", b"all:").await.unwrap();
        assert!(Uuid::parse_str(bare.trim_start_matches("documents/")).is_ok());
    }

    #[tokio::test]
    async fn odd_extensions_are_dropped_from_the_key() {
        let store = memory_store();
        let location = store.put("weird.na me/x", b"x").await.unwrap();
        let key = location.trim_start_matches("documents/");
        assert!(Uuid::parse_str(key).is_ok(), "{}", key);
    }

    #[tokio::test]
    async fn bad_locations_are_storage_errors() {
        let store = memory_store();
        for location in [
            "no-separator",
            "other-bucket/abc",
            "documents/",
            "documents/missing-key",
            "documents/a//b",
        ] {
            let err = store.get(location).await.unwrap_err();
            assert!(matches!(err, PortError::Storage(_)), "{}", location);
        }
    }

    #[tokio::test]
    async fn local_filesystem_backend_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            provider: StorageProvider::Local,
            bucket: "documents".to_string(),
            root: PathBuf::from(dir.path()),
            region: String::new(),
            endpoint: String::new(),
            secure: false,
            access_key: String::new(),
            secret_key: String::new(),
        };
        let store = ObjectContentStore::from_config(&config).unwrap();

        let location = store.put("notes.txt", b"local bytes").await.unwrap();
        assert_eq!(store.get(&location).await.unwrap(), b"local bytes");

        let key = location.trim_start_matches("documents/");
        assert!(dir.path().join("documents").join(key).exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn object_store_round_trips_arbitrary_bytes(
            content in prop::collection::vec(any::<u8>(), 0..4096),
            name in "[a-z]{1,8}(\\.[a-z0-9]{1,4})?",
        ) {
            let store = memory_store();
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            let (location, read) = runtime.block_on(async {
                let location = store.put(&name, &content).await.unwrap();
                let read = store.get(&location).await.unwrap();
                (location, read)
            });
            prop_assert!(location.starts_with("documents/"));
            prop_assert_eq!(read, content);
        }
    }

    #[test]
    fn content_type_is_classified_by_extension() {
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("A.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("table.csv"), "text/csv");
        assert_eq!(content_type_for("archive.tar.gz"), "application/octet-stream");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }
}
