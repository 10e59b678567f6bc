use async_trait::async_trait;
use docvault_core::{
    AnalysisOrchestrator, AnalysisService, AnalysisStatus, InMemoryContentStore,
    InMemoryMetadataStore, MetadataStore, NewDocumentVersion, PortError, PortResult,
    ResourceKind, VersioningOrchestrator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Maps (content, name) to a fixed description and counts invocations.
#[derive(Default)]
struct DescribingAnalyzer {
    calls: AtomicUsize,
}

#[async_trait]
impl AnalysisService for DescribingAnalyzer {
    async fn analyze(&self, content: &[u8], display_name: &str) -> PortResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "{} has {} bytes: {} (call {})",
            display_name,
            content.len(),
            String::from_utf8_lossy(content),
            call
        ))
    }
}

struct RateLimitedAnalyzer;

#[async_trait]
impl AnalysisService for RateLimitedAnalyzer {
    async fn analyze(&self, _content: &[u8], _display_name: &str) -> PortResult<String> {
        Err(PortError::Analysis("rate limit exceeded".to_string()))
    }
}

struct Harness {
    metadata: Arc<InMemoryMetadataStore>,
    content: Arc<InMemoryContentStore>,
    versioning: VersioningOrchestrator,
    analysis: AnalysisOrchestrator,
}

fn harness(analyzer: Arc<dyn AnalysisService>) -> Harness {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let content = Arc::new(InMemoryContentStore::new());
    Harness {
        versioning: VersioningOrchestrator::new(metadata.clone(), content.clone()),
        analysis: AnalysisOrchestrator::new(metadata.clone(), content.clone(), analyzer),
        metadata,
        content,
    }
}

#[tokio::test]
async fn analyze_records_capability_text_as_completed() {
    let h = harness(Arc::new(DescribingAnalyzer::default()));
    let doc = h.versioning.upload("notes.txt", b"hello", 3).await.unwrap();

    let record = h.analysis.analyze(doc.id).await.unwrap();
    assert_eq!(record.document_version_id, doc.id);
    assert_eq!(record.status, AnalysisStatus::Completed);
    assert_eq!(
        record.result_text.as_deref(),
        Some("notes.txt has 5 bytes: hello (call 1)")
    );
}

#[tokio::test]
async fn analyze_reads_the_requested_version_not_the_latest() {
    let h = harness(Arc::new(DescribingAnalyzer::default()));
    let v1 = h.versioning.upload("notes.txt", b"old", 1).await.unwrap();
    h.versioning.upload("notes.txt", b"newer", 1).await.unwrap();

    let record = h.analysis.analyze(v1.id).await.unwrap();
    assert_eq!(
        record.result_text.as_deref(),
        Some("notes.txt has 3 bytes: old (call 1)")
    );
}

#[tokio::test]
async fn get_analysis_follows_the_latest_analysis() {
    let h = harness(Arc::new(DescribingAnalyzer::default()));
    let doc = h.versioning.upload("report.pdf", b"A", 1).await.unwrap();

    let err = h.analysis.get_analysis(doc.id).await.unwrap_err();
    assert!(matches!(
        err,
        PortError::NotFound {
            kind: ResourceKind::Analysis,
            ..
        }
    ));

    let first = h.analysis.analyze(doc.id).await.unwrap();
    assert_eq!(h.analysis.get_analysis(doc.id).await.unwrap(), first);

    let second = h.analysis.analyze(doc.id).await.unwrap();
    assert!(second.created_at >= first.created_at);
    assert_ne!(first.id, second.id);
    assert_eq!(h.analysis.get_analysis(doc.id).await.unwrap(), second);
}

#[tokio::test]
async fn unknown_document_is_not_found_for_both_operations() {
    let h = harness(Arc::new(DescribingAnalyzer::default()));

    for err in [
        h.analysis.analyze(404).await.unwrap_err(),
        h.analysis.get_analysis(404).await.unwrap_err(),
    ] {
        match err {
            PortError::NotFound { kind, id } => {
                assert_eq!(kind, ResourceKind::Document);
                assert_eq!(id, 404);
            }
            other => panic!("expected not found, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn failed_analysis_writes_no_record() {
    let h = harness(Arc::new(RateLimitedAnalyzer));
    let doc = h.versioning.upload("report.pdf", b"A", 1).await.unwrap();

    let err = h.analysis.analyze(doc.id).await.unwrap_err();
    assert!(matches!(err, PortError::Analysis(_)));

    let lookup = h
        .metadata
        .find_latest_analysis_by_version_id(doc.id)
        .await
        .unwrap();
    assert!(lookup.is_none());
}

#[tokio::test]
async fn missing_content_is_a_storage_error_and_skips_the_capability() {
    let analyzer = Arc::new(DescribingAnalyzer::default());
    let h = harness(analyzer.clone());
    let dangling = h
        .metadata
        .create_version(NewDocumentVersion {
            original_name: "lost.pdf".to_string(),
            content_location: "memory/does-not-exist".to_string(),
            version: 1,
            size_bytes: 10,
            uploaded_at: None,
            uploaded_by: 1,
        })
        .await
        .unwrap();

    let err = h.analysis.analyze(dangling.id).await.unwrap_err();
    assert!(matches!(err, PortError::Storage(_)));
    assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
    assert!(h
        .metadata
        .find_latest_analysis_by_version_id(dangling.id)
        .await
        .unwrap()
        .is_none());
    assert!(h.content.is_empty());
}
