pub mod analysis;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod versioning;

pub use analysis::AnalysisOrchestrator;
pub use domain::{
    ActorId, AnalysisId, AnalysisRecord, AnalysisStatus, DocumentVersion, DocumentVersionId,
    NewAnalysisRecord, NewDocumentVersion,
};
pub use memory::{InMemoryContentStore, InMemoryMetadataStore};
pub use ports::{
    AnalysisService, ContentStore, MetadataStore, PortError, PortResult, ResourceKind,
};
pub use versioning::VersioningOrchestrator;
