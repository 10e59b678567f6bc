//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use docvault_core::ports::{AnalysisService, ContentStore, MetadataStore};
use docvault_core::{AnalysisOrchestrator, VersioningOrchestrator};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub versioning: VersioningOrchestrator,
    pub analysis: AnalysisOrchestrator,
}

impl AppState {
    /// Wires both orchestrators to the same set of collaborators.
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        content: Arc<dyn ContentStore>,
        analyzer: Arc<dyn AnalysisService>,
    ) -> Self {
        Self {
            versioning: VersioningOrchestrator::new(metadata.clone(), content.clone()),
            analysis: AnalysisOrchestrator::new(metadata, content, analyzer),
        }
    }
}
