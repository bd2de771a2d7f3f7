//! Per-worker state.
//!
//! Each worker owns its graph view, its metadata and its cancellation flag.
//! Only the full graph and the path id counter are shared.

use crate::config::EngineConfig;
use crate::error::PathError;
use crate::path::PathIdGenerator;
use apexflow_graph::{GraphProvider, MetadataInfoProvider, ProgramGraph};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag, checked once per walked vertex.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct WorkerContext {
    pub provider: GraphProvider,
    pub metadata: MetadataInfoProvider,
    pub ids: PathIdGenerator,
    pub cancellation: CancellationToken,
    pub config: EngineConfig,
}

impl WorkerContext {
    /// Builds a worker over the shared full graph. Metadata is computed here,
    /// once.
    pub fn new(
        graph: Arc<ProgramGraph>,
        ids: PathIdGenerator,
        config: EngineConfig,
    ) -> Result<Self, PathError> {
        let mut metadata = MetadataInfoProvider::new();
        metadata.initialize(&graph)?;
        let provider = if config.just_in_time {
            GraphProvider::just_in_time(graph)
        } else {
            GraphProvider::full(graph)
        };
        Ok(Self {
            provider,
            metadata,
            ids,
            cancellation: CancellationToken::new(),
            config,
        })
    }

    pub fn graph(&self) -> &ProgramGraph {
        self.provider.graph()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_shared_between_clones() {
        let token = CancellationToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_context_initializes_metadata_once() {
        let graph = Arc::new(ProgramGraph::new());
        let mut context =
            WorkerContext::new(graph.clone(), PathIdGenerator::new(), EngineConfig::default())
                .unwrap();
        assert!(context.metadata.is_initialized());
        assert!(context.metadata.initialize(&graph).is_err());
        assert_eq!(context.graph().vertex_count(), 0);
    }
}
