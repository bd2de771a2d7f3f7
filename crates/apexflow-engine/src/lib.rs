//! Apexflow Engine - path discovery and walking
//!
//! Given a finished program graph, the engine enumerates the execution paths
//! of an entry method ([`PathExpander`]) and replays them against visitors
//! ([`ApexPathWalker`]). Each worker owns a [`WorkerContext`] holding its
//! graph view, metadata and cancellation flag.
//!
//! # Example
//!
//! ```
//! use apexflow_core::{keys, AstNode, VertexKind};
//! use apexflow_engine::{
//!     ApexPathWalker, EngineConfig, NoopSymbolProvider, PathExpander, PathIdGenerator,
//!     RecordingVisitor, WalkOutcome, WorkerContext,
//! };
//! use apexflow_graph::{GraphBuilder, VertexQuery};
//! use std::sync::Arc;
//!
//! let class = AstNode::user_class("A").child(
//!     AstNode::method("m", 0)
//!         .with(keys::STATIC, true)
//!         .child(AstNode::block(vec![AstNode::call_statement("log", vec![])])),
//! );
//! let mut builder = GraphBuilder::new();
//! builder.ingest_user_file("A.cls", class).unwrap();
//! let graph = Arc::new(builder.finish().graph);
//! let method = graph
//!     .query_one(&VertexQuery::kind(VertexKind::Method).eq_ignore_case(keys::NAME, "m"))
//!     .unwrap();
//!
//! let mut ctx = WorkerContext::new(graph, PathIdGenerator::new(), EngineConfig::default()).unwrap();
//! let paths = PathExpander::new(&mut ctx).expand(method).unwrap();
//!
//! let mut symbols = NoopSymbolProvider;
//! let mut rules = RecordingVisitor::new();
//! let outcome = ApexPathWalker::new(ctx.graph(), ctx.cancellation.clone(), &mut symbols, &mut rules)
//!     .walk(&paths[0])
//!     .unwrap();
//! assert_eq!(outcome, WalkOutcome::Completed);
//! assert_eq!(rules.count_of(VertexKind::MethodCallExpression), 1);
//! ```

mod clone;
mod config;
mod context;
mod error;
mod expander;
mod path;
mod resolver;
mod scope;
#[cfg(test)]
mod testing;
mod visitor;
mod walker;

pub use clone::deep_clone_path;
pub use config::{EngineConfig, CONFIG_DIR, CONFIG_FILE};
pub use context::{CancellationToken, WorkerContext};
pub use error::{ConfigError, PathError};
pub use expander::PathExpander;
pub use path::{
    ApexPath, CallResolution, ConditionOutcome, PathId, PathIdGenerator, PathVertex,
    RecursionMarker,
};
pub use resolver::{method_arity, CallTarget, MethodResolver};
pub use scope::{ClassStaticScope, StaticScopeState};
pub use visitor::{
    NoopPathVisitor, NoopSymbolProvider, PathVertexVisitor, RecordingVisitor,
    SymbolProviderVisitor, VertexCategory,
};
pub use walker::{ApexPathWalker, StaticScopes, WalkOutcome};
