//! Apexflow Graph - the program graph and the passes that build it
//!
//! This crate turns AST trees into a property graph and prepares it for path
//! analysis. Ingestion emits one vertex per AST node (plus synthesized
//! constructors and static-block methods), the CFG builder adds `CfgPath`
//! edges per method, and the inheritance resolver links types across files.
//!
//! Workers read the finished graph through a [`GraphProvider`], either
//! directly or through a just-in-time subgraph that is filled on demand.
//!
//! # Example
//!
//! ```
//! use apexflow_core::AstNode;
//! use apexflow_graph::{EdgeKind, GraphBuilder};
//!
//! let class = AstNode::user_class("A").child(
//!     AstNode::method("m", 0).child(AstNode::block(vec![
//!         AstNode::call_statement("first", vec![]),
//!         AstNode::call_statement("second", vec![]),
//!     ])),
//! );
//!
//! let mut builder = GraphBuilder::new();
//! builder.ingest_user_file("A.cls", class).unwrap();
//! let output = builder.finish();
//!
//! assert!(output.diagnostics.is_empty());
//! assert_eq!(output.graph.edge_count_of(EdgeKind::CfgPath), 2);
//! ```

mod builder;
mod cfg;
mod edge;
mod graph;
mod hooks;
mod inheritance;
mod jit;
mod metadata;
mod query;
mod store;
pub mod synthesis;
mod type_table;

pub use builder::{BuildOutput, GraphBuilder};
pub use cfg::{CfgBuilder, MethodCfg};
pub use edge::{Edge, EdgeKind, GraphEdge};
pub use graph::{GraphStats, ProgramGraph};
pub use hooks::{AccessorAnnotator, FileHook, NoopFileHook};
pub use inheritance::InheritanceResolver;
pub use jit::{GraphProvider, JitGraph};
pub use metadata::{MetadataInfo, MetadataInfoProvider};
pub use query::{Predicate, VertexQuery};
pub use store::{GraphStore, StoreError};
pub use type_table::TypeTable;
