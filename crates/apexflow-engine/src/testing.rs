//! Fixtures shared by the engine tests.

use crate::config::EngineConfig;
use crate::context::WorkerContext;
use crate::path::PathIdGenerator;
use apexflow_core::{keys, AstNode, VertexId, VertexKind};
use apexflow_graph::{GraphBuilder, VertexQuery};
use std::sync::Arc;

/// Builds a graph from `(file, class)` pairs and a just-in-time worker over it.
pub fn context_for(files: Vec<(&str, AstNode)>) -> WorkerContext {
    let mut builder = GraphBuilder::new();
    for (file, class) in files {
        builder.ingest_user_file(file, class).unwrap();
    }
    let output = builder.finish();
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    WorkerContext::new(
        Arc::new(output.graph),
        PathIdGenerator::new(),
        EngineConfig::default(),
    )
    .unwrap()
}

pub fn method_named(ctx: &mut WorkerContext, class: &str, name: &str) -> VertexId {
    assert!(ctx.provider.ensure_class(class).unwrap());
    ctx.graph()
        .query_one(
            &VertexQuery::kind(VertexKind::Method)
                .eq_ignore_case(keys::DEFINING_TYPE, class)
                .eq_ignore_case(keys::NAME, name),
        )
        .unwrap()
}

/// `if (condition) { statements }` with no else.
pub fn if_statement(condition: AstNode, statements: Vec<AstNode>) -> AstNode {
    AstNode::new("IfElseBlockStatement").child(
        AstNode::new("IfBlockStatement")
            .child(AstNode::new("StandardCondition").child(condition))
            .child(AstNode::block(statements)),
    )
}
