//! Control-flow edges for one method.
//!
//! The builder walks the method body and plans `CfgPath` edges plus the
//! `EndScopes` annotations. Nothing is written to the graph until the whole
//! method succeeds, so a method with unreachable code leaves no partial flow
//! behind.
//!
//! Successors are resolved through a stack of scope frames. Each frame
//! remembers where control continues once the scope completes; a statement
//! that is last in its block falls through to the nearest frame that has a
//! continuation.
//!
//! Loops are modelled as executing their body once: the body falls through to
//! the loop's successor, and `break`/`continue` jump there too.
//!
//! A branch with no statement after it in the method links back to the
//! method body, which stands for the method exit. A condition therefore
//! always has its negative edge, and a switch without a default always has
//! its no-match edge.

use crate::graph::ProgramGraph;
use apexflow_core::{
    keys, Diagnostic, GraphError, PropertyValue, Result, VertexId, VertexKind,
};
use std::collections::HashSet;
use tracing::debug;

/// One nesting level during the walk.
#[derive(Debug, Clone)]
struct ScopeFrame {
    label: &'static str,
    /// Where control goes when this scope completes, if known at this level.
    continuation: Option<VertexId>,
    is_loop: bool,
}

/// Planned flow for one method, ready to be written.
#[derive(Debug)]
pub struct MethodCfg {
    pub method: VertexId,
    pub edges: Vec<(VertexId, VertexId)>,
    pub end_scopes: Vec<(VertexId, Vec<String>)>,
}

impl MethodCfg {
    /// Writes the planned edges and annotations. Returns the edge count.
    pub fn apply(self, graph: &mut ProgramGraph) -> Result<usize> {
        let count = self.edges.len();
        for (from, to) in self.edges {
            graph.add_edge(from, to, crate::edge::EdgeKind::CfgPath)?;
        }
        for (vertex, labels) in self.end_scopes {
            graph.set_property(vertex, keys::END_SCOPES, PropertyValue::List(labels))?;
        }
        Ok(count)
    }
}

pub struct CfgBuilder<'g> {
    graph: &'g ProgramGraph,
    file: String,
    frames: Vec<ScopeFrame>,
    terminals: HashSet<VertexId>,
    planned: HashSet<(VertexId, VertexId)>,
    /// The method body, target of branches that leave the method.
    exit: Option<VertexId>,
    cfg: MethodCfg,
}

impl<'g> CfgBuilder<'g> {
    pub fn new(graph: &'g ProgramGraph, file: &str) -> Self {
        Self {
            graph,
            file: file.to_string(),
            frames: Vec::new(),
            terminals: HashSet::new(),
            planned: HashSet::new(),
            exit: None,
            cfg: MethodCfg {
                method: VertexId(0),
                edges: Vec::new(),
                end_scopes: Vec::new(),
            },
        }
    }

    /// Plans the flow of a method. Methods without a body produce no edges.
    pub fn build(mut self, method: VertexId) -> Result<MethodCfg> {
        self.cfg.method = method;
        if let Some(body) = self.first_child_of(method, VertexKind::BlockStatement) {
            self.exit = Some(body);
            self.process_block(body, None)?;
        }
        debug!(
            "Planned {} flow edges for method {}",
            self.cfg.edges.len(),
            method
        );
        Ok(self.cfg)
    }

    fn kind(&self, id: VertexId) -> VertexKind {
        self.graph.kind(id).unwrap_or(VertexKind::Unknown)
    }

    fn first_child_of(&self, id: VertexId, kind: VertexKind) -> Option<VertexId> {
        self.graph.children_of_kind(id, kind).into_iter().next()
    }

    fn require_child(&self, id: VertexId, kind: VertexKind) -> Result<VertexId> {
        self.first_child_of(id, kind)
            .ok_or_else(|| GraphError::MissingChild {
                vertex: id,
                label: self.kind(id).to_string(),
                expected: kind.as_str(),
            })
    }

    /// Statements of a block in order.
    fn statements(&self, block: VertexId) -> Vec<VertexId> {
        self.graph
            .children(block)
            .into_iter()
            .filter(|c| self.kind(*c).is_statement())
            .collect()
    }

    /// The local successor, or the nearest enclosing continuation.
    fn successor(&self, local_next: Option<VertexId>) -> Option<VertexId> {
        local_next.or_else(|| self.frames.iter().rev().find_map(|f| f.continuation))
    }

    fn push(&mut self, kind: VertexKind, continuation: Option<VertexId>, is_loop: bool) {
        self.frames.push(ScopeFrame {
            label: kind.as_str(),
            continuation,
            is_loop,
        });
    }

    fn link(&mut self, from: VertexId, to: VertexId) -> Result<()> {
        if self.terminals.contains(&from) {
            return Err(self.unreachable(to));
        }
        if self.planned.insert((from, to)) {
            self.cfg.edges.push((from, to));
        }
        Ok(())
    }

    fn unreachable(&self, target: VertexId) -> GraphError {
        let vertex = self.graph.vertex(target);
        GraphError::UnreachableCode(Diagnostic {
            file: self.file.clone(),
            defining_type: vertex
                .and_then(|v| v.defining_type())
                .unwrap_or_default()
                .to_string(),
            line: vertex.map(|v| v.line).unwrap_or(0),
            message: format!("{} can never execute", self.kind(target)),
        })
    }

    fn annotate(&mut self, vertex: VertexId, labels: Vec<String>) {
        if !labels.is_empty() {
            self.cfg.end_scopes.push((vertex, labels));
        }
    }

    fn process_block(&mut self, block: VertexId, continuation: Option<VertexId>) -> Result<()> {
        self.push(VertexKind::BlockStatement, continuation, false);
        let statements = self.statements(block);
        match statements.first() {
            None => self.fall_through(block, None)?,
            Some(&first) => {
                self.link(block, first)?;
                for (i, &statement) in statements.iter().enumerate() {
                    let local_next = statements.get(i + 1).copied();
                    self.process_statement(statement, local_next)?;
                }
            }
        }
        self.frames.pop();
        Ok(())
    }

    fn process_statement(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        match self.kind(statement) {
            VertexKind::BlockStatement => self.process_block(statement, local_next),
            VertexKind::ReturnStatement | VertexKind::ThrowStatement => {
                self.terminal(statement, local_next)
            }
            VertexKind::BreakStatement | VertexKind::ContinueStatement => {
                self.loop_exit(statement, local_next)
            }
            VertexKind::IfElseBlockStatement => self.if_else(statement, local_next),
            VertexKind::ForLoopStatement => self.for_loop(statement, local_next),
            VertexKind::ForEachStatement => self.for_each(statement, local_next),
            VertexKind::WhileLoopStatement => self.while_loop(statement, local_next),
            VertexKind::DoLoopStatement => self.do_loop(statement, local_next),
            VertexKind::TryCatchFinallyBlockStatement => self.try_catch(statement, local_next),
            VertexKind::SwitchStatement => self.switch(statement, local_next),
            _ => self.fall_through(statement, local_next),
        }
    }

    /// Plain statement: link forward, and record the scopes it closes when it
    /// is last in its block.
    fn fall_through(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        if let Some(next) = self.successor(local_next) {
            self.link(statement, next)?;
        }
        if local_next.is_none() {
            let mut labels = Vec::new();
            for frame in self.frames.iter().rev() {
                labels.push(frame.label.to_string());
                if frame.continuation.is_some() {
                    break;
                }
            }
            self.annotate(statement, labels);
        }
        Ok(())
    }

    /// `return` and `throw` close every scope and never flow forward.
    fn terminal(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        self.terminals.insert(statement);
        let labels = self
            .frames
            .iter()
            .rev()
            .map(|f| f.label.to_string())
            .collect();
        self.annotate(statement, labels);
        match local_next {
            Some(next) => self.link(statement, next),
            None => Ok(()),
        }
    }

    fn loop_exit(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        let Some(depth) = self.frames.iter().rposition(|f| f.is_loop) else {
            return self.fall_through(statement, local_next);
        };
        let target = self.frames[..=depth]
            .iter()
            .rev()
            .find_map(|f| f.continuation);
        if let Some(target) = target {
            self.link(statement, target)?;
        }
        let labels = self.frames[depth..]
            .iter()
            .rev()
            .map(|f| f.label.to_string())
            .collect();
        self.annotate(statement, labels);
        self.terminals.insert(statement);
        match local_next {
            Some(next) => self.link(statement, next),
            None => Ok(()),
        }
    }

    fn if_else(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        let after = self.successor(local_next);
        let children = self.graph.children(statement);

        let mut branches = Vec::new();
        for child in &children {
            if self.kind(*child) == VertexKind::IfBlockStatement {
                let condition = self.require_child(*child, VertexKind::StandardCondition)?;
                let block = self.require_child(*child, VertexKind::BlockStatement)?;
                branches.push((condition, block));
            }
        }
        let else_block = children
            .iter()
            .copied()
            .find(|c| self.kind(*c) == VertexKind::BlockStatement);

        let Some(&(first_condition, _)) = branches.first() else {
            return Err(GraphError::MissingChild {
                vertex: statement,
                label: VertexKind::IfElseBlockStatement.to_string(),
                expected: VertexKind::IfBlockStatement.as_str(),
            });
        };
        self.link(statement, first_condition)?;

        for (i, &(condition, block)) in branches.iter().enumerate() {
            self.link(condition, block)?;
            let negative = branches
                .get(i + 1)
                .map(|(next_condition, _)| *next_condition)
                .or(else_block)
                .or(after)
                .or(self.exit);
            if let Some(negative) = negative {
                self.link(condition, negative)?;
            }
        }

        self.push(VertexKind::IfElseBlockStatement, local_next, false);
        for (_, block) in &branches {
            self.process_block(*block, None)?;
        }
        if let Some(block) = else_block {
            self.process_block(block, None)?;
        }
        self.frames.pop();
        Ok(())
    }

    fn for_loop(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        let children = self.graph.children(statement);
        let body = children
            .iter()
            .rev()
            .copied()
            .find(|c| self.kind(*c) == VertexKind::BlockStatement)
            .ok_or_else(|| GraphError::MissingChild {
                vertex: statement,
                label: VertexKind::ForLoopStatement.to_string(),
                expected: VertexKind::BlockStatement.as_str(),
            })?;
        let init = children.iter().copied().find(|c| {
            matches!(
                self.kind(*c),
                VertexKind::VariableDeclarationStatements | VertexKind::ExpressionStatement
            )
        });
        let condition = children
            .iter()
            .copied()
            .find(|c| self.kind(*c) == VertexKind::StandardCondition);

        let mut previous = statement;
        for step in [init, condition].into_iter().flatten() {
            self.link(previous, step)?;
            previous = step;
        }
        self.link(previous, body)?;
        self.loop_body(VertexKind::ForLoopStatement, body, local_next)
    }

    fn for_each(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        let body = self.require_child(statement, VertexKind::BlockStatement)?;
        self.link(statement, body)?;
        self.loop_body(VertexKind::ForEachStatement, body, local_next)
    }

    fn while_loop(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        let condition = self.require_child(statement, VertexKind::StandardCondition)?;
        let body = self.require_child(statement, VertexKind::BlockStatement)?;
        self.link(statement, condition)?;
        self.link(condition, body)?;
        self.loop_body(VertexKind::WhileLoopStatement, body, local_next)
    }

    fn loop_body(&mut self, kind: VertexKind, body: VertexId, local_next: Option<VertexId>) -> Result<()> {
        self.push(kind, local_next, true);
        self.process_block(body, None)?;
        self.frames.pop();
        Ok(())
    }

    /// Body first, then the condition, then the successor.
    fn do_loop(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        let body = self.require_child(statement, VertexKind::BlockStatement)?;
        let condition = self.require_child(statement, VertexKind::StandardCondition)?;
        self.link(statement, body)?;

        self.push(VertexKind::DoLoopStatement, local_next, true);
        self.process_block(body, Some(condition))?;
        self.frames.pop();

        if let Some(after) = self.successor(local_next) {
            self.link(condition, after)?;
        }
        Ok(())
    }

    fn try_catch(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        let blocks = self
            .graph
            .children_of_kind(statement, VertexKind::BlockStatement);
        let try_block = *blocks.first().ok_or_else(|| GraphError::MissingChild {
            vertex: statement,
            label: VertexKind::TryCatchFinallyBlockStatement.to_string(),
            expected: VertexKind::BlockStatement.as_str(),
        })?;
        let finally_block = blocks.get(1).copied();
        let catches = self
            .graph
            .children_of_kind(statement, VertexKind::CatchBlockStatement);

        self.link(statement, try_block)?;
        for catch in &catches {
            self.link(statement, *catch)?;
        }

        self.push(VertexKind::TryCatchFinallyBlockStatement, local_next, false);
        self.process_block(try_block, finally_block)?;
        for catch in catches {
            let block = self.require_child(catch, VertexKind::BlockStatement)?;
            self.link(catch, block)?;
            self.process_block(block, finally_block)?;
        }
        if let Some(block) = finally_block {
            self.process_block(block, None)?;
        }
        self.frames.pop();
        Ok(())
    }

    /// Each `when` is an independent alternative. Values of a value-when are
    /// chained, the last one leading into the shared body.
    fn switch(&mut self, statement: VertexId, local_next: Option<VertexId>) -> Result<()> {
        let after = self.successor(local_next);
        let whens: Vec<VertexId> = self
            .graph
            .children(statement)
            .into_iter()
            .filter(|c| {
                matches!(
                    self.kind(*c),
                    VertexKind::ValueWhenBlock | VertexKind::TypeWhenBlock | VertexKind::ElseWhenBlock
                )
            })
            .collect();
        let has_else = whens
            .iter()
            .any(|w| self.kind(*w) == VertexKind::ElseWhenBlock);

        let mut bodies = Vec::with_capacity(whens.len());
        for when in whens {
            let body = self.require_child(when, VertexKind::BlockStatement)?;
            self.link(statement, when)?;
            let mut previous = when;
            if self.kind(when) == VertexKind::ValueWhenBlock {
                let values: Vec<VertexId> = self
                    .graph
                    .children(when)
                    .into_iter()
                    .filter(|c| {
                        matches!(
                            self.kind(*c),
                            VertexKind::LiteralCase | VertexKind::IdentifierCase
                        )
                    })
                    .collect();
                for value in values {
                    self.link(previous, value)?;
                    previous = value;
                }
            }
            self.link(previous, body)?;
            bodies.push(body);
        }
        if !has_else {
            if let Some(after) = after.or(self.exit) {
                self.link(statement, after)?;
            }
        }

        self.push(VertexKind::SwitchStatement, local_next, false);
        for body in bodies {
            self.process_block(body, None)?;
        }
        self.frames.pop();
        Ok(())
    }
}
