//! Depth-first walking of discovered paths.
//!
//! The walker replays a path tree against two visitors. Static scopes are
//! initialized before a class's code first runs or one of its static members
//! is read, instance and constructor paths run before an instance method's
//! body, and each resolved call-site is entered in place. A throw ends the
//! whole walk.
//!
//! The symbol provider can also ask for a class's static scope while it
//! visits a vertex, through [`StaticScopes`]. An unseen class is initialized
//! on the spot.

use crate::context::CancellationToken;
use crate::error::PathError;
use crate::path::{ApexPath, CallResolution, PathVertex};
use crate::resolver::{class_vertex, reference_qualifier};
use crate::scope::{ClassStaticScope, StaticScopeState};
use crate::visitor::{PathVertexVisitor, SymbolProviderVisitor};
use apexflow_core::{VertexId, VertexKind};
use apexflow_graph::ProgramGraph;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::ControlFlow;
use tracing::{debug, info};

/// How a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WalkOutcome {
    Completed,
    /// A throw statement was reached. Nothing after it was visited.
    TerminatedByThrow { vertex: VertexId },
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum Halt {
    Throw(VertexId),
    Cancelled,
}

type Flow = Result<ControlFlow<Halt>, PathError>;

/// Whether each visitor still wants to see the current part of the tree.
#[derive(Debug, Clone, Copy)]
struct Listening {
    symbols: bool,
    rules: bool,
}

impl Listening {
    const BOTH: Listening = Listening {
        symbols: true,
        rules: true,
    };
}

pub struct ApexPathWalker<'w> {
    state: WalkState<'w>,
    symbols: &'w mut dyn SymbolProviderVisitor,
    rules: &'w mut dyn PathVertexVisitor,
}

impl<'w> ApexPathWalker<'w> {
    pub fn new(
        graph: &'w ProgramGraph,
        cancellation: CancellationToken,
        symbols: &'w mut dyn SymbolProviderVisitor,
        rules: &'w mut dyn PathVertexVisitor,
    ) -> Self {
        Self {
            state: WalkState {
                graph,
                cancellation,
                scopes: HashMap::new(),
            },
            symbols,
            rules,
        }
    }

    /// The static scope of a class as of the current walk.
    pub fn static_scope(&self, class: &str) -> Option<&ClassStaticScope> {
        self.state.scopes.get(&class.to_lowercase())
    }

    /// Walks a top-level path.
    pub fn walk(&mut self, root: &ApexPath) -> Result<WalkOutcome, PathError> {
        self.state.scopes.clear();
        debug!("Walking {}", root.stable_id());
        let flow = self.state.walk_root(root, &mut *self.symbols, &mut *self.rules)?;
        let outcome = match flow {
            ControlFlow::Continue(()) => WalkOutcome::Completed,
            ControlFlow::Break(Halt::Throw(vertex)) => WalkOutcome::TerminatedByThrow { vertex },
            ControlFlow::Break(Halt::Cancelled) => {
                info!("Walk of {} cancelled", root.stable_id());
                WalkOutcome::Cancelled
            }
        };
        debug!("Walk of {} ended: {:?}", root.stable_id(), outcome);
        Ok(outcome)
    }
}

/// Static scope access handed to [`SymbolProviderVisitor::visit`].
pub struct StaticScopes<'a, 'w> {
    state: &'a mut WalkState<'w>,
    root: &'a ApexPath,
    rules: &'a mut dyn PathVertexVisitor,
    halt: Option<Halt>,
    error: Option<PathError>,
}

impl StaticScopes<'_, '_> {
    /// The scope as of now. Initializes nothing.
    pub fn get(&self, class: &str) -> Option<&ClassStaticScope> {
        self.state.scopes.get(&class.to_lowercase())
    }

    /// Looks up a class's static scope, walking its static initialization
    /// first when this walk has not seen the class. A scope that is still
    /// initializing is returned as is.
    ///
    /// Returns `None` for names that are not classes, and when the
    /// initialization walk threw, was cancelled or failed. The walk then
    /// stops once the current callback returns.
    pub fn class_static_scope(
        &mut self,
        symbols: &mut dyn SymbolProviderVisitor,
        class: &str,
    ) -> Option<&ClassStaticScope> {
        if self.halt.is_some() || self.error.is_some() {
            return None;
        }
        if !self.state.is_class(self.root, class) {
            return None;
        }
        match self
            .state
            .ensure_static_scope(self.root, class, symbols, &mut *self.rules)
        {
            Ok(ControlFlow::Continue(())) => self.get(class),
            Ok(ControlFlow::Break(halt)) => {
                self.halt = Some(halt);
                None
            }
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }

    fn into_flow(self) -> Flow {
        match (self.error, self.halt) {
            (Some(e), _) => Err(e),
            (None, Some(halt)) => Ok(ControlFlow::Break(halt)),
            (None, None) => Ok(ControlFlow::Continue(())),
        }
    }
}

struct WalkState<'w> {
    graph: &'w ProgramGraph,
    cancellation: CancellationToken,
    /// Keyed by lowercase class name. Cleared at the start of each walk.
    scopes: HashMap<String, ClassStaticScope>,
}

impl<'w> WalkState<'w> {
    fn is_class(&self, root: &ApexPath, name: &str) -> bool {
        root.static_init_path(name).is_some() || class_vertex(self.graph, name).is_some()
    }

    fn walk_root(
        &mut self,
        root: &ApexPath,
        symbols: &mut dyn SymbolProviderVisitor,
        rules: &mut dyn PathVertexVisitor,
    ) -> Flow {
        let graph = self.graph;
        let method = match root.method() {
            Some(method) => Some(graph.require(method)?),
            None => None,
        };

        if let Some(class) = method.and_then(|m| m.defining_type()) {
            if let ControlFlow::Break(halt) = self.ensure_static_scope(root, class, symbols, rules)? {
                return Ok(ControlFlow::Break(halt));
            }
        }

        let on_instance = method.map(|m| !m.is_static()).unwrap_or(false);
        if on_instance {
            if let Some(init) = root.instance_init_path() {
                if let ControlFlow::Break(halt) = self.walk_path(root, init, symbols, rules)? {
                    return Ok(ControlFlow::Break(halt));
                }
            }
            if let Some(constructor) = root.constructor_path() {
                symbols.push_indeterminate_scope();
                let flow = self.walk_path(root, constructor, symbols, rules);
                symbols.pop_indeterminate_scope();
                if let ControlFlow::Break(halt) = flow? {
                    return Ok(ControlFlow::Break(halt));
                }
            }
        }

        self.walk_path(root, root, symbols, rules)
    }

    /// Walks a class's static initialization once per walk. A request made
    /// while that walk is in progress returns at once.
    fn ensure_static_scope(
        &mut self,
        root: &ApexPath,
        class: &str,
        symbols: &mut dyn SymbolProviderVisitor,
        rules: &mut dyn PathVertexVisitor,
    ) -> Flow {
        let key = class.to_lowercase();
        if self.scopes.contains_key(&key) {
            return Ok(ControlFlow::Continue(()));
        }
        let mut scope = ClassStaticScope::new(class);
        scope.state = StaticScopeState::Initializing;
        symbols.static_scope_changed(&scope);
        self.scopes.insert(key.clone(), scope);

        let mut fields = Vec::new();
        if let Some(path) = root.static_init_path(class) {
            if let ControlFlow::Break(halt) = self.walk_path(root, path, symbols, rules)? {
                return Ok(ControlFlow::Break(halt));
            }
            let graph = self.graph;
            fields = path
                .vertices()
                .iter()
                .filter_map(|id| graph.vertex(*id))
                .filter(|v| v.kind == VertexKind::Field)
                .filter_map(|v| v.name().map(str::to_string))
                .collect();
        }

        if let Some(scope) = self.scopes.get_mut(&key) {
            scope.fields = fields;
            scope.state = StaticScopeState::Initialized;
            symbols.static_scope_changed(scope);
        }
        Ok(ControlFlow::Continue(()))
    }

    fn walk_path(
        &mut self,
        root: &ApexPath,
        path: &ApexPath,
        symbols: &mut dyn SymbolProviderVisitor,
        rules: &mut dyn PathVertexVisitor,
    ) -> Flow {
        let graph = self.graph;
        if let Some(method) = path.method() {
            if let Some(class) = graph.vertex(method).and_then(|m| m.defining_type()) {
                if let ControlFlow::Break(halt) = self.ensure_static_scope(root, class, symbols, rules)? {
                    return Ok(ControlFlow::Break(halt));
                }
            }
        }
        for &vertex in path.vertices() {
            if let ControlFlow::Break(halt) =
                self.walk_vertex(root, path, vertex, Listening::BOTH, symbols, rules)?
            {
                return Ok(ControlFlow::Break(halt));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Every hook of a visitor is gated on that visitor's own flag.
    fn walk_vertex(
        &mut self,
        root: &ApexPath,
        path: &ApexPath,
        id: VertexId,
        listening: Listening,
        symbols: &mut dyn SymbolProviderVisitor,
        rules: &mut dyn PathVertexVisitor,
    ) -> Flow {
        if self.cancellation.is_cancelled() {
            return Ok(ControlFlow::Break(Halt::Cancelled));
        }
        let Listening {
            symbols: symbols_on,
            rules: rules_on,
        } = listening;
        let graph = self.graph;
        let vertex = graph.require(id)?;
        let at = PathVertex {
            path_id: path.stable_id(),
            vertex: id,
        };

        let resolution = if vertex.kind.is_invocable() {
            path.resolve_invocable_call(id)
        } else {
            CallResolution::Unresolved
        };
        if let CallResolution::Recursive(owner) = resolution {
            if rules_on {
                rules.recursion_detected(&at, vertex, owner);
            }
            return Ok(ControlFlow::Continue(()));
        }

        // A static member is read: its class is initialized first.
        if let Some(qualifier) = reference_qualifier(graph, id) {
            if self.is_class(root, &qualifier) {
                if let ControlFlow::Break(halt) = self.ensure_static_scope(root, &qualifier, symbols, rules)? {
                    return Ok(ControlFlow::Break(halt));
                }
            }
        }

        let pushed = symbols_on && symbols.push_scope(vertex);
        let descend_symbols = if symbols_on {
            let mut scopes = StaticScopes {
                state: &mut *self,
                root,
                rules: &mut *rules,
                halt: None,
                error: None,
            };
            let descend = symbols.visit(vertex, &mut scopes);
            if let ControlFlow::Break(halt) = scopes.into_flow()? {
                return Ok(ControlFlow::Break(halt));
            }
            descend
        } else {
            false
        };
        let descend_rules = rules_on && rules.visit(&at, vertex);

        if descend_symbols || descend_rules {
            for child in graph.children(id) {
                let is_flow = graph.kind(child).map(|k| k.is_control_flow()).unwrap_or(false);
                if is_flow {
                    continue;
                }
                let below = Listening {
                    symbols: descend_symbols,
                    rules: descend_rules,
                };
                if let ControlFlow::Break(halt) =
                    self.walk_vertex(root, path, child, below, symbols, rules)?
                {
                    return Ok(ControlFlow::Break(halt));
                }
            }
        }

        if let Some(init) = path.new_object_path(id) {
            if let ControlFlow::Break(halt) = self.walk_path(root, init, symbols, rules)? {
                return Ok(ControlFlow::Break(halt));
            }
        }
        if let CallResolution::Path(sub) = resolution {
            let method = sub.method().ok_or(PathError::MissingMethod(sub.stable_id()))?;
            if symbols_on {
                symbols.before_method_call(vertex, method);
            }
            if rules_on {
                rules.before_method_call(&at, vertex, sub);
            }
            if let ControlFlow::Break(halt) = self.walk_path(root, sub, symbols, rules)? {
                return Ok(ControlFlow::Break(halt));
            }
            if rules_on {
                rules.after_method_call(&at, vertex, sub);
            }
            if symbols_on {
                symbols.after_method_call(vertex, method);
            }
        }

        if symbols_on {
            symbols.after_visit(vertex);
        }
        if rules_on {
            rules.after_visit(&at, vertex);
        }
        if pushed {
            symbols.pop_scope(vertex);
        }

        if vertex.kind == VertexKind::ThrowStatement {
            return Ok(ControlFlow::Break(Halt::Throw(id)));
        }
        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::PathExpander;
    use crate::testing::{context_for, if_statement, method_named};
    use crate::visitor::{NoopSymbolProvider, RecordingVisitor};
    use apexflow_core::{keys, AstNode};

    #[derive(Default)]
    struct ScopeLog {
        changes: Vec<(String, StaticScopeState)>,
        indeterminate: usize,
        calls: Vec<VertexId>,
    }

    impl SymbolProviderVisitor for ScopeLog {
        fn static_scope_changed(&mut self, scope: &ClassStaticScope) {
            self.changes.push((scope.class_name.clone(), scope.state));
        }

        fn push_indeterminate_scope(&mut self) {
            self.indeterminate += 1;
        }

        fn before_method_call(&mut self, _invocation: &apexflow_core::Vertex, method: VertexId) {
            self.calls.push(method);
        }
    }

    fn walk_all(
        ctx: &crate::context::WorkerContext,
        paths: &[ApexPath],
    ) -> Vec<(WalkOutcome, RecordingVisitor)> {
        paths
            .iter()
            .map(|path| {
                let mut symbols = NoopSymbolProvider;
                let mut rules = RecordingVisitor::new();
                let outcome = ApexPathWalker::new(ctx.graph(), ctx.cancellation.clone(), &mut symbols, &mut rules)
                    .walk(path)
                    .unwrap();
                (outcome, rules)
            })
            .collect()
    }

    #[test]
    fn test_return_is_never_followed_by_a_statement() {
        let class = AstNode::user_class("A").child(
            AstNode::method("m", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                if_statement(AstNode::variable("x"), vec![AstNode::new("ReturnStatement")]),
                AstNode::call_statement("System.out", vec![AstNode::literal(1)]),
            ])),
        );
        let mut ctx = context_for(vec![("A.cls", class)]);
        let m = method_named(&mut ctx, "A", "m");
        let paths = PathExpander::new(&mut ctx).expand(m).unwrap();

        let walks = walk_all(&ctx, &paths);
        assert_eq!(walks.len(), 2);
        let mut saw_return = false;
        let mut saw_call = false;
        for (outcome, rules) in &walks {
            assert_eq!(*outcome, WalkOutcome::Completed);
            let returns = rules.count_of(VertexKind::ReturnStatement);
            let calls = rules.count_of(VertexKind::MethodCallExpression);
            assert!(returns == 0 || calls == 0);
            saw_return |= returns == 1;
            saw_call |= calls == 1;
        }
        assert!(saw_return && saw_call);
    }

    #[test]
    fn test_recursion_callback_fires_once() {
        let class = AstNode::user_class("A")
            .child(AstNode::method("a", 0).with(keys::STATIC, true)
                .child(AstNode::block(vec![AstNode::call_statement("b", vec![])])))
            .child(AstNode::method("b", 0).with(keys::STATIC, true)
                .child(AstNode::block(vec![AstNode::call_statement("a", vec![])])));
        let mut ctx = context_for(vec![("A.cls", class)]);
        let a = method_named(&mut ctx, "A", "a");
        let b = method_named(&mut ctx, "A", "b");
        let paths = PathExpander::new(&mut ctx).expand(a).unwrap();

        let walks = walk_all(&ctx, &paths);
        let (outcome, rules) = &walks[0];
        assert_eq!(*outcome, WalkOutcome::Completed);
        assert_eq!(rules.recursions.len(), 1);
        assert_eq!(rules.calls.len(), 1);
        assert_eq!(rules.returns_from_calls, 1);
        let flagged = ctx.graph().vertex(rules.recursions[0]).unwrap();
        assert_eq!(ctx.graph().vertex(b).unwrap().name(), Some("b"));
        assert_eq!(flagged.defining_type(), Some("A"));
        assert_eq!(flagged.str_property(keys::METHOD_NAME), Some("a"));
    }

    #[test]
    fn test_static_scope_initialized_once_per_walk() {
        let counter = AstNode::user_class("Counter")
            .child(AstNode::new("Field").with(keys::NAME, "count").with(keys::STATIC, true)
                .child(AstNode::literal(5)))
            .child(AstNode::method("one", 0).child(AstNode::block(vec![
                AstNode::call_statement("log", vec![]),
            ])))
            .child(AstNode::method("two", 0).child(AstNode::block(vec![
                AstNode::call_statement("log", vec![]),
            ])))
            .child(AstNode::method("run", 0).child(AstNode::block(vec![
                AstNode::call_statement("one", vec![]),
                AstNode::call_statement("two", vec![]),
            ])));
        let mut ctx = context_for(vec![("Counter.cls", counter)]);
        let run = method_named(&mut ctx, "Counter", "run");
        let paths = PathExpander::new(&mut ctx).expand(run).unwrap();
        assert_eq!(paths.len(), 1);

        let mut symbols = ScopeLog::default();
        let mut rules = RecordingVisitor::new();
        let mut walker = ApexPathWalker::new(ctx.graph(), ctx.cancellation.clone(), &mut symbols, &mut rules);
        assert_eq!(walker.walk(&paths[0]).unwrap(), WalkOutcome::Completed);
        let scope = walker.static_scope("counter").unwrap();
        assert!(scope.is_initialized());
        assert_eq!(scope.fields, vec!["count".to_string()]);
        drop(walker);

        assert_eq!(
            symbols.changes,
            vec![
                ("Counter".to_string(), StaticScopeState::Initializing),
                ("Counter".to_string(), StaticScopeState::Initialized),
            ]
        );
        assert_eq!(symbols.indeterminate, 1);
        assert_eq!(symbols.calls.len(), 2);

        // The static field is visited before the instance method body.
        let first_field = rules.kinds.iter().position(|k| *k == VertexKind::Field).unwrap();
        let first_call = rules
            .kinds
            .iter()
            .position(|k| *k == VertexKind::MethodCallExpression)
            .unwrap();
        assert!(first_field < first_call);
    }

    #[test]
    fn test_throw_in_callee_stops_walk() {
        let class = AstNode::user_class("A")
            .child(AstNode::method("fail", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::new("ThrowStatement")
                    .child(AstNode::new("NewObjectExpression").with(keys::TYPE, "MyException")),
            ])))
            .child(AstNode::method("m", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::call_statement("fail", vec![]),
                AstNode::call_statement("after", vec![]),
            ])));
        let mut ctx = context_for(vec![("A.cls", class)]);
        let m = method_named(&mut ctx, "A", "m");
        let paths = PathExpander::new(&mut ctx).expand(m).unwrap();
        assert!(paths[0].ends_in_exception());

        let walks = walk_all(&ctx, &paths);
        let (outcome, rules) = &walks[0];
        let thrown = paths[0].throw_statement().unwrap();
        assert_eq!(*outcome, WalkOutcome::TerminatedByThrow { vertex: thrown });
        let after_visited = rules.visited.iter().any(|v| {
            ctx.graph().vertex(v.vertex).and_then(|x| x.str_property(keys::METHOD_NAME)) == Some("after")
        });
        assert!(!after_visited);
        assert_eq!(rules.returns_from_calls, 0);
    }

    #[test]
    fn test_cancelled_walk_stops_at_first_vertex() {
        let class = AstNode::user_class("A").child(
            AstNode::method("m", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::call_statement("log", vec![]),
            ])),
        );
        let mut ctx = context_for(vec![("A.cls", class)]);
        let m = method_named(&mut ctx, "A", "m");
        let paths = PathExpander::new(&mut ctx).expand(m).unwrap();
        ctx.cancellation.cancel();

        let walks = walk_all(&ctx, &paths);
        let (outcome, rules) = &walks[0];
        assert_eq!(*outcome, WalkOutcome::Cancelled);
        assert!(rules.visited.is_empty());
    }

    #[test]
    fn test_suppressed_children_still_reach_other_visitor() {
        struct SkipChildren;
        impl SymbolProviderVisitor for SkipChildren {
            fn visit(&mut self, _vertex: &apexflow_core::Vertex, _scopes: &mut StaticScopes<'_, '_>) -> bool {
                false
            }
        }

        let class = AstNode::user_class("A").child(
            AstNode::method("m", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::call_statement("log", vec![AstNode::literal(1)]),
            ])),
        );
        let mut ctx = context_for(vec![("A.cls", class)]);
        let m = method_named(&mut ctx, "A", "m");
        let paths = PathExpander::new(&mut ctx).expand(m).unwrap();

        let mut symbols = SkipChildren;
        let mut rules = RecordingVisitor::new();
        ApexPathWalker::new(ctx.graph(), ctx.cancellation.clone(), &mut symbols, &mut rules)
            .walk(&paths[0])
            .unwrap();
        assert_eq!(rules.count_of(VertexKind::LiteralExpression), 1);
    }

    #[test]
    fn test_call_hooks_follow_each_visitors_own_flag() {
        #[derive(Default)]
        struct Declining {
            calls: usize,
        }
        impl SymbolProviderVisitor for Declining {
            fn visit(&mut self, _vertex: &apexflow_core::Vertex, _scopes: &mut StaticScopes<'_, '_>) -> bool {
                false
            }

            fn before_method_call(&mut self, _invocation: &apexflow_core::Vertex, _method: VertexId) {
                self.calls += 1;
            }
        }

        let class = AstNode::user_class("A")
            .child(AstNode::method("m", 0).with(keys::STATIC, true)
                .child(AstNode::block(vec![AstNode::call_statement("helper", vec![])])))
            .child(AstNode::method("helper", 0).with(keys::STATIC, true)
                .child(AstNode::block(vec![AstNode::call_statement("log", vec![])])));
        let mut ctx = context_for(vec![("A.cls", class)]);
        let m = method_named(&mut ctx, "A", "m");
        let paths = PathExpander::new(&mut ctx).expand(m).unwrap();

        let mut symbols = Declining::default();
        let mut rules = RecordingVisitor::new();
        ApexPathWalker::new(ctx.graph(), ctx.cancellation.clone(), &mut symbols, &mut rules)
            .walk(&paths[0])
            .unwrap();
        assert_eq!(symbols.calls, 0);
        assert_eq!(rules.calls.len(), 1);
        assert_eq!(rules.returns_from_calls, 1);
    }

    fn config_and_reader() -> crate::context::WorkerContext {
        let config = AstNode::user_class("Config").child(
            AstNode::new("Field")
                .with(keys::NAME, "LIMIT")
                .with(keys::STATIC, true)
                .child(AstNode::literal(5)),
        );
        let reader = AstNode::user_class("A").child(
            AstNode::method("run", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::call_statement("log", vec![]),
                AstNode::new("ExpressionStatement")
                    .child(AstNode::static_reference("Config", "LIMIT")),
            ])),
        );
        context_for(vec![("Config.cls", config), ("A.cls", reader)])
    }

    #[test]
    fn test_static_member_read_initializes_its_class() {
        let mut ctx = config_and_reader();
        let run = method_named(&mut ctx, "A", "run");
        let paths = PathExpander::new(&mut ctx).expand(run).unwrap();

        let mut symbols = ScopeLog::default();
        let mut rules = RecordingVisitor::new();
        let mut walker = ApexPathWalker::new(ctx.graph(), ctx.cancellation.clone(), &mut symbols, &mut rules);
        assert_eq!(walker.walk(&paths[0]).unwrap(), WalkOutcome::Completed);
        let scope = walker.static_scope("CONFIG").unwrap();
        assert!(scope.is_initialized());
        assert_eq!(scope.fields, vec!["LIMIT".to_string()]);
        drop(walker);

        let config_changes: Vec<StaticScopeState> = symbols
            .changes
            .iter()
            .filter(|(class, _)| class == "Config")
            .map(|(_, state)| *state)
            .collect();
        assert_eq!(
            config_changes,
            vec![StaticScopeState::Initializing, StaticScopeState::Initialized]
        );

        // The call runs first, then the class is initialized, then it is read.
        let position = |kind| rules.kinds.iter().position(|k| *k == kind).unwrap();
        assert!(position(VertexKind::MethodCallExpression) < position(VertexKind::Field));
        assert!(position(VertexKind::Field) < position(VertexKind::VariableExpression));
    }

    #[test]
    fn test_symbol_provider_requests_static_scope() {
        #[derive(Default)]
        struct Requester {
            answers: Vec<Option<StaticScopeState>>,
            changes: usize,
        }
        impl SymbolProviderVisitor for Requester {
            fn visit(&mut self, vertex: &apexflow_core::Vertex, scopes: &mut StaticScopes<'_, '_>) -> bool {
                if vertex.kind == VertexKind::MethodCallExpression {
                    let config = scopes.class_static_scope(self, "config").map(|s| s.state);
                    self.answers.push(config);
                    let unknown = scopes.class_static_scope(self, "NoSuchClass").map(|s| s.state);
                    self.answers.push(unknown);
                }
                true
            }

            fn static_scope_changed(&mut self, _scope: &ClassStaticScope) {
                self.changes += 1;
            }
        }

        let mut ctx = config_and_reader();
        let run = method_named(&mut ctx, "A", "run");
        let paths = PathExpander::new(&mut ctx).expand(run).unwrap();

        let mut symbols = Requester::default();
        let mut rules = RecordingVisitor::new();
        let outcome = ApexPathWalker::new(ctx.graph(), ctx.cancellation.clone(), &mut symbols, &mut rules)
            .walk(&paths[0])
            .unwrap();
        assert_eq!(outcome, WalkOutcome::Completed);
        assert_eq!(
            symbols.answers,
            vec![Some(StaticScopeState::Initialized), None]
        );
        // A and Config, two transitions each; the later read reuses the scope.
        assert_eq!(symbols.changes, 4);

        // Config was initialized while the call was being visited.
        let position = |kind| rules.kinds.iter().position(|k| *k == kind).unwrap();
        assert!(position(VertexKind::Field) < position(VertexKind::MethodCallExpression));
    }

    #[test]
    fn test_static_blocks_run_in_source_order_before_instance_method() {
        let clinit = AstNode::method(apexflow_graph::synthesis::STATIC_INITIALIZER, 0)
            .with(keys::STATIC, true)
            .with_children(vec![
                AstNode::block(vec![AstNode::call_statement("first", vec![])]),
                AstNode::block(vec![AstNode::call_statement("second", vec![])]),
            ]);
        let class = AstNode::user_class("S").child(clinit).child(
            AstNode::method("run", 0).child(AstNode::block(vec![AstNode::call_statement("log", vec![])])),
        );
        let mut ctx = context_for(vec![("S.cls", class)]);
        let run = method_named(&mut ctx, "S", "run");
        let paths = PathExpander::new(&mut ctx).expand(run).unwrap();
        assert_eq!(paths.len(), 1);

        let walks = walk_all(&ctx, &paths);
        let (outcome, rules) = &walks[0];
        assert_eq!(*outcome, WalkOutcome::Completed);
        let graph = ctx.graph();
        let called: Vec<&str> = rules
            .visited
            .iter()
            .filter_map(|at| graph.vertex(at.vertex))
            .filter(|v| v.kind == VertexKind::MethodCallExpression)
            .filter_map(|v| v.str_property(keys::METHOD_NAME))
            .collect();
        assert_eq!(
            called,
            vec!["SyntheticStaticBlock_0", "first", "SyntheticStaticBlock_1", "second", "log"]
        );
    }
}
