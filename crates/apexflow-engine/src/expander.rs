//! Path discovery.
//!
//! Discovery enumerates the control-flow paths of a method, then resolves
//! every call-site on each path into the callee's own paths. A callee with
//! several paths forks the caller, one copy per callee path. A call-site
//! whose target is already being discovered further up the stack is marked
//! as recursion and the path stops resolving calls.
//!
//! The entry path additionally gets the instance initialization and
//! constructor paths of its class (for instance methods) and the static
//! initialization path of every class it executes code in or reads a static
//! member of.

use crate::context::WorkerContext;
use crate::error::PathError;
use crate::path::{ApexPath, ConditionOutcome};
use crate::resolver::{reference_qualifiers, CallTarget, MethodResolver};
use apexflow_core::{VertexId, VertexKind};
use apexflow_graph::{EdgeKind, ProgramGraph};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// One route through a method's `CfgPath` edges.
#[derive(Debug, Clone, Default)]
struct FlowRun {
    vertices: Vec<VertexId>,
    conditions: Vec<(VertexId, ConditionOutcome)>,
    /// Set once the route has taken an edge back to the method body.
    exited: bool,
}

/// Enumerates control-flow routes from the method body, depth first, up to
/// `limit`. The flag is set when routes were dropped. An edge back to the
/// body is the method exit and ends the route.
fn flow_runs(graph: &ProgramGraph, method: VertexId, limit: usize) -> (Vec<FlowRun>, bool) {
    let Some(body) = graph
        .children_of_kind(method, VertexKind::BlockStatement)
        .into_iter()
        .next()
    else {
        return (Vec::new(), false);
    };

    let mut runs = Vec::new();
    let mut pending = vec![FlowRun {
        vertices: vec![body],
        ..FlowRun::default()
    }];
    while let Some(run) = pending.pop() {
        if runs.len() >= limit {
            return (runs, true);
        }
        let Some(&last) = run.vertices.last() else {
            continue;
        };
        if run.exited {
            runs.push(run);
            continue;
        }
        let is_condition = graph.kind(last) == Some(VertexKind::StandardCondition);
        let mut branches = Vec::new();
        for next in graph.out_neighbors(last, EdgeKind::CfgPath) {
            if next != body && run.vertices.contains(&next) {
                continue;
            }
            let mut branch = run.clone();
            if is_condition {
                branch.conditions.push((last, outcome(graph, last, next)));
            }
            if next == body {
                branch.exited = true;
            } else {
                branch.vertices.push(next);
            }
            branches.push(branch);
        }
        if branches.is_empty() {
            runs.push(run);
            continue;
        }
        pending.extend(branches.into_iter().rev());
    }
    (runs, false)
}

/// Entering the block that the condition guards is the positive outcome.
fn outcome(graph: &ProgramGraph, condition: VertexId, target: VertexId) -> ConditionOutcome {
    let guarded = graph
        .parent(condition)
        .map(|parent| graph.children_of_kind(parent, VertexKind::BlockStatement))
        .unwrap_or_default();
    if guarded.contains(&target) {
        ConditionOutcome::Positive
    } else {
        ConditionOutcome::Negative
    }
}

/// Call-sites under a path vertex, arguments before the call that takes
/// them. Nested statements are skipped; they are path vertices themselves.
fn call_sites(graph: &ProgramGraph, vertex: VertexId, out: &mut Vec<VertexId>) {
    for child in graph.children(vertex) {
        let kind = graph.kind(child).unwrap_or(VertexKind::Unknown);
        if kind.is_control_flow() {
            continue;
        }
        call_sites(graph, child, out);
        if kind.is_invocable() {
            out.push(child);
        }
    }
}

/// (path vertex, call-site) pairs in execution order.
fn sites_of(graph: &ProgramGraph, vertices: &[VertexId]) -> Vec<(VertexId, VertexId)> {
    let mut pairs = Vec::new();
    for &top in vertices {
        let mut found = Vec::new();
        call_sites(graph, top, &mut found);
        pairs.extend(found.into_iter().map(|site| (top, site)));
    }
    pairs
}

/// Every class a path tree executes code in, plus the qualifiers of the
/// member references it reads. Qualifiers that do not name a class are
/// dropped later, when no declaration is found for them.
fn classes_in(graph: &ProgramGraph, path: &ApexPath, out: &mut Vec<String>) {
    let mut found = Vec::new();
    for vertex in path.vertices() {
        if let Some(class) = graph.vertex(*vertex).and_then(|v| v.defining_type()) {
            found.push(class.to_string());
        }
        reference_qualifiers(graph, *vertex, &mut found);
    }
    for class in found {
        if !out.iter().any(|c| c.eq_ignore_ascii_case(&class)) {
            out.push(class);
        }
    }
    for sub in path
        .invocable_paths
        .values()
        .chain(path.new_object_paths.values())
        .chain(path.constructor_path())
        .chain(path.instance_init_path())
    {
        classes_in(graph, sub, out);
    }
}

/// A path still under construction. Recursion and exception flags are
/// applied on `finalize`, after everything else has been attached.
#[derive(Debug)]
struct OpenPath {
    path: ApexPath,
    pending_recursion: Option<(VertexId, VertexId)>,
}

impl OpenPath {
    fn new(path: ApexPath) -> Self {
        Self {
            path,
            pending_recursion: None,
        }
    }

    /// No further call-sites are resolved once execution cannot come back.
    fn is_closed(&self) -> bool {
        self.pending_recursion.is_some() || self.path.is_recursion_terminated()
    }

    fn finalize(self, graph: &ProgramGraph) -> Result<ApexPath, PathError> {
        let mut path = self.path;
        if let Some((top_level, invocation)) = self.pending_recursion {
            path.put_recursion(top_level, invocation)?;
        }
        if let Some(&last) = path.vertices().last() {
            if graph.kind(last) == Some(VertexKind::ThrowStatement) {
                path.put_path_ends_in_exception(last, None)?;
            }
        }
        Ok(path)
    }
}

pub struct PathExpander<'c> {
    ctx: &'c mut WorkerContext,
    /// Methods being discovered, outermost first.
    stack: Vec<VertexId>,
}

impl<'c> PathExpander<'c> {
    pub fn new(ctx: &'c mut WorkerContext) -> Self {
        Self {
            ctx,
            stack: Vec::new(),
        }
    }

    fn graph(&self) -> &ProgramGraph {
        self.ctx.provider.graph()
    }

    fn limit(&self) -> usize {
        self.ctx.config.max_paths_per_method.max(1)
    }

    /// Discovers all paths of an entry method.
    pub fn expand(&mut self, method: VertexId) -> Result<Vec<ApexPath>, PathError> {
        self.stack.clear();
        self.ctx.provider.ensure_class_of(method)?;
        let (is_static, is_constructor, class) = {
            let vertex = self.graph().require(method)?;
            (
                vertex.is_static(),
                vertex.is_constructor(),
                vertex.defining_type().unwrap_or_default().to_string(),
            )
        };

        let mut open = self.discover_open(method)?;
        for entry in &mut open {
            if !is_static && !is_constructor {
                if let Some(init) = self.instance_init_path(&class)? {
                    entry.path.set_instance_init_path(init);
                }
                if let Some(constructor) = self.constructor_path(&class)? {
                    entry.path.set_constructor_path(constructor);
                }
            }
            self.attach_static_paths(&mut entry.path, &class)?;
        }

        let graph = self.ctx.provider.graph();
        let paths = open
            .into_iter()
            .map(|entry| entry.finalize(graph))
            .collect::<Result<Vec<_>, _>>()?;
        info!("Discovered {} paths for method {}", paths.len(), method);
        Ok(paths)
    }

    fn discover(&mut self, method: VertexId) -> Result<Vec<ApexPath>, PathError> {
        let open = self.discover_open(method)?;
        let graph = self.ctx.provider.graph();
        open.into_iter().map(|entry| entry.finalize(graph)).collect()
    }

    fn discover_open(&mut self, method: VertexId) -> Result<Vec<OpenPath>, PathError> {
        self.ctx.provider.ensure_class_of(method)?;
        let limit = self.limit();
        let (runs, truncated) = flow_runs(self.graph(), method, limit);
        if truncated {
            warn!("Method {} has more than {} paths, the rest are skipped", method, limit);
        }

        self.stack.push(method);
        let result = self.expand_runs(method, runs);
        self.stack.pop();
        result
    }

    fn expand_runs(&mut self, method: VertexId, runs: Vec<FlowRun>) -> Result<Vec<OpenPath>, PathError> {
        let limit = self.limit();
        let mut expanded = Vec::new();
        for run in runs {
            let mut path = ApexPath::new(self.ctx.ids.next_id(), Some(method));
            path.add_vertices(self.graph(), &run.vertices)?;
            for (condition, outcome) in run.conditions {
                path.set_condition(condition, outcome);
            }
            let sites = sites_of(self.graph(), &run.vertices);
            expanded.extend(self.resolve_sites(OpenPath::new(path), &sites)?);
            if expanded.len() >= limit {
                warn!("Method {} forks into more than {} paths, the rest are skipped", method, limit);
                expanded.truncate(limit);
                break;
            }
        }
        Ok(expanded)
    }

    /// Resolves call-sites in order, forking where a callee has several
    /// paths.
    fn resolve_sites(
        &mut self,
        open: OpenPath,
        sites: &[(VertexId, VertexId)],
    ) -> Result<Vec<OpenPath>, PathError> {
        let limit = self.limit();
        let mut working = vec![open];
        for &(top_level, site) in sites {
            let mut next = Vec::with_capacity(working.len());
            for mut current in working {
                if current.is_closed() {
                    next.push(current);
                    continue;
                }
                match MethodResolver::new(&mut self.ctx.provider).resolve(site)? {
                    CallTarget::Unresolved => next.push(current),
                    CallTarget::Method { method, .. } => {
                        if self.stack.contains(&method) {
                            debug!("Call-site {} re-enters method {}", site, method);
                            current.pending_recursion = Some((top_level, site));
                            next.push(current);
                            continue;
                        }
                        let callee = self.discover(method)?;
                        self.attach(current, top_level, site, callee, None, &mut next)?;
                    }
                    CallTarget::NewObject { class, constructor } => match constructor {
                        Some(constructor) if self.stack.contains(&constructor) => {
                            debug!("Call-site {} re-enters constructor {}", site, constructor);
                            current.pending_recursion = Some((top_level, site));
                            next.push(current);
                        }
                        Some(constructor) => {
                            let callee = self.discover(constructor)?;
                            self.attach(current, top_level, site, callee, Some(&class), &mut next)?;
                        }
                        None => {
                            if let Some(init) = self.instance_init_path(&class)? {
                                current.path.put_new_object_expression(site, init)?;
                            }
                            next.push(current);
                        }
                    },
                }
            }
            if next.len() > limit {
                warn!("Call-site {} forks into more than {} paths, the rest are skipped", site, limit);
                next.truncate(limit);
            }
            working = next;
        }
        Ok(working)
    }

    /// Registers each callee path on its own copy of `current`.
    fn attach(
        &mut self,
        current: OpenPath,
        top_level: VertexId,
        site: VertexId,
        callee: Vec<ApexPath>,
        new_object: Option<&str>,
        out: &mut Vec<OpenPath>,
    ) -> Result<(), PathError> {
        let mut copies = Vec::with_capacity(callee.len());
        for _ in 1..callee.len() {
            copies.push(self.fork(&current)?);
        }
        copies.push(current);

        if callee.is_empty() {
            // Bodiless callee: nothing to descend into, but a new object
            // still initializes its fields.
            let mut only = copies.pop();
            if let (Some(entry), Some(class)) = (only.as_mut(), new_object) {
                if let Some(init) = self.instance_init_path(class)? {
                    entry.path.put_new_object_expression(site, init)?;
                }
            }
            out.extend(only);
            return Ok(());
        }

        for (mut copy, sub) in copies.into_iter().zip(callee) {
            if let Some(class) = new_object {
                if let Some(init) = self.instance_init_path(class)? {
                    copy.path.put_new_object_expression(site, init)?;
                }
            }
            copy.path.put_invocable_expression(site, top_level, sub)?;
            out.push(copy);
        }
        Ok(())
    }

    /// A copy of an open path under a fresh id.
    fn fork(&mut self, source: &OpenPath) -> Result<OpenPath, PathError> {
        let mut path = source.path.deep_clone()?;
        path.stable_id = self.ctx.ids.next_id();
        debug!("Forked {} into {}", source.path.stable_id(), path.stable_id());
        Ok(OpenPath {
            path,
            pending_recursion: source.pending_recursion,
        })
    }

    fn instance_init_path(&mut self, class: &str) -> Result<Option<ApexPath>, PathError> {
        let fields = {
            let mut resolver = MethodResolver::new(&mut self.ctx.provider);
            match resolver.class(class)? {
                Some(declaration) => resolver.instance_fields(declaration),
                None => return Ok(None),
            }
        };
        self.init_path(fields, Vec::new(), None)
    }

    /// Static fields, then the first flow run of the static initializer.
    fn static_init_path(&mut self, class: &str) -> Result<Option<ApexPath>, PathError> {
        let (fields, initializer) = {
            let mut resolver = MethodResolver::new(&mut self.ctx.provider);
            match resolver.class(class)? {
                Some(declaration) => (
                    resolver.static_fields(declaration),
                    resolver.static_initializer(declaration),
                ),
                None => return Ok(None),
            }
        };
        let mut vertices = fields;
        let mut conditions = Vec::new();
        if let Some(initializer) = initializer {
            let (runs, _) = flow_runs(self.graph(), initializer, 1);
            if let Some(run) = runs.into_iter().next() {
                vertices.extend(run.vertices);
                conditions = run.conditions;
            }
        }
        self.init_path(vertices, conditions, initializer)
    }

    /// Builds an initialization path, keeping only the first fork.
    fn init_path(
        &mut self,
        vertices: Vec<VertexId>,
        conditions: Vec<(VertexId, ConditionOutcome)>,
        running: Option<VertexId>,
    ) -> Result<Option<ApexPath>, PathError> {
        if vertices.is_empty() {
            return Ok(None);
        }
        let mut path = ApexPath::new(self.ctx.ids.next_id(), None);
        path.add_vertices(self.graph(), &vertices)?;
        for (condition, outcome) in conditions {
            path.set_condition(condition, outcome);
        }
        let sites = sites_of(self.graph(), &vertices);

        self.stack.extend(running);
        let resolved = self.resolve_sites(OpenPath::new(path), &sites);
        if running.is_some() {
            self.stack.pop();
        }
        let first = resolved?.into_iter().next();
        match first {
            Some(entry) => Ok(Some(entry.finalize(self.ctx.provider.graph())?)),
            None => Ok(None),
        }
    }

    /// The zero-argument constructor's first path.
    fn constructor_path(&mut self, class: &str) -> Result<Option<ApexPath>, PathError> {
        let constructor = {
            let mut resolver = MethodResolver::new(&mut self.ctx.provider);
            match resolver.class(class)? {
                Some(declaration) => resolver.constructor(declaration, 0),
                None => None,
            }
        };
        match constructor {
            Some(constructor) if !self.stack.contains(&constructor) => {
                Ok(self.discover(constructor)?.into_iter().next())
            }
            _ => Ok(None),
        }
    }

    /// Registers the static initialization path of every class the tree
    /// executes code in, including classes reached only from other static
    /// initializers.
    fn attach_static_paths(&mut self, root: &mut ApexPath, class: &str) -> Result<(), PathError> {
        let mut queue = vec![class.to_string()];
        classes_in(self.graph(), root, &mut queue);
        let mut seen = BTreeSet::new();
        while let Some(class) = queue.pop() {
            if class.is_empty() || !seen.insert(class.to_lowercase()) {
                continue;
            }
            if let Some(path) = self.static_init_path(&class)? {
                classes_in(self.graph(), &path, &mut queue);
                root.put_static_initialization_path(&class, path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_for, if_statement, method_named};
    use apexflow_core::{keys, AstNode};

    #[test]
    fn test_if_return_gives_two_paths() {
        let class = AstNode::user_class("A").child(
            AstNode::method("m", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                if_statement(AstNode::variable("x"), vec![AstNode::new("ReturnStatement")]),
                AstNode::call_statement("System.out", vec![AstNode::literal(1)]),
            ])),
        );
        let mut ctx = context_for(vec![("A.cls", class)]);
        let m = method_named(&mut ctx, "A", "m");
        let paths = PathExpander::new(&mut ctx).expand(m).unwrap();
        assert_eq!(paths.len(), 2);

        let graph = ctx.graph();
        let mut outcomes = Vec::new();
        for path in &paths {
            let kinds: Vec<VertexKind> = path
                .vertices()
                .iter()
                .map(|v| graph.kind(*v).unwrap())
                .collect();
            if let Some(i) = kinds.iter().position(|k| *k == VertexKind::ReturnStatement) {
                assert_eq!(i, kinds.len() - 1);
            }
            assert_eq!(path.conditions().len(), 1);
            outcomes.extend(path.conditions().values().copied());
        }
        assert!(outcomes.contains(&ConditionOutcome::Positive));
        assert!(outcomes.contains(&ConditionOutcome::Negative));
    }

    #[test]
    fn test_if_last_in_method_keeps_false_path() {
        let class = AstNode::user_class("A").child(
            AstNode::method("m", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::call_statement("before", vec![]),
                if_statement(AstNode::variable("x"), vec![AstNode::call_statement("inside", vec![])]),
            ])),
        );
        let mut ctx = context_for(vec![("A.cls", class)]);
        let m = method_named(&mut ctx, "A", "m");
        let paths = PathExpander::new(&mut ctx).expand(m).unwrap();
        assert_eq!(paths.len(), 2);

        let graph = ctx.graph();
        let outcomes: Vec<ConditionOutcome> = paths
            .iter()
            .flat_map(|p| p.conditions().values().copied())
            .collect();
        assert_eq!(
            outcomes,
            vec![ConditionOutcome::Positive, ConditionOutcome::Negative]
        );
        let negative = &paths[1];
        let last = *negative.vertices().last().unwrap();
        assert_eq!(graph.kind(last), Some(VertexKind::StandardCondition));
        let body = graph.children_of_kind(m, VertexKind::BlockStatement)[0];
        assert_eq!(
            negative.vertices().iter().filter(|v| **v == body).count(),
            1
        );
    }

    #[test]
    fn test_callee_paths_fork_caller() {
        let class = AstNode::user_class("A")
            .child(
                AstNode::method("caller", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                    AstNode::call_statement("callee", vec![]),
                ])),
            )
            .child(
                AstNode::method("callee", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                    if_statement(AstNode::variable("x"), vec![AstNode::call_statement("log", vec![])]),
                    AstNode::call_statement("done", vec![]),
                ])),
            );
        let mut ctx = context_for(vec![("A.cls", class)]);
        let caller = method_named(&mut ctx, "A", "caller");
        let paths = PathExpander::new(&mut ctx).expand(caller).unwrap();

        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0].stable_id(), paths[1].stable_id());
        for path in &paths {
            assert_eq!(path.invocable_paths().len(), 1);
        }
        let callee_ids: BTreeSet<_> = paths
            .iter()
            .flat_map(|p| p.invocable_paths().values().map(ApexPath::stable_id))
            .collect();
        assert_eq!(callee_ids.len(), 2);
    }

    #[test]
    fn test_mutual_recursion_flagged_in_callee() {
        let class = AstNode::user_class("A")
            .child(
                AstNode::method("a", 0).with(keys::STATIC, true)
                    .child(AstNode::block(vec![AstNode::call_statement("b", vec![])])),
            )
            .child(
                AstNode::method("b", 0).with(keys::STATIC, true)
                    .child(AstNode::block(vec![AstNode::call_statement("a", vec![])])),
            );
        let mut ctx = context_for(vec![("A.cls", class)]);
        let a = method_named(&mut ctx, "A", "a");
        let paths = PathExpander::new(&mut ctx).expand(a).unwrap();

        assert_eq!(paths.len(), 1);
        let root = &paths[0];
        assert!(root.recursion().is_none());
        assert!(root.is_recursion_terminated());
        let b_path = root.invocable_paths().values().next().unwrap();
        let marker = b_path.recursion().unwrap();
        let flagged = ctx.graph().vertex(marker.invocation).unwrap();
        assert_eq!(flagged.str_property(keys::METHOD_NAME), Some("a"));
        assert!(matches!(
            b_path.resolve_invocable_call(marker.invocation),
            crate::path::CallResolution::Recursive(_)
        ));
    }

    #[test]
    fn test_three_cycle_flags_first_repeat() {
        let class = AstNode::user_class("A")
            .child(AstNode::method("a", 0).with(keys::STATIC, true)
                .child(AstNode::block(vec![AstNode::call_statement("b", vec![])])))
            .child(AstNode::method("b", 0).with(keys::STATIC, true)
                .child(AstNode::block(vec![AstNode::call_statement("c", vec![])])))
            .child(AstNode::method("c", 0).with(keys::STATIC, true)
                .child(AstNode::block(vec![AstNode::call_statement("a", vec![])])));
        let mut ctx = context_for(vec![("A.cls", class)]);
        let a = method_named(&mut ctx, "A", "a");
        let c = method_named(&mut ctx, "A", "c");
        let paths = PathExpander::new(&mut ctx).expand(a).unwrap();

        let b_path = paths[0].invocable_paths().values().next().unwrap();
        assert!(b_path.recursion().is_none());
        let c_path = b_path.invocable_paths().values().next().unwrap();
        assert_eq!(c_path.method(), Some(c));
        assert!(c_path.recursion().is_some());
    }

    #[test]
    fn test_path_limit() {
        let mut statements: Vec<AstNode> = (0..3)
            .map(|i| if_statement(AstNode::variable(&format!("x{}", i)), vec![AstNode::call_statement("log", vec![])]))
            .collect();
        statements.push(AstNode::call_statement("done", vec![]));
        let class = AstNode::user_class("A").child(
            AstNode::method("m", 0).with(keys::STATIC, true).child(AstNode::block(statements)),
        );
        let mut ctx = context_for(vec![("A.cls", class.clone())]);
        let m = method_named(&mut ctx, "A", "m");
        assert_eq!(PathExpander::new(&mut ctx).expand(m).unwrap().len(), 8);

        let mut ctx = context_for(vec![("A.cls", class)]);
        ctx.config.max_paths_per_method = 3;
        let m = method_named(&mut ctx, "A", "m");
        assert_eq!(PathExpander::new(&mut ctx).expand(m).unwrap().len(), 3);
    }

    #[test]
    fn test_throw_marks_path() {
        let class = AstNode::user_class("A").child(
            AstNode::method("m", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::new("ThrowStatement")
                    .child(AstNode::new("NewObjectExpression").with(keys::TYPE, "MyException")),
            ])),
        );
        let mut ctx = context_for(vec![("A.cls", class)]);
        let m = method_named(&mut ctx, "A", "m");
        let paths = PathExpander::new(&mut ctx).expand(m).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_terminated());
        assert_eq!(paths[0].throw_statement(), paths[0].vertices().last().copied());
    }

    #[test]
    fn test_instance_method_gets_initialization_paths() {
        let class = AstNode::user_class("A")
            .child(AstNode::new("Field").with(keys::NAME, "LIMIT").with(keys::STATIC, true)
                .child(AstNode::literal(5)))
            .child(AstNode::new("Field").with(keys::NAME, "name"))
            .child(AstNode::method("run", 0).child(AstNode::block(vec![
                AstNode::call_statement("log", vec![]),
            ])));
        let mut ctx = context_for(vec![("A.cls", class)]);
        let run = method_named(&mut ctx, "A", "run");
        let paths = PathExpander::new(&mut ctx).expand(run).unwrap();

        let root = &paths[0];
        assert_eq!(root.instance_init_path().unwrap().vertices().len(), 1);
        assert!(root.constructor_path().unwrap().method().is_some());
        assert_eq!(root.static_init_path("a").unwrap().vertices().len(), 1);
        assert_eq!(root.static_init_paths().len(), 1);
    }

    #[test]
    fn test_new_object_registers_constructor_and_fields() {
        let item = AstNode::user_class("Item")
            .child(AstNode::new("Field").with(keys::NAME, "label"))
            .child(AstNode::method("Item", 0).with(keys::CONSTRUCTOR, true).child(AstNode::block(vec![
                AstNode::call_statement("log", vec![]),
            ])));
        let user = AstNode::user_class("User").child(
            AstNode::method("make", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::new("ExpressionStatement")
                    .child(AstNode::new("NewObjectExpression").with(keys::TYPE, "Item")),
            ])),
        );
        let mut ctx = context_for(vec![("Item.cls", item), ("User.cls", user)]);
        let make = method_named(&mut ctx, "User", "make");
        let paths = PathExpander::new(&mut ctx).expand(make).unwrap();

        let root = &paths[0];
        let (&site, constructor) = root.invocable_paths().iter().next().unwrap();
        assert!(ctx.graph().vertex(constructor.method().unwrap()).unwrap().is_constructor());
        assert_eq!(root.new_object_path(site).unwrap().vertices().len(), 1);
    }

    #[test]
    fn test_static_field_reference_attaches_static_init() {
        let config = AstNode::user_class("Config").child(
            AstNode::new("Field")
                .with(keys::NAME, "LIMIT")
                .with(keys::STATIC, true)
                .child(AstNode::literal(5)),
        );
        let a = AstNode::user_class("A").child(
            AstNode::method("run", 0).with(keys::STATIC, true).child(AstNode::block(vec![
                AstNode::new("ExpressionStatement").child(AstNode::call(
                    "System.debug",
                    vec![AstNode::static_reference("Config", "LIMIT")],
                )),
                AstNode::new("ExpressionStatement")
                    .child(AstNode::static_reference("someLocal", "size")),
            ])),
        );
        let mut ctx = context_for(vec![("Config.cls", config), ("A.cls", a)]);
        let run = method_named(&mut ctx, "A", "run");
        let paths = PathExpander::new(&mut ctx).expand(run).unwrap();

        let keys: Vec<&String> = paths[0].static_init_paths().keys().collect();
        assert_eq!(keys, vec!["config"]);
        let init = paths[0].static_init_path("Config").unwrap();
        let field = ctx.graph().vertex(init.vertices()[0]).unwrap();
        assert_eq!(field.name(), Some("LIMIT"));
    }
}
