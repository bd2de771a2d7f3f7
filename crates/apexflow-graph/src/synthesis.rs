//! AST rewrites applied before a class is emitted as vertices.
//!
//! - classes without a constructor get an implicit zero-argument one
//! - implicit constructors without a body get an empty one
//! - constructors of subclasses start with `super()` unless they already
//!   delegate through `this(...)` or `super(...)`
//! - a static initializer with several `static { }` blocks is split into one
//!   synthetic method per block plus an invoker that calls them in order

use apexflow_core::{keys, AstNode};
use tracing::debug;

pub const STATIC_INITIALIZER: &str = "<clinit>";
pub const STATIC_BLOCK_PREFIX: &str = "SyntheticStaticBlock_";
pub const STATIC_BLOCK_INVOKER: &str = "SyntheticStaticBlockInvoker";

/// Applies every rewrite to a file root and to all nested classes.
pub fn synthesize(root: &mut AstNode) {
    if root.is("UserClass") {
        synthesize_class(root);
    }
    for child in root.children.iter_mut() {
        synthesize(child);
    }
}

fn synthesize_class(class: &mut AstNode) {
    let class_name = class.str_prop(keys::NAME).unwrap_or_default().to_string();
    let has_super = class
        .str_prop(keys::SUPER_CLASS_NAME)
        .map(|s| !s.is_empty())
        .unwrap_or(false);

    let has_constructor = class
        .children
        .iter()
        .any(|c| c.is("Method") && c.bool_prop(keys::CONSTRUCTOR));
    if !has_constructor {
        debug!("Synthesizing default constructor for {}", class_name);
        let line = class.properties.get(keys::BEGIN_LINE).cloned();
        let mut ctor = AstNode::method(&class_name, 0)
            .with(keys::CONSTRUCTOR, true)
            .with(keys::IMPLICIT, true)
            .with(keys::SYNTHETIC, true);
        if let Some(line) = line {
            ctor.set(keys::BEGIN_LINE, line);
        }
        append_child(class, ctor);
    }

    for method in class.children.iter_mut() {
        if method.is("Method") && method.bool_prop(keys::CONSTRUCTOR) {
            synthesize_constructor_body(method, has_super);
        }
    }

    split_static_blocks(class, &class_name);
}

fn synthesize_constructor_body(ctor: &mut AstNode, has_super: bool) {
    let line = ctor.properties.get(keys::BEGIN_LINE).cloned();
    let has_body = ctor.children.iter().any(|c| c.is("BlockStatement"));
    if !has_body {
        if !ctor.bool_prop(keys::IMPLICIT) {
            return;
        }
        let mut body = AstNode::block(vec![]).with(keys::SYNTHETIC, true);
        if let Some(line) = &line {
            body.set(keys::BEGIN_LINE, line.clone());
        }
        append_child(ctor, body);
    }
    if !has_super {
        return;
    }

    let Some(body) = ctor.children.iter_mut().find(|c| c.is("BlockStatement")) else {
        return;
    };
    let delegates = body
        .children
        .first()
        .map(is_delegating_call)
        .unwrap_or(false);
    if delegates {
        return;
    }

    let mut call = AstNode::new("SuperMethodCallExpression")
        .with(keys::METHOD_NAME, "super")
        .with(keys::FULL_METHOD_NAME, "super")
        .with(keys::ARITY, 0)
        .with(keys::SYNTHETIC, true);
    let mut statement = AstNode::new("ExpressionStatement").with(keys::SYNTHETIC, true);
    if let Some(line) = line {
        call.set(keys::BEGIN_LINE, line.clone());
        statement.set(keys::BEGIN_LINE, line);
    }
    body.children.insert(0, statement.child(call));
    body.renumber_children();
}

/// `this(...)` or `super(...)` as an expression statement.
fn is_delegating_call(statement: &AstNode) -> bool {
    statement.is("ExpressionStatement")
        && statement
            .children
            .first()
            .map(|c| c.is("ThisMethodCallExpression") || c.is("SuperMethodCallExpression"))
            .unwrap_or(false)
}

fn split_static_blocks(class: &mut AstNode, class_name: &str) {
    let Some(position) = class.children.iter().position(|c| {
        c.is("Method")
            && c.str_prop(keys::NAME)
                .map(|n| n.eq_ignore_ascii_case(STATIC_INITIALIZER))
                .unwrap_or(false)
    }) else {
        return;
    };
    let block_count = class.children[position]
        .children
        .iter()
        .filter(|c| c.is("BlockStatement"))
        .count();
    if block_count < 2 {
        return;
    }

    let initializer = class.children.remove(position);
    let line = initializer.properties.get(keys::BEGIN_LINE).cloned();
    let blocks: Vec<AstNode> = initializer
        .children
        .into_iter()
        .filter(|c| c.is("BlockStatement"))
        .collect();
    debug!(
        "Splitting {} static blocks of {} into synthetic methods",
        blocks.len(),
        class_name
    );

    let mut calls = Vec::with_capacity(blocks.len());
    for (index, mut block) in blocks.into_iter().enumerate() {
        let name = format!("{}{}", STATIC_BLOCK_PREFIX, index);
        block.set(keys::CHILD_INDEX, 0);
        let mut method = AstNode::method(&name, 0)
            .with(keys::STATIC, true)
            .with(keys::STATIC_BLOCK_METHOD, true)
            .with(keys::SYNTHETIC, true);
        if let Some(line) = block.properties.get(keys::BEGIN_LINE).cloned() {
            method.set(keys::BEGIN_LINE, line);
        }
        class.children.push(method.child(block));

        let mut call = AstNode::call_statement(&name, vec![]).with(keys::SYNTHETIC, true);
        if let Some(line) = &line {
            call.set(keys::BEGIN_LINE, line.clone());
        }
        calls.push(call);
    }

    let mut body = AstNode::block(calls).with(keys::SYNTHETIC, true);
    body.renumber_children();
    let mut invoker = AstNode::method(STATIC_BLOCK_INVOKER, 0)
        .with(keys::STATIC, true)
        .with(keys::STATIC_BLOCK_INVOKER, true)
        .with(keys::SYNTHETIC, true)
        .child(body);
    if let Some(line) = line {
        invoker.set(keys::BEGIN_LINE, line);
    }
    class.children.push(invoker);
    class.renumber_children();
}

/// Appends a child after the highest existing index so no gap is opened.
fn append_child(parent: &mut AstNode, mut child: AstNode) {
    let next = parent
        .children
        .iter()
        .enumerate()
        .map(|(position, c)| {
            c.properties
                .get(keys::CHILD_INDEX)
                .and_then(|v| v.as_i64())
                .unwrap_or(position as i64)
        })
        .max()
        .map(|max| max + 1)
        .unwrap_or(0);
    child.set(keys::CHILD_INDEX, next);
    parent.children.push(child);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constructors(class: &AstNode) -> Vec<&AstNode> {
        class
            .children
            .iter()
            .filter(|c| c.is("Method") && c.bool_prop(keys::CONSTRUCTOR))
            .collect()
    }

    #[test]
    fn test_default_constructor_without_superclass() {
        let mut class = AstNode::user_class("A");
        synthesize(&mut class);
        let ctors = constructors(&class);
        assert_eq!(ctors.len(), 1);
        assert!(ctors[0].bool_prop(keys::IMPLICIT));
        let body = &ctors[0].children[0];
        assert!(body.is("BlockStatement"));
        assert!(body.children.is_empty());
    }

    #[test]
    fn test_implicit_constructor_calls_super() {
        let mut class = AstNode::user_class("B").with(keys::SUPER_CLASS_NAME, "A");
        synthesize(&mut class);
        let body = &constructors(&class)[0].children[0];
        assert_eq!(body.children.len(), 1);
        let call = &body.children[0].children[0];
        assert!(call.is("SuperMethodCallExpression"));
        assert_eq!(call.properties[keys::ARITY].as_i64(), Some(0));
    }

    #[test]
    fn test_explicit_constructor_gets_super_first() {
        let ctor = AstNode::method("B", 0)
            .with(keys::CONSTRUCTOR, true)
            .child(AstNode::block(vec![
                AstNode::call_statement("init", vec![]),
                AstNode::call_statement("log", vec![]),
            ]));
        let mut class = AstNode::user_class("B")
            .with(keys::SUPER_CLASS_NAME, "A")
            .child(ctor);
        synthesize(&mut class);

        let body = &constructors(&class)[0].children[0];
        assert_eq!(body.children.len(), 3);
        assert!(body.children[0].children[0].is("SuperMethodCallExpression"));
        let indices: Vec<_> = body
            .children
            .iter()
            .map(|c| c.properties[keys::CHILD_INDEX].as_i64().unwrap())
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_delegating_constructor_is_left_alone() {
        let delegate = AstNode::new("ExpressionStatement")
            .child(AstNode::new("ThisMethodCallExpression").with(keys::ARITY, 1));
        let ctor = AstNode::method("B", 0)
            .with(keys::CONSTRUCTOR, true)
            .child(AstNode::block(vec![delegate]));
        let mut class = AstNode::user_class("B")
            .with(keys::SUPER_CLASS_NAME, "A")
            .child(ctor);
        synthesize(&mut class);
        let body = &constructors(&class)[0].children[0];
        assert_eq!(body.children.len(), 1);
        assert!(body.children[0].children[0].is("ThisMethodCallExpression"));
    }

    #[test]
    fn test_static_blocks_split_in_source_order() {
        let clinit = AstNode::method(STATIC_INITIALIZER, 0)
            .with(keys::STATIC, true)
            .with_children(vec![
                AstNode::block(vec![AstNode::call_statement("first", vec![])]),
                AstNode::block(vec![AstNode::call_statement("second", vec![])]),
                AstNode::block(vec![AstNode::call_statement("third", vec![])]),
            ]);
        let mut class = AstNode::user_class("S").child(clinit);
        synthesize(&mut class);

        let methods: Vec<_> = class
            .children
            .iter()
            .filter(|c| c.is("Method"))
            .collect();
        assert!(methods
            .iter()
            .all(|m| m.str_prop(keys::NAME) != Some(STATIC_INITIALIZER)));

        let block_methods: Vec<_> = methods
            .iter()
            .filter(|m| m.bool_prop(keys::STATIC_BLOCK_METHOD))
            .collect();
        assert_eq!(block_methods.len(), 3);
        assert_eq!(
            block_methods[1].children[0].children[0].children[0].str_prop(keys::METHOD_NAME),
            Some("second")
        );

        let invokers: Vec<_> = methods
            .iter()
            .filter(|m| m.bool_prop(keys::STATIC_BLOCK_INVOKER))
            .collect();
        assert_eq!(invokers.len(), 1);
        let calls: Vec<_> = invokers[0].children[0]
            .children
            .iter()
            .map(|s| s.children[0].str_prop(keys::METHOD_NAME).unwrap())
            .collect();
        assert_eq!(
            calls,
            vec![
                "SyntheticStaticBlock_0",
                "SyntheticStaticBlock_1",
                "SyntheticStaticBlock_2"
            ]
        );
    }

    #[test]
    fn test_single_static_block_kept() {
        let clinit = AstNode::method(STATIC_INITIALIZER, 0)
            .child(AstNode::block(vec![AstNode::call_statement("only", vec![])]));
        let mut class = AstNode::user_class("S").child(clinit);
        synthesize(&mut class);
        assert!(class
            .children
            .iter()
            .any(|c| c.str_prop(keys::NAME) == Some(STATIC_INITIALIZER)));
    }
}
