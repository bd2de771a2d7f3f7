//! AST input model.
//!
//! The parser that produces these trees lives outside this workspace. Trees
//! arrive as JSON (one root per source file) or are assembled in code with
//! the builder methods below.

use crate::property::keys;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One AST node: a label, a property bag and ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// A class declaration whose defining type equals its name.
    pub fn user_class(name: &str) -> Self {
        Self::new("UserClass")
            .with(keys::NAME, name)
            .with(keys::DEFINING_TYPE, name)
    }

    pub fn user_interface(name: &str) -> Self {
        Self::new("UserInterface")
            .with(keys::NAME, name)
            .with(keys::DEFINING_TYPE, name)
    }

    /// A method with the given arity and no body.
    pub fn method(name: &str, arity: i64) -> Self {
        Self::new("Method")
            .with(keys::NAME, name)
            .with(keys::ARITY, arity)
    }

    pub fn block(statements: Vec<AstNode>) -> Self {
        Self::new("BlockStatement").with_children(statements)
    }

    /// `FullMethodName(args)` wrapped in an expression statement.
    pub fn call_statement(full_method_name: &str, args: Vec<AstNode>) -> Self {
        Self::new("ExpressionStatement").child(Self::call(full_method_name, args))
    }

    /// A method call; the method name is the text after the last `.`.
    pub fn call(full_method_name: &str, args: Vec<AstNode>) -> Self {
        let method_name = full_method_name
            .rsplit('.')
            .next()
            .unwrap_or(full_method_name);
        Self::new("MethodCallExpression")
            .with(keys::METHOD_NAME, method_name)
            .with(keys::FULL_METHOD_NAME, full_method_name)
            .with_children(args)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new("LiteralExpression").with("Value", value)
    }

    pub fn variable(name: &str) -> Self {
        Self::new("VariableExpression").with(keys::NAME, name)
    }

    /// `Class.member`: a variable expression qualified by a reference.
    pub fn static_reference(class: &str, member: &str) -> Self {
        Self::variable(member).child(Self::new("ReferenceExpression").with(keys::NAME, class))
    }

    /// Sets a property, consuming and returning the node.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn child(mut self, child: AstNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: Vec<AstNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn str_prop(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn bool_prop(&self, key: &str) -> bool {
        self.properties
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn is(&self, label: &str) -> bool {
        self.label == label
    }

    /// Rewrites `ChildIndex` on every child to its current position.
    ///
    /// Synthesis calls this after inserting or removing children so that the
    /// emitted indices have no duplicates.
    pub fn renumber_children(&mut self) {
        for (index, child) in self.children.iter_mut().enumerate() {
            child.set(keys::CHILD_INDEX, index as i64);
        }
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(AstNode::size).sum::<usize>()
    }
}
