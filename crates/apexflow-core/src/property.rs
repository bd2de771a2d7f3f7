//! Vertex property values and the well-known property keys.

use serde::{Deserialize, Serialize};

/// A single value in a vertex's property bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Converts a JSON value from the AST input.
    ///
    /// Arrays keep only their string-representable items; objects and nulls
    /// are stored as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Bool(b) => PropertyValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => PropertyValue::Int(i),
                None => PropertyValue::Str(n.to_string()),
            },
            Value::String(s) => PropertyValue::Str(s.clone()),
            Value::Array(items) => PropertyValue::List(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            other => PropertyValue::Str(other.to_string()),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Str(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::List(value)
    }
}

/// Well-known property keys.
pub mod keys {
    pub const NAME: &str = "Name";
    pub const DEFINING_TYPE: &str = "DefiningType";
    pub const FILE_NAME: &str = "FileName";
    pub const BEGIN_LINE: &str = "BeginLine";
    pub const CHILD_INDEX: &str = "ChildIndex";
    pub const FIRST_CHILD: &str = "FirstChild";
    pub const LAST_CHILD: &str = "LastChild";
    pub const IS_STANDARD: &str = "IsStandard";

    pub const SUPER_CLASS_NAME: &str = "SuperClassName";
    pub const INTERFACE_NAMES: &str = "InterfaceNames";
    pub const IMPLEMENTED_INTERFACES: &str = "ImplementedInterfaces";

    pub const ARITY: &str = "Arity";
    pub const STATIC: &str = "Static";
    pub const CONSTRUCTOR: &str = "Constructor";
    pub const IMPLICIT: &str = "Implicit";
    pub const SYNTHETIC: &str = "Synthetic";
    pub const STATIC_BLOCK_METHOD: &str = "StaticBlockMethod";
    pub const STATIC_BLOCK_INVOKER: &str = "StaticBlockInvokerMethod";

    pub const METHOD_NAME: &str = "MethodName";
    pub const FULL_METHOD_NAME: &str = "FullMethodName";
    pub const TYPE: &str = "Type";

    pub const END_SCOPES: &str = "EndScopes";
    pub const HAS_GETTER_BLOCK: &str = "HasGetterBlock";
    pub const HAS_SETTER_BLOCK: &str = "HasSetterBlock";

    /// Keys whose values get a lowercase copy at vertex construction.
    pub const CASE_INSENSITIVE: &[&str] = &[
        NAME,
        DEFINING_TYPE,
        METHOD_NAME,
        FULL_METHOD_NAME,
        TYPE,
        SUPER_CLASS_NAME,
    ];
}
