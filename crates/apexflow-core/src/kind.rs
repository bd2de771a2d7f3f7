//! Vertex kinds.
//!
//! Every vertex in the program graph carries one of these kinds. The set is
//! closed: labels the ingestion pass does not recognise map to
//! [`VertexKind::Unknown`] and are treated as plain expressions.

use serde::{Deserialize, Serialize};

/// The node type of a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VertexKind {
    // Declarations
    UserClass,
    UserInterface,
    UserEnum,
    Method,
    Parameter,
    Field,
    Property,
    ModifierNode,

    // Statements
    BlockStatement,
    ExpressionStatement,
    VariableDeclarationStatements,
    VariableDeclaration,
    ReturnStatement,
    ThrowStatement,
    BreakStatement,
    ContinueStatement,
    IfElseBlockStatement,
    IfBlockStatement,
    StandardCondition,
    ForLoopStatement,
    ForEachStatement,
    WhileLoopStatement,
    DoLoopStatement,
    TryCatchFinallyBlockStatement,
    CatchBlockStatement,
    SwitchStatement,
    ValueWhenBlock,
    TypeWhenBlock,
    ElseWhenBlock,
    LiteralCase,
    IdentifierCase,
    DmlInsertStatement,
    DmlUpdateStatement,
    DmlDeleteStatement,
    DmlUpsertStatement,
    DmlUndeleteStatement,

    // Expressions
    MethodCallExpression,
    ThisMethodCallExpression,
    SuperMethodCallExpression,
    NewObjectExpression,
    VariableExpression,
    LiteralExpression,
    BinaryExpression,
    BooleanExpression,
    PrefixExpression,
    PostfixExpression,
    AssignmentExpression,
    ReferenceExpression,
    SoqlExpression,
    CastExpression,
    TernaryExpression,

    /// Any label outside the closed set.
    Unknown,
}

const LABELS: &[(VertexKind, &str)] = &[
    (VertexKind::UserClass, "UserClass"),
    (VertexKind::UserInterface, "UserInterface"),
    (VertexKind::UserEnum, "UserEnum"),
    (VertexKind::Method, "Method"),
    (VertexKind::Parameter, "Parameter"),
    (VertexKind::Field, "Field"),
    (VertexKind::Property, "Property"),
    (VertexKind::ModifierNode, "ModifierNode"),
    (VertexKind::BlockStatement, "BlockStatement"),
    (VertexKind::ExpressionStatement, "ExpressionStatement"),
    (VertexKind::VariableDeclarationStatements, "VariableDeclarationStatements"),
    (VertexKind::VariableDeclaration, "VariableDeclaration"),
    (VertexKind::ReturnStatement, "ReturnStatement"),
    (VertexKind::ThrowStatement, "ThrowStatement"),
    (VertexKind::BreakStatement, "BreakStatement"),
    (VertexKind::ContinueStatement, "ContinueStatement"),
    (VertexKind::IfElseBlockStatement, "IfElseBlockStatement"),
    (VertexKind::IfBlockStatement, "IfBlockStatement"),
    (VertexKind::StandardCondition, "StandardCondition"),
    (VertexKind::ForLoopStatement, "ForLoopStatement"),
    (VertexKind::ForEachStatement, "ForEachStatement"),
    (VertexKind::WhileLoopStatement, "WhileLoopStatement"),
    (VertexKind::DoLoopStatement, "DoLoopStatement"),
    (VertexKind::TryCatchFinallyBlockStatement, "TryCatchFinallyBlockStatement"),
    (VertexKind::CatchBlockStatement, "CatchBlockStatement"),
    (VertexKind::SwitchStatement, "SwitchStatement"),
    (VertexKind::ValueWhenBlock, "ValueWhenBlock"),
    (VertexKind::TypeWhenBlock, "TypeWhenBlock"),
    (VertexKind::ElseWhenBlock, "ElseWhenBlock"),
    (VertexKind::LiteralCase, "LiteralCase"),
    (VertexKind::IdentifierCase, "IdentifierCase"),
    (VertexKind::DmlInsertStatement, "DmlInsertStatement"),
    (VertexKind::DmlUpdateStatement, "DmlUpdateStatement"),
    (VertexKind::DmlDeleteStatement, "DmlDeleteStatement"),
    (VertexKind::DmlUpsertStatement, "DmlUpsertStatement"),
    (VertexKind::DmlUndeleteStatement, "DmlUndeleteStatement"),
    (VertexKind::MethodCallExpression, "MethodCallExpression"),
    (VertexKind::ThisMethodCallExpression, "ThisMethodCallExpression"),
    (VertexKind::SuperMethodCallExpression, "SuperMethodCallExpression"),
    (VertexKind::NewObjectExpression, "NewObjectExpression"),
    (VertexKind::VariableExpression, "VariableExpression"),
    (VertexKind::LiteralExpression, "LiteralExpression"),
    (VertexKind::BinaryExpression, "BinaryExpression"),
    (VertexKind::BooleanExpression, "BooleanExpression"),
    (VertexKind::PrefixExpression, "PrefixExpression"),
    (VertexKind::PostfixExpression, "PostfixExpression"),
    (VertexKind::AssignmentExpression, "AssignmentExpression"),
    (VertexKind::ReferenceExpression, "ReferenceExpression"),
    (VertexKind::SoqlExpression, "SoqlExpression"),
    (VertexKind::CastExpression, "CastExpression"),
    (VertexKind::TernaryExpression, "TernaryExpression"),
];

impl VertexKind {
    /// Maps an AST label onto its kind. Unrecognised labels become `Unknown`.
    pub fn from_label(label: &str) -> Self {
        LABELS
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(kind, _)| *kind)
            .unwrap_or(VertexKind::Unknown)
    }

    /// The canonical label for this kind.
    pub fn as_str(&self) -> &'static str {
        LABELS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, l)| *l)
            .unwrap_or("Unknown")
    }

    /// Class-like declarations that participate in inheritance.
    pub fn is_type_declaration(&self) -> bool {
        matches!(
            self,
            VertexKind::UserClass | VertexKind::UserInterface | VertexKind::UserEnum
        )
    }

    /// Statements that may appear directly inside a block.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            VertexKind::BlockStatement
                | VertexKind::ExpressionStatement
                | VertexKind::VariableDeclarationStatements
                | VertexKind::ReturnStatement
                | VertexKind::ThrowStatement
                | VertexKind::BreakStatement
                | VertexKind::ContinueStatement
                | VertexKind::IfElseBlockStatement
                | VertexKind::ForLoopStatement
                | VertexKind::ForEachStatement
                | VertexKind::WhileLoopStatement
                | VertexKind::DoLoopStatement
                | VertexKind::TryCatchFinallyBlockStatement
                | VertexKind::SwitchStatement
                | VertexKind::DmlInsertStatement
                | VertexKind::DmlUpdateStatement
                | VertexKind::DmlDeleteStatement
                | VertexKind::DmlUpsertStatement
                | VertexKind::DmlUndeleteStatement
        )
    }

    /// Vertices that take part in control flow, either as `CfgPath` endpoints
    /// or as the structural containers around them.
    ///
    /// Walkers and call-site scanners never descend into these through the
    /// `Child` edges of another vertex; they reach them through the path instead.
    pub fn is_control_flow(&self) -> bool {
        self.is_statement()
            || matches!(
                self,
                VertexKind::IfBlockStatement
                    | VertexKind::StandardCondition
                    | VertexKind::CatchBlockStatement
                    | VertexKind::ValueWhenBlock
                    | VertexKind::TypeWhenBlock
                    | VertexKind::ElseWhenBlock
                    | VertexKind::LiteralCase
                    | VertexKind::IdentifierCase
            )
    }

    /// Statements after which control never falls through.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VertexKind::ReturnStatement | VertexKind::ThrowStatement)
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            VertexKind::ForLoopStatement
                | VertexKind::ForEachStatement
                | VertexKind::WhileLoopStatement
                | VertexKind::DoLoopStatement
        )
    }

    /// Call-sites: expressions that may resolve to another method's path.
    pub fn is_invocable(&self) -> bool {
        matches!(
            self,
            VertexKind::MethodCallExpression
                | VertexKind::ThisMethodCallExpression
                | VertexKind::SuperMethodCallExpression
                | VertexKind::NewObjectExpression
        )
    }

    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            VertexKind::DmlInsertStatement
                | VertexKind::DmlUpdateStatement
                | VertexKind::DmlDeleteStatement
                | VertexKind::DmlUpsertStatement
                | VertexKind::DmlUndeleteStatement
        )
    }
}

impl std::fmt::Display for VertexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
