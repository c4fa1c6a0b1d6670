use std::fmt;

use int_literal::IntLiteral;
use serde::Serialize;

use crate::compile::parser::lex::TokenKind;

pub mod int_literal;

/// Half-open byte range `[start, end)` into the source text.
pub type SourcePos = core::ops::Range<usize>;

/// A possibly `::`-joined name such as `io::printf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub name: String,
    pub span: SourcePos,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: SourcePos) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Types are written as a single identifier.
pub type TypeExpr = Identifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Literal {
    Integer(IntLiteral),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperatorKind {
    BinaryInfix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BinaryOp {
    Namespace,
    Member,
    Arrow,
    //
    Mul,
    Div,
    FloorDiv,
    Mod,
    //
    Add,
    Sub,
    //
    ShiftLeft,
    ShiftRight,
    //
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    //
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    //
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<BinaryOp> {
        let op = match kind {
            TokenKind::COLON_COLON => Self::Namespace,
            TokenKind::DOT => Self::Member,
            TokenKind::ARROW => Self::Arrow,
            TokenKind::STAR => Self::Mul,
            TokenKind::SLASH => Self::Div,
            TokenKind::SLASH_SLASH => Self::FloorDiv,
            TokenKind::PERCENT => Self::Mod,
            TokenKind::PLUS => Self::Add,
            TokenKind::MINUS => Self::Sub,
            TokenKind::SHIFT_LEFT => Self::ShiftLeft,
            TokenKind::SHIFT_RIGHT => Self::ShiftRight,
            TokenKind::AMPERSAND => Self::BitwiseAnd,
            TokenKind::CIRCUMFLEX => Self::BitwiseXor,
            TokenKind::VBAR => Self::BitwiseOr,
            TokenKind::LESS => Self::Less,
            TokenKind::LESS_EQ => Self::LessEq,
            TokenKind::GREATER => Self::Greater,
            TokenKind::GREATER_EQ => Self::GreaterEq,
            TokenKind::EQ_EQ => Self::Eq,
            TokenKind::NOT_EQ => Self::NotEq,
            TokenKind::AND => Self::LogicalAnd,
            TokenKind::OR => Self::LogicalOr,
            _ => return None,
        };

        Some(op)
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(&self) -> i32 {
        match self {
            Self::Namespace => 1500,
            Self::Member | Self::Arrow => 1400,
            Self::Mul | Self::Div | Self::FloorDiv | Self::Mod => 1200,
            Self::Add | Self::Sub => 1100,
            Self::ShiftLeft | Self::ShiftRight => 1000,
            Self::BitwiseAnd => 900,
            Self::BitwiseXor => 800,
            Self::BitwiseOr => 700,
            Self::Less
            | Self::LessEq
            | Self::Greater
            | Self::GreaterEq
            | Self::Eq
            | Self::NotEq => 500,
            Self::LogicalAnd => 400,
            Self::LogicalOr => 300,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Namespace => "::",
            Self::Member => ".",
            Self::Arrow => "->",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::ShiftLeft => "<<",
            Self::ShiftRight => ">>",
            Self::BitwiseAnd => "&",
            Self::BitwiseXor => "^",
            Self::BitwiseOr => "|",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::LogicalAnd => "and",
            Self::LogicalOr => "or",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Precedence of a lookahead token; anything that is not a binary operator
/// (including the end of input) ends the expression.
pub fn binop_precedence(kind: Option<TokenKind>) -> i32 {
    kind.and_then(BinaryOp::from_token)
        .map_or(-1, |op| op.precedence())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionCall {
    pub name: Identifier,
    pub arguments: Vec<Expr>,
    pub span: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Expr {
    Ident(Identifier),
    Literal(Literal, SourcePos),
    Operator {
        op: BinaryOp,
        kind: OperatorKind,
        operands: Box<[Expr; 2]>,
    },
    Call(FunctionCall),
}

impl Expr {
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Operator {
            op,
            kind: OperatorKind::BinaryInfix,
            operands: Box::new([lhs, rhs]),
        }
    }

    pub fn span(&self) -> SourcePos {
        match self {
            Self::Ident(ident) => ident.span.clone(),
            Self::Literal(_, span) => span.clone(),
            Self::Call(call) => call.span.clone(),
            Self::Operator { operands, .. } => {
                let [lhs, rhs] = operands.as_ref();
                let SourcePos { start, .. } = lhs.span();
                let SourcePos { end, .. } = rhs.span();
                start..end
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDef {
    pub name: Identifier,
    pub ty: TypeExpr,
    pub span: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDef {
    pub name: Identifier,
    pub ty: TypeExpr,
    pub value: Expr,
    pub span: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableMod {
    pub name: Identifier,
    pub value: Expr,
    pub span: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDef {
    pub name: Identifier,
    pub parameters: Vec<ParameterDef>,
    pub return_type: TypeExpr,
    pub body: Vec<Stmt>,
    pub span: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportStmt {
    pub alias: Identifier,
    /// Contents of the string literal, without quotes.
    pub library: String,
    pub library_span: SourcePos,
    pub span: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub if_block: Vec<Stmt>,
    pub else_block: Vec<Stmt>,
    pub span: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnStmt {
    pub value: Expr,
    pub span: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Stmt {
    Let(VariableDef),
    Assign(VariableMod),
    Return(ReturnStmt),
    If(IfStmt),
    Expr(Expr, SourcePos),
}

impl Stmt {
    pub fn span(&self) -> SourcePos {
        match self {
            Self::Let(VariableDef { span, .. })
            | Self::Assign(VariableMod { span, .. })
            | Self::Return(ReturnStmt { span, .. })
            | Self::If(IfStmt { span, .. })
            | Self::Expr(_, span) => span.clone(),
        }
    }
}

/// Statements allowed at module level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Item {
    Function(FunctionDef),
    Variable(VariableDef),
    Import(ImportStmt),
}

impl Item {
    pub fn span(&self) -> SourcePos {
        match self {
            Self::Function(FunctionDef { span, .. })
            | Self::Variable(VariableDef { span, .. })
            | Self::Import(ImportStmt { span, .. }) => span.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ast {
    pub items: Vec<Item>,
}
