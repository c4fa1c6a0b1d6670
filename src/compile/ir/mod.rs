//! Flat, temporary based form of function bodies. Every operand is a
//! resolved variable, so the emitter never looks at expression trees.

use serde::Serialize;

use crate::compile::{
    ast::BinaryOp,
    semantic::symbols::{FunctionId, TypeId, VariableId},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrLiteral {
    Integer(i32),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrCall {
    pub function: FunctionId,
    pub args: Vec<VariableId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrExpr {
    Literal(IrLiteral),
    Operator { op: BinaryOp, operands: Vec<VariableId> },
    Call(IrCall),
    /// Copy of an existing variable, used when a `let` binds a plain name.
    Variable(VariableId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrStmt {
    Define {
        variable: VariableId,
        ty: TypeId,
        value: IrExpr,
    },
    Set {
        variable: VariableId,
        value: IrExpr,
    },
    ExprStmt(IrCall),
    If {
        condition: VariableId,
        if_body: Vec<IrStmt>,
        else_body: Vec<IrStmt>,
    },
    Return(VariableId),
}

impl IrStmt {
    /// Number of statements including nested branch bodies.
    pub fn count(stmts: &[IrStmt]) -> usize {
        stmts
            .iter()
            .map(|stmt| match stmt {
                IrStmt::If {
                    if_body, else_body, ..
                } => 1 + IrStmt::count(if_body) + IrStmt::count(else_body),
                _ => 1,
            })
            .sum()
    }
}
