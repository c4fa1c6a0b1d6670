use std::fmt::Write;

use thiserror::Error;
use tracing::debug;

use crate::compile::{
    ast::{BinaryOp, SourcePos},
    ir::{IrCall, IrExpr, IrLiteral, IrStmt},
    semantic::symbols::{Function, Initializer, Module, TEMPORARY_PREFIX, TypeId, VariableId},
};

const INDENT: &str = "    ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("global `{name}` must be initialized with a literal")]
    UnsupportedGlobalInitializer { name: String, span: SourcePos },

    #[error("operator `{op}` has no C counterpart")]
    UnsupportedOperator { op: BinaryOp, span: SourcePos },

    #[error("function `{name}` was not fully analysed")]
    IncompleteFunction { name: String, span: SourcePos },

    #[error("There was an Formatting error: {0}")]
    FmtError(#[from] std::fmt::Error),
}

impl EmitError {
    pub fn span(&self) -> Option<SourcePos> {
        match self {
            Self::UnsupportedGlobalInitializer { span, .. }
            | Self::UnsupportedOperator { span, .. }
            | Self::IncompleteFunction { span, .. } => Some(span.clone()),
            Self::FmtError(_) => None,
        }
    }
}

/// Produces a C99 translation unit for an analysed module.
pub fn emit_c(module: &Module) -> Result<String, EmitError> {
    let mut c = String::new();

    writeln!(&mut c, "#include <stdint.h>")?;
    for import in module.imports().iter() {
        writeln!(&mut c, "#include <{}>", import.library)?;
    }

    let globals: Vec<_> = module.own_variables().collect();
    if !globals.is_empty() {
        writeln!(&mut c)?;
    }
    for (id, variable) in globals {
        let value = match variable.initializer() {
            Some(Initializer::Literal(literal)) => literal_to_c(literal),
            Some(Initializer::Expression(span)) => {
                return Err(EmitError::UnsupportedGlobalInitializer {
                    name: variable.name.clone(),
                    span: span.clone(),
                });
            }
            None => {
                return Err(EmitError::UnsupportedGlobalInitializer {
                    name: variable.name.clone(),
                    span: variable.span.clone(),
                });
            }
        };
        let ty = variable_type(module, id)?;
        writeln!(&mut c, "{} {} = {};", type_to_c(module, ty), variable.name, value)?;
    }

    let functions: Vec<_> = module
        .own_functions()
        .filter(|(_, function)| function.body().is_some())
        .collect();

    if !functions.is_empty() {
        writeln!(&mut c)?;
    }
    for (_, function) in functions.iter() {
        writeln!(&mut c, "{};", signature(module, function)?)?;
    }

    for (_, function) in functions.iter() {
        writeln!(&mut c)?;
        emit_function(module, function, &mut c)?;
    }

    debug!(bytes = c.len(), functions = functions.len(), "emitted C");

    Ok(c)
}

fn emit_function(module: &Module, function: &Function, c: &mut String) -> Result<(), EmitError> {
    let Some(body) = function.body() else {
        return Err(incomplete(function));
    };

    writeln!(c, "{}", signature(module, function)?)?;
    writeln!(c, "{{")?;
    emit_block(module, body, 1, c)?;
    writeln!(c, "}}")?;

    Ok(())
}

fn emit_block(module: &Module, stmts: &[IrStmt], depth: usize, c: &mut String) -> Result<(), EmitError> {
    let indent = INDENT.repeat(depth);

    for stmt in stmts.iter() {
        match stmt {
            IrStmt::Define {
                variable,
                ty,
                value,
            } => {
                let value = expr_to_c(module, *variable, value)?;
                writeln!(
                    c,
                    "{indent}{} {} = {};",
                    type_to_c(module, *ty),
                    variable_name(module, *variable),
                    value
                )?;
            }
            IrStmt::Set { variable, value } => {
                let value = expr_to_c(module, *variable, value)?;
                writeln!(c, "{indent}{} = {};", variable_name(module, *variable), value)?;
            }
            IrStmt::ExprStmt(call) => {
                writeln!(c, "{indent}{};", call_to_c(module, call))?;
            }
            IrStmt::If {
                condition,
                if_body,
                else_body,
            } => {
                writeln!(c, "{indent}if ({}) {{", variable_name(module, *condition))?;
                emit_block(module, if_body, depth + 1, c)?;
                if else_body.is_empty() {
                    writeln!(c, "{indent}}}")?;
                } else {
                    writeln!(c, "{indent}}} else {{")?;
                    emit_block(module, else_body, depth + 1, c)?;
                    writeln!(c, "{indent}}}")?;
                }
            }
            IrStmt::Return(variable) => {
                writeln!(c, "{indent}return {};", variable_name(module, *variable))?;
            }
        }
    }

    Ok(())
}

fn signature(module: &Module, function: &Function) -> Result<String, EmitError> {
    let Some(prototype) = function.prototype() else {
        return Err(incomplete(function));
    };

    let parameters = if prototype.parameter_names.is_empty() {
        "void".to_string()
    } else {
        prototype
            .parameter_types
            .iter()
            .zip(prototype.parameter_names.iter())
            .map(|(ty, name)| format!("{} {}", type_to_c(module, *ty), name))
            .collect::<Vec<_>>()
            .join(", ")
    };

    Ok(format!(
        "{} {}({})",
        type_to_c(module, prototype.return_type),
        function.name,
        parameters
    ))
}

/// `target` is the variable the expression is assigned to, for error spans.
fn expr_to_c(module: &Module, target: VariableId, expr: &IrExpr) -> Result<String, EmitError> {
    let text = match expr {
        IrExpr::Literal(literal) => literal_to_c(literal),
        IrExpr::Operator { op, operands } => {
            let Some(op_c) = operator_to_c(*op) else {
                return Err(EmitError::UnsupportedOperator {
                    op: *op,
                    span: module.variable(target).span.clone(),
                });
            };
            operands
                .iter()
                .map(|operand| variable_name(module, *operand))
                .collect::<Vec<_>>()
                .join(&format!(" {op_c} "))
        }
        IrExpr::Call(call) => call_to_c(module, call),
        IrExpr::Variable(variable) => variable_name(module, *variable),
    };

    Ok(text)
}

fn call_to_c(module: &Module, call: &IrCall) -> String {
    let args = call
        .args
        .iter()
        .map(|arg| variable_name(module, *arg))
        .collect::<Vec<_>>()
        .join(", ");

    format!("{}({})", module.function(call.function).name, args)
}

fn literal_to_c(literal: &IrLiteral) -> String {
    match literal {
        IrLiteral::Integer(value) => value.to_string(),
        IrLiteral::String(value) => format!("\"{value}\""),
    }
}

pub fn operator_to_c(op: BinaryOp) -> Option<&'static str> {
    let text = match op {
        BinaryOp::Namespace | BinaryOp::Member | BinaryOp::Arrow => return None,
        BinaryOp::FloorDiv => "/",
        BinaryOp::LogicalAnd => "&&",
        BinaryOp::LogicalOr => "||",
        other => other.symbol(),
    };

    Some(text)
}

fn type_to_c(module: &Module, ty: TypeId) -> &str {
    &module.data_type(ty).emitted_name
}

fn variable_type(module: &Module, id: VariableId) -> Result<TypeId, EmitError> {
    let variable = module.variable(id);
    variable.ty().ok_or_else(|| EmitError::IncompleteFunction {
        name: variable.name.clone(),
        span: variable.span.clone(),
    })
}

/// C spelling of a variable; temporaries `%N` become `qtmp_N`.
pub fn variable_name(module: &Module, id: VariableId) -> String {
    mangle(&module.variable(id).name)
}

pub fn mangle(name: &str) -> String {
    match name.strip_prefix('%') {
        Some(index) => format!("{TEMPORARY_PREFIX}{index}"),
        None => name.to_string(),
    }
}

fn incomplete(function: &Function) -> EmitError {
    EmitError::IncompleteFunction {
        name: function.name.clone(),
        span: function.span.clone(),
    }
}
