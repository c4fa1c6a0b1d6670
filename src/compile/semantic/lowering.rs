use tracing::{debug, trace};

use crate::compile::{
    ast::{Ast, Expr, FunctionCall, FunctionDef, Item, Literal, SourcePos, Stmt},
    ir::{IrCall, IrExpr, IrLiteral, IrStmt},
    semantic::{
        SemanticError, UnsupportedConstructError,
        names::own_function,
        symbols::{FunctionId, Module, ScopeId, Symbol, TypeId, VariableId},
    },
};

/// Lowers the body of every function defined in `ast` into IR.
pub fn lower_bodies(module: &mut Module, ast: &Ast) -> Result<(), SemanticError> {
    for item in ast.items.iter() {
        if let Item::Function(def) = item {
            let id = own_function(module, &def.name)?;
            lower_function(module, id, def)?;
        }
    }

    Ok(())
}

fn lower_function(module: &mut Module, id: FunctionId, def: &FunctionDef) -> Result<(), SemanticError> {
    let Some(prototype) = module.function(id).prototype().cloned() else {
        return Err(UnsupportedConstructError::IncompletePrototype {
            name: def.name.name.clone(),
            span: def.name.span.clone(),
        }
        .into());
    };

    let scope = module.child_scope(module.root(), &def.name.name);
    for (param, ty) in def.parameters.iter().zip(prototype.parameter_types) {
        let variable = module.add_typed_variable(&param.name.name, ty, param.span.clone());
        module.declare(scope, &param.name.name, Symbol::Variable(variable), &param.name.span)?;
    }

    let mut lowering = FunctionLowering {
        module: &mut *module,
        next_temporary: 0,
    };
    let body = lowering.lower_block(scope, &def.body)?;
    let temporaries = lowering.next_temporary;

    debug!(
        function = %def.name.name,
        statements = IrStmt::count(&body),
        temporaries,
        "lowered function"
    );
    module.function_mut(id).complete_body(scope, body)?;

    Ok(())
}

/// Per function state while lowering. Temporaries are numbered from zero
/// in every function.
struct FunctionLowering<'m> {
    module: &'m mut Module,
    next_temporary: usize,
}

impl FunctionLowering<'_> {
    fn lower_block(&mut self, scope: ScopeId, stmts: &[Stmt]) -> Result<Vec<IrStmt>, SemanticError> {
        let mut body = Vec::new();
        for stmt in stmts.iter() {
            self.lower_stmt(scope, stmt, &mut body)?;
        }

        Ok(body)
    }

    fn lower_stmt(
        &mut self,
        scope: ScopeId,
        stmt: &Stmt,
        body: &mut Vec<IrStmt>,
    ) -> Result<(), SemanticError> {
        match stmt {
            Stmt::Let(def) => {
                let ty = self.module.resolve_type(scope, &def.ty.name, &def.ty.span)?;
                let value = self.lower_expr(scope, &def.value, body)?;

                let variable = self
                    .module
                    .add_typed_variable(&def.name.name, ty, def.span.clone());
                self.module
                    .declare(scope, &def.name.name, Symbol::Variable(variable), &def.name.span)?;

                body.push(IrStmt::Define {
                    variable,
                    ty,
                    value: IrExpr::Variable(value),
                });
            }
            Stmt::Return(ret) => {
                let value = self.lower_expr(scope, &ret.value, body)?;
                body.push(IrStmt::Return(value));
            }
            Stmt::If(if_stmt) => {
                let condition = self.lower_expr(scope, &if_stmt.condition, body)?;

                let if_scope = self.module.child_scope(scope, "if");
                let if_body = self.lower_block(if_scope, &if_stmt.if_block)?;
                let else_scope = self.module.child_scope(scope, "else");
                let else_body = self.lower_block(else_scope, &if_stmt.else_block)?;

                body.push(IrStmt::If {
                    condition,
                    if_body,
                    else_body,
                });
            }
            Stmt::Expr(Expr::Call(call), _) => {
                let (call, _) = self.lower_call(scope, call, body)?;
                body.push(IrStmt::ExprStmt(call));
            }
            Stmt::Expr(_, span) => {
                return Err(UnsupportedConstructError::Statement {
                    kind: "expression",
                    span: span.clone(),
                }
                .into());
            }
            Stmt::Assign(assign) => {
                return Err(UnsupportedConstructError::Statement {
                    kind: "assignment",
                    span: assign.span.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Lowers `expr` and returns the variable holding its value.
    fn lower_expr(
        &mut self,
        scope: ScopeId,
        expr: &Expr,
        body: &mut Vec<IrStmt>,
    ) -> Result<VariableId, SemanticError> {
        match expr {
            Expr::Ident(ident) => Ok(self.module.resolve_variable(scope, &ident.name, &ident.span)?),
            Expr::Literal(Literal::Integer(int), span) => {
                let value = int.parse(span)?;
                let ty = self.module.builtins().int;
                self.bind_temporary(scope, ty, IrExpr::Literal(IrLiteral::Integer(value)), span, body)
            }
            Expr::Literal(Literal::String(s), span) => {
                let ty = self.module.builtins().string;
                self.bind_temporary(scope, ty, IrExpr::Literal(IrLiteral::String(s.clone())), span, body)
            }
            Expr::Operator { op, operands, .. } => {
                let [lhs, rhs] = operands.as_ref();
                let lhs = self.lower_expr(scope, lhs, body)?;
                let rhs = self.lower_expr(scope, rhs, body)?;

                // no overload resolution, the left operand decides
                let ty = self.type_of(lhs)?;
                let value = IrExpr::Operator {
                    op: *op,
                    operands: vec![lhs, rhs],
                };
                self.bind_temporary(scope, ty, value, &expr.span(), body)
            }
            Expr::Call(call) => {
                let (call_ir, return_type) = self.lower_call(scope, call, body)?;
                if return_type == self.module.builtins().void {
                    return Err(UnsupportedConstructError::VoidValue {
                        name: call.name.name.clone(),
                        span: call.span.clone(),
                    }
                    .into());
                }
                self.bind_temporary(scope, return_type, IrExpr::Call(call_ir), &call.span, body)
            }
        }
    }

    fn lower_call(
        &mut self,
        scope: ScopeId,
        call: &FunctionCall,
        body: &mut Vec<IrStmt>,
    ) -> Result<(IrCall, TypeId), SemanticError> {
        let function = self
            .module
            .resolve_function(scope, &call.name.name, &call.name.span)?;
        let Some(return_type) = self.module.function(function).prototype().map(|p| p.return_type)
        else {
            return Err(UnsupportedConstructError::IncompletePrototype {
                name: call.name.name.clone(),
                span: call.name.span.clone(),
            }
            .into());
        };

        let mut args = Vec::with_capacity(call.arguments.len());
        for arg in call.arguments.iter() {
            args.push(self.lower_expr(scope, arg, body)?);
        }

        Ok((IrCall { function, args }, return_type))
    }

    fn type_of(&self, variable: VariableId) -> Result<TypeId, SemanticError> {
        let var = self.module.variable(variable);
        var.ty().ok_or_else(|| {
            UnsupportedConstructError::IncompletePrototype {
                name: var.name.clone(),
                span: var.span.clone(),
            }
            .into()
        })
    }

    fn bind_temporary(
        &mut self,
        scope: ScopeId,
        ty: TypeId,
        value: IrExpr,
        span: &SourcePos,
        body: &mut Vec<IrStmt>,
    ) -> Result<VariableId, SemanticError> {
        let name = format!("%{}", self.next_temporary);
        self.next_temporary += 1;

        let variable = self.module.add_typed_variable(&name, ty, span.clone());
        self.module
            .declare(scope, &name, Symbol::Variable(variable), span)?;
        trace!(%name, ty = %self.module.data_type(ty).name, "bound temporary");

        body.push(IrStmt::Define {
            variable,
            ty,
            value,
        });

        Ok(variable)
    }
}
