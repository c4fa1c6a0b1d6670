use tracing::trace;

use crate::compile::{
    ast::{Ast, Expr, Item, Literal},
    ir::IrLiteral,
    semantic::{
        SemanticError,
        names::{own_function, own_variable},
        symbols::{Initializer, Module, Prototype},
    },
};

/// Resolves declared types of module level functions and variables. Types
/// are looked up in the module scope only.
pub fn complete(module: &mut Module, ast: &Ast) -> Result<(), SemanticError> {
    let root = module.root();

    for item in ast.items.iter() {
        match item {
            Item::Function(def) => {
                let id = own_function(module, &def.name)?;

                let mut parameter_types = Vec::with_capacity(def.parameters.len());
                let mut parameter_names = Vec::with_capacity(def.parameters.len());
                for param in def.parameters.iter() {
                    parameter_types.push(module.resolve_type(root, &param.ty.name, &param.ty.span)?);
                    parameter_names.push(param.name.name.clone());
                }
                let return_type =
                    module.resolve_type(root, &def.return_type.name, &def.return_type.span)?;

                module.function_mut(id).complete_prototype(Prototype {
                    parameter_types,
                    parameter_names,
                    return_type,
                })?;
                trace!(name = %def.name.name, "completed function prototype");
            }
            Item::Variable(def) => {
                let id = own_variable(module, &def.name)?;
                let ty = module.resolve_type(root, &def.ty.name, &def.ty.span)?;

                let initializer = match &def.value {
                    Expr::Literal(Literal::Integer(int), span) => {
                        Initializer::Literal(IrLiteral::Integer(int.parse(span)?))
                    }
                    Expr::Literal(Literal::String(s), _) => {
                        Initializer::Literal(IrLiteral::String(s.clone()))
                    }
                    other => Initializer::Expression(other.span()),
                };

                module.variable_mut(id).complete_prototype(ty, Some(initializer))?;
                trace!(name = %def.name.name, "completed variable prototype");
            }
            Item::Import(_) => {}
        }
    }

    Ok(())
}
