use tracing::trace;

use crate::compile::{
    ast::{Ast, Identifier, Item},
    semantic::{
        NameError, SemanticError, builtins,
        symbols::{FunctionId, Module, Symbol, SymbolKind, VariableId},
    },
};

/// Registers every top level name without looking at types or bodies.
pub fn collect(module: &mut Module, ast: &Ast) -> Result<(), SemanticError> {
    let root = module.root();

    for item in ast.items.iter() {
        match item {
            Item::Function(def) => {
                let id = module.add_function(&def.name.name, def.span.clone());
                module.declare(root, &def.name.name, Symbol::Function(id), &def.name.span)?;
                trace!(name = %def.name.name, "declared function");
            }
            Item::Variable(def) => {
                let id = module.add_variable(&def.name.name, def.span.clone());
                module.declare(root, &def.name.name, Symbol::Variable(id), &def.name.span)?;
                trace!(name = %def.name.name, "declared variable");
            }
            Item::Import(import) => builtins::import_library(module, import)?,
        }
    }

    Ok(())
}

/// Function declared at module level by name collection.
pub(super) fn own_function(module: &Module, name: &Identifier) -> Result<FunctionId, NameError> {
    match module.local(module.root(), &name.name) {
        Some(Symbol::Function(id)) => Ok(id),
        other => Err(missing(name, SymbolKind::Function, other)),
    }
}

/// Variable declared at module level by name collection.
pub(super) fn own_variable(module: &Module, name: &Identifier) -> Result<VariableId, NameError> {
    match module.local(module.root(), &name.name) {
        Some(Symbol::Variable(id)) => Ok(id),
        other => Err(missing(name, SymbolKind::Variable, other)),
    }
}

fn missing(name: &Identifier, expected: SymbolKind, found: Option<Symbol>) -> NameError {
    match found {
        Some(symbol) => NameError::WrongKind {
            name: name.name.clone(),
            expected,
            found: symbol.kind(),
            span: name.span.clone(),
        },
        None => NameError::Unresolved {
            segment: name.name.clone(),
            span: name.span.clone(),
        },
    }
}
