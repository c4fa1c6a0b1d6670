//! JSON views of the intermediate results, written next to the output when
//! `--dump-dir` is given.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::compile::{
    ast::Ast,
    ir::IrStmt,
    parser::{Spanned, lex::Token},
    semantic::symbols::{Initializer, Module, ScopeId, Symbol, TypeId},
};

pub fn tokens_json(tokens: &[Spanned<Token<'_>>]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(tokens)
}

pub fn ast_json(ast: &Ast) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(ast)
}

pub fn analysis_json(module: &Module) -> Result<String, serde_json::Error> {
    let mut visited = HashSet::new();
    let dump = dump_scope(module, module.root(), &mut visited);

    serde_json::to_string_pretty(&dump)
}

#[derive(Serialize)]
struct ScopeDump<'m> {
    name: &'m str,
    scope: ScopeId,
    /// `None` for a module scope already dumped elsewhere.
    symbols: Option<Vec<Entry<'m>>>,
}

#[derive(Serialize)]
struct Entry<'m> {
    name: &'m str,
    symbol: SymbolDump<'m>,
}

#[derive(Serialize)]
#[serde(tag = "metatype")]
enum SymbolDump<'m> {
    DataType {
        id: TypeId,
        emitted_name: &'m str,
        ops: BTreeMap<String, &'m str>,
    },
    Variable {
        ty: Option<&'m str>,
        initializer: Option<&'m Initializer>,
    },
    Function {
        parameter_names: Option<&'m [String]>,
        parameter_types: Option<Vec<&'m str>>,
        return_type: Option<&'m str>,
        locals: Option<Vec<&'m str>>,
        body: Option<&'m [IrStmt]>,
    },
    Module(ScopeDump<'m>),
}

fn type_name(module: &Module, ty: TypeId) -> &str {
    &module.data_type(ty).name
}

fn dump_scope<'m>(module: &'m Module, scope: ScopeId, visited: &mut HashSet<ScopeId>) -> ScopeDump<'m> {
    let name = module.scopes().scope(scope).name();

    // imports may be cyclic once modules can import each other
    if !visited.insert(scope) {
        return ScopeDump {
            name,
            scope,
            symbols: None,
        };
    }

    let symbols = module
        .scopes()
        .scope(scope)
        .entries()
        .map(|(name, symbol)| Entry {
            name: name.as_str(),
            symbol: dump_symbol(module, *symbol, visited),
        })
        .collect();

    ScopeDump {
        name,
        scope,
        symbols: Some(symbols),
    }
}

fn dump_symbol<'m>(module: &'m Module, symbol: Symbol, visited: &mut HashSet<ScopeId>) -> SymbolDump<'m> {
    match symbol {
        Symbol::DataType(id) => {
            let data_type = module.data_type(id);
            SymbolDump::DataType {
                id,
                emitted_name: &data_type.emitted_name,
                ops: data_type
                    .operator_results
                    .iter()
                    .map(|(op, ty)| (op.to_string(), type_name(module, *ty)))
                    .collect(),
            }
        }
        Symbol::Variable(id) => {
            let variable = module.variable(id);
            SymbolDump::Variable {
                ty: variable.ty().map(|ty| type_name(module, ty)),
                initializer: variable.initializer(),
            }
        }
        Symbol::Function(id) => {
            let function = module.function(id);
            let prototype = function.prototype();
            SymbolDump::Function {
                parameter_names: prototype.map(|p| p.parameter_names.as_slice()),
                parameter_types: prototype.map(|p| {
                    p.parameter_types
                        .iter()
                        .map(|ty| type_name(module, *ty))
                        .collect()
                }),
                return_type: prototype.map(|p| type_name(module, p.return_type)),
                locals: function.scope().map(|scope| {
                    module
                        .scopes()
                        .scope(scope)
                        .entries()
                        .map(|(name, _)| name.as_str())
                        .collect()
                }),
                body: function.body(),
            }
        }
        Symbol::Module(scope) => SymbolDump::Module(dump_scope(module, scope, visited)),
    }
}
