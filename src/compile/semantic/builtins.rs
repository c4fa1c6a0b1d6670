use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::compile::{
    ast::{BinaryOp, ImportStmt},
    semantic::{
        SemanticError, UnsupportedConstructError,
        symbols::{Builtins, DataType, Module, Prototype, Symbol},
    },
};

/// C89 and C99 keywords. User names must not collide with them since they
/// are emitted verbatim.
pub const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void",
    "volatile", "while", "inline", "restrict", "_Bool", "_Complex", "_Imaginary",
];

pub const STDIO: &str = "stdio.h";

pub fn reserved_names() -> HashSet<String> {
    C_KEYWORDS.iter().map(|keyword| keyword.to_string()).collect()
}

pub(super) fn create_types(module: &mut Module) -> Builtins {
    let int = module.add_type(DataType {
        name: "i32".into(),
        emitted_name: "int32_t".into(),
        operator_results: BTreeMap::new(),
    });
    let string = module.add_type(DataType {
        name: "cstr".into(),
        emitted_name: "char *".into(),
        operator_results: BTreeMap::new(),
    });
    let void = module.add_type(DataType {
        name: "void".into(),
        emitted_name: "void".into(),
        operator_results: BTreeMap::new(),
    });

    let arithmetic = [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div];
    module.set_operator_results(int, arithmetic.map(|op| (op, int)));

    Builtins { int, string, void }
}

/// Builds the module scope for `module <alias> = import("<library>");`.
pub fn import_library(module: &mut Module, import: &ImportStmt) -> Result<(), SemanticError> {
    let ImportStmt {
        alias,
        library,
        library_span,
        span,
    } = import;

    if library != STDIO {
        return Err(UnsupportedConstructError::Library {
            library: library.clone(),
            span: library_span.clone(),
        }
        .into());
    }

    let scope = module.add_import_scope(library);
    let Builtins { int, string, .. } = module.builtins();

    let printf = module.add_function("printf", span.clone());
    module.function_mut(printf).complete_prototype(Prototype {
        parameter_types: vec![string],
        parameter_names: vec!["format".into()],
        return_type: int,
    })?;
    module.declare(scope, "printf", Symbol::Function(printf), span)?;

    module.add_import(&alias.name, library, scope, &alias.span)?;
    debug!(alias = %alias.name, library, "imported library");

    Ok(())
}
