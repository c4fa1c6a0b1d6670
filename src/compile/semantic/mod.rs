use thiserror::Error;
use tracing::debug;

use crate::compile::ast::{Ast, SourcePos};

pub mod builtins;
pub mod lowering;
pub mod names;
pub mod prototypes;
pub mod symbols;

use symbols::{MAX_SCOPE_DEPTH, Module, SymbolKind};

/// Name of the module built from the input file.
pub const MAIN_MODULE: &str = "main";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("`{name}` is already declared in this scope")]
    Duplicate { name: String, span: SourcePos },

    #[error("`{name}` is a reserved word")]
    Reserved { name: String, span: SourcePos },

    #[error("cannot resolve `{segment}`")]
    Unresolved { segment: String, span: SourcePos },

    #[error("unable to resolve `{name}` within {} scopes, possible scope cycle", MAX_SCOPE_DEPTH)]
    ScopeDepthExceeded { name: String, span: SourcePos },

    #[error("`{name}` is a {found}, expected a {expected}")]
    WrongKind {
        name: String,
        expected: SymbolKind,
        found: SymbolKind,
        span: SourcePos,
    },
}

impl NameError {
    pub fn span(&self) -> SourcePos {
        match self {
            Self::Duplicate { span, .. }
            | Self::Reserved { span, .. }
            | Self::Unresolved { span, .. }
            | Self::ScopeDepthExceeded { span, .. }
            | Self::WrongKind { span, .. } => span.clone(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedConstructError {
    #[error("library \"{library}\" is not supported, only \"stdio.h\" is")]
    Library { library: String, span: SourcePos },

    #[error("{kind} statements are not supported")]
    Statement { kind: &'static str, span: SourcePos },

    #[error("`{name}` returns void and has no value")]
    VoidValue { name: String, span: SourcePos },

    #[error("prototype of `{name}` was already completed")]
    PrototypeAlreadyComplete { name: String, span: SourcePos },

    #[error("body of `{name}` was already completed")]
    BodyAlreadyComplete { name: String, span: SourcePos },

    #[error("`{name}` is used before its prototype is complete")]
    IncompletePrototype { name: String, span: SourcePos },
}

impl UnsupportedConstructError {
    pub fn span(&self) -> SourcePos {
        match self {
            Self::Library { span, .. }
            | Self::Statement { span, .. }
            | Self::VoidValue { span, .. }
            | Self::PrototypeAlreadyComplete { span, .. }
            | Self::BodyAlreadyComplete { span, .. }
            | Self::IncompletePrototype { span, .. } => span.clone(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedConstructError),

    #[error("integer literal {literal} does not fit into i32")]
    IntLiteralOutOfBounds { literal: String, span: SourcePos },
}

impl SemanticError {
    pub fn span(&self) -> SourcePos {
        match self {
            Self::Name(err) => err.span(),
            Self::Unsupported(err) => err.span(),
            Self::IntLiteralOutOfBounds { span, .. } => span.clone(),
        }
    }
}

/// Runs name collection, prototype completion and body lowering, each over
/// the whole module before the next one starts.
pub fn analyze(ast: &Ast) -> Result<Module, SemanticError> {
    let mut module = Module::new(MAIN_MODULE);

    names::collect(&mut module, ast)?;
    debug!(
        symbols = module.scopes().scope(module.root()).entries().count(),
        "collected names"
    );

    prototypes::complete(&mut module, ast)?;
    debug!("completed prototypes");

    lowering::lower_bodies(&mut module, ast)?;
    debug!("lowered function bodies");

    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{
        ast::BinaryOp,
        ir::{IrExpr, IrLiteral, IrStmt},
        parser::{lex::tokenize, parse::parse_module, stream::TokenStream},
        semantic::symbols::{Function, Symbol},
    };

    fn analyze_src(src: &str) -> Result<Module, SemanticError> {
        let tokens = tokenize(src).unwrap();
        let ast = parse_module(TokenStream::new(tokens, src.len())).unwrap();
        analyze(&ast)
    }

    fn function<'m>(module: &'m Module, name: &str) -> &'m Function {
        match module.local(module.root(), name) {
            Some(Symbol::Function(id)) => module.function(id),
            other => panic!("expected function `{name}`, found {other:?}"),
        }
    }

    #[test]
    fn duplicate_top_level_names_fail_before_prototypes() {
        // `nope` would be an unresolved type if prototypes were completed
        let err = analyze_src(
            "function f() -> nope { return 1; } let f: i32 = 2;",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SemanticError::Name(NameError::Duplicate { ref name, .. }) if name == "f"
        ));

        let err = analyze_src(
            "function g() -> i32 { return 1; } function g() -> i32 { return 2; }",
        )
        .unwrap_err();
        assert!(matches!(err, SemanticError::Name(NameError::Duplicate { .. })));
    }

    #[test]
    fn builtin_and_keyword_names_cannot_be_redeclared() {
        let err = analyze_src("let i32: i32 = 1;").unwrap_err();
        assert!(matches!(err, SemanticError::Name(NameError::Duplicate { .. })));

        let err = analyze_src("let int: i32 = 1;").unwrap_err();
        assert!(matches!(err, SemanticError::Name(NameError::Reserved { .. })));
    }

    #[test]
    fn temporary_prefix_is_reserved() {
        let err = analyze_src("function f() -> i32 { let qtmp_0: i32 = 5; return qtmp_0; }")
            .unwrap_err();
        assert!(matches!(
            err,
            SemanticError::Name(NameError::Reserved { ref name, .. }) if name == "qtmp_0"
        ));

        let err = analyze_src("function f(qtmp_x: i32) -> i32 { return qtmp_x; }").unwrap_err();
        assert!(matches!(err, SemanticError::Name(NameError::Reserved { .. })));

        assert!(analyze_src("function f(qtmp: i32) -> i32 { return qtmp; }").is_ok());
    }

    #[test]
    fn add_lowers_to_one_define_and_a_return() {
        let module = analyze_src("function add(a: i32, b: i32) -> i32 { return a + b; }").unwrap();
        let int = module.builtins().int;
        let add = function(&module, "add");

        let prototype = add.prototype().unwrap();
        assert_eq!(prototype.parameter_types, vec![int, int]);
        assert_eq!(prototype.parameter_names, vec!["a", "b"]);
        assert_eq!(prototype.return_type, int);

        let body = add.body().unwrap();
        assert_eq!(body.len(), 2);
        let IrStmt::Define { variable, ty, value } = &body[0] else {
            panic!("expected define, found {:?}", body[0]);
        };
        assert_eq!(*ty, int);
        assert_eq!(module.variable(*variable).name, "%0");
        let IrExpr::Operator { op, operands } = value else {
            panic!("expected operator, found {value:?}");
        };
        assert_eq!(*op, BinaryOp::Add);
        let names: Vec<_> = operands.iter().map(|v| module.variable(*v).name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        assert_eq!(body[1], IrStmt::Return(*variable));
    }

    #[test]
    fn stdio_import_exposes_printf() {
        let module = analyze_src(r#"module io = import("stdio.h");"#).unwrap();
        let builtins = module.builtins();

        let Some(Symbol::Module(scope)) = module.local(module.root(), "io") else {
            panic!("expected module");
        };
        assert_eq!(module.scopes().scope(scope).name(), "stdio.h");

        let printf = module
            .resolve_function(module.root(), "io::printf", &(0..0))
            .unwrap();
        let prototype = module.function(printf).prototype().unwrap();
        assert_eq!(prototype.parameter_types, vec![builtins.string]);
        assert_eq!(prototype.parameter_names, vec!["format"]);
        assert_eq!(prototype.return_type, builtins.int);
        assert!(module.function(printf).body().is_none());

        assert_eq!(
            module.local(scope, "i32"),
            Some(Symbol::DataType(builtins.int))
        );
        assert_eq!(module.imports().len(), 1);
        assert_eq!(module.imports()[0].library, "stdio.h");
    }

    #[test]
    fn other_libraries_are_unsupported() {
        let src = r#"module x = import("not_stdio.h");"#;
        let err = analyze_src(src).unwrap_err();

        let SemanticError::Unsupported(UnsupportedConstructError::Library { library, span }) = err
        else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(library, "not_stdio.h");
        assert_eq!(&src[span], r#""not_stdio.h""#);
    }

    #[test]
    fn if_branches_lower_into_independent_blocks() {
        let module = analyze_src(
            "function f(c: i32) -> i32 { if c { return 1; } else { return 2; } }",
        )
        .unwrap();
        let body = function(&module, "f").body().unwrap();

        assert_eq!(body.len(), 1);
        let IrStmt::If {
            condition,
            if_body,
            else_body,
        } = &body[0]
        else {
            panic!("expected if, found {:?}", body[0]);
        };
        assert_eq!(module.variable(*condition).name, "c");

        for (branch, expected) in [(if_body, 1), (else_body, 2)] {
            assert_eq!(branch.len(), 2);
            let IrStmt::Define { variable, value, .. } = &branch[0] else {
                panic!("expected define");
            };
            assert_eq!(*value, IrExpr::Literal(IrLiteral::Integer(expected)));
            assert_eq!(branch[1], IrStmt::Return(*variable));
        }
    }

    #[test]
    fn branch_locals_do_not_leak() {
        let err = analyze_src(
            "function f() -> i32 { if 1 { let x: i32 = 1; } return x; }",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SemanticError::Name(NameError::Unresolved { ref segment, .. }) if segment == "x"
        ));
    }

    #[test]
    fn temporaries_restart_in_every_function() {
        let module = analyze_src(
            "function f() -> i32 { return 1 + 2; } function g() -> i32 { return 3; }",
        )
        .unwrap();

        let names = |name: &str| -> Vec<String> {
            function(&module, name)
                .body()
                .unwrap()
                .iter()
                .filter_map(|stmt| match stmt {
                    IrStmt::Define { variable, .. } => Some(module.variable(*variable).name.clone()),
                    _ => None,
                })
                .collect()
        };

        assert_eq!(names("f"), ["%0", "%1", "%2"]);
        assert_eq!(names("g"), ["%0"]);
    }

    #[test]
    fn statement_calls_do_not_bind_a_temporary() {
        let module = analyze_src(
            r#"module io = import("stdio.h"); function main() -> i32 { io::printf("hi"); return 0; }"#,
        )
        .unwrap();
        let body = function(&module, "main").body().unwrap();

        assert_eq!(body.len(), 4);
        assert!(matches!(body[1], IrStmt::ExprStmt(_)));
    }

    #[test]
    fn void_calls_have_no_value() {
        let src = "function g() -> void { } function f() -> i32 { g(); return 0; }";
        assert!(analyze_src(src).is_ok());

        let src = "function g() -> void { } function f() -> i32 { let x: i32 = g(); return 0; }";
        let err = analyze_src(src).unwrap_err();
        assert!(matches!(
            err,
            SemanticError::Unsupported(UnsupportedConstructError::VoidValue { ref name, .. }) if name == "g"
        ));
        assert_eq!(err.span(), 60..63);

        let err = analyze_src("function g() -> void { } function f() -> i32 { return g(); }")
            .unwrap_err();
        assert!(matches!(err, SemanticError::Unsupported(UnsupportedConstructError::VoidValue { .. })));
    }

    #[test]
    fn resolution_depth_is_bounded() {
        fn nested(depth: usize) -> String {
            let mut src = String::from("let g: i32 = 1; function f() -> i32 { ");
            src.push_str(&"if 1 { ".repeat(depth));
            src.push_str("return g; ");
            src.push_str(&"} ".repeat(depth));
            src.push_str("return 0; }");
            src
        }

        assert!(analyze_src(&nested(10)).is_ok());

        let err = analyze_src(&nested(40)).unwrap_err();
        assert!(matches!(
            err,
            SemanticError::Name(NameError::ScopeDepthExceeded { ref name, .. }) if name == "g"
        ));
    }

    #[test]
    fn unsupported_statements_are_rejected() {
        let err = analyze_src("function f() -> i32 { let x: i32 = 1; x = 2; return x; }")
            .unwrap_err();
        assert!(matches!(
            err,
            SemanticError::Unsupported(UnsupportedConstructError::Statement { kind: "assignment", .. })
        ));

        let err = analyze_src("function f() -> i32 { 1 + 2; return 0; }").unwrap_err();
        assert!(matches!(
            err,
            SemanticError::Unsupported(UnsupportedConstructError::Statement { kind: "expression", .. })
        ));
    }

    #[test]
    fn unresolved_names_are_reported() {
        let src = "function f() -> i32 { return missing(1); }";
        let err = analyze_src(src).unwrap_err();
        assert_eq!(&src[err.span()], "missing");
        assert_eq!(err.to_string(), "cannot resolve `missing`");

        let err = analyze_src("function f(a: text) -> i32 { return 0; }").unwrap_err();
        assert!(matches!(
            err,
            SemanticError::Name(NameError::Unresolved { ref segment, .. }) if segment == "text"
        ));
    }

    #[test]
    fn out_of_range_literals_are_rejected() {
        let err = analyze_src("function f() -> i32 { return 2147483648; }").unwrap_err();
        assert!(matches!(err, SemanticError::IntLiteralOutOfBounds { .. }));

        let err = analyze_src("let big: i32 = 99999999999;").unwrap_err();
        assert!(matches!(err, SemanticError::IntLiteralOutOfBounds { .. }));
    }

    #[test]
    fn operator_result_takes_first_operand_type() {
        let module = analyze_src(r#"function f(s: cstr) -> i32 { return s + 1; }"#).unwrap();
        let body = function(&module, "f").body().unwrap();

        let IrStmt::Define { ty, .. } = &body[1] else {
            panic!("expected define");
        };
        assert_eq!(*ty, module.builtins().string);
    }
}
