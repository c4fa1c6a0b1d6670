use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::compile::{
    ast::{BinaryOp, SourcePos},
    ir::{IrLiteral, IrStmt},
    semantic::{NameError, UnsupportedConstructError, builtins},
};
pub use crate::datstructures::scope_tree::ScopeId;
use crate::datstructures::scope_tree::{ScopeError, ScopeTree};

/// Parent hops a lookup may take before giving up.
pub const MAX_SCOPE_DEPTH: usize = 32;

pub const NAMESPACE_SEPARATOR: &str = "::";

/// Temporaries `%N` are emitted as `qtmp_N`, so user names may not start
/// with this prefix.
pub const TEMPORARY_PREFIX: &str = "qtmp_";

macro_rules! arena_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(usize);
    };
}

arena_id!(TypeId);
arena_id!(VariableId);
arena_id!(FunctionId);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Symbol {
    DataType(TypeId),
    Variable(VariableId),
    Function(FunctionId),
    Module(ScopeId),
}

impl Symbol {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::DataType(_) => SymbolKind::DataType,
            Symbol::Variable(_) => SymbolKind::Variable,
            Symbol::Function(_) => SymbolKind::Function,
            Symbol::Module(_) => SymbolKind::Module,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SymbolKind {
    DataType,
    Variable,
    Function,
    Module,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymbolKind::DataType => "type",
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Module => "module",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataType {
    pub name: String,
    /// Spelling in the generated C code.
    pub emitted_name: String,
    pub operator_results: BTreeMap<BinaryOp, TypeId>,
}

/// Initial value of a module level variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Initializer {
    Literal(IrLiteral),
    /// Anything that would need code to run before `main`.
    Expression(SourcePos),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub span: SourcePos,
    ty: Option<TypeId>,
    initializer: Option<Initializer>,
}

impl Variable {
    pub fn ty(&self) -> Option<TypeId> {
        self.ty
    }

    pub fn initializer(&self) -> Option<&Initializer> {
        self.initializer.as_ref()
    }

    pub fn complete_prototype(
        &mut self,
        ty: TypeId,
        initializer: Option<Initializer>,
    ) -> Result<(), UnsupportedConstructError> {
        if self.ty.is_some() {
            return Err(UnsupportedConstructError::PrototypeAlreadyComplete {
                name: self.name.clone(),
                span: self.span.clone(),
            });
        }

        self.ty = Some(ty);
        self.initializer = initializer;

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Prototype {
    pub parameter_types: Vec<TypeId>,
    pub parameter_names: Vec<String>,
    pub return_type: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Function {
    pub name: String,
    pub span: SourcePos,
    prototype: Option<Prototype>,
    body: Option<Vec<IrStmt>>,
    scope: Option<ScopeId>,
}

impl Function {
    pub fn prototype(&self) -> Option<&Prototype> {
        self.prototype.as_ref()
    }

    pub fn body(&self) -> Option<&[IrStmt]> {
        self.body.as_deref()
    }

    /// Scope holding the parameters and temporaries, once the body is lowered.
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }

    pub fn complete_prototype(&mut self, prototype: Prototype) -> Result<(), UnsupportedConstructError> {
        if self.prototype.is_some() {
            return Err(UnsupportedConstructError::PrototypeAlreadyComplete {
                name: self.name.clone(),
                span: self.span.clone(),
            });
        }

        self.prototype = Some(prototype);

        Ok(())
    }

    pub fn complete_body(
        &mut self,
        scope: ScopeId,
        body: Vec<IrStmt>,
    ) -> Result<(), UnsupportedConstructError> {
        if self.body.is_some() {
            return Err(UnsupportedConstructError::BodyAlreadyComplete {
                name: self.name.clone(),
                span: self.span.clone(),
            });
        }

        self.scope = Some(scope);
        self.body = Some(body);

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Builtins {
    pub int: TypeId,
    pub string: TypeId,
    pub void: TypeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Import {
    pub alias: String,
    pub library: String,
    pub scope: ScopeId,
}

/// Result of analysing one compilation unit. Owns every symbol and the
/// scope tree, including the scopes of imported modules.
#[derive(Clone, Debug)]
pub struct Module {
    scopes: ScopeTree<String, Symbol>,
    root: ScopeId,
    types: Vec<DataType>,
    variables: Vec<Variable>,
    functions: Vec<Function>,
    imports: Vec<Import>,
    builtins: Builtins,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        let mut scopes = ScopeTree::new();
        let root = scopes.add_root(name, builtins::reserved_names());

        let mut module = Module {
            scopes,
            root,
            types: Vec::new(),
            variables: Vec::new(),
            functions: Vec::new(),
            imports: Vec::new(),
            builtins: Builtins {
                int: TypeId(0),
                string: TypeId(0),
                void: TypeId(0),
            },
        };
        module.builtins = builtins::create_types(&mut module);
        module.seed_builtins(root);

        module
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn builtins(&self) -> Builtins {
        self.builtins
    }

    pub fn scopes(&self) -> &ScopeTree<String, Symbol> {
        &self.scopes
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn data_type(&self, id: TypeId) -> &DataType {
        &self.types[id.0]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variable_mut(&mut self, id: VariableId) -> &mut Variable {
        &mut self.variables[id.0]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0]
    }

    pub fn add_type(&mut self, data_type: DataType) -> TypeId {
        self.types.push(data_type);
        TypeId(self.types.len() - 1)
    }

    pub fn set_operator_results(
        &mut self,
        ty: TypeId,
        results: impl IntoIterator<Item = (BinaryOp, TypeId)>,
    ) {
        self.types[ty.0].operator_results.extend(results);
    }

    pub fn add_variable(&mut self, name: impl Into<String>, span: SourcePos) -> VariableId {
        self.variables.push(Variable {
            name: name.into(),
            span,
            ty: None,
            initializer: None,
        });
        VariableId(self.variables.len() - 1)
    }

    /// Variable whose type is known up front: parameters, locals and temporaries.
    pub fn add_typed_variable(
        &mut self,
        name: impl Into<String>,
        ty: TypeId,
        span: SourcePos,
    ) -> VariableId {
        let id = self.add_variable(name, span);
        self.variables[id.0].ty = Some(ty);
        id
    }

    pub fn add_function(&mut self, name: impl Into<String>, span: SourcePos) -> FunctionId {
        self.functions.push(Function {
            name: name.into(),
            span,
            prototype: None,
            body: None,
            scope: None,
        });
        FunctionId(self.functions.len() - 1)
    }

    pub fn child_scope(&mut self, parent: ScopeId, name: impl Into<String>) -> ScopeId {
        self.scopes.add_child(parent, name)
    }

    /// Registers a user visible name. Fails if the scope already has it, if
    /// it is a C keyword or if it could clash with an emitted temporary.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        symbol: Symbol,
        span: &SourcePos,
    ) -> Result<(), NameError> {
        if name.starts_with(TEMPORARY_PREFIX) {
            return Err(NameError::Reserved {
                name: name.to_string(),
                span: span.clone(),
            });
        }

        self.scopes
            .insert(scope, name.to_string(), symbol)
            .map_err(|err| match err {
                ScopeError::Reserved => NameError::Reserved {
                    name: name.to_string(),
                    span: span.clone(),
                },
                _ => NameError::Duplicate {
                    name: name.to_string(),
                    span: span.clone(),
                },
            })
    }

    /// Every module sees the same three builtin handles, so type identity
    /// holds across imports.
    fn seed_builtins(&mut self, scope: ScopeId) {
        let Builtins { int, string, void } = self.builtins;

        for id in [int, string, void] {
            let name = self.types[id.0].name.clone();
            if self
                .scopes
                .insert_unreserved(scope, name, Symbol::DataType(id))
                .is_err()
            {
                unreachable!("builtin types are seeded into fresh scopes");
            }
        }
    }

    /// Creates the root scope of an imported module.
    pub fn add_import_scope(&mut self, library: &str) -> ScopeId {
        let scope = self.scopes.add_root(library, builtins::reserved_names());
        self.seed_builtins(scope);
        scope
    }

    pub fn add_import(&mut self, alias: &str, library: &str, scope: ScopeId, span: &SourcePos) -> Result<(), NameError> {
        self.declare(self.root, alias, Symbol::Module(scope), span)?;
        self.imports.push(Import {
            alias: alias.to_string(),
            library: library.to_string(),
            scope,
        });

        Ok(())
    }

    /// Symbol declared directly in `scope`, ignoring parents.
    pub fn local(&self, scope: ScopeId, name: &str) -> Option<Symbol> {
        self.scopes.scope(scope).get(name).copied()
    }

    /// Resolves a possibly `::`-joined path. The first segment is searched
    /// through the parent chain, the remaining ones inside module scopes.
    pub fn resolve(&self, scope: ScopeId, path: &str, span: &SourcePos) -> Result<Symbol, NameError> {
        let mut segments = path.split(NAMESPACE_SEPARATOR);
        let first = segments.next().unwrap_or(path);

        let found = self
            .scopes
            .lookup(scope, first, MAX_SCOPE_DEPTH)
            .map_err(|_| NameError::ScopeDepthExceeded {
                name: path.to_string(),
                span: span.clone(),
            })?;
        let Some((_, symbol)) = found else {
            return Err(NameError::Unresolved {
                segment: first.to_string(),
                span: span.clone(),
            });
        };

        let mut symbol = *symbol;
        for segment in segments {
            let Symbol::Module(module) = symbol else {
                return Err(NameError::WrongKind {
                    name: path.to_string(),
                    expected: SymbolKind::Module,
                    found: symbol.kind(),
                    span: span.clone(),
                });
            };

            symbol = self.local(module, segment).ok_or_else(|| NameError::Unresolved {
                segment: segment.to_string(),
                span: span.clone(),
            })?;
        }

        Ok(symbol)
    }

    pub fn resolve_type(&self, scope: ScopeId, name: &str, span: &SourcePos) -> Result<TypeId, NameError> {
        match self.resolve(scope, name, span)? {
            Symbol::DataType(id) => Ok(id),
            other => Err(wrong_kind(name, SymbolKind::DataType, other, span)),
        }
    }

    pub fn resolve_function(
        &self,
        scope: ScopeId,
        name: &str,
        span: &SourcePos,
    ) -> Result<FunctionId, NameError> {
        match self.resolve(scope, name, span)? {
            Symbol::Function(id) => Ok(id),
            other => Err(wrong_kind(name, SymbolKind::Function, other, span)),
        }
    }

    pub fn resolve_variable(
        &self,
        scope: ScopeId,
        name: &str,
        span: &SourcePos,
    ) -> Result<VariableId, NameError> {
        match self.resolve(scope, name, span)? {
            Symbol::Variable(id) => Ok(id),
            other => Err(wrong_kind(name, SymbolKind::Variable, other, span)),
        }
    }

    /// Functions of the module's own root scope, in declaration order.
    pub fn own_functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.scopes
            .scope(self.root)
            .entries()
            .filter_map(|(_, symbol)| match symbol {
                Symbol::Function(id) => Some((*id, self.function(*id))),
                _ => None,
            })
    }

    /// Variables of the module's own root scope, in declaration order.
    pub fn own_variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.scopes
            .scope(self.root)
            .entries()
            .filter_map(|(_, symbol)| match symbol {
                Symbol::Variable(id) => Some((*id, self.variable(*id))),
                _ => None,
            })
    }
}

fn wrong_kind(name: &str, expected: SymbolKind, found: Symbol, span: &SourcePos) -> NameError {
    NameError::WrongKind {
        name: name.to_string(),
        expected,
        found: found.kind(),
        span: span.clone(),
    }
}
