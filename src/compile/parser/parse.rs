use thiserror::Error;
use tracing::{debug, trace};

use crate::compile::ast::{
    Ast, BinaryOp, Expr, FunctionCall, FunctionDef, Identifier, IfStmt, ImportStmt, Item, Literal,
    ParameterDef, ReturnStmt, SourcePos, Stmt, TypeExpr, VariableDef, VariableMod, binop_precedence,
    int_literal::IntLiteral,
};
use crate::compile::parser::lex::{Token, TokenKind};
use crate::compile::parser::stream::TokenStream;

/// What the parser was looking for when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Token(TokenKind),
    Primary,
    ModuleItem,
    ArgumentSeparator,
    ParameterSeparator,
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(kind) => write!(f, "{kind}"),
            Self::Primary => f.write_str("an identifier, literal or `(`"),
            Self::ModuleItem => f.write_str("`function`, `module` or `let`"),
            Self::ArgumentSeparator | Self::ParameterSeparator => f.write_str("`,` or `)`"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("expected {expected}, found {}", .found.map_or("end of input".to_string(), |kind| kind.to_string()))]
pub struct SyntaxError {
    pub expected: Expected,
    /// `None` when the input ended.
    pub found: Option<TokenKind>,
    pub lexeme: Option<String>,
    pub span: SourcePos,
}

impl SyntaxError {
    pub fn span(&self) -> SourcePos {
        self.span.clone()
    }
}

pub fn parse_module(stream: TokenStream<'_>) -> Result<Ast, SyntaxError> {
    let mut parser = Parser { stream };
    let ast = parser.parse_items()?;
    debug!(items = ast.items.len(), "parsed module");

    Ok(ast)
}

/// Parses a single expression that must make up the whole input.
pub fn parse_expression(stream: TokenStream<'_>) -> Result<Expr, SyntaxError> {
    let mut parser = Parser { stream };
    let expr = parser.parse_expression()?;

    if let Some((token, span)) = parser.stream.peek(0) {
        return Err(SyntaxError {
            expected: Expected::Token(TokenKind::SEMICOLON),
            found: Some(token.kind),
            lexeme: Some(token.lexeme.to_string()),
            span: span.clone(),
        });
    }

    Ok(expr)
}

struct Parser<'src> {
    stream: TokenStream<'src>,
}

impl<'src> Parser<'src> {
    fn parse_items(&mut self) -> Result<Ast, SyntaxError> {
        let mut items = Vec::new();

        while let Some((token, _)) = self.stream.peek(0) {
            let item = match token.kind {
                TokenKind::FUNCTION => Item::Function(self.parse_function()?),
                TokenKind::MODULE => Item::Import(self.parse_import()?),
                TokenKind::LET => Item::Variable(self.parse_let()?),
                _ => return Err(self.unexpected(Expected::ModuleItem)),
            };

            trace!(span = ?item.span(), "parsed module item");
            items.push(item);
        }

        Ok(Ast { items })
    }

    // function NAME ( params? ) -> TYPE { stmt* }
    fn parse_function(&mut self) -> Result<FunctionDef, SyntaxError> {
        let start = self.eat(TokenKind::FUNCTION)?.1.start;
        let name = self.parse_identifier()?;

        self.eat(TokenKind::L_ROUND)?;
        let mut parameters = Vec::new();
        if self.check(TokenKind::R_ROUND) {
            self.eat(TokenKind::R_ROUND)?;
        } else {
            loop {
                parameters.push(self.parse_parameter()?);

                match self.peek_kind() {
                    Some(TokenKind::COMMA) => {
                        self.eat(TokenKind::COMMA)?;
                    }
                    Some(TokenKind::R_ROUND) => {
                        self.eat(TokenKind::R_ROUND)?;
                        break;
                    }
                    _ => return Err(self.unexpected(Expected::ParameterSeparator)),
                }
            }
        }

        self.eat(TokenKind::ARROW)?;
        let return_type = self.parse_type()?;
        let body = self.parse_block()?;

        Ok(FunctionDef {
            name,
            parameters,
            return_type,
            body,
            span: start..self.stream.previous_span().end,
        })
    }

    fn parse_parameter(&mut self) -> Result<ParameterDef, SyntaxError> {
        let name = self.parse_identifier()?;
        self.eat(TokenKind::COLON)?;
        let ty = self.parse_type()?;
        let span = name.span.start..ty.span.end;

        Ok(ParameterDef { name, ty, span })
    }

    // module ALIAS = import ( STRING ) ;
    fn parse_import(&mut self) -> Result<ImportStmt, SyntaxError> {
        let start = self.eat(TokenKind::MODULE)?.1.start;
        let alias = self.parse_identifier()?;
        self.eat(TokenKind::EQ)?;
        self.eat(TokenKind::IMPORT)?;
        self.eat(TokenKind::L_ROUND)?;
        let (library, library_span) = self.eat(TokenKind::STRING)?;
        self.eat(TokenKind::R_ROUND)?;
        let end = self.eat(TokenKind::SEMICOLON)?.1.end;

        Ok(ImportStmt {
            alias,
            library: strip_quotes(library.lexeme).to_string(),
            library_span,
            span: start..end,
        })
    }

    // let NAME : TYPE = expr ;
    fn parse_let(&mut self) -> Result<VariableDef, SyntaxError> {
        let start = self.eat(TokenKind::LET)?.1.start;
        let name = self.parse_identifier()?;
        self.eat(TokenKind::COLON)?;
        let ty = self.parse_type()?;
        self.eat(TokenKind::EQ)?;
        let value = self.parse_expression()?;
        let end = self.eat(TokenKind::SEMICOLON)?.1.end;

        Ok(VariableDef {
            name,
            ty,
            value,
            span: start..end,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.eat(TokenKind::L_CURLY)?;

        let mut stmts = Vec::new();
        while !self.check(TokenKind::R_CURLY) {
            if self.stream.is_at_end() {
                return Err(self.unexpected(Expected::Token(TokenKind::R_CURLY)));
            }

            stmts.push(self.parse_statement()?);
        }

        self.eat(TokenKind::R_CURLY)?;

        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::LET) => Ok(Stmt::Let(self.parse_let()?)),
            Some(TokenKind::RETURN) => {
                let start = self.eat(TokenKind::RETURN)?.1.start;
                let value = self.parse_expression()?;
                let end = self.eat(TokenKind::SEMICOLON)?.1.end;

                Ok(Stmt::Return(ReturnStmt {
                    value,
                    span: start..end,
                }))
            }
            Some(TokenKind::IF) => Ok(Stmt::If(self.parse_if()?)),
            Some(TokenKind::IDENT) if self.peek_kind_at(1) == Some(TokenKind::EQ) => {
                let name = self.parse_identifier()?;
                self.eat(TokenKind::EQ)?;
                let value = self.parse_expression()?;
                let end = self.eat(TokenKind::SEMICOLON)?.1.end;
                let span = name.span.start..end;

                Ok(Stmt::Assign(VariableMod { name, value, span }))
            }
            _ => {
                let expr = self.parse_expression()?;
                let end = self.eat(TokenKind::SEMICOLON)?.1.end;
                let span = expr.span().start..end;

                Ok(Stmt::Expr(expr, span))
            }
        }
    }

    // if expr { ... } (else { ... })?
    fn parse_if(&mut self) -> Result<IfStmt, SyntaxError> {
        let start = self.eat(TokenKind::IF)?.1.start;
        let condition = self.parse_expression()?;
        let if_block = self.parse_block()?;

        let mut else_block = Vec::new();
        if self.check(TokenKind::ELSE) {
            self.eat(TokenKind::ELSE)?;
            else_block = self.parse_block()?;
        }

        Ok(IfStmt {
            condition,
            if_block,
            else_block,
            span: start..self.stream.previous_span().end,
        })
    }

    fn parse_type(&mut self) -> Result<TypeExpr, SyntaxError> {
        self.parse_identifier()
    }

    fn parse_identifier(&mut self) -> Result<Identifier, SyntaxError> {
        let (token, span) = self.eat(TokenKind::IDENT)?;

        Ok(Identifier::new(token.lexeme, span))
    }

    //////////////////
    // Expressions //
    /////////////////

    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.parse_primary()?;
        self.parse_binop_rhs(0, lhs)
    }

    /// Precedence climbing. Consumes operators binding at least as tightly as
    /// `min_precedence`; equal precedence chains associate to the left.
    fn parse_binop_rhs(&mut self, min_precedence: i32, mut lhs: Expr) -> Result<Expr, SyntaxError> {
        loop {
            let precedence = binop_precedence(self.peek_kind());
            if precedence < min_precedence {
                return Ok(lhs);
            }

            let Some((token, _)) = self.stream.advance() else {
                return Ok(lhs);
            };
            let Some(op) = BinaryOp::from_token(token.kind) else {
                unreachable!("token {:?} has a precedence but no operator", token.kind);
            };

            let mut rhs = self.parse_primary()?;

            let next_precedence = binop_precedence(self.peek_kind());
            if precedence < next_precedence {
                rhs = self.parse_binop_rhs(precedence + 1, rhs)?;
            }

            lhs = Expr::binary(op, lhs, rhs);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::IDENT) => self.parse_leading_identifier(),
            Some(TokenKind::INTEGER) => {
                let (token, span) = self.eat(TokenKind::INTEGER)?;
                Ok(Expr::Literal(
                    Literal::Integer(IntLiteral::new(token.lexeme.to_string())),
                    span,
                ))
            }
            Some(TokenKind::STRING) => {
                let (token, span) = self.eat(TokenKind::STRING)?;
                Ok(Expr::Literal(
                    Literal::String(strip_quotes(token.lexeme).to_string()),
                    span,
                ))
            }
            Some(TokenKind::L_ROUND) => {
                self.eat(TokenKind::L_ROUND)?;
                let expr = self.parse_expression()?;
                self.eat(TokenKind::R_ROUND)?;
                Ok(expr)
            }
            _ => Err(self.unexpected(Expected::Primary)),
        }
    }

    // IDENT (:: IDENT)* callArgs?
    fn parse_leading_identifier(&mut self) -> Result<Expr, SyntaxError> {
        let first = self.parse_identifier()?;

        let mut name = first.name;
        let start = first.span.start;
        let mut end = first.span.end;
        while self.check(TokenKind::COLON_COLON) {
            self.eat(TokenKind::COLON_COLON)?;
            let segment = self.parse_identifier()?;
            name.push_str("::");
            name.push_str(&segment.name);
            end = segment.span.end;
        }

        let ident = Identifier::new(name, start..end);

        if !self.check(TokenKind::L_ROUND) {
            return Ok(Expr::Ident(ident));
        }

        self.eat(TokenKind::L_ROUND)?;
        let mut arguments = Vec::new();
        if !self.check(TokenKind::R_ROUND) {
            loop {
                arguments.push(self.parse_expression()?);

                match self.peek_kind() {
                    Some(TokenKind::COMMA) => {
                        self.eat(TokenKind::COMMA)?;
                    }
                    Some(TokenKind::R_ROUND) => break,
                    _ => return Err(self.unexpected(Expected::ArgumentSeparator)),
                }
            }
        }
        let end = self.eat(TokenKind::R_ROUND)?.1.end;

        Ok(Expr::Call(FunctionCall {
            name: ident,
            arguments,
            span: start..end,
        }))
    }

    /////////////
    // Helpers //
    /////////////

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek_kind_at(0)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.stream.peek(offset).map(|(token, _)| token.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn eat(&mut self, kind: TokenKind) -> Result<(Token<'src>, SourcePos), SyntaxError> {
        if !self.check(kind) {
            return Err(self.unexpected(Expected::Token(kind)));
        }

        match self.stream.advance() {
            Some(spanned) => Ok(spanned),
            None => Err(self.unexpected(Expected::Token(kind))),
        }
    }

    fn unexpected(&self, expected: Expected) -> SyntaxError {
        match self.stream.peek(0) {
            Some((token, span)) => SyntaxError {
                expected,
                found: Some(token.kind),
                lexeme: Some(token.lexeme.to_string()),
                span: span.clone(),
            },
            None => SyntaxError {
                expected,
                found: None,
                lexeme: None,
                span: self.stream.end_span(),
            },
        }
    }
}

fn strip_quotes(lexeme: &str) -> &str {
    lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme)
}
