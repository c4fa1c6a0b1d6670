use std::process::Termination;

use chumsky::error::Rich;
use thiserror::Error;

use crate::compile::{
    ast::SourcePos, emit::EmitError, parser::parse::SyntaxError, semantic::SemanticError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitCode(u8);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAIL_PARSING: ExitCode = ExitCode(42);
    pub const FAIL_SEMANTIC: ExitCode = ExitCode(7);
    pub const FAIL_OTHER: ExitCode = ExitCode(255);

    pub fn code(self) -> u8 {
        self.0
    }
}

impl Termination for ExitCode {
    fn report(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self.0)
    }
}

impl From<&QuillError> for ExitCode {
    fn from(value: &QuillError) -> Self {
        match value {
            QuillError::LexerError(_) => ExitCode::FAIL_PARSING,
            QuillError::ParsingError(_) => ExitCode::FAIL_PARSING,
            QuillError::SemanticError(_) => ExitCode::FAIL_SEMANTIC,
            _ => ExitCode::FAIL_OTHER,
        }
    }
}

#[derive(Error, Debug)]
pub enum QuillError {
    #[error("Lexical Analysis failed.")]
    LexerError(Vec<Rich<'static, char>>),

    #[error("Syntactic Analysis failed: {0}")]
    ParsingError(#[from] SyntaxError),

    #[error("Semantical Analysis failed: {0}")]
    SemanticError(#[from] SemanticError),

    #[error("Code emission failed: {0}")]
    EmitError(#[from] EmitError),

    #[error("There was an I/O error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("There was a serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No source file was provided.")]
    MissingSource,
}

impl QuillError {
    /// Individual problems with their location, for rendering against the
    /// source text. Errors unrelated to the source yield nothing.
    pub fn diagnostics(&self) -> Vec<(SourcePos, String)> {
        match self {
            Self::LexerError(errs) => errs
                .iter()
                .map(|err| (err.span().into_range(), err.to_string()))
                .collect(),
            Self::ParsingError(err) => vec![(err.span(), err.to_string())],
            Self::SemanticError(err) => vec![(err.span(), err.to_string())],
            Self::EmitError(err) => err
                .span()
                .map(|span| (span, err.to_string()))
                .into_iter()
                .collect(),
            Self::IOError(_) | Self::JsonError(_) | Self::MissingSource => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::semantic::NameError;

    #[test]
    fn exit_codes_follow_the_failing_phase() {
        let semantic = QuillError::from(SemanticError::from(NameError::Unresolved {
            segment: "x".into(),
            span: 0..1,
        }));
        assert_eq!(ExitCode::from(&semantic), ExitCode::FAIL_SEMANTIC);
        assert_eq!(ExitCode::from(&QuillError::LexerError(vec![])), ExitCode::FAIL_PARSING);
        assert_eq!(ExitCode::from(&QuillError::MissingSource).code(), 255);
    }

    #[test]
    fn diagnostics_carry_spans() {
        let err = QuillError::from(SemanticError::IntLiteralOutOfBounds {
            literal: "9999999999".into(),
            span: 3..13,
        });
        assert_eq!(
            err.diagnostics(),
            vec![(3..13, "integer literal 9999999999 does not fit into i32".to_string())]
        );
        assert!(QuillError::MissingSource.diagnostics().is_empty());
    }
}
