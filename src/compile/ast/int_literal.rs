use std::num::IntErrorKind;

use serde::Serialize;

use crate::compile::{ast::SourcePos, semantic::SemanticError};

/// Decimal literal as written in the source; range checked during lowering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IntLiteral {
    value: String,
}

impl IntLiteral {
    pub fn new(value: String) -> IntLiteral {
        IntLiteral { value }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn parse(&self, span: &SourcePos) -> Result<i32, SemanticError> {
        self.value.parse::<i32>().map_err(|err| match err.kind() {
            IntErrorKind::PosOverflow => SemanticError::IntLiteralOutOfBounds {
                literal: self.value.clone(),
                span: span.clone(),
            },
            _ => unreachable!("Lexer returned invalid number: {}", self.value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_within_i32_range() {
        assert_eq!(IntLiteral::new("2147483647".into()).parse(&(0..10)).unwrap(), i32::MAX);
        assert_eq!(IntLiteral::new("0".into()).parse(&(0..1)).unwrap(), 0);
    }

    #[test]
    fn overflow_is_reported_with_span() {
        let err = IntLiteral::new("2147483648".into()).parse(&(4..14)).unwrap_err();
        match err {
            SemanticError::IntLiteralOutOfBounds { literal, span } => {
                assert_eq!(literal, "2147483648");
                assert_eq!(span, 4..14);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
