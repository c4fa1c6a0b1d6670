use super::{SourcePos, Spanned, lex::Token};

/// Randomly peekable view over the lexer output. Running past the last
/// token yields `None` instead of an end-of-file token.
#[derive(Debug, Clone)]
pub struct TokenStream<'src> {
    tokens: Vec<Spanned<Token<'src>>>,
    position: usize,
    end: SourcePos,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: Vec<Spanned<Token<'src>>>, end_of_input: usize) -> Self {
        Self {
            tokens,
            position: 0,
            end: end_of_input..end_of_input,
        }
    }

    pub fn peek(&self, offset: usize) -> Option<&Spanned<Token<'src>>> {
        self.tokens.get(self.position + offset)
    }

    pub fn advance(&mut self) -> Option<Spanned<Token<'src>>> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }

        token
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Span to blame when input ends unexpectedly.
    pub fn end_span(&self) -> SourcePos {
        self.end.clone()
    }

    /// Span of the most recently consumed token.
    pub fn previous_span(&self) -> SourcePos {
        match self.position.checked_sub(1) {
            Some(index) => self.tokens[index].1.clone(),
            None => 0..0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::parser::lex::{TokenKind, tokenize};

    #[test]
    fn peek_does_not_consume() {
        let src = "a + b";
        let stream = TokenStream::new(tokenize(src).unwrap(), src.len());

        assert_eq!(stream.peek(0).unwrap().0.kind, TokenKind::IDENT);
        assert_eq!(stream.peek(1).unwrap().0.kind, TokenKind::PLUS);
        assert_eq!(stream.peek(2).unwrap().0.lexeme, "b");
        assert!(stream.peek(3).is_none());
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn advance_stops_at_end() {
        let src = "x";
        let mut stream = TokenStream::new(tokenize(src).unwrap(), src.len());

        assert!(stream.advance().is_some());
        assert!(stream.advance().is_none());
        assert_eq!(stream.position(), 1);
        assert!(stream.is_at_end());
        assert_eq!(stream.end_span(), 1..1);
        assert_eq!(stream.previous_span(), 0..1);
    }
}
