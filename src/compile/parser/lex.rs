use std::fmt;

use chumsky::prelude::*;
use serde::Serialize;

use super::Spanned;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[allow(non_camel_case_types)]
pub enum TokenKind {
    IDENT,
    INTEGER,
    STRING,
    // keywords
    LET,
    FUNCTION,
    RETURN,
    IF,
    ELSE,
    MODULE,
    IMPORT,
    AND,
    OR,
    WHILE,
    FOR,
    // punctuation
    L_ROUND,
    R_ROUND,
    L_CURLY,
    R_CURLY,
    L_SQUARE,
    R_SQUARE,
    COMMA,
    DOT,
    COLON,
    SEMICOLON,
    ARROW,
    COLON_COLON,
    EQ,
    // operators
    EQ_EQ,
    NOT_EQ,
    LESS_EQ,
    GREATER_EQ,
    LESS,
    GREATER,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    SLASH_SLASH,
    PERCENT,
    AMPERSAND,
    CIRCUMFLEX,
    VBAR,
    SHIFT_LEFT,
    SHIFT_RIGHT,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::IDENT => return f.write_str("identifier"),
            Self::INTEGER => return f.write_str("integer literal"),
            Self::STRING => return f.write_str("string literal"),
            Self::LET => "let",
            Self::FUNCTION => "function",
            Self::RETURN => "return",
            Self::IF => "if",
            Self::ELSE => "else",
            Self::MODULE => "module",
            Self::IMPORT => "import",
            Self::AND => "and",
            Self::OR => "or",
            Self::WHILE => "while",
            Self::FOR => "for",
            Self::L_ROUND => "(",
            Self::R_ROUND => ")",
            Self::L_CURLY => "{",
            Self::R_CURLY => "}",
            Self::L_SQUARE => "[",
            Self::R_SQUARE => "]",
            Self::COMMA => ",",
            Self::DOT => ".",
            Self::COLON => ":",
            Self::SEMICOLON => ";",
            Self::ARROW => "->",
            Self::COLON_COLON => "::",
            Self::EQ => "=",
            Self::EQ_EQ => "==",
            Self::NOT_EQ => "!=",
            Self::LESS_EQ => "<=",
            Self::GREATER_EQ => ">=",
            Self::LESS => "<",
            Self::GREATER => ">",
            Self::PLUS => "+",
            Self::MINUS => "-",
            Self::STAR => "*",
            Self::SLASH => "/",
            Self::SLASH_SLASH => "//",
            Self::PERCENT => "%",
            Self::AMPERSAND => "&",
            Self::CIRCUMFLEX => "^",
            Self::VBAR => "|",
            Self::SHIFT_LEFT => "<<",
            Self::SHIFT_RIGHT => ">>",
        };

        write!(f, "`{text}`")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
}

type ErrorParserExtra<'src> = extra::Err<Rich<'src, char, SimpleSpan>>;

fn keyword_or_ident(ident: &str) -> TokenKind {
    match ident {
        "let" => TokenKind::LET,
        "function" => TokenKind::FUNCTION,
        "return" => TokenKind::RETURN,
        "if" => TokenKind::IF,
        "else" => TokenKind::ELSE,
        "module" => TokenKind::MODULE,
        "import" => TokenKind::IMPORT,
        "and" => TokenKind::AND,
        "or" => TokenKind::OR,
        "while" => TokenKind::WHILE,
        "for" => TokenKind::FOR,
        _ => TokenKind::IDENT,
    }
}

fn punctuation<'src>() -> impl Parser<'src, &'src str, TokenKind, ErrorParserExtra<'src>> {
    // two character tokens have to be tried before their one character prefixes
    let double = choice((
        just("::").to(TokenKind::COLON_COLON),
        just("->").to(TokenKind::ARROW),
        just("==").to(TokenKind::EQ_EQ),
        just("!=").to(TokenKind::NOT_EQ),
        just("<=").to(TokenKind::LESS_EQ),
        just(">=").to(TokenKind::GREATER_EQ),
        just("<<").to(TokenKind::SHIFT_LEFT),
        just(">>").to(TokenKind::SHIFT_RIGHT),
        just("//").to(TokenKind::SLASH_SLASH),
    ));

    let single = choice((
        just('(').to(TokenKind::L_ROUND),
        just(')').to(TokenKind::R_ROUND),
        just('{').to(TokenKind::L_CURLY),
        just('}').to(TokenKind::R_CURLY),
        just('[').to(TokenKind::L_SQUARE),
        just(']').to(TokenKind::R_SQUARE),
        just(',').to(TokenKind::COMMA),
        just('.').to(TokenKind::DOT),
        just(':').to(TokenKind::COLON),
        just(';').to(TokenKind::SEMICOLON),
        just('=').to(TokenKind::EQ),
        just('<').to(TokenKind::LESS),
        just('>').to(TokenKind::GREATER),
        just('+').to(TokenKind::PLUS),
        just('-').to(TokenKind::MINUS),
        just('*').to(TokenKind::STAR),
        just('/').to(TokenKind::SLASH),
        just('%').to(TokenKind::PERCENT),
        just('&').to(TokenKind::AMPERSAND),
        just('^').to(TokenKind::CIRCUMFLEX),
        just('|').to(TokenKind::VBAR),
    ));

    double.or(single)
}

pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, ErrorParserExtra<'src>> {
    let word = text::ascii::ident().map(keyword_or_ident);

    let integer = text::int(10).to(TokenKind::INTEGER);

    // escapes are copied into C verbatim, so a backslash always takes the
    // next character with it
    let escape = just('\\').then(none_of('\n')).ignored();
    let string = just('"')
        .then(none_of("\"\n\\").ignored().or(escape).repeated())
        .then(just('"'))
        .to(TokenKind::STRING);

    let comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .padded()
        .ignored()
        .boxed();

    choice((integer, word, string, punctuation()))
        .map_with(|kind, ctx| {
            (
                Token {
                    kind,
                    lexeme: ctx.slice(),
                },
                ctx.span().into(),
            )
        })
        .padded_by(comment.clone().repeated())
        .padded()
        .repeated()
        .collect::<Vec<_>>()
        .padded_by(comment.repeated())
        .padded()
        .then_ignore(end())
}

/// Runs the lexer and detaches its errors from the source lifetime.
pub fn tokenize(src: &str) -> Result<Vec<Spanned<Token<'_>>>, Vec<Rich<'static, char>>> {
    lexer()
        .parse(src)
        .into_result()
        .map_err(|errs| errs.into_iter().map(Rich::into_owned).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token.kind)
            .collect()
    }

    #[test]
    fn keywords_are_distinguished_from_identifiers() {
        assert_eq!(
            kinds("let lettuce function and or_else"),
            vec![
                TokenKind::LET,
                TokenKind::IDENT,
                TokenKind::FUNCTION,
                TokenKind::AND,
                TokenKind::IDENT,
            ]
        );
    }

    #[test]
    fn two_character_punctuation_wins() {
        assert_eq!(
            kinds("a::b -> <= << // = :"),
            vec![
                TokenKind::IDENT,
                TokenKind::COLON_COLON,
                TokenKind::IDENT,
                TokenKind::ARROW,
                TokenKind::LESS_EQ,
                TokenKind::SHIFT_LEFT,
                TokenKind::SLASH_SLASH,
                TokenKind::EQ,
                TokenKind::COLON,
            ]
        );
    }

    #[test]
    fn string_lexeme_keeps_quotes_and_span() {
        let tokens = tokenize(r#"  "hi there" "#).unwrap();
        assert_eq!(tokens.len(), 1);
        let (token, span) = &tokens[0];
        assert_eq!(token.kind, TokenKind::STRING);
        assert_eq!(token.lexeme, "\"hi there\"");
        assert_eq!(*span, 2..12);
    }

    #[test]
    fn backslash_escapes_the_next_character() {
        let tokens = tokenize(r#""say \"hi\"\n" "a\\""#).unwrap();
        let lexemes: Vec<_> = tokens.iter().map(|(token, _)| token.lexeme).collect();
        assert_eq!(lexemes, [r#""say \"hi\"\n""#, r#""a\\""#]);

        // the closing quote is escaped, so the string never ends
        assert!(tokenize(r#"let s: cstr = "a\";"#).is_err());
    }

    #[test]
    fn comments_and_blank_input_produce_no_tokens() {
        assert!(kinds("").is_empty());
        assert!(kinds("   \n\t").is_empty());
        assert!(kinds("/* nothing */").is_empty());
        assert_eq!(
            kinds("1 /* one */ + /* two */ 2"),
            vec![TokenKind::INTEGER, TokenKind::PLUS, TokenKind::INTEGER]
        );
    }

    #[test]
    fn unknown_character_is_rejected() {
        let errs = tokenize("let x: i32 = 1 $ 2;").unwrap_err();
        assert!(!errs.is_empty());
    }
}
