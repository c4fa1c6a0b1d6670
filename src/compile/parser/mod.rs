pub mod lex;
pub mod parse;
pub mod stream;

pub use crate::compile::ast::SourcePos;
pub type Spanned<T> = (T, SourcePos);
