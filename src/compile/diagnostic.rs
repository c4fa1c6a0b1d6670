use std::{io, string::FromUtf8Error};

use ariadne::{CharSet, Config, IndexType, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::compile::ast::SourcePos;

#[derive(Error, Debug)]
pub enum DiagnosticError {
    #[error("diagnostics spanning several lines are not implemented ({}..{})", .span.start, .span.end)]
    MultiLineSpan { span: SourcePos },

    #[error("There was an I/O error: {0}")]
    IOError(#[from] io::Error),

    #[error("Diagnostic is not valid UTF-8: {0}")]
    Utf8Error(#[from] FromUtf8Error),
}

/// Renders `message` with the source line containing `span` and carets
/// under the offending range. Output is plain ASCII without colours.
pub fn render(source: &str, span: &SourcePos, message: &str) -> Result<String, DiagnosticError> {
    let start = span.start.min(source.len());
    let end = span.end.clamp(start, source.len());

    if source[start..end].contains('\n') {
        return Err(DiagnosticError::MultiLineSpan { span: span.clone() });
    }

    // an empty span still gets one caret, past the end of input a blank
    // column is appended to point at
    let mut text = source.to_string();
    let span = if start < end {
        start..end
    } else if let Some(c) = source[start..].chars().next().filter(|c| *c != '\n') {
        start..start + c.len_utf8()
    } else {
        text.insert(start, ' ');
        start..start + 1
    };

    let config = Config::default()
        .with_color(false)
        .with_char_set(CharSet::Ascii)
        .with_index_type(IndexType::Byte);

    let mut out = Vec::new();
    Report::build(ReportKind::Error, span.clone())
        .with_config(config)
        .with_message(message)
        .with_label(Label::new(span).with_message(message))
        .finish()
        .write(Source::from(text.as_str()), &mut out)?;

    Ok(String::from_utf8(out)?)
}
