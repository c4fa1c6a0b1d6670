use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use parser::{lex::tokenize, parse::parse_module, stream::TokenStream};

use crate::infra::QuillError;

pub mod ast;
pub mod diagnostic;
pub mod dump;
pub mod emit;
pub mod ir;
pub mod parser;
pub mod semantic;

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    src_path: Option<PathBuf>,
    out_path: Option<PathBuf>,
    dump_dir: Option<PathBuf>,
    source: Option<String>,
}

impl Compiler {
    pub fn new() -> Compiler {
        Compiler::default()
    }

    pub fn src(&mut self, src: PathBuf) -> &mut Self {
        self.src_path = Some(src);

        self
    }

    /// Defaults to the source path with a `.c` extension.
    pub fn out(&mut self, out: PathBuf) -> &mut Self {
        self.out_path = Some(out);

        self
    }

    pub fn dump_dir(&mut self, dir: PathBuf) -> &mut Self {
        self.dump_dir = Some(dir);

        self
    }

    /// Source text of the last compilation, once it has been read.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn compile(&mut self) -> Result<&mut Self, QuillError> {
        let Some(src_path) = self.src_path.clone() else {
            return Err(QuillError::MissingSource);
        };
        let out_path = self
            .out_path
            .clone()
            .unwrap_or_else(|| src_path.with_extension("c"));

        let source = fs::read_to_string(&src_path)?;
        info!(src = %src_path.display(), "compiling");

        let dumper = match &self.dump_dir {
            Some(dir) => Some(Dumper::new(dir, &src_path)?),
            None => None,
        };

        let result = run(&source, dumper.as_ref());
        self.source = Some(source);
        let c = result?;

        fs::write(&out_path, c)?;
        info!(out = %out_path.display(), "wrote C output");

        Ok(self)
    }

    /// Human readable description of `err`, with source excerpts when the
    /// error points into the last compiled source.
    pub fn report(&self, err: &QuillError) -> String {
        let diagnostics = err.diagnostics();
        let Some(source) = self.source() else {
            return format!("error: {err}\n");
        };
        if diagnostics.is_empty() {
            return format!("error: {err}\n");
        }

        let mut out = format!("error: {err}\n");
        for (span, message) in diagnostics.iter() {
            match diagnostic::render(source, span, message) {
                Ok(rendered) => out.push_str(&rendered),
                Err(render_err) => {
                    warn!(%render_err, "falling back to plain diagnostic");
                    out.push_str(&format!(
                        "  at {}..{}: {message}\n  note: {render_err}\n",
                        span.start, span.end
                    ));
                }
            }
        }

        out
    }
}

/// Runs the whole pipeline on in-memory source and returns the C text.
pub fn transpile(source: &str) -> Result<String, QuillError> {
    run(source, None)
}

fn run(source: &str, dumper: Option<&Dumper>) -> Result<String, QuillError> {
    let tokens = tokenize(source).map_err(QuillError::LexerError)?;
    debug!(tokens = tokens.len(), "lexed source");
    if let Some(dumper) = dumper {
        dumper.write("tokens.json", &dump::tokens_json(&tokens)?)?;
    }

    let ast = parse_module(TokenStream::new(tokens, source.len()))?;
    if let Some(dumper) = dumper {
        dumper.write("ast.json", &dump::ast_json(&ast)?)?;
    }

    let module = semantic::analyze(&ast)?;
    if let Some(dumper) = dumper {
        dumper.write("analysis.json", &dump::analysis_json(&module)?)?;
    }

    let c = emit::emit_c(&module)?;
    if let Some(dumper) = dumper {
        dumper.write("c", &c)?;
    }

    Ok(c)
}

/// Writes `<stem>.<suffix>` files into the dump directory.
#[derive(Debug)]
struct Dumper {
    dir: PathBuf,
    stem: String,
}

impl Dumper {
    fn new(dir: &Path, src_path: &Path) -> Result<Dumper, QuillError> {
        fs::create_dir_all(dir)?;
        let stem = src_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| semantic::MAIN_MODULE.to_string());

        Ok(Dumper {
            dir: dir.to_path_buf(),
            stem,
        })
    }

    fn write(&self, suffix: &str, contents: &str) -> Result<(), QuillError> {
        let path = self.dir.join(format!("{}.{suffix}", self.stem));
        fs::write(&path, contents)?;
        debug!(path = %path.display(), "wrote dump");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::ExitCode;

    #[test]
    fn transpile_runs_every_stage() {
        let c = transpile("function main() -> i32 { return 0; }").unwrap();
        assert!(c.contains("int32_t main(void)\n{\n"));
    }

    #[test]
    fn failures_map_to_their_exit_codes() {
        let err = transpile("let x: i32 = $;").unwrap_err();
        assert_eq!(ExitCode::from(&err), ExitCode::FAIL_PARSING);

        let err = transpile("let x: i32 = ;").unwrap_err();
        assert_eq!(ExitCode::from(&err), ExitCode::FAIL_PARSING);

        let err = transpile("let x: nope = 1;").unwrap_err();
        assert_eq!(ExitCode::from(&err), ExitCode::FAIL_SEMANTIC);

        let err = transpile("let x: i32 = 1; let y: i32 = x * 2;").unwrap_err();
        assert_eq!(ExitCode::from(&err), ExitCode::FAIL_OTHER);
    }

    #[test]
    fn report_names_spans_it_cannot_render() {
        let source = "function f() -> i32 { x =\n 2; return 0; }";
        let err = transpile(source).unwrap_err();
        let compiler = Compiler {
            source: Some(source.to_string()),
            ..Compiler::default()
        };

        let report = compiler.report(&err);
        assert!(report.starts_with("error: Semantical Analysis failed: assignment statements"));
        assert!(report.contains("  at 22..29: assignment statements are not supported\n"));
        assert!(report.contains(
            "  note: diagnostics spanning several lines are not implemented (22..29)\n"
        ));
    }

    #[test]
    fn report_renders_single_line_spans() {
        let source = "let x: nope = 1;";
        let err = transpile(source).unwrap_err();
        let compiler = Compiler {
            source: Some(source.to_string()),
            ..Compiler::default()
        };

        let report = compiler.report(&err);
        assert!(report.contains("nope"));
        assert!(!report.contains("note:"));
    }

    #[test]
    fn compile_without_source_is_an_error() {
        let err = Compiler::new().compile().unwrap_err();
        assert!(matches!(err, QuillError::MissingSource));
    }
}
