use std::path::PathBuf;

use clap::{ArgAction, Parser};
use tracing::Level;

use quill::compile::Compiler;
use quill::infra::ExitCode;

/// Transpiles a quill source file to C.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Source file to compile
    src: PathBuf,

    /// Output file [default: SRC with a .c extension]
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Directory to write token, AST and analysis dumps to
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Log more, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut compiler = Compiler::new();
    compiler.src(args.src);
    if let Some(out) = args.out {
        compiler.out(out);
    }
    if let Some(dir) = args.dump_dir {
        compiler.dump_dir(dir);
    }

    let Some(err) = compiler.compile().err() else {
        return ExitCode::SUCCESS;
    };

    eprint!("{}", compiler.report(&err));
    ExitCode::from(&err)
}
