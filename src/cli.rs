//! Command-line entry point.

use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::error::MashError;
use crate::interpreter;
use crate::workspace::Workspace;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command-line arguments.
pub(crate) struct CliArgs {
    pub(crate) path: Option<String>,
    pub(crate) clean: bool,
    pub(crate) debug: bool,
    pub(crate) help: bool,
    pub(crate) version: bool,
}

pub(crate) fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs { path: None, clean: false, debug: false, help: false, version: false };
    for arg in &args[1..] {
        match arg.as_str() {
            "-c" => cli.clean = true,
            "--debug" => cli.debug = true,
            "--help" | "-h" => cli.help = true,
            "--version" | "-V" => cli.version = true,
            other => cli.path = Some(other.to_string()),
        }
    }
    cli
}

pub(crate) fn print_help() {
    println!(
        r#"mash-{VERSION} literate-build tool

USAGE:
    mash [path]        Run the document at <path>, or read stdin if omitted
    mash -c [path]      Wipe .mash and .mash-archive first; with no path, exit after cleaning
    mash --debug [path] Print the full error chain on failure
    mash --help         Show this help message
    mash --version      Show version

ENVIRONMENT:
    MASH_KEEP_DIR        Overrides the keep directory (default: invocation directory)
    MASH_PATH            Colon-separated search path for `imprt`/`include`/`@@`
"#
    );
}

pub(crate) fn print_version() {
    println!("mash-{VERSION}");
}

/// Parse argv (including argv[0]) and run the document, returning the
/// process's exit code.
pub fn run(args: &[String]) -> ExitCode {
    let cli = parse_args(args);

    if cli.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if cli.version {
        print_version();
        return ExitCode::SUCCESS;
    }

    let invocation_dir = match env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("mash: could not determine current directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let keep_dir = env::var_os("MASH_KEEP_DIR").map(PathBuf::from).unwrap_or_else(|| invocation_dir.clone());
    let mut import_search_dirs = vec![invocation_dir.clone()];
    if let Ok(mash_path) = env::var("MASH_PATH") {
        import_search_dirs.extend(mash_path.split(':').filter(|s| !s.is_empty()).map(PathBuf::from));
    }

    let workspace = Workspace::new(invocation_dir, keep_dir.clone());

    if cli.clean {
        if let Err(e) = workspace.clean() {
            eprintln!("mash: failed to clean workspace: {e}");
            return ExitCode::FAILURE;
        }
        if cli.path.is_none() {
            return ExitCode::SUCCESS;
        }
    }

    if let Err(e) = workspace.rotate() {
        eprintln!("mash: failed to rotate workspace: {e}");
        return ExitCode::FAILURE;
    }

    let (source, file_name) = match &cli.path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(contents) => (contents, path.clone()),
            Err(e) => {
                eprintln!("mash: could not read {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut buf = String::new();
            if let Err(e) = std::io::stdin().read_to_string(&mut buf) {
                eprintln!("mash: could not read standard input: {e}");
                return ExitCode::FAILURE;
            }
            (buf, "<stdin>".to_string())
        }
    };

    match interpreter::run(&source, &file_name, workspace, import_search_dirs, keep_dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, cli.debug);
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &MashError, debug: bool) {
    match err.origin() {
        Some(origin) => eprintln!("{origin}: {err}"),
        None => eprintln!("mash: {err}"),
    }
    if debug {
        eprintln!("{err:#?}");
    }
}
