//! Error taxonomy for mash.
//!
//! One `thiserror`-derived enum per concern, aggregated into a single
//! top-level error the CLI reports.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where in the source document an error originates, for fidelity
/// reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub file: String,
    pub line: usize,
}

impl Origin {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Origin { file: file.into(), line }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{origin}: unclosed frame at end of file")]
    UnclosedFrame { origin: Origin },
    #[error("{origin}: stray ']]]' at top level")]
    StrayClose { origin: Origin },
    #[error("{origin}: include not found: {name} (searched: {searched:?})")]
    IncludeNotFound { origin: Origin, name: String, searched: Vec<PathBuf> },
    #[error("could not read {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("recall({target:?}): missing dependency {missing:?} (dependencies: {all:?})")]
    MissingDependency { target: PathBuf, missing: PathBuf, all: Vec<PathBuf> },
    #[error("keep_directory is not absolute: {0:?}")]
    KeepDirNotAbsolute(PathBuf),
    #[error("keep: {src:?} is neither a file nor a directory")]
    KeepSourceInvalid { src: PathBuf },
    #[error("imprt: {name:?} not found (searched: {searched:?})")]
    ImportNotFound { name: String, searched: Vec<PathBuf> },
    #[error("imprt: target may only be given with exactly one name")]
    ImportTargetAmbiguous,
    #[error("io error on {path:?}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
}

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("executable not found on PATH: {0}")]
    ExecutableMissing(String),
    #[error("command exceeded the 60000s timeout: {0}")]
    Timeout(String),
    #[error("command failed with exit code {code}: {cmd}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}")]
    NonZeroExit { cmd: String, code: i32, stdout: String, stderr: String },
    #[error("failed to spawn shell: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("{origin}: {message}")]
    Script { origin: Origin, message: String },
    #[error("version requirement not met: {component} requires {required}, found {found}")]
    VersionMismatch { component: String, required: String, found: String },
}

/// Top-level error surfaced to the CLI. Every unrecovered error in a
/// run ends up as one of these.
#[derive(Error, Debug)]
pub enum MashError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Shell(#[from] ShellError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A script raised `RestartRequest`. Not a failure — the CLI
    /// driver re-enters from the top on this variant.
    #[error("restart requested")]
    Restart,
}

impl MashError {
    /// The source origin for this error, if one is known, used by the
    /// CLI to print `file:line: message`.
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            MashError::Parse(ParseError::UnclosedFrame { origin }) => Some(origin),
            MashError::Parse(ParseError::StrayClose { origin }) => Some(origin),
            MashError::Parse(ParseError::IncludeNotFound { origin, .. }) => Some(origin),
            MashError::Eval(EvalError::Script { origin, .. }) => Some(origin),
            _ => None,
        }
    }
}
