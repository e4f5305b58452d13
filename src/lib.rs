//! mash - a literate-build tool
//!
//! # Overview
//!
//! A mash document interleaves arbitrary text with embedded frames of
//! script:
//!
//! ```text
//! \documentclass{article}
//! \begin{document}
//! [[[ save("figure.dat") ||| 1 2 3
//! 4 5 6 ]]]
//! \end{document}
//! ```
//!
//! Frames ( `[[[ ... ]]]` ) are parsed into a tree and executed
//! depth-first as their closing delimiter is read. Each frame's
//! contents split at the first `|||` into `commands` (run against a
//! shared, document-wide Rhai scope) and `text` (the payload the
//! commands manipulate — written out, pushed into the parent, fed to
//! a subprocess, or left untouched).
//!
//! A three-directory workspace (`build`/`archive`/`keep`) gives
//! documents an incremental build cache: `save` and `recall` let a
//! script skip work whose output is already correct, `keep` copies
//! final artifacts out to the invocation directory.
//!
//! # Example
//!
//! ```rust
//! use mash::workspace::Workspace;
//! use mash::interpreter;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! let workspace = Workspace::new(dir.path().to_path_buf(), dir.path().to_path_buf());
//! workspace.rotate().unwrap();
//! interpreter::run("[[[ push(\"hi\") ]]]", "doc", workspace, vec![], dir.path().to_path_buf()).unwrap();
//! ```

pub mod cache;
pub mod cli;
pub mod context;
pub mod error;
pub mod frame;
pub mod host;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod restart;
pub mod workspace;

pub use error::MashError;
pub use frame::{Frame, FrameHandle};
pub use workspace::Workspace;
