//! mash - a literate-build tool
//!
//! Usage:
//!   mash [path]        Run the document at <path>, or read stdin if omitted
//!   mash -c [path]      Wipe the build cache first
//!   mash --debug [path] Print the full error chain on failure

use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    mash::cli::run(&args)
}
