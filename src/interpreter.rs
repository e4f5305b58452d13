//! The interpreter: the sequence a frame goes through when its closing
//! delimiter is read, and the top-level restart loop that re-enters
//! [`crate::parser::run_document`] from scratch on a `RestartRequest`.

use std::path::PathBuf;

use crate::context::Context;
use crate::error::{MashError, Origin};
use crate::frame::FrameHandle;
use crate::parser;
use crate::workspace::Workspace;

/// Execute one frame at its closing delimiter: split and normalize its
/// contents, bind it as the current frame, run the pre-hook (the
/// default of which performs `@@`-rewriting — see
/// [`crate::context::Context::new`]), evaluate its commands, then run
/// the post-hook. A restart request surfaces as
/// `Err(MashError::Restart)`, which [`run`] below is the only caller
/// expected to catch.
pub fn execute_frame(frame: &FrameHandle, ctx: &mut Context) -> Result<(), MashError> {
    frame.borrow_mut().split_and_normalize();

    ctx.bind_current_frame(frame);

    ctx.call_hook(&["before_code_hook", "before_frame_hook"], frame)?;

    let commands = frame.borrow().commands().to_string();
    let origin = Origin::new(frame.borrow().file_name.clone(), frame.borrow().start_line);
    if ctx.eval(&commands, origin)? {
        return Err(MashError::Restart);
    }

    ctx.call_hook(&["after_frame_hook"], frame)?;
    Ok(())
}

/// Run `source` to completion, re-entering from the top — with a
/// fresh [`Context`] but the same [`Workspace`] — every time a script
/// raises `RestartRequest`.
pub fn run(
    source: &str,
    file_name: &str,
    workspace: Workspace,
    import_search_dirs: Vec<PathBuf>,
    keep_dir: PathBuf,
) -> Result<(), MashError> {
    loop {
        let mut ctx = Context::new(workspace.clone(), import_search_dirs.clone(), keep_dir.clone());
        match parser::run_document(source, file_name, &mut ctx, &import_search_dirs) {
            Ok(_) => return Ok(()),
            Err(MashError::Restart) => continue,
            Err(err) => return Err(err),
        }
    }
}
