//! `push` and the `@@`-rewrite that the default pre-hook performs.

use regex::Regex;
use std::sync::OnceLock;

use crate::context::EngineState;
use crate::error::MashError;
use crate::frame::FrameHandle;
use crate::host::fsops;

/// `push(text?)`: append `text` (default: the current frame's text)
/// to the parent's `contents` — the only way a child frame's text
/// becomes visible in its parent's rendered output.
pub fn push(frame: &FrameHandle, text: Option<&str>) {
    let text = text.map(str::to_string).unwrap_or_else(|| frame.borrow().text().to_string());
    frame.borrow().push_to_parent(&text);
}

fn at_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@@([A-Za-z0-9_./+-]*)").expect("valid @@ pattern"))
}

/// Rewrite every `@@path` token found in the frame's `commands` and
/// `content`, importing the named file into `build` and substituting
/// its basename. This is what the engine installs as the initial
/// `before_frame_hook` value (see
/// [`crate::context::Context::new`]) — a document that rebinds
/// `before_frame_hook` or `before_code_hook` replaces this behavior
/// rather than layering on top of it.
pub fn apply_at_rewrite(state: &mut EngineState, frame: &FrameHandle) -> Result<(), MashError> {
    let commands = frame.borrow().commands().to_string();
    let rewritten_commands = rewrite(state, &commands)?;
    frame.borrow_mut().set_commands(rewritten_commands);

    let text = frame.borrow().text().to_string();
    let rewritten_text = rewrite(state, &text)?;
    frame.borrow_mut().set_text(rewritten_text);

    Ok(())
}

fn rewrite(state: &mut EngineState, input: &str) -> Result<String, MashError> {
    if !input.contains("@@") {
        return Ok(input.to_string());
    }

    let mut output = String::with_capacity(input.len());
    let mut last_end = 0;
    for m in at_token().captures_iter(input) {
        let whole = m.get(0).expect("group 0 always matches");
        let path = m.get(1).map(|g| g.as_str()).unwrap_or("").to_string();
        output.push_str(&input[last_end..whole.start()]);
        if path.is_empty() {
            output.push_str(whole.as_str());
        } else {
            fsops::imprt(state, &[path.clone()], None, false)?;
            let basename = std::path::Path::new(&path).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or(path);
            output.push_str(&basename);
        }
        last_end = whole.end();
    }
    output.push_str(&input[last_end..]);
    Ok(output)
}
