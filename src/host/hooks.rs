//! `restart`, `require_versions`, and `spell_check` — the
//! version-pinning and restart-triggering corners of the standard
//! host library.

use std::fs;

use crate::cache;
use crate::context::EngineState;
use crate::error::{EvalError, MashError};
use crate::frame::FrameHandle;
use crate::host::shell;

/// Components this build knows a version for, consulted by
/// `require_versions`. Kept small and explicit rather than wired to
/// every dependency's crate version — the document-facing surface is
/// `mash` itself and the embedded scripting runtime, the two things a
/// document genuinely needs to pin.
fn known_version(component: &str) -> Option<&'static str> {
    match component {
        "mash" => Some(env!("CARGO_PKG_VERSION")),
        "rhai" => Some("1.19"),
        _ => None,
    }
}

/// `require_versions(component=ver, …)`. Unmet or unknown components
/// are fatal.
pub fn require_versions(requirements: &[(String, String)]) -> Result<(), MashError> {
    for (component, required) in requirements {
        let found = known_version(component).ok_or_else(|| {
            EvalError::VersionMismatch { component: component.clone(), required: required.clone(), found: "unknown".to_string() }
        })?;
        if !version_at_least(found, required) {
            return Err(EvalError::VersionMismatch {
                component: component.clone(),
                required: required.clone(),
                found: found.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn version_at_least(found: &str, required: &str) -> bool {
    let parse = |v: &str| v.split('.').map(|p| p.parse::<u64>().unwrap_or(0)).collect::<Vec<_>>();
    parse(found) >= parse(required)
}

/// Sentinel error raised by `restart()` and, when it finds the
/// spell-check report changed, by `spell_check()`. Recognized at the
/// Rhai call boundary in [`crate::host::to_rhai_err`], which maps it
/// to the exact [`crate::restart::RESTART_MARKER`] string rather than
/// formatted text.
pub fn restart_request() -> MashError {
    MashError::Restart
}

/// `spell_check()`: runs the current frame's text through `aspell
/// list` (best-effort — a missing `aspell` is a silent no-op, not a
/// fatal error) and diffs the sorted list of unknown words against the
/// previous run's report. A changed report is written to `build` and
/// the frame raises `RestartRequest`, so the next pass sees the report
/// already in place. A canonical restart-triggering operation, scaled
/// down to what an embedded checker can do without a real dictionary
/// database to consult.
pub fn spell_check(state: &mut EngineState, frame: &FrameHandle) -> Result<(), MashError> {
    if !state.resolver.is_executable("aspell") {
        return Ok(());
    }

    let text = frame.borrow().text().to_string();
    let outcome = shell::run(state, "aspell list", Some(&text), false)?;
    if outcome.code != 0 {
        return Ok(());
    }

    let mut words: Vec<String> = outcome.stdout.lines().map(|w| w.trim().to_string()).filter(|w| !w.is_empty()).collect();
    words.sort();
    words.dedup();
    let report = words.join("\n");

    let report_path = state.workspace.build_path(".mash-spelling");
    let archive_path = state.workspace.archive_path(".mash-spelling");
    let unchanged = cache::files_identical(&archive_path, report.as_bytes())
        .map_err(|source| crate::error::CacheError::Io { path: archive_path, source })?;

    fs::write(&report_path, &report).map_err(|source| crate::error::CacheError::Io { path: report_path, source })?;

    if !unchanged && !words.is_empty() {
        return Err(restart_request());
    }
    Ok(())
}
