//! The `RestartRequest` signal, raised by a script to ask the engine
//! to discard all state and re-run the document from the top.

/// Sentinel value carried by the Rhai runtime error the `restart()`
/// host function raises. [`crate::context::Context::eval`] recognizes
/// it and reports the request as `Err(MashError::Restart)`, which
/// [`crate::interpreter::run`] is the only caller expected to catch;
/// never surfaced to the document author as text.
pub const RESTART_MARKER: &str = "__mash_restart_request__";
