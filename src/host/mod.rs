//! The script host bridge: wires the standard host library onto a
//! fresh Rhai `Engine`.
//!
//! Each host operation lowers to one `Engine::register_fn` closure
//! capturing the shared [`EngineState`].

pub mod fsops;
pub mod hooks;
pub mod shell;
pub mod text;

use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, Map};

use crate::context::{EngineState, FrameRef};
use crate::error::MashError;
use crate::frame::FrameHandle;
use crate::restart::RESTART_MARKER;

/// Lower a [`MashError`] into the Rhai runtime error a registered
/// function must return. `MashError::Restart` is special-cased so its
/// payload is exactly [`RESTART_MARKER`] — [`crate::context::Context::eval`]
/// matches on that literal string, not on formatted text.
pub fn to_rhai_err(err: MashError) -> Box<EvalAltResult> {
    let payload = match err {
        MashError::Restart => RESTART_MARKER.to_string(),
        other => other.to_string(),
    };
    Box::new(EvalAltResult::ErrorRuntime(Dynamic::from(payload), rhai::Position::NONE))
}

fn current_frame(state: &Rc<RefCell<EngineState>>) -> Result<FrameHandle, Box<EvalAltResult>> {
    state
        .borrow()
        .current_frame
        .clone()
        .ok_or_else(|| Box::new(EvalAltResult::ErrorRuntime(Dynamic::from("no frame is currently executing".to_string()), rhai::Position::NONE)))
}

fn strings(values: Array) -> Vec<String> {
    values.into_iter().map(|v| v.into_string().unwrap_or_default()).collect()
}

/// Register every standard host operation onto `engine`, each closure
/// holding its own clone of `state`.
pub fn install(engine: &mut Engine, state: Rc<RefCell<EngineState>>) {
    let s = state.clone();
    engine.register_fn("save", move |target: &str| -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        fsops::save(&mut s.borrow_mut(), &frame, target, None).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("save", move |target: &str, contents: &str| -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        fsops::save(&mut s.borrow_mut(), &frame, target, Some(contents)).map_err(to_rhai_err)
    });

    let s = state.clone();
    engine.register_fn("recall", move |target: &str, sources: Array| -> Result<bool, Box<EvalAltResult>> {
        fsops::recall(&mut s.borrow_mut(), target, &strings(sources)).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("recall", move |target: &str| -> Result<bool, Box<EvalAltResult>> {
        fsops::recall(&mut s.borrow_mut(), target, &[]).map_err(to_rhai_err)
    });

    let s = state.clone();
    engine.register_fn("keep", move |src: &str| -> Result<(), Box<EvalAltResult>> { fsops::keep(&s.borrow(), src, None).map_err(to_rhai_err) });
    let s = state.clone();
    engine.register_fn("keep", move |src: &str, target: &str| -> Result<(), Box<EvalAltResult>> {
        fsops::keep(&s.borrow(), src, Some(target)).map_err(to_rhai_err)
    });

    let s = state.clone();
    engine.register_fn("imprt", move |names: Array| -> Result<(), Box<EvalAltResult>> {
        fsops::imprt(&s.borrow(), &strings(names), None, false).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("imprt", move |name: &str| -> Result<(), Box<EvalAltResult>> {
        fsops::imprt(&s.borrow(), &[name.to_string()], None, false).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("imprt_target", move |names: Array, target: &str| -> Result<(), Box<EvalAltResult>> {
        fsops::imprt(&s.borrow(), &strings(names), Some(target), false).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("imprt_conditional", move |names: Array, conditional: bool| -> Result<(), Box<EvalAltResult>> {
        fsops::imprt(&s.borrow(), &strings(names), None, conditional).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("imprt_full", move |names: Array, target: &str, conditional: bool| -> Result<(), Box<EvalAltResult>> {
        fsops::imprt(&s.borrow(), &strings(names), Some(target), conditional).map_err(to_rhai_err)
    });

    let s = state.clone();
    engine.register_fn("read", move |fname: &str| -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        fsops::read(&s.borrow(), &frame, fname).map_err(to_rhai_err)
    });

    let s = state.clone();
    engine.register_fn("anon", move || -> Result<String, Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        let text = frame.borrow().text().to_string();
        Ok(fsops::anon_of(&text))
    });
    engine.register_fn("anon", fsops::anon_of);

    let s = state.clone();
    engine.register_fn("unindent", move || -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        fsops::unindent_text(&frame);
        Ok(())
    });
    let s = state.clone();
    engine.register_fn("strip", move || -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        fsops::strip_text(&frame);
        Ok(())
    });

    engine.register_fn("ext", fsops::ext);

    let s = state.clone();
    engine.register_fn("push", move || -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        text::push(&frame, None);
        Ok(())
    });
    let s = state.clone();
    engine.register_fn("push", move |value: &str| -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        text::push(&frame, Some(value));
        Ok(())
    });

    let s = state.clone();
    engine.register_fn("shell", move |cmd: &str| -> Result<Dynamic, Box<EvalAltResult>> {
        shell::run(&mut s.borrow_mut(), cmd, None, true).map(shell_outcome_to_dynamic).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("shell", move |cmd: &str, stdin: &str| -> Result<Dynamic, Box<EvalAltResult>> {
        shell::run(&mut s.borrow_mut(), cmd, Some(stdin), true).map(shell_outcome_to_dynamic).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("shell", move |cmd: &str, check: bool| -> Result<Dynamic, Box<EvalAltResult>> {
        shell::run(&mut s.borrow_mut(), cmd, None, check).map(shell_outcome_to_dynamic).map_err(to_rhai_err)
    });
    let s = state.clone();
    engine.register_fn("shell", move |cmd: &str, stdin: &str, check: bool| -> Result<Dynamic, Box<EvalAltResult>> {
        shell::run(&mut s.borrow_mut(), cmd, Some(stdin), check).map(shell_outcome_to_dynamic).map_err(to_rhai_err)
    });

    let s = state.clone();
    engine.register_fn("shell_filter", move |cmd: &str| -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        let text = frame.borrow().text().to_string();
        let outcome = shell::run(&mut s.borrow_mut(), cmd, Some(&text), true).map_err(to_rhai_err)?;
        frame.borrow_mut().set_text(outcome.stdout);
        Ok(())
    });

    engine.register_fn("require_versions", move |requirements: Map| -> Result<(), Box<EvalAltResult>> {
        let pairs: Vec<(String, String)> =
            requirements.into_iter().map(|(k, v)| (k.to_string(), v.into_string().unwrap_or_default())).collect();
        hooks::require_versions(&pairs).map_err(to_rhai_err)
    });

    let s = state.clone();
    engine.register_fn("spell_check", move || -> Result<(), Box<EvalAltResult>> {
        let frame = current_frame(&s)?;
        hooks::spell_check(&mut s.borrow_mut(), &frame).map_err(to_rhai_err)
    });

    engine.register_fn("restart", || -> Result<(), Box<EvalAltResult>> { Err(to_rhai_err(MashError::Restart)) });

    // Backs the closure `Context::new` installs as the initial value of
    // `before_frame_hook` — not called directly by documents.
    let s = state.clone();
    engine.register_fn("__at_rewrite", move |frame: FrameRef| -> Result<(), Box<EvalAltResult>> {
        text::apply_at_rewrite(&mut s.borrow_mut(), &frame.0).map_err(to_rhai_err)
    });
}

fn shell_outcome_to_dynamic(outcome: shell::ShellOutcome) -> Dynamic {
    let mut map = Map::new();
    map.insert("stdout".into(), outcome.stdout.into());
    map.insert("stderr".into(), outcome.stderr.into());
    map.insert("returncode".into(), (outcome.code as i64).into());
    map.insert("user_time".into(), outcome.user_time.into());
    map.insert("sys_time".into(), outcome.sys_time.into());
    Dynamic::from(map)
}
