//! The document context: shared mutable state threaded across every
//! frame's execution, including the current-frame magic variable.
//!
//! `Context` owns one Rhai `Engine` and one `Scope` for an entire
//! document run. The engine is built once per run (fresh again after
//! a restart); the scope is threaded through every frame's execution
//! in source order, which is exactly how names a script defines in
//! frame *N* become visible to frame *M* for *M* > *N*.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use rhai::{Dynamic, Engine, FnPtr, Scope, AST};

use crate::error::{EvalError, MashError, Origin};
use crate::frame::FrameHandle;
use crate::host;
use crate::resolver::ExecutableResolver;
use crate::restart::RESTART_MARKER;
use crate::workspace::Workspace;

/// The reserved name bound before each frame's execution to the frame
/// currently executing. `_` is an ASCII-stable stand-in for a
/// `self`-like magic variable — see DESIGN.md.
pub const CURRENT_FRAME: &str = "_";

/// State shared by every host operation, independent of any one
/// frame's execution. Held behind `Rc<RefCell<_>>` so the closures
/// registered on the `Engine` can each hold a clone.
pub struct EngineState {
    pub workspace: Workspace,
    pub resolver: ExecutableResolver,
    pub import_search_dirs: Vec<PathBuf>,
    pub keep_dir: PathBuf,
    /// Mirrors the `_` scope binding. Host operations that need the
    /// current frame (`push`, `save`, `anon`, ...) read it from here
    /// rather than from the Rhai scope, which a registered native
    /// function has no ergonomic access to.
    pub current_frame: Option<FrameHandle>,
}

impl EngineState {
    pub fn new(workspace: Workspace, import_search_dirs: Vec<PathBuf>, keep_dir: PathBuf) -> Self {
        EngineState {
            workspace,
            resolver: ExecutableResolver::new(),
            import_search_dirs,
            keep_dir,
            current_frame: None,
        }
    }
}

/// The opaque handle Rhai scripts see as the current frame. Exposes
/// `.content`, `.commands`, `.file`, `.line`, and `.parent` as Rhai
/// get/set properties, the binding the design notes call for: "an
/// opaque handle the host library's operations accept; direct
/// attribute access translates to accessor methods in the host
/// binding".
#[derive(Clone)]
pub struct FrameRef(pub FrameHandle);

impl FrameRef {
    fn get_content(&mut self) -> String {
        self.0.borrow().text().to_string()
    }

    fn set_content(&mut self, value: String) {
        self.0.borrow_mut().set_text(value);
    }

    fn get_commands(&mut self) -> String {
        self.0.borrow().commands().to_string()
    }

    fn set_commands(&mut self, value: String) {
        self.0.borrow_mut().set_commands(value);
    }

    fn get_file(&mut self) -> String {
        self.0.borrow().file_name.clone()
    }

    fn get_line(&mut self) -> i64 {
        self.0.borrow().start_line as i64
    }

    fn get_parent(&mut self) -> Dynamic {
        match self.0.borrow().parent_handle() {
            Some(parent) => Dynamic::from(FrameRef(parent)),
            None => Dynamic::UNIT,
        }
    }
}

pub struct Context {
    pub engine: Engine,
    pub scope: Scope<'static>,
    pub state: Rc<RefCell<EngineState>>,
}

impl Context {
    pub fn new(workspace: Workspace, import_search_dirs: Vec<PathBuf>, keep_dir: PathBuf) -> Self {
        let state = Rc::new(RefCell::new(EngineState::new(workspace, import_search_dirs, keep_dir)));
        let mut engine = Engine::new();

        engine.register_type_with_name::<FrameRef>("Frame");
        engine.register_get_set("content", FrameRef::get_content, FrameRef::set_content);
        engine.register_get_set("commands", FrameRef::get_commands, FrameRef::set_commands);
        engine.register_get("file", FrameRef::get_file);
        engine.register_get("line", FrameRef::get_line);
        engine.register_get("parent", FrameRef::get_parent);

        host::install(&mut engine, state.clone());

        let mut scope = Scope::new();
        scope.push("true", true);
        scope.push("false", false);

        // Install the `@@`-rewrite as the *initial value* of
        // `before_frame_hook` rather than an unconditional engine step,
        // so a document that rebinds `before_frame_hook` (or its
        // `before_code_hook` alias) genuinely replaces it instead of
        // having it run underneath their own hook.
        let default_before_frame_hook: FnPtr = engine
            .eval_expression_with_scope(&mut scope, "|frame| { __at_rewrite(frame); }")
            .expect("default before_frame_hook closure is well-formed");
        scope.push("before_frame_hook", default_before_frame_hook);

        Context { engine, scope, state }
    }

    pub fn bind_current_frame(&mut self, frame: &FrameHandle) {
        self.scope.set_value(CURRENT_FRAME, FrameRef(frame.clone()));
        self.state.borrow_mut().current_frame = Some(frame.clone());
    }

    /// Execute `commands` against the shared scope. Returns
    /// `Ok(true)` if a restart was requested, `Ok(false)` on a normal
    /// completion, `Err` for a genuine script failure.
    pub fn eval(&mut self, commands: &str, origin: Origin) -> Result<bool, MashError> {
        match self.engine.eval_with_scope::<Dynamic>(&mut self.scope, commands) {
            Ok(_) => Ok(false),
            Err(err) => {
                if is_restart_marker(&err) {
                    Ok(true)
                } else {
                    Err(MashError::Eval(EvalError::Script { origin, message: err.to_string() }))
                }
            }
        }
    }

    /// Invoke `before_frame_hook`/`before_code_hook` or
    /// `after_frame_hook` if the document has defined one. Absence is
    /// not an error.
    pub fn call_hook(&mut self, names: &[&str], frame: &FrameHandle) -> Result<(), MashError> {
        for name in names {
            let Some(value) = self.scope.get_value::<Dynamic>(name) else { continue };
            let Some(fn_ptr) = value.try_cast::<FnPtr>() else { continue };
            let ast = AST::empty();
            fn_ptr
                .call::<Dynamic>(&self.engine, &ast, (FrameRef(frame.clone()),))
                .map_err(|err| MashError::Eval(EvalError::Script {
                    origin: Origin::new(frame.borrow().file_name.clone(), frame.borrow().start_line),
                    message: err.to_string(),
                }))?;
            return Ok(());
        }
        Ok(())
    }
}

fn is_restart_marker(err: &rhai::EvalAltResult) -> bool {
    if let rhai::EvalAltResult::ErrorRuntime(value, _) = err {
        return value.clone().try_cast::<String>().as_deref() == Some(RESTART_MARKER);
    }
    false
}
