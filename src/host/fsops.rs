//! `save`, `recall`, `keep`, `imprt`, `read`, `anon`, `unindent`,
//! `strip`, `ext` — the build-cache-facing half of the standard host
//! library.

use std::fs;
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::cache;
use crate::context::EngineState;
use crate::error::{CacheError, MashError};
use crate::frame::{unindent, FrameHandle};

/// `save(target, contents?)`. Writes `contents` (default: the current
/// frame's text) into `build/target`, reusing the archive copy
/// byte-for-byte if it is already identical so the mtime survives for
/// a downstream `recall`.
pub fn save(state: &mut EngineState, frame: &FrameHandle, target: &str, contents: Option<&str>) -> Result<(), MashError> {
    let contents = contents.map(str::to_string).unwrap_or_else(|| frame.borrow().text().to_string());
    let build_path = state.workspace.build_path(target);
    let archive_path = state.workspace.archive_path(target);

    if cache::files_identical(&archive_path, contents.as_bytes())
        .map_err(|source| CacheError::Io { path: archive_path.clone(), source })?
    {
        cache::copy_preserving_mtime(&archive_path, &build_path)
            .map_err(|source| CacheError::Io { path: build_path, source })?;
    } else {
        if let Some(parent) = build_path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io { path: parent.to_path_buf(), source })?;
        }
        fs::write(&build_path, contents).map_err(|source| CacheError::Io { path: build_path, source })?;
    }
    Ok(())
}

/// `recall(target, *sources) -> bool`: true iff the archive copy of
/// `target` exists and is at least as new as every listed source.
pub fn recall(state: &mut EngineState, target: &str, sources: &[String]) -> Result<bool, MashError> {
    let archive_path = state.workspace.archive_path(target);
    if !archive_path.is_file() && !archive_path.is_dir() {
        return Ok(false);
    }
    let archive_mtime = cache::mtime_of(&archive_path).map_err(|source| CacheError::Io { path: archive_path.clone(), source })?;

    let deduped = cache::dedupe_preserving_order(&sources.iter().map(std::path::PathBuf::from).collect::<Vec<_>>());
    let mut source_mtimes = Vec::with_capacity(deduped.len());
    for source in &deduped {
        let source_path = state.workspace.build_path(source);
        if !source_path.exists() {
            let all = deduped.iter().map(|p| state.workspace.build_path(p)).collect();
            return Err(CacheError::MissingDependency {
                target: state.workspace.build_path(target),
                missing: source_path,
                all,
            }
            .into());
        }
        source_mtimes
            .push(cache::mtime_of(&source_path).map_err(|source_err| CacheError::Io { path: source_path, source: source_err })?);
    }

    if !cache::dominates(archive_mtime, &source_mtimes) {
        return Ok(false);
    }

    let build_path = state.workspace.build_path(target);
    cache::copy_preserving_mtime(&archive_path, &build_path).map_err(|source| CacheError::Io { path: build_path, source })?;
    Ok(true)
}

/// `keep(src, target?=src)`.
pub fn keep(state: &EngineState, src: &str, target: Option<&str>) -> Result<(), MashError> {
    if !state.keep_dir.is_absolute() {
        return Err(CacheError::KeepDirNotAbsolute(state.keep_dir.clone()).into());
    }
    let src_path = state.workspace.build_path(src);
    if !src_path.is_file() && !src_path.is_dir() {
        return Err(CacheError::KeepSourceInvalid { src: src_path }.into());
    }
    let dest = state.keep_dir.join(target.unwrap_or(src));
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| CacheError::Io { path: parent.to_path_buf(), source })?;
    }
    cache::copy_preserving_mtime(&src_path, &dest).map_err(|source| CacheError::Io { path: dest, source })?;
    Ok(())
}

/// `imprt(*names, target?, conditional=false)`. A no-op when `names`
/// is empty.
pub fn imprt(state: &EngineState, names: &[String], target: Option<&str>, conditional: bool) -> Result<(), MashError> {
    if names.is_empty() {
        return Ok(());
    }
    if target.is_some() && names.len() != 1 {
        return Err(CacheError::ImportTargetAmbiguous.into());
    }

    for name in names {
        let hit = state.import_search_dirs.iter().map(|dir| dir.join(name)).find(|p| p.is_file());
        let Some(hit) = hit else {
            if conditional {
                continue;
            }
            return Err(CacheError::ImportNotFound {
                name: name.clone(),
                searched: state.import_search_dirs.clone(),
            }
            .into());
        };

        let dest_name = target.map(str::to_string).unwrap_or_else(|| basename(name));
        let dest = state.workspace.build_path(&dest_name);
        let source_bytes = fs::read(&hit).map_err(|source| CacheError::Io { path: hit.clone(), source })?;
        if cache::files_identical(&dest, &source_bytes).map_err(|source| CacheError::Io { path: dest.clone(), source })? {
            continue;
        }
        cache::copy_preserving_mtime(&hit, &dest).map_err(|source| CacheError::Io { path: dest, source })?;
    }
    Ok(())
}

fn basename(name: &str) -> String {
    Path::new(name).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| name.to_string())
}

/// `read(fname)`: append the file's contents to the current frame's
/// text.
pub fn read(state: &EngineState, frame: &FrameHandle, fname: &str) -> Result<(), MashError> {
    let path = state.workspace.build_path(fname);
    let contents = fs::read_to_string(&path).map_err(|source| CacheError::Io { path, source })?;
    let mut f = frame.borrow_mut();
    let updated = format!("{}{}", f.text(), contents);
    f.set_text(updated);
    Ok(())
}

/// `anon(content?) -> str`: first 7 hex chars of SHA-1(content), a
/// short, deterministic, collision-resistant name derived purely from
/// the content.
pub fn anon_of(content: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..7].to_string()
}

/// `unindent()`: re-run the frame's own unindent algorithm against
/// its current text.
pub fn unindent_text(frame: &FrameHandle) {
    let mut f = frame.borrow_mut();
    let result = unindent(f.text());
    f.set_text(result);
}

/// `strip()`: trim leading/trailing whitespace of the current text.
pub fn strip_text(frame: &FrameHandle) {
    let mut f = frame.borrow_mut();
    let result = f.text().trim().to_string();
    f.set_text(result);
}

/// `ext(fname, ext) -> str`: replace the file extension.
pub fn ext(fname: &str, extension: &str) -> String {
    Path::new(fname).with_extension(extension).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::workspace::Workspace;
    use filetime::FileTime;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn new_state(dir: &Path) -> EngineState {
        let workspace = Workspace::new(dir.to_path_buf(), dir.to_path_buf());
        workspace.rotate().unwrap();
        EngineState::new(workspace, vec![dir.to_path_buf()], dir.to_path_buf())
    }

    #[test]
    fn save_writes_frame_text_by_default() {
        let dir = tempdir().unwrap();
        let mut state = new_state(dir.path());
        let frame = Frame::new_root("doc");
        frame.borrow_mut().set_text("hello".to_string());

        save(&mut state, &frame, "out.txt", None).unwrap();

        assert_eq!(fs::read_to_string(state.workspace.build_path("out.txt")).unwrap(), "hello");
    }

    #[test]
    fn save_reuses_identical_archive_copy() {
        let dir = tempdir().unwrap();
        let mut state = new_state(dir.path());
        let archive_path = state.workspace.archive_path("out.txt");
        fs::write(&archive_path, b"hello").unwrap();
        filetime::set_file_mtime(&archive_path, FileTime::from_unix_time(1_000, 0)).unwrap();

        let frame = Frame::new_root("doc");
        frame.borrow_mut().set_text("hello".to_string());
        save(&mut state, &frame, "out.txt", None).unwrap();

        let build_mtime = cache::mtime_of(&state.workspace.build_path("out.txt")).unwrap();
        assert_eq!(build_mtime, FileTime::from_unix_time(1_000, 0));
    }

    #[test]
    fn recall_reports_missing_dependency_with_full_list() {
        let dir = tempdir().unwrap();
        let mut state = new_state(dir.path());
        fs::write(state.workspace.archive_path("out"), b"x").unwrap();
        fs::write(state.workspace.build_path("present"), b"y").unwrap();

        let err = recall(&mut state, "out", &["present".to_string(), "absent".to_string()]).unwrap_err();
        match err {
            MashError::Cache(CacheError::MissingDependency { missing, all, .. }) => {
                assert!(missing.ends_with("absent"));
                assert_eq!(all.len(), 2);
            }
            other => panic!("expected MissingDependency, got {other:?}"),
        }
    }

    #[test]
    fn keep_requires_an_absolute_keep_directory() {
        let dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path().to_path_buf(), PathBuf::from("relative"));
        workspace.rotate().unwrap();
        let state = EngineState::new(workspace, vec![], PathBuf::from("relative"));

        fs::write(state.workspace.build_path("a.txt"), b"x").unwrap();
        let err = keep(&state, "a.txt", None).unwrap_err();
        assert!(matches!(err, MashError::Cache(CacheError::KeepDirNotAbsolute(_))));
    }

    #[test]
    fn keep_copies_into_the_keep_directory_under_an_optional_target_name() {
        let dir = tempdir().unwrap();
        let keep_dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path().to_path_buf(), keep_dir.path().to_path_buf());
        workspace.rotate().unwrap();
        let state = EngineState::new(workspace, vec![], keep_dir.path().to_path_buf());
        fs::write(state.workspace.build_path("a.txt"), b"contents").unwrap();

        keep(&state, "a.txt", Some("renamed.txt")).unwrap();

        assert_eq!(fs::read_to_string(keep_dir.path().join("renamed.txt")).unwrap(), "contents");
    }

    #[test]
    fn keep_rejects_a_source_that_is_neither_file_nor_directory() {
        let dir = tempdir().unwrap();
        let keep_dir = tempdir().unwrap();
        let workspace = Workspace::new(dir.path().to_path_buf(), keep_dir.path().to_path_buf());
        workspace.rotate().unwrap();
        let state = EngineState::new(workspace, vec![], keep_dir.path().to_path_buf());

        let err = keep(&state, "missing.txt", None).unwrap_err();
        assert!(matches!(err, MashError::Cache(CacheError::KeepSourceInvalid { .. })));
    }

    #[test]
    fn imprt_is_fatal_when_not_found() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());
        let err = imprt(&state, &["missing.tex".to_string()], None, false).unwrap_err();
        assert!(matches!(err, MashError::Cache(CacheError::ImportNotFound { .. })));
    }

    #[test]
    fn imprt_conditional_silently_skips_a_missing_source() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());
        imprt(&state, &["missing.tex".to_string()], None, true).unwrap();
        assert!(!state.workspace.build_path("missing.tex").exists());
    }

    #[test]
    fn imprt_rejects_a_target_with_more_than_one_name() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());
        let err = imprt(&state, &["a.tex".to_string(), "b.tex".to_string()], Some("merged.tex"), false).unwrap_err();
        assert!(matches!(err, MashError::Cache(CacheError::ImportTargetAmbiguous)));
    }

    #[test]
    fn imprt_skips_an_already_identical_destination_without_touching_its_mtime() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());
        fs::write(dir.path().join("fig.tex"), b"same").unwrap();

        let dest = state.workspace.build_path("fig.tex");
        fs::write(&dest, b"same").unwrap();
        filetime::set_file_mtime(&dest, FileTime::from_unix_time(500, 0)).unwrap();

        imprt(&state, &["fig.tex".to_string()], None, false).unwrap();

        assert_eq!(cache::mtime_of(&dest).unwrap(), FileTime::from_unix_time(500, 0));
    }

    #[test]
    fn read_appends_file_contents_to_current_text() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());
        fs::write(state.workspace.build_path("data.txt"), b"world").unwrap();

        let frame = Frame::new_root("doc");
        frame.borrow_mut().set_text("hello ".to_string());
        read(&state, &frame, "data.txt").unwrap();

        assert_eq!(frame.borrow().text(), "hello world");
    }

    #[test]
    fn anon_of_is_the_first_seven_hex_chars_of_sha1() {
        let mut hasher = Sha1::new();
        hasher.update(b"hello");
        let full = hex::encode(hasher.finalize());
        assert_eq!(anon_of("hello"), full[..7]);
        assert_eq!(anon_of("hello"), anon_of("hello"));
        assert_ne!(anon_of("hello"), anon_of("goodbye"));
    }

    #[test]
    fn unindent_text_strips_the_frame_texts_common_prefix() {
        let frame = Frame::new_root("doc");
        frame.borrow_mut().set_text("  a\n  b".to_string());
        unindent_text(&frame);
        assert_eq!(frame.borrow().text(), "a\nb");
    }

    #[test]
    fn strip_text_trims_leading_and_trailing_whitespace() {
        let frame = Frame::new_root("doc");
        frame.borrow_mut().set_text("  hi  \n".to_string());
        strip_text(&frame);
        assert_eq!(frame.borrow().text(), "hi");
    }

    #[test]
    fn ext_replaces_the_extension() {
        assert_eq!(ext("figure.dat", "pdf"), "figure.pdf");
        assert_eq!(ext("plain", "txt"), "plain.txt");
    }
}
