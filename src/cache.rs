//! The two cache-reuse decisions: content-identical reuse (`save`) and
//! mtime-dominance reuse (`recall`), plus
//! the file/directory copy primitives both host operations and `keep`
//! build on.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

/// Byte-for-byte comparison, used by `save` to decide whether the
/// archive copy can stand in for freshly-written contents.
pub fn files_identical(path: &Path, contents: &[u8]) -> io::Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let existing = fs::read(path)?;
    Ok(existing == contents)
}

pub fn mtime_of(path: &Path) -> io::Result<FileTime> {
    let meta = fs::metadata(path)?;
    Ok(FileTime::from_last_modification_time(&meta))
}

/// Copy `src` to `dest`, preserving mtime, the way `shutil.copy2` does
/// in the original. Recurses for directories, replacing any existing
/// entry at `dest`.
pub fn copy_preserving_mtime(src: &Path, dest: &Path) -> io::Result<()> {
    if src.is_dir() {
        if dest.exists() {
            fs::remove_dir_all(dest)?;
        }
        fs::create_dir_all(dest)?;
        for entry in WalkDir::new(src).min_depth(1) {
            let entry = entry?;
            let rel = entry.path().strip_prefix(src).expect("walkdir yields paths under src");
            let target = dest.join(rel);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                copy_file_preserving_mtime(entry.path(), &target)?;
            }
        }
        // Preserve the mtime of the directory root itself last, since
        // writing children bumps it.
        let mtime = mtime_of(src)?;
        filetime::set_file_mtime(dest, mtime)?;
        Ok(())
    } else {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_file_preserving_mtime(src, dest)
    }
}

fn copy_file_preserving_mtime(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest)?;
    let mtime = mtime_of(src)?;
    filetime::set_file_mtime(dest, mtime)?;
    Ok(())
}

/// Deduplicate while preserving first occurrence: `recall`'s sources
/// are deduplicated this way before their mtimes are compared.
pub fn dedupe_preserving_order(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    paths.iter().filter(|p| seen.insert((*p).clone())).cloned().collect()
}

/// `true` iff `target_mtime` is not older than any of `source_mtimes`:
/// the target's mtime must be ≥ the mtime of every listed source.
pub fn dominates(target_mtime: FileTime, source_mtimes: &[FileTime]) -> bool {
    source_mtimes.iter().all(|m| target_mtime >= *m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn identical_contents_are_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();
        assert!(files_identical(&path, b"hello").unwrap());
        assert!(!files_identical(&path, b"goodbye").unwrap());
    }

    #[test]
    fn missing_file_is_never_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        assert!(!files_identical(&path, b"hello").unwrap());
    }

    #[test]
    fn copy_preserves_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        fs::write(&src, b"hello").unwrap();
        sleep(Duration::from_millis(10));

        let dest = dir.path().join("dest.txt");
        copy_preserving_mtime(&src, &dest).unwrap();

        assert_eq!(mtime_of(&src).unwrap(), mtime_of(&dest).unwrap());
        assert_eq!(fs::read(&dest).unwrap(), b"hello");
    }

    #[test]
    fn copy_directory_replaces_existing_target() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("nested/a.txt"), b"one").unwrap();

        let dest = dir.path().join("dest");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), b"stale").unwrap();

        copy_preserving_mtime(&src, &dest).unwrap();

        assert!(!dest.join("stale.txt").exists());
        assert_eq!(fs::read(dest.join("nested/a.txt")).unwrap(), b"one");
    }

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        let a = PathBuf::from("a");
        let b = PathBuf::from("b");
        let result = dedupe_preserving_order(&[a.clone(), b.clone(), a.clone()]);
        assert_eq!(result, vec![a, b]);
    }

    #[test]
    fn dominates_requires_ge_every_source() {
        let old = FileTime::from_unix_time(100, 0);
        let new = FileTime::from_unix_time(200, 0);
        assert!(dominates(new, &[old, old]));
        assert!(!dominates(old, &[new]));
        assert!(dominates(new, &[]));
    }
}
