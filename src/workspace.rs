//! The three-directory workspace (`build`/`archive`/`keep`) and its
//! startup rotation lifecycle.

use std::fs;
use std::path::{Path, PathBuf};

/// `build` / `archive` / `keep`, derived from the invocation directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub invocation_dir: PathBuf,
    pub build: PathBuf,
    pub archive: PathBuf,
    pub keep: PathBuf,
}

impl Workspace {
    pub fn new(invocation_dir: PathBuf, keep: PathBuf) -> Self {
        Workspace {
            build: invocation_dir.join(".mash"),
            archive: invocation_dir.join(".mash-archive"),
            invocation_dir,
            keep,
        }
    }

    /// `-c`: wipe both `build` and `archive` before anything else runs.
    pub fn clean(&self) -> std::io::Result<()> {
        remove_if_exists(&self.build)?;
        remove_if_exists(&self.archive)?;
        Ok(())
    }

    /// Startup lifecycle: move every entry of `build` into `archive`
    /// (overwriting same-named entries), then create `build` fresh.
    /// Does not change the process's current directory — the caller
    /// does that once `build` exists.
    pub fn rotate(&self) -> std::io::Result<()> {
        if self.build.is_dir() {
            fs::create_dir_all(&self.archive)?;
            for entry in fs::read_dir(&self.build)? {
                let entry = entry?;
                let dest = self.archive.join(entry.file_name());
                remove_if_exists(&dest)?;
                fs::rename(entry.path(), &dest)?;
            }
            fs::remove_dir_all(&self.build)?;
        }
        fs::create_dir_all(&self.build)?;
        Ok(())
    }

    /// Path to `name` inside `build`.
    pub fn build_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.build.join(name)
    }

    /// Path to `name` inside `archive`.
    pub fn archive_path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.archive.join(name)
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rotate_creates_build_when_absent() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path().to_path_buf(), dir.path().to_path_buf());
        ws.rotate().unwrap();
        assert!(ws.build.is_dir());
        assert!(!ws.archive.exists());
    }

    #[test]
    fn rotate_moves_previous_build_into_archive() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path().to_path_buf(), dir.path().to_path_buf());
        ws.rotate().unwrap();
        fs::write(ws.build_path("x.txt"), b"hello").unwrap();

        ws.rotate().unwrap();

        assert!(ws.build.is_dir());
        assert!(!ws.build_path("x.txt").exists());
        assert_eq!(fs::read(ws.archive_path("x.txt")).unwrap(), b"hello");
    }

    #[test]
    fn rotate_overwrites_same_named_archive_entries() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path().to_path_buf(), dir.path().to_path_buf());
        ws.rotate().unwrap();
        fs::write(ws.build_path("x.txt"), b"first").unwrap();
        ws.rotate().unwrap();
        fs::write(ws.build_path("x.txt"), b"second").unwrap();
        ws.rotate().unwrap();

        assert_eq!(fs::read(ws.archive_path("x.txt")).unwrap(), b"second");
    }

    #[test]
    fn clean_removes_build_and_archive() {
        let dir = tempdir().unwrap();
        let ws = Workspace::new(dir.path().to_path_buf(), dir.path().to_path_buf());
        ws.rotate().unwrap();
        fs::write(ws.build_path("x.txt"), b"hello").unwrap();
        ws.rotate().unwrap();

        ws.clean().unwrap();

        assert!(!ws.build.exists());
        assert!(!ws.archive.exists());
    }
}
