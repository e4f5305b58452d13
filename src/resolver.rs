//! PATH lookup for `shell(cmd, check=true)`. Executable-availability
//! checks are memoized so repeated calls to the same command are
//! cheap.
//!
//! mash has no shell builtins of its own to skip over, so this is
//! just the PATH-cache lookup `shell()` needs: is the first word of a
//! command runnable, checked once per word and remembered.

use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Resolves whether the first word of a shell command is runnable,
/// caching PATH scans so repeated `shell()` calls for the same
/// executable are cheap.
pub struct ExecutableResolver {
    cache: HashMap<String, bool>,
    path_dirs: Vec<String>,
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutableResolver {
    pub fn new() -> Self {
        let path_dirs = env::var("PATH").unwrap_or_default().split(':').map(String::from).collect();
        ExecutableResolver { cache: HashMap::new(), path_dirs }
    }

    #[cfg(test)]
    pub fn with_path(path_dirs: Vec<String>) -> Self {
        ExecutableResolver { cache: HashMap::new(), path_dirs }
    }

    /// `true` iff `word` names a file that can be executed: either a
    /// path (containing `/`) that is itself an executable file, or a
    /// bare name found somewhere on `PATH`.
    pub fn is_executable(&mut self, word: &str) -> bool {
        if word.contains('/') {
            return Self::is_executable_file(Path::new(word));
        }

        if let Some(&hit) = self.cache.get(word) {
            return hit;
        }

        let found = self.path_dirs.iter().any(|dir| Self::is_executable_file(&Path::new(dir).join(word)));
        self.cache.insert(word.to_string(), found);
        found
    }

    fn is_executable_file(path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            path.metadata().map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
        }
        #[cfg(not(unix))]
        {
            true
        }
    }
}
