use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Rejection reasons, one per containment rule.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("script path must be relative to the home root")]
    AbsolutePath,

    #[error("script path must stay under the home root")]
    EscapesRoot,

    #[error("script suffix is not allowed: {suffix:?}")]
    DisallowedSuffix { suffix: String },

    #[error("script type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("script not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("script is under a skipped directory: {}", .0.display())]
    SkippedDir(PathBuf),

    #[error("failed to inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The containment boundary for every file the agent is willing to execute.
///
/// Script paths arrive from a semi-trusted remote record, so resolution
/// treats them as hostile: relative-only, no climbing out of the home root
/// (lexically or through symlinks), whitelisted suffixes, and no
/// tooling-internal directories.
#[derive(Debug, Clone)]
pub struct Sandbox {
    home_root: PathBuf,
    allowed_suffixes: Vec<String>,
    skip_dirs: Vec<String>,
}

impl Sandbox {
    pub fn new(home_root: PathBuf, allowed_suffixes: &[&str], skip_dirs: &[&str]) -> Self {
        Self {
            home_root,
            allowed_suffixes: allowed_suffixes.iter().map(|s| s.to_string()).collect(),
            skip_dirs: skip_dirs.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn home_root(&self) -> &Path {
        &self.home_root
    }

    /// Returns `true` if any component of `path` is in the skip set.
    pub fn is_skipped(&self, path: &Path) -> bool {
        path.components().any(|component| match component {
            Component::Normal(name) => self
                .skip_dirs
                .iter()
                .any(|skip| name.to_str() == Some(skip.as_str())),
            _ => false,
        })
    }

    /// Resolve a nominal script path to its verified absolute location.
    ///
    /// Checks, in order: relative-only, no lexical escape, allowed suffix,
    /// declared-type match, existence plus no symlink escape, skip set. All
    /// are mandatory; there is no partial success.
    pub fn resolve(&self, script_path: &str, expected_type: &str) -> Result<PathBuf, SandboxError> {
        let nominal = Path::new(script_path);
        if nominal.is_absolute() {
            return Err(SandboxError::AbsolutePath);
        }

        // lexical check up front: `..` climbs are rejected before the
        // filesystem is consulted at all
        let mut depth: i64 = 0;
        for component in nominal.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(SandboxError::EscapesRoot);
                    }
                }
                Component::Normal(_) => depth += 1,
                Component::RootDir | Component::Prefix(_) => {
                    return Err(SandboxError::AbsolutePath);
                }
            }
        }

        let suffix = suffix_of(nominal);
        if !self.is_allowed_suffix(suffix) {
            return Err(SandboxError::DisallowedSuffix {
                suffix: suffix.to_string(),
            });
        }
        if !expected_type.is_empty() && expected_type != suffix {
            return Err(SandboxError::TypeMismatch {
                expected: expected_type.to_string(),
                actual: suffix.to_string(),
            });
        }

        let joined = self.home_root.join(nominal);
        let resolved = match joined.canonicalize() {
            Ok(path) => path,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SandboxError::NotFound(joined));
            }
            Err(source) => {
                return Err(SandboxError::Io {
                    path: joined,
                    source,
                });
            }
        };
        let home = self
            .home_root
            .canonicalize()
            .map_err(|source| SandboxError::Io {
                path: self.home_root.clone(),
                source,
            })?;

        // symlinks may point anywhere; the canonical location decides
        let relative = resolved
            .strip_prefix(&home)
            .map_err(|_| SandboxError::EscapesRoot)?;
        let resolved_suffix = suffix_of(&resolved);
        if !self.is_allowed_suffix(resolved_suffix) {
            return Err(SandboxError::DisallowedSuffix {
                suffix: resolved_suffix.to_string(),
            });
        }
        if self.is_skipped(relative) {
            return Err(SandboxError::SkippedDir(resolved));
        }

        Ok(resolved)
    }

    fn is_allowed_suffix(&self, suffix: &str) -> bool {
        !suffix.is_empty() && self.allowed_suffixes.iter().any(|allowed| allowed == suffix)
    }
}

/// File extension without its leading dot, empty when there is none.
fn suffix_of(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sandbox(home: &TempDir) -> Sandbox {
        Sandbox::new(
            home.path().to_path_buf(),
            &["py", "ipynb"],
            &[".venv", ".cache", "__pycache__", ".git"],
        )
    }

    fn touch(home: &TempDir, rel: &str) -> PathBuf {
        let path = home.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "print('ok')\n").unwrap();
        path
    }

    #[test]
    fn accepts_script_under_home() {
        let home = TempDir::new().unwrap();
        touch(&home, "proj/train.py");

        let resolved = sandbox(&home).resolve("proj/train.py", "py").unwrap();
        assert!(resolved.ends_with("proj/train.py"));
        assert!(resolved.starts_with(home.path().canonicalize().unwrap()));
    }

    #[test]
    fn accepts_internal_parent_segments() {
        let home = TempDir::new().unwrap();
        touch(&home, "proj/train.py");

        assert!(sandbox(&home).resolve("proj/../proj/train.py", "py").is_ok());
    }

    #[test]
    fn empty_expected_type_skips_the_match() {
        let home = TempDir::new().unwrap();
        touch(&home, "train.py");

        assert!(sandbox(&home).resolve("train.py", "").is_ok());
    }

    #[test]
    fn rejects_absolute_path() {
        let home = TempDir::new().unwrap();
        let result = sandbox(&home).resolve("/etc/passwd", "");
        assert!(matches!(result, Err(SandboxError::AbsolutePath)));
    }

    #[test]
    fn rejects_parent_dir_escape() {
        let home = TempDir::new().unwrap();
        let result = sandbox(&home).resolve("../outside.py", "py");
        assert!(matches!(result, Err(SandboxError::EscapesRoot)));
    }

    #[test]
    fn rejects_disallowed_suffix() {
        let home = TempDir::new().unwrap();
        touch(&home, "notes.txt");

        let result = sandbox(&home).resolve("notes.txt", "");
        assert!(matches!(result, Err(SandboxError::DisallowedSuffix { .. })));
    }

    #[test]
    fn rejects_missing_suffix() {
        let home = TempDir::new().unwrap();
        let result = sandbox(&home).resolve("Makefile", "");
        assert!(matches!(result, Err(SandboxError::DisallowedSuffix { .. })));
    }

    #[test]
    fn rejects_declared_type_mismatch() {
        let home = TempDir::new().unwrap();
        touch(&home, "train.py");

        let result = sandbox(&home).resolve("train.py", "ipynb");
        assert!(matches!(result, Err(SandboxError::TypeMismatch { .. })));
    }

    #[test]
    fn rejects_missing_file() {
        let home = TempDir::new().unwrap();
        let result = sandbox(&home).resolve("ghost.py", "py");
        assert!(matches!(result, Err(SandboxError::NotFound(_))));
    }

    #[test]
    fn rejects_script_in_skipped_directory() {
        let home = TempDir::new().unwrap();
        touch(&home, ".venv/bin/activate_this.py");

        let result = sandbox(&home).resolve(".venv/bin/activate_this.py", "py");
        assert!(matches!(result, Err(SandboxError::SkippedDir(_))));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_escaping_home() {
        let home = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let target = outside.path().join("out.py");
        fs::write(&target, "print('out')\n").unwrap();
        std::os::unix::fs::symlink(&target, home.path().join("link.py")).unwrap();

        let result = sandbox(&home).resolve("link.py", "py");
        assert!(matches!(result, Err(SandboxError::EscapesRoot)));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlink_changing_suffix() {
        let home = TempDir::new().unwrap();
        let target = touch(&home, "real.sh");
        fs::write(&target, "#!/bin/sh\n").unwrap();
        std::os::unix::fs::symlink(&target, home.path().join("fake.py")).unwrap();

        let result = sandbox(&home).resolve("fake.py", "py");
        assert!(matches!(result, Err(SandboxError::DisallowedSuffix { .. })));
    }
}
