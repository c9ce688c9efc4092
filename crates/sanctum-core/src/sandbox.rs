//! Sandbox: a scratch area confined to `Sanctum_Sandbox/`.
//!
//! Every path is relative to the sandbox root and must resolve inside it, including
//! through symlinks. README files are never listed and the top-level README is never removed.

use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::layout::{SanctumLayout, SANDBOX_README};
use crate::{SanctumError, SanctumResult};

pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(layout: &SanctumLayout) -> Self {
        Self {
            root: layout.sandbox(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn canonical_root(&self) -> SanctumResult<PathBuf> {
        self.root
            .canonicalize()
            .map_err(|_| SanctumError::MissingDirectory(self.root.clone()))
    }

    /// Map a relative path to a location under the sandbox root.
    pub fn resolve(&self, relative: &str) -> SanctumResult<PathBuf> {
        let normalized = relative.replace('\\', "/");
        if normalized.trim().is_empty() {
            return Err(SanctumError::EmptyInput("sandbox path"));
        }
        let rel = Path::new(&normalized);
        if rel.is_absolute() || normalized.starts_with('/') {
            return Err(SanctumError::OutsideSandbox(relative.to_string()));
        }
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(SanctumError::OutsideSandbox(relative.to_string()));
        }

        let root = self.canonical_root()?;
        let full = root.join(rel);

        // Every symlink on the way, the leaf included, must land inside the root.
        // A dangling link cannot be resolved and is refused.
        let mut current = root.clone();
        for part in rel.components() {
            let Component::Normal(part) = part else { continue };
            current.push(part);
            match std::fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    let inside = current
                        .canonicalize()
                        .map(|target| target.starts_with(&root))
                        .unwrap_or(false);
                    if !inside {
                        return Err(SanctumError::OutsideSandbox(relative.to_string()));
                    }
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(full)
    }

    pub fn create_file(&self, relative: &str, content: &str) -> SanctumResult<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        tracing::info!(target: "sanctum::sandbox", file = %relative, "sandbox file written");
        Ok(path)
    }

    /// Relative paths in walk order; directories end with `/`. README files are hidden at any depth.
    pub fn list(&self) -> SanctumResult<Vec<String>> {
        let root = self.canonical_root()?;
        let mut out = Vec::new();
        for entry in WalkDir::new(&root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let rel = match entry.path().strip_prefix(&root) {
                Ok(r) => r,
                Err(_) => continue,
            };
            if entry.file_name() == SANDBOX_README {
                continue;
            }
            let mut name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if entry.file_type().is_dir() {
                name.push('/');
            }
            out.push(name);
        }
        Ok(out)
    }

    /// Remove every top-level entry except the README. Returns how many were removed.
    pub fn clear(&self) -> SanctumResult<usize> {
        let root = self.canonical_root()?;
        let mut removed = 0;
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if entry.file_name() == SANDBOX_README {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
            removed += 1;
        }
        tracing::info!(target: "sanctum::sandbox", removed, "sandbox cleared");
        Ok(removed)
    }
}
