use crate::core_jail::error::PathError;
use log::{trace, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The directory tree every resolved path must stay under.
///
/// Once the process has been chroot-ed this is simply `/`; without a
/// chroot it is the canonical form of the configured root directory.
#[derive(Debug, Clone)]
pub struct JailRoot {
    root: PathBuf,
}

/// A path that has been checked against the real filesystem and is known
/// to lie inside the jail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    virtual_path: String,
    real_path: PathBuf,
}

impl ResolvedPath {
    /// Normalized path as the client sees it, always starting with `/`.
    pub fn virtual_path(&self) -> &str {
        &self.virtual_path
    }

    /// Canonical location on disk, symbolic links already followed.
    pub fn real_path(&self) -> &Path {
        &self.real_path
    }

    /// Last segment of the virtual path, or `/` for the jail root itself.
    pub fn file_name(&self) -> &str {
        match self.virtual_path.rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ => "/",
        }
    }
}

impl JailRoot {
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("jail root {} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolves `virtual_path` relative to `current_dir` (itself a virtual
    /// path) into a location inside the jail.
    ///
    /// `.` and `..` are folded lexically first; climbing above the root is
    /// an error rather than being clamped. The candidate is then
    /// canonicalized, which follows every symbolic link in the chain, and
    /// the result is checked again against the root.
    pub fn resolve(
        &self,
        current_dir: &str,
        virtual_path: &str,
    ) -> Result<ResolvedPath, PathError> {
        let segments = normalize(current_dir, virtual_path)?;
        let virtual_path = format!("/{}", segments.join("/"));

        let mut candidate = self.root.clone();
        candidate.extend(&segments);

        let real_path = match candidate.canonicalize() {
            Ok(path) => path,
            Err(e) => {
                self.verify_root()?;
                return Err(match e.kind() {
                    io::ErrorKind::NotFound => PathError::NotFound,
                    _ => PathError::Inaccessible(e),
                });
            }
        };

        if !real_path.starts_with(&self.root) {
            warn!(
                "Blocked symbolic link escape: {} resolves outside the jail",
                virtual_path
            );
            return Err(PathError::EscapesRoot);
        }

        trace!("Resolved {} to {:?}", virtual_path, real_path);
        Ok(ResolvedPath {
            virtual_path,
            real_path,
        })
    }

    fn verify_root(&self) -> Result<(), PathError> {
        fs::metadata(&self.root)
            .map(|_| ())
            .map_err(PathError::RootUnavailable)
    }
}

/// Joins `virtual_path` onto `current_dir` and folds `.`/`..` segments.
///
/// An absolute `virtual_path` ignores the working directory. The returned
/// segments never contain `.`, `..` or empty entries.
pub fn normalize(current_dir: &str, virtual_path: &str) -> Result<Vec<String>, PathError> {
    if virtual_path.contains('\0') || current_dir.contains('\0') {
        return Err(PathError::InvalidPath);
    }

    let base = if virtual_path.starts_with('/') {
        ""
    } else {
        current_dir
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(virtual_path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::EscapesRoot);
                }
            }
            name => segments.push(name),
        }
    }

    Ok(segments.into_iter().map(str::to_owned).collect())
}
