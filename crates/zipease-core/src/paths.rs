//! Mapping between filesystem paths and entry names

use crate::{Error, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::error;

/// Build the entry name for `path` found while walking `root`
///
/// Components are joined with `/` whatever the host separator is. When
/// `path` is `root` itself (a single file was given) its file name is used.
pub fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::InvalidPath(format!("{:?} is not inside {:?}", path, root))
    })?;

    let relative = if relative.as_os_str().is_empty() {
        path.file_name()
            .map(Path::new)
            .ok_or_else(|| Error::InvalidPath(format!("{:?} has no file name", path)))?
    } else {
        relative
    };

    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part
                .to_str()
                .ok_or_else(|| Error::InvalidPath(format!("Non UTF-8 path: {:?}", path)))?;
            parts.push(part);
        }
    }

    if parts.is_empty() {
        return Err(Error::InvalidPath(format!("Empty entry name for {:?}", path)));
    }

    Ok(parts.join("/"))
}

/// Join an entry name under `base`, refusing names that would escape it
pub fn safe_join(base: &Path, name: &str) -> Result<PathBuf> {
    let mut result = base.to_path_buf();

    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                error!(entry = name, "Entry name contains parent directory component");
                return Err(Error::InvalidPath(format!(
                    "Path traversal attempt detected: {}",
                    name
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                error!(entry = name, "Entry name is absolute");
                return Err(Error::InvalidPath(format!(
                    "Absolute path not allowed: {}",
                    name
                )));
            }
        }
    }

    if result == base {
        return Err(Error::InvalidPath(format!("Empty entry name: {:?}", name)));
    }

    Ok(result)
}

/// Create every missing parent directory of `path`
pub fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
