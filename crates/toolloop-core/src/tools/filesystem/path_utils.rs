//! Path helpers shared by the filesystem tools
//!
//! Every path a tool receives is resolved against the workspace and refused
//! if it escapes it.

use std::path::{Component, Path, PathBuf};

use crate::error::ToolError;

/// Display a path with forward slashes on every platform
pub fn path_to_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Path relative to the workspace when possible, for tool output
pub fn relative_display(path: &Path, workspace: &Path) -> String {
    let workspace = dunce::canonicalize(workspace).unwrap_or_else(|_| workspace.to_path_buf());
    match path.strip_prefix(&workspace) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => path_to_display(rel),
        Err(_) => path_to_display(path),
    }
}

/// Join `input` onto the workspace unless it is already absolute
pub fn resolve(input: &str, workspace: &Path) -> PathBuf {
    let path = Path::new(input);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => components.push(component),
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            Component::Normal(_) => components.push(component),
        }
    }

    if components.is_empty() {
        PathBuf::from(".")
    } else {
        components.iter().collect()
    }
}

/// Canonicalize an existing path and require it to be inside the workspace.
pub fn validate_path(path: &Path, workspace: &Path) -> Result<PathBuf, ToolError> {
    // dunce avoids the \\?\ prefix on Windows
    let canonical = dunce::canonicalize(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::ResourceNotFound(format!("Path not found: {}", path_to_display(path)))
        } else {
            ToolError::Io(e)
        }
    })?;

    let workspace_canonical = dunce::canonicalize(workspace).map_err(|e| {
        ToolError::Io(std::io::Error::new(
            e.kind(),
            format!("Cannot resolve workspace path '{}': {}", workspace.display(), e),
        ))
    })?;

    if canonical.starts_with(&workspace_canonical) {
        Ok(canonical)
    } else {
        Err(ToolError::PermissionDenied(format!(
            "Path {} is outside workspace {}",
            path.display(),
            workspace.display()
        )))
    }
}

/// Check a path that may not exist yet. The nearest existing ancestor is
/// canonicalized so symlinks cannot be used to escape the workspace.
pub fn validate_write_path(path: &Path, workspace: &Path) -> Result<PathBuf, ToolError> {
    let workspace_canonical = dunce::canonicalize(workspace).map_err(ToolError::Io)?;
    let normalized = normalize_path(path);

    let mut existing = normalized.as_path();
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                missing.push(name);
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = dunce::canonicalize(existing).unwrap_or_else(|_| existing.to_path_buf());
    for name in missing.iter().rev() {
        resolved.push(name);
    }

    if resolved.starts_with(&workspace_canonical) {
        Ok(resolved)
    } else {
        Err(ToolError::PermissionDenied(format!(
            "Path {} is outside workspace {}",
            path.display(),
            workspace.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize_path(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_validate_path_inside_and_outside() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();

        assert!(validate_path(&dir.path().join("a.txt"), dir.path()).is_ok());
        assert!(matches!(
            validate_path(&dir.path().join("missing.txt"), dir.path()),
            Err(ToolError::ResourceNotFound(_))
        ));

        let other = TempDir::new().unwrap();
        std::fs::write(other.path().join("b.txt"), "y").unwrap();
        assert!(matches!(
            validate_path(&other.path().join("b.txt"), dir.path()),
            Err(ToolError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_validate_write_path() {
        let dir = TempDir::new().unwrap();
        let ok = validate_write_path(&dir.path().join("new/deep/file.txt"), dir.path()).unwrap();
        assert!(ok.ends_with("new/deep/file.txt"));

        assert!(matches!(
            validate_write_path(&dir.path().join("../escape.txt"), dir.path()),
            Err(ToolError::PermissionDenied(_))
        ));
    }
}
