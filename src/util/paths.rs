use std::path::{Component, Path, PathBuf};

use crate::error::{Result, StatusWatchError};

/// Validates a repository-relative path supplied by a caller and returns it
/// with `/` separators and no leading `./`. Whitespace is only rejected when
/// it is all there is; names may start or end with spaces.
pub fn normalize_relative(input: &str) -> Result<String> {
    if input.trim().is_empty() {
        return Err(StatusWatchError::InvalidArgument(
            "file path must not be blank".to_string(),
        ));
    }

    let path = Path::new(input);
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(StatusWatchError::InvalidArgument(format!(
                    "path {input} escapes the repository root"
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StatusWatchError::InvalidArgument(format!(
                    "path {input} must be relative to the repository root"
                )))
            }
        }
    }

    if parts.is_empty() {
        return Err(StatusWatchError::InvalidArgument(format!(
            "path {input} does not name a file"
        )));
    }
    Ok(parts.join("/"))
}

/// Strips `root` from an absolute event path. Paths outside the root are
/// returned unchanged.
pub fn relative_to_root(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

pub fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{is_blank, normalize_relative, relative_to_root};
    use crate::error::ErrorKind;

    #[test]
    fn normalizes_relative_paths() {
        assert_eq!(normalize_relative("a.txt").expect("plain"), "a.txt");
        assert_eq!(normalize_relative("./src//lib.rs").expect("dotted"), "src/lib.rs");
    }

    #[test]
    fn keeps_surrounding_spaces_in_names() {
        assert_eq!(
            normalize_relative(" padded name.txt ").expect("padded"),
            " padded name.txt "
        );
        assert_eq!(normalize_relative("dir /x.txt").expect("dir"), "dir /x.txt");
    }

    #[test]
    fn rejects_blank_absolute_and_escaping_paths() {
        for input in ["", "   ", "/etc/passwd", "../outside.txt", "src/../../x", "."] {
            let err = normalize_relative(input).expect_err(input);
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{input}");
        }
    }

    #[test]
    fn strips_root_prefix_when_present() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_to_root(root, Path::new("/repo/src/a.rs")),
            PathBuf::from("src/a.rs")
        );
        assert_eq!(
            relative_to_root(root, Path::new("/elsewhere/b.rs")),
            PathBuf::from("/elsewhere/b.rs")
        );
    }

    #[test]
    fn whitespace_paths_are_blank() {
        assert!(is_blank(Path::new("")));
        assert!(is_blank(Path::new("  ")));
        assert!(!is_blank(Path::new("/repo")));
    }
}
