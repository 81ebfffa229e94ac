//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve symlinks
/// and normalize components.
///
/// If it fails (e.g. the quarantine directory was wiped by a reboot), the path
/// is made absolute relative to CWD and `..`/`.` components are resolved
/// syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }

    normalize_syntactic(&absolute)
}

/// Whether `name` is a plain file name: exactly one normal component, no
/// separators, no `.`/`..`.
///
/// Index keys and the index file name must satisfy this; anything else would
/// let a record escape the working or quarantine directory.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
        && !name.contains('\\')
}

/// Strip a user-supplied file argument down to the name the index keys on.
///
/// Only leading `./` and trailing separators go: `./mod.jar` and `mod.jar/`
/// both become `mod.jar`. Anything that still names another directory, such
/// as `other/mod.jar` or an absolute path, is returned as is and will not
/// match an index key.
pub fn clean_file_arg(raw: &str) -> String {
    let mut name = raw.trim_end_matches(['/', '\\']);
    while let Some(rest) = name
        .strip_prefix("./")
        .or_else(|| name.strip_prefix(".\\"))
    {
        name = rest;
    }
    name.to_string()
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
