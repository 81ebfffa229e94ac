//! Moving a file between the working directory and quarantine.
//!
//! A plain `rename` is tried first. When that fails (typically `EXDEV`
//! because the system temp dir lives on another filesystem) the file is
//! copied, the copy is checked against the source length, and only then is
//! the source removed. The source is never touched before a complete copy
//! exists.

use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Move `source` to `destination`.
///
/// On failure the error string describes both attempts and `source` is left
/// in place.
pub fn relocate(source: &Path, destination: &Path) -> std::result::Result<(), String> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) => copy_then_remove(source, destination).map_err(|copy_err| {
            format!("rename failed ({rename_err}); copy fallback failed ({copy_err})")
        }),
    }
}

/// Copy-based move. Permission bits travel with the copy (`fs::copy`
/// carries them over).
pub(crate) fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    let expected = fs::metadata(source)?.len();

    let copied = match fs::copy(source, destination) {
        Ok(n) => n,
        Err(err) => {
            discard_partial(destination);
            return Err(err);
        }
    };

    let on_disk = match fs::metadata(destination) {
        Ok(meta) => meta.len(),
        Err(err) => {
            discard_partial(destination);
            return Err(err);
        }
    };
    if copied != expected || on_disk != expected {
        discard_partial(destination);
        return Err(io::Error::other(format!(
            "short copy: {on_disk} of {expected} bytes reached {}",
            destination.display()
        )));
    }

    // Best effort: a read-only copy cannot always be opened for syncing.
    if let Ok(file) = File::open(destination) {
        let _ = file.sync_all();
    }

    if let Err(err) = fs::remove_file(source) {
        // Keep exactly one copy: the original.
        discard_partial(destination);
        return Err(err);
    }
    Ok(())
}

fn discard_partial(destination: &Path) {
    let _ = fs::remove_file(destination);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jar");
        let dst = dir.path().join("b.jar");
        fs::write(&src, b"payload").unwrap();

        relocate(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"payload");
    }

    #[test]
    fn copy_fallback_preserves_content_and_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jar");
        let dst = dir.path().join("b.jar");
        let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
        fs::write(&src, &payload).unwrap();

        copy_then_remove(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), payload);
    }

    #[cfg(unix)]
    #[test]
    fn copy_fallback_preserves_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("run.sh");
        let dst = dir.path().join("moved.sh");
        fs::write(&src, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o750)).unwrap();

        copy_then_remove(&src, &dst).unwrap();
        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }

    #[test]
    fn failed_copy_leaves_source_and_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jar");
        let dst = dir.path().join("missing").join("a.jar");
        fs::write(&src, b"payload").unwrap();

        let err = relocate(&src, &dst).unwrap_err();
        assert!(err.contains("rename failed"), "{err}");
        assert!(err.contains("copy fallback failed"), "{err}");
        assert_eq!(fs::read(&src).unwrap(), b"payload");
        assert!(!dst.exists());
    }

    #[test]
    fn missing_source_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("ghost.jar");
        let dst = dir.path().join("dst.jar");
        assert!(copy_then_remove(&src, &dst).is_err());
        assert!(!dst.exists());
    }
}
