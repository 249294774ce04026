//! Shared file-rewrite helper.

use std::fs;
use std::io;
use std::path::Path;

/// Write `contents` to a sibling temp file, then atomically rename it
/// over `path`. The original file survives intact if any step fails.
pub(crate) fn replace_file(path: &Path, contents: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().into_owned());
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_file_swaps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules");
        fs::write(&path, "old").unwrap();

        replace_file(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        // No temp file left behind.
        assert!(!dir.path().join("rules.tmp").exists());
    }

    #[test]
    fn test_replace_file_creates_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules");

        replace_file(&path, "fresh").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh");
    }
}
