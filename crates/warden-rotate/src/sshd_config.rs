//! Reading and rewriting the login service's `Port` directive.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{RotateError, RotateResult};

/// Read the configured listening port.
///
/// The first line whose trimmed form starts with `Port ` wins;
/// commented-out directives are ignored.
///
/// # Errors
///
/// Returns `RotateError::MissingPortDirective` when no such line
/// exists and `RotateError::Io` when the file cannot be read.
pub fn read_current_port(path: &Path) -> RotateResult<String> {
    let text = fs::read_to_string(path)?;
    for line in text.lines() {
        if let Some((_, _, token)) = port_token(line) {
            return Ok(token.to_string());
        }
    }
    Err(RotateError::MissingPortDirective {
        path: path.to_path_buf(),
    })
}

/// Locate the port token on a `Port` directive line.
///
/// Returns the token's byte span within `line` plus the token itself.
fn port_token(line: &str) -> Option<(usize, usize, &str)> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("Port ")?;
    let token = rest.split_whitespace().next()?;
    let leading = line.len() - trimmed.len();
    let offset = rest.find(token)?;
    let start = leading + "Port ".len() + offset;
    Some((start, start + token.len(), token))
}

/// Rewrite the `Port` directive so it reads `desired`, replacing only
/// the number token and leaving every other byte of the file alone.
/// The result goes to a sibling temp file that is renamed over the
/// original.
///
/// # Errors
///
/// Returns `RotateError::MissingPortDirective` when the file has no
/// `Port` line, `RotateError::Io` on read/write failure.
pub fn apply_port(path: &Path, desired: &str) -> RotateResult<()> {
    let text = fs::read_to_string(path)?;
    let mut out = String::with_capacity(text.len());
    let mut replaced = false;
    for segment in text.split_inclusive('\n') {
        let line = segment.trim_end_matches(['\n', '\r']);
        if !replaced {
            if let Some((start, end, current)) = port_token(line) {
                out.push_str(&line[..start]);
                out.push_str(desired);
                out.push_str(&line[end..]);
                out.push_str(&segment[line.len()..]);
                info!(from = current, to = desired, path = %path.display(), "Port directive rewritten");
                replaced = true;
                continue;
            }
        }
        out.push_str(segment);
    }
    if !replaced {
        return Err(RotateError::MissingPortDirective {
            path: path.to_path_buf(),
        });
    }
    replace_file(path, &out)?;
    Ok(())
}

/// Write to a sibling temp file, then atomically rename over `path`.
fn replace_file(path: &Path, contents: &str) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map_or_else(|| "config".to_string(), |n| n.to_string_lossy().into_owned());
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSHD_CONFIG: &str = "\
# sshd_config
#Port 22
Port 922
AddressFamily any
GatewayPorts no
";

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sshd_config");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_skips_commented_directive() {
        let (_dir, path) = write_config(SSHD_CONFIG);
        assert_eq!(read_current_port(&path).unwrap(), "922");
    }

    #[test]
    fn test_read_accepts_indented_directive() {
        let (_dir, path) = write_config("  Port 2222\n");
        assert_eq!(read_current_port(&path).unwrap(), "2222");
    }

    #[test]
    fn test_read_missing_directive() {
        let (_dir, path) = write_config("#Port 22\nAddressFamily any\n");
        assert!(matches!(
            read_current_port(&path),
            Err(RotateError::MissingPortDirective { .. })
        ));
    }

    #[test]
    fn test_apply_replaces_only_the_token() {
        let (_dir, path) = write_config(SSHD_CONFIG);

        apply_port(&path, "923").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "\
# sshd_config
#Port 22
Port 923
AddressFamily any
GatewayPorts no
"
        );
    }

    #[test]
    fn test_apply_does_not_touch_matching_digits_elsewhere() {
        // "922" also appears in a comment; only the directive changes.
        let (_dir, path) = write_config("# migrated from 922\nPort 922\n");

        apply_port(&path, "923").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "# migrated from 922\nPort 923\n");
    }

    #[test]
    fn test_apply_preserves_trailing_comment() {
        let (_dir, path) = write_config("Port 922 # rotated by gatewarden\n");

        apply_port(&path, "923").unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Port 923 # rotated by gatewarden\n");
    }

    #[test]
    fn test_apply_missing_directive_leaves_file_alone() {
        let (_dir, path) = write_config("AddressFamily any\n");

        assert!(apply_port(&path, "923").is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "AddressFamily any\n");
    }

    #[test]
    fn test_port_token_span() {
        assert_eq!(port_token("Port 922"), Some((5, 8, "922")));
        assert_eq!(port_token("  Port 922"), Some((7, 10, "922")));
        assert_eq!(port_token("#Port 922"), None);
        assert_eq!(port_token("GatewayPorts no"), None);
    }
}
