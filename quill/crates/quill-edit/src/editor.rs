//! Editing text in an external editor.
//!
//! The caller is responsible for handing the terminal over first (leave
//! raw mode, stop the renderer) and taking it back afterwards.

use crate::error::EditorError;
use std::io::Write;
use std::process::Command;

/// Editors tried, in order, when neither `VISUAL` nor `EDITOR` is set.
const FALLBACK_EDITORS: &[&str] = &["editor", "nano", "pico", "vi", "emacs"];

/// Resolves the editor command line from `VISUAL`, `EDITOR` or the first
/// fallback editor found on `PATH`.
pub fn resolve_editor() -> Result<Vec<String>, EditorError> {
    for var in ["VISUAL", "EDITOR"] {
        if let Ok(value) = std::env::var(var) {
            if value.trim().is_empty() {
                continue;
            }
            match shlex::split(&value) {
                Some(argv) if !argv.is_empty() => return Ok(argv),
                _ => tracing::warn!("ignoring unparsable {var}={value:?}"),
            }
        }
    }
    FALLBACK_EDITORS
        .iter()
        .find_map(|name| which::which(name).ok())
        .map(|path| vec![path.to_string_lossy().into_owned()])
        .ok_or(EditorError::NoEditor)
}

/// Writes `text` to a temporary file ending in `suffix`, opens it in the
/// user's editor and returns the edited text. One trailing newline added
/// by the editor is removed.
pub fn edit_text(text: &str, suffix: &str) -> Result<String, EditorError> {
    let mut file = tempfile::Builder::new()
        .prefix("quill-")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;

    let argv = resolve_editor()?;
    let command_line = argv.join(" ");
    tracing::debug!(editor = %command_line, path = %file.path().display(), "opening external editor");
    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .arg(file.path())
        .status()
        .map_err(|source| EditorError::SpawnFailed {
            command: command_line,
            source,
        })?;
    if !status.success() {
        return Err(EditorError::EditorFailed(status.to_string()));
    }

    let edited = std::fs::read(file.path())?;
    let mut edited = String::from_utf8_lossy(&edited).into_owned();
    if edited.ends_with('\n') {
        edited.pop();
        if edited.ends_with('\r') {
            edited.pop();
        }
    }
    Ok(edited)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    struct EnvGuard(Vec<(&'static str, Option<String>)>);

    impl EnvGuard {
        fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
            let saved = vars.iter().map(|(k, _)| (*k, std::env::var(k).ok())).collect();
            for (k, v) in vars {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
            Self(saved)
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (k, v) in &self.0 {
                match v {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_visual_takes_precedence() {
        let _env = EnvGuard::set(&[("VISUAL", Some("code --wait")), ("EDITOR", Some("vim"))]);
        assert_eq!(resolve_editor().unwrap(), vec!["code", "--wait"]);
    }

    #[test]
    #[serial]
    fn test_edit_text_reads_back() {
        let _env = EnvGuard::set(&[
            ("VISUAL", Some(r#"sh -c 'printf "edited\n" > "$1"' sh"#)),
            ("EDITOR", None),
        ]);
        assert_eq!(edit_text("original", ".txt").unwrap(), "edited");
    }

    #[test]
    #[serial]
    fn test_unchanged_text() {
        let _env = EnvGuard::set(&[("VISUAL", Some("true")), ("EDITOR", None)]);
        assert_eq!(edit_text("keep me", ".py").unwrap(), "keep me");
    }

    #[test]
    #[serial]
    fn test_failing_editor() {
        let _env = EnvGuard::set(&[("VISUAL", Some("false")), ("EDITOR", None)]);
        assert!(matches!(edit_text("x", ".txt"), Err(EditorError::EditorFailed(_))));
    }
}
