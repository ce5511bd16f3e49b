//! Subject line entry through the user's editor

use std::io::Write;

use arc_core::{ArcError, ArcResult};

const SUBJECT_PROMPT: &str = "\n# Enter the subject line above.\n# Lines starting with # are ignored.\n";

/// Use `provided` if non-blank, otherwise ask via the editor.
pub async fn resolve_subject(provided: Option<&str>, editor: Option<&str>) -> ArcResult<String> {
    if let Some(subject) = provided.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(subject.to_string());
    }
    let text = editor_input(SUBJECT_PROMPT, editor).await?;
    clean_subject(&text)
}

/// Editor command: explicit config, then `$EDITOR`, then `vim`.
pub fn editor_command(configured: Option<&str>) -> String {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
        .unwrap_or_else(|| "vim".into())
}

/// Open `prompt` in the editor and return what the user saved.
pub async fn editor_input(prompt: &str, editor: Option<&str>) -> ArcResult<String> {
    let mut file = tempfile::Builder::new()
        .prefix("arc-subject-")
        .suffix(".md")
        .tempfile()
        .map_err(|e| ArcError::io(std::env::temp_dir(), e))?;
    file.write_all(prompt.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| ArcError::io(file.path(), e))?;

    let command = editor_command(editor);
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| ArcError::Config("editor command is empty".into()))?;

    let status = tokio::process::Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .await
        .map_err(|e| ArcError::io(program, e))?;
    if !status.success() {
        return Err(ArcError::Validation(format!(
            "editor '{command}' exited with {status}"
        )));
    }

    tokio::fs::read_to_string(file.path())
        .await
        .map_err(|e| ArcError::io(file.path(), e))
}

/// Drop comment and blank lines; join the rest into one header-safe line.
pub fn clean_subject(text: &str) -> ArcResult<String> {
    let subject = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ");

    if subject.is_empty() {
        return Err(ArcError::Validation("subject cannot be empty".into()));
    }
    Ok(subject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_subject_strips_comments() {
        let text = format!("Happy Birthday{SUBJECT_PROMPT}");
        assert_eq!(clean_subject(&text).unwrap(), "Happy Birthday");
    }

    #[test]
    fn test_clean_subject_joins_lines() {
        assert_eq!(
            clean_subject("  Happy\n\n# note\nBirthday  \n").unwrap(),
            "Happy Birthday"
        );
    }

    #[test]
    fn test_clean_subject_empty() {
        assert!(clean_subject(SUBJECT_PROMPT).unwrap_err().is_validation());
        assert!(clean_subject("").unwrap_err().is_validation());
    }

    #[test]
    fn test_editor_command_prefers_config() {
        assert_eq!(editor_command(Some("nano -w")), "nano -w");
    }

    #[tokio::test]
    async fn test_provided_subject_skips_editor() {
        let subject = resolve_subject(Some("  Hello  "), Some("/nonexistent/editor"))
            .await
            .unwrap();
        assert_eq!(subject, "Hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_editor_roundtrip() {
        // `true` leaves the prompt untouched, so only comments remain
        let err = resolve_subject(None, Some("true")).await.unwrap_err();
        assert!(err.is_validation());

        let text = editor_input("Subject from file\n", Some("true")).await.unwrap();
        assert_eq!(text, "Subject from file\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_editor() {
        let err = editor_input("x", Some("false")).await.unwrap_err();
        assert!(err.is_validation());
    }
}
