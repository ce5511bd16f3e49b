//! Turning the user's input path into one byte payload.
//!
//! Files are read as-is. Directories are archived in memory into
//! `message-<timestamp>.tar`, rooted at the directory's own name.

use std::path::Path;

use arc_core::{ArcError, ArcResult};

/// The plaintext shared by every recipient of one send.
#[derive(Debug)]
pub struct Payload {
    /// Name the recipient will see, minus the `.enc` suffix
    pub name: String,
    pub data: Vec<u8>,
}

/// Read a file, or archive a directory, into a [`Payload`].
pub fn prepare(input: &Path, timestamp: &str) -> ArcResult<Payload> {
    let payload = if input.is_dir() {
        Payload {
            name: format!("message-{timestamp}.tar"),
            data: archive_directory(input)?,
        }
    } else if input.is_file() {
        let name = input
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ArcError::Validation(format!("no usable file name in {}", input.display()))
            })?
            .to_string();
        Payload {
            name,
            data: std::fs::read(input).map_err(|e| ArcError::io(input, e))?,
        }
    } else {
        return Err(ArcError::Validation(format!(
            "{} is not a file or directory",
            input.display()
        )));
    };

    if payload.data.is_empty() {
        return Err(ArcError::Validation(format!(
            "{} is empty; nothing to send",
            input.display()
        )));
    }
    Ok(payload)
}

/// Archive `dir` recursively into an in-memory tar.
pub fn archive_directory(dir: &Path) -> ArcResult<Vec<u8>> {
    let root = dir
        .canonicalize()
        .map_err(|e| ArcError::io(dir, e))?;
    let root_name = root
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "message".into());

    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    builder
        .append_dir_all(&root_name, &root)
        .map_err(|e| ArcError::io(dir, e))?;
    builder.into_inner().map_err(|e| ArcError::io(dir, e))
}
