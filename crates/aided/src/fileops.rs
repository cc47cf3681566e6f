//! Guarded filesystem operations.
//!
//! Every operation resolves its paths through [`PathResolver`] first and
//! refuses restricted paths before touching the filesystem. Anticipated
//! failures map to specific error kinds; any other I/O error is reported as
//! `IoError` with the OS message. Nothing here panics or returns `Err` to
//! the caller: the result is always an envelope.

use crate::paths::PathResolver;
use aide_common::{ErrorKind, ResultEnvelope};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const RESTRICTED_MSG: &str = "Access to this path is restricted";
const SAME_FILE_MSG: &str = "Source and destination are the same file";

/// Failure carried through the `?` chain until it becomes an envelope
#[derive(Debug)]
struct OpError {
    kind: ErrorKind,
    detail: String,
}

impl OpError {
    fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl From<io::Error> for OpError {
    fn from(e: io::Error) -> Self {
        Self::new(ErrorKind::IoError, e.to_string())
    }
}

impl From<OpError> for ResultEnvelope {
    fn from(e: OpError) -> Self {
        ResultEnvelope::failure(e.kind, e.detail)
    }
}

type OpResult = Result<ResultEnvelope, OpError>;

/// How `write` treats an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or truncate
    Overwrite,
    Append,
}

impl WriteMode {
    /// "append"/"a" select append, anything else overwrites
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "append" | "a" => Self::Append,
            _ => Self::Overwrite,
        }
    }
}

/// One row of a directory listing
#[derive(Debug, Clone, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub size: Option<u64>,
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct FileOps {
    resolver: PathResolver,
}

impl FileOps {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn read(&self, raw: &str) -> ResultEnvelope {
        self.read_inner(raw).unwrap_or_else(Into::into)
    }

    pub fn write(&self, raw: &str, content: &str, mode: WriteMode) -> ResultEnvelope {
        self.write_inner(raw, content, mode).unwrap_or_else(Into::into)
    }

    pub fn delete(&self, raw: &str) -> ResultEnvelope {
        self.delete_inner(raw).unwrap_or_else(Into::into)
    }

    pub fn rename(&self, raw: &str, new_path: &str) -> ResultEnvelope {
        self.rename_inner(raw, new_path).unwrap_or_else(Into::into)
    }

    pub fn move_to(&self, raw: &str, destination: &str) -> ResultEnvelope {
        self.move_inner(raw, destination).unwrap_or_else(Into::into)
    }

    pub fn copy(&self, raw: &str, destination: &str) -> ResultEnvelope {
        self.copy_inner(raw, destination).unwrap_or_else(Into::into)
    }

    pub fn list_directory(&self, raw: &str) -> ResultEnvelope {
        self.list_inner(raw).unwrap_or_else(Into::into)
    }

    pub fn create_directory(&self, raw: &str) -> ResultEnvelope {
        self.mkdir_inner(raw).unwrap_or_else(Into::into)
    }

    pub fn delete_directory(&self, raw: &str) -> ResultEnvelope {
        self.rmdir_inner(raw).unwrap_or_else(Into::into)
    }

    pub fn info(&self, raw: &str) -> ResultEnvelope {
        self.info_inner(raw).unwrap_or_else(Into::into)
    }

    /// Resolve and check a raw path
    fn guard(&self, raw: &str) -> Result<PathBuf, OpError> {
        if raw.trim().is_empty() {
            return Err(OpError::new(ErrorKind::InvalidInput, "No path provided"));
        }
        let resolved = self.resolver.resolve(raw);
        if !resolved.allowed {
            info!("Refused restricted path {}", resolved.path.display());
            return Err(OpError::new(ErrorKind::AccessDenied, RESTRICTED_MSG));
        }
        debug!("Resolved {} -> {}", raw, resolved.path.display());
        Ok(resolved.path)
    }

    /// Second path of a rename: a bare name stays in the source's directory
    fn guard_rename_target(&self, source: &Path, raw: &str) -> Result<PathBuf, OpError> {
        let bare = !raw.contains(&['/', '\\'][..]) && !raw.starts_with('~');
        match (bare, source.parent()) {
            (true, Some(parent)) if !raw.trim().is_empty() => self.guard_path(&parent.join(raw.trim())),
            _ => self.guard(raw),
        }
    }

    /// Re-check a path built after resolution; the canonical form is the one used
    fn guard_path(&self, path: &Path) -> Result<PathBuf, OpError> {
        let resolved = self.resolver.resolve_path(path);
        if !resolved.allowed {
            info!("Refused restricted path {}", resolved.path.display());
            return Err(OpError::new(ErrorKind::AccessDenied, RESTRICTED_MSG));
        }
        Ok(resolved.path)
    }

    /// Final destination of a move or copy, guarded and distinct from the source
    fn guard_destination(&self, source: &Path, target: PathBuf) -> Result<PathBuf, OpError> {
        let target = self.guard_path(&into_directory(source, target))?;
        if same_file(source, &target) {
            return Err(OpError::new(ErrorKind::InvalidInput, SAME_FILE_MSG));
        }
        Ok(target)
    }

    fn read_inner(&self, raw: &str) -> OpResult {
        let path = self.guard(raw)?;
        let meta = metadata_or_not_found(&path, "File not found")?;
        if meta.is_dir() {
            return Err(OpError::new(ErrorKind::NotAFile, "Path is not a file"));
        }

        let bytes = fs::read(&path)?;
        let size = bytes.len() as u64;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(ResultEnvelope::ok_with(
                format!("Read {} bytes from {}", size, path.display()),
                json!({ "content": content, "size": size, "path": shown(&path) }),
            )),
            Err(_) => Err(OpError::new(
                ErrorKind::BinaryUnsupported,
                "File is binary and cannot be displayed as text",
            )),
        }
    }

    fn write_inner(&self, raw: &str, content: &str, mode: WriteMode) -> OpResult {
        let path = self.guard(raw)?;
        if path.is_dir() {
            return Err(OpError::new(ErrorKind::NotAFile, "Path is a directory"));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let existed = path.exists();
        let mut file = match mode {
            WriteMode::Overwrite => OpenOptions::new().create(true).write(true).truncate(true).open(&path)?,
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(&path)?,
        };
        file.write_all(content.as_bytes())?;
        file.flush()?;
        let size = fs::metadata(&path)?.len();

        let verb = if existed { "updated" } else { "created" };
        Ok(ResultEnvelope::ok_with(
            format!("File {} successfully", verb),
            json!({ "path": shown(&path), "size": size }),
        ))
    }

    fn delete_inner(&self, raw: &str) -> OpResult {
        let path = self.guard(raw)?;
        let meta = metadata_or_not_found(&path, "File not found")?;
        if meta.is_dir() {
            return Err(OpError::new(ErrorKind::NotAFile, "Path is not a file"));
        }
        fs::remove_file(&path)?;
        Ok(ResultEnvelope::ok_with(
            format!("File deleted: {}", path.display()),
            json!({ "path": shown(&path) }),
        ))
    }

    fn rename_inner(&self, raw: &str, new_path: &str) -> OpResult {
        let source = self.guard(raw)?;
        let target = self.guard_rename_target(&source, new_path)?;
        metadata_or_not_found(&source, "Source file not found")?;
        if same_file(&source, &target) {
            return Err(OpError::new(ErrorKind::InvalidInput, SAME_FILE_MSG));
        }

        fs::rename(&source, &target)?;
        Ok(ResultEnvelope::ok_with(
            format!("File renamed from {} to {}", source.display(), target.display()),
            json!({ "old_path": shown(&source), "new_path": shown(&target) }),
        ))
    }

    fn move_inner(&self, raw: &str, destination: &str) -> OpResult {
        let source = self.guard(raw)?;
        let target = self.guard(destination)?;
        let meta = metadata_or_not_found(&source, "Source file not found")?;
        let target = self.guard_destination(&source, target)?;

        if let Err(e) = fs::rename(&source, &target) {
            // rename fails across filesystems; files can still be copied over
            if !meta.is_file() {
                return Err(e.into());
            }
            debug!("rename failed ({}), falling back to copy", e);
            fs::copy(&source, &target)?;
            fs::remove_file(&source)?;
        }

        Ok(ResultEnvelope::ok_with(
            format!("File moved from {} to {}", source.display(), target.display()),
            json!({ "source": shown(&source), "destination": shown(&target) }),
        ))
    }

    fn copy_inner(&self, raw: &str, destination: &str) -> OpResult {
        let source = self.guard(raw)?;
        let target = self.guard(destination)?;
        let meta = metadata_or_not_found(&source, "Source file not found")?;
        if meta.is_dir() {
            return Err(OpError::new(ErrorKind::NotAFile, "Only files can be copied"));
        }
        let target = self.guard_destination(&source, target)?;

        let bytes = fs::copy(&source, &target)?;
        Ok(ResultEnvelope::ok_with(
            format!("File copied from {} to {}", source.display(), target.display()),
            json!({ "source": shown(&source), "destination": shown(&target), "size": bytes }),
        ))
    }

    fn list_inner(&self, raw: &str) -> OpResult {
        let path = self.guard(raw)?;
        let meta = metadata_or_not_found(&path, "Directory not found")?;
        if !meta.is_dir() {
            return Err(OpError::new(ErrorKind::NotADirectory, "Path is not a directory"));
        }

        let mut items = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let item_path = entry.path();
            // follow symlinks like a user would, fall back to the link itself when dangling
            let item_meta = fs::metadata(&item_path).or_else(|_| entry.metadata())?;
            let is_dir = item_meta.is_dir();
            items.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if is_dir { "directory" } else { "file" },
                size: if is_dir { None } else { Some(item_meta.len()) },
                path: item_path.to_string_lossy().into_owned(),
            });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        let count = items.len();
        Ok(ResultEnvelope::ok_with(
            format!("Found {} items in {}", count, path.display()),
            json!({ "path": shown(&path), "items": items, "count": count }),
        ))
    }

    fn mkdir_inner(&self, raw: &str) -> OpResult {
        let path = self.guard(raw)?;
        if path.exists() && !path.is_dir() {
            return Err(OpError::new(
                ErrorKind::NotADirectory,
                "Path exists and is not a directory",
            ));
        }
        fs::create_dir_all(&path)?;
        Ok(ResultEnvelope::ok_with(
            format!("Directory created: {}", path.display()),
            json!({ "path": shown(&path) }),
        ))
    }

    fn rmdir_inner(&self, raw: &str) -> OpResult {
        let path = self.guard(raw)?;
        let meta = metadata_or_not_found(&path, "Directory not found")?;
        if !meta.is_dir() {
            return Err(OpError::new(ErrorKind::NotADirectory, "Path is not a directory"));
        }
        if self.is_protected_directory(&path) {
            return Err(OpError::new(
                ErrorKind::AccessDenied,
                format!("Refusing to delete {}", path.display()),
            ));
        }
        fs::remove_dir_all(&path)?;
        Ok(ResultEnvelope::ok_with(
            format!("Directory deleted: {}", path.display()),
            json!({ "path": shown(&path) }),
        ))
    }

    fn info_inner(&self, raw: &str) -> OpResult {
        let path = self.guard(raw)?;
        let meta = metadata_or_not_found(&path, "File not found")?;

        let modified = meta.modified().ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339());
        let created = meta.created().ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339());
        Ok(ResultEnvelope::ok_with(
            format!("Info for {}", path.display()),
            json!({
                "path": shown(&path),
                "size": meta.len(),
                "is_file": meta.is_file(),
                "is_directory": meta.is_dir(),
                "modified": modified,
                "created": created,
            }),
        ))
    }

    /// Filesystem root, home and the base directory are never removed wholesale
    fn is_protected_directory(&self, path: &Path) -> bool {
        let base = self.resolver.resolve(&self.resolver.base_dir().to_string_lossy()).path;
        let home = self.resolver.resolve("~").path;
        path.parent().is_none() || path == base || path == home
    }
}

/// Paths go into payloads as (lossy) strings
fn shown(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn metadata_or_not_found(path: &Path, msg: &str) -> Result<fs::Metadata, OpError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(OpError::new(ErrorKind::NotFound, msg)),
        Err(e) => Err(e.into()),
    }
}

/// Same canonical path, or the same inode through a hard link
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let (Ok(ma), Ok(mb)) = (fs::metadata(a), fs::metadata(b)) {
            return ma.dev() == mb.dev() && ma.ino() == mb.ino();
        }
    }
    false
}

/// Moving or copying into an existing directory keeps the source's name
fn into_directory(source: &Path, target: PathBuf) -> PathBuf {
    match (target.is_dir(), source.file_name()) {
        (true, Some(name)) => target.join(name),
        _ => target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_mode_parse() {
        assert_eq!(WriteMode::parse("append"), WriteMode::Append);
        assert_eq!(WriteMode::parse(" A "), WriteMode::Append);
        assert_eq!(WriteMode::parse("w"), WriteMode::Overwrite);
        assert_eq!(WriteMode::parse(""), WriteMode::Overwrite);
    }

    #[test]
    fn test_into_directory_appends_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("song.mp3");
        assert_eq!(into_directory(&src, dir.path().to_path_buf()), dir.path().join("song.mp3"));
        let other = dir.path().join("renamed.mp3");
        assert_eq!(into_directory(&src, other.clone()), other);
    }
}
