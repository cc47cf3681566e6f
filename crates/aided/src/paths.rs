//! Path resolution and restricted-root policy.
//!
//! Raw paths coming from the oracle are expanded (`~`, folder tokens such as
//! "Desktop"), made absolute against the base directory, normalized and
//! canonicalized before the policy check runs. The check never sees the
//! pre-expansion string.

use crate::config::PathsConfig;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Folder tokens recognised as the first path segment
const FOLDER_TOKENS: &[&str] = &[
    "desktop",
    "documents",
    "downloads",
    "music",
    "pictures",
    "videos",
    "home",
];

/// Absolute canonical path plus the policy verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub allowed: bool,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
    home: PathBuf,
    folders: Vec<(&'static str, PathBuf)>,
    restricted: Vec<String>,
}

impl PathResolver {
    pub fn new(base_dir: impl Into<PathBuf>, restricted_roots: &[String]) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        let folders = FOLDER_TOKENS
            .iter()
            .map(|token| (*token, platform_folder(token, &home)))
            .collect();

        let mut restricted = Vec::new();
        for root in restricted_roots {
            let trimmed = root.trim();
            if trimmed.is_empty() {
                continue;
            }
            let literal = policy_form(&normalize(Path::new(trimmed)));
            // a root reached through a symlink (/lib -> /usr/lib) is blocked under both names
            if let Ok(canonical) = Path::new(trimmed).canonicalize() {
                let canonical = policy_form(&canonical);
                if canonical != literal {
                    restricted.push(canonical);
                }
            }
            restricted.push(literal);
        }

        Self {
            base_dir: normalize(&base_dir.into()),
            home,
            folders,
            restricted,
        }
    }

    pub fn from_config(config: &PathsConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self::new(base_dir, &config.restricted_roots)
    }

    /// Use `home` for `~` and derive folder tokens from it
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self.folders = FOLDER_TOKENS
            .iter()
            .map(|token| (*token, home_folder(token, &self.home)))
            .collect();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Expand, absolutize, canonicalize, then check against the policy
    pub fn resolve(&self, raw: &str) -> ResolvedPath {
        self.resolve_path(&self.expand(raw.trim()))
    }

    /// Canonicalize and check a path that needs no expansion
    pub fn resolve_path(&self, path: &Path) -> ResolvedPath {
        let path = self.canonical(path);
        let allowed = self.check(&path);
        ResolvedPath { path, allowed }
    }

    /// False iff the canonical form starts with a restricted root (case-insensitive)
    pub fn is_allowed(&self, path: &Path) -> bool {
        self.check(&self.canonical(path))
    }

    fn check(&self, canonical: &Path) -> bool {
        let candidate = policy_form(canonical);
        !self.restricted.iter().any(|root| candidate.starts_with(root.as_str()))
    }

    fn canonical(&self, path: &Path) -> PathBuf {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        canonicalize_lenient(&normalize(&absolute))
    }

    fn expand(&self, raw: &str) -> PathBuf {
        if raw == "~" {
            return self.home.clone();
        }
        if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
            return join_segments(self.home.clone(), rest);
        }

        let (first, rest) = match raw.find(&['/', '\\'][..]) {
            Some(idx) => (&raw[..idx], &raw[idx + 1..]),
            None => (raw, ""),
        };
        let token = first.to_lowercase();
        if let Some((_, folder)) = self.folders.iter().find(|(t, _)| *t == token) {
            return join_segments(folder.clone(), rest);
        }

        PathBuf::from(raw)
    }
}

/// Segments after a folder token may use either separator
fn join_segments(mut base: PathBuf, rest: &str) -> PathBuf {
    for segment in rest.split(&['/', '\\'][..]).filter(|s| !s.is_empty()) {
        base.push(segment);
    }
    base
}

fn platform_folder(token: &str, home: &Path) -> PathBuf {
    let dir = match token {
        "desktop" => dirs::desktop_dir(),
        "documents" => dirs::document_dir(),
        "downloads" => dirs::download_dir(),
        "music" => dirs::audio_dir(),
        "pictures" => dirs::picture_dir(),
        "videos" => dirs::video_dir(),
        _ => None,
    };
    dir.unwrap_or_else(|| home_folder(token, home))
}

fn home_folder(token: &str, home: &Path) -> PathBuf {
    match token {
        "home" => home.to_path_buf(),
        other => {
            let mut name = other.to_string();
            if let Some(first) = name.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            home.join(name)
        }
    }
}

/// Lexically remove `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor and re-attach the missing tail
fn canonicalize_lenient(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<OsString> = Vec::new();
    loop {
        if let Ok(mut canonical) = existing.canonicalize() {
            for part in tail.iter().rev() {
                canonical.push(part);
            }
            return canonical;
        }
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Lower-cased string used for prefix comparison
fn policy_form(path: &Path) -> String {
    let text = path.to_string_lossy().into_owned();
    let text = text.strip_prefix(r"\\?\").unwrap_or(text.as_str());
    let mut lowered = text.to_lowercase();
    while lowered.len() > 1 && (lowered.ends_with('/') || lowered.ends_with('\\')) {
        lowered.pop();
    }
    lowered
}
