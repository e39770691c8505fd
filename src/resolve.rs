//! Root-contained path resolution
//!
//! Maps a request path onto the filesystem one segment at a time, following
//! symlinks as it goes and refusing any link whose target leaves the serving
//! root. Missing segments are not an error here; existence is a separate
//! question answered by [`FileMeta::stat`].

use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR};
use tokio::fs;

/// Upper bound on symlinks followed while resolving one request path
pub const MAX_LINK_HOPS: usize = 40;

/// Result of resolving a request path against the serving root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Real path inside the root; keeps the request's trailing separator
    Within(PathBuf),
    /// A followed link points outside the root, or the link chain is too long
    Escaped,
}

/// Resolve `relative` (a URL-style path, `/`-separated) against `root`
///
/// `root` must already be absolute and symlink-free. Every segment is joined
/// onto the current candidate and, if it is a symlink, its target is checked
/// against the root and then walked again from the root, so links inside link
/// targets are resolved too.
pub async fn resolve_within_root(root: &Path, relative: &str) -> Resolution {
    let has_trailing_sep = relative.ends_with('/');

    let mut pending: VecDeque<OsString> = relative
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(OsString::from)
        .collect();
    let mut curr = root.to_path_buf();
    let mut hops = 0;

    while let Some(segment) = pending.pop_front() {
        if segment == ".." {
            curr.pop();
            if !path_in_root(root, &curr) {
                return Resolution::Escaped;
            }
            continue;
        }

        let candidate = curr.join(&segment);
        let Ok(target) = fs::read_link(&candidate).await else {
            // Regular file, directory, or nothing at all
            curr = candidate;
            continue;
        };

        hops += 1;
        if hops > MAX_LINK_HOPS {
            return Resolution::Escaped;
        }

        let followed = if target.is_absolute() {
            lexical_normalize(&target)
        } else {
            lexical_normalize(&curr.join(&target))
        };
        let Ok(inside) = followed.strip_prefix(root) else {
            return Resolution::Escaped;
        };

        // Walk the link target again from the root
        for component in inside.components().rev() {
            pending.push_front(component.as_os_str().to_os_string());
        }
        curr = root.to_path_buf();
    }

    if has_trailing_sep {
        Resolution::Within(with_trailing_separator(curr))
    } else {
        Resolution::Within(curr)
    }
}

/// Whether `candidate` is `root` itself or lies below it
///
/// Compares whole components, so `/rootfoo` is not inside `/root`.
pub fn path_in_root(root: &Path, candidate: &Path) -> bool {
    candidate.starts_with(root)
}

/// Collapse `.` and `..` components without touching the filesystem
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn with_trailing_separator(path: PathBuf) -> PathBuf {
    let mut raw = path.into_os_string();
    raw.push(MAIN_SEPARATOR_STR);
    PathBuf::from(raw)
}

/// Kind of filesystem object found by a stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// One metadata snapshot, taken once per request and reused throughout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub kind: FileKind,
    pub size: u64,
}

impl FileMeta {
    /// Stat `path`, following links unless `follow_links` is false
    ///
    /// Any error is reported as absence.
    pub async fn stat(path: &Path, follow_links: bool) -> Option<Self> {
        let meta = if follow_links {
            fs::metadata(path).await
        } else {
            fs::symlink_metadata(path).await
        }
        .ok()?;

        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            FileKind::Symlink
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_file() {
            FileKind::File
        } else {
            FileKind::Other
        };
        Some(Self {
            kind,
            size: meta.len(),
        })
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}
