//! Mapping request paths to files in the build directory.
//!
//! Page keys are build-relative file paths with `/` separators, e.g.
//! `index.html` or `guide/intro.html`. The same key is used when serving a
//! page, when a client subscribes to it, and when the watcher sees its file
//! change.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Decode and normalize a request path into a relative path.
///
/// Keeps a trailing `/`. Returns `None` for paths escaping the build
/// directory or that are not valid UTF-8 once decoded.
fn sanitize(path: &str) -> Option<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = percent_decode_str(path).decode_utf8().ok()?;

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s if s.contains('\\') || s.contains(':') => return None,
            s => segments.push(s),
        }
    }

    let mut relative = segments.join("/");
    if path.ends_with('/') && !relative.is_empty() {
        relative.push('/');
    }
    Some(relative)
}

/// Candidate files for a request path, most specific first.
pub(crate) fn candidates(path: &str) -> Option<Vec<String>> {
    let relative = sanitize(path)?;

    if relative.is_empty() || relative.ends_with('/') {
        return Some(vec![format!("{relative}index.html")]);
    }
    if has_extension(&relative) {
        return Some(vec![relative]);
    }
    Some(vec![
        format!("{relative}.html"),
        format!("{relative}/index.html"),
        relative,
    ])
}

/// Conventional page key for a path, without looking at the filesystem.
pub(crate) fn page_key(path: &str) -> Option<String> {
    candidates(path)?.into_iter().next()
}

/// Resolve a request path to an existing file, returning its key and path.
pub(crate) async fn resolve(build_dir: &Path, path: &str) -> Option<(String, PathBuf)> {
    for candidate in candidates(path)? {
        let file = build_dir.join(&candidate);
        if tokio::fs::metadata(&file)
            .await
            .is_ok_and(|metadata| metadata.is_file())
        {
            return Some((candidate, file));
        }
    }
    None
}

/// Page key of a file inside the build directory.
pub(crate) fn key_for_file(file: &Path, build_dir: &Path) -> Option<String> {
    let relative = file.strip_prefix(build_dir).ok()?;
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Whether the file is an HTML page.
pub(crate) fn is_html(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

fn has_extension(relative: &str) -> bool {
    relative
        .rsplit('/')
        .next()
        .is_some_and(|name| name.contains('.'))
}
