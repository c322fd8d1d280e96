//! Remote path helpers.
//!
//! Remote paths are plain `/`-separated strings, independent of the host
//! OS path flavor. Everything here is pure and allocation-happy; none of
//! it is on a hot path.

use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};

// everything outside the RFC 3986 unreserved set is escaped, except '/'
// which separates remote path segments
const REMOTE_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Normalize a remote collection root: always starts with `/`, never ends
/// with one (unless it is exactly `/`), backslashes folded to `/`.
/// Idempotent.
pub fn normalize_remote_root(remote: &str) -> String {
    if remote.is_empty() {
        return "/".to_string();
    }
    let mut value = remote.replace('\\', "/");
    if !value.starts_with('/') {
        value.insert(0, '/');
    }
    while value.len() > 1 && value.ends_with('/') {
        value.pop();
    }
    value
}

/// Join a relative filesystem path onto a remote root with exactly one
/// `/` at the seam. An empty or `.` relative path yields the root itself.
pub fn join_remote_path(remote_root: &str, relative: &std::path::Path) -> String {
    let mut joined = normalize_remote_root(remote_root);
    let rel = path_to_generic_utf8(relative);
    if rel.is_empty() || rel == "." {
        return joined;
    }
    let rel = rel.strip_prefix('/').unwrap_or(&rel);
    if !joined.ends_with('/') {
        joined.push('/');
    }
    joined.push_str(rel);
    joined
}

/// Percent-encode a remote path for the request line. `/` passes through,
/// unreserved bytes pass through, everything else becomes uppercase `%HH`.
pub fn url_encode_path(path: &str) -> String {
    percent_encode(path.as_bytes(), REMOTE_PATH_SET).to_string()
}

/// Lowercase ASCII `A-Z` only; all other bytes are preserved verbatim.
pub fn to_lower_ascii(value: &str) -> String {
    value.chars().map(|c| c.to_ascii_lowercase()).collect()
}

/// Render a path as forward-slash UTF-8 regardless of the host OS.
pub fn path_to_generic_utf8(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
