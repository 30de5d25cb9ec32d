/*
 * Path algebra over the remote store's ids. Directory ids end with `/`, file
 * ids never do; every function here relies on that convention and performs no
 * normalisation of `.` or `..` segments (the server never hands those out).
 */

pub const SEPARATOR: char = '/';

pub fn is_file(path: &str) -> bool {
    !path.ends_with(SEPARATOR)
}

pub fn is_folder(path: &str) -> bool {
    path.ends_with(SEPARATOR)
}

/*
 * The directory containing `path`. A directory path is returned unchanged,
 * a file path is cut after its last separator.
 */
pub fn dirname(path: &str) -> String {
    if is_folder(path) {
        return path.to_string();
    }
    match path.rfind(SEPARATOR) {
        Some(idx) => path[..=idx].to_string(),
        None => String::new(),
    }
}

/*
 * One level up from a directory path. The root (`/`) is its own parent.
 */
pub fn parent_dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return path.to_string();
    }
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => trimmed[..=idx].to_string(),
        None => String::new(),
    }
}

// The directory that holds `path`, whether `path` names a file or a folder.
pub fn closest_containing_folder(path: &str) -> String {
    if is_file(path) {
        dirname(path)
    } else {
        parent_dirname(path)
    }
}

/*
 * Replaces a literal leading `old_prefix` in `id` with `new_prefix`. When `id`
 * does not start with `old_prefix` it is returned unchanged.
 */
pub fn rebase_prefix(id: &str, old_prefix: &str, new_prefix: &str) -> String {
    match id.strip_prefix(old_prefix) {
        Some(rest) => format!("{new_prefix}{rest}"),
        None => id.to_string(),
    }
}

// Literal prefix test; `starts_with(child, folder)` is the descendant check.
pub fn starts_with(a: &str, b: &str) -> bool {
    a.starts_with(b)
}

// Last segment of a path without its trailing separator.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

pub fn join(folder: &str, name: &str, as_folder: bool) -> String {
    let mut joined = dirname(folder);
    if !joined.is_empty() && !joined.ends_with(SEPARATOR) {
        joined.push(SEPARATOR);
    }
    joined.push_str(name.trim_matches(SEPARATOR));
    if as_folder {
        joined.push(SEPARATOR);
    }
    joined
}

// Lower-cased text after the last dot of a file name, if any.
pub fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/*
 * Every directory prefix of `path`, shortest first. `/a/b/` yields
 * `["/", "/a/", "/a/b/"]`; a file path yields the prefixes of its directory.
 */
pub fn prefixes(path: &str) -> Vec<String> {
    let dir = dirname(path);
    let mut result = Vec::new();
    for (idx, ch) in dir.char_indices() {
        if ch == SEPARATOR {
            result.push(dir[..=idx].to_string());
        }
    }
    result
}
