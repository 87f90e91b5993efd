//! Private utility module
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Whether the path names a gzip-compressed file.
pub fn is_gz_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .file_name()
        .map(|name| name.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Make a file name out of an archive entry name: leading and trailing
/// slashes are dropped, inner slashes become `_`, and anything outside
/// `[A-Za-z0-9_.-]` becomes `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.trim_matches('/')
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '.' | '-' => c,
            _ => '_',
        })
        .collect()
}

/// Locate an executable. A path with more than one component must exist as
/// given; a bare name is searched for on `PATH`.
pub fn find_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return if program.is_file() {
            Some(program.to_path_buf())
        } else {
            None
        };
    }
    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .flat_map(|dir| candidates(&dir, program.as_os_str()))
        .find(|candidate| is_executable(candidate))
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &OsStr) -> Vec<PathBuf> {
    let base = dir.join(name);
    let mut out = vec![base.clone()];
    for ext in &["exe", "bat", "cmd"] {
        out.push(base.with_extension(ext));
    }
    out
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &OsStr) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
