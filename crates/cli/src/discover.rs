//! Locating projects and their newest load-test results on disk.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// Result directories are named by a `YYYYMMDDHHMMSS` timestamp.
fn is_timestamp_dir(name: &str) -> bool {
    name.len() == 14 && name.bytes().all(|b| b.is_ascii_digit())
}

fn sorted_dirs(dir: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            dirs.push((name.to_string(), entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Every directory under `root` that has a `profiling_folder` child.
///
/// The profiling folder itself and hidden directories are not searched.
/// Unreadable directories are logged and skipped.
pub fn find_project_folders(root: &Path, profiling_folder: &str) -> Vec<PathBuf> {
    let mut projects = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match sorted_dirs(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot search directory");
                continue;
            }
        };
        // Reverse so the stack pops children in name order.
        for (name, path) in entries.into_iter().rev() {
            if name == profiling_folder {
                debug!(project = %dir.display(), "found project folder");
                projects.push(dir.clone());
            } else if !name.starts_with('.') {
                pending.push(path);
            }
        }
    }
    projects.sort();
    projects
}

/// The innermost project that contains `file`.
pub fn project_for_file<'p>(projects: &'p [PathBuf], file: &Path) -> Option<&'p Path> {
    projects
        .iter()
        .filter(|p| file.starts_with(p))
        .max_by_key(|p| p.components().count())
        .map(PathBuf::as_path)
}

/// Newest timestamped results directory in `<project>/<profiling_folder>`.
pub fn latest_results(project: &Path, profiling_folder: &str) -> Option<PathBuf> {
    let folder = project.join(profiling_folder);
    let dirs = match sorted_dirs(&folder) {
        Ok(dirs) => dirs,
        Err(e) => {
            info!(dir = %folder.display(), error = %e, "problem reading load-test results");
            return None;
        }
    };
    // Fixed width, so the lexical maximum is the newest.
    dirs.into_iter()
        .filter(|(name, _)| is_timestamp_dir(name))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, path)| path)
}

/// Path of `file` as the profiled application saw it: the project prefix
/// swapped for `app_root`.
pub fn app_path(file: &Path, project: &Path, app_root: &str) -> Option<String> {
    let relative = file.strip_prefix(project).ok()?;
    let relative = relative.to_str()?.replace('\\', "/");
    Some(format!("{}/{relative}", app_root.trim_end_matches('/')))
}

/// `project` rendered with a trailing separator, for prefix rewriting.
pub fn project_prefix(project: &Path) -> String {
    let mut prefix = project.display().to_string();
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}
