use std::path::{Path, PathBuf};

/// Lists regular files directly inside `dir` whose extension matches one of
/// `extensions`, ignoring case. Subdirectories are not searched. The result is
/// sorted by path.
pub fn find_video_files(dir: &Path, extensions: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("read source directory {}: {}", dir.display(), e))?;

    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if !path.is_file() {
                return None;
            }
            let ext = path.extension()?.to_str()?;
            extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
                .then_some(path)
        })
        .collect();

    files.sort();
    Ok(files)
}
