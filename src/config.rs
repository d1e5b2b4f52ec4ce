use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Container extensions picked up from the source directory, compared
/// case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "wmv", "flv"];

/// Output directory name, relative to the source directory.
pub const OUTPUT_DIR_NAME: &str = "processed_videos";

pub const DEFAULT_WORKERS: usize = 12;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    source_dir: PathBuf,
    output_dir: PathBuf,
    extensions: Vec<String>,
    workers: usize,
}

impl BatchConfig {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            extensions: VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            workers: DEFAULT_WORKERS,
        }
    }

    /// Source is the directory holding the running executable, output is
    /// [`OUTPUT_DIR_NAME`] beneath it.
    pub fn from_defaults() -> Self {
        let source_dir = executable_dir().unwrap_or_else(|| PathBuf::from("."));
        let output_dir = source_dir.join(OUTPUT_DIR_NAME);
        Self::new(source_dir, output_dir)
    }

    #[cfg(test)]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

fn executable_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    exe.parent().map(Path::to_path_buf)
}

pub fn config() -> &'static BatchConfig {
    static CONFIG: LazyLock<BatchConfig> = LazyLock::new(BatchConfig::from_defaults);
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_known_containers() {
        let config = BatchConfig::new("/videos", "/videos/processed_videos");
        assert_eq!(config.workers(), DEFAULT_WORKERS);
        assert_eq!(config.extensions().len(), 6);
        assert!(config.extensions().iter().any(|e| e == "wmv"));
    }

    #[test]
    fn output_dir_sits_under_source() {
        let config = BatchConfig::from_defaults();
        assert_eq!(config.output_dir(), config.source_dir().join(OUTPUT_DIR_NAME));
    }

    #[test]
    fn workers_never_zero() {
        let config = BatchConfig::new("a", "b").with_workers(0);
        assert_eq!(config.workers(), 1);
    }
}
