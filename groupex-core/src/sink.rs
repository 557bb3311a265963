use groupex_scanner::Result;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Hands a finished export to the host as a file.
pub trait ArtifactSink: Send + Sync {
    /// Stores `contents` under `filename` and returns where it ended up.
    fn save(&self, filename: &str, contents: &str) -> Result<PathBuf>;
}

/// Writes artifacts into a directory, creating it when missing.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    directory: PathBuf,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&self, filename: &str, contents: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(filename);
        fs::write(&path, contents)?;
        debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_creates_missing_directory() {
        let root = TempDir::new().unwrap();
        let sink = DirectorySink::new(root.path().join("exports").join("today"));

        let path = sink.save("groups.json", "[]").unwrap();

        assert_eq!(path, root.path().join("exports/today/groups.json"));
        assert_eq!(fs::read_to_string(path).unwrap(), "[]");
    }

    #[test]
    fn test_save_overwrites_previous_export() {
        let root = TempDir::new().unwrap();
        let sink = DirectorySink::new(root.path());

        sink.save("groups.json", "first").unwrap();
        let path = sink.save("groups.json", "second").unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }
}
