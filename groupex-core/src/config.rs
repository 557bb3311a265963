//! Export configuration, loadable from a JSON file.

use groupex_scanner::{
    ExportError, ExtractionPipeline, NameResolution, NameResolver, Page, Result, ScrollConfig,
    ScrollLoader, ScrollProgressCallback,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILENAME: &str = "facebook_groups.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Target directory; a leading `~` is expanded.
    pub directory: String,
    pub filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub scroll: ScrollConfig,
    /// Only export groups the user belongs to.
    pub membership_filter: bool,
    pub name_resolution: NameResolution,
    pub output: OutputConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scroll: ScrollConfig::default(),
            membership_filter: true,
            name_resolution: NameResolution::default(),
            output: OutputConfig::default(),
        }
    }
}

impl ExportConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: ExportConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let filename = self.output.filename.trim();
        if filename.is_empty() {
            return Err(ExportError::InvalidConfig(
                "output filename must not be empty".to_string(),
            ));
        }
        if filename.contains(['/', '\\']) {
            return Err(ExportError::InvalidConfig(format!(
                "output filename {} must not contain a path separator",
                filename
            )));
        }
        self.scroll.validate()
    }

    pub fn output_directory(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output.directory).as_ref())
    }

    pub fn scroll_loader(&self, progress: Option<ScrollProgressCallback>) -> ScrollLoader {
        let loader = ScrollLoader::new(self.scroll.clone());
        match progress {
            Some(callback) => loader.with_progress_callback(callback),
            None => loader,
        }
    }

    /// Pipeline over `page` with this configuration's cadence, classifier and name strategies.
    pub fn build_pipeline<P: Page>(
        &self,
        page: P,
        progress: Option<ScrollProgressCallback>,
    ) -> ExtractionPipeline<P> {
        ExtractionPipeline::new(page, self.scroll.clone())
            .with_scroll_loader(self.scroll_loader(progress))
            .with_membership_filter(self.membership_filter)
            .with_name_resolver(NameResolver::new(self.name_resolution))
    }
}
