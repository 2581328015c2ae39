//! Runtime configuration for evaluation runs, loaded from JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::detector::DetectorParams;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Where to write the aggregated summary, if anywhere.
    pub json_out: Option<PathBuf>,
    /// Directory for annotated copies of the test images.
    pub annotated_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    /// Directory holding the dataset's test images.
    pub images_dir: PathBuf,
    /// Path to the ground-truth annotation table.
    pub annotations_path: PathBuf,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub detector_params: DetectorParams,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}
