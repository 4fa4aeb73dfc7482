use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that relocates the whole directory layout.
pub const ROOT_ENV_VAR: &str = "GRAINBENCH_ROOT";

/// Root used when `GRAINBENCH_ROOT` is unset, matching the competition container.
pub const DEFAULT_ROOT: &str = "/app";

/// Default directory layout for both stages.
///
/// Every path derived here can be overridden individually from the command line;
/// this only supplies the fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessPaths {
    root: PathBuf,
}

impl HarnessPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolves the layout from the environment.
    pub fn from_env() -> Self {
        Self::new(Self::get_default_root())
    }

    /// Returns the default root directory
    pub fn get_default_root() -> PathBuf {
        match env::var(ROOT_ENV_VAR) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(DEFAULT_ROOT),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `input_data.csv` and the `.npz` samples.
    pub fn input_data_dir(&self) -> PathBuf {
        self.root.join("input_data")
    }

    /// Directory both stages write their artifacts into.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// Directory holding `reference_data.csv`.
    pub fn reference_dir(&self) -> PathBuf {
        self.root.join("input").join("ref")
    }

    /// Directory the scoring stage reads ingestion artifacts from.
    pub fn predictions_dir(&self) -> PathBuf {
        self.root.join("input").join("res")
    }
}

impl Default for HarnessPaths {
    fn default() -> Self {
        Self::from_env()
    }
}
