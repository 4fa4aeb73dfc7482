use std::fs;
use std::path::Path;

use log::{error, warn};
use serde::Deserialize;

use super::{parse_grain_id, read_image, Sample};
use crate::artifacts::coerce_variety;
use crate::error::{HarnessError, Result};

/// Manifest naming the labeled training files.
pub const MANIFEST_FILE: &str = "input_data.csv";

/// Extension of per-sample archives.
pub const SAMPLE_EXTENSION: &str = "npz";

/// One row of `input_data.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub filename: String,
    pub variety: i64,
}

#[derive(Debug, Deserialize)]
struct ManifestRow {
    filename: String,
    #[serde(rename = "varietyNumber")]
    variety_number: String,
}

/// Reads `input_data.csv` from `input_dir`, preserving row order.
pub fn read_manifest(input_dir: &Path) -> Result<Vec<ManifestEntry>> {
    let path = input_dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Err(HarnessError::MissingManifest(input_dir.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(&path)?;
    let mut entries = Vec::new();
    for (line, row) in reader.deserialize::<ManifestRow>().enumerate() {
        let row = row?;
        let variety = coerce_variety(&row.variety_number).ok_or_else(|| HarnessError::Malformed {
            file: MANIFEST_FILE.to_string(),
            reason: format!(
                "line {}: varietyNumber '{}' is not an integer",
                line + 2,
                row.variety_number
            ),
        })?;
        entries.push(ManifestEntry {
            filename: row.filename,
            variety,
        });
    }
    Ok(entries)
}

/// Lists sample archives in `dir`, sorted by name.
pub fn list_sample_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(SAMPLE_EXTENSION) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Loads each `(filename, label)` pair from `dir`.
///
/// Files that are missing or fail to load are logged and skipped, so the result
/// may be shorter than the input. Labels stay paired with their own file.
pub fn load_samples<'a, I>(dir: &Path, files: I) -> Vec<Sample>
where
    I: IntoIterator<Item = (&'a str, Option<i64>)>,
{
    let mut samples = Vec::new();
    for (filename, variety) in files {
        let path = dir.join(filename);
        if !path.exists() {
            warn!("Skipping {}: file not found", filename);
            continue;
        }
        match read_image(&path) {
            Ok(image) => samples.push(Sample {
                grain_id: parse_grain_id(filename),
                image,
                variety,
            }),
            Err(e) => error!("Error loading {}: {}", filename, e),
        }
    }
    samples
}
