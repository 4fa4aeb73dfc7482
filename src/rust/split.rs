//! Organizes sample archives into per-year directories using the
//! `_YYYY-` date tag embedded in their filenames.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::dataset::SAMPLE_EXTENSION;

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Symlinks are not supported on this platform")]
    SymlinkUnsupported,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> SplitError + '_ {
    move |source| SplitError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// How a matched file is materialized in its year directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SplitMode {
    /// Absolute symlink back to the source file
    #[default]
    Symlink,
    Copy,
    Move,
}

impl SplitMode {
    fn label(self) -> &'static str {
        match self {
            Self::Symlink => "symlink",
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }
}

/// Where year directories are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutStrategy {
    /// `<dir>/<year>`
    #[default]
    Inplace,
    /// `<dir>-<year>`
    Sibling,
}

/// Result of splitting one directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitSummary {
    pub matched: usize,
    pub total: usize,
    pub years: Vec<String>,
}

/// Returns the year of the first `_20YY-` tag in `filename`.
///
/// ```
/// use grainbench::split::parse_year_from_filename;
///
/// let name = "grain12205_x45y19-var4_11000_us_2x_2020-12-02T111648_corr.npz";
/// assert_eq!(parse_year_from_filename(name).as_deref(), Some("2020"));
/// assert_eq!(parse_year_from_filename("grain1_a.npz"), None);
/// ```
pub fn parse_year_from_filename(filename: &str) -> Option<String> {
    let bytes = filename.as_bytes();
    bytes.windows(6).find_map(|w| {
        let is_tag = w[0] == b'_'
            && w[1] == b'2'
            && w[2] == b'0'
            && w[3].is_ascii_digit()
            && w[4].is_ascii_digit()
            && w[5] == b'-';
        is_tag.then(|| String::from_utf8_lossy(&w[1..5]).into_owned())
    })
}

fn sample_files(dir: &Path) -> Result<Vec<PathBuf>, SplitError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(SAMPLE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn year_of(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(parse_year_from_filename)
}

fn output_dir_for(src_dir: &Path, year: &str, strategy: OutStrategy) -> PathBuf {
    match strategy {
        OutStrategy::Inplace => src_dir.join(year),
        OutStrategy::Sibling => {
            let mut name = src_dir.as_os_str().to_os_string();
            name.push(format!("-{}", year));
            PathBuf::from(name)
        }
    }
}

#[cfg(unix)]
fn make_symlink(src: &Path, dst: &Path) -> Result<(), SplitError> {
    if dst.symlink_metadata().is_ok() {
        fs::remove_file(dst).map_err(io_err(dst))?;
    }
    let target = fs::canonicalize(src).map_err(io_err(src))?;
    std::os::unix::fs::symlink(target, dst).map_err(io_err(dst))
}

#[cfg(not(unix))]
fn make_symlink(_src: &Path, _dst: &Path) -> Result<(), SplitError> {
    Err(SplitError::SymlinkUnsupported)
}

fn apply(src: &Path, dst: &Path, mode: SplitMode, dry_run: bool) -> Result<(), SplitError> {
    if dry_run {
        info!("[dry-run] {:7} {:?} -> {:?}", mode.label(), src, dst);
        return Ok(());
    }
    match mode {
        SplitMode::Move => fs::rename(src, dst).or_else(|_| {
            // Cross-device moves fall back to copy + delete.
            fs::copy(src, dst).and_then(|_| fs::remove_file(src))
        })
        .map_err(io_err(dst)),
        SplitMode::Copy => fs::copy(src, dst).map(|_| ()).map_err(io_err(dst)),
        SplitMode::Symlink => make_symlink(src, dst),
    }
}

/// Splits the `.npz` files of `src_dir` into per-year directories.
///
/// Target years are `years` when given, otherwise every year detected in the
/// filenames. Files without a tag, or with a year outside the targets, are left
/// alone. A missing `src_dir` is skipped with a warning.
pub fn split_one_directory(
    src_dir: &Path,
    strategy: OutStrategy,
    mode: SplitMode,
    years: Option<&[String]>,
    dry_run: bool,
) -> Result<SplitSummary, SplitError> {
    if !src_dir.is_dir() {
        warn!("Skipping non-existent directory: {:?}", src_dir);
        return Ok(SplitSummary::default());
    }

    let files = sample_files(src_dir)?;
    let target_years: BTreeSet<String> = match years {
        Some(years) if !years.is_empty() => years.iter().cloned().collect(),
        _ => files.iter().filter_map(|f| year_of(f)).collect(),
    };
    if target_years.is_empty() {
        info!("No year tags found in {:?}", src_dir);
        return Ok(SplitSummary {
            matched: 0,
            total: files.len(),
            years: Vec::new(),
        });
    }

    for year in &target_years {
        let out = output_dir_for(src_dir, year, strategy);
        if dry_run {
            info!("[dry-run] mkdir -p {:?}", out);
        } else {
            fs::create_dir_all(&out).map_err(io_err(&out))?;
        }
    }

    let mut matched = 0;
    for file in &files {
        let Some(year) = year_of(file).filter(|y| target_years.contains(y)) else {
            continue;
        };
        let Some(name) = file.file_name() else {
            continue;
        };
        let dst = output_dir_for(src_dir, &year, strategy).join(name);
        apply(file, &dst, mode, dry_run)?;
        matched += 1;
    }

    let years: Vec<String> = target_years.into_iter().collect();
    info!(
        "{:?}: matched {}/{} files into {:?} using mode={}",
        src_dir,
        matched,
        files.len(),
        years,
        mode.label()
    );
    Ok(SplitSummary {
        matched,
        total: files.len(),
        years,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(
            parse_year_from_filename("grain26027_var8-x75y12_7000_us_2x_2021-10-20T111433_corr.npz").as_deref(),
            Some("2021")
        );
        assert_eq!(parse_year_from_filename("grain1_2020.npz"), None);
        assert_eq!(parse_year_from_filename("grain1_1999-01-01.npz"), None);
    }

    #[test]
    fn test_output_dirs() {
        let src = Path::new("/data/rgb");
        assert_eq!(output_dir_for(src, "2020", OutStrategy::Inplace), PathBuf::from("/data/rgb/2020"));
        assert_eq!(output_dir_for(src, "2020", OutStrategy::Sibling), PathBuf::from("/data/rgb-2020"));
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let summary = split_one_directory(
            Path::new("/definitely/not/here"),
            OutStrategy::Inplace,
            SplitMode::Copy,
            None,
            false,
        )
        .unwrap();
        assert_eq!(summary, SplitSummary::default());
    }
}
