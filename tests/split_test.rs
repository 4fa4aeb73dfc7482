use std::fs;
use std::path::Path;

use env_logger::{Builder, Env};
use grainbench::split::{split_one_directory, OutStrategy, SplitMode};

fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

const A_2020: &str = "grain1_x1y1-var4_11000_us_2x_2020-12-02T111648_corr.npz";
const B_2020: &str = "grain2_x1y2-var4_11000_us_2x_2020-12-03T090000_corr.npz";
const C_2021: &str = "grain3_var8-x75y12_7000_us_2x_2021-10-20T111433_corr.npz";
const UNTAGGED: &str = "grain4_nodate.npz";

fn populate(dir: &Path) {
    for name in [A_2020, B_2020, C_2021, UNTAGGED] {
        fs::write(dir.join(name), name.as_bytes()).unwrap();
    }
    fs::write(dir.join("notes.txt"), b"ignored").unwrap();
}

#[test]
fn test_copy_into_detected_years() {
    init();
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());

    let summary = split_one_directory(dir.path(), OutStrategy::Inplace, SplitMode::Copy, None, false).unwrap();
    assert_eq!(summary.matched, 3);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.years, vec!["2020", "2021"]);

    assert!(dir.path().join("2020").join(A_2020).is_file());
    assert!(dir.path().join("2020").join(B_2020).is_file());
    assert!(dir.path().join("2021").join(C_2021).is_file());
    assert!(!dir.path().join("2020").join(UNTAGGED).exists());
    assert!(dir.path().join(A_2020).is_file());
}

#[test]
fn test_move_with_year_filter() {
    init();
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());
    let years = vec!["2021".to_string()];

    let summary =
        split_one_directory(dir.path(), OutStrategy::Inplace, SplitMode::Move, Some(&years), false).unwrap();
    assert_eq!(summary.matched, 1);
    assert_eq!(summary.years, vec!["2021"]);

    assert!(dir.path().join("2021").join(C_2021).is_file());
    assert!(!dir.path().join(C_2021).exists());
    assert!(dir.path().join(A_2020).is_file());
    assert!(!dir.path().join("2020").exists());
}

#[test]
fn test_sibling_directories() {
    init();
    let parent = tempfile::tempdir().unwrap();
    let src = parent.path().join("rgb");
    fs::create_dir(&src).unwrap();
    populate(&src);

    split_one_directory(&src, OutStrategy::Sibling, SplitMode::Copy, None, false).unwrap();
    assert!(parent.path().join("rgb-2020").join(A_2020).is_file());
    assert!(parent.path().join("rgb-2021").join(C_2021).is_file());
    assert!(!src.join("2020").exists());
}

#[test]
fn test_dry_run_changes_nothing() {
    init();
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());

    let summary = split_one_directory(dir.path(), OutStrategy::Inplace, SplitMode::Move, None, true).unwrap();
    assert_eq!(summary.matched, 3);
    assert!(!dir.path().join("2020").exists());
    assert!(!dir.path().join("2021").exists());
    assert!(dir.path().join(C_2021).is_file());
}

#[cfg(unix)]
#[test]
fn test_symlinks_point_at_sources_and_are_replaced() {
    init();
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());

    split_one_directory(dir.path(), OutStrategy::Inplace, SplitMode::Symlink, None, false).unwrap();
    let link = dir.path().join("2020").join(A_2020);
    assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
    let target = fs::read_link(&link).unwrap();
    assert!(target.is_absolute());
    assert_eq!(fs::read(&link).unwrap(), A_2020.as_bytes());

    // A second run replaces the existing links instead of failing.
    let summary = split_one_directory(dir.path(), OutStrategy::Inplace, SplitMode::Symlink, None, false).unwrap();
    assert_eq!(summary.matched, 3);
}

#[test]
fn test_directory_without_tags() {
    init();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(UNTAGGED), b"x").unwrap();

    let summary = split_one_directory(dir.path(), OutStrategy::Inplace, SplitMode::Copy, None, false).unwrap();
    assert_eq!(summary.matched, 0);
    assert_eq!(summary.total, 1);
    assert!(summary.years.is_empty());
}
