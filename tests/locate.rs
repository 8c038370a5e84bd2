//! Locating files referenced from configuration values.

extern crate objconf;
extern crate tempfile;

use std::fs;
use std::path::PathBuf;

use objconf::locate::{Locate, LocalPath};
use objconf::{Error, Factory};

#[test]
fn locates_files_in_search_paths() {
    let directory = tempfile::tempdir().unwrap();
    let file = directory.path().join("tempFile.txt");
    fs::write(&file, "tempFile\n").unwrap();

    let locator = LocalPath::new("tempFile.txt");
    let located = locator.locate(&[directory.path().to_path_buf()]);

    assert!(located.exists());
    assert_eq!(located, fs::canonicalize(&file).unwrap());
}

#[test]
fn locates_relative_files_and_returns_canonical_paths() {
    let base = tempfile::tempdir().unwrap();
    let directory = base.path().join("tmpDir");
    let other_directory = base.path().join("otherDir");
    fs::create_dir_all(&directory).unwrap();
    fs::create_dir_all(&other_directory).unwrap();

    let file = other_directory.join("tempFile.txt");
    fs::write(&file, "tempFile\n").unwrap();

    let locator = LocalPath::new("../otherDir/tempFile.txt");
    let located = locator.locate(&[directory.clone()]);

    assert!(located.exists());
    assert_eq!(located, fs::canonicalize(&file).unwrap());
}

#[test]
fn returns_existing_paths_unchanged() {
    let directory = tempfile::tempdir().unwrap();
    let file = directory.path().join("tempFile.txt");
    fs::write(&file, "tempFile\n").unwrap();

    let locator = LocalPath::new(file.to_str().unwrap());
    let located = locator.locate(&[]);

    assert_eq!(located, file);
}

#[test]
fn returns_unknown_paths_unchanged() {
    let locator = LocalPath::new("does/not/exist.txt");
    let located = locator.locate(&[PathBuf::from("/also/missing")]);

    assert_eq!(located, PathBuf::from("does/not/exist.txt"));
}

#[test]
fn factories_resolve_paths_through_the_locator() {
    let directory = tempfile::tempdir().unwrap();
    let file = directory.path().join("tempFile.txt");
    fs::write(&file, "tempFile\n").unwrap();

    let config = directory.path().join("config.yaml");
    fs::write(&config, "fileName: tempFile.txt\n").unwrap();

    // the file's directory becomes a search path
    let root = Factory::from_file(&config).unwrap();
    let located = root.path("fileName").unwrap();

    assert!(located.exists());
    assert_eq!(located, fs::canonicalize(&file).unwrap());
}

#[test]
fn factories_resolve_absolute_paths() {
    let directory = tempfile::tempdir().unwrap();
    let file = directory.path().join("tempFile.txt");
    fs::write(&file, "tempFile\n").unwrap();

    let document = format!("fileName: {}\n", file.display());
    let root = Factory::from_str(&document).unwrap();
    let located = root.path("fileName").unwrap();

    assert!(located.exists());
    assert_eq!(located, file);
}

#[test]
fn optional_paths_default_to_none() {
    let root = Factory::from_str("item1: 22\nitem2:\n").unwrap();

    assert_eq!(root.path_opt("fileName").unwrap(), None);
    assert!(matches!(root.path("fileName"), Err(Error::MissingKey { .. })));
}
