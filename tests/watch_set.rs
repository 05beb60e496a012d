// tests/watch_set.rs

use std::error::Error;
use std::fs;
use std::path::Path;

use hotrun::fs::mock::MockFileSystem;
use hotrun::fs::RealFileSystem;
use hotrun::resolve_root;
use hotrun::watch::{PathFilter, WatchSet};
use hotrun_test_utils::builders::ConfigBuilder;
use hotrun_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn sample_tree() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("./Cargo.toml");
    fs.add_file("./src/main.rs");
    fs.add_file("./src/api/routes.rs");
    fs.add_file("./src/vendor/dep.rs");
    fs.add_file("./vendor/other.rs");
    fs.add_file("./.git/HEAD");
    fs.add_file("./node_modules/pkg/index.js");
    fs.add_file("./tmp/main");
    fs.add_file("./docs/guide.md");
    fs.add_file("./pkg/testdata/input.rs");
    fs
}

#[test]
fn walk_includes_src_and_never_vendor() -> TestResult {
    init_tracing();

    let cfg = ConfigBuilder::new("cargo build", "target/debug/app").build();
    let filter = PathFilter::from_config(&cfg)?;
    let set = WatchSet::build(&sample_tree(), &filter)?;

    assert!(set.contains(Path::new(".")));
    assert!(set.contains(Path::new("./src")));
    assert!(set.contains(Path::new("./src/api")));
    assert!(set.contains(Path::new("./docs")));
    assert!(set.contains(Path::new("./pkg")));

    assert!(!set.contains(Path::new("./src/vendor")));
    assert!(!set.contains(Path::new("./vendor")));
    assert!(!set.contains(Path::new("./.git")));
    assert!(!set.contains(Path::new("./node_modules")));
    assert!(!set.contains(Path::new("./node_modules/pkg")));
    assert!(!set.contains(Path::new("./tmp")));
    assert!(!set.contains(Path::new("./pkg/testdata")));

    assert_eq!(set.len(), 5);
    Ok(())
}

#[test]
fn include_dir_registers_only_included_subtrees() -> TestResult {
    let fs = sample_tree();
    fs.add_dir("./lib/core/io");
    fs.add_dir("./lib/other");

    let cfg = ConfigBuilder::new("make", "./app")
        .include_dir("src")
        .include_dir("lib/core")
        .build();
    let filter = PathFilter::from_config(&cfg)?;
    let set = WatchSet::build(&fs, &filter)?;

    let dirs: Vec<&Path> = set.iter().collect();
    assert_eq!(
        dirs,
        vec![
            Path::new("./lib/core"),
            Path::new("./lib/core/io"),
            Path::new("./src"),
            Path::new("./src/api"),
        ]
    );
    Ok(())
}

#[test]
fn missing_root_is_a_setup_error() -> TestResult {
    let cfg = ConfigBuilder::new("make", "./app")
        .root("./does-not-exist")
        .build();
    let filter = PathFilter::from_config(&cfg)?;

    let err = WatchSet::build(&MockFileSystem::new(), &filter).unwrap_err();
    assert!(err.to_string().starts_with("Setup failed"), "{err}");
    assert!(err.to_string().contains("does not exist"), "{err}");
    Ok(())
}

#[test]
fn file_as_root_is_a_setup_error() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("./Cargo.toml");
    let cfg = ConfigBuilder::new("make", "./app").root("./Cargo.toml").build();
    let filter = PathFilter::from_config(&cfg)?;

    let err = WatchSet::build(&fs, &filter).unwrap_err();
    assert!(err.to_string().contains("is not a directory"), "{err}");
    Ok(())
}

#[test]
fn root_is_resolved_through_the_filesystem() -> TestResult {
    let fs = sample_tree();
    assert_eq!(resolve_root(&fs, Path::new("./src"))?, Path::new("./src"));

    let err = resolve_root(&fs, Path::new("./gone")).unwrap_err();
    assert!(format!("{err:#}").contains("resolving project root"), "{err:#}");
    Ok(())
}

#[cfg(unix)]
#[test]
fn real_root_is_canonicalized() -> TestResult {
    let dir = tempfile::tempdir()?;
    let real = dir.path().canonicalize()?.join("project");
    fs::create_dir(&real)?;
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&real, &link)?;

    assert_eq!(resolve_root(&RealFileSystem, &link)?, real);
    assert!(resolve_root(&RealFileSystem, &dir.path().join("missing")).is_err());
    Ok(())
}

#[test]
fn walk_real_tree_with_tempdir() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;

    fs::create_dir_all(root.join("src/vendor"))?;
    fs::create_dir_all(root.join("src/bin"))?;
    fs::create_dir_all(root.join("tmp"))?;
    fs::create_dir_all(root.join("assets/img"))?;
    fs::write(root.join("src/main.rs"), "fn main() {}")?;

    let cfg = ConfigBuilder::new("cargo build", "target/debug/app")
        .root(&root)
        .exclude_dir("assets")
        .build();
    let filter = PathFilter::from_config(&cfg)?;
    let set = WatchSet::build(&RealFileSystem, &filter)?;

    assert!(set.contains_relative(""));
    assert!(set.contains_relative("src"));
    assert!(set.contains_relative("src/bin"));
    assert!(!set.contains_relative("src/vendor"));
    assert!(!set.contains_relative("tmp"));
    assert!(!set.contains_relative("assets"));
    assert!(!set.contains_relative("assets/img"));
    assert_eq!(set.len(), 3);
    Ok(())
}

#[cfg(unix)]
#[test]
fn symlinked_directories_are_not_followed() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let outside = tempfile::tempdir()?;

    fs::create_dir_all(root.join("src"))?;
    fs::create_dir_all(outside.path().join("elsewhere"))?;
    std::os::unix::fs::symlink(outside.path(), root.join("src/link"))?;

    let cfg = ConfigBuilder::new("make", "./app").root(&root).build();
    let filter = PathFilter::from_config(&cfg)?;
    let set = WatchSet::build(&RealFileSystem, &filter)?;

    assert!(set.contains_relative("src"));
    assert!(!set.contains_relative("src/link"));
    assert!(!set.contains_relative("src/link/elsewhere"));
    Ok(())
}
