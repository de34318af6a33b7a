//! Command-line grammar and command execution on temporary projects.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use portkit::cli::{Cli, Commands, ExtractField, execute, extract};
use portkit_core::{
    Catalog, Dependency, LgplVersion, LinkMode, Module, ModuleStatus, PortkitError,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn canonical_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for manifest in ["m4/00portkit.m4", "m4/portkit-common.m4", "m4/zzportkit.m4"] {
        write(root, manifest, "dnl manifest\n");
    }
    write(
        root,
        "modules/strdup",
        "Files:\nlib/strdup.c\n\nDepends-on:\nstring-h\n\nLicense:\nLGPLv2+\n",
    );
    write(root, "modules/string-h", "Files:\nlib/string.in.h\n\nLicense:\nLGPLv2+\n");
    write(root, "lib/strdup.c", "strdup\n");
    write(root, "lib/string.in.h", "string\n");
    dir
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("portkit").chain(args.iter().copied())).unwrap()
}

fn options(cli: Cli) -> portkit::cli::ImportOptions {
    match cli.command {
        Commands::Import { options, .. } | Commands::Update { options } => options,
        other => panic!("unexpected command {other:?}"),
    }
}

// =============================================================================
// GRAMMAR TESTS
// =============================================================================

#[test]
fn test_bare_lgpl_means_version_3() {
    let opts = options(parse(&["import", "--lgpl", "strdup"]));
    assert_eq!(opts.lgpl, Some(LgplVersion::V3));
}

#[test]
fn test_lgpl_with_value() {
    let opts = options(parse(&["import", "--lgpl=3orGPLv2", "strdup"]));
    assert_eq!(opts.lgpl, Some(LgplVersion::V3OrGplV2));
}

#[test]
fn test_invalid_lgpl_is_rejected() {
    let result = Cli::try_parse_from(["portkit", "import", "--lgpl=4", "strdup"]);
    assert!(result.is_err());
}

#[test]
fn test_inclusion_flags() {
    let opts = options(parse(&[
        "update",
        "--with-tests",
        "--with-c++-tests",
        "--avoid",
        "a",
        "--avoid",
        "b",
    ]));
    assert!(opts.with_tests);
    assert!(opts.with_cxx_tests);
    assert!(!opts.with_obsolete);
    assert_eq!(opts.avoid, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_link_flags() {
    let opts = options(parse(&["import", "--symlink", "--local-hardlink", "strdup"]));
    let links = opts.links();
    assert_eq!(links.canonical, LinkMode::Symlink);
    assert_eq!(links.local, LinkMode::Hardlink);
}

#[test]
fn test_conflicting_link_flags_are_rejected() {
    let result = Cli::try_parse_from(["portkit", "import", "--symlink", "--hardlink", "strdup"]);
    assert!(result.is_err());
}

#[test]
fn test_import_requires_modules() {
    let err = Cli::try_parse_from(["portkit", "import"]).unwrap_err();
    assert!(err.use_stderr());
}

#[test]
fn test_help_is_not_an_error_stream() {
    let err = Cli::try_parse_from(["portkit", "--help"]).unwrap_err();
    assert!(!err.use_stderr());
}

// =============================================================================
// EXTRACT TESTS
// =============================================================================

#[test]
fn test_extract_fields() {
    let catalog = Catalog::from_modules([
        Module::new("a")
            .with_status(ModuleStatus::Obsolete)
            .with_files(["lib/a.c", "m4/a.m4"])
            .with_dependency(Dependency::conditional("b", "test $X = 1"))
            .with_licenses(["LGPLv3+", "GPLv2"]),
        Module::new("a-tests"),
        Module::new("b"),
    ]);
    let a = catalog.require("a").unwrap();

    assert_eq!(extract(&catalog, a, ExtractField::Status), "obsolete\n");
    assert_eq!(extract(&catalog, a, ExtractField::Filelist), "lib/a.c\nm4/a.m4\n");
    assert_eq!(
        extract(&catalog, a, ExtractField::Dependencies),
        format!("{:<30} [test $X = 1]\n", "b")
    );
    assert_eq!(extract(&catalog, a, ExtractField::License), "GPLv2 or LGPLv3+\n");
    assert_eq!(extract(&catalog, a, ExtractField::TestsModule), "a-tests\n");
    assert_eq!(
        extract(&catalog, catalog.require("b").unwrap(), ExtractField::TestsModule),
        ""
    );
}

// =============================================================================
// EXECUTION TESTS
// =============================================================================

#[test]
fn test_import_then_update() {
    let canonical = canonical_tree();
    let project = TempDir::new().unwrap();
    let dir = project.path().to_str().unwrap();
    let src = canonical.path().to_str().unwrap();

    execute(parse(&["-C", dir, "--source-dir", src, "-q", "import", "strdup"])).unwrap();
    assert_eq!(
        fs::read_to_string(project.path().join("lib/strdup.c")).unwrap(),
        "strdup\n"
    );
    assert!(project.path().join("lib/string.in.h").exists());

    let cache = fs::read_to_string(project.path().join("m4/portkit-cache.m4")).unwrap();
    assert!(cache.contains("pk_MODULES(["));
    assert!(cache.contains("  strdup\n"));

    execute(parse(&["-C", dir, "--source-dir", src, "-q", "update"])).unwrap();
    assert!(!project.path().join("lib/strdup.c~").exists());
}

#[test]
fn test_unknown_module_is_data_error() {
    let canonical = canonical_tree();
    let project = TempDir::new().unwrap();
    let err = execute(parse(&[
        "-C",
        project.path().to_str().unwrap(),
        "--source-dir",
        canonical.path().to_str().unwrap(),
        "import",
        "nosuch",
    ]))
    .unwrap_err();
    assert!(matches!(err, PortkitError::UnknownModule(ref name) if name == "nosuch"));
    assert_eq!(err.category(), portkit_core::ErrorCategory::Data);
}

#[test]
fn test_config_file_supplies_source_dir() {
    let canonical = canonical_tree();
    let project = TempDir::new().unwrap();
    write(
        project.path(),
        "portkit.toml",
        &format!("source_dir = {:?}\n", canonical.path().to_str().unwrap()),
    );

    execute(parse(&[
        "-C",
        project.path().to_str().unwrap(),
        "-q",
        "copy-file",
        "lib/strdup.c",
    ]))
    .unwrap();
    assert!(project.path().join("lib/strdup.c").exists());
}

#[test]
fn test_dry_run_import_writes_nothing() {
    let canonical = canonical_tree();
    let project = TempDir::new().unwrap();
    execute(parse(&[
        "-C",
        project.path().to_str().unwrap(),
        "--source-dir",
        canonical.path().to_str().unwrap(),
        "import",
        "--dry-run",
        "strdup",
    ]))
    .unwrap();
    assert_eq!(fs::read_dir(project.path()).unwrap().count(), 0);
}

#[test]
fn test_create_testdir_uses_local_dirs_of_invoking_project() {
    let canonical = canonical_tree();
    let work = TempDir::new().unwrap();
    write(work.path(), "local/lib/strdup.c", "LOCAL\n");
    let testdir = work.path().join("td");

    execute(parse(&[
        "-C",
        work.path().to_str().unwrap(),
        "--source-dir",
        canonical.path().to_str().unwrap(),
        "--local-dir",
        "local",
        "-q",
        "create-testdir",
        "--testdir",
        testdir.to_str().unwrap(),
        "strdup",
    ]))
    .unwrap();

    assert_eq!(
        fs::read_to_string(testdir.join("lib/strdup.c")).unwrap(),
        "LOCAL\n"
    );
    assert_eq!(
        fs::read_to_string(testdir.join("lib/string.in.h")).unwrap(),
        "string\n"
    );
}
