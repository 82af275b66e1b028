// tests/integration_test.rs

//! Integration tests for repotool
//!
//! These tests drive the full pipeline: extraction, cache staging, database
//! rebuild and publishing.

use repotool::db::list_archive;
use repotool::{Error, RepoConfig, Repository};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, Header};

/// Write a plain tar package containing the given entries
fn write_package(path: &Path, entries: &[(&str, &str)]) {
    let mut builder = Builder::new(File::create(path).unwrap());
    for (name, content) in entries {
        let mut header = Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content.as_bytes()).unwrap();
    }
    builder.finish().unwrap();
}

/// Write a package declaring `name` with a manifest derived from it
fn make_package(dir: &Path, file_name: &str, name: &str, version: &str) -> PathBuf {
    let path = dir.join(file_name);
    let descriptor = format!("# generated by makepkg\npackage = {}\nversion = {}\n", name, version);
    let manifest = format!("#mtree\n./usr/bin/{} type=file\n", name);
    write_package(
        &path,
        &[
            ("./.PACKAGE", descriptor.as_str()),
            ("./.MTREE", manifest.as_str()),
            ("usr/bin/placeholder", "binary"),
        ],
    );
    path
}

/// Read every entry of a database archive into memory
fn read_database(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let decoder = zstd::Decoder::new(File::open(path).unwrap()).unwrap();
    let mut archive = Archive::new(decoder);
    let mut entries = BTreeMap::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        entries.insert(name, content);
    }
    entries
}

/// Recursive file listing of the cache store, relative to its root
fn cache_listing(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

fn open_repo(dir: &Path) -> Repository {
    Repository::open(RepoConfig::new(dir).with_compression_level(3)).unwrap()
}

#[test]
fn test_register_two_packages_and_rebuild() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());

    let foo = make_package(temp_dir.path(), "foo-1.0.pkg.tar", "foo", "1.0");
    let bar = make_package(temp_dir.path(), "bar-2.0.pkg.tar", "bar", "2.0");

    let registered = repo.register(&[foo, bar]).unwrap();
    assert_eq!(registered.len(), 2);

    let names: Vec<String> = repo.list().unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["bar".to_string(), "foo".to_string()]);

    let summary = repo.rebuild().unwrap();
    assert_eq!(summary.entries, 4);
    assert_eq!(summary.path, temp_dir.path().join("intg.db.tar.zst"));

    let database = read_database(&summary.path);
    let entry_names: Vec<&str> = database.keys().map(String::as_str).collect();
    assert_eq!(
        entry_names,
        vec!["bar/.MTREE", "bar/.PACKAGE", "foo/.MTREE", "foo/.PACKAGE"]
    );
    assert_eq!(
        database["foo/.PACKAGE"],
        b"# generated by makepkg\npackage = foo\nversion = 1.0\n"
    );
    assert_eq!(database["bar/.MTREE"], b"#mtree\n./usr/bin/bar type=file\n");
}

#[test]
fn test_cache_round_trip_is_byte_exact() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());
    let package = temp_dir.path().join("raw.pkg.tar");
    let descriptor = "package = raw\r\nflag = \u{00e9}\ttabbed\n\n";
    let manifest = "#mtree\n/set type=file uid=0\n";
    write_package(&package, &[(".PACKAGE", descriptor), (".MTREE", manifest)]);

    repo.register(&[&package]).unwrap();

    let slot = repo.cache().slot_path("raw");
    assert_eq!(fs::read(slot.join(".PACKAGE")).unwrap(), descriptor.as_bytes());
    assert_eq!(fs::read(slot.join(".MTREE")).unwrap(), manifest.as_bytes());
}

#[test]
fn test_slots_are_named_by_descriptor_not_file_name() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());
    let package = make_package(temp_dir.path(), "something-else.pkg.tar", "real-name", "1");

    repo.register(&[package]).unwrap();

    assert!(repo.cache().contains("real-name"));
    assert!(!repo.cache().contains("something-else"));
}

#[test]
fn test_reregistering_overwrites_previous_blobs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());

    let first = temp_dir.path().join("foo-1.0.pkg.tar");
    write_package(
        &first,
        &[
            (".PACKAGE", "package = foo\nversion = 1.0.0-a-very-long-version\n"),
            (".MTREE", "first manifest with extra trailing content\n"),
        ],
    );
    let second = temp_dir.path().join("foo-2.0.pkg.tar");
    write_package(
        &second,
        &[(".PACKAGE", "package = foo\nversion = 2\n"), (".MTREE", "second\n")],
    );

    repo.register(&[&first, &second]).unwrap();

    let slot = repo.cache().slot_path("foo");
    assert_eq!(
        fs::read(slot.join(".PACKAGE")).unwrap(),
        b"package = foo\nversion = 2\n"
    );
    assert_eq!(fs::read(slot.join(".MTREE")).unwrap(), b"second\n");
    assert_eq!(cache_listing(repo.cache().root()), vec!["foo/.MTREE", "foo/.PACKAGE"]);
}

#[test]
fn test_database_reflects_whole_cache_across_runs() {
    let temp_dir = tempfile::tempdir().unwrap();

    let foo = make_package(temp_dir.path(), "foo-1.0.pkg.tar", "foo", "1.0");
    open_repo(temp_dir.path()).register(&[foo]).unwrap();
    open_repo(temp_dir.path()).rebuild().unwrap();

    // A later invocation registering only bar still ships foo
    let repo = open_repo(temp_dir.path());
    let bar = make_package(temp_dir.path(), "bar-2.0.pkg.tar", "bar", "2.0");
    repo.register(&[bar]).unwrap();
    let summary = repo.rebuild().unwrap();

    let entries: Vec<String> = read_database(&summary.path).into_keys().collect();
    assert_eq!(entries, cache_listing(repo.cache().root()));
    assert_eq!(entries.len(), 4);
}

#[test]
fn test_rebuild_twice_is_identical() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());
    let foo = make_package(temp_dir.path(), "foo-1.0.pkg.tar", "foo", "1.0");
    repo.register(&[foo]).unwrap();

    let first = repo.rebuild().unwrap();
    let first_entries = read_database(&first.path);
    let second = repo.rebuild().unwrap();
    let second_entries = read_database(&second.path);

    assert_eq!(first_entries, second_entries);
    assert_eq!(list_archive(&second.path).unwrap().len(), 2);
}

#[test]
fn test_register_nothing_is_rejected_without_side_effects() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());

    let packages: Vec<PathBuf> = Vec::new();
    assert!(matches!(repo.register(&packages), Err(Error::NoPackages)));
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_manifest_aborts_without_partial_slot() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());

    let good = make_package(temp_dir.path(), "good-1.pkg.tar", "good", "1");
    let broken = temp_dir.path().join("broken-1.pkg.tar");
    write_package(&broken, &[(".PACKAGE", "package = broken\n")]);
    let never = make_package(temp_dir.path(), "never-1.pkg.tar", "never", "1");

    let result = repo.register(&[good, broken, never]);

    assert!(matches!(result, Err(Error::MissingEntry { .. })));
    // Earlier packages stay staged, the failing one leaves nothing behind
    assert!(repo.cache().contains("good"));
    assert!(!repo.cache().contains("broken"));
    assert!(!repo.cache().contains("never"));
}

#[test]
fn test_missing_descriptor_is_a_hard_failure() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());
    let package = temp_dir.path().join("nodesc.pkg.tar");
    write_package(&package, &[(".MTREE", "#mtree\n")]);

    let result = repo.register(&[package]);
    assert!(matches!(result, Err(Error::MissingEntry { .. })));
    assert!(repo.list().unwrap().is_empty());
}

#[test]
fn test_missing_package_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());

    let result = repo.register(&["does-not-exist.pkg.tar"]);
    assert!(matches!(result, Err(Error::PackageRead { .. })));
}

#[test]
fn test_relative_package_paths_resolve_against_work_dir() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());
    fs::create_dir_all(temp_dir.path().join("pkgs")).unwrap();
    make_package(&temp_dir.path().join("pkgs"), "foo-1.0.pkg.tar", "foo", "1.0");

    let registered = repo.register(&["pkgs/foo-1.0.pkg.tar"]).unwrap();
    assert_eq!(registered[0].source, temp_dir.path().join("pkgs/foo-1.0.pkg.tar"));
}

#[test]
fn test_compressed_packages() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());

    let plain = make_package(temp_dir.path(), "plain.pkg.tar", "zpkg", "1");
    let zst = temp_dir.path().join("zpkg-1.pkg.tar.zst");
    fs::write(&zst, zstd::encode_all(File::open(&plain).unwrap(), 3).unwrap()).unwrap();

    let plain_x = make_package(temp_dir.path(), "plain-x.pkg.tar", "xpkg", "1");
    let xz = temp_dir.path().join("xpkg-1.pkg.tar.xz");
    let mut encoder = xz2::write::XzEncoder::new(File::create(&xz).unwrap(), 6);
    std::io::copy(&mut File::open(&plain_x).unwrap(), &mut encoder).unwrap();
    encoder.finish().unwrap();

    let plain_g = make_package(temp_dir.path(), "plain-g.pkg.tar", "gpkg", "1");
    let gz = temp_dir.path().join("gpkg-1.pkg.tar.gz");
    let mut encoder =
        flate2::write::GzEncoder::new(File::create(&gz).unwrap(), flate2::Compression::default());
    std::io::copy(&mut File::open(&plain_g).unwrap(), &mut encoder).unwrap();
    encoder.finish().unwrap();

    repo.register(&[zst, xz, gz]).unwrap();

    let names: Vec<String> = repo.list().unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["gpkg", "xpkg", "zpkg"]);
    assert_eq!(
        fs::read(repo.cache().slot_path("xpkg").join(".MTREE")).unwrap(),
        b"#mtree\n./usr/bin/xpkg type=file\n"
    );
}

#[test]
fn test_remove_then_rebuild_drops_entries() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());
    let foo = make_package(temp_dir.path(), "foo-1.0.pkg.tar", "foo", "1.0");
    let bar = make_package(temp_dir.path(), "bar-2.0.pkg.tar", "bar", "2.0");
    repo.register(&[foo, bar]).unwrap();
    repo.rebuild().unwrap();

    assert_eq!(repo.remove(&["foo"]).unwrap(), 1);
    let summary = repo.rebuild().unwrap();

    let entries: Vec<String> = read_database(&summary.path).into_keys().collect();
    assert_eq!(entries, vec!["bar/.MTREE", "bar/.PACKAGE"]);
}

#[test]
fn test_cache_dir_that_is_a_file_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("dbcache"), b"oops").unwrap();
    let repo = open_repo(temp_dir.path());
    let foo = make_package(temp_dir.path(), "foo-1.0.pkg.tar", "foo", "1.0");

    assert!(matches!(repo.register(&[foo]), Err(Error::NotADirectory(_))));
    assert!(matches!(repo.rebuild(), Err(Error::NotADirectory(_))));
    assert!(!repo.db_path().exists());
}

#[test]
fn test_full_workflow_with_publish() {
    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());
    let foo = make_package(temp_dir.path(), "foo-1.0.pkg.tar", "foo", "1.0");
    let bar = make_package(temp_dir.path(), "bar-2.0.pkg.tar", "bar", "2.0");
    let packages = vec![foo, bar];

    repo.register(&packages).unwrap();
    let summary = repo.rebuild().unwrap();
    let published = repo.publish(&packages, "custom").unwrap();

    let repo_dir = temp_dir.path().join("root/custom");
    assert_eq!(published.repo_dir, repo_dir);
    assert_eq!(published.packages.len(), 2);
    assert_eq!(
        fs::read(repo_dir.join("foo-1.0.pkg.tar")).unwrap(),
        fs::read(&packages[0]).unwrap()
    );
    assert_eq!(
        fs::read(repo_dir.join("custom.db.tar.zst")).unwrap(),
        fs::read(&summary.path).unwrap()
    );
}

#[cfg(unix)]
#[test]
fn test_database_and_published_copy_are_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempfile::tempdir().unwrap();
    let repo = open_repo(temp_dir.path());
    let foo = make_package(temp_dir.path(), "foo-1.0.pkg.tar", "foo", "1.0");

    repo.register(&[&foo]).unwrap();
    let summary = repo.rebuild().unwrap();
    let published = repo.publish(&[&foo], "custom").unwrap();

    for path in [&summary.path, &published.database] {
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o044, 0o044, "{} has mode {:o}", path.display(), mode & 0o777);
    }
}
