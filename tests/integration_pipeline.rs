//! End-to-end tests for the reorganize, dedup and collection stages.
//!
//! These tests verify:
//! - Reorganize determinism and consistent collision suffixes
//! - The empty-output precondition
//! - Dedup partition and idempotence at threshold 0
//! - Run ids flowing from manifest to report to provenance

use image::{ImageBuffer, Rgb};
use photo_curator::core::collection::{CollectionBuilder, InitOptions, Provenance};
use photo_curator::core::dedup::{DedupOptions, DedupReport, Deduplicator};
use photo_curator::core::reorganize::{ReorganizeManifest, ReorganizeOptions, Reorganizer};
use photo_curator::core::scanner::{ScanConfig, ScanIndexer};
use photo_curator::events::null_sender;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Checkerboard of 8-pixel cells; different `pattern` values share few fingerprint bits
fn write_photo(path: &Path, pattern: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = ImageBuffer::from_fn(64, 64, |x, y| {
        let on = (x / 8 + y / 8 + pattern) % 3 == 0;
        let v = if on { 235u8 } else { 25u8 };
        Rgb([v, v, v])
    });
    img.save(path).unwrap();
}

/// Relative paths and contents of every file under `root`
fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            (
                e.path().strip_prefix(root).unwrap().to_path_buf(),
                fs::read(e.path()).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

fn reorganize(input: &Path, output: &Path) -> photo_curator::Result<()> {
    let index = ScanIndexer::new(ScanConfig::default()).index(input)?;
    Reorganizer::new(ReorganizeOptions::default()).run(&index, output, &null_sender())?;
    Ok(())
}

/// Raw scanner output with a basename shared by two batches
fn scan_tree(root: &Path) -> PathBuf {
    let input = root.join("scans");
    write_photo(&input.join("dirX/a.png"), 0);
    write_photo(&input.join("dirX/a_a.png"), 0);
    write_photo(&input.join("dirX/a_b.png"), 1);
    write_photo(&input.join("dirY/a.png"), 2);
    write_photo(&input.join("dirY/a_b.png"), 1);
    write_photo(&input.join("dirY/nested/b.png"), 1);
    input
}

#[test]
fn reorganize_is_deterministic() {
    let temp = TempDir::new().unwrap();
    let input = scan_tree(temp.path());

    reorganize(&input, &temp.path().join("first")).unwrap();
    reorganize(&input, &temp.path().join("second")).unwrap();

    let strip = |dir: &Path| {
        let mut first = snapshot(dir);
        first.retain(|(p, _)| p != Path::new("manifest.json"));
        first
    };
    assert_eq!(strip(&temp.path().join("first")), strip(&temp.path().join("second")));

    let entries = |dir: &Path| {
        ReorganizeManifest::read(dir)
            .unwrap()
            .unwrap()
            .entries
            .into_iter()
            .map(|e| {
                (
                    e.disambiguated_basename,
                    e.variant,
                    e.source_path,
                    e.dest_path.strip_prefix(dir).unwrap().to_path_buf(),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(
        entries(&temp.path().join("first")),
        entries(&temp.path().join("second"))
    );
}

#[test]
fn collision_suffix_is_shared_by_every_variant() {
    let temp = TempDir::new().unwrap();
    let input = scan_tree(temp.path());
    let output = temp.path().join("reorganized");

    reorganize(&input, &output).unwrap();

    let listing: BTreeSet<PathBuf> = snapshot(&output).into_iter().map(|(p, _)| p).collect();
    let expected: BTreeSet<PathBuf> = [
        "fronts/a_0.png",
        "enhanced_fronts/a_0.png",
        "backs/a_0.png",
        "fronts/a_1.png",
        "backs/a_1.png",
        "fronts/b.png",
        "manifest.json",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect();
    assert_eq!(listing, expected);

    // a_0 is dirX's photo: its front matches dirX/a.png byte for byte
    assert_eq!(
        fs::read(output.join("fronts/a_0.png")).unwrap(),
        fs::read(input.join("dirX/a.png")).unwrap()
    );
    assert_eq!(
        fs::read(output.join("fronts/a_1.png")).unwrap(),
        fs::read(input.join("dirY/a.png")).unwrap()
    );
}

#[test]
fn non_empty_category_directory_is_left_alone() {
    let temp = TempDir::new().unwrap();
    let input = scan_tree(temp.path());
    let output = temp.path().join("reorganized");
    fs::create_dir_all(output.join("backs")).unwrap();
    fs::write(output.join("backs/keep.png"), b"user file").unwrap();

    let err = reorganize(&input, &output).unwrap_err();

    assert_eq!(err.kind(), "OutputNotEmptyError");
    assert_eq!(
        snapshot(&output),
        vec![(PathBuf::from("backs/keep.png"), b"user file".to_vec())]
    );
}

#[test]
fn missing_input_is_an_indexing_error() {
    let temp = TempDir::new().unwrap();
    let err = reorganize(&temp.path().join("nope"), &temp.path().join("out")).unwrap_err();
    assert_eq!(err.kind(), "IndexingError");
}

#[test]
fn dedup_partitions_identities_and_is_idempotent_at_zero() {
    let temp = TempDir::new().unwrap();
    let reorganized = temp.path().join("reorganized");
    write_photo(&reorganized.join("fronts/a.png"), 0);
    write_photo(&reorganized.join("backs/a.png"), 1);
    write_photo(&reorganized.join("fronts/b.png"), 0);
    write_photo(&reorganized.join("enhanced_fronts/c.png"), 1);
    write_photo(&reorganized.join("fronts/d.png"), 2);
    write_photo(&reorganized.join("fronts/e.png"), 2);

    let unique = temp.path().join("unique");
    let dups = temp.path().join("dups");
    let options = DedupOptions::default().threshold(0);
    let first = Deduplicator::new(options.clone())
        .run(&reorganized, &unique, &dups, &null_sender())
        .unwrap();

    let members: Vec<String> = first
        .clusters
        .iter()
        .flat_map(|c| c.members().map(str::to_string).collect::<Vec<_>>())
        .collect();
    let distinct: BTreeSet<&String> = members.iter().collect();
    assert_eq!(members.len(), 5);
    assert_eq!(distinct.len(), 5);
    assert_eq!(first.kept, 3);
    assert!(dups.join("fronts/b.png").exists());
    assert!(dups.join("fronts/e.png").exists());
    assert!(unique.join("backs/a.png").exists());

    let second = Deduplicator::new(options)
        .run(
            &unique,
            &temp.path().join("unique2"),
            &temp.path().join("dups2"),
            &null_sender(),
        )
        .unwrap();
    assert_eq!(second.duplicates, 0);
    assert_eq!(second.kept, first.kept);
    assert!(snapshot(&temp.path().join("dups2")).is_empty());
}

#[test]
fn run_ids_flow_into_the_collection() {
    let temp = TempDir::new().unwrap();
    let input = scan_tree(temp.path());
    let reorganized = temp.path().join("reorganized");
    reorganize(&input, &reorganized).unwrap();

    let unique = temp.path().join("unique");
    let dedup = Deduplicator::new(DedupOptions::default().threshold(0))
        .run(&reorganized, &unique, &temp.path().join("dups"), &null_sender())
        .unwrap();

    let root = temp.path().join("collections");
    let collection = CollectionBuilder::new(InitOptions::default().tag("dc:source", "attic box"))
        .init(&unique, "family", &root, &null_sender())
        .unwrap();

    let manifest = ReorganizeManifest::read(&reorganized).unwrap().unwrap();
    let report = DedupReport::read(&unique).unwrap().unwrap();
    let provenance = Provenance::read(&collection.path).unwrap().unwrap();
    assert_eq!(report.source_run_id, Some(manifest.run_id));
    assert_eq!(provenance.dedup_run_id, Some(dedup.run_id));
    assert_eq!(provenance.reorganize_run_id, Some(manifest.run_id));
    assert_eq!(provenance.photos, dedup.kept);

    for (relative, _) in snapshot(&collection.path) {
        let is_image = relative.extension().is_some_and(|e| e == "png");
        if is_image {
            assert!(
                collection.path.join(relative.with_extension("xmp")).exists(),
                "{} has no sidecar",
                relative.display()
            );
        }
    }
}
