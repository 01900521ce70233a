use std::fs;

use gplay::{
    PublishError,
    files::{find_obb, read_changelog, resolve_all, resolve_first, resolve_glob},
    metadata::{ImageType, collect_images, discover_languages, read_listing, release_notes_from_metadata},
};
use tempfile::TempDir;

fn touch(dir: &TempDir, rel: &str, contents: &str) {
    let path = dir.path().join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn glob_resolves_sorted_files() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "out/b.apk", "");
    touch(&dir, "out/a.apk", "");
    touch(&dir, "out/c.aab", "");
    let pattern = format!("{}/out/*.apk", dir.path().display());

    let files = resolve_glob(&pattern).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("a.apk"));
    assert!(resolve_first(&pattern).unwrap().ends_with("a.apk"));

    let both = resolve_all(&[pattern.clone(), format!("{}/out/*.a*", dir.path().display())]).unwrap();
    assert_eq!(both.len(), 3);
}

#[test]
fn glob_without_match_is_artifact_not_found() {
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*.aab", dir.path().display());
    let err = resolve_glob(&pattern).unwrap_err();
    assert!(matches!(err, PublishError::ArtifactNotFound(p) if p == pattern));
}

#[test]
fn changelog_read_failure_names_the_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("notes.txt");
    let err = read_changelog(&missing).unwrap_err();
    assert!(err.to_string().contains("notes.txt"));

    touch(&dir, "notes.txt", "  Fixed crashes\n");
    assert_eq!(read_changelog(&missing).unwrap(), "Fixed crashes");
}

#[test]
fn obb_in_parent_directory_wins() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "build/apk/app.apk", "");
    touch(&dir, "build/apk/main.7.com.example.obb", "");
    let apk = dir.path().join("build/apk/app.apk");

    assert!(find_obb(&apk, "com.example", 7).unwrap().ends_with("main.7.com.example.obb"));

    touch(&dir, "build/data.obb", "");
    assert!(find_obb(&apk, "com.example", 7).unwrap().ends_with("build/data.obb"));
}

#[test]
fn no_obb_found() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "apk/app.apk", "");
    assert!(find_obb(&dir.path().join("apk/app.apk"), "com.example", 1).is_none());
}

#[test]
fn reads_fastlane_listing_and_images() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "en-US/title.txt", "My App\n");
    touch(&dir, "en-US/full_description.txt", "Long text");
    touch(&dir, "en-US/images/icon.png", "");
    touch(&dir, "en-US/images/featureGraphic.JPG", "");
    touch(&dir, "en-US/images/notes.txt", "");
    touch(&dir, "en-US/images/phoneScreenshots/2.png", "");
    touch(&dir, "en-US/images/phoneScreenshots/1.jpeg", "");
    touch(&dir, "en-US/images/phoneScreenshots/readme.md", "");
    touch(&dir, "de-DE/title.txt", "Meine App");
    touch(&dir, "stray.txt", "");

    assert_eq!(discover_languages(dir.path()), vec!["de-DE", "en-US"]);

    let listing = read_listing(dir.path(), "en-US");
    assert_eq!(listing.title.as_deref(), Some("My App"));
    assert_eq!(listing.full_description.as_deref(), Some("Long text"));
    assert_eq!(listing.short_description, None);

    let images = collect_images(dir.path(), "en-US");
    let types: Vec<ImageType> = images.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        types,
        vec![ImageType::FeatureGraphic, ImageType::Icon, ImageType::PhoneScreenshots]
    );
    let shots = &images[2].1;
    assert_eq!(shots.len(), 2);
    assert!(shots[0].ends_with("1.jpeg"));
}

#[test]
fn release_notes_prefer_highest_version_changelog() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "en-US/changelogs/10.txt", "ten");
    touch(&dir, "en-US/changelogs/11.txt", "eleven");
    touch(&dir, "fr-FR/changelogs/default.txt", "défaut");
    touch(&dir, "it-IT/title.txt", "no changelogs");

    let notes = release_notes_from_metadata(dir.path(), &[10, 11]).unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].language, "en-US");
    assert_eq!(notes[0].text, "eleven");
    assert_eq!(notes[1].language, "fr-FR");
    assert_eq!(notes[1].text, "défaut");
}
