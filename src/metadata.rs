//! Fastlane-style store metadata.
//!
//! ```text
//! <root>/<language>/title.txt
//! <root>/<language>/short_description.txt
//! <root>/<language>/full_description.txt
//! <root>/<language>/video.txt
//! <root>/<language>/images/icon.png
//! <root>/<language>/images/phoneScreenshots/1.png
//! <root>/<language>/changelogs/<versionCode>.txt
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use log::{debug, info};
use walkdir::WalkDir;

use crate::{
    files::{has_extension, read_changelog},
    model::{Listing, LocalizedText},
    play::{EditContext, GooglePlayClient},
};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    FeatureGraphic,
    Icon,
    PromoGraphic,
    TvBanner,
    PhoneScreenshots,
    SevenInchScreenshots,
    TenInchScreenshots,
    TvScreenshots,
    WearScreenshots,
}

impl ImageType {
    pub const ALL: [ImageType; 9] = [
        ImageType::FeatureGraphic,
        ImageType::Icon,
        ImageType::PromoGraphic,
        ImageType::TvBanner,
        ImageType::PhoneScreenshots,
        ImageType::SevenInchScreenshots,
        ImageType::TenInchScreenshots,
        ImageType::TvScreenshots,
        ImageType::WearScreenshots,
    ];

    /// Name used both by the API and the folder layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::FeatureGraphic => "featureGraphic",
            ImageType::Icon => "icon",
            ImageType::PromoGraphic => "promoGraphic",
            ImageType::TvBanner => "tvBanner",
            ImageType::PhoneScreenshots => "phoneScreenshots",
            ImageType::SevenInchScreenshots => "sevenInchScreenshots",
            ImageType::TenInchScreenshots => "tenInchScreenshots",
            ImageType::TvScreenshots => "tvScreenshots",
            ImageType::WearScreenshots => "wearScreenshots",
        }
    }

    pub fn is_screenshot_set(&self) -> bool {
        matches!(
            self,
            ImageType::PhoneScreenshots
                | ImageType::SevenInchScreenshots
                | ImageType::TenInchScreenshots
                | ImageType::TvScreenshots
                | ImageType::WearScreenshots
        )
    }
}

fn entries(dir: &Path) -> impl Iterator<Item = walkdir::DirEntry> + use<> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
}

pub fn discover_languages(root: &Path) -> Vec<String> {
    entries(root)
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
        .collect()
}

fn read_text(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn read_listing(root: &Path, language: &str) -> Listing {
    let dir = root.join(language);
    Listing {
        language: language.to_string(),
        title: read_text(&dir.join("title.txt")),
        short_description: read_text(&dir.join("short_description.txt")),
        full_description: read_text(&dir.join("full_description.txt")),
        video: read_text(&dir.join("video.txt")),
    }
}

pub fn collect_images(root: &Path, language: &str) -> Vec<(ImageType, Vec<PathBuf>)> {
    let images = root.join(language).join("images");
    let mut out = Vec::new();
    for image_type in ImageType::ALL {
        let files: Vec<PathBuf> = if image_type.is_screenshot_set() {
            entries(&images.join(image_type.as_str()))
                .filter(|e| e.file_type().is_file() && has_extension(e.path(), IMAGE_EXTENSIONS))
                .map(|e| e.into_path())
                .collect()
        } else {
            entries(&images)
                .filter(|e| e.file_type().is_file() && has_extension(e.path(), IMAGE_EXTENSIONS))
                .filter(|e| {
                    e.path().file_stem().and_then(|s| s.to_str()) == Some(image_type.as_str())
                })
                .take(1)
                .map(|e| e.into_path())
                .collect()
        };
        if !files.is_empty() {
            out.push((image_type, files));
        }
    }
    out
}

/// Release notes for each language folder, taken from the changelog of the
/// highest version code that has one, else `changelogs/default.txt`.
pub fn release_notes_from_metadata(
    root: &Path,
    version_codes: &[i64],
) -> Result<Vec<LocalizedText>> {
    let mut sorted = version_codes.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let mut notes = Vec::new();
    for language in discover_languages(root) {
        let changelogs = root.join(&language).join("changelogs");
        let candidate = sorted
            .iter()
            .map(|vc| changelogs.join(format!("{}.txt", vc)))
            .chain(std::iter::once(changelogs.join("default.txt")))
            .find(|p| p.is_file());
        if let Some(path) = candidate {
            let text = read_changelog(&path)?;
            if !text.is_empty() {
                debug!("Release notes for {} from {}", language, path.display());
                notes.push(LocalizedText { language, text });
            }
        }
    }
    Ok(notes)
}

pub async fn upload_metadata(
    client: &GooglePlayClient,
    ctx: &EditContext,
    root: &Path,
) -> Result<()> {
    for language in discover_languages(root) {
        let listing = read_listing(root, &language);
        if listing.has_text() {
            info!("Updating {} store listing", language);
            client.update_listing(ctx, &listing).await?;
        }
        for (image_type, files) in collect_images(root, &language) {
            info!(
                "Replacing {} {} image(s) for {}",
                files.len(),
                image_type.as_str(),
                language
            );
            client
                .delete_all_images(ctx, &language, image_type.as_str())
                .await?;
            for file in files {
                client
                    .upload_image(ctx, &language, image_type.as_str(), &file)
                    .await?;
            }
        }
    }
    Ok(())
}
