//! Publishing flows. Each one opens an edit, performs its calls strictly in
//! sequence and commits; the first failure aborts the run and the edit is
//! left to expire.

use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use log::{info, warn};

use crate::{
    error::PublishError,
    files::{find_obb, read_changelog, resolve_all, resolve_first},
    metadata::{release_notes_from_metadata, upload_metadata},
    model::{LocalizedText, Release, ReleaseStatus, Track},
    play::{EditContext, GooglePlayClient},
    reconcile::{VersionCodeFilter, reconcile_version_codes, resolve_track_version_codes},
    rollout::{
        RolloutPlan, plan_for_draft, plan_for_fraction, plan_for_rollout_update, plan_for_status,
        validate_fraction,
    },
    util::format_version_codes,
};

pub const MAX_UPDATE_PRIORITY: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Action {
    /// Upload the first APK matching --apk
    SingleApk,
    /// Upload the first bundle matching --bundle
    #[default]
    SingleBundle,
    /// Upload every APK and bundle matching the patterns
    MultiApkAab,
    /// Only update the store listing from metadata
    OnlyStoreListing,
}

#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    pub package_name: String,
    pub action: Action,
    pub apk_patterns: Vec<String>,
    pub bundle_patterns: Vec<String>,
    pub track: String,
    /// `None` rolls out to everyone.
    pub user_fraction: Option<f64>,
    pub filter: VersionCodeFilter,
    pub metadata_root: Option<PathBuf>,
    pub changelog: Option<PathBuf>,
    pub language_code: String,
    pub mapping_file: Option<String>,
    pub pick_obb: bool,
    pub update_priority: Option<u8>,
    pub changes_not_sent_for_review: bool,
    pub release_name: Option<String>,
    pub draft: bool,
}

impl ReleaseOptions {
    pub fn new(package_name: impl Into<String>, track: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            action: Action::default(),
            apk_patterns: Vec::new(),
            bundle_patterns: Vec::new(),
            track: track.into(),
            user_fraction: None,
            filter: VersionCodeFilter::All,
            metadata_root: None,
            changelog: None,
            language_code: "en-US".to_string(),
            mapping_file: None,
            pick_obb: false,
            update_priority: None,
            changes_not_sent_for_review: false,
            release_name: None,
            draft: false,
        }
    }

    fn plan(&self) -> Result<RolloutPlan, PublishError> {
        if self.draft {
            return Ok(plan_for_draft());
        }
        let fraction = validate_fraction(self.user_fraction.unwrap_or(1.0))?;
        Ok(plan_for_fraction(fraction))
    }

    fn validate(&self) -> Result<(), PublishError> {
        validate_priority(self.update_priority)?;
        self.plan()?;
        let missing = match self.action {
            Action::SingleApk => self.apk_patterns.is_empty().then_some("--apk"),
            Action::SingleBundle => self.bundle_patterns.is_empty().then_some("--bundle"),
            Action::MultiApkAab => (self.apk_patterns.is_empty() && self.bundle_patterns.is_empty())
                .then_some("--apk or --bundle"),
            Action::OnlyStoreListing => self.metadata_root.is_none().then_some("--metadata-root"),
        };
        match missing {
            Some(flag) => Err(PublishError::InvalidInput(format!(
                "{} is required for this action",
                flag
            ))),
            None => Ok(()),
        }
    }

    fn resolve_artifacts(&self) -> Result<(Vec<PathBuf>, Vec<PathBuf>), PublishError> {
        match self.action {
            Action::SingleApk => Ok((vec![resolve_first(&self.apk_patterns[0])?], Vec::new())),
            Action::SingleBundle => Ok((Vec::new(), vec![resolve_first(&self.bundle_patterns[0])?])),
            Action::MultiApkAab => Ok((
                resolve_all(&self.apk_patterns)?,
                resolve_all(&self.bundle_patterns)?,
            )),
            Action::OnlyStoreListing => Ok((Vec::new(), Vec::new())),
        }
    }
}

fn validate_priority(priority: Option<u8>) -> Result<(), PublishError> {
    match priority {
        Some(p) if p > MAX_UPDATE_PRIORITY => Err(PublishError::InvalidInput(format!(
            "update priority must be between 0 and {}, got {}",
            MAX_UPDATE_PRIORITY, p
        ))),
        _ => Ok(()),
    }
}

/// Result of a run: the edit that was committed and the track as the API
/// returned it, if one was written.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub edit_id: String,
    pub track: Option<Track>,
}

pub async fn run_release(client: &GooglePlayClient, opts: &ReleaseOptions) -> Result<PublishOutcome> {
    opts.validate()?;
    let (apks, bundles) = opts.resolve_artifacts()?;
    let mapping = opts.mapping_file.as_deref().map(resolve_first).transpose()?;

    let ctx = client.insert_edit(&opts.package_name).await?;
    info!("Opened edit {}", ctx.edit_id);

    let mut uploaded: Vec<i64> = Vec::new();
    for apk in &apks {
        info!("Uploading APK {}", apk.display());
        let version_code = client.upload_apk(&ctx, apk).await?;
        info!("Uploaded APK with version code {}", version_code);
        if opts.pick_obb {
            match find_obb(apk, &opts.package_name, version_code) {
                Some(obb) => {
                    info!("Uploading expansion file {}", obb.display());
                    client.upload_expansion_file(&ctx, version_code, &obb).await?;
                }
                None => warn!("No expansion file found for {}", apk.display()),
            }
        }
        uploaded.push(version_code);
    }
    for bundle in &bundles {
        info!("Uploading bundle {}", bundle.display());
        let version_code = client.upload_bundle(&ctx, bundle).await?;
        info!("Uploaded bundle with version code {}", version_code);
        uploaded.push(version_code);
    }
    if let Some(mapping) = &mapping {
        for version_code in &uploaded {
            info!("Uploading mapping file for version code {}", version_code);
            client.upload_deobfuscation(&ctx, *version_code, mapping).await?;
        }
    }

    if let Some(root) = &opts.metadata_root {
        info!("Uploading metadata from {}", root.display());
        upload_metadata(client, &ctx, root).await?;
    }

    let track = if opts.action == Action::OnlyStoreListing {
        None
    } else {
        let version_codes =
            resolve_track_version_codes(client, &ctx, &opts.track, &uploaded, &opts.filter).await?;
        let mut release = Release::new(version_codes, ReleaseStatus::Completed);
        opts.plan()?.apply(&mut release);
        release.name = opts.release_name.clone();
        release.in_app_update_priority = opts.update_priority;
        release.release_notes = release_notes(opts, &uploaded)?;
        info!(
            "Updating track {} to [{}] ({})",
            opts.track,
            format_version_codes(&release.version_codes),
            release.status
        );
        Some(
            client
                .update_track(&ctx, &Track::new(opts.track.clone(), vec![release]))
                .await?,
        )
    };

    commit(client, &ctx, opts.changes_not_sent_for_review).await?;
    Ok(PublishOutcome {
        edit_id: ctx.edit_id,
        track,
    })
}

fn release_notes(opts: &ReleaseOptions, version_codes: &[i64]) -> Result<Option<Vec<LocalizedText>>> {
    let notes = if let Some(root) = &opts.metadata_root {
        if let Some(path) = &opts.changelog {
            warn!(
                "Ignoring {}: release notes come from the metadata changelogs",
                path.display()
            );
        }
        release_notes_from_metadata(root, version_codes)?
    } else if let Some(path) = &opts.changelog {
        vec![LocalizedText {
            language: opts.language_code.clone(),
            text: read_changelog(path)?,
        }]
    } else {
        Vec::new()
    };
    Ok((!notes.is_empty()).then_some(notes))
}

async fn commit(client: &GooglePlayClient, ctx: &EditContext, not_for_review: bool) -> Result<()> {
    client.commit_edit(ctx, not_for_review).await?;
    info!("Committed edit {}", ctx.edit_id);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct PromoteOptions {
    pub package_name: String,
    pub source_track: String,
    pub destination_track: String,
    /// Defaults to the source release's version codes.
    pub version_codes: Option<Vec<i64>>,
    pub user_fraction: Option<f64>,
    pub clean_source: bool,
    pub release_name: Option<String>,
    pub update_priority: Option<u8>,
    pub changes_not_sent_for_review: bool,
}

impl PromoteOptions {
    pub fn new(
        package_name: impl Into<String>,
        source_track: impl Into<String>,
        destination_track: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            source_track: source_track.into(),
            destination_track: destination_track.into(),
            version_codes: None,
            user_fraction: None,
            clean_source: false,
            release_name: None,
            update_priority: None,
            changes_not_sent_for_review: false,
        }
    }
}

/// Copies the source track's release onto the destination track. Release
/// notes are forwarded unchanged.
pub async fn run_promote(client: &GooglePlayClient, opts: &PromoteOptions) -> Result<PublishOutcome> {
    validate_priority(opts.update_priority)?;
    let plan = plan_for_fraction(validate_fraction(opts.user_fraction.unwrap_or(1.0))?);

    let ctx = client.insert_edit(&opts.package_name).await?;
    info!("Opened edit {}", ctx.edit_id);

    let source = client.get_track(&ctx, &opts.source_track).await?;
    let source_release = source
        .releases
        .first()
        .ok_or_else(|| PublishError::NoRelease {
            track: opts.source_track.clone(),
            wanted: "active".into(),
        })?;

    let version_codes = opts
        .version_codes
        .clone()
        .unwrap_or_else(|| source_release.version_codes.clone());
    let mut release = Release::new(version_codes, ReleaseStatus::Completed);
    plan.apply(&mut release);
    release.release_notes = source_release.release_notes.clone();
    release.name = opts
        .release_name
        .clone()
        .or_else(|| source_release.name.clone());
    release.in_app_update_priority = opts
        .update_priority
        .or(source_release.in_app_update_priority);

    info!(
        "Promoting [{}] from {} to {}",
        format_version_codes(&release.version_codes),
        opts.source_track,
        opts.destination_track
    );
    let track = client
        .update_track(
            &ctx,
            &Track::new(opts.destination_track.clone(), vec![release]),
        )
        .await?;

    if opts.clean_source {
        info!("Cleaning track {}", opts.source_track);
        let empty = reconcile_version_codes(&[], &[], &VersionCodeFilter::All);
        let cleaned = Release::new(empty, ReleaseStatus::Completed);
        client
            .update_track(&ctx, &Track::new(opts.source_track.clone(), vec![cleaned]))
            .await?;
    }

    commit(client, &ctx, opts.changes_not_sent_for_review).await?;
    Ok(PublishOutcome {
        edit_id: ctx.edit_id,
        track: Some(track),
    })
}

#[derive(Debug, Clone)]
pub struct RolloutOptions {
    pub package_name: String,
    pub track: String,
    /// Zero or less halts the rollout.
    pub user_fraction: f64,
    pub changes_not_sent_for_review: bool,
}

/// Changes the fraction of the track's staged release, completing it at 1.0.
pub async fn run_rollout_update(
    client: &GooglePlayClient,
    opts: &RolloutOptions,
) -> Result<PublishOutcome> {
    if opts.user_fraction > 1.0 {
        return Err(PublishError::InvalidInput(format!(
            "user fraction must not exceed 1, got {}",
            opts.user_fraction
        ))
        .into());
    }
    let plan = plan_for_rollout_update(opts.user_fraction);

    let ctx = client.insert_edit(&opts.package_name).await?;
    info!("Opened edit {}", ctx.edit_id);

    let mut track = client.get_track(&ctx, &opts.track).await?;
    let staged = track
        .releases
        .iter()
        .position(|r| matches!(r.status, ReleaseStatus::InProgress | ReleaseStatus::Halted))
        .ok_or_else(|| PublishError::NoRelease {
            track: opts.track.clone(),
            wanted: "in-progress or halted".into(),
        })?;
    let release = &mut track.releases[staged];
    plan.apply(release);
    info!(
        "Setting [{}] on {} to {}",
        format_version_codes(&release.version_codes),
        opts.track,
        release.status
    );
    // A track holds one completed release; the one it replaces goes away.
    if plan.status == ReleaseStatus::Completed {
        let mut index = 0;
        track.releases.retain(|r| {
            let keep = index == staged || r.status == ReleaseStatus::Draft;
            index += 1;
            keep
        });
    }

    let track = client.update_track(&ctx, &track).await?;
    commit(client, &ctx, opts.changes_not_sent_for_review).await?;
    Ok(PublishOutcome {
        edit_id: ctx.edit_id,
        track: Some(track),
    })
}

#[derive(Debug, Clone)]
pub struct StatusOptions {
    pub package_name: String,
    pub track: String,
    pub status: ReleaseStatus,
    pub user_fraction: Option<f64>,
    /// Keep the release's current fraction instead of `user_fraction`.
    pub keep_user_fraction: bool,
    pub changes_not_sent_for_review: bool,
}

/// Sets the status of the track's first release as given, without deriving
/// it from the fraction.
pub async fn run_status_update(
    client: &GooglePlayClient,
    opts: &StatusOptions,
) -> Result<PublishOutcome> {
    if let Some(f) = opts.user_fraction {
        validate_fraction(f)?;
    }
    let ctx = client.insert_edit(&opts.package_name).await?;
    info!("Opened edit {}", ctx.edit_id);

    let mut track = client.get_track(&ctx, &opts.track).await?;
    let release = track
        .releases
        .first_mut()
        .ok_or_else(|| PublishError::NoRelease {
            track: opts.track.clone(),
            wanted: "active".into(),
        })?;
    plan_for_status(
        opts.status,
        opts.user_fraction,
        opts.keep_user_fraction,
        release,
    )
    .apply(release);
    info!("Setting status of {} to {}", opts.track, release.status);

    let track = client.update_track(&ctx, &track).await?;
    commit(client, &ctx, opts.changes_not_sent_for_review).await?;
    Ok(PublishOutcome {
        edit_id: ctx.edit_id,
        track: Some(track),
    })
}

/// Reads a track inside a throwaway edit.
pub async fn show_track(client: &GooglePlayClient, package_name: &str, track: &str) -> Result<Track> {
    let ctx = client.insert_edit(package_name).await?;
    let result = client.get_track(&ctx, track).await;
    if let Err(e) = client.delete_edit(&ctx).await {
        warn!("Failed to delete edit {}: {}", ctx.edit_id, e);
    }
    result
}
