use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::{AuthType, Config},
    model::ReleaseStatus,
    play::GooglePlayClient,
    publish::{
        Action, PromoteOptions, PublishOutcome, ReleaseOptions, RolloutOptions, StatusOptions,
        run_promote, run_release, run_rollout_update, run_status_update, show_track,
    },
    reconcile::{FilterType, VersionCodeFilter, parse_replace_list},
    util::describe_track,
};

#[derive(Parser, Debug)]
#[command(name = "gplay", version, about = "Publish Android apps to Google Play", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    auth: AuthArgs,

    /// Application id, e.g. com.example.app
    #[arg(long, visible_alias = "application-id", env = "GPLAY_PACKAGE_NAME", global = true)]
    package_name: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct AuthArgs {
    /// Where credentials come from
    #[arg(long, value_enum, default_value_t = AuthType::JsonFile, env = "GPLAY_AUTH_TYPE", global = true)]
    auth_type: AuthType,
    /// Service account JSON key file
    #[arg(long, env = "GPLAY_SERVICE_ACCOUNT_KEY", global = true)]
    service_account_key: Option<PathBuf>,
    /// Service endpoint name, resolved from ENDPOINT_AUTH_PARAMETER_<NAME>_* variables
    #[arg(long, env = "GPLAY_SERVICE_ENDPOINT", global = true)]
    service_endpoint: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload binaries and metadata, then update a track
    Release(ReleaseArgs),
    /// Copy the release of one track onto another
    Promote(PromoteArgs),
    /// Increase, complete or halt a staged rollout
    Rollout(RolloutArgs),
    /// Set the status of a track's release
    Status(StatusArgs),
    /// Show the releases of a track
    Track {
        /// Track name
        #[arg(short, long, default_value = "internal")]
        track: String,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a short-lived Google API access token
    Token,
}

#[derive(Args, Debug)]
struct ReleaseArgs {
    /// What to upload
    #[arg(long, value_enum, default_value_t = Action::SingleBundle)]
    action: Action,
    /// APK file pattern (repeatable)
    #[arg(long = "apk", value_name = "GLOB")]
    apks: Vec<String>,
    /// App bundle file pattern (repeatable)
    #[arg(long = "bundle", value_name = "GLOB")]
    bundles: Vec<String>,
    /// Track to release to
    #[arg(short, long, default_value = "internal", env = "GPLAY_TRACK")]
    track: String,
    /// Roll out to a fraction of users instead of everyone
    #[arg(long, value_name = "FRACTION")]
    user_fraction: Option<f64>,
    /// Which existing version codes to drop from the track
    #[arg(long, value_enum, default_value_t = FilterType::All)]
    version_code_filter_type: FilterType,
    /// Comma separated version codes to drop (with --version-code-filter-type list)
    #[arg(long)]
    replace_list: Option<String>,
    /// Pattern of version codes to drop (with --version-code-filter-type expression)
    #[arg(long)]
    replace_expression: Option<String>,
    /// Fastlane-style metadata directory
    #[arg(long)]
    metadata_root: Option<PathBuf>,
    /// Release notes file
    #[arg(long, conflicts_with = "metadata_root")]
    changelog_file: Option<PathBuf>,
    /// Language of --changelog-file
    #[arg(long, default_value = "en-US")]
    language_code: String,
    /// Deobfuscation mapping file pattern
    #[arg(long, value_name = "GLOB")]
    mapping_file: Option<String>,
    /// Upload an expansion file found next to each APK
    #[arg(long)]
    pick_obb: bool,
    /// In-app update priority
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
    update_priority: Option<u8>,
    #[command(flatten)]
    common: CommonArgs,
    /// Release name shown in the Play Console
    #[arg(long)]
    release_name: Option<String>,
    /// Create the release as a draft
    #[arg(long)]
    draft: bool,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Commit without sending the changes for review
    #[arg(long)]
    changes_not_sent_for_review: bool,
}

#[derive(Args, Debug)]
struct PromoteArgs {
    /// Track to take the release from
    #[arg(long, default_value = "internal")]
    source_track: String,
    /// Track to promote to
    #[arg(long, default_value = "production")]
    destination_track: String,
    /// Comma separated version codes (defaults to the source release)
    #[arg(long)]
    version_code: Option<String>,
    /// Roll out to a fraction of users instead of everyone
    #[arg(long, value_name = "FRACTION")]
    user_fraction: Option<f64>,
    /// Empty the source track afterwards
    #[arg(long)]
    clean_source: bool,
    /// Release name (defaults to the source release)
    #[arg(long)]
    release_name: Option<String>,
    /// In-app update priority
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
    update_priority: Option<u8>,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct RolloutArgs {
    /// Track with the staged release
    #[arg(short, long, default_value = "production")]
    track: String,
    /// New fraction; 1 completes the rollout, 0 halts it
    #[arg(long, value_name = "FRACTION")]
    user_fraction: f64,
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Track whose release changes
    #[arg(short, long, default_value = "production")]
    track: String,
    /// New status
    #[arg(long, value_enum)]
    status: ReleaseStatus,
    /// Fraction to send with the status
    #[arg(long, value_name = "FRACTION", conflicts_with = "keep_user_fraction")]
    user_fraction: Option<f64>,
    /// Keep the release's current fraction
    #[arg(long)]
    keep_user_fraction: bool,
    #[command(flatten)]
    common: CommonArgs,
}

impl Cli {
    fn package(&self) -> Result<String> {
        self.package_name
            .clone()
            .ok_or_else(|| anyhow!("--package-name (or GPLAY_PACKAGE_NAME) is required"))
    }
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let cfg = Config::load(
        cli.auth.auth_type,
        cli.auth.service_account_key.as_deref(),
        cli.auth.service_endpoint.as_deref(),
    )?;
    let client = GooglePlayClient::new(cfg)?;

    match &cli.command {
        Commands::Release(args) => release_cmd(&client, cli.package()?, args).await?,
        Commands::Promote(args) => promote_cmd(&client, cli.package()?, args).await?,
        Commands::Rollout(args) => rollout_cmd(&client, cli.package()?, args).await?,
        Commands::Status(args) => status_cmd(&client, cli.package()?, args).await?,
        Commands::Track { track, json } => track_cmd(&client, &cli.package()?, track, *json).await?,
        Commands::Token => print_token_cmd(&client).await?,
    }

    Ok(())
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb
}

fn report(outcome: &PublishOutcome, what: &str) {
    if let Some(track) = &outcome.track {
        println!("{}", describe_track(track));
    }
    println!("{} (edit {})", what, outcome.edit_id);
}

async fn release_cmd(client: &GooglePlayClient, package_name: String, args: &ReleaseArgs) -> Result<()> {
    let filter = VersionCodeFilter::from_inputs(
        args.version_code_filter_type,
        args.replace_list.as_deref(),
        args.replace_expression.as_deref(),
    )?;
    let mut opts = ReleaseOptions::new(package_name, args.track.clone());
    opts.action = args.action;
    opts.apk_patterns = args.apks.clone();
    opts.bundle_patterns = args.bundles.clone();
    opts.user_fraction = args.user_fraction;
    opts.filter = filter;
    opts.metadata_root = args.metadata_root.clone();
    opts.changelog = args.changelog_file.clone();
    opts.language_code = args.language_code.clone();
    opts.mapping_file = args.mapping_file.clone();
    opts.pick_obb = args.pick_obb;
    opts.update_priority = args.update_priority;
    opts.changes_not_sent_for_review = args.common.changes_not_sent_for_review;
    opts.release_name = args.release_name.clone();
    opts.draft = args.draft;

    let outcome = run_release(client, &opts).await?;
    let what = match opts.action {
        Action::OnlyStoreListing => "Store listing updated".to_string(),
        _ => format!("Released to {}", opts.track),
    };
    report(&outcome, &what);
    Ok(())
}

async fn promote_cmd(client: &GooglePlayClient, package_name: String, args: &PromoteArgs) -> Result<()> {
    let mut opts = PromoteOptions::new(
        package_name,
        args.source_track.clone(),
        args.destination_track.clone(),
    );
    opts.version_codes = args
        .version_code
        .as_deref()
        .map(parse_replace_list)
        .transpose()?;
    opts.user_fraction = args.user_fraction;
    opts.clean_source = args.clean_source;
    opts.release_name = args.release_name.clone();
    opts.update_priority = args.update_priority;
    opts.changes_not_sent_for_review = args.common.changes_not_sent_for_review;

    let outcome = run_promote(client, &opts).await?;
    report(
        &outcome,
        &format!("Promoted {} to {}", opts.source_track, opts.destination_track),
    );
    Ok(())
}

async fn rollout_cmd(client: &GooglePlayClient, package_name: String, args: &RolloutArgs) -> Result<()> {
    let opts = RolloutOptions {
        package_name,
        track: args.track.clone(),
        user_fraction: args.user_fraction,
        changes_not_sent_for_review: args.common.changes_not_sent_for_review,
    };
    let outcome = run_rollout_update(client, &opts).await?;
    report(&outcome, &format!("Rollout on {} updated", opts.track));
    Ok(())
}

async fn status_cmd(client: &GooglePlayClient, package_name: String, args: &StatusArgs) -> Result<()> {
    let opts = StatusOptions {
        package_name,
        track: args.track.clone(),
        status: args.status,
        user_fraction: args.user_fraction,
        keep_user_fraction: args.keep_user_fraction,
        changes_not_sent_for_review: args.common.changes_not_sent_for_review,
    };
    let outcome = run_status_update(client, &opts).await?;
    report(&outcome, &format!("Status on {} set to {}", opts.track, opts.status));
    Ok(())
}

async fn track_cmd(client: &GooglePlayClient, package_name: &str, track: &str, json: bool) -> Result<()> {
    let pb = spinner("Loading track...");
    let res = show_track(client, package_name, track).await;
    pb.finish_and_clear();
    let track = res?;
    if json {
        println!("{}", serde_json::to_string_pretty(&track)?);
    } else {
        println!("{}", describe_track(&track));
    }
    Ok(())
}

async fn print_token_cmd(client: &GooglePlayClient) -> Result<()> {
    let pb = spinner("Requesting token...");
    let token = client.access_token().await;
    pb.finish_and_clear();
    println!("{}", token?);
    Ok(())
}
