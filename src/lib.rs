pub mod cli;
pub mod config;
pub mod error;
pub mod files;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod play;
pub mod publish;
pub mod reconcile;
pub mod rollout;
pub mod util;

pub use config::Config;
pub use error::PublishError;
pub use play::{EditContext, GooglePlayClient};
pub use reconcile::{VersionCodeFilter, parse_replace_list, reconcile_version_codes};
pub use util::{api_error_message, describe_track, format_version_codes};
