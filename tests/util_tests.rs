use gplay::{
    api_error_message, describe_track,
    model::{Release, ReleaseStatus, Track},
};
use serde_json::json;

#[test]
fn api_error_message_prefers_google_error_message() {
    let body = r#"{"error": {"code": 403, "message": "The caller does not have permission"}}"#;
    assert_eq!(api_error_message(body), "The caller does not have permission");

    let oauth = r#"{"error": "invalid_grant", "error_description": "Invalid JWT Signature."}"#;
    assert_eq!(api_error_message(oauth), "Invalid JWT Signature.");

    assert_eq!(api_error_message("  bad gateway \n"), "bad gateway");
}

#[test]
fn version_codes_are_strings_on_the_wire() {
    let track: Track = serde_json::from_value(json!({
        "track": "beta",
        "releases": [{"versionCodes": ["12", 13], "status": "inProgress", "userFraction": 0.5}]
    }))
    .unwrap();
    assert_eq!(track.releases[0].version_codes, vec![12, 13]);
    assert_eq!(track.releases[0].status, ReleaseStatus::InProgress);

    let v = serde_json::to_value(&track).unwrap();
    assert_eq!(v["releases"][0]["versionCodes"], json!(["12", "13"]));
    assert!(v["releases"][0].get("releaseNotes").is_none());
}

#[test]
fn track_without_releases_deserializes() {
    let track: Track = serde_json::from_value(json!({"track": "alpha"})).unwrap();
    assert!(track.releases.is_empty());
    assert_eq!(describe_track(&track), "alpha: no releases");
}

#[test]
fn malformed_version_code_is_rejected() {
    let res: Result<Track, _> = serde_json::from_value(json!({
        "track": "beta",
        "releases": [{"versionCodes": ["abc"], "status": "completed"}]
    }));
    assert!(res.is_err());
}

#[test]
fn describe_track_lists_releases() {
    let mut staged = Release::new(vec![3, 4], ReleaseStatus::InProgress);
    staged.user_fraction = Some(0.25);
    staged.name = Some("1.2.0".into());
    let track = Track::new("production", vec![staged]);
    assert_eq!(
        describe_track(&track),
        "production:\n  1.2.0\tinProgress (25%)\t[3, 4]"
    );
}
