use serde_json::Value;

use crate::model::Track;

/// Reduces a Google API error body to its message, falling back to the raw text.
pub fn api_error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|v| v.get("error_description"))
                .and_then(|m| m.as_str())
        })
        .or_else(|| error.and_then(|e| e.as_str()))
        .map(|s| s.to_string())
        .unwrap_or_else(|| body.trim().to_string())
}

pub fn format_version_codes(codes: &[i64]) -> String {
    codes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per release: status, fraction and version codes.
pub fn describe_track(track: &Track) -> String {
    if track.releases.is_empty() {
        return format!("{}: no releases", track.track);
    }
    let mut lines = vec![format!("{}:", track.track)];
    for r in &track.releases {
        let fraction = r
            .user_fraction
            .map(|f| format!(" ({:.0}%)", f * 100.0))
            .unwrap_or_default();
        let name = r.name.as_deref().unwrap_or("-");
        lines.push(format!(
            "  {}\t{}{}\t[{}]",
            name,
            r.status,
            fraction,
            format_version_codes(&r.version_codes)
        ));
    }
    lines.join("\n")
}
