//! Request and response shapes of the Android Publisher v3 API.
//!
//! Only the fields this tool reads or writes are modelled. Version codes
//! travel as decimal strings on the wire and are `i64` everywhere else.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time_seconds: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub track: String,
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl Track {
    pub fn new(name: impl Into<String>, releases: Vec<Release>) -> Self {
        Self {
            track: name.into(),
            releases,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseStatus {
    Draft,
    InProgress,
    Halted,
    Completed,
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReleaseStatus::Draft => "draft",
            ReleaseStatus::InProgress => "inProgress",
            ReleaseStatus::Halted => "halted",
            ReleaseStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, with = "version_codes")]
    pub version_codes: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_fraction: Option<f64>,
    pub status: ReleaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<Vec<LocalizedText>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app_update_priority: Option<u8>,
}

impl Release {
    pub fn new(version_codes: Vec<i64>, status: ReleaseStatus) -> Self {
        Self {
            name: None,
            version_codes,
            user_fraction: None,
            status,
            release_notes: None,
            in_app_update_priority: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalizedText {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

impl Listing {
    pub fn has_text(&self) -> bool {
        self.title.is_some()
            || self.short_description.is_some()
            || self.full_description.is_some()
            || self.video.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedApk {
    pub version_code: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedBundle {
    pub version_code: i64,
    #[serde(default)]
    pub sha256: Option<String>,
}

/// Serde adapter for `versionCodes`: strings on the wire, integers in memory.
mod version_codes {
    use serde::{Deserialize, Deserializer, Serializer, de::Error, ser::SerializeSeq};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Num(i64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(codes: &[i64], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(codes.len()))?;
        for code in codes {
            seq.serialize_element(&code.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
        let raw: Vec<Code> = Vec::deserialize(d)?;
        raw.into_iter()
            .map(|c| match c {
                Code::Num(n) => Ok(n),
                Code::Str(s) => s
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| D::Error::custom(format!("invalid version code '{}'", s))),
            })
            .collect()
    }
}
