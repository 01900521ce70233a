//! Computing the version codes a track should carry after an upload.
//!
//! Existing codes survive unless the caller asks for them to go: `All`
//! replaces the whole set, `List` removes specific codes and `Expression`
//! removes codes whose decimal form fully matches a pattern. Newly uploaded
//! codes are appended in order, skipping any already present.

use anyhow::Result;
use clap::ValueEnum;
use log::debug;
use regex::Regex;

use crate::{
    error::PublishError,
    play::{EditContext, GooglePlayClient},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FilterType {
    /// Replace every existing version code
    #[default]
    All,
    /// Remove the version codes given in the replace list
    List,
    /// Remove version codes matching the replace expression
    Expression,
}

#[derive(Debug, Clone)]
pub enum VersionCodeFilter {
    All,
    List(Vec<i64>),
    Expression(Regex),
}

impl VersionCodeFilter {
    pub fn from_inputs(
        kind: FilterType,
        replace_list: Option<&str>,
        replace_expression: Option<&str>,
    ) -> Result<Self, PublishError> {
        match kind {
            FilterType::All => Ok(Self::All),
            FilterType::List => Ok(Self::List(parse_replace_list(
                replace_list.unwrap_or_default(),
            )?)),
            FilterType::Expression => {
                Self::expression(replace_expression.unwrap_or_default())
            }
        }
    }

    /// Anchors `expr` so it has to match a whole version code.
    pub fn expression(expr: &str) -> Result<Self, PublishError> {
        Regex::new(&format!("^(?:{})$", expr))
            .map(Self::Expression)
            .map_err(|source| PublishError::InvalidExpression {
                expr: expr.to_string(),
                source,
            })
    }

    fn removes(&self, code: i64) -> bool {
        match self {
            Self::All => true,
            Self::List(list) => list.contains(&code),
            Self::Expression(re) => re.is_match(&code.to_string()),
        }
    }
}

/// Parses a comma separated list of positive version codes. Every bad
/// token is reported, not just the first; blank tokens count as bad.
pub fn parse_replace_list(input: &str) -> Result<Vec<i64>, PublishError> {
    let mut codes = Vec::new();
    let mut invalid = Vec::new();
    for token in input.split(',').map(str::trim) {
        match token.parse::<i64>() {
            Ok(code) if code > 0 => codes.push(code),
            _ => invalid.push(token.to_string()),
        }
    }
    if !invalid.is_empty() {
        return Err(PublishError::InvalidVersionCodes(invalid));
    }
    Ok(codes)
}

pub fn reconcile_version_codes(
    existing: &[i64],
    new: &[i64],
    filter: &VersionCodeFilter,
) -> Vec<i64> {
    let mut result: Vec<i64> = Vec::with_capacity(existing.len() + new.len());
    for &code in existing {
        if !filter.removes(code) && !result.contains(&code) {
            result.push(code);
        }
    }
    for &code in new {
        if !result.contains(&code) {
            result.push(code);
        }
    }
    result
}

/// Like [`reconcile_version_codes`], reading the existing codes from the
/// track's first release when the filter keeps any of them.
pub async fn resolve_track_version_codes(
    client: &GooglePlayClient,
    ctx: &EditContext,
    track: &str,
    new: &[i64],
    filter: &VersionCodeFilter,
) -> Result<Vec<i64>> {
    if matches!(filter, VersionCodeFilter::All) {
        return Ok(reconcile_version_codes(&[], new, filter));
    }
    let current = client.get_track(ctx, track).await?;
    let existing = current
        .releases
        .first()
        .map(|r| r.version_codes.clone())
        .unwrap_or_default();
    debug!("Track {} currently holds {:?}", track, existing);
    Ok(reconcile_version_codes(&existing, new, filter))
}
