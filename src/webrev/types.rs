use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use url::Url;

use super::LocationError;

/// Raw metadata table of a webrev index page: label (without the trailing
/// colon) to the untouched cell contents.
pub type Header = HashMap<String, String>;

/// Metadata extracted from the header table of a webrev index page.
/// Built once by `metadata::parse` and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebrevMetadata {
    /// Sanitized location of the webrev (no trailing `index.html`)
    pub source_uri: Url,
    /// Branch the change was prepared against
    pub branch: Option<String>,
    /// First token of the "Prepared by" field
    pub author: Option<String>,
    /// Parsed diff-stat sentence
    pub summary: Option<WebrevStats>,
    pub workspace: Option<String>,
    /// Upstream repository the change targets
    pub repository_uri: Option<UriReference>,
    pub compare_against: Option<String>,
    pub compare_against_version: Option<String>,
    /// Exact revision the diff was computed against
    pub compare_against_revision: Option<String>,
    /// Downloadable patch, resolved against `source_uri`
    pub patch_uri: Option<Url>,
    /// Downloadable changeset, resolved against `source_uri`
    pub changeset_uri: Option<Url>,
}

/// A URI reference: either an absolute URI or a relative one such as a
/// local path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UriReference {
    Absolute(Url),
    Relative(String),
}

impl UriReference {
    pub fn parse(raw: &str) -> Result<Self, LocationError> {
        if let Some(c) = raw.chars().find(|&c| !is_uri_char(c)) {
            return Err(LocationError::IllegalCharacter(c));
        }
        match Url::parse(raw) {
            Ok(url) => Ok(UriReference::Absolute(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(UriReference::Relative(raw.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UriReference::Absolute(url) => url.as_str(),
            UriReference::Relative(raw) => raw,
        }
    }
}

impl fmt::Display for UriReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unreserved, reserved and escape characters, plus non-ASCII letters.
fn is_uri_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || "-._~:/?#[]@!$&'()*+,;=%".contains(c)
        || (!c.is_ascii() && !c.is_control() && !c.is_whitespace())
}

/// Counts from the "Summary of changes" sentence.
///
/// `lines_changed` is the total as printed by the webrev; it is not checked
/// against the other counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WebrevStats {
    pub insertions: u64,
    pub deletions: u64,
    pub modifications: u64,
    pub lines_changed: u64,
}
