use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use super::types::{Header, UriReference, WebrevMetadata, WebrevStats};
use super::WebrevError;

pub const PATCH_KEY: &str = "Patch of changes";
pub const CHANGESET_KEY: &str = "Changeset";
pub const AUTHOR_KEY: &str = "Prepared by";
pub const BRANCH_KEY: &str = "Branch";
pub const SUMMARY_KEY: &str = "Summary of changes";
pub const WORKSPACE_KEY: &str = "Workspace";
pub const REPOSITORY_KEY: &str = "Repository";
pub const COMPARE_AGAINST_KEY: &str = "Compare against";
pub const COMPARE_AGAINST_VERSION_KEY: &str = "Compare against version";
pub const COMPARE_AGAINST_REVISION_KEY: &str = "Compare against revision";

static PATCH_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href=".*">(?P<name>.*\.patch)</a>"#).expect("patch link pattern is valid")
});

static CHANGESET_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<a href=".*">(?P<name>.*\.changeset)</a>"#)
        .expect("changeset link pattern is valid")
});

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?P<lines_changed>\d+) lines? changed:",
        r" (?P<insertions>\d+) ins;",
        r" (?P<deletions>\d+) del;",
        r" (?P<modifications>\d+) mod;",
        r" (?P<unchanged>\d+) unchg",
    ))
    .expect("summary pattern is valid")
});

/// Interpret a header mapping as webrev metadata.
///
/// Every field is derived independently: a missing key or a value that does
/// not match its grammar leaves that field `None`. The only hard failure is a
/// "Repository" value that is not a URI reference; relative references such
/// as a local path are kept as written.
pub fn parse(header: &Header, source_uri: &Url) -> Result<WebrevMetadata, WebrevError> {
    let lookup = |key: &str| header.get(key).cloned();

    let repository_uri = match header.get(REPOSITORY_KEY) {
        Some(raw) => Some(UriReference::parse(raw).map_err(|source| {
            WebrevError::MalformedLocation {
                location: raw.clone(),
                source,
            }
        })?),
        None => None,
    };

    Ok(WebrevMetadata {
        source_uri: source_uri.clone(),
        branch: lookup(BRANCH_KEY),
        author: header.get(AUTHOR_KEY).and_then(|v| parse_author(v)),
        summary: header.get(SUMMARY_KEY).and_then(|v| parse_summary(v)),
        workspace: lookup(WORKSPACE_KEY),
        repository_uri,
        compare_against: lookup(COMPARE_AGAINST_KEY),
        compare_against_version: lookup(COMPARE_AGAINST_VERSION_KEY),
        compare_against_revision: lookup(COMPARE_AGAINST_REVISION_KEY),
        patch_uri: header
            .get(PATCH_KEY)
            .and_then(|v| resolve_link(&PATCH_LINK, v, source_uri)),
        changeset_uri: header
            .get(CHANGESET_KEY)
            .and_then(|v| resolve_link(&CHANGESET_LINK, v, source_uri)),
    })
}

/// Parse a diff-stat sentence such as
/// `12 lines changed: 8 ins; 2 del; 2 mod; 0 unchg`.
pub fn parse_summary(value: &str) -> Option<WebrevStats> {
    let caps = SUMMARY.captures(value)?;
    let count = |name: &str| caps[name].parse::<u64>().ok();
    Some(WebrevStats {
        insertions: count("insertions")?,
        deletions: count("deletions")?,
        modifications: count("modifications")?,
        lines_changed: count("lines_changed")?,
    })
}

/// The preparer's id is the first token; the rest is usually an email address.
pub fn parse_author(value: &str) -> Option<String> {
    value.split_whitespace().next().map(str::to_string)
}

/// Resolve the link *text* of the anchor in `value` against `base`.
fn resolve_link(pattern: &Regex, value: &str, base: &Url) -> Option<Url> {
    let caps = pattern.captures(value)?;
    base.join(&caps["name"]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.com/webrev/").unwrap()
    }

    fn header(entries: &[(&str, &str)]) -> Header {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_reference_header() {
        let header = header(&[
            (PATCH_KEY, r#"<a href="x">foo.patch</a>"#),
            (AUTHOR_KEY, "alice foo@example.com"),
            (
                SUMMARY_KEY,
                "12 lines changed: 8 ins; 2 del; 2 mod; 0 unchg",
            ),
        ]);
        let metadata = parse(&header, &base()).unwrap();
        assert_eq!(
            metadata.patch_uri.as_ref().map(Url::as_str),
            Some("http://example.com/webrev/foo.patch")
        );
        assert_eq!(metadata.author.as_deref(), Some("alice"));
        assert_eq!(
            metadata.summary,
            Some(WebrevStats {
                insertions: 8,
                deletions: 2,
                modifications: 2,
                lines_changed: 12,
            })
        );
        assert_eq!(metadata.source_uri, base());
        assert!(metadata.branch.is_none());
        assert!(metadata.changeset_uri.is_none());
        assert!(metadata.repository_uri.is_none());
    }

    #[test]
    fn test_empty_header_yields_all_absent() {
        let metadata = parse(&Header::new(), &base()).unwrap();
        assert_eq!(
            metadata,
            WebrevMetadata {
                source_uri: base(),
                branch: None,
                author: None,
                summary: None,
                workspace: None,
                repository_uri: None,
                compare_against: None,
                compare_against_version: None,
                compare_against_revision: None,
                patch_uri: None,
                changeset_uri: None,
            }
        );
    }

    #[test]
    fn test_missing_key_does_not_affect_other_fields() {
        let full = header(&[
            (BRANCH_KEY, "master"),
            (WORKSPACE_KEY, "/home/alice/jdk"),
            (COMPARE_AGAINST_KEY, "https://github.com/openjdk/jdk"),
            (COMPARE_AGAINST_VERSION_KEY, "jdk-17+35"),
            (COMPARE_AGAINST_REVISION_KEY, "0123abcd"),
            (CHANGESET_KEY, r#"<a href="jdk.changeset">jdk.changeset</a>"#),
        ]);
        let complete = parse(&full, &base()).unwrap();

        for key in full.keys() {
            let mut partial = full.clone();
            partial.remove(key);
            let metadata = parse(&partial, &base()).unwrap();
            let mut expected = complete.clone();
            match key.as_str() {
                BRANCH_KEY => expected.branch = None,
                WORKSPACE_KEY => expected.workspace = None,
                COMPARE_AGAINST_KEY => expected.compare_against = None,
                COMPARE_AGAINST_VERSION_KEY => expected.compare_against_version = None,
                COMPARE_AGAINST_REVISION_KEY => expected.compare_against_revision = None,
                CHANGESET_KEY => expected.changeset_uri = None,
                other => panic!("unexpected key {other}"),
            }
            assert_eq!(metadata, expected, "removing {key}");
        }
    }

    #[test]
    fn test_unmatched_patch_value_is_absent() {
        let header = header(&[
            (PATCH_KEY, "no link here"),
            (BRANCH_KEY, "master"),
        ]);
        let metadata = parse(&header, &base()).unwrap();
        assert!(metadata.patch_uri.is_none());
        assert_eq!(metadata.branch.as_deref(), Some("master"));
    }

    #[test]
    fn test_link_text_not_href_is_resolved() {
        let header = header(&[(
            PATCH_KEY,
            r#"<a href="https://elsewhere.example/evil.patch">jdk.patch</a>"#,
        )]);
        let metadata = parse(&header, &base()).unwrap();
        assert_eq!(
            metadata.patch_uri.unwrap().as_str(),
            "http://example.com/webrev/jdk.patch"
        );
    }

    #[test]
    fn test_changeset_link_resolved() {
        let header = header(&[(
            CHANGESET_KEY,
            r#"<a href="open.changeset">open.changeset</a>"#,
        )]);
        let metadata = parse(&header, &base()).unwrap();
        assert_eq!(
            metadata.changeset_uri.unwrap().as_str(),
            "http://example.com/webrev/open.changeset"
        );
        assert!(metadata.patch_uri.is_none());
    }

    #[test]
    fn test_patch_resolution_is_repeatable() {
        let header = header(&[(PATCH_KEY, r#"<a href="x">foo.patch</a>"#)]);
        let first = parse(&header, &base()).unwrap().patch_uri.unwrap();
        let second = parse(&header, &base()).unwrap().patch_uri.unwrap();
        assert_eq!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_malformed_repository_is_an_error() {
        let header = header(&[(REPOSITORY_KEY, "not a uri"), (BRANCH_KEY, "master")]);
        let err = parse(&header, &base()).unwrap_err();
        assert!(matches!(err, WebrevError::MalformedLocation { .. }));
    }

    #[test]
    fn test_repository_uri_parsed() {
        let header = header(&[(REPOSITORY_KEY, "https://github.com/openjdk/jdk")]);
        let metadata = parse(&header, &base()).unwrap();
        assert_eq!(
            metadata.repository_uri.unwrap().as_str(),
            "https://github.com/openjdk/jdk"
        );
    }

    #[test]
    fn test_relative_repository_is_kept() {
        let header = header(&[
            (REPOSITORY_KEY, "/home/alice/jdk"),
            (PATCH_KEY, r#"<a href="x">foo.patch</a>"#),
        ]);
        let metadata = parse(&header, &base()).unwrap();
        assert_eq!(
            metadata.repository_uri,
            Some(UriReference::Relative("/home/alice/jdk".to_string()))
        );
        assert!(metadata.patch_uri.is_some());
    }

    #[test]
    fn test_parse_summary_singular_line() {
        let stats = parse_summary("1 line changed: 1 ins; 0 del; 0 mod; 40 unchg").unwrap();
        assert_eq!(stats.lines_changed, 1);
        assert_eq!(stats.insertions, 1);
    }

    #[test]
    fn test_parse_summary_keeps_inconsistent_total() {
        let stats = parse_summary("99 lines changed: 1 ins; 2 del; 3 mod; 4 unchg").unwrap();
        assert_eq!(
            stats,
            WebrevStats {
                insertions: 1,
                deletions: 2,
                modifications: 3,
                lines_changed: 99,
            }
        );
    }

    #[test]
    fn test_parse_summary_rejects_other_text() {
        assert!(parse_summary("lots of changes").is_none());
        assert!(parse_summary("12 lines changed: 8 ins; 2 del").is_none());
    }

    #[test]
    fn test_unparseable_summary_does_not_fail_parse() {
        let header = header(&[(SUMMARY_KEY, "garbage"), (AUTHOR_KEY, "bob")]);
        let metadata = parse(&header, &base()).unwrap();
        assert!(metadata.summary.is_none());
        assert_eq!(metadata.author.as_deref(), Some("bob"));
    }

    #[test]
    fn test_blank_author_is_absent() {
        assert_eq!(parse_author("   "), None);
        assert_eq!(parse_author("carol"), Some("carol".to_string()));
    }
}
