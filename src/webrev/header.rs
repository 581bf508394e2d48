use regex::Regex;
use std::sync::LazyLock;

use super::types::Header;

const TABLE_START: &str = "<table>";
const TABLE_END: &str = "</table>";

static HEADER_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<tr>\s*<th>\n?(?P<key>.*):\n?</th>\s*<td>\n?(?P<value>.*)\n?</td>\s*</tr>",
    )
    .expect("header row pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    BeforeTable,
    InTable,
    Done,
}

/// Forward-only scanner for the metadata table of a webrev index page.
///
/// Lines are pushed one at a time. Everything before the first line starting
/// with `<table>` is skipped; from that line up to (excluding) the first line
/// starting with `</table>`, rows of the form
/// `<tr><th>KEY:</th><td>VALUE</td></tr>` are collected. A repeated key
/// overwrites the earlier value.
#[derive(Debug)]
pub struct HeaderExtractor {
    phase: Phase,
    fields: Header,
}

impl HeaderExtractor {
    pub fn new() -> Self {
        Self {
            phase: Phase::BeforeTable,
            fields: Header::new(),
        }
    }

    /// Consume one line. Returns `false` once the end of the table has been
    /// seen and no further input is needed.
    pub fn feed(&mut self, line: &str) -> bool {
        if self.phase == Phase::BeforeTable {
            if !line.starts_with(TABLE_START) {
                return true;
            }
            self.phase = Phase::InTable;
        }

        if self.phase == Phase::Done {
            return false;
        }

        if line.starts_with(TABLE_END) {
            self.phase = Phase::Done;
            return false;
        }

        if let Some(caps) = HEADER_ROW.captures(line) {
            self.fields
                .insert(caps["key"].to_string(), caps["value"].to_string());
        }
        true
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn finish(self) -> Header {
        self.fields
    }
}

impl Default for HeaderExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the header table from a sequence of lines.
///
/// Stops pulling from `lines` as soon as the closing `</table>` is seen.
/// A document without a `<table>` line yields an empty mapping.
pub fn extract_header<I, S>(lines: I) -> Header
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut extractor = HeaderExtractor::new();
    for line in lines {
        if !extractor.feed(line.as_ref()) {
            break;
        }
    }
    extractor.finish()
}

/// Splits a stream of byte chunks into lines without buffering more than the
/// current partial line.
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(decode_line(&self.pending));
            self.pending.clear();
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
        lines
    }

    /// The trailing line of a body that does not end in a newline.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(decode_line(&self.pending))
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
