//! Line-level recognizers for the process dialect.

use std::sync::LazyLock;

use regex::Regex;

/// `#P<n> [#L<m>] <dept> <label>`
static PROCESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(P[0-9]+)(?:\s+#L([0-9]+))?\s+(\S+)\s+(.+)$")
        .expect("process line pattern compiles")
});

/// `<name> #L: <rows>`
static RELATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s+#L:\s+(.+)$").expect("relation line pattern compiles")
});

pub(crate) const TITLE_MARKER: &str = "# BusinessProcessName";
pub(crate) const SECTION_PREFIX: &str = "## ";
pub(crate) const ROW_LIST_MARKER: &str = "#L:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Section {
    #[default]
    None,
    Title,
    Description,
    Dept,
    Process,
    Reports,
    Systems,
}

impl Section {
    /// Section named by a `## <name>` header. Matching is exact and case-sensitive.
    pub(crate) fn from_header(name: &str) -> Option<Self> {
        match name {
            "Description" => Some(Self::Description),
            "Dept" => Some(Self::Dept),
            "Process" => Some(Self::Process),
            "Reports" => Some(Self::Reports),
            "Systems" => Some(Self::Systems),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StepLine<'a> {
    pub(crate) key: &'a str,
    /// Raw `#L` digits; `None` when the tag is absent.
    pub(crate) row_tag: Option<&'a str>,
    pub(crate) dept: &'a str,
    pub(crate) label: &'a str,
}

pub(crate) fn match_step_line(line: &str) -> Option<StepLine<'_>> {
    let caps = PROCESS_LINE.captures(line)?;
    Some(StepLine {
        key: caps.get(1)?.as_str(),
        row_tag: caps.get(2).map(|m| m.as_str()),
        dept: caps.get(3)?.as_str().trim(),
        label: caps.get(4)?.as_str().trim(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Connection {
    Next,
    Yes,
    No,
}

impl Connection {
    pub(crate) const fn prefix(self) -> &'static str {
        match self {
            Self::Next => "Next:",
            Self::Yes => "Yes:",
            Self::No => "No:",
        }
    }
}

/// `Next: P2`, `Yes: P3`, `No: P4`. The target is trimmed and may be empty.
pub(crate) fn match_connection(line: &str) -> Option<(Connection, &str)> {
    [Connection::Next, Connection::Yes, Connection::No]
        .into_iter()
        .find_map(|kind| {
            line.strip_prefix(kind.prefix())
                .map(|target| (kind, target.trim()))
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RelationLine<'a> {
    pub(crate) name: &'a str,
    pub(crate) rows: Vec<&'a str>,
}

pub(crate) fn match_relation_line(line: &str) -> Option<RelationLine<'_>> {
    let caps = RELATION_LINE.captures(line)?;
    let name = caps.get(1)?.as_str().trim();
    let rows = caps.get(2)?.as_str().split(',').map(str::trim).collect();
    Some(RelationLine { name, rows })
}

/// Reads an optionally signed integer prefix, ignoring leading whitespace and
/// anything after the digits: `" 7"` and `"7th"` are 7, `"none"` is `None`.
pub(crate) fn parse_leading_int(raw: &str) -> Option<i64> {
    let text = raw.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}
