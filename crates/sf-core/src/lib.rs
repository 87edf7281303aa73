#![forbid(unsafe_code)]

mod config;
mod edit;
mod ids;

pub use config::{DialectConfig, Locale, UnknownLocale};
pub use edit::{EdgeUpdate, EditError, MoveDirection, NewNode, NodeUpdate, RelationUpdate};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};

use serde::{Deserialize, Serialize};

/// Label carried by the affirmative branch of a decision node.
pub const YES_LABEL: &str = "YES";
/// Label carried by the negative branch of a decision node.
pub const NO_LABEL: &str = "NO";

/// One-based `#L` number written for a zero-based `row`; saturates at `i64::MAX`.
#[must_use]
pub const fn row_tag(row: i64) -> i64 {
    row.saturating_add(1)
}

/// Swimlane background colors, assigned cyclically by creation order.
pub const SWIMLANE_PALETTE: [&str; 8] = [
    "#E8F5E9", "#E3F2FD", "#FFF3E0", "#F3E5F5", "#E0F7FA", "#FBE9E7", "#F1F8E9", "#E8EAF6",
];

/// Palette color for the swimlane created at `index`.
#[must_use]
pub const fn swimlane_color(index: usize) -> &'static str {
    SWIMLANE_PALETTE[index % SWIMLANE_PALETTE.len()]
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Process,
    Decision,
    Start,
    End,
    Document,
    Subprocess,
}

impl NodeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Decision => "decision",
            Self::Start => "start",
            Self::End => "end",
            Self::Document => "document",
            Self::Subprocess => "subprocess",
        }
    }
}

/// Presentation hint for an edge. Never read from or written to markdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    #[serde(rename = "default")]
    Plain,
    Approval,
    Rejection,
}

impl EdgeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "default",
            Self::Approval => "approval",
            Self::Rejection => "rejection",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Swimlane {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    pub swimlane_id: String,
    /// Zero-based vertical position. `#L<m>` in markdown maps to `m - 1`.
    pub row: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EdgeKind>,
}

impl FlowEdge {
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.label.as_deref() == Some(label)
    }

    #[must_use]
    pub fn is_unlabeled(&self) -> bool {
        self.label.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub related_node_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSystem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub related_node_ids: Vec<String>,
}

/// Legacy attachment kept for interactive editing; markdown never carries it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RelatedDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub related_node_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<i64>,
}

/// Aggregate root of one swimlane diagram.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusinessProcess {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub swimlanes: Vec<Swimlane>,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub related_systems: Vec<RelatedSystem>,
    #[serde(default)]
    pub related_documents: Vec<RelatedDocument>,
}

impl BusinessProcess {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn swimlane(&self, id: &str) -> Option<&Swimlane> {
        self.swimlanes.iter().find(|s| s.id == id)
    }

    /// First swimlane whose name matches exactly.
    #[must_use]
    pub fn swimlane_by_name(&self, name: &str) -> Option<&Swimlane> {
        self.swimlanes.iter().find(|s| s.name == name)
    }

    /// First node, in list order, sitting on `row`.
    #[must_use]
    pub fn node_at_row(&self, row: i64) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.row == row)
    }

    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a FlowEdge> {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a FlowEdge> {
        self.edges.iter().filter(move |e| e.target == node_id)
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Hint,
    #[default]
    Info,
    /// Input was accepted but something was dropped or defaulted
    Warning,
    /// The process breaks a structural rule
    Error,
}

impl DiagnosticSeverity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hint => "hint",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Category of diagnostic for filtering and grouping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    /// Line did not match the dialect
    #[default]
    Syntax,
    /// `Next`/`Yes`/`No`, department or row reference that did not resolve
    Reference,
    /// Shape of the flow graph (start/end, rows, reachability)
    Structure,
    /// Reports and systems attached to rows
    Relation,
}

impl DiagnosticCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Reference => "reference",
            Self::Structure => "structure",
            Self::Relation => "relation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub category: DiagnosticCategory,
    pub message: String,
    /// 1-based source line, when the diagnostic came from markdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Stable rule identifier (validator only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Info, message)
    }

    #[must_use]
    pub fn with_category(mut self, category: DiagnosticCategory) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, DiagnosticSeverity::Error)
    }

    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self.severity, DiagnosticSeverity::Warning)
    }
}

/// Counts of diagnostics by severity level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticCounts {
    pub hints: usize,
    pub infos: usize,
    pub warnings: usize,
    pub errors: usize,
}

impl DiagnosticCounts {
    #[must_use]
    pub fn tally(diagnostics: &[Diagnostic]) -> Self {
        let mut counts = Self::default();
        for diag in diagnostics {
            match diag.severity {
                DiagnosticSeverity::Hint => counts.hints += 1,
                DiagnosticSeverity::Info => counts.infos += 1,
                DiagnosticSeverity::Warning => counts.warnings += 1,
                DiagnosticSeverity::Error => counts.errors += 1,
            }
        }
        counts
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.hints + self.infos + self.warnings + self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BusinessProcess, Diagnostic, DiagnosticCategory, DiagnosticCounts, DiagnosticSeverity,
        EdgeKind, FlowEdge, FlowNode, NodeType, SWIMLANE_PALETTE, swimlane_color,
    };

    #[test]
    fn palette_cycles_by_index() {
        assert_eq!(swimlane_color(0), "#E8F5E9");
        assert_eq!(swimlane_color(7), "#E8EAF6");
        assert_eq!(swimlane_color(8), swimlane_color(0));
        assert_eq!(swimlane_color(19), SWIMLANE_PALETTE[3]);
    }

    #[test]
    fn node_type_string_mapping_is_stable() {
        assert_eq!(NodeType::Start.as_str(), "start");
        assert_eq!(NodeType::Subprocess.as_str(), "subprocess");
        assert_eq!(EdgeKind::Plain.as_str(), "default");
    }

    #[test]
    fn model_serializes_with_designer_field_names() {
        let node = FlowNode {
            id: "n1".to_string(),
            node_type: NodeType::Decision,
            label: "Check".to_string(),
            swimlane_id: "s1".to_string(),
            row: 2,
            description: None,
        };
        let json = serde_json::to_value(&node).expect("serialize node");
        assert_eq!(json["type"], "decision");
        assert_eq!(json["swimlaneId"], "s1");
        assert!(json.get("description").is_none());

        let edge = FlowEdge {
            id: "e1".to_string(),
            source: "n1".to_string(),
            target: "n2".to_string(),
            label: Some("YES".to_string()),
            kind: Some(EdgeKind::Approval),
        };
        let json = serde_json::to_value(&edge).expect("serialize edge");
        assert_eq!(json["type"], "approval");
        assert_eq!(json["label"], "YES");
    }

    #[test]
    fn process_deserializes_without_optional_lists() {
        let process: BusinessProcess =
            serde_json::from_str(r#"{"id":"p","title":"T","swimlanes":[],"nodes":[],"edges":[]}"#)
                .expect("deserialize process");
        assert_eq!(process.title, "T");
        assert!(process.description.is_empty());
        assert!(process.reports.is_empty());
        assert!(process.related_documents.is_empty());
    }

    #[test]
    fn edge_kind_default_round_trips_as_default() {
        let encoded = serde_json::to_string(&EdgeKind::Plain).expect("serialize kind");
        assert_eq!(encoded, "\"default\"");
        let decoded: EdgeKind = serde_json::from_str("\"rejection\"").expect("deserialize kind");
        assert_eq!(decoded, EdgeKind::Rejection);
    }

    #[test]
    fn diagnostic_builder_pattern() {
        let diag = Diagnostic::warning("dangling reference")
            .with_category(DiagnosticCategory::Reference)
            .at_line(7)
            .with_rule("V008")
            .with_suggestion("point Next at an existing P number")
            .with_found("P99");

        assert_eq!(diag.severity, DiagnosticSeverity::Warning);
        assert_eq!(diag.category, DiagnosticCategory::Reference);
        assert_eq!(diag.line, Some(7));
        assert_eq!(diag.rule_id.as_deref(), Some("V008"));
        assert_eq!(diag.found.as_deref(), Some("P99"));
        assert!(diag.is_warning());
        assert!(!diag.is_error());
    }

    #[test]
    fn diagnostic_counts_tally_by_severity() {
        let diags = vec![
            Diagnostic::warning("w1"),
            Diagnostic::warning("w2"),
            Diagnostic::error("e1"),
            Diagnostic::info("i1"),
        ];
        let counts = DiagnosticCounts::tally(&diags);
        assert_eq!(counts.warnings, 2);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.infos, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn lookups_find_first_match_in_list_order() {
        let process = BusinessProcess {
            nodes: vec![
                FlowNode {
                    id: "a".to_string(),
                    row: 1,
                    ..FlowNode::default()
                },
                FlowNode {
                    id: "b".to_string(),
                    row: 1,
                    ..FlowNode::default()
                },
            ],
            edges: vec![FlowEdge {
                id: "e".to_string(),
                source: "a".to_string(),
                target: "b".to_string(),
                ..FlowEdge::default()
            }],
            ..BusinessProcess::default()
        };
        assert_eq!(process.node_at_row(1).map(|n| n.id.as_str()), Some("a"));
        assert_eq!(process.outgoing_edges("a").count(), 1);
        assert_eq!(process.incoming_edges("b").count(), 1);
        assert!(process.node("missing").is_none());
    }
}
