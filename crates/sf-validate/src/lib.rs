#![forbid(unsafe_code)]

//! Strict structural checks layered over the lenient parser.
//!
//! The parser accepts anything; [`validate`] reports what a well-formed
//! swimlane process should not contain. Nothing here mutates the process.

mod rule;

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use sf_core::{
    BusinessProcess, Diagnostic, DiagnosticCounts, FlowNode, NO_LABEL, NodeType, YES_LABEL,
    row_tag,
};
use tracing::debug;

pub use rule::Rule;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    #[must_use]
    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts::tally(&self.diagnostics)
    }

    /// No errors; with `strict`, no warnings either.
    #[must_use]
    pub fn is_valid(&self, strict: bool) -> bool {
        let counts = self.counts();
        counts.errors == 0 && (!strict || counts.warnings == 0)
    }

    pub fn violations(&self, rule: Rule) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.rule_id.as_deref() == Some(rule.id()))
    }

    #[must_use]
    pub fn has_violation(&self, rule: Rule) -> bool {
        self.violations(rule).next().is_some()
    }
}

#[must_use]
pub fn validate(process: &BusinessProcess) -> ValidationReport {
    let mut validator = Validator::new(process);
    validator.run();
    let report = ValidationReport {
        diagnostics: validator.diagnostics,
    };
    let counts = report.counts();
    debug!(
        "Validated process '{}': errors={}, warnings={}",
        process.title, counts.errors, counts.warnings
    );
    report
}

struct Validator<'a> {
    process: &'a BusinessProcess,
    node_by_id: FxHashMap<&'a str, &'a FlowNode>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Validator<'a> {
    fn new(process: &'a BusinessProcess) -> Self {
        let mut node_by_id = FxHashMap::default();
        for node in &process.nodes {
            node_by_id.entry(node.id.as_str()).or_insert(node);
        }
        Self {
            process,
            node_by_id,
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, rule: Rule, message: String, found: Option<&str>) {
        let mut diagnostic = Diagnostic::new(rule.severity(), message)
            .with_category(rule.category())
            .with_rule(rule.id());
        if let Some(found) = found {
            diagnostic = diagnostic.with_found(found);
        }
        self.diagnostics.push(diagnostic);
    }

    fn run(&mut self) {
        if self.process.nodes.is_empty() {
            self.report(Rule::NoNodes, "Process has no steps".to_string(), None);
        } else {
            self.check_start_and_end();
            self.check_rows();
            self.check_decisions();
            self.check_reachability();
        }
        self.check_edges();
        self.check_swimlanes();
        self.check_relations();
    }

    fn out_degree(&self, node_id: &str) -> usize {
        self.process.outgoing_edges(node_id).count()
    }

    fn check_start_and_end(&mut self) {
        let process = self.process;
        let starts: Vec<&FlowNode> = process
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Start)
            .collect();

        match starts.len() {
            0 => self.report(
                Rule::MissingStart,
                "Process has no start step (tag the first step #L1)".to_string(),
                None,
            ),
            1 => {}
            count => {
                let labels = starts
                    .iter()
                    .map(|n| n.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.report(
                    Rule::MultipleStarts,
                    format!("Process has {count} start steps: {labels}"),
                    None,
                );
            }
        }

        for start in starts {
            let out = self.out_degree(&start.id);
            if out != 1 {
                self.report(
                    Rule::StartFanOut,
                    format!(
                        "Start step '{}' has {out} outgoing connections; expected 1",
                        start.label
                    ),
                    Some(start.label.as_str()),
                );
            }
        }

        for node in &process.nodes {
            if node.node_type != NodeType::End {
                continue;
            }
            let out = self.out_degree(&node.id);
            if out > 0 {
                self.report(
                    Rule::EndHasOutgoing,
                    format!("End step '{}' has {out} outgoing connections", node.label),
                    Some(node.label.as_str()),
                );
            }
        }
    }

    fn check_rows(&mut self) {
        let process = self.process;
        let mut by_row: BTreeMap<i64, Vec<&FlowNode>> = BTreeMap::new();
        for node in &process.nodes {
            by_row.entry(node.row).or_default().push(node);
        }

        for (row, nodes) in &by_row {
            if nodes.len() > 1 {
                let labels = nodes
                    .iter()
                    .map(|n| n.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.report(
                    Rule::DuplicateRow,
                    format!(
                        "Row #L{} holds {} steps: {labels}",
                        row_tag(*row),
                        nodes.len()
                    ),
                    None,
                );
            }
        }

        let mut expected = 0_i64;
        for &row in by_row.keys() {
            if row != expected {
                let message = if expected == 0 {
                    format!("Rows start at #L{} instead of #L1", row_tag(row))
                } else {
                    format!("Rows jump from #L{expected} to #L{}", row_tag(row))
                };
                self.report(Rule::RowGap, message, None);
                break;
            }
            expected += 1;
        }
    }

    fn check_decisions(&mut self) {
        let process = self.process;
        for node in &process.nodes {
            if node.node_type != NodeType::Decision {
                continue;
            }
            let mut yes = 0;
            let mut no = 0;
            let mut other = 0;
            for edge in process.outgoing_edges(&node.id) {
                if edge.has_label(YES_LABEL) {
                    yes += 1;
                } else if edge.has_label(NO_LABEL) {
                    no += 1;
                } else {
                    other += 1;
                }
            }
            if yes != 1 || no != 1 || other != 0 {
                self.report(
                    Rule::DecisionBranches,
                    format!(
                        "Decision '{}' has {yes} YES, {no} NO and {other} other branches",
                        node.label
                    ),
                    Some(node.label.as_str()),
                );
            }
        }
    }

    fn check_reachability(&mut self) {
        let process = self.process;
        let mut queue: VecDeque<&str> = process
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Start)
            .map(|n| n.id.as_str())
            .collect();
        if queue.is_empty() {
            return;
        }

        let mut successors: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for edge in &process.edges {
            successors
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }

        let mut seen: FxHashSet<&str> = queue.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            for &next in successors.get(current).into_iter().flatten() {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        for node in &process.nodes {
            if !seen.contains(node.id.as_str()) {
                self.report(
                    Rule::Unreachable,
                    format!(
                        "Step '{}' (#L{}) cannot be reached from the start",
                        node.label,
                        row_tag(node.row)
                    ),
                    Some(node.label.as_str()),
                );
            }
        }
    }

    fn check_edges(&mut self) {
        let process = self.process;
        for edge in &process.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !self.node_by_id.contains_key(endpoint.as_str()) {
                    self.report(
                        Rule::DanglingEdge,
                        format!("Connection {} refers to missing step {endpoint}", edge.id),
                        Some(endpoint.as_str()),
                    );
                }
            }
        }
    }

    fn check_swimlanes(&mut self) {
        let process = self.process;
        let lane_ids: FxHashSet<&str> = process.swimlanes.iter().map(|s| s.id.as_str()).collect();
        for node in &process.nodes {
            if !lane_ids.contains(node.swimlane_id.as_str()) {
                self.report(
                    Rule::MissingSwimlane,
                    format!("Step '{}' is not on any declared swimlane", node.label),
                    Some(node.swimlane_id.as_str()),
                );
            }
        }

        let used: FxHashSet<&str> = process
            .nodes
            .iter()
            .map(|n| n.swimlane_id.as_str())
            .collect();
        let mut names: FxHashSet<&str> = FxHashSet::default();
        for lane in &process.swimlanes {
            if !used.contains(lane.id.as_str()) {
                self.report(
                    Rule::EmptySwimlane,
                    format!("Swimlane '{}' has no steps", lane.name),
                    Some(lane.name.as_str()),
                );
            }
            if !names.insert(lane.name.as_str()) {
                self.report(
                    Rule::DuplicateSwimlaneName,
                    format!("Swimlane name '{}' is used more than once", lane.name),
                    Some(lane.name.as_str()),
                );
            }
        }
    }

    fn check_relations(&mut self) {
        let process = self.process;
        let reports = process
            .reports
            .iter()
            .map(|r| (r.name.as_str(), r.related_node_ids.as_slice()));
        self.check_row_occupancy(Rule::CrowdedReportRow, "report", reports);
        let systems = process
            .related_systems
            .iter()
            .map(|s| (s.name.as_str(), s.related_node_ids.as_slice()));
        self.check_row_occupancy(Rule::CrowdedSystemRow, "system", systems);

        let relations = process
            .reports
            .iter()
            .map(|r| ("Report", r.name.as_str(), &r.related_node_ids))
            .chain(
                process
                    .related_systems
                    .iter()
                    .map(|s| ("System", s.name.as_str(), &s.related_node_ids)),
            )
            .chain(
                process
                    .related_documents
                    .iter()
                    .map(|d| ("Document", d.name.as_str(), &d.related_node_ids)),
            );
        for (kind, name, related) in relations {
            for node_id in related {
                if !self.node_by_id.contains_key(node_id.as_str()) {
                    self.report(
                        Rule::DanglingRelation,
                        format!("{kind} '{name}' refers to missing step {node_id}"),
                        Some(node_id.as_str()),
                    );
                }
            }
        }
    }

    fn check_row_occupancy<'r>(
        &mut self,
        rule: Rule,
        kind: &str,
        relations: impl Iterator<Item = (&'r str, &'r [String])>,
    ) {
        let mut names_by_row: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
        for (name, related) in relations {
            let rows: FxHashSet<i64> = related
                .iter()
                .filter_map(|id| self.node_by_id.get(id.as_str()))
                .map(|node| node.row)
                .collect();
            for row in rows {
                names_by_row.entry(row).or_default().push(name);
            }
        }
        for (row, names) in names_by_row {
            if names.len() > 1 {
                self.report(
                    rule,
                    format!(
                        "Row #L{} has {} {kind}s attached: {}",
                        row_tag(row),
                        names.len(),
                        names.join(", ")
                    ),
                    None,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Rule, validate};
    use sf_core::{BusinessProcess, NO_LABEL, NewNode, NodeType, SequentialIds, YES_LABEL};
    use sf_parser::{SAMPLE_MARKDOWN, parse_process_markdown};

    fn linear() -> BusinessProcess {
        parse_process_markdown(
            "## Dept\nA\n## Process\n#P1 #L1 A s\nNext: P2\n#P2 #L2 A m\nNext: P3\n#P3 #L3 A e\n",
        )
    }

    fn fired(process: &BusinessProcess) -> Vec<&'static str> {
        let report = validate(process);
        Rule::ALL
            .into_iter()
            .filter(|rule| report.has_violation(*rule))
            .map(Rule::id)
            .collect()
    }

    #[test]
    fn linear_process_is_clean() {
        let report = validate(&linear());
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert!(report.is_valid(true));
    }

    #[test]
    fn empty_process_has_no_nodes_error() {
        let mut ids = SequentialIds::default();
        let process = BusinessProcess::new("empty", &mut ids);
        assert_eq!(fired(&process), vec!["V001"]);
        assert!(!validate(&process).is_valid(false));
    }

    #[test]
    fn untagged_process_has_no_start() {
        let process = parse_process_markdown("## Dept\nA\n## Process\n#P1 A s\nNext: P2\n#P2 A e\n");
        let rules = fired(&process);
        assert!(rules.contains(&"V002"));
        // Reachability needs a start to begin from.
        assert!(!rules.contains(&"V016"));
    }

    #[test]
    fn sample_only_reports_its_shared_row() {
        let process = parse_process_markdown(SAMPLE_MARKDOWN);
        let report = validate(&process);
        assert_eq!(fired(&process), vec!["V006"]);
        assert!(!report.has_violation(Rule::CrowdedSystemRow));
        assert!(!report.has_violation(Rule::MissingStart));
        assert!(!report.has_violation(Rule::DecisionBranches));
        assert!(!report.has_violation(Rule::Unreachable));
        assert!(!report.is_valid(false));
    }

    #[test]
    fn start_fan_out_and_end_outgoing() {
        let mut process = linear();
        let mut ids = SequentialIds::new("x");
        let start = process.nodes[0].id.clone();
        let middle = process.nodes[1].id.clone();
        let end = process.nodes[2].id.clone();
        process
            .add_edge(&start, &end, None, None, &mut ids)
            .expect("extra start edge");
        process
            .add_edge(&end, &middle, None, None, &mut ids)
            .expect("edge out of end");

        let rules = fired(&process);
        assert!(rules.contains(&"V004"));
        assert!(rules.contains(&"V005"));
    }

    #[test]
    fn row_gap_is_reported_once() {
        let process = parse_process_markdown(
            "## Dept\nA\n## Process\n#P1 #L1 A s\nNext: P2\n#P2 #L4 A m\nNext: P3\n#P3 #L6 A e\n",
        );
        let report = validate(&process);
        assert_eq!(report.violations(Rule::RowGap).count(), 1);
        assert!(report.is_valid(false));
        assert!(!report.is_valid(true));
    }

    #[test]
    fn decision_missing_no_branch() {
        let process = parse_process_markdown(
            "## Dept\nA\n## Process\n#P1 #L1 A s\nNext: P2\n#P2 #L2 A ok?\nYes: P3\n#P3 #L3 A e\n",
        );
        assert!(fired(&process).contains(&"V015"));
    }

    #[test]
    fn decision_with_both_branches_passes() {
        let mut ids = SequentialIds::default();
        let mut process = BusinessProcess::new("d", &mut ids);
        let lane = process.add_swimlane("L", &mut ids);
        let new = |label: &str, node_type, row| NewNode {
            node_type,
            label: label.to_string(),
            swimlane_id: lane.clone(),
            row,
            description: None,
        };
        let s = process.add_node(new("s", NodeType::Start, 0), &mut ids);
        let d = process.add_node(new("d", NodeType::Decision, 1), &mut ids);
        let e = process.add_node(new("e", NodeType::End, 2), &mut ids);
        process.add_edge(&s, &d, None, None, &mut ids).expect("s->d");
        process
            .add_edge(&d, &e, Some(YES_LABEL.to_string()), None, &mut ids)
            .expect("yes");
        process
            .add_edge(&d, &s, Some(NO_LABEL.to_string()), None, &mut ids)
            .expect("no");
        assert!(fired(&process).is_empty());
    }

    #[test]
    fn unreachable_and_lane_problems() {
        let process = parse_process_markdown(
            "## Dept\nA\nB\nA\n## Process\n#P1 #L1 A s\n#P2 #L2 A orphan\n",
        );
        let rules = fired(&process);
        assert!(rules.contains(&"V016"));
        assert!(rules.contains(&"V010"));
        assert!(rules.contains(&"V011"));
    }

    #[test]
    fn dangling_references_are_errors() {
        let mut process = linear();
        process.edges[0].target = "ghost".to_string();
        process.nodes[0].swimlane_id = "nowhere".to_string();
        let mut ids = SequentialIds::new("r");
        process.add_report("Slip", vec!["ghost".to_string()], &mut ids);

        let rules = fired(&process);
        assert!(rules.contains(&"V008"));
        assert!(rules.contains(&"V009"));
        assert!(rules.contains(&"V014"));
    }

    #[test]
    fn two_reports_on_one_row() {
        let mut process = linear();
        let mut ids = SequentialIds::new("r");
        let first = process.nodes[0].id.clone();
        process.add_report("A", vec![first.clone()], &mut ids);
        process.add_report("B", vec![first], &mut ids);
        let report = validate(&process);
        assert_eq!(report.violations(Rule::CrowdedReportRow).count(), 1);
        assert!(!report.has_violation(Rule::CrowdedSystemRow));
    }

    #[test]
    fn report_serializes_rule_ids() {
        let mut ids = SequentialIds::default();
        let process = BusinessProcess::new("empty", &mut ids);
        let json = serde_json::to_value(validate(&process)).expect("serialize report");
        assert_eq!(json["diagnostics"][0]["ruleId"], "V001");
        assert_eq!(json["diagnostics"][0]["severity"], "error");
    }

    #[test]
    fn maximal_rows_saturate_in_messages() {
        let process: BusinessProcess = serde_json::from_str(
            r##"{
                "id": "p",
                "title": "T",
                "swimlanes": [{"id": "s1", "name": "A", "color": "#E8F5E9"}],
                "nodes": [
                    {"id": "n1", "type": "start", "label": "s", "swimlaneId": "s1", "row": 9223372036854775807},
                    {"id": "n2", "type": "end", "label": "e", "swimlaneId": "s1", "row": 9223372036854775807}
                ],
                "edges": [],
                "reports": [
                    {"id": "r1", "name": "A", "relatedNodeIds": ["n1"]},
                    {"id": "r2", "name": "B", "relatedNodeIds": ["n2"]}
                ]
            }"##,
        )
        .expect("deserialize process");
        let report = validate(&process);

        let tag = format!("#L{}", i64::MAX);
        for rule in [
            Rule::DuplicateRow,
            Rule::RowGap,
            Rule::Unreachable,
            Rule::CrowdedReportRow,
        ] {
            let diagnostic = report
                .violations(rule)
                .next()
                .unwrap_or_else(|| panic!("{} should fire", rule.id()));
            assert!(diagnostic.message.contains(&tag), "{}", diagnostic.message);
        }
    }
}
