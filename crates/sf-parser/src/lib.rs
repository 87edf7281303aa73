#![forbid(unsafe_code)]

mod builder;
mod line;
mod sample;

use serde::Serialize;
use serde_json::json;
use sf_core::{
    BusinessProcess, DialectConfig, Diagnostic, DiagnosticCategory, DiagnosticCounts, IdGenerator,
    UuidGenerator,
};

pub use sample::SAMPLE_MARKDOWN;

use builder::ProcessBuilder;
use line::{
    ROW_LIST_MARKER, SECTION_PREFIX, Section, TITLE_MARKER, match_connection, match_relation_line,
    match_step_line,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub process: BusinessProcess,
    /// Everything the parser skipped or repaired, in source order per pass.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    #[must_use]
    pub fn counts(&self) -> DiagnosticCounts {
        DiagnosticCounts::tally(&self.diagnostics)
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_warning)
    }
}

/// Parses a process document into a graph, discarding diagnostics.
///
/// Never fails: malformed or unrecognized lines are skipped.
#[must_use]
pub fn parse_process_markdown(input: &str) -> BusinessProcess {
    parse(input).process
}

/// Parses with the default dialect and random UUID ids.
#[must_use]
pub fn parse(input: &str) -> ParseResult {
    parse_with(input, &DialectConfig::default(), &mut UuidGenerator)
}

/// Parses with explicit placeholders, palette and id source.
///
/// Ids are drawn in a fixed order: swimlanes, nodes, edges, reports,
/// systems, then the process itself.
pub fn parse_with(
    input: &str,
    config: &DialectConfig,
    ids: &mut dyn IdGenerator,
) -> ParseResult {
    let mut builder = ProcessBuilder::new(config);
    if input.trim().is_empty() {
        builder.push_diagnostic(Diagnostic::info("Input was empty; returning an empty process"));
        return builder.finish(ids);
    }

    let mut section = Section::None;
    let mut current_step: Option<String> = None;

    for (index, raw_line) in input.split('\n').enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(TITLE_MARKER) {
            section = Section::Title;
            continue;
        }

        if section == Section::Title && !line.starts_with('#') {
            builder.set_title(line);
            section = Section::None;
            continue;
        }

        if let Some(name) = line.strip_prefix(SECTION_PREFIX) {
            let name = name.trim();
            section = Section::from_header(name).unwrap_or_else(|| {
                builder.push_diagnostic(
                    Diagnostic::warning(format!(
                        "Line {line_no}: unknown section '{name}'; following lines ignored"
                    ))
                    .at_line(line_no)
                    .with_found(name)
                    .with_suggestion("Use Description, Dept, Process, Reports or Systems"),
                );
                Section::None
            });
            continue;
        }

        match section {
            Section::None | Section::Title => {
                builder.skip_line(line_no, line, "text outside any section");
            }
            Section::Description => {
                if line.starts_with('#') {
                    builder.skip_line(line_no, line, "heading inside Description");
                } else {
                    builder.push_description(line);
                }
            }
            Section::Dept => {
                if line.starts_with('#') {
                    builder.skip_line(line_no, line, "heading inside Dept");
                } else {
                    builder.push_dept(line);
                }
            }
            Section::Process => {
                handle_process_line(&mut builder, &mut current_step, line, line_no);
            }
            Section::Reports | Section::Systems => {
                if line.starts_with('#') || !line.contains(ROW_LIST_MARKER) {
                    builder.skip_line(line_no, line, "expected '<name> #L: <rows>'");
                    continue;
                }
                let Some(relation) = match_relation_line(line) else {
                    builder.skip_line(line_no, line, "malformed row list");
                    continue;
                };
                if section == Section::Reports {
                    builder.push_report(relation.name, &relation.rows, line_no);
                } else {
                    builder.push_system(relation.name, &relation.rows, line_no);
                }
            }
        }
    }

    builder.finish(ids)
}

fn handle_process_line(
    builder: &mut ProcessBuilder<'_>,
    current_step: &mut Option<String>,
    line: &str,
    line_no: usize,
) {
    if line.starts_with("#P") {
        match match_step_line(line) {
            Some(step) => {
                builder.open_step(&step, line_no);
                *current_step = Some(step.key.to_string());
            }
            None => builder.skip_line(
                line_no,
                line,
                "expected '#P<n> [#L<m>] <department> <label>'",
            ),
        }
        return;
    }

    let Some((kind, target)) = match_connection(line) else {
        builder.skip_line(line_no, line, "unrecognized line in Process");
        return;
    };
    match current_step.as_deref() {
        Some(key) => builder.connect(key, kind, target),
        None => builder.push_diagnostic(
            Diagnostic::warning(format!(
                "Line {line_no}: '{}' appears before any step; line ignored",
                kind.prefix()
            ))
            .with_category(DiagnosticCategory::Structure)
            .at_line(line_no)
            .with_found(line),
        ),
    }
}

#[must_use]
pub fn parse_summary_json(parsed: &ParseResult) -> String {
    let process = &parsed.process;
    let counts = parsed.counts();
    json!({
        "title": process.title,
        "swimlane_count": process.swimlanes.len(),
        "node_count": process.nodes.len(),
        "edge_count": process.edges.len(),
        "report_count": process.reports.len(),
        "system_count": process.related_systems.len(),
        "warning_count": counts.warnings,
        "warnings": parsed
            .diagnostics
            .iter()
            .map(|d| d.message.clone())
            .collect::<Vec<_>>(),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::{SAMPLE_MARKDOWN, parse, parse_process_markdown, parse_summary_json, parse_with};
    use proptest::prelude::*;
    use sf_core::{
        BusinessProcess, DialectConfig, DiagnosticCategory, NO_LABEL, NodeType, SWIMLANE_PALETTE,
        SequentialIds, YES_LABEL,
    };

    fn parse_seq(input: &str) -> BusinessProcess {
        parse_with(input, &DialectConfig::default(), &mut SequentialIds::new("id")).process
    }

    fn label_of<'a>(process: &'a BusinessProcess, id: &str) -> &'a str {
        process.node(id).map_or("", |n| n.label.as_str())
    }

    const TWO_STEPS: &str = "# BusinessProcessName\nX\n\n## Dept\nA\n\n## Process\n#P1 #L1 A Start\nNext: P2\n\n#P2 #L2 A Done\n";

    #[test]
    fn two_step_document() {
        let process = parse_seq(TWO_STEPS);
        assert_eq!(process.title, "X");
        assert_eq!(process.swimlanes.len(), 1);
        assert_eq!(process.swimlanes[0].name, "A");
        assert_eq!(process.swimlanes[0].color, SWIMLANE_PALETTE[0]);

        assert_eq!(process.nodes.len(), 2);
        let start = &process.nodes[0];
        let done = &process.nodes[1];
        assert_eq!((start.node_type, start.row), (NodeType::Start, 0));
        assert_eq!((done.node_type, done.row), (NodeType::End, 1));
        assert_eq!(start.swimlane_id, process.swimlanes[0].id);

        assert_eq!(process.edges.len(), 1);
        assert_eq!(process.edges[0].source, start.id);
        assert_eq!(process.edges[0].target, done.id);
        assert!(process.edges[0].is_unlabeled());
    }

    #[test]
    fn ids_follow_fixed_draw_order() {
        let process = parse_seq(TWO_STEPS);
        assert_eq!(process.swimlanes[0].id, "id-1");
        assert_eq!(process.nodes[0].id, "id-2");
        assert_eq!(process.nodes[1].id, "id-3");
        assert_eq!(process.edges[0].id, "id-4");
        assert_eq!(process.id, "id-5");
    }

    #[test]
    fn classification_uses_references_and_row_tag() {
        let input = "## Dept\nA\n## Process\n#P1 #L1 A s\nNext: P2\n#P2 #L2 A d\nYes: P3\nNo: P4\n#P3 #L3 A p\nNext: P4\n#P4 #L4 A e\n";
        let process = parse_seq(input);
        let types: Vec<_> = process.nodes.iter().map(|n| n.node_type).collect();
        assert_eq!(
            types,
            vec![NodeType::Start, NodeType::Decision, NodeType::Process, NodeType::End]
        );
        let labels: Vec<_> = process.edges.iter().map(|e| e.label.as_deref()).collect();
        assert_eq!(labels, vec![None, Some(YES_LABEL), Some(NO_LABEL), None]);
    }

    #[test]
    fn untagged_steps_take_their_position_as_row() {
        let process = parse_seq("## Dept\nA\n## Process\n#P1 A first\nNext: P2\n#P2 A second\n");
        let rows: Vec<_> = process.nodes.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![0, 1]);
        // Only an explicit #L1 marks the start.
        assert_eq!(process.nodes[0].node_type, NodeType::Process);
    }

    #[test]
    fn row_zero_tag_is_minus_one() {
        let process = parse_seq("## Process\n#P1 #L0 A odd\n");
        assert_eq!(process.nodes[0].row, -1);
        assert_eq!(process.nodes[0].node_type, NodeType::End);
    }

    #[test]
    fn dangling_reference_drops_edge_and_reports_it() {
        let result = parse_with(
            "## Dept\nA\n## Process\n#P1 #L1 A s\nNext: P99\n",
            &DialectConfig::default(),
            &mut SequentialIds::default(),
        );
        assert!(result.process.edges.is_empty());
        assert!(result.diagnostics.iter().any(|d| {
            d.category == DiagnosticCategory::Reference && d.found.as_deref() == Some("P99")
        }));
    }

    #[test]
    fn empty_target_clears_reference() {
        let process = parse_seq("## Process\n#P1 #L1 A s\nNext: P2\nNext:\n#P2 #L2 A e\n");
        assert!(process.edges.is_empty());
        assert_eq!(process.nodes[0].node_type, NodeType::Start);
    }

    #[test]
    fn unknown_department_falls_back_to_first_lane() {
        let result = parse_with(
            "## Dept\nSales\nLegal\n## Process\n#P1 #L1 Marketing s\n",
            &DialectConfig::default(),
            &mut SequentialIds::default(),
        );
        let process = &result.process;
        assert_eq!(process.nodes[0].swimlane_id, process.swimlanes[0].id);
        assert!(result.has_warnings());
    }

    #[test]
    fn no_departments_leaves_swimlane_empty() {
        let process = parse_seq("## Process\n#P1 #L1 Anyone s\n");
        assert!(process.swimlanes.is_empty());
        assert_eq!(process.nodes[0].swimlane_id, "");
    }

    #[test]
    fn duplicate_key_replaces_record_in_place() {
        let input = "## Dept\nA\n## Process\n#P1 #L1 A s\nNext: P2\n#P2 #L2 A old\nNext: P3\n#P3 #L3 A e\n#P2 #L2 A new\n";
        let result = parse_with(input, &DialectConfig::default(), &mut SequentialIds::default());
        let labels: Vec<_> = result.process.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["s", "new", "e"]);
        // The replacement carries no connections of its own.
        assert_eq!(result.process.nodes[1].node_type, NodeType::End);
        assert!(result.diagnostics.iter().any(|d| d.found.as_deref() == Some("P2")));
    }

    #[test]
    fn connections_follow_current_step_across_sections() {
        let input = "## Process\n#P1 #L1 A s\n## Description\nhello\n## Process\nNext: P2\n#P2 #L2 A e\n";
        let process = parse_seq(input);
        assert_eq!(process.description, "hello");
        assert_eq!(process.edges.len(), 1);
    }

    #[test]
    fn connection_before_any_step_is_ignored() {
        let result = parse_with(
            "## Dept\nA\n## Process\nNext: P1\n#P1 #L1 A s\n#P2 #L2 A e\n",
            &DialectConfig::default(),
            &mut SequentialIds::default(),
        );
        assert!(result.process.edges.is_empty());
        let types: Vec<_> = result.process.nodes.iter().map(|n| n.node_type).collect();
        assert_eq!(types, vec![NodeType::Start, NodeType::End]);
        let structural: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.category == DiagnosticCategory::Structure)
            .collect();
        assert_eq!(structural.len(), 1);
        assert_eq!(structural[0].line, Some(4));
    }

    #[test]
    fn report_rows_match_positional_rows_of_untagged_steps() {
        let process =
            parse_seq("## Dept\nA\n## Process\n#P1 A s\nNext: P2\n#P2 A e\n## Reports\nX #L: 2\n");
        assert_eq!(
            process.reports[0].related_node_ids,
            vec![process.nodes[1].id.clone()]
        );
    }

    #[test]
    fn reports_resolve_rows_in_order() {
        let input = "## Dept\nA\n## Process\n#P1 #L1 A s\nNext: P2\n#P2 #L2 A m\nNext: P3\n#P3 #L3 A x\nNext: P4\n#P4 #L4 A m2\nNext: P5\n#P5 #L5 A e\n## Reports\n帳票A #L: 2,5\n";
        let process = parse_seq(input);
        let report = &process.reports[0];
        assert_eq!(report.name, "帳票A");
        let related: Vec<_> = report
            .related_node_ids
            .iter()
            .map(|id| label_of(&process, id))
            .collect();
        assert_eq!(related, vec!["m", "e"]);
    }

    #[test]
    fn placeholder_rows_are_dropped() {
        let process = parse_seq("## Process\n#P1 #L1 A s\n## Systems\nERP #L: none\n");
        assert_eq!(process.related_systems.len(), 1);
        assert!(process.related_systems[0].related_node_ids.is_empty());
    }

    #[test]
    fn relation_lines_need_marker_and_no_hash_prefix() {
        let process = parse_seq("## Reports\n#R1 Invoice #L: 1\nInvoice 1\nInvoice #L: 1\n");
        assert_eq!(process.reports.len(), 1);
        assert!(process.reports[0].related_node_ids.is_empty());
    }

    #[test]
    fn unknown_section_silences_following_lines() {
        let result = parse_with(
            "## Dept\nA\n## Notes\nB\n",
            &DialectConfig::default(),
            &mut SequentialIds::default(),
        );
        assert_eq!(result.process.swimlanes.len(), 1);
        assert!(result.diagnostics.iter().any(|d| d.found.as_deref() == Some("Notes")));
        assert!(result.diagnostics.iter().any(|d| d.line == Some(4)));
    }

    #[test]
    fn title_defaults_to_placeholder() {
        assert_eq!(parse_seq("## Dept\nA\n").title, "New business process");
        let ja = parse_with("", &DialectConfig::japanese(), &mut SequentialIds::default());
        assert_eq!(ja.process.title, "新規業務プロセス");
    }

    #[test]
    fn title_skips_hash_lines() {
        let process = parse_seq("# BusinessProcessName\n# comment\n  Real title  \n");
        assert_eq!(process.title, "Real title");
    }

    #[test]
    fn description_lines_join_with_spaces() {
        let process = parse_seq("## Description\nfirst\n#skip\nsecond\n");
        assert_eq!(process.description, "first second");
    }

    #[test]
    fn crlf_input_is_trimmed() {
        let process = parse_seq("# BusinessProcessName\r\nT\r\n## Dept\r\nA\r\n");
        assert_eq!(process.title, "T");
        assert_eq!(process.swimlanes[0].name, "A");
    }

    #[test]
    fn empty_input_returns_info() {
        let result = parse("");
        assert!(result.process.nodes.is_empty());
        assert_eq!(result.counts().infos, 1);
        assert!(!result.has_warnings());
    }

    #[test]
    fn sample_document_parses_cleanly() {
        let result = parse(SAMPLE_MARKDOWN);
        let process = &result.process;
        assert_eq!(process.title, "購買申請承認プロセス");
        assert_eq!(process.swimlanes.len(), 5);
        assert_eq!(process.nodes.len(), 12);
        assert_eq!(process.edges.len(), 14);
        assert_eq!(process.reports.len(), 6);
        assert_eq!(process.related_systems.len(), 3);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);

        let decisions = process
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Decision)
            .count();
        assert_eq!(decisions, 3);
        // Row 5 holds two steps; the report resolves to the first of them.
        let approval = &process.reports[2];
        assert_eq!(label_of(process, &approval.related_node_ids[0]), "一次承認");
    }

    #[test]
    fn summary_json_counts() {
        let summary = parse_summary_json(&parse(SAMPLE_MARKDOWN));
        let value: serde_json::Value = serde_json::from_str(&summary).expect("summary json");
        assert_eq!(value["node_count"], 12);
        assert_eq!(value["system_count"], 3);
        assert_eq!(value["warning_count"], 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_parse_is_total(input in ".{0,256}") {
            let result = parse(&input);
            let process = &result.process;
            for edge in &process.edges {
                prop_assert!(process.node(&edge.source).is_some());
                prop_assert!(process.node(&edge.target).is_some());
            }
        }

        #[test]
        fn prop_parse_is_deterministic_with_sequential_ids(
            lines in proptest::collection::vec(
                prop_oneof![
                    Just("## Dept".to_string()),
                    Just("## Process".to_string()),
                    Just("## Reports".to_string()),
                    "[A-C]",
                    "#P[1-4] #L[1-4] [A-C] [a-z]{1,6}",
                    "(Next|Yes|No): P[1-5]",
                    "[a-z]{1,5} #L: [0-5](, [0-5])?",
                ],
                0..24,
            )
        ) {
            let input = lines.join("\n");
            let first = parse_seq(&input);
            let second = parse_seq(&input);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn silent_entry_point_matches_full_parse_shape() {
        let process = parse_process_markdown(SAMPLE_MARKDOWN);
        assert_eq!(process.nodes.len(), 12);
    }
}
