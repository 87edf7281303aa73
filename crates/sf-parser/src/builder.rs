use rustc_hash::FxHashMap;
use sf_core::{
    BusinessProcess, DialectConfig, Diagnostic, DiagnosticCategory, FlowEdge, FlowNode,
    IdGenerator, NO_LABEL, NodeType, RelatedSystem, Report, Swimlane, YES_LABEL,
};
use tracing::{debug, trace};

use crate::ParseResult;
use crate::line::{Connection, StepLine, parse_leading_int};

/// One `#P` record as collected before ids are assigned.
#[derive(Debug, Clone)]
struct StepRecord {
    key: String,
    dept: String,
    label: String,
    /// `#L` tag as written (one-based).
    row_tag: Option<i64>,
    next: Option<String>,
    yes: Option<String>,
    no: Option<String>,
    line: usize,
}

impl StepRecord {
    fn is_terminal(&self) -> bool {
        self.next.is_none() && self.yes.is_none() && self.no.is_none()
    }

    fn node_type(&self) -> NodeType {
        if self.row_tag == Some(1) {
            NodeType::Start
        } else if self.is_terminal() {
            NodeType::End
        } else if self.yes.is_some() || self.no.is_some() {
            NodeType::Decision
        } else {
            NodeType::Process
        }
    }
}

#[derive(Debug, Clone)]
struct RelationRecord {
    /// `R<n>` or `S<n>`, used only to name the entry in diagnostics.
    key: String,
    name: String,
    rows: Vec<String>,
    line: usize,
}

pub(crate) struct ProcessBuilder<'a> {
    config: &'a DialectConfig,
    title: Option<String>,
    description: String,
    depts: Vec<String>,
    steps: Vec<StepRecord>,
    step_index_by_key: FxHashMap<String, usize>,
    reports: Vec<RelationRecord>,
    systems: Vec<RelationRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ProcessBuilder<'a> {
    pub(crate) fn new(config: &'a DialectConfig) -> Self {
        Self {
            config,
            title: None,
            description: String::new(),
            depts: Vec::new(),
            steps: Vec::new(),
            step_index_by_key: FxHashMap::default(),
            reports: Vec::new(),
            systems: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        trace!("{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Records a line the grammar does not recognize in the current context.
    pub(crate) fn skip_line(&mut self, line_no: usize, text: &str, reason: &str) {
        self.push_diagnostic(
            Diagnostic::warning(format!("Line {line_no}: {reason}; line ignored"))
                .at_line(line_no)
                .with_found(text),
        );
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    pub(crate) fn push_description(&mut self, text: &str) {
        if !self.description.is_empty() {
            self.description.push(' ');
        }
        self.description.push_str(text);
    }

    pub(crate) fn push_dept(&mut self, name: &str) {
        self.depts.push(name.to_string());
    }

    /// Opens a step record. A repeated key replaces the earlier record but
    /// keeps its original position.
    pub(crate) fn open_step(&mut self, step: &StepLine<'_>, line_no: usize) {
        let row_tag = step.row_tag.and_then(|raw| {
            let parsed = raw.parse::<i64>().ok();
            if parsed.is_none() {
                self.push_diagnostic(
                    Diagnostic::warning(format!(
                        "Line {line_no}: row tag #L{raw} is out of range; using list position"
                    ))
                    .at_line(line_no)
                    .with_found(raw),
                );
            }
            parsed
        });
        let record = StepRecord {
            key: step.key.to_string(),
            dept: step.dept.to_string(),
            label: step.label.to_string(),
            row_tag,
            next: None,
            yes: None,
            no: None,
            line: line_no,
        };

        if let Some(&index) = self.step_index_by_key.get(step.key) {
            self.push_diagnostic(
                Diagnostic::warning(format!(
                    "Line {line_no}: step {} redefined; earlier definition on line {} discarded",
                    step.key, self.steps[index].line
                ))
                .with_category(DiagnosticCategory::Structure)
                .at_line(line_no)
                .with_found(step.key),
            );
            self.steps[index] = record;
        } else {
            self.step_index_by_key
                .insert(step.key.to_string(), self.steps.len());
            self.steps.push(record);
        }
    }

    /// Sets or clears a connection on the step named `key`.
    pub(crate) fn connect(&mut self, key: &str, kind: Connection, target: &str) {
        let Some(&index) = self.step_index_by_key.get(key) else {
            return;
        };
        let value = (!target.is_empty()).then(|| target.to_string());
        let step = &mut self.steps[index];
        match kind {
            Connection::Next => step.next = value,
            Connection::Yes => step.yes = value,
            Connection::No => step.no = value,
        }
    }

    pub(crate) fn push_report(&mut self, name: &str, rows: &[&str], line_no: usize) {
        let key = format!("R{}", self.reports.len() + 1);
        self.reports.push(relation_record(key, name, rows, line_no));
    }

    pub(crate) fn push_system(&mut self, name: &str, rows: &[&str], line_no: usize) {
        let key = format!("S{}", self.systems.len() + 1);
        self.systems.push(relation_record(key, name, rows, line_no));
    }

    pub(crate) fn finish(mut self, ids: &mut dyn IdGenerator) -> ParseResult {
        let swimlanes: Vec<Swimlane> = self
            .depts
            .iter()
            .enumerate()
            .map(|(index, name)| Swimlane {
                id: ids.next_id(),
                name: name.clone(),
                color: self.config.swimlane_color(index),
            })
            .collect();

        let steps = std::mem::take(&mut self.steps);
        let mut node_id_by_key: FxHashMap<&str, String> = FxHashMap::default();
        let mut nodes = Vec::with_capacity(steps.len());
        for (position, step) in steps.iter().enumerate() {
            let swimlane_id = self.resolve_swimlane(&swimlanes, step);
            let id = ids.next_id();
            node_id_by_key.insert(step.key.as_str(), id.clone());
            nodes.push(FlowNode {
                id,
                node_type: step.node_type(),
                label: step.label.clone(),
                swimlane_id,
                row: step
                    .row_tag
                    .map_or(position as i64, |tag| tag.saturating_sub(1)),
                description: None,
            });
        }

        let mut edges = Vec::new();
        for step in &steps {
            let Some(source) = node_id_by_key.get(step.key.as_str()) else {
                continue;
            };
            let branches = [
                (&step.next, None, Connection::Next),
                (&step.yes, Some(YES_LABEL), Connection::Yes),
                (&step.no, Some(NO_LABEL), Connection::No),
            ];
            for (target_key, label, kind) in branches {
                let Some(target_key) = target_key else {
                    continue;
                };
                match node_id_by_key.get(target_key.as_str()) {
                    Some(target) => edges.push(FlowEdge {
                        id: ids.next_id(),
                        source: source.clone(),
                        target: target.clone(),
                        label: label.map(str::to_string),
                        kind: None,
                    }),
                    None => self.push_diagnostic(
                        Diagnostic::warning(format!(
                            "Step {} points to unknown step {target_key} via '{}'; connection dropped",
                            step.key,
                            kind.prefix()
                        ))
                        .with_category(DiagnosticCategory::Reference)
                        .at_line(step.line)
                        .with_found(target_key.as_str()),
                    ),
                }
            }
        }

        let report_records = std::mem::take(&mut self.reports);
        let reports = report_records
            .iter()
            .map(|record| Report {
                id: ids.next_id(),
                name: record.name.clone(),
                related_node_ids: self.resolve_rows(&nodes, record),
            })
            .collect::<Vec<_>>();

        let system_records = std::mem::take(&mut self.systems);
        let related_systems = system_records
            .iter()
            .map(|record| RelatedSystem {
                id: ids.next_id(),
                name: record.name.clone(),
                related_node_ids: self.resolve_rows(&nodes, record),
            })
            .collect::<Vec<_>>();

        let title = self
            .title
            .take()
            .unwrap_or_else(|| self.config.untitled_title.clone());

        let process = BusinessProcess {
            id: ids.next_id(),
            title,
            description: std::mem::take(&mut self.description),
            swimlanes,
            nodes,
            edges,
            reports,
            related_systems,
            related_documents: Vec::new(),
        };

        debug!(
            "Parsed process '{}': swimlanes={}, nodes={}, edges={}, reports={}, systems={}, diagnostics={}",
            process.title,
            process.swimlanes.len(),
            process.nodes.len(),
            process.edges.len(),
            process.reports.len(),
            process.related_systems.len(),
            self.diagnostics.len()
        );

        ParseResult {
            process,
            diagnostics: self.diagnostics,
        }
    }

    /// Exact name match, else the first lane, else no lane at all.
    fn resolve_swimlane(&mut self, swimlanes: &[Swimlane], step: &StepRecord) -> String {
        if let Some(lane) = swimlanes.iter().find(|lane| lane.name == step.dept) {
            return lane.id.clone();
        }
        let (fallback, message) = match swimlanes.first() {
            Some(first) => (
                first.id.clone(),
                format!(
                    "Step {} names unknown department '{}'; assigned to '{}'",
                    step.key, step.dept, first.name
                ),
            ),
            None => (
                String::new(),
                format!(
                    "Step {} names department '{}' but no departments are declared",
                    step.key, step.dept
                ),
            ),
        };
        self.push_diagnostic(
            Diagnostic::warning(message)
                .with_category(DiagnosticCategory::Reference)
                .at_line(step.line)
                .with_found(step.dept.as_str())
                .with_suggestion("List the department under '## Dept'"),
        );
        fallback
    }

    /// Maps written one-based rows to the first node on each row.
    fn resolve_rows(&mut self, nodes: &[FlowNode], record: &RelationRecord) -> Vec<String> {
        let mut related = Vec::new();
        for raw in &record.rows {
            let Some(tag) = parse_leading_int(raw) else {
                continue;
            };
            let row = tag.saturating_sub(1);
            match nodes.iter().find(|node| node.row == row) {
                Some(node) => related.push(node.id.clone()),
                None => self.push_diagnostic(
                    Diagnostic::warning(format!(
                        "{} '{}' refers to row {tag}, which has no step",
                        record.key, record.name
                    ))
                    .with_category(DiagnosticCategory::Relation)
                    .at_line(record.line)
                    .with_found(raw.as_str()),
                ),
            }
        }
        related
    }
}

fn relation_record(key: String, name: &str, rows: &[&str], line: usize) -> RelationRecord {
    RelationRecord {
        key,
        name: name.to_string(),
        rows: rows.iter().map(|row| (*row).to_string()).collect(),
        line,
    }
}
