#![forbid(unsafe_code)]

//! Serializes a [`BusinessProcess`] back into the process markdown dialect.
//!
//! Two numberings coexist in the output: the `P<n>` key of a step is its
//! position after a stable sort by row, while the `#L<m>` tag is the node's
//! own row plus one. Connection targets refer to positions.

use rustc_hash::FxHashMap;
use sf_core::{
    BusinessProcess, DialectConfig, FlowEdge, FlowNode, NO_LABEL, NodeType, YES_LABEL, row_tag,
};
use tracing::debug;

/// Exports with the default (English) placeholders.
#[must_use]
pub fn export_process_to_markdown(process: &BusinessProcess) -> String {
    export_with(process, &DialectConfig::default())
}

/// Exports using `config` for the unassigned-department and empty-row placeholders.
#[must_use]
pub fn export_with(process: &BusinessProcess, config: &DialectConfig) -> String {
    let order = ExportOrder::new(process);
    let mut lines: Vec<String> = Vec::new();

    lines.push("# BusinessProcessName".to_string());
    lines.push(process.title.clone());
    lines.push(String::new());

    lines.push("## Description".to_string());
    lines.push(process.description.clone());
    lines.push(String::new());

    lines.push("## Dept".to_string());
    lines.extend(process.swimlanes.iter().map(|lane| lane.name.clone()));
    lines.push(String::new());

    lines.push("## Process".to_string());
    for (position, node) in order.nodes.iter().enumerate() {
        let dept = process
            .swimlane(&node.swimlane_id)
            .map(|lane| lane.name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(&config.unassigned_lane);
        lines.push(format!(
            "#{} #L{} {dept} {}",
            step_key(position),
            row_tag(node.row),
            node.label
        ));
        write_connections(&mut lines, process, &order, node);
        lines.push(String::new());
    }

    if !process.reports.is_empty() {
        lines.push("## Reports".to_string());
        for report in &process.reports {
            lines.push(relation_line(
                &report.name,
                &report.related_node_ids,
                &order,
                config,
            ));
        }
        lines.push(String::new());
    }

    if !process.related_systems.is_empty() {
        lines.push("## Systems".to_string());
        for system in &process.related_systems {
            lines.push(relation_line(
                &system.name,
                &system.related_node_ids,
                &order,
                config,
            ));
        }
        lines.push(String::new());
    }

    debug!(
        "Exported process '{}': steps={}, reports={}, systems={}",
        process.title,
        order.nodes.len(),
        process.reports.len(),
        process.related_systems.len()
    );

    lines.join("\n")
}

/// Nodes in export order plus a lookup from node id to export position.
struct ExportOrder<'a> {
    nodes: Vec<&'a FlowNode>,
    position_by_id: FxHashMap<&'a str, usize>,
}

impl<'a> ExportOrder<'a> {
    fn new(process: &'a BusinessProcess) -> Self {
        let mut nodes: Vec<&FlowNode> = process.nodes.iter().collect();
        nodes.sort_by_key(|node| node.row);

        let mut position_by_id = FxHashMap::default();
        for (position, node) in nodes.iter().enumerate() {
            position_by_id.entry(node.id.as_str()).or_insert(position);
        }
        Self {
            nodes,
            position_by_id,
        }
    }

    fn position(&self, node_id: &str) -> Option<usize> {
        self.position_by_id.get(node_id).copied()
    }

    fn node(&self, node_id: &str) -> Option<&'a FlowNode> {
        self.position(node_id).map(|position| self.nodes[position])
    }
}

fn step_key(position: usize) -> String {
    format!("P{}", position + 1)
}

fn write_connections(
    lines: &mut Vec<String>,
    process: &BusinessProcess,
    order: &ExportOrder<'_>,
    node: &FlowNode,
) {
    let mut connection = |prefix: &str, edge: Option<&FlowEdge>| {
        if let Some(position) = edge.and_then(|edge| order.position(&edge.target)) {
            lines.push(format!("{prefix} {}", step_key(position)));
        }
    };

    if node.node_type == NodeType::Decision {
        connection(
            "Yes:",
            process.outgoing_edges(&node.id).find(|e| e.has_label(YES_LABEL)),
        );
        connection(
            "No:",
            process.outgoing_edges(&node.id).find(|e| e.has_label(NO_LABEL)),
        );
    } else {
        connection(
            "Next:",
            process.outgoing_edges(&node.id).find(|e| e.is_unlabeled()),
        );
    }
}

fn relation_line(
    name: &str,
    related_node_ids: &[String],
    order: &ExportOrder<'_>,
    config: &DialectConfig,
) -> String {
    let rows = related_node_ids
        .iter()
        .filter_map(|id| order.node(id))
        .map(|node| row_tag(node.row).to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let rows = if rows.is_empty() {
        config.empty_rows.as_str()
    } else {
        rows.as_str()
    };
    format!("{name} #L: {rows}")
}
