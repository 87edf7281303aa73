//! Interactive editing operations on a [`BusinessProcess`].
//!
//! These mirror what the designer's editor panel does between parses: add,
//! update and remove swimlanes, nodes, edges and row attachments. Deletions
//! cascade so the graph never keeps an edge or relation to a removed node.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::{
    BusinessProcess, EdgeKind, FlowEdge, FlowNode, IdGenerator, NodeType, RelatedDocument,
    RelatedSystem, Report, Swimlane, swimlane_color,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("unknown swimlane id: {0}")]
    UnknownSwimlane(String),
    #[error("unknown node id: {0}")]
    UnknownNode(String),
    #[error("unknown edge id: {0}")]
    UnknownEdge(String),
    #[error("unknown report id: {0}")]
    UnknownReport(String),
    #[error("unknown system id: {0}")]
    UnknownSystem(String),
    #[error("unknown document id: {0}")]
    UnknownDocument(String),
    #[error("swimlane order must list every existing swimlane id exactly once")]
    InvalidSwimlaneOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Node fields supplied by the editor; the id is generated on insert.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewNode {
    pub node_type: NodeType,
    pub label: String,
    pub swimlane_id: String,
    pub row: i64,
    pub description: Option<String>,
}

/// Partial node update. `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeUpdate {
    pub node_type: Option<NodeType>,
    pub label: Option<String>,
    pub swimlane_id: Option<String>,
    pub row: Option<i64>,
    pub description: Option<Option<String>>,
}

/// Partial edge update. `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EdgeUpdate {
    pub source: Option<String>,
    pub target: Option<String>,
    pub label: Option<Option<String>>,
    pub kind: Option<Option<EdgeKind>>,
}

/// Partial update for a report, system or document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationUpdate {
    pub name: Option<String>,
    pub related_node_ids: Option<Vec<String>>,
}

trait NodeRelation {
    fn id(&self) -> &str;
    fn name_mut(&mut self) -> &mut String;
    fn related_node_ids_mut(&mut self) -> &mut Vec<String>;
}

macro_rules! impl_node_relation {
    ($($ty:ty),+) => {
        $(
            impl NodeRelation for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn name_mut(&mut self) -> &mut String {
                    &mut self.name
                }

                fn related_node_ids_mut(&mut self) -> &mut Vec<String> {
                    &mut self.related_node_ids
                }
            }
        )+
    };
}

impl_node_relation!(Report, RelatedSystem, RelatedDocument);

fn update_relation<T: NodeRelation>(items: &mut [T], id: &str, update: RelationUpdate) -> bool {
    let Some(item) = items.iter_mut().find(|item| item.id() == id) else {
        return false;
    };
    if let Some(name) = update.name {
        *item.name_mut() = name;
    }
    if let Some(related) = update.related_node_ids {
        *item.related_node_ids_mut() = related;
    }
    true
}

fn take_by_id<T, F>(items: &mut Vec<T>, matches: F) -> Option<T>
where
    F: Fn(&T) -> bool,
{
    let index = items.iter().position(matches)?;
    Some(items.remove(index))
}

fn strip_nodes<T: NodeRelation>(items: &mut [T], removed: &FxHashSet<String>) {
    for item in items {
        item.related_node_ids_mut().retain(|id| !removed.contains(id));
    }
}

impl BusinessProcess {
    /// Empty process with a fresh id.
    #[must_use]
    pub fn new(title: impl Into<String>, ids: &mut dyn IdGenerator) -> Self {
        Self {
            id: ids.next_id(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Appends a swimlane colored by its position in the palette.
    pub fn add_swimlane(&mut self, name: impl Into<String>, ids: &mut dyn IdGenerator) -> String {
        let id = ids.next_id();
        self.swimlanes.push(Swimlane {
            id: id.clone(),
            name: name.into(),
            color: swimlane_color(self.swimlanes.len()).to_string(),
        });
        id
    }

    pub fn rename_swimlane(&mut self, id: &str, name: impl Into<String>) -> Result<(), EditError> {
        let lane = self.swimlane_mut(id)?;
        lane.name = name.into();
        Ok(())
    }

    pub fn set_swimlane_color(
        &mut self,
        id: &str,
        color: impl Into<String>,
    ) -> Result<(), EditError> {
        let lane = self.swimlane_mut(id)?;
        lane.color = color.into();
        Ok(())
    }

    /// Removes the swimlane together with its nodes and their edges.
    pub fn remove_swimlane(&mut self, id: &str) -> Result<Swimlane, EditError> {
        let lane = take_by_id(&mut self.swimlanes, |s| s.id == id)
            .ok_or_else(|| EditError::UnknownSwimlane(id.to_string()))?;
        let removed: FxHashSet<String> = self
            .nodes
            .iter()
            .filter(|n| n.swimlane_id == id)
            .map(|n| n.id.clone())
            .collect();
        self.drop_nodes(&removed);
        Ok(lane)
    }

    /// Swaps the swimlane with its neighbour. Returns `false` at either end.
    pub fn move_swimlane(&mut self, id: &str, direction: MoveDirection) -> Result<bool, EditError> {
        let index = self
            .swimlanes
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| EditError::UnknownSwimlane(id.to_string()))?;
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|&i| i < self.swimlanes.len()),
        };
        let Some(target) = target else {
            return Ok(false);
        };
        self.swimlanes.swap(index, target);
        Ok(true)
    }

    /// Reorders swimlanes to match `order`, which must be a permutation of the current ids.
    /// The lanes are left untouched when it is not.
    pub fn reorder_swimlanes(&mut self, order: &[&str]) -> Result<(), EditError> {
        let distinct: FxHashSet<&str> = order.iter().copied().collect();
        let is_permutation = order.len() == self.swimlanes.len()
            && distinct.len() == order.len()
            && self.swimlanes.iter().all(|s| distinct.contains(s.id.as_str()));
        if !is_permutation {
            return Err(EditError::InvalidSwimlaneOrder);
        }
        let mut remaining = std::mem::take(&mut self.swimlanes);
        for id in order {
            if let Some(lane) = take_by_id(&mut remaining, |s| s.id == *id) {
                self.swimlanes.push(lane);
            }
        }
        Ok(())
    }

    pub fn add_node(&mut self, node: NewNode, ids: &mut dyn IdGenerator) -> String {
        let id = ids.next_id();
        self.nodes.push(FlowNode {
            id: id.clone(),
            node_type: node.node_type,
            label: node.label,
            swimlane_id: node.swimlane_id,
            row: node.row,
            description: node.description,
        });
        id
    }

    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> Result<(), EditError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| EditError::UnknownNode(id.to_string()))?;
        if let Some(node_type) = update.node_type {
            node.node_type = node_type;
        }
        if let Some(label) = update.label {
            node.label = label;
        }
        if let Some(swimlane_id) = update.swimlane_id {
            node.swimlane_id = swimlane_id;
        }
        if let Some(row) = update.row {
            node.row = row;
        }
        if let Some(description) = update.description {
            node.description = description;
        }
        Ok(())
    }

    /// Removes the node, every edge touching it, and its row attachments.
    pub fn remove_node(&mut self, id: &str) -> Result<FlowNode, EditError> {
        let node = self
            .nodes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or_else(|| EditError::UnknownNode(id.to_string()))?;
        let mut removed = FxHashSet::default();
        removed.insert(node.id.clone());
        self.drop_nodes(&removed);
        Ok(node)
    }

    /// Adds a directed edge. Both endpoints must already exist.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        label: Option<String>,
        kind: Option<EdgeKind>,
        ids: &mut dyn IdGenerator,
    ) -> Result<String, EditError> {
        for endpoint in [source, target] {
            if self.node(endpoint).is_none() {
                return Err(EditError::UnknownNode(endpoint.to_string()));
            }
        }
        let id = ids.next_id();
        self.edges.push(FlowEdge {
            id: id.clone(),
            source: source.to_string(),
            target: target.to_string(),
            label,
            kind,
        });
        Ok(id)
    }

    pub fn update_edge(&mut self, id: &str, update: EdgeUpdate) -> Result<(), EditError> {
        for endpoint in [update.source.as_deref(), update.target.as_deref()]
            .into_iter()
            .flatten()
        {
            if self.node(endpoint).is_none() {
                return Err(EditError::UnknownNode(endpoint.to_string()));
            }
        }
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EditError::UnknownEdge(id.to_string()))?;
        if let Some(source) = update.source {
            edge.source = source;
        }
        if let Some(target) = update.target {
            edge.target = target;
        }
        if let Some(label) = update.label {
            edge.label = label;
        }
        if let Some(kind) = update.kind {
            edge.kind = kind;
        }
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<FlowEdge, EditError> {
        take_by_id(&mut self.edges, |e| e.id == id)
            .ok_or_else(|| EditError::UnknownEdge(id.to_string()))
    }

    pub fn add_report(
        &mut self,
        name: impl Into<String>,
        related_node_ids: Vec<String>,
        ids: &mut dyn IdGenerator,
    ) -> String {
        let id = ids.next_id();
        self.reports.push(Report {
            id: id.clone(),
            name: name.into(),
            related_node_ids,
        });
        id
    }

    pub fn update_report(&mut self, id: &str, update: RelationUpdate) -> Result<(), EditError> {
        if update_relation(&mut self.reports, id, update) {
            Ok(())
        } else {
            Err(EditError::UnknownReport(id.to_string()))
        }
    }

    pub fn remove_report(&mut self, id: &str) -> Result<Report, EditError> {
        take_by_id(&mut self.reports, |r| r.id == id)
            .ok_or_else(|| EditError::UnknownReport(id.to_string()))
    }

    pub fn add_system(
        &mut self,
        name: impl Into<String>,
        related_node_ids: Vec<String>,
        ids: &mut dyn IdGenerator,
    ) -> String {
        let id = ids.next_id();
        self.related_systems.push(RelatedSystem {
            id: id.clone(),
            name: name.into(),
            related_node_ids,
        });
        id
    }

    pub fn update_system(&mut self, id: &str, update: RelationUpdate) -> Result<(), EditError> {
        if update_relation(&mut self.related_systems, id, update) {
            Ok(())
        } else {
            Err(EditError::UnknownSystem(id.to_string()))
        }
    }

    pub fn remove_system(&mut self, id: &str) -> Result<RelatedSystem, EditError> {
        take_by_id(&mut self.related_systems, |s| s.id == id)
            .ok_or_else(|| EditError::UnknownSystem(id.to_string()))
    }

    pub fn add_document(
        &mut self,
        name: impl Into<String>,
        related_node_ids: Vec<String>,
        row: Option<i64>,
        ids: &mut dyn IdGenerator,
    ) -> String {
        let id = ids.next_id();
        self.related_documents.push(RelatedDocument {
            id: id.clone(),
            name: name.into(),
            related_node_ids,
            row,
        });
        id
    }

    pub fn update_document(&mut self, id: &str, update: RelationUpdate) -> Result<(), EditError> {
        if update_relation(&mut self.related_documents, id, update) {
            Ok(())
        } else {
            Err(EditError::UnknownDocument(id.to_string()))
        }
    }

    pub fn remove_document(&mut self, id: &str) -> Result<RelatedDocument, EditError> {
        take_by_id(&mut self.related_documents, |d| d.id == id)
            .ok_or_else(|| EditError::UnknownDocument(id.to_string()))
    }

    fn swimlane_mut(&mut self, id: &str) -> Result<&mut Swimlane, EditError> {
        self.swimlanes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| EditError::UnknownSwimlane(id.to_string()))
    }

    fn drop_nodes(&mut self, removed: &FxHashSet<String>) {
        if removed.is_empty() {
            return;
        }
        self.nodes.retain(|n| !removed.contains(&n.id));
        self.edges
            .retain(|e| !removed.contains(&e.source) && !removed.contains(&e.target));
        strip_nodes(&mut self.reports, removed);
        strip_nodes(&mut self.related_systems, removed);
        strip_nodes(&mut self.related_documents, removed);
    }
}
