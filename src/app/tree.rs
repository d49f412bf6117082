use crate::domain::{Hierarchy, HierarchyNode, NodeId, SessionRecord};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FlatRow {
    pub node: NodeId,
    pub depth: usize,
}

/// Owns the hierarchy plus the selection and scroll over its flattened rows.
#[derive(Clone, Debug)]
pub struct TreeView {
    hierarchy: Hierarchy,
    rows: Vec<FlatRow>,
    selected: usize,
    scroll: usize,
}

impl TreeView {
    pub fn new(hierarchy: Hierarchy) -> Self {
        let mut tree = Self {
            hierarchy,
            rows: Vec::new(),
            selected: 0,
            scroll: 0,
        };
        tree.flatten();
        tree
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn selected_row(&self) -> Option<FlatRow> {
        self.rows.get(self.selected).copied()
    }

    pub fn selected_node(&self) -> Option<&HierarchyNode> {
        self.selected_row()
            .map(|row| self.hierarchy.node(row.node))
    }

    /// Adopts a re-read session record so reopening and previews see the growth.
    pub fn replace_session(&mut self, record: &Arc<SessionRecord>, now: OffsetDateTime) {
        self.hierarchy.replace_session(record, now);
    }

    /// Pre-order over expanded nodes, starting at the root's children (depth 1).
    pub fn flatten(&mut self) {
        let mut rows = Vec::new();
        let root = self.hierarchy.root();
        if self.hierarchy.node(root).expanded {
            for child in self.hierarchy.children(root) {
                self.push_rows(*child, 1, &mut rows);
            }
        }
        self.rows = rows;
        self.clamp_selection();
    }

    fn push_rows(&self, id: NodeId, depth: usize, rows: &mut Vec<FlatRow>) {
        rows.push(FlatRow { node: id, depth });
        let node = self.hierarchy.node(id);
        if node.expanded {
            for child in &node.children {
                self.push_rows(*child, depth + 1, rows);
            }
        }
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        self.selected = (self.selected + 1).min(self.rows.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    /// Flips a container's expand state. Returns the session to open for a childless leaf.
    pub fn toggle_expand(&mut self) -> Option<Arc<SessionRecord>> {
        let row = self.selected_row()?;
        let node = self.hierarchy.node(row.node);
        if node.has_children() {
            let expanded = !node.expanded;
            self.hierarchy.set_expanded(row.node, expanded);
            self.flatten();
            return None;
        }
        node.kind.session().cloned()
    }

    /// Session and agent rows open; other containers expand.
    pub fn expand_or_open(&mut self) -> Option<Arc<SessionRecord>> {
        let row = self.selected_row()?;
        let node = self.hierarchy.node(row.node);
        if let Some(record) = node.kind.session() {
            return Some(Arc::clone(record));
        }
        if node.has_children() && !node.expanded {
            self.hierarchy.set_expanded(row.node, true);
            self.flatten();
        }
        None
    }

    pub fn collapse_or_ascend(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let node = self.hierarchy.node(row.node);
        if node.expanded && node.has_children() {
            self.hierarchy.set_expanded(row.node, false);
            self.flatten();
            return;
        }

        if let Some(parent_idx) = self.rows[..self.selected]
            .iter()
            .rposition(|candidate| candidate.depth < row.depth)
        {
            self.selected = parent_idx;
        }
    }

    /// Minimal scroll adjustment keeping the selection inside `viewport` rows.
    pub fn ensure_visible(&mut self, viewport: usize) {
        let viewport = viewport.max(1);
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + viewport {
            self.scroll = self.selected + 1 - viewport;
        }
        let max_scroll = self.rows.len().saturating_sub(viewport);
        self.scroll = self.scroll.min(max_scroll);
    }
}
