use gitgrove_core::{EngineStats, NodeKind, NodeView, Rgb};

use crate::graph::model::{Node, NodeIdx};
use crate::graph::state::Engine;
use crate::spatial::Bounds;

/// Read-only views for renderers and hit testing.
impl Engine {
    /// Visible nodes inside `viewport`, in arena order.
    pub fn visible_nodes(&self, viewport: &Bounds) -> Vec<NodeView> {
        let mut hits = self.index.query_range(viewport);
        hits.sort_unstable_by_key(|item| item.id);
        hits.into_iter()
            .map(|item| NodeIdx(item.id))
            .filter(|idx| self.model.get(*idx).map(|n| n.visible).unwrap_or(false))
            .filter_map(|idx| self.model.view(idx))
            .collect()
    }

    /// Closest visible node within `max_distance` of `(x, y)`.
    pub fn find_nearest_node(&self, x: f32, y: f32, max_distance: f32) -> Option<NodeView> {
        if !(max_distance >= 0.0) {
            return None;
        }
        let mut best: Option<(f32, NodeIdx)> = None;
        for item in self.index.query_radius(x, y, max_distance) {
            let idx = NodeIdx(item.id);
            if !self.model.get(idx).map(|n| n.visible).unwrap_or(false) {
                continue;
            }
            let distance_sq = (item.x - x).powi(2) + (item.y - y).powi(2);
            let closer = match best {
                Some((d, b)) => distance_sq < d || (distance_sq == d && idx < b),
                None => true,
            };
            if closer {
                best = Some((distance_sq, idx));
            }
        }
        best.and_then(|(_, idx)| self.model.view(idx))
    }

    pub fn repo_colors(&self) -> Vec<(String, Rgb)> {
        self.colors.repo_colors().to_vec()
    }

    pub fn repo_color(&self, repo_id: &str) -> Option<Rgb> {
        self.colors.repo_color(repo_id)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            total_nodes: self.model.len(),
            file_nodes: self.model.count_kind(NodeKind::File),
            directory_nodes: self.model.count_kind(NodeKind::Directory),
            root_nodes: self.model.count_kind(NodeKind::Root),
            edges: self.model.edges().len(),
            processed_commits: self.replay.processed_count(),
            total_commits: self.replay.total(),
            repos: self.colors.repo_count(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.model.by_id(id)
    }

    pub fn node_view(&self, id: &str) -> Option<NodeView> {
        self.model.lookup(id).and_then(|idx| self.model.view(idx))
    }

    /// Child ids in insertion order; empty for unknown ids.
    pub fn children_of(&self, id: &str) -> Vec<String> {
        self.model
            .by_id(id)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.model.get(*child))
                    .map(|child| child.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn node_views(&self) -> Vec<NodeView> {
        self.model
            .iter()
            .filter_map(|(idx, _)| self.model.view(idx))
            .collect()
    }
}
