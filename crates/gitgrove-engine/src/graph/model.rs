use gitgrove_core::{FileCategory, NodeKind, NodeView, Rgb};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Arena handle; only valid while the node it was issued for is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub u32);

impl NodeIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub repo: String,
    pub kind: NodeKind,
    pub parent: Option<NodeIdx>,
    pub children: SmallVec<[NodeIdx; 8]>,
    pub category: Option<FileCategory>,
    pub color: Rgb,
    pub last_modified: i64,
    pub modification_count: u32,
    pub opacity: f32,
    pub scale: f32,
    pub visible: bool,
    pub depth: u16,

    // synced from the solver after every step
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Node {
    pub fn new(id: String, name: String, repo: String, kind: NodeKind, color: Rgb) -> Self {
        Self {
            id,
            name,
            repo,
            kind,
            parent: None,
            children: SmallVec::new(),
            category: None,
            color,
            last_modified: 0,
            modification_count: 0,
            opacity: 1.0,
            scale: 1.0,
            visible: true,
            depth: 0,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}

/// Parent -> child spring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: NodeIdx,
    pub target: NodeIdx,
    pub rest_length: f32,
    pub depth: u16,
    pub stiffness: f32,
}

/// Deeper edges are slightly stiffer so leaves do not drift from their directory.
pub fn edge_stiffness(base: f32, depth: u16) -> f32 {
    base * (1.0 + 0.1 * f32::from(depth))
}

#[derive(Debug, Default, Clone)]
pub struct GraphModel {
    slots: Vec<Option<Node>>,
    free: Vec<u32>,
    by_id: HashMap<String, NodeIdx>,
    edges: Vec<Edge>,
}

impl GraphModel {
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.by_id.clear();
        self.edges.clear();
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn lookup(&self, id: &str) -> Option<NodeIdx> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, idx: NodeIdx) -> Option<&Node> {
        self.slots.get(idx.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, idx: NodeIdx) -> Option<&mut Node> {
        self.slots.get_mut(idx.index()).and_then(Option::as_mut)
    }

    pub fn by_id(&self, id: &str) -> Option<&Node> {
        self.lookup(id).and_then(|idx| self.get(idx))
    }

    /// Returns `None` when the node's parent is not alive or its id is taken.
    pub fn insert(&mut self, node: Node) -> Option<NodeIdx> {
        if self.by_id.contains_key(&node.id) {
            return None;
        }
        if let Some(parent) = node.parent {
            self.get(parent)?;
        }

        let idx = match self.free.pop() {
            Some(slot) => NodeIdx(slot),
            None => {
                self.slots.push(None);
                NodeIdx((self.slots.len() - 1) as u32)
            }
        };
        if let Some(parent) = node.parent.and_then(|p| self.get_mut(p)) {
            parent.children.push(idx);
        }
        self.by_id.insert(node.id.clone(), idx);
        self.slots[idx.index()] = Some(node);
        Some(idx)
    }

    /// Removes a childless node, detaching it from its parent and dropping its edges.
    pub fn remove(&mut self, idx: NodeIdx) -> Option<Node> {
        if !self.get(idx)?.children.is_empty() {
            return None;
        }
        let node = self.slots[idx.index()].take()?;

        if let Some(parent) = node.parent.and_then(|p| self.get_mut(p)) {
            parent.children.retain(|child| *child != idx);
        }
        self.edges
            .retain(|edge| edge.source != idx && edge.target != idx);
        self.by_id.remove(&node.id);
        self.free.push(idx.0);
        Some(node)
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIdx, &Node)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeIdx(i as u32), node)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeIdx, &mut Node)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|node| (NodeIdx(i as u32), node)))
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.iter().filter(|(_, node)| node.kind == kind).count()
    }

    pub fn view(&self, idx: NodeIdx) -> Option<NodeView> {
        let node = self.get(idx)?;
        Some(NodeView {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            parent: node
                .parent
                .and_then(|p| self.get(p))
                .map(|parent| parent.id.clone()),
            category: node.category,
            color: node.color,
            x: node.x,
            y: node.y,
            opacity: node.opacity,
            scale: node.scale,
            visible: node.visible,
            depth: node.depth,
            modification_count: node.modification_count,
        })
    }
}
