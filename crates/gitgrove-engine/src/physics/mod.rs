mod forces;

use gitgrove_core::PhysicsSettingsUpdate;

use crate::graph::model::{edge_stiffness, Edge, NodeIdx};
use crate::spatial::{Bounds, QuadTree, SpatialItem};
use crate::util::config::EngineConfig;

/// Solver-side state for one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub node: NodeIdx,
    pub x: f32,
    pub y: f32,
    /// Where a pinned body is held; the spawn point until pinned or moved.
    pub target_x: f32,
    pub target_y: f32,
    pub vx: f32,
    pub vy: f32,
    pub mass: f32,
    pub pinned: bool,
    pub child_count: u32,
}

impl Body {
    pub fn new(node: NodeIdx, x: f32, y: f32, mass: f32) -> Self {
        Self {
            node,
            x,
            y,
            target_x: x,
            target_y: y,
            vx: 0.0,
            vy: 0.0,
            mass: mass.max(0.001),
            pinned: false,
            child_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsSettings {
    pub spring_stiffness: f32,
    pub repulsion_force: f32,
    pub damping: f32,
    pub center_gravity: f32,
    pub max_speed: f32,
    pub min_distance_sq: f32,
    pub approximation_threshold: usize,
    pub neighbor_radius: f32,
    pub world: Bounds,
}

impl PhysicsSettings {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            spring_stiffness: cfg.spring_stiffness,
            repulsion_force: cfg.repulsion_force,
            damping: cfg.damping.clamp(0.0, 1.0),
            center_gravity: cfg.center_gravity,
            max_speed: cfg.max_speed.max(0.0),
            min_distance_sq: cfg.min_distance_sq.max(f32::EPSILON),
            approximation_threshold: cfg.approximation_threshold,
            neighbor_radius: cfg.neighbor_radius.max(0.0),
            world: Bounds::centered(0.0, 0.0, cfg.world_half_extent.abs()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solver {
    settings: PhysicsSettings,
    bodies: Vec<Body>,
    slots: Vec<Option<u32>>,
    scratch: Vec<SpatialItem>,
}

impl Solver {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            bodies: Vec::new(),
            slots: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Applies a live tuning change; a stiffness change is pushed into every edge.
    pub fn apply_settings(&mut self, update: PhysicsSettingsUpdate, edges: &mut [Edge]) {
        if let Some(stiffness) = update.spring_stiffness {
            self.settings.spring_stiffness = stiffness;
            for edge in edges.iter_mut() {
                edge.stiffness = edge_stiffness(stiffness, edge.depth);
            }
        }
        if let Some(repulsion) = update.repulsion_force {
            self.settings.repulsion_force = repulsion;
        }
        if let Some(damping) = update.damping {
            self.settings.damping = damping.clamp(0.0, 1.0);
        }
        if let Some(gravity) = update.center_gravity {
            self.settings.center_gravity = gravity;
        }
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn add_body(&mut self, body: Body) {
        if let Some(existing) = self.body_mut(body.node) {
            *existing = body;
            return;
        }
        let node = body.node.index();
        if self.slots.len() <= node {
            self.slots.resize(node + 1, None);
        }
        self.slots[node] = Some(self.bodies.len() as u32);
        self.bodies.push(body);
    }

    pub fn remove_body(&mut self, node: NodeIdx) -> Option<Body> {
        let slot = self.slots.get_mut(node.index())?.take()? as usize;
        let removed = self.bodies.swap_remove(slot);
        if let Some(moved) = self.bodies.get(slot) {
            self.slots[moved.node.index()] = Some(slot as u32);
        }
        Some(removed)
    }

    pub fn body(&self, node: NodeIdx) -> Option<&Body> {
        let slot = self.slots.get(node.index()).copied().flatten()?;
        self.bodies.get(slot as usize)
    }

    pub fn body_mut(&mut self, node: NodeIdx) -> Option<&mut Body> {
        let slot = self.slots.get(node.index()).copied().flatten()?;
        self.bodies.get_mut(slot as usize)
    }

    /// One tick: damping, springs, repulsion, center gravity, integration.
    pub fn step(&mut self, edges: &[Edge], index: &QuadTree) {
        let s = self.settings;

        for body in self.bodies.iter_mut().filter(|b| !b.pinned) {
            body.vx *= s.damping;
            body.vy *= s.damping;
        }

        forces::apply_springs(&mut self.bodies, &self.slots, edges);

        if self.bodies.len() >= s.approximation_threshold {
            forces::apply_indexed_repulsion(
                &mut self.bodies,
                index,
                s.neighbor_radius,
                s.repulsion_force,
                s.min_distance_sq,
                &mut self.scratch,
            );
        } else {
            forces::apply_direct_repulsion(&mut self.bodies, s.repulsion_force, s.min_distance_sq);
        }

        let max_speed_sq = s.max_speed * s.max_speed;
        for body in self.bodies.iter_mut() {
            if body.pinned {
                body.x = body.target_x;
                body.y = body.target_y;
                continue;
            }
            body.vx -= body.x * s.center_gravity;
            body.vy -= body.y * s.center_gravity;

            if !body.vx.is_finite() || !body.vy.is_finite() {
                body.vx = 0.0;
                body.vy = 0.0;
            }
            let speed_sq = body.vx * body.vx + body.vy * body.vy;
            if speed_sq > max_speed_sq {
                let scale = s.max_speed / speed_sq.sqrt();
                body.vx *= scale;
                body.vy *= scale;
            }

            let (x, y) = s.world.clamp_point(body.x + body.vx, body.y + body.vy);
            body.x = x;
            body.y = y;
        }
    }

    pub fn spatial_items(&self) -> impl Iterator<Item = SpatialItem> + '_ {
        self.bodies
            .iter()
            .map(|body| SpatialItem::new(body.node.0, body.x, body.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PhysicsSettings {
        PhysicsSettings {
            spring_stiffness: 0.1,
            repulsion_force: 1000.0,
            damping: 0.9,
            center_gravity: 0.0,
            max_speed: 50.0,
            min_distance_sq: 1.0,
            approximation_threshold: 1_000,
            neighbor_radius: 200.0,
            world: Bounds::centered(0.0, 0.0, 1000.0),
        }
    }

    fn empty_index() -> QuadTree {
        QuadTree::new(Bounds::centered(0.0, 0.0, 1000.0), 4, 8)
    }

    fn edge(source: u32, target: u32, rest: f32, stiffness: f32) -> Edge {
        Edge {
            source: NodeIdx(source),
            target: NodeIdx(target),
            rest_length: rest,
            depth: 1,
            stiffness,
        }
    }

    #[test]
    fn coincident_bodies_stay_finite_and_unpushed() {
        let mut solver = Solver::new(settings());
        solver.add_body(Body::new(NodeIdx(0), 5.0, 5.0, 1.0));
        solver.add_body(Body::new(NodeIdx(1), 5.0, 5.0, 1.0));
        solver.step(&[], &empty_index());

        for body in solver.bodies() {
            assert_eq!((body.vx, body.vy), (0.0, 0.0));
            assert_eq!((body.x, body.y), (5.0, 5.0));
        }
    }

    #[test]
    fn stretched_spring_pulls_together_lighter_moves_more() {
        let mut s = settings();
        s.repulsion_force = 0.0;
        let mut solver = Solver::new(s);
        solver.add_body(Body::new(NodeIdx(0), 0.0, 0.0, 3.0));
        solver.add_body(Body::new(NodeIdx(1), 100.0, 0.0, 1.0));
        solver.step(&[edge(0, 1, 50.0, 0.1)], &empty_index());

        let a = *solver.body(NodeIdx(0)).expect("a");
        let b = *solver.body(NodeIdx(1)).expect("b");
        assert!(a.vx > 0.0 && b.vx < 0.0);
        assert!(b.vx.abs() > a.vx.abs());
        assert!((a.vx * 3.0 + b.vx).abs() < 1e-4);
    }

    #[test]
    fn pinned_bodies_do_not_move() {
        let mut solver = Solver::new(settings());
        let mut pinned = Body::new(NodeIdx(0), 0.0, 0.0, 1.0);
        pinned.pinned = true;
        solver.add_body(pinned);
        solver.add_body(Body::new(NodeIdx(1), 10.0, 0.0, 1.0));
        solver.step(&[], &empty_index());

        assert_eq!(solver.body(NodeIdx(0)).map(|b| (b.x, b.y)), Some((0.0, 0.0)));
        assert!(solver.body(NodeIdx(1)).map(|b| b.x > 10.0).unwrap_or(false));
    }

    #[test]
    fn pinned_bodies_return_to_target() {
        let mut solver = Solver::new(settings());
        let mut body = Body::new(NodeIdx(0), 10.0, 10.0, 1.0);
        body.pinned = true;
        body.target_x = -40.0;
        body.target_y = 25.0;
        solver.add_body(body);
        solver.step(&[], &empty_index());
        assert_eq!(solver.body(NodeIdx(0)).map(|b| (b.x, b.y)), Some((-40.0, 25.0)));
    }

    #[test]
    fn speed_and_world_bounds_are_clamped() {
        let mut s = settings();
        s.max_speed = 5.0;
        let mut solver = Solver::new(s);
        let mut body = Body::new(NodeIdx(0), 998.0, 0.0, 1.0);
        body.vx = 500.0;
        solver.add_body(body);
        solver.step(&[], &empty_index());

        let body = solver.body(NodeIdx(0)).expect("body");
        assert_eq!(body.x, 1000.0);
        assert!((body.vx - 5.0).abs() < 1e-4);
    }

    #[test]
    fn center_gravity_pulls_toward_origin() {
        let mut s = settings();
        s.center_gravity = 0.01;
        let mut solver = Solver::new(s);
        solver.add_body(Body::new(NodeIdx(0), 100.0, -100.0, 1.0));
        solver.step(&[], &empty_index());
        let body = solver.body(NodeIdx(0)).expect("body");
        assert!(body.x < 100.0 && body.y > -100.0);
    }

    #[test]
    fn indexed_repulsion_agrees_in_direction_with_direct() {
        let mut s = settings();
        s.approximation_threshold = 2;
        let mut solver = Solver::new(s);
        solver.add_body(Body::new(NodeIdx(0), -10.0, 0.0, 1.0));
        solver.add_body(Body::new(NodeIdx(1), 10.0, 0.0, 1.0));
        solver.add_body(Body::new(NodeIdx(2), 900.0, 900.0, 1.0));

        let mut index = empty_index();
        index.rebuild(solver.spatial_items().collect::<Vec<_>>());
        solver.step(&[], &index);

        assert!(solver.body(NodeIdx(0)).map(|b| b.vx < 0.0).unwrap_or(false));
        assert!(solver.body(NodeIdx(1)).map(|b| b.vx > 0.0).unwrap_or(false));
        assert_eq!(solver.body(NodeIdx(2)).map(|b| b.vx), Some(0.0), "out of radius");
    }

    #[test]
    fn stiffness_update_rewrites_edges() {
        let mut solver = Solver::new(settings());
        let mut edges = vec![edge(0, 1, 10.0, 0.1), edge(1, 2, 10.0, 0.1)];
        edges[1].depth = 4;
        solver.apply_settings(
            PhysicsSettingsUpdate {
                spring_stiffness: Some(0.5),
                damping: Some(3.0),
                ..Default::default()
            },
            &mut edges,
        );
        assert_eq!(edges[0].stiffness, edge_stiffness(0.5, 1));
        assert_eq!(edges[1].stiffness, edge_stiffness(0.5, 4));
        assert_eq!(solver.settings().damping, 1.0);
        assert_eq!(solver.settings().repulsion_force, 1000.0);
    }

    #[test]
    fn swap_remove_keeps_slots_consistent() {
        let mut solver = Solver::new(settings());
        for i in 0..4 {
            solver.add_body(Body::new(NodeIdx(i), i as f32, 0.0, 1.0));
        }
        assert!(solver.remove_body(NodeIdx(1)).is_some());
        assert!(solver.remove_body(NodeIdx(1)).is_none());
        assert_eq!(solver.len(), 3);
        assert_eq!(solver.body(NodeIdx(3)).map(|b| b.x), Some(3.0));
        assert_eq!(solver.body(NodeIdx(0)).map(|b| b.x), Some(0.0));
    }
}
