use gitgrove_core::{
    node_id, root_id, ChangeKind, CommitEvent, EdgeView, Frame, NodeKind, PhysicsSettingsUpdate,
    Rgb,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f32::consts::TAU;

use crate::color::{categorize, ColorTable, DELETED_COLOR};
use crate::effects::{Beam, BeamPool, Particle, ParticlePool};
use crate::graph::layout::{child_offset, mass_for, root_position};
use crate::graph::model::{edge_stiffness, Edge, GraphModel, Node, NodeIdx};
use crate::graph::timeline::ReplayState;
use crate::physics::{Body, PhysicsSettings, Solver};
use crate::spatial::{Bounds, QuadTree, SpatialItem};
use crate::util::config::EngineConfig;
use crate::util::ids::{join_segments, path_segments};

const FALLBACK_REPO_COLOR: Rgb = Rgb::new(0xcc, 0xcc, 0xcc);
const BEAM_WIDTH: f32 = 1.5;

/// One visualization session: graph, solver, spatial index, replay cursor and effect pools.
///
/// Driven entirely by the caller's frame loop through [`Engine::update`] and
/// [`Engine::seek_to`]; nothing here blocks or spawns.
pub struct Engine {
    pub(crate) cfg: EngineConfig,
    pub(crate) model: GraphModel,
    pub(crate) solver: Solver,
    pub(crate) index: QuadTree,
    pub(crate) replay: ReplayState,
    pub(crate) colors: ColorTable,
    pub(crate) beams: BeamPool,
    pub(crate) particles: ParticlePool,
    layout_rng: StdRng,
    effects_rng: StdRng,
    root_order: HashMap<String, usize>,
    current_time: i64,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        let world = Bounds::centered(0.0, 0.0, cfg.world_half_extent.abs());
        Self {
            model: GraphModel::default(),
            solver: Solver::new(PhysicsSettings::from_config(&cfg)),
            index: QuadTree::new(world, cfg.quadtree_max_depth, cfg.quadtree_max_items),
            replay: ReplayState::default(),
            colors: ColorTable::new(&cfg.extension_colors),
            beams: BeamPool::new(cfg.beam_capacity),
            particles: ParticlePool::new(cfg.particle_capacity),
            layout_rng: StdRng::seed_from_u64(cfg.seed),
            effects_rng: StdRng::seed_from_u64(cfg.seed.wrapping_add(1)),
            root_order: HashMap::new(),
            current_time: 0,
            cfg,
        }
    }

    pub fn with_events(cfg: EngineConfig, events: Vec<CommitEvent>) -> Self {
        let mut engine = Self::new(cfg);
        engine.initialize(events);
        engine
    }

    /// Replaces the commit stream; input order does not matter.
    pub fn initialize(&mut self, events: Vec<CommitEvent>) {
        self.replay.load(events);
        let events = self.replay.events();
        self.colors.assign_repos(&events);
        self.reset_playback();
        tracing::info!(
            events = self.replay.total(),
            repos = self.colors.repo_count(),
            "commit stream loaded"
        );
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn current_time(&self) -> i64 {
        self.current_time
    }

    pub fn time_range(&self) -> Option<(i64, i64)> {
        self.replay.time_range()
    }

    pub fn is_finished(&self) -> bool {
        self.replay.is_finished()
    }

    pub fn reset_playback(&mut self) {
        self.model.clear();
        self.solver.clear();
        self.index.clear();
        self.replay.reset();
        self.beams.clear();
        self.particles.clear();
        self.root_order.clear();
        self.layout_rng = StdRng::seed_from_u64(self.cfg.seed);
        self.effects_rng = StdRng::seed_from_u64(self.cfg.seed.wrapping_add(1));
        self.current_time = 0;
    }

    /// One animation step: replay due commits, step the solver, rebuild the index.
    ///
    /// `current_time` is simulated commit time in ms; `delta_time` is elapsed
    /// frame time in ms and only drives effect lifetimes.
    pub fn update(&mut self, current_time: i64, delta_time: f32) -> Frame {
        self.current_time = current_time;
        self.decay_pulses();
        let applied = self.replay_until(current_time, true);

        self.solver.step(self.model.edges(), &self.index);
        self.sync_bodies();
        self.tick_visuals(delta_time.max(0.0));

        self.frame(applied)
    }

    /// Rebuilds the graph as of `target_time` and lets the layout settle.
    pub fn seek_to(&mut self, target_time: i64) -> Frame {
        self.reset_playback();
        self.current_time = target_time;
        self.replay_until(target_time, false);
        self.sync_bodies();

        let iterations = self.cfg.settle_iterations(self.model.len());
        for _ in 0..iterations {
            self.solver.step(self.model.edges(), &self.index);
            self.sync_bodies();
        }

        for (_, node) in self.model.iter_mut() {
            node.scale = 1.0;
        }
        self.refresh_idle_opacity();

        tracing::info!(
            target_time,
            processed = self.replay.processed_count(),
            nodes = self.model.len(),
            iterations,
            "seek settled"
        );
        self.frame(Vec::new())
    }

    pub fn set_physics_settings(&mut self, update: PhysicsSettingsUpdate) {
        self.solver.apply_settings(update, self.model.edges_mut());
        tracing::debug!(?update, "physics settings updated");
    }

    pub fn physics_settings(&self) -> PhysicsSettings {
        *self.solver.settings()
    }

    /// Pinned nodes ignore forces until released.
    pub fn set_pinned(&mut self, id: &str, pinned: bool) -> bool {
        let Some(body) = self
            .model
            .lookup(id)
            .and_then(|idx| self.solver.body_mut(idx))
        else {
            return false;
        };
        body.pinned = pinned;
        if pinned {
            body.target_x = body.x;
            body.target_y = body.y;
            body.vx = 0.0;
            body.vy = 0.0;
        }
        true
    }

    pub fn move_node(&mut self, id: &str, x: f32, y: f32) -> bool {
        let Some(idx) = self.model.lookup(id) else {
            return false;
        };
        let (x, y) = self.solver.settings().world.clamp_point(x, y);
        let Some(body) = self.solver.body_mut(idx) else {
            return false;
        };
        body.x = x;
        body.y = y;
        body.target_x = x;
        body.target_y = y;
        body.vx = 0.0;
        body.vy = 0.0;

        if let Some(node) = self.model.get_mut(idx) {
            node.x = x;
            node.y = y;
            node.vx = 0.0;
            node.vy = 0.0;
        }
        self.index.insert(SpatialItem::new(idx.0, x, y));
        true
    }

    pub fn beams(&self) -> &BeamPool {
        &self.beams
    }

    pub fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    fn replay_until(&mut self, until: i64, live: bool) -> Vec<CommitEvent> {
        let events = self.replay.events();
        let due = self.replay.advance(until);
        let mut applied = Vec::new();

        for event in &events[due] {
            if !self.replay.mark_processed(event) {
                tracing::debug!(repo = %event.repo_id, sha = %event.sha, "commit already applied");
                continue;
            }
            self.apply_commit(event, live);
            if live {
                applied.push(event.clone());
            }
        }

        if !applied.is_empty() {
            tracing::debug!(applied = applied.len(), until, "commits replayed");
        }
        applied
    }

    fn apply_commit(&mut self, event: &CommitEvent, live: bool) {
        for change in &event.affected_files {
            let segments = path_segments(&change.path);
            if segments.is_empty() {
                tracing::debug!(sha = %event.sha, path = %change.path, "ignoring empty path");
                continue;
            }
            match change.change_kind {
                ChangeKind::Add | ChangeKind::Modify => {
                    self.touch_file(&event.repo_id, &segments, event.timestamp_ms, live)
                }
                ChangeKind::Delete => self.delete_file(&event.repo_id, &segments, live),
            }
        }
    }

    fn ensure_root(&mut self, repo: &str, ts: i64) -> Option<NodeIdx> {
        let id = root_id(repo);
        if let Some(idx) = self.model.lookup(&id) {
            return Some(idx);
        }

        let order = self.root_order.len();
        let repo_count = self.colors.repo_count().max(order + 1);
        let (x, y) = root_position(order, repo_count, self.cfg.root_ring_radius);
        let color = self.colors.repo_color(repo).unwrap_or(FALLBACK_REPO_COLOR);

        let mut node = Node::new(id, repo.to_string(), repo.to_string(), NodeKind::Root, color);
        node.x = x;
        node.y = y;
        node.last_modified = ts;
        let idx = self.model.insert(node)?;
        self.solver
            .add_body(Body::new(idx, x, y, mass_for(NodeKind::Root)));
        self.root_order.insert(repo.to_string(), order);
        Some(idx)
    }

    /// Places `node` around `parent` and links them with a spring.
    fn spawn_child(&mut self, parent: NodeIdx, mut node: Node) -> Option<NodeIdx> {
        let parent_depth = self.model.get(parent)?.depth;
        let body = self.solver.body_mut(parent)?;
        let (px, py, child_count) = (body.x, body.y, body.child_count);
        body.child_count += 1;

        let (dx, dy, distance) = child_offset(&mut self.layout_rng, child_count, node.kind);
        let (x, y) = self.solver.settings().world.clamp_point(px + dx, py + dy);
        let kind = node.kind;
        let depth = parent_depth.saturating_add(1);
        node.parent = Some(parent);
        node.depth = depth;
        node.x = x;
        node.y = y;

        let idx = self.model.insert(node)?;
        self.solver.add_body(Body::new(idx, x, y, mass_for(kind)));
        self.model.add_edge(Edge {
            source: parent,
            target: idx,
            rest_length: distance,
            depth,
            stiffness: edge_stiffness(self.solver.settings().spring_stiffness, depth),
        });
        Some(idx)
    }

    /// First existing node on the path whose kind contradicts it: a file used as a
    /// directory, or a directory named as the changed file.
    fn path_conflict(&self, repo: &str, segments: &[&str]) -> Option<String> {
        let last = segments.len() - 1;
        (0..segments.len()).find_map(|depth| {
            let id = node_id(repo, &join_segments(&segments[..=depth]));
            let node = self.model.by_id(&id)?;
            let expects_file = depth == last;
            (node.is_file() != expects_file).then_some(id)
        })
    }

    fn touch_file(&mut self, repo: &str, segments: &[&str], ts: i64, live: bool) {
        if let Some(id) = self.path_conflict(repo, segments) {
            tracing::debug!(%id, "path conflicts with an existing node, skipping change");
            return;
        }
        let Some(root) = self.ensure_root(repo, ts) else {
            return;
        };
        if let Some(node) = self.model.get_mut(root) {
            node.modification_count = node.modification_count.saturating_add(1);
            node.last_modified = ts;
        }
        let repo_color = self.colors.repo_color(repo).unwrap_or(FALLBACK_REPO_COLOR);

        let mut parent = root;
        for depth in 0..segments.len() - 1 {
            let id = node_id(repo, &join_segments(&segments[..=depth]));
            parent = match self.model.lookup(&id) {
                Some(idx) => {
                    let Some(node) = self.model.get_mut(idx) else {
                        return;
                    };
                    node.modification_count = node.modification_count.saturating_add(1);
                    node.last_modified = ts;
                    idx
                }
                None => {
                    let mut dir = Node::new(
                        id,
                        segments[depth].to_string(),
                        repo.to_string(),
                        NodeKind::Directory,
                        repo_color,
                    );
                    dir.last_modified = ts;
                    dir.modification_count = 1;
                    match self.spawn_child(parent, dir) {
                        Some(idx) => idx,
                        None => return,
                    }
                }
            };
        }

        let path = join_segments(segments);
        let id = node_id(repo, &path);
        let pulse = self.cfg.pulse_scale.max(1.0);
        let leaf = match self.model.lookup(&id) {
            Some(idx) => {
                let Some(node) = self.model.get_mut(idx) else {
                    return;
                };
                node.last_modified = ts;
                node.modification_count = node.modification_count.saturating_add(1);
                node.scale = pulse;
                node.opacity = 1.0;
                node.visible = true;
                idx
            }
            None => {
                let category = categorize(&path);
                let color = self.colors.file_color(&path, category);
                let name = segments[segments.len() - 1].to_string();
                let mut file = Node::new(id, name, repo.to_string(), NodeKind::File, color);
                file.category = Some(category);
                file.last_modified = ts;
                file.modification_count = 1;
                file.scale = pulse;
                match self.spawn_child(parent, file) {
                    Some(idx) => idx,
                    None => return,
                }
            }
        };

        if live && self.cfg.effects_enabled {
            self.emit_change_effects(root, leaf, repo_color, false);
        }
    }

    fn delete_file(&mut self, repo: &str, segments: &[&str], live: bool) {
        let id = node_id(repo, &join_segments(segments));
        let Some(idx) = self.model.lookup(&id) else {
            tracing::debug!(%id, "delete for unknown path");
            return;
        };
        let Some(node) = self.model.get_mut(idx) else {
            return;
        };
        if !node.is_file() {
            tracing::debug!(%id, "directories are never deleted");
            return;
        }
        node.visible = false;
        node.opacity = 0.0;

        if live && self.cfg.effects_enabled {
            if let Some(root) = self.model.lookup(&root_id(repo)) {
                self.emit_change_effects(root, idx, DELETED_COLOR, true);
            }
        }

        self.solver.remove_body(idx);
        self.index.remove(idx.0);
        self.model.remove(idx);
    }

    fn emit_change_effects(&mut self, root: NodeIdx, target: NodeIdx, beam_color: Rgb, deleted: bool) {
        let Some((tx, ty, node_color)) = self.model.get(target).map(|n| (n.x, n.y, n.color)) else {
            return;
        };

        if !deleted {
            if let Some((rx, ry)) = self.model.get(root).map(|n| (n.x, n.y)) {
                let ttl = self.cfg.beam_ttl_ms.max(1.0);
                self.beams.add(Beam {
                    x1: rx,
                    y1: ry,
                    x2: tx,
                    y2: ty,
                    width: BEAM_WIDTH,
                    speed: 2.0 / ttl,
                    ttl,
                    color: beam_color,
                });
            }
        }

        let color = if deleted { DELETED_COLOR } else { node_color };
        let ttl = self.cfg.particle_ttl_ms.max(1.0);
        for _ in 0..self.cfg.particles_per_change {
            let angle = self.effects_rng.gen_range(0.0..TAU);
            let speed = self.effects_rng.gen_range(0.02..0.08);
            let size = self.effects_rng.gen_range(1.5..3.5);
            self.particles.emit(Particle {
                x: tx,
                y: ty,
                vx: angle.cos() * speed,
                vy: angle.sin() * speed,
                size,
                ttl,
                color,
            });
        }
    }

    /// Copies solver positions into nodes and rebuilds the spatial index from scratch.
    fn sync_bodies(&mut self) {
        for body in self.solver.bodies() {
            if let Some(node) = self.model.get_mut(body.node) {
                node.x = body.x;
                node.y = body.y;
                node.vx = body.vx;
                node.vy = body.vy;
            }
        }
        self.index.rebuild(self.solver.spatial_items());
    }

    /// Runs before replay so a file touched this frame is shown at full pulse.
    fn decay_pulses(&mut self) {
        let decay = self.cfg.pulse_decay.clamp(0.0, 1.0);
        for (_, node) in self.model.iter_mut() {
            node.scale = decay_pulse(node.scale, decay);
        }
    }

    fn tick_visuals(&mut self, delta_time: f32) {
        self.refresh_idle_opacity();
        self.beams.update(delta_time);
        self.particles.update(delta_time);
    }

    fn refresh_idle_opacity(&mut self) {
        let now = self.current_time;
        let fade_ms = self.cfg.idle_fade_ms;
        let floor = self.cfg.min_idle_opacity.clamp(0.0, 1.0);
        for (_, node) in self.model.iter_mut() {
            if node.visible && node.is_file() {
                node.opacity = idle_opacity(now.saturating_sub(node.last_modified), fade_ms, floor);
            }
        }
    }

    pub(crate) fn edge_views(&self) -> Vec<EdgeView> {
        self.model
            .edges()
            .iter()
            .filter_map(|edge| {
                let source = self.model.get(edge.source)?;
                let target = self.model.get(edge.target)?;
                Some(EdgeView {
                    source: source.id.clone(),
                    target: target.id.clone(),
                    x1: source.x,
                    y1: source.y,
                    x2: target.x,
                    y2: target.y,
                })
            })
            .collect()
    }

    fn frame(&self, applied: Vec<CommitEvent>) -> Frame {
        Frame {
            time: self.current_time,
            nodes: self.node_views(),
            edges: self.edge_views(),
            applied,
            beams: self.beams.views(),
            particles: self.particles.views(),
        }
    }
}

fn decay_pulse(scale: f32, decay: f32) -> f32 {
    let next = 1.0 + (scale - 1.0) * decay;
    if (next - 1.0).abs() < 1e-3 {
        1.0
    } else {
        next
    }
}

fn idle_opacity(age_ms: i64, fade_ms: i64, floor: f32) -> f32 {
    if fade_ms <= 0 {
        return 1.0;
    }
    let t = age_ms.max(0) as f32 / fade_ms as f32;
    (1.0 - t).max(floor)
}
