use crate::graph::model::Edge;
use crate::spatial::{QuadTree, SpatialItem};

use super::Body;

/// Inverse-square push of `a` away from `b`, given `delta = a - b`.
///
/// Pairs closer than `sqrt(min_distance_sq)` get no force at all, which also covers
/// coincident points and non-finite input.
pub(super) fn repulsion(dx: f32, dy: f32, strength: f32, min_distance_sq: f32) -> (f32, f32) {
    let distance_sq = dx * dx + dy * dy;
    if !(distance_sq >= min_distance_sq) || distance_sq <= f32::EPSILON || !distance_sq.is_finite() {
        return (0.0, 0.0);
    }
    let distance = distance_sq.sqrt();
    let magnitude = strength / distance_sq;
    (dx / distance * magnitude, dy / distance * magnitude)
}

fn push(body: &mut Body, fx: f32, fy: f32) {
    if body.pinned {
        return;
    }
    body.vx += fx / body.mass;
    body.vy += fy / body.mass;
}

pub(super) fn apply_springs(bodies: &mut [Body], slots: &[Option<u32>], edges: &[Edge]) {
    for edge in edges {
        let (Some(a), Some(b)) = (slot_of(slots, edge.source.0), slot_of(slots, edge.target.0))
        else {
            continue;
        };
        if a == b {
            continue;
        }

        let dx = bodies[b].x - bodies[a].x;
        let dy = bodies[b].y - bodies[a].y;
        let distance = (dx * dx + dy * dy).sqrt();
        if !(distance > 0.0001) {
            continue;
        }

        let force = edge.stiffness * (distance - edge.rest_length);
        let fx = dx / distance * force;
        let fy = dy / distance * force;
        push(&mut bodies[a], fx, fy);
        push(&mut bodies[b], -fx, -fy);
    }
}

pub(super) fn apply_direct_repulsion(bodies: &mut [Body], strength: f32, min_distance_sq: f32) {
    let count = bodies.len();
    for i in 0..count {
        for j in (i + 1)..count {
            let dx = bodies[i].x - bodies[j].x;
            let dy = bodies[i].y - bodies[j].y;
            let (fx, fy) = repulsion(dx, dy, strength, min_distance_sq);
            if fx == 0.0 && fy == 0.0 {
                continue;
            }
            push(&mut bodies[i], fx, fy);
            push(&mut bodies[j], -fx, -fy);
        }
    }
}

/// Neighbour-limited repulsion; each body only accumulates onto itself.
pub(super) fn apply_indexed_repulsion(
    bodies: &mut [Body],
    index: &QuadTree,
    radius: f32,
    strength: f32,
    min_distance_sq: f32,
    scratch: &mut Vec<SpatialItem>,
) {
    for body in bodies.iter_mut() {
        if body.pinned {
            continue;
        }
        scratch.clear();
        index.query_radius_into(body.x, body.y, radius, scratch);

        let (mut fx, mut fy) = (0.0, 0.0);
        for other in scratch.iter() {
            if other.id == body.node.0 {
                continue;
            }
            let (px, py) = repulsion(body.x - other.x, body.y - other.y, strength, min_distance_sq);
            fx += px;
            fy += py;
        }
        push(body, fx, fy);
    }
}

fn slot_of(slots: &[Option<u32>], node: u32) -> Option<usize> {
    slots
        .get(node as usize)
        .copied()
        .flatten()
        .map(|slot| slot as usize)
}
