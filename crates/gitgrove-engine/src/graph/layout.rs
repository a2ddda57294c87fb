use gitgrove_core::NodeKind;
use rand::Rng;
use std::f32::consts::TAU;

pub const GOLDEN_ANGLE: f32 = 2.399_963;
const ANGLE_JITTER: f32 = 0.35;
const DIRECTORY_SPAWN: (f32, f32) = (60.0, 110.0);
const FILE_SPAWN: (f32, f32) = (24.0, 44.0);

pub fn mass_for(kind: NodeKind) -> f32 {
    match kind {
        NodeKind::Root => 5.0,
        NodeKind::Directory => 3.0,
        NodeKind::File => 1.0,
    }
}

/// Roots sit on a ring around the origin in creation order; a lone repository sits at the origin.
pub fn root_position(order: usize, repo_count: usize, ring_radius: f32) -> (f32, f32) {
    if repo_count <= 1 {
        return (0.0, 0.0);
    }
    let angle = TAU * order as f32 / repo_count as f32;
    (ring_radius * angle.cos(), ring_radius * angle.sin())
}

/// Offset of a new child from its parent; the distance doubles as the edge rest length.
pub fn child_offset<R: Rng>(rng: &mut R, child_count: u32, kind: NodeKind) -> (f32, f32, f32) {
    let (lo, hi) = match kind {
        NodeKind::File => FILE_SPAWN,
        NodeKind::Directory | NodeKind::Root => DIRECTORY_SPAWN,
    };
    let angle = child_count as f32 * GOLDEN_ANGLE + rng.gen_range(-ANGLE_JITTER..ANGLE_JITTER);
    let distance = rng.gen_range(lo..hi);
    (distance * angle.cos(), distance * angle.sin(), distance)
}
