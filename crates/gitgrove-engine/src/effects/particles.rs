use gitgrove_core::{ParticleView, Rgb};

use super::pool::{FlatPool, MAX_TTL, TTL};

const X: usize = 2;
const Y: usize = 3;
const VX: usize = 4;
const VY: usize = 5;
const SIZE: usize = 6;
const OPACITY: usize = 7;
const STRIDE: usize = 8;

/// Velocity retained per ms.
const DRAG: f32 = 0.998;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    /// World units per ms.
    pub vx: f32,
    pub vy: f32,
    pub size: f32,
    pub ttl: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone)]
pub struct ParticlePool {
    pool: FlatPool<STRIDE>,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: FlatPool::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn clear(&mut self) {
        self.pool.clear();
    }

    pub fn emit(&mut self, particle: Particle) -> usize {
        let slot = self.pool.add(particle.ttl.max(f32::EPSILON), particle.color);
        let record = self.pool.record_mut(slot);
        record[X] = particle.x;
        record[Y] = particle.y;
        record[VX] = particle.vx;
        record[VY] = particle.vy;
        record[SIZE] = particle.size;
        record[OPACITY] = 1.0;
        slot
    }

    pub fn update(&mut self, dt: f32) {
        let drag = DRAG.powf(dt.max(0.0));
        self.pool.tick(dt, |record, dt| {
            record[X] += record[VX] * dt;
            record[Y] += record[VY] * dt;
            record[VX] *= drag;
            record[VY] *= drag;
            let remaining = (record[TTL] - dt).max(0.0);
            record[OPACITY] = remaining / record[MAX_TTL];
        });
    }

    pub fn views(&self) -> Vec<ParticleView> {
        (0..self.pool.len())
            .map(|slot| {
                let record = self.pool.record(slot);
                ParticleView {
                    x: record[X],
                    y: record[Y],
                    size: record[SIZE],
                    opacity: record[OPACITY],
                    color: self.pool.color(slot),
                }
            })
            .collect()
    }
}
