use gitgrove_core::{BeamView, Rgb};

use super::pool::{FlatPool, MAX_TTL, TTL};

const X1: usize = 2;
const Y1: usize = 3;
const X2: usize = 4;
const Y2: usize = 5;
const PROGRESS: usize = 6;
const SPEED: usize = 7;
const WIDTH: usize = 8;
const OPACITY: usize = 9;
const STRIDE: usize = 10;

/// Author-to-file attribution line that grows from `(x1, y1)` toward `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beam {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub width: f32,
    /// Progress per ms; the beam is fully drawn once progress reaches 1.
    pub speed: f32,
    pub ttl: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone)]
pub struct BeamPool {
    pool: FlatPool<STRIDE>,
}

impl BeamPool {
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

    pub fn add(&mut self, beam: Beam) -> usize {
        let slot = self.pool.add(beam.ttl.max(f32::EPSILON), beam.color);
        let record = self.pool.record_mut(slot);
        record[X1] = beam.x1;
        record[Y1] = beam.y1;
        record[X2] = beam.x2;
        record[Y2] = beam.y2;
        record[SPEED] = beam.speed.max(0.0);
        record[WIDTH] = beam.width;
        record[OPACITY] = 1.0;
        slot
    }

    pub fn update(&mut self, dt: f32) {
        self.pool.tick(dt, |record, dt| {
            record[PROGRESS] = (record[PROGRESS] + record[SPEED] * dt).min(1.0);
            let remaining = (record[TTL] - dt).max(0.0);
            record[OPACITY] = remaining / record[MAX_TTL];
        });
    }

    pub fn views(&self) -> Vec<BeamView> {
        (0..self.pool.len())
            .map(|slot| {
                let record = self.pool.record(slot);
                BeamView {
                    x1: record[X1],
                    y1: record[Y1],
                    x2: record[X2],
                    y2: record[Y2],
                    progress: record[PROGRESS],
                    width: record[WIDTH],
                    opacity: record[OPACITY],
                    color: self.pool.color(slot),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beam(ttl: f32) -> Beam {
        Beam {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 0.0,
            width: 1.5,
            speed: 0.01,
            ttl,
            color: Rgb::new(9, 9, 9),
        }
    }

    #[test]
    fn beams_progress_fade_and_expire() {
        let mut pool = BeamPool::new(4);
        pool.add(beam(200.0));

        pool.update(50.0);
        let view = &pool.views()[0];
        assert!((view.progress - 0.5).abs() < 1e-5);
        assert!((view.opacity - 0.75).abs() < 1e-5);

        pool.update(100.0);
        assert_eq!(pool.views()[0].progress, 1.0);

        pool.update(60.0);
        assert!(pool.is_empty());
    }

    #[test]
    fn capacity_is_respected() {
        let mut pool = BeamPool::new(2);
        for ttl in [10.0, 20.0, 30.0, 40.0] {
            pool.add(beam(ttl));
        }
        assert_eq!(pool.len(), 2);
    }
}
