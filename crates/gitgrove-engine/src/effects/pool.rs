use gitgrove_core::Rgb;

/// Field 0 of every record.
pub const TTL: usize = 0;
/// Field 1 of every record.
pub const MAX_TTL: usize = 1;

/// Fixed-capacity store of `STRIDE`-wide `f32` records plus a parallel RGB triple.
///
/// Slots `0..len` are live. Removal swaps the last record into the hole, so slot
/// numbers are not stable across `tick`/`add`.
#[derive(Debug, Clone)]
pub struct FlatPool<const STRIDE: usize> {
    data: Box<[f32]>,
    colors: Box<[u8]>,
    len: usize,
    capacity: usize,
}

impl<const STRIDE: usize> FlatPool<STRIDE> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: vec![0.0; capacity * STRIDE].into_boxed_slice(),
            colors: vec![0; capacity * 3].into_boxed_slice(),
            len: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Claims a slot and writes `ttl`/`max_ttl`; when full, the lowest-TTL record is overwritten.
    pub fn add(&mut self, ttl: f32, color: Rgb) -> usize {
        let slot = if self.len < self.capacity {
            self.len += 1;
            self.len - 1
        } else {
            self.lowest_ttl_slot()
        };

        let record = self.record_mut(slot);
        record.fill(0.0);
        record[TTL] = ttl;
        record[MAX_TTL] = ttl;
        self.colors[slot * 3..slot * 3 + 3].copy_from_slice(&color.0);
        slot
    }

    pub fn record(&self, slot: usize) -> &[f32] {
        &self.data[slot * STRIDE..(slot + 1) * STRIDE]
    }

    pub fn record_mut(&mut self, slot: usize) -> &mut [f32] {
        &mut self.data[slot * STRIDE..(slot + 1) * STRIDE]
    }

    pub fn color(&self, slot: usize) -> Rgb {
        Rgb([
            self.colors[slot * 3],
            self.colors[slot * 3 + 1],
            self.colors[slot * 3 + 2],
        ])
    }

    /// Runs `advance` on every live record, then spends `dt` of its TTL and drops the dead.
    pub fn tick<F>(&mut self, dt: f32, mut advance: F)
    where
        F: FnMut(&mut [f32], f32),
    {
        let mut slot = 0;
        while slot < self.len {
            let record = self.record_mut(slot);
            advance(record, dt);
            record[TTL] -= dt;
            if record[TTL] <= 0.0 {
                self.swap_remove(slot);
            } else {
                slot += 1;
            }
        }
    }

    fn swap_remove(&mut self, slot: usize) {
        let last = self.len - 1;
        if slot != last {
            self.data
                .copy_within(last * STRIDE..(last + 1) * STRIDE, slot * STRIDE);
            self.colors.copy_within(last * 3..last * 3 + 3, slot * 3);
        }
        self.len -= 1;
    }

    fn lowest_ttl_slot(&self) -> usize {
        let mut best = 0;
        let mut best_ttl = f32::INFINITY;
        for slot in 0..self.len {
            let ttl = self.data[slot * STRIDE + TTL];
            if ttl < best_ttl {
                best_ttl = ttl;
                best = slot;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttls<const S: usize>(pool: &FlatPool<S>) -> Vec<f32> {
        let mut out: Vec<f32> = (0..pool.len()).map(|s| pool.record(s)[TTL]).collect();
        out.sort_by(|a, b| a.total_cmp(b));
        out
    }

    #[test]
    fn full_pool_evicts_lowest_ttl() {
        let mut pool: FlatPool<4> = FlatPool::new(3);
        pool.add(100.0, Rgb::new(1, 0, 0));
        let weakest = pool.add(50.0, Rgb::new(2, 0, 0));
        pool.add(200.0, Rgb::new(3, 0, 0));

        let slot = pool.add(300.0, Rgb::new(4, 0, 0));
        assert_eq!(slot, weakest);
        assert_eq!(pool.len(), 3);
        assert_eq!(ttls(&pool), vec![100.0, 200.0, 300.0]);
        assert_eq!(pool.color(slot), Rgb::new(4, 0, 0));
    }

    #[test]
    fn overfilling_never_exceeds_capacity() {
        let mut pool: FlatPool<2> = FlatPool::new(8);
        for i in 0..100 {
            pool.add(i as f32, Rgb::default());
            assert!(pool.len() <= pool.capacity());
        }
        assert_eq!(pool.len(), 8);
        assert_eq!(ttls(&pool), (92..100).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn tick_swap_removes_dead_records() {
        let mut pool: FlatPool<3> = FlatPool::new(4);
        pool.add(10.0, Rgb::new(1, 1, 1));
        pool.add(100.0, Rgb::new(2, 2, 2));
        pool.add(5.0, Rgb::new(3, 3, 3));
        pool.add(100.0, Rgb::new(4, 4, 4));

        let mut advanced = 0;
        pool.tick(20.0, |record, dt| {
            record[2] += dt;
            advanced += 1;
        });

        assert_eq!(advanced, 4);
        assert_eq!(pool.len(), 2);
        assert_eq!(ttls(&pool), vec![80.0, 80.0]);
        let mut colors: Vec<u8> = (0..pool.len()).map(|s| pool.color(s).r()).collect();
        colors.sort_unstable();
        assert_eq!(colors, vec![2, 4]);
        assert!((0..pool.len()).all(|s| pool.record(s)[2] == 20.0));
    }

    #[test]
    fn zero_capacity_is_promoted_to_one() {
        let mut pool: FlatPool<2> = FlatPool::new(0);
        pool.add(1.0, Rgb::default());
        pool.add(2.0, Rgb::default());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.record(0)[TTL], 2.0);
    }
}
