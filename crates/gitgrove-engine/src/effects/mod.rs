mod beams;
mod particles;
pub mod pool;

pub use beams::{Beam, BeamPool};
pub use particles::{Particle, ParticlePool};
