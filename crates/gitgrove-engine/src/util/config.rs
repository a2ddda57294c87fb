use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world_half_extent: f32,
    pub quadtree_max_depth: u8,
    pub quadtree_max_items: usize,

    pub spring_stiffness: f32,
    pub repulsion_force: f32,
    pub damping: f32,
    pub center_gravity: f32,
    pub max_speed: f32,
    pub min_distance_sq: f32,
    pub approximation_threshold: usize,
    pub neighbor_radius: f32,

    pub root_ring_radius: f32,
    pub pulse_scale: f32,
    pub pulse_decay: f32,
    pub idle_fade_ms: i64,
    pub min_idle_opacity: f32,

    pub settle_min: usize,
    pub settle_max: usize,
    pub seed: u64,

    pub effects_enabled: bool,
    pub beam_capacity: usize,
    pub particle_capacity: usize,
    pub beam_ttl_ms: f32,
    pub particle_ttl_ms: f32,
    pub particles_per_change: usize,

    /// Extension (without dot) to `#rrggbb`.
    pub extension_colors: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_half_extent: 4000.0,
            quadtree_max_depth: 6,
            quadtree_max_items: 8,
            spring_stiffness: 0.04,
            repulsion_force: 900.0,
            damping: 0.86,
            center_gravity: 0.0004,
            max_speed: 18.0,
            min_distance_sq: 1.0,
            approximation_threshold: 400,
            neighbor_radius: 350.0,
            root_ring_radius: 400.0,
            pulse_scale: 1.6,
            pulse_decay: 0.92,
            idle_fade_ms: 0,
            min_idle_opacity: 0.35,
            settle_min: 20,
            settle_max: 240,
            seed: 0x5eed_6172_6f76,
            effects_enabled: true,
            beam_capacity: 256,
            particle_capacity: 2048,
            beam_ttl_ms: 900.0,
            particle_ttl_ms: 1200.0,
            particles_per_change: 4,
            extension_colors: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Settle iterations after a seek, growing with the graph.
    pub fn settle_iterations(&self, node_count: usize) -> usize {
        let min = self.settle_min;
        let max = self.settle_max.max(min);
        (min + node_count / 4).clamp(min, max)
    }
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "gitgrove")?;
    Some(proj.config_dir().join("engine.toml"))
}

pub fn load_or_default() -> EngineConfig {
    let Some(path) = config_file_path() else {
        return EngineConfig::default();
    };
    load_or_default_from_path(&path)
}

pub fn load_or_default_from_path(path: &Path) -> EngineConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return EngineConfig::default();
    };
    match toml::from_str(&contents) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "invalid engine config, using defaults");
            EngineConfig::default()
        }
    }
}

/// Strict variant for explicitly requested files.
pub fn load_from_path(path: &Path) -> anyhow::Result<EngineConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read engine config {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse engine config {}", path.display()))
}

pub fn save(cfg: &EngineConfig) -> anyhow::Result<()> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)
}

pub fn save_to_path(cfg: &EngineConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize engine config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write engine config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn engine_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("engine.toml");
        let mut cfg = EngineConfig::default();
        cfg.extension_colors
            .insert("rs".to_string(), "#dea584".to_string());
        cfg.damping = 0.5;

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("engine.toml");
        fs::write(&path, "repulsion_force = 10.0\n").expect("write");

        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded.repulsion_force, 10.0);
        assert_eq!(loaded.damping, EngineConfig::default().damping);
    }

    #[test]
    fn garbage_falls_back_to_default_but_strict_load_errors() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("engine.toml");
        fs::write(&path, "damping = \"very\"").expect("write");

        assert_eq!(load_or_default_from_path(&path), EngineConfig::default());
        assert!(load_from_path(&path).is_err());
        assert_eq!(
            load_or_default_from_path(&dir.path().join("missing.toml")),
            EngineConfig::default()
        );
    }

    #[test]
    fn settle_iterations_are_bounded() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.settle_iterations(0), cfg.settle_min);
        assert_eq!(cfg.settle_iterations(40), cfg.settle_min + 10);
        assert_eq!(cfg.settle_iterations(1_000_000), cfg.settle_max);
    }
}
