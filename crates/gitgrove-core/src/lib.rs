use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    #[serde(alias = "added")]
    Add,
    #[serde(alias = "modified", alias = "changed", alias = "renamed")]
    Modify,
    #[serde(alias = "removed", alias = "deleted")]
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    #[serde(alias = "status")]
    pub change_kind: ChangeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitEvent {
    pub repo_id: String,
    pub sha: String,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub affected_files: Vec<FileChange>,
}

impl CommitEvent {
    /// Key used to apply an event exactly once; shas repeat across forks.
    pub fn replay_key(&self) -> String {
        format!("{}:{}", self.repo_id, self.sha)
    }
}

/// Node ids are `"{repo}:{path}"` with a `/`-rooted path.
pub fn node_id(repo_id: &str, path: &str) -> String {
    format!("{repo_id}:{path}")
}

pub fn root_id(repo_id: &str) -> String {
    node_id(repo_id, "/")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }

    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(input: &str) -> Option<Self> {
        let hex = input.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Directory,
    File,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Code,
    Web,
    Style,
    Markup,
    Config,
    Data,
    Docs,
    Image,
    Build,
    Test,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeView {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<String>,
    pub category: Option<FileCategory>,
    pub color: Rgb,
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub scale: f32,
    pub visible: bool,
    pub depth: u16,
    pub modification_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BeamView {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub progress: f32,
    pub width: f32,
    pub opacity: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticleView {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub opacity: f32,
    pub color: Rgb,
}

/// Everything a renderer needs for one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Frame {
    pub time: i64,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub applied: Vec<CommitEvent>,
    pub beams: Vec<BeamView>,
    pub particles: Vec<ParticleView>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EngineStats {
    pub total_nodes: usize,
    pub file_nodes: usize,
    pub directory_nodes: usize,
    pub root_nodes: usize,
    pub edges: usize,
    pub processed_commits: usize,
    pub total_commits: usize,
    pub repos: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PhysicsSettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spring_stiffness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repulsion_force: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_gravity: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Msg {
    Hello { version: String },
    Frame { frame: Frame },
    Stats { stats: EngineStats },
    Seek { time_ms: i64 },
    Reset,
    Settings { settings: PhysicsSettingsUpdate },
    SetSpeed { speed: f64 },
    Pause { paused: bool },
    Ping,
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_kind_accepts_hosting_api_spellings() {
        let raw = r#"[
            {"path": "a", "change_kind": "added"},
            {"path": "b", "status": "renamed"},
            {"path": "c", "change_kind": "removed"},
            {"path": "d", "change_kind": "modify"}
        ]"#;
        let changes: Vec<FileChange> = serde_json::from_str(raw).expect("parse changes");
        let kinds: Vec<ChangeKind> = changes.iter().map(|c| c.change_kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Add,
                ChangeKind::Modify,
                ChangeKind::Delete,
                ChangeKind::Modify
            ]
        );
    }

    #[test]
    fn msg_is_adjacently_tagged() {
        let msg = Msg::Seek { time_ms: 42 };
        let json = serde_json::to_value(&msg).expect("encode");
        assert_eq!(json["type"], "Seek");
        assert_eq!(json["data"]["time_ms"], 42);

        let ping = serde_json::to_value(&Msg::Ping).expect("encode");
        assert_eq!(ping["type"], "Ping");
    }

    #[test]
    fn hex_colors_parse_with_or_without_hash() {
        assert_eq!(Rgb::from_hex("#dea584"), Some(Rgb::new(0xde, 0xa5, 0x84)));
        assert_eq!(Rgb::from_hex("00ff10"), Some(Rgb::new(0, 255, 16)));
        assert_eq!(Rgb::from_hex("#fff"), None);
        assert_eq!(Rgb::from_hex("#zzzzzz"), None);
        assert_eq!(Rgb::new(1, 2, 255).to_hex(), "#0102ff");
    }

    #[test]
    fn ids_are_repo_scoped() {
        assert_eq!(root_id("r1"), "r1:/");
        assert_eq!(node_id("r1", "/src/a.ts"), "r1:/src/a.ts");
    }

    #[test]
    fn settings_update_omits_unset_fields() {
        let update = PhysicsSettingsUpdate {
            damping: Some(0.5),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).expect("encode");
        assert_eq!(json, r#"{"damping":0.5}"#);
    }
}
