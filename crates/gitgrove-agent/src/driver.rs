use gitgrove_core::{CommitEvent, Frame, Msg, PhysicsSettingsUpdate};
use gitgrove_engine::Engine;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, MissedTickBehavior};

const STATS_EVERY: u64 = 30;

/// Requests for the task that owns the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Seek(i64),
    Reset,
    Settings(PhysicsSettingsUpdate),
    SetSpeed(f64),
    Pause(bool),
    Reload(Vec<CommitEvent>),
}

/// Simulated clock: real milliseconds in, commit-time milliseconds out.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    start: i64,
    time: f64,
    speed: f64,
    paused: bool,
}

impl Playback {
    pub fn new(start: i64, speed: f64) -> Self {
        let mut clock = Self {
            start,
            time: start as f64,
            speed: 0.0,
            paused: false,
        };
        clock.set_speed(speed);
        clock
    }

    pub fn time(&self) -> i64 {
        self.time.floor() as i64
    }

    pub fn advance(&mut self, real_ms: f64) -> i64 {
        if !self.paused && real_ms > 0.0 {
            self.time += real_ms * self.speed / 1000.0;
        }
        self.time()
    }

    pub fn seek(&mut self, time: i64) {
        self.time = time as f64;
    }

    pub fn rewind(&mut self) {
        self.time = self.start as f64;
    }

    pub fn set_start(&mut self, start: i64) {
        self.start = start;
    }

    /// Negative or non-finite speeds are ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if speed.is_finite() && speed >= 0.0 {
            self.speed = speed;
        } else {
            tracing::warn!(speed, "ignoring invalid playback speed");
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Applies one control request; returns a frame when the graph was rebuilt.
pub fn apply_control(engine: &mut Engine, clock: &mut Playback, control: Control) -> Option<Frame> {
    match control {
        Control::Seek(time) => {
            clock.seek(time);
            Some(engine.seek_to(time))
        }
        Control::Reset => {
            engine.reset_playback();
            clock.rewind();
            tracing::info!(time = clock.time(), "playback reset");
            None
        }
        Control::Settings(update) => {
            engine.set_physics_settings(update);
            None
        }
        Control::SetSpeed(speed) => {
            clock.set_speed(speed);
            None
        }
        Control::Pause(paused) => {
            clock.set_paused(paused);
            None
        }
        Control::Reload(events) => {
            let at = clock.time();
            engine.initialize(events);
            if let Some((first, _)) = engine.time_range() {
                clock.set_start(first);
            }
            Some(engine.seek_to(at))
        }
    }
}

/// Owns the engine: steps it at `fps` and publishes every frame on `bus_tx`.
pub async fn run(
    mut engine: Engine,
    mut clock: Playback,
    fps: u32,
    mut control_rx: mpsc::Receiver<Control>,
    bus_tx: broadcast::Sender<Msg>,
) {
    let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last = Instant::now();
    let mut frames: u64 = 0;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now = Instant::now();
                let real_ms = now.duration_since(last).as_secs_f64() * 1000.0;
                last = now;

                let time = clock.advance(real_ms);
                let frame = engine.update(time, real_ms as f32);
                // no subscribers is fine
                let _ = bus_tx.send(Msg::Frame { frame });

                frames += 1;
                if frames % STATS_EVERY == 0 {
                    let _ = bus_tx.send(Msg::Stats { stats: engine.stats() });
                }
            }
            control = control_rx.recv() => {
                let Some(control) = control else {
                    tracing::info!("control channel closed, stopping playback");
                    break;
                };
                if let Some(frame) = apply_control(&mut engine, &mut clock, control) {
                    let _ = bus_tx.send(Msg::Frame { frame });
                    let _ = bus_tx.send(Msg::Stats { stats: engine.stats() });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitgrove_core::{ChangeKind, FileChange};
    use gitgrove_engine::EngineConfig;

    fn commit(sha: &str, ts: i64, path: &str) -> CommitEvent {
        CommitEvent {
            repo_id: "r1".to_string(),
            sha: sha.to_string(),
            timestamp_ms: ts,
            affected_files: vec![FileChange {
                path: path.to_string(),
                change_kind: ChangeKind::Add,
            }],
        }
    }

    fn quiet_engine(events: Vec<CommitEvent>) -> Engine {
        let cfg = EngineConfig {
            effects_enabled: false,
            ..EngineConfig::default()
        };
        Engine::with_events(cfg, events)
    }

    #[test]
    fn clock_scales_real_time() {
        let mut clock = Playback::new(1_000, 2_000.0);
        assert_eq!(clock.advance(500.0), 2_000);
        clock.set_paused(true);
        assert_eq!(clock.advance(500.0), 2_000);
        clock.set_paused(false);
        clock.set_speed(-1.0);
        assert_eq!(clock.speed(), 2_000.0);
        assert_eq!(clock.advance(-10.0), 2_000);
        clock.rewind();
        assert_eq!(clock.time(), 1_000);
    }

    #[test]
    fn seek_rebuilds_and_moves_clock() {
        let mut engine = quiet_engine(vec![commit("a", 10, "a.rs"), commit("b", 20, "b.rs")]);
        let mut clock = Playback::new(10, 1.0);

        let frame = apply_control(&mut engine, &mut clock, Control::Seek(15)).expect("frame");
        assert_eq!(frame.time, 15);
        assert_eq!(clock.time(), 15);
        assert!(engine.node("r1:/a.rs").is_some());
        assert!(engine.node("r1:/b.rs").is_none());
    }

    #[test]
    fn reset_and_tuning_do_not_emit_frames() {
        let mut engine = quiet_engine(vec![commit("a", 10, "a.rs")]);
        let mut clock = Playback::new(10, 1.0);
        engine.update(10, 16.0);

        assert!(apply_control(&mut engine, &mut clock, Control::Reset).is_none());
        assert_eq!(engine.stats().total_nodes, 0);

        let update = PhysicsSettingsUpdate {
            repulsion_force: Some(5.0),
            ..Default::default()
        };
        assert!(apply_control(&mut engine, &mut clock, Control::Settings(update)).is_none());
        assert_eq!(engine.physics_settings().repulsion_force, 5.0);

        assert!(apply_control(&mut engine, &mut clock, Control::Pause(true)).is_none());
        assert!(clock.is_paused());
        assert!(apply_control(&mut engine, &mut clock, Control::SetSpeed(9.0)).is_none());
        assert_eq!(clock.speed(), 9.0);
    }

    #[test]
    fn reload_keeps_playback_position() {
        let mut engine = quiet_engine(vec![commit("a", 10, "a.rs")]);
        let mut clock = Playback::new(10, 1.0);
        clock.seek(25);

        let events = vec![commit("a", 10, "a.rs"), commit("b", 20, "b.rs"), commit("c", 30, "c.rs")];
        let frame = apply_control(&mut engine, &mut clock, Control::Reload(events)).expect("frame");
        assert_eq!(frame.time, 25);
        assert!(engine.node("r1:/b.rs").is_some());
        assert!(engine.node("r1:/c.rs").is_none());
        assert_eq!(engine.stats().total_commits, 3);
    }
}
