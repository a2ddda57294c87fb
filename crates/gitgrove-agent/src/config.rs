use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;

/// One simulated day per real second.
pub const DEFAULT_SPEED: f64 = 86_400_000.0;
pub const DEFAULT_FPS: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub log: PathBuf,
    /// Simulated milliseconds per real second.
    pub speed: f64,
    pub fps: u32,
    pub socket: Option<PathBuf>,
    pub watch: bool,
    pub config: Option<PathBuf>,
}

pub fn parse_args() -> Result<AgentConfig> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<AgentConfig>
where
    I: IntoIterator<Item = OsString>,
{
    let mut log = None;
    let mut speed = DEFAULT_SPEED;
    let mut fps = DEFAULT_FPS;
    let mut socket = None;
    let mut watch = false;
    let mut config = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--log" {
            let Some(path) = args.next() else {
                anyhow::bail!("--log expects a path");
            };
            log = Some(PathBuf::from(path));
        } else if arg == "--speed" {
            let Some(value) = args.next() else {
                anyhow::bail!("--speed expects simulated ms per second");
            };
            let value = value.to_string_lossy();
            speed = match value.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => v,
                _ => anyhow::bail!("invalid speed: {value}"),
            };
        } else if arg == "--fps" {
            let Some(value) = args.next() else {
                anyhow::bail!("--fps expects a frame rate");
            };
            let value = value.to_string_lossy();
            fps = match value.parse::<u32>() {
                Ok(v) if (1..=240).contains(&v) => v,
                _ => anyhow::bail!("invalid fps: {value} (expected 1..=240)"),
            };
        } else if arg == "--socket" {
            let Some(path) = args.next() else {
                anyhow::bail!("--socket expects a path");
            };
            socket = Some(PathBuf::from(path));
        } else if arg == "--config" {
            let Some(path) = args.next() else {
                anyhow::bail!("--config expects a path");
            };
            config = Some(PathBuf::from(path));
        } else if arg == "--watch" {
            watch = true;
        } else {
            anyhow::bail!("unknown argument: {:?}", arg);
        }
    }

    let Some(log) = log else {
        anyhow::bail!("missing --log <commits.json>");
    };

    Ok(AgentConfig {
        log,
        speed,
        fps,
        socket,
        watch,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn log_is_required() {
        let err = parse_args_from(args(&["--watch"])).expect_err("missing log");
        assert!(err.to_string().contains("--log"));
    }

    #[test]
    fn defaults_apply() {
        let config = parse_args_from(args(&["--log", "c.json"])).expect("config parsed");
        assert_eq!(config.log, PathBuf::from("c.json"));
        assert_eq!(config.speed, DEFAULT_SPEED);
        assert_eq!(config.fps, DEFAULT_FPS);
        assert!(!config.watch);
        assert!(config.socket.is_none());
    }

    #[test]
    fn parses_all_flags() {
        let config = parse_args_from(args(&[
            "--log", "c.json", "--speed", "1000", "--fps", "60", "--socket", "/tmp/g.sock",
            "--watch", "--config", "e.toml",
        ]))
        .expect("config parsed");
        assert_eq!(config.speed, 1000.0);
        assert_eq!(config.fps, 60);
        assert_eq!(config.socket, Some(PathBuf::from("/tmp/g.sock")));
        assert!(config.watch);
        assert_eq!(config.config, Some(PathBuf::from("e.toml")));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_args_from(args(&["--log", "c", "--fps", "0"])).is_err());
        assert!(parse_args_from(args(&["--log", "c", "--speed", "-3"])).is_err());
        assert!(parse_args_from(args(&["--log", "c", "--speed", "NaN"])).is_err());
        assert!(parse_args_from(args(&["--log"])).is_err());
        assert!(parse_args_from(args(&["--log", "c", "--bogus"])).is_err());
    }
}
