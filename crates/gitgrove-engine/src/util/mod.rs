pub mod commit_log;
pub mod config;
pub mod ids;
