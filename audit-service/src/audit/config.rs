//! Audit sink configuration
//!
//! Loaded from the `[audit]` section of config.toml or environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::Rotation;

/// Where finished audit records go
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Rolling JSON-lines files on local disk
    #[default]
    File,
    /// One JSON line per record on stdout
    Stdout,
}

/// How often the audit file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<RotationPolicy> for Rotation {
    fn from(policy: RotationPolicy) -> Self {
        match policy {
            RotationPolicy::Hourly => Rotation::HOURLY,
            RotationPolicy::Daily => Rotation::DAILY,
            RotationPolicy::Never => Rotation::NEVER,
        }
    }
}

/// Audit sink configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSinkConfig {
    /// Sink selection: "file" or "stdout" (default: file)
    #[serde(default)]
    pub sink: SinkKind,

    /// Directory for audit files (default: logs)
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// File name prefix; files are named `<prefix>.<date>.log`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Records buffered between request handlers and the writer thread
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Rotated files kept on disk
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

impl Default for AuditSinkConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            directory: default_directory(),
            file_prefix: default_file_prefix(),
            queue_capacity: default_queue_capacity(),
            max_files: default_max_files(),
            rotation: RotationPolicy::default(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_prefix() -> String {
    "audit".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_files() -> usize {
    30
}
