//! Enumerations shared by the pipeline, the CLI and the output document.
//!
//! Dependency kinds, derived task statuses and the two output shapes the
//! rendering side understands.

use clap::ValueEnum;
use serde::{Deserialize, Serialize, Serializer};

/// Relationship between the two ends of a dependency edge.
///
/// Serialised as its integer kind code. Codes outside the four known kinds
/// are carried through untouched as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DependencyKind {
    /// Target cannot start until the source finishes.
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
    Other(i64),
}

impl DependencyKind {
    pub fn code(self) -> i64 {
        match self {
            DependencyKind::FinishToStart => 0,
            DependencyKind::StartToStart => 1,
            DependencyKind::FinishToFinish => 2,
            DependencyKind::StartToFinish => 3,
            DependencyKind::Other(c) => c,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            0 => DependencyKind::FinishToStart,
            1 => DependencyKind::StartToStart,
            2 => DependencyKind::FinishToFinish,
            3 => DependencyKind::StartToFinish,
            c => DependencyKind::Other(c),
        }
    }

    /// Short link names used by the station backend (`e2s`, `s2s`, ...).
    pub fn from_short_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "e2s" | "f2s" => Some(DependencyKind::FinishToStart),
            "s2s" => Some(DependencyKind::StartToStart),
            "e2e" | "f2f" => Some(DependencyKind::FinishToFinish),
            "s2e" | "s2f" => Some(DependencyKind::StartToFinish),
            _ => None,
        }
    }
}

impl Serialize for DependencyKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.code())
    }
}

/// Display status of a task, derived at render time and never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    NotStarted,
    Started,
    Completed,
    Late,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::Started => "Started",
            TaskStatus::Completed => "Completed",
            TaskStatus::Late => "Late",
        }
    }
}

/// Shape of the `tasks` section in the emitted document.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputShape {
    /// Roots with children nested under `children`.
    #[default]
    Nested,
    /// Pre-order list where each task carries its own `parentId`.
    Flat,
}
