//! From API payload to chart document.
//!
//! Decoding is permissive: a body that is not an object, or whose `tasks` or
//! `links` is missing or not a list, is read as empty lists. Records that do
//! not decode are skipped one by one. The transform itself cannot fail.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ProjectCalendar;
use crate::dates::CalendarDate;
use crate::deps::map_dependencies;
use crate::error::GanttError;
use crate::fields::OutputShape;
use crate::hierarchy::{build_hierarchy, flatten};
use crate::task::{
    GanttData, LinkRecord, NormalizedDependency, NormalizedTask, ProjectSettings, ProjectWindow, TaskRecord,
};
use crate::window::compute_project_window;

/// Decoded task feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPayload {
    pub tasks: Vec<TaskRecord>,
    pub links: Vec<LinkRecord>,
}

/// Result of one transformation: the nested forest, its edges and its span.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    pub tasks: Vec<NormalizedTask>,
    pub dependencies: Vec<NormalizedDependency>,
    pub project: ProjectWindow,
}

/// Parse a raw response body. Invalid JSON yields an empty payload.
pub fn parse_payload(body: &str) -> FeedPayload {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => decode_payload(&v),
        Err(e) => {
            log::warn!("{}; continuing with no tasks", GanttError::MalformedPayload(e.to_string()));
            FeedPayload::default()
        }
    }
}

pub fn decode_payload(value: &Value) -> FeedPayload {
    let Some(obj) = value.as_object() else {
        log::warn!("{}", GanttError::MalformedPayload("response is not an object".into()));
        return FeedPayload::default();
    };
    FeedPayload {
        tasks: decode_list(obj.get("tasks"), "tasks"),
        links: decode_list(obj.get("links"), "links"),
    }
}

fn decode_list<T: DeserializeOwned>(value: Option<&Value>, field: &str) -> Vec<T> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            log::warn!(
                "{}",
                GanttError::MalformedPayload(format!("`{field}` is {}, expected a list", kind_of(other)))
            );
            return Vec::new();
        }
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match T::deserialize(item) {
            Ok(rec) => out.push(rec),
            Err(e) => log::warn!("skipping {field}[{i}]: {e}"),
        }
    }
    out
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Run the full pipeline over a decoded payload.
pub fn transform(payload: &FeedPayload, now: CalendarDate) -> Forest {
    let tasks = build_hierarchy(&payload.tasks);
    let dependencies = map_dependencies(&payload.links);
    let project = compute_project_window(&tasks, now);
    log::debug!(
        "normalised {} tasks ({} roots) and {} dependencies",
        payload.tasks.len(),
        tasks.len(),
        dependencies.len()
    );
    Forest { tasks, dependencies, project }
}

impl Forest {
    /// Wrap the forest into the document the chart loads.
    pub fn into_gantt_data(self, calendar: &ProjectCalendar, shape: OutputShape) -> GanttData {
        let tasks = match shape {
            OutputShape::Nested => self.tasks,
            OutputShape::Flat => flatten(&self.tasks),
        };
        GanttData {
            success: true,
            project: ProjectSettings {
                calendar: calendar.name.clone(),
                start_date: self.project.start_date,
                end_date: self.project.end_date,
                hours_per_day: calendar.hours_per_day,
                days_per_week: calendar.days_per_week,
                days_per_month: calendar.days_per_month,
            },
            tasks,
            dependencies: self.dependencies,
        }
    }
}
