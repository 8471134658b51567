//! Task feed records and their chart-ready projections.
//!
//! `TaskRecord` and `LinkRecord` mirror what the station API sends; the
//! `Normalized*` types are what the rendering side consumes. Unknown extra
//! fields on incoming records are ignored rather than forwarded.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dates::{serialize_day, serialize_opt_day, CalendarDate};
use crate::fields::DependencyKind;

/// Identifier of a task or link. The feed uses integers, but string ids are
/// accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Num(i64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Num(n) => write!(f, "{n}"),
            TaskId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TaskId {
    fn from(n: i64) -> Self {
        TaskId::Num(n)
    }
}

/// A date as it arrives on the wire: epoch milliseconds or an ISO-8601 string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl RawDate {
    /// Empty strings and a zero timestamp count as "not set".
    pub fn is_blank(&self) -> bool {
        match self {
            RawDate::Millis(ms) => *ms == 0,
            RawDate::Fractional(ms) => *ms == 0.0,
            RawDate::Text(s) => s.trim().is_empty(),
        }
    }
}

/// Dependency kind as sent by the API: an integer code or a short name like `e2s`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawLinkType {
    Code(i64),
    Name(String),
}

/// One task as delivered by the station API.
///
/// Only `id` is mandatory. Every other field is decoded leniently: a value of
/// the wrong JSON type is coerced when it can be and otherwise dropped with a
/// warning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    #[serde(default, deserialize_with = "lenient::any")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::any")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient::any")]
    pub start: Option<RawDate>,
    #[serde(default, deserialize_with = "lenient::any")]
    pub end: Option<RawDate>,
    #[serde(default, deserialize_with = "lenient::any")]
    pub deadline: Option<RawDate>,
    #[serde(default, deserialize_with = "lenient::duration")]
    pub duration: Option<i64>,
    #[serde(default, deserialize_with = "lenient::progress")]
    pub progress: Option<f64>,
    #[serde(rename = "type", default, deserialize_with = "lenient::any")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::any")]
    pub parent: Option<TaskId>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub open: Option<bool>,
}

mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn dropped<T>(field: &str, value: &Value) -> Option<T> {
        log::warn!("ignoring {field} value {value}: unexpected type");
        None
    }

    fn ceil_days(days: f64) -> Option<i64> {
        days.is_finite().then(|| days.ceil() as i64)
    }

    /// Whatever `T` accepts; anything else becomes `None`.
    pub fn any<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(d)?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value.clone()).ok().or_else(|| dropped("task field", &value)))
    }

    /// Whole days. Fractions round up and numeric strings are parsed.
    pub fn duration<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(d)?;
        let days = match &value {
            Value::Null => return Ok(None),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(ceil_days)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(ceil_days))
            }
            _ => None,
        };
        Ok(days.or_else(|| dropped("duration", &value)))
    }

    pub fn progress<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(d)?;
        let pct = match &value {
            Value::Null => return Ok(None),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(pct.or_else(|| dropped("progress", &value)))
    }

    /// Booleans, `"true"`/`"false"` in any case, or `0`/`1`.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        let value = Value::deserialize(d)?;
        let flag = match &value {
            Value::Null => return Ok(None),
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        };
        Ok(flag.or_else(|| dropped("open", &value)))
    }
}

#[cfg(test)]
impl TaskRecord {
    /// Bare record with only an id, handy for building inputs by hand.
    pub fn new(id: impl Into<TaskId>) -> Self {
        TaskRecord {
            id: id.into(),
            name: None,
            text: None,
            start: None,
            end: None,
            deadline: None,
            duration: None,
            progress: None,
            kind: None,
            parent: None,
            open: None,
        }
    }
}

/// One dependency edge as delivered by the station API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkRecord {
    pub id: Option<TaskId>,
    #[serde(rename = "type")]
    pub kind: Option<RawLinkType>,
    pub source: TaskId,
    pub target: TaskId,
}

/// A task projected into the chart's shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTask {
    pub id: TaskId,
    pub name: String,
    #[serde(serialize_with = "serialize_opt_day", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<CalendarDate>,
    #[serde(serialize_with = "serialize_opt_day", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<CalendarDate>,
    #[serde(serialize_with = "serialize_opt_day", skip_serializing_if = "Option::is_none")]
    pub deadline: Option<CalendarDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    pub percent_done: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Absent on leaves, never an empty list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NormalizedTask>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDependency {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    pub from: TaskId,
    pub to: TaskId,
    #[serde(rename = "type")]
    pub kind: DependencyKind,
}

/// Earliest start and latest end across a forest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWindow {
    #[serde(serialize_with = "serialize_day")]
    pub start_date: CalendarDate,
    #[serde(serialize_with = "serialize_day")]
    pub end_date: CalendarDate,
}

/// Project header of the emitted document: the window plus calendar settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub calendar: String,
    #[serde(serialize_with = "serialize_day")]
    pub start_date: CalendarDate,
    #[serde(serialize_with = "serialize_day")]
    pub end_date: CalendarDate,
    pub hours_per_day: u32,
    pub days_per_week: u32,
    pub days_per_month: u32,
}

/// The complete document handed to the rendering side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttData {
    pub success: bool,
    pub project: ProjectSettings,
    pub tasks: Vec<NormalizedTask>,
    pub dependencies: Vec<NormalizedDependency>,
}
