//! The todo record shared by every storage backend.
//!
//! A [`Todo`] is created by a backend (which assigns its `id` and
//! `create_time`), mutated only through status transitions, and removed by
//! deletion. The status transition rules live here so both backends apply them
//! identically:
//!
//! - `completed_time` is set exactly when a transition lands on
//!   [`TodoStatus::Completed`] and cleared on any other transition.
//! - `create_time` and `text` never change after creation.
//!
//! On the wire (and in JSON generally) field names are camelCase and the
//! status is one of `"todo"`, `"inProgress"` or `"completed"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

/// Identifier of a todo within one backend's store.
pub type TodoId = i64;

/// Lifecycle state of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TodoStatus {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl TodoStatus {
    /// Successor in the `todo → inProgress → completed → todo` cycle.
    pub fn next(self) -> Self {
        match self {
            TodoStatus::Todo => TodoStatus::InProgress,
            TodoStatus::InProgress => TodoStatus::Completed,
            TodoStatus::Completed => TodoStatus::Todo,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Todo => "todo",
            TodoStatus::InProgress => "inProgress",
            TodoStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown todo status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for TodoStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TodoStatus::Todo),
            "inProgress" => Ok(TodoStatus::InProgress),
            "completed" => Ok(TodoStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub status: TodoStatus,
    pub create_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_time: Option<String>,
}

impl Todo {
    /// A freshly created todo: status `todo`, created now, never completed.
    pub fn new(id: TodoId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            status: TodoStatus::Todo,
            create_time: timestamp_now(),
            completed_time: None,
        }
    }

    /// Applies a status transition, maintaining the `completed_time` invariant.
    pub fn set_status(&mut self, status: TodoStatus) {
        self.status = status;
        self.completed_time = match status {
            TodoStatus::Completed => Some(timestamp_now()),
            _ => None,
        };
    }

    pub fn is_completed(&self) -> bool {
        self.status == TodoStatus::Completed
    }
}

/// Trims user input and rejects text that is empty afterwards.
pub(crate) fn normalize_text(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Current UTC time as a minute-precision `YYYY-MM-DDTHH:MM` string.
pub fn timestamp_now() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    // All components are in range for any OffsetDateTime, formatting can't fail.
    at.format(&fmt).unwrap_or_default()
}
