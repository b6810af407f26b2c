use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{OwnerId, TodoId};
use crate::sync::SyncEnvelope;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum description length in characters.
pub const MAX_DESCRIPTION_LEN: usize = 2000;
/// Field separator used by the todo hasher. Never allowed in text fields.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Todo priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Lowercase token used in hashing and on the wire.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Priority {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(TypeError::UnknownToken {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// The primary-store todo record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub owner: OwnerId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<OwnerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every semantic mutation; sync writes are conditional on it.
    pub revision: u64,
    pub sync: SyncEnvelope,
}

impl Todo {
    /// Build a fresh todo from validated input. Starts `pending` at revision 1.
    pub fn new(owner: OwnerId, input: NewTodo, now: DateTime<Utc>) -> Self {
        Self {
            id: TodoId::new(),
            owner,
            title: input.title.trim().to_string(),
            description: normalize_description(input.description),
            priority: input.priority,
            completed: false,
            completed_at: None,
            due_date: input.due_date,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
            revision: 1,
            sync: SyncEnvelope::pending(),
        }
    }

    /// Apply a semantic patch. Returns `false` (and leaves the todo
    /// untouched) when the patch changes nothing.
    pub fn apply(&mut self, patch: &TodoPatch, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        if let Some(title) = &patch.title {
            let title = title.trim();
            if self.title != title {
                self.title = title.to_string();
                changed = true;
            }
        }
        if let Some(description) = &patch.description {
            let description = normalize_description(description.clone());
            if self.description != description {
                self.description = description;
                changed = true;
            }
        }
        if let Some(priority) = patch.priority {
            if self.priority != priority {
                self.priority = priority;
                changed = true;
            }
        }
        if let Some(due_date) = patch.due_date {
            if self.due_date != due_date {
                self.due_date = due_date;
                changed = true;
            }
        }
        if let Some(completion) = patch.completion {
            let completed = match completion {
                CompletionChange::Set(value) => value,
                CompletionChange::Toggle => !self.completed,
            };
            if self.completed != completed {
                self.completed = completed;
                self.completed_at = completed.then_some(now);
                changed = true;
            }
        }

        if changed {
            self.touch(now);
        }
        changed
    }

    /// Record a semantic mutation: new revision, fresh sync cycle.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.revision += 1;
        self.sync.reset_for_mutation();
    }

    /// `true` unless soft-deleted.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn validate_text(field: &'static str, value: &str, max: usize) -> Result<(), TypeError> {
    if value.chars().count() > max {
        return Err(TypeError::InvalidField {
            field,
            reason: format!("must be at most {max} characters"),
        });
    }
    if value.contains(FIELD_SEPARATOR) {
        return Err(TypeError::InvalidField {
            field,
            reason: "contains a control character".into(),
        });
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), TypeError> {
    if title.trim().is_empty() {
        return Err(TypeError::InvalidField {
            field: "title",
            reason: "must not be empty".into(),
        });
    }
    validate_text("title", title, MAX_TITLE_LEN)
}

/// Input for creating a todo.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        validate_title(&self.title)?;
        if let Some(description) = &self.description {
            validate_text("description", description, MAX_DESCRIPTION_LEN)?;
        }
        Ok(())
    }
}

/// How a patch changes the completion flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionChange {
    Set(bool),
    /// Flip whatever is stored, evaluated inside the store's atomic update.
    Toggle,
}

/// Partial update of a todo's semantic fields.
///
/// Outer `None` leaves a field alone; `Some(None)` clears an optional field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub completion: Option<CompletionChange>,
}

impl TodoPatch {
    pub fn toggle_complete() -> Self {
        Self {
            completion: Some(CompletionChange::Toggle),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.completion.is_none()
    }

    pub fn validate(&self) -> Result<(), TypeError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(Some(description)) = &self.description {
            validate_text("description", description, MAX_DESCRIPTION_LEN)?;
        }
        Ok(())
    }
}
