use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub description: String,
    pub assignee: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl Task {
    /// Returns display icon: x=completed, space=pending
    pub fn icon(&self) -> &'static str {
        if self.completed {
            "x"
        } else {
            " "
        }
    }

    /// First whitespace-delimited token of the assignee, used wherever the
    /// full name does not fit.
    pub fn assignee_first_name(&self) -> &str {
        self.assignee.split_whitespace().next().unwrap_or("")
    }

    /// Short form of the id shown in listings; any unique prefix resolves back.
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    fn apply(&mut self, patch: &TaskPatch) {
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(assignee) = &patch.assignee {
            self.assignee = assignee.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        match &patch.due_date {
            DueDateChange::Keep => {}
            DueDateChange::Clear => self.due_date = None,
            DueDateChange::Set(date) if date.is_empty() => self.due_date = None,
            DueDateChange::Set(date) => self.due_date = Some(date.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub created_at: i64,
}

impl TaskList {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Percentage of completed tasks, rounded to the nearest integer.
    /// An empty list is 0% done.
    pub fn progress(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let pct = self.completed_count() as f64 * 100.0 / self.tasks.len() as f64;
        pct.round() as u8
    }

    /// Merges `patch` into the task with `task_id`. Returns false when no
    /// task has that id.
    pub fn patch_task(&mut self, task_id: &str, patch: &TaskPatch) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.apply(patch);
                true
            }
            None => false,
        }
    }
}

/// How an update treats the due date. An empty `Set` value clears it, which
/// is what an emptied date input submits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DueDateChange {
    #[default]
    Keep,
    Set(String),
    Clear,
}

/// Partial task update: only the fields that are present change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub completed: Option<bool>,
    pub due_date: DueDateChange,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.assignee.is_none()
            && self.completed.is_none()
            && self.due_date == DueDateChange::Keep
    }
}

pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
