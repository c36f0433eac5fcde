use anyhow::Result;
use rusqlite::Connection;

use crate::access::{Access, AccessController, SessionStorage};
use crate::model::{DueDateChange, Task, TaskList, TaskPatch};
use crate::ops;
use crate::order::display_order;
use crate::router::{self, View};
use crate::suggest::{self, Suggester};
use crate::validate::{validate_assignee, validate_description, validate_due_date};

/// A snapshot pushed by a subscription thread.
#[derive(Debug)]
pub enum Update {
    Lists(Vec<TaskList>),
    List(String, Option<TaskList>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSnapshot {
    Loading,
    Missing,
    Found(TaskList),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    DeleteList { id: String, title: String },
    RemoveTask { list_id: String, task_id: String, description: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    NewList,
    TaskForm,
    Confirm(Pending),
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Description,
    Assignee,
    DueDate,
}

pub struct TaskForm {
    /// `None` when adding, the task being edited otherwise.
    pub task_id: Option<String>,
    pub description: String,
    pub assignee: String,
    pub due_date: String,
    pub focused: FormField,
    pub error: Option<String>,
}

impl TaskForm {
    pub fn new() -> Self {
        Self {
            task_id: None,
            description: String::new(),
            assignee: String::new(),
            due_date: String::new(),
            focused: FormField::Description,
            error: None,
        }
    }

    pub fn edit(task: &Task) -> Self {
        Self {
            task_id: Some(task.id.clone()),
            description: task.description.clone(),
            assignee: task.assignee.clone(),
            due_date: task.due_date.clone().unwrap_or_default(),
            focused: FormField::Description,
            error: None,
        }
    }

    pub fn focused_buf_mut(&mut self) -> &mut String {
        match self.focused {
            FormField::Description => &mut self.description,
            FormField::Assignee => &mut self.assignee,
            FormField::DueDate => &mut self.due_date,
        }
    }

    pub fn next_field(&mut self) {
        self.focused = match self.focused {
            FormField::Description => FormField::Assignee,
            FormField::Assignee => FormField::DueDate,
            FormField::DueDate => FormField::Description,
        };
    }

    pub fn prev_field(&mut self) {
        self.focused = match self.focused {
            FormField::Description => FormField::DueDate,
            FormField::Assignee => FormField::Description,
            FormField::DueDate => FormField::Assignee,
        };
    }

    pub fn validate(&mut self) -> bool {
        let due = self.due_date.trim();
        let result = validate_description(&self.description)
            .and_then(|_| validate_assignee(&self.assignee))
            .and_then(|_| {
                if due.is_empty() {
                    Ok(())
                } else {
                    validate_due_date(due)
                }
            });
        match result {
            Ok(()) => {
                self.error = None;
                true
            }
            Err(e) => {
                self.error = Some(e.to_string());
                false
            }
        }
    }
}

impl Default for TaskForm {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App<S> {
    access: AccessController<S>,
    pub view: View,
    /// Overview snapshot; `None` until the first one arrives.
    pub lists: Option<Vec<TaskList>>,
    pub list: ListSnapshot,
    pub cursor: usize,
    pub mode: Mode,
    pub title_input: String,
    pub form: Option<TaskForm>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub can_suggest: bool,
    share_base: Option<String>,
}

impl<S: SessionStorage> App<S> {
    pub fn new(
        access: AccessController<S>,
        fragment: &str,
        can_suggest: bool,
        share_base: Option<String>,
    ) -> Result<Self> {
        let mut app = App {
            access,
            view: View::Dashboard,
            lists: None,
            list: ListSnapshot::Loading,
            cursor: 0,
            mode: Mode::Normal,
            title_input: String::new(),
            form: None,
            status: None,
            error: None,
            can_suggest,
            share_base,
        };
        app.navigate(fragment)?;
        Ok(app)
    }

    pub fn access(&self) -> Access {
        self.access.state()
    }

    /// The overview can always be changed; a list only by the owner.
    pub fn can_edit(&self) -> bool {
        match self.view {
            View::Dashboard => true,
            View::List(_) => self.access().can_edit(),
        }
    }

    pub fn suggest_available(&self) -> bool {
        self.can_suggest
            && self.can_edit()
            && matches!(self.list, ListSnapshot::Found(_))
    }

    pub fn navigate(&mut self, fragment: &str) -> Result<()> {
        let nav = router::navigate(&mut self.access, fragment)?;
        if nav.view != self.view {
            self.cursor = 0;
            self.lists = None;
            self.list = ListSnapshot::Loading;
        }
        self.view = nav.view;
        self.mode = Mode::Normal;
        self.form = None;
        Ok(())
    }

    pub fn apply(&mut self, update: Update) {
        match update {
            Update::Lists(lists) => {
                if self.view == View::Dashboard {
                    self.lists = Some(lists);
                    self.clamp_cursor();
                }
            }
            Update::List(id, list) => {
                if self.view == View::List(id) {
                    self.list = match list {
                        Some(l) => ListSnapshot::Found(l),
                        None => ListSnapshot::Missing,
                    };
                    self.clamp_cursor();
                }
            }
        }
    }

    pub fn row_count(&self) -> usize {
        match (&self.view, &self.list) {
            (View::Dashboard, _) => self.lists.as_ref().map_or(0, Vec::len),
            (View::List(_), ListSnapshot::Found(list)) => list.tasks.len(),
            (View::List(_), _) => 0,
        }
    }

    fn clamp_cursor(&mut self) {
        let n = self.row_count();
        if n == 0 {
            self.cursor = 0;
        } else if self.cursor >= n {
            self.cursor = n - 1;
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.row_count() {
            self.cursor += 1;
        }
    }

    pub fn selected_list(&self) -> Option<&TaskList> {
        match self.view {
            View::Dashboard => self.lists.as_ref()?.get(self.cursor),
            View::List(_) => None,
        }
    }

    /// Tasks of the open list in display order.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        match &self.list {
            ListSnapshot::Found(list) => display_order(&list.tasks),
            _ => Vec::new(),
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.visible_tasks().get(self.cursor).copied()
    }

    fn open_list_id(&self) -> Option<&str> {
        match &self.view {
            View::List(id) => Some(id),
            View::Dashboard => None,
        }
    }

    fn require_edit(&mut self) -> bool {
        if self.can_edit() {
            return true;
        }
        self.error = Some("read-only: this list was opened from a shared link".into());
        false
    }

    pub fn open_selected(&mut self) {
        let Some(id) = self.selected_list().map(|l| l.id.clone()) else {
            return;
        };
        if let Err(e) = self.navigate(&router::list_fragment(&id)) {
            self.error = Some(format!("{e:#}"));
        }
    }

    /// Back to the overview. Viewers have no way back.
    pub fn back(&mut self) {
        if self.view == View::Dashboard || !self.require_edit() {
            return;
        }
        if let Err(e) = self.navigate("#/") {
            self.error = Some(format!("{e:#}"));
        }
    }

    pub fn start_new_list(&mut self) {
        if self.view == View::Dashboard {
            self.title_input.clear();
            self.mode = Mode::NewList;
        }
    }

    pub fn submit_new_list(&mut self, conn: &Connection) {
        match ops::create_list(conn, &self.title_input) {
            Ok(_) => {
                self.status = Some(format!("Created list '{}'", self.title_input.trim()));
                self.title_input.clear();
                self.mode = Mode::Normal;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn start_add(&mut self) {
        if !matches!(self.list, ListSnapshot::Found(_)) || !self.require_edit() {
            return;
        }
        self.form = Some(TaskForm::new());
        self.mode = Mode::TaskForm;
    }

    pub fn start_edit(&mut self) {
        if !self.require_edit() {
            return;
        }
        if let Some(task) = self.selected_task() {
            self.form = Some(TaskForm::edit(task));
            self.mode = Mode::TaskForm;
        }
    }

    pub fn submit_form(&mut self, conn: &Connection) {
        let Some(list_id) = self.open_list_id().map(str::to_string) else {
            return;
        };
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if !form.validate() {
            return;
        }
        let due = form.due_date.trim().to_string();
        let result = match &form.task_id {
            None => ops::add_task(
                conn,
                &list_id,
                &form.description,
                &form.assignee,
                Some(due.as_str()),
            )
            .map(|_| true),
            Some(task_id) => {
                let patch = TaskPatch {
                    description: Some(form.description.clone()),
                    assignee: Some(form.assignee.clone()),
                    completed: None,
                    due_date: DueDateChange::Set(due),
                };
                ops::update_task(conn, &list_id, task_id, &patch)
            }
        };
        match result {
            Ok(true) => {
                self.form = None;
                self.mode = Mode::Normal;
            }
            Ok(false) => form.error = Some("task no longer exists".into()),
            Err(e) => form.error = Some(e.to_string()),
        }
    }

    pub fn toggle_selected(&mut self, conn: &Connection) {
        if !self.require_edit() {
            return;
        }
        let (Some(list_id), Some(task)) = (self.open_list_id(), self.selected_task()) else {
            return;
        };
        if let Err(e) = ops::toggle_task(conn, list_id, &task.id) {
            self.error = Some(e.to_string());
        }
    }

    pub fn request_delete(&mut self) {
        if !self.require_edit() {
            return;
        }
        let pending = match &self.view {
            View::Dashboard => self.selected_list().map(|l| Pending::DeleteList {
                id: l.id.clone(),
                title: l.title.clone(),
            }),
            View::List(list_id) => self.selected_task().map(|t| Pending::RemoveTask {
                list_id: list_id.clone(),
                task_id: t.id.clone(),
                description: t.description.clone(),
            }),
        };
        if let Some(p) = pending {
            self.mode = Mode::Confirm(p);
        }
    }

    pub fn confirm(&mut self, conn: &Connection) {
        if !matches!(self.mode, Mode::Confirm(_)) {
            return;
        }
        let Mode::Confirm(pending) = std::mem::replace(&mut self.mode, Mode::Normal) else {
            return;
        };
        let result = match &pending {
            Pending::DeleteList { id, .. } => ops::delete_list(conn, id),
            Pending::RemoveTask { list_id, task_id, .. } => {
                ops::remove_task(conn, list_id, task_id)
            }
        };
        if let Err(e) = result {
            self.error = Some(e.to_string());
        }
    }

    pub fn cancel(&mut self) {
        self.mode = Mode::Normal;
        self.form = None;
        self.title_input.clear();
    }

    pub fn share(&mut self) {
        if let Some(id) = self.open_list_id() {
            let link = router::share_link(self.share_base.as_deref(), id);
            self.status = Some(format!("Share: {link}"));
        }
    }

    pub fn suggest(&mut self, conn: &Connection, suggester: &Suggester) {
        if !self.suggest_available() {
            return;
        }
        let ListSnapshot::Found(list) = &self.list else {
            return;
        };
        let (list_id, title) = (list.id.clone(), list.title.clone());
        let suggestions = suggester.suggest(&title);
        if suggestions.is_empty() {
            self.status = Some("No suggestions available".into());
            return;
        }
        match suggest::apply_suggestions(conn, &list_id, &suggestions) {
            Ok(n) => self.status = Some(format!("Added {n} suggested task(s)")),
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn toggle_help(&mut self) {
        self.mode = match self.mode {
            Mode::Help => Mode::Normal,
            _ => Mode::Help,
        };
    }

    pub fn clear_messages(&mut self) {
        self.error = None;
        self.status = None;
    }
}
