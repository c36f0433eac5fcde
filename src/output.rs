use chrono::NaiveDate;

use crate::access::Access;
use crate::model::{Task, TaskList};
use crate::order::display_order;

/// `2024-12-25` → `25/12/2024`. Anything unparsable is shown as stored.
pub fn format_due(date: &str) -> String {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%d/%m/%Y").to_string(),
        Err(_) => date.to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

pub fn format_dashboard(lists: &[TaskList]) -> String {
    if lists.is_empty() {
        return "No lists yet.\n".to_string();
    }
    let mut out = String::new();
    for list in lists {
        out.push_str(&format!(
            "{}  {}  ({})\n",
            list.short_id(),
            list.title,
            plural(list.tasks.len(), "task")
        ));
    }
    out
}

pub fn format_progress(list: &TaskList) -> String {
    format!(
        "{} of {} completed ({}%)",
        list.completed_count(),
        plural(list.tasks.len(), "task"),
        list.progress()
    )
}

pub fn format_task_line(task: &Task) -> String {
    let due = task
        .due_date
        .as_deref()
        .map(|d| format!("  due {}", format_due(d)))
        .unwrap_or_default();
    let description = task.description.trim_end().replace('\n', "\n             ");
    format!(
        "[{}] {}  {}{}  @{}\n",
        task.icon(),
        task.short_id(),
        description,
        due,
        task.assignee_first_name()
    )
}

pub fn format_list_view(list: &TaskList, access: Access) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", list.title));
    out.push_str(&format!("{}\n", format_progress(list)));
    if !access.can_edit() {
        out.push_str("(read-only)\n");
    }
    out.push('\n');

    if list.tasks.is_empty() {
        if access.can_edit() {
            out.push_str("No tasks yet. Add one, or ask for suggestions.\n");
        } else {
            out.push_str("No tasks in this list yet.\n");
        }
        return out;
    }
    for task in display_order(&list.tasks) {
        out.push_str(&format_task_line(task));
    }
    out
}

/// Shown when a list was deleted or never existed. Only owners get a way
/// back to the overview.
pub fn format_not_found(access: Access) -> String {
    let mut out = String::from("List not found or removed.\n");
    if access.can_edit() {
        out.push_str("Run `docket lists` to go back to all lists.\n");
    }
    out
}
