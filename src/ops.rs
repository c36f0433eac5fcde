use anyhow::{bail, Context, Result};
use log::debug;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::model::{DueDateChange, Task, TaskList, TaskPatch};
use crate::validate::{validate_assignee, validate_description, validate_due_date, validate_title};

/// Read-modify-write attempts before a mutator gives up on a list that keeps
/// changing underneath it.
pub const MAX_REWRITE_ATTEMPTS: usize = 5;

const LIST_COLUMNS: &str = "id, title, tasks, created_at";

const INSERT_LIST: &str = "
INSERT INTO task_lists (id, title, created_at, tasks)
VALUES (?1, ?2, ?3, '[]')
";

// Conditional on the revision that was read, so a concurrent rewrite makes
// this a no-op instead of being overwritten.
const REWRITE_TASKS: &str = "
UPDATE task_lists
SET tasks = ?1, revision = revision + 1
WHERE id = ?2 AND revision = ?3
";

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn new_list_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn new_task_id() -> String {
    Uuid::new_v4().to_string()
}

fn read_list_row(row: &rusqlite::Row) -> rusqlite::Result<TaskList> {
    let tasks_json: String = row.get(2)?;
    let tasks = serde_json::from_str(&tasks_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(TaskList {
        id: row.get(0)?,
        title: row.get(1)?,
        tasks,
        created_at: row.get(3)?,
    })
}

pub fn create_list(conn: &Connection, title: &str) -> Result<String> {
    validate_title(title)?;
    let id = new_list_id();
    conn.execute(INSERT_LIST, rusqlite::params![id, title, now_millis()])?;
    debug!("created list '{id}'");
    Ok(id)
}

/// Removes the list and every task in it. Returns false if there was no such
/// list.
pub fn delete_list(conn: &Connection, id: &str) -> Result<bool> {
    let rows = conn.execute("DELETE FROM task_lists WHERE id = ?1", [id])?;
    debug!("deleted list '{id}' ({rows} row(s))");
    Ok(rows > 0)
}

pub fn get_list(conn: &Connection, id: &str) -> Result<Option<TaskList>> {
    let list = conn
        .query_row(
            &format!("SELECT {LIST_COLUMNS} FROM task_lists WHERE id = ?1"),
            [id],
            read_list_row,
        )
        .optional()
        .with_context(|| format!("failed to read list '{id}'"))?;
    Ok(list)
}

/// All lists, newest first.
pub fn list_all(conn: &Connection) -> Result<Vec<TaskList>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {LIST_COLUMNS} FROM task_lists ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map([], read_list_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read lists")
}

/// Resolve a list reference given on the command line: an exact id, or a
/// prefix matching exactly one list.
pub fn resolve_list_id(conn: &Connection, reference: &str) -> Result<String> {
    if reference.is_empty() {
        bail!("list id must not be empty");
    }
    let mut stmt =
        conn.prepare_cached("SELECT id FROM task_lists WHERE substr(id, 1, length(?1)) = ?1")?;
    let ids: Vec<String> = stmt
        .query_map([reference], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    if ids.iter().any(|id| id == reference) {
        return Ok(reference.to_string());
    }
    match ids.as_slice() {
        [] => bail!("list '{reference}' not found"),
        [id] => Ok(id.clone()),
        _ => bail!("list id '{reference}' is ambiguous ({} matches)", ids.len()),
    }
}

/// Same as [`resolve_list_id`] for a task within `list`.
pub fn resolve_task_id(list: &TaskList, reference: &str) -> Result<String> {
    if reference.is_empty() {
        bail!("task id must not be empty");
    }
    if list.find_task(reference).is_some() {
        return Ok(reference.to_string());
    }
    let matches: Vec<&Task> = list
        .tasks
        .iter()
        .filter(|t| t.id.starts_with(reference))
        .collect();
    match matches.as_slice() {
        [] => bail!("task '{reference}' not found in list '{}'", list.title),
        [task] => Ok(task.id.clone()),
        _ => bail!("task id '{reference}' is ambiguous ({} matches)", matches.len()),
    }
}

fn read_for_rewrite(conn: &Connection, list_id: &str) -> Result<Option<(TaskList, i64)>> {
    let row = conn
        .query_row(
            &format!("SELECT {LIST_COLUMNS}, revision FROM task_lists WHERE id = ?1"),
            [list_id],
            |row| Ok((read_list_row(row)?, row.get::<_, i64>(4)?)),
        )
        .optional()?;
    Ok(row)
}

/// Read the list, let `edit` change it in memory, and write the task sequence
/// back if the stored revision is still the one that was read. On a lost race
/// the whole cycle starts over from a fresh read.
///
/// `edit` returns false to signal "nothing to change", in which case nothing
/// is written and this returns `Ok(false)`.
fn rewrite_tasks<F>(conn: &Connection, list_id: &str, mut edit: F) -> Result<bool>
where
    F: FnMut(&mut TaskList) -> bool,
{
    for attempt in 1..=MAX_REWRITE_ATTEMPTS {
        let Some((mut list, revision)) = read_for_rewrite(conn, list_id)? else {
            bail!("list '{list_id}' not found");
        };
        if !edit(&mut list) {
            return Ok(false);
        }
        let tasks = serde_json::to_string(&list.tasks)?;
        let rows = conn.execute(REWRITE_TASKS, rusqlite::params![tasks, list_id, revision])?;
        if rows == 1 {
            return Ok(true);
        }
        debug!("list '{list_id}' changed during rewrite (attempt {attempt}), retrying");
    }
    bail!(
        "list '{list_id}' was modified concurrently; gave up after {MAX_REWRITE_ATTEMPTS} attempts"
    )
}

/// Append a task to the list. Returns the new task's id.
pub fn add_task(
    conn: &Connection,
    list_id: &str,
    description: &str,
    assignee: &str,
    due_date: Option<&str>,
) -> Result<String> {
    validate_description(description)?;
    validate_assignee(assignee)?;
    let due_date = due_date.filter(|d| !d.is_empty());
    if let Some(d) = due_date {
        validate_due_date(d)?;
    }

    let mut task = Task {
        id: new_task_id(),
        description: description.to_string(),
        assignee: assignee.to_string(),
        completed: false,
        created_at: now_millis(),
        due_date: due_date.map(str::to_string),
    };
    rewrite_tasks(conn, list_id, |list| {
        while list.find_task(&task.id).is_some() {
            task.id = new_task_id();
        }
        list.tasks.push(task.clone());
        true
    })?;
    debug!("added task '{}' to list '{list_id}'", task.id);
    Ok(task.id)
}

/// Merge `patch` into one task. Returns false if the list has no such task.
pub fn update_task(
    conn: &Connection,
    list_id: &str,
    task_id: &str,
    patch: &TaskPatch,
) -> Result<bool> {
    if let Some(d) = &patch.description {
        validate_description(d)?;
    }
    if let Some(a) = &patch.assignee {
        validate_assignee(a)?;
    }
    if let DueDateChange::Set(d) = &patch.due_date {
        if !d.is_empty() {
            validate_due_date(d)?;
        }
    }
    let changed = rewrite_tasks(conn, list_id, |list| list.patch_task(task_id, patch))?;
    debug!("update of task '{task_id}' in list '{list_id}': changed={changed}");
    Ok(changed)
}

/// Flip a task's completion state. Returns false if the list has no such task.
pub fn toggle_task(conn: &Connection, list_id: &str, task_id: &str) -> Result<bool> {
    let changed = rewrite_tasks(conn, list_id, |list| {
        match list.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.completed = !task.completed;
                true
            }
            None => false,
        }
    })?;
    debug!("toggle of task '{task_id}' in list '{list_id}': changed={changed}");
    Ok(changed)
}

/// Drop a task from the list. Returns false if the list has no such task.
pub fn remove_task(conn: &Connection, list_id: &str, task_id: &str) -> Result<bool> {
    let changed = rewrite_tasks(conn, list_id, |list| {
        let before = list.tasks.len();
        list.tasks.retain(|t| t.id != task_id);
        list.tasks.len() != before
    })?;
    debug!("removal of task '{task_id}' from list '{list_id}': changed={changed}");
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn tasks_of(conn: &Connection, list_id: &str) -> Vec<Task> {
        get_list(conn, list_id).unwrap().unwrap().tasks
    }

    #[test]
    fn create_and_get_list() {
        let conn = db::open_memory().unwrap();
        let before = now_millis();
        let id = create_list(&conn, "Processo 1234/23 - Inventário").unwrap();
        let list = get_list(&conn, &id).unwrap().unwrap();
        assert_eq!(list.title, "Processo 1234/23 - Inventário");
        assert!(list.tasks.is_empty());
        assert!(list.created_at >= before);
    }

    #[test]
    fn blank_title_rejected() {
        let conn = db::open_memory().unwrap();
        assert!(create_list(&conn, "   ").is_err());
        assert!(list_all(&conn).unwrap().is_empty());
    }

    #[test]
    fn list_all_newest_first() {
        let conn = db::open_memory().unwrap();
        conn.execute(
            "INSERT INTO task_lists (id, title, created_at) VALUES ('old', 'Old', 100), ('new', 'New', 200)",
            [],
        )
        .unwrap();
        let ids: Vec<String> = list_all(&conn).unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn delete_removes_list_and_tasks() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        add_task(&conn, &id, "Collect receipts", "Ana", None).unwrap();
        assert!(delete_list(&conn, &id).unwrap());
        assert!(get_list(&conn, &id).unwrap().is_none());
        assert!(!delete_list(&conn, &id).unwrap());
    }

    #[test]
    fn add_task_appends_incomplete_task() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        let first = add_task(&conn, &id, "Collect receipts", "Ana Souza", Some("2024-05-01")).unwrap();
        let second = add_task(&conn, &id, "Draft report", "Beatriz", None).unwrap();

        let tasks = tasks_of(&conn, &id);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, first);
        assert_eq!(tasks[1].id, second);
        assert_ne!(first, second);
        assert!(!tasks[1].completed);
        assert_eq!(tasks[0].due_date.as_deref(), Some("2024-05-01"));
        assert!(tasks[1].due_date.is_none());
    }

    #[test]
    fn add_task_empty_due_date_means_none() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        add_task(&conn, &id, "Collect receipts", "Ana", Some("")).unwrap();
        assert!(tasks_of(&conn, &id)[0].due_date.is_none());
    }

    #[test]
    fn add_task_validation() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        assert!(add_task(&conn, &id, " ", "Ana", None).is_err());
        assert!(add_task(&conn, &id, "Collect", "", None).is_err());
        assert!(add_task(&conn, &id, "Collect", "Ana", Some("tomorrow")).is_err());
        assert!(tasks_of(&conn, &id).is_empty());
    }

    #[test]
    fn add_task_to_missing_list_fails() {
        let conn = db::open_memory().unwrap();
        let err = add_task(&conn, "nope", "Collect", "Ana", None).unwrap_err();
        assert!(err.to_string().contains("not found"), "{err}");
    }

    #[test]
    fn toggle_twice_restores_state() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        let task = add_task(&conn, &id, "Collect receipts", "Ana", None).unwrap();
        assert!(toggle_task(&conn, &id, &task).unwrap());
        assert!(tasks_of(&conn, &id)[0].completed);
        assert!(toggle_task(&conn, &id, &task).unwrap());
        assert!(!tasks_of(&conn, &id)[0].completed);
        assert!(!toggle_task(&conn, &id, "missing").unwrap());
    }

    #[test]
    fn update_task_keeps_unspecified_fields() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        let task_id = add_task(&conn, &id, "Collect receipts", "Ana", Some("2024-05-01")).unwrap();
        let before = tasks_of(&conn, &id)[0].clone();

        let patch = TaskPatch {
            description: Some("Collect all receipts".into()),
            ..Default::default()
        };
        assert!(update_task(&conn, &id, &task_id, &patch).unwrap());

        let after = tasks_of(&conn, &id)[0].clone();
        assert_eq!(after.description, "Collect all receipts");
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.assignee, before.assignee);
        assert_eq!(after.due_date, before.due_date);
        assert_eq!(after.completed, before.completed);
    }

    #[test]
    fn update_task_clears_due_date() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        let task_id = add_task(&conn, &id, "Collect", "Ana", Some("2024-05-01")).unwrap();
        let patch = TaskPatch {
            due_date: DueDateChange::Clear,
            ..Default::default()
        };
        update_task(&conn, &id, &task_id, &patch).unwrap();
        assert!(tasks_of(&conn, &id)[0].due_date.is_none());
    }

    #[test]
    fn update_missing_task_is_noop() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        add_task(&conn, &id, "Collect", "Ana", None).unwrap();
        let before = tasks_of(&conn, &id);
        let patch = TaskPatch {
            assignee: Some("Beatriz".into()),
            ..Default::default()
        };
        assert!(!update_task(&conn, &id, "missing", &patch).unwrap());
        assert_eq!(tasks_of(&conn, &id), before);
    }

    #[test]
    fn remove_task_and_missing_id() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        let a = add_task(&conn, &id, "Collect", "Ana", None).unwrap();
        add_task(&conn, &id, "Draft", "Bia", None).unwrap();

        assert!(!remove_task(&conn, &id, "missing").unwrap());
        assert_eq!(tasks_of(&conn, &id).len(), 2);

        assert!(remove_task(&conn, &id, &a).unwrap());
        let tasks = tasks_of(&conn, &id);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Draft");
    }

    #[test]
    fn stale_revision_is_not_overwritten() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        add_task(&conn, &id, "Collect", "Ana", None).unwrap();

        // Simulate a writer that read before the append above landed.
        let rows = conn
            .execute(REWRITE_TASKS, rusqlite::params!["[]", id, 0])
            .unwrap();
        assert_eq!(rows, 0);
        assert_eq!(tasks_of(&conn, &id).len(), 1);
    }

    #[test]
    fn rewrite_retries_after_concurrent_change() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        let mut raced = false;
        let changed = rewrite_tasks(&conn, &id, |list| {
            if !raced {
                raced = true;
                // Another writer appends between this read and our write.
                add_task(&conn, &list.id, "Concurrent", "Bia", None).unwrap();
            }
            list.tasks.push(Task {
                id: "mine".into(),
                description: "Mine".into(),
                assignee: "Ana".into(),
                completed: false,
                created_at: 0,
                due_date: None,
            });
            true
        })
        .unwrap();
        assert!(changed);
        let descriptions: Vec<String> =
            tasks_of(&conn, &id).into_iter().map(|t| t.description).collect();
        assert_eq!(descriptions, vec!["Concurrent", "Mine"]);
    }

    #[test]
    fn rewrite_gives_up_when_list_keeps_changing() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        add_task(&conn, &id, "Collect", "Ana", None).unwrap();
        let before = tasks_of(&conn, &id);

        let mut attempts = 0;
        let err = rewrite_tasks(&conn, &id, |list| {
            attempts += 1;
            // Every read loses the race to another writer.
            conn.execute(
                "UPDATE task_lists SET revision = revision + 1 WHERE id = ?1",
                [&list.id],
            )
            .unwrap();
            list.tasks.clear();
            true
        })
        .unwrap_err();

        assert_eq!(attempts, MAX_REWRITE_ATTEMPTS);
        assert!(err.to_string().contains("modified concurrently"), "{err}");
        assert_eq!(tasks_of(&conn, &id), before);
    }

    #[test]
    fn update_task_sets_completion() {
        let conn = db::open_memory().unwrap();
        let id = create_list(&conn, "Audit").unwrap();
        let task_id = add_task(&conn, &id, "Collect", "Ana", None).unwrap();
        let patch = TaskPatch {
            completed: Some(true),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        assert!(update_task(&conn, &id, &task_id, &patch).unwrap());
        let task = tasks_of(&conn, &id)[0].clone();
        assert!(task.completed);
        assert_eq!(task.description, "Collect");
    }

    #[test]
    fn resolve_ids_by_prefix() {
        let conn = db::open_memory().unwrap();
        conn.execute(
            "INSERT INTO task_lists (id, title, created_at) VALUES ('abc123', 'A', 1), ('abd456', 'B', 2)",
            [],
        )
        .unwrap();
        assert_eq!(resolve_list_id(&conn, "abc").unwrap(), "abc123");
        assert_eq!(resolve_list_id(&conn, "abd456").unwrap(), "abd456");
        assert!(resolve_list_id(&conn, "ab").is_err());
        assert!(resolve_list_id(&conn, "zzz").is_err());
        assert!(resolve_list_id(&conn, "").is_err());

        let task_id = add_task(&conn, "abc123", "Collect", "Ana", None).unwrap();
        let list = get_list(&conn, "abc123").unwrap().unwrap();
        assert_eq!(resolve_task_id(&list, &task_id[..6]).unwrap(), task_id);
        assert!(resolve_task_id(&list, "not-a-task").is_err());
    }
}
