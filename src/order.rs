use std::cmp::Ordering;

use crate::model::Task;

/// Order in which a list's tasks are shown: pending before completed, dated
/// before undated, earlier due date first. Ties keep their stored order.
/// Storage order is never changed by this.
pub fn display_order(tasks: &[Task]) -> Vec<&Task> {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    // sort_by is stable, which provides the final tie-break.
    sorted.sort_by(|a, b| compare(a, b));
    sorted
}

fn compare(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| match (&a.due_date, &b.due_date) {
            // YYYY-MM-DD compares correctly as text.
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
