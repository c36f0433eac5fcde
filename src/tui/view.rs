use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};

use super::app::{App, FormField, ListSnapshot, Mode, Pending};
use crate::access::{Access, SessionStorage};
use crate::model::{Task, TaskList};
use crate::output::{format_due, format_progress};
use crate::router::View;

/// Center a rectangle within an area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}

pub fn render<S: SessionStorage>(frame: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    match &app.view {
        View::Dashboard => render_dashboard(frame, app, chunks[0]),
        View::List(_) => render_list(frame, app, chunks[0]),
    }
    render_status(frame, app, chunks[1]);

    match &app.mode {
        Mode::NewList => render_title_input(frame, app),
        Mode::TaskForm => render_form(frame, app),
        Mode::Confirm(pending) => render_confirm(frame, pending),
        Mode::Help => render_help(frame, app),
        Mode::Normal => {}
    }
}

fn render_dashboard<S: SessionStorage>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Task lists ");
    let lists = match &app.lists {
        None => {
            frame.render_widget(Paragraph::new("Loading...").block(block), area);
            return;
        }
        Some(lists) if lists.is_empty() => {
            frame.render_widget(
                Paragraph::new("No lists yet. Press n to create one.").block(block),
                area,
            );
            return;
        }
        Some(lists) => lists,
    };

    let items: Vec<ListItem> = lists.iter().map(dashboard_item).collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut state = ListState::default().with_selected(Some(app.cursor));
    frame.render_stateful_widget(list, area, &mut state);
}

fn dashboard_item(list: &TaskList) -> ListItem<'static> {
    let done = list.completed_count();
    let total = list.tasks.len();
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("{}  ", list.short_id()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(list.title.clone(), Style::default().bold()),
        Span::raw(format!("  {done}/{total}")),
    ]))
}

fn render_list<S: SessionStorage>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let list = match &app.list {
        ListSnapshot::Loading => {
            let block = Block::default().borders(Borders::ALL);
            frame.render_widget(Paragraph::new("Loading...").block(block), area);
            return;
        }
        ListSnapshot::Missing => {
            render_missing(frame, app.access(), area);
            return;
        }
        ListSnapshot::Found(list) => list,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let title = if app.access().can_edit() {
        format!(" {} ", list.title)
    } else {
        format!(" {} (read-only) ", list.title)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(Color::Green))
        .percent(u16::from(list.progress()))
        .label(format_progress(list));
    frame.render_widget(gauge, chunks[0]);

    let block = Block::default().borders(Borders::ALL).title(" Tasks ");
    if list.tasks.is_empty() {
        let hint = if app.can_edit() {
            "No tasks yet. Press a to add one."
        } else {
            "No tasks in this list yet."
        };
        frame.render_widget(Paragraph::new(hint).block(block), chunks[1]);
        return;
    }

    let items: Vec<ListItem> = app.visible_tasks().into_iter().map(task_item).collect();
    let tasks = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut state = ListState::default().with_selected(Some(app.cursor));
    frame.render_stateful_widget(tasks, chunks[1], &mut state);
}

fn task_item(task: &Task) -> ListItem<'static> {
    let text_style = if task.completed {
        Style::default().fg(Color::DarkGray).crossed_out()
    } else {
        Style::default()
    };
    let mut spans = vec![
        Span::raw(format!("[{}] ", task.icon())),
        Span::styled(task.description.clone(), text_style),
    ];
    if let Some(due) = &task.due_date {
        spans.push(Span::styled(
            format!("  {}", format_due(due)),
            Style::default().fg(Color::Yellow),
        ));
    }
    spans.push(Span::styled(
        format!("  @{}", task.assignee_first_name()),
        Style::default().fg(Color::Cyan),
    ));
    ListItem::new(Line::from(spans))
}

fn render_missing(frame: &mut Frame, access: Access, area: Rect) {
    let mut text = vec![Line::from("List not found or removed.")];
    if access.can_edit() {
        text.push(Line::raw(""));
        text.push(Line::from("Press Esc to go back to all lists."));
    }
    frame.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_status<S: SessionStorage>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let line = if let Some(err) = &app.error {
        Paragraph::new(err.as_str()).style(Style::default().fg(Color::Red))
    } else if let Some(status) = &app.status {
        Paragraph::new(status.as_str()).style(Style::default().fg(Color::Green))
    } else {
        Paragraph::new(key_hints(app)).style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(line, area);
}

fn key_hints<S: SessionStorage>(app: &App<S>) -> String {
    match app.view {
        View::Dashboard => "Enter: open  n: new list  d: delete  ?: help  q: quit".into(),
        View::List(_) if !app.can_edit() => "s: share link  ?: help  q: quit".into(),
        View::List(_) => {
            let mut hints = String::from("a: add  e: edit  Space: toggle  d: delete  s: share");
            if app.suggest_available() {
                hints.push_str("  g: suggest");
            }
            hints.push_str("  Esc: back  q: quit");
            hints
        }
    }
}

fn render_title_input<S: SessionStorage>(frame: &mut Frame, app: &App<S>) {
    let term = frame.area();
    let width = 60.min(term.width.saturating_sub(4));
    let area = centered_rect(width, 5, term);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" New list ")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = vec![
        Line::from(format!("Title: {}_", app.title_input)),
        Line::raw(""),
        Line::styled("Enter: create  Esc: cancel", Style::default().fg(Color::DarkGray)),
    ];
    frame.render_widget(Paragraph::new(text), inner);
}

fn field_lines(label: &str, value: &str, focused: bool) -> [Line<'static>; 2] {
    let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
    } else {
        Style::default()
    };
    let cursor = if focused { "_" } else { "" };
    [
        Line::styled(label.to_string(), label_style),
        Line::from(format!("  {value}{cursor}")),
    ]
}

fn render_form<S: SessionStorage>(frame: &mut Frame, app: &App<S>) {
    let Some(form) = &app.form else {
        return;
    };
    let term = frame.area();
    let width = 70.min(term.width.saturating_sub(4));
    let height = (9 + u16::from(form.error.is_some())).min(term.height.saturating_sub(2));
    let area = centered_rect(width, height, term);
    frame.render_widget(Clear, area);

    let title = if form.task_id.is_some() {
        " Edit task "
    } else {
        " Add task "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut text: Vec<Line> = Vec::new();
    text.extend(field_lines(
        "Description:",
        &form.description,
        form.focused == FormField::Description,
    ));
    text.extend(field_lines(
        "Assignee:",
        &form.assignee,
        form.focused == FormField::Assignee,
    ));
    text.extend(field_lines(
        "Due date (YYYY-MM-DD, optional):",
        &form.due_date,
        form.focused == FormField::DueDate,
    ));
    if let Some(err) = &form.error {
        text.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
    }
    text.push(Line::styled(
        "Enter: save  Tab/S-Tab: fields  C-e: editor  C-u: clear  Esc: cancel",
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), inner);
}

fn render_confirm(frame: &mut Frame, pending: &Pending) {
    let (action, what) = match pending {
        Pending::DeleteList { title, .. } => ("Delete list", title.as_str()),
        Pending::RemoveTask { description, .. } => ("Delete task", description.as_str()),
    };
    let term = frame.area();
    let width = 50.min(term.width.saturating_sub(4));
    let height = 5.min(term.height.saturating_sub(2));
    let area = centered_rect(width, height, term);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {action} "))
        .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = vec![
        Line::from(Span::styled(what.to_string(), Style::default().bold())),
        Line::raw(""),
        Line::from(vec![
            Span::raw("Proceed? "),
            Span::styled("y", Style::default().fg(Color::Green).bold()),
            Span::raw("/"),
            Span::styled("n", Style::default().fg(Color::Red).bold()),
        ]),
    ];
    frame.render_widget(Paragraph::new(text), inner);
}

fn render_help<S: SessionStorage>(frame: &mut Frame, app: &App<S>) {
    let mut entries = vec![("j/Down", "Move down"), ("k/Up", "Move up")];
    match app.view {
        View::Dashboard => entries.extend([
            ("Enter", "Open list"),
            ("n", "New list"),
            ("d", "Delete list"),
        ]),
        View::List(_) => {
            if app.can_edit() {
                entries.extend([
                    ("a", "Add task"),
                    ("e", "Edit task"),
                    ("Space/x", "Toggle completed"),
                    ("d", "Delete task"),
                ]);
                if app.suggest_available() {
                    entries.push(("g", "Suggest tasks"));
                }
                entries.push(("Esc", "Back to all lists"));
            }
            entries.push(("s", "Show share link"));
        }
    }
    entries.extend([("?", "Toggle help"), ("q", "Quit")]);

    let term = frame.area();
    let width = 40.min(term.width.saturating_sub(4));
    let height = (entries.len() as u16 + 2).min(term.height.saturating_sub(2));
    let area = centered_rect(width, height, term);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = entries
        .into_iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:<8}"), Style::default().fg(Color::Cyan)),
                Span::raw(what),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
