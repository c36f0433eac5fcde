mod cli;

use std::fs::OpenOptions;
use std::io::{self, BufRead as _, IsTerminal, Write as _};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use log::info;
use rusqlite::Connection;

use cli::{Cli, Command, ConfigAction, SessionAction};
use docket::access::{Access, AccessController, DirStorage};
use docket::config::Config;
use docket::model::{DueDateChange, TaskList, TaskPatch};
use docket::router::{self, Route, View};
use docket::suggest::{self, Suggester};
use docket::{db, ops, output, paths, subscribe, tui};

const LOG_ENV: &str = "DOCKET_LOG";

/// CLI commands log to stderr. The TUI owns the terminal, so it logs to a
/// file under the state directory.
fn setup_logging(to_file: bool) -> Result<()> {
    let env = env_logger::Env::default().filter_or(LOG_ENV, "warn");
    let mut builder = env_logger::Builder::from_env(env);
    if to_file {
        let log_path = paths::log_path();
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .context("failed to open log file")?;
        builder
            .target(env_logger::Target::Pipe(Box::new(file)))
            .format_timestamp_secs();
    }
    builder.init();
    Ok(())
}

fn ensure_db_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn open_db(db_path: &str) -> Result<Connection> {
    ensure_db_dir(db_path)?;
    let conn = db::open(db_path)?;
    db::init(&conn)?;
    Ok(conn)
}

/// Whether a destructive command may go ahead without asking, must ask, or
/// must refuse because nobody can answer.
fn needs_prompt(yes: bool, stdin_is_terminal: bool) -> Result<bool> {
    if yes {
        return Ok(false);
    }
    if !stdin_is_terminal {
        bail!("refusing to delete without confirmation (pass --yes)");
    }
    Ok(true)
}

fn confirm(question: &str, yes: bool) -> Result<bool> {
    if !needs_prompt(yes, io::stdin().is_terminal())? {
        return Ok(true);
    }
    eprint!("{question} [y/N] ");
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn require_owner(access: Access, list: &TaskList) -> Result<()> {
    if !access.can_edit() {
        bail!(
            "list '{}' is read-only in this session (opened as {access})",
            list.title
        );
    }
    Ok(())
}

fn build_patch(
    desc: Option<String>,
    assignee: Option<String>,
    due: Option<String>,
    clear_due: bool,
) -> Result<TaskPatch> {
    let due_date = match (due, clear_due) {
        (_, true) => DueDateChange::Clear,
        (Some(d), false) => DueDateChange::Set(d),
        (None, false) => DueDateChange::Keep,
    };
    let patch = TaskPatch {
        description: desc,
        assignee,
        completed: None,
        due_date,
    };
    if patch.is_empty() {
        bail!("nothing to change (pass --desc, --assignee, --due or --clear-due)");
    }
    Ok(patch)
}

/// Open a list the way following its link would, and load it.
fn open_list(
    conn: &Connection,
    access: &mut AccessController<DirStorage>,
    reference: &str,
) -> Result<(TaskList, Access)> {
    let id = ops::resolve_list_id(conn, reference)?;
    let nav = router::navigate(access, &router::list_fragment(&id))?;
    let list = ops::get_list(conn, &id)?.with_context(|| format!("list '{id}' not found"))?;
    Ok((list, nav.access))
}

fn print_view(conn: &Connection, view: &View, access: Access) -> Result<()> {
    match view {
        View::Dashboard => print!("{}", output::format_dashboard(&ops::list_all(conn)?)),
        View::List(id) => match ops::get_list(conn, id)? {
            Some(list) => print!("{}", output::format_list_view(&list, access)),
            None => print!("{}", output::format_not_found(access)),
        },
    }
    Ok(())
}

fn watch(db_path: &str, fragment: &str, poll: Duration, access: Access, view: View) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let _subscription = match view {
        View::Dashboard => subscribe::stream_all_lists(db_path, poll, move |lists| {
            let _ = tx.send(output::format_dashboard(&lists));
        }),
        View::List(id) => subscribe::stream_list(db_path, &id, poll, move |list| {
            let text = match list {
                Some(list) => output::format_list_view(&list, access),
                None => output::format_not_found(access),
            };
            let _ = tx.send(text);
        }),
    };
    info!("watching '{fragment}'");

    let mut stdout = io::stdout();
    let clear = stdout.is_terminal();
    for text in rx {
        if clear {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
        } else {
            writeln!(stdout, "---")?;
        }
        write!(stdout, "{text}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn run_session(
    action: SessionAction,
    session: &str,
    access: &mut AccessController<DirStorage>,
) -> Result<()> {
    match action {
        SessionAction::Show => {
            let state = if access.has_owner_marker()? {
                "owner"
            } else {
                "not marked"
            };
            println!("{session}  {state}");
            println!("{}", paths::session_dir(session).display());
        }
        SessionAction::Forget => {
            access.forget()?;
            eprintln!("Session '{session}' is no longer marked as owner");
        }
        SessionAction::List => {
            let dir = paths::sessions_dir();
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to read {}", dir.display()))
                }
            };
            let mut ids: Vec<String> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .filter_map(|e| {
                    e.file_name()
                        .to_str()
                        .and_then(paths::dirname_to_session_id)
                })
                .collect();
            ids.sort();
            for id in ids {
                let marker = AccessController::new(DirStorage::new(paths::session_dir(&id)))
                    .has_owner_marker()?;
                let current = if id == session { "  (this session)" } else { "" };
                let owner = if marker { "owner" } else { "-" };
                println!("{id}  {owner}{current}");
            }
        }
    }
    Ok(())
}

fn run_config(action: ConfigAction, mut config: Config, cli_db: Option<String>) -> Result<()> {
    let config_path = paths::config_path();
    match action {
        ConfigAction::Show => {
            let db_path = config.db_path(cli_db)?;
            let suggestions = if config.suggest.api_key().is_some() {
                "enabled"
            } else {
                "disabled"
            };
            if config.suggest.api_key.is_some() {
                config.suggest.api_key = Some("<redacted>".into());
            }
            println!("# config file: {}", config_path.display());
            println!("# store: {db_path}");
            println!("# suggestions: {suggestions}");
            print!(
                "{}",
                toml::to_string_pretty(&config).context("failed to serialize config")?
            );
        }
        ConfigAction::SetStore { path } => {
            Config::set_store_override(&config_path, &path)?;
            eprintln!("Store set to {path} (takes effect on the next start)");
        }
        ConfigAction::Reset => {
            Config::clear_store_override(&config_path)?;
            eprintln!(
                "Store reset to {} (takes effect on the next start)",
                paths::default_db_path().display()
            );
        }
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(matches!(cli.command, Command::Ui { .. }))?;

    let config = Config::load()?;
    let session = cli
        .session
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(paths::default_session_id);
    let mut access = AccessController::new(DirStorage::new(paths::session_dir(&session)));

    let db_path = match &cli.command {
        Command::Config { .. } | Command::Session { .. } => String::new(),
        _ => config.db_path(cli.db.clone())?,
    };

    match cli.command {
        Command::Lists { json } => {
            let conn = open_db(&db_path)?;
            router::navigate(&mut access, "")?;
            let lists = ops::list_all(&conn)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&lists)?);
            } else {
                print!("{}", output::format_dashboard(&lists));
            }
        }

        Command::New { title } => {
            let conn = open_db(&db_path)?;
            router::navigate(&mut access, "")?;
            let id = ops::create_list(&conn, &title)?;
            println!("{id}");
            eprintln!("Created list '{title}'");
        }

        Command::Delete { list, yes } => {
            let conn = open_db(&db_path)?;
            router::navigate(&mut access, "")?;
            let id = ops::resolve_list_id(&conn, &list)?;
            let list = ops::get_list(&conn, &id)?.with_context(|| format!("list '{id}' not found"))?;
            let question = format!(
                "Delete list '{}' and its {} task(s)?",
                list.title,
                list.tasks.len()
            );
            if !confirm(&question, yes)? {
                eprintln!("Aborted");
                return Ok(());
            }
            ops::delete_list(&conn, &id)?;
            eprintln!("Deleted list '{}'", list.title);
        }

        Command::Show { list, json } => {
            let conn = open_db(&db_path)?;
            let (list, access) = open_list(&conn, &mut access, &list)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list)?);
            } else {
                print!("{}", output::format_list_view(&list, access));
            }
        }

        Command::Open { fragment } => {
            let conn = open_db(&db_path)?;
            let nav = router::navigate(&mut access, &fragment)?;
            if let Route::Unrecognized(f) = &nav.route {
                info!("unrecognized fragment '{f}', showing all lists");
            }
            print_view(&conn, &nav.view, nav.access)?;
        }

        Command::Add {
            list,
            description,
            assignee,
            due,
        } => {
            let conn = open_db(&db_path)?;
            let (list, access) = open_list(&conn, &mut access, &list)?;
            require_owner(access, &list)?;
            let task_id = ops::add_task(&conn, &list.id, &description, &assignee, due.as_deref())?;
            println!("{task_id}");
            eprintln!("Added task to '{}'", list.title);
        }

        Command::Edit {
            list,
            task,
            desc,
            assignee,
            due,
            clear_due,
        } => {
            let patch = build_patch(desc, assignee, due, clear_due)?;
            let conn = open_db(&db_path)?;
            let (list, access) = open_list(&conn, &mut access, &list)?;
            require_owner(access, &list)?;
            let task_id = ops::resolve_task_id(&list, &task)?;
            if ops::update_task(&conn, &list.id, &task_id, &patch)? {
                eprintln!("Updated task {}", docket::model::short_id(&task_id));
            } else {
                eprintln!("Task {task} no longer exists; nothing changed");
            }
        }

        Command::Toggle { list, task } => {
            let conn = open_db(&db_path)?;
            let (list, access) = open_list(&conn, &mut access, &list)?;
            require_owner(access, &list)?;
            let task_id = ops::resolve_task_id(&list, &task)?;
            if !ops::toggle_task(&conn, &list.id, &task_id)? {
                eprintln!("Task {task} no longer exists; nothing changed");
                return Ok(());
            }
            let completed = ops::get_list(&conn, &list.id)?
                .and_then(|l| l.find_task(&task_id).map(|t| t.completed))
                .unwrap_or(false);
            let state = if completed { "completed" } else { "pending" };
            eprintln!("Marked task {} as {state}", docket::model::short_id(&task_id));
        }

        Command::Rm { list, task, yes } => {
            let conn = open_db(&db_path)?;
            let (list, access) = open_list(&conn, &mut access, &list)?;
            require_owner(access, &list)?;
            let task_id = ops::resolve_task_id(&list, &task)?;
            let description = list
                .find_task(&task_id)
                .map(|t| t.description.clone())
                .unwrap_or_default();
            if !confirm(&format!("Delete task '{description}'?"), yes)? {
                eprintln!("Aborted");
                return Ok(());
            }
            if ops::remove_task(&conn, &list.id, &task_id)? {
                eprintln!("Removed task '{description}'");
            } else {
                eprintln!("Task {task} no longer exists; nothing changed");
            }
        }

        Command::Suggest { list } => {
            let conn = open_db(&db_path)?;
            let (list, access) = open_list(&conn, &mut access, &list)?;
            require_owner(access, &list)?;
            let Some(suggester) = Suggester::from_config(&config.suggest) else {
                bail!(
                    "task suggestions are not configured (set suggest.api_key in {} or GEMINI_API_KEY)",
                    paths::config_path().display()
                );
            };
            let suggestions = suggester.suggest(&list.title);
            if suggestions.is_empty() {
                eprintln!("No suggestions available");
                return Ok(());
            }
            let added = suggest::apply_suggestions(&conn, &list.id, &suggestions)?;
            eprintln!("Added {added} suggested task(s) to '{}'", list.title);
        }

        Command::Share { list } => {
            let conn = open_db(&db_path)?;
            let id = ops::resolve_list_id(&conn, &list)?;
            println!("{}", router::share_link(config.share.base_url.as_deref(), &id));
        }

        Command::Watch {
            fragment,
            poll_interval,
        } => {
            // Created up front so the subscription has a store to open.
            let _conn = open_db(&db_path)?;
            let nav = router::navigate(&mut access, &fragment)?;
            watch(
                &db_path,
                &fragment,
                Duration::from_millis(poll_interval),
                nav.access,
                nav.view,
            )?;
        }

        Command::Ui {
            fragment,
            poll_interval,
        } => {
            let conn = open_db(&db_path)?;
            tui::run(
                &db_path,
                &conn,
                access,
                &fragment,
                Duration::from_millis(poll_interval),
                &config,
            )?;
        }

        Command::Session { action } => run_session(action, &session, &mut access)?,

        Command::Config { action } => run_config(action, config, cli.db)?,
    }

    Ok(())
}
