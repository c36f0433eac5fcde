//! Centralized path resolution and session ID encoding.
//!
//! Session IDs are strings of the form `tty/{pid}` (or whatever the user
//! passes with `--session`). Session directories on disk use `-` in place of
//! `/` (e.g. `tty-4242`); every other byte outside `[A-Za-z0-9_]` is written
//! as `%XX`, so distinct IDs never share a directory and no ID can name `.`
//! or `..`. The encoding functions here are the single source of truth for
//! this convention.

use std::path::PathBuf;

fn home() -> String {
    std::env::var("HOME").unwrap_or_else(|_| ".".into())
}

/// Resolve the per-user state directory.
/// Checks `DOCKET_HOME` env var, falls back to `$HOME/.docket`.
pub fn state_dir() -> PathBuf {
    match std::env::var("DOCKET_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from(home()).join(".docket"),
    }
}

/// Built-in store location used when neither the command line nor the
/// config file names one.
pub fn default_db_path() -> PathBuf {
    state_dir().join("docket.db")
}

/// Resolve the config file path.
/// Checks `DOCKET_CONFIG` env var, falls back to `<state dir>/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var("DOCKET_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => state_dir().join("config.toml"),
    }
}

pub fn log_path() -> PathBuf {
    state_dir().join("docket.log")
}

pub fn sessions_dir() -> PathBuf {
    state_dir().join("sessions")
}

/// The session a command runs in when none is given: the parent process,
/// which is the shell of the terminal tab the command was typed into.
pub fn default_session_id() -> String {
    #[cfg(unix)]
    {
        format!("tty/{}", std::os::unix::process::parent_id())
    }
    #[cfg(not(unix))]
    {
        "tty/default".to_string()
    }
}

/// Convert a session ID to a directory name.
/// `tty/4242` → `tty-4242`, `front-desk` → `front%2Ddesk`
pub fn session_id_to_dirname(session_id: &str) -> String {
    let mut out = String::with_capacity(session_id.len());
    for byte in session_id.bytes() {
        match byte {
            b'/' => out.push('-'),
            b if b.is_ascii_alphanumeric() || b == b'_' => out.push(b as char),
            b => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Convert a session directory name back to a session ID.
/// `tty-4242` → `tty/4242`
///
/// Returns `None` for names [`session_id_to_dirname`] never produces.
pub fn dirname_to_session_id(dirname: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(dirname.len());
    let mut rest = dirname.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        rest = tail;
        match byte {
            b'-' => bytes.push(b'/'),
            b'%' => {
                let hex = std::str::from_utf8(rest.get(..2)?).ok()?;
                bytes.push(u8::from_str_radix(hex, 16).ok()?);
                rest = &rest[2..];
            }
            b if b.is_ascii_alphanumeric() || b == b'_' => bytes.push(b),
            _ => return None,
        }
    }
    String::from_utf8(bytes).ok()
}

pub fn session_dir(session_id: &str) -> PathBuf {
    sessions_dir().join(session_id_to_dirname(session_id))
}
