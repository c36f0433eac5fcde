use std::io::{self, Write as _};
use std::process::Command;

use anyhow::{bail, Context, Result};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::prelude::*;

/// Split `$EDITOR` into program and arguments (`code --wait` is common).
fn editor_command(editor: &str) -> Result<(String, Vec<String>)> {
    let mut parts = shlex::split(editor)
        .with_context(|| format!("cannot parse $EDITOR '{editor}'"))?
        .into_iter();
    let Some(program) = parts.next() else {
        bail!("$EDITOR is empty");
    };
    Ok((program, parts.collect()))
}

/// Suspends the TUI, opens `$EDITOR` on a temp file holding `initial_content`,
/// and returns what was saved once the editor exits.
pub fn open_editor(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    initial_content: &str,
) -> Result<String> {
    let editor = std::env::var("EDITOR").context("$EDITOR is not set")?;
    let (program, args) = editor_command(&editor)?;

    let mut tmp = tempfile::Builder::new()
        .prefix("docket-")
        .suffix(".txt")
        .tempfile()
        .context("failed to create temp file")?;
    tmp.write_all(initial_content.as_bytes())
        .context("failed to write to temp file")?;
    tmp.flush()?;

    let path = tmp.path().to_path_buf();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    let status_result = Command::new(&program)
        .args(&args)
        .arg(&path)
        .status()
        .with_context(|| format!("failed to run editor '{editor}'"));

    // Restore even if the editor failed to launch.
    execute!(terminal.backend_mut(), EnterAlternateScreen)?;
    terminal::enable_raw_mode()?;
    terminal.clear()?;

    let status = status_result?;
    if !status.success() {
        bail!("editor exited with status {status}");
    }

    std::fs::read_to_string(&path).context("failed to read temp file after editor closed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_with_arguments() {
        let (program, args) = editor_command("code --wait").unwrap();
        assert_eq!(program, "code");
        assert_eq!(args, vec!["--wait"]);
    }

    #[test]
    fn quoted_editor_path() {
        let (program, args) = editor_command("'/opt/My Editor/bin/ed'").unwrap();
        assert_eq!(program, "/opt/My Editor/bin/ed");
        assert!(args.is_empty());
    }

    #[test]
    fn empty_or_unbalanced_editor() {
        assert!(editor_command("").is_err());
        assert!(editor_command("vim 'unterminated").is_err());
    }
}
