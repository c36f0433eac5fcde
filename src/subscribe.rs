//! Live subscriptions over the list store.
//!
//! Each subscription owns a background thread with its own connection. The
//! thread re-reads its query whenever the database file changes (file watch)
//! and, as a safety net, every poll interval. A snapshot is delivered to the
//! callback on initial load and whenever it differs from the previous one.
//! Read failures are logged and skipped, so an unreachable store simply
//! produces no callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};
use notify::RecommendedWatcher;
use rusqlite::Connection;

use crate::db;
use crate::model::TaskList;
use crate::ops;
use crate::watch;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Floor for user-supplied poll intervals, in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

/// Handle for a live subscription. Dropping it (or calling
/// [`Subscription::unsubscribe`]) stops delivery and joins the thread.
pub struct Subscription {
    stop: Arc<AtomicBool>,
    wake: Sender<()>,
    handle: Option<JoinHandle<()>>,
    _watcher: Option<RecommendedWatcher>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.wake.send(());
        if let Some(handle) = self.handle.take() {
            // A callback that drops its own subscription must not join itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Subscribe to every list, newest first.
pub fn stream_all_lists<C>(db_path: &str, poll: Duration, callback: C) -> Subscription
where
    C: FnMut(Vec<TaskList>) + Send + 'static,
{
    spawn("all lists", db_path, poll, ops::list_all, callback)
}

/// Subscribe to one list. `None` means the list does not exist (never did,
/// or was deleted).
pub fn stream_list<C>(db_path: &str, list_id: &str, poll: Duration, callback: C) -> Subscription
where
    C: FnMut(Option<TaskList>) + Send + 'static,
{
    let list_id = list_id.to_string();
    let label = format!("list '{list_id}'");
    spawn(
        &label,
        db_path,
        poll,
        move |conn| ops::get_list(conn, &list_id),
        callback,
    )
}

fn spawn<T, Q, C>(label: &str, db_path: &str, poll: Duration, mut query: Q, callback: C) -> Subscription
where
    T: Clone + PartialEq + Send + 'static,
    Q: FnMut(&Connection) -> Result<T> + Send + 'static,
    C: FnMut(T) + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let watcher = match watch::watch_db(db_path, tx.clone()) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("{label}: no file watch, polling only: {e:#}");
            None
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    let path = db_path.to_string();
    let label = label.to_string();
    let thread_stop = stop.clone();
    let handle = thread::spawn(move || {
        let mut conn: Option<Connection> = None;
        let fetch = move || {
            let c = match conn.take() {
                Some(c) => c,
                None => db::open_existing(&path)?,
            };
            let result = query(&c);
            // Keep the connection only while it works; reopen after a failure.
            if result.is_ok() {
                conn = Some(c);
            }
            result
        };
        run_feed(&label, &rx, &thread_stop, poll, fetch, callback);
        debug!("{label}: subscription closed");
    });

    Subscription {
        stop,
        wake: tx,
        handle: Some(handle),
        _watcher: watcher,
    }
}

fn run_feed<T, F, C>(
    label: &str,
    changes: &Receiver<()>,
    stop: &AtomicBool,
    poll: Duration,
    mut fetch: F,
    mut callback: C,
) where
    T: Clone + PartialEq,
    F: FnMut() -> Result<T>,
    C: FnMut(T),
{
    let mut last: Option<T> = None;
    let mut failing = false;
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        match fetch() {
            Ok(snapshot) => {
                failing = false;
                if last.as_ref() != Some(&snapshot) {
                    last = Some(snapshot.clone());
                    callback(snapshot);
                }
            }
            Err(e) => {
                if !failing {
                    warn!("{label}: store unavailable: {e:#}");
                }
                failing = true;
            }
        }
        if stop.load(Ordering::SeqCst) {
            return;
        }
        match changes.recv_timeout(poll) {
            Ok(()) => while changes.try_recv().is_ok() {},
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_skips_unchanged_snapshots() {
        let (_tx, rx) = mpsc::channel();
        let stop = AtomicBool::new(false);
        let mut values = vec![1, 1, 2, 2, 2, 3].into_iter();
        let mut seen = Vec::new();
        run_feed(
            "test",
            &rx,
            &stop,
            Duration::from_millis(1),
            || match values.next() {
                Some(v) => Ok(v),
                None => {
                    stop.store(true, Ordering::SeqCst);
                    Ok(3)
                }
            },
            |v| seen.push(v),
        );
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn feed_survives_fetch_errors() {
        let (_tx, rx) = mpsc::channel();
        let stop = AtomicBool::new(false);
        let mut calls = 0;
        let mut seen = Vec::new();
        run_feed(
            "test",
            &rx,
            &stop,
            Duration::from_millis(1),
            || {
                calls += 1;
                match calls {
                    1 | 2 => anyhow::bail!("store offline"),
                    3 => Ok("back"),
                    _ => {
                        stop.store(true, Ordering::SeqCst);
                        Ok("back")
                    }
                }
            },
            |v| seen.push(v),
        );
        assert_eq!(seen, vec!["back"]);
    }

    #[test]
    fn missing_store_delivers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let (tx, rx) = mpsc::channel();
        let sub = stream_all_lists(
            path.to_str().unwrap(),
            Duration::from_millis(10),
            move |lists| {
                let _ = tx.send(lists);
            },
        );
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        sub.unsubscribe();
        assert!(!path.exists());
    }
}
