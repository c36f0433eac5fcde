use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use docket::model::TaskList;
use docket::{db, ops, subscribe};

const POLL: Duration = Duration::from_millis(50);
const WAIT: Duration = Duration::from_secs(5);

fn temp_store() -> (tempfile::TempDir, String, rusqlite::Connection) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docket.db").to_str().unwrap().to_string();
    let conn = db::open(&path).unwrap();
    db::init(&conn).unwrap();
    (dir, path, conn)
}

/// Receive until an emission satisfies `pred`, failing after `WAIT`.
fn recv_until<T>(rx: &Receiver<T>, pred: impl Fn(&T) -> bool) -> T {
    loop {
        let value = rx
            .recv_timeout(WAIT)
            .expect("subscription went quiet before the expected emission");
        if pred(&value) {
            return value;
        }
    }
}

#[test]
fn overview_sees_new_list() {
    let (_dir, path, conn) = temp_store();
    let (tx, rx) = mpsc::channel();
    let _sub = subscribe::stream_all_lists(&path, POLL, move |lists| {
        let _ = tx.send(lists);
    });

    let initial = rx.recv_timeout(WAIT).unwrap();
    assert!(initial.is_empty(), "fresh store should emit an empty overview");

    let before = chrono::Utc::now().timestamp_millis();
    let id = ops::create_list(&conn, "Inventory 1234/23").unwrap();

    let lists = recv_until(&rx, |lists: &Vec<TaskList>| !lists.is_empty());
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].id, id);
    assert_eq!(lists[0].title, "Inventory 1234/23");
    assert!(lists[0].tasks.is_empty());
    assert!(lists[0].created_at >= before);
}

#[test]
fn overview_newest_first() {
    let (_dir, path, conn) = temp_store();
    let first = ops::create_list(&conn, "Older").unwrap();
    let second = ops::create_list(&conn, "Newer").unwrap();

    let (tx, rx) = mpsc::channel();
    let _sub = subscribe::stream_all_lists(&path, POLL, move |lists| {
        let _ = tx.send(lists);
    });
    let lists = rx.recv_timeout(WAIT).unwrap();
    let ids: Vec<&str> = lists.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
}

#[test]
fn delete_reaches_both_subscriptions() {
    let (_dir, path, conn) = temp_store();
    let keep = ops::create_list(&conn, "Keep").unwrap();
    let doomed = ops::create_list(&conn, "Doomed").unwrap();

    let (all_tx, all_rx) = mpsc::channel();
    let _all = subscribe::stream_all_lists(&path, POLL, move |lists| {
        let _ = all_tx.send(lists);
    });
    let (one_tx, one_rx) = mpsc::channel();
    let _one = subscribe::stream_list(&path, &doomed, POLL, move |list| {
        let _ = one_tx.send(list);
    });

    assert_eq!(all_rx.recv_timeout(WAIT).unwrap().len(), 2);
    let opened = one_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(opened.map(|l| l.title), Some("Doomed".to_string()));

    assert!(ops::delete_list(&conn, &doomed).unwrap());

    let lists = recv_until(&all_rx, |lists: &Vec<TaskList>| lists.len() == 1);
    assert_eq!(lists[0].id, keep);
    let gone = one_rx.recv_timeout(WAIT).unwrap();
    assert!(gone.is_none(), "open list should report not found");
}

#[test]
fn list_subscription_follows_task_changes() {
    let (_dir, path, conn) = temp_store();
    let id = ops::create_list(&conn, "Hearing").unwrap();

    let (tx, rx) = mpsc::channel();
    let _sub = subscribe::stream_list(&path, &id, POLL, move |list| {
        let _ = tx.send(list);
    });
    let initial = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert!(initial.tasks.is_empty());

    let task_id = ops::add_task(&conn, &id, "Prepare witness list", "Ana", None).unwrap();
    let list = recv_until(&rx, |l: &Option<TaskList>| {
        l.as_ref().is_some_and(|l| l.tasks.len() == 1)
    })
    .unwrap();
    assert!(!list.tasks[0].completed);

    ops::toggle_task(&conn, &id, &task_id).unwrap();
    recv_until(&rx, |l: &Option<TaskList>| {
        l.as_ref()
            .and_then(|l| l.find_task(&task_id))
            .is_some_and(|t| t.completed)
    });
}

#[test]
fn unknown_list_emits_not_found() {
    let (_dir, path, _conn) = temp_store();
    let (tx, rx) = mpsc::channel();
    let _sub = subscribe::stream_list(&path, "no-such-list", POLL, move |list| {
        let _ = tx.send(list);
    });
    assert_eq!(rx.recv_timeout(WAIT).unwrap(), None);
}

#[test]
fn unsubscribe_stops_delivery() {
    let (_dir, path, conn) = temp_store();
    let (tx, rx) = mpsc::channel();
    let sub = subscribe::stream_all_lists(&path, POLL, move |lists| {
        let _ = tx.send(lists);
    });
    assert!(rx.recv_timeout(WAIT).unwrap().is_empty());

    sub.unsubscribe();
    ops::create_list(&conn, "After").unwrap();

    assert!(rx.try_iter().all(|lists| lists.is_empty()));
    assert_eq!(
        rx.recv_timeout(Duration::from_millis(300)),
        Err(RecvTimeoutError::Disconnected)
    );
}
