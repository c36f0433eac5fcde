use std::path::Path;

use docket::access::{Access, AccessController, DirStorage, OWNER_KEY};
use docket::paths::session_id_to_dirname;
use docket::router::{self, View};
use docket::{db, ops, output};

fn session(root: &Path, id: &str) -> AccessController<DirStorage> {
    AccessController::new(DirStorage::new(root.join(session_id_to_dirname(id))))
}

#[test]
fn owner_and_shared_link_scenario() {
    let sessions = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let path = store.path().join("docket.db");
    let conn = db::open(path.to_str().unwrap()).unwrap();
    db::init(&conn).unwrap();

    // The owner opens the overview and creates a list.
    let mut owner = session(sessions.path(), "tty/100");
    let nav = router::navigate(&mut owner, "#/").unwrap();
    assert_eq!(nav.view, View::Dashboard);
    assert_eq!(nav.access, Access::Owner);
    let id = ops::create_list(&conn, "Inventory 1234/23").unwrap();
    ops::add_task(&conn, &id, "Collect the death certificate", "Ana Souza", None).unwrap();

    // Opening the list in the same session keeps edit rights, even from a
    // later process.
    let mut later = session(sessions.path(), "tty/100");
    let nav = router::navigate(&mut later, &router::list_fragment(&id)).unwrap();
    assert_eq!(nav.view, View::List(id.clone()));
    assert_eq!(nav.access, Access::Owner);

    // A colleague follows the shared link in a fresh session.
    let link = router::share_link(Some("https://tasks.example.com/"), &id);
    let fragment = &link[link.find('#').unwrap()..];
    let mut colleague = session(sessions.path(), "tty/200");
    let nav = router::navigate(&mut colleague, fragment).unwrap();
    assert_eq!(nav.view, View::List(id.clone()));
    assert_eq!(nav.access, Access::Viewer);

    let list = ops::get_list(&conn, &id).unwrap().unwrap();
    let text = output::format_list_view(&list, nav.access);
    assert!(text.contains("(read-only)"));
    assert!(text.contains("@Ana"));
    assert!(!output::format_not_found(nav.access).contains("docket lists"));
}

#[test]
fn unrecognized_fragment_grants_nothing() {
    let sessions = tempfile::tempdir().unwrap();
    let mut tab = session(sessions.path(), "tty/300");
    let nav = router::navigate(&mut tab, "#/settings").unwrap();
    assert_eq!(nav.view, View::Dashboard);
    assert_eq!(nav.access, Access::Unknown);

    let nav = router::navigate(&mut tab, "#/list/abc").unwrap();
    assert_eq!(nav.access, Access::Viewer);
    assert!(!sessions
        .path()
        .join(session_id_to_dirname("tty/300"))
        .join(OWNER_KEY)
        .exists());
}

#[test]
fn forgetting_the_marker_makes_lists_read_only() {
    let sessions = tempfile::tempdir().unwrap();
    let mut tab = session(sessions.path(), "tty/400");
    router::navigate(&mut tab, "").unwrap();
    let marker = sessions.path().join("tty-400").join(OWNER_KEY);
    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "true");

    tab.forget().unwrap();
    let mut again = session(sessions.path(), "tty/400");
    let nav = router::navigate(&mut again, "#/list/abc").unwrap();
    assert_eq!(nav.access, Access::Viewer);
}

#[test]
fn similar_session_ids_keep_separate_markers() {
    let sessions = tempfile::tempdir().unwrap();
    let mut front_desk = session(sessions.path(), "front/desk");
    router::navigate(&mut front_desk, "#/").unwrap();

    let mut other = session(sessions.path(), "front-desk");
    let nav = router::navigate(&mut other, "#/list/abc").unwrap();
    assert_eq!(nav.access, Access::Viewer);

    let mut again = session(sessions.path(), "front/desk");
    let nav = router::navigate(&mut again, "#/list/abc").unwrap();
    assert_eq!(nav.access, Access::Owner);
}

#[test]
fn dot_session_ids_write_inside_sessions_dir() {
    let root = tempfile::tempdir().unwrap();
    let sessions = root.path().join("sessions");
    for id in [".", ".."] {
        let mut tab = session(&sessions, id);
        router::navigate(&mut tab, "").unwrap();
    }
    assert!(!sessions.join(OWNER_KEY).exists());
    assert!(!root.path().join(OWNER_KEY).exists());
    assert!(sessions.join("%2E%2E").join(OWNER_KEY).exists());
}
