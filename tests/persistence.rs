use notebox::storage::{load_snapshot, locate_store, save_snapshot, STORE_NAMESPACE};
use notebox::{open_store, NoteDraft, Snapshot, StoreLocation, StoreScope, Tab, Theme};
use std::fs;
use std::path::Path;

fn location_in(dir: &Path) -> StoreLocation {
    StoreLocation {
        path: dir.join("notes").join("store.yml"),
        scope: StoreScope::Explicit,
    }
}

#[test]
fn first_open_seeds_and_writes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let location = location_in(dir.path());

    let store = open_store(&location).unwrap();
    assert_eq!(store.active().len(), 4);
    assert_eq!(store.selected_id(), Some("1"));

    let written = fs::read_to_string(&location.path).unwrap();
    assert!(written.contains(STORE_NAMESPACE));
    assert!(written.contains("trashedNotes"));
    let snapshot = load_snapshot(&location).unwrap().unwrap();
    assert_eq!(snapshot, store.snapshot());
}

#[test]
fn changes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let location = location_in(dir.path());

    let mut store = open_store(&location).unwrap();
    let note = store.create_note(NoteDraft::titled("kept").tag("todo"));
    store.delete_note("3").unwrap();
    store.toggle_dark_mode();
    store.set_active_tab(Tab::Trash);
    let expected = store.snapshot();
    drop(store);

    let reopened = open_store(&location).unwrap();
    assert_eq!(reopened.snapshot(), expected);
    assert_eq!(reopened.note(&note.id).unwrap().0.title, "kept");
    assert_eq!(reopened.trashed().len(), 1);
    assert_eq!(reopened.preferences().theme, Theme::Dark);
    assert_eq!(reopened.view().tab, Tab::Notes);
}

#[test]
fn reopen_does_not_reseed_an_emptied_store() {
    let dir = tempfile::tempdir().unwrap();
    let location = location_in(dir.path());

    let mut store = open_store(&location).unwrap();
    for id in ["1", "2", "3", "4"] {
        store.delete_note(id).unwrap();
        store.permanently_delete_note(id).unwrap();
    }
    drop(store);

    let reopened = open_store(&location).unwrap();
    assert!(reopened.active().is_empty());
    assert!(reopened.trashed().is_empty());
}

#[test]
fn version_mismatch_reseeds() {
    let dir = tempfile::tempdir().unwrap();
    let location = location_in(dir.path());
    fs::create_dir_all(location.path.parent().unwrap()).unwrap();
    fs::write(
        &location.path,
        "namespace: notes-storage\nversion: 0\nstate:\n  notes: []\n",
    )
    .unwrap();

    let store = open_store(&location).unwrap();
    assert_eq!(store.active().len(), 4);
    let snapshot = load_snapshot(&location).unwrap().unwrap();
    assert_eq!(snapshot.notes.len(), 4);
}

#[test]
fn foreign_namespace_reseeds() {
    let dir = tempfile::tempdir().unwrap();
    let location = location_in(dir.path());
    fs::create_dir_all(location.path.parent().unwrap()).unwrap();
    fs::write(&location.path, "namespace: something-else\nversion: 1\n").unwrap();

    assert!(load_snapshot(&location).unwrap().is_none());
    assert_eq!(open_store(&location).unwrap().active().len(), 4);
}

#[test]
fn unreadable_store_is_an_error_and_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let location = location_in(dir.path());
    fs::create_dir_all(location.path.parent().unwrap()).unwrap();
    fs::write(&location.path, "[not: a store").unwrap();

    assert!(open_store(&location).is_err());
    assert_eq!(fs::read_to_string(&location.path).unwrap(), "[not: a store");
}

#[test]
fn empty_snapshot_loads_without_seeding() {
    let dir = tempfile::tempdir().unwrap();
    let location = location_in(dir.path());
    save_snapshot(&location, &Snapshot::default()).unwrap();

    let store = open_store(&location).unwrap();
    assert!(store.active().is_empty());
    assert!(store.categories().is_empty());
}

#[test]
fn explicit_path_wins_over_project_store() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join(".notebox");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("store.yml"), "").unwrap();
    let nested = dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let found = locate_store(None, &nested).unwrap();
    assert_eq!(found.scope, StoreScope::Project);
    assert_eq!(found.path, project.join("store.yml"));

    let explicit = dir.path().join("elsewhere.yml");
    let chosen = locate_store(Some(explicit.clone()), &nested).unwrap();
    assert_eq!(chosen.scope, StoreScope::Explicit);
    assert_eq!(chosen.path, explicit);
}
