use crate::model::{Category, Note, Preferences, Tag};
use crate::store::NoteStore;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Key the snapshot is filed under; snapshots from another namespace are ignored.
pub const STORE_NAMESPACE: &str = "notes-storage";
pub const SCHEMA_VERSION: u32 = 1;

const PROJECT_DIR: &str = ".notebox";
const STORE_FILE: &str = "store.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Explicit,
    Project,
    Global,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Explicit => "explicit",
            StoreScope::Project => "project",
            StoreScope::Global => "global",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

/// The durable part of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub trashed_notes: Vec<Note>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    namespace: &'a str,
    version: u32,
    state: &'a Snapshot,
}

#[derive(Deserialize)]
struct Envelope {
    namespace: Option<String>,
    version: Option<u32>,
    state: Option<serde_yaml::Value>,
}

/// Receives a full snapshot after every state change.
pub trait Persister {
    fn persist(&mut self, snapshot: &Snapshot) -> Result<()>;
}

pub struct YamlFilePersister {
    location: StoreLocation,
}

impl YamlFilePersister {
    pub fn new(location: StoreLocation) -> Self {
        YamlFilePersister { location }
    }
}

impl Persister for YamlFilePersister {
    fn persist(&mut self, snapshot: &Snapshot) -> Result<()> {
        save_snapshot(&self.location, snapshot)
    }
}

pub fn init_project_store(dir: &Path) -> Result<StoreLocation> {
    let store_dir = dir.join(PROJECT_DIR);
    fs::create_dir_all(&store_dir)
        .with_context(|| format!("failed to create {:?}", store_dir))?;
    Ok(StoreLocation {
        path: store_dir.join(STORE_FILE),
        scope: StoreScope::Project,
    })
}

/// Explicit path first, then the nearest project store above `start`, then
/// the per-user data directory.
pub fn locate_store(explicit: Option<PathBuf>, start: &Path) -> Result<StoreLocation> {
    if let Some(path) = explicit {
        return Ok(StoreLocation {
            path,
            scope: StoreScope::Explicit,
        });
    }
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        path: global_store_path()?,
        scope: StoreScope::Global,
    })
}

/// Reads the snapshot at `location`.
///
/// `Ok(None)` means there is no usable prior state: the file is missing, or
/// it belongs to another namespace or schema version. A file that is not
/// YAML at all is an error so it never gets overwritten by a fresh store.
pub fn load_snapshot(location: &StoreLocation) -> Result<Option<Snapshot>> {
    if !location.path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(&location.path)
        .with_context(|| format!("reading {:?}", location.path))?;
    let envelope: Envelope = serde_yaml::from_str(&data).context("parsing store file")?;

    if envelope.namespace.as_deref() != Some(STORE_NAMESPACE) {
        log::warn!(
            "ignoring {:?}: namespace {:?} is not {STORE_NAMESPACE}",
            location.path,
            envelope.namespace
        );
        return Ok(None);
    }
    if envelope.version != Some(SCHEMA_VERSION) {
        log::warn!(
            "ignoring {:?}: schema version {:?} does not match {SCHEMA_VERSION}",
            location.path,
            envelope.version
        );
        return Ok(None);
    }
    let snapshot = match envelope.state {
        Some(state) => serde_yaml::from_value(state).context("decoding store state")?,
        None => Snapshot::default(),
    };
    Ok(Some(snapshot))
}

pub fn save_snapshot(location: &StoreLocation, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let envelope = EnvelopeRef {
        namespace: STORE_NAMESPACE,
        version: SCHEMA_VERSION,
        state: snapshot,
    };
    let serialized = serde_yaml::to_string(&envelope).context("serializing store")?;
    fs::write(&location.path, serialized)
        .with_context(|| format!("writing {:?}", location.path))?;
    Ok(())
}

/// Loads the store at `location` and wires it to write back there.
///
/// Without prior state the store starts empty and is seeded with the sample
/// notes, which also writes the first snapshot.
pub fn open_store(location: &StoreLocation) -> Result<NoteStore> {
    let snapshot = load_snapshot(location)?;
    let persister = YamlFilePersister::new(location.clone());
    match snapshot {
        Some(snapshot) => {
            let store = NoteStore::from_snapshot(snapshot)
                .with_context(|| format!("loading {:?}", location.path))?;
            Ok(store.with_persister(persister))
        }
        None => {
            log::info!("no prior state at {:?}, seeding", location.path);
            let mut store = NoteStore::new().with_persister(persister);
            store.initialize();
            Ok(store)
        }
    }
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR).join(STORE_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "notebox").context("locating data directory")?;
    Ok(dirs.data_dir().join(STORE_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location_in(dir: &Path) -> StoreLocation {
        StoreLocation {
            path: dir.join("store.yml"),
            scope: StoreScope::Explicit,
        }
    }

    #[test]
    fn missing_file_is_no_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_snapshot(&location_in(dir.path())).unwrap().is_none());
    }

    #[test]
    fn mismatched_version_is_no_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let location = location_in(dir.path());
        fs::write(
            &location.path,
            "namespace: notes-storage\nversion: 7\nstate:\n  notes: []\n",
        )
        .unwrap();
        assert!(load_snapshot(&location).unwrap().is_none());
    }

    #[test]
    fn missing_version_is_no_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let location = location_in(dir.path());
        fs::write(&location.path, "namespace: notes-storage\nstate: {}\n").unwrap();
        assert!(load_snapshot(&location).unwrap().is_none());
    }

    #[test]
    fn foreign_namespace_is_no_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let location = location_in(dir.path());
        fs::write(&location.path, "namespace: other\nversion: 1\nstate: {}\n").unwrap();
        assert!(load_snapshot(&location).unwrap().is_none());
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let location = location_in(dir.path());
        fs::write(&location.path, "- [unbalanced").unwrap();
        assert!(load_snapshot(&location).is_err());
    }

    #[test]
    fn project_store_is_found_from_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let location = init_project_store(dir.path()).unwrap();
        save_snapshot(&location, &Snapshot::default()).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let found = locate_store(None, &nested).unwrap();
        assert_eq!(found.scope, StoreScope::Project);
        assert_eq!(found.path, location.path);
    }

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("mine.yml");
        let found = locate_store(Some(explicit.clone()), dir.path()).unwrap();
        assert_eq!(found.scope, StoreScope::Explicit);
        assert_eq!(found.path, explicit);
    }
}
