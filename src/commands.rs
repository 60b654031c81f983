use crate::ui;
use anyhow::{bail, Context, Result};
use notebox::storage::{init_project_store, locate_store, open_store, save_snapshot};
use notebox::text::{plain_text, preview, PREVIEW_CHARS};
use notebox::{
    random_tag_color, CategoryDraft, FilterSpec, Note, NoteDraft, NotePatch, NoteStore,
    SearchFilters, Snapshot, SortDirection, SortField, StoreLocation, StoreScope, Tab, TagDraft,
};
use std::env;
use std::path::PathBuf;

pub struct ListOptions {
    pub tab: Tab,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub query: Option<String>,
    pub any_tags: Vec<String>,
    pub any_categories: Vec<String>,
    pub favorites_only: bool,
    pub pinned_only: bool,
    pub sort_by: SortField,
    pub sort_direction: SortDirection,
}

impl ListOptions {
    fn filter_spec(self) -> FilterSpec {
        FilterSpec {
            tab: self.tab,
            category: self.category,
            tag: self.tag,
            search: SearchFilters {
                query: self.query.unwrap_or_default(),
                tags: self.any_tags.into_iter().collect(),
                categories: self.any_categories.into_iter().collect(),
                favorites_only: self.favorites_only,
                pinned_only: self.pinned_only,
                sort_by: self.sort_by,
                sort_direction: self.sort_direction,
            },
        }
    }
}

pub fn init(explicit: Option<PathBuf>, empty: bool) -> Result<()> {
    let location = match explicit {
        Some(path) => StoreLocation {
            path,
            scope: StoreScope::Explicit,
        },
        None => init_project_store(&env::current_dir()?)?,
    };
    if location.path.exists() {
        println!("Store already initialized at {}", location.path.display());
        return Ok(());
    }
    create_store_file(&location, empty)?;
    println!("Initialized store at {}", location.path.display());
    Ok(())
}

fn create_store_file(location: &StoreLocation, empty: bool) -> Result<()> {
    if empty {
        return save_snapshot(location, &Snapshot::default());
    }
    let store = open_store(location)?;
    if let Some(err) = store.last_persist_error() {
        bail!(
            "could not write store at {}: {}",
            location.path.display(),
            err
        );
    }
    Ok(())
}

pub fn list(explicit: Option<PathBuf>, options: ListOptions) -> Result<()> {
    let (store, location) = load_current_store(explicit)?;
    let spec = options.filter_spec();
    println!(
        "{} ({}, {})",
        spec.tab.label(),
        location.scope.label(),
        location.path.display()
    );
    let notes = store.query(&spec);
    if notes.is_empty() {
        println!("  (empty)");
    }
    for note in notes {
        print_note_line(&store, note);
    }
    Ok(())
}

pub fn show(explicit: Option<PathBuf>, note_id: String) -> Result<()> {
    let (store, _) = load_current_store(explicit)?;
    let (note, collection) = store
        .note(&note_id)
        .with_context(|| format!("note {} not found", note_id))?;
    println!("{} [{}] ({})", note.title, note.id, collection);
    println!("category: {}", category_label(&store, &note.category));
    if !note.tags.is_empty() {
        println!("tags: {}", tag_labels(&store, note).join(", "));
    }
    println!(
        "created {}  updated {}",
        note.created_at.format("%Y-%m-%d %H:%M"),
        note.updated_at.format("%Y-%m-%d %H:%M")
    );
    let flags = [(note.is_pinned, "pinned"), (note.is_favorite, "favorite")]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, label)| *label)
        .collect::<Vec<_>>();
    if !flags.is_empty() {
        println!("{}", flags.join(", "));
    }
    println!();
    println!("{}", plain_text(&note.content));
    Ok(())
}

pub fn add(
    explicit: Option<PathBuf>,
    title: Option<String>,
    content: Option<String>,
    tags: Vec<String>,
    category: Option<String>,
    pin: bool,
    favorite: bool,
) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    let draft = NoteDraft {
        title,
        content,
        category,
        tags: tags.into_iter().collect(),
        is_pinned: pin,
        is_favorite: favorite,
    };
    let note = store.create_note(draft);
    warn_if_unsaved(&store);
    println!("Added note {} ({})", note.id, note.title);
    Ok(())
}

pub fn edit(
    explicit: Option<PathBuf>,
    note_id: String,
    title: Option<String>,
    content: Option<String>,
    tags: Vec<String>,
    clear_tags: bool,
    category: Option<String>,
) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    let tags = if !tags.is_empty() {
        Some(tags.into_iter().collect())
    } else if clear_tags {
        Some(Default::default())
    } else {
        None
    };
    let patch = NotePatch {
        title,
        content,
        category,
        tags,
        ..NotePatch::default()
    };
    if patch.is_empty() {
        bail!("nothing to change for note {}", note_id);
    }
    store
        .update_note(&note_id, patch)
        .with_context(|| format!("editing note {}", note_id))?;
    warn_if_unsaved(&store);
    println!("Updated note {}", note_id);
    Ok(())
}

pub fn toggle_pin(explicit: Option<PathBuf>, note_id: String) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    store
        .toggle_pin_note(&note_id)
        .with_context(|| format!("pinning note {}", note_id))?;
    warn_if_unsaved(&store);
    let pinned = store.note(&note_id).map(|(n, _)| n.is_pinned).unwrap_or(false);
    println!(
        "{} note {}",
        if pinned { "Pinned" } else { "Unpinned" },
        note_id
    );
    Ok(())
}

pub fn toggle_favorite(explicit: Option<PathBuf>, note_id: String) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    store
        .toggle_favorite_note(&note_id)
        .with_context(|| format!("favoriting note {}", note_id))?;
    warn_if_unsaved(&store);
    let favorite = store
        .note(&note_id)
        .map(|(n, _)| n.is_favorite)
        .unwrap_or(false);
    println!(
        "{} note {}",
        if favorite { "Favorited" } else { "Unfavorited" },
        note_id
    );
    Ok(())
}

pub fn delete(explicit: Option<PathBuf>, note_id: String) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    store
        .delete_note(&note_id)
        .with_context(|| format!("moving note {} to trash", note_id))?;
    warn_if_unsaved(&store);
    println!("Moved note {} to trash", note_id);
    Ok(())
}

pub fn restore(explicit: Option<PathBuf>, note_id: String) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    store
        .restore_note(&note_id)
        .with_context(|| format!("restoring note {}", note_id))?;
    warn_if_unsaved(&store);
    println!("Restored note {}", note_id);
    Ok(())
}

pub fn purge(explicit: Option<PathBuf>, note_id: String) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    store
        .permanently_delete_note(&note_id)
        .with_context(|| format!("purging note {}", note_id))?;
    warn_if_unsaved(&store);
    println!("Permanently deleted note {}", note_id);
    Ok(())
}

pub fn list_categories(explicit: Option<PathBuf>) -> Result<()> {
    let (store, _) = load_current_store(explicit)?;
    if store.categories().is_empty() {
        println!("(no categories)");
    }
    for category in store.categories() {
        let icon = category
            .icon
            .as_deref()
            .map(|i| format!(" [{}]", i))
            .unwrap_or_default();
        println!(
            "{}: {}{} ({})",
            category.id,
            category.name,
            icon,
            store.category_note_count(&category.id)
        );
    }
    Ok(())
}

pub fn add_category(
    explicit: Option<PathBuf>,
    name: Option<String>,
    icon: Option<String>,
) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    let category = store.add_category(CategoryDraft { name, icon });
    warn_if_unsaved(&store);
    println!("Added category {} ({})", category.id, category.name);
    Ok(())
}

pub fn remove_category(explicit: Option<PathBuf>, id: String) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    let repaired = store
        .remove_category(&id)
        .with_context(|| format!("removing category {}", id))?;
    warn_if_unsaved(&store);
    println!("Removed category {} ({} notes moved)", id, repaired);
    Ok(())
}

pub fn list_tags(explicit: Option<PathBuf>) -> Result<()> {
    let (store, _) = load_current_store(explicit)?;
    if store.tags().is_empty() {
        println!("(no tags)");
    }
    for tag in store.tags() {
        println!(
            "{}: {} {} ({})",
            tag.id,
            tag.name,
            tag.color,
            store.tag_note_count(&tag.id)
        );
    }
    Ok(())
}

pub fn add_tag(
    explicit: Option<PathBuf>,
    name: Option<String>,
    color: Option<String>,
    random_color: bool,
) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    let color = if random_color {
        Some(random_tag_color())
    } else {
        color
    };
    let tag = store.add_tag(TagDraft { name, color });
    warn_if_unsaved(&store);
    println!("Added tag {} ({}, {})", tag.id, tag.name, tag.color);
    Ok(())
}

pub fn remove_tag(explicit: Option<PathBuf>, id: String) -> Result<()> {
    let (mut store, _) = load_current_store(explicit)?;
    let repaired = store
        .remove_tag(&id)
        .with_context(|| format!("removing tag {}", id))?;
    warn_if_unsaved(&store);
    println!("Removed tag {} ({} notes updated)", id, repaired);
    Ok(())
}

pub fn tui(explicit: Option<PathBuf>) -> Result<()> {
    let (store, location) = load_current_store(explicit)?;
    ui::run(store, location)
}

fn load_current_store(explicit: Option<PathBuf>) -> Result<(NoteStore, StoreLocation)> {
    let cwd = env::current_dir()?;
    let location = locate_store(explicit, &cwd)?;
    let store = open_store(&location)?;
    Ok((store, location))
}

fn warn_if_unsaved(store: &NoteStore) {
    if let Some(err) = store.last_persist_error() {
        eprintln!("warning: changes were not saved: {}", err);
    }
}

fn category_label(store: &NoteStore, id: &str) -> String {
    store
        .category(id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn tag_labels(store: &NoteStore, note: &Note) -> Vec<String> {
    note.tags
        .iter()
        .map(|id| store.tag(id).map(|t| t.name.clone()).unwrap_or_else(|| id.clone()))
        .collect()
}

fn print_note_line(store: &NoteStore, note: &Note) {
    let marker = match (note.is_pinned, note.is_favorite) {
        (true, true) => "^*",
        (true, false) => "^ ",
        (false, true) => " *",
        (false, false) => "  ",
    };
    println!(
        "{} {}: {}  ({}, {})",
        marker,
        note.id,
        note.title,
        category_label(store, &note.category),
        ui::format_age(note.updated_at)
    );
    let text = preview(&note.content, PREVIEW_CHARS);
    if !text.trim().is_empty() {
        println!("     {}", text);
    }
    if !note.tags.is_empty() {
        println!("     #{}", tag_labels(store, note).join(" #"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn blocked_location(dir: &std::path::Path) -> StoreLocation {
        let blocker = dir.join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        StoreLocation {
            path: blocker.join("store.yml"),
            scope: StoreScope::Explicit,
        }
    }

    #[test]
    fn init_fails_when_seeded_store_cannot_be_written() {
        let dir = tempfile::tempdir().unwrap();
        let location = blocked_location(dir.path());
        let err = create_store_file(&location, false).unwrap_err();
        assert!(err.to_string().contains("could not write store"));
        assert!(!location.path.exists());
    }

    #[test]
    fn init_fails_when_empty_store_cannot_be_written() {
        let dir = tempfile::tempdir().unwrap();
        let location = blocked_location(dir.path());
        assert!(create_store_file(&location, true).is_err());
    }

    #[test]
    fn init_writes_seeded_store() {
        let dir = tempfile::tempdir().unwrap();
        let location = StoreLocation {
            path: dir.path().join("store.yml"),
            scope: StoreScope::Explicit,
        };
        create_store_file(&location, false).unwrap();
        let store = open_store(&location).unwrap();
        assert_eq!(store.active().len(), 4);
    }
}
