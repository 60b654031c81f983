//! The note state engine.
//!
//! [`NoteStore`] owns every note, category and tag. All operations run to
//! completion on the caller's thread; there is no interior locking, so a
//! store shared across threads must sit behind a single mutex.
//!
//! Id-addressed mutations report a missing target as [`StoreError`] and leave
//! state untouched. Callers racing a deletion can ignore that with `.ok()`.
//!
//! Every successful mutation of notes, categories, tags or preferences hands
//! a fresh [`Snapshot`] to the attached [`Persister`]. A failing persister is
//! logged and otherwise ignored; memory stays authoritative.

use crate::clock::{Clock, SystemClock};
use crate::model::{
    Category, CategoryDraft, CategoryId, Collection, Note, NoteDraft, NoteId, NotePatch,
    Preferences, StoreError, Tag, TagDraft, TagId, Theme, ViewMode, DEFAULT_CATEGORY_ID,
};
use crate::query::{self, FilterSpec, SearchFilters, SearchPatch, Tab};
use crate::storage::{Persister, Snapshot};
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashSet;

const ID_LEN: usize = 8;

/// Transient listing context: which tab is open and what narrows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub tab: Tab,
    pub selected_category: Option<CategoryId>,
    pub selected_tag: Option<TagId>,
    pub search: SearchFilters,
}

impl ViewState {
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            tab: self.tab,
            category: self.selected_category.clone(),
            tag: self.selected_tag.clone(),
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabCounts {
    pub notes: usize,
    pub favorites: usize,
    pub trash: usize,
}

pub struct NoteStore {
    active: Vec<Note>,
    trashed: Vec<Note>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    selected: Option<NoteId>,
    view: ViewState,
    preferences: Preferences,
    clock: Box<dyn Clock>,
    persister: Option<Box<dyn Persister>>,
    last_persist_error: Option<String>,
}

impl Default for NoteStore {
    fn default() -> Self {
        NoteStore::new()
    }
}

impl NoteStore {
    pub fn new() -> Self {
        NoteStore {
            active: Vec::new(),
            trashed: Vec::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            selected: None,
            view: ViewState::default(),
            preferences: Preferences::default(),
            clock: Box::new(SystemClock),
            persister: None,
            last_persist_error: None,
        }
    }

    /// Rebuilds a store from durable state.
    ///
    /// A note id that shows up twice, in one collection or across both, is a
    /// structural violation and rejects the whole snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        let mut seen = HashSet::new();
        for note in snapshot.notes.iter().chain(snapshot.trashed_notes.iter()) {
            if !seen.insert(note.id.as_str()) {
                return Err(StoreError::DuplicateNote(note.id.clone()));
            }
        }
        let mut store = NoteStore::new();
        store.active = snapshot.notes;
        store.trashed = snapshot.trashed_notes;
        store.categories = snapshot.categories;
        store.tags = snapshot.tags;
        store.preferences = snapshot.preferences;
        Ok(store)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_persister(mut self, persister: impl Persister + 'static) -> Self {
        self.persister = Some(Box::new(persister));
        self
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            notes: self.active.clone(),
            trashed_notes: self.trashed.clone(),
            categories: self.categories.clone(),
            tags: self.tags.clone(),
            preferences: self.preferences.clone(),
        }
    }

    pub fn active(&self) -> &[Note] {
        &self.active
    }

    pub fn trashed(&self) -> &[Note] {
        &self.trashed
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Message of the most recent persistence failure, cleared by the next success.
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    /// Finds a note in either collection.
    pub fn note(&self, id: &str) -> Option<(&Note, Collection)> {
        if let Some(note) = self.active.iter().find(|n| n.id == id) {
            return Some((note, Collection::Active));
        }
        self.trashed
            .iter()
            .find(|n| n.id == id)
            .map(|note| (note, Collection::Trashed))
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn tag(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected note as currently stored, never a stale copy.
    pub fn selected_note(&self) -> Option<&Note> {
        let id = self.selected.as_deref()?;
        self.active.iter().find(|n| n.id == id)
    }

    /// Points the selection at an active note, or clears it.
    pub fn select_note(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        match id {
            None => self.selected = None,
            Some(id) => {
                self.active_index(id)?;
                self.selected = Some(id.to_string());
            }
        }
        Ok(())
    }

    /// Seeds the sample notes when there are no active notes. Returns whether
    /// anything was seeded.
    pub fn initialize(&mut self) -> bool {
        if !self.active.is_empty() {
            return false;
        }
        let now = self.clock.now();
        for category in sample_categories() {
            if self.category(&category.id).is_none() {
                self.categories.push(category);
            }
        }
        for tag in sample_tags() {
            if self.tag(&tag.id).is_none() {
                self.tags.push(tag);
            }
        }
        for note in sample_notes(now) {
            if self.note(&note.id).is_none() {
                self.active.push(note);
            }
        }
        self.selected = self.active.first().map(|n| n.id.clone());
        self.commit(format!("seeded {} sample notes", self.active.len()));
        true
    }

    pub fn create_note(&mut self, draft: NoteDraft) -> Note {
        let id = self.generate_id();
        let note = Note::from_draft(id, draft, self.clock.now());
        self.active.insert(0, note.clone());
        self.selected = Some(note.id.clone());
        self.commit(format!("created note {}", note.id));
        note
    }

    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> Result<(), StoreError> {
        let idx = self.active_index(id)?;
        let now = self.clock.now();
        self.active[idx].merge(patch, now);
        self.commit(format!("updated note {id}"));
        Ok(())
    }

    /// Moves an active note to the end of the trash without touching its fields.
    pub fn delete_note(&mut self, id: &str) -> Result<(), StoreError> {
        let idx = self.active_index(id)?;
        let note = self.active.remove(idx);
        self.trashed.push(note);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.commit(format!("trashed note {id}"));
        Ok(())
    }

    /// Moves a trashed note back to the front of the active notes.
    pub fn restore_note(&mut self, id: &str) -> Result<(), StoreError> {
        let idx = self.trashed_index(id)?;
        if self.active.iter().any(|n| n.id == id) {
            return Err(StoreError::DuplicateNote(id.to_string()));
        }
        let note = self.trashed.remove(idx);
        self.active.insert(0, note);
        self.commit(format!("restored note {id}"));
        Ok(())
    }

    pub fn permanently_delete_note(&mut self, id: &str) -> Result<(), StoreError> {
        let idx = self.trashed_index(id)?;
        self.trashed.remove(idx);
        self.commit(format!("purged note {id}"));
        Ok(())
    }

    pub fn toggle_pin_note(&mut self, id: &str) -> Result<(), StoreError> {
        let idx = self.active_index(id)?;
        let now = self.clock.now();
        let note = &mut self.active[idx];
        note.is_pinned = !note.is_pinned;
        note.touch(now);
        self.commit(format!("toggled pin on {id}"));
        Ok(())
    }

    pub fn toggle_favorite_note(&mut self, id: &str) -> Result<(), StoreError> {
        let idx = self.active_index(id)?;
        let now = self.clock.now();
        let note = &mut self.active[idx];
        note.is_favorite = !note.is_favorite;
        note.touch(now);
        self.commit(format!("toggled favorite on {id}"));
        Ok(())
    }

    pub fn add_category(&mut self, draft: CategoryDraft) -> Category {
        let category = Category::from_draft(self.generate_id(), draft);
        self.categories.push(category.clone());
        self.commit(format!("added category {}", category.id));
        category
    }

    /// Removes a category and moves every note that referenced it, trashed
    /// ones included, back to the default category. This runs even when the
    /// default category itself is gone. Returns how many notes were moved.
    ///
    /// Notes left pointing at an id that is no longer a category are repaired
    /// too; only an id that is neither a category nor referenced is an error.
    pub fn remove_category(&mut self, id: &str) -> Result<usize, StoreError> {
        let before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        let removed = self.categories.len() != before;

        let now = self.clock.now();
        let mut repaired = 0;
        for note in self.active.iter_mut().chain(self.trashed.iter_mut()) {
            if note.category == id {
                note.category = DEFAULT_CATEGORY_ID.to_string();
                note.touch(now);
                repaired += 1;
            }
        }

        if !removed && repaired == 0 {
            return Err(StoreError::CategoryNotFound(id.to_string()));
        }
        if self.view.selected_category.as_deref() == Some(id) {
            self.view.selected_category = None;
        }
        self.view.search.categories.remove(id);
        self.commit(format!("removed category {id}, repaired {repaired} notes"));
        Ok(repaired)
    }

    pub fn add_tag(&mut self, draft: TagDraft) -> Tag {
        let tag = Tag::from_draft(self.generate_id(), draft);
        self.tags.push(tag.clone());
        self.commit(format!("added tag {}", tag.id));
        tag
    }

    /// Removes a tag and strips it from every note carrying it, trashed ones
    /// included. Returns how many notes were changed. Same not-found rule as
    /// [`NoteStore::remove_category`].
    pub fn remove_tag(&mut self, id: &str) -> Result<usize, StoreError> {
        let before = self.tags.len();
        self.tags.retain(|t| t.id != id);
        let removed = self.tags.len() != before;

        let now = self.clock.now();
        let mut repaired = 0;
        for note in self.active.iter_mut().chain(self.trashed.iter_mut()) {
            if note.tags.remove(id) {
                note.touch(now);
                repaired += 1;
            }
        }

        if !removed && repaired == 0 {
            return Err(StoreError::TagNotFound(id.to_string()));
        }
        if self.view.selected_tag.as_deref() == Some(id) {
            self.view.selected_tag = None;
        }
        self.view.search.tags.remove(id);
        self.commit(format!("removed tag {id}, repaired {repaired} notes"));
        Ok(repaired)
    }

    pub fn query(&self, spec: &FilterSpec) -> Vec<&Note> {
        query::query(&self.active, &self.trashed, spec)
    }

    /// The listing for the current view state.
    pub fn visible_notes(&self) -> Vec<&Note> {
        self.query(&self.view.filter_spec())
    }

    /// Switching tabs drops any category or tag selection.
    pub fn set_active_tab(&mut self, tab: Tab) {
        self.view.tab = tab;
        self.view.selected_category = None;
        self.view.selected_tag = None;
    }

    /// Selecting a category clears the tag selection and returns to the notes
    /// tab. Selecting the category that is already selected clears it.
    pub fn set_selected_category(&mut self, id: Option<&str>) {
        let next = match id {
            Some(id) if self.view.selected_category.as_deref() != Some(id) => {
                Some(id.to_string())
            }
            _ => None,
        };
        self.view.selected_category = next;
        self.view.selected_tag = None;
        self.view.tab = Tab::Notes;
    }

    /// Tag counterpart of [`NoteStore::set_selected_category`].
    pub fn set_selected_tag(&mut self, id: Option<&str>) {
        let next = match id {
            Some(id) if self.view.selected_tag.as_deref() != Some(id) => Some(id.to_string()),
            _ => None,
        };
        self.view.selected_tag = next;
        self.view.selected_category = None;
        self.view.tab = Tab::Notes;
    }

    pub fn set_search_filters(&mut self, patch: SearchPatch) {
        self.view.search.merge(patch);
    }

    pub fn clear_search_filters(&mut self) {
        self.view.search = SearchFilters::default();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.preferences.theme = theme;
        self.commit(format!("theme set to {theme:?}"));
    }

    pub fn toggle_dark_mode(&mut self) {
        let theme = match self.preferences.theme {
            Theme::Dark => Theme::Light,
            Theme::Light | Theme::System => Theme::Dark,
        };
        self.set_theme(theme);
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.preferences.view_mode = mode;
        self.commit(format!("view mode set to {mode:?}"));
    }

    pub fn toggle_sidebar(&mut self) {
        self.preferences.sidebar_open = !self.preferences.sidebar_open;
        self.commit("toggled sidebar".to_string());
    }

    pub fn category_note_count(&self, id: &str) -> usize {
        self.active.iter().filter(|n| n.category == id).count()
    }

    pub fn tag_note_count(&self, id: &str) -> usize {
        self.active.iter().filter(|n| n.has_tag(id)).count()
    }

    pub fn tab_counts(&self) -> TabCounts {
        TabCounts {
            notes: self.active.len(),
            favorites: self.active.iter().filter(|n| n.is_favorite).count(),
            trash: self.trashed.len(),
        }
    }

    fn active_index(&self, id: &str) -> Result<usize, StoreError> {
        self.active
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| StoreError::NoteNotFound {
                id: id.to_string(),
                collection: Collection::Active,
            })
    }

    fn trashed_index(&self, id: &str) -> Result<usize, StoreError> {
        self.trashed
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| StoreError::NoteNotFound {
                id: id.to_string(),
                collection: Collection::Trashed,
            })
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.note(id).is_some() || self.category(id).is_some() || self.tag(id).is_some()
    }

    fn generate_id(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(ID_LEN)
                .map(char::from)
                .collect();
            if !self.id_in_use(&id) {
                return id;
            }
        }
    }

    fn commit(&mut self, change: String) {
        log::debug!("{change}");
        if self.persister.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(persister) = self.persister.as_mut() {
            match persister.persist(&snapshot) {
                Ok(()) => self.last_persist_error = None,
                Err(err) => {
                    log::warn!("failed to persist note store after {change}: {err:#}");
                    self.last_persist_error = Some(format!("{err:#}"));
                }
            }
        }
    }
}

/// A random `#rrggbb` color for a new tag.
pub fn random_tag_color() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..=0xFF_FFFF);
    format!("#{value:06X}")
}

fn sample_categories() -> Vec<Category> {
    [
        ("personal", "Personal"),
        ("work", "Work"),
        ("ideas", "Ideas"),
        ("tasks", "Tasks"),
    ]
    .into_iter()
    .map(|(id, name)| Category {
        id: id.to_string(),
        name: name.to_string(),
        icon: None,
    })
    .collect()
}

fn sample_tags() -> Vec<Tag> {
    [
        ("important", "Important", "#EF4444"),
        ("todo", "To Do", "#3B82F6"),
        ("idea", "Idea", "#10B981"),
    ]
    .into_iter()
    .map(|(id, name, color)| Tag {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    })
    .collect()
}

fn sample_note(
    id: &str,
    title: &str,
    content: &str,
    category: &str,
    tags: &[&str],
    stamped: DateTime<Utc>,
) -> Note {
    Note {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        is_pinned: false,
        is_favorite: false,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        category: category.to_string(),
        created_at: stamped,
        updated_at: stamped,
    }
}

fn sample_notes(now: DateTime<Utc>) -> Vec<Note> {
    let mut welcome = sample_note(
        "1",
        "Welcome to Notes App",
        "<h1>Welcome to your new Notes App!</h1><p>This is a modern note-taking application with \
         rich text editing capabilities. Here are some things you can do:</p><ul><li>Create and \
         organize notes by categories</li><li>Format your text with <strong>bold</strong>, \
         <em>italic</em>, and more</li><li>Add tags and categories to organize your \
         notes</li><li>Pin important notes to keep them at the top</li><li>Switch between light \
         and dark mode</li><li>Search and filter your notes</li></ul><p>Get started by creating \
         a new note or exploring the app features!</p>",
        "personal",
        &["important"],
        now,
    );
    welcome.is_pinned = true;

    let mut planning = sample_note(
        "2",
        "Project Planning",
        "<h2>Q1 Project Goals</h2><ul><li>Complete user research phase</li><li>Design new \
         dashboard interface</li><li>Implement authentication system</li><li>Launch beta \
         version</li></ul><p>Meeting scheduled for next Monday to discuss timeline and resource \
         allocation.</p>",
        "work",
        &["todo", "important"],
        now - Duration::days(1),
    );
    planning.is_favorite = true;

    let ideas = sample_note(
        "3",
        "App Feature Ideas",
        "<h2>New Features to Consider</h2><ul><li><strong>Voice Notes:</strong> Record audio \
         notes for quick capture</li><li><strong>Collaboration:</strong> Share notes with team \
         members</li><li><strong>Templates:</strong> Pre-built note templates for common use \
         cases</li><li><strong>Export Options:</strong> PDF, Markdown, and Word \
         export</li></ul><blockquote><p>Focus on features that enhance productivity and user \
         experience.</p></blockquote>",
        "ideas",
        &["idea"],
        now - Duration::days(2),
    );

    let tasks = sample_note(
        "4",
        "Daily Tasks",
        "<h2>Today's Tasks</h2><ul><li>Review pull requests</li><li>Update project \
         documentation</li><li>Prepare presentation for client meeting</li><li>Test new \
         features</li><li>Send weekly report</li></ul><p><em>Remember to take breaks and stay \
         hydrated!</em></p>",
        "tasks",
        &["todo"],
        now - Duration::hours(1),
    );

    vec![welcome, planning, ideas, tasks]
}
