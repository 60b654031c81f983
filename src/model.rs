use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub type NoteId = String;
pub type CategoryId = String;
pub type TagId = String;

/// Category every note falls back to when it has none, or when its category is removed.
pub const DEFAULT_CATEGORY_ID: &str = "personal";
pub const DEFAULT_NOTE_TITLE: &str = "Untitled Note";
pub const DEFAULT_CATEGORY_NAME: &str = "New Category";
pub const DEFAULT_TAG_NAME: &str = "New Tag";
pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Formatted text (HTML) kept as an opaque payload.
    pub content: String,
    pub is_pinned: bool,
    pub is_favorite: bool,
    pub tags: BTreeSet<TagId>,
    pub category: CategoryId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
}

/// Which of the two note collections a note lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Active,
    Trashed,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Active => f.write_str("active notes"),
            Collection::Trashed => f.write_str("trash"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("note not found in {collection}: {id}")]
    NoteNotFound { id: NoteId, collection: Collection },
    #[error("category not found: {0}")]
    CategoryNotFound(CategoryId),
    #[error("tag not found: {0}")]
    TagNotFound(TagId),
    #[error("note {0} is present more than once across collections")]
    DuplicateNote(NoteId),
}

/// Fields supplied when creating a note. Anything left unset falls back to
/// the defaults applied by [`Note::from_draft`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<CategoryId>,
    pub tags: BTreeSet<TagId>,
    pub is_pinned: bool,
    pub is_favorite: bool,
}

impl NoteDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        NoteDraft {
            title: Some(title.into()),
            ..NoteDraft::default()
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn category(mut self, category: impl Into<CategoryId>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<TagId>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn pinned(mut self) -> Self {
        self.is_pinned = true;
        self
    }

    pub fn favorite(mut self) -> Self {
        self.is_favorite = true;
        self
    }
}

/// Partial update merged into an existing note. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<CategoryId>,
    pub tags: Option<BTreeSet<TagId>>,
    pub is_pinned: Option<bool>,
    pub is_favorite: Option<bool>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        NotePatch {
            title: Some(title.into()),
            ..NotePatch::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        NotePatch {
            content: Some(content.into()),
            ..NotePatch::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &NotePatch::default()
    }

    /// Blank titles and categories fall back to the defaults, as on creation.
    fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title =
                non_empty(Some(title)).unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string());
        }
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(category) = self.category {
            note.category =
                non_empty(Some(category)).unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_string());
        }
        if let Some(tags) = self.tags {
            note.tags = tags;
        }
        if let Some(pinned) = self.is_pinned {
            note.is_pinned = pinned;
        }
        if let Some(favorite) = self.is_favorite {
            note.is_favorite = favorite;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDraft {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Note {
    /// Builds a fresh note. Empty strings count as unset, so a blank title
    /// still becomes "Untitled Note".
    pub fn from_draft(id: NoteId, draft: NoteDraft, now: DateTime<Utc>) -> Self {
        Note {
            id,
            title: non_empty(draft.title).unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string()),
            content: draft.content.unwrap_or_default(),
            is_pinned: draft.is_pinned,
            is_favorite: draft.is_favorite,
            tags: draft.tags,
            category: non_empty(draft.category)
                .unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn merge(&mut self, patch: NotePatch, now: DateTime<Utc>) {
        patch.apply(self);
        self.touch(now);
    }

    /// Stamps `updated_at`, never letting it fall behind `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.contains(tag_id)
    }
}

impl Category {
    pub fn from_draft(id: CategoryId, draft: CategoryDraft) -> Self {
        Category {
            id,
            name: non_empty(draft.name).unwrap_or_else(|| DEFAULT_CATEGORY_NAME.to_string()),
            icon: draft.icon,
        }
    }
}

impl Tag {
    pub fn from_draft(id: TagId, draft: TagDraft) -> Self {
        Tag {
            id,
            name: non_empty(draft.name).unwrap_or_else(|| DEFAULT_TAG_NAME.to_string()),
            color: non_empty(draft.color).unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default = "default_sidebar_open")]
    pub sidebar_open: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            theme: Theme::default(),
            view_mode: ViewMode::default(),
            sidebar_open: true,
        }
    }
}

fn default_sidebar_open() -> bool {
    true
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn draft_defaults_fill_missing_fields() {
        let note = Note::from_draft("n1".into(), NoteDraft::default(), at(0));
        assert_eq!(note.title, DEFAULT_NOTE_TITLE);
        assert_eq!(note.content, "");
        assert_eq!(note.category, DEFAULT_CATEGORY_ID);
        assert!(note.tags.is_empty());
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn blank_title_and_category_count_as_missing() {
        let draft = NoteDraft::titled("").category("");
        let note = Note::from_draft("n1".into(), draft, at(0));
        assert_eq!(note.title, DEFAULT_NOTE_TITLE);
        assert_eq!(note.category, DEFAULT_CATEGORY_ID);
    }

    #[test]
    fn duplicate_tags_collapse() {
        let draft = NoteDraft::titled("x").tag("todo").tag("todo").tag("idea");
        let note = Note::from_draft("n1".into(), draft, at(0));
        assert_eq!(note.tags.len(), 2);
    }

    #[test]
    fn merge_only_touches_supplied_fields() {
        let mut note = Note::from_draft("n1".into(), NoteDraft::titled("a").content("body"), at(0));
        note.merge(NotePatch::title("b"), at(10));
        assert_eq!(note.title, "b");
        assert_eq!(note.content, "body");
        assert_eq!(note.updated_at, at(10));
    }

    #[test]
    fn blank_patch_fields_fall_back_like_drafts() {
        let draft = NoteDraft::titled("a").category("work");
        let mut note = Note::from_draft("n1".into(), draft, at(0));
        note.merge(
            NotePatch {
                title: Some(String::new()),
                category: Some(String::new()),
                ..NotePatch::default()
            },
            at(5),
        );
        assert_eq!(note.title, DEFAULT_NOTE_TITLE);
        assert_eq!(note.category, DEFAULT_CATEGORY_ID);
    }

    #[test]
    fn touch_never_moves_before_creation() {
        let mut note = Note::from_draft("n1".into(), NoteDraft::default(), at(0));
        note.touch(at(0) - Duration::seconds(30));
        assert_eq!(note.updated_at, note.created_at);
    }

    #[test]
    fn tag_and_category_defaults() {
        let tag = Tag::from_draft("t".into(), TagDraft::default());
        assert_eq!(tag.name, DEFAULT_TAG_NAME);
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);
        let category = Category::from_draft(
            "c".into(),
            CategoryDraft {
                name: Some("Work".into()),
                icon: None,
            },
        );
        assert_eq!(category.name, "Work");
        assert!(category.icon.is_none());
    }
}
