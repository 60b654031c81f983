//! Note state engine: notes, categories and tags with trash semantics and
//! filtered, sorted listings.

pub mod clock;
pub mod model;
pub mod query;
pub mod session;
pub mod storage;
pub mod store;
pub mod text;

pub use clock::{Clock, SystemClock};
pub use model::{
    Category, CategoryDraft, CategoryId, Collection, Note, NoteDraft, NoteId, NotePatch,
    Preferences, StoreError, Tag, TagDraft, TagId, Theme, ViewMode, DEFAULT_CATEGORY_ID,
};
pub use query::{
    query, FilterSpec, SearchFilters, SearchPatch, SortDirection, SortField, Tab,
};
pub use session::{Authenticator, Session};
pub use storage::{open_store, Persister, Snapshot, StoreLocation, StoreScope};
pub use store::{random_tag_color, NoteStore, TabCounts, ViewState};
