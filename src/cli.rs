use clap::{Parser, Subcommand, ValueEnum};
use notebox::{SortDirection, SortField, Tab};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "notebox",
    version,
    about = "Terminal notebook with categories, tags and a trash"
)]
pub struct Cli {
    /// Store file to use instead of the project or global store
    #[arg(long, global = true, env = "NOTEBOX_STORE")]
    pub store: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project store in the current directory
    Init {
        /// Start without the sample notes
        #[arg(long)]
        empty: bool,
    },
    /// List notes
    List {
        #[arg(long, value_enum, default_value_t = TabArg::Notes)]
        tab: TabArg,
        /// Only notes in this category id
        #[arg(long)]
        category: Option<String>,
        /// Only notes carrying this tag id
        #[arg(long)]
        tag: Option<String>,
        /// Case-insensitive text search over title and content
        #[arg(long, short = 'q')]
        query: Option<String>,
        /// Notes carrying any of these tag ids (repeatable)
        #[arg(long = "any-tag")]
        any_tags: Vec<String>,
        /// Notes in any of these category ids (repeatable)
        #[arg(long = "any-category")]
        any_categories: Vec<String>,
        #[arg(long)]
        favorites_only: bool,
        #[arg(long)]
        pinned_only: bool,
        #[arg(long, value_enum, default_value_t = SortArg::Updated)]
        sort: SortArg,
        /// Ascending order (default is descending)
        #[arg(long)]
        asc: bool,
    },
    /// Show one note, active or trashed
    Show { note_id: String },
    /// Add a new note
    Add {
        /// Title of the note
        title: Option<String>,
        /// Note content (HTML allowed)
        #[arg(long)]
        content: Option<String>,
        /// Tag ids (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        /// Category id (defaults to personal)
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        pin: bool,
        #[arg(long)]
        favorite: bool,
    },
    /// Edit an active note
    Edit {
        note_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Replace tags (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,
        /// Clear existing tags
        #[arg(long)]
        clear_tags: bool,
        #[arg(long)]
        category: Option<String>,
    },
    /// Toggle the pin on an active note
    Pin { note_id: String },
    /// Toggle the favorite flag on an active note
    Favorite { note_id: String },
    /// Move a note to the trash
    Delete { note_id: String },
    /// Bring a note back from the trash
    Restore { note_id: String },
    /// Permanently remove a trashed note
    Purge { note_id: String },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Launch the interactive TUI
    Tui,
}

#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    List,
    Add {
        name: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Remove a category; its notes move to the default category
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TagAction {
    List,
    Add {
        name: Option<String>,
        /// Display color such as #3B82F6
        #[arg(long, conflicts_with = "random_color")]
        color: Option<String>,
        #[arg(long)]
        random_color: bool,
    },
    /// Remove a tag from the store and from every note
    Remove { id: String },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabArg {
    Notes,
    Favorites,
    Trash,
}

impl From<TabArg> for Tab {
    fn from(value: TabArg) -> Self {
        match value {
            TabArg::Notes => Tab::Notes,
            TabArg::Favorites => Tab::Favorites,
            TabArg::Trash => Tab::Trash,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Updated,
    Created,
    Title,
}

impl From<SortArg> for SortField {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Updated => SortField::UpdatedAt,
            SortArg::Created => SortField::CreatedAt,
            SortArg::Title => SortField::Title,
        }
    }
}

pub fn direction(asc: bool) -> SortDirection {
    if asc {
        SortDirection::Asc
    } else {
        SortDirection::Desc
    }
}
